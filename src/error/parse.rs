//! Translate transport failures into taxonomy instances.

use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde_json::Value;

use super::{ClaimWiseError, ErrorCategory, ErrorDetails, ErrorSeverity};
use crate::types::ResponseBody;

/// Header carrying the server's correlation id.
pub const TRACE_ID_HEADER: &str = "x-trace-id";

/// Wait assumed when a 429 carries no usable `Retry-After`.
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

const VALIDATION_CODE: &str = "VALIDATION_ERROR";
const FILE_CODE: &str = "FILE_ERROR";

/// Read the trace id header, if the server sent one.
pub fn trace_id_from(headers: &HeaderMap) -> Option<String> {
    headers
        .get(TRACE_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn retry_after_from(headers: &HeaderMap) -> u64 {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
}

/// What the body's `detail` told us, across the shapes the backend emits:
/// a bare string, a flat object, or the `{"error": {...}}` envelope.
#[derive(Debug, Default)]
struct ServerDetail {
    message: Option<String>,
    category: Option<String>,
    code: Option<String>,
    field: Option<String>,
    filename: Option<String>,
    suggestions: Option<Value>,
}

impl ServerDetail {
    fn read(body: &ResponseBody) -> Self {
        let json = match body {
            ResponseBody::Json(value) => value,
            ResponseBody::Text(text) => {
                let text = text.trim();
                return Self {
                    message: (!text.is_empty()).then(|| text.to_string()),
                    ..Default::default()
                };
            }
        };

        let detail = json.get("detail");
        let envelope = detail.and_then(|d| d.get("error"));
        let str_at = |value: Option<&Value>, key: &str| {
            value
                .and_then(|v| v.get(key))
                .and_then(Value::as_str)
                .map(str::to_string)
        };
        let nested_str = |value: Option<&Value>, key: &str| {
            value
                .and_then(|v| v.get("details"))
                .and_then(|d| d.get(key))
                .and_then(Value::as_str)
                .map(str::to_string)
        };

        let message = detail
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| str_at(detail, "message"))
            .or_else(|| str_at(envelope, "message"))
            .or_else(|| str_at(Some(json), "message"));

        Self {
            message,
            category: str_at(detail, "category"),
            code: str_at(detail, "code").or_else(|| str_at(envelope, "code")),
            field: nested_str(detail, "field").or_else(|| nested_str(envelope, "field")),
            filename: nested_str(detail, "filename")
                .or_else(|| nested_str(envelope, "filename")),
            suggestions: envelope.and_then(|e| e.get("recovery_suggestions")).cloned(),
        }
    }

    fn is_validation(&self) -> bool {
        self.category.as_deref() == Some("validation") || self.code.as_deref() == Some(VALIDATION_CODE)
    }

    fn is_file(&self) -> bool {
        self.code.as_deref() == Some(FILE_CODE)
    }

    fn message_or(&self, fallback: impl FnOnce() -> String) -> String {
        self.message.clone().unwrap_or_else(fallback)
    }

    fn extra_details(&self) -> ErrorDetails {
        let mut details = ErrorDetails {
            code: self.code.clone(),
            ..Default::default()
        };
        if let Some(suggestions) = &self.suggestions {
            details
                .metadata
                .insert("recoverySuggestions".to_string(), suggestions.clone());
        }
        details
    }
}

/// Classify a non-success HTTP response.
///
/// | status | result |
/// |---|---|
/// | 400 | validation when marked so, file error for `FILE_ERROR`, else client error |
/// | 401 | authentication |
/// | 403 | authentication (medium severity) |
/// | 422 | validation |
/// | 429 | rate limit, wait from `Retry-After` |
/// | 500, 502, 503, 504 | server error |
/// | other | unknown |
pub fn parse_api_error(status: u16, headers: &HeaderMap, body: &ResponseBody) -> ClaimWiseError {
    let detail = ServerDetail::read(body);
    let trace_id = trace_id_from(headers);

    let error = match status {
        400 if detail.is_validation() => ClaimWiseError::validation(
            detail.message_or(|| "Validation failed".to_string()),
            detail.field.clone(),
        ),
        400 if detail.is_file() => ClaimWiseError::file(
            detail.message_or(|| "File could not be processed".to_string()),
            detail.filename.clone(),
        ),
        400 => ClaimWiseError::new(
            ErrorCategory::ClientError,
            ErrorSeverity::Medium,
            detail.message_or(|| "Bad request".to_string()),
        ),
        401 => ClaimWiseError::authentication(
            detail.message_or(|| "Authentication required".to_string()),
        ),
        403 => ClaimWiseError::new(
            ErrorCategory::Authentication,
            ErrorSeverity::Medium,
            detail.message_or(|| "Access denied".to_string()),
        ),
        422 => ClaimWiseError::validation(
            detail.message_or(|| "Validation failed".to_string()),
            detail.field.clone(),
        ),
        429 => ClaimWiseError::rate_limit(
            detail.message_or(|| "Rate limit exceeded".to_string()),
            Some(retry_after_from(headers)),
        ),
        500 | 502 | 503 | 504 => ClaimWiseError::new(
            ErrorCategory::ServerError,
            ErrorSeverity::High,
            detail.message_or(|| format!("Server error (HTTP {status})")),
        ),
        _ => ClaimWiseError::new(
            ErrorCategory::Unknown,
            ErrorSeverity::Medium,
            detail.message_or(|| format!("HTTP {status} error")),
        ),
    };

    let mut extra = detail.extra_details();
    extra
        .metadata
        .insert("status".to_string(), Value::from(status));
    error.with_details(extra).with_trace_id(trace_id)
}

/// Classify a failure that never produced an HTTP response.
pub fn parse_network_error<E: std::error::Error>(error: &E) -> ClaimWiseError {
    let mut details = ErrorDetails::default();
    details.metadata.insert(
        "errorName".to_string(),
        Value::from(std::any::type_name::<E>()),
    );
    ClaimWiseError::network(error.to_string()).with_details(details)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn backend_envelope_is_understood() {
        let body = ResponseBody::Json(json!({
            "detail": {
                "error": {
                    "code": "VALIDATION_ERROR",
                    "message": "Policy number missing",
                    "details": {"field": "policy_number"},
                    "recovery_suggestions": ["Fill in the policy number"]
                }
            }
        }));
        let detail = ServerDetail::read(&body);
        assert!(detail.is_validation());
        assert_eq!(detail.message.as_deref(), Some("Policy number missing"));
        assert_eq!(detail.field.as_deref(), Some("policy_number"));
        assert!(detail.suggestions.is_some());
    }

    #[test]
    fn string_detail_becomes_message() {
        let body = ResponseBody::Json(json!({"detail": "Not authenticated"}));
        let detail = ServerDetail::read(&body);
        assert_eq!(detail.message.as_deref(), Some("Not authenticated"));
        assert!(!detail.is_validation());
    }

    #[test]
    fn blank_text_body_has_no_message() {
        let detail = ServerDetail::read(&ResponseBody::Text("  ".into()));
        assert!(detail.message.is_none());
    }
}

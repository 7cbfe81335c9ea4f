//! Tests for the error taxonomy and response parsers.

use claimwise::error::{
    parse_api_error, parse_network_error, ClaimWiseError, ErrorCategory, ErrorDetails, ErrorKind,
    ErrorRecord, ErrorSeverity, RecoveryIntent, LOGIN_ROUTE,
};
use claimwise::types::ResponseBody;
use pretty_assertions::assert_eq;
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::json;

fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (name, value) in pairs {
        map.insert(*name, HeaderValue::from_str(value).unwrap());
    }
    map
}

fn json_body(value: serde_json::Value) -> ResponseBody {
    ResponseBody::Json(value)
}

#[test]
fn constructors_fix_category_and_severity() {
    let cases = [
        (ClaimWiseError::network("down"), ErrorKind::Network, ErrorCategory::Network, ErrorSeverity::Medium),
        (
            ClaimWiseError::authentication("expired"),
            ErrorKind::Authentication,
            ErrorCategory::Authentication,
            ErrorSeverity::High,
        ),
        (
            ClaimWiseError::validation("bad", None),
            ErrorKind::Validation,
            ErrorCategory::Validation,
            ErrorSeverity::Low,
        ),
        (
            ClaimWiseError::file("corrupt", None),
            ErrorKind::File,
            ErrorCategory::FileError,
            ErrorSeverity::Medium,
        ),
        (
            ClaimWiseError::rate_limit("slow down", None),
            ErrorKind::RateLimit,
            ErrorCategory::RateLimit,
            ErrorSeverity::Low,
        ),
    ];

    for (error, kind, category, severity) in cases {
        assert_eq!(error.kind(), kind);
        assert_eq!(error.category(), category);
        assert_eq!(error.severity(), severity);
        assert_eq!(error.user_message(), category.default_user_message());
        assert!(!error.recovery_actions().is_empty());
    }
}

#[test]
fn authentication_recovery_navigates_to_login() {
    let actions = ClaimWiseError::authentication("expired").recovery_actions();
    assert_eq!(actions.len(), 1);
    assert!(actions[0].primary);
    assert_eq!(
        actions[0].intent,
        RecoveryIntent::Navigate {
            route: LOGIN_ROUTE.to_string()
        }
    );
}

#[test]
fn rate_limit_defaults_to_thirty_seconds() {
    let error = ClaimWiseError::rate_limit("Too many requests", None);
    let actions = error.recovery_actions();
    assert_eq!(actions[0].label, "Retry in 30 seconds");
    assert_eq!(actions[0].intent, RecoveryIntent::ReloadAfter { delay_ms: 30_000 });
    assert_eq!(error.details().retry_after, None);

    let error = ClaimWiseError::rate_limit("Too many requests", Some(5));
    assert_eq!(error.recovery_actions()[0].label, "Retry in 5 seconds");
}

#[test]
fn explicit_messages_and_actions_override_defaults() {
    let error = ClaimWiseError::new(ErrorCategory::ServerError, ErrorSeverity::Critical, "db gone")
        .with_user_message("We are fixing it")
        .with_recovery_actions(vec![]);
    assert_eq!(error.user_message(), "We are fixing it");
    assert!(error.recovery_actions().is_empty());
    assert_eq!(error.to_string(), "db gone");
}

#[test]
fn only_auth_and_validation_stop_retries() {
    assert!(ClaimWiseError::network("x").is_retryable());
    assert!(ClaimWiseError::rate_limit("x", None).is_retryable());
    assert!(ClaimWiseError::new(ErrorCategory::ServerError, ErrorSeverity::High, "x").is_retryable());
    assert!(!ClaimWiseError::authentication("x").is_retryable());
    assert!(!ClaimWiseError::validation("x", None).is_retryable());

    let forbidden = parse_api_error(403, &HeaderMap::new(), &json_body(json!({})));
    assert_eq!(forbidden.kind(), ErrorKind::General);
    assert!(!forbidden.is_retryable());
}

#[test]
fn record_round_trip_preserves_fields() {
    let error = ClaimWiseError::validation("Premium must be positive", Some("premium".into()))
        .with_trace_id(Some("trace-7".into()))
        .with_details(ErrorDetails {
            code: Some("VALIDATION_ERROR".into()),
            ..Default::default()
        });

    let json = error.to_json();
    assert_eq!(json["name"], "ValidationError");
    assert_eq!(json["category"], "validation");
    assert_eq!(json["severity"], "low");
    assert_eq!(json["traceId"], "trace-7");
    assert_eq!(json["details"]["field"], "premium");
    assert!(json["userMessage"].is_string());
    assert!(json["timestamp"].is_string());

    let record: ErrorRecord = serde_json::from_value(json).unwrap();
    let restored = ClaimWiseError::from(record);
    assert_eq!(restored.kind(), ErrorKind::Validation);
    assert_eq!(restored.category(), error.category());
    assert_eq!(restored.severity(), error.severity());
    assert_eq!(restored.technical_message(), error.technical_message());
    assert_eq!(restored.user_message(), error.user_message());
    assert_eq!(restored.trace_id(), Some("trace-7"));
    assert_eq!(restored.details(), error.details());
    assert_eq!(restored.timestamp(), error.timestamp());
}

#[test]
fn status_codes_map_to_categories() {
    let empty = HeaderMap::new();
    let body = json_body(json!({"detail": "nope"}));
    let cases = [
        (400, ErrorCategory::ClientError, ErrorSeverity::Medium),
        (401, ErrorCategory::Authentication, ErrorSeverity::High),
        (403, ErrorCategory::Authentication, ErrorSeverity::Medium),
        (404, ErrorCategory::Unknown, ErrorSeverity::Medium),
        (422, ErrorCategory::Validation, ErrorSeverity::Low),
        (429, ErrorCategory::RateLimit, ErrorSeverity::Low),
        (500, ErrorCategory::ServerError, ErrorSeverity::High),
        (502, ErrorCategory::ServerError, ErrorSeverity::High),
        (503, ErrorCategory::ServerError, ErrorSeverity::High),
        (504, ErrorCategory::ServerError, ErrorSeverity::High),
        (418, ErrorCategory::Unknown, ErrorSeverity::Medium),
    ];

    for (status, category, severity) in cases {
        let error = parse_api_error(status, &empty, &body);
        assert_eq!(error.category(), category, "status {status}");
        assert_eq!(error.severity(), severity, "status {status}");
        assert_eq!(error.technical_message(), "nope");
        assert_eq!(error.details().metadata["status"], json!(status));
    }
}

#[test]
fn bad_request_marked_as_validation() {
    let body = json_body(json!({
        "detail": {"message": "Age is required", "category": "validation", "details": {"field": "age"}}
    }));
    let error = parse_api_error(400, &HeaderMap::new(), &body);
    assert_eq!(error.kind(), ErrorKind::Validation);
    assert_eq!(error.details().field.as_deref(), Some("age"));
}

#[test]
fn backend_envelope_file_error() {
    let body = json_body(json!({
        "detail": {"error": {
            "code": "FILE_ERROR",
            "message": "Only PDF files are supported",
            "details": {"filename": "policy.docx"},
            "recovery_suggestions": ["Upload a PDF"]
        }}
    }));
    let error = parse_api_error(400, &headers(&[("x-trace-id", "t-1")]), &body);
    assert_eq!(error.kind(), ErrorKind::File);
    assert_eq!(error.technical_message(), "Only PDF files are supported");
    assert_eq!(error.details().filename.as_deref(), Some("policy.docx"));
    assert_eq!(error.details().code.as_deref(), Some("FILE_ERROR"));
    assert_eq!(
        error.details().metadata["recoverySuggestions"],
        json!(["Upload a PDF"])
    );
    assert_eq!(error.trace_id(), Some("t-1"));
}

#[test]
fn rate_limit_reads_retry_after_header() {
    let body = json_body(json!({}));
    let error = parse_api_error(429, &headers(&[("retry-after", "12")]), &body);
    assert_eq!(error.details().retry_after, Some(12));
    assert_eq!(error.recovery_actions()[0].label, "Retry in 12 seconds");

    let error = parse_api_error(429, &HeaderMap::new(), &body);
    assert_eq!(error.details().retry_after, Some(60));
}

#[test]
fn missing_detail_falls_back_to_generic_messages() {
    let error = parse_api_error(401, &HeaderMap::new(), &json_body(json!({})));
    assert_eq!(error.technical_message(), "Authentication required");

    let error = parse_api_error(503, &HeaderMap::new(), &ResponseBody::Text(String::new()));
    assert_eq!(error.technical_message(), "Server error (HTTP 503)");

    let error = parse_api_error(502, &HeaderMap::new(), &ResponseBody::Text("Bad Gateway".into()));
    assert_eq!(error.technical_message(), "Bad Gateway");
}

#[test]
fn network_errors_record_their_type() {
    let transport = reqwest::Client::new()
        .get("http://[::1")
        .build()
        .unwrap_err();
    let error = parse_network_error(&transport);
    assert_eq!(error.kind(), ErrorKind::Network);
    assert_eq!(error.technical_message(), transport.to_string());
    assert_eq!(
        error.details().metadata["errorName"],
        json!(std::any::type_name::<reqwest::Error>())
    );

    let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
    let error = parse_network_error(&io);
    assert_eq!(error.technical_message(), "refused");
    let name = error.details().metadata["errorName"].as_str().unwrap();
    assert!(name.starts_with("std::io"), "{name}");
}

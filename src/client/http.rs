//! Header construction, cache keys, and response reading.

use std::collections::HashMap;

use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::StatusCode;
use uuid::Uuid;

use crate::error::ClaimWiseError;
use crate::types::{HttpMethod, MultipartForm, RequestBody, ResponseBody};

pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const ATTEMPT_HEADER: &str = "x-attempt";

/// Fresh multipart boundary.
pub fn multipart_boundary() -> String {
    format!("claimwise-{}", Uuid::new_v4().simple())
}

/// Headers every client starts with.
pub fn default_headers() -> HashMap<String, String> {
    HashMap::from([("Content-Type".to_string(), "application/json".to_string())])
}

/// `Authorization` value for a bearer token.
pub fn bearer_value(token: &str) -> String {
    format!("Bearer {token}")
}

/// `req_<counter>_<epoch-ms>`
pub fn request_id(counter: u64) -> String {
    format!("req_{counter}_{}", Utc::now().timestamp_millis())
}

/// Key identifying a cacheable request: `METHOD:url:body-json`.
pub fn cache_key(method: HttpMethod, url: &str, body: Option<&RequestBody>) -> String {
    let body = match body {
        Some(RequestBody::Json(value)) => value.to_string(),
        _ => "{}".to_string(),
    };
    format!("{method}:{url}:{body}")
}

/// Merge client defaults with per-call headers (per-call wins) and add
/// the tracking headers. A multipart boundary replaces any configured
/// `Content-Type`.
pub fn build_headers(
    defaults: &HashMap<String, String>,
    per_call: &HashMap<String, String>,
    request_id: &str,
    attempt: u32,
    boundary: Option<&str>,
) -> Result<HeaderMap, ClaimWiseError> {
    let mut headers = HeaderMap::new();
    for (name, value) in defaults.iter().chain(per_call.iter()) {
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
            ClaimWiseError::validation(format!("Invalid header name '{name}': {e}"), Some(name.clone()))
        })?;
        let header_value = HeaderValue::from_str(value).map_err(|e| {
            ClaimWiseError::validation(format!("Invalid value for header '{name}': {e}"), Some(name.clone()))
        })?;
        headers.insert(header_name, header_value);
    }

    if let Ok(val) = HeaderValue::from_str(request_id) {
        headers.insert(REQUEST_ID_HEADER, val);
    }
    headers.insert(ATTEMPT_HEADER, HeaderValue::from(attempt));

    if let Some(boundary) = boundary {
        let value = HeaderValue::from_str(&MultipartForm::content_type(boundary)).map_err(|e| {
            ClaimWiseError::validation(format!("Invalid multipart boundary: {e}"), None)
        })?;
        headers.insert(CONTENT_TYPE, value);
    }
    Ok(headers)
}

/// A fully read HTTP response.
#[derive(Debug)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub bytes: Vec<u8>,
}

impl RawResponse {
    pub async fn read(response: reqwest::Response) -> Result<Self, reqwest::Error> {
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.bytes().await?.to_vec();
        Ok(Self {
            status,
            headers,
            bytes,
        })
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    pub fn body(&self) -> Result<ResponseBody, serde_json::Error> {
        ResponseBody::parse(self.content_type(), &self.bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn cache_key_includes_method_url_and_body() {
        assert_eq!(
            cache_key(HttpMethod::Get, "http://api.test/policies", None),
            "GET:http://api.test/policies:{}"
        );
        let body = RequestBody::Json(json!({"page": 2}));
        assert_eq!(
            cache_key(HttpMethod::Get, "http://api.test/policies", Some(&body)),
            "GET:http://api.test/policies:{\"page\":2}"
        );
    }

    #[test]
    fn per_call_headers_override_defaults() {
        let per_call = HashMap::from([("content-type".to_string(), "text/plain".to_string())]);
        let headers = build_headers(&default_headers(), &per_call, "req_1_0", 2, None).unwrap();
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "text/plain");
        assert_eq!(headers.get(ATTEMPT_HEADER).unwrap(), "2");
        assert_eq!(headers.get(REQUEST_ID_HEADER).unwrap(), "req_1_0");
    }

    #[test]
    fn multipart_replaces_json_content_type() {
        let boundary = multipart_boundary();
        let headers =
            build_headers(&default_headers(), &HashMap::new(), "req_1_0", 1, Some(&boundary)).unwrap();
        assert_eq!(
            headers.get(CONTENT_TYPE).unwrap().to_str().unwrap(),
            format!("multipart/form-data; boundary={boundary}")
        );
        assert_ne!(boundary, multipart_boundary());
    }

    #[test]
    fn invalid_header_is_a_validation_error() {
        let per_call = HashMap::from([("bad header".to_string(), "x".to_string())]);
        let err = build_headers(&HashMap::new(), &per_call, "req_1_0", 1, None).unwrap_err();
        assert_eq!(err.details().field.as_deref(), Some("bad header"));
    }

    #[test]
    fn request_id_has_counter_prefix() {
        assert!(request_id(7).starts_with("req_7_"));
    }
}

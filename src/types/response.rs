//! Response-side types.

use std::time::Duration;

use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// Parsed response body: JSON when the server declared it, text otherwise.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(serde_json::Value),
    Text(String),
}

impl ResponseBody {
    /// Parse raw bytes according to the declared content type.
    pub fn parse(content_type: Option<&str>, bytes: &[u8]) -> Result<Self, serde_json::Error> {
        let is_json = content_type
            .map(|ct| ct.to_ascii_lowercase().contains("application/json"))
            .unwrap_or(false);
        if is_json {
            Ok(Self::Json(serde_json::from_slice(bytes)?))
        } else {
            Ok(Self::Text(String::from_utf8_lossy(bytes).into_owned()))
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Json(_) => None,
        }
    }

    /// Decode into a caller type. Text bodies decode as a JSON string.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        match self {
            Self::Json(value) => T::deserialize(value),
            Self::Text(text) => T::deserialize(serde_json::Value::String(text.clone())),
        }
    }
}

/// Structured result of a successful request.
#[derive(Debug, Clone)]
pub struct ApiResponse<T> {
    pub data: T,
    pub status: u16,
    pub status_text: String,
    pub headers: HeaderMap,
    /// True when served from the request cache without a network call.
    pub cached: bool,
    pub response_time: Duration,
    pub trace_id: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ApiResponse<U> {
        ApiResponse {
            data: f(self.data),
            status: self.status,
            status_text: self.status_text,
            headers: self.headers,
            cached: self.cached,
            response_time: self.response_time,
            trace_id: self.trace_id,
        }
    }
}

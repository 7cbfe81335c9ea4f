//! Request-side types: method, per-call config, and bodies.

use std::collections::HashMap;
use std::time::Duration;

use bon::Builder;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Default number of attempts per logical request.
pub const DEFAULT_RETRIES: u32 = 3;
/// Default base delay between attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1000);
/// Default lifetime of a cached GET response.
pub const DEFAULT_CACHE_TIME: Duration = Duration::from_millis(300_000);

/// HTTP methods the client issues.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Patch => reqwest::Method::PATCH,
        }
    }
}

/// A file attached to a multipart upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub mime_type: Option<String>,
}

impl FilePart {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
            mime_type: None,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum MultipartValue {
    Text(String),
    File(FilePart),
}

/// Multipart form kept in owned form so every retry can resend it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartForm {
    parts: Vec<(String, MultipartValue)>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts
            .push((name.into(), MultipartValue::Text(value.into())));
        self
    }

    pub fn file(mut self, name: impl Into<String>, file: FilePart) -> Self {
        self.parts.push((name.into(), MultipartValue::File(file)));
        self
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// `Content-Type` header value for a body encoded with `boundary`.
    pub fn content_type(boundary: &str) -> String {
        format!("multipart/form-data; boundary={boundary}")
    }

    /// Encode as a `multipart/form-data` body delimited by `boundary`.
    pub fn encode(&self, boundary: &str) -> Vec<u8> {
        let payload_len: usize = self
            .parts
            .iter()
            .map(|(_, value)| match value {
                MultipartValue::File(file) => file.bytes.len(),
                MultipartValue::Text(text) => text.len(),
            })
            .sum();
        let mut body = Vec::with_capacity(payload_len + 256 * (self.parts.len() + 1));

        for (name, value) in &self.parts {
            let name = quote_param(name);
            body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
            match value {
                MultipartValue::Text(text) => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n")
                            .as_bytes(),
                    );
                    body.extend_from_slice(text.as_bytes());
                }
                MultipartValue::File(file) => {
                    let filename = quote_param(&file.filename);
                    let mime = file
                        .mime_type
                        .as_deref()
                        .unwrap_or("application/octet-stream");
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n"
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(format!("Content-Type: {mime}\r\n\r\n").as_bytes());
                    body.extend_from_slice(&file.bytes);
                }
            }
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
        body
    }
}

/// Percent-encode the characters that would break a quoted header
/// parameter, as browsers do for form field and file names.
fn quote_param(value: &str) -> String {
    value
        .replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// Payload of a request.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(serde_json::Value),
    Multipart(MultipartForm),
}

impl RequestBody {
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        Ok(Self::Json(serde_json::to_value(value)?))
    }

    pub fn is_multipart(&self) -> bool {
        matches!(self, Self::Multipart(_))
    }
}

impl From<serde_json::Value> for RequestBody {
    fn from(value: serde_json::Value) -> Self {
        Self::Json(value)
    }
}

impl From<MultipartForm> for RequestBody {
    fn from(form: MultipartForm) -> Self {
        Self::Multipart(form)
    }
}

/// Per-call request settings.
///
/// ```
/// use std::time::Duration;
/// use claimwise::types::{HttpMethod, RequestConfig};
///
/// let config = RequestConfig::builder()
///     .method(HttpMethod::Post)
///     .retries(5)
///     .timeout(Duration::from_secs(10))
///     .build();
/// assert_eq!(config.retries, 5);
/// assert!(!config.is_cacheable());
/// ```
#[derive(Debug, Clone, Builder)]
pub struct RequestConfig {
    #[builder(default)]
    pub method: HttpMethod,
    #[builder(default)]
    pub headers: HashMap<String, String>,
    pub body: Option<RequestBody>,
    /// Falls back to the client's default timeout (30 s) when unset.
    pub timeout: Option<Duration>,
    #[builder(default = DEFAULT_RETRIES)]
    pub retries: u32,
    #[builder(default = DEFAULT_RETRY_DELAY)]
    pub retry_delay: Duration,
    /// Unset means "cache if GET".
    pub cache: Option<bool>,
    #[builder(default = DEFAULT_CACHE_TIME)]
    pub cache_time: Duration,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            method: HttpMethod::Get,
            headers: HashMap::new(),
            body: None,
            timeout: None,
            retries: DEFAULT_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            cache: None,
            cache_time: DEFAULT_CACHE_TIME,
        }
    }
}

impl RequestConfig {
    /// GET requests are cached unless caching is switched off.
    pub fn is_cacheable(&self) -> bool {
        self.method == HttpMethod::Get && self.cache.unwrap_or(true)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

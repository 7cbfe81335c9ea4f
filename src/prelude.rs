//! Convenience re-exports for common use.

pub use crate::client::{ApiClient, ClientStats};
pub use crate::config::ClientConfig;
pub use crate::error::{
    ClaimWiseError, ErrorCategory, ErrorKind, ErrorSeverity, RecoveryAction, RecoveryIntent,
    Result,
};
pub use crate::reporting::{Connectivity, ConnectivityState, ErrorLogger, ErrorSink};
pub use crate::types::{
    ApiResponse, FilePart, HttpMethod, MultipartForm, RequestBody, RequestConfig, ResponseBody,
};

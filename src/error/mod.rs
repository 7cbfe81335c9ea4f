//! Error taxonomy for ClaimWise API calls.
//!
//! Every failure the client surfaces is a [`ClaimWiseError`]: a category
//! discriminant, a severity, a technical message for logs, a user-facing
//! message, structured details, and suggested recovery actions. The
//! category alone determines the default user message and recovery
//! actions, so call sites never need to author error copy.

pub mod parse;

pub use parse::{parse_api_error, parse_network_error};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumString};
use thiserror::Error;

/// Seconds a rate-limited caller waits when the server gives no hint.
pub const DEFAULT_RATE_LIMIT_WAIT_SECS: u64 = 30;

/// Login route used by the authentication recovery action.
pub const LOGIN_ROUTE: &str = "/login";

/// Broad error category driving retry policy, messages, and recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorCategory {
    Network,
    Authentication,
    Validation,
    ServerError,
    ClientError,
    RateLimit,
    FileError,
    Unknown,
}

impl ErrorCategory {
    /// One-line message shown to the user when none is supplied.
    pub fn default_user_message(self) -> &'static str {
        match self {
            Self::Network => {
                "Unable to reach the server. Please check your connection and try again."
            }
            Self::Authentication => "Your session has expired. Please log in to continue.",
            Self::Validation => "Some of the information provided is invalid. Please review it.",
            Self::ServerError => "The server ran into a problem. Please try again shortly.",
            Self::ClientError => "The request could not be completed. Please check your input.",
            Self::RateLimit => "Too many requests. Please wait a moment before retrying.",
            Self::FileError => "There was a problem with your file. Please check it and try again.",
            Self::Unknown => "Something unexpected happened. Please try again.",
        }
    }

    /// Recovery actions offered when none are supplied.
    pub fn default_recovery_actions(self) -> Vec<RecoveryAction> {
        match self {
            Self::Network => vec![RecoveryAction::primary("Try again", RecoveryIntent::Retry)],
            Self::Authentication => vec![RecoveryAction::primary(
                "Log in",
                RecoveryIntent::Navigate {
                    route: LOGIN_ROUTE.to_string(),
                },
            )],
            Self::Validation => vec![RecoveryAction::primary(
                "Review your input",
                RecoveryIntent::Dismiss,
            )],
            Self::ServerError => vec![
                RecoveryAction::primary("Try again", RecoveryIntent::Retry),
                RecoveryAction::secondary("Contact support", RecoveryIntent::ContactSupport),
            ],
            Self::ClientError => vec![RecoveryAction::primary("Go back", RecoveryIntent::Dismiss)],
            Self::RateLimit => rate_limit_actions(DEFAULT_RATE_LIMIT_WAIT_SECS),
            Self::FileError => vec![RecoveryAction::primary(
                "Choose another file",
                RecoveryIntent::Dismiss,
            )],
            Self::Unknown => vec![
                RecoveryAction::primary("Reload page", RecoveryIntent::ReloadAfter { delay_ms: 0 }),
                RecoveryAction::secondary("Contact support", RecoveryIntent::ContactSupport),
            ],
        }
    }
}

/// How urgently an error needs attention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

/// Which constructor produced an error. Serialized as the record `name`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
pub enum ErrorKind {
    #[serde(rename = "ClaimWiseError")]
    #[strum(serialize = "ClaimWiseError")]
    General,
    #[serde(rename = "NetworkError")]
    #[strum(serialize = "NetworkError")]
    Network,
    #[serde(rename = "AuthenticationError")]
    #[strum(serialize = "AuthenticationError")]
    Authentication,
    #[serde(rename = "ValidationError")]
    #[strum(serialize = "ValidationError")]
    Validation,
    #[serde(rename = "FileError")]
    #[strum(serialize = "FileError")]
    File,
    #[serde(rename = "RateLimitError")]
    #[strum(serialize = "RateLimitError")]
    RateLimit,
}

/// Free-form structured details attached to an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Seconds the server asked the caller to wait.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl ErrorDetails {
    /// Overlay `other` onto `self`; values present in `other` win.
    pub fn merge(mut self, other: ErrorDetails) -> Self {
        if other.field.is_some() {
            self.field = other.field;
        }
        if other.code.is_some() {
            self.code = other.code;
        }
        if other.filename.is_some() {
            self.filename = other.filename;
        }
        if other.retry_after.is_some() {
            self.retry_after = other.retry_after;
        }
        if other.context.is_some() {
            self.context = other.context;
        }
        self.metadata.extend(other.metadata);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// What a recovery action does when the user picks it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecoveryIntent {
    Retry,
    Navigate { route: String },
    /// Reload the current view once `delay_ms` has elapsed.
    ReloadAfter { delay_ms: u64 },
    Dismiss,
    ContactSupport,
}

/// A labelled recovery action for presentation layers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryAction {
    pub label: String,
    pub intent: RecoveryIntent,
    pub primary: bool,
}

impl RecoveryAction {
    pub fn primary(label: impl Into<String>, intent: RecoveryIntent) -> Self {
        Self {
            label: label.into(),
            intent,
            primary: true,
        }
    }

    pub fn secondary(label: impl Into<String>, intent: RecoveryIntent) -> Self {
        Self {
            label: label.into(),
            intent,
            primary: false,
        }
    }
}

fn rate_limit_actions(wait_secs: u64) -> Vec<RecoveryAction> {
    vec![RecoveryAction::primary(
        format!("Retry in {wait_secs} seconds"),
        RecoveryIntent::ReloadAfter {
            delay_ms: wait_secs.saturating_mul(1000),
        },
    )]
}

/// A classified failure from the ClaimWise API layer.
///
/// Instances are built once (by a parser or by the client) and then only
/// read. The category cannot change after construction.
#[derive(Error, Debug, Clone)]
#[error("{technical_message}")]
pub struct ClaimWiseError {
    kind: ErrorKind,
    category: ErrorCategory,
    severity: ErrorSeverity,
    technical_message: String,
    user_message: Option<String>,
    details: ErrorDetails,
    timestamp: DateTime<Utc>,
    trace_id: Option<String>,
    recovery_actions: Option<Vec<RecoveryAction>>,
}

impl ClaimWiseError {
    /// Create a general error with an explicit category and severity.
    pub fn new(
        category: ErrorCategory,
        severity: ErrorSeverity,
        message: impl Into<String>,
    ) -> Self {
        Self::with_kind(ErrorKind::General, category, severity, message)
    }

    fn with_kind(
        kind: ErrorKind,
        category: ErrorCategory,
        severity: ErrorSeverity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            category,
            severity,
            technical_message: message.into(),
            user_message: None,
            details: ErrorDetails::default(),
            timestamp: Utc::now(),
            trace_id: None,
            recovery_actions: None,
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::with_kind(
            ErrorKind::Network,
            ErrorCategory::Network,
            ErrorSeverity::Medium,
            message,
        )
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::with_kind(
            ErrorKind::Authentication,
            ErrorCategory::Authentication,
            ErrorSeverity::High,
            message,
        )
    }

    /// Validation failure, optionally naming the offending field.
    pub fn validation(message: impl Into<String>, field: Option<String>) -> Self {
        let mut error = Self::with_kind(
            ErrorKind::Validation,
            ErrorCategory::Validation,
            ErrorSeverity::Low,
            message,
        );
        error.details.field = field;
        error
    }

    pub fn file(message: impl Into<String>, filename: Option<String>) -> Self {
        let mut error = Self::with_kind(
            ErrorKind::File,
            ErrorCategory::FileError,
            ErrorSeverity::Medium,
            message,
        );
        error.details.filename = filename;
        error
    }

    /// Rate-limit rejection. The recovery action waits `retry_after`
    /// seconds, or [`DEFAULT_RATE_LIMIT_WAIT_SECS`] when unknown.
    pub fn rate_limit(message: impl Into<String>, retry_after: Option<u64>) -> Self {
        let mut error = Self::with_kind(
            ErrorKind::RateLimit,
            ErrorCategory::RateLimit,
            ErrorSeverity::Low,
            message,
        );
        error.details.retry_after = retry_after;
        error.recovery_actions = Some(rate_limit_actions(
            retry_after.unwrap_or(DEFAULT_RATE_LIMIT_WAIT_SECS),
        ));
        error
    }

    pub fn with_user_message(mut self, message: impl Into<String>) -> Self {
        self.user_message = Some(message.into());
        self
    }

    /// Merge extra details; constructor-supplied values are kept unless
    /// `details` overrides them.
    pub fn with_details(mut self, details: ErrorDetails) -> Self {
        self.details = std::mem::take(&mut self.details).merge(details);
        self
    }

    pub fn with_context(mut self, context: Value) -> Self {
        self.details.context = Some(context);
        self
    }

    pub fn with_trace_id(mut self, trace_id: Option<String>) -> Self {
        self.trace_id = trace_id;
        self
    }

    pub fn with_recovery_actions(mut self, actions: Vec<RecoveryAction>) -> Self {
        self.recovery_actions = Some(actions);
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn category(&self) -> ErrorCategory {
        self.category
    }

    pub fn severity(&self) -> ErrorSeverity {
        self.severity
    }

    pub fn technical_message(&self) -> &str {
        &self.technical_message
    }

    pub fn user_message(&self) -> &str {
        self.user_message
            .as_deref()
            .unwrap_or_else(|| self.category.default_user_message())
    }

    pub fn details(&self) -> &ErrorDetails {
        &self.details
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn trace_id(&self) -> Option<&str> {
        self.trace_id.as_deref()
    }

    pub fn recovery_actions(&self) -> Vec<RecoveryAction> {
        match &self.recovery_actions {
            Some(actions) => actions.clone(),
            None => self.category.default_recovery_actions(),
        }
    }

    /// Whether the retry loop may try again after this error.
    ///
    /// Authentication and validation failures need the caller to act
    /// first, so repeating the request cannot help. The rule goes by
    /// category, so a 403 (category `authentication`) is not retried either.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self.category,
            ErrorCategory::Authentication | ErrorCategory::Validation
        )
    }

    /// JSON-safe record for the remote error sink.
    pub fn to_record(&self) -> ErrorRecord {
        ErrorRecord {
            name: self.kind,
            message: self.technical_message.clone(),
            user_message: self.user_message().to_string(),
            category: self.category,
            severity: self.severity,
            details: self.details.clone(),
            timestamp: self.timestamp,
            trace_id: self.trace_id.clone(),
        }
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self.to_record()).unwrap_or(Value::Null)
    }
}

/// Serialized form of a [`ClaimWiseError`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRecord {
    pub name: ErrorKind,
    pub message: String,
    pub user_message: String,
    pub category: ErrorCategory,
    pub severity: ErrorSeverity,
    #[serde(default)]
    pub details: ErrorDetails,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

impl ErrorRecord {
    /// Rebuild an error. Recovery actions are derived again from the
    /// category (or the retry-after hint for rate limits).
    pub fn into_error(self) -> ClaimWiseError {
        let recovery_actions = match self.name {
            ErrorKind::RateLimit => Some(rate_limit_actions(
                self.details
                    .retry_after
                    .unwrap_or(DEFAULT_RATE_LIMIT_WAIT_SECS),
            )),
            _ => None,
        };
        let user_message = (self.user_message != self.category.default_user_message())
            .then_some(self.user_message);
        ClaimWiseError {
            kind: self.name,
            category: self.category,
            severity: self.severity,
            technical_message: self.message,
            user_message,
            details: self.details,
            timestamp: self.timestamp,
            trace_id: self.trace_id,
            recovery_actions,
        }
    }
}

impl From<ErrorRecord> for ClaimWiseError {
    fn from(record: ErrorRecord) -> Self {
        record.into_error()
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, ClaimWiseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn details_merge_prefers_incoming_values() {
        let base = ErrorDetails {
            field: Some("email".into()),
            code: Some("OLD".into()),
            ..Default::default()
        };
        let merged = base.merge(ErrorDetails {
            code: Some("NEW".into()),
            ..Default::default()
        });
        assert_eq!(merged.field.as_deref(), Some("email"));
        assert_eq!(merged.code.as_deref(), Some("NEW"));
    }

    #[test]
    fn empty_details_serialize_to_empty_object() {
        let json = serde_json::to_value(ErrorDetails::default()).unwrap();
        assert_eq!(json, serde_json::json!({}));
    }

    #[test]
    fn category_display_matches_wire_name() {
        assert_eq!(ErrorCategory::ServerError.to_string(), "server_error");
        assert_eq!(
            "rate_limit".parse::<ErrorCategory>().unwrap(),
            ErrorCategory::RateLimit
        );
    }
}

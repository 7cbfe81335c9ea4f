//! Handlers for `claimwise health` and `claimwise get`.

use std::time::Duration;

use crate::client::ApiClient;
use crate::error::ClaimWiseError;
use crate::types::RequestConfig;

use super::GetArgs;

/// Handle `claimwise health`. Returns whether the backend is healthy.
pub async fn handle_health(client: &ApiClient) -> bool {
    let healthy = client.health_check().await;
    if healthy {
        println!("healthy: {}", client.config().base_url);
    } else {
        eprintln!("unhealthy: {}", client.config().base_url);
    }
    healthy
}

/// Handle `claimwise get <path>`.
pub async fn handle_get(client: &ApiClient, args: &GetArgs) -> Result<(), ClaimWiseError> {
    let config = RequestConfig {
        retries: args.retries,
        timeout: args.timeout_ms.map(Duration::from_millis),
        cache: Some(false),
        ..Default::default()
    };
    let response = client
        .get::<serde_json::Value>(&args.path, config)
        .await?;

    if args.verbose {
        eprintln!(
            "{} {} in {}ms (trace {})",
            response.status,
            response.status_text,
            response.response_time.as_millis(),
            response.trace_id.as_deref().unwrap_or("-")
        );
    }
    match &response.data {
        serde_json::Value::String(text) => println!("{text}"),
        other => println!(
            "{}",
            serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string())
        ),
    }
    Ok(())
}

/// Render an error for the terminal: the user message, then the
/// category and technical detail.
pub fn format_error_help(err: &ClaimWiseError) -> String {
    let mut text = format!(
        "{} [{}] {}",
        err.user_message(),
        err.category(),
        err.technical_message()
    );
    if let Some(trace_id) = err.trace_id() {
        text.push_str(&format!(" (trace {trace_id})"));
    }
    if let Some(action) = err.recovery_actions().into_iter().find(|a| a.primary) {
        text.push_str(&format!("\nSuggested: {}", action.label));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_includes_user_message_and_category() {
        let err = ClaimWiseError::authentication("token expired")
            .with_trace_id(Some("abc123".into()));
        let help = format_error_help(&err);
        assert!(help.contains("log in"));
        assert!(help.contains("[authentication]"));
        assert!(help.contains("token expired"));
        assert!(help.contains("trace abc123"));
        assert!(help.contains("Suggested: Log in"));
    }

    #[test]
    fn format_rate_limit_suggests_wait() {
        let err = ClaimWiseError::rate_limit("slow down", Some(45));
        assert!(format_error_help(&err).contains("Retry in 45 seconds"));
    }
}

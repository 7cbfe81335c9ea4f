//! ClaimWise API client.
//!
//! A typed HTTP client for the ClaimWise policy backend with request
//! caching, per-attempt timeouts, retries with exponential backoff, a
//! structured error taxonomy, and an offline-aware error reporter.
//!
//! # Quick Start
//!
//! ```no_run
//! use claimwise::prelude::*;
//!
//! # async fn example() -> claimwise::error::Result<()> {
//! let client = ApiClient::with_default_logger(ClientConfig::from_env());
//! client.set_auth_token("access-token");
//!
//! let policies = client
//!     .get::<serde_json::Value>("/api/policies", RequestConfig::default())
//!     .await?;
//! println!("{} (cached: {})", policies.data, policies.cached);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod prelude;
pub mod reporting;
pub mod types;
pub mod util;

#[cfg(feature = "cli")]
pub mod cli;

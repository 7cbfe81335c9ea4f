//! Utility modules: request cache, retry, timeout.

pub mod cache;
pub mod retry;
pub mod timeout;

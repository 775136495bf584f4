//! ESI (EVE Swagger Interface) client layer.
//!
//! [`client::EsiClient`] wraps `reqwest` with typed endpoint calls,
//! `X-Pages` pagination and error-limit header tracking. The shared
//! error budget lives behind [`limiter::SharedCache`] so every worker
//! process sees the same window, and [`retry::RetryPolicy`] bounds
//! retries of transient upstream failures.

pub mod client;
pub mod error;
pub mod limiter;
pub mod pg_cache;
pub mod records;
pub mod retry;
pub mod token;

pub use client::EsiClient;
pub use error::EsiError;
pub use limiter::{ErrorLimiter, MemoryCache, SharedCache};
pub use pg_cache::PgCache;
pub use retry::RetryPolicy;
pub use token::AccessTokenProvider;

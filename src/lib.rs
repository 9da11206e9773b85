pub mod apis;
pub mod common;
pub mod config;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod rate_limiter;
pub mod registry;

//! Loop breaker: counts inbound events per time window and, when a runaway
//! event loop pushes the count past the threshold, runs a one-shot remediation.

pub mod admin;
pub mod breaker;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod remediation;

pub use breaker::{Breaker, BreakerState, Threshold};
pub use config::schema::BreakerConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;

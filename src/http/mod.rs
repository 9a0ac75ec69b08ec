//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID)
//!     → cloudevent.rs (decode binary or structured event)
//!     → Breaker::observe
//!     → 202 Accepted (or the event echoed back)
//! ```

pub mod cloudevent;
pub mod request;
pub mod server;

pub use cloudevent::CloudEvent;
pub use request::X_REQUEST_ID;
pub use server::{AppState, HttpServer};

//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → loader.rs (environment overrides: MAX_EVENTS, TIME_FRAME_IN_SECONDS, ...)
//!     → validation.rs (semantic checks)
//!     → BreakerConfig (validated, immutable)
//!     → consumed once at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no hot reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load, load_config, ConfigError};
pub use schema::{
    AdminConfig, BreakerConfig, KubernetesConfig, ListenerConfig, LogFormat, ObservabilityConfig,
    ReceiverConfig, RemediationConfig, RemediationKind, ThresholdConfig, WebhookConfig,
};
pub use validation::{validate_config, ValidationError};

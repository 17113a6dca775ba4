//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → APP_* environment overrides
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → consumed by the router builder and server at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{apply_env_overrides, load_config, parse_config, save_config, ConfigError};
pub use schema::{
    AppConfig, CorsConfig, ListenerConfig, ObservabilityConfig, RateLimitConfig,
    StaticFilesConfig, TemplateConfig, TimeoutConfig,
};
pub use validation::ValidationError;

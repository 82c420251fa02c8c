//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → RelayConfig (validated, immutable)
//!     → CLI overrides applied in main, then shared with the server
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - The upstream proxy is only ever taken from here, never compiled in

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::FilterConfig;
pub use schema::ListenerConfig;
pub use schema::RelayConfig;
pub use schema::TimeoutConfig;
pub use schema::TlsClientConfig;
pub use schema::UpstreamProxyConfig;

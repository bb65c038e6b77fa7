//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ClientConfig (validated, immutable)
//!     → StreamClient (ArcSwap) → snapshot per stream prototype
//!
//! On update:
//!     StreamClient::update_config
//!     → validation.rs validates
//!     → atomic swap of Arc<ClientConfig>
//!     → streams started afterwards observe new config
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes replace it whole
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{ClientConfig, FilterConfig, GrpcConfig, LoggingConfig};
pub use validation::ValidationError;

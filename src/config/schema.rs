//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files, and
//! every field has a default so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};

/// Root configuration for a stream client.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ClientConfig {
    /// Filter chain behaviour.
    pub filters: FilterConfig,

    /// gRPC stream defaults.
    pub grpc: GrpcConfig,

    pub logging: LoggingConfig,
}

/// Filter chain configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Upper bound on bytes a single stopped filter may hold buffered.
    /// Exceeding it fails the stream.
    pub buffer_limit_bytes: usize,

    /// Treat a broken filter contract as fatal for the stream instead of logging it.
    pub strict_contract: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            buffer_limit_bytes: 1024 * 1024,
            strict_contract: cfg!(debug_assertions),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GrpcConfig {
    /// Sent as `grpc-timeout` when a request does not carry its own.
    pub default_timeout_ms: Option<u64>,

    /// Largest response message accepted; a bigger length prefix is a
    /// protocol violation. Unlimited when unset.
    pub max_message_bytes: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Level filter used when `RUST_LOG` is unset (e.g. "info", "debug").
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

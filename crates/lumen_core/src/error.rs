//! Error types for every layer of the framework.
//!
//! Registry errors are fatal to a single registration attempt. Config errors
//! are isolated per option by the synchronizer. Delivery errors are only ever
//! logged by the dispatcher.

use crate::config::ConfigPath;
use crate::types::ColorParseError;

/// Errors raised while reading or writing the configuration tree.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required node is absent from the tree
    #[error("Required field {path} not found")]
    MissingField { path: String },
    /// A node exists but holds the wrong kind of value
    #[error("Type mismatch at {path}: expected {expected}, found {found}")]
    TypeMismatch {
        path: String,
        expected: &'static str,
        found: &'static str,
    },
    /// A color string could not be parsed
    #[error("Invalid color at {path}: {source}")]
    InvalidColor {
        path: String,
        #[source]
        source: ColorParseError,
    },
    /// A value was readable but violates a domain rule
    #[error("Invalid value at {path}: {reason}")]
    Invalid { path: String, reason: String },
    /// The config document is not valid TOML
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    /// Reading or writing the config file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    /// Re-roots a path-bearing error under `base`.
    ///
    /// Serializers report paths relative to the node they were handed; callers
    /// nesting them use this to report the full location.
    pub fn within(self, base: &ConfigPath) -> Self {
        if base.is_empty() {
            return self;
        }
        let prefix = |path: String| format!("{base}.{path}");
        match self {
            ConfigError::MissingField { path } => ConfigError::MissingField { path: prefix(path) },
            ConfigError::TypeMismatch {
                path,
                expected,
                found,
            } => ConfigError::TypeMismatch {
                path: prefix(path),
                expected,
                found,
            },
            ConfigError::InvalidColor { path, source } => ConfigError::InvalidColor {
                path: prefix(path),
                source,
            },
            ConfigError::Invalid { path, reason } => ConfigError::Invalid {
                path: prefix(path),
                reason,
            },
            other => other,
        }
    }
}

/// Errors that can occur during event stream operations.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    /// A listener with the same name is already subscribed
    #[error("Listener already subscribed: {0}")]
    AlreadySubscribed(String),
    /// A listener failed while handling an event
    #[error("Handler execution error: {0}")]
    HandlerExecution(String),
}

/// Errors raised by a module's own lifecycle hooks.
#[derive(Debug, thiserror::Error)]
pub enum ModuleError {
    /// The module factory could not build an instance
    #[error("Module construction failed: {0}")]
    Construction(String),
    /// The enable hook rejected activation
    #[error("Module enable failed: {0}")]
    Enable(String),
    /// The module failed to process an event
    #[error("Module event handling failed: {0}")]
    Event(String),
}

/// Errors returned by [`crate::ModuleRegistry`] registration.
///
/// Whatever the variant, the registry holds no entry for the contract after
/// the failed call.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The contract's factory failed
    #[error("Failed to construct module {contract}: {source}")]
    Construction {
        contract: &'static str,
        #[source]
        source: ModuleError,
    },
    /// The module does not support the running platform
    #[error("Module {module} does not support platform {platform}")]
    UnsupportedPlatform {
        module: String,
        platform: crate::types::PlatformKind,
    },
    /// Subscribing the module to the event stream failed
    #[error("Failed to subscribe module {module}: {source}")]
    Subscription {
        module: String,
        #[source]
        source: EventError,
    },
    /// The module's enable hook failed
    #[error("Failed to enable module {module}: {source}")]
    Enable {
        module: String,
        #[source]
        source: ModuleError,
    },
    /// An entry exists for the contract key but holds another handle type
    #[error("Registry entry for {0} holds an unexpected handle type")]
    ContractMismatch(&'static str),
}

/// Errors raised by the wire encoder and decoder.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The payload could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// The payload could not be deserialized
    #[error("Deserialization error: {0}")]
    Deserialization(serde_json::Error),
    /// The frame is empty
    #[error("Empty frame")]
    EmptyFrame,
    /// The frame starts with a tag no message kind uses
    #[error("Unknown message tag: {0}")]
    UnknownTag(u8),
    /// The message violates a field-level rule
    #[error("Invalid {kind} message: {reason}")]
    Invalid { kind: &'static str, reason: String },
}

/// Errors reported by a delivery transport.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// The transport failed to hand the payload to the connection
    #[error("Transport error: {0}")]
    Transport(String),
}

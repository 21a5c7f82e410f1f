//! # Lumen Core
//!
//! The module framework behind the Lumen server. A *module* bundles a set of
//! typed configuration options with behavior that pushes state to connected
//! clients.
//!
//! ## Core Features
//!
//! - **Module Registry**: at most one instance per module contract, with
//!   all-or-nothing registration
//! - **Config Synchronization**: typed options loaded from and saved to a
//!   hierarchical TOML tree, with failures isolated per option
//! - **Wire Delivery**: validated, tagged client messages sent to one player or
//!   broadcast to everyone connected
//!
//! ## Quick Start Example
//!
//! ```rust,ignore
//! use lumen_core::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let context = ModuleContext::new(PlatformKind::Server, Arc::new(RecordingTransport::new()));
//!     let registry = Arc::new(ModuleRegistry::new());
//!     registry.register::<dyn MyModule>(&context).await?;
//!
//!     let synchronizer = ConfigSynchronizer::new(Arc::clone(&registry));
//!     let tree = ConfigNode::load_file("modules.toml").await?;
//!     let report = synchronizer.load(&tree).await;
//!     for diagnostic in &report.diagnostics {
//!         eprintln!("{diagnostic}");
//!     }
//!
//!     context.register_player(PlayerId::new()).await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod context;
pub mod delivery;
pub mod domain;
pub mod error;
pub mod events;
pub mod module;
pub mod options;
pub mod protocol;
pub mod registry;
pub mod sync;
pub mod types;

pub use config::{ConfigNode, ConfigPath, NodeValue};
pub use context::ModuleContext;
pub use delivery::{ConnectedPlayer, DeliveryDispatcher, DeliveryTransport, PlayerDirectory};
#[cfg(any(test, feature = "test-util"))]
pub use delivery::RecordingTransport;
pub use domain::{
    DomainKind, DomainSerializer, DomainValue, ModSetting, ModSettingSerializer, Waypoint,
    WaypointSerializer,
};
pub use error::{ConfigError, DeliveryError, EventError, ModuleError, ProtocolError, RegistryError};
pub use events::{
    ConfigurationReloadedEvent, EventListener, EventSystem, EventSystemStats, ModuleEvent,
    PlayerRegisteredEvent, PlayerUnregisteredEvent,
};
pub use module::{Module, ModuleContract};
pub use options::{OptionBuilder, OptionDescriptor, OptionSet, OptionSpec, OptionType, OptionValue, ValueKind};
pub use protocol::{
    DisplayTitleMessage, DisplayWaypointMessage, EncodedMessage, MessageKind, ModSettingsMessage,
    OverrideOptionsMessage, RemoveWaypointMessage, ResetModSettingsMessage, ResetTitlesMessage,
    ResetWaypointsMessage, TitleType, WireMessage,
};
pub use registry::ModuleRegistry;
pub use sync::{ConfigSynchronizer, SyncDiagnostic, SyncPhase, SyncReport};
pub use types::{current_timestamp, BlockLocation, Color, ColorParseError, PlatformKind, PlayerId};

// Re-export async_trait so module crates implement `Module` with the same macro
pub use async_trait::async_trait;

/// Creates a module context and an empty registry for `platform`.
///
/// # Examples
///
/// ```rust
/// use lumen_core::{create_module_runtime, PlatformKind, RecordingTransport};
/// use std::sync::Arc;
///
/// let (context, registry) = create_module_runtime(PlatformKind::Server, Arc::new(RecordingTransport::new()));
/// assert_eq!(context.platform(), PlatformKind::Server);
/// drop(registry);
/// ```
pub fn create_module_runtime(
    platform: PlatformKind,
    transport: std::sync::Arc<dyn DeliveryTransport>,
) -> (ModuleContext, std::sync::Arc<ModuleRegistry>) {
    (
        ModuleContext::new(platform, transport),
        std::sync::Arc::new(ModuleRegistry::new()),
    )
}

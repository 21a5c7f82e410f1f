//! The module abstraction.
//!
//! A module is identified by its *contract*: a trait object type such as
//! `dyn WaypointModule`. The contract carries a compile-time factory through
//! [`ModuleContract`], so the concrete implementation can stay private to the
//! crate that provides it.

use crate::context::ModuleContext;
use crate::error::{EventError, ModuleError};
use crate::events::{EventListener, ModuleEvent};
use crate::options::OptionSet;
use crate::types::PlatformKind;
use async_trait::async_trait;
use std::sync::Arc;

/// Behavior shared by every module.
#[async_trait]
pub trait Module: Send + Sync + 'static {
    /// Human-readable name; also the module's config subtree key.
    fn name(&self) -> &str;

    /// Platforms the module can run on.
    fn supported_platforms(&self) -> &[PlatformKind] {
        &[PlatformKind::Server]
    }

    /// Whether the module's state is mirrored on clients.
    fn notify_client(&self) -> bool {
        false
    }

    /// The module's options, in declaration order.
    fn options(&self) -> &OptionSet;

    /// Called once, right after the module is subscribed to the event stream.
    async fn enable(&self, _context: &ModuleContext) -> Result<(), ModuleError> {
        Ok(())
    }

    /// Handles an event from the module event stream.
    async fn on_event(&self, _context: &ModuleContext, _event: &ModuleEvent) -> Result<(), ModuleError> {
        Ok(())
    }
}

/// A registrable module contract.
///
/// Implemented on the contract's trait object type. `construct` is the only
/// way the registry builds an instance when none is supplied.
///
/// # Examples
///
/// ```rust,ignore
/// pub trait GreeterModule: Module {
///     fn greeting(&self) -> String;
/// }
///
/// impl ModuleContract for dyn GreeterModule {
///     fn construct(context: &ModuleContext) -> Result<Arc<Self>, ModuleError> {
///         Ok(Arc::new(GreeterModuleImpl::new(context)))
///     }
///
///     fn into_module(this: Arc<Self>) -> Arc<dyn Module> {
///         this
///     }
/// }
/// ```
pub trait ModuleContract: Module {
    /// Builds the default implementation of the contract.
    fn construct(context: &ModuleContext) -> Result<Arc<Self>, ModuleError>;

    /// Views the contract handle as a plain module.
    fn into_module(this: Arc<Self>) -> Arc<dyn Module>;
}

/// Subscribes a module to the event stream under its own name.
pub(crate) struct ModuleListener {
    module: Arc<dyn Module>,
    name: String,
}

impl ModuleListener {
    pub(crate) fn new(module: Arc<dyn Module>) -> Self {
        let name = module.name().to_string();
        Self { module, name }
    }
}

#[async_trait]
impl EventListener for ModuleListener {
    fn listener_name(&self) -> &str {
        &self.name
    }

    async fn on_event(&self, context: &ModuleContext, event: &ModuleEvent) -> Result<(), EventError> {
        self.module
            .on_event(context, event)
            .await
            .map_err(|e| EventError::HandlerExecution(e.to_string()))
    }
}

//! Module registry.
//!
//! Holds at most one instance per module contract. Registration runs the full
//! construct, platform check, subscribe and enable sequence under the registry
//! write lock and records the module only when every step succeeded, so a
//! failed registration leaves nothing behind and concurrent registrations of
//! one contract build a single instance.

use crate::context::ModuleContext;
use crate::error::RegistryError;
use crate::module::{Module, ModuleContract, ModuleListener};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

struct ModuleEntry {
    module: Arc<dyn Module>,
    /// `Arc<C>` for the contract `C` the entry is keyed by
    handle: Box<dyn Any + Send + Sync>,
}

#[derive(Default)]
struct RegistryState {
    entries: HashMap<TypeId, ModuleEntry>,
    order: Vec<TypeId>,
}

/// Owns the enabled modules, keyed by contract type.
#[derive(Default)]
pub struct ModuleRegistry {
    state: RwLock<RegistryState>,
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleRegistry").field("modules", &"[modules]").finish()
    }
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers contract `C` using its factory.
    ///
    /// Returns the existing instance when `C` is already registered.
    ///
    /// # Returns
    ///
    /// The registered handle, or the first error of the construct, platform
    /// check, subscribe and enable sequence.
    pub async fn register<C>(&self, context: &ModuleContext) -> Result<Arc<C>, RegistryError>
    where
        C: ModuleContract + ?Sized,
    {
        self.install::<C>(context, None).await
    }

    /// Registers a pre-built instance for contract `C`.
    ///
    /// When `C` is already registered the supplied instance is dropped and the
    /// existing one is returned.
    pub async fn register_instance<C>(
        &self,
        context: &ModuleContext,
        instance: Arc<C>,
    ) -> Result<Arc<C>, RegistryError>
    where
        C: ModuleContract + ?Sized,
    {
        self.install::<C>(context, Some(instance)).await
    }

    async fn install<C>(
        &self,
        context: &ModuleContext,
        instance: Option<Arc<C>>,
    ) -> Result<Arc<C>, RegistryError>
    where
        C: ModuleContract + ?Sized,
    {
        let key = TypeId::of::<C>();
        let contract = std::any::type_name::<C>();
        let mut state = self.state.write().await;

        if let Some(entry) = state.entries.get(&key) {
            debug!("Module contract {} already registered", contract);
            return Self::downcast::<C>(entry, contract);
        }

        let instance = match instance {
            Some(instance) => instance,
            None => C::construct(context)
                .map_err(|source| RegistryError::Construction { contract, source })?,
        };
        let module = C::into_module(Arc::clone(&instance));
        let name = module.name().to_string();

        let platform = context.platform();
        if !module.supported_platforms().contains(&platform) {
            return Err(RegistryError::UnsupportedPlatform { module: name, platform });
        }

        let listener = Arc::new(ModuleListener::new(Arc::clone(&module)));
        context
            .events()
            .subscribe(listener)
            .await
            .map_err(|source| RegistryError::Subscription {
                module: name.clone(),
                source,
            })?;

        if let Err(source) = module.enable(context).await {
            warn!("Module {} failed to enable, unsubscribing", name);
            context.events().unsubscribe(&name).await;
            return Err(RegistryError::Enable { module: name, source });
        }

        state.entries.insert(
            key,
            ModuleEntry {
                module,
                handle: Box::new(Arc::clone(&instance)),
            },
        );
        state.order.push(key);
        info!("🔌 Module {} enabled", name);
        Ok(instance)
    }

    fn downcast<C>(entry: &ModuleEntry, contract: &'static str) -> Result<Arc<C>, RegistryError>
    where
        C: ModuleContract + ?Sized,
    {
        (*entry.handle)
            .downcast_ref::<Arc<C>>()
            .cloned()
            .ok_or(RegistryError::ContractMismatch(contract))
    }

    pub async fn is_enabled<C>(&self) -> bool
    where
        C: ModuleContract + ?Sized,
    {
        self.state.read().await.entries.contains_key(&TypeId::of::<C>())
    }

    pub async fn lookup<C>(&self) -> Option<Arc<C>>
    where
        C: ModuleContract + ?Sized,
    {
        let state = self.state.read().await;
        let entry = state.entries.get(&TypeId::of::<C>())?;
        Self::downcast::<C>(entry, std::any::type_name::<C>()).ok()
    }

    /// Registered modules in registration order.
    pub async fn modules(&self) -> Vec<Arc<dyn Module>> {
        let state = self.state.read().await;
        state
            .order
            .iter()
            .filter_map(|key| state.entries.get(key))
            .map(|entry| Arc::clone(&entry.module))
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.entries.is_empty()
    }
}

//! Module event stream.
//!
//! The [`EventSystem`] fans a closed set of [`ModuleEvent`]s out to subscribed
//! listeners. Listeners run in subscription order against a snapshot of the
//! subscriber list, so subscribing or unsubscribing while an event is in flight
//! never affects that event. A failing listener is logged and counted; the
//! emitter never sees the error.

use crate::context::ModuleContext;
use crate::error::EventError;
use crate::types::{current_timestamp, PlayerId};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

// ============================================================================
// Events
// ============================================================================

/// A player finished registering and can now receive messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerRegisteredEvent {
    pub player_id: PlayerId,
    pub timestamp: u64,
}

/// A player left; it no longer receives messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerUnregisteredEvent {
    pub player_id: PlayerId,
    pub timestamp: u64,
}

/// The module configuration was reloaded from the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationReloadedEvent {
    /// Options assigned by the reload
    pub loaded: usize,
    /// Leaves that failed to decode
    pub failures: usize,
    pub timestamp: u64,
}

/// Every event that flows through the module event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleEvent {
    PlayerRegistered(PlayerRegisteredEvent),
    PlayerUnregistered(PlayerUnregisteredEvent),
    ConfigurationReloaded(ConfigurationReloadedEvent),
}

impl ModuleEvent {
    pub fn player_registered(player_id: PlayerId) -> Self {
        ModuleEvent::PlayerRegistered(PlayerRegisteredEvent {
            player_id,
            timestamp: current_timestamp(),
        })
    }

    pub fn player_unregistered(player_id: PlayerId) -> Self {
        ModuleEvent::PlayerUnregistered(PlayerUnregisteredEvent {
            player_id,
            timestamp: current_timestamp(),
        })
    }

    pub fn configuration_reloaded(loaded: usize, failures: usize) -> Self {
        ModuleEvent::ConfigurationReloaded(ConfigurationReloadedEvent {
            loaded,
            failures,
            timestamp: current_timestamp(),
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            ModuleEvent::PlayerRegistered(_) => "player_registered",
            ModuleEvent::PlayerUnregistered(_) => "player_unregistered",
            ModuleEvent::ConfigurationReloaded(_) => "configuration_reloaded",
        }
    }
}

// ============================================================================
// Listeners
// ============================================================================

/// A subscriber to the module event stream.
#[async_trait]
pub trait EventListener: Send + Sync {
    /// Unique name of the listener within one [`EventSystem`].
    fn listener_name(&self) -> &str;

    /// Handles an event.
    ///
    /// # Arguments
    ///
    /// * `context` - The context the event was emitted through
    /// * `event` - The event being delivered
    async fn on_event(&self, context: &ModuleContext, event: &ModuleEvent) -> Result<(), EventError>;
}

/// Statistics about the event stream.
#[derive(Debug, Clone, Default)]
pub struct EventSystemStats {
    /// Currently subscribed listeners
    pub total_listeners: usize,
    /// Events emitted since startup
    pub events_emitted: u64,
    /// Listener invocations that returned an error
    pub listener_failures: u64,
}

/// The shared module event stream.
pub struct EventSystem {
    listeners: RwLock<Vec<Arc<dyn EventListener>>>,
    stats: RwLock<EventSystemStats>,
}

impl std::fmt::Debug for EventSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSystem")
            .field("listeners", &"[listeners]")
            .field("stats", &"[stats]")
            .finish()
    }
}

impl Default for EventSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSystem {
    /// Creates an event system with no listeners.
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
            stats: RwLock::new(EventSystemStats::default()),
        }
    }

    /// Subscribes a listener. Names are unique.
    pub async fn subscribe(&self, listener: Arc<dyn EventListener>) -> Result<(), EventError> {
        let mut listeners = self.listeners.write().await;
        let name = listener.listener_name().to_string();
        if listeners.iter().any(|existing| existing.listener_name() == name) {
            return Err(EventError::AlreadySubscribed(name));
        }
        listeners.push(listener);

        let mut stats = self.stats.write().await;
        stats.total_listeners = listeners.len();
        info!("📝 Subscribed listener '{}'", name);
        Ok(())
    }

    /// Removes the listener named `name`, returning whether it was subscribed.
    pub async fn unsubscribe(&self, name: &str) -> bool {
        let mut listeners = self.listeners.write().await;
        let before = listeners.len();
        listeners.retain(|listener| listener.listener_name() != name);
        let removed = listeners.len() != before;

        if removed {
            let mut stats = self.stats.write().await;
            stats.total_listeners = listeners.len();
            debug!("Unsubscribed listener '{}'", name);
        }
        removed
    }

    pub async fn is_subscribed(&self, name: &str) -> bool {
        self.listeners
            .read()
            .await
            .iter()
            .any(|listener| listener.listener_name() == name)
    }

    pub async fn listener_count(&self) -> usize {
        self.listeners.read().await.len()
    }

    /// Delivers `event` to every listener subscribed at call time.
    pub async fn emit(&self, context: &ModuleContext, event: ModuleEvent) {
        let snapshot: Vec<Arc<dyn EventListener>> = self.listeners.read().await.clone();
        debug!("📤 Emitting {} to {} listeners", event.name(), snapshot.len());

        let mut failures = 0u64;
        for listener in &snapshot {
            if let Err(e) = listener.on_event(context, &event).await {
                error!("❌ Listener {} failed on {}: {}", listener.listener_name(), event.name(), e);
                failures += 1;
            }
        }

        let mut stats = self.stats.write().await;
        stats.events_emitted += 1;
        stats.listener_failures += failures;
    }

    pub async fn get_stats(&self) -> EventSystemStats {
        self.stats.read().await.clone()
    }
}

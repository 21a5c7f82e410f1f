//! The explicit context handed to modules.
//!
//! A [`ModuleContext`] bundles the event stream, the player directory, the
//! delivery dispatcher and the platform the process runs as. It is cheap to
//! clone and is passed into module construction and into every event
//! dispatch.

use crate::delivery::{DeliveryDispatcher, DeliveryTransport, PlayerDirectory};
use crate::events::{EventSystem, ModuleEvent};
use crate::types::{PlatformKind, PlayerId};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone)]
pub struct ModuleContext {
    events: Arc<EventSystem>,
    players: Arc<PlayerDirectory>,
    dispatcher: Arc<DeliveryDispatcher>,
    platform: PlatformKind,
}

impl ModuleContext {
    /// Creates a context with a fresh event stream and player directory.
    pub fn new(platform: PlatformKind, transport: Arc<dyn DeliveryTransport>) -> Self {
        let players = Arc::new(PlayerDirectory::new());
        let dispatcher = Arc::new(DeliveryDispatcher::new(Arc::clone(&players), transport));
        Self {
            events: Arc::new(EventSystem::new()),
            players,
            dispatcher,
            platform,
        }
    }

    pub fn events(&self) -> &Arc<EventSystem> {
        &self.events
    }

    pub fn players(&self) -> &Arc<PlayerDirectory> {
        &self.players
    }

    pub fn dispatcher(&self) -> &Arc<DeliveryDispatcher> {
        &self.dispatcher
    }

    pub fn platform(&self) -> PlatformKind {
        self.platform
    }

    /// Connects a player and announces it to every listener.
    ///
    /// The player is connected before the event fires, so listeners can
    /// address it right away. Registering an already connected player is a
    /// no-op.
    pub async fn register_player(&self, player_id: PlayerId) {
        if !self.players.connect(player_id) {
            return;
        }
        info!("👤 Player {} registered", player_id);
        self.emit(ModuleEvent::player_registered(player_id)).await;
    }

    /// Disconnects a player and announces its departure.
    pub async fn unregister_player(&self, player_id: PlayerId) {
        if !self.players.disconnect(player_id) {
            return;
        }
        info!("👋 Player {} unregistered", player_id);
        self.emit(ModuleEvent::player_unregistered(player_id)).await;
    }

    pub async fn emit(&self, event: ModuleEvent) {
        self.events.emit(self, event).await;
    }
}

//! Waypoints module.
//!
//! Pushes world markers to clients and replays the configured default markers
//! to every player that registers.

use async_trait::async_trait;
use lumen_core::delivery::DeliveryDispatcher;
use lumen_core::{
    DisplayWaypointMessage, Module, ModuleContext, ModuleContract, ModuleError, ModuleEvent,
    OptionDescriptor, OptionSet, PlayerId, RemoveWaypointMessage, Waypoint, WireMessage,
};
use once_cell::sync::Lazy;
use std::sync::Arc;
use tracing::debug;

/// Lets servers handle waypoints instead of the client.
pub static SERVER_HANDLES_WAYPOINTS: Lazy<OptionDescriptor<bool>> = Lazy::new(|| {
    OptionDescriptor::builder(["server-handles-waypoints"], false)
        .comment("Set to 'true' to let servers handle waypoints, otherwise 'false'.")
        .notify_client()
        .build()
});

/// Waypoints sent to each player when it registers. Null sends nothing.
pub static DEFAULT_WAYPOINTS: Lazy<OptionDescriptor<Option<Vec<Waypoint>>>> = Lazy::new(|| {
    OptionDescriptor::builder(["default-waypoints"], Some(Vec::new()))
        .comment("Sets the default waypoints to send to the player.")
        .build()
});

/// Waypoint management for connected players.
#[async_trait]
pub trait WaypointModule: Module {
    /// Shows `waypoint` to `viewer`.
    async fn display_waypoint(&self, viewer: PlayerId, waypoint: &Waypoint);

    /// Removes the waypoint called `name` from `viewer`.
    async fn remove_waypoint(&self, viewer: PlayerId, name: &str);

    /// Removes `waypoint` from `viewer`, matching it by name.
    async fn remove_waypoint_entry(&self, viewer: PlayerId, waypoint: &Waypoint) {
        self.remove_waypoint(viewer, &waypoint.name).await;
    }

    /// Removes every waypoint from `viewer`.
    async fn reset_waypoints(&self, viewer: PlayerId);
}

impl ModuleContract for dyn WaypointModule {
    fn construct(context: &ModuleContext) -> Result<Arc<Self>, ModuleError> {
        Ok(Arc::new(WaypointModuleImpl::new(Arc::clone(context.dispatcher()))))
    }

    fn into_module(this: Arc<Self>) -> Arc<dyn Module> {
        this
    }
}

pub(crate) struct WaypointModuleImpl {
    dispatcher: Arc<DeliveryDispatcher>,
    options: OptionSet,
}

impl WaypointModuleImpl {
    fn new(dispatcher: Arc<DeliveryDispatcher>) -> Self {
        let mut options = OptionSet::new();
        options
            .register(&SERVER_HANDLES_WAYPOINTS)
            .register(&DEFAULT_WAYPOINTS);
        Self { dispatcher, options }
    }

    fn to_message(waypoint: &Waypoint) -> WireMessage {
        WireMessage::DisplayWaypoint(DisplayWaypointMessage {
            name: waypoint.name.clone(),
            location: waypoint.location.clone(),
            color: waypoint.color.argb(),
            prevent_removal: waypoint.prevent_removal,
            visible: waypoint.visible,
        })
    }

    async fn replay_defaults(&self, player_id: PlayerId) {
        let Some(waypoints) = self.options.get(&DEFAULT_WAYPOINTS) else {
            return;
        };

        debug!("Replaying {} default waypoints to {}", waypoints.len(), player_id);
        for waypoint in &waypoints {
            self.dispatcher.unicast(player_id, &Self::to_message(waypoint)).await;
        }
    }
}

#[async_trait]
impl Module for WaypointModuleImpl {
    fn name(&self) -> &str {
        "Waypoints"
    }

    fn notify_client(&self) -> bool {
        true
    }

    fn options(&self) -> &OptionSet {
        &self.options
    }

    async fn on_event(&self, _context: &ModuleContext, event: &ModuleEvent) -> Result<(), ModuleError> {
        if let ModuleEvent::PlayerRegistered(registered) = event {
            self.replay_defaults(registered.player_id).await;
        }
        Ok(())
    }
}

#[async_trait]
impl WaypointModule for WaypointModuleImpl {
    async fn display_waypoint(&self, viewer: PlayerId, waypoint: &Waypoint) {
        self.dispatcher.unicast(viewer, &Self::to_message(waypoint)).await;
    }

    async fn remove_waypoint(&self, viewer: PlayerId, name: &str) {
        let message = WireMessage::RemoveWaypoint(RemoveWaypointMessage {
            name: name.to_string(),
        });
        self.dispatcher.unicast(viewer, &message).await;
    }

    async fn reset_waypoints(&self, viewer: PlayerId) {
        self.dispatcher.unicast(viewer, &WireMessage::reset_waypoints()).await;
    }
}

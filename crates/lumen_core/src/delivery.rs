//! Message delivery to connected players.
//!
//! The [`DeliveryDispatcher`] encodes a [`WireMessage`] once per call and hands
//! the resulting frame to a [`DeliveryTransport`]. Delivery is fire-and-forget:
//! encode and transport failures are logged, never retried, never returned.

use crate::error::DeliveryError;
use crate::protocol::{EncodedMessage, WireMessage};
use crate::types::PlayerId;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, warn};

/// Hands encoded frames to player connections.
#[async_trait]
pub trait DeliveryTransport: Send + Sync + std::fmt::Debug {
    async fn send(&self, recipient: PlayerId, message: EncodedMessage) -> Result<(), DeliveryError>;
}

// ============================================================================
// Player directory
// ============================================================================

#[derive(Debug, Clone)]
pub struct ConnectedPlayer {
    pub player_id: PlayerId,
    pub connected_at: SystemTime,
}

/// Players currently able to receive messages.
#[derive(Debug, Default)]
pub struct PlayerDirectory {
    players: DashMap<PlayerId, ConnectedPlayer>,
}

impl PlayerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a player connected. Returns `false` when it already was.
    pub fn connect(&self, player_id: PlayerId) -> bool {
        let mut inserted = false;
        self.players.entry(player_id).or_insert_with(|| {
            inserted = true;
            ConnectedPlayer {
                player_id,
                connected_at: SystemTime::now(),
            }
        });
        inserted
    }

    /// Marks a player disconnected. Returns `false` when it was not connected.
    pub fn disconnect(&self, player_id: PlayerId) -> bool {
        self.players.remove(&player_id).is_some()
    }

    pub fn is_connected(&self, player_id: PlayerId) -> bool {
        self.players.contains_key(&player_id)
    }

    pub fn get(&self, player_id: PlayerId) -> Option<ConnectedPlayer> {
        self.players.get(&player_id).map(|entry| entry.value().clone())
    }

    /// Point-in-time list of connected players.
    pub fn snapshot(&self) -> Vec<PlayerId> {
        self.players.iter().map(|entry| *entry.key()).collect()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Sends wire messages to one or all connected players.
#[derive(Debug)]
pub struct DeliveryDispatcher {
    players: Arc<PlayerDirectory>,
    transport: Arc<dyn DeliveryTransport>,
}

impl DeliveryDispatcher {
    pub fn new(players: Arc<PlayerDirectory>, transport: Arc<dyn DeliveryTransport>) -> Self {
        Self { players, transport }
    }

    pub fn players(&self) -> &Arc<PlayerDirectory> {
        &self.players
    }

    /// Sends `message` to `recipient`; does nothing if it is not connected.
    pub async fn unicast(&self, recipient: PlayerId, message: &WireMessage) {
        if !self.players.is_connected(recipient) {
            debug!("Skipping {} for {}: not connected", message.kind(), recipient);
            return;
        }

        match message.encode() {
            Ok(encoded) => self.deliver(recipient, encoded).await,
            Err(e) => warn!("Failed to encode {} for {}: {}", message.kind(), recipient, e),
        }
    }

    /// Sends `message` to every player connected when the call starts.
    ///
    /// The message is encoded once and every recipient gets the same frame.
    /// Players that leave during the broadcast are skipped; players that join
    /// during it receive nothing.
    pub async fn broadcast(&self, message: &WireMessage) {
        let encoded = match message.encode() {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!("Failed to encode {} for broadcast: {}", message.kind(), e);
                return;
            }
        };

        let recipients = self.players.snapshot();
        debug!("📡 Broadcasting {} to {} players", encoded.kind(), recipients.len());
        for recipient in recipients {
            if !self.players.is_connected(recipient) {
                continue;
            }
            self.deliver(recipient, encoded.clone()).await;
        }
    }

    async fn deliver(&self, recipient: PlayerId, encoded: EncodedMessage) {
        let kind = encoded.kind();
        match self.transport.send(recipient, encoded).await {
            Ok(()) => debug!("Sent {} to {}", kind, recipient),
            Err(e) => warn!("Failed to send {} to {}: {}", kind, recipient, e),
        }
    }
}

// ============================================================================
// In-memory transport
// ============================================================================

/// Transport that keeps every frame it is handed, in send order.
///
/// Available to tests and with the `test-util` feature.
#[cfg(any(test, feature = "test-util"))]
#[derive(Debug, Default)]
pub struct RecordingTransport {
    sent: std::sync::Mutex<Vec<(PlayerId, EncodedMessage)>>,
}

#[cfg(any(test, feature = "test-util"))]
impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every frame sent so far.
    pub fn sent(&self) -> Vec<(PlayerId, EncodedMessage)> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }

    /// Frames sent to `recipient`, in order.
    pub fn sent_to(&self, recipient: PlayerId) -> Vec<EncodedMessage> {
        self.sent()
            .into_iter()
            .filter(|(player_id, _)| *player_id == recipient)
            .map(|(_, message)| message)
            .collect()
    }

    pub fn clear(&self) {
        if let Ok(mut sent) = self.sent.lock() {
            sent.clear();
        }
    }
}

#[cfg(any(test, feature = "test-util"))]
#[async_trait]
impl DeliveryTransport for RecordingTransport {
    async fn send(&self, recipient: PlayerId, message: EncodedMessage) -> Result<(), DeliveryError> {
        self.sent
            .lock()
            .map_err(|e| DeliveryError::Transport(e.to_string()))?
            .push((recipient, message));
        Ok(())
    }
}

//! Delivery transport used by the standalone server.
//!
//! The server has no client connections of its own, so frames are traced
//! instead of written to a socket.

use async_trait::async_trait;
use lumen_core::{DeliveryError, DeliveryTransport, EncodedMessage, PlayerId};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

#[derive(Debug, Default)]
pub struct LoggingTransport {
    frames: AtomicU64,
}

impl LoggingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of frames handed to the transport so far.
    pub fn frames_sent(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl DeliveryTransport for LoggingTransport {
    async fn send(&self, recipient: PlayerId, message: EncodedMessage) -> Result<(), DeliveryError> {
        self.frames.fetch_add(1, Ordering::Relaxed);
        debug!(
            recipient = %recipient,
            kind = %message.kind(),
            bytes = message.len(),
            "📨 Outbound frame"
        );
        Ok(())
    }
}

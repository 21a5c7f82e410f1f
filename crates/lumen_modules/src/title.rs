//! Titles module.

use async_trait::async_trait;
use lumen_core::delivery::DeliveryDispatcher;
use lumen_core::{
    DisplayTitleMessage, Module, ModuleContext, ModuleContract, ModuleError,
    OptionSet, PlatformKind, PlayerId, TitleType, WireMessage,
};
use std::sync::Arc;
use std::time::Duration;

/// A title or subtitle shown on the client's screen.
#[derive(Debug, Clone, PartialEq)]
pub struct Title {
    pub kind: TitleType,
    pub message: String,
    pub scale: f32,
    pub fade_in: Duration,
    pub display: Duration,
    pub fade_out: Duration,
}

impl Title {
    /// A full-size title with vanilla timings.
    pub fn new(kind: TitleType, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            scale: 1.0,
            fade_in: Duration::from_millis(500),
            display: Duration::from_millis(3500),
            fade_out: Duration::from_millis(1000),
        }
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_timings(mut self, fade_in: Duration, display: Duration, fade_out: Duration) -> Self {
        self.fade_in = fade_in;
        self.display = display;
        self.fade_out = fade_out;
        self
    }

    fn to_message(&self) -> WireMessage {
        let millis = |duration: Duration| u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        WireMessage::DisplayTitle(DisplayTitleMessage {
            title_type: self.kind,
            message: self.message.clone(),
            scale: self.scale,
            fade_in_ms: millis(self.fade_in),
            display_ms: millis(self.display),
            fade_out_ms: millis(self.fade_out),
        })
    }
}

/// On-screen titles for connected players.
#[async_trait]
pub trait TitleModule: Module {
    async fn display_title(&self, viewer: PlayerId, title: &Title);

    /// Shows `title` to every connected player.
    async fn broadcast_title(&self, title: &Title);

    /// Clears any title `viewer` is currently seeing.
    async fn reset_titles(&self, viewer: PlayerId);
}

impl ModuleContract for dyn TitleModule {
    fn construct(context: &ModuleContext) -> Result<Arc<Self>, ModuleError> {
        Ok(Arc::new(TitleModuleImpl {
            dispatcher: Arc::clone(context.dispatcher()),
            options: OptionSet::new(),
        }))
    }

    fn into_module(this: Arc<Self>) -> Arc<dyn Module> {
        this
    }
}

pub(crate) struct TitleModuleImpl {
    dispatcher: Arc<DeliveryDispatcher>,
    options: OptionSet,
}

#[async_trait]
impl Module for TitleModuleImpl {
    fn name(&self) -> &str {
        "Titles"
    }

    fn supported_platforms(&self) -> &[PlatformKind] {
        &[PlatformKind::Server, PlatformKind::Proxy]
    }

    fn options(&self) -> &OptionSet {
        &self.options
    }
}

#[async_trait]
impl TitleModule for TitleModuleImpl {
    async fn display_title(&self, viewer: PlayerId, title: &Title) {
        self.dispatcher.unicast(viewer, &title.to_message()).await;
    }

    async fn broadcast_title(&self, title: &Title) {
        self.dispatcher.broadcast(&title.to_message()).await;
    }

    async fn reset_titles(&self, viewer: PlayerId) {
        self.dispatcher.unicast(viewer, &WireMessage::reset_titles()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_durations_are_sent_in_millis() {
        let title = Title::new(TitleType::Subtitle, "Hello").with_timings(
            Duration::from_secs(1),
            Duration::from_millis(2500),
            Duration::ZERO,
        );
        match title.to_message() {
            WireMessage::DisplayTitle(message) => {
                assert_eq!(message.title_type, TitleType::Subtitle);
                assert_eq!(message.fade_in_ms, 1000);
                assert_eq!(message.display_ms, 2500);
                assert_eq!(message.fade_out_ms, 0);
            }
            other => panic!("unexpected message {other:?}"),
        }
    }
}

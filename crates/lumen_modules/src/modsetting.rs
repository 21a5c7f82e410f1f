//! Mod settings module.
//!
//! Overrides client-side mod settings. The configured `settings` list is
//! mirrored on clients, so a reload that changes it is pushed to everyone
//! connected.

use async_trait::async_trait;
use lumen_core::delivery::DeliveryDispatcher;
use lumen_core::{
    ModSetting, ModSettingsMessage, Module, ModuleContext, ModuleContract, ModuleError,
    OptionDescriptor, OptionSet, PlatformKind, PlayerId, WireMessage,
};
use once_cell::sync::Lazy;
use std::sync::Arc;
use tracing::debug;

/// Settings sent to clients. Defaults to a disabled SkyblockAddons entry.
pub static MOD_SETTINGS: Lazy<OptionDescriptor<Vec<ModSetting>>> = Lazy::new(|| {
    OptionDescriptor::builder(["settings"], vec![ModSetting::new("skyblockAddons")])
        .comment("A list of mod settings to send to the client.")
        .notify_client()
        .build()
});

/// Mod setting overrides for connected players.
#[async_trait]
pub trait ModSettingModule: Module {
    /// Sends `settings` to `viewer`.
    async fn send_settings(&self, viewer: PlayerId, settings: &[ModSetting]);

    /// Drops every override `viewer` received.
    async fn reset_settings(&self, viewer: PlayerId);

    /// Sends `settings` to every connected player.
    async fn broadcast_settings(&self, settings: &[ModSetting]);
}

impl ModuleContract for dyn ModSettingModule {
    fn construct(context: &ModuleContext) -> Result<Arc<Self>, ModuleError> {
        let mut options = OptionSet::new();
        options.register(&MOD_SETTINGS);
        Ok(Arc::new(ModSettingModuleImpl {
            dispatcher: Arc::clone(context.dispatcher()),
            options,
        }))
    }

    fn into_module(this: Arc<Self>) -> Arc<dyn Module> {
        this
    }
}

pub(crate) struct ModSettingModuleImpl {
    dispatcher: Arc<DeliveryDispatcher>,
    options: OptionSet,
}

fn settings_message(settings: &[ModSetting]) -> WireMessage {
    WireMessage::ModSettings(ModSettingsMessage {
        settings: settings.to_vec(),
    })
}

#[async_trait]
impl Module for ModSettingModuleImpl {
    fn name(&self) -> &str {
        "ModSettings"
    }

    fn supported_platforms(&self) -> &[PlatformKind] {
        &[PlatformKind::Server, PlatformKind::Proxy]
    }

    fn notify_client(&self) -> bool {
        true
    }

    fn options(&self) -> &OptionSet {
        &self.options
    }
}

#[async_trait]
impl ModSettingModule for ModSettingModuleImpl {
    async fn send_settings(&self, viewer: PlayerId, settings: &[ModSetting]) {
        self.dispatcher.unicast(viewer, &settings_message(settings)).await;
    }

    async fn reset_settings(&self, viewer: PlayerId) {
        self.dispatcher.unicast(viewer, &WireMessage::reset_mod_settings()).await;
    }

    async fn broadcast_settings(&self, settings: &[ModSetting]) {
        debug!("Broadcasting {} mod settings", settings.len());
        self.dispatcher.broadcast(&settings_message(settings)).await;
    }
}

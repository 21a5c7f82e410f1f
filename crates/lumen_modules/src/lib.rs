//! # Lumen Modules
//!
//! The modules shipped with the Lumen server. Each module is exposed as a
//! contract trait; implementations are private and built by the registry.
//!
//! - [`WaypointModule`] (`Waypoints`) - world markers, with defaults replayed on join
//! - [`TitleModule`] (`Titles`) - on-screen titles and subtitles
//! - [`ModSettingModule`] (`ModSettings`) - client mod setting overrides

pub mod modsetting;
pub mod title;
pub mod waypoint;

pub use modsetting::{ModSettingModule, MOD_SETTINGS};
pub use title::{Title, TitleModule};
pub use waypoint::{WaypointModule, DEFAULT_WAYPOINTS, SERVER_HANDLES_WAYPOINTS};

use lumen_core::{ModuleContext, ModuleRegistry, RegistryError};
use tracing::info;

/// Registers every built-in module supported on the context's platform.
///
/// Modules that do not support the platform are skipped; any other
/// registration failure is returned.
pub async fn register_builtin_modules(
    registry: &ModuleRegistry,
    context: &ModuleContext,
) -> Result<(), RegistryError> {
    skip_unsupported(registry.register::<dyn WaypointModule>(context).await.map(drop))?;
    skip_unsupported(registry.register::<dyn TitleModule>(context).await.map(drop))?;
    skip_unsupported(registry.register::<dyn ModSettingModule>(context).await.map(drop))?;
    info!("🧩 Registered {} built-in modules", registry.len().await);
    Ok(())
}

fn skip_unsupported(result: Result<(), RegistryError>) -> Result<(), RegistryError> {
    match result {
        Err(RegistryError::UnsupportedPlatform { module, platform }) => {
            info!("Skipping module {} on {}", module, platform);
            Ok(())
        }
        other => other,
    }
}

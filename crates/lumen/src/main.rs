//! Main application entry point for the Lumen server.
//!
//! Boot sequence: load the application config, register the built-in modules,
//! load module options from the module config file, write the file back so
//! every option is present, then wait for a shutdown signal.

mod cli;
mod config;
mod logging;
mod signals;
mod transport;

use anyhow::{Context, Result};
use cli::CliArgs;
use config::AppConfig;
use lumen_core::{ConfigNode, ConfigSynchronizer, ModuleContext, ModuleRegistry, SyncReport};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use transport::LoggingTransport;

/// The running server.
pub struct Application {
    config: AppConfig,
    modules_path: PathBuf,
    context: ModuleContext,
    registry: Arc<ModuleRegistry>,
    synchronizer: ConfigSynchronizer,
    transport: Arc<LoggingTransport>,
}

impl Application {
    /// Loads configuration, applies CLI overrides and sets up logging.
    pub async fn new(args: CliArgs) -> Result<Self> {
        let mut config = AppConfig::load_from_file(&args.config_path)
            .await
            .with_context(|| format!("failed to load {}", args.config_path.display()))?;

        if let Some(modules_config) = args.modules_config {
            config.server.modules_config = modules_config.to_string_lossy().to_string();
        }
        if let Some(log_level) = args.log_level {
            config.logging.level = log_level;
        }
        if args.json_logs {
            config.logging.json_format = true;
        }
        if let Some(platform) = args.platform {
            config.server.platform = platform;
        }

        config
            .validate()
            .map_err(|e| anyhow::anyhow!("Configuration validation failed: {e}"))?;
        logging::setup_logging(&config.logging)?;

        let transport = Arc::new(LoggingTransport::new());
        let context = ModuleContext::new(config.server.platform, transport.clone());
        let registry = Arc::new(ModuleRegistry::new());
        let synchronizer = ConfigSynchronizer::new(Arc::clone(&registry));

        info!("🚀 Lumen Server v{}", env!("CARGO_PKG_VERSION"));
        info!(
            "📂 Config: {} | Modules: {} | Platform: {}",
            args.config_path.display(),
            config.server.modules_config,
            config.server.platform
        );

        Ok(Self {
            modules_path: config.modules_config_path(),
            config,
            context,
            registry,
            synchronizer,
            transport,
        })
    }

    /// Registers modules, synchronizes their options and serves until shutdown.
    pub async fn run(self) -> Result<()> {
        lumen_modules::register_builtin_modules(&self.registry, &self.context).await?;

        let tree = ConfigNode::load_file(&self.modules_path)
            .await
            .with_context(|| format!("failed to read {}", self.modules_path.display()))?;
        let report = self.synchronizer.reload(&self.context, &tree).await;
        log_report("load", &report);

        self.persist(tree).await?;

        info!("✅ Lumen is ready with {} modules", self.registry.len().await);
        signals::wait_for_shutdown().await?;

        info!("🛑 Shutting down");
        if self.config.server.save_on_shutdown {
            let tree = ConfigNode::load_file(&self.modules_path).await?;
            self.persist(tree).await?;
        }

        let stats = self.context.events().get_stats().await;
        info!(
            "📊 Events emitted: {} | Listener failures: {} | Frames sent: {}",
            stats.events_emitted,
            stats.listener_failures,
            self.transport.frames_sent()
        );
        Ok(())
    }

    /// Writes current option values into `tree` and saves it.
    async fn persist(&self, mut tree: ConfigNode) -> Result<()> {
        let report = self.synchronizer.save(&mut tree).await;
        log_report("save", &report);
        tree.save_file(&self.modules_path)
            .await
            .with_context(|| format!("failed to write {}", self.modules_path.display()))?;
        Ok(())
    }
}

fn log_report(phase: &str, report: &SyncReport) {
    if !report.is_clean() {
        warn!("Module config {} finished with {} problems", phase, report.diagnostics.len());
    }
    info!(
        "🔄 Module config {}: {} loaded, {} saved",
        phase, report.loaded, report.saved
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    let app = Application::new(args).await?;
    app.run().await
}

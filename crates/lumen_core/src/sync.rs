//! Configuration synchronizer.
//!
//! Walks every registered module's [`OptionSet`](crate::OptionSet) against a
//! [`ConfigNode`] tree laid out as `<module name>.<option path...>`.
//!
//! Failures are isolated per option: a leaf that cannot be decoded or written
//! becomes a [`SyncDiagnostic`] in the returned [`SyncReport`] and the pass
//! carries on with the remaining options and modules.

use crate::config::{ConfigNode, ConfigPath};
use crate::context::ModuleContext;
use crate::error::ConfigError;
use crate::events::ModuleEvent;
use crate::module::Module;
use crate::options::OptionValue;
use crate::protocol::{OverrideOptionsMessage, WireMessage};
use crate::registry::ModuleRegistry;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Which half of a sync pass produced a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Load,
    Save,
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncPhase::Load => f.write_str("load"),
            SyncPhase::Save => f.write_str("save"),
        }
    }
}

/// A non-fatal failure on a single option.
#[derive(Debug)]
pub struct SyncDiagnostic {
    pub module: String,
    /// Path of the option below the module subtree
    pub option: ConfigPath,
    pub phase: SyncPhase,
    pub error: ConfigError,
}

impl fmt::Display for SyncDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {}.{} failed: {}",
            self.phase, self.module, self.option, self.error
        )
    }
}

/// Outcome of a load or save pass.
#[derive(Debug, Default)]
pub struct SyncReport {
    /// Options assigned from the tree
    pub loaded: usize,
    /// Options written to the tree
    pub saved: usize,
    /// Modules without a subtree during load
    pub skipped_modules: Vec<String>,
    pub diagnostics: Vec<SyncDiagnostic>,
}

impl SyncReport {
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Keeps module options and a config tree in step.
#[derive(Debug, Clone)]
pub struct ConfigSynchronizer {
    registry: Arc<ModuleRegistry>,
}

impl ConfigSynchronizer {
    pub fn new(registry: Arc<ModuleRegistry>) -> Self {
        Self { registry }
    }

    /// Populates option sets from `tree`.
    ///
    /// A module without a subtree is skipped entirely and an option without a
    /// node keeps its value. A node that fails to decode is reported and the
    /// option keeps its current value. Each module's new values are published
    /// in a single swap.
    pub async fn load(&self, tree: &ConfigNode) -> SyncReport {
        let mut report = SyncReport::default();

        for module in self.registry.modules().await {
            let name = module.name();
            let Some(subtree) = tree.child(&[name]) else {
                debug!("No configuration for module {}, keeping current values", name);
                report.skipped_modules.push(name.to_string());
                continue;
            };

            let options = module.options();
            let mut updates = Vec::new();
            for spec in options.descriptors() {
                let Some(node) = subtree.child(spec.path().segments()) else {
                    continue;
                };

                let path = ConfigPath::root().child(name).join(spec.path());
                match spec.kind().decode(node, &path) {
                    Ok(value) => updates.push((spec.path().clone(), value)),
                    Err(error) => {
                        warn!("⚠️ Failed to load {}: {}", path, error);
                        report.diagnostics.push(SyncDiagnostic {
                            module: name.to_string(),
                            option: spec.path().clone(),
                            phase: SyncPhase::Load,
                            error,
                        });
                    }
                }
            }

            report.loaded += updates.len();
            options.apply(updates);
        }

        info!(
            "Loaded {} options ({} failures, {} modules without configuration)",
            report.loaded,
            report.diagnostics.len(),
            report.skipped_modules.len()
        );
        report
    }

    /// Writes every option's current value into `tree`.
    ///
    /// Module subtrees are created when absent. Comments are attached to the
    /// option nodes that declare one.
    pub async fn save(&self, tree: &mut ConfigNode) -> SyncReport {
        let mut report = SyncReport::default();

        for module in self.registry.modules().await {
            let name = module.name();
            let subtree = tree.node_mut(&[name]);
            let options = module.options();

            for spec in options.descriptors() {
                let path = ConfigPath::root().child(name).join(spec.path());
                let node = subtree.node_mut(spec.path().segments());
                let value = options.value(spec);

                match spec.kind().encode(&value, node, &path) {
                    Ok(()) => {
                        if let Some(comment) = spec.comment() {
                            node.set_comment(comment);
                        }
                        report.saved += 1;
                    }
                    Err(error) => {
                        warn!("⚠️ Failed to save {}: {}", path, error);
                        report.diagnostics.push(SyncDiagnostic {
                            module: name.to_string(),
                            option: spec.path().clone(),
                            phase: SyncPhase::Save,
                            error,
                        });
                    }
                }
            }
        }

        debug!("Saved {} options", report.saved);
        report
    }

    /// Loads `tree`, pushes changed client-mirrored options and announces
    /// the reload on the event stream.
    ///
    /// For every module flagged for client notification whose notified
    /// option values differ after the load, the new values are broadcast to
    /// all connected players as one [`WireMessage::OverrideOptions`].
    pub async fn reload(&self, context: &ModuleContext, tree: &ConfigNode) -> SyncReport {
        let notifying: Vec<_> = self
            .registry
            .modules()
            .await
            .into_iter()
            .filter(|module| module.notify_client())
            .map(|module| {
                let before = notified_values(module.as_ref());
                (module, before)
            })
            .collect();

        let report = self.load(tree).await;

        for (module, before) in notifying {
            let after = notified_values(module.as_ref());
            if after == before {
                continue;
            }
            match override_message(module.name(), &after) {
                Ok(message) => {
                    info!("📣 Pushing client options of {} to connected players", module.name());
                    context.dispatcher().broadcast(&message).await;
                }
                Err(e) => warn!("Failed to render client options of {}: {}", module.name(), e),
            }
        }

        context
            .emit(ModuleEvent::configuration_reloaded(
                report.loaded,
                report.diagnostics.len(),
            ))
            .await;
        report
    }
}

fn notified_values(module: &dyn Module) -> Vec<(ConfigPath, OptionValue)> {
    module
        .options()
        .client_notified()
        .into_iter()
        .map(|(spec, value)| (spec.path().clone(), value))
        .collect()
}

fn override_message(
    module: &str,
    values: &[(ConfigPath, OptionValue)],
) -> Result<WireMessage, serde_json::Error> {
    let options = values
        .iter()
        .map(|(path, value)| -> Result<(String, serde_json::Value), serde_json::Error> {
            Ok((path.to_string(), value.to_json()?))
        })
        .collect::<Result<BTreeMap<_, _>, _>>()?;
    Ok(WireMessage::OverrideOptions(OverrideOptionsMessage {
        module: module.to_string(),
        options,
    }))
}

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::PluginError;
use crate::types::{ApplyOutput, ObservedState, RunOptions};

/// The IaC plugin contract (spec.md §6). Both suspension points the
/// executor cares about — `apply` and `destroy` — take a cancellation
/// token so a running plugin call can be aborted at its earliest checkpoint
/// (spec.md §5).
#[async_trait]
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    async fn apply(&self, options: RunOptions, cancel: CancellationToken) -> Result<ApplyOutput, PluginError>;

    async fn destroy(&self, options: RunOptions, cancel: CancellationToken) -> Result<(), PluginError>;

    /// Read live state for drift detection without changing anything
    /// (spec.md §10.1). The default rejects the call outright, since most
    /// plugins have no read-only path into their provider; a plugin that
    /// does should override this.
    async fn observe(&self, _options: RunOptions, _cancel: CancellationToken) -> Result<ObservedState, PluginError> {
        Err(PluginError::ObserveUnsupported(self.name().to_string()))
    }
}

/// `get(plugin_name) -> Plugin` (spec.md §6).
pub trait PluginRegistry: Send + Sync {
    fn get(&self, name: &str) -> Result<std::sync::Arc<dyn Plugin>, PluginError>;
}

/// A registry backed by a fixed, caller-provided map — the typical shape
/// for a process that only ever wires up a handful of plugins at startup.
#[derive(Default)]
pub struct StaticPluginRegistry {
    plugins: std::collections::HashMap<String, std::sync::Arc<dyn Plugin>>,
}

impl StaticPluginRegistry {
    pub fn new() -> Self {
        StaticPluginRegistry::default()
    }

    pub fn register(&mut self, plugin: std::sync::Arc<dyn Plugin>) {
        self.plugins.insert(plugin.name().to_string(), plugin);
    }
}

impl PluginRegistry for StaticPluginRegistry {
    fn get(&self, name: &str) -> Result<std::sync::Arc<dyn Plugin>, PluginError> {
        self.plugins.get(name).cloned().ok_or_else(|| PluginError::UnknownPlugin(name.to_string()))
    }
}

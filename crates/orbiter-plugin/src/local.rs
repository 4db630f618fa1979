use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use orbiter_domain::Value;

use crate::error::PluginError;
use crate::plugin::Plugin;
use crate::types::{ApplyOutput, ObservedState, OutputValue, RunOptions};

/// The default (`native`) plugin: applies a module in-process instead of
/// shelling out to a real IaC binary, so the executor's contract is
/// exercised end-to-end in tests without a subprocess. Outputs echo the
/// inputs back (a real plugin would parse its provider's actual outputs);
/// `state` is the canonical JSON of the applied inputs, which is enough for
/// `destroy` to find what it applied.
pub struct LocalPlugin;

impl LocalPlugin {
    pub fn new() -> Self {
        LocalPlugin
    }
}

impl Default for LocalPlugin {
    fn default() -> Self {
        LocalPlugin::new()
    }
}

#[async_trait]
impl Plugin for LocalPlugin {
    fn name(&self) -> &str {
        "native"
    }

    async fn apply(&self, options: RunOptions, cancel: CancellationToken) -> Result<ApplyOutput, PluginError> {
        tokio::select! {
            _ = cancel.cancelled() => Err(PluginError::Cancelled),
            result = self.apply_inner(options) => result,
        }
    }

    async fn destroy(&self, options: RunOptions, cancel: CancellationToken) -> Result<(), PluginError> {
        tokio::select! {
            _ = cancel.cancelled() => Err(PluginError::Cancelled),
            result = self.destroy_inner(options) => result,
        }
    }

    async fn observe(&self, options: RunOptions, cancel: CancellationToken) -> Result<ObservedState, PluginError> {
        tokio::select! {
            _ = cancel.cancelled() => Err(PluginError::Cancelled),
            result = self.observe_inner(options) => result,
        }
    }
}

impl LocalPlugin {
    async fn apply_inner(&self, options: RunOptions) -> Result<ApplyOutput, PluginError> {
        debug!(module = %options.module_path.display(), "local plugin applying module");
        let outputs = options
            .inputs
            .iter()
            .map(|(k, v)| (k.clone(), OutputValue { value: v.clone(), sensitive: false }))
            .collect();
        let state = Value::Map(options.inputs.clone()).to_json();
        let state_bytes = serde_json::to_vec(&state).map_err(|err| PluginError::ApplyFailed {
            plugin: self.name().to_string(),
            message: err.to_string(),
        })?;
        Ok(ApplyOutput { outputs, state: state_bytes })
    }

    async fn destroy_inner(&self, options: RunOptions) -> Result<(), PluginError> {
        if options.state_reader.is_none() {
            return Err(PluginError::DestroyFailed {
                plugin: self.name().to_string(),
                message: "no prior state to destroy".to_string(),
            });
        }
        debug!(module = %options.module_path.display(), "local plugin destroying module");
        Ok(())
    }

    /// Decodes the recorded `iac_state` blob back into outputs. A module
    /// with no recorded state is reported as not existing rather than as an
    /// error, since that is a legitimate drift finding (spec.md §10.1).
    async fn observe_inner(&self, options: RunOptions) -> Result<ObservedState, PluginError> {
        let Some(state) = options.state_reader else {
            return Ok(ObservedState { exists: false, healthy: false, outputs: BTreeMap::new() });
        };
        let value: serde_json::Value = serde_json::from_slice(&state).map_err(|err| PluginError::ApplyFailed {
            plugin: self.name().to_string(),
            message: format!("decoding recorded state: {}", err),
        })?;
        let outputs = match value {
            serde_json::Value::Object(map) => map
                .into_iter()
                .map(|(k, v)| (k, OutputValue { value: Value::from_json(v), sensitive: false }))
                .collect(),
            _ => BTreeMap::new(),
        };
        debug!(module = %options.module_path.display(), "local plugin observing module");
        Ok(ObservedState { exists: true, healthy: true, outputs })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    #[tokio::test]
    async fn apply_echoes_inputs_as_outputs() {
        let plugin = LocalPlugin::new();
        let mut inputs = BTreeMap::new();
        inputs.insert("name".to_string(), Value::from("prod-app-main"));
        let options = RunOptions { module_path: PathBuf::from("modules/postgres"), inputs, environment: BTreeMap::new(), state_reader: None };
        let result = plugin.apply(options, CancellationToken::new()).await.unwrap();
        assert_eq!(result.outputs.get("name").unwrap().value, Value::from("prod-app-main"));
        assert!(!result.state.is_empty());
    }

    #[tokio::test]
    async fn destroy_without_prior_state_fails() {
        let plugin = LocalPlugin::new();
        let options = RunOptions { module_path: PathBuf::from("modules/postgres"), inputs: BTreeMap::new(), environment: BTreeMap::new(), state_reader: None };
        assert!(plugin.destroy(options, CancellationToken::new()).await.is_err());
    }

    #[tokio::test]
    async fn observe_reports_outputs_from_recorded_state() {
        let plugin = LocalPlugin::new();
        let mut inputs = BTreeMap::new();
        inputs.insert("name".to_string(), Value::from("prod-app-main"));
        let options = RunOptions { module_path: PathBuf::from("modules/postgres"), inputs, environment: BTreeMap::new(), state_reader: None };
        let applied = plugin.apply(options, CancellationToken::new()).await.unwrap();

        let observe_options = RunOptions { module_path: PathBuf::from("modules/postgres"), inputs: BTreeMap::new(), environment: BTreeMap::new(), state_reader: Some(applied.state) };
        let observed = plugin.observe(observe_options, CancellationToken::new()).await.unwrap();
        assert!(observed.exists);
        assert_eq!(observed.outputs.get("name").unwrap().value, Value::from("prod-app-main"));
    }

    #[tokio::test]
    async fn observe_without_prior_state_reports_not_existing() {
        let plugin = LocalPlugin::new();
        let options = RunOptions { module_path: PathBuf::from("modules/postgres"), inputs: BTreeMap::new(), environment: BTreeMap::new(), state_reader: None };
        let observed = plugin.observe(options, CancellationToken::new()).await.unwrap();
        assert!(!observed.exists);
    }

    #[tokio::test]
    async fn apply_is_cancellable() {
        let plugin = LocalPlugin::new();
        let token = CancellationToken::new();
        token.cancel();
        let options = RunOptions { module_path: PathBuf::from("modules/postgres"), inputs: BTreeMap::new(), environment: BTreeMap::new(), state_reader: None };
        assert!(matches!(plugin.apply(options, token).await, Err(PluginError::Cancelled)));
    }
}

use async_trait::async_trait;

use orbiter_domain::EnvironmentName;

use crate::error::StateError;
use crate::model::EnvironmentState;

/// The state backend the core calls (spec.md §6). Lock acquire/release is
/// optional and not exercised by the core itself — single-writer-per-run is
/// enforced by the executor owning the `EnvironmentState` for the run, not
/// by the backend.
#[async_trait]
pub trait StateBackend: Send + Sync {
    async fn get_environment(&self, name: &EnvironmentName) -> Result<Option<EnvironmentState>, StateError>;
    async fn save_environment(&self, state: &EnvironmentState) -> Result<(), StateError>;

    async fn acquire_lock(&self, _name: &EnvironmentName) -> Result<(), StateError> {
        Ok(())
    }

    async fn release_lock(&self, _name: &EnvironmentName) -> Result<(), StateError> {
        Ok(())
    }
}

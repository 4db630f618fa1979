use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use orbiter_domain::EnvironmentName;

use crate::backend::StateBackend;
use crate::error::StateError;
use crate::model::EnvironmentState;

/// An in-process, non-persistent [`StateBackend`], used by tests and by the
/// CLI's `--dry-run` mode where nothing should touch disk.
#[derive(Default)]
pub struct InMemoryBackend {
    environments: Mutex<HashMap<EnvironmentName, EnvironmentState>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        InMemoryBackend::default()
    }
}

#[async_trait]
impl StateBackend for InMemoryBackend {
    async fn get_environment(&self, name: &EnvironmentName) -> Result<Option<EnvironmentState>, StateError> {
        let guard = self.environments.lock().await;
        Ok(guard.get(name).cloned())
    }

    async fn save_environment(&self, state: &EnvironmentState) -> Result<(), StateError> {
        let mut guard = self.environments.lock().await;
        guard.insert(state.name.clone(), state.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orbiter_domain::DatacenterName;

    #[tokio::test]
    async fn round_trips_a_saved_environment() {
        let backend = InMemoryBackend::new();
        let name = EnvironmentName::new("prod");
        let state = EnvironmentState::new(name.clone(), DatacenterName::new("aws"));
        backend.save_environment(&state).await.unwrap();
        let loaded = backend.get_environment(&name).await.unwrap();
        assert!(loaded.is_some());
    }

    #[tokio::test]
    async fn missing_environment_returns_none() {
        let backend = InMemoryBackend::new();
        let loaded = backend.get_environment(&EnvironmentName::new("ghost")).await.unwrap();
        assert!(loaded.is_none());
    }
}

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::Mutex;

use orbiter_domain::EnvironmentName;

use crate::backend::StateBackend;
use crate::error::StateError;
use crate::model::EnvironmentState;

/// One JSON file per environment under `root`, the persistent backend the
/// CLI uses outside of `--dry-run` (spec.md §6; grounded on the
/// single-writer-under-a-mutex discipline of the teacher's store crate).
/// The in-process mutex only protects against concurrent writers *within
/// this process*; the backend does not attempt cross-process file locking.
pub struct FileBackend {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl FileBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FileBackend { root: root.into(), write_lock: Mutex::new(()) }
    }

    fn path_for(&self, name: &EnvironmentName) -> PathBuf {
        self.root.join(format!("{}.json", name.as_str()))
    }
}

#[async_trait]
impl StateBackend for FileBackend {
    async fn get_environment(&self, name: &EnvironmentName) -> Result<Option<EnvironmentState>, StateError> {
        let path = self.path_for(name);
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let state: EnvironmentState = serde_json::from_slice(&bytes)
                    .map_err(|source| StateError::Serialize { environment: name.clone(), source })?;
                Ok(Some(state))
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StateError::Io(err)),
        }
    }

    async fn save_environment(&self, state: &EnvironmentState) -> Result<(), StateError> {
        let _guard = self.write_lock.lock().await;
        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.path_for(&state.name);
        let bytes = serde_json::to_vec_pretty(state)
            .map_err(|source| StateError::Serialize { environment: state.name.clone(), source })?;
        let tmp_path = path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, &bytes).await?;
        tokio::fs::rename(&tmp_path, &path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orbiter_domain::DatacenterName;

    #[tokio::test]
    async fn round_trips_through_a_temp_directory() {
        let dir = std::env::temp_dir().join(format!("orbiter-state-test-{:?}", std::thread::current().id()));
        let backend = FileBackend::new(&dir);
        let name = EnvironmentName::new("prod");
        let state = EnvironmentState::new(name.clone(), DatacenterName::new("aws"));
        backend.save_environment(&state).await.unwrap();
        let loaded = backend.get_environment(&name).await.unwrap().unwrap();
        assert_eq!(loaded.name, name);
        tokio::fs::remove_dir_all(&dir).await.ok();
    }

    #[tokio::test]
    async fn missing_file_returns_none() {
        let dir = std::env::temp_dir().join(format!("orbiter-state-missing-{:?}", std::thread::current().id()));
        let backend = FileBackend::new(&dir);
        let loaded = backend.get_environment(&EnvironmentName::new("ghost")).await.unwrap();
        assert!(loaded.is_none());
    }
}

use orbiter_domain::EnvironmentName;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("environment {0} not found")]
    NotFound(EnvironmentName),

    #[error("failed to serialize state for environment {environment}: {source}")]
    Serialize {
        environment: EnvironmentName,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to read state store: {0}")]
    Io(#[from] std::io::Error),

    #[error("lock already held for environment {0}")]
    LockHeld(EnvironmentName),
}

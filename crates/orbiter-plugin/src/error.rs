use thiserror::Error;

#[derive(Debug, Error)]
pub enum PluginError {
    #[error("unknown plugin '{0}'")]
    UnknownPlugin(String),

    #[error("plugin '{plugin}' apply failed: {message}")]
    ApplyFailed { plugin: String, message: String },

    #[error("plugin '{plugin}' destroy failed: {message}")]
    DestroyFailed { plugin: String, message: String },

    #[error("plugin '{0}' does not support drift observation")]
    ObserveUnsupported(String),

    #[error("cancelled")]
    Cancelled,
}

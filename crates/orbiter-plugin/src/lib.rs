mod error;
mod local;
mod plugin;
mod types;

pub use error::PluginError;
pub use local::LocalPlugin;
pub use plugin::{Plugin, PluginRegistry, StaticPluginRegistry};
pub use types::{ApplyOutput, ObservedState, OutputValue, RunOptions};

mod datacenter;
mod error;
mod loader;
mod raw;

pub use datacenter::YamlDatacenter;
pub use error::ConfigError;
pub use loader::{load_workspace, LoadedWorkspace};

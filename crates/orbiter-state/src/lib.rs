mod backend;
mod error;
mod file;
mod hash;
mod memory;
mod model;

pub use backend::StateBackend;
pub use error::StateError;
pub use file::FileBackend;
pub use hash::compute_desired_hash;
pub use memory::InMemoryBackend;
pub use model::{ComponentState, EnvironmentState, ResourceKey, ResourceState, Status};

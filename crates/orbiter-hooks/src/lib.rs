mod binder;
mod defaults;
mod error;
mod eval_context;
mod types;

pub use binder::{bind_hook, BoundHook};
pub use defaults::{
    extract_version, find_build_image, find_targeting_service_port, inject_otel, name_mangle,
    observability_injection, port_from_hash,
};
pub use error::HookError;
pub use eval_context::{render_template, HookEvalContext};
pub use types::{Datacenter, Hook, Module};

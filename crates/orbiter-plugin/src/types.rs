use std::collections::BTreeMap;
use std::path::PathBuf;

use orbiter_domain::Value;

/// One output value a plugin returns, with an optional sensitivity flag
/// mirroring Terraform-style provider outputs (spec.md §6).
#[derive(Debug, Clone, PartialEq)]
pub struct OutputValue {
    pub value: Value,
    pub sensitive: bool,
}

/// What the core passes to `Plugin::apply`/`destroy` (spec.md §6
/// `RunOptions`).
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub module_path: PathBuf,
    pub inputs: BTreeMap<String, Value>,
    pub environment: BTreeMap<String, String>,
    /// Opaque state from a prior apply; required for `destroy`, read by
    /// `observe` when available, absent for a fresh `apply`.
    pub state_reader: Option<Vec<u8>>,
}

/// What a successful `apply` returns (spec.md §6): the module's outputs
/// plus the opaque state blob the caller must persist verbatim to be able
/// to destroy the resource later.
#[derive(Debug, Clone)]
pub struct ApplyOutput {
    pub outputs: BTreeMap<String, OutputValue>,
    pub state: Vec<u8>,
}

/// What `Plugin::observe` returns: a read-only snapshot of live state for
/// drift detection (spec.md §10.1). Never implies a mutation was made.
#[derive(Debug, Clone, Default)]
pub struct ObservedState {
    pub exists: bool,
    pub healthy: bool,
    pub outputs: BTreeMap<String, OutputValue>,
}

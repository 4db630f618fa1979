use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use orbiter_domain::{NodeType, Value};
use orbiter_hooks::{Datacenter, Hook};

/// A [`Datacenter`] backed by the hooks and observability attributes loaded
/// from `datacenter.yml`. This is the only `Datacenter` implementor the
/// loader produces; anything richer (remote hook registries, templated
/// sources) is out of scope for the front end.
pub struct YamlDatacenter {
    hooks: BTreeMap<NodeType, Vec<Hook>>,
    source_path: PathBuf,
    observability_attributes: Option<Value>,
}

impl YamlDatacenter {
    pub fn new(hooks: BTreeMap<NodeType, Vec<Hook>>, source_path: PathBuf, observability_attributes: Option<Value>) -> Self {
        YamlDatacenter { hooks, source_path, observability_attributes }
    }
}

impl Datacenter for YamlDatacenter {
    fn hooks_for(&self, ty: NodeType) -> &[Hook] {
        self.hooks.get(&ty).map(|v| v.as_slice()).unwrap_or(&[])
    }

    fn source_path(&self) -> &Path {
        &self.source_path
    }

    fn observability_attributes(&self) -> Option<&Value> {
        self.observability_attributes.as_ref()
    }
}

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};

use orbiter_domain::Value;

/// A stable hex digest of a node's inputs, used as a cheap fast path before
/// the planner's deep `Value` comparison (spec.md §10.4; generalizes the
/// teacher's `compute_desired_hash`, which hashed a `serde_json::Value`, to
/// hash `orbiter_domain::Value` directly). Because `Value::Map` is
/// `BTreeMap`-backed, `to_json()` already produces key-sorted output, so no
/// separate canonicalization pass is needed before hashing.
pub fn compute_desired_hash(inputs: &BTreeMap<String, Value>) -> String {
    let json = serde_json::to_vec(&Value::Map(inputs.clone()).to_json())
        .expect("Value::to_json always yields serializable output");
    let digest = Sha256::digest(&json);
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_independent_of_map_insertion_order() {
        let mut a = BTreeMap::new();
        a.insert("x".to_string(), Value::Int(1));
        a.insert("y".to_string(), Value::Int(2));
        let mut b = BTreeMap::new();
        b.insert("y".to_string(), Value::Int(2));
        b.insert("x".to_string(), Value::Int(1));
        assert_eq!(compute_desired_hash(&a), compute_desired_hash(&b));
    }

    #[test]
    fn hash_changes_when_a_value_changes() {
        let mut a = BTreeMap::new();
        a.insert("x".to_string(), Value::Int(1));
        let mut b = BTreeMap::new();
        b.insert("x".to_string(), Value::Int(2));
        assert_ne!(compute_desired_hash(&a), compute_desired_hash(&b));
    }
}

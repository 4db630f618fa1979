use std::path::Path;

use orbiter_config::load_workspace;
use orbiter_domain::{ComponentName, NodeId, NodeType};

#[test]
fn load_valid_fixture() {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/basic");
    let ws = load_workspace(&dir).expect("should load without error");
    assert_eq!(ws.environment.as_str(), "staging");
    assert_eq!(ws.datacenter_name.as_str(), "dc");
    assert_eq!(ws.graph.len(), 2);

    let deploy = NodeId::new(&ComponentName::new("app"), NodeType::Deployment, "api");
    let db = NodeId::new(&ComponentName::new("app"), NodeType::Database, "main");
    let deploy_node = ws.graph.get(&deploy).expect("deployment node present");
    assert!(deploy_node.depends_on.contains(&db));

    let order = ws.graph.topological_sort().expect("acyclic");
    let pos_db = order.iter().position(|n| n == &db).unwrap();
    let pos_deploy = order.iter().position(|n| n == &deploy).unwrap();
    assert!(pos_db < pos_deploy);
}

#[test]
fn missing_dir_returns_error() {
    let dir = Path::new("/nonexistent/path/does/not/exist");
    assert!(load_workspace(dir).is_err());
}

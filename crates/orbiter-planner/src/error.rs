use orbiter_domain::NodeId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("cannot plan a cyclic graph: {0:?}")]
    Cycle(Vec<NodeId>),
}

impl From<orbiter_graph::GraphError> for PlannerError {
    fn from(err: orbiter_graph::GraphError) -> Self {
        match err {
            orbiter_graph::GraphError::Cycle(ids) => PlannerError::Cycle(ids),
            _ => unreachable!("topological_sort only ever returns GraphError::Cycle"),
        }
    }
}

mod change;
mod ids;
mod node;
mod value;

pub use change::{Action, Plan, PropertyChange, ResourceChange};
pub use ids::{ComponentName, DatacenterName, EnvironmentName, NodeId};
pub use node::{Node, NodeState, NodeType};
pub use value::Value;

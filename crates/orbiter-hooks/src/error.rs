use orbiter_domain::NodeId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HookError {
    #[error("no hook defined for node {0}")]
    NoHookDefined(NodeId),

    #[error("no matching hook for node {0}")]
    NoMatchingHook(NodeId),

    #[error("datacenter rejected node {node}: {message}")]
    DatacenterRejected { node: NodeId, message: String },

    #[error("expression error binding node {node}: {source}")]
    Expr {
        node: NodeId,
        #[source]
        source: orbiter_expr::ExprError,
    },
}

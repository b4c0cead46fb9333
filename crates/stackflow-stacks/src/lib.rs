//! StackFlow stacks
//!
//! Builds the stack graph of one environment:
//!
//! ```text
//! CommonStatefulStack ─────────────────────────────┐
//! CommonNetworkStack ──┬──> StatefulStack ──┐       │
//!                      └──────────────────> ComputeStack ──> DeliveryStack
//! ```
//!
//! Stacks are built in that order. Each one receives a dependency bundle of
//! handles produced by the stacks before it; a handle that crosses a stack
//! boundary is turned into an export/import pair at synthesis.

pub mod base;
pub mod constructs;
pub mod deployment;
pub mod error;
pub mod stack;

pub use base::{BaseStackProps, StackIdentity, new_stack};
pub use deployment::{Deployment, deploy_env};
pub use error::{Result, StackError};
pub use stack::{
    CommonNetworkStack, CommonStatefulStack, ComputeStack, ComputeStackDeps, DeliveryStack,
    DeliveryStackDeps, StatefulStack, StatefulStackDeps,
};

#[cfg(test)]
pub(crate) mod testing {
    use serde_json::json;
    use stackflow_core::{ContextTree, EnvType, EnvironmentContext};

    /// Context of the `test` environment with dummy identifiers
    pub fn dummy_context() -> EnvironmentContext {
        let mut tree = ContextTree::new();
        tree.insert_entry(
            "test",
            json!({
                "vpcId": "vpc-dummy",
                "subnetIds": ["subnet-dummy1", "subnet-dummy2"],
                "routeTableId": "rtb-dummy",
                "env": { "account": "dummy-account", "region": "dummy-region" }
            }),
        );
        EnvironmentContext::new(EnvType::Test, "myCdk", &tree).unwrap()
    }
}

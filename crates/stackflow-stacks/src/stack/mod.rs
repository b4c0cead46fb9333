//! The five stacks, in build order

pub mod common_network;
pub mod common_stateful;
pub mod compute;
pub mod delivery;
pub mod stateful;

pub use common_network::{CommonNetworkStack, CommonSecurityGroups, Subnets};
pub use common_stateful::CommonStatefulStack;
pub use compute::{ComputeStack, ComputeStackDeps};
pub use delivery::{DeliveryStack, DeliveryStackDeps};
pub use stateful::{StatefulStack, StatefulStackDeps};

//! Resource builders shared by the stacks
//!
//! Each builder adds its resources to the stack it is given and returns a
//! typed handle. Handles are cheap clones of a [`ResourceRef`] and are what
//! the dependency bundles carry between stacks.
//!
//! [`ResourceRef`]: stackflow_cloud::ResourceRef

pub mod database;
pub mod function;
pub mod iam;
pub mod logs;
pub mod network;
pub mod pipeline;
pub mod registry;
pub mod service;

pub use database::{DatabaseCluster, DatabaseClusterProps};
pub use function::{Function, FunctionProps, Runtime, Schedule, schedule_rule};
pub use iam::{PolicyStatement, Role};
pub use logs::{LogGroup, RetentionDays};
pub use network::{ImportedSubnet, ImportedVpc, Peer, SecurityGroup};
pub use pipeline::{Action, Artifact, Pipeline, PipelineProject, PipelineProjectProps, Stage};
pub use registry::{CodeRepository, EcrRepository, EcrRepositoryProps};
pub use service::{
    ApplicationLoadBalancer, ApplicationProtocol, Cluster, ContainerDefinition, ContainerImage,
    FargateService, FargateServiceProps, FargateTaskDefinition, Listener, LoadBalancerTarget,
    PortMapping, ScalableTarget, TargetGroup,
};

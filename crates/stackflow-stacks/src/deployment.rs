//! Whole-environment stack graph

use crate::base::BaseStackProps;
use crate::error::Result;
use crate::stack::{
    CommonNetworkStack, CommonStatefulStack, ComputeStack, ComputeStackDeps, DeliveryStack,
    DeliveryStackDeps, StatefulStack, StatefulStackDeps,
};
use stackflow_cloud::{App, CloudAssembly};
use stackflow_core::{Environment, EnvironmentContext};
use tracing::{info, instrument};

/// Deploy environment for every stack: the context entry's account/region,
/// gaps filled from `fallback`. `None` when neither names anything.
pub fn deploy_env(context: &EnvironmentContext, fallback: Environment) -> Option<Environment> {
    let env = context.env().cloned().unwrap_or_default().or(fallback);
    (!env.is_agnostic()).then_some(env)
}

/// The five stacks of one environment, built in dependency order
#[derive(Debug)]
pub struct Deployment {
    app: App,
    pub common_stateful: CommonStatefulStack,
    pub common_network: CommonNetworkStack,
    pub stateful: StatefulStack,
    pub compute: ComputeStack,
    pub delivery: DeliveryStack,
}

impl Deployment {
    #[instrument(skip_all, fields(system = %context.system_name(), env_type = %context.env_type()))]
    pub fn build(context: &EnvironmentContext, env: Option<Environment>) -> Result<Self> {
        let mut app = App::new();
        let props = BaseStackProps::new(context)
            .with_env(env)
            .with_description(format!("Managed by stackflow ({})", context.system_name()));
        let protected = props.clone().with_termination_protection(true);

        let common_stateful = CommonStatefulStack::build(&mut app, &protected)?;
        let common_network = CommonNetworkStack::build(&mut app, &props)?;

        let stateful = StatefulStack::build(
            &mut app,
            StatefulStackDeps {
                database_vpc: common_network.vpc.clone(),
                database_subnets: common_network.subnets.private(),
            },
            &protected,
        )?;

        let compute = ComputeStack::build(
            &mut app,
            ComputeStackDeps {
                ecr_repository: stateful.ecr_repository.clone(),
                vpc: common_network.vpc.clone(),
                target_subnets: common_network.subnets.private(),
                vpc_endpoint_security_group: common_network.security_groups.endpoint.clone(),
            },
            &props,
        )?;

        let delivery = DeliveryStack::build(
            &mut app,
            DeliveryStackDeps {
                code_repository: common_stateful.code_repository.clone(),
                ecr_repository: stateful.ecr_repository.clone(),
                fargate_service: compute.fargate_service.clone(),
            },
            &props,
        )?;

        info!(stacks = app.stacks().len(), "Stack graph built");

        Ok(Self {
            app,
            common_stateful,
            common_network,
            stateful,
            compute,
            delivery,
        })
    }

    pub fn app(&self) -> &App {
        &self.app
    }

    /// Qualified stack names in build order
    pub fn stack_names(&self) -> Vec<&str> {
        self.app.stacks().iter().map(|s| s.name()).collect()
    }

    pub fn synth(&self) -> Result<CloudAssembly> {
        Ok(self.app.synth()?)
    }
}

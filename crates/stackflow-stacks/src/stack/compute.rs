//! Per-environment compute: load balancer in front of an auto-scaled
//! Fargate service running the image from the stateful stack's registry

use crate::base::{BaseStackProps, StackIdentity, new_stack};
use crate::constructs::network::{ImportedSubnet, ImportedVpc, Peer, SecurityGroup};
use crate::constructs::registry::EcrRepository;
use crate::constructs::service::{
    ApplicationLoadBalancer, ApplicationProtocol, Cluster, ContainerDefinition, ContainerImage,
    FargateService, FargateServiceProps, FargateTaskDefinition, LoadBalancerTarget, PortMapping,
    TargetGroup,
};
use crate::error::Result;
use stackflow_cloud::App;
use stackflow_core::create_resource_name;

const CONTAINER_NAME: &str = "web";
const CONTAINER_PORT: u16 = 3000;
const LISTENER_PORT: u16 = 80;
const ENDPOINT_PORT: u16 = 443;

/// What the compute stack needs from the network and stateful stacks
#[derive(Debug, Clone)]
pub struct ComputeStackDeps {
    pub ecr_repository: EcrRepository,
    pub vpc: ImportedVpc,
    pub target_subnets: Vec<ImportedSubnet>,
    pub vpc_endpoint_security_group: SecurityGroup,
}

#[derive(Debug, Clone)]
pub struct ComputeStack {
    pub stack_name: String,
    pub load_balancer: ApplicationLoadBalancer,
    pub fargate_service: FargateService,
}

impl ComputeStack {
    pub const ID: &'static str = "EcsStack";

    pub fn build(app: &mut App, deps: ComputeStackDeps, props: &BaseStackProps<'_>) -> Result<Self> {
        let mut stack = new_stack(StackIdentity::per_env(Self::ID), props);
        let context = props.context;
        let name = |label: &str| {
            create_resource_name(context.system_name(), context.env_type().as_str(), label)
        };

        // Security groups
        let alb_group = SecurityGroup::create(&mut stack, "SecurityGroupAlb", &deps.vpc)?;
        alb_group.add_ingress_rule(&mut stack, Peer::AnyIpv4, LISTENER_PORT)?;
        let web_group = SecurityGroup::create(&mut stack, "SecurityGroupWeb", &deps.vpc)?;

        // The endpoint group belongs to the network stack; the rule lives here.
        deps.vpc_endpoint_security_group.add_ingress_rule(
            &mut stack,
            Peer::SecurityGroup(web_group.clone()),
            ENDPOINT_PORT,
        )?;

        // Load balancer
        let load_balancer = ApplicationLoadBalancer::create(
            &mut stack,
            "Alb",
            &name("alb"),
            true,
            context.public_subnet_ids(),
            &alb_group,
        )?;

        // Task and cluster
        let task_definition = FargateTaskDefinition::create(
            &mut stack,
            "TaskDefinition",
            512,
            1024,
            vec![ContainerDefinition {
                name: CONTAINER_NAME.to_string(),
                image: ContainerImage::from_ecr_repository(&deps.ecr_repository, "latest"),
                memory_limit_mib: 1024,
                port_mappings: vec![PortMapping {
                    container_port: CONTAINER_PORT,
                    host_port: CONTAINER_PORT,
                }],
            }],
        )?;
        let cluster = Cluster::create(&mut stack, "Cluster", &name("cluster"))?;

        // Listener and target group
        let target_group = TargetGroup::create(
            &mut stack,
            "ListenerECSGroup",
            LISTENER_PORT,
            ApplicationProtocol::Http,
            &deps.vpc,
        )?;
        let listener = load_balancer.add_listener(
            &mut stack,
            "Listener",
            LISTENER_PORT,
            ApplicationProtocol::Http,
            &target_group,
        )?;
        web_group.add_ingress_rule(
            &mut stack,
            Peer::SecurityGroup(alb_group.clone()),
            CONTAINER_PORT,
        )?;

        // Service
        let subnets: Vec<String> = deps
            .target_subnets
            .iter()
            .map(|s| s.subnet_id.clone())
            .collect();
        let fargate_service = FargateService::create(
            &mut stack,
            "Service",
            FargateServiceProps {
                service_name: &name("service"),
                cluster: &cluster,
                task_definition: &task_definition,
                subnets: &subnets,
                security_groups: &[&web_group],
                desired_count: 1,
                load_balancers: vec![LoadBalancerTarget {
                    container_name: CONTAINER_NAME.to_string(),
                    container_port: CONTAINER_PORT,
                    target_group,
                }],
                listeners: vec![&listener],
            },
        )?;

        // Auto scaling
        // TODO: raise max capacity once the service is load tested; 1..1 pins it to one task.
        let scaling = fargate_service.auto_scale_task_count(&mut stack, 1, 1)?;
        scaling.scale_on_cpu_utilization(&mut stack, "CpuScaling", 60)?;

        let stack_name = stack.name().to_string();
        app.add_stack(stack);

        Ok(Self {
            stack_name,
            load_balancer,
            fargate_service,
        })
    }
}

//! Container service, load balancer and auto scaling

use crate::constructs::iam::{PolicyStatement, Role};
use crate::constructs::network::{ImportedVpc, SecurityGroup};
use crate::constructs::registry::EcrRepository;
use crate::error::{Result, StackError};
use serde_json::{Value, json};
use stackflow_cloud::token::{AWS_ACCOUNT_ID, AWS_PARTITION, fn_join, pseudo, sanitize_id};
use stackflow_cloud::{Resource, ResourceRef, Stack};

const AUTOSCALING_ROLE_PATH: &str = ":role/aws-service-role/ecs.application-autoscaling.amazonaws.com/AWSServiceRoleForApplicationAutoScaling_ECSService";

/// Listener / target group protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplicationProtocol {
    Http,
}

impl ApplicationProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationProtocol::Http => "HTTP",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApplicationLoadBalancer {
    resource: ResourceRef,
}

impl ApplicationLoadBalancer {
    pub fn create(
        stack: &mut Stack,
        id: &str,
        name: &str,
        internet_facing: bool,
        subnets: &[String],
        security_group: &SecurityGroup,
    ) -> Result<Self> {
        let scheme = if internet_facing {
            "internet-facing"
        } else {
            "internal"
        };
        let resource = stack.add(Resource::new(
            id,
            "AWS::ElasticLoadBalancingV2::LoadBalancer",
            json!({
                "LoadBalancerAttributes": [{
                    "Key": "deletion_protection.enabled",
                    "Value": "false"
                }],
                "Name": name,
                "Scheme": scheme,
                "SecurityGroups": [security_group.group_id()],
                "Subnets": subnets,
                "Type": "application"
            }),
        ))?;
        Ok(Self { resource })
    }

    pub fn arn(&self) -> Value {
        self.resource.ref_token()
    }

    /// Listener forwarding everything to `target_group`
    pub fn add_listener(
        &self,
        stack: &mut Stack,
        id: &str,
        port: u16,
        protocol: ApplicationProtocol,
        target_group: &TargetGroup,
    ) -> Result<Listener> {
        let resource = stack.add(Resource::new(
            id,
            "AWS::ElasticLoadBalancingV2::Listener",
            json!({
                "DefaultActions": [{
                    "TargetGroupArn": target_group.arn(),
                    "Type": "forward"
                }],
                "LoadBalancerArn": self.arn(),
                "Port": port,
                "Protocol": protocol.as_str()
            }),
        ))?;
        Ok(Listener { resource })
    }
}

#[derive(Debug, Clone)]
pub struct Listener {
    resource: ResourceRef,
}

impl Listener {
    pub fn logical_id(&self) -> &str {
        self.resource.logical_id()
    }
}

/// Target group of `ip` targets
#[derive(Debug, Clone)]
pub struct TargetGroup {
    resource: ResourceRef,
}

impl TargetGroup {
    pub fn create(
        stack: &mut Stack,
        id: &str,
        port: u16,
        protocol: ApplicationProtocol,
        vpc: &ImportedVpc,
    ) -> Result<Self> {
        let resource = stack.add(Resource::new(
            id,
            "AWS::ElasticLoadBalancingV2::TargetGroup",
            json!({
                "Port": port,
                "Protocol": protocol.as_str(),
                "TargetGroupAttributes": [{
                    "Key": "stickiness.enabled",
                    "Value": "false"
                }],
                "TargetType": "ip",
                "VpcId": vpc.id_value()
            }),
        ))?;
        Ok(Self { resource })
    }

    pub fn logical_id(&self) -> &str {
        self.resource.logical_id()
    }

    pub fn arn(&self) -> Value {
        self.resource.ref_token()
    }
}

/// Image a container runs, plus what the execution role needs to pull it
#[derive(Debug, Clone)]
pub struct ContainerImage {
    image: Value,
    pull_statements: Vec<PolicyStatement>,
}

impl ContainerImage {
    /// `{repositoryUri}:{tag}` from a registry declared in the graph
    pub fn from_ecr_repository(repository: &EcrRepository, tag: &str) -> Self {
        Self {
            image: fn_join("", vec![repository.uri(), json!(format!(":{}", tag))]),
            pull_statements: vec![
                PolicyStatement::allow(
                    [
                        "ecr:BatchCheckLayerAvailability",
                        "ecr:GetDownloadUrlForLayer",
                        "ecr:BatchGetImage",
                    ],
                    vec![repository.arn()],
                ),
                PolicyStatement::allow(["ecr:GetAuthorizationToken"], vec![json!("*")]),
            ],
        }
    }

    /// Public image, no pull permissions needed
    pub fn from_registry(name: &str) -> Self {
        Self {
            image: json!(name),
            pull_statements: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortMapping {
    pub container_port: u16,
    pub host_port: u16,
}

#[derive(Debug, Clone)]
pub struct ContainerDefinition {
    pub name: String,
    pub image: ContainerImage,
    pub memory_limit_mib: u32,
    pub port_mappings: Vec<PortMapping>,
}

impl ContainerDefinition {
    fn to_value(&self) -> Value {
        let mappings: Vec<Value> = self
            .port_mappings
            .iter()
            .map(|m| {
                json!({
                    "ContainerPort": m.container_port,
                    "HostPort": m.host_port,
                    "Protocol": "tcp"
                })
            })
            .collect();
        json!({
            "Essential": true,
            "Image": self.image.image,
            "Memory": self.memory_limit_mib,
            "Name": self.name,
            "PortMappings": mappings
        })
    }

    fn exposes(&self, port: u16) -> bool {
        self.port_mappings.iter().any(|m| m.container_port == port)
    }
}

#[derive(Debug, Clone)]
pub struct FargateTaskDefinition {
    resource: ResourceRef,
    containers: Vec<ContainerDefinition>,
}

impl FargateTaskDefinition {
    /// Emits `{id}TaskRole`, `{id}ExecutionRole` (+ pull policy) and `{id}`
    pub fn create(
        stack: &mut Stack,
        id: &str,
        cpu: u32,
        memory_mib: u32,
        containers: Vec<ContainerDefinition>,
    ) -> Result<Self> {
        let task_role = Role::for_service(
            stack,
            &format!("{}TaskRole", id),
            "ecs-tasks.amazonaws.com",
            Vec::new(),
        )?;
        let execution_role = Role::for_service(
            stack,
            &format!("{}ExecutionRole", id),
            "ecs-tasks.amazonaws.com",
            Vec::new(),
        )?;

        let pull_statements: Vec<PolicyStatement> = containers
            .iter()
            .flat_map(|c| c.image.pull_statements.iter().cloned())
            .collect();
        if !pull_statements.is_empty() {
            execution_role.attach_default_policy(stack, &pull_statements)?;
        }

        let family = sanitize_id(&format!("{}{}", stack.name(), id));
        let definitions: Vec<Value> = containers.iter().map(ContainerDefinition::to_value).collect();
        let resource = stack.add(Resource::new(
            id,
            "AWS::ECS::TaskDefinition",
            json!({
                "ContainerDefinitions": definitions,
                "Cpu": cpu.to_string(),
                "ExecutionRoleArn": execution_role.arn(),
                "Family": family,
                "Memory": memory_mib.to_string(),
                "NetworkMode": "awsvpc",
                "RequiresCompatibilities": ["FARGATE"],
                "TaskRoleArn": task_role.arn()
            }),
        ))?;

        Ok(Self {
            resource,
            containers,
        })
    }

    pub fn arn(&self) -> Value {
        self.resource.ref_token()
    }

    fn container(&self, name: &str) -> Option<&ContainerDefinition> {
        self.containers.iter().find(|c| c.name == name)
    }
}

#[derive(Debug, Clone)]
pub struct Cluster {
    resource: ResourceRef,
}

impl Cluster {
    pub fn create(stack: &mut Stack, id: &str, cluster_name: &str) -> Result<Self> {
        let resource = stack.add(Resource::new(
            id,
            "AWS::ECS::Cluster",
            json!({ "ClusterName": cluster_name }),
        ))?;
        Ok(Self { resource })
    }

    pub fn name(&self) -> Value {
        self.resource.ref_token()
    }
}

/// Container of the task registered with a load balancer target group
#[derive(Debug, Clone)]
pub struct LoadBalancerTarget {
    pub container_name: String,
    pub container_port: u16,
    pub target_group: TargetGroup,
}

#[derive(Debug, Clone)]
pub struct FargateServiceProps<'a> {
    pub service_name: &'a str,
    pub cluster: &'a Cluster,
    pub task_definition: &'a FargateTaskDefinition,
    pub subnets: &'a [String],
    pub security_groups: &'a [&'a SecurityGroup],
    pub desired_count: u32,
    pub load_balancers: Vec<LoadBalancerTarget>,
    /// Listeners that must exist before the service registers targets
    pub listeners: Vec<&'a Listener>,
}

/// Fargate service; the handle later stacks deploy into
#[derive(Debug, Clone)]
pub struct FargateService {
    resource: ResourceRef,
    cluster: Cluster,
}

impl FargateService {
    pub fn create(stack: &mut Stack, id: &str, props: FargateServiceProps<'_>) -> Result<Self> {
        for target in &props.load_balancers {
            let exposed = props
                .task_definition
                .container(&target.container_name)
                .is_some_and(|c| c.exposes(target.container_port));
            if !exposed {
                return Err(StackError::InvalidConstruct {
                    id: id.to_string(),
                    message: format!(
                        "container '{}' does not expose port {}",
                        target.container_name, target.container_port
                    ),
                });
            }
        }

        let load_balancers: Vec<Value> = props
            .load_balancers
            .iter()
            .map(|t| {
                json!({
                    "ContainerName": t.container_name,
                    "ContainerPort": t.container_port,
                    "TargetGroupArn": t.target_group.arn()
                })
            })
            .collect();
        let security_groups: Vec<Value> =
            props.security_groups.iter().map(|sg| sg.group_id()).collect();

        let mut properties = json!({
            "Cluster": props.cluster.name(),
            "DeploymentConfiguration": {
                "MaximumPercent": 200,
                "MinimumHealthyPercent": 50
            },
            "DesiredCount": props.desired_count,
            "EnableECSManagedTags": false,
            "LaunchType": "FARGATE",
            "NetworkConfiguration": {
                "AwsvpcConfiguration": {
                    "AssignPublicIp": "DISABLED",
                    "SecurityGroups": security_groups,
                    "Subnets": props.subnets
                }
            },
            "ServiceName": props.service_name,
            "TaskDefinition": props.task_definition.arn()
        });
        if !load_balancers.is_empty() {
            properties["HealthCheckGracePeriodSeconds"] = json!(60);
            properties["LoadBalancers"] = json!(load_balancers);
        }

        let mut resource = Resource::new(id, "AWS::ECS::Service", properties);
        for target in &props.load_balancers {
            resource = resource.depends_on(target.target_group.logical_id());
        }
        for listener in &props.listeners {
            resource = resource.depends_on(listener.logical_id());
        }

        let resource = stack.add(resource)?;
        Ok(Self {
            resource,
            cluster: props.cluster.clone(),
        })
    }

    pub fn logical_id(&self) -> &str {
        self.resource.logical_id()
    }

    pub fn service_name(&self) -> Value {
        self.resource.att("Name")
    }

    pub fn cluster_name(&self) -> Value {
        self.cluster.name()
    }

    /// Scalable target over the service's desired count
    pub fn auto_scale_task_count(
        &self,
        stack: &mut Stack,
        min_capacity: u32,
        max_capacity: u32,
    ) -> Result<ScalableTarget> {
        let id = format!("{}TaskCountTarget", self.logical_id());
        if min_capacity > max_capacity {
            return Err(StackError::InvalidConstruct {
                id,
                message: format!(
                    "min capacity {} exceeds max capacity {}",
                    min_capacity, max_capacity
                ),
            });
        }

        let resource = stack.add(Resource::new(
            id,
            "AWS::ApplicationAutoScaling::ScalableTarget",
            json!({
                "MaxCapacity": max_capacity,
                "MinCapacity": min_capacity,
                "ResourceId": fn_join(
                    "",
                    vec![
                        json!("service/"),
                        self.cluster_name(),
                        json!("/"),
                        self.service_name(),
                    ],
                ),
                "RoleARN": fn_join(
                    "",
                    vec![
                        json!("arn:"),
                        pseudo(AWS_PARTITION),
                        json!(":iam::"),
                        pseudo(AWS_ACCOUNT_ID),
                        json!(AUTOSCALING_ROLE_PATH),
                    ],
                ),
                "ScalableDimension": "ecs:service:DesiredCount",
                "ServiceNamespace": "ecs"
            }),
        ))?;
        Ok(ScalableTarget { resource })
    }
}

#[derive(Debug, Clone)]
pub struct ScalableTarget {
    resource: ResourceRef,
}

impl ScalableTarget {
    /// Target-tracking policy on average service CPU
    pub fn scale_on_cpu_utilization(
        &self,
        stack: &mut Stack,
        id: &str,
        target_utilization_percent: u32,
    ) -> Result<ResourceRef> {
        Ok(stack.add(Resource::new(
            id,
            "AWS::ApplicationAutoScaling::ScalingPolicy",
            json!({
                "PolicyName": id,
                "PolicyType": "TargetTrackingScaling",
                "ScalingTargetId": self.resource.ref_token(),
                "TargetTrackingScalingPolicyConfiguration": {
                    "PredefinedMetricSpecification": {
                        "PredefinedMetricType": "ECSServiceAverageCPUUtilization"
                    },
                    "TargetValue": target_utilization_percent
                }
            }),
        ))?)
    }
}

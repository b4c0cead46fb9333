//! VPC lookups, security groups and VPC endpoints

use crate::error::Result;
use serde_json::{Value, json};
use stackflow_cloud::token::{AWS_REGION, fn_join, pseudo};
use stackflow_cloud::{Resource, ResourceRef, Stack};

/// A VPC that already exists; referenced by id, never emitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedVpc {
    pub vpc_id: String,
}

impl ImportedVpc {
    pub fn from_lookup(vpc_id: impl Into<String>) -> Self {
        Self {
            vpc_id: vpc_id.into(),
        }
    }

    pub fn id_value(&self) -> Value {
        json!(self.vpc_id)
    }
}

/// A subnet that already exists; referenced by id, never emitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedSubnet {
    /// Construct id the subnet was imported under (e.g. `SubnetPrivate1`)
    pub id: String,
    pub subnet_id: String,
    pub route_table_id: Option<String>,
}

impl ImportedSubnet {
    pub fn from_attributes(
        id: impl Into<String>,
        subnet_id: impl Into<String>,
        route_table_id: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            subnet_id: subnet_id.into(),
            route_table_id,
        }
    }
}

/// Subnet ids as template values
pub fn subnet_ids(subnets: &[ImportedSubnet]) -> Vec<Value> {
    subnets.iter().map(|s| json!(s.subnet_id)).collect()
}

/// Source of an ingress rule
#[derive(Debug, Clone)]
pub enum Peer {
    AnyIpv4,
    SecurityGroup(SecurityGroup),
}

impl Peer {
    fn label(&self) -> String {
        match self {
            Peer::AnyIpv4 => "AnyIpv4".to_string(),
            Peer::SecurityGroup(group) => group.logical_id().to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SecurityGroup {
    resource: ResourceRef,
}

impl SecurityGroup {
    /// Security group in `vpc` that allows all outbound traffic
    pub fn create(stack: &mut Stack, id: &str, vpc: &ImportedVpc) -> Result<Self> {
        let description = format!("{}/{}", stack.name(), id);
        let resource = stack.add(Resource::new(
            id,
            "AWS::EC2::SecurityGroup",
            json!({
                "GroupDescription": description,
                "SecurityGroupEgress": [{
                    "CidrIp": "0.0.0.0/0",
                    "Description": "Allow all outbound traffic by default",
                    "IpProtocol": "-1"
                }],
                "VpcId": vpc.id_value()
            }),
        ))?;
        Ok(Self { resource })
    }

    pub fn logical_id(&self) -> &str {
        self.resource.logical_id()
    }

    pub fn resource(&self) -> &ResourceRef {
        &self.resource
    }

    pub fn group_id(&self) -> Value {
        self.resource.att("GroupId")
    }

    /// Allows tcp `port` from `peer`
    ///
    /// The rule is emitted into `stack`, which may differ from the stack that
    /// owns the group. Putting it in the consuming stack keeps cross-stack
    /// references flowing one way.
    pub fn add_ingress_rule(&self, stack: &mut Stack, peer: Peer, port: u16) -> Result<ResourceRef> {
        let id = format!("{}From{}Tcp{}", self.logical_id(), peer.label(), port);
        let mut properties = json!({
            "IpProtocol": "tcp",
            "FromPort": port,
            "ToPort": port,
            "GroupId": self.group_id(),
        });

        match &peer {
            Peer::AnyIpv4 => {
                properties["CidrIp"] = json!("0.0.0.0/0");
                properties["Description"] = json!(format!("Allow from anyone on port {}", port));
            }
            Peer::SecurityGroup(source) => {
                properties["SourceSecurityGroupId"] = source.group_id();
                properties["Description"] = json!(format!("from {}:{}", source.logical_id(), port));
            }
        }

        Ok(stack.add(Resource::new(id, "AWS::EC2::SecurityGroupIngress", properties))?)
    }
}

/// `com.amazonaws.{region}.{suffix}`, with the region left to the engine
/// when the stack is not pinned to one
pub fn endpoint_service_name(region: Option<&str>, suffix: &str) -> Value {
    match region {
        Some(region) => json!(format!("com.amazonaws.{}.{}", region, suffix)),
        None => fn_join(
            "",
            vec![
                json!("com.amazonaws."),
                pseudo(AWS_REGION),
                json!(format!(".{}", suffix)),
            ],
        ),
    }
}

/// Interface endpoint with private DNS, placed in `subnets`
pub fn interface_endpoint(
    stack: &mut Stack,
    id: &str,
    service_name: Value,
    vpc: &ImportedVpc,
    subnets: &[ImportedSubnet],
    security_group: &SecurityGroup,
) -> Result<ResourceRef> {
    Ok(stack.add(Resource::new(
        id,
        "AWS::EC2::VPCEndpoint",
        json!({
            "ServiceName": service_name,
            "VpcId": vpc.id_value(),
            "PrivateDnsEnabled": true,
            "SecurityGroupIds": [security_group.group_id()],
            "SubnetIds": subnet_ids(subnets),
            "VpcEndpointType": "Interface"
        }),
    ))?)
}

/// Gateway endpoint attached to the route tables of `subnets`
pub fn gateway_endpoint(
    stack: &mut Stack,
    id: &str,
    service_name: Value,
    vpc: &ImportedVpc,
    subnets: &[ImportedSubnet],
) -> Result<ResourceRef> {
    let mut route_tables: Vec<&str> = Vec::new();
    for table in subnets.iter().filter_map(|s| s.route_table_id.as_deref()) {
        if !route_tables.contains(&table) {
            route_tables.push(table);
        }
    }

    Ok(stack.add(Resource::new(
        id,
        "AWS::EC2::VPCEndpoint",
        json!({
            "ServiceName": service_name,
            "VpcId": vpc.id_value(),
            "RouteTableIds": route_tables,
            "VpcEndpointType": "Gateway"
        }),
    ))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackflow_cloud::StackProps;

    fn subnets() -> Vec<ImportedSubnet> {
        vec![
            ImportedSubnet::from_attributes("SubnetPrivate1", "subnet-1", Some("rtb-1".into())),
            ImportedSubnet::from_attributes("SubnetPrivate2", "subnet-2", Some("rtb-1".into())),
        ]
    }

    #[test]
    fn test_security_group_description() {
        let mut stack = Stack::new("sys-dev-EcsStack", StackProps::new());
        let vpc = ImportedVpc::from_lookup("vpc-1");
        SecurityGroup::create(&mut stack, "SecurityGroupWeb", &vpc).unwrap();

        let sg = stack.resource("SecurityGroupWeb").unwrap();
        assert_eq!(
            sg.get_property::<String>("GroupDescription").as_deref(),
            Some("sys-dev-EcsStack/SecurityGroupWeb")
        );
        assert_eq!(sg.get_property::<String>("VpcId").as_deref(), Some("vpc-1"));
    }

    #[test]
    fn test_ingress_rule_ids() {
        let mut stack = Stack::new("s", StackProps::new());
        let vpc = ImportedVpc::from_lookup("vpc-1");
        let alb = SecurityGroup::create(&mut stack, "SecurityGroupAlb", &vpc).unwrap();
        let web = SecurityGroup::create(&mut stack, "SecurityGroupWeb", &vpc).unwrap();

        let open = alb.add_ingress_rule(&mut stack, Peer::AnyIpv4, 80).unwrap();
        assert_eq!(open.logical_id(), "SecurityGroupAlbFromAnyIpv4Tcp80");

        let from_alb = web
            .add_ingress_rule(&mut stack, Peer::SecurityGroup(alb.clone()), 3000)
            .unwrap();
        assert_eq!(from_alb.logical_id(), "SecurityGroupWebFromSecurityGroupAlbTcp3000");

        let rule = stack.resource(from_alb.logical_id()).unwrap();
        assert_eq!(rule.get_property::<u16>("FromPort"), Some(3000));
        assert_eq!(rule.properties["SourceSecurityGroupId"], alb.group_id());
    }

    #[test]
    fn test_endpoint_service_name() {
        assert_eq!(
            endpoint_service_name(Some("ap-northeast-1"), "ecr.api"),
            json!("com.amazonaws.ap-northeast-1.ecr.api")
        );
        assert_eq!(
            endpoint_service_name(None, "s3"),
            json!({ "Fn::Join": ["", ["com.amazonaws.", { "Ref": "AWS::Region" }, ".s3"]] })
        );
    }

    #[test]
    fn test_gateway_endpoint_dedupes_route_tables() {
        let mut stack = Stack::new("s", StackProps::new());
        let vpc = ImportedVpc::from_lookup("vpc-1");
        gateway_endpoint(
            &mut stack,
            "EndpointS3",
            endpoint_service_name(None, "s3"),
            &vpc,
            &subnets(),
        )
        .unwrap();

        let endpoint = stack.resource("EndpointS3").unwrap();
        assert_eq!(endpoint.properties["RouteTableIds"], json!(["rtb-1"]));
        assert_eq!(endpoint.properties["VpcEndpointType"], json!("Gateway"));
    }
}

//! Network shared by every environment
//!
//! The VPC and its two private subnets already exist and are only looked up
//! by id. The stack adds the security group for VPC endpoints and the three
//! endpoints private tasks need to pull images (ECR API, ECR Docker, S3).

use crate::base::{BaseStackProps, StackIdentity, new_stack};
use crate::constructs::network::{
    ImportedSubnet, ImportedVpc, SecurityGroup, endpoint_service_name, gateway_endpoint,
    interface_endpoint,
};
use crate::error::{Result, StackError};
use stackflow_cloud::App;

/// The two private subnets
#[derive(Debug, Clone)]
pub struct Subnets {
    pub private1: ImportedSubnet,
    pub private2: ImportedSubnet,
}

impl Subnets {
    pub fn private(&self) -> Vec<ImportedSubnet> {
        vec![self.private1.clone(), self.private2.clone()]
    }
}

#[derive(Debug, Clone)]
pub struct CommonSecurityGroups {
    pub endpoint: SecurityGroup,
}

#[derive(Debug, Clone)]
pub struct CommonNetworkStack {
    pub stack_name: String,
    pub vpc: ImportedVpc,
    pub subnets: Subnets,
    pub security_groups: CommonSecurityGroups,
}

impl CommonNetworkStack {
    pub const ID: &'static str = "NetworkStack";

    pub fn build(app: &mut App, props: &BaseStackProps<'_>) -> Result<Self> {
        let mut stack = new_stack(StackIdentity::shared(Self::ID), props);
        let context = props.context;

        let vpc = ImportedVpc::from_lookup(context.vpc_id());

        let [first, second] = context.subnet_ids() else {
            return Err(StackError::InvalidContext(format!(
                "expected 2 private subnets, got {}",
                context.subnet_ids().len()
            )));
        };
        let route_table = Some(context.route_table_id().to_string());
        let subnets = Subnets {
            private1: ImportedSubnet::from_attributes("SubnetPrivate1", first, route_table.clone()),
            private2: ImportedSubnet::from_attributes("SubnetPrivate2", second, route_table),
        };

        let endpoint = SecurityGroup::create(&mut stack, "SecurityGroupEndpoint", &vpc)?;

        let private = subnets.private();
        let region = props.region();
        interface_endpoint(
            &mut stack,
            "EndpointEcr",
            endpoint_service_name(region, "ecr.api"),
            &vpc,
            &private,
            &endpoint,
        )?;
        interface_endpoint(
            &mut stack,
            "EndpointEcrDkr",
            endpoint_service_name(region, "ecr.dkr"),
            &vpc,
            &private,
            &endpoint,
        )?;
        gateway_endpoint(
            &mut stack,
            "EndpointS3",
            endpoint_service_name(region, "s3"),
            &vpc,
            &private,
        )?;

        let stack_name = stack.name().to_string();
        app.add_stack(stack);

        Ok(Self {
            stack_name,
            vpc,
            subnets,
            security_groups: CommonSecurityGroups { endpoint },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::dummy_context;
    use serde_json::json;

    #[test]
    fn test_network_stack() {
        let context = dummy_context();
        let mut app = App::new();
        let network = CommonNetworkStack::build(&mut app, &BaseStackProps::new(&context)).unwrap();

        assert_eq!(network.stack_name, "myCdk-common-NetworkStack");
        assert_eq!(network.vpc.vpc_id, "vpc-dummy");
        assert_eq!(network.subnets.private1.subnet_id, "subnet-dummy1");
        assert_eq!(network.subnets.private2.subnet_id, "subnet-dummy2");
        assert_eq!(
            network.subnets.private1.route_table_id.as_deref(),
            Some("rtb-dummy")
        );

        let stack = app.stack("myCdk-common-NetworkStack").unwrap();
        // Imports emit nothing: one group plus three endpoints
        assert_eq!(stack.resources().len(), 4);
        assert_eq!(stack.resources_by_type("AWS::EC2::VPCEndpoint").len(), 3);

        let ecr = stack.resource("EndpointEcr").unwrap();
        assert_eq!(
            ecr.properties["ServiceName"],
            json!("com.amazonaws.dummy-region.ecr.api")
        );
        assert_eq!(ecr.properties["PrivateDnsEnabled"], json!(true));
        assert_eq!(
            ecr.properties["SubnetIds"],
            json!(["subnet-dummy1", "subnet-dummy2"])
        );

        let s3 = stack.resource("EndpointS3").unwrap();
        assert_eq!(s3.properties["RouteTableIds"], json!(["rtb-dummy"]));
    }
}

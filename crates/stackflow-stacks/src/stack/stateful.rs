//! Per-environment state: image registry, database cluster, and the
//! function that stops the cluster every evening

use crate::base::{BaseStackProps, StackIdentity, new_stack};
use crate::constructs::database::{DatabaseCluster, DatabaseClusterProps};
use crate::constructs::function::{Function, FunctionProps, Runtime, Schedule, schedule_rule};
use crate::constructs::iam::PolicyStatement;
use crate::constructs::logs::RetentionDays;
use crate::constructs::network::{ImportedSubnet, ImportedVpc, SecurityGroup};
use crate::constructs::registry::{EcrRepository, EcrRepositoryProps};
use crate::error::Result;
use serde_json::json;
use stackflow_cloud::{App, RemovalPolicy};
use stackflow_core::create_resource_name;

const STOP_DB_FUNCTION: &str = include_str!("../../assets/stop_db_function/app.py");

/// What the stateful stack needs from the network
#[derive(Debug, Clone)]
pub struct StatefulStackDeps {
    pub database_vpc: ImportedVpc,
    pub database_subnets: Vec<ImportedSubnet>,
}

#[derive(Debug, Clone)]
pub struct StatefulStack {
    pub stack_name: String,
    pub ecr_repository: EcrRepository,
    pub db_cluster: DatabaseCluster,
}

impl StatefulStack {
    pub const ID: &'static str = "StatefulStack";

    pub fn build(app: &mut App, deps: StatefulStackDeps, props: &BaseStackProps<'_>) -> Result<Self> {
        let mut stack = new_stack(StackIdentity::per_env(Self::ID), props);
        let context = props.context;

        let repository_name = create_resource_name(
            context.system_name(),
            context.env_type().as_str(),
            "backend-repo",
        )
        .to_lowercase();
        let ecr_repository = EcrRepository::create(
            &mut stack,
            "EcrRepository",
            EcrRepositoryProps {
                repository_name: &repository_name,
                kms_encryption: true,
                max_image_count: Some(2),
                removal_policy: RemovalPolicy::Retain,
            },
        )?;

        let db_security_group =
            SecurityGroup::create(&mut stack, "SecurityGroupDb", &deps.database_vpc)?;
        let db_cluster = DatabaseCluster::create(
            &mut stack,
            "DbCluster",
            DatabaseClusterProps {
                engine: "aurora-postgresql",
                engine_version: "14.3",
                instance_class: "db.t3.medium",
                instances: 1,
                subnet_group_description: "db subnet group",
                subnets: &deps.database_subnets,
                security_group: &db_security_group,
                storage_encrypted: true,
                cloudwatch_logs_exports: &["postgresql"],
                cloudwatch_logs_retention: RetentionDays::OneWeek,
                removal_policy: RemovalPolicy::Retain,
            },
        )?;

        let stop_db = Function::create(
            &mut stack,
            "FunctionStopDb",
            FunctionProps {
                code: STOP_DB_FUNCTION,
                handler: "index.lambda_handler",
                runtime: Runtime::Python39,
                environment: vec![("DB_CLUSTER_IDENTIFIER", db_cluster.identifier())],
                log_retention: RetentionDays::OneWeek,
            },
        )?;
        stop_db.add_to_role_policy(
            &mut stack,
            &[PolicyStatement::allow(["rds:StopDBCluster"], vec![json!("*")])],
        )?;

        // 16:00 UTC every day
        schedule_rule(
            &mut stack,
            "RuleForFunctionStopDb",
            &Schedule::cron("0", "16"),
            &stop_db,
        )?;

        let stack_name = stack.name().to_string();
        app.add_stack(stack);

        Ok(Self {
            stack_name,
            ecr_repository,
            db_cluster,
        })
    }
}

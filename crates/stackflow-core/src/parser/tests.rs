use super::*;
use crate::context::{EnvType, Environment, EnvironmentContext};
use crate::error::ContextError;

#[test]
fn test_parse_selectors_and_environment() {
    let kdl = r#"
        system-name "myCdk"
        env-type "test"
        environment "test" {
            vpc-id "vpc-dummy"
            subnet-ids "subnet-dummy1" "subnet-dummy2"
            route-table-id "rtb-dummy"
        }
    "#;

    let tree = parse_kdl_string(kdl).unwrap();
    assert_eq!(tree.system_name.as_deref(), Some("myCdk"));
    assert_eq!(tree.env_type.as_deref(), Some("test"));

    let entry = tree.entry(EnvType::Test).unwrap();
    assert_eq!(entry.vpc_id, "vpc-dummy");
    assert_eq!(entry.subnet_ids, vec!["subnet-dummy1", "subnet-dummy2"]);
    assert_eq!(entry.route_table_id, "rtb-dummy");
    assert!(entry.env.is_none());
}

#[test]
fn test_parse_account_and_region() {
    let kdl = r#"
        environment "prod" {
            vpc-id "vpc-1"
            subnet-ids "subnet-1" "subnet-2"
            route-table-id "rtb-1"
            account "123456789012"
            region "ap-northeast-1"
        }
    "#;

    let tree = parse_kdl_string(kdl).unwrap();
    let ctx = EnvironmentContext::new(EnvType::Prod, "sys", &tree).unwrap();
    assert_eq!(
        ctx.env(),
        Some(&Environment::new("123456789012", "ap-northeast-1"))
    );
}

#[test]
fn test_parse_env_block() {
    let kdl = r#"
        environment "stage" {
            vpc-id "vpc-1"
            subnet-ids "subnet-1" "subnet-2"
            route-table-id "rtb-1"
            env {
                account "dummy-account"
                region "dummy-region"
            }
        }
    "#;

    let tree = parse_kdl_string(kdl).unwrap();
    let entry = tree.entry(EnvType::Stage).unwrap();
    assert_eq!(
        entry.env,
        Some(Environment::new("dummy-account", "dummy-region"))
    );
}

#[test]
fn test_parse_public_subnets() {
    let kdl = r#"
        environment "dev" {
            vpc-id "vpc-1"
            subnet-ids "subnet-1" "subnet-2"
            public-subnet-ids "subnet-3" "subnet-4"
            route-table-id "rtb-1"
        }
    "#;

    let tree = parse_kdl_string(kdl).unwrap();
    let ctx = EnvironmentContext::new(EnvType::Dev, "sys", &tree).unwrap();
    assert_eq!(ctx.public_subnet_ids(), ["subnet-3", "subnet-4"]);
}

#[test]
fn test_parse_multiple_environments() {
    let kdl = r#"
        environment "dev" {
            vpc-id "vpc-dev"
            subnet-ids "subnet-1" "subnet-2"
            route-table-id "rtb-dev"
        }
        environment "prod" {
            vpc-id "vpc-prod"
            subnet-ids "subnet-3" "subnet-4"
            route-table-id "rtb-prod"
        }
    "#;

    let tree = parse_kdl_string(kdl).unwrap();
    assert_eq!(tree.entries.len(), 2);
    assert_eq!(tree.entry(EnvType::Prod).unwrap().vpc_id, "vpc-prod");
}

#[test]
fn test_environment_without_name_is_rejected() {
    let kdl = r#"
        environment {
            vpc-id "vpc-1"
        }
    "#;

    let result = parse_kdl_string(kdl);
    assert!(matches!(result, Err(ContextError::InvalidConfig(_))));
}

#[test]
fn test_unknown_field_is_rejected() {
    let kdl = r#"
        environment "dev" {
            vpc "vpc-1"
        }
    "#;

    let result = parse_kdl_string(kdl);
    assert!(matches!(result, Err(ContextError::MalformedEntry { .. })));
}

#[test]
fn test_missing_subnets_fails_on_resolve() {
    let kdl = r#"
        environment "dev" {
            vpc-id "vpc-1"
            route-table-id "rtb-1"
        }
    "#;

    // Parsing succeeds; the entry is only checked when it is resolved
    let tree = parse_kdl_string(kdl).unwrap();
    let result = EnvironmentContext::new(EnvType::Dev, "sys", &tree);
    assert!(matches!(result, Err(ContextError::MalformedEntry { .. })));
}

#[test]
fn test_invalid_kdl() {
    let result = parse_kdl_string("environment \"dev\" {");
    assert!(matches!(result, Err(ContextError::KdlParse(_))));
}

#![allow(deprecated)] // TODO: cargo_bin → cargo_bin_cmd! once assert_cmd 2.1 is the floor

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

mod common;
use common::TestProject;

/// CLI help lists the subcommands
#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("stackflow").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("synthesize deployment templates"))
        .stdout(predicate::str::contains("synth"))
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("validate"));
}

/// The version subcommand prints the binary name
#[test]
fn test_cli_version() {
    let mut cmd = Command::cargo_bin("stackflow").unwrap();
    cmd.arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("stackflow"));
}

/// synth help shows its argument and flags
#[test]
fn test_synth_help() {
    let mut cmd = Command::cargo_bin("stackflow").unwrap();
    cmd.arg("synth")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("[STACK]"))
        .stdout(predicate::str::contains("--json"))
        .stdout(predicate::str::contains("--output"));
}

/// Unknown subcommands fail
#[test]
fn test_invalid_command() {
    let mut cmd = Command::cargo_bin("stackflow").unwrap();
    cmd.arg("invalid-command").assert().failure();
}

/// validate fails when no configuration file is found
#[test]
fn test_validate_without_config() {
    let project = TestProject::new();
    project
        .command()
        .env("XDG_CONFIG_HOME", project.path())
        .env("HOME", project.path())
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No configuration found"));
}

/// validate prints a summary for a well-formed project
#[test]
fn test_validate_dummy_project() {
    let project = TestProject::with_dummy_config();
    project
        .command()
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"))
        .stdout(predicate::str::contains("myCdk-common-NetworkStack"))
        .stdout(predicate::str::contains("myCdk-test-CicdStack"));
}

/// list prints qualified stack names in build order
#[test]
fn test_list_in_build_order() {
    let project = TestProject::with_dummy_config();
    let output = project.command().arg("ls").output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let names: Vec<&str> = stdout
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .collect();
    assert_eq!(
        names,
        vec![
            "myCdk-common-StatefulStack",
            "myCdk-common-NetworkStack",
            "myCdk-test-StatefulStack",
            "myCdk-test-EcsStack",
            "myCdk-test-CicdStack",
        ]
    );
}

/// synth writes every template and the manifest
#[test]
fn test_synth_writes_assembly() {
    let project = TestProject::with_dummy_config();
    project
        .command()
        .args(["synth", "--quiet"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let out_dir = project.out_dir();
    for name in [
        "myCdk-common-StatefulStack",
        "myCdk-common-NetworkStack",
        "myCdk-test-StatefulStack",
        "myCdk-test-EcsStack",
        "myCdk-test-CicdStack",
    ] {
        assert!(out_dir.join(format!("{}.template.json", name)).exists());
    }

    let manifest: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out_dir.join("manifest.json")).unwrap())
            .unwrap();
    assert_eq!(
        manifest["artifacts"]["myCdk-test-EcsStack"]["type"],
        "aws:cloudformation:stack"
    );
    assert_eq!(
        manifest["artifacts"]["myCdk-test-EcsStack"]["environment"],
        "aws://unknown-account/unknown-region"
    );
}

/// A stack picked by local id is printed as JSON
#[test]
fn test_synth_single_stack_as_json() {
    let project = TestProject::with_dummy_config();
    let output = project
        .command()
        .args(["synth", "EcsStack", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let template: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(
        template["Resources"]["Listener"]["Properties"]["Port"],
        serde_json::json!(80)
    );
}

/// A local id shared by two stacks needs the qualified name
#[test]
fn test_synth_ambiguous_stack_id() {
    let project = TestProject::with_dummy_config();
    project
        .command()
        .args(["synth", "StatefulStack"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ambiguous"));
}

/// Default account and region come from the process environment
#[test]
fn test_default_env_from_environment() {
    let project = TestProject::with_dummy_config();
    project
        .command()
        .env("STACKFLOW_DEFAULT_ACCOUNT", "123456789012")
        .env("STACKFLOW_DEFAULT_REGION", "ap-northeast-1")
        .args(["synth", "--quiet"])
        .assert()
        .success();

    let manifest: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(project.out_dir().join("manifest.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(
        manifest["artifacts"]["myCdk-common-NetworkStack"]["environment"],
        "aws://123456789012/ap-northeast-1"
    );
}

/// -c envType=... selects an environment that is not configured
#[test]
fn test_context_override_selects_missing_env() {
    let project = TestProject::with_dummy_config();
    project
        .command()
        .args(["validate", "-c", "envType=prod"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("prod"));
}

/// --system-name wins over the configuration file
#[test]
fn test_system_name_flag_overrides_config() {
    let project = TestProject::with_dummy_config();
    project
        .command()
        .args(["list", "--system-name", "other"])
        .assert()
        .success()
        .stdout(predicate::str::contains("other-common-NetworkStack"));
}

/// cdk.json style context is accepted
#[test]
fn test_cdk_json_context() {
    let project = TestProject::new();
    project.write_file(
        "cdk.json",
        r#"{
            "app": "stackflow synth",
            "context": {
                "systemName": "jsonSys",
                "envType": "dev",
                "dev": {
                    "vpcId": "vpc-1",
                    "subnetIds": ["subnet-1", "subnet-2"],
                    "routeTableId": "rtb-1",
                    "env": { "account": "111111111111", "region": "us-east-1" }
                }
            }
        }"#,
    );

    project
        .command()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("jsonSys-dev-EcsStack"));
}

/// An environment with one subnet is rejected
#[test]
fn test_malformed_subnets_rejected() {
    let project = TestProject::new();
    project.write_file(
        "stackflow.kdl",
        r#"
system-name "myCdk"
env-type "test"
environment "test" {
    vpc-id "vpc-dummy"
    subnet-ids "subnet-dummy1"
    route-table-id "rtb-dummy"
}
"#,
    );

    project
        .command()
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("subnetIds"));
}

use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const DUMMY_KDL: &str = r#"
system-name "myCdk"
env-type "test"

environment "test" {
    vpc-id "vpc-dummy"
    subnet-ids "subnet-dummy1" "subnet-dummy2"
    route-table-id "rtb-dummy"
}
"#;

pub struct TestProject {
    pub root: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        Self { root }
    }

    /// Project with the dummy `test` environment in stackflow.kdl
    pub fn with_dummy_config() -> Self {
        let project = Self::new();
        project.write_file("stackflow.kdl", DUMMY_KDL);
        project
    }

    pub fn write_file(&self, name: &str, content: &str) {
        fs::write(self.root.path().join(name), content).unwrap();
    }

    pub fn path(&self) -> PathBuf {
        self.root.path().to_path_buf()
    }

    #[allow(dead_code)]
    pub fn out_dir(&self) -> PathBuf {
        self.root.path().join("stackflow.out")
    }

    /// `stackflow` running in the project directory with a clean environment
    #[allow(deprecated)]
    pub fn command(&self) -> Command {
        command_in(self.root.path())
    }
}

#[allow(deprecated)]
pub fn command_in(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("stackflow").unwrap();
    cmd.current_dir(dir)
        .env_remove("STACKFLOW_CONFIG_PATH")
        .env_remove("STACKFLOW_ENV_TYPE")
        .env_remove("STACKFLOW_SYSTEM_NAME")
        .env_remove("STACKFLOW_DEFAULT_ACCOUNT")
        .env_remove("STACKFLOW_DEFAULT_REGION")
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1");
    cmd
}

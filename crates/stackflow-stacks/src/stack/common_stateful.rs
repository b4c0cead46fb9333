//! State shared by every environment: the application source repository

use crate::base::{BaseStackProps, StackIdentity, new_stack};
use crate::constructs::registry::CodeRepository;
use crate::error::Result;
use stackflow_cloud::{App, RemovalPolicy};
use stackflow_core::{COMMON_NAMESPACE, create_resource_name};

#[derive(Debug, Clone)]
pub struct CommonStatefulStack {
    pub stack_name: String,
    pub code_repository: CodeRepository,
}

impl CommonStatefulStack {
    pub const ID: &'static str = "StatefulStack";

    pub fn build(app: &mut App, props: &BaseStackProps<'_>) -> Result<Self> {
        let mut stack = new_stack(StackIdentity::shared(Self::ID), props);

        let repository_name = create_resource_name(
            props.context.system_name(),
            COMMON_NAMESPACE,
            "backend-repo",
        );
        let code_repository = CodeRepository::create(
            &mut stack,
            "CodeCommitRepository",
            &repository_name,
            RemovalPolicy::Retain,
        )?;

        let stack_name = stack.name().to_string();
        app.add_stack(stack);

        Ok(Self {
            stack_name,
            code_repository,
        })
    }
}

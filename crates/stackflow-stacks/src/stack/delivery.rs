//! Per-environment delivery: build project and the
//! Source → Build → Deploy pipeline

use crate::base::{BaseStackProps, StackIdentity, new_stack};
use crate::constructs::iam::PolicyStatement;
use crate::constructs::logs::{LogGroup, RetentionDays};
use crate::constructs::pipeline::{
    Action, Artifact, Pipeline, PipelineProject, PipelineProjectProps, Stage,
};
use crate::constructs::registry::{CodeRepository, EcrRepository};
use crate::constructs::service::FargateService;
use crate::error::Result;
use serde_json::json;
use stackflow_cloud::token::{AWS_ACCOUNT_ID, AWS_REGION, pseudo, sanitize_id};
use stackflow_cloud::{App, RemovalPolicy};
use stackflow_core::create_resource_name;

const BUILD_IMAGE: &str = "aws/codebuild/standard:4.0";
const SOURCE_BRANCH: &str = "master";

/// Actions the build needs to push images
const ECR_PUSH_ACTIONS: [&str; 6] = [
    "ecr:BatchCheckLayerAvailability",
    "ecr:CompleteLayerUpload",
    "ecr:GetAuthorizationToken",
    "ecr:InitiateLayerUpload",
    "ecr:PutImage",
    "ecr:UploadLayerPart",
];

/// What the delivery stack needs from the earlier stacks
#[derive(Debug, Clone)]
pub struct DeliveryStackDeps {
    pub code_repository: CodeRepository,
    pub ecr_repository: EcrRepository,
    pub fargate_service: FargateService,
}

#[derive(Debug, Clone)]
pub struct DeliveryStack {
    pub stack_name: String,
    pub pipeline: Pipeline,
}

impl DeliveryStack {
    pub const ID: &'static str = "CicdStack";

    pub fn build(app: &mut App, deps: DeliveryStackDeps, props: &BaseStackProps<'_>) -> Result<Self> {
        let mut stack = new_stack(StackIdentity::per_env(Self::ID), props);
        let context = props.context;
        let env_name = context.env_type().as_str();

        // Build project
        let build_project_name = create_resource_name(context.system_name(), env_name, "build");
        let log_group = LogGroup::create(
            &mut stack,
            &format!("LogGroup{}", sanitize_id(&build_project_name)),
            json!(format!("/aws/codebuild/{}", build_project_name)),
            RetentionDays::OneWeek,
            RemovalPolicy::Destroy,
        )?;
        // Push rights are granted on every registry, not just the one built for.
        let build_project = PipelineProject::create(
            &mut stack,
            "BuildProject",
            PipelineProjectProps {
                build_image: BUILD_IMAGE,
                privileged: true,
                log_group: &log_group,
                role_statements: vec![PolicyStatement::allow(ECR_PUSH_ACTIONS, vec![json!("*")])],
            },
        )?;

        // Pipeline
        let source_output = Artifact::for_action("Source", "CodeCommit");
        let build_output = Artifact::for_action("Build", "CodeBuild");

        let account = props
            .account()
            .map(|a| json!(a))
            .unwrap_or_else(|| pseudo(AWS_ACCOUNT_ID));
        let region = props
            .region()
            .map(|r| json!(r))
            .unwrap_or_else(|| pseudo(AWS_REGION));

        let stages = vec![
            Stage::new(
                "Source",
                vec![Action::CodeCommitSource {
                    name: "CodeCommit".to_string(),
                    repository: deps.code_repository,
                    branch: SOURCE_BRANCH.to_string(),
                    output: source_output.clone(),
                }],
            ),
            Stage::new(
                "Build",
                vec![Action::CodeBuild {
                    name: "CodeBuild".to_string(),
                    project: build_project,
                    input: source_output,
                    output: build_output.clone(),
                    environment_variables: vec![
                        ("ECR_REPO_NAME".to_string(), deps.ecr_repository.name()),
                        ("AWS_ACCOUNT_ID".to_string(), account),
                        ("AWS_DEFAULT_REGION".to_string(), region),
                    ],
                }],
            ),
            Stage::new(
                "Deploy",
                vec![Action::EcsDeploy {
                    name: "CodeDeploy".to_string(),
                    service: deps.fargate_service,
                    input: build_output,
                }],
            ),
        ];

        let pipeline_id =
            sanitize_id(&create_resource_name(context.system_name(), env_name, "Pipeline"));
        let pipeline = Pipeline::create(&mut stack, &pipeline_id, stages)?;

        let stack_name = stack.name().to_string();
        app.add_stack(stack);

        Ok(Self {
            stack_name,
            pipeline,
        })
    }
}

//! Build projects and delivery pipelines

use crate::constructs::iam::{PolicyStatement, Role};
use crate::constructs::logs::LogGroup;
use crate::constructs::registry::CodeRepository;
use crate::constructs::service::FargateService;
use crate::error::{Result, StackError};
use serde_json::{Value, json};
use stackflow_cloud::token::{AWS_ACCOUNT_ID, AWS_PARTITION, AWS_REGION, fn_join, fn_sub, pseudo};
use stackflow_cloud::{RemovalPolicy, Resource, ResourceRef, Stack};

/// Build project fed by a pipeline
#[derive(Debug, Clone)]
pub struct PipelineProject {
    resource: ResourceRef,
    role: Role,
}

/// Build project settings
#[derive(Debug, Clone)]
pub struct PipelineProjectProps<'a> {
    pub build_image: &'a str,
    pub privileged: bool,
    pub log_group: &'a LogGroup,
    /// Extra permissions for the build role
    pub role_statements: Vec<PolicyStatement>,
}

impl PipelineProject {
    /// Emits `{id}Role`, `{id}RoleDefaultPolicy` and `{id}`
    pub fn create(stack: &mut Stack, id: &str, props: PipelineProjectProps<'_>) -> Result<Self> {
        let role = Role::for_service(
            stack,
            &format!("{}Role", id),
            "codebuild.amazonaws.com",
            Vec::new(),
        )?;

        let mut statements = vec![PolicyStatement::allow(
            ["logs:CreateLogStream", "logs:PutLogEvents"],
            vec![props.log_group.arn()],
        )];
        statements.extend(props.role_statements);
        let policy = role.attach_default_policy(stack, &statements)?;

        let resource = stack.add(
            Resource::new(
                id,
                "AWS::CodeBuild::Project",
                json!({
                    "Artifacts": { "Type": "CODEPIPELINE" },
                    "Environment": {
                        "ComputeType": "BUILD_GENERAL1_SMALL",
                        "Image": props.build_image,
                        "ImagePullCredentialsType": "CODEBUILD",
                        "PrivilegedMode": props.privileged,
                        "Type": "LINUX_CONTAINER"
                    },
                    "LogsConfig": {
                        "CloudWatchLogs": {
                            "GroupName": props.log_group.name(),
                            "Status": "ENABLED"
                        }
                    },
                    "ServiceRole": role.arn(),
                    "Source": { "Type": "CODEPIPELINE" },
                    "EncryptionKey": "alias/aws/s3"
                }),
            )
            .depends_on(policy.logical_id()),
        )?;

        Ok(Self { resource, role })
    }

    pub fn name(&self) -> Value {
        self.resource.ref_token()
    }

    pub fn arn(&self) -> Value {
        self.resource.att("Arn")
    }

    pub fn role(&self) -> &Role {
        &self.role
    }
}

/// Artifact passed between actions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact(String);

impl Artifact {
    /// `Artifact_{stage}_{action}`
    pub fn for_action(stage: &str, action: &str) -> Self {
        Self(format!("Artifact_{}_{}", stage, action))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

/// Pipeline action
#[derive(Debug, Clone)]
pub enum Action {
    CodeCommitSource {
        name: String,
        repository: CodeRepository,
        branch: String,
        output: Artifact,
    },
    CodeBuild {
        name: String,
        project: PipelineProject,
        input: Artifact,
        output: Artifact,
        environment_variables: Vec<(String, Value)>,
    },
    EcsDeploy {
        name: String,
        service: FargateService,
        input: Artifact,
    },
}

impl Action {
    pub fn name(&self) -> &str {
        match self {
            Action::CodeCommitSource { name, .. }
            | Action::CodeBuild { name, .. }
            | Action::EcsDeploy { name, .. } => name,
        }
    }

    fn category(&self) -> &'static str {
        match self {
            Action::CodeCommitSource { .. } => "Source",
            Action::CodeBuild { .. } => "Build",
            Action::EcsDeploy { .. } => "Deploy",
        }
    }

    fn provider(&self) -> &'static str {
        match self {
            Action::CodeCommitSource { .. } => "CodeCommit",
            Action::CodeBuild { .. } => "CodeBuild",
            Action::EcsDeploy { .. } => "ECS",
        }
    }

    fn configuration(&self) -> Value {
        match self {
            Action::CodeCommitSource {
                repository, branch, ..
            } => json!({
                "RepositoryName": repository.name(),
                "BranchName": branch,
                "PollForSourceChanges": false
            }),
            Action::CodeBuild {
                project,
                environment_variables,
                ..
            } => {
                let mut configuration = json!({ "ProjectName": project.name() });
                if !environment_variables.is_empty() {
                    configuration["EnvironmentVariables"] =
                        environment_variables_value(environment_variables);
                }
                configuration
            }
            Action::EcsDeploy { service, .. } => json!({
                "ClusterName": service.cluster_name(),
                "ServiceName": service.service_name()
            }),
        }
    }

    fn to_value(&self) -> Value {
        let mut action = json!({
            "ActionTypeId": {
                "Category": self.category(),
                "Owner": "AWS",
                "Provider": self.provider(),
                "Version": "1"
            },
            "Configuration": self.configuration(),
            "Name": self.name(),
            "RunOrder": 1
        });

        let (input, output) = match self {
            Action::CodeCommitSource { output, .. } => (None, Some(output)),
            Action::CodeBuild { input, output, .. } => (Some(input), Some(output)),
            Action::EcsDeploy { input, .. } => (Some(input), None),
        };
        if let Some(input) = input {
            action["InputArtifacts"] = json!([{ "Name": input.name() }]);
        }
        if let Some(output) = output {
            action["OutputArtifacts"] = json!([{ "Name": output.name() }]);
        }
        action
    }

    /// Permissions the pipeline role needs to run this action
    fn role_statements(&self) -> Vec<PolicyStatement> {
        match self {
            Action::CodeCommitSource { repository, .. } => vec![PolicyStatement::allow(
                [
                    "codecommit:GetBranch",
                    "codecommit:GetCommit",
                    "codecommit:UploadArchive",
                    "codecommit:GetUploadArchiveStatus",
                    "codecommit:CancelUploadArchive",
                ],
                vec![repository.arn()],
            )],
            Action::CodeBuild { project, .. } => vec![PolicyStatement::allow(
                [
                    "codebuild:BatchGetBuilds",
                    "codebuild:StartBuild",
                    "codebuild:StopBuild",
                ],
                vec![project.arn()],
            )],
            Action::EcsDeploy { .. } => vec![
                PolicyStatement::allow(
                    [
                        "ecs:DescribeServices",
                        "ecs:DescribeTaskDefinition",
                        "ecs:DescribeTasks",
                        "ecs:ListTasks",
                        "ecs:RegisterTaskDefinition",
                        "ecs:TagResource",
                        "ecs:UpdateService",
                    ],
                    vec![json!("*")],
                ),
                PolicyStatement::allow(["iam:PassRole"], vec![json!("*")]),
            ],
        }
    }
}

/// Build environment variables as the JSON string the engine expects
///
/// Literal strings are inlined as escaped JSON; every other value is a
/// token spliced in through an `Fn::Sub` placeholder.
fn environment_variables_value(variables: &[(String, Value)]) -> Value {
    let mut entries = Vec::with_capacity(variables.len());
    let mut substitutions = Vec::new();

    for (index, (name, value)) in variables.iter().enumerate() {
        let value = match value {
            Value::String(literal) => sub_literal(literal),
            token => {
                let placeholder = format!("Var{}", index);
                let spliced = format!("\"${{{}}}\"", placeholder);
                substitutions.push((placeholder, token.clone()));
                spliced
            }
        };
        entries.push(format!(
            r#"{{"name":{},"type":"PLAINTEXT","value":{}}}"#,
            sub_literal(name),
            value
        ));
    }

    let template = format!("[{}]", entries.join(","));
    fn_sub(
        &template,
        substitutions
            .iter()
            .map(|(k, v)| (k.as_str(), v.clone()))
            .collect(),
    )
}

/// JSON string literal with `${` escaped so `Fn::Sub` leaves it alone
fn sub_literal(value: &str) -> String {
    Value::String(value.to_string())
        .to_string()
        .replace("${", "${!")
}

/// Read/write on the artifacts bucket and its objects
fn artifact_bucket_statement(bucket: &ResourceRef) -> PolicyStatement {
    PolicyStatement::allow(
        [
            "s3:GetObject*",
            "s3:GetBucket*",
            "s3:List*",
            "s3:DeleteObject*",
            "s3:PutObject",
            "s3:Abort*",
        ],
        vec![
            bucket.att("Arn"),
            fn_join("", vec![bucket.att("Arn"), json!("/*")]),
        ],
    )
}

#[derive(Debug, Clone)]
pub struct Stage {
    pub name: String,
    pub actions: Vec<Action>,
}

impl Stage {
    pub fn new(name: impl Into<String>, actions: Vec<Action>) -> Self {
        Self {
            name: name.into(),
            actions,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    resource: ResourceRef,
}

impl Pipeline {
    /// Emits `{id}ArtifactsBucket`, `{id}Role` (+ policy), `{id}`, and for
    /// every source action a rule that starts the pipeline on push
    pub fn create(stack: &mut Stack, id: &str, stages: Vec<Stage>) -> Result<Self> {
        if stages.len() < 2 {
            return Err(StackError::InvalidConstruct {
                id: id.to_string(),
                message: "a pipeline needs at least two stages".to_string(),
            });
        }
        if let Some(empty) = stages.iter().find(|s| s.actions.is_empty()) {
            return Err(StackError::InvalidConstruct {
                id: id.to_string(),
                message: format!("stage '{}' has no actions", empty.name),
            });
        }

        let bucket = stack.add(
            Resource::new(
                format!("{}ArtifactsBucket", id),
                "AWS::S3::Bucket",
                json!({
                    "BucketEncryption": {
                        "ServerSideEncryptionConfiguration": [{
                            "ServerSideEncryptionByDefault": { "SSEAlgorithm": "aws:kms" }
                        }]
                    },
                    "PublicAccessBlockConfiguration": {
                        "BlockPublicAcls": true,
                        "BlockPublicPolicy": true,
                        "IgnorePublicAcls": true,
                        "RestrictPublicBuckets": true
                    }
                }),
            )
            .with_removal_policy(RemovalPolicy::Retain),
        )?;

        let role = Role::for_service(
            stack,
            &format!("{}Role", id),
            "codepipeline.amazonaws.com",
            Vec::new(),
        )?;

        let artifact_access = artifact_bucket_statement(&bucket);
        let mut statements = vec![artifact_access.clone()];
        for action in stages.iter().flat_map(|s| &s.actions) {
            statements.extend(action.role_statements());
            // Build projects fetch their input and upload their output themselves.
            if let Action::CodeBuild { project, .. } = action {
                project
                    .role()
                    .add_to_default_policy(stack, std::slice::from_ref(&artifact_access))?;
            }
        }
        let policy = role.attach_default_policy(stack, &statements)?;

        let stage_values: Vec<Value> = stages
            .iter()
            .map(|stage| {
                let actions: Vec<Value> = stage.actions.iter().map(Action::to_value).collect();
                json!({ "Actions": actions, "Name": stage.name })
            })
            .collect();

        let resource = stack.add(
            Resource::new(
                id,
                "AWS::CodePipeline::Pipeline",
                json!({
                    "ArtifactStore": {
                        "Location": bucket.ref_token(),
                        "Type": "S3"
                    },
                    "RoleArn": role.arn(),
                    "Stages": stage_values
                }),
            )
            .depends_on(policy.logical_id())
            .depends_on(role.logical_id()),
        )?;
        let pipeline = Self { resource };

        for action in stages.iter().flat_map(|s| &s.actions) {
            if let Action::CodeCommitSource {
                name,
                repository,
                branch,
                ..
            } = action
            {
                pipeline.add_source_trigger(stack, name, repository, branch)?;
            }
        }

        tracing::debug!(
            stack = %stack.name(),
            pipeline = %id,
            stages = stages.len(),
            "Pipeline declared"
        );
        Ok(pipeline)
    }

    pub fn logical_id(&self) -> &str {
        self.resource.logical_id()
    }

    pub fn arn(&self) -> Value {
        fn_join(
            "",
            vec![
                json!("arn:"),
                pseudo(AWS_PARTITION),
                json!(":codepipeline:"),
                pseudo(AWS_REGION),
                json!(":"),
                pseudo(AWS_ACCOUNT_ID),
                json!(":"),
                self.resource.ref_token(),
            ],
        )
    }

    /// Rule starting the pipeline when `branch` of `repository` changes
    fn add_source_trigger(
        &self,
        stack: &mut Stack,
        action_name: &str,
        repository: &CodeRepository,
        branch: &str,
    ) -> Result<ResourceRef> {
        let events_role = Role::for_service(
            stack,
            &format!("{}EventsRole", self.logical_id()),
            "events.amazonaws.com",
            Vec::new(),
        )?;
        events_role.attach_default_policy(
            stack,
            &[PolicyStatement::allow(
                ["codepipeline:StartPipelineExecution"],
                vec![self.arn()],
            )],
        )?;

        Ok(stack.add(Resource::new(
            format!("{}{}EventRule", self.logical_id(), action_name),
            "AWS::Events::Rule",
            json!({
                "EventPattern": {
                    "detail": {
                        "event": ["referenceCreated", "referenceUpdated"],
                        "referenceName": [branch]
                    },
                    "detail-type": ["CodeCommit Repository State Change"],
                    "resources": [repository.arn()],
                    "source": ["aws.codecommit"]
                },
                "State": "ENABLED",
                "Targets": [{
                    "Arn": self.arn(),
                    "Id": "Target0",
                    "RoleArn": events_role.arn()
                }]
            }),
        ))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constructs::logs::RetentionDays;
    use stackflow_cloud::{Reference, StackProps};

    fn project(stack: &mut Stack) -> PipelineProject {
        let log_group = LogGroup::create(
            stack,
            "BuildLogGroup",
            json!("/aws/codebuild/sys-dev-build"),
            RetentionDays::OneWeek,
            RemovalPolicy::Destroy,
        )
        .unwrap();
        PipelineProject::create(
            stack,
            "BuildProject",
            PipelineProjectProps {
                build_image: "aws/codebuild/standard:4.0",
                privileged: true,
                log_group: &log_group,
                role_statements: vec![PolicyStatement::allow(["ecr:PutImage"], vec![json!("*")])],
            },
        )
        .unwrap()
    }

    #[test]
    fn test_pipeline_project() {
        let mut stack = Stack::new("s", StackProps::new());
        project(&mut stack);

        let build = stack.resource("BuildProject").unwrap();
        assert_eq!(
            build.properties["Environment"]["Image"],
            json!("aws/codebuild/standard:4.0")
        );
        assert_eq!(build.properties["Environment"]["PrivilegedMode"], json!(true));
        assert_eq!(build.depends_on, vec!["BuildProjectRoleDefaultPolicy"]);

        let policy = stack.resource("BuildProjectRoleDefaultPolicy").unwrap();
        let statements = policy.properties["PolicyDocument"]["Statement"]
            .as_array()
            .unwrap();
        assert_eq!(statements.len(), 2);
        assert_eq!(statements[1]["Action"], json!("ecr:PutImage"));
    }

    /// Tokens go through placeholders, literals are inlined
    #[test]
    fn test_environment_variables_use_sub() {
        let value = environment_variables_value(&[
            ("ECR_REPO_NAME".to_string(), json!({ "Ref": "Repo" })),
            ("AWS_DEFAULT_REGION".to_string(), json!("ap-northeast-1")),
        ]);
        assert_eq!(
            value["Fn::Sub"][0],
            json!(
                r#"[{"name":"ECR_REPO_NAME","type":"PLAINTEXT","value":"${Var0}"},{"name":"AWS_DEFAULT_REGION","type":"PLAINTEXT","value":"ap-northeast-1"}]"#
            )
        );
        assert_eq!(value["Fn::Sub"][1]["Var0"], json!({ "Ref": "Repo" }));
        assert!(value["Fn::Sub"][1].get("Var1").is_none());
    }

    /// Quotes, backslashes and `${` in literal values stay valid JSON
    #[test]
    fn test_environment_variables_escape_literals() {
        let value = environment_variables_value(&[(
            "LABEL".to_string(),
            json!(r#"a "quoted" \path ${NOT_A_VAR}"#),
        )]);
        let template = value["Fn::Sub"][0].as_str().unwrap();

        // The engine turns `${!` back into `${` before the value is parsed.
        let rendered = template.replace("${!", "${");
        let parsed: Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(parsed[0]["value"], json!(r#"a "quoted" \path ${NOT_A_VAR}"#));
    }

    /// Build projects get read/write on the pipeline's artifacts bucket
    #[test]
    fn test_build_role_reads_artifacts() {
        let mut stack = Stack::new("s", StackProps::new());
        let build = project(&mut stack);
        let repository =
            CodeRepository::create(&mut stack, "Repo", "sys-repo", RemovalPolicy::Retain).unwrap();
        let source = Artifact::for_action("Source", "CodeCommit");
        let stages = vec![
            Stage::new(
                "Source",
                vec![Action::CodeCommitSource {
                    name: "CodeCommit".to_string(),
                    repository,
                    branch: "master".to_string(),
                    output: source.clone(),
                }],
            ),
            Stage::new(
                "Build",
                vec![Action::CodeBuild {
                    name: "CodeBuild".to_string(),
                    project: build,
                    input: source,
                    output: Artifact::for_action("Build", "CodeBuild"),
                    environment_variables: Vec::new(),
                }],
            ),
        ];
        Pipeline::create(&mut stack, "Pipeline", stages).unwrap();

        let policy = stack.resource("BuildProjectRoleDefaultPolicy").unwrap();
        let statements = policy.properties["PolicyDocument"]["Statement"]
            .as_array()
            .unwrap();
        let s3 = statements
            .iter()
            .find(|s| {
                s["Action"]
                    .as_array()
                    .is_some_and(|a| a.contains(&json!("s3:PutObject")))
            })
            .unwrap();
        assert_eq!(
            s3["Resource"][0],
            Reference::new("s", "PipelineArtifactsBucket")
                .with_attribute("Arn")
                .to_token()
        );
    }

    #[test]
    fn test_artifact_names() {
        assert_eq!(
            Artifact::for_action("Source", "CodeCommit").name(),
            "Artifact_Source_CodeCommit"
        );
    }

    #[test]
    fn test_pipeline_requires_actions() {
        let mut stack = Stack::new("s", StackProps::new());
        let build = project(&mut stack);
        let stages = vec![
            Stage::new("Source", Vec::new()),
            Stage::new(
                "Build",
                vec![Action::CodeBuild {
                    name: "CodeBuild".to_string(),
                    project: build,
                    input: Artifact::for_action("Source", "CodeCommit"),
                    output: Artifact::for_action("Build", "CodeBuild"),
                    environment_variables: Vec::new(),
                }],
            ),
        ];
        assert!(matches!(
            Pipeline::create(&mut stack, "Pipeline", stages),
            Err(StackError::InvalidConstruct { .. })
        ));
    }
}

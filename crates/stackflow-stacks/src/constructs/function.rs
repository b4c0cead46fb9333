//! Functions and scheduled event rules

use crate::constructs::iam::{PolicyStatement, Role, managed_policy_arn};
use crate::constructs::logs::{LogGroup, RetentionDays};
use crate::error::Result;
use serde_json::{Map, Value, json};
use stackflow_cloud::token::fn_join;
use stackflow_cloud::{RemovalPolicy, Resource, ResourceRef, Stack};
use std::fmt;

/// Runtimes functions can be declared with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Runtime {
    Python39,
}

impl Runtime {
    pub fn as_str(&self) -> &'static str {
        match self {
            Runtime::Python39 => "python3.9",
        }
    }
}

/// Function settings
///
/// `code` is deployed inline, which the engine stores as `index.py`; the
/// handler therefore names the `index` module.
#[derive(Debug, Clone)]
pub struct FunctionProps<'a> {
    pub code: &'a str,
    pub handler: &'a str,
    pub runtime: Runtime,
    pub environment: Vec<(&'a str, Value)>,
    pub log_retention: RetentionDays,
}

#[derive(Debug, Clone)]
pub struct Function {
    resource: ResourceRef,
    role: Role,
}

impl Function {
    /// Emits `{id}ServiceRole`, `{id}` and `{id}LogGroup`
    pub fn create(stack: &mut Stack, id: &str, props: FunctionProps<'_>) -> Result<Self> {
        let role = Role::for_service(
            stack,
            &format!("{}ServiceRole", id),
            "lambda.amazonaws.com",
            vec![managed_policy_arn("service-role/AWSLambdaBasicExecutionRole")],
        )?;

        let mut properties = json!({
            "Code": { "ZipFile": props.code },
            "Handler": props.handler,
            "Role": role.arn(),
            "Runtime": props.runtime.as_str()
        });
        if !props.environment.is_empty() {
            let variables: Map<String, Value> = props
                .environment
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect();
            properties["Environment"] = json!({ "Variables": variables });
        }

        let resource = stack.add(
            Resource::new(id, "AWS::Lambda::Function", properties).depends_on(role.logical_id()),
        )?;

        LogGroup::create(
            stack,
            &format!("{}LogGroup", id),
            fn_join("", vec![json!("/aws/lambda/"), resource.ref_token()]),
            props.log_retention,
            RemovalPolicy::Retain,
        )?;

        Ok(Self { resource, role })
    }

    pub fn logical_id(&self) -> &str {
        self.resource.logical_id()
    }

    pub fn arn(&self) -> Value {
        self.resource.att("Arn")
    }

    /// Grants the execution role `statements`
    pub fn add_to_role_policy(
        &self,
        stack: &mut Stack,
        statements: &[PolicyStatement],
    ) -> Result<()> {
        self.role.add_to_default_policy(stack, statements)
    }
}

/// Cron schedule in the engine's six-field form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    minute: String,
    hour: String,
    month: String,
    week_day: Option<String>,
    year: String,
}

impl Schedule {
    /// Every day at `hour:minute` UTC
    pub fn cron(minute: &str, hour: &str) -> Self {
        Self {
            minute: minute.to_string(),
            hour: hour.to_string(),
            month: "*".to_string(),
            week_day: None,
            year: "*".to_string(),
        }
    }

    pub fn on_week_day(mut self, week_day: &str) -> Self {
        self.week_day = Some(week_day.to_string());
        self
    }

    pub fn expression(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Day-of-month and day-of-week cannot both be set; the unset one is `?`.
        let (day, week_day) = match &self.week_day {
            Some(week_day) => ("?", week_day.as_str()),
            None => ("*", "?"),
        };
        write!(
            f,
            "cron({} {} {} {} {} {})",
            self.minute, self.hour, day, self.month, week_day, self.year
        )
    }
}

/// Scheduled rule invoking `target`, plus the permission letting the
/// events service call it
pub fn schedule_rule(
    stack: &mut Stack,
    id: &str,
    schedule: &Schedule,
    target: &Function,
) -> Result<ResourceRef> {
    let rule = stack.add(Resource::new(
        id,
        "AWS::Events::Rule",
        json!({
            "ScheduleExpression": schedule.expression(),
            "State": "ENABLED",
            "Targets": [{ "Arn": target.arn(), "Id": "Target0" }]
        }),
    ))?;

    stack.add(Resource::new(
        format!("{}AllowEventRule{}", id, target.logical_id()),
        "AWS::Lambda::Permission",
        json!({
            "Action": "lambda:InvokeFunction",
            "FunctionName": target.arn(),
            "Principal": "events.amazonaws.com",
            "SourceArn": rule.att("Arn")
        }),
    ))?;

    Ok(rule)
}

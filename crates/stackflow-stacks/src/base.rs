//! Shared stack plumbing
//!
//! Every concrete stack starts with [`new_stack`], which derives the
//! qualified stack name and applies the deployment settings.

use stackflow_cloud::{Stack, StackProps};
use stackflow_core::{COMMON_NAMESPACE, Environment, EnvironmentContext, create_resource_name};

/// Settings every stack is built with
#[derive(Debug, Clone)]
pub struct BaseStackProps<'a> {
    pub context: &'a EnvironmentContext,

    /// Account/region to pin the stack to
    pub env: Option<Environment>,

    pub termination_protection: bool,

    /// Template description
    pub description: Option<String>,
}

impl<'a> BaseStackProps<'a> {
    pub fn new(context: &'a EnvironmentContext) -> Self {
        Self {
            context,
            env: context.env().cloned(),
            termination_protection: false,
            description: None,
        }
    }

    pub fn with_env(mut self, env: Option<Environment>) -> Self {
        self.env = env;
        self
    }

    pub fn with_termination_protection(mut self, enabled: bool) -> Self {
        self.termination_protection = enabled;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Region the stack is pinned to, if any
    pub fn region(&self) -> Option<&str> {
        self.env.as_ref().and_then(|e| e.region.as_deref())
    }

    /// Account the stack is pinned to, if any
    pub fn account(&self) -> Option<&str> {
        self.env.as_ref().and_then(|e| e.account.as_deref())
    }
}

/// Local id of a stack plus whether it lives in the common namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackIdentity<'a> {
    pub local_id: &'a str,
    pub shared: bool,
}

impl<'a> StackIdentity<'a> {
    /// A stack shared by every environment
    pub fn shared(local_id: &'a str) -> Self {
        Self {
            local_id,
            shared: true,
        }
    }

    /// A stack deployed once per environment
    pub fn per_env(local_id: &'a str) -> Self {
        Self {
            local_id,
            shared: false,
        }
    }

    /// `{system}-common-{id}` or `{system}-{env}-{id}`
    pub fn qualified_name(&self, context: &EnvironmentContext) -> String {
        let namespace = if self.shared {
            COMMON_NAMESPACE
        } else {
            context.env_type().as_str()
        };
        create_resource_name(context.system_name(), namespace, self.local_id)
    }
}

/// Creates an empty stack under its qualified name
pub fn new_stack(identity: StackIdentity<'_>, props: &BaseStackProps<'_>) -> Stack {
    let name = identity.qualified_name(props.context);
    tracing::debug!(stack = %name, shared = identity.shared, "Creating stack");

    let mut stack_props = StackProps::new()
        .with_env(props.env.clone())
        .with_termination_protection(props.termination_protection);
    if let Some(description) = &props.description {
        stack_props = stack_props.with_description(description.clone());
    }
    Stack::new(name, stack_props)
}

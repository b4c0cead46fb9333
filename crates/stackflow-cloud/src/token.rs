//! Reference tokens and intrinsic functions
//!
//! A [`Reference`] points at a resource (or one of its attributes) in some
//! stack. It is embedded in property values as a marker object and replaced
//! during synthesis, once it is known whether producer and consumer share a
//! stack.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key of the marker object that carries an unresolved reference
pub const REF_MARKER: &str = "__stackflow::ref";

pub const AWS_ACCOUNT_ID: &str = "AWS::AccountId";
pub const AWS_REGION: &str = "AWS::Region";
pub const AWS_PARTITION: &str = "AWS::Partition";
pub const AWS_URL_SUFFIX: &str = "AWS::URLSuffix";

/// Reference to a resource, optionally to one of its attributes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    pub stack: String,
    pub logical_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

impl Reference {
    pub fn new(stack: impl Into<String>, logical_id: impl Into<String>) -> Self {
        Self {
            stack: stack.into(),
            logical_id: logical_id.into(),
            attribute: None,
        }
    }

    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }

    /// Encodes the reference as an unresolved token value.
    pub fn to_token(&self) -> Value {
        let mut marker = Map::new();
        marker.insert(
            REF_MARKER.to_string(),
            serde_json::to_value(self).unwrap_or(Value::Null),
        );
        Value::Object(marker)
    }

    /// Decodes a token value. Returns `None` for anything else.
    pub fn from_token(value: &Value) -> Option<Reference> {
        let map = value.as_object()?;
        if map.len() != 1 {
            return None;
        }
        map.get(REF_MARKER)
            .and_then(|inner| serde_json::from_value(inner.clone()).ok())
    }

    /// `Ref` / `Fn::GetAtt` form, valid inside the producing stack
    pub fn local_value(&self) -> Value {
        match &self.attribute {
            None => serde_json::json!({ "Ref": self.logical_id }),
            Some(attr) => serde_json::json!({ "Fn::GetAtt": [self.logical_id, attr] }),
        }
    }

    /// Logical id of the output that exports this reference
    pub fn output_id(&self) -> String {
        match &self.attribute {
            None => format!("ExportsOutputRef{}", self.logical_id),
            Some(attr) => format!(
                "ExportsOutputFnGetAtt{}{}",
                self.logical_id,
                sanitize_id(attr)
            ),
        }
    }

    /// Name the producing stack exports this reference under
    pub fn export_name(&self) -> String {
        format!("{}:{}", self.stack, self.output_id())
    }
}

/// Strips everything but ASCII letters and digits.
pub fn sanitize_id(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_alphanumeric()).collect()
}

/// Walks `value`, replacing every reference token with what `resolver`
/// returns for it.
pub fn resolve_tokens<F>(value: &Value, resolver: &mut F) -> Result<Value>
where
    F: FnMut(&Reference) -> Result<Value>,
{
    if let Some(reference) = Reference::from_token(value) {
        return resolver(&reference);
    }

    match value {
        Value::Array(items) => items
            .iter()
            .map(|item| resolve_tokens(item, resolver))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        Value::Object(map) => {
            let mut resolved = Map::with_capacity(map.len());
            for (key, item) in map {
                resolved.insert(key.clone(), resolve_tokens(item, resolver)?);
            }
            Ok(Value::Object(resolved))
        }
        other => Ok(other.clone()),
    }
}

/// Collects every reference token inside `value`.
pub fn find_references(value: &Value) -> Vec<Reference> {
    let mut found = Vec::new();
    collect_references(value, &mut found);
    found
}

fn collect_references(value: &Value, found: &mut Vec<Reference>) {
    if let Some(reference) = Reference::from_token(value) {
        found.push(reference);
        return;
    }
    match value {
        Value::Array(items) => items.iter().for_each(|item| collect_references(item, found)),
        Value::Object(map) => map.values().for_each(|item| collect_references(item, found)),
        _ => {}
    }
}

/// `{"Ref": "AWS::..."}` pseudo parameter
pub fn pseudo(name: &str) -> Value {
    serde_json::json!({ "Ref": name })
}

/// `Fn::Join`
pub fn fn_join(delimiter: &str, parts: Vec<Value>) -> Value {
    serde_json::json!({ "Fn::Join": [delimiter, parts] })
}

/// `Fn::Sub` with an explicit variable map
pub fn fn_sub(template: &str, variables: Vec<(&str, Value)>) -> Value {
    let vars: Map<String, Value> = variables
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
    serde_json::json!({ "Fn::Sub": [template, vars] })
}

/// `Fn::ImportValue`
pub fn import_value(export_name: &str) -> Value {
    serde_json::json!({ "Fn::ImportValue": export_name })
}

//! Property model - desired and actual state instances
//!
//! An [`Instance`] is a value conforming to a [`Schema`]: partial for desired
//! state (only the properties the caller specified), full for actual state.
//! Control properties are explicit struct fields internally; the leading
//! underscore exists only in the wire format.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::EngineError;
use crate::schema::{PropertyKind, PropertySpec, Schema};

/// Wire name reported as the changed property when existence differs
pub const EXIST_PROPERTY: &str = "_exist";

/// One system needing a restart after a set, reported by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestartRequired {
    /// Kind of thing to restart (e.g. "service", "process", "machine")
    pub system: String,
    /// Identifier within that system, when one applies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl RestartRequired {
    pub fn service(name: &str) -> Self {
        Self {
            system: "service".to_string(),
            name: Some(name.to_string()),
        }
    }
}

/// A desired or actual state value for one unit
///
/// Domain properties live in an open ordered map; the four engine control
/// properties are explicit optional fields serialized under their reserved
/// underscore-prefixed wire names.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Instance {
    /// false means "must not exist" / "does not exist"; absent means true
    #[serde(rename = "_exist", default, skip_serializing_if = "Option::is_none")]
    pub exist: Option<bool>,

    /// Exact-replace vs. additive semantics for set-valued properties
    #[serde(rename = "_purge", default, skip_serializing_if = "Option::is_none")]
    pub purge: Option<bool>,

    /// Emitted only by test
    #[serde(
        rename = "_inDesiredState",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub in_desired_state: Option<bool>,

    /// Emitted only by set
    #[serde(
        rename = "_restartRequired",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub restart_required: Option<Vec<RestartRequired>>,

    /// Domain properties, in wire order
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

impl Instance {
    pub fn new() -> Self {
        Self::default()
    }

    /// Effective existence; the control property defaults to true
    pub fn exists(&self) -> bool {
        self.exist.unwrap_or(true)
    }

    /// Effective purge mode; the control property defaults to false (additive)
    pub fn purges(&self) -> bool {
        self.purge.unwrap_or(false)
    }

    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    pub fn set_property(&mut self, name: &str, value: Value) {
        self.properties.insert(name.to_string(), value);
    }

    /// Builder-style property insertion, for tests and backends
    pub fn with_property(mut self, name: &str, value: Value) -> Self {
        self.set_property(name, value);
        self
    }

    /// The instance reported by get for a unit that does not exist: the
    /// identifying (key) properties from the filter plus `_exist: false`.
    pub fn absent(schema: &Schema, filter: &Instance) -> Self {
        let mut out = Self::new();
        out.exist = Some(false);
        for spec in schema.key_properties() {
            if let Some(value) = filter.property(&spec.name) {
                out.set_property(&spec.name, value.clone());
            }
        }
        out
    }

    /// Parse and validate a desired-state payload against a schema
    pub fn parse_desired(schema: &Schema, payload: &Value) -> Result<Self, EngineError> {
        let instance: Self = serde_json::from_value(payload.clone())
            .map_err(|err| EngineError::MalformedInput(err.to_string()))?;
        instance.validate_desired(schema)?;
        Ok(instance)
    }

    /// Validate this instance as desired state
    ///
    /// Unknown properties, read-only properties, type mismatches, pattern
    /// violations, and missing key properties are malformed input; a value
    /// outside a declared enum set is an invalid argument.
    pub fn validate_desired(&self, schema: &Schema) -> Result<(), EngineError> {
        if self.in_desired_state.is_some() {
            return Err(EngineError::MalformedInput(
                "'_inDesiredState' is read-only and cannot appear in desired state".to_string(),
            ));
        }
        if self.restart_required.is_some() {
            return Err(EngineError::MalformedInput(
                "'_restartRequired' is read-only and cannot appear in desired state".to_string(),
            ));
        }

        for (name, value) in &self.properties {
            let Some(spec) = schema.find(name) else {
                return Err(EngineError::MalformedInput(format!(
                    "unknown property '{name}' for {}",
                    schema.type_name()
                )));
            };
            if spec.read_only {
                return Err(EngineError::MalformedInput(format!(
                    "property '{name}' is read-only"
                )));
            }
            check_kind(spec, value)?;
            check_pattern(spec, value)?;
            check_allowed(spec, value)?;
        }

        for spec in schema.key_properties() {
            if !self.properties.contains_key(&spec.name) {
                return Err(EngineError::MalformedInput(format!(
                    "missing key property '{}'",
                    spec.name
                )));
            }
        }

        Ok(())
    }

    /// Enforce required properties; applies to set and test payloads
    pub fn check_required(&self, schema: &Schema) -> Result<(), EngineError> {
        // A payload that only turns existence off does not need the full
        // property surface.
        if !self.exists() {
            return Ok(());
        }
        for spec in schema.properties() {
            if spec.required && !self.properties.contains_key(&spec.name) {
                return Err(EngineError::MalformedInput(format!(
                    "missing required property '{}'",
                    spec.name
                )));
            }
        }
        Ok(())
    }

    /// Remove write-only properties; applied to every get/export output
    pub fn strip_write_only(&mut self, schema: &Schema) {
        let write_only: Vec<&str> = schema
            .properties()
            .iter()
            .filter(|p| p.write_only)
            .map(|p| p.name.as_str())
            .collect();
        self.properties.retain(|name, _| {
            !write_only.contains(&name.as_str())
        });
    }

    /// Fill in schema defaults for unspecified properties
    ///
    /// Used on the create path of set; get and diff never invent values.
    pub fn apply_defaults(&mut self, schema: &Schema) {
        for spec in schema.properties() {
            if let Some(default) = &spec.default {
                if !self.properties.contains_key(&spec.name) {
                    self.set_property(&spec.name, default.clone());
                }
            }
        }
    }
}

fn check_kind(spec: &PropertySpec, value: &Value) -> Result<(), EngineError> {
    let ok = match spec.kind {
        PropertyKind::String => value.is_string(),
        PropertyKind::Boolean => value.is_boolean(),
        PropertyKind::Integer => value.is_i64() || value.is_u64(),
        PropertyKind::StringList => value
            .as_array()
            .is_some_and(|items| items.iter().all(Value::is_string)),
    };
    if ok {
        Ok(())
    } else {
        Err(EngineError::MalformedInput(format!(
            "property '{}' must be of type {}",
            spec.name,
            spec.kind.json_type()
        )))
    }
}

fn check_pattern(spec: &PropertySpec, value: &Value) -> Result<(), EngineError> {
    let Some(pattern) = &spec.pattern else {
        return Ok(());
    };
    let re = Regex::new(pattern).map_err(|err| {
        EngineError::Internal(format!(
            "invalid pattern for property '{}': {err}",
            spec.name
        ))
    })?;
    for text in string_values(value) {
        if !re.is_match(text) {
            return Err(EngineError::MalformedInput(format!(
                "property '{}' value '{text}' does not match pattern '{pattern}'",
                spec.name
            )));
        }
    }
    Ok(())
}

fn check_allowed(spec: &PropertySpec, value: &Value) -> Result<(), EngineError> {
    let Some(allowed) = &spec.allowed else {
        return Ok(());
    };
    for text in string_values(value) {
        if !allowed.iter().any(|a| a == text) {
            return Err(EngineError::InvalidArgument(format!(
                "property '{}' value '{text}' is not one of [{}]",
                spec.name,
                allowed.join(", ")
            )));
        }
    }
    Ok(())
}

/// String views of a scalar string or string-list value
fn string_values(value: &Value) -> Vec<&str> {
    match value {
        Value::String(s) => vec![s.as_str()],
        Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}

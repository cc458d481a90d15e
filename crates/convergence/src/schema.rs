//! Schema descriptor - the declared property surface of a resource type
//!
//! A [`Schema`] is built once per resource type (through [`Schema::builder`])
//! and is read-only afterwards. It drives payload validation, the diff
//! engine's per-property equality, and the self-describing `describe()`
//! document.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// One of the five uniform operations (plus none a resource can opt out of)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Get,
    Set,
    Test,
    Delete,
    Export,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Get => "get",
            Self::Set => "set",
            Self::Test => "test",
            Self::Delete => "delete",
            Self::Export => "export",
        };
        f.write_str(name)
    }
}

/// The operation subset a resource type advertises
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub get: bool,
    pub set: bool,
    pub test: bool,
    pub delete: bool,
    pub export: bool,
}

impl Capabilities {
    /// Every operation supported
    pub fn all() -> Self {
        Self {
            get: true,
            set: true,
            test: true,
            delete: true,
            export: true,
        }
    }

    /// Check whether an operation is advertised
    pub fn supports(&self, operation: Operation) -> bool {
        match operation {
            Operation::Get => self.get,
            Operation::Set => self.set,
            Operation::Test => self.test,
            Operation::Delete => self.delete,
            Operation::Export => self.export,
        }
    }

    /// Names of the supported operations, in contract order
    pub fn names(&self) -> Vec<&'static str> {
        let table = [
            (self.get, "get"),
            (self.set, "set"),
            (self.test, "test"),
            (self.delete, "delete"),
            (self.export, "export"),
        ];
        table
            .into_iter()
            .filter_map(|(on, name)| on.then_some(name))
            .collect()
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::all()
    }
}

/// Semantic type of a property value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    String,
    Boolean,
    Integer,
    StringList,
}

impl PropertyKind {
    /// JSON Schema `type` keyword for this kind
    pub fn json_type(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::StringList => "array",
        }
    }
}

/// Equality semantics used when diffing a property
///
/// Purge/additive membership semantics apply only to `Set` properties;
/// `Ordered` lists always compare exactly, element by element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Equality {
    /// Byte-for-byte value equality
    CaseSensitive,
    /// ASCII case-insensitive string equality (case-insensitive backends)
    CaseInsensitive,
    /// Order-sensitive sequence equality
    Ordered,
    /// Unordered set membership (subject to `_purge`)
    Set,
}

/// Declaration of one property in a resource type's surface
#[derive(Debug, Clone)]
pub struct PropertySpec {
    pub name: String,
    pub kind: PropertyKind,
    pub description: String,
    /// Identifies the unit; implicitly required for every operation
    pub key: bool,
    /// Must be present in desired state for set/test
    pub required: bool,
    /// Accepted on input, never returned by get/export
    pub write_only: bool,
    /// Returned by get/export, rejected on input
    pub read_only: bool,
    /// Value assumed when creating a unit and the caller omitted the property
    pub default: Option<Value>,
    /// Closed set of accepted values; anything else is an invalid argument
    pub allowed: Option<Vec<String>>,
    /// Validation pattern applied to string values on input
    pub pattern: Option<String>,
    pub equality: Equality,
}

impl PropertySpec {
    pub fn new(name: &str, kind: PropertyKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            description: String::new(),
            key: false,
            required: false,
            write_only: false,
            read_only: false,
            default: None,
            allowed: None,
            pattern: None,
            equality: Equality::CaseSensitive,
        }
    }

    pub fn description(mut self, text: &str) -> Self {
        self.description = text.to_string();
        self
    }

    pub fn key(mut self) -> Self {
        self.key = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn write_only(mut self) -> Self {
        self.write_only = true;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn allowed(mut self, values: &[&str]) -> Self {
        self.allowed = Some(values.iter().map(ToString::to_string).collect());
        self
    }

    pub fn pattern(mut self, pattern: &str) -> Self {
        self.pattern = Some(pattern.to_string());
        self
    }

    pub fn equality(mut self, equality: Equality) -> Self {
        self.equality = equality;
        self
    }

    /// JSON Schema fragment describing this property
    fn describe(&self) -> Value {
        let mut doc = Map::new();
        if self.kind == PropertyKind::StringList {
            doc.insert("type".into(), json!("array"));
            doc.insert("items".into(), json!({"type": "string"}));
        } else {
            doc.insert("type".into(), json!(self.kind.json_type()));
        }
        if !self.description.is_empty() {
            doc.insert("description".into(), json!(self.description));
        }
        if let Some(values) = &self.allowed {
            doc.insert("enum".into(), json!(values));
        }
        if let Some(pattern) = &self.pattern {
            doc.insert("pattern".into(), json!(pattern));
        }
        if let Some(default) = &self.default {
            doc.insert("default".into(), default.clone());
        }
        if self.write_only {
            doc.insert("writeOnly".into(), json!(true));
        }
        if self.read_only {
            doc.insert("readOnly".into(), json!(true));
        }
        Value::Object(doc)
    }
}

/// Immutable property surface of a resource type
#[derive(Debug, Clone)]
pub struct Schema {
    type_name: String,
    version: String,
    capabilities: Capabilities,
    properties: Vec<PropertySpec>,
}

impl Schema {
    pub fn builder(type_name: &str, version: &str) -> SchemaBuilder {
        SchemaBuilder {
            type_name: type_name.to_string(),
            version: version.to_string(),
            capabilities: Capabilities::all(),
            properties: Vec::new(),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Declared properties, in declaration order
    pub fn properties(&self) -> &[PropertySpec] {
        &self.properties
    }

    /// Look up a property declaration by name
    pub fn find(&self, name: &str) -> Option<&PropertySpec> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Properties that identify the unit
    pub fn key_properties(&self) -> impl Iterator<Item = &PropertySpec> {
        self.properties.iter().filter(|p| p.key)
    }

    /// Produce the machine-readable schema document
    ///
    /// Output is JSON-Schema-shaped: draft 2020-12, a `required` list of key
    /// and required properties, per-property type/enum/pattern/default, the
    /// engine's control properties, and `additionalProperties: false`.
    pub fn describe(&self) -> Value {
        let mut props = Map::new();
        let mut required = Vec::new();
        for spec in &self.properties {
            props.insert(spec.name.clone(), spec.describe());
            if spec.key || spec.required {
                required.push(spec.name.clone());
            }
        }

        props.insert(
            "_exist".into(),
            json!({
                "type": "boolean",
                "description": "Whether the unit should exist",
                "default": true,
            }),
        );
        props.insert(
            "_purge".into(),
            json!({
                "type": "boolean",
                "description": "Replace set-valued properties exactly instead of additively",
                "default": false,
            }),
        );
        props.insert(
            "_inDesiredState".into(),
            json!({
                "type": ["boolean", "null"],
                "description": "Whether the unit matched the desired state (test output only)",
                "readOnly": true,
            }),
        );
        props.insert(
            "_restartRequired".into(),
            json!({
                "type": "array",
                "items": {"type": "object"},
                "description": "Systems requiring a restart after set (set output only)",
                "readOnly": true,
            }),
        );

        json!({
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "title": self.type_name,
            "version": self.version,
            "type": "object",
            "required": required,
            "properties": props,
            "additionalProperties": false,
        })
    }
}

/// Builder for [`Schema`] so resource declarations read as a table
pub struct SchemaBuilder {
    type_name: String,
    version: String,
    capabilities: Capabilities,
    properties: Vec<PropertySpec>,
}

impl SchemaBuilder {
    pub fn capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn property(mut self, spec: PropertySpec) -> Self {
        debug_assert!(
            !self.properties.iter().any(|p| p.name == spec.name),
            "duplicate property declaration: {}",
            spec.name
        );
        self.properties.push(spec);
        self
    }

    pub fn build(self) -> Schema {
        Schema {
            type_name: self.type_name,
            version: self.version,
            capabilities: self.capabilities,
            properties: self.properties,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_schema() -> Schema {
        Schema::builder("Verge/Sample", "0.1.0")
            .property(
                PropertySpec::new("name", PropertyKind::String)
                    .key()
                    .equality(Equality::CaseInsensitive)
                    .description("Unit name"),
            )
            .property(
                PropertySpec::new("members", PropertyKind::StringList).equality(Equality::Set),
            )
            .property(
                PropertySpec::new("level", PropertyKind::String)
                    .allowed(&["user", "system"])
                    .default_value(json!("user")),
            )
            .property(PropertySpec::new("secret", PropertyKind::String).write_only())
            .property(PropertySpec::new("memberCount", PropertyKind::Integer).read_only())
            .build()
    }

    #[test]
    fn describe_emits_closed_document() {
        let doc = sample_schema().describe();
        assert_eq!(doc["additionalProperties"], json!(false));
        assert_eq!(
            doc["$schema"],
            json!("https://json-schema.org/draft/2020-12/schema")
        );
        assert_eq!(doc["required"], json!(["name"]));
        assert_eq!(doc["properties"]["level"]["enum"], json!(["user", "system"]));
        assert_eq!(doc["properties"]["level"]["default"], json!("user"));
        assert_eq!(doc["properties"]["secret"]["writeOnly"], json!(true));
        assert_eq!(doc["properties"]["memberCount"]["readOnly"], json!(true));
        assert_eq!(doc["properties"]["members"]["type"], json!("array"));
    }

    #[test]
    fn describe_includes_control_properties() {
        let doc = sample_schema().describe();
        let props = doc["properties"].as_object().unwrap();
        for control in ["_exist", "_purge", "_inDesiredState", "_restartRequired"] {
            assert!(props.contains_key(control), "missing {control}");
        }
        assert_eq!(props["_exist"]["default"], json!(true));
        assert_eq!(props["_purge"]["default"], json!(false));
    }

    #[test]
    fn capability_subset() {
        let caps = Capabilities {
            set: false,
            delete: false,
            ..Capabilities::all()
        };
        assert!(caps.supports(Operation::Get));
        assert!(!caps.supports(Operation::Set));
        assert_eq!(caps.names(), vec!["get", "test", "export"]);
    }

    #[test]
    fn find_is_declaration_ordered() {
        let schema = sample_schema();
        assert!(schema.find("members").is_some());
        assert!(schema.find("nope").is_none());
        let names: Vec<_> = schema.properties().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["name", "members", "level", "secret", "memberCount"]
        );
    }
}

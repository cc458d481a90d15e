//! Group resource - named membership groups in the JSON store
//!
//! Exercises the engine's set-valued property semantics: `members` honors
//! additive vs. purge membership, `secret` is write-only, `memberCount` is
//! derived and read-only.

use std::path::Path;

use convergence::{
    Capabilities, Diff, Equality, Instance, PropertyKind, PropertySpec, Resource, ResourceError,
    RestartRequired, Schema,
};
use serde_json::{Map, Value, json};

use crate::store::Store;

#[derive(Debug)]
pub struct Group {
    schema: Schema,
    store: Store,
}

impl Group {
    pub fn new(store_dir: &Path) -> Self {
        let schema = Schema::builder("Verge/Group", "0.1.0")
            .capabilities(Capabilities::all())
            .property(
                PropertySpec::new("name", PropertyKind::String)
                    .key()
                    .equality(Equality::CaseInsensitive)
                    .pattern("^[A-Za-z][A-Za-z0-9._-]*$")
                    .description("Group name; unique, case-insensitive"),
            )
            .property(
                PropertySpec::new("members", PropertyKind::StringList)
                    .equality(Equality::Set)
                    .description("Member names; additive unless _purge is set"),
            )
            .property(
                PropertySpec::new("description", PropertyKind::String)
                    .description("Free-form description"),
            )
            .property(
                PropertySpec::new("secret", PropertyKind::String)
                    .write_only()
                    .description("Provisioning secret handed to the backend, never readable"),
            )
            .property(
                PropertySpec::new("memberCount", PropertyKind::Integer)
                    .read_only()
                    .description("Number of members"),
            )
            .build();
        Self {
            schema,
            store: Store::open(store_dir, "groups"),
        }
    }

    fn key_of(filter: &Instance) -> Result<String, ResourceError> {
        filter
            .property("name")
            .and_then(Value::as_str)
            .map(str::to_ascii_lowercase)
            .ok_or_else(|| ResourceError::InvalidArgument("missing group name".to_string()))
    }

    fn instance_from(entry: &Value) -> Instance {
        let mut out = Instance::new();
        if let Some(name) = entry.get("name") {
            out.set_property("name", name.clone());
        }
        if let Some(description) = entry.get("description") {
            out.set_property("description", description.clone());
        }
        let members = entry
            .get("members")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        out.set_property("memberCount", json!(members.len()));
        out.set_property("members", Value::Array(members));
        out
    }
}

impl Resource for Group {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn get(&self, filter: &Instance) -> Result<Instance, ResourceError> {
        let key = Self::key_of(filter)?;
        let units = self.store.load()?;
        let entry = units.get(&key).ok_or(ResourceError::NotFound(key))?;
        Ok(Self::instance_from(entry))
    }

    fn set(
        &self,
        desired: &Instance,
        actual: &Instance,
        diff: &Diff,
    ) -> Result<Vec<RestartRequired>, ResourceError> {
        let key = Self::key_of(desired)?;
        let mut units = self.store.load()?;
        let creating = !actual.exists();
        let mut entry = if creating {
            Map::new()
        } else {
            units
                .get(&key)
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default()
        };

        if let Some(name) = desired.property("name") {
            entry.insert("name".to_string(), name.clone());
        }
        if let Some(members) = desired.property("members") {
            if creating || desired.purges() {
                // Exact membership, including the remove-then-add purge path.
                entry.insert("members".to_string(), members.clone());
            } else if diff.changed_contains("members") {
                let mut merged: Vec<Value> = entry
                    .get("members")
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default();
                for member in members.as_array().into_iter().flatten() {
                    if !merged.contains(member) {
                        merged.push(member.clone());
                    }
                }
                entry.insert("members".to_string(), Value::Array(merged));
            }
        }
        if let Some(description) = desired.property("description") {
            if creating || diff.changed_contains("description") {
                entry.insert("description".to_string(), description.clone());
            }
        }
        // Write-only: never diffed, always applied when supplied.
        if let Some(secret) = desired.property("secret") {
            entry.insert("secret".to_string(), secret.clone());
        }

        units.insert(key, Value::Object(entry));
        self.store.save(&units)?;
        Ok(Vec::new())
    }

    fn delete(&self, filter: &Instance) -> Result<(), ResourceError> {
        let key = Self::key_of(filter)?;
        let mut units = self.store.load()?;
        if units.remove(&key).is_none() {
            return Err(ResourceError::NotFound(key));
        }
        self.store.save(&units)?;
        Ok(())
    }

    fn export(&self) -> Result<convergence::ExportIter, ResourceError> {
        let units = self.store.load()?;
        let instances: Vec<Instance> = units.values().map(Self::instance_from).collect();
        Ok(Box::new(instances.into_iter().map(Ok)))
    }
}

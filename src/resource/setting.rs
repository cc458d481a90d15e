//! Setting resource - single-valued policy settings in the JSON store
//!
//! Exercises enum and pattern validation, schema defaults, restart-required
//! metadata (a changed value flags its service for restart), and the
//! protected-unit delete refusal.

use std::path::Path;

use convergence::{
    Capabilities, Diff, Instance, PropertyKind, PropertySpec, Resource, ResourceError,
    RestartRequired, Schema,
};
use serde_json::{Map, Value};

use crate::store::Store;

/// The built-in setting every host carries; it cannot be deleted
const PROTECTED: &str = "default";

#[derive(Debug)]
pub struct Setting {
    schema: Schema,
    store: Store,
}

impl Setting {
    pub fn new(store_dir: &Path) -> Self {
        let schema = Schema::builder("Verge/Setting", "0.1.0")
            .capabilities(Capabilities::all())
            .property(
                PropertySpec::new("name", PropertyKind::String)
                    .key()
                    .pattern("^[a-z][a-z0-9._-]*$")
                    .description("Setting name"),
            )
            .property(
                PropertySpec::new("value", PropertyKind::String)
                    .required()
                    .description("Setting value"),
            )
            .property(
                PropertySpec::new("level", PropertyKind::String)
                    .allowed(&["user", "system"])
                    .default_value(Value::String("user".to_string()))
                    .description("Scope the setting applies at"),
            )
            .property(
                PropertySpec::new("restartService", PropertyKind::String)
                    .description("Service to flag for restart when the value changes"),
            )
            .build();
        Self {
            schema,
            store: Store::open(store_dir, "settings"),
        }
    }

    fn key_of(filter: &Instance) -> Result<String, ResourceError> {
        filter
            .property("name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ResourceError::InvalidArgument("missing setting name".to_string()))
    }

    fn instance_from(entry: &Value) -> Instance {
        let mut out = Instance::new();
        for prop in ["name", "value", "level", "restartService"] {
            if let Some(value) = entry.get(prop) {
                out.set_property(prop, value.clone());
            }
        }
        out
    }
}

impl Resource for Setting {
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

        for prop in ["name", "value", "level", "restartService"] {
            if let Some(value) = desired.property(prop) {
                if creating || diff.changed_contains(prop) || prop == "name" {
                    entry.insert(prop.to_string(), value.clone());
                }
            }
        }

        let mut restarts = Vec::new();
        if diff.changed_contains("value") {
            let service = desired
                .property("restartService")
                .or_else(|| entry.get("restartService"))
                .and_then(Value::as_str);
            if let Some(service) = service {
                restarts.push(RestartRequired::service(service));
            }
        }

        units.insert(key, Value::Object(entry));
        self.store.save(&units)?;
        Ok(restarts)
    }

    fn delete(&self, filter: &Instance) -> Result<(), ResourceError> {
        let key = Self::key_of(filter)?;
        if key == PROTECTED {
            return Err(ResourceError::InvalidOperation(format!(
                "the built-in '{PROTECTED}' setting cannot be deleted"
            )));
        }
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

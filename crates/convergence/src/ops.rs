//! Convergence operations - uniform orchestration over resource backends
//!
//! Each operation validates the desired instance, checks the resource's
//! advertised capabilities, and drives the backend slots of [`Resource`].
//! The orchestration owns the contract semantics: get absorbs not-found,
//! set never mutates a satisfied unit, test never mutates at all, delete is
//! idempotent, export is a lazy one-shot sequence.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use crate::diff::{Diff, diff};
use crate::error::{EngineError, ResourceError};
use crate::exit::{DEFAULT_EXIT_TABLE, ExitEntry};
use crate::instance::{Instance, RestartRequired};
use crate::schema::{Operation, Schema};

/// Lazy, finite, one-shot enumeration of every existing unit
pub type ExportIter = Box<dyn Iterator<Item = Result<Instance, ResourceError>>>;

/// Collaborator interface filled in by resource authors
///
/// The engine supplies diffing and exit code mapping as shared services;
/// implementations provide only the backend-specific calls. Slots for
/// operations a resource does not advertise can keep their defaults.
pub trait Resource: Send + Sync + fmt::Debug {
    /// The resource type's declared property surface and capabilities
    fn schema(&self) -> &Schema;

    /// Resolve the unit named by the filter's key properties
    ///
    /// Side-effect-free. Return [`ResourceError::NotFound`] for an absent
    /// unit; the engine converts that to an `_exist: false` instance rather
    /// than a failure.
    fn get(&self, filter: &Instance) -> Result<Instance, ResourceError>;

    /// Apply the changed properties to the backend
    ///
    /// Called only when the diff is not satisfied and the unit should exist.
    /// `actual` reflects the backend before the call; on a create path it is
    /// the absent instance. Returns the systems needing a restart, if any.
    fn set(
        &self,
        desired: &Instance,
        actual: &Instance,
        diff: &Diff,
    ) -> Result<Vec<RestartRequired>, ResourceError> {
        let _ = (desired, actual, diff);
        Err(ResourceError::InvalidOperation(
            "set slot not implemented".to_string(),
        ))
    }

    /// Remove the unit named by the filter's key properties
    fn delete(&self, filter: &Instance) -> Result<(), ResourceError> {
        let _ = filter;
        Err(ResourceError::InvalidOperation(
            "delete slot not implemented".to_string(),
        ))
    }

    /// Enumerate every existing unit as a full instance
    fn export(&self) -> Result<ExportIter, ResourceError> {
        Err(ResourceError::InvalidOperation(
            "export slot not implemented".to_string(),
        ))
    }

    /// Ordered exit code table for this resource type
    fn exit_codes(&self) -> &'static [ExitEntry] {
        DEFAULT_EXIT_TABLE
    }
}

/// Change report returned by a set operation
///
/// A no-op has an empty `changed_properties` and `after == before`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetReport {
    pub before: Instance,
    pub after: Instance,
    pub changed_properties: BTreeSet<String>,
}

impl SetReport {
    /// Whether the backend was left untouched
    pub fn is_noop(&self) -> bool {
        self.changed_properties.is_empty()
    }
}

fn ensure_capability(resource: &dyn Resource, operation: Operation) -> Result<(), EngineError> {
    let schema = resource.schema();
    if schema.capabilities().supports(operation) {
        Ok(())
    } else {
        Err(EngineError::UnsupportedOperation {
            resource: schema.type_name().to_string(),
            operation,
        })
    }
}

/// Resolve actual state, absorbing not-found into an absent instance and
/// stripping write-only properties from whatever the backend returned.
fn resolve_actual(resource: &dyn Resource, desired: &Instance) -> Result<Instance, EngineError> {
    let schema = resource.schema();
    match resource.get(desired) {
        Ok(mut actual) => {
            actual.strip_write_only(schema);
            Ok(actual)
        }
        Err(ResourceError::NotFound(_)) => Ok(Instance::absent(schema, desired)),
        Err(err) => Err(err.into()),
    }
}

/// Get: resolve the unit named by the desired instance's key properties
///
/// Never fails merely because the unit is absent.
pub fn get(resource: &dyn Resource, desired: &Instance) -> Result<Instance, EngineError> {
    ensure_capability(resource, Operation::Get)?;
    desired.validate_desired(resource.schema())?;
    resolve_actual(resource, desired)
}

/// Set: converge the unit to the desired state
///
/// Computes actual state via get and diffs it; a satisfied unit is reported
/// as a no-op without touching the backend. Otherwise the minimal backend
/// operation implied by the diff runs: delete when existence should be
/// false, create-with-defaults when the unit is absent, property application
/// otherwise. Restart metadata reported by the backend rides on `after`.
pub fn set(resource: &dyn Resource, desired: &Instance) -> Result<SetReport, EngineError> {
    ensure_capability(resource, Operation::Set)?;
    let schema = resource.schema();
    desired.validate_desired(schema)?;
    desired.check_required(schema)?;

    let before = resolve_actual(resource, desired)?;
    let delta = diff(schema, desired, &before);
    if delta.satisfied {
        log::debug!(
            "{}: already in desired state, no-op",
            schema.type_name()
        );
        return Ok(SetReport {
            before: before.clone(),
            after: before,
            changed_properties: BTreeSet::new(),
        });
    }
    log::debug!(
        "{}: applying changed properties {:?}",
        schema.type_name(),
        delta.changed
    );

    if !desired.exists() {
        resource.delete(desired)?;
        let after = Instance::absent(schema, desired);
        return Ok(SetReport {
            before,
            after,
            changed_properties: delta.changed,
        });
    }

    let mut effective = desired.clone();
    if !before.exists() {
        effective.apply_defaults(schema);
    }
    let restarts = resource.set(&effective, &before, &delta)?;

    let mut after = resolve_actual(resource, desired)?;
    if !restarts.is_empty() {
        after.restart_required = Some(restarts);
    }
    Ok(SetReport {
        before,
        after,
        changed_properties: delta.changed,
    })
}

/// Test: report actual state annotated with `_inDesiredState`; never mutates
pub fn test(resource: &dyn Resource, desired: &Instance) -> Result<Instance, EngineError> {
    ensure_capability(resource, Operation::Test)?;
    let schema = resource.schema();
    desired.validate_desired(schema)?;
    desired.check_required(schema)?;

    let actual = resolve_actual(resource, desired)?;
    let delta = diff(schema, desired, &actual);
    let mut out = actual;
    out.in_desired_state = Some(delta.satisfied);
    Ok(out)
}

/// Delete: unconditionally drive existence to false; idempotent
pub fn delete(resource: &dyn Resource, desired: &Instance) -> Result<(), EngineError> {
    ensure_capability(resource, Operation::Delete)?;
    desired.validate_desired(resource.schema())?;

    match resource.delete(desired) {
        Ok(()) | Err(ResourceError::NotFound(_)) => Ok(()),
        Err(err) => Err(err.into()),
    }
}

/// Export: lazily enumerate every existing unit
pub fn export<'r>(
    resource: &'r dyn Resource,
) -> Result<impl Iterator<Item = Result<Instance, EngineError>> + 'r, EngineError> {
    ensure_capability(resource, Operation::Export)?;
    let items = resource.export()?;
    Ok(items.map(move |item| {
        item.map(|mut instance| {
            instance.strip_write_only(resource.schema());
            instance
        })
        .map_err(EngineError::from)
    }))
}

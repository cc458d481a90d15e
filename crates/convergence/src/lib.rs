//! # Convergence
//!
//! A contract and small execution engine for declarative resource
//! convergence.
//!
//! Independently authored resource providers describe and enforce the
//! desired state of a manageable unit (a login, a group, a policy setting)
//! through five uniform operations - get, set, test, delete, export - plus a
//! self-describing schema.
//!
//! ## Core Concepts
//!
//! - **Schema**: the declared property surface of a resource type -
//!   key/required/write-only/read-only flags, defaults, enum values,
//!   validation patterns, per-property equality, capabilities
//! - **Instance**: a value conforming to a schema - partial for desired
//!   state, full for actual state - with explicit control fields
//!   (`_exist`, `_purge`, `_inDesiredState`, `_restartRequired`)
//! - **Diff**: convention-based comparison of desired vs. actual, honoring
//!   additive vs. purge membership for set-valued properties
//! - **Operations**: uniform orchestration in [`ops`]; backend-specific
//!   calls live behind the [`Resource`] trait
//! - **Exit codes**: ordered `{code, category, description}` tables mapping
//!   failures to the integer an external orchestrator consumes
//!
//! ## Example
//!
//! ```ignore
//! use convergence::{
//!     ops, Capabilities, Equality, Instance, PropertyKind, PropertySpec,
//!     Resource, ResourceError, Schema,
//! };
//!
//! #[derive(Debug)]
//! struct Hosts { schema: Schema }
//!
//! impl Resource for Hosts {
//!     fn schema(&self) -> &Schema { &self.schema }
//!
//!     fn get(&self, filter: &Instance) -> Result<Instance, ResourceError> {
//!         // resolve the entry named by filter's key properties...
//!         Err(ResourceError::NotFound("example".into()))
//!     }
//! }
//!
//! let hosts = Hosts {
//!     schema: Schema::builder("Example/Hosts", "0.1.0")
//!         .capabilities(Capabilities { set: false, delete: false, export: false, ..Capabilities::all() })
//!         .property(PropertySpec::new("name", PropertyKind::String).key())
//!         .build(),
//! };
//! let desired = Instance::parse_desired(hosts.schema(), &serde_json::json!({"name": "db"}))?;
//! let actual = ops::get(&hosts, &desired)?;
//! ```
//!
//! One invocation performs exactly one operation on one unit, locally and
//! synchronously; nothing persists beyond the backend's own storage.

pub mod diff;
pub mod error;
pub mod exit;
pub mod instance;
pub mod ops;
pub mod schema;

// Re-export main types at crate root
pub use diff::{Diff, diff};
pub use error::{EngineError, FailureCategory, ResourceError};
pub use exit::{DEFAULT_EXIT_TABLE, ExitEntry, SUCCESS, resolve};
pub use instance::{EXIST_PROPERTY, Instance, RestartRequired};
pub use ops::{ExportIter, Resource, SetReport};
pub use schema::{
    Capabilities, Equality, Operation, PropertyKind, PropertySpec, Schema, SchemaBuilder,
};

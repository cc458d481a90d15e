//! Concrete resources registered with the verge host
//!
//! Each resource implements the `convergence::Resource` backend slots over
//! a JSON file store. The engine owns diffing, no-op detection, purge
//! semantics, and exit code mapping; the code here only reads and writes
//! backend state.

use std::path::Path;

use convergence::Resource;

pub mod group;
pub mod setting;

pub use group::Group;
pub use setting::Setting;

/// All resource types this host can operate on
pub fn registry(store_dir: &Path) -> Vec<Box<dyn Resource>> {
    vec![
        Box::new(Group::new(store_dir)),
        Box::new(Setting::new(store_dir)),
    ]
}

/// Resolve a resource type by name, case-insensitively
pub fn find(name: &str, store_dir: &Path) -> Option<Box<dyn Resource>> {
    registry(store_dir)
        .into_iter()
        .find(|r| r.schema().type_name().eq_ignore_ascii_case(name))
}

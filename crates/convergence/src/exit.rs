//! Exit code mapper - failure categories to process exit codes
//!
//! A resource type declares a static ordered table of
//! `{code, category, description}` entries; the host resolves an operation
//! failure to the first entry whose category matches, falling back to the
//! generic entry. Code 0 is reserved for success and never appears in the
//! table.

use crate::error::FailureCategory;

/// Process exit code for a successful operation
pub const SUCCESS: i32 = 0;

/// One row of a resource type's exit code table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitEntry {
    pub code: i32,
    pub category: FailureCategory,
    pub description: &'static str,
}

/// The default table shared by resources that do not declare their own
pub const DEFAULT_EXIT_TABLE: &[ExitEntry] = &[
    ExitEntry {
        code: 1,
        category: FailureCategory::Generic,
        description: "Generic failure",
    },
    ExitEntry {
        code: 2,
        category: FailureCategory::MalformedInput,
        description: "Payload failed parse or schema validation",
    },
    ExitEntry {
        code: 3,
        category: FailureCategory::InvalidArgument,
        description: "Well-formed but semantically invalid value",
    },
    ExitEntry {
        code: 4,
        category: FailureCategory::PermissionDenied,
        description: "Backend authorization failure",
    },
    ExitEntry {
        code: 5,
        category: FailureCategory::InvalidOperation,
        description: "Backend precondition violated",
    },
];

/// Resolve a failure category against an ordered exit code table
///
/// Returns the first matching entry's code; an unmatched category falls back
/// to the table's generic entry, and to 1 if the table lacks even that.
pub fn resolve(table: &[ExitEntry], category: FailureCategory) -> i32 {
    if let Some(entry) = table.iter().find(|e| e.category == category) {
        return entry.code;
    }
    table
        .iter()
        .find(|e| e.category == FailureCategory::Generic)
        .map_or(1, |e| e.code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_maps_every_category() {
        assert_eq!(resolve(DEFAULT_EXIT_TABLE, FailureCategory::Generic), 1);
        assert_eq!(
            resolve(DEFAULT_EXIT_TABLE, FailureCategory::MalformedInput),
            2
        );
        assert_eq!(
            resolve(DEFAULT_EXIT_TABLE, FailureCategory::InvalidArgument),
            3
        );
        assert_eq!(
            resolve(DEFAULT_EXIT_TABLE, FailureCategory::PermissionDenied),
            4
        );
        assert_eq!(
            resolve(DEFAULT_EXIT_TABLE, FailureCategory::InvalidOperation),
            5
        );
    }

    #[test]
    fn first_match_wins() {
        // A resource collapsing permission failures into its generic code.
        let table = &[
            ExitEntry {
                code: 10,
                category: FailureCategory::PermissionDenied,
                description: "Login denied",
            },
            ExitEntry {
                code: 1,
                category: FailureCategory::Generic,
                description: "Generic failure",
            },
            ExitEntry {
                code: 99,
                category: FailureCategory::PermissionDenied,
                description: "Shadowed",
            },
        ];
        assert_eq!(resolve(table, FailureCategory::PermissionDenied), 10);
    }

    #[test]
    fn unmatched_category_falls_back_to_generic() {
        let table = &[ExitEntry {
            code: 7,
            category: FailureCategory::Generic,
            description: "Generic failure",
        }];
        assert_eq!(resolve(table, FailureCategory::MalformedInput), 7);
    }

    #[test]
    fn empty_table_falls_back_to_one() {
        assert_eq!(resolve(&[], FailureCategory::InvalidOperation), 1);
    }
}

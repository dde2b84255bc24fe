//! Declarative (toolchain, SDK) version table
//!
//! Each toolchain version and the SDK version it builds against form one
//! entry in an ordered table. A custom table can be loaded from a JSON
//! object whose key order is the sweep order:
//!
//! ```json
//! { "8.3.3": "10.3.1", "9.0": "11.0" }
//! ```

use std::path::Path;

use indexmap::IndexMap;
use semver::Version;

use crate::version::error::{MatrixError, VersionError};
use crate::version::semver::parse_version;

/// Built-in sweep table, oldest toolchain first
const DEFAULT_MATRIX: &[(&str, &str)] = &[
    ("8.3.3", "10.3.1"),
    ("9.0", "11.0"),
    ("9.1", "11.1"),
    ("9.2", "11.2"),
];

/// One toolchain/SDK pair to build against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatrixEntry {
    /// Toolchain version handed to the selector
    pub toolchain: String,
    /// SDK version paired with the toolchain for the build invocation
    pub sdk: String,
}

/// Ordered collection of matrix entries.
///
/// Invariant: every toolchain and SDK version in the table parses as a
/// (possibly partial) dotted version. Malformed tables are rejected at
/// construction, before any build runs.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildMatrix {
    entries: Vec<MatrixEntry>,
}

impl BuildMatrix {
    /// Build a matrix from explicit entries, validating every version.
    pub fn from_entries(entries: Vec<MatrixEntry>) -> Result<Self, MatrixError> {
        if entries.is_empty() {
            return Err(MatrixError::Empty);
        }

        for entry in &entries {
            if parse_version(&entry.toolchain).is_none() {
                return Err(VersionError::InvalidFormat(entry.toolchain.clone()).into());
            }
            if parse_version(&entry.sdk).is_none() {
                return Err(VersionError::InvalidFormat(entry.sdk.clone()).into());
            }
        }

        Ok(Self { entries })
    }

    /// Parse a matrix from its JSON object form, preserving key order.
    pub fn from_json(content: &str) -> Result<Self, MatrixError> {
        let table: IndexMap<String, String> = serde_json::from_str(content)?;

        let entries = table
            .into_iter()
            .map(|(toolchain, sdk)| MatrixEntry { toolchain, sdk })
            .collect();

        Self::from_entries(entries)
    }

    /// Load a matrix from a JSON file.
    pub fn load(path: &Path) -> Result<Self, MatrixError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Entries whose toolchain version is `min` or newer, in table order.
    ///
    /// Comparison is on parsed version components, not on the concatenated
    /// token, so "9.20" orders after "9.2".
    pub fn at_least(&self, min: &Version) -> Vec<MatrixEntry> {
        self.entries
            .iter()
            .filter(|entry| {
                parse_version(&entry.toolchain).is_some_and(|version| version >= *min)
            })
            .cloned()
            .collect()
    }

    pub fn entries(&self) -> &[MatrixEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for BuildMatrix {
    fn default() -> Self {
        Self {
            entries: DEFAULT_MATRIX
                .iter()
                .map(|(toolchain, sdk)| MatrixEntry {
                    toolchain: toolchain.to_string(),
                    sdk: sdk.to_string(),
                })
                .collect(),
        }
    }
}

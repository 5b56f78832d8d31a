//! Shared type definitions for the fsroutes crate
//!
//! This module contains the values that flow between the generation phases:
//! discovered route files and the binding sets extracted from them.

use std::{
    hash::BuildHasherDefault,
    path::{Path, PathBuf},
};

use indexmap::{IndexMap, IndexSet};
use rustc_hash::FxHasher;

/// Insertion-ordered map using the fast Fx hasher
pub type FxIndexMap<K, V> = IndexMap<K, V, BuildHasherDefault<FxHasher>>;

/// Insertion-ordered set using the fast Fx hasher
pub type FxIndexSet<T> = IndexSet<T, BuildHasherDefault<FxHasher>>;

/// Binding name used for a module's default export
pub const DEFAULT_EXPORT: &str = "default";

/// A route module found under the base directory
///
/// Created once by discovery and never mutated afterwards. The discovery
/// index defines the canonical ordering of the whole generation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteFile {
    /// Position in the discovery order
    pub index: usize,
    /// Path relative to the base directory, always with forward slashes
    /// and without a leading `./`
    pub relative_path: String,
    /// Absolute path that can be read and imported
    pub absolute_path: PathBuf,
}

impl RouteFile {
    pub fn new(index: usize, relative_path: impl Into<String>, absolute_path: PathBuf) -> Self {
        Self {
            index,
            relative_path: relative_path.into(),
            absolute_path,
        }
    }

    /// The relative path in `./dir/file.ext` form, as handed to path transforms
    pub fn dot_relative(&self) -> String {
        format!("./{}", self.relative_path)
    }

    pub fn path(&self) -> &Path {
        &self.absolute_path
    }
}

/// Names a route module makes available to importers
///
/// Holds at most one `default` entry. Iteration follows the order in which
/// the names first appear in the source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportedBindingSet {
    names: FxIndexSet<String>,
}

impl ExportedBindingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a binding name
    ///
    /// Returns `false` when the name was already present, in which case the
    /// original position is kept.
    pub fn insert(&mut self, name: impl Into<String>) -> bool {
        self.names.insert(name.into())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn has_default(&self) -> bool {
        self.contains(DEFAULT_EXPORT)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for ExportedBindingSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        for name in iter {
            set.insert(name);
        }
        set
    }
}

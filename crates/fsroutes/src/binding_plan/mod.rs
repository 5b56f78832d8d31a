//! Binding plans
//!
//! A `BindingPlan` records, for one route file, which exports travel with the
//! aggregator module (the sync channel) and which are fetched on demand
//! (the async channel). Planning is pure: it only combines the selectors in
//! the configuration with the file's exported binding set.

use log::debug;

use crate::{
    config::{Config, SyncSelector},
    types::{ExportedBindingSet, RouteFile},
};

#[cfg(test)]
mod tests;

/// Eager delivery decision for one route file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncPlan {
    /// The whole module bound under a single namespace alias
    Namespace { alias: String },
    /// Selected `(name, alias)` pairs, in selector order
    Named(Vec<(String, String)>),
}

impl SyncPlan {
    /// True when nothing is delivered eagerly
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Named(pairs) if pairs.is_empty())
    }

    /// Aliases introduced into the aggregator's module scope
    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        let (namespace, named) = match self {
            Self::Namespace { alias } => (Some(alias.as_str()), &[][..]),
            Self::Named(pairs) => (None, pairs.as_slice()),
        };
        namespace
            .into_iter()
            .chain(named.iter().map(|(_, alias)| alias.as_str()))
    }
}

/// Per-file delivery plan handed to the emitter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingPlan {
    pub sync: SyncPlan,
    /// Names the deferred import is restricted to, in selector order
    pub async_names: Vec<String>,
}

/// Alias binding a whole module namespace
pub fn namespace_alias(file_index: usize) -> String {
    format!("__{file_index}")
}

/// Alias binding the `position`th selected export of a file
pub fn named_alias(file_index: usize, position: usize) -> String {
    format!("__{file_index}_{position}")
}

/// Build the plan for `file` given its exports and the configured selectors
///
/// Selector names the file does not export are dropped silently; an empty
/// plan on either channel is valid.
pub fn plan(file: &RouteFile, exports: &ExportedBindingSet, config: &Config) -> BindingPlan {
    let sync = match &config.import_sync {
        SyncSelector::All => SyncPlan::Namespace {
            alias: namespace_alias(file.index),
        },
        SyncSelector::Names(names) => SyncPlan::Named(
            select(file, exports, names, "sync")
                .into_iter()
                .enumerate()
                .map(|(position, name)| (name, named_alias(file.index, position)))
                .collect(),
        ),
    };

    BindingPlan {
        sync,
        async_names: select(file, exports, &config.import_async, "async"),
    }
}

/// Ordered intersection of `selector` with `exports`, without repeats
fn select(
    file: &RouteFile,
    exports: &ExportedBindingSet,
    selector: &[String],
    channel: &str,
) -> Vec<String> {
    let mut selected: Vec<String> = Vec::with_capacity(selector.len());
    for name in selector {
        if !exports.contains(name) {
            debug!(
                "{}: `{name}` is not exported, dropped from {channel} plan",
                file.relative_path
            );
            continue;
        }
        if !selected.contains(name) {
            selected.push(name.clone());
        }
    }
    selected
}

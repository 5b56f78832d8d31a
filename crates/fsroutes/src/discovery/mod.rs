//! Route file discovery
//!
//! Walks the base directory, keeps files matching the include globs, then
//! drops those matching the ignore globs. The result is sorted by relative
//! path so the order never depends on how the filesystem lists entries.

use std::path::{Component, Path};

use log::{debug, trace, warn};
use walkdir::{DirEntry, WalkDir};

use crate::{config::Config, error::Result, orchestrator::DependencySink, types::RouteFile};

pub mod pattern;

pub use pattern::PatternSet;

/// Enumerate the route files for `config`
///
/// Registers the resolved base directory with `sink` so the host can rerun
/// generation when the directory's contents change.
pub fn discover(config: &Config, sink: &mut dyn DependencySink) -> Result<Vec<RouteFile>> {
    let base = config.resolve_base()?;
    debug!("Discovering route files under {}", base.display());
    sink.add_context_dependency(&base);

    let include = PatternSet::new(&config.pattern)?;
    let ignore = PatternSet::new(&config.ignore)?;

    let walker = WalkDir::new(&base)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| config.dot || entry.depth() == 0 || !is_hidden(entry));

    let mut matched = Vec::new();
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(relative) = relative_posix_path(&base, entry.path()) else {
            warn!("Skipping non UTF-8 path {}", entry.path().display());
            continue;
        };
        if !include.is_match(&relative) {
            continue;
        }
        if let Some(pattern) = ignore.matching_pattern(&relative) {
            trace!("Ignoring {relative} (matches `{pattern}`)");
            continue;
        }
        matched.push((relative, entry.into_path()));
    }

    matched.sort_by(|(a, _), (b, _)| a.cmp(b));
    debug!("Discovered {} route files", matched.len());

    Ok(matched
        .into_iter()
        .enumerate()
        .map(|(index, (relative, absolute))| RouteFile::new(index, relative, absolute))
        .collect())
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.'))
}

/// `path` relative to `base`, joined with forward slashes
fn relative_posix_path(base: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(base).ok()?;
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(parts.join("/"))
}

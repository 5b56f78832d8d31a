//! End-to-end generation pass
//!
//! Discovery, export analysis, planning and emission, run in that order.
//! Analysis is the only phase that touches file contents and is spread over a
//! bounded pool of scoped threads; its results are put back into discovery
//! order before planning so thread scheduling never shows up in the output.

use std::{
    fmt,
    num::NonZeroUsize,
    path::{Path, PathBuf},
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
    thread,
};

use log::{debug, info};

use crate::{
    analyzers::{self, ExportInventory, ScannerInventory},
    binding_plan::{self, BindingPlan},
    code_generator,
    config::Config,
    discovery,
    error::Result,
    types::{ExportedBindingSet, RouteFile},
};

/// Receives the paths a generation pass depends on
///
/// The host uses them to decide when the aggregator must be regenerated:
/// a context dependency is a directory whose file set matters, a file
/// dependency is a file whose contents matter.
pub trait DependencySink {
    fn add_context_dependency(&mut self, path: &Path);
    fn add_file_dependency(&mut self, path: &Path);
}

/// A `DependencySink` that simply records what it is given
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyList {
    pub context_dependencies: Vec<PathBuf>,
    pub file_dependencies: Vec<PathBuf>,
}

impl DependencyList {
    /// Context dependencies followed by file dependencies
    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.context_dependencies
            .iter()
            .chain(&self.file_dependencies)
            .map(PathBuf::as_path)
    }
}

impl DependencySink for DependencyList {
    fn add_context_dependency(&mut self, path: &Path) {
        self.context_dependencies.push(path.to_path_buf());
    }

    fn add_file_dependency(&mut self, path: &Path) {
        self.file_dependencies.push(path.to_path_buf());
    }
}

/// Produces aggregator modules for one configuration
///
/// A `Generator` holds no mutable state, so independent passes may run
/// concurrently against the same instance.
pub struct Generator {
    config: Config,
    inventory: Box<dyn ExportInventory>,
}

impl fmt::Debug for Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Generator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Generator {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            inventory: Box::new(ScannerInventory),
        }
    }

    /// Replace the built-in export scanner
    #[must_use]
    pub fn with_inventory(mut self, inventory: impl ExportInventory + 'static) -> Self {
        self.inventory = Box::new(inventory);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run one pass and return the aggregator module text
    ///
    /// Any failure aborts the pass; no partial output is produced.
    pub fn generate(&self, sink: &mut dyn DependencySink) -> Result<String> {
        let files = discovery::discover(&self.config, sink)?;
        for file in &files {
            sink.add_file_dependency(file.path());
        }

        let exports = self.analyze_all(&files)?;
        let plans: Vec<BindingPlan> = files
            .iter()
            .zip(&exports)
            .map(|(file, exports)| binding_plan::plan(file, exports, &self.config))
            .collect();

        let output = code_generator::emit(&files, &plans, &self.config.to_path)?;
        info!(
            "Generated route table with {} entries ({} bytes)",
            files.len(),
            output.len()
        );
        Ok(output)
    }

    fn worker_count(&self, file_count: usize) -> usize {
        let available = self.config.workers.map_or_else(
            || thread::available_parallelism().map_or(1, NonZeroUsize::get),
            NonZeroUsize::get,
        );
        available.min(file_count).max(1)
    }

    /// Inventory every file, returning the sets in discovery order
    ///
    /// Workers claim files in index order and stop claiming after the first
    /// failure. Every file below a failing index has then been analyzed, so
    /// the reported error is the first one in discovery order.
    fn analyze_all(&self, files: &[RouteFile]) -> Result<Vec<ExportedBindingSet>> {
        let workers = self.worker_count(files.len());
        let inventory = self.inventory.as_ref();
        if workers == 1 {
            return files
                .iter()
                .map(|file| analyzers::analyze(file, inventory))
                .collect();
        }
        debug!("Analyzing {} files on {workers} workers", files.len());

        let next = AtomicUsize::new(0);
        let failed = AtomicBool::new(false);
        let mut results: Vec<(usize, Result<ExportedBindingSet>)> = thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|_| {
                    scope.spawn(|| {
                        let mut done = Vec::new();
                        while !failed.load(Ordering::Acquire) {
                            let index = next.fetch_add(1, Ordering::AcqRel);
                            let Some(file) = files.get(index) else {
                                break;
                            };
                            let result = analyzers::analyze(file, inventory);
                            if result.is_err() {
                                failed.store(true, Ordering::Release);
                            }
                            done.push((index, result));
                        }
                        done
                    })
                })
                .collect();

            handles
                .into_iter()
                .flat_map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|payload| std::panic::resume_unwind(payload))
                })
                .collect()
        });

        results.sort_by_key(|(index, _)| *index);
        results.into_iter().map(|(_, result)| result).collect()
    }
}

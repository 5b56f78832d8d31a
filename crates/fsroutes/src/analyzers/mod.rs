//! Export analysis
//!
//! The generator only needs to know which names each route module exports.
//! That knowledge comes from an [`ExportInventory`] provider; the built-in
//! [`ScannerInventory`] tokenizes the module and scans its top-level
//! statements without evaluating anything.

use std::fs;

use log::debug;

use crate::{
    error::{Error, ParseError, Result},
    types::{ExportedBindingSet, RouteFile},
};

pub mod export_collector;
pub mod lexer;

/// Produces the exported binding names of a module's source text
pub trait ExportInventory: Send + Sync {
    fn inventory(&self, file: &RouteFile, source: &str) -> Result<ExportedBindingSet, ParseError>;
}

/// Built-in provider backed by the JavaScript/TypeScript scanner
#[derive(Debug, Default, Clone, Copy)]
pub struct ScannerInventory;

impl ExportInventory for ScannerInventory {
    fn inventory(&self, file: &RouteFile, source: &str) -> Result<ExportedBindingSet, ParseError> {
        export_collector::collect_exports(file.path(), source)
    }
}

/// Read `file` and inventory its exports
pub fn analyze(file: &RouteFile, inventory: &dyn ExportInventory) -> Result<ExportedBindingSet> {
    let source = fs::read_to_string(file.path()).map_err(|source| Error::Read {
        path: file.absolute_path.clone(),
        source,
    })?;
    let exports = inventory.inventory(file, &source)?;
    debug!(
        "{}: exports [{}]",
        file.relative_path,
        exports.iter().collect::<Vec<_>>().join(", ")
    );
    Ok(exports)
}

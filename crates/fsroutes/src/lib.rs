//! Turn a directory of route modules into a single aggregator module
//!
//! A generation pass discovers route files under a base directory, inventories
//! the exports of each file, decides which exports are bound eagerly and which
//! are fetched on demand, and emits one JavaScript module whose default export
//! is the ordered route table.

pub mod analyzers;
pub mod binding_plan;
pub mod code_generator;
pub mod config;
pub mod discovery;
pub mod error;
pub mod orchestrator;
pub mod path_transform;
pub mod types;

pub use config::{Config, SyncSelector};
pub use error::{Error, ParseError, Result};
pub use orchestrator::{DependencyList, DependencySink, Generator};
pub use path_transform::PathTransform;

//! Emission of the aggregator module
//!
//! The emitted text has two parts:
//! - a preamble of import statements, one per file with a non-empty sync plan
//! - a default-exported array holding one route descriptor per file
//!
//! Output depends only on its inputs, so identical route files, contents and
//! configuration always yield byte-identical text.

use log::trace;

use crate::{
    binding_plan::{BindingPlan, SyncPlan},
    error::{Error, Result},
    path_transform::PathTransform,
    types::{FxIndexMap, RouteFile},
};

pub mod js;

const INDENT: &str = "  ";

/// Render the aggregator module for files and their plans, both in discovery order
pub fn emit(files: &[RouteFile], plans: &[BindingPlan], transform: &PathTransform) -> Result<String> {
    debug_assert_eq!(files.len(), plans.len());

    check_aliases(files, plans)?;

    let mut preamble = String::new();
    let mut table = String::new();

    for (file, plan) in files.iter().zip(plans) {
        let url = js::file_url(file.path())?;
        let specifier = js::string_literal(url.as_str());

        if let Some(import) = import_statement(&plan.sync, &specifier) {
            trace!("{}: {import}", file.relative_path);
            preamble.push_str(&import);
            preamble.push('\n');
        }

        let path = transform.apply(&file.dot_relative());
        table.push_str(&descriptor(
            &path,
            &plan.sync,
            &plan.async_names,
            &js::async_specifier(&url),
        ));
    }

    let mut output = preamble;
    if !output.is_empty() {
        output.push('\n');
    }
    if table.is_empty() {
        output.push_str("export default [];\n");
    } else {
        output.push_str("export default [\n");
        output.push_str(&table);
        output.push_str("];\n");
    }
    Ok(output)
}

/// Every alias may be introduced only once in the module scope
fn check_aliases(files: &[RouteFile], plans: &[BindingPlan]) -> Result<()> {
    let mut owners: FxIndexMap<&str, &str> = FxIndexMap::default();
    for (file, plan) in files.iter().zip(plans) {
        for alias in plan.sync.aliases() {
            if let Some(first) = owners.insert(alias, &file.relative_path) {
                return Err(Error::Emission {
                    alias: alias.to_owned(),
                    first: first.to_owned(),
                    second: file.relative_path.clone(),
                });
            }
        }
    }
    Ok(())
}

/// One route descriptor literal, including its trailing comma and newline
fn descriptor(path: &str, sync: &SyncPlan, async_names: &[String], async_specifier: &str) -> String {
    format!(
        "{INDENT}{{\n\
         {INDENT}{INDENT}path: {},\n\
         {INDENT}{INDENT}sync: {},\n\
         {INDENT}{INDENT}async: {},\n\
         {INDENT}}},\n",
        js::string_literal(path),
        sync_value(sync),
        async_thunk(async_names, async_specifier),
    )
}

fn import_statement(sync: &SyncPlan, specifier: &str) -> Option<String> {
    match sync {
        SyncPlan::Namespace { alias } => Some(format!("import * as {alias} from {specifier};")),
        SyncPlan::Named(pairs) if pairs.is_empty() => None,
        SyncPlan::Named(pairs) => {
            let bindings = pairs
                .iter()
                .map(|(name, alias)| format!("{} as {alias}", js::property_key(name)))
                .collect::<Vec<_>>()
                .join(", ");
            Some(format!("import {{ {bindings} }} from {specifier};"))
        }
    }
}

fn sync_value(sync: &SyncPlan) -> String {
    match sync {
        SyncPlan::Namespace { alias } => alias.clone(),
        SyncPlan::Named(pairs) if pairs.is_empty() => "{}".to_owned(),
        SyncPlan::Named(pairs) => {
            let entries = pairs
                .iter()
                .map(|(name, alias)| format!("{}: {alias}", js::property_key(name)))
                .collect::<Vec<_>>()
                .join(", ");
            format!("{{ {entries} }}")
        }
    }
}

/// Zero-argument thunk fetching the restricted names, or an already resolved empty record
fn async_thunk(names: &[String], specifier: &str) -> String {
    if names.is_empty() {
        return "() => Promise.resolve({})".to_owned();
    }
    let hint = names
        .iter()
        .map(|name| js::string_literal(name))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "() => import(/* webpackExports: [{hint}] */ {})",
        js::string_literal(specifier)
    )
}

//! Tests for binding planning

use std::path::PathBuf;

use pretty_assertions::assert_eq;

use super::*;

fn route(index: usize, relative: &str) -> RouteFile {
    RouteFile::new(index, relative, PathBuf::from("/app/routes").join(relative))
}

fn exports(names: &[&str]) -> ExportedBindingSet {
    names.iter().copied().collect()
}

#[test]
fn test_all_selector_binds_namespace() {
    let config = Config::default();
    let plan = plan(&route(3, "a.ts"), &exports(&["default", "foo"]), &config);

    assert_eq!(
        plan.sync,
        SyncPlan::Namespace {
            alias: "__3".to_owned()
        }
    );
    assert!(plan.async_names.is_empty());
}

#[test]
fn test_explicit_selector_is_ordered_intersection() {
    let config = Config::default().with_import_sync(SyncSelector::names(["meta", "loader", "action"]));
    let plan = plan(
        &route(1, "b/[id].ts"),
        &exports(&["default", "loader", "meta"]),
        &config,
    );

    assert_eq!(
        plan.sync,
        SyncPlan::Named(vec![
            ("meta".to_owned(), "__1_0".to_owned()),
            ("loader".to_owned(), "__1_1".to_owned()),
        ])
    );
}

#[test]
fn test_missing_names_leave_empty_plan() {
    let config = Config::default()
        .with_import_sync(SyncSelector::names(["loader"]))
        .with_import_async(["action"]);
    let plan = plan(&route(0, "a/index.ts"), &exports(&["default"]), &config);

    assert!(plan.sync.is_empty());
    assert_eq!(plan.sync.aliases().count(), 0);
    assert!(plan.async_names.is_empty());
}

#[test]
fn test_async_selector_keeps_selector_order() {
    let config = Config::default().with_import_async(["default", "handle", "default"]);
    let plan = plan(
        &route(0, "a.ts"),
        &exports(&["handle", "unused", "default"]),
        &config,
    );
    assert_eq!(plan.async_names, vec!["default", "handle"]);
}

#[test]
fn test_repeated_selector_names_get_one_alias() {
    let config = Config::default().with_import_sync(SyncSelector::names(["loader", "loader"]));
    let plan = plan(&route(2, "x.ts"), &exports(&["loader"]), &config);
    assert_eq!(plan.sync.aliases().collect::<Vec<_>>(), vec!["__2_0"]);
}

#[test]
fn test_aliases_are_unique_across_files() {
    let config = Config::default().with_import_sync(SyncSelector::names(["a", "b"]));
    let set = exports(&["a", "b"]);

    let mut seen = std::collections::HashSet::new();
    for index in 0..12 {
        let plan = plan(&route(index, "f.ts"), &set, &config);
        for alias in plan.sync.aliases() {
            assert!(seen.insert(alias.to_owned()), "duplicate alias {alias}");
        }
    }
    assert_eq!(seen.len(), 24);
}

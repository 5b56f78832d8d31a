#![cfg(unix)]

use std::{fs, path::Path};

use fsroutes::{
    Config, DependencyList, Error, Generator, PathTransform, SyncSelector,
    path_transform::RewriteRule,
};
use insta::{assert_snapshot, with_settings};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use url::Url;

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn generate(config: Config) -> Result<String, Error> {
    Generator::new(config).generate(&mut DependencyList::default())
}

/// Snapshot filter hiding the temporary directory behind `file:///routes/`
fn url_filter(base: &Path) -> Vec<(String, String)> {
    let url = Url::from_directory_path(base.canonicalize().unwrap()).unwrap();
    vec![(regex::escape(url.as_str()), "file:///routes/".to_owned())]
}

fn assert_routes_snapshot(name: &str, base: &Path, output: &str) {
    let filters = url_filter(base);
    let filters: Vec<(&str, &str)> = filters
        .iter()
        .map(|(pattern, replacement)| (pattern.as_str(), replacement.as_str()))
        .collect();
    with_settings!({ filters => filters }, {
        assert_snapshot!(name, output);
    });
}

#[test]
fn test_end_to_end_route_table() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "a/index.ts", "export default function A() {}\n");
    write(
        temp.path(),
        "b/[id].ts",
        "export const loader = async ({ params }) => params.id;\nexport default function B() {}\n",
    );

    let config = Config::new(temp.path().to_string_lossy())
        .with_import_sync(SyncSelector::names(["loader"]))
        .with_import_async(["default"]);
    let output = generate(config).unwrap();

    assert_routes_snapshot("end_to_end_route_table", temp.path(), &output);
}

#[test]
fn test_whole_module_mode() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "index.tsx", "export default () => <h1>Home</h1>;\n");
    write(temp.path(), "about/index.tsx", "export default function About() {}\n");
    write(
        temp.path(),
        "books/[id].tsx",
        "export { loader } from \"./_data\";\nexport default function Book() {}\n",
    );
    write(temp.path(), "[...catchall].tsx", "export default function NotFound() {}\n");
    write(temp.path(), "_layout.tsx", "export default function Layout() {}\n");
    write(temp.path(), "_components/nav.tsx", "export const Nav = 1;\n");
    write(temp.path(), "books/styles.css", ".book { color: red; }\n");

    let output = generate(Config::new(temp.path().to_string_lossy())).unwrap();

    assert_routes_snapshot("whole_module_mode", temp.path(), &output);
}

#[test]
fn test_generation_is_idempotent() {
    let temp = TempDir::new().unwrap();
    for name in ["z", "m", "a", "q"] {
        write(
            temp.path(),
            &format!("{name}/index.ts"),
            "export const loader = 1;\nexport const action = 2;\nexport default 3;\n",
        );
    }

    let config = Config::new(temp.path().to_string_lossy())
        .with_import_sync(SyncSelector::names(["action", "loader"]))
        .with_import_async(["default"]);

    let first = generate(config.clone()).unwrap();
    let second = generate(config).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_missing_sync_names_produce_no_alias() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "only-default.ts", "export default 1;\n");

    let config = Config::new(temp.path().to_string_lossy())
        .with_import_sync(SyncSelector::names(["loader"]));
    let output = generate(config).unwrap();

    assert!(!output.contains("import "), "{output}");
    assert!(output.contains("    sync: {},\n"), "{output}");
    assert!(output.contains("    async: () => Promise.resolve({}),\n"), "{output}");
}

#[test]
fn test_empty_directory_yields_empty_table() {
    let temp = TempDir::new().unwrap();
    let output = generate(Config::new(temp.path().to_string_lossy())).unwrap();
    assert_eq!(output, "export default [];\n");
}

#[test]
fn test_rule_based_path_transform() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "docs/intro.md.ts", "export default 1;\n");

    let config = Config::new(temp.path().to_string_lossy()).with_to_path(PathTransform::Rules(vec![
        RewriteRule::new(r"^\./", "/site/").unwrap(),
        RewriteRule::new(r"\.md\.ts$", ".html").unwrap(),
    ]));
    let output = generate(config).unwrap();
    assert!(output.contains("path: \"/site/docs/intro.html\","), "{output}");
}

#[test]
fn test_file_url_base() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "index.ts", "export default 1;\n");

    let base = Url::from_directory_path(temp.path()).unwrap();
    let output = generate(Config::new(base.as_str())).unwrap();
    assert!(output.contains("path: \"/\","), "{output}");
}

#[test]
fn test_invalid_route_file_aborts_the_pass() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "good.ts", "export default 1;\n");
    write(temp.path(), "broken.ts", "export const title = \"unterminated;\n");

    let err = generate(Config::new(temp.path().to_string_lossy())).unwrap_err();
    match &err {
        Error::Parse(parse) => {
            assert!(parse.path.ends_with("broken.ts"));
            assert_eq!((parse.line, parse.column), (1, 22));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("broken.ts:1:22: unterminated string literal"));
}

#[test]
fn test_missing_base_is_configuration_error() {
    let temp = TempDir::new().unwrap();
    let config = Config::default().with_root(temp.path());
    let err = generate(config).unwrap_err();
    assert!(matches!(err, Error::Configuration { .. }), "{err}");
}

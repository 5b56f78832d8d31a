//! Generator configuration
//!
//! A `Config` is immutable for the duration of one generation pass. It can be
//! built in code or assembled from TOML layers:
//! built-in defaults, then the user config file, then the project
//! `fsroutes.toml`, then whatever the command line overrides.

use std::{
    fs,
    io::ErrorKind,
    num::NonZeroUsize,
    path::{Path, PathBuf},
};

use etcetera::BaseStrategy;
use log::debug;
use serde::Deserialize;
use url::Url;

use crate::{
    error::{Error, Result},
    path_transform::{PathTransform, RewriteRule},
};

/// Project-level config file looked up in the root directory
pub const CONFIG_FILE_NAME: &str = "fsroutes.toml";

pub const DEFAULT_BASE: &str = "src/routes";
pub const DEFAULT_PATTERNS: [&str; 4] = ["**/*.js", "**/*.jsx", "**/*.ts", "**/*.tsx"];
pub const DEFAULT_IGNORE: [&str; 2] = ["**/_*", "**/_*/**"];

/// Which exports are bundled eagerly with the aggregator module
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawSyncSelector")]
pub enum SyncSelector {
    /// The whole module, bound under one namespace alias
    #[default]
    All,
    /// Only these exports, in this order
    Names(Vec<String>),
}

impl SyncSelector {
    pub fn names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Names(names.into_iter().map(Into::into).collect())
    }

    /// Parse the command-line spelling: `all`, `*`, or a comma separated list
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "all" | "*" => Self::All,
            list => Self::names(split_names(list)),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSyncSelector {
    Keyword(String),
    Names(Vec<String>),
}

impl TryFrom<RawSyncSelector> for SyncSelector {
    type Error = String;

    fn try_from(raw: RawSyncSelector) -> Result<Self, Self::Error> {
        match raw {
            RawSyncSelector::Keyword(keyword) if keyword == "all" || keyword == "*" => Ok(Self::All),
            RawSyncSelector::Keyword(other) => Err(format!(
                "expected \"all\" or a list of export names, found \"{other}\""
            )),
            RawSyncSelector::Names(names) => Ok(Self::Names(names)),
        }
    }
}

/// Split a comma separated list of export names, dropping empty entries
pub fn split_names(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Project root that a relative `base` is resolved against
    pub root: PathBuf,
    /// Directory to search, as a path or a `file:` URL
    pub base: String,
    /// Include globs
    pub pattern: Vec<String>,
    /// Exclude globs, applied after inclusion
    pub ignore: Vec<String>,
    pub to_path: PathTransform,
    pub import_sync: SyncSelector,
    pub import_async: Vec<String>,
    /// Whether hidden files and directories are searched
    pub dot: bool,
    /// Upper bound on analysis threads, host parallelism when unset
    pub workers: Option<NonZeroUsize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            base: DEFAULT_BASE.to_owned(),
            pattern: DEFAULT_PATTERNS.iter().map(|p| (*p).to_owned()).collect(),
            ignore: DEFAULT_IGNORE.iter().map(|p| (*p).to_owned()).collect(),
            to_path: PathTransform::Default,
            import_sync: SyncSelector::All,
            import_async: Vec::new(),
            dot: false,
            workers: None,
        }
    }
}

impl Config {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    #[must_use]
    pub fn with_pattern<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pattern = patterns.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_ignore<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore = patterns.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_to_path(mut self, transform: PathTransform) -> Self {
        self.to_path = transform;
        self
    }

    #[must_use]
    pub fn with_import_sync(mut self, selector: SyncSelector) -> Self {
        self.import_sync = selector;
        self
    }

    #[must_use]
    pub fn with_import_async<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.import_async = names.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_dot(mut self, dot: bool) -> Self {
        self.dot = dot;
        self
    }

    #[must_use]
    pub fn with_workers(mut self, workers: NonZeroUsize) -> Self {
        self.workers = Some(workers);
        self
    }

    /// Resolve `base` to an existing absolute directory
    pub fn resolve_base(&self) -> Result<PathBuf> {
        let base = if self.base.starts_with("file:") {
            Url::parse(&self.base)
                .ok()
                .and_then(|url| url.to_file_path().ok())
                .ok_or_else(|| Error::Configuration {
                    path: PathBuf::from(&self.base),
                    reason: "not a valid file URL".to_owned(),
                })?
        } else {
            let base = PathBuf::from(&self.base);
            if base.is_absolute() {
                base
            } else {
                self.root.join(base)
            }
        };

        let resolved = base.canonicalize().map_err(|e| Error::Configuration {
            path: base.clone(),
            reason: if e.kind() == ErrorKind::NotFound {
                "directory does not exist".to_owned()
            } else {
                e.to_string()
            },
        })?;

        if !resolved.is_dir() {
            return Err(Error::Configuration {
                path: resolved,
                reason: "not a directory".to_owned(),
            });
        }

        Ok(resolved)
    }

    /// Assemble the layered configuration for a project root
    ///
    /// An explicit config path must exist; the implicit project and user
    /// files are optional.
    pub fn load(root: &Path, explicit: Option<&Path>) -> Result<Self> {
        let mut config = Self::default().with_root(root);

        if let Some(user_file) = user_config_path().filter(|path| path.is_file()) {
            debug!("Loading user config from {}", user_file.display());
            PartialConfig::from_file(&user_file)?.apply_to(&mut config, &user_file)?;
        }

        let project_file = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => Some(root.join(CONFIG_FILE_NAME)).filter(|path| path.is_file()),
        };
        if let Some(project_file) = project_file {
            debug!("Loading project config from {}", project_file.display());
            PartialConfig::from_file(&project_file)?.apply_to(&mut config, &project_file)?;
        }

        Ok(config)
    }
}

/// `<config dir>/fsroutes/config.toml`, honoring `XDG_CONFIG_HOME`
pub fn user_config_path() -> Option<PathBuf> {
    let strategy = etcetera::choose_base_strategy().ok()?;
    Some(strategy.config_dir().join("fsroutes").join("config.toml"))
}

/// One TOML layer; every key is optional and overrides the layers below it
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartialConfig {
    pub base: Option<String>,
    pub pattern: Option<OneOrMany>,
    pub ignore: Option<OneOrMany>,
    #[serde(alias = "toPath")]
    pub to_path: Option<Vec<RawRewriteRule>>,
    #[serde(alias = "importSync")]
    pub import_sync: Option<SyncSelector>,
    #[serde(alias = "importAsync")]
    pub import_async: Option<Vec<String>>,
    pub dot: Option<bool>,
    pub workers: Option<NonZeroUsize>,
}

/// A string or a list of strings
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl From<OneOrMany> for Vec<String> {
    fn from(value: OneOrMany) -> Self {
        match value {
            OneOrMany::One(one) => vec![one],
            OneOrMany::Many(many) => many,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawRewriteRule {
    pub pattern: String,
    pub replace: String,
}

impl PartialConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| Error::ConfigFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text, path)
    }

    pub fn from_toml_str(text: &str, path: &Path) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::ConfigSyntax {
            path: path.to_path_buf(),
            message: e.message().to_owned(),
        })
    }

    /// Overlay this layer onto `config`
    pub fn apply_to(self, config: &mut Config, origin: &Path) -> Result<()> {
        if let Some(base) = self.base {
            config.base = base;
        }
        if let Some(pattern) = self.pattern {
            config.pattern = pattern.into();
        }
        if let Some(ignore) = self.ignore {
            config.ignore = ignore.into();
        }
        if let Some(rules) = self.to_path {
            let rules = rules
                .into_iter()
                .map(|rule| {
                    RewriteRule::new(&rule.pattern, rule.replace).map_err(|e| Error::ConfigSyntax {
                        path: origin.to_path_buf(),
                        message: format!("invalid to_path pattern `{}`: {e}", rule.pattern),
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            config.to_path = PathTransform::Rules(rules);
        }
        if let Some(import_sync) = self.import_sync {
            config.import_sync = import_sync;
        }
        if let Some(import_async) = self.import_async {
            config.import_async = import_async;
        }
        if let Some(dot) = self.dot {
            config.dot = dot;
        }
        if let Some(workers) = self.workers {
            config.workers = Some(workers);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn parse(text: &str) -> Result<PartialConfig> {
        PartialConfig::from_toml_str(text, Path::new("fsroutes.toml"))
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.base, "src/routes");
        assert_eq!(config.pattern, vec!["**/*.js", "**/*.jsx", "**/*.ts", "**/*.tsx"]);
        assert_eq!(config.ignore, vec!["**/_*", "**/_*/**"]);
        assert_eq!(config.import_sync, SyncSelector::All);
        assert!(config.import_async.is_empty());
        assert!(matches!(config.to_path, PathTransform::Default));
    }

    #[test]
    fn test_sync_selector_spellings() {
        assert_eq!(parse("import_sync = \"all\"").unwrap().import_sync, Some(SyncSelector::All));
        assert_eq!(parse("importSync = \"*\"").unwrap().import_sync, Some(SyncSelector::All));
        assert_eq!(
            parse("import_sync = [\"loader\", \"action\"]").unwrap().import_sync,
            Some(SyncSelector::names(["loader", "action"]))
        );
        assert!(parse("import_sync = \"some\"").is_err());
    }

    #[test]
    fn test_sync_selector_from_command_line() {
        assert_eq!(SyncSelector::parse("all"), SyncSelector::All);
        assert_eq!(
            SyncSelector::parse("loader, action,"),
            SyncSelector::names(["loader", "action"])
        );
        assert_eq!(SyncSelector::parse(""), SyncSelector::Names(Vec::new()));
    }

    #[test]
    fn test_layer_overrides_only_present_keys() {
        let layer = parse(
            r#"
base = "app/pages"
ignore = "**/*.test.*"
importAsync = ["default"]
"#,
        )
        .unwrap();

        let mut config = Config::default();
        layer.apply_to(&mut config, Path::new("fsroutes.toml")).unwrap();

        assert_eq!(config.base, "app/pages");
        assert_eq!(config.ignore, vec!["**/*.test.*"]);
        assert_eq!(config.import_async, vec!["default"]);
        assert_eq!(config.pattern.len(), 4);
        assert_eq!(config.import_sync, SyncSelector::All);
    }

    #[test]
    fn test_rewrite_rules_layer() {
        let layer = parse(
            r#"
[[to_path]]
pattern = '^\./'
replace = "/"

[[to_path]]
pattern = '\.tsx?$'
replace = ""
"#,
        )
        .unwrap();

        let mut config = Config::default();
        layer.apply_to(&mut config, Path::new("fsroutes.toml")).unwrap();
        assert_eq!(config.to_path.apply("./books/list.tsx"), "/books/list");
    }

    #[test]
    fn test_invalid_rewrite_rule_is_reported() {
        let layer = parse("[[to_path]]\npattern = '('\nreplace = ''\n").unwrap();
        let err = layer
            .apply_to(&mut Config::default(), Path::new("fsroutes.toml"))
            .unwrap_err();
        assert!(matches!(err, Error::ConfigSyntax { .. }));
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let err = parse("bsae = \"typo\"").unwrap_err();
        assert!(matches!(err, Error::ConfigSyntax { .. }));
    }

    #[test]
    fn test_zero_workers_is_rejected() {
        assert!(parse("workers = 0").is_err());
        assert_eq!(parse("workers = 3").unwrap().workers, NonZeroUsize::new(3));
    }
}

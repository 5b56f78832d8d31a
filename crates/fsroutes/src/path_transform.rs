//! Conversion of route file paths into router path patterns
//!
//! The default pipeline maps:
//! - `./about/index.tsx` -> `/about/`
//! - `./books/[id].tsx` -> `/books/:id`
//! - `./[...404].tsx` -> `/*`
//!
//! Every transform is pure: the same relative path always produces the same
//! pattern.

use std::{fmt, sync::Arc};

use cow_utils::CowUtils;
use once_cell::sync::Lazy;
use regex::Regex;

static CATCH_ALL_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\.\.\.[^\]/]+\]").expect("catch-all regex is valid"));

static DYNAMIC_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\]/]+)\]").expect("dynamic segment regex is valid"));

static FILE_EXTENSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([^/])\.[^./]+$").expect("extension regex is valid"));

/// A closure supplied by the embedding application
pub type PathTransformFn = dyn Fn(&str) -> String + Send + Sync;

/// How route paths are derived from relative file paths
#[derive(Clone, Default)]
pub enum PathTransform {
    /// The built-in rewrite pipeline
    #[default]
    Default,
    /// Ordered regex replacements, applied to the `./`-prefixed path
    Rules(Vec<RewriteRule>),
    /// A caller-provided function
    Custom(Arc<PathTransformFn>),
}

impl PathTransform {
    pub fn custom(f: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        Self::Custom(Arc::new(f))
    }

    /// Derive the path pattern for a `./`-prefixed relative path
    pub fn apply(&self, dot_relative: &str) -> String {
        match self {
            Self::Default => default_path_transform(dot_relative),
            Self::Rules(rules) => rules
                .iter()
                .fold(dot_relative.to_owned(), |path, rule| rule.apply(&path)),
            Self::Custom(f) => f(dot_relative),
        }
    }
}

impl fmt::Debug for PathTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("Default"),
            Self::Rules(rules) => f.debug_tuple("Rules").field(rules).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// One regex replacement step of a rule-based transform
#[derive(Debug, Clone)]
pub struct RewriteRule {
    pattern: Regex,
    replace: String,
}

impl RewriteRule {
    pub fn new(pattern: &str, replace: impl Into<String>) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            replace: replace.into(),
        })
    }

    fn apply(&self, path: &str) -> String {
        self.pattern
            .replace_all(path, self.replace.as_str())
            .into_owned()
    }
}

/// The built-in pipeline
///
/// 1. root the path (`./x` -> `/x`)
/// 2. `[...name]` -> `*`
/// 3. `[name]` -> `:name`
/// 4. drop the extension of the last segment
/// 5. trailing `/index` -> `/`
pub fn default_path_transform(relative_path: &str) -> String {
    let normalized = relative_path.cow_replace('\\', "/");
    let trimmed = normalized
        .strip_prefix("./")
        .unwrap_or_else(|| normalized.trim_start_matches('/'));
    let rooted = format!("/{trimmed}");

    let path = CATCH_ALL_SEGMENT.replace_all(&rooted, "*");
    let path = DYNAMIC_SEGMENT.replace_all(&path, ":$1");
    let path = FILE_EXTENSION.replace(&path, "$1");

    match path.strip_suffix("/index") {
        Some(parent) => format!("{parent}/"),
        None => path.into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_collapses_to_directory() {
        assert_eq!(default_path_transform("./about/index.tsx"), "/about/");
        assert_eq!(default_path_transform("./index.tsx"), "/");
    }

    #[test]
    fn test_dynamic_segment() {
        assert_eq!(default_path_transform("./books/[id].tsx"), "/books/:id");
        assert_eq!(
            default_path_transform("./[org]/[repo]/settings.ts"),
            "/:org/:repo/settings"
        );
    }

    #[test]
    fn test_catch_all_segment() {
        assert_eq!(default_path_transform("./[...catchall].tsx"), "/*");
        assert_eq!(default_path_transform("./docs/[...slug].js"), "/docs/*");
    }

    #[test]
    fn test_only_last_extension_is_stripped() {
        assert_eq!(default_path_transform("./v1.2/page.server.ts"), "/v1.2/page.server");
    }

    #[test]
    fn test_paths_without_dot_prefix_are_rooted() {
        assert_eq!(default_path_transform("about/index.tsx"), "/about/");
        assert_eq!(default_path_transform("posts\\[id].tsx"), "/posts/:id");
    }

    #[test]
    fn test_index_only_collapses_as_trailing_segment() {
        assert_eq!(default_path_transform("./index/list.tsx"), "/index/list");
        assert_eq!(default_path_transform("./reindex.tsx"), "/reindex");
    }

    #[test]
    fn test_rules_replace_default_pipeline() {
        let transform = PathTransform::Rules(vec![
            RewriteRule::new(r"^\./", "/app/").unwrap(),
            RewriteRule::new(r"\.tsx$", "").unwrap(),
        ]);
        assert_eq!(transform.apply("./books/[id].tsx"), "/app/books/[id]");
    }

    #[test]
    fn test_custom_transform_is_used_verbatim() {
        let transform = PathTransform::custom(|path| path.to_uppercase());
        assert_eq!(transform.apply("./about/index.tsx"), "./ABOUT/INDEX.TSX");
    }
}

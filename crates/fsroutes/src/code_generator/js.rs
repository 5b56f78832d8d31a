//! JavaScript literal helpers

use std::path::Path;

use serde_json::Value;
use url::Url;

use crate::error::{Error, Result};

/// Query appended to the deferred import so the host splits it into its own chunk
pub const ASYNC_QUERY: &str = "async";

/// Double-quoted JavaScript string literal
pub fn string_literal(value: &str) -> String {
    Value::String(value.to_owned()).to_string()
}

/// Whether `name` may appear unquoted as an import name or property key
pub fn is_identifier_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|first| first == '$' || first == '_' || first.is_alphabetic())
        && chars.all(|c| c == '$' || c == '_' || c == '\u{200c}' || c == '\u{200d}' || c.is_alphanumeric())
}

/// `name` as an object key or module export name, quoted when needed
pub fn property_key(name: &str) -> String {
    if is_identifier_name(name) {
        name.to_owned()
    } else {
        string_literal(name)
    }
}

/// Module specifier for an absolute route file path
pub fn file_url(path: &Path) -> Result<Url> {
    Url::from_file_path(path).map_err(|()| Error::Specifier {
        path: path.to_path_buf(),
    })
}

/// Specifier of the deferred import for the same file
pub fn async_specifier(url: &Url) -> String {
    let mut url = url.clone();
    url.set_query(Some(ASYNC_QUERY));
    url.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_literal_escapes() {
        assert_eq!(string_literal("/a/"), "\"/a/\"");
        assert_eq!(string_literal("say \"hi\"\n"), "\"say \\\"hi\\\"\\n\"");
    }

    #[test]
    fn test_identifier_names() {
        assert!(is_identifier_name("loader"));
        assert!(is_identifier_name("$state"));
        assert!(is_identifier_name("_private1"));
        assert!(is_identifier_name("default"));
        assert!(is_identifier_name("größe"));
        assert!(!is_identifier_name(""));
        assert!(!is_identifier_name("1st"));
        assert!(!is_identifier_name("not-an-ident"));
    }

    #[test]
    fn test_property_key_quotes_when_needed() {
        assert_eq!(property_key("loader"), "loader");
        assert_eq!(property_key("a-b"), "\"a-b\"");
    }

    #[cfg(unix)]
    #[test]
    fn test_file_url_and_async_specifier() {
        let url = file_url(Path::new("/srv/app/routes/books/list.tsx")).unwrap();
        assert_eq!(url.as_str(), "file:///srv/app/routes/books/list.tsx");
        assert_eq!(
            async_specifier(&url),
            "file:///srv/app/routes/books/list.tsx?async"
        );
    }

    #[test]
    fn test_relative_path_has_no_file_url() {
        let err = file_url(Path::new("routes/a.ts")).unwrap_err();
        assert!(matches!(err, Error::Specifier { .. }));
    }
}

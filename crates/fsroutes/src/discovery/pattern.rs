//! Glob patterns compiled to anchored regular expressions
//!
//! Supported syntax: `*`, `?`, `[abc]`, `[!abc]`, `{a,b}`, `\` escapes, and
//! `**` as a whole segment matching any number of directories. Patterns are
//! matched against `/`-separated paths relative to the base directory.
//!
//! Brace groups are expanded before the pattern is split into segments, so an
//! alternative may span directories: `{pages,app/routes}/**/*.tsx`.

use regex::Regex;

use crate::error::{Error, Result};

/// A set of compiled globs; a path matches when any member matches
#[derive(Debug, Clone)]
pub struct PatternSet {
    patterns: Vec<Glob>,
}

#[derive(Debug, Clone)]
struct Glob {
    source: String,
    regex: Regex,
}

impl PatternSet {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|pattern| {
                let source = pattern.as_ref();
                Ok(Glob {
                    source: source.to_owned(),
                    regex: compile(source)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    pub fn is_match(&self, relative_path: &str) -> bool {
        self.patterns.iter().any(|glob| glob.regex.is_match(relative_path))
    }

    /// The first pattern matching `relative_path`, for diagnostics
    pub fn matching_pattern(&self, relative_path: &str) -> Option<&str> {
        self.patterns
            .iter()
            .find(|glob| glob.regex.is_match(relative_path))
            .map(|glob| glob.source.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

fn invalid(pattern: &str, reason: impl Into<String>) -> Error {
    Error::Discovery {
        pattern: pattern.to_owned(),
        reason: reason.into(),
    }
}

/// Translate one glob into an anchored regex
pub fn compile(pattern: &str) -> Result<Regex> {
    let trimmed = pattern.strip_prefix("./").unwrap_or(pattern);
    if trimmed.is_empty() {
        return Err(invalid(pattern, "pattern is empty"));
    }

    let bodies = expand_braces(pattern, trimmed)?
        .iter()
        .map(|expanded| translate(pattern, expanded))
        .collect::<Result<Vec<_>>>()?;

    Regex::new(&format!("^(?:{})$", bodies.join("|"))).map_err(|e| invalid(pattern, e.to_string()))
}

/// Every brace-free spelling of `glob`, in alternative order
fn expand_braces(pattern: &str, glob: &str) -> Result<Vec<String>> {
    let chars: Vec<char> = glob.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 2,
            '[' => i = class_end(&chars, i).map_or(i + 1, |end| end + 1),
            '{' => {
                let (alternatives, close) =
                    brace_group(&chars, i).ok_or_else(|| invalid(pattern, "unclosed alternation `{`"))?;
                let prefix: String = chars[..i].iter().collect();
                let suffix: String = chars[close + 1..].iter().collect();
                let mut expanded = Vec::new();
                for alternative in alternatives {
                    expanded.extend(expand_braces(pattern, &format!("{prefix}{alternative}{suffix}"))?);
                }
                return Ok(expanded);
            }
            _ => i += 1,
        }
    }
    Ok(vec![glob.to_owned()])
}

/// Index of the `]` closing the class opened at `open`
fn class_end(chars: &[char], open: usize) -> Option<usize> {
    let mut j = open + 1;
    if matches!(chars.get(j), Some('!' | '^')) {
        j += 1;
    }
    let first = j;
    while let Some(&c) = chars.get(j) {
        match c {
            '\\' => j += 2,
            ']' if j > first => return Some(j),
            _ => j += 1,
        }
    }
    None
}

/// Top-level alternatives of the group opened at `open`, and the index of its `}`
fn brace_group(chars: &[char], open: usize) -> Option<(Vec<String>, usize)> {
    let mut alternatives = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut j = open;
    while let Some(&c) = chars.get(j) {
        match c {
            '\\' => {
                current.push(c);
                current.push(*chars.get(j + 1)?);
                j += 2;
                continue;
            }
            '[' => {
                if let Some(end) = class_end(chars, j) {
                    current.extend(&chars[j..=end]);
                    j = end + 1;
                    continue;
                }
                current.push(c);
            }
            '{' => {
                depth += 1;
                if depth > 1 {
                    current.push(c);
                }
            }
            '}' => {
                depth -= 1;
                if depth == 0 {
                    alternatives.push(current);
                    return Some((alternatives, j));
                }
                current.push(c);
            }
            ',' if depth == 1 => alternatives.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
        j += 1;
    }
    None
}

/// Regex body, without anchors, for one brace-free glob
fn translate(pattern: &str, glob: &str) -> Result<String> {
    if glob.starts_with('/') {
        return Err(invalid(pattern, "pattern must be relative to the base directory"));
    }

    let segments: Vec<&str> = glob.split('/').collect();
    let last = segments.len() - 1;
    let mut out = String::new();
    let mut need_separator = false;

    for (i, segment) in segments.iter().enumerate() {
        if *segment == "**" {
            out.push_str(match (i == last, need_separator) {
                (true, true) => "(?:/.*)?",
                (true, false) => ".*",
                (false, true) => "(?:/[^/]+)*",
                (false, false) => "(?:[^/]+/)*",
            });
            continue;
        }
        if segment.is_empty() {
            return Err(invalid(pattern, "pattern contains an empty path segment"));
        }
        if need_separator {
            out.push('/');
        }
        translate_segment(pattern, segment, &mut out)?;
        need_separator = true;
    }
    Ok(out)
}

fn translate_segment(pattern: &str, segment: &str, out: &mut String) -> Result<()> {
    let mut chars = segment.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '*' => {
                // `**` inside a segment behaves like `*`
                while chars.peek() == Some(&'*') {
                    chars.next();
                }
                out.push_str("[^/]*");
            }
            '?' => out.push_str("[^/]"),
            '[' => {
                let mut class = String::from("[");
                if matches!(chars.peek(), Some('!' | '^')) {
                    chars.next();
                    class.push('^');
                }
                let mut closed = false;
                let mut first = true;
                while let Some(c) = chars.next() {
                    match c {
                        ']' if !first => {
                            closed = true;
                            break;
                        }
                        '\\' => {
                            let escaped = chars
                                .next()
                                .ok_or_else(|| invalid(pattern, "dangling escape in character class"))?;
                            class.push_str(&regex::escape(&escaped.to_string()));
                        }
                        '[' | ']' | '&' | '~' => {
                            class.push('\\');
                            class.push(c);
                        }
                        _ => class.push(c),
                    }
                    first = false;
                }
                if !closed {
                    return Err(invalid(pattern, "unclosed character class `[`"));
                }
                class.push(']');
                out.push_str(&class);
            }
            '\\' => {
                let escaped = chars
                    .next()
                    .ok_or_else(|| invalid(pattern, "dangling escape at end of pattern"))?;
                out.push_str(&regex::escape(&escaped.to_string()));
            }
            _ => out.push_str(&regex::escape(&c.to_string())),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(pattern: &str, path: &str) -> bool {
        compile(pattern).unwrap().is_match(path)
    }

    #[test]
    fn test_double_star_spans_directories() {
        assert!(matches("**/*.ts", "index.ts"));
        assert!(matches("**/*.ts", "a/b/c.ts"));
        assert!(!matches("**/*.ts", "a/b/c.tsx"));
        assert!(matches("a/**/b.js", "a/b.js"));
        assert!(matches("a/**/b.js", "a/x/y/b.js"));
        assert!(matches("docs/**", "docs/a/b"));
    }

    #[test]
    fn test_single_star_stays_in_segment() {
        assert!(matches("*.ts", "a.ts"));
        assert!(!matches("*.ts", "dir/a.ts"));
    }

    #[test]
    fn test_underscore_ignores() {
        let ignore = PatternSet::new(&["**/_*", "**/_*/**"]).unwrap();
        assert!(ignore.is_match("_layout.tsx"));
        assert!(ignore.is_match("blog/_components/card.tsx"));
        assert!(ignore.is_match("_private/deep/page.tsx"));
        assert!(!ignore.is_match("blog/post_list.tsx"));
        assert_eq!(ignore.matching_pattern("_layout.tsx"), Some("**/_*"));
    }

    #[test]
    fn test_braces_and_classes() {
        assert!(matches("**/*.{ts,tsx}", "a/b.tsx"));
        assert!(matches("**/*.{ts,tsx}", "a/b.ts"));
        assert!(!matches("**/*.{ts,tsx}", "a/b.js"));
        assert!(matches("[[]id].ts", "[id].ts"));
        assert!(matches("v[0-9].ts", "v3.ts"));
        assert!(!matches("v[!0-9].ts", "v3.ts"));
    }

    #[test]
    fn test_escaped_brackets_match_literally() {
        assert!(matches(r"books/\[id\].tsx", "books/[id].tsx"));
        assert!(!matches(r"books/\[id\].tsx", "books/i.tsx"));
    }

    #[test]
    fn test_malformed_patterns() {
        assert!(matches!(compile("[abc"), Err(Error::Discovery { .. })));
        assert!(matches!(compile("{a,b"), Err(Error::Discovery { .. })));
        assert!(matches!(compile(""), Err(Error::Discovery { .. })));
        assert!(matches!(compile("/abs/*.ts"), Err(Error::Discovery { .. })));
        assert!(matches!(compile("a//b"), Err(Error::Discovery { .. })));
        assert!(matches!(compile("{pages,/abs}/*.ts"), Err(Error::Discovery { .. })));
    }

    #[test]
    fn test_alternatives_may_span_directories() {
        let pattern = "{pages,app/routes}/**/*.tsx";
        assert!(matches(pattern, "pages/index.tsx"));
        assert!(matches(pattern, "app/routes/books/[id].tsx"));
        assert!(!matches(pattern, "app/index.tsx"));
        assert!(!matches(pattern, "routes/index.tsx"));
    }

    #[test]
    fn test_nested_and_escaped_braces() {
        assert!(matches("{a,b{1,2}}/x.ts", "b2/x.ts"));
        assert!(!matches("{a,b{1,2}}/x.ts", "b/x.ts"));
        assert!(matches(r"\{a\}.ts", "{a}.ts"));
        assert!(matches("[{]a.ts", "{a.ts"));
    }
}

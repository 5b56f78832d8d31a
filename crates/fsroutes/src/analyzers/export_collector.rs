//! Export collection for route modules
//!
//! Scans the top-level statements of a tokenized module and records every
//! runtime binding it exports:
//! - `export default ...` contributes `default`
//! - exported function, class, enum, namespace and variable declarations
//!   contribute their declared names, including every name bound by a
//!   destructuring declarator
//! - `export { a, b as c }` and `export { a } from "..."` contribute the
//!   exported alias, or the local name when there is none
//! - `export * as ns from "..."` contributes `ns`
//!
//! Type-only exports are skipped, and re-exports are never followed into the
//! module they come from.

use std::path::Path;

use log::{trace, warn};

use crate::{
    analyzers::lexer::{self, Token, TokenKind},
    error::ParseError,
    types::{DEFAULT_EXPORT, ExportedBindingSet},
};

/// Keywords that begin a new top-level statement after a line break
const STATEMENT_KEYWORDS: [&str; 13] = [
    "export",
    "import",
    "function",
    "class",
    "const",
    "let",
    "var",
    "interface",
    "enum",
    "declare",
    "type",
    "namespace",
    "abstract",
];

type ScanResult<T> = Result<T, ParseError>;

/// Collect the exported binding names of `source`
pub fn collect_exports(path: &Path, source: &str) -> ScanResult<ExportedBindingSet> {
    let tokens = lexer::tokenize(source)
        .map_err(|e| ParseError::new(path, e.line, e.column, e.rule))?;
    ExportCollector::new(path, &tokens).analyze()
}

/// Walks top-level tokens and records export statements
#[derive(Debug)]
pub struct ExportCollector<'a> {
    path: &'a Path,
    tokens: &'a [Token],
    exports: ExportedBindingSet,
}

impl<'a> ExportCollector<'a> {
    pub fn new(path: &'a Path, tokens: &'a [Token]) -> Self {
        Self {
            path,
            tokens,
            exports: ExportedBindingSet::new(),
        }
    }

    pub fn analyze(mut self) -> ScanResult<ExportedBindingSet> {
        let tokens = self.tokens;
        let mut depth = 0usize;
        let mut i = 0;
        while let Some(token) = tokens.get(i) {
            if token.kind == TokenKind::Punct {
                match token.value.as_str() {
                    "(" | "[" | "{" => depth += 1,
                    ")" | "]" | "}" => depth = depth.saturating_sub(1),
                    _ => {}
                }
            }

            let after_dot = i > 0 && {
                let previous = &tokens[i - 1];
                previous.is_punct(".") || previous.is_punct("?.")
            };
            if depth == 0 && token.is_ident("export") && !after_dot {
                i = self.export_statement(i + 1)?;
            } else {
                i += 1;
            }
        }
        Ok(self.exports)
    }

    fn token(&self, i: usize) -> Option<&'a Token> {
        self.tokens.get(i)
    }

    fn error(&self, i: usize, rule: impl Into<String>) -> ParseError {
        let (line, column) = match self.tokens.get(i).or_else(|| self.tokens.last()) {
            Some(token) => (token.line, token.column),
            None => (1, 1),
        };
        ParseError::new(self.path, line, column, rule)
    }

    fn describe(&self, i: usize) -> String {
        match self.token(i) {
            None => "end of input".to_owned(),
            Some(token) => match token.kind {
                TokenKind::Ident | TokenKind::Punct => format!("`{}`", token.value),
                TokenKind::Str => "string literal".to_owned(),
                TokenKind::Number => "number literal".to_owned(),
                TokenKind::Template => "template literal".to_owned(),
                TokenKind::Regex => "regular expression".to_owned(),
                TokenKind::Jsx => "JSX element".to_owned(),
                TokenKind::PrivateName => format!("`#{}`", token.value),
            },
        }
    }

    fn is_punct(&self, i: usize, punct: &str) -> bool {
        self.token(i).is_some_and(|t| t.is_punct(punct))
    }

    fn is_ident(&self, i: usize, name: &str) -> bool {
        self.token(i).is_some_and(|t| t.is_ident(name))
    }

    fn is_any_ident(&self, i: usize) -> bool {
        self.token(i).is_some_and(|t| t.kind == TokenKind::Ident)
    }

    fn record(&mut self, name: &str) {
        trace!("{}: export `{name}`", self.path.display());
        if !self.exports.insert(name) {
            warn!(
                "{}: `{name}` is exported more than once, keeping the first occurrence",
                self.path.display()
            );
        }
    }

    /// Parse what follows `export`; returns the index to resume scanning at
    fn export_statement(&mut self, start: usize) -> ScanResult<usize> {
        let mut i = start;
        while self.is_punct(i, "@") {
            i = self.skip_decorator(i + 1)?;
        }

        let Some(token) = self.token(i) else {
            return Err(self.error(i, "expected a declaration after `export`"));
        };

        if token.kind == TokenKind::Punct {
            return match token.value.as_str() {
                "{" => self.export_list(i, false),
                "*" => self.export_star(i + 1),
                "=" => Ok(i + 1),
                _ => Err(self.error(i, format!("unexpected {} after `export`", self.describe(i)))),
            };
        }
        if token.kind != TokenKind::Ident {
            return Err(self.error(i, format!("unexpected {} after `export`", self.describe(i))));
        }

        match token.value.as_str() {
            "default" => {
                self.record(DEFAULT_EXPORT);
                Ok(i + 1)
            }
            "type" if self.is_punct(i + 1, "{") => self.export_list(i + 1, true),
            // `export type X = ...`, `export type * from`, interfaces, ambient
            // declarations and `export as namespace X` bind no runtime value
            "type" | "interface" | "declare" | "as" => Ok(i + 1),
            "function" => self.declaration_name(i + 1, "function"),
            "async" if self.is_ident(i + 1, "function") => self.declaration_name(i + 2, "function"),
            "class" => self.declaration_name(i + 1, "class"),
            "abstract" if self.is_ident(i + 1, "class") => self.declaration_name(i + 2, "class"),
            "enum" => self.declaration_name(i + 1, "enum"),
            "const" if self.is_ident(i + 1, "enum") => Ok(i + 2),
            "const" | "let" | "var" => self.variable_declarations(i + 1),
            "namespace" | "module" if self.is_any_ident(i + 1) => {
                self.declaration_name(i + 1, "namespace")
            }
            "import" => self.import_equals(i + 1),
            _ => Err(self.error(i, format!("unexpected {} after `export`", self.describe(i)))),
        }
    }

    /// `@name`, `@a.b` or `@call(...)`; `i` points just past the `@`
    fn skip_decorator(&self, mut i: usize) -> ScanResult<usize> {
        if !self.is_any_ident(i) {
            return Err(self.error(i, "expected a decorator name after `@`"));
        }
        i += 1;
        while self.is_punct(i, ".") && self.is_any_ident(i + 1) {
            i += 2;
        }
        if self.is_punct(i, "(") {
            i = self.skip_balanced(i);
        }
        Ok(i)
    }

    fn declaration_name(&mut self, mut i: usize, what: &str) -> ScanResult<usize> {
        if what == "function" && self.is_punct(i, "*") {
            i += 1;
        }
        match self.token(i) {
            Some(token)
                if token.kind == TokenKind::Ident
                    && !(what == "class" && matches!(token.value.as_str(), "extends" | "implements")) =>
            {
                let name = token.value.clone();
                self.record(&name);
                Ok(i + 1)
            }
            _ => Err(self.error(i, format!("exported {what} declaration requires a name"))),
        }
    }

    /// `export import A = B.C` (TypeScript import alias)
    fn import_equals(&mut self, i: usize) -> ScanResult<usize> {
        let type_only = self.is_ident(i, "type") && self.is_any_ident(i + 1);
        let name_at = if type_only { i + 1 } else { i };
        match self.token(name_at) {
            Some(token) if token.kind == TokenKind::Ident && self.is_punct(name_at + 1, "=") => {
                if !type_only {
                    let name = token.value.clone();
                    self.record(&name);
                }
                Ok(name_at + 2)
            }
            _ => Err(self.error(name_at, "expected `export import Name = ...`")),
        }
    }

    /// `* from "m"` or `* as name from "m"`; `i` points just past the `*`
    fn export_star(&mut self, mut i: usize) -> ScanResult<usize> {
        if self.is_ident(i, "as") {
            let name = self.export_name(i + 1)?;
            self.record(&name);
            i += 2;
        }
        self.module_source(i)
    }

    /// `from "module"`
    fn module_source(&self, i: usize) -> ScanResult<usize> {
        if !self.is_ident(i, "from") {
            return Err(self.error(i, format!("expected `from` but found {}", self.describe(i))));
        }
        match self.token(i + 1) {
            Some(token) if token.kind == TokenKind::Str => Ok(i + 2),
            _ => Err(self.error(i + 1, "expected a module specifier string after `from`")),
        }
    }

    /// An identifier (keywords included) or a string literal naming an export
    fn export_name(&self, i: usize) -> ScanResult<String> {
        match self.token(i) {
            Some(token) if matches!(token.kind, TokenKind::Ident | TokenKind::Str) => Ok(token.value.clone()),
            _ => Err(self.error(i, format!("expected an export name but found {}", self.describe(i)))),
        }
    }

    /// `{ a, b as c, type D }` with an optional `from "m"`; `i` points at `{`
    fn export_list(&mut self, start: usize, type_only: bool) -> ScanResult<usize> {
        let mut i = start + 1;
        loop {
            if self.is_punct(i, "}") {
                i += 1;
                break;
            }
            if self.token(i).is_none() {
                return Err(self.error(start, "unterminated export list"));
            }

            // `type as x` exports a binding named `type`, while `type as`,
            // `type as as x` and `type x` are type-only specifiers
            let type_modifier = self.is_ident(i, "type")
                && match self.token(i + 1) {
                    Some(next) if next.is_ident("as") => {
                        self.is_ident(i + 2, "as") || self.is_punct(i + 2, ",") || self.is_punct(i + 2, "}")
                    }
                    Some(next) => matches!(next.kind, TokenKind::Ident | TokenKind::Str),
                    None => false,
                };
            if type_modifier {
                i += 1;
            }

            let local = self.export_name(i)?;
            i += 1;
            let exported = if self.is_ident(i, "as") {
                let alias = self.export_name(i + 1)?;
                i += 2;
                alias
            } else {
                local
            };
            if !type_only && !type_modifier {
                self.record(&exported);
            }

            if self.is_punct(i, ",") {
                i += 1;
            } else if !self.is_punct(i, "}") {
                return Err(self.error(
                    i,
                    format!("expected `,` or `}}` in export list but found {}", self.describe(i)),
                ));
            }
        }

        if self.is_ident(i, "from") {
            i = self.module_source(i)?;
        }
        Ok(i)
    }

    /// Declarator list of `const`/`let`/`var`; `i` points at the first binding
    fn variable_declarations(&mut self, mut i: usize) -> ScanResult<usize> {
        loop {
            i = self.binding_pattern(i)?;
            if self.is_punct(i, "!") {
                i += 1;
            }
            if self.is_punct(i, ":") {
                i = self.skip_type_annotation(i + 1);
            }
            if self.is_punct(i, "=") {
                i = self.skip_initializer(i + 1);
            }
            if self.is_punct(i, ",") {
                i += 1;
            } else {
                return Ok(i);
            }
        }
    }

    /// Record every name bound by an identifier, object or array pattern
    fn binding_pattern(&mut self, i: usize) -> ScanResult<usize> {
        let Some(token) = self.token(i) else {
            return Err(self.error(i, "expected a binding name in exported declaration"));
        };
        match token.kind {
            TokenKind::Ident => {
                let name = token.value.clone();
                self.record(&name);
                Ok(i + 1)
            }
            TokenKind::Punct if token.value == "{" => self.object_pattern(i + 1),
            TokenKind::Punct if token.value == "[" => self.array_pattern(i + 1),
            _ => Err(self.error(
                i,
                format!("expected a binding name but found {}", self.describe(i)),
            )),
        }
    }

    fn object_pattern(&mut self, mut i: usize) -> ScanResult<usize> {
        loop {
            if self.is_punct(i, "}") {
                return Ok(i + 1);
            }
            if self.is_punct(i, "...") {
                i = self.binding_pattern(i + 1)?;
            } else {
                let Some(key) = self.token(i) else {
                    return Err(self.error(i, "unterminated object pattern"));
                };
                let shorthand = key.kind == TokenKind::Ident && !self.is_punct(i + 1, ":");
                if shorthand {
                    let name = key.value.clone();
                    self.record(&name);
                    i += 1;
                } else {
                    i = match key.kind {
                        TokenKind::Punct if key.value == "[" => self.skip_balanced(i),
                        TokenKind::Ident | TokenKind::Str | TokenKind::Number => i + 1,
                        _ => {
                            return Err(self.error(
                                i,
                                format!("unexpected {} in object pattern", self.describe(i)),
                            ));
                        }
                    };
                    if !self.is_punct(i, ":") {
                        return Err(self.error(i, "expected `:` in object pattern"));
                    }
                    i = self.binding_pattern(i + 1)?;
                }
                if self.is_punct(i, "=") {
                    i = self.skip_default(i + 1);
                }
            }

            if self.is_punct(i, ",") {
                i += 1;
            } else if !self.is_punct(i, "}") {
                return Err(self.error(
                    i,
                    format!("expected `,` or `}}` in object pattern but found {}", self.describe(i)),
                ));
            }
        }
    }

    fn array_pattern(&mut self, mut i: usize) -> ScanResult<usize> {
        loop {
            if self.is_punct(i, "]") {
                return Ok(i + 1);
            }
            if self.is_punct(i, ",") {
                i += 1;
                continue;
            }
            i = if self.is_punct(i, "...") {
                self.binding_pattern(i + 1)?
            } else {
                self.binding_pattern(i)?
            };
            if self.is_punct(i, "=") {
                i = self.skip_default(i + 1);
            }
            if self.is_punct(i, ",") {
                i += 1;
            } else if !self.is_punct(i, "]") {
                return Err(self.error(
                    i,
                    format!("expected `,` or `]` in array pattern but found {}", self.describe(i)),
                ));
            }
        }
    }

    /// Index just past the closer matching the opener at `i`
    fn skip_balanced(&self, i: usize) -> usize {
        let mut depth = 0usize;
        let mut j = i;
        while let Some(token) = self.token(j) {
            if token.kind == TokenKind::Punct {
                match token.value.as_str() {
                    "(" | "[" | "{" => depth += 1,
                    ")" | "]" | "}" => {
                        depth = depth.saturating_sub(1);
                        if depth == 0 {
                            return j + 1;
                        }
                    }
                    _ => {}
                }
            }
            j += 1;
        }
        j
    }

    /// Skip a pattern default value, stopping before `,` or the pattern closer
    fn skip_default(&self, mut i: usize) -> usize {
        while let Some(token) = self.token(i) {
            if token.kind == TokenKind::Punct {
                match token.value.as_str() {
                    "(" | "[" | "{" => {
                        i = self.skip_balanced(i);
                        continue;
                    }
                    "<" => {
                        if let Some(end) = self.type_arguments_end(i) {
                            i = end;
                            continue;
                        }
                    }
                    "," | ")" | "]" | "}" => return i,
                    _ => {}
                }
            }
            i += 1;
        }
        i
    }

    /// Skip a type annotation up to the initializer or the next declarator
    fn skip_type_annotation(&self, mut i: usize) -> usize {
        let mut angle = 0usize;
        while let Some(token) = self.token(i) {
            if angle == 0 && self.starts_statement(token) {
                return i;
            }
            if token.kind == TokenKind::Punct {
                match token.value.as_str() {
                    "(" | "[" | "{" => {
                        i = self.skip_balanced(i);
                        continue;
                    }
                    "<" => angle += 1,
                    ">" => angle = angle.saturating_sub(1),
                    ">>" => angle = angle.saturating_sub(2),
                    ">>>" => angle = angle.saturating_sub(3),
                    "=" | "," | ";" if angle == 0 => return i,
                    ")" | "]" | "}" => return i,
                    _ => {}
                }
            }
            i += 1;
        }
        i
    }

    /// Skip an initializer expression up to `,`, `;` or the next statement
    fn skip_initializer(&self, mut i: usize) -> usize {
        while let Some(token) = self.token(i) {
            if self.starts_statement(token) {
                return i;
            }
            if token.kind == TokenKind::Punct {
                match token.value.as_str() {
                    "(" | "[" | "{" => {
                        i = self.skip_balanced(i);
                        continue;
                    }
                    "<" => {
                        if let Some(end) = self.type_arguments_end(i) {
                            i = end;
                            continue;
                        }
                    }
                    "," | ";" | ")" | "]" | "}" => return i,
                    _ => {}
                }
            }
            i += 1;
        }
        i
    }

    /// Index just past a type argument list such as `<string, { kind: "a" }>`
    ///
    /// `i` points at a `<` that directly follows an identifier. Returns `None`
    /// when the tokens up to the matching `>` cannot form type arguments, in
    /// which case the `<` is a comparison.
    fn type_arguments_end(&self, i: usize) -> Option<usize> {
        if !self.is_any_ident(i.checked_sub(1)?) {
            return None;
        }
        let mut depth = 0usize;
        let mut j = i;
        while let Some(token) = self.token(j) {
            if j > i && self.starts_statement(token) {
                return None;
            }
            match token.kind {
                TokenKind::Punct => match token.value.as_str() {
                    "(" | "[" | "{" => {
                        j = self.skip_balanced(j);
                        continue;
                    }
                    "<" => depth += 1,
                    ">" | ">>" | ">>>" => {
                        let closed = token.value.len();
                        if closed >= depth {
                            return (closed == depth).then_some(j + 1);
                        }
                        depth -= closed;
                    }
                    "," | "." | "?." | "|" | "&" | "?" | ":" | "=>" | "..." | "-" => {}
                    _ => return None,
                },
                TokenKind::Ident | TokenKind::Str | TokenKind::Number | TokenKind::Template => {}
                _ => return None,
            }
            j += 1;
        }
        None
    }

    /// A keyword on a fresh line that cannot continue the previous expression
    fn starts_statement(&self, token: &Token) -> bool {
        token.newline_before
            && token.kind == TokenKind::Ident
            && STATEMENT_KEYWORDS.contains(&token.value.as_str())
    }
}

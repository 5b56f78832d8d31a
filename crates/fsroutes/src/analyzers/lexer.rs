//! Tokenizer for JavaScript and TypeScript route modules
//!
//! Produces just enough structure for top-level export scanning. Comments are
//! dropped, while string, template, regular expression and JSX literals each
//! collapse into a single opaque token. Brackets are checked for balance, so
//! every `(`, `[` and `{` in the output has a matching closer.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    PrivateName,
    Punct,
    Number,
    Str,
    Template,
    Regex,
    Jsx,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Identifier name, punctuator text, or decoded string value
    pub value: String,
    pub line: usize,
    pub column: usize,
    /// A line terminator separates this token from the previous one
    pub newline_before: bool,
}

impl Token {
    pub fn is_punct(&self, punct: &str) -> bool {
        self.kind == TokenKind::Punct && self.value == punct
    }

    pub fn is_ident(&self, name: &str) -> bool {
        self.kind == TokenKind::Ident && self.value == name
    }
}

/// Where and why tokenization stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub line: usize,
    pub column: usize,
    pub rule: String,
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.column, self.rule)
    }
}

type LexResult<T> = Result<T, SyntaxError>;

/// Multi-character punctuators, longest first
const PUNCTUATORS: [&str; 33] = [
    ">>>=", "...", "===", "!==", "**=", "<<=", ">>=", ">>>", "&&=", "||=", "??=", "=>", "==",
    "!=", "<=", ">=", "&&", "||", "??", "?.", "++", "--", "+=", "-=", "*=", "/=", "%=", "&=",
    "|=", "^=", "<<", ">>", "**",
];

const SINGLE_PUNCTUATORS: &str = "{}()[];,<>+-*/%&|^!~?:=.@";

/// Keywords after which an expression (and so a regex or JSX literal) may start
const EXPRESSION_KEYWORDS: [&str; 16] = [
    "return", "typeof", "instanceof", "in", "of", "new", "delete", "void", "throw", "case", "do",
    "else", "yield", "await", "extends", "default",
];

pub fn tokenize(source: &str) -> LexResult<Vec<Token>> {
    let mut lexer = Lexer::new(source);
    lexer.skip_hashbang();
    lexer.lex_until(None)
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
}

impl Lexer {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if is_line_terminator(c) {
            // `\r\n` counts as a single line break
            if !(c == '\r' && self.peek() == Some('\n')) {
                self.line += 1;
                self.column = 1;
            }
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn starts_with(&self, text: &str) -> bool {
        text.chars()
            .enumerate()
            .all(|(i, c)| self.peek_at(i) == Some(c))
    }

    fn error(&self, rule: impl Into<String>) -> SyntaxError {
        SyntaxError {
            line: self.line,
            column: self.column,
            rule: rule.into(),
        }
    }

    fn error_at(line: usize, column: usize, rule: impl Into<String>) -> SyntaxError {
        SyntaxError {
            line,
            column,
            rule: rule.into(),
        }
    }

    fn skip_hashbang(&mut self) {
        if self.starts_with("#!") {
            while self.peek().is_some_and(|c| !is_line_terminator(c)) {
                self.bump();
            }
        }
    }

    /// Skip whitespace and comments, reporting whether a line break was crossed
    fn skip_trivia(&mut self) -> LexResult<bool> {
        let mut newline = false;
        while let Some(c) = self.peek() {
            if is_line_terminator(c) {
                newline = true;
                self.bump();
            } else if c.is_whitespace() || c == '\u{feff}' {
                self.bump();
            } else if self.starts_with("//") {
                while self.peek().is_some_and(|c| !is_line_terminator(c)) {
                    self.bump();
                }
            } else if self.starts_with("/*") {
                let (line, column) = (self.line, self.column);
                self.bump();
                self.bump();
                loop {
                    if self.starts_with("*/") {
                        self.bump();
                        self.bump();
                        break;
                    }
                    match self.bump() {
                        Some(c) if is_line_terminator(c) => newline = true,
                        Some(_) => {}
                        None => return Err(Self::error_at(line, column, "unterminated block comment")),
                    }
                }
            } else {
                break;
            }
        }
        Ok(newline)
    }

    /// Tokenize until end of input, or until the `}` closing an embedded
    /// expression when `closer` is set
    fn lex_until(&mut self, closer: Option<char>) -> LexResult<Vec<Token>> {
        let mut tokens: Vec<Token> = Vec::new();
        let mut open: Vec<(char, usize, usize)> = Vec::new();

        loop {
            let newline_before = self.skip_trivia()?;
            let Some(c) = self.peek() else {
                if let Some((bracket, line, column)) = open.pop() {
                    return Err(Self::error_at(line, column, format!("unclosed `{bracket}`")));
                }
                if closer.is_some() {
                    return Err(self.error("unterminated embedded expression"));
                }
                return Ok(tokens);
            };

            if open.is_empty() && closer == Some(c) {
                self.bump();
                return Ok(tokens);
            }

            let (line, column) = (self.line, self.column);
            let expression_allowed = expression_may_follow(&tokens);
            let (kind, value) = self.read_token(c, expression_allowed)?;

            if kind == TokenKind::Punct {
                match value.as_str() {
                    "(" | "[" | "{" => open.push((bracket_char(&value), line, column)),
                    ")" | "]" | "}" => {
                        let expected = match value.as_str() {
                            ")" => '(',
                            "]" => '[',
                            _ => '{',
                        };
                        match open.pop() {
                            Some((bracket, _, _)) if bracket == expected => {}
                            Some((bracket, open_line, open_column)) => {
                                return Err(Self::error_at(
                                    line,
                                    column,
                                    format!(
                                        "mismatched `{value}`, expected closer for `{bracket}` opened at {open_line}:{open_column}"
                                    ),
                                ));
                            }
                            None => {
                                return Err(Self::error_at(line, column, format!("unexpected `{value}`")));
                            }
                        }
                    }
                    _ => {}
                }
            }

            tokens.push(Token {
                kind,
                value,
                line,
                column,
                newline_before,
            });
        }
    }

    fn read_token(&mut self, c: char, expression_allowed: bool) -> LexResult<(TokenKind, String)> {
        if is_ident_start(c) {
            return Ok((TokenKind::Ident, self.read_ident()?));
        }
        if c == '#' && self.peek_at(1).is_some_and(is_ident_start) {
            self.bump();
            return Ok((TokenKind::PrivateName, self.read_ident()?));
        }
        if c.is_ascii_digit() || (c == '.' && self.peek_at(1).is_some_and(|d| d.is_ascii_digit())) {
            return Ok((TokenKind::Number, self.read_number()));
        }
        match c {
            '"' | '\'' => Ok((TokenKind::Str, self.read_string(c)?)),
            '`' => {
                self.read_template()?;
                Ok((TokenKind::Template, String::new()))
            }
            '/' if expression_allowed => {
                self.read_regex()?;
                Ok((TokenKind::Regex, String::new()))
            }
            '<' if expression_allowed && self.looks_like_jsx() => {
                self.bump();
                self.read_jsx_element()?;
                Ok((TokenKind::Jsx, String::new()))
            }
            _ => self.read_punct(),
        }
    }

    fn read_ident(&mut self) -> LexResult<String> {
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if c == '\\' {
                name.push(self.read_unicode_escape()?);
            } else if is_ident_part(c) {
                name.push(c);
                self.bump();
            } else {
                break;
            }
        }
        Ok(name)
    }

    /// `\uXXXX` or `\u{X...}`, with the cursor on the backslash
    fn read_unicode_escape(&mut self) -> LexResult<char> {
        let (line, column) = (self.line, self.column);
        self.bump();
        if self.bump() != Some('u') {
            return Err(Self::error_at(line, column, "invalid escape in identifier"));
        }
        let digits: String = if self.peek() == Some('{') {
            self.bump();
            let mut digits = String::new();
            while let Some(c) = self.bump() {
                if c == '}' {
                    break;
                }
                digits.push(c);
            }
            digits
        } else {
            (0..4).filter_map(|_| self.bump()).collect()
        };
        u32::from_str_radix(&digits, 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| Self::error_at(line, column, "invalid unicode escape"))
    }

    fn read_number(&mut self) -> String {
        let mut text = String::new();
        while let Some(c) = self.peek() {
            let exponent_sign = (c == '+' || c == '-')
                && text.ends_with(|e| e == 'e' || e == 'E')
                && !text.starts_with("0x")
                && !text.starts_with("0X");
            if c.is_ascii_alphanumeric() || c == '_' || c == '.' || exponent_sign {
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }
        text
    }

    fn read_string(&mut self, quote: char) -> LexResult<String> {
        let (line, column) = (self.line, self.column);
        self.bump();
        let mut value = String::new();
        loop {
            match self.peek() {
                None => return Err(Self::error_at(line, column, "unterminated string literal")),
                Some(c) if is_line_terminator(c) => {
                    return Err(Self::error_at(line, column, "unterminated string literal"));
                }
                Some(c) if c == quote => {
                    self.bump();
                    return Ok(value);
                }
                Some('\\') => {
                    if self.peek_at(1) == Some('u') {
                        value.push(self.read_unicode_escape()?);
                        continue;
                    }
                    self.bump();
                    match self.bump() {
                        None => return Err(Self::error_at(line, column, "unterminated string literal")),
                        Some('\r') => {
                            if self.peek() == Some('\n') {
                                self.bump();
                            }
                        }
                        Some(c) if is_line_terminator(c) => {}
                        Some('n') => value.push('\n'),
                        Some('t') => value.push('\t'),
                        Some('r') => value.push('\r'),
                        Some('b') => value.push('\u{8}'),
                        Some('f') => value.push('\u{c}'),
                        Some('v') => value.push('\u{b}'),
                        Some('0') => value.push('\0'),
                        Some('x') => {
                            let digits: String = (0..2).filter_map(|_| self.bump()).collect();
                            let escaped = u32::from_str_radix(&digits, 16)
                                .ok()
                                .and_then(char::from_u32)
                                .ok_or_else(|| self.error("invalid hexadecimal escape"))?;
                            value.push(escaped);
                        }
                        Some(c) => value.push(c),
                    }
                }
                Some(c) => {
                    value.push(c);
                    self.bump();
                }
            }
        }
    }

    fn read_template(&mut self) -> LexResult<()> {
        let (line, column) = (self.line, self.column);
        self.bump();
        loop {
            match self.bump() {
                None => return Err(Self::error_at(line, column, "unterminated template literal")),
                Some('`') => return Ok(()),
                Some('\\') => {
                    if self.bump().is_none() {
                        return Err(Self::error_at(line, column, "unterminated template literal"));
                    }
                }
                Some('$') if self.peek() == Some('{') => {
                    self.bump();
                    self.lex_until(Some('}'))?;
                }
                Some(_) => {}
            }
        }
    }

    fn read_regex(&mut self) -> LexResult<()> {
        let (line, column) = (self.line, self.column);
        self.bump();
        let mut in_class = false;
        loop {
            match self.bump() {
                None => return Err(Self::error_at(line, column, "unterminated regular expression")),
                Some(c) if is_line_terminator(c) => {
                    return Err(Self::error_at(line, column, "unterminated regular expression"));
                }
                Some('\\') => match self.bump() {
                    Some(c) if !is_line_terminator(c) => {}
                    _ => return Err(Self::error_at(line, column, "unterminated regular expression")),
                },
                Some('[') => in_class = true,
                Some(']') => in_class = false,
                Some('/') if !in_class => break,
                Some(_) => {}
            }
        }
        while self.peek().is_some_and(is_ident_part) {
            self.bump();
        }
        Ok(())
    }

    fn read_punct(&mut self) -> LexResult<(TokenKind, String)> {
        for punct in PUNCTUATORS {
            if self.starts_with(punct) {
                for _ in 0..punct.chars().count() {
                    self.bump();
                }
                return Ok((TokenKind::Punct, punct.to_owned()));
            }
        }
        match self.peek() {
            Some(c) if SINGLE_PUNCTUATORS.contains(c) => {
                self.bump();
                Ok((TokenKind::Punct, c.to_string()))
            }
            Some(c) => Err(self.error(format!("unexpected character `{c}`"))),
            None => Err(self.error("unexpected end of input")),
        }
    }

    /// Whether the `<` under the cursor opens a JSX element rather than a
    /// comparison or a TypeScript type parameter list such as `<T,>`
    fn looks_like_jsx(&self) -> bool {
        let mut offset = 1;
        while self.peek_at(offset).is_some_and(char::is_whitespace) {
            offset += 1;
        }
        match self.peek_at(offset) {
            Some('>') => true,
            Some(c) if is_ident_start(c) => {
                while self
                    .peek_at(offset)
                    .is_some_and(|c| is_ident_part(c) || matches!(c, '-' | '.' | ':'))
                {
                    offset += 1;
                }
                while self.peek_at(offset).is_some_and(char::is_whitespace) {
                    offset += 1;
                }
                let rest: String = (0..8).filter_map(|i| self.peek_at(offset + i)).collect();
                !(rest.starts_with(',') || rest.starts_with("extends "))
            }
            _ => false,
        }
    }

    /// Read one element or fragment; the opening `<` is already consumed
    fn read_jsx_element(&mut self) -> LexResult<()> {
        let (line, column) = (self.line, self.column);
        self.skip_trivia()?;
        if self.peek() == Some('>') {
            self.bump();
            return self.read_jsx_children(line, column, "");
        }

        let name = self.read_jsx_name();
        loop {
            self.skip_trivia()?;
            match self.peek() {
                None => return Err(Self::error_at(line, column, "unterminated JSX element")),
                Some('/') => {
                    self.bump();
                    if self.bump() != Some('>') {
                        return Err(self.error("expected `>` after `/` in JSX tag"));
                    }
                    return Ok(());
                }
                Some('>') => {
                    self.bump();
                    return self.read_jsx_children(line, column, &name);
                }
                Some('{') => {
                    self.bump();
                    self.lex_until(Some('}'))?;
                }
                Some(c) if is_ident_start(c) => {
                    self.read_jsx_name();
                    self.skip_trivia()?;
                    if self.peek() == Some('=') {
                        self.bump();
                        self.skip_trivia()?;
                        self.read_jsx_attribute_value()?;
                    }
                }
                Some(c) => return Err(self.error(format!("unexpected `{c}` in JSX tag"))),
            }
        }
    }

    fn read_jsx_name(&mut self) -> String {
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if is_ident_part(c) || matches!(c, '-' | '.' | ':') {
                name.push(c);
                self.bump();
            } else {
                break;
            }
        }
        name
    }

    fn read_jsx_attribute_value(&mut self) -> LexResult<()> {
        let (line, column) = (self.line, self.column);
        match self.bump() {
            Some(quote @ ('"' | '\'')) => loop {
                match self.bump() {
                    Some(c) if c == quote => return Ok(()),
                    Some(_) => {}
                    None => return Err(Self::error_at(line, column, "unterminated JSX attribute")),
                }
            },
            Some('{') => self.lex_until(Some('}')).map(drop),
            Some('<') => self.read_jsx_element(),
            _ => Err(Self::error_at(line, column, "expected JSX attribute value")),
        }
    }

    fn read_jsx_children(&mut self, line: usize, column: usize, name: &str) -> LexResult<()> {
        loop {
            match self.peek() {
                None => {
                    let what = if name.is_empty() { "fragment".to_owned() } else { format!("<{name}>") };
                    return Err(Self::error_at(line, column, format!("unterminated JSX {what}")));
                }
                Some('{') => {
                    self.bump();
                    self.lex_until(Some('}'))?;
                }
                Some('<') => {
                    self.bump();
                    self.skip_trivia()?;
                    if self.peek() == Some('/') {
                        self.bump();
                        self.skip_trivia()?;
                        let closing = self.read_jsx_name();
                        self.skip_trivia()?;
                        if self.bump() != Some('>') {
                            return Err(self.error("expected `>` to end JSX closing tag"));
                        }
                        if closing != name {
                            return Err(self.error(format!(
                                "closing tag </{closing}> does not match <{name}>"
                            )));
                        }
                        return Ok(());
                    }
                    self.read_jsx_element()?;
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
    }
}

fn bracket_char(value: &str) -> char {
    value.chars().next().unwrap_or_default()
}

/// Whether the token after `tokens` may begin an expression
fn expression_may_follow(tokens: &[Token]) -> bool {
    let Some((token, before)) = tokens.split_last() else {
        return true;
    };
    match token.kind {
        TokenKind::Punct => !matches!(token.value.as_str(), ")" | "]" | "}" | "++" | "--"),
        // `cfg.default` is a property access, not the keyword
        TokenKind::Ident => {
            let is_property = before
                .last()
                .is_some_and(|t| t.is_punct(".") || t.is_punct("?."));
            !is_property && EXPRESSION_KEYWORDS.contains(&token.value.as_str())
        }
        _ => false,
    }
}

fn is_line_terminator(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

fn is_ident_start(c: char) -> bool {
    c == '$' || c == '_' || c == '\\' || c.is_alphabetic()
}

fn is_ident_part(c: char) -> bool {
    c == '$' || c == '_' || c.is_alphanumeric() || c == '\u{200c}' || c == '\u{200d}'
}

use std::fmt;
use std::str::Chars;
use thiserror::Error;

#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    Identifier(String),
    Keyword(Keyword),

    NumericLiteral(f64),
    BigIntLiteral(String),
    StringLiteral(String),
    BooleanLiteral(bool),
    NullLiteral,
    RegExpLiteral { pattern: String, flags: String },

    // (cooked, raw); cooked is None when an escape is invalid
    NoSubstitutionTemplate(Option<String>, String),
    TemplateHead(Option<String>, String),
    TemplateMiddle(Option<String>, String),
    TemplateTail(Option<String>, String),

    LeftBrace,
    RightBrace,
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    Dot,
    Ellipsis,
    Semicolon,
    Comma,
    LessThan,
    GreaterThan,
    LessThanEqual,
    GreaterThanEqual,
    Equal,
    NotEqual,
    StrictEqual,
    StrictNotEqual,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Exponent,
    Increment,
    Decrement,
    LeftShift,
    RightShift,
    UnsignedRightShift,
    Ampersand,
    Pipe,
    Caret,
    Bang,
    Tilde,
    LogicalAnd,
    LogicalOr,
    NullishCoalescing,
    Question,
    OptionalChain,
    Colon,
    Arrow,
    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    PercentAssign,
    ExponentAssign,
    LeftShiftAssign,
    RightShiftAssign,
    UnsignedRightShiftAssign,
    AmpersandAssign,
    PipeAssign,
    CaretAssign,
    LogicalAndAssign,
    LogicalOrAssign,
    NullishAssign,

    LineTerminator,
    Eof,
}

macro_rules! keywords {
    ($($variant:ident => $text:literal),* $(,)?) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq)]
        pub enum Keyword {
            $($variant),*
        }

        impl Keyword {
            pub fn from_str(s: &str) -> Option<Keyword> {
                match s {
                    $($text => Some(Keyword::$variant),)*
                    _ => None,
                }
            }

            pub fn as_str(self) -> &'static str {
                match self {
                    $(Keyword::$variant => $text),*
                }
            }
        }
    };
}

keywords! {
    Async => "async",
    Await => "await",
    Break => "break",
    Case => "case",
    Catch => "catch",
    Class => "class",
    Const => "const",
    Continue => "continue",
    Debugger => "debugger",
    Default => "default",
    Delete => "delete",
    Do => "do",
    Else => "else",
    Enum => "enum",
    Export => "export",
    Extends => "extends",
    Finally => "finally",
    For => "for",
    Function => "function",
    If => "if",
    Import => "import",
    In => "in",
    Instanceof => "instanceof",
    Let => "let",
    New => "new",
    Of => "of",
    Return => "return",
    Static => "static",
    Super => "super",
    Switch => "switch",
    This => "this",
    Throw => "throw",
    Try => "try",
    Typeof => "typeof",
    Var => "var",
    Void => "void",
    While => "while",
    With => "with",
    Yield => "yield",
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
    pub offset: usize,
}

#[derive(Clone, Debug, Error)]
#[error("{}:{}: {message}", location.line, location.column)]
pub struct LexError {
    pub message: String,
    pub location: SourceLocation,
    /// The input ended before the token was complete.
    pub at_eof: bool,
}

#[derive(Clone)]
pub struct Lexer<'a> {
    source: &'a str,
    chars: Chars<'a>,
    current: Option<char>,
    offset: usize,
    line: u32,
    column: u32,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        let mut chars = source.chars();
        let current = chars.next();
        Self {
            source,
            chars,
            current,
            offset: 0,
            line: 1,
            column: 0,
        }
    }

    pub fn location(&self) -> SourceLocation {
        SourceLocation {
            line: self.line,
            column: self.column,
            offset: self.offset,
        }
    }

    fn peek(&self) -> Option<char> {
        self.current
    }

    fn peek_next(&self) -> Option<char> {
        self.chars.clone().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.current;
        if let Some(c) = ch {
            self.offset += c.len_utf8();
            self.column += 1;
            self.current = self.chars.next();
        }
        ch
    }

    fn advance_if(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Moves the current character into `s`, if there is one.
    fn bump_into(&mut self, s: &mut String) {
        if let Some(c) = self.advance() {
            s.push(c);
        }
    }

    fn error(&self, message: impl Into<String>) -> LexError {
        LexError {
            message: message.into(),
            location: self.location(),
            at_eof: false,
        }
    }

    fn eof_error(&self, message: impl Into<String>) -> LexError {
        LexError {
            at_eof: true,
            ..self.error(message)
        }
    }

    fn is_line_terminator(ch: char) -> bool {
        matches!(ch, '\n' | '\r' | '\u{2028}' | '\u{2029}')
    }

    fn is_whitespace(ch: char) -> bool {
        matches!(ch, '\t' | '\u{000B}' | '\u{000C}' | ' ' | '\u{00A0}' | '\u{FEFF}')
            || (ch.is_whitespace() && !Self::is_line_terminator(ch))
    }

    fn is_identifier_start(ch: char) -> bool {
        ch == '_' || ch == '$' || ch.is_ascii_alphabetic() || (!ch.is_ascii() && unicode_ident::is_xid_start(ch))
    }

    fn is_identifier_continue(ch: char) -> bool {
        ch == '_'
            || ch == '$'
            || ch.is_ascii_alphanumeric()
            || ch == '\u{200C}'
            || ch == '\u{200D}'
            || (!ch.is_ascii() && unicode_ident::is_xid_continue(ch))
    }

    fn handle_newline(&mut self, ch: char) {
        if ch == '\r' && self.peek() == Some('\n') {
            self.advance();
        }
        self.line += 1;
        self.column = 0;
    }

    fn skip_line_comment(&mut self) {
        while let Some(ch) = self.peek() {
            if Self::is_line_terminator(ch) {
                break;
            }
            self.advance();
        }
    }

    /// Returns whether the comment spanned a line terminator.
    fn skip_block_comment(&mut self) -> Result<bool, LexError> {
        let mut had_newline = false;
        loop {
            match self.advance() {
                Some('*') if self.advance_if('/') => return Ok(had_newline),
                Some(ch) if Self::is_line_terminator(ch) => {
                    had_newline = true;
                    self.handle_newline(ch);
                }
                Some(_) => {}
                None => return Err(self.eof_error("Unterminated block comment")),
            }
        }
    }

    pub fn next_token(&mut self) -> Result<Token, LexError> {
        loop {
            while self.peek().is_some_and(Self::is_whitespace) {
                self.advance();
            }

            let Some(ch) = self.peek() else {
                return Ok(Token::Eof);
            };

            if Self::is_line_terminator(ch) {
                self.advance();
                self.handle_newline(ch);
                return Ok(Token::LineTerminator);
            }

            if ch == '/' {
                match self.peek_next() {
                    Some('/') => {
                        self.skip_line_comment();
                        continue;
                    }
                    Some('*') => {
                        self.advance();
                        self.advance();
                        if self.skip_block_comment()? {
                            return Ok(Token::LineTerminator);
                        }
                        continue;
                    }
                    _ => {}
                }
            }

            if ch == '#' && self.offset == 0 && self.peek_next() == Some('!') {
                self.skip_line_comment();
                continue;
            }

            self.advance();

            return match ch {
                '\'' | '"' => self.read_string(ch).map(Token::StringLiteral),
                '`' => {
                    let (cooked, raw, is_tail) = self.read_template_chars()?;
                    Ok(if is_tail {
                        Token::NoSubstitutionTemplate(cooked, raw)
                    } else {
                        Token::TemplateHead(cooked, raw)
                    })
                }
                '0'..='9' => self.read_numeric_literal(ch),
                '.' if self.peek().is_some_and(|c| c.is_ascii_digit()) => {
                    self.read_numeric_literal(ch)
                }
                '\\' => {
                    let first = self.read_identifier_escape()?;
                    Ok(self.read_identifier(first, true))
                }
                c if Self::is_identifier_start(c) => Ok(self.read_identifier(c.to_string(), false)),
                _ => self.read_punctuator(ch),
            };
        }
    }

    fn read_string(&mut self, quote: char) -> Result<String, LexError> {
        let mut s = String::new();
        loop {
            match self.advance() {
                None => return Err(self.eof_error("Unterminated string literal")),
                Some(ch) if ch == quote => return Ok(s),
                Some(ch) if Self::is_line_terminator(ch) => {
                    return Err(self.error("Unterminated string literal"));
                }
                Some('\\') => {
                    let esc = self.read_escape_sequence()?;
                    s.push_str(&esc);
                }
                Some(ch) => s.push(ch),
            }
        }
    }

    fn read_escape_sequence(&mut self) -> Result<String, LexError> {
        let Some(ch) = self.advance() else {
            return Err(self.eof_error("Unterminated escape sequence"));
        };
        let simple = match ch {
            'n' => Some('\n'),
            'r' => Some('\r'),
            't' => Some('\t'),
            'b' => Some('\u{0008}'),
            'f' => Some('\u{000C}'),
            'v' => Some('\u{000B}'),
            _ => None,
        };
        if let Some(c) = simple {
            return Ok(c.to_string());
        }
        match ch {
            '0' if !self.peek().is_some_and(|c| c.is_ascii_digit()) => Ok("\0".to_string()),
            '0'..='7' => {
                // legacy octal escape, up to three digits and at most \377
                let mut value = ch as u32 - '0' as u32;
                let max_digits = if ch <= '3' { 2 } else { 1 };
                for _ in 0..max_digits {
                    match self.peek() {
                        Some(d @ '0'..='7') => {
                            self.advance();
                            value = value * 8 + (d as u32 - '0' as u32);
                        }
                        _ => break,
                    }
                }
                Ok(char::from_u32(value).map(String::from).unwrap_or_default())
            }
            'x' => {
                let hi = self.advance().and_then(hex_val);
                let lo = self.advance().and_then(hex_val);
                match (hi, lo) {
                    (Some(a), Some(b)) => Ok(char::from_u32(a * 16 + b)
                        .map(String::from)
                        .unwrap_or_default()),
                    _ => Err(self.error("Invalid hexadecimal escape sequence")),
                }
            }
            'u' => self.read_unicode_escape(),
            c if Self::is_line_terminator(c) => {
                self.handle_newline(c);
                Ok(String::new())
            }
            c => Ok(c.to_string()),
        }
    }

    fn read_unicode_escape(&mut self) -> Result<String, LexError> {
        let value = if self.advance_if('{') {
            let mut value: u32 = 0;
            let mut digits = 0;
            loop {
                match self.advance() {
                    Some('}') if digits > 0 => break value,
                    Some(c) => {
                        let d = hex_val(c).ok_or_else(|| self.error("Invalid Unicode escape sequence"))?;
                        value = value * 16 + d;
                        if value > 0x10FFFF {
                            return Err(self.error("Undefined Unicode code-point"));
                        }
                        digits += 1;
                    }
                    None => return Err(self.eof_error("Unterminated Unicode escape sequence")),
                }
            }
        } else {
            let mut value: u32 = 0;
            for _ in 0..4 {
                let d = self
                    .advance()
                    .and_then(hex_val)
                    .ok_or_else(|| self.error("Invalid Unicode escape sequence"))?;
                value = value * 16 + d;
            }
            value
        };
        // lone surrogates cannot be represented in a Rust string
        Ok(char::from_u32(value)
            .unwrap_or(char::REPLACEMENT_CHARACTER)
            .to_string())
    }

    fn read_identifier_escape(&mut self) -> Result<String, LexError> {
        if !self.advance_if('u') {
            return Err(self.error("Invalid or unexpected token"));
        }
        self.read_unicode_escape()
    }

    fn read_numeric_literal(&mut self, first: char) -> Result<Token, LexError> {
        if first == '0' {
            let radix = match self.peek() {
                Some('x' | 'X') => Some(16),
                Some('o' | 'O') => Some(8),
                Some('b' | 'B') => Some(2),
                _ => None,
            };
            if let Some(radix) = radix {
                self.advance();
                return self.read_radix_literal(radix);
            }
            if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                return self.read_legacy_octal_or_decimal();
            }
        }

        let mut s = first.to_string();
        self.read_decimal_digits(&mut s);
        if first != '.' && self.peek() == Some('.') {
            self.bump_into(&mut s);
            self.read_decimal_digits(&mut s);
        }
        self.read_exponent(&mut s);

        if self.advance_if('n') {
            return Ok(Token::BigIntLiteral(s));
        }
        self.check_after_numeric()?;
        s.parse()
            .map(Token::NumericLiteral)
            .map_err(|_| self.error("Invalid numeric literal"))
    }

    fn read_decimal_digits(&mut self, s: &mut String) {
        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                s.push(ch);
                self.advance();
            } else if ch == '_' {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_exponent(&mut self, s: &mut String) {
        if self.peek().is_some_and(|c| c == 'e' || c == 'E') {
            self.bump_into(s);
            if self.peek().is_some_and(|c| c == '+' || c == '-') {
                self.bump_into(s);
            }
            self.read_decimal_digits(s);
        }
    }

    fn read_radix_literal(&mut self, radix: u32) -> Result<Token, LexError> {
        let mut digits = String::new();
        while let Some(ch) = self.peek() {
            if ch.is_digit(radix) {
                digits.push(ch);
                self.advance();
            } else if ch == '_' {
                self.advance();
            } else {
                break;
            }
        }
        if digits.is_empty() {
            return Err(self.error("Invalid or unexpected token"));
        }
        let prefix = match radix {
            16 => "0x",
            8 => "0o",
            _ => "0b",
        };
        if self.advance_if('n') {
            return Ok(Token::BigIntLiteral(format!("{prefix}{digits}")));
        }
        self.check_after_numeric()?;
        // fold digit by digit so literals wider than u64 still round like JavaScript
        let value = digits
            .chars()
            .filter_map(|c| c.to_digit(radix))
            .fold(0.0f64, |acc, d| acc * radix as f64 + d as f64);
        Ok(Token::NumericLiteral(value))
    }

    fn read_legacy_octal_or_decimal(&mut self) -> Result<Token, LexError> {
        let mut s = "0".to_string();
        self.read_decimal_digits(&mut s);
        let octal = s.chars().all(|c| ('0'..='7').contains(&c));
        if octal && !matches!(self.peek(), Some('.' | 'e' | 'E')) {
            self.check_after_numeric()?;
            let value = s[1..]
                .chars()
                .filter_map(|c| c.to_digit(8))
                .fold(0.0f64, |acc, d| acc * 8.0 + d as f64);
            return Ok(Token::NumericLiteral(value));
        }
        if self.peek() == Some('.') {
            self.bump_into(&mut s);
            self.read_decimal_digits(&mut s);
        }
        self.read_exponent(&mut s);
        self.check_after_numeric()?;
        s.parse()
            .map(Token::NumericLiteral)
            .map_err(|_| self.error("Invalid numeric literal"))
    }

    // a numeric literal must not run straight into an identifier or digit
    fn check_after_numeric(&self) -> Result<(), LexError> {
        match self.peek() {
            Some(c) if Self::is_identifier_start(c) || c.is_ascii_digit() => {
                Err(self.error("Invalid or unexpected token"))
            }
            _ => Ok(()),
        }
    }

    fn read_identifier(&mut self, mut name: String, mut escaped: bool) -> Token {
        while let Some(ch) = self.peek() {
            if Self::is_identifier_continue(ch) {
                name.push(ch);
                self.advance();
            } else if ch == '\\' {
                self.advance();
                match self.read_identifier_escape() {
                    Ok(esc) => {
                        name.push_str(&esc);
                        escaped = true;
                    }
                    Err(_) => break,
                }
            } else {
                break;
            }
        }

        // an escaped keyword is still just an identifier name
        if escaped {
            return Token::Identifier(name);
        }
        match name.as_str() {
            "true" => Token::BooleanLiteral(true),
            "false" => Token::BooleanLiteral(false),
            "null" => Token::NullLiteral,
            _ => match Keyword::from_str(&name) {
                Some(kw) => Token::Keyword(kw),
                None => Token::Identifier(name),
            },
        }
    }

    /// Re-lexes from just after a `/` the parser found in expression
    /// position.
    pub fn lex_regex(&mut self) -> Result<Token, LexError> {
        let mut pattern = String::new();
        let mut in_class = false;
        loop {
            match self.peek() {
                None => return Err(self.eof_error("Invalid regular expression: missing /")),
                Some(c) if Self::is_line_terminator(c) => {
                    return Err(self.error("Invalid regular expression: missing /"));
                }
                Some('/') if !in_class => {
                    self.advance();
                    break;
                }
                Some(c) => {
                    match c {
                        '[' => in_class = true,
                        ']' => in_class = false,
                        '\\' => {
                            self.bump_into(&mut pattern);
                        }
                        _ => {}
                    }
                    self.bump_into(&mut pattern);
                }
            }
        }
        let mut flags = String::new();
        while self.peek().is_some_and(Self::is_identifier_continue) {
            self.bump_into(&mut flags);
        }
        Ok(Token::RegExpLiteral { pattern, flags })
    }

    /// Returns (cooked, raw, is_tail); `is_tail` is false when the chunk
    /// ended at `${`.
    fn read_template_chars(&mut self) -> Result<(Option<String>, String, bool), LexError> {
        let mut cooked = Some(String::new());
        let mut raw = String::new();
        loop {
            match self.advance() {
                None => return Err(self.eof_error("Unterminated template literal")),
                Some('`') => return Ok((cooked, raw, true)),
                Some('$') if self.advance_if('{') => return Ok((cooked, raw, false)),
                Some('\\') => {
                    let start = self.offset;
                    let escape = self.read_escape_sequence();
                    raw.push('\\');
                    raw.push_str(&self.source[start..self.offset]);
                    match escape {
                        Ok(esc) => {
                            if let Some(c) = cooked.as_mut() {
                                c.push_str(&esc);
                            }
                        }
                        Err(e) if e.at_eof => return Err(e),
                        Err(_) => cooked = None,
                    }
                }
                Some(ch) if Self::is_line_terminator(ch) => {
                    // CRLF and CR normalize to LF in both forms
                    self.handle_newline(ch);
                    raw.push('\n');
                    if let Some(c) = cooked.as_mut() {
                        c.push('\n');
                    }
                }
                Some(ch) => {
                    raw.push(ch);
                    if let Some(c) = cooked.as_mut() {
                        c.push(ch);
                    }
                }
            }
        }
    }

    /// Continues a template after the `}` closing a substitution.
    pub fn read_template_continuation(&mut self) -> Result<Token, LexError> {
        let (cooked, raw, is_tail) = self.read_template_chars()?;
        Ok(if is_tail {
            Token::TemplateTail(cooked, raw)
        } else {
            Token::TemplateMiddle(cooked, raw)
        })
    }

    /// Picks `with_eq` when the next char is `=`, otherwise `plain`.
    fn with_assign(&mut self, with_eq: Token, plain: Token) -> Token {
        if self.advance_if('=') { with_eq } else { plain }
    }

    fn read_punctuator(&mut self, ch: char) -> Result<Token, LexError> {
        let token = match ch {
            '{' => Token::LeftBrace,
            '}' => Token::RightBrace,
            '(' => Token::LeftParen,
            ')' => Token::RightParen,
            '[' => Token::LeftBracket,
            ']' => Token::RightBracket,
            ';' => Token::Semicolon,
            ',' => Token::Comma,
            '~' => Token::Tilde,
            ':' => Token::Colon,
            '.' => {
                if self.peek() == Some('.') && self.peek_next() == Some('.') {
                    self.advance();
                    self.advance();
                    Token::Ellipsis
                } else {
                    Token::Dot
                }
            }
            '?' => {
                if self.advance_if('?') {
                    self.with_assign(Token::NullishAssign, Token::NullishCoalescing)
                } else if self.peek() == Some('.')
                    && !self.peek_next().is_some_and(|c| c.is_ascii_digit())
                {
                    self.advance();
                    Token::OptionalChain
                } else {
                    Token::Question
                }
            }
            '<' => {
                if self.advance_if('<') {
                    self.with_assign(Token::LeftShiftAssign, Token::LeftShift)
                } else {
                    self.with_assign(Token::LessThanEqual, Token::LessThan)
                }
            }
            '>' => {
                if self.advance_if('>') {
                    if self.advance_if('>') {
                        self.with_assign(Token::UnsignedRightShiftAssign, Token::UnsignedRightShift)
                    } else {
                        self.with_assign(Token::RightShiftAssign, Token::RightShift)
                    }
                } else {
                    self.with_assign(Token::GreaterThanEqual, Token::GreaterThan)
                }
            }
            '=' => {
                if self.advance_if('=') {
                    self.with_assign(Token::StrictEqual, Token::Equal)
                } else if self.advance_if('>') {
                    Token::Arrow
                } else {
                    Token::Assign
                }
            }
            '!' => {
                if self.advance_if('=') {
                    self.with_assign(Token::StrictNotEqual, Token::NotEqual)
                } else {
                    Token::Bang
                }
            }
            '+' => {
                if self.advance_if('+') {
                    Token::Increment
                } else {
                    self.with_assign(Token::PlusAssign, Token::Plus)
                }
            }
            '-' => {
                if self.advance_if('-') {
                    Token::Decrement
                } else {
                    self.with_assign(Token::MinusAssign, Token::Minus)
                }
            }
            '*' => {
                if self.advance_if('*') {
                    self.with_assign(Token::ExponentAssign, Token::Exponent)
                } else {
                    self.with_assign(Token::StarAssign, Token::Star)
                }
            }
            '/' => self.with_assign(Token::SlashAssign, Token::Slash),
            '%' => self.with_assign(Token::PercentAssign, Token::Percent),
            '&' => {
                if self.advance_if('&') {
                    self.with_assign(Token::LogicalAndAssign, Token::LogicalAnd)
                } else {
                    self.with_assign(Token::AmpersandAssign, Token::Ampersand)
                }
            }
            '|' => {
                if self.advance_if('|') {
                    self.with_assign(Token::LogicalOrAssign, Token::LogicalOr)
                } else {
                    self.with_assign(Token::PipeAssign, Token::Pipe)
                }
            }
            '^' => self.with_assign(Token::CaretAssign, Token::Caret),
            _ => return Err(self.error(format!("Invalid or unexpected token '{ch}'"))),
        };
        Ok(token)
    }

    pub fn tokenize_all(&mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token == Token::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }
}

fn hex_val(ch: char) -> Option<u32> {
    ch.to_digit(16)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lex(src: &str) -> Vec<Token> {
        Lexer::new(src)
            .tokenize_all()
            .unwrap()
            .into_iter()
            .filter(|t| !matches!(t, Token::LineTerminator))
            .collect()
    }

    fn lex_err(src: &str) -> LexError {
        Lexer::new(src).tokenize_all().unwrap_err()
    }

    #[test]
    fn empty_source() {
        assert_eq!(lex(""), vec![Token::Eof]);
    }

    #[test]
    fn identifiers_and_keywords() {
        assert_eq!(
            lex("let x = 42;"),
            vec![
                Token::Keyword(Keyword::Let),
                Token::Identifier("x".into()),
                Token::Assign,
                Token::NumericLiteral(42.0),
                Token::Semicolon,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn escaped_keyword_is_identifier() {
        assert_eq!(
            lex(r"\u0076ar"),
            vec![Token::Identifier("var".into()), Token::Eof]
        );
    }

    #[test]
    fn string_escapes() {
        assert_eq!(
            lex(r#"'a\nb' "\x41B\u{43}" '\101'"#),
            vec![
                Token::StringLiteral("a\nb".into()),
                Token::StringLiteral("ABC".into()),
                Token::StringLiteral("A".into()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn numeric_literals() {
        assert_eq!(
            lex("0xff 0b1010 0o77 1_000 1e3 .5 017 019"),
            vec![
                Token::NumericLiteral(255.0),
                Token::NumericLiteral(10.0),
                Token::NumericLiteral(63.0),
                Token::NumericLiteral(1000.0),
                Token::NumericLiteral(1000.0),
                Token::NumericLiteral(0.5),
                Token::NumericLiteral(15.0),
                Token::NumericLiteral(19.0),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn bigint_literals_keep_radix_prefix() {
        assert_eq!(
            lex("42n 0xFFn"),
            vec![
                Token::BigIntLiteral("42".into()),
                Token::BigIntLiteral("0xFF".into()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn punctuators() {
        assert_eq!(
            lex("=== !== => ... >>>= ??= ?. **"),
            vec![
                Token::StrictEqual,
                Token::StrictNotEqual,
                Token::Arrow,
                Token::Ellipsis,
                Token::UnsignedRightShiftAssign,
                Token::NullishAssign,
                Token::OptionalChain,
                Token::Exponent,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(
            lex("// line\n/* block */ 42"),
            vec![Token::NumericLiteral(42.0), Token::Eof]
        );
    }

    #[test]
    fn multiline_block_comment_acts_as_line_terminator() {
        let tokens = Lexer::new("a /*\n*/ b").tokenize_all().unwrap();
        assert_eq!(tokens[1], Token::LineTerminator);
    }

    #[test]
    fn template_head_and_continuation() {
        let mut lexer = Lexer::new("`a${x}b`");
        assert_eq!(
            lexer.next_token().unwrap(),
            Token::TemplateHead(Some("a".into()), "a".into())
        );
        assert_eq!(lexer.next_token().unwrap(), Token::Identifier("x".into()));
        assert_eq!(lexer.next_token().unwrap(), Token::RightBrace);
        assert_eq!(
            lexer.read_template_continuation().unwrap(),
            Token::TemplateTail(Some("b".into()), "b".into())
        );
    }

    #[test]
    fn unterminated_input_is_flagged() {
        assert!(lex_err("'abc").at_eof);
        assert!(lex_err("`abc").at_eof);
        assert!(lex_err("/* abc").at_eof);
        assert!(!lex_err("'abc\n'").at_eof);
    }

    #[test]
    fn identifier_directly_after_number_is_rejected() {
        assert!(Lexer::new("3x").tokenize_all().is_err());
    }
}

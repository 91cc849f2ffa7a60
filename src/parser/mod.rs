use crate::ast::*;
use crate::lexer::{Keyword, LexError, Lexer, SourceLocation, Token};
use std::rc::Rc;
use thiserror::Error;

mod declarations;
mod expressions;
mod statements;

#[derive(Clone, Debug, Error)]
#[error("SyntaxError: {message}")]
pub struct ParseError {
    pub message: String,
    pub location: SourceLocation,
    incomplete: bool,
}

impl ParseError {
    /// The input stopped before the program was complete. A REPL uses this
    /// to keep buffering lines instead of reporting.
    pub fn is_incomplete(&self) -> bool {
        self.incomplete
    }
}

impl From<LexError> for ParseError {
    fn from(e: LexError) -> Self {
        ParseError {
            message: e.message,
            location: e.location,
            incomplete: e.at_eof,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ParseOptions {
    /// Accept `await` outside async functions at the top level.
    pub top_level_await: bool,
    /// Accept `return` outside any function.
    pub return_outside_function: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            top_level_await: true,
            return_outside_function: false,
        }
    }
}

pub fn parse(source: &str, options: &ParseOptions) -> Result<Program, ParseError> {
    Parser::with_options(source, options.clone())?.parse_program()
}

/// Saved per-function parser state, restored when the function ends.
struct FunctionScope {
    in_function: bool,
    in_async: bool,
    in_generator: bool,
    in_iteration: u32,
    in_switch: u32,
    labels: Vec<(String, bool)>,
    allow_super_property: bool,
    allow_super_call: bool,
}

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    prev_line_terminator: bool,
    options: ParseOptions,
    in_function: bool,
    in_async: bool,
    in_generator: bool,
    in_iteration: u32,
    in_switch: u32,
    labels: Vec<(String, bool)>, // (name, labels an iteration)
    allow_super_property: bool,
    allow_super_call: bool,
    no_in: bool,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Result<Self, ParseError> {
        Self::with_options(source, ParseOptions::default())
    }

    pub fn with_options(source: &'a str, options: ParseOptions) -> Result<Self, ParseError> {
        let mut parser = Self {
            lexer: Lexer::new(source),
            current: Token::Eof,
            prev_line_terminator: false,
            options,
            in_function: false,
            in_async: false,
            in_generator: false,
            in_iteration: 0,
            in_switch: 0,
            labels: Vec::new(),
            allow_super_property: false,
            allow_super_call: false,
            no_in: false,
        };
        parser.advance()?;
        Ok(parser)
    }

    fn advance(&mut self) -> Result<Token, ParseError> {
        let (token, had_lt) = Self::scan(&mut self.lexer)?;
        self.prev_line_terminator = had_lt;
        Ok(std::mem::replace(&mut self.current, token))
    }

    fn scan(lexer: &mut Lexer<'a>) -> Result<(Token, bool), ParseError> {
        let mut had_lt = false;
        loop {
            match lexer.next_token()? {
                Token::LineTerminator => had_lt = true,
                token => return Ok((token, had_lt)),
            }
        }
    }

    /// The token after `current`, and whether a line break precedes it.
    fn peek(&self) -> Result<(Token, bool), ParseError> {
        let mut lookahead = self.lexer.clone();
        Self::scan(&mut lookahead)
    }

    fn eat(&mut self, expected: &Token) -> Result<(), ParseError> {
        if &self.current == expected {
            self.advance()?;
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn eat_semicolon(&mut self) -> Result<(), ParseError> {
        match self.current {
            Token::Semicolon => {
                self.advance()?;
                Ok(())
            }
            Token::RightBrace | Token::Eof => Ok(()),
            _ if self.prev_line_terminator => Ok(()),
            _ => Err(self.unexpected()),
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            message: message.into(),
            location: self.lexer.location(),
            incomplete: self.current == Token::Eof,
        }
    }

    fn unexpected(&self) -> ParseError {
        match &self.current {
            Token::Eof => self.error("Unexpected end of input"),
            Token::Identifier(name) => self.error(format!("Unexpected identifier '{name}'")),
            Token::Keyword(kw) => self.error(format!("Unexpected token '{kw}'")),
            Token::StringLiteral(_) => self.error("Unexpected string"),
            Token::NumericLiteral(_) | Token::BigIntLiteral(_) => self.error("Unexpected number"),
            other => self.error(format!("Unexpected token {other:?}")),
        }
    }

    /// Identifier names usable as bindings; contextual keywords included.
    fn current_identifier_name(&self) -> Option<String> {
        match &self.current {
            Token::Identifier(name) => Some(name.clone()),
            Token::Keyword(kw @ (Keyword::Async | Keyword::Of | Keyword::Static | Keyword::Let)) => {
                Some(kw.as_str().to_string())
            }
            Token::Keyword(Keyword::Yield) if !self.in_generator => Some("yield".to_string()),
            Token::Keyword(Keyword::Await) if !self.await_allowed() => Some("await".to_string()),
            _ => None,
        }
    }

    fn expect_identifier(&mut self) -> Result<String, ParseError> {
        match self.current_identifier_name() {
            Some(name) => {
                self.advance()?;
                Ok(name)
            }
            None => Err(self.unexpected()),
        }
    }

    fn await_allowed(&self) -> bool {
        self.in_async || (!self.in_function && self.options.top_level_await)
    }

    /// Runs `f` with the `in` operator re-enabled, as inside brackets.
    fn allow_in<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        let saved = std::mem::replace(&mut self.no_in, false);
        let result = f(self);
        self.no_in = saved;
        result
    }

    fn enter_function(&mut self, is_async: bool, is_generator: bool, is_arrow: bool) -> FunctionScope {
        let saved = FunctionScope {
            in_function: self.in_function,
            in_async: self.in_async,
            in_generator: self.in_generator,
            in_iteration: self.in_iteration,
            in_switch: self.in_switch,
            labels: std::mem::take(&mut self.labels),
            allow_super_property: self.allow_super_property,
            allow_super_call: self.allow_super_call,
        };
        self.in_function = true;
        self.in_async = is_async;
        self.in_generator = is_generator;
        self.in_iteration = 0;
        self.in_switch = 0;
        if !is_arrow {
            self.allow_super_property = false;
            self.allow_super_call = false;
        }
        saved
    }

    fn leave_function(&mut self, saved: FunctionScope) {
        self.in_function = saved.in_function;
        self.in_async = saved.in_async;
        self.in_generator = saved.in_generator;
        self.in_iteration = saved.in_iteration;
        self.in_switch = saved.in_switch;
        self.labels = saved.labels;
        self.allow_super_property = saved.allow_super_property;
        self.allow_super_call = saved.allow_super_call;
    }

    pub fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut body = Vec::new();
        while self.current != Token::Eof {
            body.push(self.parse_statement_or_declaration()?);
        }
        Ok(Program { body })
    }
}

/// Reinterprets a parenthesized arrow head as parameters.
fn expr_to_pattern(expr: Expression) -> Result<Pattern, String> {
    match expr {
        Expression::Identifier(name) => Ok(Pattern::Identifier(name)),
        Expression::Assign(AssignOp::Assign, left, right) => {
            Ok(Pattern::Assign(Box::new(expr_to_pattern(*left)?), right))
        }
        Expression::Spread(inner) => Ok(Pattern::Rest(Box::new(expr_to_pattern(*inner)?))),
        Expression::Array(elements) => elements
            .into_iter()
            .map(|e| e.map(expr_to_pattern).transpose())
            .collect::<Result<_, _>>()
            .map(Pattern::Array),
        Expression::Object(props) => props
            .into_iter()
            .map(|p| match p.kind {
                PropertyKind::Init => Ok((p.key, expr_to_pattern(p.value)?)),
                _ => Err("Invalid destructuring assignment target".to_string()),
            })
            .collect::<Result<_, _>>()
            .map(Pattern::Object),
        _ => Err("Invalid destructuring assignment target".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse_ok(src: &str) -> Program {
        parse(src, &ParseOptions::default()).unwrap()
    }

    fn parse_err(src: &str) -> ParseError {
        parse(src, &ParseOptions::default()).unwrap_err()
    }

    #[test]
    fn parse_empty() {
        assert!(parse_ok("").body.is_empty());
    }

    #[test]
    fn parse_var_declaration() {
        let prog = parse_ok("var x = 42, y;");
        let Statement::Variable(decl) = &prog.body[0] else {
            panic!("expected variable declaration");
        };
        assert_eq!(decl.kind, VarKind::Var);
        assert_eq!(decl.declarations.len(), 2);
        assert!(decl.declarations[1].init.is_none());
    }

    #[test]
    fn asi_splits_statements_on_newlines() {
        let prog = parse_ok("let a = 1\nlet b = 2\na + b");
        assert_eq!(prog.body.len(), 3);
    }

    #[test]
    fn parse_arrow_functions() {
        let prog = parse_ok("const f = (a, b = 2, ...rest) => a; const g = x => { return x }");
        let Statement::Variable(decl) = &prog.body[0] else {
            panic!("expected declaration");
        };
        let Some(Expression::ArrowFunction(f)) = &decl.declarations[0].init else {
            panic!("expected arrow");
        };
        assert_eq!(f.params.len(), 3);
        assert!(matches!(f.params[1], Pattern::Assign(..)));
        assert!(matches!(f.params[2], Pattern::Rest(_)));
        assert_eq!(f.expected_argument_count(), 1);
    }

    #[test]
    fn parse_async_forms() {
        let prog = parse_ok("async function f() { await g() }\nconst h = async x => await x");
        let Statement::FunctionDeclaration(f) = &prog.body[0] else {
            panic!("expected function");
        };
        assert!(f.is_async);
    }

    #[test]
    fn parse_class_members() {
        let prog = parse_ok(
            "class B extends A { x = 1; static y; static { } constructor() { super() } get z() { return 1 } static m() {} }",
        );
        let Statement::ClassDeclaration(class) = &prog.body[0] else {
            panic!("expected class");
        };
        assert!(class.super_class.is_some());
        assert_eq!(class.body.len(), 6);
        assert!(class.constructor().is_some());
    }

    #[test]
    fn parse_for_variants() {
        let prog = parse_ok("for (;;) {} for (let k in o) {} for (const v of a) {} for (x of a) {}");
        assert!(matches!(prog.body[0], Statement::For(_)));
        assert!(matches!(prog.body[1], Statement::ForIn(_)));
        assert!(matches!(prog.body[2], Statement::ForOf(_)));
        assert!(matches!(prog.body[3], Statement::ForOf(_)));
    }

    #[test]
    fn in_operator_allowed_inside_for_init_parens() {
        let prog = parse_ok("for (var i = ('a' in o) ? 1 : 0; i < 1; i++) {}");
        assert!(matches!(prog.body[0], Statement::For(_)));
    }

    #[test]
    fn parse_labeled_loops() {
        let prog = parse_ok("outer: for (;;) { inner: while (1) { continue outer } }");
        assert!(matches!(&prog.body[0], Statement::Labeled(name, _) if name == "outer"));
    }

    #[test]
    fn parse_template_with_substitutions() {
        let prog = parse_ok("`a${1}b${`c${2}`}d`");
        let Statement::Expression(Expression::Template(t)) = &prog.body[0] else {
            panic!("expected template");
        };
        assert_eq!(t.quasis.len(), 3);
        assert_eq!(t.expressions.len(), 2);
    }

    #[test]
    fn parse_object_literal_members() {
        let prog = parse_ok("({ a, b: 1, [c]: 2, m() {}, get g() { return 1 }, set g(v) {}, ...d })");
        let Statement::Expression(Expression::Object(props)) = &prog.body[0] else {
            panic!("expected object literal");
        };
        let kinds: Vec<_> = props.iter().map(|p| p.kind).collect();
        assert_eq!(
            kinds,
            vec![
                PropertyKind::Init,
                PropertyKind::Init,
                PropertyKind::Init,
                PropertyKind::Method,
                PropertyKind::Get,
                PropertyKind::Set,
                PropertyKind::Spread,
            ]
        );
    }

    #[test]
    fn regex_literal_is_recognized() {
        let prog = parse_ok("x = /a[/]b/g");
        let Statement::Expression(Expression::Assign(_, _, rhs)) = &prog.body[0] else {
            panic!("expected assignment");
        };
        assert!(matches!(&**rhs, Expression::Literal(Literal::RegExp(p, f)) if p == "a[/]b" && f == "g"));
    }

    #[test]
    fn incomplete_input_is_distinguished() {
        assert!(parse_err("function f() {").is_incomplete());
        assert!(parse_err("let x = ").is_incomplete());
        assert!(parse_err("foo(1,").is_incomplete());
        assert!(parse_err("`abc").is_incomplete());
        assert!(!parse_err("let = ;").is_incomplete());
        assert!(!parse_err("1 +* 2").is_incomplete());
    }

    #[test]
    fn early_errors() {
        assert!(parse_err("return 1").message.contains("Illegal return"));
        assert!(parse_err("break").message.contains("Illegal break"));
        assert!(parse_err("while (1) { continue nowhere }").message.contains("Undefined label"));
        assert!(parse_err("function f() { super.x }").message.contains("super"));
        assert!(parse_err("function f() { await x }").is_incomplete() == false);
    }

    #[test]
    fn function_parameters_and_body() {
        let prog = parse_ok("function f(a, b = 1, ...rest) { return a }");
        let Statement::FunctionDeclaration(func) = &prog.body[0] else {
            panic!("expected function declaration");
        };
        assert_eq!(func.params.len(), 3);
        assert!(matches!(&func.body, FunctionBody::Block(body) if body.len() == 1));
        assert!(!parse_err("function f(a,, b) {}").is_incomplete());
        assert!(parse_err("function f(a) { return").is_incomplete());
        assert!(parse_err("function f() {} return 1").message.contains("Illegal return"));
    }

    #[test]
    fn top_level_return_can_be_enabled() {
        let options = ParseOptions {
            return_outside_function: true,
            ..ParseOptions::default()
        };
        assert!(parse("return 1", &options).is_ok());
    }
}

use super::*;

impl<'a> Parser<'a> {
    pub fn parse_expression(&mut self) -> Result<Expression, ParseError> {
        let expr = self.parse_assignment_expression()?;
        if self.current == Token::Comma {
            let mut exprs = vec![expr];
            while self.current == Token::Comma {
                self.advance()?;
                exprs.push(self.parse_assignment_expression()?);
            }
            Ok(Expression::Sequence(exprs))
        } else {
            Ok(expr)
        }
    }

    fn parse_yield_expression(&mut self) -> Result<Expression, ParseError> {
        self.advance()?;
        if self.prev_line_terminator
            || matches!(
                self.current,
                Token::RightBrace
                    | Token::Semicolon
                    | Token::RightParen
                    | Token::RightBracket
                    | Token::Colon
                    | Token::Comma
                    | Token::Eof
            )
        {
            return Ok(Expression::Yield(None, false));
        }
        let delegate = self.current == Token::Star;
        if delegate {
            self.advance()?;
        }
        let expr = self.parse_assignment_expression()?;
        Ok(Expression::Yield(Some(Box::new(expr)), delegate))
    }

    fn validate_assignment_target(&self, expr: &Expression, simple_only: bool) -> Result<(), ParseError> {
        match expr {
            Expression::Identifier(_) | Expression::Member(..) => Ok(()),
            Expression::Array(_) | Expression::Object(_) if !simple_only => Ok(()),
            _ => Err(self.error("Invalid left-hand side in assignment")),
        }
    }

    pub(super) fn parse_assignment_expression(&mut self) -> Result<Expression, ParseError> {
        if self.in_generator && self.current == Token::Keyword(Keyword::Yield) {
            return self.parse_yield_expression();
        }

        let left = self.parse_conditional_expression()?;

        let op = match &self.current {
            Token::Assign => AssignOp::Assign,
            Token::PlusAssign => AssignOp::AddAssign,
            Token::MinusAssign => AssignOp::SubAssign,
            Token::StarAssign => AssignOp::MulAssign,
            Token::SlashAssign => AssignOp::DivAssign,
            Token::PercentAssign => AssignOp::ModAssign,
            Token::ExponentAssign => AssignOp::ExpAssign,
            Token::LeftShiftAssign => AssignOp::LShiftAssign,
            Token::RightShiftAssign => AssignOp::RShiftAssign,
            Token::UnsignedRightShiftAssign => AssignOp::URShiftAssign,
            Token::AmpersandAssign => AssignOp::BitAndAssign,
            Token::PipeAssign => AssignOp::BitOrAssign,
            Token::CaretAssign => AssignOp::BitXorAssign,
            Token::LogicalAndAssign => AssignOp::LogicalAndAssign,
            Token::LogicalOrAssign => AssignOp::LogicalOrAssign,
            Token::NullishAssign => AssignOp::NullishAssign,
            _ => return Ok(left),
        };
        self.validate_assignment_target(&left, op != AssignOp::Assign)?;
        self.advance()?;
        let right = self.parse_assignment_expression()?;
        Ok(Expression::Assign(op, Box::new(left), Box::new(right)))
    }

    fn parse_conditional_expression(&mut self) -> Result<Expression, ParseError> {
        let expr = self.parse_nullish_coalescing()?;
        if self.current != Token::Question {
            return Ok(expr);
        }
        self.advance()?;
        let consequent = self.allow_in(|p| p.parse_assignment_expression())?;
        self.eat(&Token::Colon)?;
        let alternate = self.parse_assignment_expression()?;
        Ok(Expression::Conditional(
            Box::new(expr),
            Box::new(consequent),
            Box::new(alternate),
        ))
    }

    fn parse_nullish_coalescing(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_logical_or()?;
        while self.current == Token::NullishCoalescing {
            self.advance()?;
            let right = self.parse_logical_or()?;
            left = Expression::Logical(LogicalOp::NullishCoalescing, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_logical_or(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_logical_and()?;
        while self.current == Token::LogicalOr {
            self.advance()?;
            let right = self.parse_logical_and()?;
            left = Expression::Logical(LogicalOp::Or, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_logical_and(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_binary(0)?;
        while self.current == Token::LogicalAnd {
            self.advance()?;
            let right = self.parse_binary(0)?;
            left = Expression::Logical(LogicalOp::And, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    /// Binding power of the binary operator at `current`, lowest first.
    fn binary_operator(&self) -> Option<(BinaryOp, u8)> {
        Some(match &self.current {
            Token::Pipe => (BinaryOp::BitOr, 1),
            Token::Caret => (BinaryOp::BitXor, 2),
            Token::Ampersand => (BinaryOp::BitAnd, 3),
            Token::Equal => (BinaryOp::Eq, 4),
            Token::NotEqual => (BinaryOp::NotEq, 4),
            Token::StrictEqual => (BinaryOp::StrictEq, 4),
            Token::StrictNotEqual => (BinaryOp::StrictNotEq, 4),
            Token::LessThan => (BinaryOp::Lt, 5),
            Token::GreaterThan => (BinaryOp::Gt, 5),
            Token::LessThanEqual => (BinaryOp::LtEq, 5),
            Token::GreaterThanEqual => (BinaryOp::GtEq, 5),
            Token::Keyword(Keyword::Instanceof) => (BinaryOp::Instanceof, 5),
            Token::Keyword(Keyword::In) if !self.no_in => (BinaryOp::In, 5),
            Token::LeftShift => (BinaryOp::LShift, 6),
            Token::RightShift => (BinaryOp::RShift, 6),
            Token::UnsignedRightShift => (BinaryOp::URShift, 6),
            Token::Plus => (BinaryOp::Add, 7),
            Token::Minus => (BinaryOp::Sub, 7),
            Token::Star => (BinaryOp::Mul, 8),
            Token::Slash => (BinaryOp::Div, 8),
            Token::Percent => (BinaryOp::Mod, 8),
            _ => return None,
        })
    }

    /// Left-associative operators from `|` down to `*`, by precedence
    /// climbing.
    fn parse_binary(&mut self, min_precedence: u8) -> Result<Expression, ParseError> {
        let mut left = self.parse_exponentiation()?;
        while let Some((op, precedence)) = self.binary_operator() {
            if precedence <= min_precedence {
                break;
            }
            self.advance()?;
            let right = self.parse_binary(precedence)?;
            left = Expression::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_exponentiation(&mut self) -> Result<Expression, ParseError> {
        let unary_operand = matches!(
            self.current,
            Token::Minus | Token::Plus | Token::Bang | Token::Tilde
        ) || matches!(
            self.current,
            Token::Keyword(Keyword::Typeof | Keyword::Void | Keyword::Delete)
        );
        let base = self.parse_unary()?;
        if self.current != Token::Exponent {
            return Ok(base);
        }
        if unary_operand {
            return Err(self.error(
                "Unary operator used immediately before exponentiation expression. Parenthesis must be used to disambiguate operator precedence",
            ));
        }
        self.advance()?;
        // right-associative
        let exponent = self.parse_exponentiation()?;
        Ok(Expression::Binary(BinaryOp::Exp, Box::new(base), Box::new(exponent)))
    }

    fn parse_unary(&mut self) -> Result<Expression, ParseError> {
        let unary = match &self.current {
            Token::Minus => UnaryOp::Minus,
            Token::Plus => UnaryOp::Plus,
            Token::Bang => UnaryOp::Not,
            Token::Tilde => UnaryOp::BitNot,
            Token::Keyword(Keyword::Delete) => {
                self.advance()?;
                return Ok(Expression::Delete(Box::new(self.parse_unary()?)));
            }
            Token::Keyword(Keyword::Void) => {
                self.advance()?;
                return Ok(Expression::Void(Box::new(self.parse_unary()?)));
            }
            Token::Keyword(Keyword::Typeof) => {
                self.advance()?;
                return Ok(Expression::Typeof(Box::new(self.parse_unary()?)));
            }
            Token::Increment | Token::Decrement => {
                let op = if self.current == Token::Increment {
                    UpdateOp::Increment
                } else {
                    UpdateOp::Decrement
                };
                self.advance()?;
                let expr = self.parse_unary()?;
                self.validate_assignment_target(&expr, true)?;
                return Ok(Expression::Update(op, true, Box::new(expr)));
            }
            Token::Keyword(Keyword::Await) if self.await_allowed() => {
                self.advance()?;
                return Ok(Expression::Await(Box::new(self.parse_unary()?)));
            }
            _ => return self.parse_postfix(),
        };
        self.advance()?;
        let expr = self.parse_unary()?;
        Ok(Expression::Unary(unary, Box::new(expr)))
    }

    fn parse_postfix(&mut self) -> Result<Expression, ParseError> {
        let expr = self.parse_left_hand_side_expression()?;
        if self.prev_line_terminator {
            return Ok(expr);
        }
        let op = match self.current {
            Token::Increment => UpdateOp::Increment,
            Token::Decrement => UpdateOp::Decrement,
            _ => return Ok(expr),
        };
        self.validate_assignment_target(&expr, true)?;
        self.advance()?;
        Ok(Expression::Update(op, false, Box::new(expr)))
    }

    fn parse_dot_member_property(&mut self) -> Result<MemberProperty, ParseError> {
        let name = match &self.current {
            Token::Identifier(n) => n.clone(),
            Token::Keyword(kw) => kw.as_str().to_string(),
            Token::BooleanLiteral(b) => b.to_string(),
            Token::NullLiteral => "null".to_string(),
            Token::Eof => return Err(self.unexpected()),
            _ => return Err(self.error("Expected identifier after '.'")),
        };
        self.advance()?;
        Ok(MemberProperty::Dot(name))
    }

    fn parse_computed_member(&mut self) -> Result<MemberProperty, ParseError> {
        self.eat(&Token::LeftBracket)?;
        let prop = self.allow_in(|p| p.parse_expression())?;
        self.eat(&Token::RightBracket)?;
        Ok(MemberProperty::Computed(Box::new(prop)))
    }

    pub(super) fn parse_left_hand_side_expression(&mut self) -> Result<Expression, ParseError> {
        let mut expr = if self.current == Token::Keyword(Keyword::New) {
            self.parse_new_expression()?
        } else {
            self.parse_primary_expression()?
        };

        loop {
            match &self.current {
                Token::Dot => {
                    self.advance()?;
                    let prop = self.parse_dot_member_property()?;
                    expr = Expression::Member(Box::new(expr), prop);
                }
                Token::LeftBracket => {
                    let prop = self.parse_computed_member()?;
                    expr = Expression::Member(Box::new(expr), prop);
                }
                Token::LeftParen => {
                    let args = self.parse_arguments()?;
                    expr = Expression::Call(Box::new(expr), args);
                }
                Token::NoSubstitutionTemplate(..) | Token::TemplateHead(..) => {
                    let template = self.parse_template()?;
                    expr = Expression::TaggedTemplate(Box::new(expr), template);
                }
                Token::OptionalChain => {
                    self.advance()?;
                    let chain = self.parse_optional_chain_tail()?;
                    expr = Expression::OptionalChain(Box::new(expr), Box::new(chain));
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    /// Everything after `?.`, built on an empty-named placeholder for the
    /// short-circuited base.
    fn parse_optional_chain_tail(&mut self) -> Result<Expression, ParseError> {
        let base = Box::new(Expression::Identifier(String::new()));
        let mut chain = match &self.current {
            Token::LeftParen => Expression::Call(base, self.parse_arguments()?),
            Token::LeftBracket => Expression::Member(base, self.parse_computed_member()?),
            _ => Expression::Member(base, self.parse_dot_member_property()?),
        };
        loop {
            chain = match &self.current {
                Token::Dot => {
                    self.advance()?;
                    Expression::Member(Box::new(chain), self.parse_dot_member_property()?)
                }
                Token::LeftBracket => Expression::Member(Box::new(chain), self.parse_computed_member()?),
                Token::LeftParen => Expression::Call(Box::new(chain), self.parse_arguments()?),
                _ => return Ok(chain),
            };
        }
    }

    fn parse_new_expression(&mut self) -> Result<Expression, ParseError> {
        self.advance()?; // new
        if self.current == Token::Dot {
            self.advance()?;
            if !matches!(&self.current, Token::Identifier(n) if n == "target") {
                return Err(self.error("Expected 'target' after 'new.'"));
            }
            if !self.in_function {
                return Err(self.error("new.target expression is not allowed here"));
            }
            self.advance()?;
            return Ok(Expression::NewTarget);
        }
        let mut callee = if self.current == Token::Keyword(Keyword::New) {
            self.parse_new_expression()?
        } else {
            self.parse_primary_expression()?
        };
        loop {
            match &self.current {
                Token::Dot => {
                    self.advance()?;
                    let prop = self.parse_dot_member_property()?;
                    callee = Expression::Member(Box::new(callee), prop);
                }
                Token::LeftBracket => {
                    let prop = self.parse_computed_member()?;
                    callee = Expression::Member(Box::new(callee), prop);
                }
                _ => break,
            }
        }
        let args = if self.current == Token::LeftParen {
            self.parse_arguments()?
        } else {
            Vec::new()
        };
        Ok(Expression::New(Box::new(callee), args))
    }

    fn parse_arguments(&mut self) -> Result<Vec<Expression>, ParseError> {
        self.eat(&Token::LeftParen)?;
        self.allow_in(|p| {
            let mut args = Vec::new();
            while p.current != Token::RightParen {
                if p.current == Token::Ellipsis {
                    p.advance()?;
                    let expr = p.parse_assignment_expression()?;
                    args.push(Expression::Spread(Box::new(expr)));
                } else {
                    args.push(p.parse_assignment_expression()?);
                }
                if p.current != Token::RightParen {
                    p.eat(&Token::Comma)?;
                }
            }
            p.advance()?;
            Ok(args)
        })
    }

    /// `=>` is current; `params` are already converted.
    fn parse_arrow_function(&mut self, params: Vec<Pattern>, is_async: bool) -> Result<Expression, ParseError> {
        self.eat(&Token::Arrow)?;
        let saved = self.enter_function(is_async, false, true);
        let body = if self.current == Token::LeftBrace {
            self.parse_function_block().map(FunctionBody::Block)
        } else {
            self.parse_assignment_expression()
                .map(|e| FunctionBody::Expression(Box::new(e)))
        };
        self.leave_function(saved);
        Ok(Expression::ArrowFunction(Rc::new(FunctionNode {
            name: None,
            params,
            body: body?,
            is_arrow: true,
            is_async,
            is_generator: false,
        })))
    }

    fn arrow_follows(&self) -> bool {
        self.current == Token::Arrow && !self.prev_line_terminator
    }

    fn exprs_to_params(&self, exprs: Vec<Expression>) -> Result<Vec<Pattern>, ParseError> {
        exprs
            .into_iter()
            .map(expr_to_pattern)
            .collect::<Result<_, _>>()
            .map_err(|message| self.error(message))
    }

    fn parse_primary_expression(&mut self) -> Result<Expression, ParseError> {
        match &self.current {
            Token::Keyword(Keyword::This) => {
                self.advance()?;
                Ok(Expression::This)
            }
            Token::Keyword(Keyword::Super) => {
                self.advance()?;
                let is_call = self.current == Token::LeftParen;
                let is_property = matches!(self.current, Token::Dot | Token::LeftBracket);
                let allowed = (is_call && self.allow_super_call) || (is_property && self.allow_super_property);
                if !allowed {
                    return Err(self.error("'super' keyword unexpected here"));
                }
                Ok(Expression::Super)
            }
            Token::Keyword(Keyword::Async) => self.parse_async_primary(),
            Token::NullLiteral => {
                self.advance()?;
                Ok(Expression::Literal(Literal::Null))
            }
            Token::BooleanLiteral(b) => {
                let b = *b;
                self.advance()?;
                Ok(Expression::Literal(Literal::Boolean(b)))
            }
            Token::NumericLiteral(n) => {
                let n = *n;
                self.advance()?;
                Ok(Expression::Literal(Literal::Number(n)))
            }
            Token::StringLiteral(s) => {
                let s = s.clone();
                self.advance()?;
                Ok(Expression::Literal(Literal::String(s)))
            }
            Token::BigIntLiteral(digits) => {
                let digits = digits.clone();
                self.advance()?;
                Ok(Expression::Literal(Literal::BigInt(digits)))
            }
            Token::Slash | Token::SlashAssign => {
                // the lexer stopped right after the slash; re-read as a regex
                let prefix = if self.current == Token::SlashAssign { "=" } else { "" };
                let Token::RegExpLiteral { pattern, flags } = self.lexer.lex_regex()? else {
                    return Err(self.unexpected());
                };
                self.advance()?;
                Ok(Expression::Literal(Literal::RegExp(format!("{prefix}{pattern}"), flags)))
            }
            Token::LeftParen => self.parse_parenthesized(),
            Token::LeftBracket => self.parse_array_literal(),
            Token::LeftBrace => self.parse_object_literal(),
            Token::Keyword(Keyword::Function) => self.parse_function_expression(false),
            Token::Keyword(Keyword::Class) => {
                let class = self.parse_class(false)?;
                Ok(Expression::Class(Rc::new(class)))
            }
            Token::NoSubstitutionTemplate(..) | Token::TemplateHead(..) => {
                let template = self.parse_template()?;
                if template.quasis.iter().any(Option::is_none) {
                    return Err(self.error("Invalid escape sequence in template"));
                }
                Ok(Expression::Template(template))
            }
            _ => {
                let Some(name) = self.current_identifier_name() else {
                    return Err(self.unexpected());
                };
                self.advance()?;
                if self.arrow_follows() {
                    return self.parse_arrow_function(vec![Pattern::Identifier(name)], false);
                }
                Ok(Expression::Identifier(name))
            }
        }
    }

    /// `async` may start a function, an arrow, or be a plain identifier.
    fn parse_async_primary(&mut self) -> Result<Expression, ParseError> {
        let (next, line_break) = self.peek()?;
        if line_break {
            self.advance()?;
            return Ok(Expression::Identifier("async".to_string()));
        }
        match next {
            Token::Keyword(Keyword::Function) => {
                self.advance()?;
                self.parse_function_expression(true)
            }
            Token::LeftParen => {
                self.advance()?;
                let args = self.parse_arguments()?;
                if self.arrow_follows() {
                    let params = self.exprs_to_params(args)?;
                    return self.parse_arrow_function(params, true);
                }
                Ok(Expression::Call(
                    Box::new(Expression::Identifier("async".to_string())),
                    args,
                ))
            }
            Token::Identifier(_) => {
                self.advance()?;
                let name = self.expect_identifier()?;
                if !self.arrow_follows() {
                    return Err(self.unexpected());
                }
                self.parse_arrow_function(vec![Pattern::Identifier(name)], true)
            }
            _ => {
                self.advance()?;
                if self.arrow_follows() {
                    return self.parse_arrow_function(vec![Pattern::Identifier("async".to_string())], false);
                }
                Ok(Expression::Identifier("async".to_string()))
            }
        }
    }

    /// A grouping, or the parameter list of an arrow function.
    fn parse_parenthesized(&mut self) -> Result<Expression, ParseError> {
        self.advance()?; // (
        let (mut exprs, trailing_comma, has_rest) = self.allow_in(|p| {
            let mut exprs = Vec::new();
            let mut trailing_comma = false;
            let mut has_rest = false;
            while p.current != Token::RightParen {
                if p.current == Token::Ellipsis {
                    p.advance()?;
                    let target = p.parse_binding_target()?;
                    exprs.push(Expression::Spread(Box::new(pattern_to_expr(target))));
                    has_rest = true;
                    if p.current != Token::RightParen {
                        return Err(p.error("Rest parameter must be last formal parameter"));
                    }
                    break;
                }
                exprs.push(p.parse_assignment_expression()?);
                trailing_comma = false;
                if p.current != Token::RightParen {
                    p.eat(&Token::Comma)?;
                    trailing_comma = true;
                }
            }
            p.advance()?;
            Ok((exprs, trailing_comma, has_rest))
        })?;

        if self.arrow_follows() {
            let params = self.exprs_to_params(exprs)?;
            return self.parse_arrow_function(params, false);
        }
        if exprs.is_empty() || trailing_comma || has_rest {
            return Err(self.unexpected());
        }
        if exprs.len() == 1 {
            return Ok(exprs.remove(0));
        }
        Ok(Expression::Sequence(exprs))
    }

    fn parse_array_literal(&mut self) -> Result<Expression, ParseError> {
        self.advance()?; // [
        self.allow_in(|p| {
            let mut elements = Vec::new();
            while p.current != Token::RightBracket {
                if p.current == Token::Comma {
                    elements.push(None);
                    p.advance()?;
                    continue;
                }
                if p.current == Token::Ellipsis {
                    p.advance()?;
                    let expr = p.parse_assignment_expression()?;
                    elements.push(Some(Expression::Spread(Box::new(expr))));
                } else {
                    elements.push(Some(p.parse_assignment_expression()?));
                }
                if p.current != Token::RightBracket {
                    p.eat(&Token::Comma)?;
                }
            }
            p.advance()?;
            Ok(Expression::Array(elements))
        })
    }

    fn parse_object_literal(&mut self) -> Result<Expression, ParseError> {
        self.advance()?; // {
        let props = self.allow_in(|p| {
            let mut props = Vec::new();
            while p.current != Token::RightBrace {
                props.push(p.parse_object_property()?);
                if p.current != Token::RightBrace {
                    p.eat(&Token::Comma)?;
                }
            }
            p.advance()?;
            Ok(props)
        })?;
        Ok(Expression::Object(props))
    }

    fn parse_object_property(&mut self) -> Result<Property, ParseError> {
        if self.current == Token::Ellipsis {
            self.advance()?;
            let value = self.parse_assignment_expression()?;
            return Ok(Property {
                key: PropertyKey::Identifier(String::new()),
                value,
                kind: PropertyKind::Spread,
                shorthand: false,
            });
        }

        let mut is_async = false;
        if self.current == Token::Keyword(Keyword::Async) && !self.modifier_is_name()? {
            self.advance()?;
            is_async = true;
        }
        let is_generator = if self.current == Token::Star {
            self.advance()?;
            true
        } else {
            false
        };
        let mut kind = PropertyKind::Init;
        if !is_async && !is_generator {
            let accessor = match &self.current {
                Token::Identifier(word) if word == "get" => Some(PropertyKind::Get),
                Token::Identifier(word) if word == "set" => Some(PropertyKind::Set),
                _ => None,
            };
            if let Some(accessor) = accessor {
                if !self.modifier_is_name()? {
                    self.advance()?;
                    kind = accessor;
                }
            }
        }

        let shorthand_name = self.current_identifier_name();
        let key = self.parse_property_name()?;

        if self.current == Token::LeftParen {
            let method = self.parse_method(is_async, is_generator, false)?;
            if kind == PropertyKind::Init {
                kind = PropertyKind::Method;
            }
            return Ok(Property {
                key,
                value: Expression::Function(method),
                kind,
                shorthand: false,
            });
        }
        if kind != PropertyKind::Init || is_async || is_generator {
            return Err(self.unexpected());
        }
        if self.current == Token::Colon {
            self.advance()?;
            let value = self.parse_assignment_expression()?;
            return Ok(Property {
                key,
                value,
                kind,
                shorthand: false,
            });
        }
        let Some(name) = shorthand_name else {
            return Err(self.unexpected());
        };
        if self.current == Token::Assign {
            // only valid as a destructuring target, which is not supported
            return Err(self.error("Invalid shorthand property initializer"));
        }
        Ok(Property {
            key,
            value: Expression::Identifier(name),
            kind,
            shorthand: true,
        })
    }

    /// Template literal starting at `current`. Cooked strings stay `None`
    /// for invalid escapes; only tagged templates accept those.
    fn parse_template(&mut self) -> Result<TemplateLiteral, ParseError> {
        let mut quasis = Vec::new();
        let mut expressions = Vec::new();
        match &self.current {
            Token::NoSubstitutionTemplate(cooked, _) => {
                quasis.push(cooked.clone());
                self.advance()?;
                return Ok(TemplateLiteral { quasis, expressions });
            }
            Token::TemplateHead(cooked, _) => quasis.push(cooked.clone()),
            _ => return Err(self.unexpected()),
        }
        loop {
            self.advance()?;
            expressions.push(self.allow_in(|p| p.parse_expression())?);
            if self.current != Token::RightBrace {
                return Err(self.unexpected());
            }
            match self.lexer.read_template_continuation()? {
                Token::TemplateMiddle(cooked, raw) => {
                    quasis.push(cooked.clone());
                    self.current = Token::TemplateMiddle(cooked, raw);
                }
                Token::TemplateTail(cooked, _) => {
                    quasis.push(cooked);
                    self.advance()?;
                    return Ok(TemplateLiteral { quasis, expressions });
                }
                _ => return Err(self.unexpected()),
            }
        }
    }
}

fn pattern_to_expr(pattern: Pattern) -> Expression {
    match pattern {
        Pattern::Identifier(name) => Expression::Identifier(name),
        Pattern::Assign(target, default) => {
            Expression::Assign(AssignOp::Assign, Box::new(pattern_to_expr(*target)), default)
        }
        Pattern::Rest(inner) => Expression::Spread(Box::new(pattern_to_expr(*inner))),
        Pattern::Array(elements) => {
            Expression::Array(elements.into_iter().map(|e| e.map(pattern_to_expr)).collect())
        }
        Pattern::Object(props) => Expression::Object(
            props
                .into_iter()
                .map(|(key, value)| Property {
                    key,
                    value: pattern_to_expr(value),
                    kind: PropertyKind::Init,
                    shorthand: false,
                })
                .collect(),
        ),
    }
}

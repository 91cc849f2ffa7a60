use super::*;

impl<'a> Parser<'a> {
    pub(super) fn parse_statement_or_declaration(&mut self) -> Result<Statement, ParseError> {
        match &self.current {
            Token::Keyword(Keyword::Function) => self.parse_function_declaration(false),
            Token::Keyword(Keyword::Async) if self.async_function_follows()? => {
                self.advance()?;
                self.parse_function_declaration(true)
            }
            Token::Keyword(Keyword::Class) => {
                let class = self.parse_class(true)?;
                Ok(Statement::ClassDeclaration(Rc::new(class)))
            }
            Token::Keyword(Keyword::Let | Keyword::Const) => {
                let decl = self.parse_variable_statement()?;
                Ok(Statement::Variable(decl))
            }
            Token::Keyword(Keyword::Import | Keyword::Export) => {
                Err(self.error("Cannot use import statement outside a module"))
            }
            _ => self.parse_statement(),
        }
    }

    fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        match &self.current {
            Token::LeftBrace => Ok(Statement::Block(self.parse_block()?)),
            Token::Semicolon => {
                self.advance()?;
                Ok(Statement::Empty)
            }
            Token::Keyword(Keyword::Var) => Ok(Statement::Variable(self.parse_variable_statement()?)),
            Token::Keyword(Keyword::If) => self.parse_if_statement(),
            Token::Keyword(Keyword::While) => self.parse_while_statement(),
            Token::Keyword(Keyword::Do) => self.parse_do_while_statement(),
            Token::Keyword(Keyword::For) => self.parse_for_statement(),
            Token::Keyword(Keyword::Return) => self.parse_return_statement(),
            Token::Keyword(Keyword::Break) => self.parse_break_statement(),
            Token::Keyword(Keyword::Continue) => self.parse_continue_statement(),
            Token::Keyword(Keyword::Throw) => self.parse_throw_statement(),
            Token::Keyword(Keyword::Try) => self.parse_try_statement(),
            Token::Keyword(Keyword::Switch) => self.parse_switch_statement(),
            Token::Keyword(Keyword::With) => {
                self.advance()?;
                self.eat(&Token::LeftParen)?;
                let object = self.allow_in(|p| p.parse_expression())?;
                self.eat(&Token::RightParen)?;
                let body = self.parse_statement()?;
                Ok(Statement::With(object, Box::new(body)))
            }
            Token::Keyword(Keyword::Debugger) => {
                self.advance()?;
                self.eat_semicolon()?;
                Ok(Statement::Debugger)
            }
            Token::Keyword(Keyword::Function | Keyword::Class) => {
                Err(self.error("Declarations are not allowed in a single-statement context"))
            }
            _ => {
                if self.current_identifier_name().is_some() && self.peek()?.0 == Token::Colon {
                    return self.parse_labeled_statement();
                }
                let expr = self.parse_expression()?;
                self.eat_semicolon()?;
                Ok(Statement::Expression(expr))
            }
        }
    }

    fn async_function_follows(&self) -> Result<bool, ParseError> {
        let (next, line_break) = self.peek()?;
        Ok(next == Token::Keyword(Keyword::Function) && !line_break)
    }

    pub(super) fn parse_block(&mut self) -> Result<Vec<Statement>, ParseError> {
        self.eat(&Token::LeftBrace)?;
        let mut body = Vec::new();
        while self.current != Token::RightBrace {
            body.push(self.parse_statement_or_declaration()?);
        }
        self.advance()?;
        Ok(body)
    }

    fn parse_variable_statement(&mut self) -> Result<VariableDeclaration, ParseError> {
        let kind = self.parse_var_kind()?;
        let declarations = self.parse_declarator_list(kind)?;
        self.eat_semicolon()?;
        Ok(VariableDeclaration { kind, declarations })
    }

    fn parse_var_kind(&mut self) -> Result<VarKind, ParseError> {
        let kind = match self.current {
            Token::Keyword(Keyword::Var) => VarKind::Var,
            Token::Keyword(Keyword::Let) => VarKind::Let,
            Token::Keyword(Keyword::Const) => VarKind::Const,
            _ => return Err(self.unexpected()),
        };
        self.advance()?;
        Ok(kind)
    }

    /// Only a `for-in`/`for-of` head may leave a `const` uninitialized.
    fn parse_declarator_list(&mut self, kind: VarKind) -> Result<Vec<VariableDeclarator>, ParseError> {
        let mut declarations = Vec::new();
        loop {
            let pattern = self.parse_binding_target()?;
            if kind != VarKind::Var && matches!(&pattern, Pattern::Identifier(n) if n == "let") {
                return Err(self.error("let is disallowed as a lexically bound name"));
            }
            let init = if self.current == Token::Assign {
                self.advance()?;
                Some(self.parse_assignment_expression()?)
            } else {
                None
            };
            let needs_init = kind == VarKind::Const || !matches!(pattern, Pattern::Identifier(_));
            if init.is_none() && needs_init && !self.for_in_of_follows() {
                return Err(self.error("Missing initializer in declaration"));
            }
            declarations.push(VariableDeclarator { pattern, init });
            if self.current != Token::Comma {
                break;
            }
            self.advance()?;
        }
        Ok(declarations)
    }

    fn for_in_of_follows(&self) -> bool {
        self.no_in && matches!(self.current, Token::Keyword(Keyword::In | Keyword::Of))
    }

    fn parse_if_statement(&mut self) -> Result<Statement, ParseError> {
        self.advance()?;
        let test = self.parse_paren_expression()?;
        let consequent = Box::new(self.parse_statement()?);
        let alternate = if self.current == Token::Keyword(Keyword::Else) {
            self.advance()?;
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Ok(Statement::If(IfStatement {
            test,
            consequent,
            alternate,
        }))
    }

    fn parse_paren_expression(&mut self) -> Result<Expression, ParseError> {
        self.eat(&Token::LeftParen)?;
        let expr = self.allow_in(|p| p.parse_expression())?;
        self.eat(&Token::RightParen)?;
        Ok(expr)
    }

    fn parse_loop_body(&mut self) -> Result<Box<Statement>, ParseError> {
        self.in_iteration += 1;
        let body = self.parse_statement();
        self.in_iteration -= 1;
        Ok(Box::new(body?))
    }

    fn parse_while_statement(&mut self) -> Result<Statement, ParseError> {
        self.advance()?;
        let test = self.parse_paren_expression()?;
        let body = self.parse_loop_body()?;
        Ok(Statement::While(WhileStatement { test, body }))
    }

    fn parse_do_while_statement(&mut self) -> Result<Statement, ParseError> {
        self.advance()?;
        let body = self.parse_loop_body()?;
        self.eat(&Token::Keyword(Keyword::While))?;
        let test = self.parse_paren_expression()?;
        // `do {} while (x)` needs no semicolon even on the same line
        if self.current == Token::Semicolon {
            self.advance()?;
        }
        Ok(Statement::DoWhile(DoWhileStatement { body, test }))
    }

    fn parse_for_statement(&mut self) -> Result<Statement, ParseError> {
        self.advance()?;
        if self.current == Token::Keyword(Keyword::Await) {
            return Err(self.error("for await is not supported"));
        }
        self.eat(&Token::LeftParen)?;

        let init = match &self.current {
            Token::Semicolon => None,
            Token::Keyword(Keyword::Var | Keyword::Let | Keyword::Const) => {
                let kind = self.parse_var_kind()?;
                self.no_in = true;
                let declarations = self.parse_declarator_list(kind);
                self.no_in = false;
                let mut declarations = declarations?;
                if declarations.len() == 1
                    && declarations[0].init.is_none()
                    && matches!(self.current, Token::Keyword(Keyword::In | Keyword::Of))
                {
                    let Some(declarator) = declarations.pop() else {
                        return Err(self.unexpected());
                    };
                    return self.parse_for_in_of(ForHead::Declaration(kind, declarator.pattern));
                }
                Some(ForInit::Variable(VariableDeclaration { kind, declarations }))
            }
            _ => {
                self.no_in = true;
                let expr = self.parse_expression();
                self.no_in = false;
                let expr = expr?;
                if matches!(self.current, Token::Keyword(Keyword::In | Keyword::Of)) {
                    if !matches!(expr, Expression::Identifier(_) | Expression::Member(..)) {
                        return Err(self.error("Invalid left-hand side in for-loop"));
                    }
                    return self.parse_for_in_of(ForHead::Target(expr));
                }
                Some(ForInit::Expression(expr))
            }
        };

        self.eat(&Token::Semicolon)?;
        let test = if self.current == Token::Semicolon {
            None
        } else {
            Some(self.allow_in(|p| p.parse_expression())?)
        };
        self.eat(&Token::Semicolon)?;
        let update = if self.current == Token::RightParen {
            None
        } else {
            Some(self.allow_in(|p| p.parse_expression())?)
        };
        self.eat(&Token::RightParen)?;
        let body = self.parse_loop_body()?;
        Ok(Statement::For(ForStatement {
            init,
            test,
            update,
            body,
        }))
    }

    fn parse_for_in_of(&mut self, left: ForHead) -> Result<Statement, ParseError> {
        let is_of = self.current == Token::Keyword(Keyword::Of);
        self.advance()?;
        let right = if is_of {
            self.allow_in(|p| p.parse_assignment_expression())?
        } else {
            self.allow_in(|p| p.parse_expression())?
        };
        self.eat(&Token::RightParen)?;
        let body = self.parse_loop_body()?;
        Ok(if is_of {
            Statement::ForOf(ForOfStatement { left, right, body })
        } else {
            Statement::ForIn(ForInStatement { left, right, body })
        })
    }

    fn parse_return_statement(&mut self) -> Result<Statement, ParseError> {
        if !self.in_function && !self.options.return_outside_function {
            return Err(self.error("Illegal return statement"));
        }
        self.advance()?;
        let argument = if self.at_statement_end() {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.eat_semicolon()?;
        Ok(Statement::Return(argument))
    }

    /// A restricted production stops at a line break.
    fn at_statement_end(&self) -> bool {
        self.prev_line_terminator
            || matches!(self.current, Token::Semicolon | Token::RightBrace | Token::Eof)
    }

    fn parse_jump_label(&mut self) -> Result<Option<String>, ParseError> {
        if self.at_statement_end() {
            return Ok(None);
        }
        match self.current_identifier_name() {
            Some(name) => {
                self.advance()?;
                Ok(Some(name))
            }
            None => Ok(None),
        }
    }

    fn parse_break_statement(&mut self) -> Result<Statement, ParseError> {
        self.advance()?;
        let label = self.parse_jump_label()?;
        match &label {
            Some(name) if !self.labels.iter().any(|(l, _)| l == name) => {
                return Err(self.error(format!("Undefined label '{name}'")));
            }
            None if self.in_iteration == 0 && self.in_switch == 0 => {
                return Err(self.error("Illegal break statement"));
            }
            _ => {}
        }
        self.eat_semicolon()?;
        Ok(Statement::Break(label))
    }

    fn parse_continue_statement(&mut self) -> Result<Statement, ParseError> {
        self.advance()?;
        if self.in_iteration == 0 {
            return Err(self.error("Illegal continue statement: no surrounding iteration statement"));
        }
        let label = self.parse_jump_label()?;
        if let Some(name) = &label {
            match self.labels.iter().find(|(l, _)| l == name) {
                None => return Err(self.error(format!("Undefined label '{name}'"))),
                Some((_, false)) => {
                    return Err(self.error(format!(
                        "Illegal continue statement: '{name}' does not denote an iteration statement"
                    )));
                }
                Some(_) => {}
            }
        }
        self.eat_semicolon()?;
        Ok(Statement::Continue(label))
    }

    fn parse_throw_statement(&mut self) -> Result<Statement, ParseError> {
        self.advance()?;
        if self.prev_line_terminator {
            return Err(self.error("Illegal newline after throw"));
        }
        let argument = self.parse_expression()?;
        self.eat_semicolon()?;
        Ok(Statement::Throw(argument))
    }

    fn parse_try_statement(&mut self) -> Result<Statement, ParseError> {
        self.advance()?;
        let block = self.parse_block()?;
        let handler = if self.current == Token::Keyword(Keyword::Catch) {
            self.advance()?;
            let param = if self.current == Token::LeftParen {
                self.advance()?;
                let param = self.parse_binding_target()?;
                self.eat(&Token::RightParen)?;
                Some(param)
            } else {
                None
            };
            let body = self.parse_block()?;
            Some(CatchClause { param, body })
        } else {
            None
        };
        let finalizer = if self.current == Token::Keyword(Keyword::Finally) {
            self.advance()?;
            Some(self.parse_block()?)
        } else {
            None
        };
        if handler.is_none() && finalizer.is_none() {
            return Err(self.error("Missing catch or finally after try"));
        }
        Ok(Statement::Try(TryStatement {
            block,
            handler,
            finalizer,
        }))
    }

    fn parse_switch_statement(&mut self) -> Result<Statement, ParseError> {
        self.advance()?;
        let discriminant = self.parse_paren_expression()?;
        self.eat(&Token::LeftBrace)?;
        self.in_switch += 1;
        let cases = self.parse_switch_cases();
        self.in_switch -= 1;
        Ok(Statement::Switch(SwitchStatement {
            discriminant,
            cases: cases?,
        }))
    }

    fn parse_switch_cases(&mut self) -> Result<Vec<SwitchCase>, ParseError> {
        let mut cases = Vec::new();
        let mut seen_default = false;
        while self.current != Token::RightBrace {
            let test = match self.current {
                Token::Keyword(Keyword::Case) => {
                    self.advance()?;
                    Some(self.allow_in(|p| p.parse_expression())?)
                }
                Token::Keyword(Keyword::Default) => {
                    if seen_default {
                        return Err(self.error("More than one default clause in switch statement"));
                    }
                    seen_default = true;
                    self.advance()?;
                    None
                }
                _ => return Err(self.unexpected()),
            };
            self.eat(&Token::Colon)?;
            let mut consequent = Vec::new();
            while !matches!(
                self.current,
                Token::Keyword(Keyword::Case | Keyword::Default) | Token::RightBrace
            ) {
                consequent.push(self.parse_statement_or_declaration()?);
            }
            cases.push(SwitchCase { test, consequent });
        }
        self.advance()?;
        Ok(cases)
    }

    fn parse_labeled_statement(&mut self) -> Result<Statement, ParseError> {
        let label = self.expect_identifier()?;
        self.eat(&Token::Colon)?;
        if self.labels.iter().any(|(l, _)| *l == label) {
            return Err(self.error(format!("Label '{label}' has already been declared")));
        }
        let is_loop = matches!(
            self.current,
            Token::Keyword(Keyword::For | Keyword::While | Keyword::Do)
        );
        self.labels.push((label.clone(), is_loop));
        let body = if self.current == Token::Keyword(Keyword::Function) {
            self.parse_function_declaration(false)
        } else {
            self.parse_statement()
        };
        self.labels.pop();
        Ok(Statement::Labeled(label, Box::new(body?)))
    }
}

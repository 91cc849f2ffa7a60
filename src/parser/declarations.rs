use super::*;

impl<'a> Parser<'a> {
    pub(super) fn parse_binding_target(&mut self) -> Result<Pattern, ParseError> {
        if let Some(name) = self.current_identifier_name() {
            self.advance()?;
            return Ok(Pattern::Identifier(name));
        }
        match &self.current {
            Token::LeftBracket => self.parse_array_pattern(),
            Token::LeftBrace => self.parse_object_pattern(),
            _ => Err(self.unexpected()),
        }
    }

    fn parse_binding_element(&mut self) -> Result<Pattern, ParseError> {
        let target = self.parse_binding_target()?;
        if self.current == Token::Assign {
            self.advance()?;
            let default = self.allow_in(|p| p.parse_assignment_expression())?;
            return Ok(Pattern::Assign(Box::new(target), Box::new(default)));
        }
        Ok(target)
    }

    fn parse_array_pattern(&mut self) -> Result<Pattern, ParseError> {
        self.eat(&Token::LeftBracket)?;
        let mut elements = Vec::new();
        while self.current != Token::RightBracket {
            if self.current == Token::Comma {
                elements.push(None);
                self.advance()?;
                continue;
            }
            if self.current == Token::Ellipsis {
                self.advance()?;
                let rest = self.parse_binding_target()?;
                elements.push(Some(Pattern::Rest(Box::new(rest))));
                break;
            }
            elements.push(Some(self.parse_binding_element()?));
            if self.current != Token::RightBracket {
                self.eat(&Token::Comma)?;
            }
        }
        self.eat(&Token::RightBracket)?;
        Ok(Pattern::Array(elements))
    }

    fn parse_object_pattern(&mut self) -> Result<Pattern, ParseError> {
        self.eat(&Token::LeftBrace)?;
        let mut props = Vec::new();
        while self.current != Token::RightBrace {
            if self.current == Token::Ellipsis {
                return Err(self.error("Object rest patterns are not supported"));
            }
            let shorthand = self.current_identifier_name();
            let key = self.parse_property_name()?;
            let pattern = if self.current == Token::Colon {
                self.advance()?;
                self.parse_binding_element()?
            } else {
                let Some(name) = shorthand else {
                    return Err(self.unexpected());
                };
                let target = Pattern::Identifier(name);
                if self.current == Token::Assign {
                    self.advance()?;
                    let default = self.allow_in(|p| p.parse_assignment_expression())?;
                    Pattern::Assign(Box::new(target), Box::new(default))
                } else {
                    target
                }
            };
            props.push((key, pattern));
            if self.current != Token::RightBrace {
                self.eat(&Token::Comma)?;
            }
        }
        self.eat(&Token::RightBrace)?;
        Ok(Pattern::Object(props))
    }

    pub(super) fn parse_property_name(&mut self) -> Result<PropertyKey, ParseError> {
        let key = match &self.current {
            Token::LeftBracket => {
                self.advance()?;
                let expr = self.allow_in(|p| p.parse_assignment_expression())?;
                self.eat(&Token::RightBracket)?;
                return Ok(PropertyKey::Computed(Box::new(expr)));
            }
            Token::Identifier(name) => PropertyKey::Identifier(name.clone()),
            Token::Keyword(kw) => PropertyKey::Identifier(kw.as_str().to_string()),
            Token::BooleanLiteral(b) => PropertyKey::Identifier(b.to_string()),
            Token::NullLiteral => PropertyKey::Identifier("null".to_string()),
            Token::StringLiteral(s) => PropertyKey::String(s.clone()),
            Token::NumericLiteral(n) => PropertyKey::Number(*n),
            Token::BigIntLiteral(digits) => PropertyKey::String(digits.clone()),
            _ => return Err(self.unexpected()),
        };
        self.advance()?;
        Ok(key)
    }

    pub(super) fn parse_formal_parameters(&mut self) -> Result<Vec<Pattern>, ParseError> {
        self.eat(&Token::LeftParen)?;
        let mut params = Vec::new();
        while self.current != Token::RightParen {
            if self.current == Token::Ellipsis {
                self.advance()?;
                let rest = self.parse_binding_target()?;
                params.push(Pattern::Rest(Box::new(rest)));
                if self.current != Token::RightParen {
                    return Err(self.error("Rest parameter must be last formal parameter"));
                }
                break;
            }
            params.push(self.parse_binding_element()?);
            if self.current != Token::RightParen {
                self.eat(&Token::Comma)?;
            }
        }
        self.eat(&Token::RightParen)?;
        Ok(params)
    }

    pub(super) fn parse_function_block(&mut self) -> Result<Vec<Statement>, ParseError> {
        self.allow_in(|p| p.parse_block())
    }

    /// Parameters and body of a non-arrow function, after its name.
    fn parse_function_rest(
        &mut self,
        name: Option<String>,
        is_async: bool,
        is_generator: bool,
        super_property: bool,
        super_call: bool,
    ) -> Result<Rc<FunctionNode>, ParseError> {
        let saved = self.enter_function(is_async, is_generator, false);
        self.allow_super_property = super_property;
        self.allow_super_call = super_call;
        let parsed = self
            .parse_formal_parameters()
            .and_then(|params| Ok((params, self.parse_function_block()?)));
        self.leave_function(saved);
        let (params, body) = parsed?;
        Ok(Rc::new(FunctionNode {
            name,
            params,
            body: FunctionBody::Block(body),
            is_arrow: false,
            is_async,
            is_generator,
        }))
    }

    /// `function` keyword is current; a preceding `async` is already consumed.
    pub(super) fn parse_function_declaration(&mut self, is_async: bool) -> Result<Statement, ParseError> {
        self.eat(&Token::Keyword(Keyword::Function))?;
        let is_generator = self.eat_star()?;
        let name = self.expect_identifier()?;
        let node = self.parse_function_rest(Some(name), is_async, is_generator, false, false)?;
        Ok(Statement::FunctionDeclaration(node))
    }

    pub(super) fn parse_function_expression(&mut self, is_async: bool) -> Result<Expression, ParseError> {
        self.eat(&Token::Keyword(Keyword::Function))?;
        let is_generator = self.eat_star()?;
        let name = match self.current_identifier_name() {
            Some(name) => {
                self.advance()?;
                Some(name)
            }
            None => None,
        };
        let node = self.parse_function_rest(name, is_async, is_generator, false, false)?;
        Ok(Expression::Function(node))
    }

    fn eat_star(&mut self) -> Result<bool, ParseError> {
        if self.current == Token::Star {
            self.advance()?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Object literal and class methods; the name comes from the key.
    pub(super) fn parse_method(
        &mut self,
        is_async: bool,
        is_generator: bool,
        super_call: bool,
    ) -> Result<Rc<FunctionNode>, ParseError> {
        self.parse_function_rest(None, is_async, is_generator, true, super_call)
    }

    /// True when the token after `current` ends a member name, so that
    /// `static`, `async`, `get` and `set` are names rather than modifiers.
    pub(super) fn modifier_is_name(&self) -> Result<bool, ParseError> {
        let (next, _) = self.peek()?;
        Ok(matches!(
            next,
            Token::LeftParen
                | Token::Assign
                | Token::Semicolon
                | Token::RightBrace
                | Token::Comma
                | Token::Colon
                | Token::Eof
        ))
    }

    pub(super) fn parse_class(&mut self, is_declaration: bool) -> Result<ClassNode, ParseError> {
        self.eat(&Token::Keyword(Keyword::Class))?;
        let name = match self.current_identifier_name() {
            Some(name) => {
                self.advance()?;
                Some(name)
            }
            None if is_declaration => return Err(self.unexpected()),
            None => None,
        };
        let super_class = if self.current == Token::Keyword(Keyword::Extends) {
            self.advance()?;
            Some(Box::new(self.parse_left_hand_side_expression()?))
        } else {
            None
        };
        let derived = super_class.is_some();

        self.eat(&Token::LeftBrace)?;
        let mut body = Vec::new();
        let mut has_constructor = false;
        while self.current != Token::RightBrace {
            if self.current == Token::Semicolon {
                self.advance()?;
                continue;
            }
            let element = self.parse_class_element(derived)?;
            if let ClassElement::Method(ClassMethod {
                kind: ClassMethodKind::Constructor,
                ..
            }) = element
            {
                if has_constructor {
                    return Err(self.error("A class may only have one constructor"));
                }
                has_constructor = true;
            }
            body.push(element);
        }
        self.advance()?;
        Ok(ClassNode {
            name,
            super_class,
            body,
        })
    }

    fn parse_class_element(&mut self, derived: bool) -> Result<ClassElement, ParseError> {
        let mut is_static = false;
        if self.current == Token::Keyword(Keyword::Static) && !self.modifier_is_name()? {
            self.advance()?;
            is_static = true;
            if self.current == Token::LeftBrace {
                return self.parse_static_block();
            }
        }

        let mut is_async = false;
        if self.current == Token::Keyword(Keyword::Async) && !self.modifier_is_name()? {
            let (_, line_break) = self.peek()?;
            if !line_break {
                self.advance()?;
                is_async = true;
            }
        }
        let is_generator = self.eat_star()?;

        let mut kind = ClassMethodKind::Method;
        if !is_async && !is_generator {
            if let Token::Identifier(word) = &self.current {
                let accessor = match word.as_str() {
                    "get" => Some(ClassMethodKind::Get),
                    "set" => Some(ClassMethodKind::Set),
                    _ => None,
                };
                if let Some(accessor) = accessor {
                    if !self.modifier_is_name()? {
                        self.advance()?;
                        kind = accessor;
                    }
                }
            }
        }

        let key = self.parse_property_name()?;
        let named_constructor = matches!(
            &key,
            PropertyKey::Identifier(n) | PropertyKey::String(n) if n == "constructor"
        );

        if self.current == Token::LeftParen {
            let is_constructor = named_constructor && !is_static;
            if is_constructor {
                if kind != ClassMethodKind::Method {
                    return Err(self.error("Class constructor may not be an accessor"));
                }
                if is_async || is_generator {
                    return Err(self.error("Class constructor may not be an async method or generator"));
                }
                kind = ClassMethodKind::Constructor;
            }
            let value = self.parse_method(is_async, is_generator, is_constructor && derived)?;
            return Ok(ClassElement::Method(ClassMethod {
                key,
                kind,
                value,
                is_static,
            }));
        }

        if kind != ClassMethodKind::Method || is_async || is_generator {
            return Err(self.unexpected());
        }
        if named_constructor {
            return Err(self.error("Classes may not have a field named 'constructor'"));
        }
        let value = if self.current == Token::Assign {
            self.advance()?;
            Some(Rc::new(self.parse_field_initializer()?))
        } else {
            None
        };
        self.eat_semicolon()?;
        Ok(ClassElement::Field(ClassField {
            key,
            value,
            is_static,
        }))
    }

    /// Field initializers behave like method bodies: `this` and `super.x`
    /// are available, `await` and `arguments` are not.
    fn parse_field_initializer(&mut self) -> Result<Expression, ParseError> {
        let saved = self.enter_function(false, false, false);
        self.allow_super_property = true;
        let expr = self.allow_in(|p| p.parse_assignment_expression());
        self.leave_function(saved);
        expr
    }

    fn parse_static_block(&mut self) -> Result<ClassElement, ParseError> {
        let saved = self.enter_function(false, false, false);
        self.allow_super_property = true;
        let body = self.parse_function_block();
        self.leave_function(saved);
        Ok(ClassElement::StaticBlock(body?))
    }
}

use super::*;
use class::MethodKind;

/// Resolved assignment target.
pub(crate) enum Reference {
    Binding(String),
    Property(JsValue, String),
    SuperProperty(String),
}

impl Interpreter {
    pub(crate) fn evaluate(&mut self, expr: &Expression, env: &EnvRef) -> EvalResult {
        match expr {
            Expression::Literal(lit) => self.eval_literal(lit),
            Expression::Identifier(name) => self.lookup_identifier(name, env),
            Expression::This => self.this_value(env),
            Expression::Super => Err(Error::MalformedNode {
                expected: "super call or super property",
                found: expr.kind_name().to_string(),
            }
            .into()),
            Expression::Array(elements) => self.eval_array_literal(elements, env),
            Expression::Object(props) => self.eval_object_literal(props, env),
            Expression::Function(node) => Ok(JsValue::Object(self.make_function_expression(node, env, "")?)),
            Expression::ArrowFunction(node) => Ok(JsValue::Object(self.make_function(node, env, "", None)?)),
            Expression::Class(node) => Ok(JsValue::Object(self.make_class(node, env, "")?)),
            Expression::Unary(op, operand) => {
                let value = self.evaluate(operand, env)?;
                self.eval_unary(*op, &value)
            }
            Expression::Binary(op, left, right) => {
                let left = self.evaluate(left, env)?;
                let right = self.evaluate(right, env)?;
                self.binary_operation(*op, &left, &right)
            }
            Expression::Logical(op, left, right) => {
                let left = self.evaluate(left, env)?;
                let short_circuit = match op {
                    LogicalOp::And => !to_boolean(&left),
                    LogicalOp::Or => to_boolean(&left),
                    LogicalOp::NullishCoalescing => !left.is_nullish(),
                };
                if short_circuit {
                    return Ok(left);
                }
                self.evaluate(right, env)
            }
            Expression::Update(op, prefix, target) => self.eval_update(*op, *prefix, target, env),
            Expression::Assign(op, target, value) => self.eval_assignment(*op, target, value, env),
            Expression::Conditional(test, consequent, alternate) => {
                let test = self.evaluate(test, env)?;
                if to_boolean(&test) {
                    self.evaluate(consequent, env)
                } else {
                    self.evaluate(alternate, env)
                }
            }
            Expression::Call(callee, args) => self.eval_call(callee, args, env),
            Expression::New(callee, args) => {
                let constructor = self.evaluate(callee, env)?;
                let args = self.evaluate_arguments(args, env)?;
                if !constructor.as_object().is_some_and(JsObject::is_constructable) {
                    let name = describe_expression(callee);
                    return Err(self.type_error(format!("{name} is not a constructor")));
                }
                self.construct(&constructor, &args, None)
            }
            Expression::Member(object, property) => {
                if let Expression::Super = object.as_ref() {
                    let key = self.member_key(property, env)?;
                    return self.get_super_property(&key, env);
                }
                let base = self.evaluate(object, env)?;
                let key = self.member_key(property, env)?;
                self.get(&base, &key)
            }
            Expression::Spread(_) => Err(Error::MalformedNode {
                expected: "expression",
                found: expr.kind_name().to_string(),
            }
            .into()),
            Expression::Template(template) => self.eval_template(template, env),
            Expression::Typeof(operand) => {
                if let Expression::Identifier(name) = operand.as_ref()
                    && Environment::lookup(env, name).is_none()
                {
                    return Ok(JsValue::from("undefined"));
                }
                let value = self.evaluate(operand, env)?;
                Ok(JsValue::from(typeof_val(&value)))
            }
            Expression::Void(operand) => {
                self.evaluate(operand, env)?;
                Ok(JsValue::Undefined)
            }
            Expression::Delete(operand) => self.eval_delete(operand, env),
            Expression::Await(operand) => self.eval_await(operand, env),
            Expression::Sequence(exprs) => {
                let mut result = JsValue::Undefined;
                for e in exprs {
                    result = self.evaluate(e, env)?;
                }
                Ok(result)
            }
            Expression::OptionalChain(..)
            | Expression::TaggedTemplate(..)
            | Expression::Yield(..)
            | Expression::NewTarget => Err(Error::UnsupportedNodeKind(expr.kind_name()).into()),
        }
    }

    /// Evaluates `expr`, naming it `name` when it is an anonymous function
    /// or class literal.
    pub(crate) fn evaluate_named(&mut self, expr: &Expression, env: &EnvRef, name: &str) -> EvalResult {
        match expr {
            Expression::Function(node) if node.name.is_none() => {
                Ok(JsValue::Object(self.make_function(node, env, name, None)?))
            }
            Expression::ArrowFunction(node) => Ok(JsValue::Object(self.make_function(node, env, name, None)?)),
            Expression::Class(node) if node.name.is_none() => Ok(JsValue::Object(self.make_class(node, env, name)?)),
            _ => self.evaluate(expr, env),
        }
    }

    fn eval_literal(&mut self, lit: &Literal) -> EvalResult {
        Ok(match lit {
            Literal::Null => JsValue::Null,
            Literal::Boolean(b) => JsValue::Boolean(*b),
            Literal::Number(n) => JsValue::Number(*n),
            Literal::String(s) => JsValue::from(s.as_str()),
            Literal::BigInt(digits) => match bigint_ops::parse(digits) {
                Some(value) => JsValue::bigint(value),
                None => {
                    return Err(Error::MalformedNode {
                        expected: "BigInt literal",
                        found: digits.clone(),
                    }
                    .into());
                }
            },
            Literal::RegExp(..) => return Err(Error::UnsupportedNodeKind("RegExpLiteral").into()),
        })
    }

    fn lookup_identifier(&mut self, name: &str, env: &EnvRef) -> EvalResult {
        match Environment::lookup(env, name) {
            Some(value) => Ok(value),
            None => Err(self.reference_error(format!("{name} is not defined"))),
        }
    }

    pub(crate) fn eval_property_key(&mut self, key: &PropertyKey, env: &EnvRef) -> EvalResult<String> {
        match key {
            PropertyKey::Identifier(name) | PropertyKey::String(name) => Ok(name.clone()),
            PropertyKey::Number(n) => Ok(property_key_of_number(*n)),
            PropertyKey::Computed(expr) => {
                let value = self.evaluate(expr, env)?;
                self.to_property_key(&value)
            }
        }
    }

    fn member_key(&mut self, property: &MemberProperty, env: &EnvRef) -> EvalResult<String> {
        match property {
            MemberProperty::Dot(name) => Ok(name.clone()),
            MemberProperty::Computed(expr) => {
                let value = self.evaluate(expr, env)?;
                self.to_property_key(&value)
            }
        }
    }

    fn eval_array_literal(&mut self, elements: &[Option<Expression>], env: &EnvRef) -> EvalResult {
        let mut values = Vec::with_capacity(elements.len());
        for element in elements {
            match element {
                None => values.push(JsValue::Undefined),
                Some(Expression::Spread(inner)) => {
                    let iterable = self.evaluate(inner, env)?;
                    values.extend(self.iterate_to_vec(&iterable)?);
                }
                Some(expr) => values.push(self.evaluate(expr, env)?),
            }
        }
        Ok(self.create_array(values))
    }

    fn eval_object_literal(&mut self, props: &[Property], env: &EnvRef) -> EvalResult {
        let obj = self.create_object();
        for prop in props {
            match prop.kind {
                PropertyKind::Spread => {
                    let source = self.evaluate(&prop.value, env)?;
                    self.copy_data_properties(&obj, &source)?;
                }
                PropertyKind::Init => {
                    let key = self.eval_property_key(&prop.key, env)?;
                    let value = self.evaluate_named(&prop.value, env, &key)?;
                    let literal_proto_key = key == "__proto__"
                        && !prop.shorthand
                        && !matches!(prop.key, PropertyKey::Computed(_));
                    if literal_proto_key {
                        match value {
                            JsValue::Object(proto) => obj.borrow_mut().prototype = Some(proto),
                            JsValue::Null => obj.borrow_mut().prototype = None,
                            _ => {}
                        }
                    } else {
                        obj.borrow_mut().insert_value(key, value);
                    }
                }
                PropertyKind::Method | PropertyKind::Get | PropertyKind::Set => {
                    let key = self.eval_property_key(&prop.key, env)?;
                    let Expression::Function(node) = &prop.value else {
                        return Err(Error::MalformedNode {
                            expected: "FunctionExpression",
                            found: prop.value.kind_name().to_string(),
                        }
                        .into());
                    };
                    let kind = match prop.kind {
                        PropertyKind::Get => MethodKind::Get,
                        PropertyKind::Set => MethodKind::Set,
                        _ => MethodKind::Method,
                    };
                    self.define_method(&obj, key, kind, node, env, true)?;
                }
            }
        }
        Ok(JsValue::Object(obj))
    }

    /// Own enumerable properties of `source` become data properties of `target`.
    pub(crate) fn copy_data_properties(&mut self, target: &JsObject, source: &JsValue) -> EvalResult<()> {
        match source {
            JsValue::Object(src) => {
                let keys = src.borrow().own_keys(true);
                for key in keys {
                    let value = self.get_property(src, &key, source)?;
                    target.borrow_mut().insert_value(key, value);
                }
            }
            JsValue::String(s) => {
                for i in 0..s.len() {
                    let ch = JsValue::String(s.slice_utf16(i, i + 1));
                    target.borrow_mut().insert_value(i.to_string(), ch);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn eval_template(&mut self, template: &TemplateLiteral, env: &EnvRef) -> EvalResult {
        let mut out = String::new();
        for (i, quasi) in template.quasis.iter().enumerate() {
            let Some(text) = quasi else {
                return Err(Error::MalformedNode {
                    expected: "cooked template string",
                    found: "invalid escape".to_string(),
                }
                .into());
            };
            out.push_str(text);
            if let Some(expr) = template.expressions.get(i) {
                let value = self.evaluate(expr, env)?;
                out.push_str(&self.to_rust_string(&value)?);
            }
        }
        Ok(JsValue::from(out))
    }

    fn eval_unary(&mut self, op: UnaryOp, value: &JsValue) -> EvalResult {
        match op {
            UnaryOp::Not => Ok(JsValue::Boolean(!to_boolean(value))),
            UnaryOp::Plus => {
                let primitive = self.to_primitive(value, PreferredType::Number)?;
                if primitive.is_bigint() {
                    return Err(self.type_error("Cannot convert a BigInt value to a number"));
                }
                Ok(JsValue::Number(to_number(&primitive)))
            }
            UnaryOp::Minus => match self.to_numeric(value)? {
                JsValue::BigInt(b) => Ok(JsValue::bigint(-b.value)),
                n => Ok(JsValue::Number(number_ops::unary_minus(to_number(&n)))),
            },
            UnaryOp::BitNot => match self.to_numeric(value)? {
                JsValue::BigInt(b) => Ok(JsValue::bigint(bigint_ops::bitwise_not(&b.value))),
                n => Ok(JsValue::Number(number_ops::bitwise_not(to_number(&n)))),
            },
        }
    }

    fn eval_delete(&mut self, operand: &Expression, env: &EnvRef) -> EvalResult {
        match operand {
            Expression::Member(object, _) if matches!(object.as_ref(), Expression::Super) => {
                Err(self.reference_error("Unsupported reference to 'super'"))
            }
            Expression::Member(object, property) => {
                let base = self.evaluate(object, env)?;
                let key = self.member_key(property, env)?;
                match &base {
                    JsValue::Object(obj) => Ok(JsValue::Boolean(obj.borrow_mut().remove_property(&key))),
                    JsValue::Undefined | JsValue::Null => Err(self.type_error(format!(
                        "cannot delete property \"{key}\" of {base}"
                    ))),
                    _ => Ok(JsValue::Boolean(true)),
                }
            }
            Expression::Identifier(_) => Ok(JsValue::Boolean(true)),
            other => {
                self.evaluate(other, env)?;
                Ok(JsValue::Boolean(true))
            }
        }
    }

    pub(crate) fn binary_operation(&mut self, op: BinaryOp, left: &JsValue, right: &JsValue) -> EvalResult {
        match op {
            BinaryOp::Add => {
                let left = self.to_primitive(left, PreferredType::Default)?;
                let right = self.to_primitive(right, PreferredType::Default)?;
                if left.is_string() || right.is_string() {
                    let l = self.to_string(&left)?;
                    let r = self.to_string(&right)?;
                    return Ok(JsValue::String(l.concat(&r)));
                }
                let left = self.to_numeric(&left)?;
                let right = self.to_numeric(&right)?;
                self.numeric_operation(op, left, right)
            }
            BinaryOp::Sub
            | BinaryOp::Mul
            | BinaryOp::Div
            | BinaryOp::Mod
            | BinaryOp::Exp
            | BinaryOp::LShift
            | BinaryOp::RShift
            | BinaryOp::URShift
            | BinaryOp::BitAnd
            | BinaryOp::BitOr
            | BinaryOp::BitXor => {
                let left = self.to_numeric(left)?;
                let right = self.to_numeric(right)?;
                self.numeric_operation(op, left, right)
            }
            BinaryOp::Eq => Ok(JsValue::Boolean(self.loose_equals(left, right)?)),
            BinaryOp::NotEq => Ok(JsValue::Boolean(!self.loose_equals(left, right)?)),
            BinaryOp::StrictEq => Ok(JsValue::Boolean(strict_equality(left, right))),
            BinaryOp::StrictNotEq => Ok(JsValue::Boolean(!strict_equality(left, right))),
            BinaryOp::Lt => Ok(JsValue::Boolean(self.less_than(left, right, true)? == Some(true))),
            BinaryOp::Gt => Ok(JsValue::Boolean(self.less_than(right, left, false)? == Some(true))),
            BinaryOp::LtEq => Ok(JsValue::Boolean(self.less_than(right, left, false)? == Some(false))),
            BinaryOp::GtEq => Ok(JsValue::Boolean(self.less_than(left, right, true)? == Some(false))),
            BinaryOp::In => {
                let JsValue::Object(obj) = right else {
                    let key = self.to_rust_string(left)?;
                    return Err(self.type_error(format!(
                        "Cannot use 'in' operator to search for '{key}' in {}",
                        inspect::inspect_value(right, true)
                    )));
                };
                let key = self.to_property_key(left)?;
                Ok(JsValue::Boolean(obj.borrow().has_property(&key)))
            }
            BinaryOp::Instanceof => Ok(JsValue::Boolean(self.instance_of(left, right)?)),
        }
    }

    /// `x < y` with `left_first` controlling conversion order.
    fn less_than(&mut self, x: &JsValue, y: &JsValue, left_first: bool) -> EvalResult<Option<bool>> {
        let (px, py) = if left_first {
            let px = self.to_primitive(x, PreferredType::Number)?;
            (px, self.to_primitive(y, PreferredType::Number)?)
        } else {
            let py = self.to_primitive(y, PreferredType::Number)?;
            (self.to_primitive(x, PreferredType::Number)?, py)
        };
        Ok(primitive_less_than(&px, &py))
    }

    fn numeric_operation(&mut self, op: BinaryOp, left: JsValue, right: JsValue) -> EvalResult {
        match (&left, &right) {
            (JsValue::BigInt(a), JsValue::BigInt(b)) => self.bigint_operation(op, &a.value, &b.value),
            (JsValue::BigInt(_), _) | (_, JsValue::BigInt(_)) => {
                Err(self.type_error("Cannot mix BigInt and other types, use explicit conversions"))
            }
            _ => {
                let (x, y) = (to_number(&left), to_number(&right));
                let n = match op {
                    BinaryOp::Add => x + y,
                    BinaryOp::Sub => x - y,
                    BinaryOp::Mul => x * y,
                    BinaryOp::Div => x / y,
                    BinaryOp::Mod => number_ops::remainder(x, y),
                    BinaryOp::Exp => number_ops::exponentiate(x, y),
                    BinaryOp::LShift => number_ops::left_shift(x, y),
                    BinaryOp::RShift => number_ops::signed_right_shift(x, y),
                    BinaryOp::URShift => number_ops::unsigned_right_shift(x, y),
                    BinaryOp::BitAnd => number_ops::bitwise_and(x, y),
                    BinaryOp::BitOr => number_ops::bitwise_or(x, y),
                    BinaryOp::BitXor => number_ops::bitwise_xor(x, y),
                    _ => {
                        return Err(Error::MalformedNode {
                            expected: "numeric operator",
                            found: format!("{op:?}"),
                        }
                        .into());
                    }
                };
                Ok(JsValue::Number(n))
            }
        }
    }

    fn bigint_operation(&mut self, op: BinaryOp, a: &num_bigint::BigInt, b: &num_bigint::BigInt) -> EvalResult {
        let result = match op {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div => bigint_ops::divide(a, b).map_err(|m| self.range_error(m))?,
            BinaryOp::Mod => bigint_ops::remainder(a, b).map_err(|m| self.range_error(m))?,
            BinaryOp::Exp => bigint_ops::exponentiate(a, b).map_err(|m| self.range_error(m))?,
            BinaryOp::LShift => bigint_ops::left_shift(a, b),
            BinaryOp::RShift => bigint_ops::signed_right_shift(a, b),
            BinaryOp::URShift => {
                return Err(self.type_error("BigInts have no unsigned right shift, use >> instead"));
            }
            BinaryOp::BitAnd => a & b,
            BinaryOp::BitOr => a | b,
            BinaryOp::BitXor => a ^ b,
            _ => {
                return Err(Error::MalformedNode {
                    expected: "numeric operator",
                    found: format!("{op:?}"),
                }
                .into());
            }
        };
        Ok(JsValue::bigint(result))
    }

    pub(crate) fn resolve_reference(&mut self, target: &Expression, env: &EnvRef) -> EvalResult<Reference> {
        match target {
            Expression::Identifier(name) => Ok(Reference::Binding(name.clone())),
            Expression::Member(object, property) => {
                if let Expression::Super = object.as_ref() {
                    return Ok(Reference::SuperProperty(self.member_key(property, env)?));
                }
                let base = self.evaluate(object, env)?;
                let key = self.member_key(property, env)?;
                Ok(Reference::Property(base, key))
            }
            Expression::Array(_) => Err(Error::UnsupportedNodeKind("ArrayPattern").into()),
            Expression::Object(_) => Err(Error::UnsupportedNodeKind("ObjectPattern").into()),
            other => Err(Error::MalformedNode {
                expected: "assignment target",
                found: other.kind_name().to_string(),
            }
            .into()),
        }
    }

    fn get_reference(&mut self, reference: &Reference, env: &EnvRef) -> EvalResult {
        match reference {
            Reference::Binding(name) => self.lookup_identifier(name, env),
            Reference::Property(base, key) => self.get(base, key),
            Reference::SuperProperty(key) => self.get_super_property(key, env),
        }
    }

    pub(crate) fn put_reference(&mut self, reference: &Reference, value: JsValue, env: &EnvRef) -> EvalResult<()> {
        match reference {
            Reference::Binding(name) => Environment::assign(env, name, value).map_err(|e| match e {
                AssignError::Constant => self.type_error("Assignment to constant variable."),
                AssignError::Undeclared => self.reference_error(format!("assignment to undeclared variable {name}")),
            }),
            Reference::Property(base, key) => self.set(base, key, value),
            Reference::SuperProperty(key) => self.set_super_property(key, value, env),
        }
    }

    fn eval_assignment(&mut self, op: AssignOp, target: &Expression, value: &Expression, env: &EnvRef) -> EvalResult {
        let reference = self.resolve_reference(target, env)?;
        let name_hint = match &reference {
            Reference::Binding(name) => name.clone(),
            _ => String::new(),
        };
        let result = match op {
            AssignOp::Assign => self.evaluate_named(value, env, &name_hint)?,
            AssignOp::LogicalAndAssign | AssignOp::LogicalOrAssign | AssignOp::NullishAssign => {
                let current = self.get_reference(&reference, env)?;
                let keep = match op {
                    AssignOp::LogicalAndAssign => !to_boolean(&current),
                    AssignOp::LogicalOrAssign => to_boolean(&current),
                    _ => !current.is_nullish(),
                };
                if keep {
                    return Ok(current);
                }
                self.evaluate_named(value, env, &name_hint)?
            }
            compound => {
                let current = self.get_reference(&reference, env)?;
                let rhs = self.evaluate(value, env)?;
                let Some(binary) = compound.binary_op() else {
                    return Err(Error::MalformedNode {
                        expected: "compound assignment",
                        found: format!("{compound:?}"),
                    }
                    .into());
                };
                self.binary_operation(binary, &current, &rhs)?
            }
        };
        self.put_reference(&reference, result.clone(), env)?;
        Ok(result)
    }

    fn eval_update(&mut self, op: UpdateOp, prefix: bool, target: &Expression, env: &EnvRef) -> EvalResult {
        let reference = self.resolve_reference(target, env)?;
        let current = self.get_reference(&reference, env)?;
        let old = self.to_numeric(&current)?;
        let new = match &old {
            JsValue::BigInt(b) => JsValue::bigint(match op {
                UpdateOp::Increment => &b.value + 1u32,
                UpdateOp::Decrement => &b.value - 1u32,
            }),
            n => {
                let n = to_number(n);
                JsValue::Number(match op {
                    UpdateOp::Increment => n + 1.0,
                    UpdateOp::Decrement => n - 1.0,
                })
            }
        };
        self.put_reference(&reference, new.clone(), env)?;
        Ok(if prefix { new } else { old })
    }

    pub(crate) fn evaluate_arguments(&mut self, args: &[Expression], env: &EnvRef) -> EvalResult<Vec<JsValue>> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            match arg {
                Expression::Spread(inner) => {
                    let iterable = self.evaluate(inner, env)?;
                    values.extend(self.iterate_to_vec(&iterable)?);
                }
                other => values.push(self.evaluate(other, env)?),
            }
        }
        Ok(values)
    }

    fn eval_call(&mut self, callee: &Expression, args: &[Expression], env: &EnvRef) -> EvalResult {
        match callee {
            Expression::Super => self.eval_super_call(args, env),
            Expression::Member(object, property) => {
                let (this, func, key) = if let Expression::Super = object.as_ref() {
                    let key = self.member_key(property, env)?;
                    let func = self.get_super_property(&key, env)?;
                    (self.this_value(env)?, func, key)
                } else {
                    let base = self.evaluate(object, env)?;
                    let key = self.member_key(property, env)?;
                    let func = self.get(&base, &key)?;
                    (base, func, key)
                };
                let args = self.evaluate_arguments(args, env)?;
                if !is_callable(&func) {
                    return Err(self.type_error(format!("property \"{key}\" is not a function")));
                }
                self.call(&func, &this, &args)
            }
            _ => {
                let func = self.evaluate(callee, env)?;
                let args = self.evaluate_arguments(args, env)?;
                if !is_callable(&func) {
                    let name = describe_expression(callee);
                    return Err(self.type_error(format!("{name} is not a function")));
                }
                self.call(&func, &JsValue::Undefined, &args)
            }
        }
    }
}

/// Short source-like rendering of a callee for error messages.
fn describe_expression(expr: &Expression) -> String {
    match expr {
        Expression::Identifier(name) => name.clone(),
        Expression::This => "this".to_string(),
        Expression::Super => "super".to_string(),
        Expression::Member(object, MemberProperty::Dot(name)) => {
            format!("{}.{name}", describe_expression(object))
        }
        Expression::Member(object, MemberProperty::Computed(_)) => {
            format!("{}[...]", describe_expression(object))
        }
        Expression::Call(callee, _) => format!("{}(...)", describe_expression(callee)),
        other => other.kind_name().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn eval(source: &str) -> String {
        let mut interp = Interpreter::new();
        match interp.eval_source(source) {
            Ok(v) => inspect(&v),
            Err(e) => format!("error: {e}"),
        }
    }

    #[test]
    fn literals() {
        assert_eq!(eval("12n"), "12n");
        assert_eq!(eval("0x10"), "16");
        assert_eq!(eval("'it\\'s'"), "\"it's\"");
        assert_eq!(eval("null"), "null");
        assert_eq!(eval("`a${1 + 1}b`"), "\"a2b\"");
    }

    #[test]
    fn const_protection_and_undeclared_assignment() {
        assert_eq!(
            eval("const a = 1; try { a = 2 } catch (e) { e.message }"),
            "\"Assignment to constant variable.\""
        );
        assert_eq!(
            eval("try { nope = 2 } catch (e) { [e.constructor.name, e.message] }"),
            "[ \"ReferenceError\", \"assignment to undeclared variable nope\" ]"
        );
        assert_eq!(eval("try { missing } catch (e) { e.message }"), "\"missing is not defined\"");
    }

    #[test]
    fn compound_and_logical_assignment() {
        assert_eq!(eval("let a = 2; a **= 3; a <<= 1; a"), "16");
        assert_eq!(eval("let s = 'x'; s += 1; s"), "\"x1\"");
        assert_eq!(eval("let o = { n: null }; o.n ??= 5; o.n ||= 6; o.n &&= 7; o.n"), "7");
        let short = "let calls = 0; let v = 1; v ||= (calls++, 2); [v, calls]";
        assert_eq!(eval(short), "[ 1, 0 ]");
    }

    #[test]
    fn update_expressions() {
        assert_eq!(eval("let i = 1; [i++, i, ++i, i--, --i]"), "[ 1, 2, 3, 3, 1 ]");
        assert_eq!(eval("let b = 1n; b++; b"), "2n");
    }

    #[test]
    fn bigint_mixing_is_a_type_error() {
        assert_eq!(eval("try { 1n + 1 } catch (e) { e instanceof TypeError }"), "true");
        assert_eq!(eval("try { 1n / 0n } catch (e) { e instanceof RangeError }"), "true");
        assert_eq!(eval("5n / 2n"), "2n");
        assert_eq!(eval("1n < 2"), "true");
        assert_eq!(eval("'1' + 1n"), "\"11\"");
    }

    #[test]
    fn typeof_and_delete() {
        assert_eq!(eval("typeof undeclared"), "\"undefined\"");
        assert_eq!(eval("typeof null"), "\"object\"");
        assert_eq!(eval("typeof (() => 1)"), "\"function\"");
        assert_eq!(eval("let o = { a: 1 }; [delete o.a, 'a' in o]"), "[ true, false ]");
        assert_eq!(eval("let x = 1; delete x"), "true");
    }

    #[test]
    fn in_and_instanceof() {
        assert_eq!(eval("'length' in []"), "true");
        assert_eq!(eval("'toString' in {}"), "true");
        assert_eq!(eval("[] instanceof Array"), "true");
        assert_eq!(eval("try { 'a' in 'abc' } catch (e) { e instanceof TypeError }"), "true");
    }

    #[test]
    fn comparisons() {
        assert_eq!(eval("[1 < 2, 2 <= 2, 'b' > 'a', NaN >= NaN, undefined == null]"), "[ true, true, true, false, true ]");
        assert_eq!(eval("[0 === -0, NaN !== NaN, '1' == 1, '1' === 1]"), "[ true, true, true, false ]");
    }

    #[test]
    fn spread_arguments() {
        assert_eq!(eval("Math.max(...[1, 5, 3], 4)"), "5");
        assert_eq!(eval("[...'ab', ...[1, 2]]"), "[ \"a\", \"b\", 1, 2 ]");
        assert_eq!(eval("({ ...{ a: 1 }, b: 2 })"), "{ a: 1, b: 2 }");
    }

    #[test]
    fn object_literals() {
        assert_eq!(eval("const k = 'dyn'; ({ [k + 1]: 1, 'q r': 2, 3: 3 })"), "{ 3: 3, dyn1: 1, \"q r\": 2 }");
        assert_eq!(eval("let a = 1; ({ a })"), "{ a: 1 }");
        assert_eq!(eval("({ get x() { return 4 } }).x"), "4");
        assert_eq!(eval("const p = { hi() { return 'p' } }; ({ __proto__: p }).hi()"), "\"p\"");
        assert_eq!(eval("({ m() { return super.toString === Object.prototype.toString } }).m()"), "true");
    }

    #[test]
    fn call_errors_name_the_callee() {
        assert_eq!(
            eval("const o = {}; try { o.nope() } catch (e) { e.message }"),
            "\"property \\\"nope\\\" is not a function\""
        );
        assert_eq!(eval("let f = 1; try { f() } catch (e) { e.message }"), "\"f is not a function\"");
        assert_eq!(eval("try { new Math.max() } catch (e) { e.message }"), "\"Math.max is not a constructor\"");
    }

    #[test]
    fn unsupported_expressions_are_fatal() {
        assert_eq!(eval("try { /a/ } catch (e) {}"), "error: unsupported node kind: RegExpLiteral");
        assert_eq!(eval("let o; try { o?.x } catch (e) {}"), "error: unsupported node kind: ChainExpression");
        assert_eq!(eval("let a, b; [a, b] = [1, 2]"), "error: unsupported node kind: ArrayPattern");
    }

    #[test]
    fn re_evaluation_is_idempotent() {
        let mut interp = Interpreter::new();
        let program = match crate::parser::parse("(1 + 2) * 'x'.length", &Default::default()) {
            Ok(p) => p,
            Err(e) => panic!("{e}"),
        };
        let first = interp.run(&program).ok().map(|v| inspect(&v));
        let second = interp.run(&program).ok().map(|v| inspect(&v));
        assert_eq!(first, Some("3".to_string()));
        assert_eq!(first, second);
    }
}

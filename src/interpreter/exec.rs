use super::*;

impl Interpreter {
    pub(crate) fn exec_program(&mut self, body: &[Statement], env: &EnvRef) -> EvalResult {
        self.hoist(body, env)?;
        let value = self.exec_statements(body, env)?;
        match self.signal.take() {
            Some(Signal::Return(v)) => Ok(v),
            _ => Ok(value),
        }
    }

    /// Runs `stmts` in order until one leaves a signal behind. The result is
    /// the completion value of the last value-producing statement.
    pub(crate) fn exec_statements(&mut self, stmts: &[Statement], env: &EnvRef) -> EvalResult {
        let mut result = JsValue::Undefined;
        for stmt in stmts {
            let value = self.exec_statement(stmt, env)?;
            if produces_value(stmt) {
                result = value;
            }
            if self.signal.is_some() {
                break;
            }
        }
        Ok(result)
    }

    pub(crate) fn exec_block(&mut self, body: &[Statement], env: &EnvRef) -> EvalResult {
        let block_env = Environment::new_block(env);
        self.hoist(body, &block_env)?;
        self.exec_statements(body, &block_env)
    }

    pub(crate) fn exec_statement(&mut self, stmt: &Statement, env: &EnvRef) -> EvalResult {
        match stmt {
            Statement::Empty | Statement::Debugger | Statement::FunctionDeclaration(_) => Ok(JsValue::Undefined),
            Statement::Expression(expr) => self.evaluate(expr, env),
            Statement::Block(body) => self.exec_block(body, env),
            Statement::Variable(decl) => {
                self.exec_variable_declaration(decl, env)?;
                Ok(JsValue::Undefined)
            }
            Statement::If(s) => {
                let test = self.evaluate(&s.test, env)?;
                if to_boolean(&test) {
                    self.exec_statement(&s.consequent, env)
                } else if let Some(alt) = &s.alternate {
                    self.exec_statement(alt, env)
                } else {
                    Ok(JsValue::Undefined)
                }
            }
            Statement::While(_)
            | Statement::DoWhile(_)
            | Statement::For(_)
            | Statement::ForIn(_)
            | Statement::ForOf(_) => self.exec_loop(stmt, env, &[]),
            Statement::Return(arg) => {
                let value = match arg {
                    Some(expr) => self.evaluate(expr, env)?,
                    None => JsValue::Undefined,
                };
                self.signal = Some(Signal::Return(value));
                Ok(JsValue::Undefined)
            }
            Statement::Break(label) => {
                self.signal = Some(Signal::Break(label.clone()));
                Ok(JsValue::Undefined)
            }
            Statement::Continue(label) => {
                self.signal = Some(Signal::Continue(label.clone()));
                Ok(JsValue::Undefined)
            }
            Statement::Throw(expr) => {
                let value = self.evaluate(expr, env)?;
                Err(Exception::Throw(value))
            }
            Statement::Try(t) => self.exec_try(t, env),
            Statement::Switch(s) => self.exec_switch(s, env),
            Statement::Labeled(..) => self.exec_labeled(stmt, env),
            Statement::With(..) => Err(Error::UnsupportedNodeKind(stmt.kind_name()).into()),
            Statement::ClassDeclaration(node) => {
                let name = node.name.clone().unwrap_or_default();
                let class = self.make_class(node, env, &name)?;
                env.borrow_mut().declare_variable(&name, JsValue::Object(class));
                Ok(JsValue::Undefined)
            }
        }
    }

    pub(crate) fn exec_variable_declaration(&mut self, decl: &VariableDeclaration, env: &EnvRef) -> EvalResult<()> {
        for declarator in &decl.declarations {
            let Pattern::Identifier(name) = &declarator.pattern else {
                return Err(Error::UnsupportedNodeKind(declarator.pattern.kind_name()).into());
            };
            let value = match &declarator.init {
                Some(init) => self.evaluate_named(init, env, name)?,
                // `var x;` keeps whatever hoisting or an earlier write left
                None if decl.kind == VarKind::Var => continue,
                None => JsValue::Undefined,
            };
            self.declare(decl.kind, name, value, env);
        }
        Ok(())
    }

    fn declare(&mut self, kind: VarKind, name: &str, value: JsValue, env: &EnvRef) {
        match kind {
            VarKind::Var => Environment::var_scope(env).borrow_mut().declare_variable(name, value),
            VarKind::Let => env.borrow_mut().declare_variable(name, value),
            VarKind::Const => env.borrow_mut().declare_constant(name, value),
        }
    }

    fn exec_labeled(&mut self, stmt: &Statement, env: &EnvRef) -> EvalResult {
        let mut labels = Vec::new();
        let mut body = stmt;
        while let Statement::Labeled(label, inner) = body {
            labels.push(label.clone());
            body = inner;
        }
        let result = match body {
            Statement::While(_)
            | Statement::DoWhile(_)
            | Statement::For(_)
            | Statement::ForIn(_)
            | Statement::ForOf(_) => self.exec_loop(body, env, &labels)?,
            other => self.exec_statement(other, env)?,
        };
        if let Some(Signal::Break(Some(label))) = &self.signal
            && labels.contains(label)
        {
            self.signal = None;
        }
        Ok(result)
    }

    /// Takes a break/continue aimed at this loop out of the interpreter.
    /// Returns false when the loop has to stop.
    fn loop_continues(&mut self, labels: &[String]) -> bool {
        match self.signal.take() {
            None | Some(Signal::Continue(None)) => true,
            Some(Signal::Break(None)) => false,
            Some(Signal::Continue(Some(label))) if labels.contains(&label) => true,
            Some(Signal::Break(Some(label))) if labels.contains(&label) => false,
            Some(other) => {
                self.signal = Some(other);
                false
            }
        }
    }

    /// One frame per loop, shared by every iteration.
    fn exec_loop(&mut self, stmt: &Statement, env: &EnvRef, labels: &[String]) -> EvalResult {
        let loop_env = Environment::new_block(env);
        let mut result = JsValue::Undefined;
        match stmt {
            Statement::While(s) => loop {
                let test = self.evaluate(&s.test, &loop_env)?;
                if !to_boolean(&test) {
                    break;
                }
                result = self.exec_statement(&s.body, &loop_env)?;
                if !self.loop_continues(labels) {
                    break;
                }
            },
            Statement::DoWhile(s) => loop {
                result = self.exec_statement(&s.body, &loop_env)?;
                if !self.loop_continues(labels) {
                    break;
                }
                let test = self.evaluate(&s.test, &loop_env)?;
                if !to_boolean(&test) {
                    break;
                }
            },
            Statement::For(s) => {
                match &s.init {
                    Some(ForInit::Variable(decl)) => self.exec_variable_declaration(decl, &loop_env)?,
                    Some(ForInit::Expression(expr)) => {
                        self.evaluate(expr, &loop_env)?;
                    }
                    None => {}
                }
                loop {
                    if let Some(test) = &s.test {
                        let test = self.evaluate(test, &loop_env)?;
                        if !to_boolean(&test) {
                            break;
                        }
                    }
                    result = self.exec_statement(&s.body, &loop_env)?;
                    if !self.loop_continues(labels) {
                        break;
                    }
                    if let Some(update) = &s.update {
                        self.evaluate(update, &loop_env)?;
                    }
                }
            }
            Statement::ForIn(s) => {
                let object = self.evaluate(&s.right, &loop_env)?;
                let keys: Vec<String> = match &object {
                    JsValue::Object(obj) => self.for_in_keys(obj),
                    JsValue::String(text) => (0..text.len()).map(|i| i.to_string()).collect(),
                    _ => Vec::new(),
                };
                for key in keys {
                    self.bind_for_head(&s.left, JsValue::from(key), &loop_env)?;
                    result = self.exec_statement(&s.body, &loop_env)?;
                    if !self.loop_continues(labels) {
                        break;
                    }
                }
            }
            Statement::ForOf(s) => {
                let iterable = self.evaluate(&s.right, &loop_env)?;
                // arrays are read live so pushes during iteration are visited
                let live = iterable.as_object().filter(|o| o.is_array()).cloned();
                let snapshot = match live {
                    Some(_) => Vec::new(),
                    None => self.iterate_to_vec(&iterable)?,
                };
                let mut index = 0;
                loop {
                    let next = match &live {
                        Some(array) => array
                            .borrow()
                            .array_elements()
                            .and_then(|elements| elements.get(index).cloned()),
                        None => snapshot.get(index).cloned(),
                    };
                    let Some(value) = next else {
                        break;
                    };
                    index += 1;
                    self.bind_for_head(&s.left, value, &loop_env)?;
                    result = self.exec_statement(&s.body, &loop_env)?;
                    if !self.loop_continues(labels) {
                        break;
                    }
                }
            }
            other => {
                return Err(Error::MalformedNode {
                    expected: "loop statement",
                    found: other.kind_name().to_string(),
                }
                .into());
            }
        }
        Ok(result)
    }

    fn bind_for_head(&mut self, head: &ForHead, value: JsValue, env: &EnvRef) -> EvalResult<()> {
        match head {
            ForHead::Declaration(kind, Pattern::Identifier(name)) => {
                self.declare(*kind, name, value, env);
                Ok(())
            }
            ForHead::Declaration(_, pattern) => Err(Error::UnsupportedNodeKind(pattern.kind_name()).into()),
            ForHead::Target(target) => {
                let reference = self.resolve_reference(target, env)?;
                self.put_reference(&reference, value, env)
            }
        }
    }

    /// A throw from the try block or the handler is dropped when a
    /// `finally` block exists; the finally completion value wins, and a
    /// signal raised by `finally` replaces the pending one.
    fn exec_try(&mut self, t: &TryStatement, env: &EnvRef) -> EvalResult {
        let outcome = match self.exec_block(&t.block, env) {
            Err(Exception::Throw(value)) => match &t.handler {
                Some(handler) => self.exec_catch(handler, value, env),
                None => Err(Exception::Throw(value)),
            },
            other => other,
        };
        let Some(finalizer) = &t.finalizer else {
            return outcome;
        };
        if let Err(Exception::Fatal(_)) = outcome {
            return outcome;
        }
        let pending = self.signal.take();
        let value = self.exec_block(finalizer, env)?;
        if self.signal.is_none() {
            self.signal = pending;
        }
        Ok(value)
    }

    fn exec_catch(&mut self, handler: &CatchClause, thrown: JsValue, env: &EnvRef) -> EvalResult {
        let catch_env = Environment::new_block(env);
        match &handler.param {
            Some(Pattern::Identifier(name)) => catch_env.borrow_mut().declare_variable(name, thrown),
            Some(other) => return Err(Error::UnsupportedNodeKind(other.kind_name()).into()),
            None => {}
        }
        self.exec_block(&handler.body, &catch_env)
    }

    fn exec_switch(&mut self, s: &SwitchStatement, env: &EnvRef) -> EvalResult {
        let discriminant = self.evaluate(&s.discriminant, env)?;
        let switch_env = Environment::new_block(env);
        for case in &s.cases {
            self.hoist(&case.consequent, &switch_env)?;
        }

        let mut start = None;
        for (i, case) in s.cases.iter().enumerate() {
            if let Some(test) = &case.test {
                let value = self.evaluate(test, &switch_env)?;
                if strict_equality(&discriminant, &value) {
                    start = Some(i);
                    break;
                }
            }
        }
        let start = start.or_else(|| s.cases.iter().position(|c| c.test.is_none()));

        let mut result = JsValue::Undefined;
        if let Some(start) = start {
            for case in &s.cases[start..] {
                result = self.exec_statements(&case.consequent, &switch_env)?;
                if self.signal.is_some() {
                    break;
                }
            }
        }
        if let Some(Signal::Break(None)) = self.signal {
            self.signal = None;
        }
        Ok(result)
    }
}

fn produces_value(stmt: &Statement) -> bool {
    !matches!(
        stmt,
        Statement::Empty
            | Statement::Debugger
            | Statement::Variable(_)
            | Statement::FunctionDeclaration(_)
            | Statement::ClassDeclaration(_)
            | Statement::Return(_)
            | Statement::Break(_)
            | Statement::Continue(_)
    )
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
    fn completion_value_skips_declarations() {
        assert_eq!(eval("1; var x = 2;"), "1");
        assert_eq!(eval("if (true) { 'yes' } else { 'no' }"), "\"yes\"");
    }

    #[test]
    fn let_is_block_scoped_var_is_not() {
        assert_eq!(eval("let a = 1; { let a = 2; } a"), "1");
        assert_eq!(eval("{ var b = 2; } b"), "2");
        assert_eq!(eval("var c = 1; var c; c"), "1");
    }

    #[test]
    fn loops_share_one_frame() {
        let source = "
            const fns = [];
            for (let i = 0; i < 3; i++) fns.push(() => i);
            fns.map(f => f())";
        assert_eq!(eval(source), "[ 3, 3, 3 ]");
    }

    #[test]
    fn labeled_break_and_continue() {
        let source = "
            let out = [];
            outer: for (let i = 0; i < 3; i++) {
                for (let j = 0; j < 3; j++) {
                    if (j == 1) continue outer;
                    if (i == 2) break outer;
                    out.push(i + ':' + j);
                }
            }
            out";
        assert_eq!(eval(source), "[ \"0:0\", \"1:0\" ]");
    }

    #[test]
    fn labeled_block_absorbs_its_break() {
        assert_eq!(eval("let x = 0; done: { x = 1; break done; x = 2; } x"), "1");
    }

    #[test]
    fn switch_falls_through_to_break() {
        let source = "
            function f(v) {
                let out = '';
                switch (v) {
                    case 1: out += 'one';
                    case 2: out += 'two'; break;
                    default: out += 'other';
                }
                return out;
            }
            [f(1), f(2), f(3), f('1')]";
        assert_eq!(eval(source), "[ \"onetwo\", \"two\", \"other\", \"other\" ]");
    }

    #[test]
    fn for_in_and_for_of() {
        assert_eq!(eval("let ks = []; for (const k in { a: 1, b: 2 }) ks.push(k); ks"), "[ \"a\", \"b\" ]");
        assert_eq!(eval("let s = 0; for (const v of [1, 2, 3]) s += v; s"), "6");
        assert_eq!(eval("let cs = []; for (var c of 'hi') cs.push(c); cs"), "[ \"h\", \"i\" ]");
    }

    #[test]
    fn finally_value_overrides_try_value() {
        assert_eq!(eval("try { 1 } finally { 2 }"), "2");
    }

    #[test]
    fn finally_swallows_thrown_error() {
        assert_eq!(eval("let r = 'start'; try { throw new Error('x') } finally { r = 'done' } r"), "\"done\"");
    }

    #[test]
    fn finally_return_overrides_pending_return() {
        assert_eq!(eval("function f() { try { return 1 } finally { return 2 } } f()"), "2");
    }

    #[test]
    fn pending_return_survives_normal_finally() {
        assert_eq!(eval("let log = []; function f() { try { return 1 } finally { log.push('f') } } [f(), log.length]"), "[ 1, 1 ]");
    }

    #[test]
    fn catch_binds_the_thrown_value() {
        assert_eq!(eval("try { throw 5 } catch (e) { e * 2 }"), "10");
        assert_eq!(eval("try { null.x } catch (e) { e instanceof TypeError }"), "true");
    }

    #[test]
    fn unsupported_statements_are_fatal() {
        let mut interp = Interpreter::new();
        let result = interp.eval_source("try { with ({}) {} } catch (e) {}");
        assert!(matches!(result, Err(Error::UnsupportedNodeKind("WithStatement"))));
    }
}

use super::*;
use log::trace;

impl Interpreter {
    /// Closure over `env`. Methods carry the object they are defined on as
    /// their home object and cannot be used with `new`.
    pub(crate) fn make_function(
        &mut self,
        node: &Rc<FunctionNode>,
        env: &EnvRef,
        name: &str,
        home_object: Option<JsObject>,
    ) -> EvalResult<JsObject> {
        if node.is_generator {
            return Err(Error::UnsupportedNodeKind("GeneratorFunction").into());
        }
        let constructable = !node.is_arrow && !node.is_async && home_object.is_none();
        let func = JsFunction::User {
            node: node.clone(),
            closure: env.clone(),
            home_object,
            constructable,
        };
        Ok(self.create_function(func, name, node.expected_argument_count()))
    }

    /// A named function expression sees its own name through a frame of
    /// its own; an anonymous one takes `name_hint`.
    pub(crate) fn make_function_expression(
        &mut self,
        node: &Rc<FunctionNode>,
        env: &EnvRef,
        name_hint: &str,
    ) -> EvalResult<JsObject> {
        let Some(own_name) = &node.name else {
            return self.make_function(node, env, name_hint, None);
        };
        let scope = Environment::new_block(env);
        let func = self.make_function(node, &scope, own_name, None)?;
        scope
            .borrow_mut()
            .declare_constant(own_name, JsValue::Object(func.clone()));
        Ok(func)
    }

    pub(crate) fn call_user_function(
        &mut self,
        func: &JsObject,
        node: &Rc<FunctionNode>,
        closure: &EnvRef,
        home_object: Option<JsObject>,
        this: &JsValue,
        args: &[JsValue],
    ) -> EvalResult {
        if log::log_enabled!(log::Level::Trace) {
            let name = Self::function_name(&JsValue::Object(func.clone()), "<anonymous>");
            trace!("call {name} with {} argument(s)", args.len());
        }
        let frame = Environment::new(Some(closure.clone()), ScopeKind::Function);
        if !node.is_arrow {
            let arguments = self.create_array(args.to_vec());
            let mut f = frame.borrow_mut();
            f.this = Some(ThisBinding::Bound(this.clone()));
            f.home_object = home_object;
            f.declare_constant("arguments", arguments);
        }
        self.run_function(node, &frame, args)
    }

    /// Binds parameters and runs the body in a prepared call frame. Async
    /// bodies run to completion and come back as a settled promise.
    pub(crate) fn run_function(&mut self, node: &FunctionNode, frame: &EnvRef, args: &[JsValue]) -> EvalResult {
        let result = self.run_function_body(node, frame, args);
        if node.is_async {
            return self.settle_async_result(result);
        }
        result
    }

    fn run_function_body(&mut self, node: &FunctionNode, frame: &EnvRef, args: &[JsValue]) -> EvalResult {
        self.bind_parameters(&node.params, frame, args)?;
        match &node.body {
            FunctionBody::Expression(expr) => self.evaluate(expr, frame),
            FunctionBody::Block(body) => {
                self.hoist(body, frame)?;
                self.exec_statements(body, frame)?;
                match self.signal.take() {
                    Some(Signal::Return(value)) => Ok(value),
                    _ => Ok(JsValue::Undefined),
                }
            }
        }
    }

    fn bind_parameters(&mut self, params: &[Pattern], frame: &EnvRef, args: &[JsValue]) -> EvalResult<()> {
        for (i, param) in params.iter().enumerate() {
            let (name, value) = match param {
                Pattern::Identifier(name) => (name, arg(args, i)),
                Pattern::Assign(target, default) => {
                    let Pattern::Identifier(name) = target.as_ref() else {
                        return Err(Error::UnsupportedNodeKind(target.kind_name()).into());
                    };
                    let mut value = arg(args, i);
                    if value.is_undefined() {
                        value = self.evaluate_named(default, frame, name)?;
                    }
                    (name, value)
                }
                Pattern::Rest(target) => {
                    let Pattern::Identifier(name) = target.as_ref() else {
                        return Err(Error::UnsupportedNodeKind(target.kind_name()).into());
                    };
                    let rest = args.get(i..).unwrap_or_default().to_vec();
                    (name, self.create_array(rest))
                }
                other => return Err(Error::UnsupportedNodeKind(other.kind_name()).into()),
            };
            frame.borrow_mut().declare_variable(name, value);
        }
        Ok(())
    }

    fn settle_async_result(&mut self, result: EvalResult) -> EvalResult {
        let promise = self.create_promise(PromiseState::Pending(Vec::new()));
        match result {
            Ok(value) => self.resolve_promise(&promise, value)?,
            Err(Exception::Throw(reason)) => self.reject_promise(&promise, reason)?,
            Err(fatal) => return Err(fatal),
        }
        Ok(JsValue::Object(promise))
    }

    /// `await operand`: raise the suspension, then resume it right away.
    pub(crate) fn eval_await(&mut self, operand: &Expression, env: &EnvRef) -> EvalResult {
        let value = self.evaluate(operand, env)?;
        self.signal = Some(Signal::AwaitSuspend(value));
        // single-shot suspension: the await boundary is this call, so the
        // raised signal is always the one taken back here
        match self.signal.take() {
            Some(Signal::AwaitSuspend(value)) => self.resume_await(value),
            _ => Ok(JsValue::Undefined),
        }
    }

    /// Unwraps a settled promise; other values resume as themselves.
    fn resume_await(&mut self, value: JsValue) -> EvalResult {
        let JsValue::Object(obj) = &value else {
            return Ok(value);
        };
        let settled = match &obj.borrow().kind {
            ObjectKind::Promise(PromiseState::Fulfilled(v)) => Some(Ok(v.clone())),
            ObjectKind::Promise(PromiseState::Rejected(reason)) => Some(Err(reason.clone())),
            ObjectKind::Promise(PromiseState::Pending(_)) => None,
            _ => return Ok(value.clone()),
        };
        match settled {
            Some(Ok(v)) => Ok(v),
            Some(Err(reason)) => Err(Exception::Throw(reason)),
            None => Err(self.type_error("await on a promise that is still pending")),
        }
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
    fn defaults_and_rest_parameters() {
        assert_eq!(eval("function f(a, b = a * 2, ...rest) { return [a, b, rest] } f(1)"), "[ 1, 2, [] ]");
        assert_eq!(eval("function f(a, b = 5, ...rest) { return [a, b, rest] } f(1, undefined, 3, 4)"), "[ 1, 5, [ 3, 4 ] ]");
        assert_eq!(eval("(function (a, b = 1, c) {}).length"), "1");
    }

    #[test]
    fn closures_share_their_captured_frame() {
        let source = "
            function counter() {
                let n = 0;
                return { inc: () => ++n, get: () => n };
            }
            const c = counter();
            c.inc(); c.inc();
            c.get()";
        assert_eq!(eval(source), "2");
    }

    #[test]
    fn arguments_and_this() {
        assert_eq!(eval("function f() { return arguments.length } f(1, 2, 3)"), "3");
        assert_eq!(eval("const o = { v: 4, m() { return [1].map(() => this.v) } }; o.m()"), "[ 4 ]");
        assert_eq!(eval("function f() { return this } f()"), "undefined");
    }

    #[test]
    fn named_function_expression_sees_itself() {
        assert_eq!(eval("const fact = function f(n) { return n <= 1 ? 1 : n * f(n - 1) }; fact(5)"), "120");
        assert_eq!(eval("const g = function h() {}; typeof h"), "\"undefined\"");
    }

    #[test]
    fn inferred_names() {
        assert_eq!(eval("const a = () => {}; a.name"), "\"a\"");
        assert_eq!(eval("let o = { m() {} }; o.m.name"), "\"m\"");
        assert_eq!(eval("const f = function named() {}; f.name"), "\"named\"");
    }

    #[test]
    fn async_functions_return_settled_promises() {
        assert_eq!(eval("async function f() { return 1 } f()"), "Promise { 1 }");
        assert_eq!(eval("async function f() { throw 2 } f()"), "Promise { <rejected> 2 }");
        assert_eq!(eval("async function f() { return await Promise.resolve(3) + 1 } f()"), "Promise { 4 }");
        assert_eq!(eval("await 5"), "5");
    }

    #[test]
    fn await_leaves_no_pending_signal() {
        let source = "
            async function sum(n) {
                let total = 0;
                for (let i = 1; i <= n; i++) { total += await Promise.resolve(i) }
                return total
            }
            sum(4)";
        assert_eq!(eval(source), "Promise { 10 }");
    }

    #[test]
    fn await_rethrows_rejections() {
        let source = "
            async function f() {
                try { await Promise.reject(new TypeError('no')) }
                catch (e) { return e.message }
            }
            f()";
        assert_eq!(eval(source), "Promise { \"no\" }");
    }

    #[test]
    fn await_on_pending_promise_is_a_type_error() {
        let source = "
            async function f() { await new Promise(() => {}) }
            let result;
            f().catch(e => { result = e.constructor.name });
            result";
        assert_eq!(eval(source), "\"TypeError\"");
    }

    #[test]
    fn generators_are_rejected() {
        let mut interp = Interpreter::new();
        let result = interp.eval_source("function* g() {}");
        assert!(matches!(result, Err(Error::UnsupportedNodeKind("GeneratorFunction"))));
    }

    #[test]
    fn arrow_functions_cannot_be_constructed() {
        assert_eq!(eval("const A = () => {}; try { new A() } catch (e) { e.message }"), "\"A is not a constructor\"");
    }
}

use super::super::*;
use std::cell::Cell;

/// Settled state of a promise, copied out of its object.
enum Settled {
    Fulfilled(JsValue),
    Rejected(JsValue),
}

fn settled_state(obj: &JsObject) -> Option<Option<Settled>> {
    match &obj.borrow().kind {
        ObjectKind::Promise(PromiseState::Pending(_)) => Some(None),
        ObjectKind::Promise(PromiseState::Fulfilled(v)) => Some(Some(Settled::Fulfilled(v.clone()))),
        ObjectKind::Promise(PromiseState::Rejected(v)) => Some(Some(Settled::Rejected(v.clone()))),
        _ => None,
    }
}

fn as_promise(value: &JsValue) -> Option<&JsObject> {
    value
        .as_object()
        .filter(|o| matches!(o.borrow().kind, ObjectKind::Promise(_)))
}

impl Interpreter {
    pub(crate) fn setup_promise(&mut self) {
        let proto = self.promise_prototype.clone();
        let ctor = self.install_constructor(
            JsFunction::native_constructor("Promise", 1, |interp, this, args| {
                let promise = match (&interp.new_target, this) {
                    (Some(_), JsValue::Object(obj)) => obj.clone(),
                    _ => return Err(interp.type_error("Promise constructor cannot be invoked without 'new'")),
                };
                let executor = arg(args, 0);
                if !is_callable(&executor) {
                    return Err(interp.type_error(format!("Promise resolver {executor} is not a function")));
                }
                promise.borrow_mut().kind = ObjectKind::Promise(PromiseState::Pending(Vec::new()));
                let (resolve, reject) = interp.resolving_functions(&promise);
                match interp.call(&executor, &JsValue::Undefined, &[resolve, reject.clone()]) {
                    Ok(_) => {}
                    Err(Exception::Throw(reason)) => {
                        interp.call(&reject, &JsValue::Undefined, &[reason])?;
                    }
                    Err(fatal) => return Err(fatal),
                }
                Ok(JsValue::Object(promise))
            }),
            "Promise",
            1,
            &proto,
        );

        self.add_method(&ctor, "resolve", 1, |interp, _this, args| {
            let value = arg(args, 0);
            if as_promise(&value).is_some() {
                return Ok(value);
            }
            let promise = interp.create_promise(PromiseState::Pending(Vec::new()));
            interp.resolve_promise(&promise, value)?;
            Ok(JsValue::Object(promise))
        });
        self.add_method(&ctor, "reject", 1, |interp, _this, args| {
            let promise = interp.create_promise(PromiseState::Pending(Vec::new()));
            interp.reject_promise(&promise, arg(args, 0))?;
            Ok(JsValue::Object(promise))
        });

        self.add_method(&proto, "then", 2, |interp, this, args| {
            interp.promise_then(this, arg(args, 0), arg(args, 1))
        });
        self.add_method(&proto, "catch", 1, |interp, this, args| {
            interp.promise_then(this, JsValue::Undefined, arg(args, 0))
        });
        self.add_method(&proto, "finally", 1, |interp, this, args| {
            let on_finally = arg(args, 0);
            if !is_callable(&on_finally) {
                return interp.promise_then(this, on_finally.clone(), on_finally);
            }
            let callback = on_finally.clone();
            let on_fulfilled = interp.native_function("", 1, move |interp, _this, args| {
                interp.call(&callback, &JsValue::Undefined, &[])?;
                Ok(arg(args, 0))
            });
            let on_rejected = interp.native_function("", 1, move |interp, _this, args| {
                interp.call(&on_finally, &JsValue::Undefined, &[])?;
                Err(Exception::Throw(arg(args, 0)))
            });
            interp.promise_then(this, on_fulfilled, on_rejected)
        });
    }

    /// The `resolve` and `reject` functions handed to an executor. Only the
    /// first call to either has an effect.
    fn resolving_functions(&mut self, promise: &JsObject) -> (JsValue, JsValue) {
        let already_resolved = Rc::new(Cell::new(false));
        let (target, done) = (promise.clone(), already_resolved.clone());
        let resolve = self.native_function("", 1, move |interp, _this, args| {
            if !done.replace(true) {
                interp.resolve_promise(&target, arg(args, 0))?;
            }
            Ok(JsValue::Undefined)
        });
        let (target, done) = (promise.clone(), already_resolved);
        let reject = self.native_function("", 1, move |interp, _this, args| {
            if !done.replace(true) {
                interp.reject_promise(&target, arg(args, 0))?;
            }
            Ok(JsValue::Undefined)
        });
        (resolve, reject)
    }

    /// Resolves `promise` with `value`, adopting the state of `value` when
    /// it is itself a promise. Thenables that are not promises fulfill as-is.
    pub(crate) fn resolve_promise(&mut self, promise: &JsObject, value: JsValue) -> EvalResult<()> {
        let Some(source) = as_promise(&value).cloned() else {
            return self.settle_promise(promise, Settled::Fulfilled(value));
        };
        if source.ptr_eq(promise) {
            let error = self.create_error("TypeError", "Chaining cycle detected for promise");
            return self.settle_promise(promise, Settled::Rejected(error));
        }
        match settled_state(&source).flatten() {
            Some(state) => self.settle_promise(promise, state),
            None => {
                add_reaction(&source, PromiseReaction {
                    on_fulfilled: JsValue::Undefined,
                    on_rejected: JsValue::Undefined,
                    derived: promise.clone(),
                });
                Ok(())
            }
        }
    }

    pub(crate) fn reject_promise(&mut self, promise: &JsObject, reason: JsValue) -> EvalResult<()> {
        self.settle_promise(promise, Settled::Rejected(reason))
    }

    /// Moves a pending promise to `state` and runs its reactions in
    /// registration order. Settled promises are left alone.
    fn settle_promise(&mut self, promise: &JsObject, state: Settled) -> EvalResult<()> {
        let reactions = {
            let mut data = promise.borrow_mut();
            let ObjectKind::Promise(PromiseState::Pending(reactions)) = &mut data.kind else {
                return Ok(());
            };
            let reactions = std::mem::take(reactions);
            data.kind = ObjectKind::Promise(match &state {
                Settled::Fulfilled(v) => PromiseState::Fulfilled(v.clone()),
                Settled::Rejected(v) => PromiseState::Rejected(v.clone()),
            });
            reactions
        };
        debug!("settling promise with {} reaction(s)", reactions.len());
        for reaction in reactions {
            self.run_reaction(reaction, &state)?;
        }
        Ok(())
    }

    fn run_reaction(&mut self, reaction: PromiseReaction, state: &Settled) -> EvalResult<()> {
        let (handler, value) = match state {
            Settled::Fulfilled(v) => (&reaction.on_fulfilled, v),
            Settled::Rejected(v) => (&reaction.on_rejected, v),
        };
        if !is_callable(handler) {
            return match state {
                Settled::Fulfilled(v) => self.resolve_promise(&reaction.derived, v.clone()),
                Settled::Rejected(v) => self.reject_promise(&reaction.derived, v.clone()),
            };
        }
        match self.call(handler, &JsValue::Undefined, std::slice::from_ref(value)) {
            Ok(result) => self.resolve_promise(&reaction.derived, result),
            Err(Exception::Throw(reason)) => self.reject_promise(&reaction.derived, reason),
            Err(fatal) => Err(fatal),
        }
    }

    /// `promise.then(onFulfilled, onRejected)`; handlers of an already
    /// settled promise run before this returns.
    fn promise_then(&mut self, this: &JsValue, on_fulfilled: JsValue, on_rejected: JsValue) -> EvalResult {
        let Some(promise) = as_promise(this).cloned() else {
            return Err(self.type_error("Promise.prototype.then called on non-promise"));
        };
        let derived = self.create_promise(PromiseState::Pending(Vec::new()));
        let reaction = PromiseReaction {
            on_fulfilled,
            on_rejected,
            derived: derived.clone(),
        };
        match settled_state(&promise).flatten() {
            Some(state) => self.run_reaction(reaction, &state)?,
            None => add_reaction(&promise, reaction),
        }
        Ok(JsValue::Object(derived))
    }
}

fn add_reaction(promise: &JsObject, reaction: PromiseReaction) {
    if let ObjectKind::Promise(PromiseState::Pending(reactions)) = &mut promise.borrow_mut().kind {
        reactions.push(reaction);
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
    fn executor_settles_synchronously() {
        assert_eq!(eval("new Promise((resolve) => resolve(1))"), "Promise { 1 }");
        assert_eq!(eval("new Promise((_, reject) => reject('no'))"), "Promise { <rejected> \"no\" }");
        assert_eq!(eval("new Promise(() => { throw 3 })"), "Promise { <rejected> 3 }");
        assert_eq!(eval("new Promise((res, rej) => { res(1); rej(2); res(3) })"), "Promise { 1 }");
    }

    #[test]
    fn constructor_errors() {
        assert_eq!(
            eval("try { Promise(() => {}) } catch (e) { e.message }"),
            "\"Promise constructor cannot be invoked without 'new'\""
        );
        assert_eq!(eval("try { new Promise(1) } catch (e) { e instanceof TypeError }"), "true");
    }

    #[test]
    fn then_and_catch_chain() {
        assert_eq!(eval("Promise.resolve(2).then(x => x * 10)"), "Promise { 20 }");
        assert_eq!(eval("Promise.reject(1).catch(e => e + 1)"), "Promise { 2 }");
        assert_eq!(eval("Promise.reject(1).then(x => x)"), "Promise { <rejected> 1 }");
        assert_eq!(eval("Promise.resolve(1).then(() => { throw 'x' })"), "Promise { <rejected> \"x\" }");
        assert_eq!(eval("Promise.resolve(1).then(() => Promise.resolve(5))"), "Promise { 5 }");
    }

    #[test]
    fn pending_reactions_run_on_settlement() {
        let source = "
            let resolve;
            const p = new Promise(r => { resolve = r });
            const log = [];
            const q = p.then(v => { log.push(v); return v + 1 });
            resolve(7);
            [log, q]
        ";
        assert_eq!(eval(source), "[ [ 7 ], Promise { 8 } ]");
    }

    #[test]
    fn adopting_and_identity() {
        assert_eq!(eval("const p = Promise.resolve(1); Promise.resolve(p) === p"), "true");
        assert_eq!(eval("new Promise(r => r(Promise.reject(4)))"), "Promise { <rejected> 4 }");
        let source = "let r; const p = new Promise(x => { r = x }); r(p); p";
        assert_eq!(eval(source), "Promise { <rejected> TypeError: Chaining cycle detected for promise }");
    }

    #[test]
    fn finally_passes_values_through() {
        assert_eq!(eval("let n = 0; const p = Promise.resolve(3).finally(() => { n++ }); [p, n]"), "[ Promise { 3 }, 1 ]");
        assert_eq!(eval("Promise.reject(3).finally(() => 0)"), "Promise { <rejected> 3 }");
    }
}

use crate::ast::*;
use crate::error::Error;
use crate::parser::{self, ParseOptions};
use crate::types::{JsString, JsValue, bigint_ops, number_ops};
use log::debug;
use rustc_hash::FxHashMap;
use std::path::Path;
use std::rc::Rc;

mod types;
pub use types::*;
mod helpers;
pub(crate) use helpers::*;
mod builtins;
mod class;
mod eval;
mod exec;
mod function;
mod hoist;
mod inspect;
pub use inspect::inspect;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PreferredType {
    Default,
    Number,
    String,
}

pub struct Interpreter {
    global_env: EnvRef,
    program_env: EnvRef,
    pub(crate) object_prototype: JsObject,
    pub(crate) function_prototype: JsObject,
    pub(crate) array_prototype: JsObject,
    pub(crate) string_prototype: JsObject,
    pub(crate) number_prototype: JsObject,
    pub(crate) boolean_prototype: JsObject,
    pub(crate) bigint_prototype: JsObject,
    pub(crate) promise_prototype: JsObject,
    error_prototypes: FxHashMap<&'static str, JsObject>,
    /// Pending return/break/continue/await, see [`Signal`].
    pub(crate) signal: Option<Signal>,
    /// Set while a native constructor runs under `new`.
    pub(crate) new_target: Option<JsObject>,
    /// Arrays being joined, so cyclic arrays join as empty strings.
    pub(crate) join_stack: Vec<JsObject>,
    parse_options: ParseOptions,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        let object_prototype = JsObject::new(JsObjectData::new(None, ObjectKind::Ordinary));
        let derived = |class_name: &str| {
            let mut data = JsObjectData::new(Some(object_prototype.clone()), ObjectKind::Ordinary);
            data.class_name = class_name.to_string();
            JsObject::new(data)
        };
        let global_env = Environment::new(None, ScopeKind::Global);
        let program_env = Environment::new(Some(global_env.clone()), ScopeKind::Function);
        let mut interp = Interpreter {
            global_env,
            program_env,
            function_prototype: derived("Function"),
            array_prototype: derived("Array"),
            string_prototype: derived("String"),
            number_prototype: derived("Number"),
            boolean_prototype: derived("Boolean"),
            bigint_prototype: derived("BigInt"),
            promise_prototype: derived("Promise"),
            object_prototype,
            error_prototypes: FxHashMap::default(),
            signal: None,
            new_target: None,
            join_stack: Vec::new(),
            parse_options: ParseOptions::default(),
        };
        interp.setup_globals();
        interp
    }

    pub fn set_parse_options(&mut self, options: ParseOptions) {
        self.parse_options = options;
    }

    /// Binds `name` in the program frame, shadowing any host global.
    pub fn define_global(&mut self, name: &str, value: JsValue) {
        self.program_env.borrow_mut().declare_variable(name, value);
    }

    pub fn native_function(
        &mut self,
        name: &str,
        arity: usize,
        f: impl Fn(&mut Interpreter, &JsValue, &[JsValue]) -> EvalResult + 'static,
    ) -> JsValue {
        JsValue::Object(self.create_function(JsFunction::native(name, arity, f), name, arity))
    }

    pub fn eval_source(&mut self, source: &str) -> Result<JsValue, Error> {
        let program = parser::parse(source, &self.parse_options)?;
        self.run(&program)
    }

    /// Reads `path` and evaluates it as a program in this session.
    pub fn eval_file(&mut self, path: &Path) -> Result<JsValue, Error> {
        let source = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.display().to_string(),
            source,
        })?;
        debug!("evaluating {}", path.display());
        self.eval_source(&source)
    }

    pub fn run(&mut self, program: &Program) -> Result<JsValue, Error> {
        let env = self.program_env.clone();
        let result = self.exec_program(&program.body, &env);
        self.signal = None;
        result.map_err(|e| self.exception_to_error(e))
    }

    pub fn call_function(&mut self, callee: &JsValue, this: &JsValue, args: &[JsValue]) -> Result<JsValue, Error> {
        let result = self.call(callee, this, args);
        self.signal = None;
        result.map_err(|e| self.exception_to_error(e))
    }

    pub(crate) fn exception_to_error(&mut self, exception: Exception) -> Error {
        match exception {
            Exception::Throw(value) => {
                let message = self.describe_thrown(&value);
                debug!("uncaught exception: {message}");
                Error::Uncaught { message, value }
            }
            Exception::Fatal(e) => e,
        }
    }

    /// `TypeError: msg` for error objects, the inspected value otherwise.
    pub(crate) fn describe_thrown(&self, value: &JsValue) -> String {
        inspect::inspect_value(value, false)
    }

    pub(crate) fn create_object(&self) -> JsObject {
        self.create_object_with_proto(Some(self.object_prototype.clone()))
    }

    pub(crate) fn create_object_with_proto(&self, prototype: Option<JsObject>) -> JsObject {
        JsObject::new(JsObjectData::new(prototype, ObjectKind::Ordinary))
    }

    pub(crate) fn create_array(&self, elements: Vec<JsValue>) -> JsValue {
        JsValue::Object(JsObject::new(JsObjectData::new(
            Some(self.array_prototype.clone()),
            ObjectKind::Array(elements),
        )))
    }

    /// Wraps `func` in a function object with `name`, `length` and, for
    /// constructible user functions, a fresh `prototype`.
    pub(crate) fn create_function(&mut self, func: JsFunction, name: &str, length: usize) -> JsObject {
        let needs_prototype = matches!(func, JsFunction::User { constructable: true, .. });
        let mut data = JsObjectData::new(Some(self.function_prototype.clone()), ObjectKind::Function(func));
        data.insert_property(
            "length".to_string(),
            PropertyDescriptor::data(JsValue::Number(length as f64), false, false),
        );
        data.insert_property(
            "name".to_string(),
            PropertyDescriptor::data(JsValue::from(name), false, false),
        );
        let obj = JsObject::new(data);
        if needs_prototype {
            let proto = self.create_object();
            proto
                .borrow_mut()
                .insert_builtin("constructor".to_string(), JsValue::Object(obj.clone()));
            obj.borrow_mut().insert_property(
                "prototype".to_string(),
                PropertyDescriptor::data(JsValue::Object(proto), true, false),
            );
        }
        obj
    }

    pub(crate) fn create_promise(&self, state: PromiseState) -> JsObject {
        JsObject::new(JsObjectData::new(
            Some(self.promise_prototype.clone()),
            ObjectKind::Promise(state),
        ))
    }

    pub(crate) fn create_error(&mut self, name: &str, message: impl Into<String>) -> JsValue {
        JsValue::Object(self.error_object(name, message.into()))
    }

    /// Error instance whose prototype is the one registered for `name`.
    pub(crate) fn error_object(&self, name: &str, message: String) -> JsObject {
        let prototype = self
            .error_prototypes
            .get(name)
            .cloned()
            .unwrap_or_else(|| self.object_prototype.clone());
        let mut data = JsObjectData::new(Some(prototype), ObjectKind::Error);
        if !message.is_empty() {
            data.insert_builtin("message".to_string(), JsValue::from(message));
        }
        JsObject::new(data)
    }

    pub(crate) fn type_error(&mut self, message: impl Into<String>) -> Exception {
        Exception::Throw(self.create_error("TypeError", message))
    }

    pub(crate) fn reference_error(&mut self, message: impl Into<String>) -> Exception {
        Exception::Throw(self.create_error("ReferenceError", message))
    }

    pub(crate) fn range_error(&mut self, message: impl Into<String>) -> Exception {
        Exception::Throw(self.create_error("RangeError", message))
    }

    pub(crate) fn syntax_error(&mut self, message: impl Into<String>) -> Exception {
        Exception::Throw(self.create_error("SyntaxError", message))
    }

    fn prototype_for_primitive(&self, value: &JsValue) -> Option<JsObject> {
        match value {
            JsValue::String(_) => Some(self.string_prototype.clone()),
            JsValue::Number(_) => Some(self.number_prototype.clone()),
            JsValue::Boolean(_) => Some(self.boolean_prototype.clone()),
            JsValue::BigInt(_) => Some(self.bigint_prototype.clone()),
            _ => None,
        }
    }

    /// `target[key]`, honouring getters and primitive prototypes.
    pub(crate) fn get(&mut self, target: &JsValue, key: &str) -> EvalResult {
        match target {
            JsValue::Undefined | JsValue::Null => Err(self.type_error(format!(
                "cannot read property \"{key}\" of {target}"
            ))),
            JsValue::Object(obj) => self.get_property(obj, key, target),
            JsValue::String(s) => {
                if key == "length" {
                    return Ok(JsValue::Number(s.len() as f64));
                }
                if let Some(index) = array_index(key) {
                    if index < s.len() {
                        return Ok(JsValue::String(s.slice_utf16(index, index + 1)));
                    }
                    return Ok(JsValue::Undefined);
                }
                let proto = self.string_prototype.clone();
                self.get_property(&proto, key, target)
            }
            _ => match self.prototype_for_primitive(target) {
                Some(proto) => self.get_property(&proto, key, target),
                None => Ok(JsValue::Undefined),
            },
        }
    }

    /// Looks `key` up on `obj` and its prototypes; getters see `receiver`.
    pub(crate) fn get_property(&mut self, obj: &JsObject, key: &str, receiver: &JsValue) -> EvalResult {
        let desc = obj.borrow().find_property(key);
        match desc {
            None => Ok(JsValue::Undefined),
            Some(desc) if desc.is_accessor_descriptor() => match desc.get {
                Some(getter) => self.call(&getter, receiver, &[]),
                None => Ok(JsValue::Undefined),
            },
            Some(desc) => Ok(desc.value.unwrap_or(JsValue::Undefined)),
        }
    }

    pub(crate) fn set(&mut self, target: &JsValue, key: &str, value: JsValue) -> EvalResult<()> {
        match target {
            JsValue::Undefined | JsValue::Null => Err(self.type_error(format!(
                "cannot set property \"{key}\" of {target}"
            ))),
            JsValue::Object(obj) => self.set_property(obj, key, value, target),
            // writes to primitives are dropped
            _ => Ok(()),
        }
    }

    /// Runs an inherited setter if there is one; otherwise writes an own
    /// data property on `receiver`.
    pub(crate) fn set_property(
        &mut self,
        obj: &JsObject,
        key: &str,
        value: JsValue,
        receiver: &JsValue,
    ) -> EvalResult<()> {
        let desc = obj.borrow().find_property(key);
        if let Some(desc) = desc
            && desc.is_accessor_descriptor()
        {
            if let Some(setter) = desc.set {
                self.call(&setter, receiver, &[value])?;
            }
            return Ok(());
        }
        if let JsValue::Object(target) = receiver {
            let value = if target.is_array() { self.check_array_write(key, value)? } else { value };
            target.set(key, value);
        }
        Ok(())
    }

    /// Validates a write that may grow an array; `length` is coerced to a number.
    fn check_array_write(&mut self, key: &str, value: JsValue) -> EvalResult {
        if key == "length" {
            let len = self.to_number(&value)?;
            if !(0.0..=MAX_ARRAY_LENGTH as f64).contains(&len) || len.fract() != 0.0 {
                return Err(self.range_error("Invalid array length"));
            }
            return Ok(JsValue::Number(len));
        }
        if array_index(key).is_some_and(|index| index >= MAX_ARRAY_LENGTH) {
            return Err(self.range_error("Invalid array length"));
        }
        Ok(value)
    }

    pub(crate) fn to_primitive(&mut self, value: &JsValue, preferred: PreferredType) -> EvalResult {
        let JsValue::Object(obj) = value else {
            return Ok(value.clone());
        };
        let order = match preferred {
            PreferredType::String => ["toString", "valueOf"],
            PreferredType::Number | PreferredType::Default => ["valueOf", "toString"],
        };
        for method in order {
            let func = self.get_property(obj, method, value)?;
            if is_callable(&func) {
                let result = self.call(&func, value, &[])?;
                if !result.is_object() {
                    return Ok(result);
                }
            }
        }
        Err(self.type_error("Cannot convert object to primitive value"))
    }

    pub(crate) fn to_string(&mut self, value: &JsValue) -> EvalResult<JsString> {
        Ok(match value {
            JsValue::String(s) => s.clone(),
            JsValue::Object(_) => {
                let primitive = self.to_primitive(value, PreferredType::String)?;
                return self.to_string(&primitive);
            }
            other => JsString::from_str(&other.to_string()),
        })
    }

    pub(crate) fn to_rust_string(&mut self, value: &JsValue) -> EvalResult<String> {
        Ok(self.to_string(value)?.to_rust_string())
    }

    pub(crate) fn to_number(&mut self, value: &JsValue) -> EvalResult<f64> {
        match value {
            JsValue::Object(_) => {
                let primitive = self.to_primitive(value, PreferredType::Number)?;
                self.to_number(&primitive)
            }
            other => Ok(to_number(other)),
        }
    }

    /// Number or BigInt, for arithmetic.
    pub(crate) fn to_numeric(&mut self, value: &JsValue) -> EvalResult {
        let primitive = self.to_primitive(value, PreferredType::Number)?;
        match primitive {
            JsValue::BigInt(_) => Ok(primitive),
            other => Ok(JsValue::Number(to_number(&other))),
        }
    }

    pub(crate) fn to_property_key(&mut self, value: &JsValue) -> EvalResult<String> {
        match value {
            JsValue::String(s) => Ok(s.to_rust_string()),
            JsValue::Number(n) => Ok(property_key_of_number(*n)),
            other => self.to_rust_string(other),
        }
    }

    pub(crate) fn loose_equals(&mut self, left: &JsValue, right: &JsValue) -> EvalResult<bool> {
        match (left, right) {
            (JsValue::Object(_), JsValue::Object(_)) => Ok(strict_equality(left, right)),
            (JsValue::Object(_), other) | (other, JsValue::Object(_)) if other.is_nullish() => Ok(false),
            (JsValue::Object(_), _) => {
                let left = self.to_primitive(left, PreferredType::Default)?;
                self.loose_equals(&left, right)
            }
            (_, JsValue::Object(_)) => {
                let right = self.to_primitive(right, PreferredType::Default)?;
                self.loose_equals(left, &right)
            }
            _ => Ok(primitive_loose_equality(left, right)),
        }
    }

    /// Own `name` of a function object, or `fallback`.
    pub(crate) fn function_name(value: &JsValue, fallback: &str) -> String {
        match value
            .as_object()
            .and_then(|o| o.get_own_value("name"))
        {
            Some(JsValue::String(s)) if !s.is_empty() => s.to_rust_string(),
            _ => fallback.to_string(),
        }
    }

    pub(crate) fn call(&mut self, callee: &JsValue, this: &JsValue, args: &[JsValue]) -> EvalResult {
        match callee {
            JsValue::Object(obj) if obj.is_callable() => self.call_object(obj, this, args),
            other => {
                let name = inspect::inspect_value(other, true);
                Err(self.type_error(format!("{name} is not a function")))
            }
        }
    }

    pub(crate) fn call_object(&mut self, obj: &JsObject, this: &JsValue, args: &[JsValue]) -> EvalResult {
        let func = obj.borrow().function().cloned();
        match func {
            Some(JsFunction::User {
                node,
                closure,
                home_object,
                ..
            }) => self.call_user_function(obj, &node, &closure, home_object, this, args),
            Some(JsFunction::Class(def)) => Err(self.type_error(format!(
                "Class constructor {} cannot be invoked without 'new'",
                def.name
            ))),
            Some(JsFunction::Native { func, .. }) => {
                let saved = self.new_target.take();
                let result = func(self, this, args);
                self.new_target = saved;
                result
            }
            Some(JsFunction::Bound {
                target,
                this: bound_this,
                args: bound_args,
            }) => {
                let all: Vec<JsValue> = bound_args.iter().chain(args).cloned().collect();
                self.call_object(&target, &bound_this, &all)
            }
            None => Err(self.type_error("not a function")),
        }
    }

    /// `new callee(...args)`. The caller has checked constructibility when
    /// it wants a named error message.
    pub(crate) fn construct(&mut self, callee: &JsValue, args: &[JsValue], new_target: Option<&JsObject>) -> EvalResult {
        let Some(obj) = callee.as_object().filter(|o| o.is_constructable()) else {
            let name = inspect::inspect_value(callee, true);
            return Err(self.type_error(format!("{name} is not a constructor")));
        };
        let new_target = new_target.unwrap_or(obj).clone();
        self.construct_object(obj, args, &new_target)
    }

    fn construct_object(&mut self, obj: &JsObject, args: &[JsValue], new_target: &JsObject) -> EvalResult {
        let func = obj.borrow().function().cloned();
        match func {
            Some(JsFunction::Class(def)) => self.construct_class(&def, args, new_target),
            Some(JsFunction::User {
                node,
                closure,
                home_object,
                ..
            }) => {
                let instance = JsValue::Object(self.allocate_instance(new_target)?);
                let result = self.call_user_function(obj, &node, &closure, home_object, &instance, args)?;
                Ok(if result.is_object() { result } else { instance })
            }
            Some(JsFunction::Native { func, .. }) => {
                let instance = JsValue::Object(self.allocate_instance(new_target)?);
                let saved = self.new_target.replace(new_target.clone());
                let result = func(self, &instance, args);
                self.new_target = saved;
                let result = result?;
                Ok(if result.is_object() { result } else { instance })
            }
            Some(JsFunction::Bound {
                target,
                args: bound_args,
                ..
            }) => {
                let all: Vec<JsValue> = bound_args.iter().chain(args).cloned().collect();
                let new_target = if new_target.ptr_eq(obj) { target.clone() } else { new_target.clone() };
                self.construct_object(&target, &all, &new_target)
            }
            None => Err(self.type_error("not a constructor")),
        }
    }

    /// Fresh object whose prototype is `new_target.prototype`.
    pub(crate) fn allocate_instance(&mut self, new_target: &JsObject) -> EvalResult<JsObject> {
        let proto = self.get_property(new_target, "prototype", &JsValue::Object(new_target.clone()))?;
        let proto = match proto {
            JsValue::Object(p) => p,
            _ => self.object_prototype.clone(),
        };
        Ok(self.create_object_with_proto(Some(proto)))
    }

    pub(crate) fn instance_of(&mut self, value: &JsValue, constructor: &JsValue) -> EvalResult<bool> {
        let Some(ctor) = constructor.as_object().filter(|o| o.is_callable()) else {
            return Err(self.type_error("Right-hand side of 'instanceof' is not callable"));
        };
        let bound_target = match ctor.borrow().function() {
            Some(JsFunction::Bound { target, .. }) => Some(target.clone()),
            _ => None,
        };
        if let Some(target) = bound_target {
            return self.instance_of(value, &JsValue::Object(target));
        }
        let JsValue::Object(obj) = value else {
            return Ok(false);
        };
        let proto = self.get_property(ctor, "prototype", constructor)?;
        let JsValue::Object(proto) = proto else {
            return Err(self.type_error("Function has non-object prototype in instanceof check"));
        };
        let mut current = obj.prototype();
        while let Some(p) = current {
            if p.ptr_eq(&proto) {
                return Ok(true);
            }
            current = p.prototype();
        }
        Ok(false)
    }

    /// Spreads arrays and strings; anything else is not iterable here.
    pub(crate) fn iterate_to_vec(&mut self, value: &JsValue) -> EvalResult<Vec<JsValue>> {
        match value {
            JsValue::Object(obj) => {
                if let Some(elements) = obj.borrow().array_elements() {
                    return Ok(elements.clone());
                }
            }
            JsValue::String(s) => {
                return Ok(s
                    .to_rust_string()
                    .chars()
                    .map(|c| JsValue::from(c.to_string()))
                    .collect());
            }
            _ => {}
        }
        let name = inspect::inspect_value(value, true);
        Err(self.type_error(format!("{name} is not iterable")))
    }

    /// Enumerable string keys of `obj` and its prototype chain, own first.
    pub(crate) fn for_in_keys(&self, obj: &JsObject) -> Vec<String> {
        let mut keys: Vec<String> = Vec::new();
        let mut seen = rustc_hash::FxHashSet::default();
        let mut current = Some(obj.clone());
        while let Some(o) = current {
            let data = o.borrow();
            for key in data.own_keys(false) {
                let enumerable = data.get_own_property(&key).is_some_and(|d| d.enumerable);
                if seen.insert(key.clone()) && enumerable {
                    keys.push(key);
                }
            }
            current = data.prototype.clone();
        }
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn eval(source: &str) -> JsValue {
        let mut interp = Interpreter::new();
        match interp.eval_source(source) {
            Ok(v) => v,
            Err(e) => panic!("{source}: {e}"),
        }
    }

    fn eval_str(source: &str) -> String {
        inspect(&eval(source))
    }

    #[test]
    fn arithmetic_and_strings() {
        assert_eq!(eval_str("1 + 2 * 3"), "7");
        assert_eq!(eval_str("'a' + 1 + 2"), "\"a12\"");
        assert_eq!(eval_str("2 ** 10"), "1024");
        assert_eq!(eval_str("10n ** 20n"), "100000000000000000000n");
        assert_eq!(eval_str("7 % -3"), "1");
        assert_eq!(eval_str("-7 >>> 28"), "15");
    }

    #[test]
    fn primitive_property_access() {
        assert_eq!(eval_str("'hello'.length"), "5");
        assert_eq!(eval_str("'hello'[1]"), "\"e\"");
        assert_eq!(eval_str("(255).toString(16)"), "\"ff\"");
    }

    #[test]
    fn getters_see_the_receiver() {
        let source = "
            const base = { get who() { return this.name } };
            const child = Object.create(base);
            child.name = 'child';
            child.who";
        assert_eq!(eval_str(source), "\"child\"");
    }

    #[test]
    fn setters_run_instead_of_shadowing() {
        let source = "
            let seen;
            const proto = { set value(v) { seen = v } };
            const o = Object.create(proto);
            o.value = 3;
            [seen, Object.keys(o).length]";
        assert_eq!(eval_str(source), "[ 3, 0 ]");
    }

    #[test]
    fn loose_equality_converts_objects() {
        assert_eq!(eval_str("[1] == 1"), "true");
        assert_eq!(eval_str("({}) == '[object Object]'"), "true");
        assert_eq!(eval_str("null == 0"), "false");
    }

    #[test]
    fn defined_globals_shadow_builtins() {
        let mut interp = Interpreter::new();
        interp.define_global("Math", JsValue::Number(1.0));
        let value = interp.eval_source("Math + 1").ok();
        assert!(matches!(value, Some(JsValue::Number(n)) if n == 2.0));
    }

    #[test]
    fn host_functions_are_callable() {
        let mut interp = Interpreter::new();
        let double = interp.native_function("double", 1, |interp, _this, args| {
            let n = interp.to_number(&arg(args, 0))?;
            Ok(JsValue::Number(n * 2.0))
        });
        interp.define_global("double", double.clone());
        let value = interp.eval_source("double(21)").ok();
        assert!(matches!(value, Some(JsValue::Number(n)) if n == 42.0));

        let direct = interp.call_function(&double, &JsValue::Undefined, &[JsValue::Number(4.0)]);
        assert!(matches!(direct, Ok(JsValue::Number(n)) if n == 8.0));
    }

    #[test]
    fn uncaught_errors_reach_the_host() {
        let mut interp = Interpreter::new();
        let err = interp.eval_source("null.x").err();
        match err {
            Some(Error::Uncaught { message, .. }) => {
                assert_eq!(message, "TypeError: cannot read property \"x\" of null")
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn sessions_keep_their_bindings() {
        let mut interp = Interpreter::new();
        assert!(interp.eval_source("let counter = 1; var total = 10").is_ok());
        let value = interp.eval_source("counter + total").ok();
        assert!(matches!(value, Some(JsValue::Number(n)) if n == 11.0));
    }
}

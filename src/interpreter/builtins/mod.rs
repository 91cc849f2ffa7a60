mod array;
mod number;
mod promise;
mod string;

use super::*;

/// Error constructors installed as globals, `Error` first.
const ERROR_TYPES: [&str; 5] = ["Error", "TypeError", "ReferenceError", "RangeError", "SyntaxError"];

impl Interpreter {
    pub(crate) fn setup_globals(&mut self) {
        {
            let mut global = self.global_env.borrow_mut();
            global.declare_constant("undefined", JsValue::Undefined);
            global.declare_constant("NaN", JsValue::Number(f64::NAN));
            global.declare_constant("Infinity", JsValue::Number(f64::INFINITY));
        }
        self.setup_object();
        self.setup_function_prototype();
        self.setup_errors();
        self.setup_array();
        self.setup_string();
        self.setup_number();
        self.setup_boolean();
        self.setup_bigint();
        self.setup_math();
        self.setup_global_functions();
        self.setup_promise();
        self.setup_console();
    }

    pub(crate) fn add_global(&mut self, name: &str, value: JsValue) {
        self.global_env.borrow_mut().declare_variable(name, value);
    }

    /// Installs a non-enumerable host method on `target`.
    pub(crate) fn add_method(
        &mut self,
        target: &JsObject,
        name: &str,
        arity: usize,
        f: impl Fn(&mut Interpreter, &JsValue, &[JsValue]) -> EvalResult + 'static,
    ) {
        let func = self.native_function(name, arity, f);
        target.borrow_mut().insert_builtin(name.to_string(), func);
    }

    /// Wraps `func` as the global `name` and links it with `prototype`.
    pub(crate) fn install_constructor(
        &mut self,
        func: JsFunction,
        name: &str,
        arity: usize,
        prototype: &JsObject,
    ) -> JsObject {
        let ctor = self.create_function(func, name, arity);
        ctor.borrow_mut().insert_property(
            "prototype".to_string(),
            PropertyDescriptor::data(JsValue::Object(prototype.clone()), false, false),
        );
        prototype
            .borrow_mut()
            .insert_builtin("constructor".to_string(), JsValue::Object(ctor.clone()));
        self.add_global(name, JsValue::Object(ctor.clone()));
        ctor
    }

    /// Own enumerable keys of `value` as `Object.keys` sees them.
    fn enumerable_own_keys(&mut self, value: &JsValue) -> EvalResult<Vec<String>> {
        match value {
            JsValue::Object(obj) => Ok(obj.borrow().own_keys(true)),
            JsValue::String(s) => Ok((0..s.len()).map(|i| i.to_string()).collect()),
            JsValue::Undefined | JsValue::Null => Err(self.type_error("Cannot convert undefined or null to object")),
            _ => Ok(Vec::new()),
        }
    }

    fn setup_object(&mut self) {
        let proto = self.object_prototype.clone();
        self.add_method(&proto, "hasOwnProperty", 1, |interp, this, args| {
            let key = interp.to_property_key(&arg(args, 0))?;
            match this {
                JsValue::Object(obj) => Ok(JsValue::Boolean(obj.borrow().has_own_property(&key))),
                JsValue::String(s) => Ok(JsValue::Boolean(
                    key == "length" || array_index(&key).is_some_and(|i| i < s.len()),
                )),
                JsValue::Undefined | JsValue::Null => {
                    Err(interp.type_error("Cannot convert undefined or null to object"))
                }
                _ => Ok(JsValue::Boolean(false)),
            }
        });
        self.add_method(&proto, "toString", 0, |_interp, this, _args| {
            let tag = match this {
                JsValue::Undefined => "Undefined",
                JsValue::Null => "Null",
                JsValue::Boolean(_) => "Boolean",
                JsValue::Number(_) => "Number",
                JsValue::String(_) => "String",
                JsValue::BigInt(_) => "BigInt",
                JsValue::Object(obj) => match &obj.borrow().kind {
                    ObjectKind::Array(_) => "Array",
                    ObjectKind::Function(_) => "Function",
                    ObjectKind::Error => "Error",
                    ObjectKind::Promise(_) => "Promise",
                    ObjectKind::Ordinary => "Object",
                },
            };
            Ok(JsValue::from(format!("[object {tag}]")))
        });
        self.add_method(&proto, "valueOf", 0, |interp, this, _args| {
            if this.is_nullish() {
                return Err(interp.type_error("Cannot convert undefined or null to object"));
            }
            Ok(this.clone())
        });

        let object_ctor = self.install_constructor(
            JsFunction::native_constructor("Object", 1, |interp, this, args| match arg(args, 0) {
                value @ JsValue::Object(_) => Ok(value),
                _ if interp.new_target.is_some() => Ok(this.clone()),
                _ => Ok(JsValue::Object(interp.create_object())),
            }),
            "Object",
            1,
            &proto,
        );

        self.add_method(&object_ctor, "keys", 1, |interp, _this, args| {
            let keys = interp.enumerable_own_keys(&arg(args, 0))?;
            Ok(interp.create_array(keys.into_iter().map(JsValue::from).collect()))
        });
        self.add_method(&object_ctor, "values", 1, |interp, _this, args| {
            let target = arg(args, 0);
            let keys = interp.enumerable_own_keys(&target)?;
            let mut values = Vec::with_capacity(keys.len());
            for key in keys {
                values.push(interp.get(&target, &key)?);
            }
            Ok(interp.create_array(values))
        });
        self.add_method(&object_ctor, "entries", 1, |interp, _this, args| {
            let target = arg(args, 0);
            let keys = interp.enumerable_own_keys(&target)?;
            let mut entries = Vec::with_capacity(keys.len());
            for key in keys {
                let value = interp.get(&target, &key)?;
                entries.push(interp.create_array(vec![JsValue::from(key), value]));
            }
            Ok(interp.create_array(entries))
        });
        self.add_method(&object_ctor, "assign", 2, |interp, _this, args| {
            let target = arg(args, 0);
            if !target.is_object() {
                return Err(interp.type_error("Object.assign target must be an object"));
            }
            for source in args.iter().skip(1) {
                if source.is_nullish() {
                    continue;
                }
                for key in interp.enumerable_own_keys(source)? {
                    let value = interp.get(source, &key)?;
                    interp.set(&target, &key, value)?;
                }
            }
            Ok(target)
        });
        self.add_method(&object_ctor, "getPrototypeOf", 1, |interp, _this, args| {
            let proto = match arg(args, 0) {
                JsValue::Object(obj) => obj.prototype(),
                JsValue::Undefined | JsValue::Null => {
                    return Err(interp.type_error("Cannot convert undefined or null to object"));
                }
                primitive => interp.prototype_for_primitive(&primitive),
            };
            Ok(proto.map(JsValue::Object).unwrap_or(JsValue::Null))
        });
        self.add_method(&object_ctor, "setPrototypeOf", 2, |interp, _this, args| {
            let target = arg(args, 0);
            let proto = match arg(args, 1) {
                JsValue::Object(p) => Some(p),
                JsValue::Null => None,
                other => {
                    let shown = inspect::inspect_value(&other, true);
                    return Err(interp.type_error(format!("Object prototype may only be an Object or null: {shown}")));
                }
            };
            let JsValue::Object(obj) = &target else {
                if target.is_nullish() {
                    return Err(interp.type_error("Object.setPrototypeOf called on null or undefined"));
                }
                return Ok(target);
            };
            let mut cursor = proto.clone();
            while let Some(p) = cursor {
                if p.ptr_eq(obj) {
                    return Err(interp.type_error("Cyclic __proto__ value"));
                }
                cursor = p.prototype();
            }
            obj.borrow_mut().prototype = proto;
            Ok(target)
        });
        self.add_method(&object_ctor, "create", 2, |interp, _this, args| {
            let proto = match arg(args, 0) {
                JsValue::Object(p) => Some(p),
                JsValue::Null => None,
                other => {
                    let shown = inspect::inspect_value(&other, true);
                    return Err(interp.type_error(format!("Object prototype may only be an Object or null: {shown}")));
                }
            };
            let obj = interp.create_object_with_proto(proto);
            let props = arg(args, 1);
            if !props.is_undefined() {
                for key in interp.enumerable_own_keys(&props)? {
                    let desc = interp.get(&props, &key)?;
                    interp.define_property_from(&obj, key, &desc)?;
                }
            }
            Ok(JsValue::Object(obj))
        });
        self.add_method(&object_ctor, "getOwnPropertyNames", 1, |interp, _this, args| {
            let names: Vec<String> = match arg(args, 0) {
                JsValue::Object(obj) => {
                    let data = obj.borrow();
                    let mut names = data.own_keys(false);
                    if data.array_elements().is_some() {
                        names.push("length".to_string());
                    }
                    names
                }
                JsValue::String(s) => (0..s.len()).map(|i| i.to_string()).chain(["length".to_string()]).collect(),
                JsValue::Undefined | JsValue::Null => {
                    return Err(interp.type_error("Cannot convert undefined or null to object"));
                }
                _ => Vec::new(),
            };
            Ok(interp.create_array(names.into_iter().map(JsValue::from).collect()))
        });
        self.add_method(&object_ctor, "defineProperty", 3, |interp, _this, args| {
            let target = arg(args, 0);
            let JsValue::Object(obj) = &target else {
                return Err(interp.type_error("Object.defineProperty called on non-object"));
            };
            let key = interp.to_property_key(&arg(args, 1))?;
            interp.define_property_from(obj, key, &arg(args, 2))?;
            Ok(target)
        });
    }

    /// Defines `key` on `obj` from a descriptor object. Missing attributes
    /// keep their current values, or default to false on a new property.
    fn define_property_from(&mut self, obj: &JsObject, key: String, descriptor: &JsValue) -> EvalResult<()> {
        let JsValue::Object(desc_obj) = descriptor else {
            let shown = inspect::inspect_value(descriptor, true);
            return Err(self.type_error(format!("Property description must be an object: {shown}")));
        };
        let field = |interp: &mut Interpreter, name: &str| -> EvalResult<Option<JsValue>> {
            if desc_obj.borrow().has_property(name) {
                Ok(Some(interp.get_property(desc_obj, name, descriptor)?))
            } else {
                Ok(None)
            }
        };
        let value = field(self, "value")?;
        let writable = field(self, "writable")?.map(|v| to_boolean(&v));
        let enumerable = field(self, "enumerable")?.map(|v| to_boolean(&v));
        let get = field(self, "get")?;
        let set = field(self, "set")?;

        for (accessor, which) in [(&get, "Getter"), (&set, "Setter")] {
            if let Some(f) = accessor
                && !f.is_undefined()
                && !is_callable(f)
            {
                let shown = inspect::inspect_value(f, true);
                return Err(self.type_error(format!("{which} must be a function: {shown}")));
            }
        }
        let existing = obj.borrow().get_own_property(&key);
        let enumerable = enumerable.unwrap_or_else(|| existing.as_ref().is_some_and(|d| d.enumerable));
        let desc = if get.is_some() || set.is_some() {
            if value.is_some() || writable.is_some() {
                return Err(self.type_error(
                    "Invalid property descriptor. Cannot both specify accessors and a value or writable attribute",
                ));
            }
            let get = get.or_else(|| existing.as_ref().and_then(|d| d.get.clone()));
            let set = set.or_else(|| existing.as_ref().and_then(|d| d.set.clone()));
            PropertyDescriptor::accessor(
                get.filter(|g| !g.is_undefined()),
                set.filter(|s| !s.is_undefined()),
                enumerable,
            )
        } else {
            let value = value
                .or_else(|| existing.as_ref().and_then(|d| d.value.clone()))
                .unwrap_or(JsValue::Undefined);
            let writable = writable.unwrap_or_else(|| existing.as_ref().is_some_and(|d| d.writable));
            PropertyDescriptor::data(value, writable, enumerable)
        };
        obj.borrow_mut().insert_property(key, desc);
        Ok(())
    }

    fn setup_function_prototype(&mut self) {
        let proto = self.function_prototype.clone();
        self.add_method(&proto, "call", 1, |interp, this, args| {
            let this_arg = arg(args, 0);
            interp.call(this, &this_arg, args.get(1..).unwrap_or_default())
        });
        self.add_method(&proto, "apply", 2, |interp, this, args| {
            let this_arg = arg(args, 0);
            let list = match arg(args, 1) {
                JsValue::Undefined | JsValue::Null => Vec::new(),
                JsValue::Object(obj) => interp.array_like_to_vec(&obj)?,
                _ => return Err(interp.type_error("CreateListFromArrayLike called on non-object")),
            };
            interp.call(this, &this_arg, &list)
        });
        self.add_method(&proto, "bind", 1, |interp, this, args| {
            let Some(target) = this.as_object().filter(|o| o.is_callable()) else {
                return Err(interp.type_error("Bind must be called on a function"));
            };
            let bound_args = args.get(1..).unwrap_or_default().to_vec();
            let name = format!("bound {}", Interpreter::function_name(this, ""));
            let length = match target.get_own_value("length") {
                Some(JsValue::Number(n)) => (n as usize).saturating_sub(bound_args.len()),
                _ => 0,
            };
            let func = JsFunction::Bound {
                target: target.clone(),
                this: arg(args, 0),
                args: bound_args,
            };
            Ok(JsValue::Object(interp.create_function(func, &name, length)))
        });
        self.add_method(&proto, "toString", 0, |interp, this, _args| {
            let Some(obj) = this.as_object().filter(|o| o.is_callable()) else {
                return Err(interp.type_error("Function.prototype.toString requires that 'this' be a Function"));
            };
            let name = Interpreter::function_name(this, "");
            // source text is not retained
            if obj.is_class() {
                return Ok(JsValue::from(format!("class {name} {{ }}")));
            }
            Ok(JsValue::from(format!("function {name}() {{ [native code] }}")))
        });
    }

    /// Elements of an array, or `length`-indexed values of an array-like.
    pub(crate) fn array_like_to_vec(&mut self, obj: &JsObject) -> EvalResult<Vec<JsValue>> {
        if let Some(elements) = obj.borrow().array_elements() {
            return Ok(elements.clone());
        }
        let receiver = JsValue::Object(obj.clone());
        let length = self.get_property(obj, "length", &receiver)?;
        let length = to_integer_or_infinity(self.to_number(&length)?).max(0.0);
        if length > MAX_ARRAY_LENGTH as f64 {
            return Err(self.range_error("Invalid array length"));
        }
        let length = length as usize;
        let mut values = Vec::with_capacity(length.min(1024));
        for i in 0..length {
            values.push(self.get_property(obj, &i.to_string(), &receiver)?);
        }
        Ok(values)
    }

    fn setup_errors(&mut self) {
        let mut error_ctor: Option<JsObject> = None;
        for name in ERROR_TYPES {
            let proto = match &error_ctor {
                None => self.create_object(),
                Some(_) => self.create_object_with_proto(self.error_prototypes.get("Error").cloned()),
            };
            {
                let mut p = proto.borrow_mut();
                p.insert_builtin("name".to_string(), JsValue::from(name));
                p.insert_builtin("message".to_string(), JsValue::from(""));
            }
            self.error_prototypes.insert(name, proto.clone());
            let ctor = self.install_constructor(error_function(name), name, 1, &proto);
            match &error_ctor {
                Some(base) => ctor.borrow_mut().prototype = Some(base.clone()),
                None => {
                    self.add_method(&proto, "toString", 0, |interp, this, _args| {
                        if !this.is_object() {
                            return Err(interp.type_error("Error.prototype.toString called on non-object"));
                        }
                        let name = match interp.get(this, "name")? {
                            JsValue::Undefined => "Error".to_string(),
                            v => interp.to_rust_string(&v)?,
                        };
                        let message = match interp.get(this, "message")? {
                            JsValue::Undefined => String::new(),
                            v => interp.to_rust_string(&v)?,
                        };
                        Ok(JsValue::from(match (name.is_empty(), message.is_empty()) {
                            (_, true) => name,
                            (true, false) => message,
                            (false, false) => format!("{name}: {message}"),
                        }))
                    });
                    error_ctor = Some(ctor);
                }
            }
        }
    }

    fn setup_console(&mut self) {
        let console = self.create_object();
        self.add_method(&console, "log", 0, |_interp, _this, args| {
            println!("{}", format_log_line(args));
            Ok(JsValue::Undefined)
        });
        self.add_method(&console, "error", 0, |_interp, _this, args| {
            eprintln!("{}", format_log_line(args));
            Ok(JsValue::Undefined)
        });
        self.add_global("console", JsValue::Object(console));
    }
}

/// `Error(message, options)`; with `new` it fills in the allocated instance.
fn error_function(name: &'static str) -> JsFunction {
    JsFunction::native_constructor(name, 1, move |interp, this, args| {
        let target = match (&interp.new_target, this) {
            (Some(_), JsValue::Object(obj)) => {
                obj.borrow_mut().kind = ObjectKind::Error;
                obj.clone()
            }
            _ => interp.error_object(name, String::new()),
        };
        let message = arg(args, 0);
        if !message.is_undefined() {
            let message = interp.to_string(&message)?;
            target
                .borrow_mut()
                .insert_builtin("message".to_string(), JsValue::String(message));
        }
        if let JsValue::Object(options) = arg(args, 1)
            && options.borrow().has_property("cause")
        {
            let cause = interp.get_property(&options, "cause", &JsValue::Object(options.clone()))?;
            target.borrow_mut().insert_builtin("cause".to_string(), cause);
        }
        Ok(JsValue::Object(target))
    })
}

fn format_log_line(args: &[JsValue]) -> String {
    args.iter()
        .map(|v| inspect::inspect_value(v, false))
        .collect::<Vec<_>>()
        .join(" ")
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
    fn object_statics() {
        assert_eq!(eval("Object.keys({ b: 1, a: 2, 1: 3 })"), "[ \"1\", \"b\", \"a\" ]");
        assert_eq!(eval("Object.values({ a: 1, b: 'x' })"), "[ 1, \"x\" ]");
        assert_eq!(eval("Object.entries({ a: 1 })"), "[ [ \"a\", 1 ] ]");
        assert_eq!(eval("Object.assign({ a: 1 }, null, { b: 2 }, { a: 3 })"), "{ a: 3, b: 2 }");
        assert_eq!(eval("Object.getPrototypeOf([]) === Array.prototype"), "true");
        assert_eq!(eval("Object.getOwnPropertyNames([1])"), "[ \"0\", \"length\" ]");
    }

    #[test]
    fn prototypes_can_be_replaced_and_created() {
        assert_eq!(eval("const o = Object.create(null); Object.getPrototypeOf(o)"), "null");
        assert_eq!(eval("const p = { x: 1 }; Object.create(p).x"), "1");
        assert_eq!(eval("const a = {}; const b = Object.create(a); try { Object.setPrototypeOf(a, b) } catch (e) { e.message }"), "\"Cyclic __proto__ value\"");
        assert_eq!(eval("Object.setPrototypeOf({}, { y: 2 }).y"), "2");
    }

    #[test]
    fn define_property() {
        let source = "
            const o = {};
            Object.defineProperty(o, 'hidden', { value: 1 });
            Object.defineProperty(o, 'shown', { value: 2, enumerable: true, writable: true });
            o.hidden = 5;
            [o.hidden, Object.keys(o), o.hasOwnProperty('hidden')]";
        assert_eq!(eval(source), "[ 1, [ \"shown\" ], true ]");
        assert_eq!(eval("const o = {}; Object.defineProperty(o, 'x', { get() { return 7 } }); o.x"), "7");
        assert_eq!(
            eval("try { Object.defineProperty({}, 'x', { get: 1 }) } catch (e) { e.message }"),
            "\"Getter must be a function: 1\""
        );
    }

    #[test]
    fn object_prototype_methods() {
        assert_eq!(eval("[Object.prototype.toString.call([]), ({}).toString(), String({})]"), "[ \"[object Array]\", \"[object Object]\", \"[object Object]\" ]");
        assert_eq!(eval("'abc'.hasOwnProperty('1')"), "true");
    }

    #[test]
    fn function_prototype_methods() {
        assert_eq!(eval("function f(a, b) { return [this.v, a, b] } f.call({ v: 1 }, 2, 3)"), "[ 1, 2, 3 ]");
        assert_eq!(eval("function f(a, b) { return a + b } f.apply(null, [2, 3])"), "5");
        let bound = "function f(a, b) { return [this.v, a, b] } const g = f.bind({ v: 1 }, 2); [g(3), g.name, g.length]";
        assert_eq!(eval(bound), "[ [ 1, 2, 3 ], \"bound f\", 1 ]");
        assert_eq!(eval("function P(x) { this.x = x } const B = P.bind(null, 4); new B() instanceof P"), "true");
    }

    #[test]
    fn error_types() {
        assert_eq!(eval("new RangeError('r') instanceof Error"), "true");
        assert_eq!(eval("TypeError('t').message"), "\"t\"");
        assert_eq!(eval("String(new ReferenceError('x'))"), "\"ReferenceError: x\"");
        assert_eq!(eval("new Error('e', { cause: 1 }).cause"), "1");
        assert_eq!(eval("Object.getPrototypeOf(SyntaxError) === Error"), "true");
        assert_eq!(eval("try { null.x } catch (e) { e.constructor === TypeError }"), "true");
    }

    #[test]
    fn global_constants() {
        assert_eq!(eval("[undefined, NaN, Infinity, typeof console.log]"), "[ undefined, NaN, Infinity, \"function\" ]");
    }
}

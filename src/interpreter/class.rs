use super::*;
use log::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum MethodKind {
    Method,
    Get,
    Set,
}

enum StaticElement<'a> {
    Field(String, Option<&'a Rc<Expression>>),
    Block(&'a [Statement]),
}

impl Interpreter {
    pub(crate) fn make_class(&mut self, node: &ClassNode, env: &EnvRef, name_hint: &str) -> EvalResult<JsObject> {
        let name = node.name.clone().unwrap_or_else(|| name_hint.to_string());
        debug!("defining class {name}");
        let class_env = Environment::new_block(env);

        let (parent, proto_parent) = match &node.super_class {
            None => (None, Some(self.object_prototype.clone())),
            Some(expr) => match self.evaluate(expr, &class_env)? {
                JsValue::Null => (None, None),
                JsValue::Object(p) if p.is_constructable() => {
                    let receiver = JsValue::Object(p.clone());
                    match self.get_property(&p, "prototype", &receiver)? {
                        JsValue::Object(proto) => (Some(p), Some(proto)),
                        JsValue::Null => (Some(p), None),
                        _ => {
                            return Err(self.type_error(
                                "Class extends value does not have valid prototype property",
                            ));
                        }
                    }
                }
                other => {
                    let shown = inspect::inspect_value(&other, true);
                    return Err(self.type_error(format!(
                        "Class extends value {shown} is not a constructor or null"
                    )));
                }
            },
        };
        let prototype = self.create_object_with_proto(proto_parent);

        // every computed key is evaluated once, in source order
        let mut fields = Vec::new();
        let mut methods = Vec::new();
        let mut statics = Vec::new();
        for element in &node.body {
            match element {
                ClassElement::Method(m) if m.kind == ClassMethodKind::Constructor => {}
                ClassElement::Method(m) => {
                    let key = self.eval_property_key(&m.key, &class_env)?;
                    methods.push((key, m));
                }
                ClassElement::Field(f) => {
                    let key = self.eval_property_key(&f.key, &class_env)?;
                    if f.is_static {
                        statics.push(StaticElement::Field(key, f.value.as_ref()));
                    } else {
                        fields.push(FieldDefinition {
                            key,
                            initializer: f.value.clone(),
                        });
                    }
                }
                ClassElement::StaticBlock(body) => statics.push(StaticElement::Block(body)),
            }
        }

        let constructor = node.constructor().cloned();
        let length = constructor.as_ref().map_or(0, |c| c.expected_argument_count());
        let definition = Rc::new(ClassDefinition {
            name: name.clone(),
            constructor,
            parent: parent.clone(),
            prototype: prototype.clone(),
            fields,
            env: class_env.clone(),
        });
        let class = self.create_function(JsFunction::Class(definition), &name, length);
        if let Some(parent) = parent {
            class.borrow_mut().prototype = Some(parent);
        }
        class.borrow_mut().insert_property(
            "prototype".to_string(),
            PropertyDescriptor::data(JsValue::Object(prototype.clone()), false, false),
        );
        prototype
            .borrow_mut()
            .insert_builtin("constructor".to_string(), JsValue::Object(class.clone()));

        for (key, method) in methods {
            let target = if method.is_static { &class } else { &prototype };
            let kind = match method.kind {
                ClassMethodKind::Get => MethodKind::Get,
                ClassMethodKind::Set => MethodKind::Set,
                _ => MethodKind::Method,
            };
            self.define_method(target, key, kind, &method.value, &class_env, false)?;
        }

        if let Some(inner_name) = &node.name {
            class_env
                .borrow_mut()
                .declare_constant(inner_name, JsValue::Object(class.clone()));
        }

        let class_value = JsValue::Object(class.clone());
        for element in statics {
            let frame = self.initializer_frame(&class_env, class_value.clone(), &class);
            match element {
                StaticElement::Field(key, initializer) => {
                    let value = match initializer {
                        Some(init) => self.evaluate_named(init, &frame, &key)?,
                        None => JsValue::Undefined,
                    };
                    class.borrow_mut().insert_value(key, value);
                }
                StaticElement::Block(body) => {
                    self.hoist(body, &frame)?;
                    self.exec_statements(body, &frame)?;
                    self.signal = None;
                }
            }
        }
        Ok(class)
    }

    /// Installs a method or accessor on `target`, with `target` as its home
    /// object. A getter and setter of the same key share one property.
    pub(crate) fn define_method(
        &mut self,
        target: &JsObject,
        key: String,
        kind: MethodKind,
        node: &Rc<FunctionNode>,
        env: &EnvRef,
        enumerable: bool,
    ) -> EvalResult<()> {
        let fn_name = match kind {
            MethodKind::Method => key.clone(),
            MethodKind::Get => format!("get {key}"),
            MethodKind::Set => format!("set {key}"),
        };
        let func = JsValue::Object(self.make_function(node, env, &fn_name, Some(target.clone()))?);
        let existing = target
            .borrow()
            .properties
            .get(&key)
            .filter(|d| d.is_accessor_descriptor())
            .cloned();
        let desc = match kind {
            MethodKind::Method => PropertyDescriptor::data(func, true, enumerable),
            MethodKind::Get => PropertyDescriptor::accessor(Some(func), existing.and_then(|d| d.set), enumerable),
            MethodKind::Set => PropertyDescriptor::accessor(existing.and_then(|d| d.get), Some(func), enumerable),
        };
        target.borrow_mut().insert_property(key, desc);
        Ok(())
    }

    /// Frame for field initializers and static blocks.
    fn initializer_frame(&self, class_env: &EnvRef, this: JsValue, home: &JsObject) -> EnvRef {
        let frame = Environment::new(Some(class_env.clone()), ScopeKind::Function);
        {
            let mut f = frame.borrow_mut();
            f.this = Some(ThisBinding::Bound(this));
            f.home_object = Some(home.clone());
        }
        frame
    }

    pub(crate) fn construct_class(
        &mut self,
        def: &Rc<ClassDefinition>,
        args: &[JsValue],
        new_target: &JsObject,
    ) -> EvalResult {
        debug!("constructing {}", def.name);
        let Some(ctor) = &def.constructor else {
            let instance = match &def.parent {
                Some(parent) => match self.construct_object(parent, args, new_target)? {
                    JsValue::Object(instance) => instance,
                    _ => return Err(self.type_error("Derived constructors may only return object or undefined")),
                },
                None => self.allocate_instance(new_target)?,
            };
            self.initialize_fields(def, &instance)?;
            return Ok(JsValue::Object(instance));
        };

        let frame = Environment::new(Some(def.env.clone()), ScopeKind::Function);
        let arguments = self.create_array(args.to_vec());
        {
            let mut f = frame.borrow_mut();
            f.home_object = Some(def.prototype.clone());
            f.declare_constant("arguments", arguments);
        }
        if def.parent.is_some() {
            let mut f = frame.borrow_mut();
            f.this = Some(ThisBinding::Uninitialized);
            f.super_call = Some(SuperCall {
                class: def.clone(),
                new_target: new_target.clone(),
            });
        } else {
            let instance = self.allocate_instance(new_target)?;
            frame.borrow_mut().this = Some(ThisBinding::Bound(JsValue::Object(instance.clone())));
            self.initialize_fields(def, &instance)?;
        }

        let result = self.run_function(ctor, &frame, args)?;
        if result.is_object() {
            return Ok(result);
        }
        let this = frame.borrow().this.clone();
        match this {
            Some(ThisBinding::Bound(instance)) => Ok(instance),
            _ => Err(self.reference_error(
                "Must call super constructor in derived class before accessing 'this' or returning from derived constructor",
            )),
        }
    }

    /// Runs this class's field initializers against `instance`, in order.
    fn initialize_fields(&mut self, def: &ClassDefinition, instance: &JsObject) -> EvalResult<()> {
        for field in &def.fields {
            let value = match &field.initializer {
                Some(init) => {
                    let frame = self.initializer_frame(&def.env, JsValue::Object(instance.clone()), &def.prototype);
                    self.evaluate_named(init, &frame, &field.key)?
                }
                None => JsValue::Undefined,
            };
            instance.borrow_mut().insert_value(field.key.clone(), value);
        }
        Ok(())
    }

    pub(crate) fn eval_super_call(&mut self, args: &[Expression], env: &EnvRef) -> EvalResult {
        let Some(frame) = Environment::find(env, |f| f.super_call.is_some()) else {
            return Err(self.type_error("must call super in class constructor"));
        };
        let args = self.evaluate_arguments(args, env)?;
        let (def, new_target, already_bound) = {
            let f = frame.borrow();
            let Some(call) = &f.super_call else {
                return Err(self.type_error("must call super in class constructor"));
            };
            (
                call.class.clone(),
                call.new_target.clone(),
                matches!(f.this, Some(ThisBinding::Bound(_))),
            )
        };
        if already_bound {
            return Err(self.reference_error("Super constructor may only be called once"));
        }
        let Some(parent) = &def.parent else {
            return Err(self.type_error("Super constructor null of anonymous class is not a constructor"));
        };
        let instance = self.construct_object(parent, &args, &new_target)?;
        let JsValue::Object(obj) = &instance else {
            return Err(self.type_error("super constructor did not return an object"));
        };
        frame.borrow_mut().this = Some(ThisBinding::Bound(instance.clone()));
        self.initialize_fields(&def, obj)?;
        Ok(instance)
    }

    pub(crate) fn this_value(&mut self, env: &EnvRef) -> EvalResult {
        let binding = Environment::find(env, |f| f.this.is_some()).and_then(|f| f.borrow().this.clone());
        match binding {
            Some(ThisBinding::Bound(value)) => Ok(value),
            Some(ThisBinding::Uninitialized) => Err(self.type_error("must call super first")),
            None => Ok(JsValue::Undefined),
        }
    }

    /// Where `super.x` starts looking: the prototype of the home object.
    fn super_base(&mut self, env: &EnvRef) -> EvalResult<Option<JsObject>> {
        let home = Environment::find(env, |f| f.home_object.is_some()).and_then(|f| f.borrow().home_object.clone());
        match home {
            Some(home) => Ok(home.prototype()),
            None => Err(self.syntax_error("'super' keyword unexpected here")),
        }
    }

    pub(crate) fn get_super_property(&mut self, key: &str, env: &EnvRef) -> EvalResult {
        let base = self.super_base(env)?;
        let this = self.this_value(env)?;
        match base {
            Some(proto) => self.get_property(&proto, key, &this),
            None => Ok(JsValue::Undefined),
        }
    }

    /// `super.x = v` runs an inherited setter or writes `x` on `this`.
    pub(crate) fn set_super_property(&mut self, key: &str, value: JsValue, env: &EnvRef) -> EvalResult<()> {
        let base = self.super_base(env)?;
        let this = self.this_value(env)?;
        match base {
            Some(proto) => self.set_property(&proto, key, value, &this),
            None => self.set(&this, key, value),
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
    fn fields_run_before_the_constructor_body() {
        let source = "
            const order = [];
            class A { a = order.push('field'); constructor() { order.push('body') } }
            new A();
            order";
        assert_eq!(eval(source), "[ \"field\", \"body\" ]");
    }

    #[test]
    fn derived_fields_run_after_super_returns() {
        let source = "
            const order = [];
            class A { a = order.push('A field'); constructor() { order.push('A body') } }
            class B extends A {
                b = order.push('B field');
                constructor() { order.push('before super'); super(); order.push('after super') }
            }
            new B();
            order";
        assert_eq!(
            eval(source),
            "[ \"before super\", \"A field\", \"A body\", \"B field\", \"after super\" ]"
        );
    }

    #[test]
    fn this_before_super_is_a_type_error() {
        let source = "
            class A {}
            class B extends A { constructor() { this.x = 1; super() } }
            try { new B() } catch (e) { e.message }";
        assert_eq!(eval(source), "\"must call super first\"");
    }

    #[test]
    fn super_twice_and_missing_super() {
        let twice = "
            class A {}
            class B extends A { constructor() { super(); super() } }
            try { new B() } catch (e) { e instanceof ReferenceError }";
        assert_eq!(eval(twice), "true");
        let missing = "
            class A {}
            class B extends A { constructor() {} }
            try { new B() } catch (e) { e instanceof ReferenceError }";
        assert_eq!(eval(missing), "true");
    }

    #[test]
    fn returning_an_object_replaces_the_instance() {
        assert_eq!(eval("class A { constructor() { return { replaced: true } } } new A().replaced"), "true");
        assert_eq!(eval("class A { constructor() { return 1 } } new A() instanceof A"), "true");
    }

    #[test]
    fn implicit_derived_constructor_forwards_arguments() {
        let source = "
            class A { constructor(x, y) { this.sum = x + y } }
            class B extends A {}
            new B(2, 3).sum";
        assert_eq!(eval(source), "5");
    }

    #[test]
    fn super_property_lookup() {
        let source = "
            class A { greet() { return 'A' } static make() { return 'static A' } }
            class B extends A {
                greet() { return super.greet() + 'B' }
                static make() { return super.make() + ' via B' }
            }
            [new B().greet(), B.make()]";
        assert_eq!(eval(source), "[ \"AB\", \"static A via B\" ]");
    }

    #[test]
    fn accessors_and_static_blocks() {
        let source = "
            class T {
                static count;
                static { this.count = 10 }
                constructor() { this._v = 1 }
                get v() { return this._v }
                set v(x) { this._v = x * 2 }
            }
            const t = new T();
            t.v = 5;
            [T.count, t.v, Object.keys(T.prototype).length]";
        assert_eq!(eval(source), "[ 10, 10, 0 ]");
    }

    #[test]
    fn calling_a_class_without_new_fails() {
        assert_eq!(
            eval("class A {} try { A() } catch (e) { e.message }"),
            "\"Class constructor A cannot be invoked without 'new'\""
        );
    }

    #[test]
    fn classes_extend_error() {
        let source = "
            class MyError extends Error {
                constructor(message) { super(message); this.name = 'MyError' }
            }
            const e = new MyError('boom');
            [e instanceof MyError, e instanceof Error, e.message, String(e)]";
        assert_eq!(eval(source), "[ true, true, \"boom\", \"MyError: boom\" ]");
    }

    #[test]
    fn inner_name_binding_is_constant() {
        let source = "
            class A { static rename() { A = 1 } }
            try { A.rename() } catch (e) { e.message }";
        assert_eq!(eval(source), "\"Assignment to constant variable.\"");
    }

    #[test]
    fn extending_a_non_constructor_fails() {
        assert_eq!(
            eval("try { class A extends 1 {} } catch (e) { e.message }"),
            "\"Class extends value 1 is not a constructor or null\""
        );
    }
}

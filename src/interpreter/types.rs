use crate::ast::{Expression, FunctionNode};
use crate::error::Error;
use crate::types::JsValue;
use rustc_hash::FxHashMap;
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

/// Non-local control flow in flight. At most one is live at a time; the
/// nearest construct that handles it takes it out of the interpreter.
#[derive(Clone, Debug)]
pub enum Signal {
    Return(JsValue),
    Break(Option<String>),
    Continue(Option<String>),
    AwaitSuspend(JsValue),
}

#[derive(Debug)]
pub enum Exception {
    /// A JavaScript value in flight; `try` can catch it.
    Throw(JsValue),
    /// Structural failure; never observable by evaluated code.
    Fatal(Error),
}

impl From<Error> for Exception {
    fn from(e: Error) -> Self {
        Exception::Fatal(e)
    }
}

pub type EvalResult<T = JsValue> = Result<T, Exception>;

pub type EnvRef = Rc<RefCell<Environment>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScopeKind {
    Global,
    Function,
    Block,
}

#[derive(Clone, Debug)]
pub enum ThisBinding {
    Bound(JsValue),
    /// Derived constructor before `super()` returned.
    Uninitialized,
}

/// What `super(...)` needs inside a derived constructor.
#[derive(Clone, Debug)]
pub struct SuperCall {
    pub class: Rc<ClassDefinition>,
    pub new_target: JsObject,
}

#[derive(Debug)]
pub enum AssignError {
    Constant,
    Undeclared,
}

#[derive(Debug)]
pub struct Environment {
    variables: FxHashMap<String, JsValue>,
    constants: FxHashMap<String, JsValue>,
    parent: Option<EnvRef>,
    pub kind: ScopeKind,
    pub this: Option<ThisBinding>,
    pub super_call: Option<SuperCall>,
    pub home_object: Option<JsObject>,
}

impl Environment {
    pub fn new(parent: Option<EnvRef>, kind: ScopeKind) -> EnvRef {
        Rc::new(RefCell::new(Environment {
            variables: FxHashMap::default(),
            constants: FxHashMap::default(),
            parent,
            kind,
            this: None,
            super_call: None,
            home_object: None,
        }))
    }

    pub fn new_block(parent: &EnvRef) -> EnvRef {
        Self::new(Some(parent.clone()), ScopeKind::Block)
    }

    pub fn parent(&self) -> Option<&EnvRef> {
        self.parent.as_ref()
    }

    pub fn declare_variable(&mut self, name: &str, value: JsValue) {
        self.constants.remove(name);
        self.variables.insert(name.to_string(), value);
    }

    pub fn declare_constant(&mut self, name: &str, value: JsValue) {
        self.variables.remove(name);
        self.constants.insert(name.to_string(), value);
    }

    pub fn has_own(&self, name: &str) -> bool {
        self.constants.contains_key(name) || self.variables.contains_key(name)
    }

    fn get_own(&self, name: &str) -> Option<JsValue> {
        self.constants
            .get(name)
            .or_else(|| self.variables.get(name))
            .cloned()
    }

    pub fn lookup(env: &EnvRef, name: &str) -> Option<JsValue> {
        let mut current = env.clone();
        loop {
            let next = {
                let frame = current.borrow();
                if let Some(value) = frame.get_own(name) {
                    return Some(value);
                }
                frame.parent.clone()?
            };
            current = next;
        }
    }

    pub fn assign(env: &EnvRef, name: &str, value: JsValue) -> Result<(), AssignError> {
        let mut current = env.clone();
        loop {
            let next = {
                let mut frame = current.borrow_mut();
                if frame.constants.contains_key(name) {
                    return Err(AssignError::Constant);
                }
                if let Some(slot) = frame.variables.get_mut(name) {
                    *slot = value;
                    return Ok(());
                }
                frame.parent.clone()
            };
            match next {
                Some(parent) => current = parent,
                None => return Err(AssignError::Undeclared),
            }
        }
    }

    /// Innermost frame satisfying `pred`.
    pub fn find(env: &EnvRef, pred: impl Fn(&Environment) -> bool) -> Option<EnvRef> {
        let mut current = env.clone();
        loop {
            let next = {
                let frame = current.borrow();
                if pred(&frame) {
                    drop(frame);
                    return Some(current);
                }
                frame.parent.clone()?
            };
            current = next;
        }
    }

    /// Target frame of `var`: the nearest function or global frame.
    pub fn var_scope(env: &EnvRef) -> EnvRef {
        Self::find(env, |f| f.kind != ScopeKind::Block).unwrap_or_else(|| env.clone())
    }
}

pub type NativeFn = Rc<dyn Fn(&mut super::Interpreter, &JsValue, &[JsValue]) -> EvalResult>;

pub enum JsFunction {
    User {
        node: Rc<FunctionNode>,
        closure: EnvRef,
        home_object: Option<JsObject>,
        constructable: bool,
    },
    Class(Rc<ClassDefinition>),
    Native {
        name: String,
        arity: usize,
        func: NativeFn,
        constructable: bool,
    },
    Bound {
        target: JsObject,
        this: JsValue,
        args: Vec<JsValue>,
    },
}

impl JsFunction {
    pub fn native(
        name: impl Into<String>,
        arity: usize,
        f: impl Fn(&mut super::Interpreter, &JsValue, &[JsValue]) -> EvalResult + 'static,
    ) -> Self {
        JsFunction::Native {
            name: name.into(),
            arity,
            func: Rc::new(f),
            constructable: false,
        }
    }

    pub fn native_constructor(
        name: impl Into<String>,
        arity: usize,
        f: impl Fn(&mut super::Interpreter, &JsValue, &[JsValue]) -> EvalResult + 'static,
    ) -> Self {
        JsFunction::Native {
            name: name.into(),
            arity,
            func: Rc::new(f),
            constructable: true,
        }
    }

    pub fn is_constructable(&self) -> bool {
        match self {
            JsFunction::User { constructable, .. } | JsFunction::Native { constructable, .. } => *constructable,
            JsFunction::Class(_) => true,
            JsFunction::Bound { target, .. } => target.is_constructable(),
        }
    }
}

impl Clone for JsFunction {
    fn clone(&self) -> Self {
        match self {
            JsFunction::User {
                node,
                closure,
                home_object,
                constructable,
            } => JsFunction::User {
                node: node.clone(),
                closure: closure.clone(),
                home_object: home_object.clone(),
                constructable: *constructable,
            },
            JsFunction::Class(def) => JsFunction::Class(def.clone()),
            JsFunction::Native {
                name,
                arity,
                func,
                constructable,
            } => JsFunction::Native {
                name: name.clone(),
                arity: *arity,
                func: func.clone(),
                constructable: *constructable,
            },
            JsFunction::Bound { target, this, args } => JsFunction::Bound {
                target: target.clone(),
                this: this.clone(),
                args: args.clone(),
            },
        }
    }
}

impl fmt::Debug for JsFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsFunction::User { node, .. } => write!(f, "JsFunction::User({:?})", node.name),
            JsFunction::Class(def) => write!(f, "JsFunction::Class({:?})", def.name),
            JsFunction::Native { name, arity, .. } => write!(f, "JsFunction::Native({name:?}, {arity})"),
            JsFunction::Bound { .. } => write!(f, "JsFunction::Bound"),
        }
    }
}

/// Everything `new` needs to build an instance of a class.
pub struct ClassDefinition {
    pub name: String,
    pub constructor: Option<Rc<FunctionNode>>,
    /// Superclass constructor; `None` for base classes.
    pub parent: Option<JsObject>,
    pub prototype: JsObject,
    pub fields: Vec<FieldDefinition>,
    /// Class scope: holds the inner name binding.
    pub env: EnvRef,
}

impl fmt::Debug for ClassDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassDefinition")
            .field("name", &self.name)
            .field("fields", &self.fields.len())
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub struct FieldDefinition {
    pub key: String,
    pub initializer: Option<Rc<Expression>>,
}

#[derive(Clone, Debug)]
pub struct PropertyDescriptor {
    pub value: Option<JsValue>,
    pub get: Option<JsValue>,
    pub set: Option<JsValue>,
    pub writable: bool,
    pub enumerable: bool,
}

impl PropertyDescriptor {
    pub fn data(value: JsValue, writable: bool, enumerable: bool) -> Self {
        Self {
            value: Some(value),
            get: None,
            set: None,
            writable,
            enumerable,
        }
    }

    pub fn data_default(value: JsValue) -> Self {
        Self::data(value, true, true)
    }

    pub fn accessor(get: Option<JsValue>, set: Option<JsValue>, enumerable: bool) -> Self {
        Self {
            value: None,
            get,
            set,
            writable: false,
            enumerable,
        }
    }

    pub fn is_accessor_descriptor(&self) -> bool {
        self.get.is_some() || self.set.is_some()
    }
}

pub struct PromiseReaction {
    pub on_fulfilled: JsValue,
    pub on_rejected: JsValue,
    pub derived: JsObject,
}

pub enum PromiseState {
    Pending(Vec<PromiseReaction>),
    Fulfilled(JsValue),
    Rejected(JsValue),
}

pub enum ObjectKind {
    Ordinary,
    Array(Vec<JsValue>),
    Function(JsFunction),
    Error,
    Promise(PromiseState),
}

pub struct JsObjectData {
    pub properties: FxHashMap<String, PropertyDescriptor>,
    pub property_order: Vec<String>,
    pub prototype: Option<JsObject>,
    pub kind: ObjectKind,
    pub class_name: String,
}

impl JsObjectData {
    pub(crate) fn new(prototype: Option<JsObject>, kind: ObjectKind) -> Self {
        let class_name = match &kind {
            ObjectKind::Ordinary => "Object",
            ObjectKind::Array(_) => "Array",
            ObjectKind::Function(_) => "Function",
            ObjectKind::Error => "Error",
            ObjectKind::Promise(_) => "Promise",
        };
        Self {
            properties: FxHashMap::default(),
            property_order: Vec::new(),
            prototype,
            kind,
            class_name: class_name.to_string(),
        }
    }

    pub fn array_elements(&self) -> Option<&Vec<JsValue>> {
        match &self.kind {
            ObjectKind::Array(elements) => Some(elements),
            _ => None,
        }
    }

    pub fn array_elements_mut(&mut self) -> Option<&mut Vec<JsValue>> {
        match &mut self.kind {
            ObjectKind::Array(elements) => Some(elements),
            _ => None,
        }
    }

    pub fn function(&self) -> Option<&JsFunction> {
        match &self.kind {
            ObjectKind::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Own property, including array elements and `length`.
    pub fn get_own_property(&self, key: &str) -> Option<PropertyDescriptor> {
        if let Some(elements) = self.array_elements() {
            if key == "length" {
                return Some(PropertyDescriptor::data(
                    JsValue::Number(elements.len() as f64),
                    true,
                    false,
                ));
            }
            if let Some(index) = array_index(key) {
                return elements
                    .get(index)
                    .map(|v| PropertyDescriptor::data_default(v.clone()));
            }
        }
        self.properties.get(key).cloned()
    }

    pub fn has_own_property(&self, key: &str) -> bool {
        self.get_own_property(key).is_some()
    }

    /// Walks the prototype chain.
    pub fn find_property(&self, key: &str) -> Option<PropertyDescriptor> {
        if let Some(desc) = self.get_own_property(key) {
            return Some(desc);
        }
        let mut proto = self.prototype.clone();
        while let Some(p) = proto {
            let data = p.borrow();
            if let Some(desc) = data.get_own_property(key) {
                return Some(desc);
            }
            proto = data.prototype.clone();
        }
        None
    }

    pub fn has_property(&self, key: &str) -> bool {
        self.find_property(key).is_some()
    }

    /// Plain data write of an own property, bypassing setters.
    pub fn set_own_value(&mut self, key: &str, value: JsValue) {
        if let Some(elements) = self.array_elements_mut() {
            if let Some(index) = array_index(key) {
                if index >= MAX_ARRAY_LENGTH {
                    return;
                }
                if index >= elements.len() {
                    elements.resize(index + 1, JsValue::Undefined);
                }
                elements[index] = value;
                return;
            }
            if key == "length" {
                let len = match value {
                    JsValue::Number(n) if n >= 0.0 && n.fract() == 0.0 && n <= MAX_ARRAY_LENGTH as f64 => n as usize,
                    _ => return,
                };
                elements.resize(len, JsValue::Undefined);
                return;
            }
        }
        match self.properties.get_mut(key) {
            Some(desc) if desc.is_accessor_descriptor() => {}
            Some(desc) => {
                if desc.writable {
                    desc.value = Some(value);
                }
            }
            None => self.insert_value(key.to_string(), value),
        }
    }

    pub fn insert_value(&mut self, key: String, value: JsValue) {
        self.insert_property(key, PropertyDescriptor::data_default(value));
    }

    /// Non-enumerable data property, the way host methods are installed.
    pub fn insert_builtin(&mut self, key: String, value: JsValue) {
        self.insert_property(key, PropertyDescriptor::data(value, true, false));
    }

    pub fn insert_property(&mut self, key: String, desc: PropertyDescriptor) {
        if let Some(elements) = self.array_elements_mut() {
            if let Some(index) = array_index(&key) {
                if let Some(value) = desc.value
                    && index < MAX_ARRAY_LENGTH
                {
                    if index >= elements.len() {
                        elements.resize(index + 1, JsValue::Undefined);
                    }
                    elements[index] = value;
                }
                return;
            }
        }
        if !self.properties.contains_key(&key) {
            self.property_order.push(key.clone());
        }
        self.properties.insert(key, desc);
    }

    pub fn remove_property(&mut self, key: &str) -> bool {
        if let Some(elements) = self.array_elements_mut() {
            if let Some(index) = array_index(key) {
                if index < elements.len() {
                    elements[index] = JsValue::Undefined;
                }
                return true;
            }
            if key == "length" {
                return false;
            }
        }
        if self.properties.remove(key).is_some() {
            self.property_order.retain(|k| k != key);
        }
        true
    }

    /// Own keys: integer keys ascending, then the rest in insertion order.
    pub fn own_keys(&self, only_enumerable: bool) -> Vec<String> {
        let mut integers: Vec<(u32, String)> = Vec::new();
        let mut others = Vec::new();
        if let Some(elements) = self.array_elements() {
            integers.extend((0..elements.len()).map(|i| (i as u32, i.to_string())));
        }
        for key in &self.property_order {
            let Some(desc) = self.properties.get(key) else {
                continue;
            };
            if only_enumerable && !desc.enumerable {
                continue;
            }
            match array_index(key) {
                Some(i) => integers.push((i as u32, key.clone())),
                None => others.push(key.clone()),
            }
        }
        integers.sort_by_key(|(i, _)| *i);
        integers.into_iter().map(|(_, k)| k).chain(others).collect()
    }
}

/// Arrays are stored densely; no array may grow past this many elements.
pub const MAX_ARRAY_LENGTH: usize = 1 << 22;

/// Canonical array index: `"0"`, `"17"`, never `"01"` or `"-1"`.
pub fn array_index(key: &str) -> Option<usize> {
    if key.is_empty() || (key.len() > 1 && key.starts_with('0')) {
        return None;
    }
    if !key.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    key.parse::<u32>().ok().filter(|&i| i != u32::MAX).map(|i| i as usize)
}

/// Shared handle to a heap object; clones alias the same object.
#[derive(Clone)]
pub struct JsObject(Rc<RefCell<JsObjectData>>);

impl JsObject {
    pub fn new(data: JsObjectData) -> Self {
        JsObject(Rc::new(RefCell::new(data)))
    }

    pub fn borrow(&self) -> Ref<'_, JsObjectData> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, JsObjectData> {
        self.0.borrow_mut()
    }

    pub fn ptr_eq(&self, other: &JsObject) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn is_callable(&self) -> bool {
        matches!(self.borrow().kind, ObjectKind::Function(_))
    }

    pub fn is_constructable(&self) -> bool {
        self.borrow().function().is_some_and(JsFunction::is_constructable)
    }

    pub fn is_array(&self) -> bool {
        matches!(self.borrow().kind, ObjectKind::Array(_))
    }

    pub fn is_class(&self) -> bool {
        matches!(self.borrow().kind, ObjectKind::Function(JsFunction::Class(_)))
    }

    pub fn prototype(&self) -> Option<JsObject> {
        self.borrow().prototype.clone()
    }

    /// Own data value without running getters.
    pub fn get_own_value(&self, key: &str) -> Option<JsValue> {
        self.borrow().get_own_property(key).and_then(|d| d.value)
    }

    pub fn set(&self, key: &str, value: JsValue) {
        self.borrow_mut().set_own_value(key, value);
    }
}

impl fmt::Debug for JsObject {
    // never recurse: object graphs are routinely cyclic
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(data) => write!(f, "[object {}]", data.class_name),
            Err(_) => write!(f, "[object]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn declaring_moves_names_between_maps() {
        let env = Environment::new(None, ScopeKind::Global);
        env.borrow_mut().declare_constant("x", JsValue::Number(1.0));
        env.borrow_mut().declare_variable("x", JsValue::Number(2.0));
        assert!(Environment::assign(&env, "x", JsValue::Number(3.0)).is_ok());
        assert!(matches!(Environment::lookup(&env, "x"), Some(JsValue::Number(n)) if n == 3.0));

        env.borrow_mut().declare_constant("x", JsValue::Number(4.0));
        assert!(matches!(
            Environment::assign(&env, "x", JsValue::Null),
            Err(AssignError::Constant)
        ));
    }

    #[test]
    fn inner_variable_shadows_outer_constant() {
        let outer = Environment::new(None, ScopeKind::Function);
        outer.borrow_mut().declare_constant("a", JsValue::Number(1.0));
        let inner = Environment::new_block(&outer);
        inner.borrow_mut().declare_variable("a", JsValue::Number(2.0));
        assert!(Environment::assign(&inner, "a", JsValue::Number(5.0)).is_ok());
        assert!(matches!(Environment::lookup(&outer, "a"), Some(JsValue::Number(n)) if n == 1.0));
    }

    #[test]
    fn assigning_unknown_name_fails() {
        let env = Environment::new(None, ScopeKind::Global);
        assert!(matches!(
            Environment::assign(&env, "nope", JsValue::Undefined),
            Err(AssignError::Undeclared)
        ));
        assert!(Environment::lookup(&env, "nope").is_none());
    }

    #[test]
    fn var_scope_skips_blocks() {
        let function = Environment::new(None, ScopeKind::Function);
        let block = Environment::new_block(&Environment::new_block(&function));
        assert!(Rc::ptr_eq(&Environment::var_scope(&block), &function));
    }

    #[test]
    fn own_keys_put_integers_first() {
        let mut data = JsObjectData::new(None, ObjectKind::Ordinary);
        data.insert_value("b".into(), JsValue::Null);
        data.insert_value("2".into(), JsValue::Null);
        data.insert_value("a".into(), JsValue::Null);
        data.insert_value("1".into(), JsValue::Null);
        data.insert_builtin("hidden".into(), JsValue::Null);
        assert_eq!(data.own_keys(true), vec!["1", "2", "b", "a"]);
        assert_eq!(data.own_keys(false).len(), 5);
    }

    #[test]
    fn array_elements_back_index_properties() {
        let mut data = JsObjectData::new(None, ObjectKind::Array(vec![JsValue::Null]));
        data.set_own_value("3", JsValue::Boolean(true));
        assert_eq!(data.array_elements().map(Vec::len), Some(4));
        data.set_own_value("length", JsValue::Number(1.0));
        assert!(!data.has_own_property("3"));
        assert!(data.has_own_property("length"));
        data.set_own_value("length", JsValue::Number(1e300));
        data.set_own_value("4294967294", JsValue::Null);
        assert_eq!(data.array_elements().map(Vec::len), Some(1));
    }

    #[test]
    fn array_index_is_canonical() {
        assert_eq!(array_index("0"), Some(0));
        assert_eq!(array_index("42"), Some(42));
        assert_eq!(array_index("01"), None);
        assert_eq!(array_index("-1"), None);
        assert_eq!(array_index("1.5"), None);
    }
}

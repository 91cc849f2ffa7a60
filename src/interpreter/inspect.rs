use super::*;

/// Renders `value` the way the REPL prints results.
pub fn inspect(value: &JsValue) -> String {
    inspect_value(value, true)
}

/// With `quote_strings` unset a top-level string prints as its raw text.
pub(crate) fn inspect_value(value: &JsValue, quote_strings: bool) -> String {
    let mut seen = Vec::new();
    match value {
        JsValue::String(s) if !quote_strings => s.to_rust_string(),
        _ => format_value(value, &mut seen),
    }
}

fn format_value(value: &JsValue, seen: &mut Vec<JsObject>) -> String {
    match value {
        JsValue::String(s) => quote(&s.to_rust_string()),
        JsValue::Number(n) if *n == 0.0 && n.is_sign_negative() => "-0".to_string(),
        JsValue::BigInt(b) => format!("{}n", b.value),
        JsValue::Object(obj) => {
            if seen.iter().any(|o| o.ptr_eq(obj)) {
                return "[Circular]".to_string();
            }
            seen.push(obj.clone());
            let out = format_object(obj, seen);
            seen.pop();
            out
        }
        other => other.to_string(),
    }
}

/// Contents of an object that may hold nested values, copied out so the
/// object is not borrowed while they are formatted.
enum Nested {
    Promise(&'static str, JsValue),
    Array(Vec<JsValue>),
    Object(Option<String>, Vec<(String, PropertyDescriptor)>),
}

fn format_object(obj: &JsObject, seen: &mut Vec<JsObject>) -> String {
    let nested = {
        let data = obj.borrow();
        match &data.kind {
            ObjectKind::Function(JsFunction::Class(def)) => {
                let name = if def.name.is_empty() { "(anonymous)" } else { def.name.as_str() };
                return match def.parent.as_ref().map(|p| own_string(p, "name")) {
                    Some(parent) if !parent.is_empty() => format!("[class {name} extends {parent}]"),
                    _ => format!("[class {name}]"),
                };
            }
            ObjectKind::Function(_) => {
                return match own_string(obj, "name") {
                    name if name.is_empty() => "[Function (anonymous)]".to_string(),
                    name => format!("[Function: {name}]"),
                };
            }
            ObjectKind::Error => {
                let name = match data.find_property("name").and_then(|d| d.value) {
                    Some(JsValue::String(s)) => s.to_rust_string(),
                    _ => "Error".to_string(),
                };
                let message = own_string(obj, "message");
                return match (name.is_empty(), message.is_empty()) {
                    (_, true) => name,
                    (true, false) => message,
                    (false, false) => format!("{name}: {message}"),
                };
            }
            ObjectKind::Promise(PromiseState::Pending(_)) => return "Promise { <pending> }".to_string(),
            ObjectKind::Promise(PromiseState::Fulfilled(v)) => Nested::Promise("", v.clone()),
            ObjectKind::Promise(PromiseState::Rejected(v)) => Nested::Promise("<rejected> ", v.clone()),
            ObjectKind::Array(elements) => Nested::Array(elements.clone()),
            ObjectKind::Ordinary => {
                let entries = data
                    .own_keys(true)
                    .into_iter()
                    .filter_map(|k| data.get_own_property(&k).map(|d| (k, d)))
                    .collect();
                Nested::Object(instance_prefix(&data), entries)
            }
        }
    };
    match nested {
        Nested::Promise(tag, v) => format!("Promise {{ {tag}{} }}", format_value(&v, seen)),
        Nested::Array(elements) if elements.is_empty() => "[]".to_string(),
        Nested::Array(elements) => {
            let parts: Vec<String> = elements.iter().map(|e| format_value(e, seen)).collect();
            format!("[ {} ]", parts.join(", "))
        }
        Nested::Object(prefix, entries) => {
            let parts: Vec<String> = entries
                .iter()
                .map(|(key, desc)| format!("{}: {}", format_key(key), format_property(desc, seen)))
                .collect();
            match (prefix, parts.is_empty()) {
                (Some(p), true) => format!("{p} {{}}"),
                (Some(p), false) => format!("{p} {{ {} }}", parts.join(", ")),
                (None, true) => "{}".to_string(),
                (None, false) => format!("{{ {} }}", parts.join(", ")),
            }
        }
    }
}

fn format_property(desc: &PropertyDescriptor, seen: &mut Vec<JsObject>) -> String {
    match (&desc.get, &desc.set) {
        (Some(_), Some(_)) => "[Getter/Setter]".to_string(),
        (Some(_), None) => "[Getter]".to_string(),
        (None, Some(_)) => "[Setter]".to_string(),
        (None, None) => format_value(desc.value.as_ref().unwrap_or(&JsValue::Undefined), seen),
    }
}

/// Class instances print with their constructor's name.
fn instance_prefix(data: &JsObjectData) -> Option<String> {
    let proto = data.prototype.as_ref()?;
    let ctor = proto.get_own_value("constructor")?;
    let name = own_string(ctor.as_object()?, "name");
    (!name.is_empty() && name != "Object").then_some(name)
}

fn own_string(obj: &JsObject, key: &str) -> String {
    match obj.get_own_value(key) {
        Some(JsValue::String(s)) => s.to_rust_string(),
        _ => String::new(),
    }
}

fn format_key(key: &str) -> String {
    let plain = key.chars().all(|c| c.is_ascii_digit())
        || (key.chars().next().is_some_and(|c| unicode_ident::is_xid_start(c) || c == '_' || c == '$')
            && key.chars().all(|c| unicode_ident::is_xid_continue(c) || c == '$'));
    if plain && !key.is_empty() { key.to_string() } else { quote(key) }
}

/// JSON-style double-quoted string.
pub(crate) fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn show(source: &str) -> String {
        let mut interp = Interpreter::new();
        match interp.eval_source(source) {
            Ok(v) => inspect(&v),
            Err(e) => format!("error: {e}"),
        }
    }

    #[test]
    fn primitives() {
        assert_eq!(show("'a\"b\\n'"), "\"a\\\"b\\n\"");
        assert_eq!(show("-0"), "-0");
        assert_eq!(show("10n ** 20n"), "100000000000000000000n");
        assert_eq!(show("undefined"), "undefined");
        assert_eq!(show("0.1 + 0.2"), "0.30000000000000004");
    }

    #[test]
    fn containers() {
        assert_eq!(show("[]"), "[]");
        assert_eq!(show("({})"), "{}");
        assert_eq!(show("[1, 'a', [2]]"), "[ 1, \"a\", [ 2 ] ]");
        assert_eq!(show("({ a: { b: null } })"), "{ a: { b: null } }");
        assert_eq!(show("({ get a() {}, set a(v) {}, get b() {} })"), "{ a: [Getter/Setter], b: [Getter] }");
    }

    #[test]
    fn cycles() {
        assert_eq!(show("const o = { n: 1 }; o.self = o; o"), "{ n: 1, self: [Circular] }");
        assert_eq!(show("const a = [1]; a.push(a); a"), "[ 1, [Circular] ]");
    }

    #[test]
    fn functions_and_classes() {
        assert_eq!(show("function f() {} f"), "[Function: f]");
        assert_eq!(show("(() => {})"), "[Function (anonymous)]");
        assert_eq!(show("class A {} A"), "[class A]");
        assert_eq!(show("class A {} class B extends A {} B"), "[class B extends A]");
        assert_eq!(show("class P { constructor() { this.x = 1 } } new P()"), "P { x: 1 }");
    }

    #[test]
    fn errors_and_promises() {
        assert_eq!(show("new TypeError('bad')"), "TypeError: bad");
        assert_eq!(show("new Error()"), "Error");
        assert_eq!(show("Promise.resolve([1])"), "Promise { [ 1 ] }");
        assert_eq!(show("Promise.reject(2)"), "Promise { <rejected> 2 }");
        assert_eq!(show("new Promise(() => {})"), "Promise { <pending> }");
    }

    #[test]
    fn raw_strings_for_thrown_values() {
        assert_eq!(inspect_value(&JsValue::from("plain"), false), "plain");
        assert_eq!(inspect_value(&JsValue::from("plain"), true), "\"plain\"");
    }
}

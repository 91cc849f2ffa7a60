use jsi::{Error, Interpreter, JsValue, evaluate, inspect};
use pretty_assertions::assert_eq;

fn eval(source: &str) -> String {
    match evaluate(source, []) {
        Ok(value) => inspect(&value),
        Err(e) => format!("error: {e}"),
    }
}

#[test]
fn literals() {
    assert_eq!(eval("42"), "42");
    assert_eq!(eval("'text'"), "\"text\"");
    assert_eq!(eval("12345678901234567890n"), "12345678901234567890n");
    assert_eq!(eval("null"), "null");
    assert_eq!(eval("`a${1}b`"), "\"a1b\"");
    assert_eq!(eval("[1, , 3]"), "[ 1, undefined, 3 ]");
}

#[test]
fn let_shadowing_and_const_protection() {
    assert_eq!(eval("let x = 1; { let x = 2; } x"), "1");
    assert_eq!(eval("const c = 1; c = 2"), "error: Uncaught TypeError: Assignment to constant variable.");
    assert_eq!(eval("const x = 1; try { x = 2 } catch {} x"), "1");
    assert_eq!(eval("const o = { n: 1 }; try { o = {} } catch (e) {} o.n"), "1");
    assert_eq!(
        eval("undeclared = 1"),
        "error: Uncaught ReferenceError: assignment to undeclared variable undeclared"
    );
}

#[test]
fn break_and_continue_keep_loop_state() {
    assert_eq!(eval("for (var i = 0; i < 5; i++) { if (i == 3) break } i"), "3");
    assert_eq!(eval("var n = 0; while (true) { n++; if (n > 4) break } n"), "5");
    assert_eq!(eval("let s = 0; for (let j = 0; j < 5; j++) { if (j % 2) continue; s += j } s"), "6");
    assert_eq!(eval("var k = 0; do { k++; if (k < 3) continue; break } while (true); k"), "3");
}

#[test]
fn hoisting() {
    assert_eq!(eval("f(); function f() { return 'hoisted' }"), "\"hoisted\"");
    assert_eq!(eval("const before = v; var v = 1; [before, v]"), "[ undefined, 1 ]");
}

#[test]
fn nested_labels() {
    let source = "
        let out = [];
        a: for (let i = 0; i < 3; i++) {
            b: for (let j = 0; j < 3; j++) {
                if (j == 2) continue a;
                if (i == 2) break a;
                out.push(i * 10 + j);
            }
        }
        out
    ";
    assert_eq!(eval(source), "[ 0, 1, 10, 11 ]");
}

#[test]
fn subclass_field_order_and_super_requirement() {
    let source = "
        const log = [];
        class A { a = log.push('A.a'); constructor() { log.push('A()') } }
        class B extends A { b = log.push('B.b'); constructor() { super(); log.push('B()') } }
        new B();
        log
    ";
    assert_eq!(eval(source), "[ \"A.a\", \"A()\", \"B.b\", \"B()\" ]");
    assert_eq!(
        eval("class A {} class B extends A { constructor() { this.x = 1 } } new B()"),
        "error: Uncaught TypeError: must call super first"
    );
}

#[test]
fn closures_share_frames() {
    let source = "
        function make() { let n = 0; return { inc: () => ++n, get: () => n } }
        const m = make(); m.inc(); m.inc(); m.get()
    ";
    assert_eq!(eval(source), "2");
}

#[test]
fn spread_into_math_max() {
    assert_eq!(eval("Math.max(...[1, 5, 3], 4)"), "5");
}

#[test]
fn reevaluation_is_idempotent() {
    let program = jsi::parser::parse("[1 + 2, 'a' + 'b', 2n * 3n]", &Default::default())
        .unwrap_or_else(|e| panic!("{e}"));
    let mut interp = Interpreter::new();
    let first = interp.run(&program).map(|v| inspect(&v)).ok();
    let second = interp.run(&program).map(|v| inspect(&v)).ok();
    assert_eq!(first.as_deref(), Some("[ 3, \"ab\", 6n ]"));
    assert_eq!(first, second);
}

#[test]
fn host_bindings_and_native_functions() {
    let mut interp = Interpreter::new();
    let double = interp.native_function("double", 1, |_interp, _this, args| {
        match args.first() {
            Some(JsValue::Number(n)) => Ok(JsValue::Number(n * 2.0)),
            _ => Ok(JsValue::Number(f64::NAN)),
        }
    });
    interp.define_global("double", double);
    interp.define_global("base", JsValue::Number(20.0));
    let result = interp.eval_source("double(base) + 2").map(|v| inspect(&v));
    assert_eq!(result.ok().as_deref(), Some("42"));
}

#[test]
fn sessions_keep_their_globals() {
    let mut interp = Interpreter::new();
    assert!(interp.eval_source("let total = 1; function add(n) { total += n }").is_ok());
    assert!(interp.eval_source("add(41)").is_ok());
    let total = interp.eval_source("total").map(|v| inspect(&v));
    assert_eq!(total.ok().as_deref(), Some("42"));
}

#[test]
fn eval_file_runs_in_the_session() {
    let path = std::env::temp_dir().join(format!("jsi-eval-file-{}.js", std::process::id()));
    std::fs::write(&path, "var fromFile = 6 * 7;").unwrap();
    let mut interp = Interpreter::new();
    let result = interp.eval_file(&path);
    std::fs::remove_file(&path).unwrap();
    assert!(result.is_ok());
    let value = interp.eval_source("fromFile").map(|v| inspect(&v));
    assert_eq!(value.ok().as_deref(), Some("42"));
}

#[test]
fn eval_file_reports_unreadable_paths() {
    let missing = std::path::Path::new("tests/js/no-such-file.js");
    let err = Interpreter::new().eval_file(missing).unwrap_err();
    assert!(matches!(&err, Error::Io { path, .. } if path.ends_with("no-such-file.js")));
    assert!(err.to_string().starts_with("failed to read tests/js/no-such-file.js"));
}

#[test]
fn call_function_from_host() {
    let mut interp = Interpreter::new();
    let f = interp
        .eval_source("(a, b) => a + b")
        .unwrap_or_else(|e| panic!("{e}"));
    let result = interp.call_function(&f, &JsValue::Undefined, &[JsValue::from("a"), JsValue::Number(1.0)]);
    assert_eq!(result.map(|v| inspect(&v)).ok().as_deref(), Some("\"a1\""));
}

#[test]
fn error_kinds() {
    let mut interp = Interpreter::new();
    let err = interp.eval_source("throw { code: 1 }").err();
    assert_eq!(
        err.as_ref().and_then(Error::thrown_value).map(inspect).as_deref(),
        Some("{ code: 1 }")
    );
    assert!(matches!(interp.eval_source("function* g() {}"), Err(Error::UnsupportedNodeKind(_))));
    assert!(matches!(interp.eval_source("try { a?.b } catch {}"), Err(Error::UnsupportedNodeKind(_))));
    let incomplete = interp.eval_source("function f() {").err();
    assert!(incomplete.is_some_and(|e| e.is_incomplete_input()));
    let syntax = interp.eval_source("let 1 = 2").err();
    assert!(syntax.is_some_and(|e| e.to_string().starts_with("SyntaxError")));
}

#[test]
fn console_log_does_not_disturb_results() {
    assert_eq!(eval("console.log('hi', [1], { a: 'b' }); 7"), "7");
}

#[test]
fn parse_options_allow_top_level_return() {
    let mut interp = Interpreter::new();
    assert!(matches!(interp.eval_source("return 1"), Err(Error::Parse(_))));
    interp.set_parse_options(jsi::parser::ParseOptions {
        return_outside_function: true,
        ..Default::default()
    });
    let value = interp.eval_source("if (true) return 'early'; 'late'").map(|v| inspect(&v));
    assert_eq!(value.ok().as_deref(), Some("\"early\""));
}

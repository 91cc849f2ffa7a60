//! Runs JavaScript test suites written against `test`, `describe` and
//! `expect`.
//!
//! Each suite file is evaluated in its own [`Interpreter`]. `expect(...)`
//! numbers its assertions from 1 within the enclosing `test`; a failing
//! matcher records that number, and a test that throws, or makes no
//! assertions at all, fails as a whole.

use crate::ast::BinaryOp;
use crate::error::Error;
use crate::interpreter::{Exception, Interpreter, JsObject, ObjectKind, is_callable, same_value_zero, strict_equality};
use crate::types::JsValue;
use log::{info, warn};
use std::cell::RefCell;
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no test files found under {}", .0.display())]
    NoTests(PathBuf),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Passed,
    /// 1-based indices of the failed assertions.
    Failed(Vec<usize>),
    NoAssertions,
    /// The callback threw; the thrown value as the REPL would print it.
    Threw(String),
}

#[derive(Clone, Debug)]
pub struct TestResult {
    /// Enclosing `describe` names, outermost first.
    pub suite: Vec<String>,
    pub name: String,
    pub outcome: Outcome,
}

impl TestResult {
    pub fn passed(&self) -> bool {
        self.outcome == Outcome::Passed
    }

    pub fn full_name(&self) -> String {
        self.suite
            .iter()
            .chain(std::iter::once(&self.name))
            .cloned()
            .collect::<Vec<_>>()
            .join(" > ")
    }
}

impl fmt::Display for TestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.full_name();
        match &self.outcome {
            Outcome::Passed => write!(f, "PASS {name}"),
            Outcome::Failed(indices) => {
                let list: Vec<String> = indices.iter().map(|i| i.to_string()).collect();
                write!(f, "FAIL {name} (assertions {})", list.join(", "))
            }
            Outcome::NoAssertions => write!(f, "FAIL {name} (no assertions ran)"),
            Outcome::Threw(message) => write!(f, "FAIL {name} (threw {message})"),
        }
    }
}

/// Results of one suite file.
#[derive(Clone, Debug)]
pub struct FileReport {
    pub path: PathBuf,
    pub tests: Vec<TestResult>,
    /// Set when the file failed to parse or threw outside any test.
    pub error: Option<String>,
}

impl FileReport {
    pub fn passed(&self) -> bool {
        self.error.is_none() && self.tests.iter().all(TestResult::passed)
    }
}

#[derive(Clone, Debug, Default)]
pub struct Report {
    pub files: Vec<FileReport>,
}

impl Report {
    pub fn total(&self) -> usize {
        self.files.iter().map(|f| f.tests.len()).sum()
    }

    pub fn failed(&self) -> usize {
        self.files
            .iter()
            .map(|f| f.tests.iter().filter(|t| !t.passed()).count())
            .sum()
    }

    pub fn passed(&self) -> bool {
        self.files.iter().all(FileReport::passed)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for file in &self.files {
            writeln!(f, "{}", file.path.display())?;
            for test in &file.tests {
                writeln!(f, "  {test}")?;
            }
            if let Some(error) = &file.error {
                writeln!(f, "  ERROR {error}")?;
            }
        }
        let errors = self.files.iter().filter(|f| f.error.is_some()).count();
        write!(
            f,
            "{} tests, {} passed, {} failed, {errors} file error(s)",
            self.total(),
            self.total() - self.failed(),
            self.failed()
        )
    }
}

/// Every `.js` file under `dir`, recursively, in path order.
pub fn find_files(dir: &Path) -> Result<Vec<PathBuf>, HarnessError> {
    let io_error = |source| HarnessError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_error)? {
        let path = entry.map_err(io_error)?.path();
        if path.is_dir() {
            files.extend(find_files(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "js") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

pub fn run_dir(dir: &Path) -> Result<Report, HarnessError> {
    let files = find_files(dir)?;
    if files.is_empty() {
        return Err(HarnessError::NoTests(dir.to_path_buf()));
    }
    let files = files.iter().map(|p| run_file(p)).collect::<Result<_, _>>()?;
    Ok(Report { files })
}

pub fn run_file(path: &Path) -> Result<FileReport, HarnessError> {
    let source = std::fs::read_to_string(path).map_err(|source| HarnessError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    info!("running {}", path.display());
    Ok(run_source(&source, path))
}

/// Evaluates one suite. `path` only labels the report.
pub fn run_source(source: &str, path: &Path) -> FileReport {
    let state = Rc::new(RefCell::new(State::default()));
    let mut interp = Interpreter::new();
    install(&mut interp, &state);
    let error = interp.eval_source(source).err().map(|e| {
        warn!("{}: {e}", path.display());
        e.to_string()
    });
    let tests = std::mem::take(&mut state.borrow_mut().results);
    FileReport {
        path: path.to_path_buf(),
        tests,
        error,
    }
}

#[derive(Default)]
struct State {
    describe_stack: Vec<String>,
    current: Option<RunningTest>,
    results: Vec<TestResult>,
}

#[derive(Default)]
struct RunningTest {
    assertions: usize,
    failures: Vec<usize>,
}

type Shared = Rc<RefCell<State>>;

fn install(interp: &mut Interpreter, state: &Shared) {
    let shared = state.clone();
    let test = interp.native_function("test", 2, move |interp, _this, args| {
        let name = interp.to_rust_string(&arg(args, 0))?;
        let previous = shared.borrow_mut().current.replace(RunningTest::default());
        let result = interp.call(&arg(args, 1), &JsValue::Undefined, &[]);
        let running = std::mem::replace(&mut shared.borrow_mut().current, previous).unwrap_or_default();
        let outcome = match result {
            Err(Exception::Fatal(e)) => return Err(Exception::Fatal(e)),
            Err(Exception::Throw(value)) => Outcome::Threw(interp.describe_thrown(&value)),
            Ok(_) if running.assertions == 0 => Outcome::NoAssertions,
            Ok(_) if !running.failures.is_empty() => Outcome::Failed(running.failures),
            Ok(_) => Outcome::Passed,
        };
        record(&shared, name, outcome);
        Ok(JsValue::Undefined)
    });
    interp.define_global("test", test);

    let shared = state.clone();
    let describe = interp.native_function("describe", 2, move |interp, _this, args| {
        let name = interp.to_rust_string(&arg(args, 0))?;
        shared.borrow_mut().describe_stack.push(name.clone());
        let result = interp.call(&arg(args, 1), &JsValue::Undefined, &[]);
        shared.borrow_mut().describe_stack.pop();
        match result {
            Ok(_) => Ok(JsValue::Undefined),
            Err(Exception::Throw(value)) => {
                let message = interp.describe_thrown(&value);
                record(&shared, name, Outcome::Threw(message));
                Ok(JsValue::Undefined)
            }
            Err(fatal) => Err(fatal),
        }
    });
    interp.define_global("describe", describe);

    let shared = state.clone();
    let expect = interp.native_function("expect", 1, move |interp, _this, args| {
        let index = {
            let mut state = shared.borrow_mut();
            let Some(running) = state.current.as_mut() else {
                return Err(Exception::Throw(interp.create_error("Error", "expect() called outside of a test")));
            };
            running.assertions += 1;
            running.assertions
        };
        Ok(JsValue::Object(expectation(interp, &shared, arg(args, 0), index)))
    });
    interp.define_global("expect", expect);
}

fn record(state: &Shared, name: String, outcome: Outcome) {
    let mut state = state.borrow_mut();
    let result = TestResult {
        suite: state.describe_stack.clone(),
        name,
        outcome,
    };
    if !result.passed() {
        warn!("{result}");
    }
    state.results.push(result);
}

fn arg(args: &[JsValue], index: usize) -> JsValue {
    args.get(index).cloned().unwrap_or(JsValue::Undefined)
}

/// A matcher's verdict on `actual` given the matcher arguments.
type Check = fn(&mut Interpreter, &JsValue, &[JsValue]) -> Result<bool, Exception>;

const MATCHERS: &[(&str, usize, Check)] = &[
    ("toBe", 1, |interp, actual, args| interp.loose_equals(actual, &arg(args, 0))),
    ("toEqual", 1, |_interp, actual, args| Ok(deep_equal(actual, &arg(args, 0), &mut Vec::new()))),
    ("toBeUndefined", 0, |_interp, actual, _args| Ok(actual.is_undefined())),
    ("toBeTrue", 0, |_interp, actual, _args| Ok(matches!(actual, JsValue::Boolean(true)))),
    ("toBeFalse", 0, |_interp, actual, _args| Ok(matches!(actual, JsValue::Boolean(false)))),
    ("toBeNaN", 0, |interp, actual, _args| Ok(interp.to_number(actual)?.is_nan())),
    ("toHaveLength", 1, |interp, actual, args| {
        let length = interp.get(actual, "length")?;
        interp.loose_equals(&length, &arg(args, 0))
    }),
    ("toHaveProperty", 1, has_property),
    ("toBeInstanceOf", 1, |interp, actual, args| interp.instance_of(actual, &arg(args, 0))),
    ("toThrow", 1, throws),
    ("toThrowWithMessage", 2, throws_with_message),
    ("toBeGreaterThan", 1, |interp, actual, args| compare(interp, BinaryOp::Gt, actual, args)),
    ("toBeGreaterThanOrEqual", 1, |interp, actual, args| compare(interp, BinaryOp::GtEq, actual, args)),
    ("toBeLessThan", 1, |interp, actual, args| compare(interp, BinaryOp::Lt, actual, args)),
    ("toBeLessThanOrEqual", 1, |interp, actual, args| compare(interp, BinaryOp::LtEq, actual, args)),
    ("toEval", 0, |_interp, actual, _args| Ok(eval_fresh(actual).is_ok())),
    ("toEvalTo", 1, |interp, actual, args| match eval_fresh(actual) {
        Ok(value) => interp.loose_equals(&value, &arg(args, 0)),
        Err(_) => Ok(false),
    }),
];

/// Matchers available under `expect(x).not`.
const NEGATABLE: &[&str] = &["toBe", "toEqual", "toBeNaN", "toHaveProperty", "toEval", "toThrow"];

/// One `expect(actual)` call: the value under test and its assertion number.
#[derive(Clone)]
struct Subject {
    state: Shared,
    actual: JsValue,
    index: usize,
}

/// The object returned by `expect(actual)`, with every matcher and a `not`
/// object holding the negated ones.
fn expectation(interp: &mut Interpreter, state: &Shared, actual: JsValue, index: usize) -> JsObject {
    let subject = Subject {
        state: state.clone(),
        actual,
        index,
    };
    let positive = interp.create_object();
    let negated = interp.create_object();
    for &(name, arity, check) in MATCHERS {
        install_matcher(interp, &positive, &subject, (name, arity, check), false);
        if NEGATABLE.contains(&name) {
            install_matcher(interp, &negated, &subject, (name, arity, check), true);
        }
    }
    positive.set("not", JsValue::Object(negated));
    positive
}

fn install_matcher(
    interp: &mut Interpreter,
    target: &JsObject,
    subject: &Subject,
    (name, arity, check): (&str, usize, Check),
    negate: bool,
) {
    let subject = subject.clone();
    interp.add_method(target, name, arity, move |interp, _this, args| {
        if check(interp, &subject.actual, args)? == negate
            && let Some(running) = subject.state.borrow_mut().current.as_mut()
        {
            running.failures.push(subject.index);
        }
        Ok(JsValue::Undefined)
    });
}

fn compare(interp: &mut Interpreter, op: BinaryOp, actual: &JsValue, args: &[JsValue]) -> Result<bool, Exception> {
    let result = interp.binary_operation(op, actual, &arg(args, 0))?;
    Ok(matches!(result, JsValue::Boolean(true)))
}

fn has_property(interp: &mut Interpreter, actual: &JsValue, args: &[JsValue]) -> Result<bool, Exception> {
    let key = interp.to_property_key(&arg(args, 0))?;
    match actual {
        JsValue::Object(obj) => Ok(obj.borrow().has_property(&key)),
        JsValue::Undefined | JsValue::Null => Ok(false),
        _ => Ok(!interp.get(actual, &key)?.is_undefined()),
    }
}

/// Calls `actual`, handing back what it threw.
fn thrown_by(interp: &mut Interpreter, actual: &JsValue) -> Result<Option<JsValue>, Exception> {
    if !is_callable(actual) {
        return Ok(None);
    }
    match interp.call(actual, &JsValue::Undefined, &[]) {
        Ok(_) => Ok(None),
        Err(Exception::Throw(value)) => Ok(Some(value)),
        Err(fatal) => Err(fatal),
    }
}

/// The thrown value's prototype is exactly `ctor.prototype`.
fn thrown_is(interp: &mut Interpreter, thrown: &JsValue, ctor: &JsValue) -> Result<bool, Exception> {
    let JsValue::Object(expected) = interp.get(ctor, "prototype")? else {
        return Ok(false);
    };
    Ok(thrown
        .as_object()
        .and_then(JsObject::prototype)
        .is_some_and(|proto| proto.ptr_eq(&expected)))
}

fn throws(interp: &mut Interpreter, actual: &JsValue, args: &[JsValue]) -> Result<bool, Exception> {
    let Some(thrown) = thrown_by(interp, actual)? else {
        return Ok(false);
    };
    match arg(args, 0) {
        JsValue::Undefined => Ok(true),
        ctor => thrown_is(interp, &thrown, &ctor),
    }
}

fn throws_with_message(interp: &mut Interpreter, actual: &JsValue, args: &[JsValue]) -> Result<bool, Exception> {
    let Some(thrown) = thrown_by(interp, actual)? else {
        return Ok(false);
    };
    if !thrown_is(interp, &thrown, &arg(args, 0))? {
        return Ok(false);
    }
    let message = interp.get(&thrown, "message")?;
    let message = interp.to_rust_string(&message)?;
    let expected = interp.to_rust_string(&arg(args, 1))?;
    Ok(message.contains(&expected))
}

fn eval_fresh(source: &JsValue) -> Result<JsValue, Error> {
    let source = match source {
        JsValue::String(s) => s.to_rust_string(),
        other => other.to_string(),
    };
    Interpreter::new().eval_source(&source)
}

/// Structural equality: primitives by SameValueZero, arrays element-wise,
/// other objects by prototype and enumerable own properties.
fn deep_equal(a: &JsValue, b: &JsValue, visiting: &mut Vec<(JsObject, JsObject)>) -> bool {
    let (JsValue::Object(x), JsValue::Object(y)) = (a, b) else {
        return same_value_zero(a, b);
    };
    if strict_equality(a, b) || visiting.iter().any(|(p, q)| p.ptr_eq(x) && q.ptr_eq(y)) {
        return true;
    }
    visiting.push((x.clone(), y.clone()));
    let equal = deep_equal_objects(x, y, visiting);
    visiting.pop();
    equal
}

/// What structural comparison looks at, copied out of the object.
enum Shape {
    Array(Vec<JsValue>),
    Record(Option<JsObject>, Vec<(String, JsValue)>),
    Opaque,
}

fn shape(obj: &JsObject) -> Shape {
    let data = obj.borrow();
    match &data.kind {
        ObjectKind::Array(elements) => Shape::Array(elements.clone()),
        ObjectKind::Ordinary | ObjectKind::Error => {
            let entries = data
                .own_keys(true)
                .into_iter()
                .map(|key| {
                    let value = data.get_own_property(&key).and_then(|d| d.value).unwrap_or(JsValue::Undefined);
                    (key, value)
                })
                .collect();
            Shape::Record(data.prototype.clone(), entries)
        }
        _ => Shape::Opaque,
    }
}

fn deep_equal_objects(x: &JsObject, y: &JsObject, visiting: &mut Vec<(JsObject, JsObject)>) -> bool {
    match (shape(x), shape(y)) {
        (Shape::Array(l), Shape::Array(r)) => {
            l.len() == r.len() && l.iter().zip(&r).all(|(a, b)| deep_equal(a, b, visiting))
        }
        (Shape::Record(p, l), Shape::Record(q, r)) => {
            let same_proto = match (&p, &q) {
                (Some(p), Some(q)) => p.ptr_eq(q),
                (None, None) => true,
                _ => false,
            };
            same_proto
                && l.len() == r.len()
                && l.iter().all(|(key, a)| {
                    r.iter()
                        .find(|(k, _)| k == key)
                        .is_some_and(|(_, b)| deep_equal(a, b, visiting))
                })
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(source: &str) -> FileReport {
        run_source(source, Path::new("inline.js"))
    }

    fn outcomes(source: &str) -> Vec<(String, Outcome)> {
        run(source)
            .tests
            .into_iter()
            .map(|t| (t.full_name(), t.outcome))
            .collect()
    }

    #[test]
    fn passing_and_failing_assertions() {
        let source = "
            test('ok', () => { expect(1).toBe('1'); expect([1, [2]]).toEqual([1, [2]]) });
            test('bad', () => { expect(1).toBe(1); expect(2).toBe(3); expect('x').toHaveLength(2) });
        ";
        assert_eq!(
            outcomes(source),
            vec![
                ("ok".to_string(), Outcome::Passed),
                ("bad".to_string(), Outcome::Failed(vec![2, 3])),
            ]
        );
    }

    #[test]
    fn empty_and_throwing_tests_fail() {
        let source = "
            test('empty', () => {});
            test('throws', () => { expect(1).toBe(1); throw new TypeError('boom') });
        ";
        assert_eq!(
            outcomes(source),
            vec![
                ("empty".to_string(), Outcome::NoAssertions),
                ("throws".to_string(), Outcome::Threw("TypeError: boom".to_string())),
            ]
        );
    }

    #[test]
    fn describe_prefixes_names() {
        let source = "describe('outer', () => { describe('inner', () => { test('t', () => expect(true).toBeTrue()) }) })";
        assert_eq!(outcomes(source), vec![("outer > inner > t".to_string(), Outcome::Passed)]);
    }

    #[test]
    fn negated_matchers() {
        let source = "
            test('not', () => {
                expect(1).not.toBe(2);
                expect({ a: 1 }).not.toEqual({ a: 2 });
                expect(5).not.toBeNaN();
                expect({}).not.toHaveProperty('x');
                expect('let = ;').not.toEval();
                expect(() => 1).not.toThrow();
                expect(1).not.toBe(1);
            });
        ";
        assert_eq!(outcomes(source), vec![("not".to_string(), Outcome::Failed(vec![7]))]);
    }

    #[test]
    fn throw_matchers_compare_prototypes_exactly() {
        let source = "
            test('throws', () => {
                expect(() => { throw new TypeError('bad thing') }).toThrow(TypeError);
                expect(() => { throw new TypeError('bad thing') }).toThrow(Error);
                expect(() => null.x).toThrowWithMessage(TypeError, 'cannot read property');
                expect(() => { throw 1 }).toThrow();
                expect(() => {}).toThrow();
            });
        ";
        assert_eq!(outcomes(source), vec![("throws".to_string(), Outcome::Failed(vec![2, 5]))]);
    }

    #[test]
    fn comparison_and_eval_matchers() {
        let source = "
            test('misc', () => {
                expect(3).toBeGreaterThan(2);
                expect(2).toBeGreaterThanOrEqual(2);
                expect(1).toBeLessThan(2);
                expect(2).toBeLessThanOrEqual(1);
                expect('1 + 1').toEvalTo(2);
                expect('class A {}').toEval();
                expect(new RangeError()).toBeInstanceOf(Error);
                expect(undefined).toBeUndefined();
                expect(false).toBeFalse();
                expect('abc').toHaveProperty('length');
            });
        ";
        assert_eq!(outcomes(source), vec![("misc".to_string(), Outcome::Failed(vec![4]))]);
    }

    #[test]
    fn deep_equality() {
        let source = "
            class P { constructor() { this.x = 1 } }
            const a = { n: 1 }; a.self = a;
            const b = { n: 1 }; b.self = b;
            test('equal', () => {
                expect({ a: [1, { b: NaN }] }).toEqual({ a: [1, { b: NaN }] });
                expect(a).toEqual(b);
                expect(new P()).toEqual(new P());
                expect(new P()).toEqual({ x: 1 });
                expect([1, 2]).toEqual([1, 2, 3]);
                expect({ a: 1, b: undefined }).toEqual({ a: 1 });
            });
        ";
        assert_eq!(outcomes(source), vec![("equal".to_string(), Outcome::Failed(vec![4, 5, 6]))]);
    }

    #[test]
    fn top_level_errors_are_reported() {
        let report = run("test('a', () => expect(1).toBe(1)); undefinedName;");
        assert_eq!(report.tests.len(), 1);
        assert_eq!(report.error.as_deref(), Some("Uncaught ReferenceError: undefinedName is not defined"));
        assert!(!report.passed());

        let report = run("expect(1)");
        assert_eq!(report.error.as_deref(), Some("Uncaught Error: expect() called outside of a test"));
    }
}

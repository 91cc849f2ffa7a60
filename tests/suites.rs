use jsi::harness::{self, Outcome};
use std::path::Path;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn suite_dir(name: &str) -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/js").join(name)
}

fn assert_suite_passes(name: &str) {
    init_logging();
    let report = harness::run_dir(&suite_dir(name)).unwrap_or_else(|e| panic!("{e}"));
    assert!(report.total() > 0, "no tests ran in {name}");
    assert!(report.passed(), "{report}");
}

#[test]
fn class_suites() {
    assert_suite_passes("classes");
}

#[test]
fn language_suites() {
    assert_suite_passes("language");
}

#[test]
fn builtin_suites() {
    assert_suite_passes("builtins");
}

#[test]
fn find_files_is_recursive_and_sorted() {
    let files = harness::find_files(&suite_dir("")).unwrap_or_else(|e| panic!("{e}"));
    let names: Vec<String> = files
        .iter()
        .filter_map(|p| p.strip_prefix(suite_dir("")).ok())
        .map(|p| p.to_string_lossy().replace('\\', "/"))
        .collect();
    assert!(names.contains(&"classes/public-fields.js".to_string()));
    let mut sorted = names.clone();
    sorted.sort();
    assert_eq!(names, sorted);
}

#[test]
fn missing_directory_is_an_error() {
    let err = harness::run_dir(&suite_dir("does-not-exist"));
    assert!(matches!(err, Err(harness::HarnessError::Io { .. })));
}

#[test]
fn failures_are_reported_per_assertion() {
    let report = harness::run_source(
        "test('mixed', () => { expect(1).toBe(1); expect(1).toBe(2); expect([1]).toEqual([2]) })",
        Path::new("mixed.js"),
    );
    assert_eq!(report.tests.len(), 1);
    assert_eq!(report.tests[0].outcome, Outcome::Failed(vec![2, 3]));
    assert!(!report.passed());
}

/// End-to-end tests: run the `el` binary on expressions and texts and check
/// what it prints and how it exits.

use std::io::Write;
use std::process::{Command, Output};

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Path to the `el` binary built by this Cargo workspace.
fn el_binary() -> std::path::PathBuf {
    std::path::PathBuf::from(env!("CARGO_BIN_EXE_el"))
}

fn run_el(args: &[&str]) -> Output {
    Command::new(el_binary())
        .args(args)
        .env_remove("EL_LOG")
        .output()
        .expect("failed to run el binary")
}

fn stdout_lines(out: &Output) -> Vec<String> {
    String::from_utf8_lossy(&out.stdout)
        .lines()
        .map(str::to_owned)
        .collect()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

/// Run `args` and assert a successful exit with exactly `expected` on stdout.
fn check(args: &[&str], expected: &[&str]) {
    let out = run_el(args);
    assert!(out.status.success(), "el {args:?} failed:\n{}", stderr(&out));
    assert_eq!(stdout_lines(&out), expected, "el {args:?}");
}

// ── Expressions ───────────────────────────────────────────────────────────────

#[test]
fn evaluates_arithmetic() {
    check(&["1 + 2"], &["3"]);
    check(&["2 * (3 + 4) % 5"], &["4"]);
}

#[test]
fn prints_values_as_literals() {
    check(&["'a'"], &["\"a\""]);
    check(&["[1, 2..4]"], &["[1, 2, 3, 4]"]);
    check(&["missing"], &["undefined"]);
}

#[test]
fn one_line_per_input() {
    check(&["1", "true && false", "-1"], &["1", "false", "-1"]);
}

#[test]
fn switch_default_order() {
    check(&["-l", "{{ 2, true -> 1 }}"], &["1"]);
    let out = run_el(&["{{ 2, true -> 1 }}"]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("default case"), "{}", stderr(&out));
}

// ── Variables ─────────────────────────────────────────────────────────────────

#[test]
fn defines_from_command_line() {
    check(&["-Dx=2", "x * 21"], &["42"]);
    check(&["-D", "x = 2", "-Dy=x + 1", "y"], &["3"]);
}

#[test]
fn variables_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "; build settings").unwrap();
    writeln!(file, "base = \"maps\"").unwrap();
    writeln!(file, "threads = 4").unwrap();
    let path = file.path().to_str().unwrap().to_owned();

    check(&["-f", &path, "threads * 2"], &["8"]);
    // Definitions see the file and take precedence over it.
    check(&["-f", &path, "-Dthreads=threads + 1", "threads"], &["5"]);
    check(&["-i", "-f", &path, "${base}/${threads}.bsp"], &["maps/4.bsp"]);
}

#[test]
fn missing_variables_file_fails() {
    let out = run_el(&["-f", "/nonexistent/el-vars.cfg", "1"]);
    assert!(!out.status.success());
    assert!(stderr(&out).starts_with("el: "));
}

// ── Interpolation ─────────────────────────────────────────────────────────────

#[test]
fn interpolates_text() {
    check(&["-i", "value=${1+2}"], &["value=3"]);
    check(&["-Dname='e1m1'", "-i", "${name}.map"], &["e1m1.map"]);
    check(&["-i", "no expressions"], &["no expressions"]);
}

#[test]
fn unterminated_span_fails() {
    let out = run_el(&["-i", "a ${b"]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("el:"));
}

// ── Failures ──────────────────────────────────────────────────────────────────

#[test]
fn failed_input_does_not_stop_the_rest() {
    let out = run_el(&["1 +", "2"]);
    assert!(!out.status.success());
    assert_eq!(stdout_lines(&out), vec!["2"]);
    assert!(stderr(&out).contains("el:"));
}

#[test]
fn evaluation_error_fails() {
    let out = run_el(&["[1] - {}"]);
    assert!(!out.status.success());
    assert!(stdout_lines(&out).is_empty());
}

#[test]
fn usage_errors() {
    for args in [&[][..], &["-d"][..], &["-z", "1"][..], &["-Dnoequals", "1"][..]] {
        let out = run_el(args);
        assert!(!out.status.success(), "el {args:?} should fail");
        assert!(stderr(&out).contains("Usage:"), "el {args:?}");
    }
}

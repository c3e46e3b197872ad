//! CLI behavior: `sri <filename>`, exit codes, stderr diagnostics.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

fn sri() -> Command {
    Command::cargo_bin("sri").expect("binary builds")
}

fn script(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(contents.as_bytes()).expect("write script");
    file
}

#[test]
fn runs_a_script_and_exits_zero() {
    let file = script("puts 1 + 2*3\n");
    sri()
        .arg(file.path())
        .assert()
        .success()
        .stdout("7\n");
}

#[test]
fn missing_file_reports_and_exits_one() {
    sri()
        .arg("definitely/not/here.rb")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("here.rb"));
}

#[test]
fn evaluation_error_exits_one_with_diagnostic() {
    let file = script("puts missing\n");
    sri()
        .arg(file.path())
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Undefined variable: missing"));
}

#[test]
fn parse_error_carries_position() {
    let file = script("if true\n");
    sri()
        .arg(file.path())
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("expected"));
}

#[test]
fn larger_program_end_to_end() {
    let file = script(concat!(
        "class Counter\n",
        "  attr_reader :total\n",
        "  def initialize\n",
        "    @total = 0\n",
        "  end\n",
        "  def add(n)\n",
        "    @total = @total + n\n",
        "  end\n",
        "end\n",
        "c = Counter.new\n",
        "(1..4).each { |i| c.add(i) }\n",
        "puts c.total\n",
    ));
    sri().arg(file.path()).assert().success().stdout("10\n");
}

#[test]
fn verbose_env_var_emits_traces() {
    let file = script("puts 1.to_s\n");
    sri()
        .arg(file.path())
        .env("RUBY_VERBOSE", "true")
        .assert()
        .success()
        .stdout("1\n")
        .stderr(predicate::str::contains("dispatch"));
}

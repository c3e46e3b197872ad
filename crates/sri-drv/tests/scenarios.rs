//! End-to-end scenarios: whole programs in, exact stdout back.

use sri_drv::{eval_capturing, EvalOptions};

fn run(source: &str) -> String {
    let (result, out) = eval_capturing(source, &EvalOptions::default());
    result.expect("program should evaluate");
    out
}

fn run_err(source: &str) -> String {
    let (result, _) = eval_capturing(source, &EvalOptions::default());
    format!("{:#}", result.expect_err("program should fail"))
}

#[test]
fn arithmetic_precedence() {
    assert_eq!(run("puts 1 + 2*3"), "7\n");
}

#[test]
fn array_growth_and_nil_reads() {
    let source = "a = [1,2,3]; a[5] = 9; puts a.length; puts a[4].inspect";
    assert_eq!(run(source), "6\nnil\n");
}

#[test]
fn recursive_factorial() {
    let source = "def fact(n); return 1 if n < 2; n * fact(n-1); end; puts fact(5)";
    assert_eq!(run(source), "120\n");
}

#[test]
fn class_with_accessor() {
    let source = concat!(
        "class Box; attr_accessor :v; def initialize(x); @v = x; end; end; ",
        "b = Box.new(7); b.v = b.v + 3; puts b.v",
    );
    assert_eq!(run(source), "10\n");
}

#[test]
fn hash_keys_and_lookup() {
    let source = "h = {a: 1, b: 2}; h[:c] = 3; puts h.keys.length; puts h[:b]";
    assert_eq!(run(source), "3\n2\n");
}

#[test]
fn range_select_each_chain() {
    let source = "(1..5).select { |x| x.even? }.each { |x| puts x }";
    assert_eq!(run(source), "2\n4\n");
}

// Invariants from the testable-properties list.

#[test]
fn truthiness_negation_identity() {
    let source = concat!(
        "[nil, false, true, 0, \"\", []].each { |v| ",
        "puts (!v) == (v == nil || v == false) }",
    );
    assert_eq!(run(source), "true\ntrue\ntrue\ntrue\ntrue\ntrue\n");
}

#[test]
fn integer_predicates_agree_with_arithmetic() {
    let source = concat!(
        "for n in [-3, -2, -1, 0, 1, 2, 3]\n",
        "  puts n.even? == (n % 2 == 0)\n",
        "  puts n.zero? == (n == 0)\n",
        "  puts n.negative? == (n < 0)\n",
        "  puts n.positive? == (n > 0)\n",
        "end",
    );
    assert_eq!(run(source), "true\n".repeat(28));
}

#[test]
fn integer_division_truncates_toward_zero() {
    assert_eq!(run("puts 7 / 2\nputs -7 / 2\nputs 7 / -2"), "3\n-3\n-3\n");
}

#[test]
fn range_enumeration_lengths() {
    let source = concat!(
        "puts (3..7).to_a.length == (7 - 3 + 1)\n",
        "puts (3...7).to_a.length == (7 - 3)\n",
        "puts (7...3).to_a.length == 0",
    );
    assert_eq!(run(source), "true\ntrue\ntrue\n");
}

#[test]
fn map_preserves_length_and_order() {
    let source = concat!(
        "a = [3, 1, 2]\n",
        "b = a.map { |x| x * 10 }\n",
        "puts b.length == a.length\n",
        "puts b[0]\nputs b[1]\nputs b[2]\n",
        "puts a.select { |x| x > 1 }[0]",
    );
    assert_eq!(run(source), "true\n30\n10\n20\n3\n");
}

#[test]
fn puts_prints_one_line_per_scalar_and_unwraps_arrays() {
    assert_eq!(run("puts 1"), "1\n");
    assert_eq!(run("puts [1,2,3]"), "1\n2\n3\n");
    assert_eq!(run("puts nil"), "\n");
}

#[test]
fn hash_round_trip_invariant() {
    let source = concat!(
        "h = {}\n",
        "h[\"k\"] = 7\n",
        "puts h[\"k\"] == 7\n",
        "puts h.key?(\"k\")\n",
        "h.delete(\"k\")\n",
        "puts h.key?(\"k\")",
    );
    assert_eq!(run(source), "true\ntrue\nfalse\n");
}

// Output formats.

#[test]
fn stdout_formats_for_compound_values() {
    assert_eq!(run("puts :sym"), "sym\n");
    assert_eq!(run("p (1..3)"), "1..3\n");
    assert_eq!(run("p({a: 1, \"s\" => 2})"), "{a=>1, \"s\"=>2}\n");
    assert_eq!(run("p [1, \"s\", :t]"), "[1 \"s\" t]\n");
    assert_eq!(run("print \"ab\"\nprint \"c\""), "abc");
}

#[test]
fn interpolation_and_word_arrays() {
    assert_eq!(run("name = \"world\"\nputs \"hello #{name}!\""), "hello world!\n");
    assert_eq!(run("puts %w(x y z).length"), "3\n");
    assert_eq!(run("n = 2\nputs %W(a#{n} b)[0]"), "a2\n");
}

// Error surfaces.

#[test]
fn name_errors_match_documented_surface() {
    assert!(run_err("nope").contains("Undefined variable: nope"));
    assert!(run_err("NopeClass").contains("Uninitialized constant NopeClass"));
    assert!(run_err("3.launch").contains("Unknown method: launch on Integer"));
    assert!(run_err("1 / 0").contains("divided by 0"));
    assert!(run_err("Integer.sqrt").contains("Integer.sqrt requires exactly 1 argument"));
    assert!(run_err("[1].each").contains("no block given"));
}

#[test]
fn should_expectations() {
    let (result, _) = eval_capturing("(1 + 1).should == 2", &EvalOptions::default());
    assert!(result.is_ok());
    assert!(run_err("1.should eq(2)").contains("expected 2, got 1"));
}

//! End-to-end tests for the stylesheet compiler

use rstest::rstest;
use terrace::stylesheet::StylesheetError;
use terrace::testing::BuildCounter;
use terrace::StylesheetCompiler;

const SAMPLE: &str = "\
!accent = #336699
ul, ol
  :margin 0
  li
    :font
      :size 1.2em
    :color = !accent + #111
";

fn compile(style: &str, source: &str) -> String {
    let mut compiler = StylesheetCompiler::default();
    compiler.set_style(style).unwrap();
    compiler.compile(source, &[]).unwrap()
}

#[rstest]
#[case(
    "nested",
    "ul, ol {\n  margin: 0; }\n  ul li, ol li {\n    font-size: 1.2em;\n    color: rgb(68, 119, 170); }"
)]
#[case(
    "expanded",
    "ul, ol {\n  margin: 0;\n}\n\nul li, ol li {\n  font-size: 1.2em;\n  color: rgb(68, 119, 170);\n}"
)]
#[case(
    "compact",
    "ul, ol{margin:0;}\nul li, ol li{font-size:1.2em;color:rgb(68, 119, 170);}"
)]
#[case(
    "compressed",
    "ul,ol{margin:0}ul li,ol li{font-size:1.2em;color:rgb(68, 119, 170)}"
)]
fn test_sample_in_every_style(#[case] style: &str, #[case] expected: &str) {
    assert_eq!(compile(style, SAMPLE), expected);
}

#[test]
fn test_rules_without_attributes_are_skipped() {
    insta::assert_snapshot!(compile("compact", "html\n  body\n    p\n      :margin 0"), @"html body p{margin:0;}");
}

#[test]
fn test_later_attribute_overrides_earlier_one() {
    insta::assert_snapshot!(compile("compact", "a\n  :color red\n  :color blue"), @"a{color:blue;}");
}

#[test]
fn test_computed_lengths_and_percentages() {
    let source = "!gutter = 10px\n.col\n  :width = (!gutter + 5px) * 4\n  :padding = 20px + 50%";
    insta::assert_snapshot!(compile("compact", source), @".col{width:60px;padding:30px;}");
}

#[test]
fn test_calculation_error_reports_line() {
    let err = StylesheetCompiler::default()
        .compile("a\n  :width = 10px / 0", &[])
        .unwrap_err();
    assert!(matches!(err, StylesheetError::Calculation { line: 2, .. }));
    assert!(err.to_string().starts_with("line 2:"));
}

#[test]
fn test_compile_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("site.sass");
    std::fs::write(&path, "p\n  :margin = !m * 2\n").unwrap();
    let css = StylesheetCompiler::default()
        .compile_file(&path, &[("m", "3px")])
        .unwrap();
    assert_eq!(css, "p {\n  margin: 6px; }");

    let missing = StylesheetCompiler::default().compile_file(dir.path().join("nope.sass"), &[]);
    assert!(matches!(missing, Err(StylesheetError::SourceNotFound { .. })));
}

#[test]
fn test_content_hash_cache_skips_parsing() {
    let dir = tempfile::tempdir().unwrap();
    let counter = BuildCounter::new();
    let mut compiler = StylesheetCompiler::default()
        .with_cache_dir(dir.path())
        .on_tree_built(counter.hook());

    let first = compiler.compile(SAMPLE, &[]).unwrap();
    let second = compiler.compile(SAMPLE, &[]).unwrap();
    assert_eq!(first, second);
    assert_eq!(counter.count(), 1);

    compiler.compile(SAMPLE, &[("accent", "#000")]).unwrap();
    assert_eq!(counter.count(), 2);

    compiler.set_style("compressed").unwrap();
    compiler.compile(SAMPLE, &[]).unwrap();
    assert_eq!(counter.count(), 3);

    let uncached = compiler.without_cache();
    uncached.compile(SAMPLE, &[]).unwrap();
    assert_eq!(counter.count(), 4);
}

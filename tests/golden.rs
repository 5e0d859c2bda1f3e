//! Renders every symbol in the golden files and compares the result with the expected text.

use swift_ast_demangle::DemangleOptions;
use swift_ast_demangle::classify;

const GOLDEN_DATA: &str = include_str!("golden-manglings.txt");
const GOLDEN_DATA_SIMPLIFIED: &str = include_str!("golden-manglings-simplified.txt");

#[track_caller]
fn check_golden(data: &str, options: &DemangleOptions) {
    let mut failures = Vec::new();

    for case in test_utilities::golden_cases(data) {
        let actual = classify::demangle_symbol_as_string(case.mangled, options, false);

        if actual != case.expected {
            failures.push(format!(
                "line {}: {}\n  expected: {}\n  actual:   {actual}",
                case.line, case.mangled, case.expected
            ));
        }
    }

    assert!(failures.is_empty(), "{}", failures.join("\n"));
}

#[test]
fn test_golden_manglings() {
    check_golden(GOLDEN_DATA, &DemangleOptions::full());
}

#[test]
fn test_golden_manglings_simplified() {
    check_golden(GOLDEN_DATA_SIMPLIFIED, &DemangleOptions::simplified());
}

#[test]
fn test_golden_manglings_rewrite() {
    let options = DemangleOptions::full();
    let cases = test_utilities::golden_cases(GOLDEN_DATA);
    let document = cases.iter().map(|case| case.mangled).collect::<Vec<_>>().join("\n");
    let rewritten = classify::rewrite_all_occurrences(&document, &options);

    let expected = cases.iter().map(|case| case.expected).collect::<Vec<_>>().join("\n");

    assert_eq!(rewritten, expected);
}

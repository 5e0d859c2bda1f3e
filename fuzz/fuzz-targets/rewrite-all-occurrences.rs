#![no_main]

use swift_ast_demangle::DemangleOptions;
use swift_ast_demangle::classify;

fn fuzz_with(data: &str) {
    let options = DemangleOptions::simplified();
    let rewritten = classify::rewrite_all_occurrences(data, &options);

    if !data.contains(['$', '_']) {
        assert_eq!(rewritten, data);
    }

    let _ = classify::classify(data);
}

libfuzzer_sys::fuzz_target!(|data: &str| {
    fuzz_with(data);
});

#![no_main]

use swift_ast_demangle::{DemangleOptions, PrintingError};
use test_utilities::BoundedWriter;

const CAPACITY: usize = 65536;

fn fuzz_with(data: &[u8]) {
    if let Some(tree) = swift_ast_demangle::decode(data) {
        for options in [DemangleOptions::full(), DemangleOptions::simplified()] {
            let mut sink = BoundedWriter::new(String::new(), CAPACITY);

            match (
                swift_ast_demangle::render_to(&tree, &options, &mut sink),
                swift_ast_demangle::render(&tree, &options),
            ) {
                (Ok(()), Ok(rendered)) => assert_eq!(sink.into_inner(), rendered),
                (Err(PrintingError::Format(_)), Ok(rendered)) => assert!(rendered.len() > CAPACITY),
                (Err(error), Err(expected)) => assert_eq!(error, expected),
                (result, expected) => panic!("render_to returned {result:?}, render returned {expected:?}"),
            }
        }
    }

    let _ = swift_ast_demangle::decode_type(data);
}

libfuzzer_sys::fuzz_target!(|data: &[u8]| {
    fuzz_with(data);
});

use super::PrintingError;
use crate::kinds::{FunctionSigSpecializationParamOptions, SpecializationParamKind};
use crate::node::{self, Kind, Node, Payload};
use crate::options::{DemangleFlags, DemangleOptions};
use std::rc::Rc;

#[track_caller]
fn check_with(mangled: &str, options: &DemangleOptions, expected: &str) {
    let tree = crate::decode(mangled.as_bytes()).unwrap();

    assert_eq!(super::render(&tree, options).unwrap(), expected);
}

#[track_caller]
fn check(mangled: &str, full: &str, simplified: &str) {
    check_with(mangled, &DemangleOptions::full(), full);
    check_with(mangled, &DemangleOptions::simplified(), simplified);
}

#[track_caller]
fn check_type(mangled: &str, options: &DemangleOptions, expected: &str) {
    let tree = crate::decode_type(mangled.as_bytes()).unwrap();

    assert_eq!(super::render(&tree, options).unwrap(), expected);
}

#[test]
fn test_functions() {
    check("$s4main3fooyyF", "main.foo() -> ()", "foo()");
    check("$s4main8identityyxxlF", "main.identity<A>(A) -> A", "identity<A>(_:)");
    check("$s4main3foo1xySiF", "main.foo(x: Swift.Int) -> ()", "foo(x:)");
}

#[test]
fn test_accessors() {
    check("$s4main3barSivg", "main.bar.getter : Swift.Int", "bar.getter");
}

#[test]
fn test_closures() {
    check(
        "$s4main3fooyyFyycfU_",
        "closure #1 () -> () in main.foo() -> ()",
        "closure #1 in foo()",
    );
}

#[test]
fn test_metadata() {
    check("$s4main3FooVMa", "type metadata accessor for main.Foo", "type metadata accessor for Foo");
}

#[test]
fn test_partial_apply() {
    check(
        "$s4main3fooyyFTA",
        "partial apply forwarder for main.foo() -> ()",
        "partial apply for foo()",
    );
}

#[test]
fn test_generic_specialization() {
    check(
        "$s4main8identityyxxlFSi_Tg5",
        "generic specialization <Swift.Int> of main.identity<A>(A) -> A",
        "specialized identity<A>(_:)",
    );
}

#[test]
fn test_suffix() {
    check_with(
        "$s4main3fooyyF.cold",
        &DemangleOptions::full(),
        "main.foo() -> () with unmangled suffix \".cold\"",
    );

    check_with("$s4main3fooyyF.cold", &DemangleOptions::simplified(), "foo()");
}

#[test]
fn test_hidden_module() {
    let options = DemangleOptions::full().hiding_module("main");

    check_with("$s4main3fooyyF", &options, "foo() -> ()");
    check_with("$s5Other3fooyyF", &options, "Other.foo() -> ()");
}

#[test]
fn test_sugar() {
    let full = DemangleOptions::full();

    check_type("SaySiG", &full, "Swift.Array<Swift.Int>");
    check_type(
        "SaySiG",
        &DemangleOptions::full().with(DemangleFlags::SYNTHESIZE_SUGAR_ON_TYPES, true),
        "[Swift.Int]",
    );
    check_type("SaySiG", &DemangleOptions::simplified(), "[Int]");
    check_type("SiSg", &DemangleOptions::simplified(), "Int?");
    check_type("SDySSSiG", &DemangleOptions::simplified(), "[String : Int]");
}

#[test]
fn test_stdlib_module() {
    let options = DemangleOptions::full().with(DemangleFlags::DISPLAY_STDLIB_MODULE, false);

    check_type("Si", &options, "Int");
    check_type("Si", &DemangleOptions::full(), "Swift.Int");
}

#[test]
fn test_generic_parameter_name() {
    assert_eq!(super::generic_parameter_name(0, 0), "A");
    assert_eq!(super::generic_parameter_name(0, 25), "Z");
    assert_eq!(super::generic_parameter_name(0, 27), "BB");
    assert_eq!(super::generic_parameter_name(1, 2), "C1");
}

#[test]
fn test_errors() {
    let options = DemangleOptions::full();

    assert_eq!(
        super::render(&Node::new(Kind::Type), &options),
        Err(PrintingError::MissingChild {
            kind: Kind::Type,
            index: 0
        })
    );

    assert_eq!(
        super::render(&Node::new(Kind::DependentGenericParamCount), &options),
        Err(PrintingError::UnexpectedKind {
            kind: Kind::DependentGenericParamCount
        })
    );

    let global = Node::with_children(Kind::Global, [Rc::new(Node::new(Kind::DependentGenericParamCount))]);

    assert!(matches!(
        super::render(&global, &options),
        Err(PrintingError::UnexpectedKind { .. })
    ));
}

#[test]
fn test_render_to() {
    let tree = crate::decode(b"$s4main3fooyyF").unwrap();
    let mut output = String::from("symbol: ");

    super::render_to(&tree, &DemangleOptions::simplified(), &mut output).unwrap();

    assert_eq!(output, "symbol: foo()");
}

#[test]
fn test_malformed_function_signature_specialization() {
    let options = DemangleOptions::full();

    // The parameter kind must be a code, not text.
    let malformed_return = node::parent(
        Kind::FunctionSignatureSpecializationReturn,
        [node::text(Kind::FunctionSignatureSpecializationParamKind, "Dead")],
    );

    let specialization = node::parent(
        Kind::FunctionSignatureSpecialization,
        [node::index(Kind::SpecializationPassID, 0), malformed_return],
    );

    assert_eq!(
        super::render(&specialization, &options),
        Err(PrintingError::InvalidPayload {
            kind: Kind::FunctionSignatureSpecializationParamKind
        })
    );

    // A return marker without its parameter kind.
    let empty_return = node::parent(
        Kind::FunctionSignatureSpecializationReturn,
        [node::leaf(Kind::FunctionSignatureSpecializationParamKind)],
    );

    let specialization = node::parent(
        Kind::FunctionSignatureSpecialization,
        [node::index(Kind::SpecializationPassID, 0), empty_return],
    );

    assert!(matches!(
        super::render(&specialization, &options),
        Err(PrintingError::InvalidPayload { .. })
    ));

    // The return marker only has a rule inside its specialization.
    let dead = node::tagged(
        Kind::FunctionSignatureSpecializationParamKind,
        Payload::SpecializationParamKind(SpecializationParamKind::from_options(
            FunctionSigSpecializationParamOptions::DEAD,
        )),
    );

    assert_eq!(
        super::render(
            &Node::with_children(Kind::FunctionSignatureSpecializationReturn, [dead]),
            &options
        ),
        Err(PrintingError::UnexpectedKind {
            kind: Kind::FunctionSignatureSpecializationReturn
        })
    );
}

#[test]
fn test_missing_child_index_saturates() {
    let function_type = Node::with_children(Kind::FunctionType, [node::leaf(Kind::ArgumentTuple)]);

    assert_eq!(
        super::render(&function_type, &DemangleOptions::full()),
        Err(PrintingError::MissingChild {
            kind: Kind::FunctionType,
            index: 1
        })
    );

    assert_eq!(
        super::missing_child(&function_type, usize::MAX),
        PrintingError::MissingChild {
            kind: Kind::FunctionType,
            index: u16::MAX
        }
    );
}

#[test]
fn test_deep_nesting() {
    let options = DemangleOptions::full();
    let mut tree = node::swift_type(Kind::Structure, "Int");

    for _ in 0..super::MAX_DEPTH {
        tree = node::ty(tree);
    }

    assert!(tree.height() > super::MAX_DEPTH);
    assert_eq!(super::render(&tree, &options), Err(PrintingError::TooComplex));

    let mut output = String::new();

    assert_eq!(
        super::render_to(&tree, &options, &mut output),
        Err(PrintingError::TooComplex)
    );
    assert!(output.is_empty());

    let mut shallow = node::swift_type(Kind::Structure, "Int");

    for _ in 0..100 {
        shallow = node::ty(shallow);
    }

    assert_eq!(super::render(&shallow, &options).unwrap(), "Swift.Int");
}

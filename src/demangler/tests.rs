use super::{Demangler, SymbolicReferenceResolver};
use crate::kinds::{Directness, SymbolicReferenceKind};
use crate::node::{self, Kind};

#[track_caller]
fn check_symbol(mangled: &str, expected: &str) {
    let tree = Demangler::new(mangled.as_bytes()).demangle_symbol().unwrap();

    assert_eq!(node::dump_tree(&tree), expected);
}

#[track_caller]
fn check_type(mangled: &str, expected: &str) {
    let tree = Demangler::new(mangled.as_bytes()).demangle_type().unwrap();

    assert_eq!(node::dump_tree(&tree), expected);
}

#[track_caller]
fn check_rejected(mangled: &str) {
    assert!(Demangler::new(mangled.as_bytes()).demangle_symbol().is_none());
}

#[test]
fn test_generic_function() {
    check_symbol(
        "$s4main8identityyxxlF",
        "\
kind=Global
  kind=Function
    kind=Module, text=\"main\"
    kind=Identifier, text=\"identity\"
    kind=LabelList
    kind=Type
      kind=DependentGenericType
        kind=DependentGenericSignature
          kind=DependentGenericParamCount, index=1
        kind=Type
          kind=FunctionType
            kind=ArgumentTuple
              kind=Type
                kind=DependentGenericParamType
                  kind=Index, index=0
                  kind=Index, index=0
            kind=ReturnType
              kind=Type
                kind=DependentGenericParamType
                  kind=Index, index=0
                  kind=Index, index=0
",
    );
}

#[test]
fn test_argument_labels() {
    check_symbol(
        "$s4main3foo1xySiF",
        "\
kind=Global
  kind=Function
    kind=Module, text=\"main\"
    kind=Identifier, text=\"foo\"
    kind=LabelList
      kind=Identifier, text=\"x\"
    kind=Type
      kind=FunctionType
        kind=ArgumentTuple
          kind=Type
            kind=Structure
              kind=Module, text=\"Swift\"
              kind=Identifier, text=\"Int\"
        kind=ReturnType
          kind=Type
            kind=Tuple
",
    );

    check_symbol(
        "$s4main3fooyyF",
        "\
kind=Global
  kind=Function
    kind=Module, text=\"main\"
    kind=Identifier, text=\"foo\"
    kind=Type
      kind=FunctionType
        kind=ArgumentTuple
          kind=Type
            kind=Tuple
        kind=ReturnType
          kind=Type
            kind=Tuple
",
    );
}

#[test]
fn test_substitutions() {
    check_symbol(
        "$s4main3FooVACycfC",
        "\
kind=Global
  kind=Allocator
    kind=Structure
      kind=Module, text=\"main\"
      kind=Identifier, text=\"Foo\"
    kind=Type
      kind=FunctionType
        kind=ArgumentTuple
          kind=Type
            kind=Tuple
        kind=ReturnType
          kind=Type
            kind=Structure
              kind=Module, text=\"main\"
              kind=Identifier, text=\"Foo\"
",
    );

    let mut demangler = Demangler::new(b"S3i");

    assert_eq!(demangler.parse_and_push_nodes(), Some(()));
    assert_eq!(demangler.node_stack.len(), 3);
    assert!(demangler.substitutions.is_empty());
}

#[test]
fn test_generic_requirement() {
    let tree = Demangler::new(b"$s4main3fooyyxAA1PRzlF").demangle_symbol().unwrap();
    let dump = node::dump_tree(&tree);

    assert!(dump.contains(
        "\
        kind=DependentGenericSignature
          kind=DependentGenericParamCount, index=1
          kind=DependentGenericConformanceRequirement
            kind=Type
              kind=DependentGenericParamType
                kind=Index, index=0
                kind=Index, index=0
            kind=Type
              kind=Protocol
                kind=Module, text=\"main\"
                kind=Identifier, text=\"P\"
"
    ));
}

#[test]
fn test_bound_generic_type() {
    check_type(
        "SaySiG",
        "\
kind=Type
  kind=BoundGenericStructure
    kind=Type
      kind=Structure
        kind=Module, text=\"Swift\"
        kind=Identifier, text=\"Array\"
    kind=TypeList
      kind=Type
        kind=Structure
          kind=Module, text=\"Swift\"
          kind=Identifier, text=\"Int\"
",
    );
}

#[test]
fn test_tuples() {
    check_type(
        "Si1x_SS1yt",
        "\
kind=Type
  kind=Tuple
    kind=TupleElement
      kind=TupleElementName, text=\"x\"
      kind=Type
        kind=Structure
          kind=Module, text=\"Swift\"
          kind=Identifier, text=\"Int\"
    kind=TupleElement
      kind=TupleElementName, text=\"y\"
      kind=Type
        kind=Structure
          kind=Module, text=\"Swift\"
          kind=Identifier, text=\"String\"
",
    );
}

#[test]
fn test_word_substitutions() {
    let tree = Demangler::new(b"4main12SomeLongNameV0bD3FooV").demangle_type().unwrap();
    let structure = tree.first_child().unwrap();

    assert_eq!(structure.kind(), Kind::Structure);
    assert_eq!(structure.child(1).and_then(|name| name.text()), Some("SomeNameFoo"));
    assert_eq!(structure.first_child().map(|parent| parent.kind()), Some(Kind::Structure));

    // Word index past the harvested words.
    let mut demangler = Demangler::new(b"4main0z3FooV");

    assert_eq!(demangler.parse_and_push_nodes(), None);
}

#[test]
fn test_punycode_identifier() {
    let tree = Demangler::new(b"4main006ma_AjaV").demangle_type().unwrap();
    let name = tree.first_child().and_then(|structure| structure.child(1)).unwrap();

    assert_eq!(name.text(), Some("mañ"));
}

#[test]
fn test_lowered_function_type() {
    check_type(
        "SiSiIegyd_",
        "\
kind=Type
  kind=ImplFunctionType
    kind=ImplEscaping
    kind=ImplConvention, text=\"@callee_guaranteed\"
    kind=ImplParameter
      kind=ImplConvention, text=\"@unowned\"
      kind=Type
        kind=Structure
          kind=Module, text=\"Swift\"
          kind=Identifier, text=\"Int\"
    kind=ImplResult
      kind=ImplConvention, text=\"@unowned\"
      kind=Type
        kind=Structure
          kind=Module, text=\"Swift\"
          kind=Identifier, text=\"Int\"
",
    );
}

#[test]
fn test_function_attributes() {
    let tree = Demangler::new(b"$s4main3fooyyxlFSi_Tg5").demangle_symbol().unwrap();

    assert_eq!(tree.num_children(), 2);

    let specialization = tree.first_child().unwrap();

    assert_eq!(specialization.kind(), Kind::GenericSpecialization);
    assert_eq!(specialization.first_child().and_then(|pass| pass.index()), Some(5));
    assert_eq!(
        specialization.child(1).map(|param| param.kind()),
        Some(Kind::GenericSpecializationParam)
    );
    assert_eq!(tree.child(1).map(|function| function.kind()), Some(Kind::Function));

    let tree = Demangler::new(b"$s4main3fooyyFTA").demangle_symbol().unwrap();
    let forwarder = tree.first_child().unwrap();

    assert_eq!(tree.num_children(), 1);
    assert_eq!(forwarder.kind(), Kind::PartialApplyForwarder);
    assert_eq!(forwarder.first_child().map(|function| function.kind()), Some(Kind::Function));
}

#[test]
fn test_suffix() {
    let tree = Demangler::new(b"$s4main3fooyyF.cold").demangle_symbol().unwrap();

    assert_eq!(tree.last_child().and_then(|suffix| suffix.text()), Some(".cold"));
}

#[test]
fn test_rejected_symbols() {
    check_rejected("$s");
    check_rejected("$sZZ");
    check_rejected("_Z3foov");
    check_rejected("$s4main0z");
}

#[test]
fn test_empty_identifiers() {
    // A punycode marker directly followed by the terminator spells an empty name.
    check_rejected("$s4main000yyF");
    check_rejected("$s000");
    check_rejected("$s4main0000yyF");
}

#[test]
fn test_deep_nesting() {
    let deep = format!("$sSi{}D", "Sg".repeat(1000));

    check_rejected(&deep);

    let deep_type = format!("Si{}", "Sg".repeat(1000));
    let tree = Demangler::new(deep_type.as_bytes()).demangle_type().unwrap();

    assert!(tree.height() <= super::MAX_NODE_HEIGHT);

    let nested = format!("$sSi{}D", "Sg".repeat(20));
    let tree = Demangler::new(nested.as_bytes()).demangle_symbol().unwrap();

    assert!(tree.height() > 60);
    assert_eq!(
        crate::render(&tree, &crate::DemangleOptions::simplified()).unwrap(),
        format!("Int{}", "?".repeat(20))
    );
}

#[test]
fn test_symbolic_references() {
    let input = b"\x01\x10\x00\x00\x00ySiG";

    // Without a resolver the reference cannot be decoded.
    let tree = Demangler::new(input).demangle_type().unwrap();

    assert_eq!(tree.kind(), Kind::Suffix);

    let mut seen = Vec::new();
    let mut resolve = |kind: SymbolicReferenceKind, directness: Directness, offset: i32, at: &[u8]| {
        seen.push((kind, directness, offset, at.len()));

        Some(node::ty(node::index(Kind::TypeSymbolicReference, u64::from(offset.unsigned_abs()))))
    };

    let resolver: &mut SymbolicReferenceResolver<'_, '_> = &mut resolve;
    let tree = Demangler::with_resolver(input, resolver).demangle_type().unwrap();

    assert_eq!(
        node::dump_tree(&tree),
        "\
kind=Type
  kind=BoundGenericOtherNominalType
    kind=Type
      kind=TypeSymbolicReference, index=16
    kind=TypeList
      kind=Type
        kind=Structure
          kind=Module, text=\"Swift\"
          kind=Identifier, text=\"Int\"
"
    );

    assert_eq!(seen, [(SymbolicReferenceKind::Context, Directness::Direct, 16, 8)]);
}

#[test]
fn test_symbolic_reference_with_several_argument_lists() {
    let mut resolve = |_: SymbolicReferenceKind, _: Directness, offset: i32, _: &[u8]| {
        Some(node::ty(node::index(Kind::TypeSymbolicReference, u64::from(offset.unsigned_abs()))))
    };

    let resolver: &mut SymbolicReferenceResolver<'_, '_> = &mut resolve;
    let tree = Demangler::with_resolver(b"\x01\x10\x00\x00\x00ySi_SS_SbG", resolver)
        .demangle_type()
        .unwrap();

    // The referenced type has no known parents, so every list lands on it, outermost first.
    assert_eq!(
        node::dump_tree(&tree),
        "\
kind=Type
  kind=BoundGenericOtherNominalType
    kind=Type
      kind=TypeSymbolicReference, index=16
    kind=TypeList
      kind=Type
        kind=Structure
          kind=Module, text=\"Swift\"
          kind=Identifier, text=\"Int\"
      kind=Type
        kind=Structure
          kind=Module, text=\"Swift\"
          kind=Identifier, text=\"String\"
      kind=Type
        kind=Structure
          kind=Module, text=\"Swift\"
          kind=Identifier, text=\"Bool\"
"
    );
}

#[test]
fn test_resolver_reused_across_symbols() {
    let mut seen = Vec::new();
    let mut resolve = |_: SymbolicReferenceKind, _: Directness, offset: i32, at: &[u8]| {
        seen.push((offset, at.len()));

        Some(node::ty(node::index(Kind::TypeSymbolicReference, u64::from(offset.unsigned_abs()))))
    };

    let first = {
        let resolver: &mut SymbolicReferenceResolver<'_, '_> = &mut resolve;

        Demangler::with_resolver(b"\x01\x10\x00\x00\x00ySiG", resolver)
            .demangle_type()
            .unwrap()
    };

    let second = {
        let resolver: &mut SymbolicReferenceResolver<'_, '_> = &mut resolve;

        Demangler::with_resolver(b"\x01\x20\x00\x00\x00", resolver)
            .demangle_type()
            .unwrap()
    };

    // Substitutions made while decoding the first symbol are not visible to later ones.
    let third = {
        let resolver: &mut SymbolicReferenceResolver<'_, '_> = &mut resolve;

        Demangler::with_resolver(b"AA", resolver).demangle_type().unwrap()
    };

    assert_eq!(first.kind(), Kind::Type);
    assert_eq!(first.first_child().unwrap().kind(), Kind::BoundGenericOtherNominalType);
    assert_eq!(
        node::dump_tree(&second),
        "\
kind=Type
  kind=TypeSymbolicReference, index=32
"
    );
    assert_eq!(third.kind(), Kind::Suffix);
    assert_eq!(seen, [(16, 8), (32, 4)]);
}

#[test]
fn test_objc_type_names() {
    check_symbol(
        "_TtC4main3Foo",
        "\
kind=Global
  kind=TypeMangling
    kind=Type
      kind=Class
        kind=Module, text=\"main\"
        kind=Identifier, text=\"Foo\"
",
    );

    check_rejected("_TtP4main3Foo");
}

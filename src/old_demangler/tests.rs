use super::OldDemangler;
use crate::kinds::{Directness, ValueWitnessKind};
use crate::node::{self, Kind, Payload};

#[track_caller]
fn check(mangled: &str, expected: &str) {
    let tree = OldDemangler::new(mangled.as_bytes()).demangle_top_level().unwrap();

    assert_eq!(node::dump_tree(&tree), expected);
}

#[track_caller]
fn check_rejected(mangled: &str) {
    assert!(OldDemangler::new(mangled.as_bytes()).demangle_top_level().is_none());
}

#[test]
fn test_function() {
    check(
        "_TF4main3fooFT_T_",
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
    check(
        "_TFC4main3Foo3bazfS0_FT_T_",
        "\
kind=Global
  kind=Function
    kind=Class
      kind=Module, text=\"main\"
      kind=Identifier, text=\"Foo\"
    kind=Identifier, text=\"baz\"
    kind=Type
      kind=UncurriedFunctionType
        kind=ArgumentTuple
          kind=Type
            kind=Class
              kind=Module, text=\"main\"
              kind=Identifier, text=\"Foo\"
        kind=ReturnType
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

    // Only one module and one class were recorded.
    check_rejected("_TFC4main3Foo3bazfS1_FT_T_");
}

#[test]
fn test_operators_and_standard_types() {
    check(
        "_TFsoi2eeFTSiSi_Sb",
        "\
kind=Global
  kind=Function
    kind=Module, text=\"Swift\"
    kind=InfixOperator, text=\"==\"
    kind=Type
      kind=FunctionType
        kind=ArgumentTuple
          kind=Type
            kind=Tuple
              kind=TupleElement
                kind=Type
                  kind=Structure
                    kind=Module, text=\"Swift\"
                    kind=Identifier, text=\"Int\"
              kind=TupleElement
                kind=Type
                  kind=Structure
                    kind=Module, text=\"Swift\"
                    kind=Identifier, text=\"Int\"
        kind=ReturnType
          kind=Type
            kind=Structure
              kind=Module, text=\"Swift\"
              kind=Identifier, text=\"Bool\"
",
    );

    // `b` is not an operator character.
    check_rejected("_TFsoi2bbFTSiSi_Sb");
}

#[test]
fn test_accessors() {
    check(
        "_TFC4main3Foog3barSi",
        "\
kind=Global
  kind=Getter
    kind=Variable
      kind=Class
        kind=Module, text=\"main\"
        kind=Identifier, text=\"Foo\"
      kind=Identifier, text=\"bar\"
      kind=Type
        kind=Structure
          kind=Module, text=\"Swift\"
          kind=Identifier, text=\"Int\"
",
    );

    check(
        "_TFC4main3Foog9subscriptFSiSi",
        "\
kind=Global
  kind=Getter
    kind=Subscript
      kind=Class
        kind=Module, text=\"main\"
        kind=Identifier, text=\"Foo\"
      kind=Type
        kind=FunctionType
          kind=ArgumentTuple
            kind=Type
              kind=Structure
                kind=Module, text=\"Swift\"
                kind=Identifier, text=\"Int\"
          kind=ReturnType
            kind=Type
              kind=Structure
                kind=Module, text=\"Swift\"
                kind=Identifier, text=\"Int\"
",
    );
}

#[test]
fn test_static_and_attributes() {
    let tree = OldDemangler::new(b"_TToZFC4main3Foo3bazfMS0_FT_T_").demangle_top_level().unwrap();

    assert_eq!(tree.first_child().map(|attribute| attribute.kind()), Some(Kind::ObjCAttribute));

    let entity = tree.child(1).unwrap();

    assert_eq!(entity.kind(), Kind::Static);
    assert_eq!(entity.first_child().map(|function| function.kind()), Some(Kind::Function));
}

#[test]
fn test_specialization_header() {
    check(
        "_TTSg5Si___TF4main3fooFT_T_",
        "\
kind=Global
  kind=GenericSpecialization
    kind=SpecializationPassID, index=5
    kind=GenericSpecializationParam
      kind=Type
        kind=Structure
          kind=Module, text=\"Swift\"
          kind=Identifier, text=\"Int\"
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

    let tree = OldDemangler::new(b"_TTSf4n_d___TF4main3fooFT_T_").demangle_top_level().unwrap();
    let specialization = tree.first_child().unwrap();

    assert_eq!(specialization.kind(), Kind::FunctionSignatureSpecialization);
    assert_eq!(specialization.num_children(), 3);
    assert_eq!(specialization.child(1).map(|param| param.num_children()), Some(0));
    assert_eq!(
        specialization.child(2).and_then(|param| param.first_child()).map(|kind| kind.payload_category()),
        Some(node::PayloadCategory::Tag)
    );

    // The header must be followed by a global.
    check_rejected("_TTSg5Si___");
}

#[test]
fn test_metadata_and_witnesses() {
    check(
        "_TMC4main3Foo",
        "\
kind=Global
  kind=TypeMetadata
    kind=Type
      kind=Class
        kind=Module, text=\"main\"
        kind=Identifier, text=\"Foo\"
",
    );

    let tree = OldDemangler::new(b"_TwxxV4main3Foo").demangle_top_level().unwrap();
    let witness = tree.first_child().unwrap();

    assert_eq!(witness.kind(), Kind::ValueWitness);
    assert!(matches!(
        witness.first_child().map(|index| index.payload()),
        Some(Payload::ValueWitnessKind(ValueWitnessKind::Destroy))
    ));

    let tree = OldDemangler::new(b"_TWvdvC4main3Foo1xSi").demangle_top_level().unwrap();
    let offset = tree.first_child().unwrap();

    assert_eq!(offset.kind(), Kind::FieldOffset);
    assert!(matches!(
        offset.first_child().map(|directness| directness.payload()),
        Some(Payload::Directness(Directness::Direct))
    ));
    assert_eq!(offset.child(1).map(|variable| variable.kind()), Some(Kind::Variable));
}

#[test]
fn test_generic_parameters() {
    let tree = OldDemangler::new(b"_TF4main8identityurFxx").demangle_top_level().unwrap();
    let dump = node::dump_tree(&tree);

    assert!(dump.contains("kind=DependentGenericType"));
    assert!(dump.contains("kind=DependentGenericParamCount, index=1"));

    let tree = OldDemangler::new(b"_TF4main3fooFqd__T_").demangle_top_level().unwrap();
    let dump = node::dump_tree(&tree);

    assert!(dump.contains(
        "\
kind=DependentGenericParamType
              kind=Index, index=1
              kind=Index, index=0
"
    ));
}

#[test]
fn test_punycode_and_suffix() {
    let tree = OldDemangler::new(b"_TF4mainX6ma_AjaFT_T_.cold").demangle_top_level().unwrap();
    let function = tree.first_child().unwrap();

    assert_eq!(function.child(1).and_then(|name| name.text()), Some("mañ"));
    assert_eq!(tree.last_child().and_then(|suffix| suffix.text()), Some(".cold"));
}

#[test]
fn test_rejected_symbols() {
    check_rejected("");
    check_rejected("_T");
    check_rejected("$s4main3fooyyF");
    check_rejected("_TF4main");
    check_rejected("_TWZ");
}

#[test]
fn test_deep_nesting() {
    check_rejected(&format!("_Tt{}Si{}", "GSq".repeat(3000), "_".repeat(3000)));
    check_rejected(&format!("_TF{}3fooFT_T_", "E4main".repeat(1000)));
    check_rejected(&format!("{}F4main3fooFT_T_", "_TPA_".repeat(1000)));

    let nested = format!("_Tt{}Si{}", "GSq".repeat(10), "_".repeat(10));
    let tree = OldDemangler::new(nested.as_bytes()).demangle_top_level().unwrap();

    assert_eq!(
        crate::render(&tree, &crate::DemangleOptions::simplified()).unwrap(),
        format!("Int{}", "?".repeat(10))
    );

    let forwarders = OldDemangler::new(b"_TPA__TPA__TF4main3fooFT_T_").demangle_top_level().unwrap();

    assert_eq!(forwarders.first_child().map(|forwarder| forwarder.kind()), Some(Kind::PartialApplyForwarder));
}

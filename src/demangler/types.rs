use super::{Demangler, dependent_generic_param_type};
use crate::kinds::MangledDifferentiabilityKind;
use crate::node::{self, Kind, Node, Payload};
use std::borrow::Cow;
use std::rc::Rc;

const MAX_BUILTIN_TYPE_SIZE: u64 = 4096;
const BUILTIN_TYPE_NAME_PREFIX: &str = "Builtin.";

enum RequirementSubject {
    Generic,
    Assoc,
    CompoundAssoc,
    Substitution,
}

enum RequirementConstraint {
    Protocol,
    BaseClass,
    SameType,
    Layout,
}

impl<'a> Demangler<'a, '_> {
    pub(super) fn demangle_builtin_type(&mut self) -> Option<Rc<Node<'a>>> {
        let name: Cow<'static, str> = match self.cursor.next()? {
            b'b' => "Builtin.BridgeObject".into(),
            b'B' => "Builtin.UnsafeValueBuffer".into(),
            b'e' => "Builtin.Executor".into(),
            b'f' => format!("Builtin.FPIEEE{}", self.demangle_builtin_size()?).into(),
            b'i' => format!("Builtin.Int{}", self.demangle_builtin_size()?).into(),
            b'I' => "Builtin.IntLiteral".into(),
            b'v' => {
                let elements = self.demangle_builtin_size()?;
                let element_type = self.pop_type_and_get_child()?;

                if element_type.kind() != Kind::BuiltinTypeName {
                    return None;
                }

                let element_name = element_type.text()?.strip_prefix(BUILTIN_TYPE_NAME_PREFIX)?;

                format!("Builtin.Vec{elements}x{element_name}").into()
            }
            b'O' => "Builtin.UnknownObject".into(),
            b'o' => "Builtin.NativeObject".into(),
            b'p' => "Builtin.RawPointer".into(),
            b't' => "Builtin.SILToken".into(),
            b'w' => "Builtin.Word".into(),
            b'c' => "Builtin.RawUnsafeContinuation".into(),
            b'D' => "Builtin.DefaultActorStorage".into(),
            b'j' => "Builtin.Job".into(),
            _ => return None,
        };

        Some(node::ty(node::text(Kind::BuiltinTypeName, name)))
    }

    fn demangle_builtin_size(&mut self) -> Option<u64> {
        self.demangle_index()?
            .checked_sub(1)
            .filter(|size| (1..=MAX_BUILTIN_TYPE_SIZE).contains(size))
    }

    pub(super) fn demangle_any_generic_type(&mut self, kind: Kind) -> Option<Rc<Node<'a>>> {
        let name = self.pop_if(Kind::is_decl_name)?;
        let context = self.pop_context()?;
        let ty = node::ty(node::parent(kind, [context, name]));

        self.add_substitution(Rc::clone(&ty));

        Some(ty)
    }

    /// Pops the argument lists of a bound generic type, innermost list first.
    fn demangle_bound_generics(&mut self) -> Option<(Vec<Rc<Node<'a>>>, Option<Rc<Node<'a>>>)> {
        let retroactive_conformances = self.pop_retroactive_conformances();
        let mut type_lists = Vec::new();

        loop {
            let mut types = Vec::new();

            while let Some(ty) = self.pop_kind(Kind::Type) {
                types.push(ty);
            }

            types.reverse();
            type_lists.push(node::parent(Kind::TypeList, types));

            if self.pop_kind(Kind::EmptyList).is_some() {
                break;
            }

            self.pop_kind(Kind::FirstElementMarker)?;
        }

        Some((type_lists, retroactive_conformances))
    }

    fn pop_retroactive_conformances(&mut self) -> Option<Rc<Node<'a>>> {
        let mut conformances = Vec::new();

        while let Some(conformance) = self.pop_kind(Kind::RetroactiveConformance) {
            conformances.push(conformance);
        }

        if conformances.is_empty() {
            None
        } else {
            conformances.reverse();

            Some(node::parent(Kind::TypeList, conformances))
        }
    }

    pub(super) fn demangle_bound_generic_type(&mut self) -> Option<Rc<Node<'a>>> {
        let (type_lists, retroactive_conformances) = self.demangle_bound_generics()?;
        let nominal = self.pop_type_and_get_any_generic()?;
        let mut bound = Rc::unwrap_or_clone(demangle_bound_generic_args(&nominal, &type_lists, 0)?);

        if let Some(conformances) = retroactive_conformances {
            bound.add_child(conformances);
        }

        let ty = node::ty(Rc::new(bound));

        self.add_substitution(Rc::clone(&ty));

        Some(ty)
    }

    // Function types.

    pub(super) fn pop_function_type(&mut self, kind: Kind, has_clang_type: bool) -> Option<Rc<Node<'a>>> {
        let mut function_type = Node::new(kind);

        if has_clang_type {
            function_type.add_child(self.demangle_clang_type()?);
        }

        for annotation in [
            Kind::GlobalActorFunctionType,
            Kind::DifferentiableFunctionType,
            Kind::ThrowsAnnotation,
            Kind::ConcurrentFunctionType,
            Kind::AsyncAnnotation,
        ] {
            if let Some(node) = self.pop_kind(annotation) {
                function_type.add_child(node);
            }
        }

        function_type.add_child(self.pop_function_params(Kind::ArgumentTuple)?);
        function_type.add_child(self.pop_function_params(Kind::ReturnType)?);

        Some(node::ty(Rc::new(function_type)))
    }

    fn pop_function_params(&mut self, kind: Kind) -> Option<Rc<Node<'a>>> {
        let params = if self.pop_kind(Kind::EmptyList).is_some() {
            node::ty(node::leaf(Kind::Tuple))
        } else {
            self.pop_kind(Kind::Type)?
        };

        Some(node::parent(kind, [params]))
    }

    /// Pops the argument label list matching the parameters of `ty`. `ty` is rewritten when the labels are stored
    /// inline in its tuple elements.
    pub(super) fn pop_function_param_labels(&mut self, ty: &mut Option<Rc<Node<'a>>>) -> Option<Rc<Node<'a>>> {
        if !self.is_old_function_type_mangling && self.pop_kind(Kind::EmptyList).is_some() {
            return Some(node::leaf(Kind::LabelList));
        }

        let ty = ty.as_mut().filter(|ty| ty.kind() == Kind::Type)?;
        let path = parameter_tuple_path(ty)?;
        let params = follow(ty, &path)?;
        let num_params = if params.kind() == Kind::Tuple {
            params.num_children()
        } else {
            1
        };

        if num_params == 0 {
            return None;
        }

        let mut labels = Vec::with_capacity(num_params);

        if self.is_old_function_type_mangling {
            if params.kind() != Kind::Tuple {
                return Some(node::leaf(Kind::LabelList));
            }

            let tuple = follow_mut(ty, &path)?;

            for element in 0..num_params {
                let param = Rc::make_mut(tuple.children_mut().get_mut(element)?);

                let label = match param.children().iter().position(|child| child.kind() == Kind::TupleElementName) {
                    Some(position) => {
                        let name = param.remove_child_at(position)?;

                        node::text(Kind::Identifier, name.text()?.to_owned())
                    }
                    None => node::leaf(Kind::FirstElementMarker),
                };

                labels.push(label);
            }
        } else {
            for _ in 0..num_params {
                let label = self.pop_node()?;

                if !matches!(label.kind(), Kind::Identifier | Kind::FirstElementMarker) {
                    return None;
                }

                labels.push(label);
            }

            labels.reverse();
        }

        if labels.iter().all(|label| label.kind() == Kind::FirstElementMarker) {
            return Some(node::leaf(Kind::LabelList));
        }

        Some(node::parent(Kind::LabelList, labels))
    }

    pub(super) fn pop_tuple(&mut self) -> Option<Rc<Node<'a>>> {
        let elements = self.pop_list(|this| {
            let mut element = Node::new(Kind::TupleElement);

            if let Some(variadic) = this.pop_kind(Kind::VariadicMarker) {
                element.add_child(variadic);
            }

            if let Some(identifier) = this.pop_kind(Kind::Identifier) {
                element.add_child(Rc::new(identifier.with_kind(Kind::TupleElementName)));
            }

            element.add_child(this.pop_kind(Kind::Type)?);

            Some(Rc::new(element))
        })?;

        Some(node::ty(node::parent(Kind::Tuple, elements)))
    }

    pub(super) fn pop_type_list(&mut self) -> Option<Rc<Node<'a>>> {
        let types = self.pop_list(|this| this.pop_kind(Kind::Type))?;

        Some(node::parent(Kind::TypeList, types))
    }

    pub(super) fn demangle_protocol_list(&mut self) -> Option<Rc<Node<'a>>> {
        let protocols = self.pop_list(Self::pop_protocol)?;

        Some(node::parent(Kind::ProtocolList, [node::parent(Kind::TypeList, protocols)]))
    }

    pub(super) fn pop_protocol(&mut self) -> Option<Rc<Node<'a>>> {
        if let Some(ty) = self.pop_kind(Kind::Type) {
            return is_protocol_node(&ty).then_some(ty);
        }

        if let Some(reference) = self.pop_kind(Kind::ProtocolSymbolicReference) {
            return Some(reference);
        }

        let name = self.pop_if(Kind::is_decl_name)?;
        let context = self.pop_context()?;

        Some(node::ty(node::parent(Kind::Protocol, [context, name])))
    }

    pub(super) fn demangle_clang_type(&mut self) -> Option<Rc<Node<'a>>> {
        let length = self.cursor.natural::<usize>().filter(|&length| length != 0)?;

        Some(node::text(Kind::ClangType, self.cursor.text(length)?))
    }

    fn demangle_metatype_representation(&mut self) -> Option<Rc<Node<'a>>> {
        let representation = match self.cursor.next()? {
            b't' => "@thin",
            b'T' => "@thick",
            b'o' => "@objc_metatype",
            _ => return None,
        };

        Some(node::text(Kind::MetatypeRepresentation, representation))
    }

    pub(super) fn demangle_special_type(&mut self) -> Option<Rc<Node<'a>>> {
        let special = self.cursor.next()?;

        match special {
            b'E' => self.pop_function_type(Kind::NoEscapeFunctionType, false),
            b'A' => self.pop_function_type(Kind::EscapingAutoClosureType, false),
            b'f' => self.pop_function_type(Kind::ThinFunctionType, false),
            b'K' => self.pop_function_type(Kind::AutoClosureType, false),
            b'U' => self.pop_function_type(Kind::UncurriedFunctionType, false),
            b'L' => self.pop_function_type(Kind::EscapingObjCBlock, false),
            b'B' => self.pop_function_type(Kind::ObjCBlock, false),
            b'C' => self.pop_function_type(Kind::CFunctionPointer, false),
            b'z' => match self.cursor.next()? {
                b'B' => self.pop_function_type(Kind::ObjCBlock, true),
                b'C' => self.pop_function_type(Kind::CFunctionPointer, true),
                _ => None,
            },
            b'o' => self.wrap_popped_type(Kind::Unowned),
            b'u' => self.wrap_popped_type(Kind::Unmanaged),
            b'w' => self.wrap_popped_type(Kind::Weak),
            b'b' => self.wrap_popped_type(Kind::SILBoxType),
            b'D' => self.wrap_popped_type(Kind::DynamicSelf),
            b'M' | b'm' => {
                let representation = self.demangle_metatype_representation()?;
                let instance = self.pop_kind(Kind::Type)?;
                let kind = if special == b'M' {
                    Kind::Metatype
                } else {
                    Kind::ExistentialMetatype
                };

                Some(node::ty(node::parent(kind, [representation, instance])))
            }
            b'p' => self.wrap_popped_type(Kind::ExistentialMetatype),
            b'c' => {
                let superclass = self.pop_kind(Kind::Type)?;
                let protocols = self.demangle_protocol_list()?;

                Some(node::ty(node::parent(Kind::ProtocolListWithClass, [protocols, superclass])))
            }
            b'l' => {
                let protocols = self.demangle_protocol_list()?;

                Some(node::ty(node::parent(Kind::ProtocolListWithAnyObject, [protocols])))
            }
            b'X' | b'x' => self.demangle_sil_box_type(special == b'X'),
            b'Y' => self.demangle_any_generic_type(Kind::OtherNominalType),
            b'e' => Some(node::ty(node::leaf(Kind::ErrorType))),
            _ => None,
        }
    }

    fn wrap_popped_type(&mut self, kind: Kind) -> Option<Rc<Node<'a>>> {
        Some(node::ty(node::parent(kind, [self.pop_kind(Kind::Type)?])))
    }

    fn demangle_sil_box_type(&mut self, is_generic: bool) -> Option<Rc<Node<'a>>> {
        let generics = if is_generic {
            let signature = self.pop_kind(Kind::DependentGenericSignature)?;
            let arguments = self.pop_type_list()?;

            Some((signature, arguments))
        } else {
            None
        };

        let field_types = self.pop_type_list()?;
        let mut fields = Vec::with_capacity(field_types.num_children());

        for field_type in field_types.children() {
            let inner = field_type.first_child()?;

            let field = if inner.kind() == Kind::InOut {
                node::parent(Kind::SILBoxMutableField, [node::ty(Rc::clone(inner.first_child()?))])
            } else {
                node::parent(Kind::SILBoxImmutableField, [Rc::clone(field_type)])
            };

            fields.push(field);
        }

        let mut box_type = Node::with_children(Kind::SILBoxTypeWithLayout, [node::parent(Kind::SILBoxLayout, fields)]);

        if let Some((signature, arguments)) = generics {
            box_type.add_children([signature, arguments]);
        }

        Some(node::ty(Rc::new(box_type)))
    }

    pub(super) fn demangle_type_annotation(&mut self) -> Option<Rc<Node<'a>>> {
        match self.cursor.next()? {
            b'a' => Some(node::leaf(Kind::AsyncAnnotation)),
            b'b' => Some(node::leaf(Kind::ConcurrentFunctionType)),
            b'c' => Some(node::parent(
                Kind::GlobalActorFunctionType,
                [self.pop_type_and_get_child()?],
            )),
            b'i' => Some(node::ty(node::parent(Kind::Isolated, [self.pop_type_and_get_child()?]))),
            b'j' => {
                let kind = MangledDifferentiabilityKind::from_code(self.cursor.next()?)?;

                Some(node::tagged(
                    Kind::DifferentiableFunctionType,
                    Payload::Differentiability(kind),
                ))
            }
            b'k' => Some(node::ty(node::parent(Kind::NoDerivative, [self.pop_type_and_get_child()?]))),
            _ => None,
        }
    }

    // Generic signatures.

    pub(super) fn demangle_generic_signature(&mut self, has_param_counts: bool) -> Option<Rc<Node<'a>>> {
        let mut signature = Node::new(Kind::DependentGenericSignature);

        if has_param_counts {
            while !self.cursor.next_if(b'l') {
                let count = if self.cursor.next_if(b'z') {
                    0
                } else {
                    self.demangle_index()?.checked_add(1)?
                };

                signature.add_child(node::index(Kind::DependentGenericParamCount, count));
            }
        } else {
            signature.add_child(node::index(Kind::DependentGenericParamCount, 1));
        }

        let num_counts = signature.num_children();

        while let Some(requirement) = self.pop_if(Kind::is_requirement) {
            signature.add_child(requirement);
        }

        signature.reverse_children_from(num_counts);

        Some(Rc::new(signature))
    }

    pub(super) fn demangle_generic_param_index(&mut self) -> Option<Rc<Node<'a>>> {
        if self.cursor.next_if(b'd') {
            let depth = self.demangle_index()?.checked_add(1)?;
            let index = self.demangle_index()?;

            return Some(dependent_generic_param_type(depth, index));
        }

        if self.cursor.next_if(b'z') {
            return Some(dependent_generic_param_type(0, 0));
        }

        Some(dependent_generic_param_type(0, self.demangle_index()?.checked_add(1)?))
    }

    pub(super) fn demangle_generic_type(&mut self) -> Option<Rc<Node<'a>>> {
        let signature = self.pop_kind(Kind::DependentGenericSignature)?;
        let ty = self.pop_kind(Kind::Type)?;

        Some(node::ty(node::parent(Kind::DependentGenericType, [signature, ty])))
    }

    pub(super) fn demangle_generic_requirement(&mut self) -> Option<Rc<Node<'a>>> {
        use RequirementConstraint as C;
        use RequirementSubject as S;

        let (constraint, subject) = match self.cursor.next()? {
            b'c' => (C::BaseClass, S::Assoc),
            b'C' => (C::BaseClass, S::CompoundAssoc),
            b'b' => (C::BaseClass, S::Generic),
            b'B' => (C::BaseClass, S::Substitution),
            b't' => (C::SameType, S::Assoc),
            b'T' => (C::SameType, S::CompoundAssoc),
            b's' => (C::SameType, S::Generic),
            b'S' => (C::SameType, S::Substitution),
            b'm' => (C::Layout, S::Assoc),
            b'M' => (C::Layout, S::CompoundAssoc),
            b'l' => (C::Layout, S::Generic),
            b'L' => (C::Layout, S::Substitution),
            b'p' => (C::Protocol, S::Assoc),
            b'P' => (C::Protocol, S::CompoundAssoc),
            b'Q' => (C::Protocol, S::Substitution),
            _ => {
                self.cursor.push_back();

                (C::Protocol, S::Generic)
            }
        };

        let constrained = match subject {
            S::Generic => node::ty(self.demangle_generic_param_index()?),
            S::Assoc => {
                let base = self.demangle_generic_param_index()?;
                let ty = self.demangle_associated_type_simple(Some(base))?;

                self.add_substitution(Rc::clone(&ty));

                ty
            }
            S::CompoundAssoc => {
                let base = self.demangle_generic_param_index()?;
                let ty = self.demangle_associated_type_compound(Some(base))?;

                self.add_substitution(Rc::clone(&ty));

                ty
            }
            S::Substitution => self.pop_kind(Kind::Type)?,
        };

        match constraint {
            C::Protocol => Some(node::parent(
                Kind::DependentGenericConformanceRequirement,
                [constrained, self.pop_protocol()?],
            )),
            C::BaseClass => Some(node::parent(
                Kind::DependentGenericConformanceRequirement,
                [constrained, self.pop_kind(Kind::Type)?],
            )),
            C::SameType => Some(node::parent(
                Kind::DependentGenericSameTypeRequirement,
                [constrained, self.pop_kind(Kind::Type)?],
            )),
            C::Layout => self.demangle_layout_requirement(constrained),
        }
    }

    fn demangle_layout_requirement(&mut self, constrained: Rc<Node<'a>>) -> Option<Rc<Node<'a>>> {
        let c = self.cursor.next()?;
        let mut requirement = Node::with_children(Kind::DependentGenericLayoutRequirement, [constrained]);

        match c {
            b'U' | b'R' | b'N' | b'C' | b'D' | b'T' => {
                requirement.add_child(node::text(Kind::Identifier, char::from(c).to_string()));
            }
            b'E' | b'M' => {
                requirement.add_child(node::text(Kind::Identifier, char::from(c).to_string()));
                requirement.add_child(self.demangle_index_as_node()?);
                requirement.add_child(self.demangle_index_as_node()?);
            }
            b'e' | b'm' => {
                requirement.add_child(node::text(Kind::Identifier, char::from(c).to_string()));
                requirement.add_child(self.demangle_index_as_node()?);
            }
            _ => return None,
        }

        Some(Rc::new(requirement))
    }

    // Archetypes and associated types.

    pub(super) fn demangle_archetype(&mut self) -> Option<Rc<Node<'a>>> {
        match self.cursor.next()? {
            b'a' => {
                let name = self.pop_kind(Kind::Identifier)?;
                let archetype = self.pop_type_and_get_child()?;
                let ty = node::ty(node::parent(Kind::AssociatedTypeRef, [archetype, name]));

                self.add_substitution(Rc::clone(&ty));

                Some(ty)
            }
            b'O' => Some(node::parent(Kind::OpaqueReturnTypeOf, [self.pop_context()?])),
            b'o' => {
                let index = self.demangle_index()?;
                let (mut type_lists, retroactive_conformances) = self.demangle_bound_generics()?;
                let name = self.pop_node()?;

                type_lists.reverse();

                let mut opaque = Node::with_children(
                    Kind::OpaqueType,
                    [
                        name,
                        node::index(Kind::Index, index),
                        node::parent(Kind::TypeList, type_lists),
                    ],
                );

                if let Some(conformances) = retroactive_conformances {
                    opaque.add_child(conformances);
                }

                let ty = node::ty(Rc::new(opaque));

                self.add_substitution(Rc::clone(&ty));

                Some(ty)
            }
            b'r' => Some(node::ty(node::leaf(Kind::OpaqueReturnType))),
            code @ (b'x' | b'X' | b'y' | b'Y' | b'z' | b'Z') => {
                let base = match code {
                    b'x' | b'X' => None,
                    b'y' | b'Y' => Some(self.demangle_generic_param_index()?),
                    _ => Some(dependent_generic_param_type(0, 0)),
                };

                let ty = if code.is_ascii_lowercase() {
                    self.demangle_associated_type_simple(base)
                } else {
                    self.demangle_associated_type_compound(base)
                }?;

                self.add_substitution(Rc::clone(&ty));

                Some(ty)
            }
            _ => None,
        }
    }

    pub(super) fn pop_assoc_type_name(&mut self) -> Option<Rc<Node<'a>>> {
        let protocol = match self.pop_kind(Kind::Type) {
            Some(protocol) if is_protocol_node(&protocol) => Some(protocol),
            Some(_) => return None,
            None => self.pop_kind(Kind::ProtocolSymbolicReference),
        };

        let mut name = Node::with_children(Kind::DependentAssociatedTypeRef, [self.pop_kind(Kind::Identifier)?]);

        if let Some(protocol) = protocol {
            name.add_child(protocol);
        }

        Some(Rc::new(name))
    }

    fn demangle_associated_type_simple(&mut self, base: Option<Rc<Node<'a>>>) -> Option<Rc<Node<'a>>> {
        let name = self.pop_assoc_type_name()?;

        let base = match base {
            Some(base) => node::ty(base),
            None => self.pop_kind(Kind::Type)?,
        };

        Some(node::ty(node::parent(Kind::DependentMemberType, [base, name])))
    }

    fn demangle_associated_type_compound(&mut self, base: Option<Rc<Node<'a>>>) -> Option<Rc<Node<'a>>> {
        let mut names = Vec::new();

        loop {
            let is_first = self.pop_kind(Kind::FirstElementMarker).is_some();

            names.push(self.pop_assoc_type_name()?);

            if is_first {
                break;
            }
        }

        let mut base = match base {
            Some(base) => node::ty(base),
            None => self.pop_kind(Kind::Type)?,
        };

        while let Some(name) = names.pop() {
            base = node::ty(node::parent(Kind::DependentMemberType, [base, name]));
        }

        Some(base)
    }

    // Lowered function types.

    pub(super) fn demangle_impl_function_type(&mut self) -> Option<Rc<Node<'a>>> {
        let mut function_type = Node::new(Kind::ImplFunctionType);

        if self.cursor.next_if(b's') {
            let (type_lists, retroactive_conformances) = self.demangle_bound_generics()?;
            let signature = self.pop_kind(Kind::DependentGenericSignature)?;
            let mut substitutions = Node::with_children(Kind::ImplPatternSubstitutions, [signature]);

            substitutions.add_child(single(type_lists)?);
            substitutions.add_children(retroactive_conformances);
            function_type.add_child(Rc::new(substitutions));
        }

        if self.cursor.next_if(b'I') {
            let (type_lists, retroactive_conformances) = self.demangle_bound_generics()?;
            let mut substitutions = Node::with_children(Kind::ImplInvocationSubstitutions, [single(type_lists)?]);

            substitutions.add_children(retroactive_conformances);
            function_type.add_child(Rc::new(substitutions));
        }

        let mut signature = self.pop_kind(Kind::DependentGenericSignature);

        if let Some(generic_signature) = signature.as_mut() {
            if self.cursor.next_if(b'P') {
                *generic_signature = Rc::new(generic_signature.with_kind(Kind::DependentPseudogenericSignature));
            }
        }

        if self.cursor.next_if(b'e') {
            function_type.add_child(node::leaf(Kind::ImplEscaping));
        }

        if self.cursor.next_if(b'd') {
            let kind = match self.cursor.next()? {
                b'd' => MangledDifferentiabilityKind::Normal,
                b'l' => MangledDifferentiabilityKind::Linear,
                b'f' => MangledDifferentiabilityKind::Forward,
                b'r' => MangledDifferentiabilityKind::Reverse,
                _ => return None,
            };

            function_type.add_child(node::tagged(Kind::ImplDifferentiability, Payload::Differentiability(kind)));
        }

        let callee = match self.cursor.next()? {
            b'y' => "@callee_unowned",
            b'g' => "@callee_guaranteed",
            b'x' => "@callee_owned",
            b't' => "@convention(thin)",
            _ => return None,
        };

        function_type.add_child(node::text(Kind::ImplConvention, callee));

        if let Some(convention) = self.demangle_impl_function_convention()? {
            function_type.add_child(convention);
        }

        if self.cursor.next_if(b'A') {
            function_type.add_child(node::text(Kind::ImplFunctionAttribute, "@yield_once"));
        } else if self.cursor.next_if(b'G') {
            function_type.add_child(node::text(Kind::ImplFunctionAttribute, "@yield_many"));
        }

        if self.cursor.next_if(b'h') {
            function_type.add_child(node::text(Kind::ImplFunctionAttribute, "@Sendable"));
        }

        if self.cursor.next_if(b'H') {
            function_type.add_child(node::text(Kind::ImplFunctionAttribute, "@async"));
        }

        function_type.add_children(signature);

        let mut typed = Vec::new();

        while let Some(mut parameter) = self.demangle_impl_param_convention(Kind::ImplParameter) {
            if let Some(differentiability) = self.demangle_impl_parameter_result_differentiability() {
                parameter.add_child(differentiability);
            }

            typed.push(parameter);
        }

        while let Some(mut result) = self.demangle_impl_result_convention(Kind::ImplResult) {
            if let Some(differentiability) = self.demangle_impl_parameter_result_differentiability() {
                result.add_child(differentiability);
            }

            typed.push(result);
        }

        while self.cursor.next_if(b'Y') {
            typed.push(self.demangle_impl_param_convention(Kind::ImplYield)?);
        }

        if self.cursor.next_if(b'z') {
            typed.push(self.demangle_impl_result_convention(Kind::ImplErrorResult)?);
        }

        if !self.cursor.next_if(b'_') {
            return None;
        }

        for item in typed.iter_mut().rev() {
            item.add_child(self.pop_kind(Kind::Type)?);
        }

        function_type.add_children(typed.into_iter().map(Rc::new));

        Some(node::ty(Rc::new(function_type)))
    }

    /// Returns `Some(None)` when no function convention is present.
    fn demangle_impl_function_convention(&mut self) -> Option<Option<Rc<Node<'a>>>> {
        let (name, has_clang_type) = match self.cursor.next()? {
            b'B' => ("block", false),
            b'C' => ("c", false),
            b'z' => match self.cursor.next()? {
                b'B' => ("block", true),
                b'C' => ("c", true),
                _ => {
                    self.cursor.push_back();
                    self.cursor.push_back();

                    return Some(None);
                }
            },
            b'M' => ("method", false),
            b'O' => ("objc_method", false),
            b'K' => ("closure", false),
            b'W' => ("witness_method", false),
            _ => {
                self.cursor.push_back();

                return Some(None);
            }
        };

        let mut convention = Node::with_children(
            Kind::ImplFunctionConvention,
            [node::text(Kind::ImplFunctionConventionName, name)],
        );

        if has_clang_type {
            convention.add_child(self.demangle_clang_type()?);
        }

        Some(Some(Rc::new(convention)))
    }

    fn demangle_impl_param_convention(&mut self, kind: Kind) -> Option<Node<'a>> {
        let convention = match self.cursor.peek()? {
            b'i' => "@in",
            b'c' => "@in_constant",
            b'l' => "@inout",
            b'b' => "@inout_aliasable",
            b'n' => "@in_guaranteed",
            b'x' => "@owned",
            b'g' => "@guaranteed",
            b'e' => "@deallocating",
            b'y' => "@unowned",
            _ => return None,
        };

        self.cursor.next();

        Some(Node::with_children(kind, [node::text(Kind::ImplConvention, convention)]))
    }

    fn demangle_impl_result_convention(&mut self, kind: Kind) -> Option<Node<'a>> {
        let convention = match self.cursor.peek()? {
            b'r' => "@out",
            b'o' => "@owned",
            b'd' => "@unowned",
            b'u' => "@unowned_inner_pointer",
            b'a' => "@autoreleased",
            _ => return None,
        };

        self.cursor.next();

        Some(Node::with_children(kind, [node::text(Kind::ImplConvention, convention)]))
    }

    fn demangle_impl_parameter_result_differentiability(&mut self) -> Option<Rc<Node<'a>>> {
        self.cursor
            .next_if(b'w')
            .then(|| node::text(Kind::ImplParameterResultDifferentiability, "@noDerivative"))
    }
}

fn single<T>(items: Vec<T>) -> Option<T> {
    let mut items = items.into_iter();

    match (items.next(), items.next()) {
        (Some(item), None) => Some(item),
        _ => None,
    }
}

pub(super) fn is_protocol_node(node: &Node) -> bool {
    match node.kind() {
        Kind::Type => node.first_child().is_some_and(|child| is_protocol_node(child)),
        Kind::Protocol | Kind::ProtocolSymbolicReference => true,
        _ => false,
    }
}

/// Reattaches generic argument lists, listed innermost first, to the nominal type and its parents.
fn demangle_bound_generic_args<'a>(
    nominal: &Rc<Node<'a>>,
    type_lists: &[Rc<Node<'a>>],
    mut type_list_index: usize,
) -> Option<Rc<Node<'a>>> {
    if type_list_index >= type_lists.len() {
        return None;
    }

    if matches!(
        nominal.kind(),
        Kind::TypeSymbolicReference | Kind::ProtocolSymbolicReference
    ) {
        let remaining = type_lists[type_list_index..]
            .iter()
            .rev()
            .flat_map(|list| list.children().iter().cloned());

        return Some(node::parent(
            Kind::BoundGenericOtherNominalType,
            [node::ty(Rc::clone(nominal)), node::parent(Kind::TypeList, remaining)],
        ));
    }

    let context = nominal.first_child()?;
    let consumes_generic_args = !matches!(
        nominal.kind(),
        Kind::Variable | Kind::ExplicitClosure | Kind::Subscript
    );

    let arguments = Rc::clone(&type_lists[type_list_index]);

    if consumes_generic_args {
        type_list_index += 1;
    }

    let mut nominal = Rc::clone(nominal);

    if type_list_index < type_lists.len() {
        let bound_parent = if context.kind() == Kind::Extension {
            let extended = demangle_bound_generic_args(context.child(1)?, type_lists, type_list_index)?;
            let mut extension =
                Node::with_children(Kind::Extension, [Rc::clone(context.first_child()?), extended]);

            extension.add_children(context.child(2).cloned());

            Rc::new(extension)
        } else {
            demangle_bound_generic_args(context, type_lists, type_list_index)?
        };

        let mut rebuilt = Node::with_children(nominal.kind(), [bound_parent]);

        rebuilt.add_children(nominal.children().iter().skip(1).cloned());
        nominal = Rc::new(rebuilt);
    }

    if !consumes_generic_args || arguments.num_children() == 0 {
        return Some(nominal);
    }

    let kind = match nominal.kind() {
        Kind::Class => Kind::BoundGenericClass,
        Kind::Structure => Kind::BoundGenericStructure,
        Kind::Enum => Kind::BoundGenericEnum,
        Kind::Protocol => Kind::BoundGenericProtocol,
        Kind::OtherNominalType => Kind::BoundGenericOtherNominalType,
        Kind::TypeAlias => Kind::BoundGenericTypeAlias,
        Kind::Function | Kind::Constructor => {
            return Some(node::parent(Kind::BoundGenericFunction, [nominal, arguments]));
        }
        _ => return None,
    };

    Some(node::parent(kind, [node::ty(nominal), arguments]))
}

/// Finds the child indices leading from a function `Type` to the tuple of its parameters.
fn parameter_tuple_path(ty: &Node) -> Option<Vec<usize>> {
    let mut path = vec![0];
    let mut function_type = ty.first_child()?;

    if function_type.kind() == Kind::DependentGenericType {
        path.extend([1, 0]);
        function_type = function_type.child(1)?.first_child()?;
    }

    if !matches!(function_type.kind(), Kind::FunctionType | Kind::NoEscapeFunctionType) {
        return None;
    }

    let mut first = 0;

    for annotation in [
        Kind::GlobalActorFunctionType,
        Kind::DifferentiableFunctionType,
        Kind::ThrowsAnnotation,
        Kind::ConcurrentFunctionType,
        Kind::AsyncAnnotation,
    ] {
        if function_type.child(first)?.kind() == annotation {
            first += 1;
        }
    }

    let argument_tuple = function_type.child(first)?;

    if argument_tuple.kind() != Kind::ArgumentTuple {
        return None;
    }

    path.extend([first, 0, 0]);

    Some(path)
}

fn follow<'n, 'a>(mut node: &'n Node<'a>, path: &[usize]) -> Option<&'n Node<'a>> {
    for &index in path {
        node = node.child(index)?;
    }

    Some(node)
}

fn follow_mut<'n, 'a>(node: &'n mut Rc<Node<'a>>, path: &[usize]) -> Option<&'n mut Node<'a>> {
    let mut node = Rc::make_mut(node);

    for &index in path {
        node = Rc::make_mut(node.children_mut().get_mut(index)?);
    }

    Some(node)
}

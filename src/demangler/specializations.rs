use super::Demangler;
use crate::kinds::{
    FunctionSigSpecializationParamKind as ParamKind, FunctionSigSpecializationParamOptions as ParamOptions,
    SpecializationParamKind,
};
use crate::node::{self, Kind, Node, Payload};
use std::borrow::Cow;
use std::rc::Rc;

impl<'a> Demangler<'a, '_> {
    pub(super) fn demangle_thunk_or_specialization(&mut self) -> Option<Rc<Node<'a>>> {
        let c = self.cursor.next()?;

        match c {
            b'c' => Some(node::parent(Kind::CurryThunk, [self.pop_if(Kind::is_entity)?])),
            b'j' => Some(node::parent(Kind::DispatchThunk, [self.pop_if(Kind::is_entity)?])),
            b'q' => Some(node::parent(Kind::MethodDescriptor, [self.pop_if(Kind::is_entity)?])),
            b'o' => Some(node::leaf(Kind::ObjCAttribute)),
            b'O' => Some(node::leaf(Kind::NonObjCAttribute)),
            b'D' => Some(node::leaf(Kind::DynamicAttribute)),
            b'd' => Some(node::leaf(Kind::DirectMethodReferenceAttribute)),
            b'a' => Some(node::leaf(Kind::PartialApplyObjCForwarder)),
            b'A' => Some(node::leaf(Kind::PartialApplyForwarder)),
            b'm' => Some(node::leaf(Kind::MergedFunction)),
            b'X' => Some(node::leaf(Kind::DynamicallyReplaceableFunctionVar)),
            b'x' => Some(node::leaf(Kind::DynamicallyReplaceableFunctionKey)),
            b'I' => Some(node::leaf(Kind::DynamicallyReplaceableFunctionImpl)),
            b'Y' | b'Q' => {
                let discriminator = self.demangle_index_as_node()?;
                let kind = if c == b'Q' {
                    Kind::AsyncAwaitResumePartialFunction
                } else {
                    Kind::AsyncSuspendResumePartialFunction
                };

                Some(node::parent(kind, [discriminator]))
            }
            b'C' => Some(node::parent(
                Kind::CoroutineContinuationPrototype,
                [self.pop_kind(Kind::Type)?],
            )),
            b'z' | b'Z' => {
                let flag_mode = self.demangle_index_as_node()?;
                let signature = self.pop_kind(Kind::DependentGenericSignature);
                let result_type = self.pop_kind(Kind::Type)?;
                let impl_type = self.pop_kind(Kind::Type)?;
                let kind = if c == b'z' {
                    Kind::ObjCAsyncCompletionHandlerImpl
                } else {
                    Kind::PredefinedObjCAsyncCompletionHandlerImpl
                };

                let mut handler = Node::with_children(kind, [impl_type, result_type, flag_mode]);

                handler.add_children(signature);

                Some(Rc::new(handler))
            }
            b'V' => {
                let base = self.pop_if(Kind::is_entity)?;
                let derived = self.pop_if(Kind::is_entity)?;

                Some(node::parent(Kind::VTableThunk, [derived, base]))
            }
            b'W' => {
                let entity = self.pop_if(Kind::is_entity)?;
                let conformance = self.pop_protocol_conformance()?;

                Some(node::parent(Kind::ProtocolWitness, [conformance, entity]))
            }
            b'S' => Some(node::parent(
                Kind::ProtocolSelfConformanceWitness,
                [self.pop_if(Kind::is_entity)?],
            )),
            b'R' | b'r' | b'y' => {
                let kind = match c {
                    b'R' => Kind::ReabstractionThunkHelper,
                    b'y' => Kind::ReabstractionThunkHelperWithSelf,
                    _ => Kind::ReabstractionThunk,
                };

                let mut thunk = Node::new(kind);

                thunk.add_children(self.pop_kind(Kind::DependentGenericSignature));

                if kind == Kind::ReabstractionThunkHelperWithSelf {
                    thunk.add_child(self.pop_kind(Kind::Type)?);
                }

                thunk.add_child(self.pop_kind(Kind::Type)?);
                thunk.add_child(self.pop_kind(Kind::Type)?);

                Some(Rc::new(thunk))
            }
            b'g' => self.demangle_generic_specialization(Kind::GenericSpecialization),
            b'G' => self.demangle_generic_specialization(Kind::GenericSpecializationNotReAbstracted),
            b'B' => self.demangle_generic_specialization(Kind::GenericSpecializationInResilienceDomain),
            b's' => self.demangle_generic_specialization(Kind::GenericSpecializationPrespecialized),
            b'i' => self.demangle_generic_specialization(Kind::InlinedGenericFunction),
            b'p' | b'P' => {
                let kind = if c == b'p' {
                    Kind::GenericPartialSpecialization
                } else {
                    Kind::GenericPartialSpecializationNotReAbstracted
                };

                let mut specialization = self.demangle_spec_attributes(kind)?;
                let param = node::parent(Kind::GenericSpecializationParam, [self.pop_kind(Kind::Type)?]);

                specialization.add_child(param);

                Some(Rc::new(specialization))
            }
            b'f' => self.demangle_function_specialization(),
            b'K' | b'k' => {
                let kind = if c == b'K' {
                    Kind::KeyPathGetterThunkHelper
                } else {
                    Kind::KeyPathSetterThunkHelper
                };

                self.demangle_key_path_accessor_thunk(kind)
            }
            b'l' => Some(node::parent(Kind::AssociatedTypeDescriptor, [self.pop_assoc_type_name()?])),
            b'L' => Some(node::parent(
                Kind::ProtocolRequirementsBaseDescriptor,
                [self.pop_protocol()?],
            )),
            b'M' => Some(node::parent(
                Kind::DefaultAssociatedTypeMetadataAccessor,
                [self.pop_assoc_type_name()?],
            )),
            b'n' | b'N' => {
                let requirement = self.pop_protocol()?;
                let path = self.pop_assoc_type_path()?;
                let protocol = self.pop_kind(Kind::Type)?;
                let kind = if c == b'n' {
                    Kind::AssociatedConformanceDescriptor
                } else {
                    Kind::DefaultAssociatedConformanceAccessor
                };

                Some(node::parent(kind, [protocol, path, requirement]))
            }
            b'b' => {
                let requirement = self.pop_protocol()?;
                let protocol = self.pop_kind(Kind::Type)?;

                Some(node::parent(Kind::BaseConformanceDescriptor, [protocol, requirement]))
            }
            b'H' | b'h' => {
                let kind = if c == b'H' {
                    Kind::KeyPathEqualsThunkHelper
                } else {
                    Kind::KeyPathHashThunkHelper
                };

                self.demangle_key_path_hash_thunk(kind)
            }
            b'v' => Some(node::index(Kind::OutlinedVariable, self.demangle_index()?)),
            b'e' => {
                let params = self.demangle_bridged_method_params()?;

                Some(node::text(Kind::OutlinedBridgedMethod, params))
            }
            b'u' => Some(node::leaf(Kind::AsyncFunctionPointer)),
            b'J' => match self.cursor.peek()? {
                b'S' => {
                    self.cursor.next();

                    self.demangle_auto_diff_subset_parameters_thunk()
                }
                b'O' => {
                    self.cursor.next();

                    self.demangle_auto_diff_self_reordering_reabstraction_thunk()
                }
                b'V' => {
                    self.cursor.next();

                    self.demangle_auto_diff_function_or_simple_thunk(Kind::AutoDiffDerivativeVTableThunk)
                }
                _ => self.demangle_auto_diff_function_or_simple_thunk(Kind::AutoDiffFunction),
            },
            _ => None,
        }
    }

    fn demangle_key_path_accessor_thunk(&mut self, kind: Kind) -> Option<Rc<Node<'a>>> {
        let is_serialized = self.cursor.next_if(b'q');
        let mut types = Vec::new();
        let mut node = self.pop_kind(Kind::Type)?;

        loop {
            types.push(node);

            match self.pop_node() {
                Some(next) if next.kind() == Kind::Type => node = next,
                Some(next) => {
                    node = next;

                    break;
                }
                None => return None,
            }
        }

        let mut thunk = if node.kind() == Kind::DependentGenericSignature {
            Node::with_children(kind, [self.pop_node()?, node])
        } else {
            Node::with_children(kind, [node])
        };

        thunk.add_children(types.into_iter().rev());

        if is_serialized {
            thunk.add_child(node::leaf(Kind::IsSerialized));
        }

        Some(Rc::new(thunk))
    }

    fn demangle_key_path_hash_thunk(&mut self, kind: Kind) -> Option<Rc<Node<'a>>> {
        let is_serialized = self.cursor.next_if(b'q');
        let mut signature = None;
        let mut types = Vec::new();

        let first = self.pop_node()?;

        match first.kind() {
            Kind::DependentGenericSignature => signature = Some(first),
            Kind::Type => types.push(first),
            _ => return None,
        }

        while let Some(node) = self.pop_node() {
            if node.kind() != Kind::Type {
                return None;
            }

            types.push(node);
        }

        let mut thunk = Node::with_children(kind, types.into_iter().rev());

        thunk.add_children(signature);

        if is_serialized {
            thunk.add_child(node::leaf(Kind::IsSerialized));
        }

        Some(Rc::new(thunk))
    }

    fn demangle_bridged_method_params(&mut self) -> Option<String> {
        if self.cursor.next_if(b'_') {
            return None;
        }

        let mut params = String::new();

        match self.cursor.next()? {
            kind @ (b'p' | b'a' | b'm') => params.push(char::from(kind)),
            _ => return None,
        }

        while !self.cursor.next_if(b'_') {
            match self.cursor.next()? {
                c @ (b'n' | b'b' | b'g') => params.push(char::from(c)),
                _ => return None,
            }
        }

        Some(params)
    }

    // Specializations.

    fn demangle_spec_attributes(&mut self, kind: Kind) -> Option<Node<'a>> {
        let is_serialized = self.cursor.next_if(b'q');
        let pass_id = self.cursor.next()?.checked_sub(b'0').filter(|pass_id| *pass_id <= 9)?;
        let mut specialization = Node::new(kind);

        if is_serialized {
            specialization.add_child(node::leaf(Kind::IsSerialized));
        }

        specialization.add_child(node::index(Kind::SpecializationPassID, u64::from(pass_id)));

        Some(specialization)
    }

    fn demangle_generic_specialization(&mut self, kind: Kind) -> Option<Rc<Node<'a>>> {
        let mut specialization = self.demangle_spec_attributes(kind)?;
        let types = self.pop_type_list()?;

        specialization.add_children(
            types
                .children()
                .iter()
                .map(|ty| node::parent(Kind::GenericSpecializationParam, [Rc::clone(ty)])),
        );

        Some(Rc::new(specialization))
    }

    fn demangle_function_specialization(&mut self) -> Option<Rc<Node<'a>>> {
        let mut specialization = self.demangle_spec_attributes(Kind::FunctionSignatureSpecialization)?;
        let mut params = Vec::new();

        while !self.cursor.next_if(b'_') {
            params.push(self.demangle_func_spec_param(Kind::FunctionSignatureSpecializationParam)?);
        }

        if !self.cursor.next_if(b'n') {
            params.push(self.demangle_func_spec_param(Kind::FunctionSignatureSpecializationReturn)?);
        }

        // Constant and closure payloads were pushed in parameter order, so they come off the stack last first.
        for param in params.iter_mut().rev() {
            if param.kind() != Kind::FunctionSignatureSpecializationParam {
                continue;
            }

            let Some(Payload::SpecializationParamKind(raw_kind)) = param.first_child().map(|kind| kind.payload())
            else {
                continue;
            };

            let param_kind = raw_kind.base();

            if !matches!(
                param_kind,
                Some(
                    ParamKind::ConstantPropFunction
                        | ParamKind::ConstantPropGlobal
                        | ParamKind::ConstantPropString
                        | ParamKind::ClosureProp
                )
            ) {
                continue;
            }

            let fixed_children = param.num_children();

            while let Some(ty) = self.pop_kind(Kind::Type) {
                if param_kind != Some(ParamKind::ClosureProp) {
                    return None;
                }

                param.add_child(ty);
            }

            let name = self.pop_kind(Kind::Identifier)?;

            let mut text = match name.payload() {
                Payload::Text(text) => text.clone(),
                _ => return None,
            };

            if param_kind == Some(ParamKind::ConstantPropString) && text.starts_with('_') {
                text = match text {
                    Cow::Borrowed(text) => Cow::Borrowed(&text[1..]),
                    Cow::Owned(text) => Cow::Owned(text[1..].to_owned()),
                };
            }

            param.add_child(node::text(Kind::FunctionSignatureSpecializationParamPayload, text));
            param.reverse_children_from(fixed_children);
        }

        specialization.add_children(params.into_iter().map(Rc::new));

        Some(Rc::new(specialization))
    }

    fn demangle_func_spec_param(&mut self, kind: Kind) -> Option<Node<'a>> {
        let mut param = Node::new(kind);

        let param_kind = match self.cursor.next()? {
            b'n' => return Some(param),
            b'c' => SpecializationParamKind::from_base(ParamKind::ClosureProp),
            b'p' => match self.cursor.next()? {
                b'f' => SpecializationParamKind::from_base(ParamKind::ConstantPropFunction),
                b'g' => SpecializationParamKind::from_base(ParamKind::ConstantPropGlobal),
                b'i' => return self.add_func_spec_param_number(param, ParamKind::ConstantPropInteger),
                b'd' => return self.add_func_spec_param_number(param, ParamKind::ConstantPropFloat),
                b's' => {
                    let encoding = match self.cursor.next()? {
                        b'b' => "u8",
                        b'w' => "u16",
                        b'c' => "objc",
                        _ => return None,
                    };

                    param.add_child(param_kind_node(SpecializationParamKind::from_base(
                        ParamKind::ConstantPropString,
                    )));
                    param.add_child(node::text(Kind::FunctionSignatureSpecializationParamPayload, encoding));

                    return Some(param);
                }
                _ => return None,
            },
            b'e' => self.demangle_param_options(ParamOptions::EXISTENTIAL_TO_GENERIC, true),
            b'd' => self.demangle_param_options(ParamOptions::DEAD, false),
            b'g' => {
                let mut options = ParamOptions::OWNED_TO_GUARANTEED;

                options.set(ParamOptions::SROA, self.cursor.next_if(b'X'));

                SpecializationParamKind::from_options(options)
            }
            b'o' => {
                let mut options = ParamOptions::GUARANTEED_TO_OWNED;

                options.set(ParamOptions::SROA, self.cursor.next_if(b'X'));

                SpecializationParamKind::from_options(options)
            }
            b'x' => SpecializationParamKind::from_options(ParamOptions::SROA),
            b'i' => SpecializationParamKind::from_base(ParamKind::BoxToValue),
            b's' => SpecializationParamKind::from_base(ParamKind::BoxToStack),
            b'r' => SpecializationParamKind::from_base(ParamKind::InOutToOut),
            _ => return None,
        };

        param.add_child(param_kind_node(param_kind));

        Some(param)
    }

    fn demangle_param_options(&mut self, base: ParamOptions, allows_dead: bool) -> SpecializationParamKind {
        let mut options = base;

        if allows_dead && self.cursor.next_if(b'D') {
            options |= ParamOptions::DEAD;
        }

        if self.cursor.next_if(b'G') {
            options |= ParamOptions::OWNED_TO_GUARANTEED;
        }

        if self.cursor.next_if(b'O') {
            options |= ParamOptions::GUARANTEED_TO_OWNED;
        }

        if self.cursor.next_if(b'X') {
            options |= ParamOptions::SROA;
        }

        SpecializationParamKind::from_options(options)
    }

    fn add_func_spec_param_number(&mut self, mut param: Node<'a>, kind: ParamKind) -> Option<Node<'a>> {
        let start = self.cursor.position();

        while self.cursor.peek_digit() {
            self.cursor.next();
        }

        let digits = self.cursor.data().get(start..self.cursor.position())?;

        if digits.is_empty() {
            return None;
        }

        param.add_child(param_kind_node(SpecializationParamKind::from_base(kind)));
        param.add_child(node::text(
            Kind::FunctionSignatureSpecializationParamPayload,
            std::str::from_utf8(digits).ok()?,
        ));

        Some(param)
    }

    // Automatic differentiation.

    /// Empties the node stack, oldest node first.
    fn pop_all_in_order(&mut self) -> Vec<Rc<Node<'a>>> {
        std::mem::take(&mut self.node_stack)
    }

    fn demangle_auto_diff_function_kind(&mut self) -> Option<Rc<Node<'a>>> {
        match self.cursor.next()? {
            kind @ (b'f' | b'r' | b'd' | b'p') => Some(node::index(Kind::AutoDiffFunctionKind, u64::from(kind))),
            _ => None,
        }
    }

    fn demangle_index_subset(&mut self) -> Option<Rc<Node<'a>>> {
        let start = self.cursor.position();

        while matches!(self.cursor.peek(), Some(b'S' | b'U')) {
            self.cursor.next();
        }

        let subset = self.cursor.data().get(start..self.cursor.position())?;

        if subset.is_empty() {
            return None;
        }

        Some(node::text(Kind::IndexSubset, std::str::from_utf8(subset).ok()?))
    }

    fn demangle_auto_diff_function_or_simple_thunk(&mut self, kind: Kind) -> Option<Rc<Node<'a>>> {
        let mut function = Node::with_children(kind, self.pop_all_in_order());

        function.add_child(self.demangle_auto_diff_function_kind()?);
        function.add_child(self.demangle_index_subset()?);

        if !self.cursor.next_if(b'p') {
            return None;
        }

        function.add_child(self.demangle_index_subset()?);

        if !self.cursor.next_if(b'r') {
            return None;
        }

        Some(Rc::new(function))
    }

    fn demangle_auto_diff_subset_parameters_thunk(&mut self) -> Option<Rc<Node<'a>>> {
        let mut thunk = Node::with_children(Kind::AutoDiffSubsetParametersThunk, self.pop_all_in_order());

        thunk.add_child(self.demangle_auto_diff_function_kind()?);
        thunk.add_child(self.demangle_index_subset()?);

        if !self.cursor.next_if(b'p') {
            return None;
        }

        thunk.add_child(self.demangle_index_subset()?);

        if !self.cursor.next_if(b'r') {
            return None;
        }

        thunk.add_child(self.demangle_index_subset()?);

        if !self.cursor.next_if(b'P') {
            return None;
        }

        Some(Rc::new(thunk))
    }

    fn demangle_auto_diff_self_reordering_reabstraction_thunk(&mut self) -> Option<Rc<Node<'a>>> {
        let signature = self.pop_kind(Kind::DependentGenericSignature);
        let to_type = self.pop_kind(Kind::Type)?;
        let from_type = self.pop_kind(Kind::Type)?;
        let mut thunk = Node::with_children(Kind::AutoDiffSelfReorderingReabstractionThunk, [from_type, to_type]);

        thunk.add_children(signature);
        thunk.add_child(self.demangle_auto_diff_function_kind()?);

        Some(Rc::new(thunk))
    }

    pub(super) fn demangle_differentiability_witness(&mut self) -> Option<Rc<Node<'a>>> {
        let signature = self.pop_kind(Kind::DependentGenericSignature);
        let mut witness = Node::with_children(Kind::DifferentiabilityWitness, self.pop_all_in_order());

        let kind = crate::kinds::MangledDifferentiabilityKind::from_code(self.cursor.next()?)?;

        witness.add_child(node::tagged(Kind::Index, Payload::Differentiability(kind)));
        witness.add_child(self.demangle_index_subset()?);

        if !self.cursor.next_if(b'p') {
            return None;
        }

        witness.add_child(self.demangle_index_subset()?);

        if !self.cursor.next_if(b'r') {
            return None;
        }

        witness.add_children(signature);

        Some(Rc::new(witness))
    }
}

fn param_kind_node<'a>(kind: SpecializationParamKind) -> Rc<Node<'a>> {
    node::tagged(
        Kind::FunctionSignatureSpecializationParamKind,
        Payload::SpecializationParamKind(kind),
    )
}

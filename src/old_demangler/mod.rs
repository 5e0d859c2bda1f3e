//! Decoder for the legacy `_T` mangling scheme.
//!
//! Unlike the current scheme, the legacy grammar is prefix ordered, so it is decoded by plain recursive descent
//! without a node stack.

use crate::kinds::{
    Directness, FunctionSigSpecializationParamKind as ParamKind, FunctionSigSpecializationParamOptions as ParamOptions,
    MangledDifferentiabilityKind, SpecializationParamKind, ValueWitnessKind,
};
use crate::node::{self, Kind, Node, Payload};
use std::borrow::Cow;
use std::rc::Rc;
use token_cursor::ByteCursor;

#[cfg(test)]
mod tests;

const OPERATOR_CHARS: &[u8; 26] = b"& @/= >    <*!|+?%-~   ^ .";

/// Types and contexts nested deeper than this are rejected.
pub const MAX_DEPTH: usize = 64;

#[derive(Clone, Copy, PartialEq, Eq)]
enum ImplConventionContext {
    Callee,
    Parameter,
    Result,
}

/// Decoder state for a single legacy symbol.
pub struct OldDemangler<'a> {
    cursor: ByteCursor<'a>,
    substitutions: Vec<Rc<Node<'a>>>,
    depth: usize,
}

impl<'a> OldDemangler<'a> {
    /// Creates a decoder positioned at the start of `mangled`.
    #[must_use]
    pub fn new(mangled: &'a [u8]) -> Self {
        Self {
            cursor: ByteCursor::new(mangled),
            substitutions: Vec::new(),
            depth: 0,
        }
    }

    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Option<T>) -> Option<T> {
        if self.depth >= MAX_DEPTH {
            tracing::debug!(position = self.cursor.position(), "legacy symbol is nested too deeply");

            return None;
        }

        self.depth += 1;

        let result = f(self);

        self.depth -= 1;

        result
    }

    /// Decodes a whole `_T` symbol into a `Global` node.
    pub fn demangle_top_level(mut self) -> Option<Rc<Node<'a>>> {
        if !self.cursor.next_if_str("_T") {
            return None;
        }

        let mut global = Node::new(Kind::Global);

        if self.cursor.next_if_str("TS") {
            loop {
                global.add_child(self.demangle_specialized_attribute()?);

                // Each specialization header has its own substitutions.
                self.substitutions.clear();

                if !self.cursor.next_if_str("_TTS") {
                    break;
                }
            }

            if !self.cursor.next_if_str("_T") {
                return None;
            }
        } else {
            let attribute = if self.cursor.next_if_str("To") {
                Some(Kind::ObjCAttribute)
            } else if self.cursor.next_if_str("TO") {
                Some(Kind::NonObjCAttribute)
            } else if self.cursor.next_if_str("TD") {
                Some(Kind::DynamicAttribute)
            } else if self.cursor.next_if_str("Td") {
                Some(Kind::DirectMethodReferenceAttribute)
            } else if self.cursor.next_if_str("TV") {
                Some(Kind::VTableAttribute)
            } else {
                None
            };

            global.add_children(attribute.map(node::leaf));
        }

        global.add_child(self.demangle_global()?);

        if !self.cursor.is_empty() {
            global.add_child(node::text(
                Kind::Suffix,
                String::from_utf8_lossy(self.cursor.take_rest()),
            ));
        }

        Some(Rc::new(global))
    }

    /// Decodes a bare legacy type mangling.
    pub fn demangle_type_name(mut self) -> Option<Rc<Node<'a>>> {
        self.demangle_type()
    }

    fn demangle_global(&mut self) -> Option<Rc<Node<'a>>> {
        if self.cursor.next_if(b'M') {
            let kind = match self.cursor.peek()? {
                b'P' => Kind::GenericTypeMetadataPattern,
                b'a' => Kind::TypeMetadataAccessFunction,
                b'L' => Kind::TypeMetadataLazyCache,
                b'm' => Kind::Metaclass,
                b'n' => Kind::NominalTypeDescriptor,
                b'f' => Kind::FullTypeMetadata,
                b'p' => {
                    self.cursor.next();

                    return Some(node::parent(Kind::ProtocolDescriptor, [self.demangle_protocol_name()?]));
                }
                _ => return Some(node::parent(Kind::TypeMetadata, [self.demangle_type()?])),
            };

            self.cursor.next();

            return Some(node::parent(kind, [self.demangle_type()?]));
        }

        if self.cursor.next_if_str("PA") {
            let kind = if self.cursor.next_if(b'o') {
                Kind::PartialApplyObjCForwarder
            } else {
                Kind::PartialApplyForwarder
            };

            let mut forwarder = Node::new(kind);

            if self.cursor.next_if_str("__T") {
                forwarder.add_child(self.nested(Self::demangle_global)?);
            }

            return Some(Rc::new(forwarder));
        }

        if self.cursor.next_if(b't') {
            return Some(node::parent(Kind::TypeMangling, [self.demangle_type()?]));
        }

        if self.cursor.next_if(b'w') {
            let kind = ValueWitnessKind::from_code([self.cursor.next()?, self.cursor.next()?])?;

            return Some(node::parent(
                Kind::ValueWitness,
                [node::tagged(Kind::Index, Payload::ValueWitnessKind(kind)), self.demangle_type()?],
            ));
        }

        if self.cursor.next_if(b'W') {
            return self.demangle_witness();
        }

        if self.cursor.next_if(b'T') {
            return match self.cursor.next()? {
                b'R' => self.demangle_reabstract_signature(Kind::ReabstractionThunkHelper),
                b'r' => self.demangle_reabstract_signature(Kind::ReabstractionThunk),
                b'W' => {
                    let conformance = self.demangle_protocol_conformance()?;
                    let entity = self.demangle_entity()?;

                    Some(node::parent(Kind::ProtocolWitness, [conformance, entity]))
                }
                _ => None,
            };
        }

        self.demangle_entity()
    }

    fn demangle_witness(&mut self) -> Option<Rc<Node<'a>>> {
        let c = self.cursor.next()?;

        match c {
            b'V' => Some(node::parent(Kind::ValueWitnessTable, [self.demangle_type()?])),
            b'v' => {
                let directness = match self.cursor.next()? {
                    b'd' => Directness::Direct,
                    b'i' => Directness::Indirect,
                    _ => return None,
                };

                Some(node::parent(
                    Kind::FieldOffset,
                    [
                        node::tagged(Kind::Directness, Payload::Directness(directness)),
                        self.demangle_entity()?,
                    ],
                ))
            }
            b'P' => Some(node::parent(Kind::ProtocolWitnessTable, [self.demangle_protocol_conformance()?])),
            b'G' => Some(node::parent(
                Kind::GenericProtocolWitnessTable,
                [self.demangle_protocol_conformance()?],
            )),
            b'I' => Some(node::parent(
                Kind::GenericProtocolWitnessTableInstantiationFunction,
                [self.demangle_protocol_conformance()?],
            )),
            b'l' | b'L' => {
                let kind = if c == b'l' {
                    Kind::LazyProtocolWitnessTableAccessor
                } else {
                    Kind::LazyProtocolWitnessTableCacheVariable
                };

                let ty = self.demangle_type()?;
                let conformance = self.demangle_protocol_conformance()?;

                Some(node::parent(kind, [ty, conformance]))
            }
            b'a' => Some(node::parent(
                Kind::ProtocolWitnessTableAccessor,
                [self.demangle_protocol_conformance()?],
            )),
            b't' => {
                let conformance = self.demangle_protocol_conformance()?;
                let name = self.demangle_decl_name()?;

                Some(node::parent(Kind::AssociatedTypeMetadataAccessor, [conformance, name]))
            }
            b'T' => {
                let conformance = self.demangle_protocol_conformance()?;
                let name = self.demangle_decl_name()?;
                let protocol = self.demangle_protocol_name()?;

                Some(node::parent(
                    Kind::AssociatedTypeWitnessTableAccessor,
                    [conformance, name, protocol],
                ))
            }
            _ => None,
        }
    }

    fn demangle_reabstract_signature(&mut self, kind: Kind) -> Option<Rc<Node<'a>>> {
        let mut signature = Node::new(kind);

        if self.cursor.next_if(b'G') {
            signature.add_child(self.demangle_generic_signature(false)?);
        }

        signature.add_child(self.demangle_type()?);
        signature.add_child(self.demangle_type()?);

        Some(Rc::new(signature))
    }

    // Specializations.

    fn demangle_specialized_attribute(&mut self) -> Option<Rc<Node<'a>>> {
        let kind = match self.cursor.next()? {
            b'g' => Kind::GenericSpecialization,
            b'r' => Kind::GenericSpecializationNotReAbstracted,
            b'f' => Kind::FunctionSignatureSpecialization,
            _ => return None,
        };

        let mut specialization = Node::new(kind);

        if self.cursor.next_if(b'q') {
            specialization.add_child(node::leaf(Kind::IsSerialized));
        }

        let pass_id = self.cursor.next()?.checked_sub(b'0')?;

        specialization.add_child(node::index(Kind::SpecializationPassID, u64::from(pass_id)));

        if kind == Kind::FunctionSignatureSpecialization {
            self.demangle_function_signature_specialization(&mut specialization)?;
        } else {
            self.demangle_generic_specialization(&mut specialization)?;
        }

        Some(Rc::new(specialization))
    }

    fn demangle_generic_specialization(&mut self, specialization: &mut Node<'a>) -> Option<()> {
        while !self.cursor.next_if(b'_') {
            let mut param = Node::with_children(Kind::GenericSpecializationParam, [self.demangle_type()?]);

            while !self.cursor.next_if(b'_') {
                param.add_child(self.demangle_protocol_conformance()?);
            }

            specialization.add_child(Rc::new(param));
        }

        Some(())
    }

    fn demangle_function_signature_specialization(&mut self, specialization: &mut Node<'a>) -> Option<()> {
        while !self.cursor.next_if(b'_') {
            let mut param = Node::new(Kind::FunctionSignatureSpecializationParam);

            if self.cursor.next_if_str("n_") {
                // Unchanged parameter.
            } else if self.cursor.next_if_str("cp") {
                self.demangle_constant_prop(&mut param)?;
            } else if self.cursor.next_if_str("cl") {
                self.demangle_closure_prop(&mut param)?;
            } else if self.cursor.next_if_str("i_") {
                param.add_child(param_kind_node(SpecializationParamKind::from_base(ParamKind::BoxToValue)));
            } else if self.cursor.next_if_str("k_") {
                param.add_child(param_kind_node(SpecializationParamKind::from_base(ParamKind::BoxToStack)));
            } else if self.cursor.next_if_str("r_") {
                param.add_child(param_kind_node(SpecializationParamKind::from_base(ParamKind::InOutToOut)));
            } else {
                let mut options = ParamOptions::empty();

                for (code, option) in [
                    (b'd', ParamOptions::DEAD),
                    (b'g', ParamOptions::OWNED_TO_GUARANTEED),
                    (b'o', ParamOptions::GUARANTEED_TO_OWNED),
                    (b's', ParamOptions::SROA),
                ] {
                    if self.cursor.next_if(code) {
                        options |= option;
                    }
                }

                if !self.cursor.next_if(b'_') || options.is_empty() {
                    return None;
                }

                param.add_child(param_kind_node(SpecializationParamKind::from_options(options)));
            }

            specialization.add_child(Rc::new(param));
        }

        Some(())
    }

    fn demangle_constant_prop(&mut self, param: &mut Node<'a>) -> Option<()> {
        let (kind, payloads) = if self.cursor.next_if_str("fr") {
            (ParamKind::ConstantPropFunction, vec![self.demangle_terminated_identifier()?])
        } else if self.cursor.next_if(b'g') {
            (ParamKind::ConstantPropGlobal, vec![self.demangle_terminated_identifier()?])
        } else if self.cursor.next_if(b'i') {
            (ParamKind::ConstantPropInteger, vec![self.demangle_until_underscore()?])
        } else if self.cursor.next_if_str("fl") {
            (ParamKind::ConstantPropFloat, vec![self.demangle_until_underscore()?])
        } else if self.cursor.next_if_str("se") {
            let encoding = if self.cursor.next_if(b'0') {
                "u8"
            } else if self.cursor.next_if(b'1') {
                "u16"
            } else {
                return None;
            };

            if !self.cursor.next_if(b'v') {
                return None;
            }

            (
                ParamKind::ConstantPropString,
                vec![Cow::Borrowed(encoding), self.demangle_terminated_identifier()?],
            )
        } else {
            return None;
        };

        param.add_child(param_kind_node(SpecializationParamKind::from_base(kind)));
        param.add_children(
            payloads
                .into_iter()
                .map(|payload| node::text(Kind::FunctionSignatureSpecializationParamPayload, payload)),
        );

        Some(())
    }

    fn demangle_terminated_identifier(&mut self) -> Option<Cow<'a, str>> {
        let name = self.demangle_identifier_text()?;

        self.cursor.next_if(b'_').then_some(name)
    }

    fn demangle_until_underscore(&mut self) -> Option<Cow<'a, str>> {
        let start = self.cursor.position();

        while !self.cursor.next_if(b'_') {
            self.cursor.next()?;
        }

        let text = self.cursor.data().get(start..self.cursor.position() - 1)?;

        std::str::from_utf8(text).ok().map(Cow::Borrowed)
    }

    fn demangle_closure_prop(&mut self, param: &mut Node<'a>) -> Option<()> {
        let name = self.demangle_identifier_text()?;

        param.add_child(param_kind_node(SpecializationParamKind::from_base(ParamKind::ClosureProp)));
        param.add_child(node::text(Kind::FunctionSignatureSpecializationParamPayload, name));

        while self.cursor.peek() != Some(b'_') {
            match self.demangle_type() {
                Some(ty) => param.add_child(ty),
                None => break,
            }
        }

        self.cursor.next_if(b'_').then_some(())
    }

    // Names.

    fn demangle_decl_name(&mut self) -> Option<Rc<Node<'a>>> {
        if self.cursor.next_if(b'L') {
            let discriminator = self.demangle_index_as_node()?;
            let name = self.demangle_identifier(Kind::Identifier)?;

            return Some(node::parent(Kind::LocalDeclName, [discriminator, name]));
        }

        if self.cursor.next_if(b'P') {
            let discriminator = self.demangle_identifier(Kind::Identifier)?;
            let name = self.demangle_identifier(Kind::Identifier)?;

            return Some(node::parent(Kind::PrivateDeclName, [discriminator, name]));
        }

        self.demangle_identifier(Kind::Identifier)
    }

    fn demangle_identifier_text(&mut self) -> Option<Cow<'a, str>> {
        self.demangle_identifier(Kind::Identifier)?
            .text()
            .map(|text| Cow::Owned(text.to_owned()))
    }

    fn demangle_identifier(&mut self, mut kind: Kind) -> Option<Rc<Node<'a>>> {
        let is_punycoded = self.cursor.next_if(b'X');
        let mut is_operator = false;

        if self.cursor.next_if(b'o') {
            // Operators are only valid as plain declaration names.
            if kind != Kind::Identifier {
                return None;
            }

            is_operator = true;
            kind = match self.cursor.next()? {
                b'p' => Kind::PrefixOperator,
                b'P' => Kind::PostfixOperator,
                b'i' => Kind::InfixOperator,
                _ => return None,
            };
        }

        let length = self.cursor.natural::<usize>()?;
        let slice = self.cursor.text(length)?;

        let mut identifier = if is_punycoded {
            crate::punycode::decode_swift_punycode(slice)?
        } else {
            Cow::Borrowed(slice)
        };

        if identifier.is_empty() {
            return None;
        }

        if is_operator {
            let mut operator = String::with_capacity(identifier.len());

            for c in identifier.chars() {
                if !c.is_ascii() {
                    operator.push(c);

                    continue;
                }

                let byte = u8::try_from(c).ok()?;

                if !byte.is_ascii_lowercase() {
                    return None;
                }

                match OPERATOR_CHARS[usize::from(byte - b'a')] {
                    b' ' => return None,
                    operator_char => operator.push(char::from(operator_char)),
                }
            }

            identifier = Cow::Owned(operator);
        }

        Some(node::text(kind, identifier))
    }

    fn demangle_index(&mut self) -> Option<u64> {
        self.cursor.index()
    }

    fn demangle_index_as_node(&mut self) -> Option<Rc<Node<'a>>> {
        self.demangle_index().map(|index| node::index(Kind::Number, index))
    }

    fn demangle_builtin_size(&mut self) -> Option<u64> {
        let size = self.cursor.natural::<u64>()?;

        self.cursor.next_if(b'_').then_some(size)
    }

    fn demangle_substitution_index(&mut self) -> Option<Rc<Node<'a>>> {
        let standard = match self.cursor.peek()? {
            b'o' => Some(node::text(Kind::Module, "__C")),
            b'C' => Some(node::text(Kind::Module, "__C_Synthesized")),
            b'a' => Some(swift_nominal(Kind::Structure, "Array")),
            b'b' => Some(swift_nominal(Kind::Structure, "Bool")),
            b'c' => Some(swift_nominal(Kind::Structure, "UnicodeScalar")),
            b'd' => Some(swift_nominal(Kind::Structure, "Double")),
            b'f' => Some(swift_nominal(Kind::Structure, "Float")),
            b'i' => Some(swift_nominal(Kind::Structure, "Int")),
            b'V' => Some(swift_nominal(Kind::Structure, "UnsafeRawPointer")),
            b'v' => Some(swift_nominal(Kind::Structure, "UnsafeMutableRawPointer")),
            b'P' => Some(swift_nominal(Kind::Structure, "UnsafePointer")),
            b'p' => Some(swift_nominal(Kind::Structure, "UnsafeMutablePointer")),
            b'q' => Some(swift_nominal(Kind::Enum, "Optional")),
            b'Q' => Some(swift_nominal(Kind::Enum, "ImplicitlyUnwrappedOptional")),
            b'R' => Some(swift_nominal(Kind::Structure, "UnsafeBufferPointer")),
            b'r' => Some(swift_nominal(Kind::Structure, "UnsafeMutableBufferPointer")),
            b'S' => Some(swift_nominal(Kind::Structure, "String")),
            b'u' => Some(swift_nominal(Kind::Structure, "UInt")),
            _ => None,
        };

        if standard.is_some() {
            self.cursor.next();

            return standard;
        }

        let index = usize::try_from(self.demangle_index()?).ok()?;

        self.substitutions.get(index).cloned()
    }

    fn demangle_module(&mut self) -> Option<Rc<Node<'a>>> {
        if self.cursor.next_if(b's') {
            return Some(node::text(Kind::Module, "Swift"));
        }

        if self.cursor.next_if(b'S') {
            return self
                .demangle_substitution_index()
                .filter(|module| module.kind() == Kind::Module);
        }

        let module = self.demangle_identifier(Kind::Module)?;

        self.substitutions.push(Rc::clone(&module));

        Some(module)
    }

    fn demangle_declaration_name(&mut self, kind: Kind) -> Option<Rc<Node<'a>>> {
        let context = self.demangle_context()?;
        let name = self.demangle_decl_name()?;
        let declaration = node::parent(kind, [context, name]);

        self.substitutions.push(Rc::clone(&declaration));

        Some(declaration)
    }

    fn demangle_protocol_name(&mut self) -> Option<Rc<Node<'a>>> {
        Some(node::ty(self.demangle_protocol_name_impl()?))
    }

    fn demangle_protocol_name_given_context(&mut self, context: Rc<Node<'a>>) -> Option<Rc<Node<'a>>> {
        let name = self.demangle_decl_name()?;
        let protocol = node::parent(Kind::Protocol, [context, name]);

        self.substitutions.push(Rc::clone(&protocol));

        Some(protocol)
    }

    fn demangle_protocol_name_impl(&mut self) -> Option<Rc<Node<'a>>> {
        // A substitution here names either the protocol itself or its module.
        if self.cursor.next_if(b'S') {
            let substitution = self.demangle_substitution_index()?;

            return match substitution.kind() {
                Kind::Protocol => Some(substitution),
                Kind::Module => self.demangle_protocol_name_given_context(substitution),
                _ => None,
            };
        }

        if self.cursor.next_if(b's') {
            return self.demangle_protocol_name_given_context(node::text(Kind::Module, "Swift"));
        }

        self.demangle_declaration_name(Kind::Protocol)
    }

    fn demangle_nominal_type(&mut self) -> Option<Rc<Node<'a>>> {
        match self.cursor.next()? {
            b'S' => self.demangle_substitution_index(),
            b'V' => self.demangle_declaration_name(Kind::Structure),
            b'O' => self.demangle_declaration_name(Kind::Enum),
            b'C' => self.demangle_declaration_name(Kind::Class),
            b'P' => self.demangle_declaration_name(Kind::Protocol),
            _ => None,
        }
    }

    fn demangle_bound_generic_args(&mut self, nominal: Rc<Node<'a>>) -> Option<Rc<Node<'a>>> {
        let parent = nominal.first_child()?;

        // Arguments of the outermost type come first.
        let nominal = if matches!(parent.kind(), Kind::Module | Kind::Function | Kind::Extension) {
            nominal
        } else {
            let bound_parent = self.demangle_bound_generic_args(Rc::clone(parent))?;

            node::parent(nominal.kind(), [bound_parent, Rc::clone(nominal.child(1)?)])
        };

        let mut arguments = Vec::new();

        while !self.cursor.next_if(b'_') {
            arguments.push(self.demangle_type()?);

            if self.cursor.is_empty() {
                return None;
            }
        }

        if arguments.is_empty() {
            return Some(nominal);
        }

        let kind = match nominal.kind() {
            Kind::Class => Kind::BoundGenericClass,
            Kind::Structure => Kind::BoundGenericStructure,
            Kind::Enum => Kind::BoundGenericEnum,
            _ => return None,
        };

        Some(node::parent(
            kind,
            [node::ty(nominal), node::parent(Kind::TypeList, arguments)],
        ))
    }

    fn demangle_bound_generic_type(&mut self) -> Option<Rc<Node<'a>>> {
        let nominal = self.demangle_nominal_type()?;

        self.demangle_bound_generic_args(nominal)
    }

    fn demangle_context(&mut self) -> Option<Rc<Node<'a>>> {
        self.nested(Self::demangle_context_impl)
    }

    fn demangle_context_impl(&mut self) -> Option<Rc<Node<'a>>> {
        match self.cursor.peek()? {
            b'E' => {
                self.cursor.next();

                let module = self.demangle_module()?;
                let extended = self.demangle_context()?;

                Some(node::parent(Kind::Extension, [module, extended]))
            }
            b'e' => {
                self.cursor.next();

                let module = self.demangle_module()?;
                let signature = self.demangle_generic_signature(false)?;
                let extended = self.demangle_context()?;

                Some(node::parent(Kind::Extension, [module, extended, signature]))
            }
            b'S' => {
                self.cursor.next();

                self.demangle_substitution_index()
            }
            b's' => {
                self.cursor.next();

                Some(node::text(Kind::Module, "Swift"))
            }
            b'G' => {
                self.cursor.next();

                self.demangle_bound_generic_type()
            }
            c if is_start_of_entity(c) => self.demangle_entity(),
            _ => self.demangle_module(),
        }
    }

    fn demangle_protocol_list(&mut self) -> Option<Rc<Node<'a>>> {
        let mut protocols = Vec::new();

        while !self.cursor.next_if(b'_') {
            protocols.push(self.demangle_protocol_name()?);
        }

        Some(node::parent(Kind::ProtocolList, [node::parent(Kind::TypeList, protocols)]))
    }

    fn demangle_protocol_conformance(&mut self) -> Option<Rc<Node<'a>>> {
        let ty = self.demangle_type()?;
        let protocol = self.demangle_protocol_name()?;
        let context = self.demangle_context()?;

        Some(node::parent(Kind::ProtocolConformance, [ty, protocol, context]))
    }

    // Entities.

    fn demangle_entity(&mut self) -> Option<Rc<Node<'a>>> {
        let is_static = self.cursor.next_if(b'Z');

        let basic_kind = match self.cursor.peek()? {
            b'F' => Kind::Function,
            b'v' => Kind::Variable,
            b'I' => Kind::Initializer,
            b'i' => Kind::Subscript,
            _ => return self.demangle_nominal_type(),
        };

        self.cursor.next();

        let context = self.demangle_context()?;
        let mut has_type = true;
        let mut wraps_storage = false;

        let (kind, name) = match self.cursor.next()? {
            b'D' => {
                has_type = false;

                (Kind::Deallocator, None)
            }
            b'd' => {
                has_type = false;

                (Kind::Destructor, None)
            }
            b'e' => {
                has_type = false;

                (Kind::IVarInitializer, None)
            }
            b'E' => {
                has_type = false;

                (Kind::IVarDestroyer, None)
            }
            b'C' => (Kind::Allocator, None),
            b'c' => (Kind::Constructor, None),
            code @ (b'a' | b'l' | b'g' | b'G' | b's' | b'm' | b'w' | b'W') => {
                wraps_storage = true;

                let kind = match code {
                    b'a' => match self.cursor.next()? {
                        b'O' => Kind::OwningMutableAddressor,
                        b'o' => Kind::NativeOwningMutableAddressor,
                        b'p' => Kind::NativePinningMutableAddressor,
                        b'u' => Kind::UnsafeMutableAddressor,
                        _ => return None,
                    },
                    b'l' => match self.cursor.next()? {
                        b'O' => Kind::OwningAddressor,
                        b'o' => Kind::NativeOwningAddressor,
                        b'p' => Kind::NativePinningAddressor,
                        b'u' => Kind::UnsafeAddressor,
                        _ => return None,
                    },
                    b'g' => Kind::Getter,
                    b'G' => Kind::GlobalGetter,
                    b's' => Kind::Setter,
                    b'm' => Kind::MaterializeForSet,
                    b'w' => Kind::WillSet,
                    _ => Kind::DidSet,
                };

                (kind, Some(self.demangle_decl_name()?))
            }
            b'U' => (Kind::ExplicitClosure, Some(self.demangle_index_as_node()?)),
            b'u' => (Kind::ImplicitClosure, Some(self.demangle_index_as_node()?)),
            _ if basic_kind == Kind::Initializer => {
                self.cursor.push_back();
                has_type = false;

                if self.cursor.next_if(b'A') {
                    (Kind::DefaultArgumentInitializer, Some(self.demangle_index_as_node()?))
                } else if self.cursor.next_if(b'i') {
                    (Kind::Initializer, None)
                } else {
                    return None;
                }
            }
            _ => {
                self.cursor.push_back();

                (basic_kind, Some(self.demangle_decl_name()?))
            }
        };

        let entity = if wraps_storage {
            let (is_subscript, name) = rewrite_subscript_name(name?)?;
            let mut storage = Node::with_children(
                if is_subscript { Kind::Subscript } else { Kind::Variable },
                [context],
            );

            // Variables list their name before their type, subscripts list a private discriminator after it.
            if !is_subscript {
                storage.add_children(name.clone());
            }

            if has_type {
                storage.add_child(self.demangle_type()?);
            }

            if is_subscript {
                storage.add_children(name);
            }

            node::parent(kind, [Rc::new(storage)])
        } else {
            let mut entity = Node::with_children(kind, [context]);

            entity.add_children(name);

            if has_type {
                entity.add_child(self.demangle_type()?);
            }

            Rc::new(entity)
        };

        Some(if is_static {
            node::parent(Kind::Static, [entity])
        } else {
            entity
        })
    }

    // Generics.

    fn demangle_generic_param_index(&mut self) -> Option<Rc<Node<'a>>> {
        let (depth, index) = if self.cursor.next_if(b'd') {
            let depth = self.demangle_index()?.checked_add(1)?;

            (depth, self.demangle_index()?)
        } else if self.cursor.next_if(b'x') {
            (0, 0)
        } else {
            (0, self.demangle_index()?.checked_add(1)?)
        };

        Some(dependent_generic_param_type(depth, index))
    }

    fn demangle_dependent_member_type_name(&mut self, base: Rc<Node<'a>>) -> Option<Rc<Node<'a>>> {
        let associated_type = if self.cursor.next_if(b'S') {
            self.demangle_substitution_index()
                .filter(|substitution| substitution.kind() == Kind::DependentAssociatedTypeRef)?
        } else {
            let protocol = if self.cursor.next_if(b'P') {
                Some(self.demangle_protocol_name()?)
            } else {
                None
            };

            let mut reference =
                Node::with_children(Kind::DependentAssociatedTypeRef, [self.demangle_identifier(Kind::Identifier)?]);

            reference.add_children(protocol);

            let reference = Rc::new(reference);

            self.substitutions.push(Rc::clone(&reference));

            reference
        };

        Some(node::parent(Kind::DependentMemberType, [base, associated_type]))
    }

    fn demangle_associated_type_simple(&mut self) -> Option<Rc<Node<'a>>> {
        let base = self.demangle_generic_param_index()?;

        self.demangle_dependent_member_type_name(node::ty(base))
    }

    fn demangle_associated_type_compound(&mut self) -> Option<Rc<Node<'a>>> {
        let mut base = self.demangle_generic_param_index()?;

        while !self.cursor.next_if(b'_') {
            base = self.demangle_dependent_member_type_name(node::ty(base))?;
        }

        Some(base)
    }

    fn demangle_dependent_type(&mut self) -> Option<Rc<Node<'a>>> {
        let c = self.cursor.peek()?;

        // Anything but a generic parameter index starts a member type base.
        if c != b'd' && c != b'_' && !c.is_ascii_digit() {
            let base = self.demangle_type()?;

            return self.demangle_dependent_member_type_name(base);
        }

        self.demangle_generic_param_index()
    }

    fn demangle_constrained_type(&mut self) -> Option<Rc<Node<'a>>> {
        let ty = if self.cursor.next_if(b'w') {
            self.demangle_associated_type_simple()
        } else if self.cursor.next_if(b'W') {
            self.demangle_associated_type_compound()
        } else {
            self.demangle_generic_param_index()
        }?;

        Some(node::ty(ty))
    }

    fn demangle_generic_signature(&mut self, is_pseudogeneric: bool) -> Option<Rc<Node<'a>>> {
        let mut signature = Node::new(if is_pseudogeneric {
            Kind::DependentPseudogenericSignature
        } else {
            Kind::DependentGenericSignature
        });

        while !matches!(self.cursor.peek()?, b'R' | b'r') {
            let count = if self.cursor.next_if(b'z') {
                0
            } else {
                self.demangle_index()?.checked_add(1)?
            };

            signature.add_child(node::index(Kind::DependentGenericParamCount, count));
        }

        // No counts means a single parameter.
        if signature.num_children() == 0 {
            signature.add_child(node::index(Kind::DependentGenericParamCount, 1));
        }

        if self.cursor.next_if(b'r') {
            return Some(Rc::new(signature));
        }

        if !self.cursor.next_if(b'R') {
            return None;
        }

        while !self.cursor.next_if(b'r') {
            signature.add_child(self.demangle_generic_requirement()?);
        }

        Some(Rc::new(signature))
    }

    fn demangle_generic_requirement(&mut self) -> Option<Rc<Node<'a>>> {
        let constrained = self.demangle_constrained_type()?;

        if self.cursor.next_if(b'z') {
            let second = self.demangle_type()?;

            return Some(node::parent(
                Kind::DependentGenericSameTypeRequirement,
                [constrained, second],
            ));
        }

        if self.cursor.next_if(b'l') {
            let code = self.cursor.next()?;
            let mut requirement = Node::with_children(
                Kind::DependentGenericLayoutRequirement,
                [constrained, node::text(Kind::Identifier, char::from(code).to_string())],
            );

            match code {
                b'U' | b'R' | b'N' | b'T' => {}
                b'E' | b'M' => {
                    let size = self.cursor.natural::<u64>()?;

                    if !self.cursor.next_if(b'_') {
                        return None;
                    }

                    let alignment = self.cursor.natural::<u64>()?;

                    requirement.add_child(node::index(Kind::Number, size));
                    requirement.add_child(node::index(Kind::Number, alignment));
                }
                b'e' | b'm' => requirement.add_child(node::index(Kind::Number, self.cursor.natural::<u64>()?)),
                _ => return None,
            }

            return Some(Rc::new(requirement));
        }

        let constraint = match self.cursor.peek()? {
            b'C' => self.demangle_type()?,
            b'S' => {
                self.cursor.next();

                let substitution = self.demangle_substitution_index()?;

                let name = match substitution.kind() {
                    Kind::Protocol | Kind::Class => substitution,
                    Kind::Module => self.demangle_protocol_name_given_context(substitution)?,
                    _ => return None,
                };

                node::ty(name)
            }
            _ => self.demangle_protocol_name()?,
        };

        Some(node::parent(
            Kind::DependentGenericConformanceRequirement,
            [constrained, constraint],
        ))
    }

    fn demangle_archetype_type(&mut self) -> Option<Rc<Node<'a>>> {
        let root = match self.cursor.next()? {
            b'Q' => self.demangle_archetype_type()?,
            b'S' => self.demangle_substitution_index()?,
            b's' => node::text(Kind::Module, "Swift"),
            _ => return None,
        };

        let name = self.demangle_identifier(Kind::Identifier)?;
        let associated_type = node::parent(Kind::AssociatedTypeRef, [root, name]);

        self.substitutions.push(Rc::clone(&associated_type));

        Some(associated_type)
    }

    // Types.

    fn demangle_type(&mut self) -> Option<Rc<Node<'a>>> {
        self.nested(Self::demangle_type_impl).map(node::ty)
    }

    fn demangle_tuple(&mut self, is_variadic: bool) -> Option<Rc<Node<'a>>> {
        let mut elements = Vec::new();

        while !self.cursor.next_if(b'_') {
            let mut element = Node::new(Kind::TupleElement);

            if self.cursor.peek().is_some_and(is_start_of_identifier) {
                element.add_child(self.demangle_identifier(Kind::TupleElementName)?);
            }

            element.add_child(self.demangle_type()?);
            elements.push(element);
        }

        if is_variadic {
            if let Some(last) = elements.last_mut() {
                last.insert_child(0, node::leaf(Kind::VariadicMarker));
            }
        }

        Some(node::parent(Kind::Tuple, elements.into_iter().map(Rc::new)))
    }

    fn demangle_function_type(&mut self, kind: Kind) -> Option<Rc<Node<'a>>> {
        let throws = self.cursor.next_if(b'z');
        let concurrent = self.cursor.next_if(b'y');
        let is_async = self.cursor.next_if(b'Z');

        let differentiability = if self.cursor.next_if(b'D') {
            Some(MangledDifferentiabilityKind::from_code(self.cursor.next()?)?)
        } else {
            None
        };

        let arguments = self.demangle_type()?;
        let result = self.demangle_type()?;
        let mut function = Node::new(kind);

        if throws {
            function.add_child(node::leaf(Kind::ThrowsAnnotation));
        }

        if is_async {
            function.add_child(node::leaf(Kind::AsyncAnnotation));
        }

        if concurrent {
            function.add_child(node::leaf(Kind::ConcurrentFunctionType));
        }

        if let Some(differentiability) = differentiability {
            function.add_child(node::tagged(
                Kind::DifferentiableFunctionType,
                Payload::Differentiability(differentiability),
            ));
        }

        function.add_child(node::parent(Kind::ArgumentTuple, [arguments]));
        function.add_child(node::parent(Kind::ReturnType, [result]));

        Some(Rc::new(function))
    }

    fn demangle_builtin_type(&mut self) -> Option<Rc<Node<'a>>> {
        let name: Cow<'static, str> = match self.cursor.next()? {
            b'b' => "Builtin.BridgeObject".into(),
            b'B' => "Builtin.UnsafeValueBuffer".into(),
            b'f' => format!("Builtin.FPIEEE{}", self.demangle_builtin_size()?).into(),
            b'i' => format!("Builtin.Int{}", self.demangle_builtin_size()?).into(),
            b'v' => {
                let elements = self.cursor.natural::<u64>()?;

                if !self.cursor.next_if(b'B') {
                    return None;
                }

                let element = match self.cursor.next()? {
                    b'i' => format!("Int{}", self.demangle_builtin_size()?),
                    b'f' => format!("FPIEEE{}", self.demangle_builtin_size()?),
                    b'p' => "RawPointer".to_owned(),
                    _ => return None,
                };

                format!("Builtin.Vec{elements}x{element}").into()
            }
            b'O' => "Builtin.UnknownObject".into(),
            b'o' => "Builtin.NativeObject".into(),
            b'p' => "Builtin.RawPointer".into(),
            b't' => "Builtin.SILToken".into(),
            b'w' => "Builtin.Word".into(),
            _ => return None,
        };

        Some(node::text(Kind::BuiltinTypeName, name))
    }

    fn demangle_type_impl(&mut self) -> Option<Rc<Node<'a>>> {
        let c = self.cursor.next()?;

        match c {
            b'B' => self.demangle_builtin_type(),
            b'a' => self.demangle_declaration_name(Kind::TypeAlias),
            b'b' => self.demangle_function_type(Kind::ObjCBlock),
            b'c' => self.demangle_function_type(Kind::CFunctionPointer),
            b'D' => Some(node::parent(Kind::DynamicSelf, [self.demangle_type()?])),
            b'E' => self.cursor.next_if_str("RR").then(|| node::leaf(Kind::ErrorType)),
            b'F' => self.demangle_function_type(Kind::FunctionType),
            b'f' => self.demangle_function_type(Kind::UncurriedFunctionType),
            b'G' => self.demangle_bound_generic_type(),
            b'K' => self.demangle_function_type(Kind::AutoClosureType),
            b'M' => Some(node::parent(Kind::Metatype, [self.demangle_type()?])),
            b'P' => {
                if self.cursor.next_if(b'M') {
                    Some(node::parent(Kind::ExistentialMetatype, [self.demangle_type()?]))
                } else {
                    self.demangle_protocol_list()
                }
            }
            b'Q' => {
                if self.cursor.next_if(b'u') {
                    Some(node::leaf(Kind::OpaqueReturnType))
                } else {
                    self.demangle_archetype_type()
                }
            }
            b'q' => self.demangle_dependent_type(),
            b'x' => Some(dependent_generic_param_type(0, 0)),
            b'w' => self.demangle_associated_type_simple(),
            b'W' => self.demangle_associated_type_compound(),
            b'R' => Some(node::parent(Kind::InOut, [self.demangle_type_impl()?])),
            b'k' => Some(node::parent(Kind::NoDerivative, [self.demangle_type_impl()?])),
            b'S' => self.demangle_substitution_index(),
            b'T' => self.demangle_tuple(false),
            b't' => self.demangle_tuple(true),
            b'u' => {
                let signature = self.demangle_generic_signature(false)?;
                let ty = self.demangle_type()?;

                Some(node::parent(Kind::DependentGenericType, [signature, ty]))
            }
            b'X' => self.demangle_special_type(),
            b'C' => self.demangle_declaration_name(Kind::Class),
            b'V' => self.demangle_declaration_name(Kind::Structure),
            b'O' => self.demangle_declaration_name(Kind::Enum),
            _ => None,
        }
    }

    fn demangle_special_type(&mut self) -> Option<Rc<Node<'a>>> {
        match self.cursor.next()? {
            b'b' => Some(node::parent(Kind::SILBoxType, [self.demangle_type()?])),
            b'B' => self.demangle_sil_box_type_with_layout(),
            b'M' => {
                let representation = self.demangle_metatype_representation()?;

                Some(node::parent(Kind::Metatype, [representation, self.demangle_type()?]))
            }
            b'P' => {
                if self.cursor.next_if(b'M') {
                    let representation = self.demangle_metatype_representation()?;

                    Some(node::parent(
                        Kind::ExistentialMetatype,
                        [representation, self.demangle_type()?],
                    ))
                } else {
                    self.demangle_protocol_list()
                }
            }
            b'f' => self.demangle_function_type(Kind::ThinFunctionType),
            b'o' => Some(node::parent(Kind::Unowned, [self.demangle_type()?])),
            b'u' => Some(node::parent(Kind::Unmanaged, [self.demangle_type()?])),
            b'w' => Some(node::parent(Kind::Weak, [self.demangle_type()?])),
            b'F' => self.demangle_impl_function_type(),
            _ => None,
        }
    }

    fn demangle_sil_box_type_with_layout(&mut self) -> Option<Rc<Node<'a>>> {
        let signature = if self.cursor.next_if(b'G') {
            Some(self.demangle_generic_signature(false)?)
        } else {
            None
        };

        let mut fields = Vec::new();

        while !self.cursor.next_if(b'_') {
            let kind = match self.cursor.next()? {
                b'm' => Kind::SILBoxMutableField,
                b'i' => Kind::SILBoxImmutableField,
                _ => return None,
            };

            fields.push(node::parent(kind, [self.demangle_type()?]));
        }

        let mut box_type = Node::with_children(Kind::SILBoxTypeWithLayout, [node::parent(Kind::SILBoxLayout, fields)]);

        if let Some(signature) = signature {
            let mut arguments = Vec::new();

            while !self.cursor.next_if(b'_') {
                arguments.push(self.demangle_type()?);
            }

            box_type.add_child(signature);
            box_type.add_child(node::parent(Kind::TypeList, arguments));
        }

        Some(Rc::new(box_type))
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

    // Lowered function types.

    fn demangle_impl_function_type(&mut self) -> Option<Rc<Node<'a>>> {
        let mut function = Node::new(Kind::ImplFunctionType);

        let callee = if self.cursor.next_if(b't') {
            "@convention(thin)"
        } else {
            self.demangle_impl_convention(ImplConventionContext::Callee)?
        };

        function.add_child(node::text(Kind::ImplConvention, callee));

        if self.cursor.next_if(b'C') {
            let convention = match self.cursor.next()? {
                b'b' => "block",
                b'c' => "c",
                b'm' => "method",
                b'O' => "objc_method",
                b'w' => "witness_method",
                _ => return None,
            };

            function.add_child(node::parent(
                Kind::ImplFunctionConvention,
                [node::text(Kind::ImplFunctionConventionName, convention)],
            ));
        }

        if self.cursor.next_if(b'h') {
            function.add_child(node::text(Kind::ImplFunctionAttribute, "@Sendable"));
        }

        if self.cursor.next_if(b'H') {
            function.add_child(node::text(Kind::ImplFunctionAttribute, "@async"));
        }

        if self.cursor.next_if(b'G') {
            function.add_child(self.demangle_generic_signature(false)?);
        } else if self.cursor.next_if(b'g') {
            function.add_child(self.demangle_generic_signature(true)?);
        }

        if !self.cursor.next_if(b'_') {
            return None;
        }

        while !self.cursor.next_if(b'_') {
            function.add_child(self.demangle_impl_parameter_or_result(Kind::ImplParameter)?);
        }

        while !self.cursor.next_if(b'_') {
            function.add_child(self.demangle_impl_parameter_or_result(Kind::ImplResult)?);
        }

        Some(Rc::new(function))
    }

    fn demangle_impl_parameter_or_result(&mut self, mut kind: Kind) -> Option<Rc<Node<'a>>> {
        if self.cursor.next_if(b'z') {
            if kind != Kind::ImplResult {
                return None;
            }

            kind = Kind::ImplErrorResult;
        }

        let context = if kind == Kind::ImplParameter {
            ImplConventionContext::Parameter
        } else {
            ImplConventionContext::Result
        };

        let convention = self.demangle_impl_convention(context)?;
        let ty = self.demangle_type()?;

        Some(node::parent(kind, [node::text(Kind::ImplConvention, convention), ty]))
    }

    fn demangle_impl_convention(&mut self, context: ImplConventionContext) -> Option<&'static str> {
        use ImplConventionContext::{Callee, Parameter, Result};

        let convention = match (self.cursor.next()?, context) {
            (b'a', Result) => "@autoreleased",
            (b'd', Callee) => "@callee_unowned",
            (b'd', Parameter | Result) => "@unowned",
            (b'D', Result) => "@unowned_inner_pointer",
            (b'g', Callee) => "@callee_guaranteed",
            (b'g', Parameter) => "@guaranteed",
            (b'e', Parameter) => "@deallocating",
            (b'i', Parameter) => "@in",
            (b'i', Result) => "@out",
            (b'j', Parameter) => "@in_guaranteed",
            (b'k', Parameter) => "@in_constant",
            (b'l', Parameter) => "@inout",
            (b'o', Callee) => "@callee_owned",
            (b'o', Parameter | Result) => "@owned",
            _ => return None,
        };

        Some(convention)
    }
}

const fn is_start_of_identifier(c: u8) -> bool {
    c.is_ascii_digit() || c == b'o'
}

const fn is_start_of_entity(c: u8) -> bool {
    matches!(c, b'F' | b'I' | b'v' | b'P' | b's' | b'Z' | b'C' | b'V' | b'O')
}

fn swift_nominal<'a>(kind: Kind, name: &'static str) -> Rc<Node<'a>> {
    node::parent(kind, [node::text(Kind::Module, "Swift"), node::text(Kind::Identifier, name)])
}

fn dependent_generic_param_type<'a>(depth: u64, index: u64) -> Rc<Node<'a>> {
    node::parent(
        Kind::DependentGenericParamType,
        [node::index(Kind::Index, depth), node::index(Kind::Index, index)],
    )
}

fn param_kind_node<'a>(kind: SpecializationParamKind) -> Rc<Node<'a>> {
    node::tagged(
        Kind::FunctionSignatureSpecializationParamKind,
        Payload::SpecializationParamKind(kind),
    )
}

/// Detects storage named `subscript`, which the legacy scheme spells out, and drops that name. Returns whether the
/// storage is a subscript and the name to keep.
fn rewrite_subscript_name<'a>(name: Rc<Node<'a>>) -> Option<(bool, Option<Rc<Node<'a>>>)> {
    match name.kind() {
        Kind::Identifier if name.text() == Some("subscript") => Some((true, None)),
        Kind::PrivateDeclName if name.child(1).and_then(|child| child.text()) == Some("subscript") => {
            let discriminator = Rc::clone(name.first_child()?);

            Some((true, Some(node::parent(Kind::PrivateDeclName, [discriminator]))))
        }
        _ => Some((false, Some(name))),
    }
}

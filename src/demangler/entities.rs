use super::Demangler;
use crate::kinds::{Directness, ValueWitnessKind};
use crate::node::{self, Kind, Node, Payload};
use std::rc::Rc;

enum FunctionEntityArgs {
    None,
    TypeAndMaybePrivateName,
    TypeAndIndex,
    Index,
}

impl<'a> Demangler<'a, '_> {
    pub(super) fn demangle_extension_context(&mut self) -> Option<Rc<Node<'a>>> {
        let signature = self.pop_kind(Kind::DependentGenericSignature);
        let module = self.pop_module()?;
        let extended = self.pop_type_and_get_any_generic()?;
        let mut extension = Node::with_children(Kind::Extension, [module, extended]);

        extension.add_children(signature);

        Some(Rc::new(extension))
    }

    pub(super) fn demangle_plain_function(&mut self) -> Option<Rc<Node<'a>>> {
        let signature = self.pop_kind(Kind::DependentGenericSignature);
        let mut ty = Some(self.pop_function_type(Kind::FunctionType, false)?);
        let labels = self.pop_function_param_labels(&mut ty);
        let mut ty = ty?;

        if let Some(signature) = signature {
            ty = node::ty(node::parent(Kind::DependentGenericType, [signature, ty]));
        }

        let name = self.pop_if(Kind::is_decl_name)?;
        let context = self.pop_context()?;
        let mut function = Node::with_children(Kind::Function, [context, name]);

        function.add_children(labels);
        function.add_child(ty);

        Some(Rc::new(function))
    }

    pub(super) fn demangle_function_entity(&mut self) -> Option<Rc<Node<'a>>> {
        use FunctionEntityArgs as Args;

        let (args, kind) = match self.cursor.next()? {
            b'D' => (Args::None, Kind::Deallocator),
            b'd' => (Args::None, Kind::Destructor),
            b'E' => (Args::None, Kind::IVarDestroyer),
            b'e' => (Args::None, Kind::IVarInitializer),
            b'i' => (Args::None, Kind::Initializer),
            b'C' => (Args::TypeAndMaybePrivateName, Kind::Allocator),
            b'c' => (Args::TypeAndMaybePrivateName, Kind::Constructor),
            b'U' => (Args::TypeAndIndex, Kind::ExplicitClosure),
            b'u' => (Args::TypeAndIndex, Kind::ImplicitClosure),
            b'A' => (Args::Index, Kind::DefaultArgumentInitializer),
            b'p' => return self.demangle_entity(Kind::GenericTypeParamDecl),
            b'P' => (Args::None, Kind::PropertyWrapperBackingInitializer),
            b'W' => (Args::None, Kind::PropertyWrapperInitFromProjectedValue),
            _ => return None,
        };

        match args {
            Args::None => Some(node::parent(kind, [self.pop_context()?])),
            Args::TypeAndMaybePrivateName => {
                let private_name = self.pop_kind(Kind::PrivateDeclName);
                let mut ty = self.pop_kind(Kind::Type);
                let labels = self.pop_function_param_labels(&mut ty);
                let mut entity = Node::with_children(kind, [self.pop_context()?]);

                entity.add_children(labels);
                entity.add_child(ty?);
                entity.add_children(private_name);

                Some(Rc::new(entity))
            }
            Args::TypeAndIndex => {
                let index = self.demangle_index_as_node()?;
                let ty = self.pop_kind(Kind::Type);
                let context = self.pop_context()?;

                Some(node::parent(kind, [context, index, ty?]))
            }
            Args::Index => {
                let index = self.demangle_index_as_node()?;

                Some(node::parent(kind, [self.pop_context()?, index]))
            }
        }
    }

    pub(super) fn demangle_entity(&mut self, kind: Kind) -> Option<Rc<Node<'a>>> {
        let mut ty = self.pop_kind(Kind::Type);
        let labels = self.pop_function_param_labels(&mut ty);
        let name = self.pop_if(Kind::is_decl_name)?;
        let context = self.pop_context()?;
        let mut entity = Node::with_children(kind, [context, name]);

        entity.add_children(labels);
        entity.add_child(ty?);

        Some(Rc::new(entity))
    }

    pub(super) fn demangle_variable(&mut self) -> Option<Rc<Node<'a>>> {
        let variable = self.demangle_entity(Kind::Variable)?;

        self.demangle_accessor(variable)
    }

    pub(super) fn demangle_subscript(&mut self) -> Option<Rc<Node<'a>>> {
        let private_name = self.pop_kind(Kind::PrivateDeclName);
        let mut ty = self.pop_kind(Kind::Type);
        let labels = self.pop_function_param_labels(&mut ty);
        let mut subscript = Node::with_children(Kind::Subscript, [self.pop_context()?]);

        subscript.add_children(labels);
        subscript.add_child(ty?);
        subscript.add_children(private_name);

        self.demangle_accessor(Rc::new(subscript))
    }

    fn demangle_accessor(&mut self, storage: Rc<Node<'a>>) -> Option<Rc<Node<'a>>> {
        let kind = match self.cursor.next()? {
            b'm' => Kind::MaterializeForSet,
            b's' => Kind::Setter,
            b'g' => Kind::Getter,
            b'G' => Kind::GlobalGetter,
            b'w' => Kind::WillSet,
            b'W' => Kind::DidSet,
            b'r' => Kind::ReadAccessor,
            b'M' => Kind::ModifyAccessor,
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
            b'p' => return Some(storage),
            _ => return None,
        };

        Some(node::parent(kind, [storage]))
    }

    pub(super) fn demangle_value_witness(&mut self) -> Option<Rc<Node<'a>>> {
        let code = [self.cursor.next()?, self.cursor.next()?];
        let kind = ValueWitnessKind::from_code(code)?;
        let ty = self.pop_kind(Kind::Type)?;

        Some(node::parent(
            Kind::ValueWitness,
            [node::tagged(Kind::Index, Payload::ValueWitnessKind(kind)), ty],
        ))
    }

    // Metadata.

    fn with_popped_type(&mut self, kind: Kind) -> Option<Rc<Node<'a>>> {
        Some(node::parent(kind, [self.pop_kind(Kind::Type)?]))
    }

    fn with_popped_node(&mut self, kind: Kind) -> Option<Rc<Node<'a>>> {
        Some(node::parent(kind, [self.pop_node()?]))
    }

    pub(super) fn demangle_metatype(&mut self) -> Option<Rc<Node<'a>>> {
        match self.cursor.next()? {
            b'a' => self.with_popped_type(Kind::TypeMetadataAccessFunction),
            b'A' => Some(node::parent(
                Kind::ReflectionMetadataAssocTypeDescriptor,
                [self.pop_protocol_conformance()?],
            )),
            b'b' => self.with_popped_type(Kind::CanonicalSpecializedGenericTypeMetadataAccessFunction),
            b'B' => self.with_popped_type(Kind::ReflectionMetadataBuiltinDescriptor),
            b'c' => Some(node::parent(
                Kind::ProtocolConformanceDescriptor,
                [self.pop_protocol_conformance()?],
            )),
            b'C' => {
                let superclass = self.pop_type_and_get_any_generic()?;

                Some(node::parent(Kind::ReflectionMetadataSuperclassDescriptor, [superclass]))
            }
            b'D' => self.with_popped_type(Kind::TypeMetadataDemanglingCache),
            b'f' => self.with_popped_type(Kind::FullTypeMetadata),
            b'F' => self.with_popped_type(Kind::ReflectionMetadataFieldDescriptor),
            b'g' => self.with_popped_node(Kind::OpaqueTypeDescriptorAccessor),
            b'h' => self.with_popped_node(Kind::OpaqueTypeDescriptorAccessorImpl),
            b'i' => self.with_popped_type(Kind::TypeMetadataInstantiationFunction),
            b'I' => self.with_popped_type(Kind::TypeMetadataInstantiationCache),
            b'j' => self.with_popped_node(Kind::OpaqueTypeDescriptorAccessorKey),
            b'J' => self.with_popped_node(Kind::NoncanonicalSpecializedGenericTypeMetadataCache),
            b'k' => self.with_popped_node(Kind::OpaqueTypeDescriptorAccessorVar),
            b'K' => self.with_popped_node(Kind::MetadataInstantiationCache),
            b'l' => self.with_popped_type(Kind::TypeMetadataSingletonInitializationCache),
            b'L' => self.with_popped_type(Kind::TypeMetadataLazyCache),
            b'm' => self.with_popped_type(Kind::Metaclass),
            b'M' => self.with_popped_type(Kind::CanonicalSpecializedGenericMetaclass),
            b'n' => self.with_popped_type(Kind::NominalTypeDescriptor),
            b'N' => self.with_popped_type(Kind::NoncanonicalSpecializedGenericTypeMetadata),
            b'o' => self.with_popped_type(Kind::ClassMetadataBaseOffset),
            b'p' => Some(node::parent(Kind::ProtocolDescriptor, [self.pop_protocol()?])),
            b'P' => self.with_popped_type(Kind::GenericTypeMetadataPattern),
            b'Q' => self.with_popped_node(Kind::OpaqueTypeDescriptor),
            b'r' => self.with_popped_type(Kind::TypeMetadataCompletionFunction),
            b's' => self.with_popped_type(Kind::ObjCResilientClassStub),
            b'S' => Some(node::parent(Kind::ProtocolSelfConformanceDescriptor, [self.pop_protocol()?])),
            b't' => self.with_popped_type(Kind::FullObjCResilientClassStub),
            b'u' => self.with_popped_type(Kind::MethodLookupFunction),
            b'U' => self.with_popped_type(Kind::ObjCMetadataUpdateFunction),
            b'V' => Some(node::parent(Kind::PropertyDescriptor, [self.pop_if(Kind::is_entity)?])),
            b'X' => self.demangle_private_context_descriptor(),
            b'z' => self.with_popped_type(Kind::CanonicalPrespecializedGenericTypeCachingOnceToken),
            _ => None,
        }
    }

    fn demangle_private_context_descriptor(&mut self) -> Option<Rc<Node<'a>>> {
        match self.cursor.next()? {
            b'E' => Some(node::parent(Kind::ExtensionDescriptor, [self.pop_context()?])),
            b'M' => Some(node::parent(Kind::ModuleDescriptor, [self.pop_module()?])),
            b'Y' => {
                let discriminator = self.pop_node()?;
                let context = self.pop_context()?;

                Some(node::parent(Kind::AnonymousContext, [discriminator, context]))
            }
            b'X' => Some(node::parent(Kind::AnonymousDescriptor, [self.pop_context()?])),
            _ => None,
        }
    }

    // Witnesses.

    pub(super) fn demangle_witness(&mut self) -> Option<Rc<Node<'a>>> {
        let c = self.cursor.next()?;

        match c {
            b'C' => Some(node::parent(Kind::EnumCase, [self.pop_if(Kind::is_entity)?])),
            b'V' => self.with_popped_type(Kind::ValueWitnessTable),
            b'v' => {
                let directness = match self.cursor.next()? {
                    b'd' => Directness::Direct,
                    b'i' => Directness::Indirect,
                    _ => return None,
                };

                let entity = self.pop_if(Kind::is_entity)?;

                Some(node::parent(
                    Kind::FieldOffset,
                    [node::tagged(Kind::Directness, Payload::Directness(directness)), entity],
                ))
            }
            b'S' => Some(node::parent(
                Kind::ProtocolSelfConformanceWitnessTable,
                [self.pop_protocol()?],
            )),
            b'P' => self.with_popped_conformance(Kind::ProtocolWitnessTable),
            b'p' => self.with_popped_conformance(Kind::ProtocolWitnessTablePattern),
            b'G' => self.with_popped_conformance(Kind::GenericProtocolWitnessTable),
            b'I' => self.with_popped_conformance(Kind::GenericProtocolWitnessTableInstantiationFunction),
            b'r' => self.with_popped_conformance(Kind::ResilientProtocolWitnessTable),
            b'l' | b'L' => {
                let conformance = self.pop_protocol_conformance()?;
                let ty = self.pop_kind(Kind::Type)?;
                let kind = if c == b'l' {
                    Kind::LazyProtocolWitnessTableAccessor
                } else {
                    Kind::LazyProtocolWitnessTableCacheVariable
                };

                Some(node::parent(kind, [ty, conformance]))
            }
            b'a' => self.with_popped_conformance(Kind::ProtocolWitnessTableAccessor),
            b't' => {
                let name = self.pop_if(Kind::is_decl_name)?;
                let conformance = self.pop_protocol_conformance()?;

                Some(node::parent(Kind::AssociatedTypeMetadataAccessor, [conformance, name]))
            }
            b'T' => {
                let protocol = self.pop_kind(Kind::Type)?;
                let conforming_type = self.pop_assoc_type_path()?;
                let conformance = self.pop_protocol_conformance()?;

                Some(node::parent(
                    Kind::AssociatedTypeWitnessTableAccessor,
                    [conformance, conforming_type, protocol],
                ))
            }
            b'b' => {
                let protocol = self.pop_kind(Kind::Type)?;
                let conformance = self.pop_protocol_conformance()?;

                Some(node::parent(Kind::BaseWitnessTableAccessor, [conformance, protocol]))
            }
            b'O' => {
                let kind = match self.cursor.next()? {
                    b'y' => Kind::OutlinedCopy,
                    b'e' => Kind::OutlinedConsume,
                    b'r' => Kind::OutlinedRetain,
                    b's' => Kind::OutlinedRelease,
                    b'b' => Kind::OutlinedInitializeWithTake,
                    b'c' => Kind::OutlinedInitializeWithCopy,
                    b'd' => Kind::OutlinedAssignWithTake,
                    b'f' => Kind::OutlinedAssignWithCopy,
                    b'h' => Kind::OutlinedDestroy,
                    _ => return None,
                };

                let signature = self.pop_kind(Kind::DependentGenericSignature);
                let mut outlined = Node::with_children(kind, [self.pop_kind(Kind::Type)?]);

                outlined.add_children(signature);

                Some(Rc::new(outlined))
            }
            b'Z' | b'z' => {
                let mut names = Vec::new();

                while self.pop_kind(Kind::FirstElementMarker).is_some() {
                    names.push(self.pop_if(Kind::is_decl_name)?);
                }

                names.reverse();

                let context = self.pop_context()?;
                let kind = if c == b'Z' {
                    Kind::GlobalVariableOnceFunction
                } else {
                    Kind::GlobalVariableOnceToken
                };

                Some(node::parent(
                    kind,
                    [context, node::parent(Kind::GlobalVariableOnceDeclList, names)],
                ))
            }
            b'J' => self.demangle_differentiability_witness(),
            _ => None,
        }
    }

    fn with_popped_conformance(&mut self, kind: Kind) -> Option<Rc<Node<'a>>> {
        Some(node::parent(kind, [self.pop_protocol_conformance()?]))
    }

    pub(super) fn pop_assoc_type_path(&mut self) -> Option<Rc<Node<'a>>> {
        let mut path = Vec::new();

        loop {
            let is_first = self.pop_kind(Kind::FirstElementMarker).is_some();

            path.push(self.pop_assoc_type_name()?);

            if is_first {
                break;
            }
        }

        path.reverse();

        Some(node::parent(Kind::AssocTypePath, path))
    }

    // Protocol conformances.

    pub(super) fn pop_protocol_conformance(&mut self) -> Option<Rc<Node<'a>>> {
        let signature = self.pop_kind(Kind::DependentGenericSignature);
        let module = self.pop_module()?;
        let protocol = self.pop_protocol()?;

        let (mut ty, identifier) = match self.pop_kind(Kind::Type) {
            Some(ty) => (ty, None),
            None => {
                let identifier = self.pop_kind(Kind::Identifier);

                (self.pop_kind(Kind::Type)?, identifier)
            }
        };

        if let Some(signature) = signature {
            ty = node::ty(node::parent(Kind::DependentGenericType, [signature, ty]));
        }

        let mut conformance = Node::with_children(Kind::ProtocolConformance, [ty, protocol, module]);

        conformance.add_children(identifier);

        Some(Rc::new(conformance))
    }

    fn pop_any_protocol_conformance(&mut self) -> Option<Rc<Node<'a>>> {
        self.pop_if(|kind| {
            matches!(
                kind,
                Kind::ConcreteProtocolConformance
                    | Kind::DependentProtocolConformanceRoot
                    | Kind::DependentProtocolConformanceInherited
                    | Kind::DependentProtocolConformanceAssociated
            )
        })
    }

    fn pop_dependent_protocol_conformance(&mut self) -> Option<Rc<Node<'a>>> {
        self.pop_if(|kind| {
            matches!(
                kind,
                Kind::DependentProtocolConformanceRoot
                    | Kind::DependentProtocolConformanceInherited
                    | Kind::DependentProtocolConformanceAssociated
            )
        })
    }

    pub(super) fn demangle_retroactive_conformance(&mut self) -> Option<Rc<Node<'a>>> {
        let index = self.demangle_index_as_node()?;
        let conformance = self.pop_any_protocol_conformance()?;

        Some(node::parent(Kind::RetroactiveConformance, [index, conformance]))
    }

    pub(super) fn demangle_concrete_protocol_conformance(&mut self) -> Option<Rc<Node<'a>>> {
        let conditional_conformances = self.pop_list(Self::pop_any_protocol_conformance)?;

        let reference = match self.pop_kind(Kind::ProtocolConformanceRefInTypeModule) {
            Some(reference) => reference,
            None => match self.pop_kind(Kind::ProtocolConformanceRefInProtocolModule) {
                Some(reference) => reference,
                None => {
                    let module = self.pop_module()?;
                    let protocol = self.pop_protocol()?;

                    node::parent(Kind::ProtocolConformanceRefInOtherModule, [protocol, module])
                }
            },
        };

        let ty = self.pop_kind(Kind::Type)?;

        Some(node::parent(
            Kind::ConcreteProtocolConformance,
            [
                ty,
                reference,
                node::parent(Kind::AnyProtocolConformanceList, conditional_conformances),
            ],
        ))
    }

    fn demangle_dependent_conformance_index(&mut self) -> Option<Rc<Node<'a>>> {
        match self.demangle_index()? {
            0 => None,
            1 => Some(node::leaf(Kind::UnknownIndex)),
            index => Some(node::index(Kind::Index, index - 2)),
        }
    }

    pub(super) fn demangle_dependent_protocol_conformance_root(&mut self) -> Option<Rc<Node<'a>>> {
        let index = self.demangle_dependent_conformance_index()?;
        let protocol = self.pop_protocol()?;
        let dependent_type = self.pop_kind(Kind::Type)?;

        Some(node::parent(
            Kind::DependentProtocolConformanceRoot,
            [dependent_type, protocol, index],
        ))
    }

    pub(super) fn demangle_dependent_protocol_conformance_inherited(&mut self) -> Option<Rc<Node<'a>>> {
        let index = self.demangle_dependent_conformance_index()?;
        let protocol = self.pop_protocol()?;
        let nested = self.pop_dependent_protocol_conformance()?;

        Some(node::parent(
            Kind::DependentProtocolConformanceInherited,
            [nested, protocol, index],
        ))
    }

    pub(super) fn demangle_dependent_protocol_conformance_associated(&mut self) -> Option<Rc<Node<'a>>> {
        let index = self.demangle_dependent_conformance_index()?;
        let protocol = self.pop_protocol()?;
        let dependent_type = self.pop_kind(Kind::Type)?;
        let associated = node::parent(Kind::DependentAssociatedConformance, [dependent_type, protocol]);
        let nested = self.pop_dependent_protocol_conformance()?;

        Some(node::parent(
            Kind::DependentProtocolConformanceAssociated,
            [nested, associated, index],
        ))
    }
}

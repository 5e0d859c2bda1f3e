//! The node tree shared by both decoders and the printer.

use crate::kinds::{Directness, MangledDifferentiabilityKind, SpecializationParamKind, ValueWitnessKind};
use std::borrow::Cow;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

macro_rules! define_kinds {
    ($($kind:ident,)*) => {
        /// The kind tag of a [`Node`].
        #[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
        pub enum Kind {
            $($kind,)*
        }

        impl Kind {
            /// Every kind, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$kind,)*];

            #[must_use]
            pub const fn name(self) -> &'static str {
                match self {
                    $(Self::$kind => stringify!($kind),)*
                }
            }
        }
    };
}

define_kinds! {
    Allocator,
    AnonymousContext,
    AnonymousDescriptor,
    AnyProtocolConformanceList,
    ArgumentTuple,
    AssociatedConformanceDescriptor,
    AssociatedType,
    AssociatedTypeDescriptor,
    AssociatedTypeGenericParamRef,
    AssociatedTypeMetadataAccessor,
    AssociatedTypeRef,
    AssociatedTypeWitnessTableAccessor,
    AssocTypePath,
    AsyncAnnotation,
    AsyncAwaitResumePartialFunction,
    AsyncFunctionPointer,
    AsyncSuspendResumePartialFunction,
    AutoClosureType,
    AutoDiffDerivativeVTableThunk,
    AutoDiffFunction,
    AutoDiffFunctionKind,
    AutoDiffSelfReorderingReabstractionThunk,
    AutoDiffSubsetParametersThunk,
    BaseConformanceDescriptor,
    BaseWitnessTableAccessor,
    BoundGenericClass,
    BoundGenericEnum,
    BoundGenericFunction,
    BoundGenericOtherNominalType,
    BoundGenericProtocol,
    BoundGenericStructure,
    BoundGenericTypeAlias,
    BuiltinTypeName,
    CFunctionPointer,
    CanonicalPrespecializedGenericTypeCachingOnceToken,
    CanonicalSpecializedGenericMetaclass,
    CanonicalSpecializedGenericTypeMetadataAccessFunction,
    Class,
    ClassMetadataBaseOffset,
    ClangType,
    ConcreteProtocolConformance,
    ConcurrentFunctionType,
    Constructor,
    CoroutineContinuationPrototype,
    CurryThunk,
    Deallocator,
    DeclContext,
    DefaultArgumentInitializer,
    DefaultAssociatedConformanceAccessor,
    DefaultAssociatedTypeMetadataAccessor,
    DependentAssociatedConformance,
    DependentAssociatedTypeRef,
    DependentGenericConformanceRequirement,
    DependentGenericLayoutRequirement,
    DependentGenericParamCount,
    DependentGenericParamType,
    DependentGenericSameTypeRequirement,
    DependentGenericSignature,
    DependentGenericType,
    DependentMemberType,
    DependentProtocolConformanceAssociated,
    DependentProtocolConformanceInherited,
    DependentProtocolConformanceRoot,
    DependentPseudogenericSignature,
    Destructor,
    DidSet,
    DifferentiabilityWitness,
    DifferentiableFunctionType,
    DirectMethodReferenceAttribute,
    Directness,
    DispatchThunk,
    DynamicAttribute,
    DynamicSelf,
    DynamicallyReplaceableFunctionImpl,
    DynamicallyReplaceableFunctionKey,
    DynamicallyReplaceableFunctionVar,
    EmptyList,
    Enum,
    EnumCase,
    ErrorType,
    EscapingAutoClosureType,
    EscapingObjCBlock,
    ExistentialMetatype,
    ExplicitClosure,
    Extension,
    ExtensionDescriptor,
    FieldOffset,
    FirstElementMarker,
    FullObjCResilientClassStub,
    FullTypeMetadata,
    Function,
    FunctionSignatureSpecialization,
    FunctionSignatureSpecializationParam,
    FunctionSignatureSpecializationParamKind,
    FunctionSignatureSpecializationParamPayload,
    FunctionSignatureSpecializationReturn,
    FunctionType,
    GenericPartialSpecialization,
    GenericPartialSpecializationNotReAbstracted,
    GenericProtocolWitnessTable,
    GenericProtocolWitnessTableInstantiationFunction,
    GenericSpecialization,
    GenericSpecializationInResilienceDomain,
    GenericSpecializationNotReAbstracted,
    GenericSpecializationParam,
    GenericSpecializationPrespecialized,
    GenericTypeMetadataPattern,
    GenericTypeParamDecl,
    Getter,
    Global,
    GlobalActorFunctionType,
    GlobalGetter,
    GlobalVariableOnceDeclList,
    GlobalVariableOnceFunction,
    GlobalVariableOnceToken,
    Identifier,
    ImplDifferentiability,
    ImplErrorResult,
    ImplEscaping,
    ImplConvention,
    ImplFunctionAttribute,
    ImplFunctionConvention,
    ImplFunctionConventionName,
    ImplFunctionType,
    ImplParameterResultDifferentiability,
    ImplInvocationSubstitutions,
    ImplParameter,
    ImplPatternSubstitutions,
    ImplResult,
    ImplYield,
    ImplicitClosure,
    InOut,
    Index,
    IndexSubset,
    InfixOperator,
    Initializer,
    InlinedGenericFunction,
    Isolated,
    IsSerialized,
    IVarDestroyer,
    IVarInitializer,
    KeyPathEqualsThunkHelper,
    KeyPathGetterThunkHelper,
    KeyPathHashThunkHelper,
    KeyPathSetterThunkHelper,
    LabelList,
    LazyProtocolWitnessTableAccessor,
    LazyProtocolWitnessTableCacheVariable,
    LocalDeclName,
    MaterializeForSet,
    MergedFunction,
    Metaclass,
    MetadataInstantiationCache,
    Metatype,
    MetatypeRepresentation,
    MethodDescriptor,
    MethodLookupFunction,
    ModifyAccessor,
    Module,
    ModuleDescriptor,
    NativeOwningAddressor,
    NativeOwningMutableAddressor,
    NativePinningAddressor,
    NativePinningMutableAddressor,
    NoDerivative,
    NoEscapeFunctionType,
    NominalTypeDescriptor,
    NonObjCAttribute,
    NoncanonicalSpecializedGenericTypeMetadata,
    NoncanonicalSpecializedGenericTypeMetadataCache,
    Number,
    ObjCAsyncCompletionHandlerImpl,
    ObjCAttribute,
    ObjCBlock,
    ObjCMetadataUpdateFunction,
    ObjCResilientClassStub,
    OpaqueReturnType,
    OpaqueReturnTypeOf,
    OpaqueType,
    OpaqueTypeDescriptor,
    OpaqueTypeDescriptorAccessor,
    OpaqueTypeDescriptorAccessorImpl,
    OpaqueTypeDescriptorAccessorKey,
    OpaqueTypeDescriptorAccessorVar,
    OpaqueTypeDescriptorSymbolicReference,
    OtherNominalType,
    OutlinedAssignWithCopy,
    OutlinedAssignWithTake,
    OutlinedBridgedMethod,
    OutlinedConsume,
    OutlinedCopy,
    OutlinedDestroy,
    OutlinedInitializeWithCopy,
    OutlinedInitializeWithTake,
    OutlinedRelease,
    OutlinedRetain,
    OutlinedVariable,
    Owned,
    OwningAddressor,
    OwningMutableAddressor,
    PartialApplyForwarder,
    PartialApplyObjCForwarder,
    PostfixOperator,
    PredefinedObjCAsyncCompletionHandlerImpl,
    PrefixOperator,
    PrivateDeclName,
    PropertyDescriptor,
    PropertyWrapperBackingInitializer,
    PropertyWrapperInitFromProjectedValue,
    Protocol,
    ProtocolConformance,
    ProtocolConformanceDescriptor,
    ProtocolConformanceRefInOtherModule,
    ProtocolConformanceRefInProtocolModule,
    ProtocolConformanceRefInTypeModule,
    ProtocolDescriptor,
    ProtocolList,
    ProtocolListWithAnyObject,
    ProtocolListWithClass,
    ProtocolRequirementsBaseDescriptor,
    ProtocolSelfConformanceDescriptor,
    ProtocolSelfConformanceWitness,
    ProtocolSelfConformanceWitnessTable,
    ProtocolSymbolicReference,
    ProtocolWitness,
    ProtocolWitnessTable,
    ProtocolWitnessTableAccessor,
    ProtocolWitnessTablePattern,
    ReabstractionThunk,
    ReabstractionThunkHelper,
    ReabstractionThunkHelperWithGlobalActor,
    ReabstractionThunkHelperWithSelf,
    ReadAccessor,
    ReflectionMetadataAssocTypeDescriptor,
    ReflectionMetadataBuiltinDescriptor,
    ReflectionMetadataFieldDescriptor,
    ReflectionMetadataSuperclassDescriptor,
    RelatedEntityDeclName,
    ResilientProtocolWitnessTable,
    RetroactiveConformance,
    ReturnType,
    Setter,
    Shared,
    SILBoxImmutableField,
    SILBoxLayout,
    SILBoxMutableField,
    SILBoxType,
    SILBoxTypeWithLayout,
    SpecializationPassID,
    Static,
    Structure,
    Subscript,
    Suffix,
    SugaredArray,
    SugaredDictionary,
    SugaredOptional,
    SugaredParen,
    ThinFunctionType,
    ThrowsAnnotation,
    Tuple,
    TupleElement,
    TupleElementName,
    Type,
    TypeAlias,
    TypeList,
    TypeMangling,
    TypeMetadata,
    TypeMetadataAccessFunction,
    TypeMetadataCompletionFunction,
    TypeMetadataDemanglingCache,
    TypeMetadataInstantiationCache,
    TypeMetadataInstantiationFunction,
    TypeMetadataLazyCache,
    TypeMetadataSingletonInitializationCache,
    TypeSymbolicReference,
    UncurriedFunctionType,
    UnknownIndex,
    Unmanaged,
    Unowned,
    UnsafeAddressor,
    UnsafeMutableAddressor,
    ValueWitness,
    ValueWitnessTable,
    Variable,
    VariadicMarker,
    VTableAttribute,
    VTableThunk,
    Weak,
    WillSet,
}

impl Kind {
    /// Kinds that name a declaration: plain identifiers, operators, local and private names, and symbolic
    /// references to declarations.
    #[must_use]
    pub const fn is_decl_name(self) -> bool {
        matches!(
            self,
            Self::Identifier
                | Self::LocalDeclName
                | Self::PrivateDeclName
                | Self::RelatedEntityDeclName
                | Self::PrefixOperator
                | Self::PostfixOperator
                | Self::InfixOperator
                | Self::TypeSymbolicReference
                | Self::ProtocolSymbolicReference
        )
    }

    /// Nominal kinds that can be bound to generic arguments.
    #[must_use]
    pub const fn is_any_generic(self) -> bool {
        matches!(
            self,
            Self::Structure
                | Self::Class
                | Self::Enum
                | Self::Protocol
                | Self::ProtocolSymbolicReference
                | Self::OtherNominalType
                | Self::TypeAlias
                | Self::TypeSymbolicReference
        )
    }

    /// Plain nominal type declarations.
    #[must_use]
    pub const fn is_nominal(self) -> bool {
        matches!(
            self,
            Self::Structure | Self::Class | Self::Enum | Self::Protocol | Self::OtherNominalType | Self::TypeAlias
        )
    }

    /// Kinds that can enclose other declarations.
    #[must_use]
    pub const fn is_context(self) -> bool {
        matches!(
            self,
            Self::Allocator
                | Self::AnonymousContext
                | Self::Class
                | Self::Constructor
                | Self::Deallocator
                | Self::DefaultArgumentInitializer
                | Self::Destructor
                | Self::DidSet
                | Self::Enum
                | Self::ExplicitClosure
                | Self::Extension
                | Self::Function
                | Self::Getter
                | Self::GlobalGetter
                | Self::IVarInitializer
                | Self::IVarDestroyer
                | Self::ImplicitClosure
                | Self::Initializer
                | Self::MaterializeForSet
                | Self::ModifyAccessor
                | Self::Module
                | Self::NativeOwningAddressor
                | Self::NativeOwningMutableAddressor
                | Self::NativePinningAddressor
                | Self::NativePinningMutableAddressor
                | Self::OtherNominalType
                | Self::OwningAddressor
                | Self::OwningMutableAddressor
                | Self::PropertyWrapperBackingInitializer
                | Self::PropertyWrapperInitFromProjectedValue
                | Self::Protocol
                | Self::ProtocolSymbolicReference
                | Self::ReadAccessor
                | Self::Setter
                | Self::Static
                | Self::Structure
                | Self::Subscript
                | Self::TypeSymbolicReference
                | Self::TypeAlias
                | Self::UnsafeAddressor
                | Self::UnsafeMutableAddressor
                | Self::Variable
                | Self::WillSet
                | Self::OpaqueReturnTypeOf
        )
    }

    /// Contexts and types. Also accepts some kinds that are not entities.
    #[must_use]
    pub const fn is_entity(self) -> bool {
        matches!(self, Self::Type) || self.is_context()
    }

    #[must_use]
    pub const fn is_requirement(self) -> bool {
        matches!(
            self,
            Self::DependentGenericSameTypeRequirement
                | Self::DependentGenericLayoutRequirement
                | Self::DependentGenericConformanceRequirement
        )
    }

    /// Kinds that annotate a whole symbol rather than forming part of it.
    #[must_use]
    pub const fn is_function_attr(self) -> bool {
        matches!(
            self,
            Self::FunctionSignatureSpecialization
                | Self::GenericSpecialization
                | Self::GenericSpecializationPrespecialized
                | Self::InlinedGenericFunction
                | Self::GenericSpecializationNotReAbstracted
                | Self::GenericPartialSpecialization
                | Self::GenericPartialSpecializationNotReAbstracted
                | Self::GenericSpecializationInResilienceDomain
                | Self::ObjCAttribute
                | Self::NonObjCAttribute
                | Self::DynamicAttribute
                | Self::DirectMethodReferenceAttribute
                | Self::VTableAttribute
                | Self::PartialApplyForwarder
                | Self::PartialApplyObjCForwarder
                | Self::OutlinedVariable
                | Self::OutlinedBridgedMethod
                | Self::MergedFunction
                | Self::DynamicallyReplaceableFunctionImpl
                | Self::DynamicallyReplaceableFunctionKey
                | Self::DynamicallyReplaceableFunctionVar
                | Self::AsyncFunctionPointer
                | Self::AsyncAwaitResumePartialFunction
                | Self::AsyncSuspendResumePartialFunction
        )
    }

    /// Kinds that never need parentheses when printed as a generic argument or a sugared element. `Type`,
    /// `ProtocolList` and `ProtocolListWithAnyObject` depend on their children and are not included here.
    #[must_use]
    pub const fn is_simple_type(self) -> bool {
        matches!(
            self,
            Self::AssociatedType
                | Self::AssociatedTypeRef
                | Self::BoundGenericClass
                | Self::BoundGenericEnum
                | Self::BoundGenericStructure
                | Self::BoundGenericProtocol
                | Self::BoundGenericOtherNominalType
                | Self::BoundGenericTypeAlias
                | Self::BoundGenericFunction
                | Self::BuiltinTypeName
                | Self::Class
                | Self::DependentGenericType
                | Self::DependentMemberType
                | Self::DependentGenericParamType
                | Self::DynamicSelf
                | Self::Enum
                | Self::ErrorType
                | Self::ExistentialMetatype
                | Self::Metatype
                | Self::MetatypeRepresentation
                | Self::Module
                | Self::Tuple
                | Self::Protocol
                | Self::ProtocolSymbolicReference
                | Self::ReturnType
                | Self::SILBoxType
                | Self::SILBoxTypeWithLayout
                | Self::Structure
                | Self::OtherNominalType
                | Self::TupleElementName
                | Self::TypeAlias
                | Self::TypeList
                | Self::LabelList
                | Self::TypeSymbolicReference
                | Self::SugaredOptional
                | Self::SugaredArray
                | Self::SugaredDictionary
                | Self::SugaredParen
        )
    }

    /// Specialization kinds whose parameters are `GenericSpecializationParam` nodes.
    #[must_use]
    pub const fn is_generic_specialization(self) -> bool {
        matches!(
            self,
            Self::GenericSpecialization
                | Self::GenericSpecializationPrespecialized
                | Self::GenericSpecializationNotReAbstracted
                | Self::GenericPartialSpecialization
                | Self::GenericPartialSpecializationNotReAbstracted
                | Self::GenericSpecializationInResilienceDomain
                | Self::InlinedGenericFunction
        )
    }
}

/// The payload of a [`Node`].
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Payload<'a> {
    None,
    Text(Cow<'a, str>),
    Index(u64),
    ValueWitnessKind(ValueWitnessKind),
    Differentiability(MangledDifferentiabilityKind),
    SpecializationParamKind(SpecializationParamKind),
    Directness(Directness),
}

/// A descriptive summary of what a node carries.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum PayloadCategory {
    None,
    OneChild,
    TwoChildren,
    ManyChildren,
    Text,
    Index,
    Tag,
}

/// A node of a demangled symbol tree.
#[derive(Clone, Debug)]
pub struct Node<'a> {
    kind: Kind,
    payload: Payload<'a>,
    children: Vec<Rc<Node<'a>>>,
    height: usize,
}

impl PartialEq for Node<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.payload == other.payload && self.children == other.children
    }
}

impl Eq for Node<'_> {}

impl Hash for Node<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.payload.hash(state);
        self.children.hash(state);
    }
}

impl<'a> Node<'a> {
    #[must_use]
    pub const fn new(kind: Kind) -> Self {
        Self::with_payload(kind, Payload::None)
    }

    #[must_use]
    pub const fn with_payload(kind: Kind, payload: Payload<'a>) -> Self {
        Self {
            kind,
            payload,
            children: Vec::new(),
            height: 1,
        }
    }

    #[must_use]
    pub fn with_text(kind: Kind, text: impl Into<Cow<'a, str>>) -> Self {
        Self::with_payload(kind, Payload::Text(text.into()))
    }

    #[must_use]
    pub const fn with_index(kind: Kind, index: u64) -> Self {
        Self::with_payload(kind, Payload::Index(index))
    }

    #[must_use]
    pub fn with_children(kind: Kind, children: impl IntoIterator<Item = Rc<Self>>) -> Self {
        let mut node = Self::new(kind);

        node.children = children.into_iter().collect();
        node.update_height();

        node
    }

    #[must_use]
    pub const fn kind(&self) -> Kind {
        self.kind
    }

    #[must_use]
    pub const fn payload(&self) -> &Payload<'a> {
        &self.payload
    }

    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match &self.payload {
            Payload::Text(text) => Some(text),
            _ => None,
        }
    }

    #[must_use]
    pub const fn index(&self) -> Option<u64> {
        match self.payload {
            Payload::Index(index) => Some(index),
            _ => None,
        }
    }

    #[must_use]
    pub fn children(&self) -> &[Rc<Self>] {
        &self.children
    }

    #[must_use]
    pub fn child(&self, index: usize) -> Option<&Rc<Self>> {
        self.children.get(index)
    }

    #[must_use]
    pub fn first_child(&self) -> Option<&Rc<Self>> {
        self.children.first()
    }

    #[must_use]
    pub fn last_child(&self) -> Option<&Rc<Self>> {
        self.children.last()
    }

    #[must_use]
    pub fn num_children(&self) -> usize {
        self.children.len()
    }

    /// Number of nodes on the longest path from this node down to a leaf. Editing descendants in place may leave
    /// this as an upper bound.
    #[must_use]
    pub const fn height(&self) -> usize {
        self.height
    }

    fn update_height(&mut self) {
        self.height = self.children.iter().map(|child| child.height).max().unwrap_or(0) + 1;
    }

    /// Whether generic child appends are allowed, which is the case only for nodes without a payload.
    #[must_use]
    pub const fn accepts_children(&self) -> bool {
        matches!(self.payload, Payload::None)
    }

    #[must_use]
    pub fn payload_category(&self) -> PayloadCategory {
        match self.payload {
            Payload::None => match self.children.len() {
                0 => PayloadCategory::None,
                1 => PayloadCategory::OneChild,
                2 => PayloadCategory::TwoChildren,
                _ => PayloadCategory::ManyChildren,
            },
            Payload::Text(_) => PayloadCategory::Text,
            Payload::Index(_) => PayloadCategory::Index,
            Payload::ValueWitnessKind(_)
            | Payload::Differentiability(_)
            | Payload::SpecializationParamKind(_)
            | Payload::Directness(_) => PayloadCategory::Tag,
        }
    }

    /// Appends a child. Nodes carrying a payload silently refuse it.
    pub fn add_child(&mut self, child: Rc<Self>) {
        debug_assert!(self.accepts_children(), "{:?} node cannot have children", self.kind);

        if self.accepts_children() {
            self.height = self.height.max(child.height + 1);
            self.children.push(child);
        }
    }

    pub fn add_children(&mut self, children: impl IntoIterator<Item = Rc<Self>>) {
        debug_assert!(self.accepts_children(), "{:?} node cannot have children", self.kind);

        if self.accepts_children() {
            self.children.extend(children);
            self.update_height();
        }
    }

    /// Removes the child that is the same allocation as `child`.
    pub fn remove_child(&mut self, child: &Rc<Self>) -> bool {
        if let Some(position) = self.children.iter().position(|candidate| Rc::ptr_eq(candidate, child)) {
            self.children.remove(position);
            self.update_height();

            true
        } else {
            false
        }
    }

    pub(crate) fn children_mut(&mut self) -> &mut Vec<Rc<Self>> {
        &mut self.children
    }

    pub fn remove_child_at(&mut self, index: usize) -> Option<Rc<Self>> {
        let removed = (index < self.children.len()).then(|| self.children.remove(index));

        self.update_height();

        removed
    }

    pub fn reverse_children(&mut self) {
        self.children.reverse();
    }

    pub fn reverse_children_from(&mut self, start: usize) {
        if let Some(suffix) = self.children.get_mut(start..) {
            suffix.reverse();
        }
    }

    pub fn replace_last_child(&mut self, child: Rc<Self>) {
        if let Some(last) = self.children.last_mut() {
            *last = child;
            self.update_height();
        }
    }

    pub fn insert_child(&mut self, index: usize, child: Rc<Self>) {
        if self.accepts_children() && index <= self.children.len() {
            self.height = self.height.max(child.height + 1);
            self.children.insert(index, child);
        }
    }

    /// Finds the first child of the given kind.
    #[must_use]
    pub fn child_of_kind(&self, kind: Kind) -> Option<&Rc<Self>> {
        self.children.iter().find(|child| child.kind == kind)
    }

    /// Converts every borrowed string into an owned one.
    #[must_use]
    pub fn into_owned(self) -> Node<'static> {
        Node {
            kind: self.kind,
            payload: match self.payload {
                Payload::None => Payload::None,
                Payload::Text(text) => Payload::Text(Cow::Owned(text.into_owned())),
                Payload::Index(index) => Payload::Index(index),
                Payload::ValueWitnessKind(kind) => Payload::ValueWitnessKind(kind),
                Payload::Differentiability(kind) => Payload::Differentiability(kind),
                Payload::SpecializationParamKind(kind) => Payload::SpecializationParamKind(kind),
                Payload::Directness(directness) => Payload::Directness(directness),
            },
            children: self
                .children
                .into_iter()
                .map(|child| Rc::new(Rc::unwrap_or_clone(child).into_owned()))
                .collect(),
            height: self.height,
        }
    }
}

impl Node<'_> {
    /// Copies the node under a different kind.
    #[must_use]
    pub fn with_kind(&self, kind: Kind) -> Self {
        Self {
            kind,
            payload: self.payload.clone(),
            children: self.children.clone(),
            height: self.height,
        }
    }
}

pub(crate) fn leaf<'a>(kind: Kind) -> Rc<Node<'a>> {
    Rc::new(Node::new(kind))
}

pub(crate) fn text<'a>(kind: Kind, text: impl Into<Cow<'a, str>>) -> Rc<Node<'a>> {
    Rc::new(Node::with_text(kind, text))
}

pub(crate) fn index<'a>(kind: Kind, index: u64) -> Rc<Node<'a>> {
    Rc::new(Node::with_index(kind, index))
}

pub(crate) fn tagged<'a>(kind: Kind, payload: Payload<'a>) -> Rc<Node<'a>> {
    Rc::new(Node::with_payload(kind, payload))
}

pub(crate) fn parent<'a>(kind: Kind, children: impl IntoIterator<Item = Rc<Node<'a>>>) -> Rc<Node<'a>> {
    Rc::new(Node::with_children(kind, children))
}

/// Wraps `child` in a `Type` node.
pub(crate) fn ty(child: Rc<Node<'_>>) -> Rc<Node<'_>> {
    parent(Kind::Type, [child])
}

/// Builds a `Type` wrapping a nominal type of the standard library.
pub(crate) fn swift_type<'a>(kind: Kind, name: &'static str) -> Rc<Node<'a>> {
    ty(parent(kind, [text(Kind::Module, "Swift"), text(Kind::Identifier, name)]))
}

/// Writes an indented outline of the tree, one node per line.
#[must_use]
pub fn dump_tree(node: &Node) -> String {
    fn dump(node: &Node, depth: usize, out: &mut String) {
        for _ in 0..depth {
            out.push_str("  ");
        }

        out.push_str("kind=");
        out.push_str(node.kind.name());

        match &node.payload {
            Payload::None => {}
            Payload::Text(text) => {
                out.push_str(", text=\"");
                out.push_str(text);
                out.push('"');
            }
            Payload::Index(index) => {
                out.push_str(", index=");
                out.push_str(&index.to_string());
            }
            Payload::ValueWitnessKind(kind) => {
                out.push_str(", value-witness=");
                out.push_str(kind.name());
            }
            Payload::Differentiability(kind) => {
                out.push_str(", differentiability=");
                out.push(char::from(kind.code()));
            }
            Payload::SpecializationParamKind(kind) => {
                out.push_str(", specialization-kind=");
                out.push_str(&kind.0.to_string());
            }
            Payload::Directness(directness) => {
                out.push_str(", directness=");
                out.push_str(directness.name());
            }
        }

        out.push('\n');

        for child in &node.children {
            dump(child, depth + 1, out);
        }
    }

    let mut result = String::new();

    dump(node, 0, &mut result);

    result
}

#[cfg(test)]
mod tests {
    use super::{Kind, Node, Payload, PayloadCategory};
    use std::rc::Rc;

    fn identifier(text: &'static str) -> Rc<Node<'static>> {
        Rc::new(Node::with_text(Kind::Identifier, text))
    }

    #[test]
    fn test_add_child_respects_payload() {
        let mut parent = Node::new(Kind::Structure);

        parent.add_child(Rc::new(Node::with_text(Kind::Module, "M")));
        parent.add_child(identifier("S"));

        assert_eq!(parent.num_children(), 2);
        assert_eq!(parent.payload_category(), PayloadCategory::TwoChildren);
        assert_eq!(parent.child(1).and_then(|child| child.text()), Some("S"));

        let leaf = Node::with_index(Kind::Number, 7);

        assert!(!leaf.accepts_children());
        assert_eq!(leaf.index(), Some(7));
        assert_eq!(leaf.payload_category(), PayloadCategory::Index);
    }

    #[test]
    fn test_remove_and_reverse() {
        let a = identifier("a");
        let b = identifier("b");
        let c = identifier("c");
        let mut node = Node::with_children(Kind::TypeList, [Rc::clone(&a), Rc::clone(&b), Rc::clone(&c)]);

        node.reverse_children_from(1);

        assert!(Rc::ptr_eq(&node.children()[1], &c));

        node.reverse_children();

        assert!(Rc::ptr_eq(&node.children()[0], &b));
        assert!(node.remove_child(&a));
        assert!(!node.remove_child(&a));

        node.replace_last_child(identifier("z"));

        assert_eq!(node.last_child().and_then(|child| child.text()), Some("z"));
    }

    #[test]
    fn test_predicates() {
        assert!(Kind::Identifier.is_decl_name());
        assert!(Kind::TypeSymbolicReference.is_any_generic());
        assert!(Kind::Extension.is_context());
        assert!(Kind::Type.is_entity());
        assert!(!Kind::Tuple.is_entity());
        assert!(Kind::MergedFunction.is_function_attr());
        assert!(!Kind::Function.is_function_attr());
        assert!(Kind::DependentGenericLayoutRequirement.is_requirement());
        assert!(Kind::SugaredOptional.is_simple_type());
        assert!(!Kind::FunctionType.is_simple_type());
        assert_eq!(Kind::ALL.iter().filter(|kind| kind.name() == "Global").count(), 1);
    }

    #[test]
    fn test_into_owned_keeps_structure() {
        let text = String::from("Swift");
        let owned = {
            let node = Node::with_children(Kind::Structure, [Rc::new(Node::with_text(Kind::Module, text.as_str()))]);

            node.into_owned()
        };

        drop(text);

        assert_eq!(owned.first_child().map(|child| child.payload()), Some(&Payload::Text("Swift".into())));
    }
}

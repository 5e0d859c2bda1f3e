//! Renders node trees as readable signatures.
//!
//! Every node kind has its own rendering rule. Rules for declarations go through `print_entity`, which decides
//! whether the enclosing context is printed as a dotted prefix (`main.Foo.bar`) or as a postfix (`closure #1 in
//! main.foo()`). A context that cannot be printed as a prefix is handed back to the caller so that the outermost
//! entity prints it after its own name.

use crate::kinds::{FunctionSigSpecializationParamOptions as ParamOptions, MangledDifferentiabilityKind};
use crate::node::{Kind, Node, Payload};
use crate::options::{DemangleFlags, DemangleOptions};
use std::fmt::{self, Write};
use std::rc::Rc;
use thiserror::Error;

mod entities;
mod specializations;
#[cfg(test)]
mod tests;
mod types;

pub(crate) const STDLIB_MODULE: &str = "Swift";
pub(crate) const OBJC_MODULE: &str = "__C";
const LLDB_EXPRESSIONS_MODULE_PREFIX: &str = "lldb_expr";

/// Nodes nested deeper than this are not printed.
pub const MAX_DEPTH: usize = 768;

/// A tree that cannot be rendered.
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
pub enum PrintingError {
    /// A node lacks a child its rendering rule needs.
    #[error("{kind:?} node has no child at index {index}")]
    MissingChild {
        /// Kind of the incomplete node.
        kind: Kind,
        /// Position of the missing child, saturated at `u16::MAX`.
        index: u16,
    },
    /// A node appears where its kind has no rendering rule.
    #[error("{kind:?} node cannot be printed here")]
    UnexpectedKind {
        /// Kind of the misplaced node.
        kind: Kind,
    },
    /// A differentiable function type carries the non-differentiable marker.
    #[error("differentiable function type marked as non-differentiable")]
    InvalidDifferentiability,
    /// A node carries text where a number is needed, or the other way around.
    #[error("{kind:?} node has an unexpected payload")]
    InvalidPayload {
        /// Kind of the node.
        kind: Kind,
    },
    /// The tree is nested too deeply to be printed.
    #[error("tree is nested more than {MAX_DEPTH} levels deep")]
    TooComplex,
    /// The output sink refused the text.
    #[error("failed to write output")]
    Format(#[from] fmt::Error),
}

type PrintResult<T = ()> = Result<T, PrintingError>;

/// Renders `tree` with `options`.
pub fn render(tree: &Node, options: &DemangleOptions) -> Result<String, PrintingError> {
    NodePrinter::new(options).print_root(tree)
}

/// Renders `tree` with `options` into `writer`.
pub fn render_to(tree: &Node, options: &DemangleOptions, writer: &mut impl Write) -> Result<(), PrintingError> {
    writer.write_str(&render(tree, options)?)?;

    Ok(())
}

/// How the type of an entity is printed after its name.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum TypePrinting {
    NoType,
    WithColon,
    FunctionStyle,
}

/// Printer state for a single render.
pub struct NodePrinter<'o> {
    options: &'o DemangleOptions,
    out: String,
    specialization_prefix_printed: bool,
    depth: usize,
}

impl<'o> NodePrinter<'o> {
    /// Creates a printer that renders with `options`.
    #[must_use]
    pub const fn new(options: &'o DemangleOptions) -> Self {
        Self {
            options,
            out: String::new(),
            specialization_prefix_printed: false,
            depth: 0,
        }
    }

    /// Renders a whole tree and returns the text.
    pub fn print_root(mut self, root: &Node) -> PrintResult<String> {
        if root.height() > MAX_DEPTH {
            return Err(PrintingError::TooComplex);
        }

        self.print(root)?;

        Ok(self.out)
    }

    const fn flag(&self, flag: DemangleFlags) -> bool {
        self.options.contains(flag)
    }

    fn write(&mut self, text: &str) {
        self.out.push_str(text);
    }

    fn write_char(&mut self, c: char) {
        self.out.push(c);
    }

    fn write_number(&mut self, number: u64) -> PrintResult {
        write!(self.out, "{number}")?;

        Ok(())
    }

    fn print(&mut self, node: &Node) -> PrintResult {
        self.print_node(node, false).map(drop)
    }

    fn print_children(&mut self, node: &Node, separator: &str) -> PrintResult {
        self.print_sequence(node.children(), separator)
    }

    fn print_sequence(&mut self, nodes: &[Rc<Node>], separator: &str) -> PrintResult {
        for (i, node) in nodes.iter().enumerate() {
            if i != 0 {
                self.write(separator);
            }

            self.print(node)?;
        }

        Ok(())
    }

    fn print_first_child(&mut self, node: &Node) -> PrintResult {
        self.print(child(node, 0)?)
    }

    fn print_prefixed(&mut self, prefix: &str, node: &Node) -> PrintResult {
        self.write(prefix);
        self.print_first_child(node)
    }

    /// Prints `node` and returns the context that still has to be printed after it, if any.
    fn print_node<'n, 'a>(&mut self, node: &'n Node<'a>, as_prefix_context: bool) -> PrintResult<Option<&'n Node<'a>>> {
        if self.depth >= MAX_DEPTH {
            return Err(PrintingError::TooComplex);
        }

        self.depth += 1;

        let result = self.print_node_rule(node, as_prefix_context);

        self.depth -= 1;

        result
    }

    fn print_node_rule<'n, 'a>(
        &mut self,
        node: &'n Node<'a>,
        as_prefix_context: bool,
    ) -> PrintResult<Option<&'n Node<'a>>> {
        use TypePrinting::{FunctionStyle, NoType, WithColon};

        let show_argument_types = if self.flag(DemangleFlags::SHOW_FUNCTION_ARGUMENT_TYPES) {
            FunctionStyle
        } else {
            NoType
        };

        match node.kind() {
            Kind::Global | Kind::TypeList | Kind::AnyProtocolConformanceList => self.print_children(node, "")?,
            Kind::Type | Kind::DeclContext => self.print_first_child(node)?,
            Kind::TypeMangling => {
                let first = child(node, 0)?;

                if first.kind() == Kind::LabelList {
                    self.print_function_type(Some(first), child(child(node, 1)?, 0)?)?;
                } else {
                    self.print(first)?;
                }
            }
            Kind::Suffix => {
                if self.flag(DemangleFlags::DISPLAY_UNMANGLED_SUFFIX) {
                    self.write(" with unmangled suffix ");
                    self.write_quoted(text(node)?)?;
                }
            }

            // Declarations.
            Kind::Variable => return self.print_entity(node, as_prefix_context, EntityStyle::named(WithColon)),
            Kind::Function | Kind::BoundGenericFunction => {
                return self.print_entity(node, as_prefix_context, EntityStyle::named(FunctionStyle));
            }
            Kind::Subscript => {
                return self.print_entity(
                    node,
                    as_prefix_context,
                    EntityStyle::unnamed(FunctionStyle).overwrite("subscript"),
                );
            }
            Kind::GenericTypeParamDecl
            | Kind::Class
            | Kind::Structure
            | Kind::Enum
            | Kind::Protocol
            | Kind::TypeAlias
            | Kind::OtherNominalType => return self.print_entity(node, as_prefix_context, EntityStyle::named(NoType)),
            Kind::ExplicitClosure | Kind::ImplicitClosure => {
                let number = index(child(node, 1)?)?.saturating_add(1);
                let name = if node.kind() == Kind::ExplicitClosure {
                    "closure #"
                } else {
                    "implicit closure #"
                };

                return self.print_entity(
                    node,
                    as_prefix_context,
                    EntityStyle::unnamed(show_argument_types).extra(name, Some(number)),
                );
            }
            Kind::Initializer => {
                return self.print_entity(
                    node,
                    as_prefix_context,
                    EntityStyle::unnamed(NoType).extra("variable initialization expression", None),
                );
            }
            Kind::PropertyWrapperBackingInitializer => {
                return self.print_entity(
                    node,
                    as_prefix_context,
                    EntityStyle::unnamed(NoType).extra("property wrapper backing initializer", None),
                );
            }
            Kind::PropertyWrapperInitFromProjectedValue => {
                return self.print_entity(
                    node,
                    as_prefix_context,
                    EntityStyle::unnamed(NoType).extra("property wrapper init from projected value", None),
                );
            }
            Kind::DefaultArgumentInitializer => {
                let number = index(child(node, 1)?)?;

                return self.print_entity(
                    node,
                    as_prefix_context,
                    EntityStyle::unnamed(NoType).extra("default argument ", Some(number)),
                );
            }
            Kind::Allocator => {
                let name = if is_class_type(child(node, 0)?) {
                    "__allocating_init"
                } else {
                    "init"
                };

                return self.print_entity(node, as_prefix_context, EntityStyle::unnamed(FunctionStyle).extra(name, None));
            }
            Kind::Constructor => {
                let mut style = EntityStyle::unnamed(FunctionStyle).extra("init", None);

                style.has_name = node.num_children() > 2;

                return self.print_entity(node, as_prefix_context, style);
            }
            Kind::Destructor => {
                return self.print_entity(node, as_prefix_context, EntityStyle::unnamed(NoType).extra("deinit", None));
            }
            Kind::Deallocator => {
                let name = if is_class_type(child(node, 0)?) {
                    "__deallocating_deinit"
                } else {
                    "deinit"
                };

                return self.print_entity(node, as_prefix_context, EntityStyle::unnamed(NoType).extra(name, None));
            }
            Kind::IVarInitializer => {
                return self.print_entity(
                    node,
                    as_prefix_context,
                    EntityStyle::unnamed(NoType).extra("__ivar_initializer", None),
                );
            }
            Kind::IVarDestroyer => {
                return self.print_entity(
                    node,
                    as_prefix_context,
                    EntityStyle::unnamed(NoType).extra("__ivar_destroyer", None),
                );
            }
            kind if accessor_name(kind).is_some() => {
                let name = accessor_name(kind).unwrap_or_default();

                return self.print_abstract_storage(child(node, 0)?, as_prefix_context, name);
            }
            Kind::Static => self.print_prefixed("static ", node)?,
            Kind::Extension => self.print_extension(node)?,
            Kind::AnonymousContext => {
                if self.flag(DemangleFlags::QUALIFY_ENTITIES) && self.flag(DemangleFlags::DISPLAY_EXTENSION_CONTEXTS) {
                    self.print(child(node, 1)?)?;
                    self.write(".(unknown context at ");
                    self.print(child(node, 0)?)?;
                    self.write_char(')');

                    if let Some(arguments) = node.child(2).filter(|arguments| arguments.num_children() != 0) {
                        self.write_char('<');
                        self.print(arguments)?;
                        self.write_char('>');
                    }
                }
            }
            Kind::Module => {
                if self.flag(DemangleFlags::DISPLAY_MODULE_NAMES) {
                    self.write(text(node)?);
                }
            }
            Kind::Identifier | Kind::ClangType | Kind::BuiltinTypeName | Kind::MetatypeRepresentation => {
                self.write(text(node)?);
            }
            Kind::LocalDeclName => {
                self.print(child(node, 1)?)?;

                if self.flag(DemangleFlags::DISPLAY_LOCAL_NAME_CONTEXTS) {
                    self.write(" #");
                    self.write_number(index(child(node, 0)?)?.saturating_add(1))?;
                }
            }
            Kind::PrivateDeclName => self.print_private_decl_name(node)?,
            Kind::RelatedEntityDeclName => {
                self.write("related decl '");
                self.write(text(child(node, 0)?)?);
                self.write("' for ");
                self.print(child(node, 1)?)?;
            }
            Kind::InfixOperator => self.print_operator(node, " infix")?,
            Kind::PrefixOperator => self.print_operator(node, " prefix")?,
            Kind::PostfixOperator => self.print_operator(node, " postfix")?,
            Kind::Index | Kind::Number | Kind::SpecializationPassID => self.write_number(index(node)?)?,
            Kind::UnknownIndex => self.write("unknown index"),

            // Types.
            Kind::FunctionType
            | Kind::UncurriedFunctionType
            | Kind::NoEscapeFunctionType
            | Kind::AutoClosureType
            | Kind::EscapingAutoClosureType
            | Kind::ThinFunctionType
            | Kind::CFunctionPointer
            | Kind::ObjCBlock
            | Kind::EscapingObjCBlock => self.print_function_type(None, node)?,
            Kind::ArgumentTuple => {
                self.print_function_parameters(None, node, self.flag(DemangleFlags::SHOW_FUNCTION_ARGUMENT_TYPES))?;
            }
            Kind::Tuple => {
                self.write_char('(');
                self.print_children(node, ", ")?;
                self.write_char(')');
            }
            Kind::TupleElement => {
                if let Some(label) = node.child_of_kind(Kind::TupleElementName) {
                    self.write(text(label)?);
                    self.write(": ");
                }

                let ty = node
                    .child_of_kind(Kind::Type)
                    .ok_or_else(|| missing_child(node, node.num_children()))?;

                self.print(ty)?;

                if node.child_of_kind(Kind::VariadicMarker).is_some() {
                    self.write("...");
                }
            }
            Kind::TupleElementName => {
                self.write(text(node)?);
                self.write(": ");
            }
            Kind::ReturnType => {
                self.write(" -> ");

                match node.payload() {
                    Payload::Text(return_type) if node.num_children() == 0 => self.write(return_type),
                    _ => self.print_children(node, "")?,
                }
            }
            Kind::Weak => self.print_prefixed("weak ", node)?,
            Kind::Unowned => self.print_prefixed("unowned ", node)?,
            Kind::Unmanaged => self.print_prefixed("unowned(unsafe) ", node)?,
            Kind::InOut => self.print_prefixed("inout ", node)?,
            Kind::Isolated => self.print_prefixed("isolated ", node)?,
            Kind::Shared => self.print_prefixed("__shared ", node)?,
            Kind::Owned => self.print_prefixed("__owned ", node)?,
            Kind::NoDerivative => self.print_prefixed("@noDerivative ", node)?,
            Kind::SILBoxType => self.print_prefixed("@box ", node)?,
            Kind::BoundGenericClass
            | Kind::BoundGenericStructure
            | Kind::BoundGenericEnum
            | Kind::BoundGenericProtocol
            | Kind::BoundGenericOtherNominalType
            | Kind::BoundGenericTypeAlias => self.print_bound_generic(node)?,
            Kind::DynamicSelf => self.write("Self"),
            Kind::ErrorType => self.write("<ERROR TYPE>"),
            Kind::Metatype => self.print_metatype(node)?,
            Kind::ExistentialMetatype => {
                let mut instance = 0;

                if node.num_children() == 2 {
                    self.print(child(node, 0)?)?;
                    self.write_char(' ');
                    instance = 1;
                }

                self.print(child(node, instance)?)?;
                self.write(".Type");
            }
            Kind::AssociatedTypeRef => {
                if !self.flag(DemangleFlags::SHORTEN_ARCHETYPE) {
                    self.print(child(node, 0)?)?;
                    self.write_char('.');
                }

                self.write(text(child(node, 1)?)?);
            }
            Kind::ProtocolList => self.print_protocol_list(node)?,
            Kind::ProtocolListWithClass => {
                self.print(child(node, 1)?)?;
                self.write(" & ");
                self.print_children(child(child(node, 0)?, 0)?, " & ")?;
            }
            Kind::ProtocolListWithAnyObject => {
                let protocols = child(child(node, 0)?, 0)?;

                if protocols.num_children() != 0 {
                    self.print_children(protocols, " & ")?;
                    self.write(" & ");
                }

                if self.flag(DemangleFlags::QUALIFY_ENTITIES) && self.flag(DemangleFlags::DISPLAY_STDLIB_MODULE) {
                    self.write(STDLIB_MODULE);
                    self.write_char('.');
                }

                self.write("AnyObject");
            }
            Kind::AssociatedType | Kind::LabelList => {}
            Kind::SugaredOptional => {
                self.print_with_parens(child(node, 0)?)?;
                self.write_char('?');
            }
            Kind::SugaredArray => {
                self.write_char('[');
                self.print_first_child(node)?;
                self.write_char(']');
            }
            Kind::SugaredDictionary => {
                self.write_char('[');
                self.print(child(node, 0)?)?;
                self.write(" : ");
                self.print(child(node, 1)?)?;
                self.write_char(']');
            }
            Kind::SugaredParen => {
                self.write_char('(');
                self.print_first_child(node)?;
                self.write_char(')');
            }
            Kind::OpaqueReturnType => self.write("some"),
            Kind::OpaqueReturnTypeOf => {
                self.write("<<opaque return type of ");
                self.print_children(node, "")?;
                self.write(">>");
            }
            Kind::OpaqueType => {
                self.print(child(node, 0)?)?;
                self.write_char('.');
                self.print(child(node, 1)?)?;
            }
            Kind::SILBoxTypeWithLayout => self.print_sil_box_type_with_layout(node)?,
            Kind::SILBoxLayout => {
                self.write_char('{');

                for (i, field) in node.children().iter().enumerate() {
                    if i != 0 {
                        self.write_char(',');
                    }

                    self.write_char(' ');
                    self.print(field)?;
                }

                self.write(" }");
            }
            Kind::SILBoxImmutableField => self.print_prefixed("let ", node)?,
            Kind::SILBoxMutableField => self.print_prefixed("var ", node)?,
            Kind::TypeSymbolicReference => self.print_symbolic_reference("type", node)?,
            Kind::ProtocolSymbolicReference => self.print_symbolic_reference("protocol", node)?,
            Kind::OpaqueTypeDescriptorSymbolicReference => self.print_symbolic_reference("opaque type", node)?,

            // Function type annotations.
            Kind::ConcurrentFunctionType => self.write("@Sendable "),
            Kind::DifferentiableFunctionType => {
                let Payload::Differentiability(kind) = node.payload() else {
                    return Err(PrintingError::InvalidPayload { kind: node.kind() });
                };

                self.write(differentiable_attribute(*kind)?);
                self.write_char(' ');
            }
            Kind::GlobalActorFunctionType => {
                if let Some(actor) = node.first_child() {
                    self.write_char('@');
                    self.print(actor)?;
                    self.write_char(' ');
                }
            }
            Kind::AsyncAnnotation => self.write(" async "),
            Kind::ThrowsAnnotation => self.write(" throws "),
            Kind::EmptyList => self.write(" empty-list "),
            Kind::FirstElementMarker => self.write(" first-element-marker "),
            Kind::VariadicMarker => self.write(" variadic-marker "),

            // Lowered function types.
            Kind::ImplFunctionType => self.print_impl_function_type(node)?,
            Kind::ImplEscaping => self.write("@escaping"),
            Kind::ImplConvention | Kind::ImplFunctionAttribute => self.write(text(node)?),
            Kind::ImplDifferentiability => {
                let Payload::Differentiability(kind) = node.payload() else {
                    return Err(PrintingError::InvalidPayload { kind: node.kind() });
                };

                self.write(differentiable_attribute(*kind)?);
            }
            Kind::ImplParameterResultDifferentiability => {
                let attribute = text(node)?;

                if !attribute.is_empty() {
                    self.write(attribute);
                    self.write_char(' ');
                }
            }
            Kind::ImplFunctionConvention => {
                self.write("@convention(");
                self.write(text(child(node, 0)?)?);

                if let Some(clang_type) = node.child(1) {
                    self.write(", mangledCType: \"");
                    self.print(clang_type)?;
                    self.write_char('"');
                }

                self.write_char(')');
            }
            Kind::ImplParameter | Kind::ImplResult => {
                self.print(child(node, 0)?)?;
                self.write_char(' ');

                if node.num_children() == 3 {
                    self.print(child(node, 1)?)?;
                }

                self.print(child(node, node.num_children() - 1)?)?;
            }
            Kind::ImplErrorResult => {
                self.write("@error ");
                self.print_children(node, " ")?;
            }
            Kind::ImplYield => {
                self.write("@yields ");
                self.print_children(node, " ")?;
            }

            // Generic signatures and requirements.
            Kind::DependentGenericSignature | Kind::DependentPseudogenericSignature => {
                self.print_generic_signature(node)?;
            }
            Kind::DependentGenericConformanceRequirement => {
                self.print(child(node, 0)?)?;
                self.write(": ");
                self.print(child(node, 1)?)?;
            }
            Kind::DependentGenericLayoutRequirement => self.print_layout_requirement(node)?,
            Kind::DependentGenericSameTypeRequirement => {
                self.print(child(node, 0)?)?;
                self.write(" == ");
                self.print(child(node, 1)?)?;
            }
            Kind::DependentGenericParamType => {
                let depth = index(child(node, 0)?)?;
                let position = index(child(node, 1)?)?;

                self.write(&generic_parameter_name(depth, position));
            }
            Kind::DependentGenericType => {
                let dependent_type = child(node, 1)?;

                self.print(child(node, 0)?)?;

                if need_space_before_type(dependent_type) {
                    self.write_char(' ');
                }

                self.print(dependent_type)?;
            }
            Kind::DependentMemberType => {
                self.print(child(node, 0)?)?;
                self.write_char('.');
                self.print(child(node, 1)?)?;
            }
            Kind::DependentAssociatedTypeRef => {
                if let Some(protocol) = node.child(1) {
                    self.print(protocol)?;
                    self.write_char('.');
                }

                self.print(child(node, 0)?)?;
            }
            Kind::AssocTypePath => self.print_children(node, ".")?,

            // Conformances.
            Kind::ProtocolConformance => {
                self.print(child(node, 0)?)?;

                if self.flag(DemangleFlags::DISPLAY_PROTOCOL_CONFORMANCES) {
                    self.write(" : ");
                    self.print(child(node, 1)?)?;
                    self.write(" in ");
                    self.print(child(node, 2)?)?;
                }
            }
            Kind::RetroactiveConformance => {
                self.write("retroactive @ ");
                self.print(child(node, 0)?)?;
                self.print(child(node, 1)?)?;
            }
            Kind::ConcreteProtocolConformance => {
                self.write("concrete protocol conformance ");
                self.print_children(node, "")?;
            }
            Kind::DependentAssociatedConformance => {
                self.write("dependent associated conformance ");
                self.print_children(node, "")?;
            }
            Kind::DependentProtocolConformanceAssociated => {
                self.print_dependent_conformance("dependent associated protocol conformance ", node)?;
            }
            Kind::DependentProtocolConformanceInherited => {
                self.print_dependent_conformance("dependent inherited protocol conformance ", node)?;
            }
            Kind::DependentProtocolConformanceRoot => {
                self.print_dependent_conformance("dependent root protocol conformance ", node)?;
            }
            Kind::ProtocolConformanceRefInTypeModule => {
                self.write("protocol conformance ref (type's module) ");
                self.print_children(node, "")?;
            }
            Kind::ProtocolConformanceRefInProtocolModule => {
                self.write("protocol conformance ref (protocol's module) ");
                self.print_children(node, "")?;
            }
            Kind::ProtocolConformanceRefInOtherModule => {
                self.write("protocol conformance ref (retroactive) ");
                self.print_children(node, "")?;
            }

            // Function attributes.
            Kind::NonObjCAttribute => self.write("@nonobjc "),
            Kind::ObjCAttribute => self.write("@objc "),
            Kind::DirectMethodReferenceAttribute => self.write("super "),
            Kind::DynamicAttribute => self.write("dynamic "),
            Kind::VTableAttribute => self.write("override "),
            Kind::IsSerialized => self.write("serialized"),
            Kind::MergedFunction => {
                if !self.flag(DemangleFlags::SHORTEN_THUNK) {
                    self.write("merged ");
                }
            }
            Kind::DynamicallyReplaceableFunctionKey => self.write_unless_shortened("dynamically replaceable key for "),
            Kind::DynamicallyReplaceableFunctionImpl => {
                self.write_unless_shortened("dynamically replaceable thunk for ");
            }
            Kind::DynamicallyReplaceableFunctionVar => {
                self.write_unless_shortened("dynamically replaceable variable for ");
            }
            Kind::AsyncFunctionPointer => self.write("async function pointer to "),
            Kind::AsyncAwaitResumePartialFunction | Kind::AsyncSuspendResumePartialFunction => {
                if self.flag(DemangleFlags::SHOW_ASYNC_RESUME_PARTIAL) {
                    self.write_char('(');
                    self.print_first_child(node)?;
                    self.write_char(')');

                    if node.kind() == Kind::AsyncAwaitResumePartialFunction {
                        self.write(" await resume partial function for ");
                    } else {
                        self.write(" suspend resume partial function for ");
                    }
                }
            }
            Kind::PartialApplyForwarder | Kind::PartialApplyObjCForwarder => {
                if self.flag(DemangleFlags::SHORTEN_PARTIAL_APPLY) {
                    self.write("partial apply");
                } else if node.kind() == Kind::PartialApplyForwarder {
                    self.write("partial apply forwarder");
                } else {
                    self.write("partial apply ObjC forwarder");
                }

                if node.num_children() != 0 {
                    self.write(" for ");
                    self.print_children(node, "")?;
                }
            }
            Kind::OutlinedVariable => {
                self.write("outlined variable #");
                self.write_number(index(node)?)?;
                self.write(" of ");
            }
            Kind::OutlinedBridgedMethod => {
                self.write("outlined bridged method (");
                self.write(text(node)?);
                self.write(") of ");
            }
            Kind::GenericSpecialization | Kind::GenericSpecializationInResilienceDomain => {
                self.print_specialization_prefix(node, "generic specialization", "")?;
            }
            Kind::GenericSpecializationPrespecialized => {
                self.print_specialization_prefix(node, "generic pre-specialization", "")?;
            }
            Kind::GenericSpecializationNotReAbstracted => {
                self.print_specialization_prefix(node, "generic not re-abstracted specialization", "")?;
            }
            Kind::InlinedGenericFunction => self.print_specialization_prefix(node, "inlined generic function", "")?,
            Kind::GenericPartialSpecialization => {
                self.print_specialization_prefix(node, "generic partial specialization", "Signature = ")?;
            }
            Kind::GenericPartialSpecializationNotReAbstracted => {
                self.print_specialization_prefix(
                    node,
                    "generic not re-abstracted partial specialization",
                    "Signature = ",
                )?;
            }
            Kind::FunctionSignatureSpecialization => {
                self.print_specialization_prefix(node, "function signature specialization", "")?;
            }
            Kind::GenericSpecializationParam => {
                self.print(child(node, 0)?)?;

                for (i, conformance) in node.children().iter().enumerate().skip(1) {
                    self.write(if i == 1 { " with " } else { " and " });
                    self.print(conformance)?;
                }
            }
            Kind::FunctionSignatureSpecializationParamKind => self.print_specialization_param_kind(node)?,
            Kind::FunctionSignatureSpecializationParamPayload => {
                let payload = text(node)?;

                self.write(&demangle_payload(payload));
            }

            // Thunks.
            Kind::CurryThunk => self.print_prefixed("curry thunk of ", node)?,
            Kind::DispatchThunk => self.print_prefixed("dispatch thunk of ", node)?,
            Kind::MethodDescriptor => self.print_prefixed("method descriptor for ", node)?,
            Kind::MethodLookupFunction => self.print_prefixed("method lookup function for ", node)?,
            Kind::VTableThunk => {
                self.write("vtable thunk for ");
                self.print(child(node, 1)?)?;
                self.write(" dispatching to ");
                self.print(child(node, 0)?)?;
            }
            Kind::ProtocolSelfConformanceWitness => {
                self.print_prefixed("protocol self-conformance witness for ", node)?;
            }
            Kind::ProtocolWitness => {
                self.write("protocol witness for ");
                self.print(child(node, 1)?)?;
                self.write(" in conformance ");
                self.print(child(node, 0)?)?;
            }
            Kind::ReabstractionThunk | Kind::ReabstractionThunkHelper => self.print_reabstraction_thunk(node)?,
            Kind::ReabstractionThunkHelperWithSelf => self.print_reabstraction_thunk_with_self(node)?,
            Kind::ReabstractionThunkHelperWithGlobalActor => {
                self.print(child(node, 0)?)?;
                self.write(" with global actor constraint ");
                self.print(child(node, 1)?)?;
            }
            Kind::KeyPathGetterThunkHelper | Kind::KeyPathSetterThunkHelper => self.print_key_path_accessor(node)?,
            Kind::KeyPathEqualsThunkHelper | Kind::KeyPathHashThunkHelper => self.print_key_path_hash(node)?,
            Kind::AutoDiffFunction | Kind::AutoDiffDerivativeVTableThunk => self.print_auto_diff_function(node)?,
            Kind::AutoDiffSelfReorderingReabstractionThunk => self.print_auto_diff_self_reordering_thunk(node)?,
            Kind::AutoDiffSubsetParametersThunk => self.print_auto_diff_subset_parameters_thunk(node)?,
            Kind::AutoDiffFunctionKind => self.write(auto_diff_function_kind_name(node)?),
            Kind::DifferentiabilityWitness => self.print_differentiability_witness(node)?,
            Kind::IndexSubset => self.print_index_subset(node)?,
            Kind::CoroutineContinuationPrototype => {
                self.print_prefixed("coroutine continuation prototype for ", node)?;
            }
            Kind::ObjCAsyncCompletionHandlerImpl | Kind::PredefinedObjCAsyncCompletionHandlerImpl => {
                self.print_completion_handler_impl(node)?;
            }

            // Outlined value operations.
            Kind::OutlinedCopy => self.print_outlined("outlined copy of ", node)?,
            Kind::OutlinedConsume => self.print_outlined("outlined consume of ", node)?,
            Kind::OutlinedRetain => self.print_outlined("outlined retain of ", node)?,
            Kind::OutlinedRelease => self.print_outlined("outlined release of ", node)?,
            Kind::OutlinedInitializeWithTake => self.print_outlined("outlined initializeWithTake of ", node)?,
            Kind::OutlinedInitializeWithCopy => self.print_outlined("outlined initializeWithCopy of ", node)?,
            Kind::OutlinedAssignWithTake => self.print_outlined("outlined assignWithTake of ", node)?,
            Kind::OutlinedAssignWithCopy => self.print_outlined("outlined assignWithCopy of ", node)?,
            Kind::OutlinedDestroy => self.print_outlined("outlined destroy of ", node)?,

            // Witnesses and witness tables.
            Kind::ValueWitness => {
                let Payload::ValueWitnessKind(kind) = child(node, 0)?.payload() else {
                    return Err(PrintingError::InvalidPayload { kind: node.kind() });
                };

                self.write(kind.name());

                if self.flag(DemangleFlags::SHORTEN_VALUE_WITNESS) {
                    self.write(" for ");
                } else {
                    self.write(" value witness for ");
                }

                self.print(child(node, 1)?)?;
            }
            Kind::ValueWitnessTable => self.print_prefixed("value witness table for ", node)?,
            Kind::FieldOffset => {
                self.print(child(node, 0)?)?;
                self.write("field offset for ");
                self.print(child(node, 1)?)?;
            }
            Kind::Directness => {
                let Payload::Directness(directness) = node.payload() else {
                    return Err(PrintingError::InvalidPayload { kind: node.kind() });
                };

                self.write(directness.name());
                self.write_char(' ');
            }
            Kind::EnumCase => self.print_prefixed("enum case for ", node)?,
            Kind::LazyProtocolWitnessTableAccessor => {
                self.print_type_and_conformance("lazy protocol witness table accessor for type ", node)?;
            }
            Kind::LazyProtocolWitnessTableCacheVariable => {
                self.print_type_and_conformance("lazy protocol witness table cache variable for type ", node)?;
            }
            Kind::ProtocolSelfConformanceWitnessTable => {
                self.print_prefixed("protocol self-conformance witness table for ", node)?;
            }
            Kind::ProtocolWitnessTableAccessor => self.print_prefixed("protocol witness table accessor for ", node)?,
            Kind::ProtocolWitnessTable => self.print_prefixed("protocol witness table for ", node)?,
            Kind::ProtocolWitnessTablePattern => self.print_prefixed("protocol witness table pattern for ", node)?,
            Kind::GenericProtocolWitnessTable => self.print_prefixed("generic protocol witness table for ", node)?,
            Kind::GenericProtocolWitnessTableInstantiationFunction => {
                self.print_prefixed("instantiation function for generic protocol witness table for ", node)?;
            }
            Kind::ResilientProtocolWitnessTable => {
                self.print_prefixed("resilient protocol witness table for ", node)?;
            }
            Kind::AssociatedTypeMetadataAccessor => {
                self.write("associated type metadata accessor for ");
                self.print(child(node, 1)?)?;
                self.write(" in ");
                self.print(child(node, 0)?)?;
            }
            Kind::AssociatedTypeWitnessTableAccessor => {
                self.write("associated type witness table accessor for ");
                self.print(child(node, 1)?)?;
                self.write(" : ");
                self.print(child(node, 2)?)?;
                self.write(" in ");
                self.print(child(node, 0)?)?;
            }
            Kind::BaseWitnessTableAccessor => {
                self.write("base witness table accessor for ");
                self.print(child(node, 1)?)?;
                self.write(" in ");
                self.print(child(node, 0)?)?;
            }
            Kind::AssociatedConformanceDescriptor => {
                self.print_associated_conformance("associated conformance descriptor for ", node)?;
            }
            Kind::DefaultAssociatedConformanceAccessor => {
                self.print_associated_conformance("default associated conformance accessor for ", node)?;
            }
            Kind::BaseConformanceDescriptor => {
                self.write("base conformance descriptor for ");
                self.print(child(node, 0)?)?;
                self.write(": ");
                self.print(child(node, 1)?)?;
            }
            Kind::AssociatedTypeDescriptor => self.print_prefixed("associated type descriptor for ", node)?,
            Kind::DefaultAssociatedTypeMetadataAccessor => {
                self.print_prefixed("default associated type metadata accessor for ", node)?;
            }
            Kind::AssociatedTypeGenericParamRef => {
                self.write("generic parameter reference for associated type ");
                self.print_children(node, "")?;
            }
            Kind::GlobalVariableOnceToken | Kind::GlobalVariableOnceFunction => {
                if node.kind() == Kind::GlobalVariableOnceToken {
                    self.write("one-time initialization token for ");
                } else {
                    self.write("one-time initialization function for ");
                }

                let context = child(node, 0)?;

                if self.should_print_context(context) {
                    self.print(context)?;
                }

                self.print(child(node, 1)?)?;
            }
            Kind::GlobalVariableOnceDeclList => {
                if node.num_children() == 1 {
                    self.print_first_child(node)?;
                } else {
                    self.write_char('(');
                    self.print_children(node, ", ")?;
                    self.write_char(')');
                }
            }

            // Metadata and descriptors.
            kind if descriptor_prefix(kind).is_some() => {
                self.print_prefixed(descriptor_prefix(kind).unwrap_or_default(), node)?;
            }

            // Parameter lists, counts and substitutions are only printed by their parents.
            kind => return Err(PrintingError::UnexpectedKind { kind }),
        }

        Ok(None)
    }

    fn write_unless_shortened(&mut self, text: &str) {
        if !self.flag(DemangleFlags::SHORTEN_THUNK) {
            self.write(text);
        }
    }

    fn write_quoted(&mut self, text: &str) -> PrintResult {
        self.write_char('"');

        for c in text.chars() {
            match c {
                '\\' => self.write("\\\\"),
                '"' => self.write("\\\""),
                '\n' => self.write("\\n"),
                '\r' => self.write("\\r"),
                '\t' => self.write("\\t"),
                '\0' => self.write("\\0"),
                c if c.is_ascii_control() => write!(self.out, "\\x{:02X}", u32::from(c))?,
                c => self.write_char(c),
            }
        }

        self.write_char('"');

        Ok(())
    }

    fn print_operator(&mut self, node: &Node, fixity: &str) -> PrintResult {
        self.write(text(node)?);
        self.write(fixity);

        Ok(())
    }

    fn print_symbolic_reference(&mut self, what: &str, node: &Node) -> PrintResult {
        write!(self.out, "{what} symbolic reference 0x{:X}", index(node)?)?;

        Ok(())
    }

    fn print_outlined(&mut self, prefix: &str, node: &Node) -> PrintResult {
        self.print_prefixed(prefix, node)?;

        if let Some(signature) = node.child(1) {
            self.print(signature)?;
        }

        Ok(())
    }

    fn print_type_and_conformance(&mut self, prefix: &str, node: &Node) -> PrintResult {
        self.print_prefixed(prefix, node)?;
        self.write(" and conformance ");
        self.print(child(node, 1)?)
    }

    fn print_associated_conformance(&mut self, prefix: &str, node: &Node) -> PrintResult {
        self.print_prefixed(prefix, node)?;
        self.write_char('.');
        self.print(child(node, 1)?)?;
        self.write(": ");
        self.print(child(node, 2)?)
    }

    fn print_dependent_conformance(&mut self, prefix: &str, node: &Node) -> PrintResult {
        self.write(prefix);

        if let Some(number) = child(node, 2)?.index() {
            self.write_char('#');
            self.write_number(number)?;
            self.write_char(' ');
        }

        self.print(child(node, 0)?)?;
        self.print(child(node, 1)?)
    }

    fn print_completion_handler_impl(&mut self, node: &Node) -> PrintResult {
        if node.kind() == Kind::PredefinedObjCAsyncCompletionHandlerImpl {
            self.write("predefined ");
        }

        self.write("@objc completion handler block implementation for ");

        if let Some(signature) = node.child(3) {
            self.print(signature)?;
        }

        self.print(child(node, 0)?)?;
        self.write(" with result type ");
        self.print(child(node, 1)?)?;

        match index(child(node, 2)?)? {
            0 => {}
            1 => self.write(" nonzero on error "),
            2 => self.write(" zero on error "),
            _ => self.write(" <invalid error flag>"),
        }

        Ok(())
    }

    fn print_specialization_param_kind(&mut self, node: &Node) -> PrintResult {
        let Payload::SpecializationParamKind(kind) = node.payload() else {
            return Err(PrintingError::InvalidPayload { kind: node.kind() });
        };

        let options = kind.options();

        if options.is_empty() {
            let base = kind.base().ok_or(PrintingError::InvalidPayload { kind: node.kind() })?;

            self.write(specializations::param_kind_name(base));

            return Ok(());
        }

        let names = [
            (ParamOptions::EXISTENTIAL_TO_GENERIC, "Existential To Protocol Constrained Generic"),
            (ParamOptions::DEAD, "Dead"),
            (ParamOptions::OWNED_TO_GUARANTEED, "Owned To Guaranteed"),
            (ParamOptions::GUARANTEED_TO_OWNED, "Guaranteed To Owned"),
            (ParamOptions::SROA, "Exploded"),
        ];

        let mut first = true;

        for (option, name) in names {
            if options.contains(option) {
                if !first {
                    self.write(" and ");
                }

                self.write(name);
                first = false;
            }
        }

        Ok(())
    }
}

/// Rendering parameters of a declaration.
#[derive(Clone, Copy, Debug)]
struct EntityStyle<'s> {
    type_printing: TypePrinting,
    has_name: bool,
    extra_name: &'s str,
    extra_index: Option<u64>,
    overwrite_name: &'s str,
}

impl<'s> EntityStyle<'s> {
    const fn named(type_printing: TypePrinting) -> Self {
        Self {
            type_printing,
            has_name: true,
            extra_name: "",
            extra_index: None,
            overwrite_name: "",
        }
    }

    const fn unnamed(type_printing: TypePrinting) -> Self {
        Self {
            has_name: false,
            ..Self::named(type_printing)
        }
    }

    const fn extra(mut self, name: &'s str, index: Option<u64>) -> Self {
        self.extra_name = name;
        self.extra_index = index;

        self
    }

    const fn overwrite(mut self, name: &'s str) -> Self {
        self.overwrite_name = name;

        self
    }
}

fn missing_child(node: &Node, index: usize) -> PrintingError {
    PrintingError::MissingChild {
        kind: node.kind(),
        index: u16::try_from(index).unwrap_or(u16::MAX),
    }
}

fn child<'n, 'a>(node: &'n Node<'a>, index: usize) -> PrintResult<&'n Node<'a>> {
    node.child(index)
        .map(Rc::as_ref)
        .ok_or_else(|| missing_child(node, index))
}

fn text<'n>(node: &'n Node<'_>) -> PrintResult<&'n str> {
    node.text().ok_or(PrintingError::InvalidPayload { kind: node.kind() })
}

fn index(node: &Node) -> PrintResult<u64> {
    node.index().ok_or(PrintingError::InvalidPayload { kind: node.kind() })
}

fn is_class_type(node: &Node) -> bool {
    node.kind() == Kind::Class
}

fn differentiable_attribute(kind: MangledDifferentiabilityKind) -> PrintResult<&'static str> {
    Ok(match kind {
        MangledDifferentiabilityKind::Forward => "@differentiable(_forward)",
        MangledDifferentiabilityKind::Reverse => "@differentiable(reverse)",
        MangledDifferentiabilityKind::Linear => "@differentiable(_linear)",
        MangledDifferentiabilityKind::Normal => "@differentiable",
        MangledDifferentiabilityKind::NonDifferentiable => return Err(PrintingError::InvalidDifferentiability),
    })
}

fn auto_diff_function_kind_name(node: &Node) -> PrintResult<&'static str> {
    Ok(match u8::try_from(index(node)?) {
        Ok(b'f') => "forward-mode derivative",
        Ok(b'r') => "reverse-mode derivative",
        Ok(b'd') => "differential",
        Ok(b'p') => "pullback",
        _ => return Err(PrintingError::InvalidPayload { kind: node.kind() }),
    })
}

/// Re-renders a mangled name embedded in a specialization payload, or returns it unchanged.
fn demangle_payload(payload: &str) -> String {
    crate::decode(payload.as_bytes())
        .and_then(|tree| render(&tree, &DemangleOptions::full()).ok())
        .unwrap_or_else(|| payload.to_owned())
}

/// Names of accessors, which print through their storage declaration.
const fn accessor_name(kind: Kind) -> Option<&'static str> {
    Some(match kind {
        Kind::OwningAddressor => "owningAddressor",
        Kind::OwningMutableAddressor => "owningMutableAddressor",
        Kind::NativeOwningAddressor => "nativeOwningAddressor",
        Kind::NativeOwningMutableAddressor => "nativeOwningMutableAddressor",
        Kind::NativePinningAddressor => "nativePinningAddressor",
        Kind::NativePinningMutableAddressor => "nativePinningMutableAddressor",
        Kind::UnsafeAddressor => "unsafeAddressor",
        Kind::UnsafeMutableAddressor => "unsafeMutableAddressor",
        Kind::GlobalGetter | Kind::Getter => "getter",
        Kind::Setter => "setter",
        Kind::MaterializeForSet => "materializeForSet",
        Kind::WillSet => "willset",
        Kind::DidSet => "didset",
        Kind::ReadAccessor => "read",
        Kind::ModifyAccessor => "modify",
        _ => return None,
    })
}

/// Kinds that print as a fixed description followed by their only child.
const fn descriptor_prefix(kind: Kind) -> Option<&'static str> {
    Some(match kind {
        Kind::ObjCMetadataUpdateFunction => "ObjC metadata update function for ",
        Kind::ObjCResilientClassStub => "ObjC resilient class stub for ",
        Kind::FullObjCResilientClassStub => "full ObjC resilient class stub for ",
        Kind::GenericTypeMetadataPattern => "generic type metadata pattern for ",
        Kind::Metaclass => "metaclass for ",
        Kind::ProtocolSelfConformanceDescriptor => "protocol self-conformance descriptor for ",
        Kind::ProtocolConformanceDescriptor => "protocol conformance descriptor for ",
        Kind::ProtocolDescriptor => "protocol descriptor for ",
        Kind::ProtocolRequirementsBaseDescriptor => "protocol requirements base descriptor for ",
        Kind::FullTypeMetadata => "full type metadata for ",
        Kind::TypeMetadata => "type metadata for ",
        Kind::TypeMetadataAccessFunction => "type metadata accessor for ",
        Kind::TypeMetadataInstantiationCache => "type metadata instantiation cache for ",
        Kind::TypeMetadataInstantiationFunction => "type metadata instantiation function for ",
        Kind::TypeMetadataSingletonInitializationCache => "type metadata singleton initialization cache for ",
        Kind::TypeMetadataCompletionFunction => "type metadata completion function for ",
        Kind::TypeMetadataDemanglingCache => "demangling cache variable for type metadata for ",
        Kind::TypeMetadataLazyCache => "lazy cache variable for type metadata for ",
        Kind::ClassMetadataBaseOffset => "class metadata base offset for ",
        Kind::PropertyDescriptor => "property descriptor for ",
        Kind::NominalTypeDescriptor => "nominal type descriptor for ",
        Kind::OpaqueTypeDescriptor => "opaque type descriptor for ",
        Kind::OpaqueTypeDescriptorAccessor => "opaque type descriptor accessor for ",
        Kind::OpaqueTypeDescriptorAccessorImpl => "opaque type descriptor accessor impl for ",
        Kind::OpaqueTypeDescriptorAccessorKey => "opaque type descriptor accessor key for ",
        Kind::OpaqueTypeDescriptorAccessorVar => "opaque type descriptor accessor var for ",
        Kind::ReflectionMetadataBuiltinDescriptor => "reflection metadata builtin descriptor ",
        Kind::ReflectionMetadataFieldDescriptor => "reflection metadata field descriptor ",
        Kind::ReflectionMetadataAssocTypeDescriptor => "reflection metadata associated type descriptor ",
        Kind::ReflectionMetadataSuperclassDescriptor => "reflection metadata superclass descriptor ",
        Kind::ModuleDescriptor => "module descriptor ",
        Kind::AnonymousDescriptor => "anonymous descriptor ",
        Kind::ExtensionDescriptor => "extension descriptor ",
        Kind::CanonicalSpecializedGenericMetaclass => "specialized generic metaclass for ",
        Kind::CanonicalSpecializedGenericTypeMetadataAccessFunction => {
            "canonical specialized generic type metadata accessor for "
        }
        Kind::MetadataInstantiationCache => "metadata instantiation cache for ",
        Kind::NoncanonicalSpecializedGenericTypeMetadata => "noncanonical specialized generic type metadata for ",
        Kind::NoncanonicalSpecializedGenericTypeMetadataCache => {
            "cache variable for noncanonical specialized generic type metadata for "
        }
        Kind::CanonicalPrespecializedGenericTypeCachingOnceToken => {
            "flag for loading of canonical specialized generic type metadata for "
        }
        _ => return None,
    })
}

/// Synthesizes the name of the generic parameter at `depth` and `index`: `A`, `B`, ... then `A1`, `B1`, ... one
/// level deeper.
#[must_use]
pub fn generic_parameter_name(depth: u64, index: u64) -> String {
    let mut name = String::new();
    let mut remaining = index;

    loop {
        name.push(char::from(b'A' + u8::try_from(remaining % 26).unwrap_or_default()));
        remaining /= 26;

        if remaining == 0 {
            break;
        }
    }

    if depth != 0 {
        name.push_str(&depth.to_string());
    }

    name
}

fn need_space_before_type(node: &Node) -> bool {
    match node.kind() {
        Kind::Type => node.first_child().is_none_or(|child| need_space_before_type(child)),
        Kind::FunctionType | Kind::NoEscapeFunctionType | Kind::UncurriedFunctionType | Kind::DependentGenericType => {
            false
        }
        _ => true,
    }
}

fn is_module_named(node: &Node, name: &str) -> bool {
    node.kind() == Kind::Module && node.text() == Some(name)
}

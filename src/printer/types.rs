use super::{
    NodePrinter, PrintResult, PrintingError, STDLIB_MODULE, child, differentiable_attribute, generic_parameter_name,
    index, is_module_named, missing_child, text,
};
use crate::kinds::MangledDifferentiabilityKind;
use crate::node::{Kind, Node, Payload};
use crate::options::DemangleFlags;

/// The generic parameter list of a signature is cut off after this many parameters at one depth.
const MAX_PRINTED_GENERIC_PARAMETERS: u64 = 128;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Sugar {
    Optional,
    ImplicitlyUnwrappedOptional,
    Array,
    Dictionary,
}

impl NodePrinter<'_> {
    pub(super) fn print_function_type(&mut self, labels: Option<&Node>, function_type: &Node) -> PrintResult {
        let num_children = function_type.num_children();

        if num_children < 2 {
            return Err(missing_child(function_type, num_children));
        }

        match function_type.kind() {
            Kind::AutoClosureType | Kind::EscapingAutoClosureType => self.write("@autoclosure "),
            Kind::ThinFunctionType => self.write("@convention(thin) "),
            Kind::CFunctionPointer => self.print_convention_with_clang_type("c", function_type)?,
            Kind::EscapingObjCBlock => {
                self.write("@escaping ");
                self.print_convention_with_clang_type("block", function_type)?;
            }
            Kind::ObjCBlock => self.print_convention_with_clang_type("block", function_type)?,
            _ => {}
        }

        let arguments_index = num_children - 2;
        let annotations = &function_type.children()[..arguments_index];

        let mut differentiability = None;
        let mut is_sendable = false;
        let mut is_async = false;
        let mut is_throwing = false;

        for annotation in annotations {
            match annotation.kind() {
                Kind::GlobalActorFunctionType => self.print(annotation)?,
                Kind::DifferentiableFunctionType => {
                    let Payload::Differentiability(kind) = annotation.payload() else {
                        return Err(PrintingError::InvalidPayload { kind: annotation.kind() });
                    };

                    differentiability = Some(*kind);
                }
                Kind::ConcurrentFunctionType => is_sendable = true,
                Kind::AsyncAnnotation => is_async = true,
                Kind::ThrowsAnnotation => is_throwing = true,
                _ => {}
            }
        }

        if let Some(kind) = differentiability
            && kind != MangledDifferentiabilityKind::NonDifferentiable
        {
            self.write(differentiable_attribute(kind)?);
            self.write_char(' ');
        }

        if is_sendable {
            self.write("@Sendable ");
        }

        let show_types = self.flag(DemangleFlags::SHOW_FUNCTION_ARGUMENT_TYPES);

        self.print_function_parameters(labels, child(function_type, arguments_index)?, show_types)?;

        if show_types {
            if is_async {
                self.write(" async");
            }

            if is_throwing {
                self.write(" throws");
            }

            self.print(child(function_type, arguments_index + 1)?)?;
        }

        Ok(())
    }

    fn print_convention_with_clang_type(&mut self, convention: &str, function_type: &Node) -> PrintResult {
        self.write("@convention(");
        self.write(convention);

        if let Some(clang_type) = function_type.first_child().filter(|first| first.kind() == Kind::ClangType) {
            self.write(", mangledCType: \"");
            self.print(clang_type)?;
            self.write_char('"');
        }

        self.write(") ");

        Ok(())
    }

    pub(super) fn print_function_parameters(
        &mut self,
        labels: Option<&Node>,
        arguments: &Node,
        show_types: bool,
    ) -> PrintResult {
        if arguments.kind() != Kind::ArgumentTuple {
            return Err(PrintingError::UnexpectedKind { kind: arguments.kind() });
        }

        let parameters = child(child(arguments, 0)?, 0)?;
        let labels = labels.filter(|labels| labels.num_children() != 0);

        if parameters.kind() != Kind::Tuple {
            let label = labels
                .and_then(|labels| labels.first_child())
                .and_then(|label| label.text());

            self.write_char('(');

            if show_types {
                if let Some(label) = label {
                    self.write(label);
                    self.write(": ");
                }

                self.print(parameters)?;
            } else {
                self.write(label.unwrap_or("_"));
                self.write_char(':');
            }

            self.write_char(')');

            return Ok(());
        }

        self.write_char('(');

        for (i, parameter) in parameters.children().iter().enumerate() {
            if i != 0 && show_types {
                self.write(", ");
            }

            if let Some(labels) = labels {
                let label = child(labels, i)?;

                if label.kind() == Kind::Identifier {
                    self.write(text(label)?);
                } else {
                    self.write_char('_');
                }

                self.write_char(':');

                if show_types {
                    self.write_char(' ');
                }
            } else if !show_types {
                if let Some(name) = parameter.child_of_kind(Kind::TupleElementName) {
                    self.write(text(name)?);
                    self.write_char(':');
                } else {
                    self.write("_:");
                }
            }

            if show_types {
                self.print(parameter)?;
            }
        }

        self.write_char(')');

        Ok(())
    }

    pub(super) fn print_bound_generic(&mut self, node: &Node) -> PrintResult {
        if node.num_children() < 2 {
            return Ok(());
        }

        if node.num_children() != 2
            || !self.flag(DemangleFlags::SYNTHESIZE_SUGAR_ON_TYPES)
            || node.kind() == Kind::BoundGenericClass
        {
            return self.print_bound_generic_without_sugar(node);
        }

        if node.kind() == Kind::BoundGenericProtocol {
            self.print_children(child(node, 1)?, "")?;
            self.write(" as ");

            return self.print(child(node, 0)?);
        }

        let arguments = child(node, 1)?;

        match find_sugar(node) {
            None => self.print_bound_generic_without_sugar(node)?,
            Some(sugar @ (Sugar::Optional | Sugar::ImplicitlyUnwrappedOptional)) => {
                self.print_with_parens(child(arguments, 0)?)?;
                self.write_char(if sugar == Sugar::Optional { '?' } else { '!' });
            }
            Some(Sugar::Array) => {
                self.write_char('[');
                self.print(child(arguments, 0)?)?;
                self.write_char(']');
            }
            Some(Sugar::Dictionary) => {
                self.write_char('[');
                self.print(child(arguments, 0)?)?;
                self.write(" : ");
                self.print(child(arguments, 1)?)?;
                self.write_char(']');
            }
        }

        Ok(())
    }

    fn print_bound_generic_without_sugar(&mut self, node: &Node) -> PrintResult {
        self.print(child(node, 0)?)?;
        self.write_char('<');
        self.print_children(child(node, 1)?, ", ")?;
        self.write_char('>');

        Ok(())
    }

    pub(super) fn print_with_parens(&mut self, ty: &Node) -> PrintResult {
        let needs_parens = !is_simple_type(ty);

        if needs_parens {
            self.write_char('(');
        }

        self.print(ty)?;

        if needs_parens {
            self.write_char(')');
        }

        Ok(())
    }

    pub(super) fn print_metatype(&mut self, node: &Node) -> PrintResult {
        let mut instance = 0;

        if node.num_children() == 2 {
            self.print(child(node, 0)?)?;
            self.write_char(' ');
            instance = 1;
        }

        let ty = child(child(node, instance)?, 0)?;

        self.print_with_parens(ty)?;

        if is_existential_type(ty) {
            self.write(".Protocol");
        } else {
            self.write(".Type");
        }

        Ok(())
    }

    pub(super) fn print_protocol_list(&mut self, node: &Node) -> PrintResult {
        let protocols = child(node, 0)?;

        if protocols.num_children() == 0 {
            self.write("Any");

            Ok(())
        } else {
            self.print_children(protocols, " & ")
        }
    }

    pub(super) fn print_impl_function_type(&mut self, function_type: &Node) -> PrintResult {
        #[derive(Clone, Copy, Eq, Ord, PartialEq, PartialOrd)]
        enum State {
            Attributes,
            Inputs,
            Results,
        }

        let mut pattern_substitutions = None;
        let mut invocation_substitutions = None;
        let mut state = State::Attributes;

        for item in function_type.children() {
            let target = match item.kind() {
                Kind::ImplParameter => State::Inputs,
                Kind::ImplResult | Kind::ImplYield | Kind::ImplErrorResult => State::Results,
                Kind::ImplPatternSubstitutions => {
                    pattern_substitutions = Some(item.as_ref());

                    continue;
                }
                Kind::ImplInvocationSubstitutions => {
                    invocation_substitutions = Some(item.as_ref());

                    continue;
                }
                _ => {
                    if state != State::Attributes {
                        return Err(PrintingError::UnexpectedKind { kind: item.kind() });
                    }

                    self.print(item)?;
                    self.write_char(' ');

                    continue;
                }
            };

            if target < state {
                return Err(PrintingError::UnexpectedKind { kind: item.kind() });
            }

            if state == target {
                self.write(", ");
            } else {
                let leaving_attributes = state == State::Attributes;

                self.advance_impl_function_state(leaving_attributes, target == State::Results, pattern_substitutions)?;
                state = target;
            }

            self.print(item)?;
        }

        if state != State::Results {
            self.advance_impl_function_state(state == State::Attributes, true, pattern_substitutions)?;
        }

        self.write_char(')');

        if let Some(substitutions) = pattern_substitutions {
            self.write(" for <");
            self.print_children(child(substitutions, 1)?, ", ")?;
            self.write_char('>');
        }

        if let Some(substitutions) = invocation_substitutions {
            self.write(" for <");
            self.print_children(child(substitutions, 0)?, ", ")?;
            self.write_char('>');
        }

        Ok(())
    }

    /// Writes the separators between the attribute, parameter and result sections of a lowered function type.
    fn advance_impl_function_state(
        &mut self,
        leaving_attributes: bool,
        entering_results: bool,
        pattern_substitutions: Option<&Node>,
    ) -> PrintResult {
        if leaving_attributes {
            if let Some(substitutions) = pattern_substitutions {
                self.write("@substituted ");
                self.print(child(substitutions, 0)?)?;
                self.write_char(' ');
            }

            self.write_char('(');
        }

        if entering_results {
            self.write(") -> (");
        }

        Ok(())
    }

    pub(super) fn print_generic_signature(&mut self, signature: &Node) -> PrintResult {
        let children = signature.children();
        let num_depths = children
            .iter()
            .take_while(|child| child.kind() == Kind::DependentGenericParamCount)
            .count();

        self.write_char('<');

        for (depth, count) in (0_u64..).zip(&children[..num_depths]) {
            if depth != 0 {
                self.write("><");
            }

            for position in 0..index(count)? {
                if position != 0 {
                    self.write(", ");
                }

                if position >= MAX_PRINTED_GENERIC_PARAMETERS {
                    self.write("...");

                    break;
                }

                self.write(&generic_parameter_name(depth, position));
            }
        }

        let requirements = &children[num_depths..];

        if !requirements.is_empty() && self.flag(DemangleFlags::DISPLAY_WHERE_CLAUSES) {
            self.write(" where ");
            self.print_sequence(requirements, ", ")?;
        }

        self.write_char('>');

        Ok(())
    }

    pub(super) fn print_layout_requirement(&mut self, requirement: &Node) -> PrintResult {
        self.print(child(requirement, 0)?)?;
        self.write(": ");

        let layout = child(requirement, 1)?;
        let name = match text(layout)? {
            "U" => "_UnknownLayout",
            "R" => "_RefCountedObject",
            "N" => "_NativeRefCountedObject",
            "C" => "AnyObject",
            "D" => "_NativeClass",
            "T" | "E" | "e" => "_Trivial",
            "M" | "m" => "_TrivialAtMost",
            _ => return Err(PrintingError::InvalidPayload { kind: layout.kind() }),
        };

        self.write(name);

        if let Some(size) = requirement.child(2) {
            self.write_char('(');
            self.print(size)?;

            if let Some(alignment) = requirement.child(3) {
                self.write(", ");
                self.print(alignment)?;
            }

            self.write_char(')');
        }

        Ok(())
    }

    pub(super) fn print_sil_box_type_with_layout(&mut self, node: &Node) -> PrintResult {
        let layout = child(node, 0)?;
        let mut arguments = None;

        if let Some(signature) = node.child(1) {
            self.print(signature)?;
            self.write_char(' ');
            arguments = node.child(2);
        }

        self.print(layout)?;

        if let Some(arguments) = arguments {
            self.write(" <");
            self.print_children(arguments, ", ")?;
            self.write_char('>');
        }

        Ok(())
    }
}

fn find_sugar(node: &Node) -> Option<Sugar> {
    if node.kind() == Kind::Type && node.num_children() == 1 {
        return find_sugar(node.first_child()?);
    }

    if node.num_children() != 2 {
        return None;
    }

    let unbound = node.first_child()?.first_child()?;
    let num_arguments = node.child(1)?.num_children();

    if !unbound.first_child().is_some_and(|module| is_module_named(module, STDLIB_MODULE)) {
        return None;
    }

    let name = unbound.child(1)?;

    if name.kind() != Kind::Identifier {
        return None;
    }

    match (node.kind(), name.text()?, num_arguments) {
        (Kind::BoundGenericEnum, "Optional", 1) => Some(Sugar::Optional),
        (Kind::BoundGenericEnum, "ImplicitlyUnwrappedOptional", 1) => Some(Sugar::ImplicitlyUnwrappedOptional),
        (Kind::BoundGenericStructure, "Array", 1) => Some(Sugar::Array),
        (Kind::BoundGenericStructure, "Dictionary", 2) => Some(Sugar::Dictionary),
        _ => None,
    }
}

/// Whether a type prints without needing parentheses around it when followed by `?`, `!` or `.Type`.
pub(super) fn is_simple_type(node: &Node) -> bool {
    match node.kind() {
        Kind::Type => node.first_child().is_some_and(|child| is_simple_type(child)),
        Kind::ProtocolList => node.first_child().is_some_and(|protocols| protocols.num_children() <= 1),
        Kind::ProtocolListWithAnyObject => node
            .first_child()
            .and_then(|list| list.first_child())
            .is_some_and(|protocols| protocols.num_children() == 0),
        kind => kind.is_simple_type(),
    }
}

fn is_existential_type(node: &Node) -> bool {
    matches!(
        node.kind(),
        Kind::ExistentialMetatype | Kind::ProtocolList | Kind::ProtocolListWithClass | Kind::ProtocolListWithAnyObject
    )
}

//! Decoder for the current mangling scheme.
//!
//! The decoder reads one operator at a time and keeps the nodes built so far on a stack. Most operators pop their
//! operands off that stack, so the mangling is effectively in postfix order.

use crate::kinds::{Directness, StandardType, StandardTypeKind, SymbolicReferenceKind};
use crate::node::{self, Kind, Node};
use crate::scheme;
use std::borrow::Cow;
use std::rc::Rc;
use token_cursor::ByteCursor;

mod entities;
mod specializations;
#[cfg(test)]
mod tests;
mod types;

/// Resolves an embedded symbolic reference. The last argument is the input starting at the four offset bytes.
pub type SymbolicReferenceResolver<'a, 'r> =
    dyn FnMut(SymbolicReferenceKind, Directness, i32, &'a [u8]) -> Option<Rc<Node<'a>>> + 'r;

const MAX_NUM_WORDS: usize = 26;

/// Symbols that produce a deeper tree are rejected, so that no later tree walk can exhaust the stack.
pub const MAX_NODE_HEIGHT: usize = 256;
const MAX_REPEAT_COUNT: u64 = 2048;

const OPERATOR_CHARS: &[u8; 26] = b"& @/= >    <*!|+?%-~   ^ .";

/// Decoder state for a single symbol.
pub struct Demangler<'a, 'r> {
    cursor: ByteCursor<'a>,
    node_stack: Vec<Rc<Node<'a>>>,
    substitutions: Vec<Rc<Node<'a>>>,
    words: Vec<&'a str>,
    is_old_function_type_mangling: bool,
    resolver: Option<&'r mut SymbolicReferenceResolver<'a, 'r>>,
}

impl<'a, 'r> Demangler<'a, 'r> {
    /// Creates a decoder that refuses symbolic references.
    #[must_use]
    pub fn new(mangled: &'a [u8]) -> Self {
        Self {
            cursor: ByteCursor::new(mangled),
            node_stack: Vec::new(),
            substitutions: Vec::new(),
            words: Vec::new(),
            is_old_function_type_mangling: false,
            resolver: None,
        }
    }

    /// Creates a decoder that hands symbolic references to `resolver`.
    #[must_use]
    pub fn with_resolver(mangled: &'a [u8], resolver: &'r mut SymbolicReferenceResolver<'a, 'r>) -> Self {
        Self {
            resolver: Some(resolver),
            ..Self::new(mangled)
        }
    }

    /// Decodes a whole symbol, including its prefix, into a `Global` node.
    pub fn demangle_symbol(mut self) -> Option<Rc<Node<'a>>> {
        if self.cursor.next_if_str("_Tt") {
            return self.demangle_objc_type_name();
        }

        let data = self.cursor.data();
        let prefix_length = scheme::mangling_prefix_length(data);

        if prefix_length == 0 {
            return None;
        }

        self.is_old_function_type_mangling = scheme::is_old_function_type_mangling(data);
        self.cursor.advance(prefix_length);
        self.parse_and_push_nodes()?;

        let mut levels = vec![Node::new(Kind::Global)];

        while let Some(attribute) = self.pop_if(Kind::is_function_attr) {
            if matches!(
                attribute.kind(),
                Kind::PartialApplyForwarder | Kind::PartialApplyObjCForwarder
            ) {
                levels.push(Rc::unwrap_or_clone(attribute));
            } else {
                levels.last_mut()?.add_child(attribute);
            }
        }

        let mut innermost = levels.pop()?;

        for item in self.node_stack.drain(..) {
            if item.kind() == Kind::Type {
                innermost.add_child(Rc::clone(item.first_child()?));
            } else {
                innermost.add_child(item);
            }
        }

        let global = levels.into_iter().rev().fold(innermost, |child, mut level| {
            level.add_child(Rc::new(child));

            level
        });

        (global.num_children() != 0).then(|| Rc::new(global))
    }

    /// Decodes a bare type mangling without a prefix. Unparsed input becomes a `Suffix` node.
    pub fn demangle_type(mut self) -> Option<Rc<Node<'a>>> {
        let parsed = self.parse_and_push_nodes();

        if parsed.is_none() {
            tracing::trace!(position = self.cursor.position(), "type mangling parsed partially");
        }

        self.pop_node()
            .or_else(|| Some(node::text(Kind::Suffix, String::from_utf8_lossy(self.cursor.data()))))
    }

    fn parse_and_push_nodes(&mut self) -> Option<()> {
        while !self.cursor.is_empty() {
            let node = self.demangle_operator()?;

            if node.height() > MAX_NODE_HEIGHT {
                tracing::debug!(
                    position = self.cursor.position(),
                    height = node.height(),
                    "symbol is nested too deeply"
                );

                return None;
            }

            self.push_node(node);
        }

        Some(())
    }

    fn demangle_objc_type_name(&mut self) -> Option<Rc<Node<'a>>> {
        let is_protocol = if self.cursor.next_if(b'C') {
            false
        } else if self.cursor.next_if(b'P') {
            true
        } else {
            return None;
        };

        let module = if self.cursor.next_if(b's') {
            node::text(Kind::Module, "Swift")
        } else {
            Rc::new(self.demangle_identifier()?.with_kind(Kind::Module))
        };

        let name = self.demangle_identifier()?;

        if is_protocol && !self.cursor.next_if(b'_') {
            return None;
        }

        if !self.cursor.is_empty() {
            return None;
        }

        let ty = if is_protocol {
            let protocol = node::ty(node::parent(Kind::Protocol, [module, name]));

            node::ty(node::parent(
                Kind::ProtocolList,
                [node::parent(Kind::TypeList, [protocol])],
            ))
        } else {
            node::ty(node::parent(Kind::Class, [module, name]))
        };

        Some(node::parent(Kind::Global, [node::parent(Kind::TypeMangling, [ty])]))
    }

    // Node stack.

    fn push_node(&mut self, node: Rc<Node<'a>>) {
        self.node_stack.push(node);
    }

    fn pop_node(&mut self) -> Option<Rc<Node<'a>>> {
        self.node_stack.pop()
    }

    fn pop_kind(&mut self, kind: Kind) -> Option<Rc<Node<'a>>> {
        self.pop_if(|candidate| candidate == kind)
    }

    fn pop_if(&mut self, predicate: impl FnOnce(Kind) -> bool) -> Option<Rc<Node<'a>>> {
        if predicate(self.node_stack.last()?.kind()) {
            self.node_stack.pop()
        } else {
            None
        }
    }

    fn pop_type_and_get_child(&mut self) -> Option<Rc<Node<'a>>> {
        let ty = self.pop_kind(Kind::Type)?;

        if ty.num_children() == 1 {
            ty.first_child().cloned()
        } else {
            None
        }
    }

    fn pop_type_and_get_any_generic(&mut self) -> Option<Rc<Node<'a>>> {
        self.pop_type_and_get_child()
            .filter(|child| child.kind().is_any_generic())
    }

    fn pop_module(&mut self) -> Option<Rc<Node<'a>>> {
        if let Some(identifier) = self.pop_kind(Kind::Identifier) {
            return Some(Rc::new(identifier.with_kind(Kind::Module)));
        }

        self.pop_kind(Kind::Module)
    }

    fn pop_context(&mut self) -> Option<Rc<Node<'a>>> {
        if let Some(module) = self.pop_module() {
            return Some(module);
        }

        if let Some(ty) = self.pop_kind(Kind::Type) {
            if ty.num_children() != 1 {
                return None;
            }

            return ty.first_child().filter(|child| child.kind().is_context()).cloned();
        }

        self.pop_if(Kind::is_context)
    }

    /// Pops the elements of a list terminated by `EmptyList` or by a `FirstElementMarker` on its first element.
    fn pop_list(
        &mut self,
        mut pop_element: impl FnMut(&mut Self) -> Option<Rc<Node<'a>>>,
    ) -> Option<Vec<Rc<Node<'a>>>> {
        let mut elements = Vec::new();

        if self.pop_kind(Kind::EmptyList).is_none() {
            loop {
                let is_first = self.pop_kind(Kind::FirstElementMarker).is_some();

                elements.push(pop_element(self)?);

                if is_first {
                    break;
                }
            }

            elements.reverse();
        }

        Some(elements)
    }

    // Substitutions.

    fn add_substitution(&mut self, node: Rc<Node<'a>>) {
        self.substitutions.push(node);
    }

    fn push_multi_substitutions(&mut self, repeat_count: Option<u64>, index: usize) -> Option<Rc<Node<'a>>> {
        let node = Rc::clone(self.substitutions.get(index)?);
        let repeat_count = repeat_count.unwrap_or(0);

        if repeat_count > MAX_REPEAT_COUNT {
            return None;
        }

        for _ in 1..repeat_count {
            self.push_node(Rc::clone(&node));
        }

        Some(node)
    }

    fn demangle_multi_substitutions(&mut self) -> Option<Rc<Node<'a>>> {
        let mut repeat_count = None;

        loop {
            let c = self.cursor.next()?;

            match c {
                b'a'..=b'z' => {
                    let node = self.push_multi_substitutions(repeat_count.take(), usize::from(c - b'a'))?;

                    self.push_node(node);
                }
                b'A'..=b'Z' => return self.push_multi_substitutions(repeat_count, usize::from(c - b'A')),
                b'_' => {
                    let index = match repeat_count {
                        Some(count) => usize::try_from(count).ok()?.checked_add(27)?,
                        None => 26,
                    };

                    return self.substitutions.get(index).cloned();
                }
                _ => {
                    self.cursor.push_back();
                    repeat_count = Some(self.cursor.natural::<u64>()?);
                }
            }
        }
    }

    fn demangle_standard_substitution(&mut self) -> Option<Rc<Node<'a>>> {
        match self.cursor.next()? {
            b'o' => Some(node::text(Kind::Module, "__C")),
            b'C' => Some(node::text(Kind::Module, "__C_Synthesized")),
            b'g' => {
                let wrapped = self.pop_kind(Kind::Type)?;
                let optional = node::ty(node::parent(
                    Kind::BoundGenericEnum,
                    [
                        node::swift_type(Kind::Enum, "Optional"),
                        node::parent(Kind::TypeList, [wrapped]),
                    ],
                ));

                self.add_substitution(Rc::clone(&optional));

                Some(optional)
            }
            _ => {
                self.cursor.push_back();

                let repeat_count = if self.cursor.peek_digit() {
                    self.cursor.natural::<u64>()?
                } else {
                    0
                };

                if repeat_count > MAX_REPEAT_COUNT {
                    return None;
                }

                let standard_type = if self.cursor.next_if(b'c') {
                    StandardType::lookup_concurrency(self.cursor.next()?)
                } else {
                    StandardType::lookup(self.cursor.next()?)
                }?;

                let kind = match standard_type.kind {
                    StandardTypeKind::Structure => Kind::Structure,
                    StandardTypeKind::Class => Kind::Class,
                    StandardTypeKind::Enum => Kind::Enum,
                    StandardTypeKind::Protocol => Kind::Protocol,
                };

                let node = node::swift_type(kind, standard_type.name);

                for _ in 1..repeat_count {
                    self.push_node(Rc::clone(&node));
                }

                Some(node)
            }
        }
    }

    // Identifiers.

    fn demangle_identifier(&mut self) -> Option<Rc<Node<'a>>> {
        if !self.cursor.peek_digit() {
            return None;
        }

        let mut has_word_substitutions = false;
        let mut is_punycoded = false;

        if self.cursor.next_if(b'0') {
            if self.cursor.next_if(b'0') {
                is_punycoded = true;
            } else {
                has_word_substitutions = true;
            }
        }

        let mut identifier = Cow::Borrowed("");

        loop {
            while has_word_substitutions && self.cursor.peek().is_some_and(|c| c.is_ascii_alphabetic()) {
                let c = self.cursor.next()?;

                let word_index = if c.is_ascii_lowercase() {
                    c - b'a'
                } else {
                    has_word_substitutions = false;

                    c - b'A'
                };

                let word = *self.words.get(usize::from(word_index))?;

                append(&mut identifier, Cow::Borrowed(word));
            }

            if self.cursor.next_if(b'0') {
                break;
            }

            let length = self.cursor.natural::<usize>().filter(|&length| length != 0)?;

            if is_punycoded {
                self.cursor.next_if(b'_');
            }

            let slice = self.cursor.text(length)?;

            if is_punycoded {
                append(&mut identifier, crate::punycode::decode_swift_punycode(slice)?);
            } else {
                append(&mut identifier, Cow::Borrowed(slice));
                self.harvest_words(slice);
            }

            if !has_word_substitutions {
                break;
            }
        }

        if identifier.is_empty() {
            return None;
        }

        let identifier = node::text(Kind::Identifier, identifier);

        self.add_substitution(Rc::clone(&identifier));

        Some(identifier)
    }

    fn harvest_words(&mut self, slice: &'a str) {
        let bytes = slice.as_bytes();
        let mut word_start = None;

        for position in 0..=bytes.len() {
            let c = bytes.get(position).copied().unwrap_or(0);

            if let Some(start) = word_start {
                if is_word_end(c, bytes[position - 1]) {
                    if position - start >= 2 && self.words.len() < MAX_NUM_WORDS {
                        if let Some(word) = slice.get(start..position) {
                            self.words.push(word);
                        }
                    }

                    word_start = None;
                }
            }

            if word_start.is_none() && is_word_start(c) {
                word_start = Some(position);
            }
        }
    }

    fn demangle_operator_identifier(&mut self) -> Option<Rc<Node<'a>>> {
        let identifier = self.pop_kind(Kind::Identifier)?;
        let mut operator = String::new();

        for c in identifier.text()?.chars() {
            if c.is_ascii() {
                let byte = u8::try_from(c).ok()?;

                if !byte.is_ascii_lowercase() {
                    return None;
                }

                match OPERATOR_CHARS[usize::from(byte - b'a')] {
                    b' ' => return None,
                    operator_char => operator.push(char::from(operator_char)),
                }
            } else {
                operator.push(c);
            }
        }

        let kind = match self.cursor.next()? {
            b'i' => Kind::InfixOperator,
            b'p' => Kind::PrefixOperator,
            b'P' => Kind::PostfixOperator,
            _ => return None,
        };

        Some(node::text(kind, operator))
    }

    fn demangle_local_identifier(&mut self) -> Option<Rc<Node<'a>>> {
        if self.cursor.next_if(b'L') {
            let discriminator = self.pop_kind(Kind::Identifier)?;
            let name = self.pop_if(Kind::is_decl_name)?;

            return Some(node::parent(Kind::PrivateDeclName, [discriminator, name]));
        }

        if self.cursor.next_if(b'l') {
            let discriminator = self.pop_kind(Kind::Identifier)?;

            return Some(node::parent(Kind::PrivateDeclName, [discriminator]));
        }

        if let Some(c) = self
            .cursor
            .peek()
            .filter(|c| matches!(c, b'a'..=b'j' | b'A'..=b'J'))
        {
            self.cursor.next();

            let name = self.pop_node()?;
            let related_kind = node::text(Kind::Identifier, char::from(c).to_string());

            return Some(node::parent(Kind::RelatedEntityDeclName, [related_kind, name]));
        }

        let discriminator = self.demangle_index_as_node()?;
        let name = self.pop_if(Kind::is_decl_name)?;

        Some(node::parent(Kind::LocalDeclName, [discriminator, name]))
    }

    // Numbers.

    fn demangle_index(&mut self) -> Option<u64> {
        self.cursor.index()
    }

    fn demangle_index_as_node(&mut self) -> Option<Rc<Node<'a>>> {
        self.demangle_index().map(|index| node::index(Kind::Number, index))
    }

    // Symbolic references.

    fn demangle_symbolic_reference(&mut self, control: u8) -> Option<Rc<Node<'a>>> {
        let at = self.cursor.rest();
        let offset = i32::from_le_bytes(self.cursor.slice(4)?.try_into().ok()?);
        let (kind, directness) = SymbolicReferenceKind::from_control_byte(control)?;

        let resolved = match self.resolver.as_deref_mut() {
            Some(resolver) => resolver(kind, directness, offset, at),
            None => None,
        };

        let Some(resolved) = resolved else {
            tracing::debug!(?kind, ?directness, offset, "symbolic reference not resolved");

            return None;
        };

        if kind == SymbolicReferenceKind::Context
            && !matches!(
                resolved.kind(),
                Kind::OpaqueTypeDescriptorSymbolicReference | Kind::OpaqueReturnTypeOf
            )
        {
            self.add_substitution(Rc::clone(&resolved));
        }

        Some(resolved)
    }

    // Dispatch.

    fn demangle_operator(&mut self) -> Option<Rc<Node<'a>>> {
        loop {
            let c = self.cursor.next()?;

            return match c {
                0xFF => continue,
                1..=12 => self.demangle_symbolic_reference(c),
                b'A' => self.demangle_multi_substitutions(),
                b'B' => self.demangle_builtin_type(),
                b'C' => self.demangle_any_generic_type(Kind::Class),
                b'D' => Some(node::parent(Kind::TypeMangling, [self.pop_kind(Kind::Type)?])),
                b'E' => self.demangle_extension_context(),
                b'F' => self.demangle_plain_function(),
                b'G' => self.demangle_bound_generic_type(),
                b'H' => match self.cursor.next()? {
                    b'A' => self.demangle_dependent_protocol_conformance_associated(),
                    b'C' => self.demangle_concrete_protocol_conformance(),
                    b'D' => self.demangle_dependent_protocol_conformance_root(),
                    b'I' => self.demangle_dependent_protocol_conformance_inherited(),
                    b'P' => Some(node::parent(
                        Kind::ProtocolConformanceRefInTypeModule,
                        [self.pop_protocol()?],
                    )),
                    b'p' => Some(node::parent(
                        Kind::ProtocolConformanceRefInProtocolModule,
                        [self.pop_protocol()?],
                    )),
                    _ => {
                        self.cursor.push_back();
                        self.cursor.push_back();

                        self.demangle_identifier()
                    }
                },
                b'I' => self.demangle_impl_function_type(),
                b'K' => Some(node::leaf(Kind::ThrowsAnnotation)),
                b'L' => self.demangle_local_identifier(),
                b'M' => self.demangle_metatype(),
                b'N' => Some(node::parent(Kind::TypeMetadata, [self.pop_kind(Kind::Type)?])),
                b'O' => self.demangle_any_generic_type(Kind::Enum),
                b'P' => self.demangle_any_generic_type(Kind::Protocol),
                b'Q' => self.demangle_archetype(),
                b'R' => self.demangle_generic_requirement(),
                b'S' => self.demangle_standard_substitution(),
                b'T' => self.demangle_thunk_or_specialization(),
                b'V' => self.demangle_any_generic_type(Kind::Structure),
                b'W' => self.demangle_witness(),
                b'X' => self.demangle_special_type(),
                b'Y' => self.demangle_type_annotation(),
                b'Z' => Some(node::parent(Kind::Static, [self.pop_if(Kind::is_entity)?])),
                b'a' => self.demangle_any_generic_type(Kind::TypeAlias),
                b'c' => self.pop_function_type(Kind::FunctionType, false),
                b'd' => Some(node::leaf(Kind::VariadicMarker)),
                b'f' => self.demangle_function_entity(),
                b'g' => self.demangle_retroactive_conformance(),
                b'h' => Some(node::ty(node::parent(Kind::Shared, [self.pop_type_and_get_child()?]))),
                b'i' => self.demangle_subscript(),
                b'l' => self.demangle_generic_signature(false),
                b'm' => Some(node::ty(node::parent(Kind::Metatype, [self.pop_kind(Kind::Type)?]))),
                b'n' => Some(node::ty(node::parent(Kind::Owned, [self.pop_type_and_get_child()?]))),
                b'o' => self.demangle_operator_identifier(),
                b'p' => Some(node::ty(self.demangle_protocol_list()?)),
                b'q' => Some(node::ty(self.demangle_generic_param_index()?)),
                b'r' => self.demangle_generic_signature(true),
                b's' => Some(node::text(Kind::Module, "Swift")),
                b't' => self.pop_tuple(),
                b'u' => self.demangle_generic_type(),
                b'v' => self.demangle_variable(),
                b'w' => self.demangle_value_witness(),
                b'x' => Some(node::ty(dependent_generic_param_type(0, 0))),
                b'y' => Some(node::leaf(Kind::EmptyList)),
                b'z' => Some(node::ty(node::parent(Kind::InOut, [self.pop_type_and_get_child()?]))),
                b'_' => Some(node::leaf(Kind::FirstElementMarker)),
                b'.' => {
                    self.cursor.push_back();

                    Some(node::text(
                        Kind::Suffix,
                        String::from_utf8_lossy(self.cursor.take_rest()),
                    ))
                }
                _ => {
                    self.cursor.push_back();

                    self.demangle_identifier()
                }
            };
        }
    }
}

fn append<'a>(target: &mut Cow<'a, str>, piece: Cow<'a, str>) {
    if target.is_empty() {
        *target = piece;
    } else {
        target.to_mut().push_str(&piece);
    }
}

const fn is_word_start(c: u8) -> bool {
    !c.is_ascii_digit() && c != b'_' && c != 0
}

const fn is_word_end(c: u8, previous: u8) -> bool {
    c == b'_' || c == 0 || (!previous.is_ascii_uppercase() && c.is_ascii_uppercase())
}

/// Builds the `DependentGenericParamType` at `depth` and `index`.
fn dependent_generic_param_type<'a>(depth: u64, index: u64) -> Rc<Node<'a>> {
    node::parent(
        Kind::DependentGenericParamType,
        [node::index(Kind::Index, depth), node::index(Kind::Index, index)],
    )
}

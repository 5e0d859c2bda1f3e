//! Questions about symbols that only need a quick look at their text or their top level nodes, plus the
//! whole-document rewrite.

use crate::node::{self, Kind, Node};
use crate::options::DemangleOptions;
use crate::scheme;
use std::ops::Range;
use std::rc::Rc;

/// Suffixes of current-scheme thunks whose kind is confirmed by decoding.
const THUNK_SUFFIXES: [&str; 8] = ["TA", "Ta", "To", "TO", "TR", "Tr", "TW", "fC"];

/// Whether `text` is a symbol in either mangling scheme.
#[must_use]
pub fn is_encoded(text: &str) -> bool {
    scheme::is_mangled(text.as_bytes())
}

/// Whether `text` names an imported Objective-C or C declaration.
#[must_use]
pub fn is_objc_style_symbol(text: &str) -> bool {
    let unprefixed = text.get(scheme::mangling_prefix_length(text.as_bytes())..).unwrap_or_default();

    unprefixed.starts_with("So") || unprefixed.starts_with("SC")
}

fn has_current_prefix(text: &str) -> bool {
    scheme::mangling_prefix_length(text.as_bytes()) != 0
}

/// Whether `text` is a thunk: a partial application forwarder, an Objective-C bridging thunk, a reabstraction
/// thunk, a protocol witness or an allocating initializer.
#[must_use]
pub fn is_thunk(text: &str) -> bool {
    if has_current_prefix(text) {
        if !THUNK_SUFFIXES.iter().any(|suffix| text.ends_with(suffix)) {
            return false;
        }

        let Some(global) = decode_global(text) else {
            return false;
        };

        return global.first_child().is_some_and(|first| {
            matches!(
                first.kind(),
                Kind::ObjCAttribute
                    | Kind::NonObjCAttribute
                    | Kind::PartialApplyObjCForwarder
                    | Kind::PartialApplyForwarder
                    | Kind::ReabstractionThunkHelper
                    | Kind::ReabstractionThunk
                    | Kind::ProtocolWitness
                    | Kind::Allocator
            )
        });
    }

    text.strip_prefix("_T").is_some_and(|rest| {
        ["To", "TO", "PA_", "PAo_"]
            .iter()
            .any(|prefix| rest.starts_with(prefix))
    })
}

/// Returns the symbol a thunk forwards to, or an empty string when `text` is not a thunk or when the target cannot
/// be derived from the name alone.
#[must_use]
pub fn thunk_target(text: &str) -> String {
    if !is_thunk(text) {
        return String::new();
    }

    if has_current_prefix(text) {
        if ["TR", "Tr", "TW"].iter().any(|suffix| text.ends_with(suffix)) {
            return String::new();
        }

        if let Some(stem) = text.strip_suffix("fC") {
            return format!("{stem}fc");
        }

        return text.get(..text.len() - 2).unwrap_or_default().to_owned();
    }

    let rest = text.get(2..).unwrap_or_default();

    if let Some(target) = rest.strip_prefix("PA_") {
        target.to_owned()
    } else if let Some(target) = rest.strip_prefix("PAo_") {
        target.to_owned()
    } else {
        format!("_T{}", rest.get(2..).unwrap_or_default())
    }
}

/// Whether the function `text` names is called with the native calling convention. Accessors of runtime metadata
/// and witness tables, and Objective-C entry points, are not.
#[must_use]
pub fn has_native_calling_convention(text: &str) -> bool {
    let Some(global) = decode_global(text) else {
        return false;
    };

    if global.first_child().is_some_and(|first| first.kind() == Kind::ObjCAttribute) {
        return false;
    }

    global
        .children()
        .iter()
        .find(|child| !child.kind().is_function_attr())
        .is_none_or(|top_level| {
            !matches!(
                top_level.kind(),
                Kind::TypeMetadataAccessFunction
                    | Kind::ValueWitness
                    | Kind::ProtocolWitnessTableAccessor
                    | Kind::GenericProtocolWitnessTableInstantiationFunction
                    | Kind::LazyProtocolWitnessTableAccessor
                    | Kind::AssociatedTypeMetadataAccessor
                    | Kind::AssociatedTypeWitnessTableAccessor
                    | Kind::BaseWitnessTableAccessor
            )
        })
}

/// Returns the name of the module that declares the entity `text` names.
#[must_use]
pub fn module_of(text: &str) -> Option<String> {
    let global = crate::decode(text.as_bytes())?;
    let mut current: Rc<Node> = global;

    loop {
        let next = match current.kind() {
            Kind::Module => return current.text().map(str::to_owned),
            Kind::TypeMangling | Kind::Type => Rc::clone(current.first_child()?),
            Kind::Global => Rc::clone(
                current
                    .children()
                    .iter()
                    .find(|child| !child.kind().is_function_attr())?,
            ),
            _ if is_specialized(&current) => unspecialized(&current)?,
            kind if kind.is_context() => Rc::clone(current.first_child()?),
            _ => return None,
        };

        current = next;
    }
}

/// Whether `node` is, or is nested in, a bound generic type or function.
#[must_use]
pub fn is_specialized(node: &Node) -> bool {
    match node.kind() {
        Kind::BoundGenericStructure
        | Kind::BoundGenericEnum
        | Kind::BoundGenericClass
        | Kind::BoundGenericOtherNominalType
        | Kind::BoundGenericTypeAlias
        | Kind::BoundGenericProtocol
        | Kind::BoundGenericFunction => true,
        Kind::Structure
        | Kind::Enum
        | Kind::Class
        | Kind::TypeAlias
        | Kind::OtherNominalType
        | Kind::Protocol
        | Kind::Function
        | Kind::Allocator
        | Kind::Constructor
        | Kind::Destructor
        | Kind::Variable
        | Kind::Subscript
        | Kind::ExplicitClosure
        | Kind::ImplicitClosure
        | Kind::Initializer
        | Kind::PropertyWrapperBackingInitializer
        | Kind::PropertyWrapperInitFromProjectedValue
        | Kind::DefaultArgumentInitializer
        | Kind::Getter
        | Kind::Setter
        | Kind::WillSet
        | Kind::DidSet
        | Kind::ReadAccessor
        | Kind::ModifyAccessor
        | Kind::UnsafeAddressor
        | Kind::UnsafeMutableAddressor => node.first_child().is_some_and(|parent| is_specialized(parent)),
        Kind::Extension => node.child(1).is_some_and(|extended| is_specialized(extended)),
        _ => false,
    }
}

/// Rebuilds a specialized node with its generic arguments removed.
#[must_use]
pub fn unspecialized<'a>(node: &Node<'a>) -> Option<Rc<Node<'a>>> {
    let unspecialized_parent = |parent: &Rc<Node<'a>>| {
        if is_specialized(parent) {
            unspecialized(parent)
        } else {
            Some(Rc::clone(parent))
        }
    };

    match node.kind() {
        Kind::Function
        | Kind::Getter
        | Kind::Setter
        | Kind::WillSet
        | Kind::DidSet
        | Kind::ReadAccessor
        | Kind::ModifyAccessor
        | Kind::UnsafeAddressor
        | Kind::UnsafeMutableAddressor
        | Kind::Allocator
        | Kind::Constructor
        | Kind::Destructor
        | Kind::Variable
        | Kind::Subscript
        | Kind::ExplicitClosure
        | Kind::ImplicitClosure
        | Kind::Initializer
        | Kind::PropertyWrapperBackingInitializer
        | Kind::PropertyWrapperInitFromProjectedValue
        | Kind::DefaultArgumentInitializer => {
            let (parent, rest) = node.children().split_first()?;

            Some(node::parent(
                node.kind(),
                [unspecialized_parent(parent)?].into_iter().chain(rest.iter().map(Rc::clone)),
            ))
        }
        Kind::Structure | Kind::Enum | Kind::Class | Kind::TypeAlias | Kind::OtherNominalType => {
            let parent = node.first_child()?;
            let name = node.child(1)?;

            Some(node::parent(node.kind(), [unspecialized_parent(parent)?, Rc::clone(name)]))
        }
        Kind::BoundGenericStructure
        | Kind::BoundGenericEnum
        | Kind::BoundGenericClass
        | Kind::BoundGenericProtocol
        | Kind::BoundGenericOtherNominalType
        | Kind::BoundGenericTypeAlias => {
            let unbound = node.first_child()?;

            if unbound.kind() != Kind::Type {
                return None;
            }

            unspecialized_parent(unbound.first_child()?)
        }
        Kind::BoundGenericFunction => unspecialized_parent(node.first_child()?),
        Kind::Extension => {
            let extended = node.child(1)?;

            if !is_specialized(extended) {
                return Some(Rc::new(node.clone()));
            }

            Some(node::parent(
                Kind::Extension,
                [Rc::clone(node.first_child()?), unspecialized(extended)?]
                    .into_iter()
                    .chain(node.child(2).map(Rc::clone)),
            ))
        }
        _ => None,
    }
}

fn decode_global(text: &str) -> Option<Rc<Node<'_>>> {
    crate::decode(text.as_bytes()).filter(|global| global.kind() == Kind::Global && global.num_children() != 0)
}

/// Returns the classification tags of `symbol`: `N` when it is not mangled at all, `T:<target>` for thunks and
/// `C` for symbols that do not use the native calling convention. Returns `None` when no tag applies.
#[must_use]
pub fn classify(symbol: &str) -> Option<String> {
    let mut tags = Vec::new();

    if !is_encoded(symbol) {
        tags.push(String::from("N"));
    }

    if is_thunk(symbol) {
        tags.push(format!("T:{}", thunk_target(symbol)));
    }

    if decode_global(symbol).is_some() && !has_native_calling_convention(symbol) {
        tags.push(String::from("C"));
    }

    (!tags.is_empty()).then(|| format!("{{{}}}", tags.join(",")))
}

/// Renders `symbol` with `options`, or returns it unchanged when it cannot be decoded. With `classify` set, the
/// result is prefixed by the classification tags and a space.
#[must_use]
pub fn demangle_symbol_as_string(symbol: &str, options: &DemangleOptions, classify: bool) -> String {
    let mut result = String::new();

    if classify && let Some(tags) = self::classify(symbol) {
        result.push_str(&tags);
        result.push(' ');
    }

    let rendered = crate::decode(symbol.as_bytes()).and_then(|tree| match crate::render(&tree, options) {
        Ok(rendered) => Some(rendered),
        Err(error) => {
            tracing::trace!(symbol, %error, "failed to render symbol");

            None
        }
    });

    match rendered {
        Some(rendered) if !rendered.is_empty() => result.push_str(&rendered),
        _ => result.push_str(symbol),
    }

    result
}

/// Characters that end a candidate token in free text.
fn is_token_delimiter(c: char) -> bool {
    c.is_whitespace() || matches!(c, '(' | ')' | '[' | ']' | '{' | '}' | ';' | ':')
}

/// Byte ranges of the maximal runs of non-delimiter characters in `text`.
fn tokens(text: &str) -> Vec<Range<usize>> {
    let mut result = Vec::new();
    let mut start = None;

    for (i, c) in text.char_indices() {
        match (is_token_delimiter(c), start) {
            (true, Some(token_start)) => {
                result.push(token_start..i);
                start = None;
            }
            (false, None) => start = Some(i),
            _ => {}
        }
    }

    if let Some(token_start) = start {
        result.push(token_start..text.len());
    }

    result
}

/// Replaces every mangled symbol found in `text` with its rendered form. Tokens that do not decode are left as they
/// are.
#[must_use]
pub fn rewrite_all_occurrences(text: &str, options: &DemangleOptions) -> String {
    let mut replacements = Vec::new();

    for range in tokens(text) {
        let token = &text[range.clone()];

        if !is_encoded(token) {
            continue;
        }

        let Some(tree) = crate::decode(token.as_bytes()) else {
            tracing::trace!(token, "skipping token that does not decode");

            continue;
        };

        match crate::render(&tree, options) {
            Ok(rendered) => replacements.push((range, rendered)),
            Err(error) => tracing::trace!(token, %error, "skipping token that does not render"),
        }
    }

    let mut result = text.to_owned();

    for (range, rendered) in replacements.into_iter().rev() {
        result.replace_range(range, &rendered);
    }

    result
}

/// Formats the kinds of the top level nodes of `symbol`, one per line. Used to inspect classification decisions.
#[must_use]
pub fn describe_top_level(symbol: &str) -> String {
    let mut result = String::new();

    if let Some(global) = decode_global(symbol) {
        for child in global.children() {
            result.push_str(child.kind().name());
            result.push('\n');
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use crate::options::{DemangleFlags, DemangleOptions};

    #[test]
    fn test_is_encoded() {
        assert!(super::is_encoded("$s4main3fooyyF"));
        assert!(super::is_encoded("_TF4main3fooFT_T_"));
        assert!(!super::is_encoded("main"));
        assert!(!super::is_encoded(""));
    }

    #[test]
    fn test_is_objc_style_symbol() {
        assert!(super::is_objc_style_symbol("$sSo8NSObjectC"));
        assert!(super::is_objc_style_symbol("$sSC4RectV"));
        assert!(!super::is_objc_style_symbol("$s4main3FooC"));
    }

    #[test]
    fn test_thunks() {
        assert!(super::is_thunk("$s4main3fooyyFTA"));
        assert_eq!(super::thunk_target("$s4main3fooyyFTA"), "$s4main3fooyyF");

        assert!(super::is_thunk("$s4main3FooVACycfC"));
        assert_eq!(super::thunk_target("$s4main3FooVACycfC"), "$s4main3FooVACycfc");

        assert!(!super::is_thunk("$s4main3fooyyF"));
        assert_eq!(super::thunk_target("$s4main3fooyyF"), "");

        // The suffix alone is not enough.
        assert!(!super::is_thunk("$s4main2TAV"));

        assert!(super::is_thunk("_TToFC4main3Foo3barfT_T_"));
        assert_eq!(super::thunk_target("_TToFC4main3Foo3barfT_T_"), "_TFC4main3Foo3barfT_T_");
        assert_eq!(super::thunk_target("_TPA__TF4main3fooFT_T_"), "_TF4main3fooFT_T_");
    }

    #[test]
    fn test_has_native_calling_convention() {
        assert!(super::has_native_calling_convention("$s4main3fooyyF"));
        assert!(!super::has_native_calling_convention("$s4main3FooVMa"));
        assert!(!super::has_native_calling_convention("_TToFC4main3Foo3barfT_T_"));
        assert!(!super::has_native_calling_convention("main"));
    }

    #[test]
    fn test_module_of() {
        assert_eq!(super::module_of("$s4main3fooyyF").as_deref(), Some("main"));
        assert_eq!(super::module_of("$s4main3FooVD").as_deref(), Some("main"));
        assert_eq!(super::module_of("$sSaySiGD").as_deref(), Some("Swift"));

        // Metadata accessors are not contexts.
        assert_eq!(super::module_of("$s4main3FooVMa"), None);
        assert_eq!(super::module_of("_TtC5Other3Bar").as_deref(), Some("Other"));
        assert_eq!(super::module_of("not a symbol"), None);
    }

    #[test]
    fn test_classify() {
        assert_eq!(super::classify("main").as_deref(), Some("{N}"));
        assert_eq!(super::classify("$s4main3fooyyF"), None);
        assert_eq!(super::classify("$s4main3fooyyFTA").as_deref(), Some("{T:$s4main3fooyyF}"));
        assert_eq!(super::classify("$s4main3FooVMa").as_deref(), Some("{C}"));
    }

    #[test]
    fn test_demangle_symbol_as_string() {
        let options = DemangleOptions::full();

        assert_eq!(
            super::demangle_symbol_as_string("$s4main3fooyyF", &options, false),
            "main.foo() -> ()"
        );

        assert_eq!(
            super::demangle_symbol_as_string("$s4main3fooyyFTA", &options, true),
            "{T:$s4main3fooyyF} partial apply forwarder for main.foo() -> ()"
        );

        assert_eq!(super::demangle_symbol_as_string("hello", &options, false), "hello");
        assert_eq!(super::demangle_symbol_as_string("hello", &options, true), "{N} hello");
    }

    #[test]
    fn test_tokens() {
        let text = "call $s4main3fooyyF;(x:[y]) z";
        let tokens = super::tokens(text).into_iter().map(|range| &text[range]).collect::<Vec<_>>();

        assert_eq!(tokens, ["call", "$s4main3fooyyF", "x", "y", "z"]);
    }

    #[test]
    fn test_rewrite_all_occurrences() {
        let options = DemangleOptions::simplified();
        let text = "bl $s4main3fooyyF ; main and _$s4main3barSivg(x)";
        let rewritten = super::rewrite_all_occurrences(text, &options);

        assert_eq!(rewritten, "bl foo() ; main and bar.getter(x)");
        assert_eq!(super::rewrite_all_occurrences(&rewritten, &options), rewritten);

        let options = DemangleOptions::full().with(DemangleFlags::DISPLAY_MODULE_NAMES, false);

        assert_eq!(super::rewrite_all_occurrences("[$s4main3fooyyF]", &options), "[foo() -> ()]");
    }

    #[test]
    fn test_describe_top_level() {
        assert_eq!(super::describe_top_level("$s4main3fooyyFTA"), "PartialApplyForwarder\n");
        assert_eq!(super::describe_top_level("garbage"), "");
        assert_eq!(super::describe_top_level("$s4main3fooyyF.cold"), "Function\nSuffix\n");
    }
}

//! # swift-ast-demangle
//!
//! Decodes Swift mangled symbol names into a tree of nodes and prints them as readable signatures.
//!
//! Both the current mangling scheme (symbols starting with `$s`, `_$s`, `$S`, `_$S` or `_T0`) and the legacy one
//! (symbols starting with `_T`) are supported.
//!
//! Example:
//!
//! ```rust
//! use swift_ast_demangle::node::Kind;
//! use swift_ast_demangle::options::{DemangleFlags, DemangleOptions};
//!
//! let tree = swift_ast_demangle::decode(b"$s4main8identityyxxlF").unwrap();
//!
//! // The root of every decoded symbol is a `Global` node.
//! assert_eq!(tree.kind(), Kind::Global);
//! assert_eq!(tree.first_child().unwrap().kind(), Kind::Function);
//!
//! // Render with every detail.
//! let full = DemangleOptions::full();
//!
//! assert_eq!(swift_ast_demangle::render(&tree, &full).unwrap(), "main.identity<A>(A) -> A");
//!
//! // Or turn individual details off.
//! let options = full.clone().with(DemangleFlags::DISPLAY_MODULE_NAMES, false);
//!
//! assert_eq!(swift_ast_demangle::render(&tree, &options).unwrap(), "identity<A>(A) -> A");
//!
//! // Text that is not a symbol is left alone by the string helpers.
//! assert_eq!(
//!     swift_ast_demangle::classify::demangle_symbol_as_string("main", &full, false),
//!     "main"
//! );
//! ```

pub mod classify;
pub mod demangler;
pub mod kinds;
pub mod node;
pub mod old_demangler;
pub mod options;
pub mod printer;
mod punycode;
pub mod scheme;

pub use demangler::SymbolicReferenceResolver;
pub use node::{Kind, Node, Payload};
pub use options::{DemangleFlags, DemangleOptions};
pub use printer::{PrintingError, render, render_to};
pub use scheme::Scheme;

use demangler::Demangler;
use old_demangler::OldDemangler;
use std::rc::Rc;

/// Decodes a whole symbol in either mangling scheme. Returns `None` if `mangled` is not a valid symbol.
#[must_use]
pub fn decode(mangled: &[u8]) -> Option<Rc<Node<'_>>> {
    let scheme = scheme::detect_scheme(mangled)?;

    tracing::trace!(?scheme, "decoding symbol");

    match scheme {
        Scheme::Current { .. } => Demangler::new(mangled).demangle_symbol(),
        Scheme::Legacy => OldDemangler::new(mangled).demangle_top_level(),
    }
}

/// Decodes a current-scheme symbol that may contain symbolic references, using `resolver` to turn each reference
/// into a node.
pub fn decode_with_resolver<'a, 'r>(
    mangled: &'a [u8],
    resolver: &'r mut SymbolicReferenceResolver<'a, 'r>,
) -> Option<Rc<Node<'a>>> {
    match scheme::detect_scheme(mangled)? {
        Scheme::Current { .. } => Demangler::with_resolver(mangled, resolver).demangle_symbol(),
        Scheme::Legacy => OldDemangler::new(mangled).demangle_top_level(),
    }
}

/// Decodes a bare type mangling without any prefix, such as `Si` or `SaySSG`.
#[must_use]
pub fn decode_type(mangled: &[u8]) -> Option<Rc<Node<'_>>> {
    Demangler::new(mangled).demangle_type()
}

//! Mangling scheme detection.

/// Prefixes of the current mangling, tried in order.
const CURRENT_PREFIXES: [&str; 5] = ["_T0", "$S", "_$S", "$s", "_$s"];

/// The legacy mangling prefix.
const LEGACY_PREFIX: &str = "_T";

/// Which grammar generation a symbol is encoded in.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Scheme {
    /// The legacy mangling, introduced by `_T`.
    Legacy,
    /// The current mangling, with the length of its prefix.
    Current { prefix_length: usize },
}

/// Returns the length of the current-scheme prefix of `mangled`, or 0 if there is none.
#[must_use]
pub fn mangling_prefix_length(mangled: &[u8]) -> usize {
    CURRENT_PREFIXES
        .iter()
        .find(|prefix| mangled.starts_with(prefix.as_bytes()))
        .map_or(0, |prefix| prefix.len())
}

/// Whether `mangled` uses the old function type mangling, in which argument labels are stored inline in tuples.
#[must_use]
pub fn is_old_function_type_mangling(mangled: &[u8]) -> bool {
    mangled.starts_with(LEGACY_PREFIX.as_bytes())
}

/// Decides which decoder applies to `mangled`. Returns `None` for text that is not encoded.
#[must_use]
pub fn detect_scheme(mangled: &[u8]) -> Option<Scheme> {
    match mangling_prefix_length(mangled) {
        0 => mangled.starts_with(LEGACY_PREFIX.as_bytes()).then_some(Scheme::Legacy),
        prefix_length => Some(Scheme::Current { prefix_length }),
    }
}

/// Whether `mangled` is a symbol in either scheme.
#[must_use]
pub fn is_mangled(mangled: &[u8]) -> bool {
    detect_scheme(mangled).is_some()
}

#[cfg(test)]
mod tests {
    use super::Scheme;

    #[track_caller]
    fn check(mangled: &str, expected: Option<Scheme>) {
        assert_eq!(super::detect_scheme(mangled.as_bytes()), expected, "{mangled}");
        assert_eq!(super::is_mangled(mangled.as_bytes()), expected.is_some());
    }

    #[test]
    fn test_detect_scheme() {
        check("$s4main3fooyyF", Some(Scheme::Current { prefix_length: 2 }));
        check("_$s4main3fooyyF", Some(Scheme::Current { prefix_length: 3 }));
        check("$S4main3fooyyF", Some(Scheme::Current { prefix_length: 2 }));
        check("_$S4main3fooyyF", Some(Scheme::Current { prefix_length: 3 }));
        check("_T04main3fooyyF", Some(Scheme::Current { prefix_length: 3 }));
        check("_TF4main3fooFT_T_", Some(Scheme::Legacy));
        check("_TtSi", Some(Scheme::Legacy));
        check("main", None);
        check("_ZN4main3fooEv", None);
        check("", None);
        check("$", None);
    }

    #[test]
    fn test_old_function_type_mangling() {
        assert!(super::is_old_function_type_mangling(b"_T04main3fooyyF"));
        assert!(!super::is_old_function_type_mangling(b"$s4main3fooyyF"));
    }
}

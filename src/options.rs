//! Rendering options.

use bitflags::bitflags;

bitflags! {
    /// Independently toggleable rendering behaviors.
    #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
    pub struct DemangleFlags: u32 {
        /// Print `Optional<T>`, `Array<T>` and `Dictionary<K, V>` as `T?`, `[T]` and `[K : V]`.
        const SYNTHESIZE_SUGAR_ON_TYPES = 1 << 0;
        const DISPLAY_DEBUGGER_GENERATED_MODULE = 1 << 1;
        /// Prefix declarations with their enclosing contexts.
        const QUALIFY_ENTITIES = 1 << 2;
        const DISPLAY_EXTENSION_CONTEXTS = 1 << 3;
        const DISPLAY_UNMANGLED_SUFFIX = 1 << 4;
        const DISPLAY_MODULE_NAMES = 1 << 5;
        const DISPLAY_GENERIC_SPECIALIZATIONS = 1 << 6;
        const DISPLAY_PROTOCOL_CONFORMANCES = 1 << 7;
        const DISPLAY_WHERE_CLAUSES = 1 << 8;
        const DISPLAY_ENTITY_TYPES = 1 << 9;
        const DISPLAY_LOCAL_NAME_CONTEXTS = 1 << 10;
        const SHORTEN_PARTIAL_APPLY = 1 << 11;
        const SHORTEN_THUNK = 1 << 12;
        const SHORTEN_VALUE_WITNESS = 1 << 13;
        /// Print archetypes without their `(in ...)` context.
        const SHORTEN_ARCHETYPE = 1 << 14;
        const SHOW_PRIVATE_DISCRIMINATORS = 1 << 15;
        const SHOW_FUNCTION_ARGUMENT_TYPES = 1 << 16;
        /// Print the `Swift` module.
        const DISPLAY_STDLIB_MODULE = 1 << 17;
        /// Print the `__C` module of imported declarations.
        const DISPLAY_OBJC_MODULE = 1 << 18;
        /// Print names in the form the runtime type name lookup expects.
        const PRINT_FOR_TYPE_NAME = 1 << 19;
        const SHOW_ASYNC_RESUME_PARTIAL = 1 << 20;
    }
}

/// Options controlling how a node tree is rendered.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct DemangleOptions {
    pub flags: DemangleFlags,
    /// A module whose name is left out when qualifying declarations.
    pub hiding_current_module: Option<String>,
}

impl DemangleOptions {
    /// Everything is printed, without sugar and without shortening.
    #[must_use]
    pub fn full() -> Self {
        Self {
            flags: DemangleFlags::all()
                - DemangleFlags::SYNTHESIZE_SUGAR_ON_TYPES
                - DemangleFlags::SHORTEN_PARTIAL_APPLY
                - DemangleFlags::SHORTEN_THUNK
                - DemangleFlags::SHORTEN_VALUE_WITNESS
                - DemangleFlags::SHORTEN_ARCHETYPE
                - DemangleFlags::PRINT_FOR_TYPE_NAME,
            hiding_current_module: None,
        }
    }

    /// The compact form meant for user interfaces.
    #[must_use]
    pub fn simplified() -> Self {
        let flags = Self::full().flags
            | DemangleFlags::SYNTHESIZE_SUGAR_ON_TYPES
            | DemangleFlags::SHORTEN_PARTIAL_APPLY
            | DemangleFlags::SHORTEN_THUNK
            | DemangleFlags::SHORTEN_VALUE_WITNESS
            | DemangleFlags::SHORTEN_ARCHETYPE;

        Self {
            flags: flags
                - DemangleFlags::DISPLAY_EXTENSION_CONTEXTS
                - DemangleFlags::DISPLAY_UNMANGLED_SUFFIX
                - DemangleFlags::DISPLAY_MODULE_NAMES
                - DemangleFlags::DISPLAY_GENERIC_SPECIALIZATIONS
                - DemangleFlags::DISPLAY_PROTOCOL_CONFORMANCES
                - DemangleFlags::DISPLAY_WHERE_CLAUSES
                - DemangleFlags::DISPLAY_ENTITY_TYPES
                - DemangleFlags::SHOW_PRIVATE_DISCRIMINATORS
                - DemangleFlags::SHOW_FUNCTION_ARGUMENT_TYPES
                - DemangleFlags::SHOW_ASYNC_RESUME_PARTIAL,
            hiding_current_module: None,
        }
    }

    /// Returns a copy with `flag` turned on or off.
    #[must_use]
    pub fn with(mut self, flag: DemangleFlags, enabled: bool) -> Self {
        self.flags.set(flag, enabled);

        self
    }

    /// Returns a copy that omits `module` when qualifying names.
    #[must_use]
    pub fn hiding_module(mut self, module: impl Into<String>) -> Self {
        self.hiding_current_module = Some(module.into());

        self
    }

    #[must_use]
    pub const fn contains(&self, flag: DemangleFlags) -> bool {
        self.flags.contains(flag)
    }

    /// Whether `module` is the hidden current module.
    #[must_use]
    pub fn is_hidden_module(&self, module: &str) -> bool {
        self.hiding_current_module.as_deref() == Some(module)
    }
}

impl Default for DemangleOptions {
    fn default() -> Self {
        Self::full()
    }
}

#[cfg(test)]
mod tests {
    use super::{DemangleFlags, DemangleOptions};

    #[test]
    fn test_presets() {
        let full = DemangleOptions::default();

        assert_eq!(full, DemangleOptions::full());
        assert!(full.contains(DemangleFlags::QUALIFY_ENTITIES | DemangleFlags::DISPLAY_LOCAL_NAME_CONTEXTS));
        assert!(!full.contains(DemangleFlags::SYNTHESIZE_SUGAR_ON_TYPES));
        assert!(!full.contains(DemangleFlags::SHORTEN_THUNK));
        assert!(!full.contains(DemangleFlags::PRINT_FOR_TYPE_NAME));

        let simplified = DemangleOptions::simplified();

        assert!(simplified.contains(DemangleFlags::SYNTHESIZE_SUGAR_ON_TYPES | DemangleFlags::SHORTEN_ARCHETYPE));
        assert!(simplified.contains(DemangleFlags::DISPLAY_LOCAL_NAME_CONTEXTS));
        assert!(!simplified.contains(DemangleFlags::DISPLAY_MODULE_NAMES));
        assert!(!simplified.contains(DemangleFlags::SHOW_FUNCTION_ARGUMENT_TYPES));
    }

    #[test]
    fn test_builders() {
        let options = DemangleOptions::full()
            .with(DemangleFlags::SYNTHESIZE_SUGAR_ON_TYPES, true)
            .with(DemangleFlags::DISPLAY_STDLIB_MODULE, false)
            .hiding_module("main");

        assert!(options.contains(DemangleFlags::SYNTHESIZE_SUGAR_ON_TYPES));
        assert!(!options.contains(DemangleFlags::DISPLAY_STDLIB_MODULE));
        assert!(options.is_hidden_module("main"));
        assert!(!options.is_hidden_module("Swift"));
    }
}

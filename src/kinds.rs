//! Closed code tables used by the decoders when building payloads and by the printer when rendering them.

use bitflags::bitflags;

/// A value witness function of a type's value witness table.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum ValueWitnessKind {
    AllocateBuffer,
    AssignWithCopy,
    AssignWithTake,
    DeallocateBuffer,
    Destroy,
    DestroyBuffer,
    DestroyArray,
    InitializeBufferWithCopyOfBuffer,
    InitializeBufferWithCopy,
    InitializeWithCopy,
    InitializeBufferWithTake,
    InitializeWithTake,
    ProjectBuffer,
    InitializeBufferWithTakeOfBuffer,
    InitializeArrayWithCopy,
    InitializeArrayWithTakeFrontToBack,
    InitializeArrayWithTakeBackToFront,
    StoreExtraInhabitant,
    GetExtraInhabitantIndex,
    GetEnumTag,
    DestructiveProjectEnumData,
    DestructiveInjectEnumTag,
    GetEnumTagSinglePayload,
    StoreEnumTagSinglePayload,
}

impl ValueWitnessKind {
    const TABLE: [(&'static [u8; 2], Self, &'static str); 24] = [
        (b"al", Self::AllocateBuffer, "allocateBuffer"),
        (b"ca", Self::AssignWithCopy, "assignWithCopy"),
        (b"ta", Self::AssignWithTake, "assignWithTake"),
        (b"de", Self::DeallocateBuffer, "deallocateBuffer"),
        (b"xx", Self::Destroy, "destroy"),
        (b"XX", Self::DestroyBuffer, "destroyBuffer"),
        (b"Xx", Self::DestroyArray, "destroyArray"),
        (b"CP", Self::InitializeBufferWithCopyOfBuffer, "initializeBufferWithCopyOfBuffer"),
        (b"Cp", Self::InitializeBufferWithCopy, "initializeBufferWithCopy"),
        (b"cp", Self::InitializeWithCopy, "initializeWithCopy"),
        (b"Tk", Self::InitializeBufferWithTake, "initializeBufferWithTake"),
        (b"tk", Self::InitializeWithTake, "initializeWithTake"),
        (b"pr", Self::ProjectBuffer, "projectBuffer"),
        (b"TK", Self::InitializeBufferWithTakeOfBuffer, "initializeBufferWithTakeOfBuffer"),
        (b"Cc", Self::InitializeArrayWithCopy, "initializeArrayWithCopy"),
        (b"Tt", Self::InitializeArrayWithTakeFrontToBack, "initializeArrayWithTakeFrontToBack"),
        (b"tT", Self::InitializeArrayWithTakeBackToFront, "initializeArrayWithTakeBackToFront"),
        (b"xs", Self::StoreExtraInhabitant, "storeExtraInhabitant"),
        (b"xg", Self::GetExtraInhabitantIndex, "getExtraInhabitantIndex"),
        (b"ug", Self::GetEnumTag, "getEnumTag"),
        (b"up", Self::DestructiveProjectEnumData, "destructiveProjectEnumData"),
        (b"ui", Self::DestructiveInjectEnumTag, "destructiveInjectEnumTag"),
        (b"et", Self::GetEnumTagSinglePayload, "getEnumTagSinglePayload"),
        (b"st", Self::StoreEnumTagSinglePayload, "storeEnumTagSinglePayload"),
    ];

    #[must_use]
    pub fn from_code(code: [u8; 2]) -> Option<Self> {
        Self::TABLE
            .iter()
            .find(|(candidate, ..)| **candidate == code)
            .map(|&(_, kind, _)| kind)
    }

    #[must_use]
    pub fn code(self) -> &'static str {
        Self::TABLE
            .iter()
            .find(|(_, kind, _)| *kind == self)
            .and_then(|(code, ..)| std::str::from_utf8(*code).ok())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        Self::TABLE
            .iter()
            .find(|(_, kind, _)| *kind == self)
            .map_or("", |&(.., name)| name)
    }
}

/// The base transformation applied to a parameter by function signature specialization.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum FunctionSigSpecializationParamKind {
    ConstantPropFunction = 0,
    ConstantPropGlobal = 1,
    ConstantPropInteger = 2,
    ConstantPropFloat = 3,
    ConstantPropString = 4,
    ClosureProp = 5,
    BoxToValue = 6,
    BoxToStack = 7,
    InOutToOut = 8,
    ConstantPropKeyPath = 9,
}

bitflags! {
    /// Transformations that may be combined with each other on a single specialized parameter.
    #[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
    pub struct FunctionSigSpecializationParamOptions: u64 {
        const DEAD = 1 << 6;
        const OWNED_TO_GUARANTEED = 1 << 7;
        const SROA = 1 << 8;
        const GUARANTEED_TO_OWNED = 1 << 9;
        const EXISTENTIAL_TO_GENERIC = 1 << 10;
    }
}

/// The raw specialization parameter kind: a base kind in the low 6 bits, or a set of option bits above them.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct SpecializationParamKind(pub u64);

impl SpecializationParamKind {
    const BASE_MASK: u64 = 0x3f;

    #[must_use]
    pub const fn from_base(kind: FunctionSigSpecializationParamKind) -> Self {
        Self(kind as u64)
    }

    #[must_use]
    pub const fn from_options(options: FunctionSigSpecializationParamOptions) -> Self {
        Self(options.bits())
    }

    #[must_use]
    pub const fn options(self) -> FunctionSigSpecializationParamOptions {
        FunctionSigSpecializationParamOptions::from_bits_truncate(self.0)
    }

    #[must_use]
    pub const fn base(self) -> Option<FunctionSigSpecializationParamKind> {
        if self.0 & !Self::BASE_MASK != 0 {
            return None;
        }

        Some(match self.0 {
            0 => FunctionSigSpecializationParamKind::ConstantPropFunction,
            1 => FunctionSigSpecializationParamKind::ConstantPropGlobal,
            2 => FunctionSigSpecializationParamKind::ConstantPropInteger,
            3 => FunctionSigSpecializationParamKind::ConstantPropFloat,
            4 => FunctionSigSpecializationParamKind::ConstantPropString,
            5 => FunctionSigSpecializationParamKind::ClosureProp,
            6 => FunctionSigSpecializationParamKind::BoxToValue,
            7 => FunctionSigSpecializationParamKind::BoxToStack,
            8 => FunctionSigSpecializationParamKind::InOutToOut,
            9 => FunctionSigSpecializationParamKind::ConstantPropKeyPath,
            _ => return None,
        })
    }
}

/// Differentiability of a function type or of an autodiff derivative.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum MangledDifferentiabilityKind {
    NonDifferentiable,
    Forward,
    Reverse,
    Normal,
    Linear,
}

impl MangledDifferentiabilityKind {
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            b'f' => Self::Forward,
            b'r' => Self::Reverse,
            b'd' => Self::Normal,
            b'l' => Self::Linear,
            _ => return None,
        })
    }

    /// The mangling code, which is zero for non-differentiable.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::NonDifferentiable => 0,
            Self::Forward => b'f',
            Self::Reverse => b'r',
            Self::Normal => b'd',
            Self::Linear => b'l',
        }
    }
}

/// Whether a symbolic reference or a field offset refers to its target directly or through an indirection.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Directness {
    Direct,
    Indirect,
    Unknown,
}

impl Directness {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Indirect => "indirect",
            Self::Unknown => "unknown",
        }
    }
}

/// What an embedded symbolic reference points at.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum SymbolicReferenceKind {
    /// A context descriptor of a nominal type, an extension, or an opaque type.
    Context,
    /// A function that produces the metadata for the referenced type.
    AccessorFunctionReference,
}

impl SymbolicReferenceKind {
    /// Maps the raw control byte of a symbolic reference to its kind and directness.
    #[must_use]
    pub const fn from_control_byte(byte: u8) -> Option<(Self, Directness)> {
        Some(match byte {
            1 => (Self::Context, Directness::Direct),
            2 => (Self::Context, Directness::Indirect),
            9 => (Self::AccessorFunctionReference, Directness::Direct),
            _ => return None,
        })
    }
}

/// Reference ownership annotations of storage.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum ReferenceOwnership {
    Weak,
    Unowned,
    Unmanaged,
}

impl ReferenceOwnership {
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            b'w' => Self::Weak,
            b'o' => Self::Unowned,
            b'u' => Self::Unmanaged,
            _ => return None,
        })
    }

    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Weak => "weak",
            Self::Unowned => "unowned",
            Self::Unmanaged => "unowned(unsafe)",
        }
    }
}

/// The nominal kind of a standard library shorthand.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum StandardTypeKind {
    Structure,
    Class,
    Enum,
    Protocol,
}

/// Single letter shorthands of commonly used standard library types, shared by both manglings.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct StandardType {
    pub code: u8,
    pub kind: StandardTypeKind,
    pub name: &'static str,
}

const fn structure(code: u8, name: &'static str) -> StandardType {
    StandardType {
        code,
        kind: StandardTypeKind::Structure,
        name,
    }
}

const fn protocol(code: u8, name: &'static str) -> StandardType {
    StandardType {
        code,
        kind: StandardTypeKind::Protocol,
        name,
    }
}

const STANDARD_TYPES: [StandardType; 41] = [
    structure(b'A', "AutoreleasingUnsafeMutablePointer"),
    structure(b'a', "Array"),
    structure(b'b', "Bool"),
    structure(b'D', "Dictionary"),
    structure(b'd', "Double"),
    structure(b'f', "Float"),
    structure(b'h', "Set"),
    structure(b'I', "DefaultIndices"),
    structure(b'i', "Int"),
    structure(b'J', "Character"),
    structure(b'N', "ClosedRange"),
    structure(b'n', "Range"),
    structure(b'O', "ObjectIdentifier"),
    structure(b'P', "UnsafePointer"),
    structure(b'p', "UnsafeMutablePointer"),
    structure(b'R', "UnsafeBufferPointer"),
    structure(b'r', "UnsafeMutableBufferPointer"),
    structure(b'S', "String"),
    structure(b's', "Substring"),
    structure(b'u', "UInt"),
    structure(b'V', "UnsafeRawPointer"),
    structure(b'v', "UnsafeMutableRawPointer"),
    structure(b'W', "UnsafeRawBufferPointer"),
    structure(b'w', "UnsafeMutableRawBufferPointer"),
    StandardType {
        code: b'q',
        kind: StandardTypeKind::Enum,
        name: "Optional",
    },
    protocol(b'B', "BinaryFloatingPoint"),
    protocol(b'E', "Encodable"),
    protocol(b'e', "Decodable"),
    protocol(b'F', "FloatingPoint"),
    protocol(b'G', "RandomNumberGenerator"),
    protocol(b'H', "Hashable"),
    protocol(b'j', "Numeric"),
    protocol(b'K', "BidirectionalCollection"),
    protocol(b'k', "RandomAccessCollection"),
    protocol(b'L', "Comparable"),
    protocol(b'l', "Collection"),
    protocol(b'M', "MutableCollection"),
    protocol(b'm', "RangeReplaceableCollection"),
    protocol(b'Q', "Equatable"),
    protocol(b'T', "Sequence"),
    protocol(b't', "IteratorProtocol"),
];

const MORE_STANDARD_PROTOCOLS: [StandardType; 7] = [
    protocol(b'U', "UnsignedInteger"),
    protocol(b'X', "RangeExpression"),
    protocol(b'x', "Strideable"),
    protocol(b'Y', "RawRepresentable"),
    protocol(b'y', "StringProtocol"),
    protocol(b'Z', "SignedInteger"),
    protocol(b'z', "BinaryInteger"),
];

/// Concurrency types introduced after the single letter table ran out, spelled `Sc<letter>`.
const CONCURRENCY_TYPES: [StandardType; 18] = [
    protocol(b'A', "Actor"),
    structure(b'C', "CheckedContinuation"),
    structure(b'c', "UnsafeContinuation"),
    structure(b'E', "CancellationError"),
    structure(b'e', "UnownedSerialExecutor"),
    protocol(b'F', "Executor"),
    protocol(b'f', "SerialExecutor"),
    structure(b'G', "TaskGroup"),
    structure(b'g', "ThrowingTaskGroup"),
    protocol(b'I', "AsyncIteratorProtocol"),
    protocol(b'i', "AsyncSequence"),
    structure(b'J', "UnownedJob"),
    StandardType {
        code: b'M',
        kind: StandardTypeKind::Class,
        name: "MainActor",
    },
    structure(b'P', "TaskPriority"),
    structure(b'S', "AsyncStream"),
    structure(b's', "AsyncThrowingStream"),
    structure(b'T', "Task"),
    structure(b't', "UnsafeCurrentTask"),
];

impl StandardType {
    /// Looks up a shorthand of the current mangling.
    #[must_use]
    pub fn lookup(code: u8) -> Option<Self> {
        STANDARD_TYPES
            .iter()
            .chain(&MORE_STANDARD_PROTOCOLS)
            .find(|standard_type| standard_type.code == code)
            .copied()
    }

    /// Looks up a shorthand spelled `Sc<code>`.
    #[must_use]
    pub fn lookup_concurrency(code: u8) -> Option<Self> {
        CONCURRENCY_TYPES
            .iter()
            .find(|standard_type| standard_type.code == code)
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::{
        FunctionSigSpecializationParamKind, FunctionSigSpecializationParamOptions, SpecializationParamKind,
        StandardType, StandardTypeKind, ValueWitnessKind,
    };

    #[test]
    fn test_value_witness_codes() {
        assert_eq!(ValueWitnessKind::from_code(*b"al"), Some(ValueWitnessKind::AllocateBuffer));
        assert_eq!(ValueWitnessKind::from_code(*b"xx"), Some(ValueWitnessKind::Destroy));
        assert_eq!(ValueWitnessKind::from_code(*b"zz"), None);
        assert_eq!(ValueWitnessKind::Destroy.name(), "destroy");
        assert_eq!(ValueWitnessKind::StoreEnumTagSinglePayload.code(), "st");
    }

    #[test]
    fn test_specialization_param_kind() {
        let dead = SpecializationParamKind::from_options(
            FunctionSigSpecializationParamOptions::DEAD | FunctionSigSpecializationParamOptions::SROA,
        );

        assert_eq!(dead.base(), None);
        assert!(dead.options().contains(FunctionSigSpecializationParamOptions::SROA));

        let closure = SpecializationParamKind::from_base(FunctionSigSpecializationParamKind::ClosureProp);

        assert_eq!(closure.base(), Some(FunctionSigSpecializationParamKind::ClosureProp));
        assert!(closure.options().is_empty());
    }

    #[test]
    fn test_standard_types() {
        let int = StandardType::lookup(b'i').unwrap();

        assert_eq!(int.name, "Int");
        assert_eq!(int.kind, StandardTypeKind::Structure);
        assert_eq!(StandardType::lookup(b'q').unwrap().kind, StandardTypeKind::Enum);
        assert_eq!(StandardType::lookup(b'z').unwrap().name, "BinaryInteger");
        assert_eq!(StandardType::lookup(b'g'), None);
        assert_eq!(StandardType::lookup_concurrency(b'M').unwrap().name, "MainActor");
    }
}

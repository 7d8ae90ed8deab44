//! Dynamically typed values
//!
//! [`TypedValue`] is the payload of every variable. It is a closed tagged
//! union over primitives, strings, numeric vectors, borrowed fixed-size
//! vectors and borrowed entity references. Borrowed variants hold
//! generational handles ([`VectorId`], [`EntityId`]) so they can never
//! dangle; resolving them requires the [`Universe`](crate::Universe).
//!
//! Parsing from text never changes the active variant: a string that does
//! not parse as the current type leaves the value untouched.

use std::fmt;
use std::str::FromStr;

use crate::entity::{EntityId, RefKind};
use crate::vector::VectorId;

/// Borrowed reference to an entity of a given kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityRef {
    pub kind: RefKind,
    pub id: EntityId,
}

impl EntityRef {
    pub fn new(kind: RefKind, id: EntityId) -> Self {
        Self { kind, id }
    }
}

/// A dynamically typed value
///
/// Equality compares variant and payload for owned variants and handle
/// identity for borrowed ones. Comparing different variants is `false`.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TypedValue {
    #[default]
    Empty,
    Bool(bool),
    Char(char),
    Float32(f32),
    Float64(f64),
    Int32(i32),
    UInt32(u32),
    String(String),
    VecInt8(Vec<i8>),
    VecUInt8(Vec<u8>),
    VecInt16(Vec<i16>),
    VecUInt16(Vec<u16>),
    VecInt32(Vec<i32>),
    VecUInt32(Vec<u32>),
    VecFloat32(Vec<f32>),
    /// Immutable borrow of a 3-component vector
    Vec3Ref(VectorId),
    /// Mutable borrow of a 3-component vector
    Vec3Mut(VectorId),
    /// Immutable borrow of a 4-component vector
    Vec4Ref(VectorId),
    /// Mutable borrow of a 4-component vector
    Vec4Mut(VectorId),
    /// Borrow of an entity
    Entity(EntityRef),
}

impl TypedValue {
    /// Stable type tag used for diagnostics and type-directed parsing
    pub fn get_datatype(&self) -> &'static str {
        match self {
            TypedValue::Empty => "empty",
            TypedValue::Bool(_) => "bool",
            TypedValue::Char(_) => "char",
            TypedValue::Float32(_) => "f32",
            TypedValue::Float64(_) => "f64",
            TypedValue::Int32(_) => "i32",
            TypedValue::UInt32(_) => "u32",
            TypedValue::String(_) => "String",
            TypedValue::VecInt8(_) => "Vec<i8>",
            TypedValue::VecUInt8(_) => "Vec<u8>",
            TypedValue::VecInt16(_) => "Vec<i16>",
            TypedValue::VecUInt16(_) => "Vec<u16>",
            TypedValue::VecInt32(_) => "Vec<i32>",
            TypedValue::VecUInt32(_) => "Vec<u32>",
            TypedValue::VecFloat32(_) => "Vec<f32>",
            TypedValue::Vec3Ref(_) => "&Vec3",
            TypedValue::Vec3Mut(_) => "&mut Vec3",
            TypedValue::Vec4Ref(_) => "&Vec4",
            TypedValue::Vec4Mut(_) => "&mut Vec4",
            TypedValue::Entity(entity) => entity.kind.datatype(),
        }
    }

    /// Parse `value` according to the type named by `datatype`
    ///
    /// Returns `None` for unknown type names, for borrowed types (which need a
    /// universe to resolve) and when the string does not parse.
    pub fn from_type_and_str(datatype: &str, value: &str) -> Option<Self> {
        let parsed = match datatype {
            "bool" => TypedValue::Bool(parse_bool(value)?),
            "char" => TypedValue::Char(parse_char(value)?),
            "f32" | "float" => TypedValue::Float32(parse_f32(value)?),
            "f64" | "double" => TypedValue::Float64(parse_f64(value)?),
            "i32" | "int32_t" => TypedValue::Int32(parse_i32(value)?),
            "u32" | "uint32_t" => TypedValue::UInt32(parse_u32(value)?),
            "String" | "string" | "std::string" => TypedValue::String(value.to_string()),
            "Vec<i8>" => TypedValue::VecInt8(parse_vec(value, parse_signed)?),
            "Vec<u8>" => TypedValue::VecUInt8(parse_vec(value, parse_unsigned)?),
            "Vec<i16>" => TypedValue::VecInt16(parse_vec(value, parse_signed)?),
            "Vec<u16>" => TypedValue::VecUInt16(parse_vec(value, parse_unsigned)?),
            "Vec<i32>" => TypedValue::VecInt32(parse_vec(value, parse_signed)?),
            "Vec<u32>" => TypedValue::VecUInt32(parse_vec(value, parse_unsigned)?),
            "Vec<f32>" => TypedValue::VecFloat32(parse_vec(value, parse_f32)?),
            _ => return None,
        };
        Some(parsed)
    }

    /// Re-parse `value` into the currently active variant
    ///
    /// On failure returns `false` and leaves `self` unchanged. Borrowed
    /// variants and `Empty` always fail here; see
    /// [`Universe::assign_from_str`](crate::Universe::assign_from_str) for the
    /// universe-aware version.
    pub fn set_new_value(&mut self, value: &str) -> bool {
        fn assign<T>(slot: &mut T, parsed: Option<T>) -> bool {
            match parsed {
                Some(parsed) => {
                    *slot = parsed;
                    true
                }
                None => false,
            }
        }

        match self {
            TypedValue::Bool(slot) => assign(slot, parse_bool(value)),
            TypedValue::Char(slot) => assign(slot, parse_char(value)),
            TypedValue::Float32(slot) => assign(slot, parse_f32(value)),
            TypedValue::Float64(slot) => assign(slot, parse_f64(value)),
            TypedValue::Int32(slot) => assign(slot, parse_i32(value)),
            TypedValue::UInt32(slot) => assign(slot, parse_u32(value)),
            TypedValue::String(slot) => assign(slot, Some(value.to_string())),
            TypedValue::VecInt8(slot) => assign(slot, parse_vec(value, parse_signed)),
            TypedValue::VecUInt8(slot) => assign(slot, parse_vec(value, parse_unsigned)),
            TypedValue::VecInt16(slot) => assign(slot, parse_vec(value, parse_signed)),
            TypedValue::VecUInt16(slot) => assign(slot, parse_vec(value, parse_unsigned)),
            TypedValue::VecInt32(slot) => assign(slot, parse_vec(value, parse_signed)),
            TypedValue::VecUInt32(slot) => assign(slot, parse_vec(value, parse_unsigned)),
            TypedValue::VecFloat32(slot) => assign(slot, parse_vec(value, parse_f32)),
            TypedValue::Empty
            | TypedValue::Vec3Ref(_)
            | TypedValue::Vec3Mut(_)
            | TypedValue::Vec4Ref(_)
            | TypedValue::Vec4Mut(_)
            | TypedValue::Entity(_) => false,
        }
    }

    /// Whether this variant borrows a referent instead of owning its data
    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            TypedValue::Vec3Ref(_)
                | TypedValue::Vec3Mut(_)
                | TypedValue::Vec4Ref(_)
                | TypedValue::Vec4Mut(_)
                | TypedValue::Entity(_)
        )
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            TypedValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            TypedValue::Float32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            TypedValue::Float64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            TypedValue::Int32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self {
            TypedValue::UInt32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            TypedValue::String(v) => Some(v),
            _ => None,
        }
    }

    /// The vector handle of any fixed-size vector variant
    pub fn as_vector(&self) -> Option<VectorId> {
        match self {
            TypedValue::Vec3Ref(id)
            | TypedValue::Vec3Mut(id)
            | TypedValue::Vec4Ref(id)
            | TypedValue::Vec4Mut(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_entity(&self) -> Option<EntityRef> {
        match self {
            TypedValue::Entity(entity) => Some(*entity),
            _ => None,
        }
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
            write!(f, "[")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{item}")?;
            }
            write!(f, "]")
        }

        match self {
            TypedValue::Empty => Ok(()),
            TypedValue::Bool(v) => write!(f, "{v}"),
            TypedValue::Char(v) => write!(f, "{v}"),
            TypedValue::Float32(v) => write!(f, "{v:.6}"),
            TypedValue::Float64(v) => write!(f, "{v:.6}"),
            TypedValue::Int32(v) => write!(f, "{v}"),
            TypedValue::UInt32(v) => write!(f, "{v}"),
            TypedValue::String(v) => write!(f, "{v}"),
            TypedValue::VecInt8(v) => list(f, v),
            TypedValue::VecUInt8(v) => list(f, v),
            TypedValue::VecInt16(v) => list(f, v),
            TypedValue::VecUInt16(v) => list(f, v),
            TypedValue::VecInt32(v) => list(f, v),
            TypedValue::VecUInt32(v) => list(f, v),
            TypedValue::VecFloat32(v) => list(f, v),
            TypedValue::Vec3Ref(id)
            | TypedValue::Vec3Mut(id)
            | TypedValue::Vec4Ref(id)
            | TypedValue::Vec4Mut(id) => write!(f, "{} {:?}", self.get_datatype(), id),
            TypedValue::Entity(entity) => write!(f, "{} {:?}", entity.kind.datatype(), entity.id),
        }
    }
}

macro_rules! impl_from {
    ($($source:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$source> for TypedValue {
                fn from(value: $source) -> Self {
                    TypedValue::$variant(value)
                }
            }
        )*
    };
}

impl_from! {
    bool => Bool,
    char => Char,
    f32 => Float32,
    f64 => Float64,
    i32 => Int32,
    u32 => UInt32,
    String => String,
    Vec<i8> => VecInt8,
    Vec<u8> => VecUInt8,
    Vec<i16> => VecInt16,
    Vec<u16> => VecUInt16,
    Vec<i32> => VecInt32,
    Vec<u32> => VecUInt32,
    Vec<f32> => VecFloat32,
    EntityRef => Entity,
}

impl From<&str> for TypedValue {
    fn from(value: &str) -> Self {
        TypedValue::String(value.to_string())
    }
}

// =============================================================================
// TEXT GRAMMAR
// =============================================================================

/// `true` or `false`, case sensitive
pub fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// Exactly one character
pub fn parse_char(s: &str) -> Option<char> {
    let mut chars = s.chars();
    let c = chars.next()?;
    chars.next().is_none().then_some(c)
}

/// Optional `-`, digits, at most one `.` that is not the last character.
/// Returns the number of integer digits.
fn decimal_integer_digits(s: &str) -> Option<usize> {
    let body = s.strip_prefix('-').unwrap_or(s);
    if body.is_empty() || body.ends_with('.') {
        return None;
    }

    let mut dots = 0;
    let mut digits = 0;
    let mut integer_digits = 0;
    for c in body.chars() {
        match c {
            '.' => dots += 1,
            '0'..='9' => {
                digits += 1;
                if dots == 0 {
                    integer_digits += 1;
                }
            }
            _ => return None,
        }
    }

    (dots <= 1 && digits > 0).then_some(integer_digits)
}

pub fn parse_f32(s: &str) -> Option<f32> {
    match decimal_integer_digits(s)? {
        0..=38 => s.parse().ok(),
        _ => None,
    }
}

pub fn parse_f64(s: &str) -> Option<f64> {
    match decimal_integer_digits(s)? {
        0..=308 => s.parse().ok(),
        _ => None,
    }
}

/// Optional `-` followed by digits, in range for `T`
pub fn parse_signed<T: FromStr>(s: &str) -> Option<T> {
    let digits = s.strip_prefix('-').unwrap_or(s);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Digits only, in range for `T`
pub fn parse_unsigned<T: FromStr>(s: &str) -> Option<T> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

pub fn parse_i32(s: &str) -> Option<i32> {
    parse_signed(s)
}

pub fn parse_u32(s: &str) -> Option<u32> {
    parse_unsigned(s)
}

/// Elements separated by whitespace and/or commas, optionally in brackets.
/// Every element must parse or the whole vector is rejected.
pub fn parse_vec<T>(s: &str, parse: impl Fn(&str) -> Option<T>) -> Option<Vec<T>> {
    let trimmed = s.trim();
    let inner = match (trimmed.strip_prefix('['), trimmed.ends_with(']')) {
        (Some(rest), true) => rest.strip_suffix(']')?,
        (None, false) => trimmed,
        _ => return None,
    };

    inner
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|element| !element.is_empty())
        .map(parse)
        .collect()
}

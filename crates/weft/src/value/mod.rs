//! Closed value model shared by symbols, handlers, and option storage.
//!
//! The parser hands back loosely typed matches; handlers want concrete Rust
//! types. [`ValueKind`] is the tag the tree builder records per symbol,
//! [`Value`] carries a parsed or default value, and [`ValueType`] converts
//! between the two for each supported Rust type.

use std::fmt;
use std::path::PathBuf;

/// The set of value types a symbol may carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueKind {
    /// `true` / `false`.
    Bool,
    /// Integer within inclusive bounds.
    Integer(IntegerRange),
    /// UTF-8 text.
    String,
    /// File-system path.
    Path,
    /// One of a fixed set of names.
    Enum(&'static [&'static str]),
    /// Zero or more values of the inner kind.
    Array(Box<ValueKind>),
}

impl ValueKind {
    /// An integer kind spanning the whole of `i64`.
    #[must_use]
    pub const fn integer() -> Self {
        Self::Integer(IntegerRange::FULL)
    }

    /// Returns `true` for array kinds.
    #[must_use]
    pub const fn is_array(&self) -> bool {
        matches!(self, Self::Array(_))
    }

    /// Returns `true` when the kind nests an array inside an array.
    #[must_use]
    pub fn is_nested_array(&self) -> bool {
        match self {
            Self::Array(inner) => inner.is_array(),
            _ => false,
        }
    }

    /// Compares kinds while ignoring integer bounds.
    #[must_use]
    pub fn same_shape(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Integer(_), Self::Integer(_)) => true,
            (Self::Array(left), Self::Array(right)) => left.same_shape(right),
            _ => self == other,
        }
    }
}

/// Inclusive bounds carried by [`ValueKind::Integer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntegerRange {
    /// Smallest accepted value.
    pub min: i64,
    /// Largest accepted value.
    pub max: i64,
}

impl IntegerRange {
    /// Every `i64`.
    pub const FULL: Self = Self::new(i64::MIN, i64::MAX);

    /// Creates a bounds pair.
    #[must_use]
    pub const fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    /// Returns `true` when `number` lies within the bounds.
    #[must_use]
    pub const fn contains(self, number: i64) -> bool {
        self.min <= number && number <= self.max
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => f.write_str("bool"),
            Self::Integer(range) if *range == IntegerRange::FULL => f.write_str("integer"),
            Self::Integer(range) => write!(f, "integer in {}..={}", range.min, range.max),
            Self::String => f.write_str("string"),
            Self::Path => f.write_str("path"),
            Self::Enum(variants) => write!(f, "one of [{}]", variants.join(", ")),
            Self::Array(inner) => write!(f, "array of {inner}"),
        }
    }
}

/// A parsed, defaulted, or stored value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Integer(i64),
    /// Text value.
    String(String),
    /// Path value.
    Path(PathBuf),
    /// Enum variant name.
    Enum(String),
    /// Array of values sharing one kind.
    Array(Vec<Value>),
}

impl Value {
    /// Returns `true` when the value can be stored in a slot of `kind`.
    #[must_use]
    pub fn matches_kind(&self, kind: &ValueKind) -> bool {
        match (self, kind) {
            (Self::Integer(number), ValueKind::Integer(range)) => range.contains(*number),
            (Self::Bool(_), ValueKind::Bool)
            | (Self::String(_), ValueKind::String)
            | (Self::Path(_), ValueKind::Path) => true,
            (Self::Enum(name), ValueKind::Enum(variants)) => variants.contains(&name.as_str()),
            (Self::Array(items), ValueKind::Array(inner)) => {
                items.iter().all(|item| item.matches_kind(inner))
            }
            _ => false,
        }
    }

    /// The value an absent, non-required symbol falls back to when it has no
    /// default provider: `false` for booleans, empty for arrays.
    #[must_use]
    pub const fn implicit_for(kind: &ValueKind) -> Option<Self> {
        match kind {
            ValueKind::Bool => Some(Self::Bool(false)),
            ValueKind::Array(_) => Some(Self::Array(Vec::new())),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Integer(value) => write!(f, "{value}"),
            Self::String(value) | Self::Enum(value) => f.write_str(value),
            Self::Path(value) => write!(f, "{}", value.display()),
            Self::Array(items) => {
                let rendered: Vec<String> = items.iter().map(ToString::to_string).collect();
                write!(f, "[{}]", rendered.join(", "))
            }
        }
    }
}

/// Conversion between a Rust type and the closed [`Value`] model.
///
/// Implemented for the built-in scalar types, `PathBuf`, and `Vec<T>`. User
/// enums implement it by hand, reporting [`ValueKind::Enum`] with the
/// accepted names:
///
/// ```
/// use weft::{Value, ValueKind, ValueType};
///
/// #[derive(Clone, Copy, Debug, PartialEq)]
/// enum Colour { Red, Green }
///
/// impl ValueType for Colour {
///     fn kind() -> ValueKind {
///         ValueKind::Enum(&["red", "green"])
///     }
///
///     fn from_value(value: Value) -> Option<Self> {
///         match value {
///             Value::Enum(name) if name == "red" => Some(Self::Red),
///             Value::Enum(name) if name == "green" => Some(Self::Green),
///             _ => None,
///         }
///     }
///
///     fn into_value(self) -> Value {
///         let name = match self {
///             Self::Red => "red",
///             Self::Green => "green",
///         };
///         Value::Enum(name.to_owned())
///     }
/// }
///
/// assert_eq!(Colour::from_value(Colour::Green.into_value()), Some(Colour::Green));
/// ```
pub trait ValueType: Sized + Clone + Send + Sync + 'static {
    /// The kind tag recorded for symbols of this type.
    fn kind() -> ValueKind;

    /// Converts a value into `Self`, returning `None` on a kind mismatch.
    fn from_value(value: Value) -> Option<Self>;

    /// Converts `self` into a value.
    fn into_value(self) -> Value;
}

impl ValueType for bool {
    fn kind() -> ValueKind {
        ValueKind::Bool
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Bool(flag) => Some(flag),
            _ => None,
        }
    }

    fn into_value(self) -> Value {
        Value::Bool(self)
    }
}

impl ValueType for i64 {
    fn kind() -> ValueKind {
        ValueKind::integer()
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Integer(number) => Some(number),
            _ => None,
        }
    }

    fn into_value(self) -> Value {
        Value::Integer(self)
    }
}

macro_rules! narrow_integer {
    ($($ty:ty),+) => {
        $(
            impl ValueType for $ty {
                fn kind() -> ValueKind {
                    ValueKind::Integer(IntegerRange::new(
                        i64::from(<$ty>::MIN),
                        i64::from(<$ty>::MAX),
                    ))
                }

                fn from_value(value: Value) -> Option<Self> {
                    match value {
                        Value::Integer(number) => <$ty>::try_from(number).ok(),
                        _ => None,
                    }
                }

                fn into_value(self) -> Value {
                    Value::Integer(i64::from(self))
                }
            }
        )+
    };
}

// Only widths that embed losslessly in `i64`.
narrow_integer!(i8, u8, i16, u16, i32, u32);

impl ValueType for String {
    fn kind() -> ValueKind {
        ValueKind::String
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::String(text) | Value::Enum(text) => Some(text),
            _ => None,
        }
    }

    fn into_value(self) -> Value {
        Value::String(self)
    }
}

impl ValueType for PathBuf {
    fn kind() -> ValueKind {
        ValueKind::Path
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Path(path) => Some(path),
            Value::String(text) => Some(Self::from(text)),
            _ => None,
        }
    }

    fn into_value(self) -> Value {
        Value::Path(self)
    }
}

impl<T: ValueType> ValueType for Vec<T> {
    fn kind() -> ValueKind {
        ValueKind::Array(Box::new(T::kind()))
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Array(items) => items.into_iter().map(T::from_value).collect(),
            _ => None,
        }
    }

    fn into_value(self) -> Value {
        Value::Array(self.into_iter().map(ValueType::into_value).collect())
    }
}

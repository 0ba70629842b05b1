//! Backing storage for global and recursive options.
//!
//! Handlers may read global options directly from static storage instead of
//! receiving them as parameters. An [`OptionCell`] is that storage; an
//! [`OptionField`] pairs a cell with its option metadata, and an
//! [`OptionSet`] groups fields the way a container type groups static
//! members. The dispatcher overwrites every registered cell once per
//! invocation, before any hook or handler runs.

use std::fmt;

use parking_lot::RwLock;

use crate::descriptor::Descriptor;
use crate::value::{Value, ValueKind, ValueType};

/// Process-wide storage for one option value.
///
/// ```
/// use weft::OptionCell;
///
/// static VERBOSE: OptionCell<bool> = OptionCell::new(false);
///
/// VERBOSE.set(true);
/// assert!(VERBOSE.get());
/// ```
pub struct OptionCell<T> {
    value: RwLock<T>,
}

impl<T> OptionCell<T> {
    /// Creates a cell holding `value`. Usable in `static` initialisers.
    pub const fn new(value: T) -> Self {
        Self {
            value: RwLock::new(value),
        }
    }

    /// Replaces the stored value.
    pub fn set(&self, value: T) {
        *self.value.write() = value;
    }
}

impl<T: Clone> OptionCell<T> {
    /// Returns a copy of the stored value.
    #[must_use]
    pub fn get(&self) -> T {
        self.value.read().clone()
    }
}

impl<T: fmt::Debug> fmt::Debug for OptionCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptionCell")
            .field("value", &*self.value.read())
            .finish()
    }
}

/// Type-erased access to an [`OptionCell`].
pub(crate) trait FieldStorage: Send + Sync {
    fn kind(&self) -> ValueKind;
    fn read(&self) -> Value;
    /// Returns `false` and leaves the cell untouched on a kind mismatch.
    fn write(&self, value: Value) -> bool;
}

impl<T: ValueType> FieldStorage for OptionCell<T> {
    fn kind(&self) -> ValueKind {
        T::kind()
    }

    fn read(&self) -> Value {
        self.get().into_value()
    }

    fn write(&self, value: Value) -> bool {
        match T::from_value(value) {
            Some(typed) => {
                self.set(typed);
                true
            }
            None => false,
        }
    }
}

/// A static option field: member name, metadata, and backing cell.
pub struct OptionField {
    member: String,
    descriptor: Descriptor,
    storage: &'static dyn FieldStorage,
}

impl OptionField {
    /// Declares an option backed by `cell`. The option name derives from
    /// `member` unless the descriptor names it explicitly.
    pub fn new<T: ValueType>(member: impl Into<String>, cell: &'static OptionCell<T>) -> Self {
        Self {
            member: member.into(),
            descriptor: Descriptor::option(),
            storage: cell,
        }
    }

    /// Replaces the option metadata.
    #[must_use]
    pub fn with(mut self, descriptor: Descriptor) -> Self {
        self.descriptor = descriptor;
        self
    }

    /// The member name.
    #[must_use]
    pub fn member(&self) -> &str {
        &self.member
    }

    /// The option metadata.
    #[must_use]
    pub const fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    pub(crate) fn storage(&self) -> &'static dyn FieldStorage {
        self.storage
    }
}

impl fmt::Debug for OptionField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptionField")
            .field("member", &self.member)
            .field("descriptor", &self.descriptor)
            .field("kind", &self.storage.kind())
            .finish()
    }
}

/// A named container of option fields.
///
/// Sets referenced by a command through
/// [`crate::CommandDecl::recursive_options`] become recursive options of
/// that command. Every other set is global.
#[derive(Debug)]
pub struct OptionSet {
    name: String,
    fields: Vec<OptionField>,
}

impl OptionSet {
    /// Creates an empty set.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Adds a field.
    #[must_use]
    pub fn field(mut self, field: OptionField) -> Self {
        self.fields.push(field);
        self
    }

    /// The set name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fields in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[OptionField] {
        &self.fields
    }
}

/// Captured storage location plus the value it held when the tree was built.
pub(crate) struct GlobalOptionInitializer {
    pub(crate) symbol: crate::tree::SymbolId,
    pub(crate) storage: &'static dyn FieldStorage,
    pub(crate) default: Value,
}

impl GlobalOptionInitializer {
    /// Writes `parsed` (or the build-time default) into the backing cell.
    pub(crate) fn apply(&self, parsed: Option<Value>) -> bool {
        self.storage
            .write(parsed.unwrap_or_else(|| self.default.clone()))
    }

    pub(crate) fn reset(&self) {
        self.storage.write(self.default.clone());
    }
}

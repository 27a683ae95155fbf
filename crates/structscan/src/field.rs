//! Field descriptors: one per mapped leaf of a record layout.

use std::any::{Any, TypeId};
use std::fmt;

use crate::record::Scan;
use crate::value::{Value, ValueType};

/// Decodes a non-NULL raw value into a boxed leaf value.
pub type DecodeFn = fn(&Value) -> Result<Box<dyn Any + Send>, String>;

/// The concrete Rust type of a leaf field together with its decoder.
#[derive(Clone, Copy)]
pub struct LeafType {
    value_type: ValueType,
    type_id: TypeId,
    type_name: &'static str,
    decode: DecodeFn,
}

fn decode_boxed<T: Scan>(value: &Value) -> Result<Box<dyn Any + Send>, String> {
    T::scan(value).map(|v| Box::new(v) as Box<dyn Any + Send>)
}

impl LeafType {
    pub fn of<T: Scan>() -> Self {
        LeafType {
            value_type: T::VALUE_TYPE,
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            decode: decode_boxed::<T>,
        }
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn decode(&self, value: &Value) -> Result<Box<dyn Any + Send>, String> {
        (self.decode)(value)
    }
}

impl PartialEq for LeafType {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for LeafType {}

impl fmt::Debug for LeafType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LeafType")
            .field("value_type", &self.value_type)
            .field("type_name", &self.type_name)
            .finish()
    }
}

/// A mapped leaf field of a record type.
///
/// `path` is the dotted column path relative to the record root,
/// `index_path` the structural positions leading from the root to the field.
/// Descriptors are built once by layout resolution and never change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    path: String,
    leaf: LeafType,
    index_path: Vec<usize>,
    optional: bool,
}

impl FieldDescriptor {
    pub(crate) fn new(path: String, leaf: LeafType, index_path: Vec<usize>, optional: bool) -> Self {
        FieldDescriptor {
            path,
            leaf,
            index_path,
            optional,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn value_type(&self) -> ValueType {
        self.leaf.value_type()
    }

    pub fn leaf(&self) -> &LeafType {
        &self.leaf
    }

    pub fn index_path(&self) -> &[usize] {
        &self.index_path
    }

    /// Whether the leaf itself is declared as `Option<T>`.
    pub fn is_optional(&self) -> bool {
        self.optional
    }
}

impl fmt::Display for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.value_type())?;
        if self.optional {
            write!(f, "?")?;
        }
        write!(f, " @ {:?}", self.index_path)
    }
}

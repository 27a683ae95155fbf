//! Record and field declarations.
//!
//! Rust has no runtime reflection, so every record type carries an explicit
//! field table ([`Record::fields`]) and a positional accessor
//! ([`Record::field`]). The [`record!`](crate::record!) macro generates both
//! from an ordinary struct definition. Field types take part through
//! [`Field`]:
//!
//! - every [`Scan`] type is a leaf, scanned directly from one column
//! - `Option<T>` is the optional form of any field type (one level deep)
//! - `record!` types are records, flattened into dotted column paths
//!
//! The [`Target`] handles let the scanner walk an index path through live
//! values without knowing their concrete types.

use std::any::{Any, TypeId};
use std::fmt;

use chrono::{DateTime, Utc};

use crate::field::LeafType;
use crate::value::{Value, ValueType};

// ── Capability traits ────────────────────────────────────────────────

/// Self-scanning capability: a type that decodes itself from one raw column.
///
/// Implementing `Scan` makes a type a leaf, even if it is a struct: it is
/// never flattened into nested column paths. SQL NULL never reaches
/// [`Scan::scan`]; a NULL column leaves the field at `Default::default()`.
pub trait Scan: Sized + Default + Send + 'static {
    /// The semantic type reported in layouts and decode errors.
    const VALUE_TYPE: ValueType;

    /// Decode a non-NULL column value.
    fn scan(value: &Value) -> Result<Self, String>;
}

/// A type that can appear as a mapped field of a record.
pub trait Field: 'static {
    /// Static description of the field type, used by layout resolution.
    fn shape() -> FieldShape;

    /// Live handle used by nested assignment.
    fn target(&mut self) -> Target<'_>;
}

/// A record type whose mapped fields are resolved into a layout.
pub trait Record: 'static {
    /// Display name used in layouts and panic messages.
    fn name() -> &'static str
    where
        Self: Sized,
    {
        std::any::type_name::<Self>()
    }

    /// Every declared field, in declaration order, mapped or not.
    fn fields() -> Vec<FieldDecl>
    where
        Self: Sized;

    /// Handle to the mapped field at `position`, or `None` if the position is
    /// out of range or the field there is not mapped.
    fn field(&mut self, position: usize) -> Option<Target<'_>>;
}

// ── Static shapes ────────────────────────────────────────────────────

/// Static description of a record type.
#[derive(Clone, Copy)]
pub struct RecordShape {
    name: &'static str,
    type_id: TypeId,
    fields: fn() -> Vec<FieldDecl>,
}

impl RecordShape {
    pub fn of<R: Record>() -> Self {
        RecordShape {
            name: R::name(),
            type_id: TypeId::of::<R>(),
            fields: R::fields,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn fields(&self) -> Vec<FieldDecl> {
        (self.fields)()
    }
}

impl fmt::Debug for RecordShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordShape").field("name", &self.name).finish()
    }
}

/// Static description of a field type.
#[derive(Debug, Clone)]
pub enum FieldShape {
    Leaf(LeafType),
    Record(RecordShape),
    Optional(Box<FieldShape>),
}

/// One declared field of a record: its identifier, its structural position,
/// and, when mapped, its column name and field shape.
#[derive(Clone, Copy)]
pub struct FieldDecl {
    ident: &'static str,
    position: usize,
    mapping: Option<(&'static str, fn() -> FieldShape)>,
}

impl FieldDecl {
    pub const fn mapped(
        ident: &'static str,
        position: usize,
        column: &'static str,
        shape: fn() -> FieldShape,
    ) -> Self {
        FieldDecl {
            ident,
            position,
            mapping: Some((column, shape)),
        }
    }

    pub const fn unmapped(ident: &'static str, position: usize) -> Self {
        FieldDecl {
            ident,
            position,
            mapping: None,
        }
    }

    pub fn ident(&self) -> &'static str {
        self.ident
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// Column name (or path segment) this field is mapped under.
    pub fn column(&self) -> Option<&'static str> {
        self.mapping.map(|(column, _)| column)
    }

    pub fn shape(&self) -> Option<FieldShape> {
        self.mapping.map(|(_, shape)| shape())
    }
}

impl fmt::Debug for FieldDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDecl")
            .field("ident", &self.ident)
            .field("position", &self.position)
            .field("column", &self.column())
            .finish()
    }
}

// ── Live handles ─────────────────────────────────────────────────────

/// Mutable handle to a field inside a live record.
pub enum Target<'a> {
    Leaf(&'a mut dyn Leaf),
    Record(&'a mut dyn Record),
    Optional(&'a mut dyn Optional),
}

/// A leaf field that accepts a decoded value.
pub trait Leaf {
    /// Store `value`, or reset to the zero value on `None`. A value of the
    /// wrong type is handed back unchanged.
    fn assign(&mut self, value: Option<Box<dyn Any + Send>>) -> Result<(), Box<dyn Any + Send>>;

    fn type_name(&self) -> &'static str;
}

/// An optional field wrapping a leaf or a record.
pub trait Optional {
    fn is_set(&self) -> bool;

    fn clear(&mut self);

    /// Handle to the wrapped value, creating a zero-valued one if unset.
    fn instantiate(&mut self) -> Target<'_>;
}

impl<T: Scan> Leaf for T {
    fn assign(&mut self, value: Option<Box<dyn Any + Send>>) -> Result<(), Box<dyn Any + Send>> {
        match value {
            None => *self = T::default(),
            Some(boxed) => *self = *boxed.downcast::<T>()?,
        }
        Ok(())
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

impl<T: Scan> Field for T {
    fn shape() -> FieldShape {
        FieldShape::Leaf(LeafType::of::<T>())
    }

    fn target(&mut self) -> Target<'_> {
        Target::Leaf(self)
    }
}

impl<T: Field + Default> Optional for Option<T> {
    fn is_set(&self) -> bool {
        self.is_some()
    }

    fn clear(&mut self) {
        *self = None;
    }

    fn instantiate(&mut self) -> Target<'_> {
        self.get_or_insert_with(T::default).target()
    }
}

impl<T: Field + Default> Field for Option<T> {
    fn shape() -> FieldShape {
        FieldShape::Optional(Box::new(T::shape()))
    }

    fn target(&mut self) -> Target<'_> {
        Target::Optional(self)
    }
}

// ── Built-in leaves ──────────────────────────────────────────────────

fn mismatch(value: &Value, target: &str) -> String {
    format!("cannot scan {} value into {}", value.kind(), target)
}

/// The text of a `Text` value, or of a `Bytes` value holding UTF-8.
/// Text-protocol drivers deliver numbers and booleans this way.
fn textual(value: &Value) -> Option<&str> {
    match value {
        Value::Text(s) => Some(s.as_str()),
        Value::Bytes(b) => std::str::from_utf8(b).ok(),
        _ => None,
    }
}

fn parse_int(value: &Value, target: &str) -> Result<i64, String> {
    match value {
        Value::Int(v) => Ok(*v),
        other => match textual(other) {
            Some(s) => s
                .parse::<i64>()
                .map_err(|e| format!("invalid integer '{s}' for {target}: {e}")),
            None => Err(mismatch(other, target)),
        },
    }
}

/// Accepts the spellings `1 t T TRUE true True` and `0 f F FALSE false False`.
fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

impl Scan for String {
    const VALUE_TYPE: ValueType = ValueType::Text;

    fn scan(value: &Value) -> Result<Self, String> {
        match value {
            Value::Text(s) => Ok(s.clone()),
            Value::Bytes(b) => {
                String::from_utf8(b.clone()).map_err(|e| format!("invalid UTF-8 text: {e}"))
            }
            other => Err(mismatch(other, "String")),
        }
    }
}

impl Scan for i64 {
    const VALUE_TYPE: ValueType = ValueType::Integer;

    fn scan(value: &Value) -> Result<Self, String> {
        parse_int(value, "i64")
    }
}

impl Scan for i32 {
    const VALUE_TYPE: ValueType = ValueType::Integer;

    fn scan(value: &Value) -> Result<Self, String> {
        let v = parse_int(value, "i32")?;
        i32::try_from(v).map_err(|_| format!("integer {v} out of range for i32"))
    }
}

/// Integers are accepted only when they convert to `f64` exactly.
impl Scan for f64 {
    const VALUE_TYPE: ValueType = ValueType::Float;

    fn scan(value: &Value) -> Result<Self, String> {
        match value {
            Value::Float(v) => Ok(*v),
            Value::Int(v) => {
                let f = *v as f64;
                if f as i128 == i128::from(*v) {
                    Ok(f)
                } else {
                    Err(format!("integer {v} cannot be represented exactly as f64"))
                }
            }
            other => match textual(other) {
                Some(s) => s
                    .parse::<f64>()
                    .map_err(|e| format!("invalid float '{s}' for f64: {e}")),
                None => Err(mismatch(other, "f64")),
            },
        }
    }
}

impl Scan for bool {
    const VALUE_TYPE: ValueType = ValueType::Boolean;

    fn scan(value: &Value) -> Result<Self, String> {
        match value {
            Value::Bool(v) => Ok(*v),
            Value::Int(0) => Ok(false),
            Value::Int(1) => Ok(true),
            Value::Int(v) => Err(format!("integer {v} is not a boolean")),
            other => match textual(other) {
                Some(s) => parse_bool(s).ok_or_else(|| format!("invalid boolean '{s}'")),
                None => Err(mismatch(other, "bool")),
            },
        }
    }
}

impl Scan for Vec<u8> {
    const VALUE_TYPE: ValueType = ValueType::Bytes;

    fn scan(value: &Value) -> Result<Self, String> {
        match value {
            Value::Bytes(b) => Ok(b.clone()),
            Value::Text(s) => Ok(s.clone().into_bytes()),
            other => Err(mismatch(other, "Vec<u8>")),
        }
    }
}

/// The designated timestamp leaf.
impl Scan for DateTime<Utc> {
    const VALUE_TYPE: ValueType = ValueType::Timestamp;

    fn scan(value: &Value) -> Result<Self, String> {
        match value {
            Value::Timestamp(t) => Ok(*t),
            Value::Text(s) => DateTime::parse_from_rfc3339(s)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|e| format!("invalid timestamp '{s}': {e}")),
            other => Err(mismatch(other, "DateTime<Utc>")),
        }
    }
}

// ── Declaration macro ────────────────────────────────────────────────

/// Declare a struct together with its [`Record`] field table.
///
/// A field is mapped when it is followed by `=> "column"`; other fields are
/// declared as written and ignored by scanning.
///
/// ```
/// use structscan::record;
///
/// record! {
///     #[derive(Debug, Default)]
///     pub struct Address {
///         pub street: String => "street",
///         pub zip: Option<String> => "zip",
///     }
/// }
///
/// record! {
///     #[derive(Debug, Default)]
///     pub struct User {
///         pub id: i64 => "id",
///         pub address: Option<Address> => "address",
///         pub cache_hits: u64,
///     }
/// }
/// ```
///
/// `User` maps the columns `id`, `address.street` and `address.zip`.
#[macro_export]
macro_rules! record {
    (@decl $fname:ident, $fty:ty, $position:expr, $column:literal) => {
        $crate::FieldDecl::mapped(
            stringify!($fname),
            $position,
            $column,
            <$fty as $crate::Field>::shape,
        )
    };

    (@decl $fname:ident, $fty:ty, $position:expr) => {
        $crate::FieldDecl::unmapped(stringify!($fname), $position)
    };

    (@field $this:ident, $position:ident, $index:ident, $fname:ident, $column:literal) => {
        if $index == $position {
            return ::std::option::Option::Some($crate::Field::target(&mut $this.$fname));
        }
    };

    (@field $this:ident, $position:ident, $index:ident, $fname:ident) => {};

    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$fmeta:meta])*
                $fvis:vis $fname:ident : $fty:ty $(=> $column:literal)?
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(
                $(#[$fmeta])*
                $fvis $fname: $fty,
            )*
        }

        impl $crate::Record for $name {
            fn name() -> &'static str {
                stringify!($name)
            }

            #[allow(unused_assignments, unused_mut, unused_variables)]
            fn fields() -> ::std::vec::Vec<$crate::FieldDecl> {
                let mut fields = ::std::vec::Vec::new();
                let mut position = 0usize;
                $(
                    fields.push($crate::record!(@decl $fname, $fty, position $(, $column)?));
                    position += 1;
                )*
                fields
            }

            #[allow(unused_assignments, unused_mut, unused_variables)]
            fn field(&mut self, position: usize) -> ::std::option::Option<$crate::Target<'_>> {
                let mut index = 0usize;
                $(
                    $crate::record!(@field self, position, index, $fname $(, $column)?);
                    index += 1;
                )*
                ::std::option::Option::None
            }
        }

        impl $crate::Field for $name {
            fn shape() -> $crate::FieldShape {
                $crate::FieldShape::Record($crate::RecordShape::of::<$name>())
            }

            fn target(&mut self) -> $crate::Target<'_> {
                $crate::Target::Record(self)
            }
        }

        impl $crate::Destination for $name {
            fn fill<Q: $crate::Rows>(
                &mut self,
                rows: &mut Q,
                prefix: &str,
                config: ::std::option::Option<$crate::Config>,
            ) -> ::std::result::Result<(), $crate::Error> {
                $crate::select::fill_one(self, rows, prefix, config)
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    crate::record! {
        #[derive(Debug, Default, PartialEq)]
        struct Inner {
            label: String => "label",
        }
    }

    crate::record! {
        #[derive(Debug, Default)]
        struct Outer {
            id: i64 => "id",
            scratch: Vec<String>,
            inner: Option<Inner> => "inner",
        }
    }

    #[test]
    fn macro_emits_every_declared_field() {
        let fields = Outer::fields();
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[0].column(), Some("id"));
        assert_eq!(fields[1].ident(), "scratch");
        assert_eq!(fields[1].column(), None);
        assert!(fields[1].shape().is_none());
        assert_eq!(fields[2].position(), 2);
        assert!(matches!(fields[2].shape(), Some(FieldShape::Optional(_))));
    }

    #[test]
    fn positional_access_skips_unmapped_fields() {
        let mut outer = Outer::default();
        assert!(matches!(outer.field(0), Some(Target::Leaf(_))));
        assert!(outer.field(1).is_none());
        assert!(matches!(outer.field(2), Some(Target::Optional(_))));
        assert!(outer.field(3).is_none());
    }

    #[test]
    fn optional_instantiates_zero_value() {
        let mut slot: Option<Inner> = None;
        assert!(!slot.is_set());
        assert!(matches!(slot.instantiate(), Target::Record(_)));
        assert_eq!(slot, Some(Inner::default()));
        slot.clear();
        assert!(slot.is_none());
    }

    #[test]
    fn leaf_assign_rejects_wrong_type() {
        let mut n: i64 = 7;
        let back = n.assign(Some(Box::new("seven".to_string()))).unwrap_err();
        assert!(back.downcast::<String>().is_ok());
        assert_eq!(n, 7);
        n.assign(None).unwrap();
        assert_eq!(n, 0);
    }

    #[test]
    fn builtin_decoding_is_lenient_where_drivers_are() {
        assert_eq!(f64::scan(&Value::Int(3)).unwrap(), 3.0);
        assert!(bool::scan(&Value::Int(1)).unwrap());
        assert!(bool::scan(&Value::Int(2)).is_err());
        assert_eq!(String::scan(&Value::Bytes(b"hi".to_vec())).unwrap(), "hi");
        assert!(i32::scan(&Value::Int(i64::MAX)).is_err());
        let t = DateTime::<Utc>::scan(&Value::Text("2022-02-11T12:13:14Z".into())).unwrap();
        assert_eq!(t.to_rfc3339(), "2022-02-11T12:13:14+00:00");
    }

    #[test]
    fn numbers_and_booleans_parse_from_text_and_bytes() {
        assert_eq!(i64::scan(&Value::Text("123".into())).unwrap(), 123);
        assert_eq!(i64::scan(&Value::Bytes(b"-42".to_vec())).unwrap(), -42);
        assert_eq!(i32::scan(&Value::Text("7".into())).unwrap(), 7);
        assert_eq!(f64::scan(&Value::Text("1.5".into())).unwrap(), 1.5);
        assert_eq!(f64::scan(&Value::Bytes(b"2".to_vec())).unwrap(), 2.0);
        for s in ["1", "t", "T", "TRUE", "true", "True"] {
            assert!(bool::scan(&Value::Text(s.into())).unwrap(), "{s}");
        }
        for s in ["0", "f", "F", "FALSE", "false", "False"] {
            assert!(!bool::scan(&Value::Bytes(s.as_bytes().to_vec())).unwrap(), "{s}");
        }
    }

    #[test]
    fn malformed_text_is_rejected() {
        assert_eq!(
            i64::scan(&Value::Text("12x".into())).unwrap_err(),
            "invalid integer '12x' for i64: invalid digit found in string"
        );
        assert_eq!(
            i32::scan(&Value::Text("3000000000".into())).unwrap_err(),
            "integer 3000000000 out of range for i32"
        );
        assert!(i64::scan(&Value::Bytes(vec![0xff, 0xfe])).is_err());
        assert!(f64::scan(&Value::Text("north".into())).is_err());
        for s in ["yes", "TrUe", "2", ""] {
            assert_eq!(
                bool::scan(&Value::Text(s.into())).unwrap_err(),
                format!("invalid boolean '{s}'")
            );
        }
    }

    #[test]
    fn integers_widen_to_float_only_when_exact() {
        assert_eq!(f64::scan(&Value::Int(1 << 53)).unwrap(), 9007199254740992.0);
        assert_eq!(
            f64::scan(&Value::Int((1 << 53) + 1)).unwrap_err(),
            "integer 9007199254740993 cannot be represented exactly as f64"
        );
        assert!(f64::scan(&Value::Int(i64::MAX)).is_err());
    }

    #[test]
    fn mismatch_names_both_sides() {
        let err = i64::scan(&Value::Bool(true)).unwrap_err();
        assert_eq!(err, "cannot scan boolean value into i64");
    }
}

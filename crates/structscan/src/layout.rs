//! Record layouts and the process-wide layout cache.
//!
//! A [`Layout`] is the flattened list of mapped leaf fields of one record
//! type, plus a path-to-field lookup. Nested records are walked depth-first
//! in declaration order and their leaves are named with dotted paths
//! (`address.geo.lat`). Leaves are [`Scan`](crate::Scan) types, which
//! includes the timestamp leaf, so they are never flattened further.
//!
//! Resolution runs at most once per record type for the life of the
//! process: the result is published into a [`LayoutCache`] keyed by
//! `TypeId` and shared read-only afterwards.

use std::any::TypeId;
use std::fmt;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::field::FieldDescriptor;
use crate::record::{Field, FieldShape, Record, RecordShape};

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

/// The resolved mapped leaf fields of one record type.
#[derive(Debug)]
pub struct Layout {
    record: &'static str,
    fields: Vec<FieldDescriptor>,
    by_path: FxHashMap<String, usize>,
}

impl Layout {
    /// Resolve the layout of `shape` without consulting any cache.
    ///
    /// # Panics
    ///
    /// Panics if two mapped leaves resolve to the same path, or if a field is
    /// declared as a nested `Option<Option<_>>`. Both are defects in the
    /// record declaration.
    pub fn resolve(shape: &RecordShape) -> Layout {
        let mut fields = Vec::new();
        collect_fields(shape, None, &[], &mut fields);

        let mut by_path = FxHashMap::default();
        for (i, field) in fields.iter().enumerate() {
            if by_path.insert(field.path().to_string(), i).is_some() {
                panic!(
                    "duplicate column path '{}' in record {}",
                    field.path(),
                    shape.name()
                );
            }
        }

        Layout {
            record: shape.name(),
            fields,
            by_path,
        }
    }

    pub fn record_name(&self) -> &'static str {
        self.record
    }

    /// Leaf descriptors in depth-first declaration order.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Look up a leaf by its dotted path.
    pub fn field(&self, path: &str) -> Option<&FieldDescriptor> {
        self.position(path).map(|i| &self.fields[i])
    }

    /// Index into [`Layout::fields`] of the leaf at `path`.
    pub fn position(&self, path: &str) -> Option<usize> {
        self.by_path.get(path).copied()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.record)?;
        for field in &self.fields {
            write!(f, "\n  {field}")?;
        }
        Ok(())
    }
}

fn collect_fields(
    shape: &RecordShape,
    parent_path: Option<&str>,
    parent_index: &[usize],
    out: &mut Vec<FieldDescriptor>,
) {
    for decl in shape.fields() {
        let (Some(column), Some(field_shape)) = (decl.column(), decl.shape()) else {
            continue;
        };

        let path = match parent_path {
            Some(parent) => format!("{parent}.{column}"),
            None => column.to_string(),
        };

        let mut index_path = Vec::with_capacity(parent_index.len() + 1);
        index_path.extend_from_slice(parent_index);
        index_path.push(decl.position());

        let (optional, effective) = match field_shape {
            FieldShape::Optional(inner) => (true, *inner),
            other => (false, other),
        };

        match effective {
            FieldShape::Record(nested) => collect_fields(&nested, Some(&path), &index_path, out),
            FieldShape::Leaf(leaf) => {
                out.push(FieldDescriptor::new(path, leaf, index_path, optional));
            }
            FieldShape::Optional(_) => panic!(
                "field '{}' of record {} is a nested Option, which cannot be mapped",
                decl.ident(),
                shape.name()
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// LayoutCache
// ---------------------------------------------------------------------------

/// Concurrent compute-once cache of layouts keyed by record type.
///
/// Lookups take a read lock. A miss resolves outside any lock and publishes
/// with a write lock; if another thread published first, its layout wins and
/// the redundant one is dropped, so every caller sees the same `Arc`.
pub struct LayoutCache {
    layouts: RwLock<FxHashMap<TypeId, Arc<Layout>>>,
}

impl LayoutCache {
    pub fn new() -> Self {
        LayoutCache {
            layouts: RwLock::new(FxHashMap::default()),
        }
    }

    /// Layout of record type `R`, resolving it on first use.
    pub fn layout<R: Record>(&self) -> Arc<Layout> {
        self.get_or_resolve(&RecordShape::of::<R>())
    }

    /// Layout of the record behind field type `F`, unwrapping one level of
    /// `Option` first.
    ///
    /// # Panics
    ///
    /// Panics if `F` is not a record or an optional record.
    pub fn layout_for_field<F: Field>(&self) -> Arc<Layout> {
        let shape = match F::shape() {
            FieldShape::Optional(inner) => *inner,
            other => other,
        };
        match shape {
            FieldShape::Record(record) => self.get_or_resolve(&record),
            _ => panic!(
                "layouts can only be resolved for record types, not {}",
                std::any::type_name::<F>()
            ),
        }
    }

    pub fn get_or_resolve(&self, shape: &RecordShape) -> Arc<Layout> {
        if let Some(layout) = self.layouts.read().get(&shape.type_id()) {
            return Arc::clone(layout);
        }

        let resolved = Arc::new(Layout::resolve(shape));

        let mut layouts = self.layouts.write();
        let published = layouts.entry(shape.type_id()).or_insert_with(|| {
            log::debug!(
                "resolved layout for {} ({} mapped fields)",
                shape.name(),
                resolved.len()
            );
            Arc::clone(&resolved)
        });
        Arc::clone(published)
    }

    /// Number of record types resolved so far.
    pub fn len(&self) -> usize {
        self.layouts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.layouts.read().is_empty()
    }
}

impl Default for LayoutCache {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Global cache instance
// ---------------------------------------------------------------------------

static GLOBAL_LAYOUTS: OnceLock<LayoutCache> = OnceLock::new();

/// The process-wide layout cache, lazily initialized.
pub fn global_layouts() -> &'static LayoutCache {
    GLOBAL_LAYOUTS.get_or_init(LayoutCache::new)
}

/// Layout of record type `R` from the process-wide cache.
pub fn layout_of<R: Record>() -> Arc<Layout> {
    global_layouts().layout::<R>()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Value, ValueType};
    use crate::Scan;
    use chrono::{DateTime, Utc};
    use std::sync::Barrier;

    crate::record! {
        #[derive(Debug, Default)]
        struct Geo {
            lat: f64 => "lat",
            lng: Option<f64> => "lng",
        }
    }

    crate::record! {
        #[derive(Debug, Default)]
        struct Address {
            street: String => "street",
            note: String,
            geo: Option<Geo> => "geo",
        }
    }

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Money {
        cents: i64,
    }

    impl Scan for Money {
        const VALUE_TYPE: ValueType = ValueType::Custom("money");

        fn scan(value: &Value) -> Result<Self, String> {
            match value {
                Value::Int(cents) => Ok(Money { cents: *cents }),
                other => Err(format!("cannot scan {} into money", other.kind())),
            }
        }
    }

    crate::record! {
        #[derive(Debug, Default)]
        struct Customer {
            id: i64 => "id",
            name: Option<String> => "name",
            balance: Money => "balance",
            created_at: DateTime<Utc> => "created_at",
            address: Address => "address",
            billing: Option<Address> => "billing",
        }
    }

    crate::record! {
        #[derive(Debug, Default)]
        struct Clashing {
            a: String => "dup",
            b: i64 => "dup",
        }
    }

    crate::record! {
        #[derive(Debug, Default)]
        struct DoublyOptional {
            x: Option<Option<i64>> => "x",
        }
    }

    #[test]
    fn test_flattens_nested_records_into_dotted_paths() {
        let layout = Layout::resolve(&RecordShape::of::<Customer>());
        insta::assert_snapshot!(layout.to_string(), @r"
        Customer
          id: integer @ [0]
          name: text? @ [1]
          balance: money @ [2]
          created_at: timestamp @ [3]
          address.street: text @ [4, 0]
          address.geo.lat: float @ [4, 2, 0]
          address.geo.lng: float? @ [4, 2, 1]
          billing.street: text @ [5, 0]
          billing.geo.lat: float @ [5, 2, 0]
          billing.geo.lng: float? @ [5, 2, 1]
        ");
    }

    #[test]
    fn test_lookup_by_path() {
        let layout = Layout::resolve(&RecordShape::of::<Customer>());
        let lat = layout.field("billing.geo.lat").unwrap();
        assert_eq!(lat.index_path(), &[5, 2, 0]);
        assert_eq!(lat.value_type(), ValueType::Float);
        assert!(!lat.is_optional());
        assert!(layout.field("billing.geo").is_none());
        assert!(layout.field("address.note").is_none());
        assert_eq!(layout.position("id"), Some(0));
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let first = Layout::resolve(&RecordShape::of::<Customer>());
        let second = Layout::resolve(&RecordShape::of::<Customer>());
        assert_eq!(first.fields(), second.fields());
    }

    #[test]
    fn test_cache_returns_same_layout() {
        let cache = LayoutCache::new();
        let a = cache.layout::<Customer>();
        let b = cache.layout::<Customer>();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_optional_record_unwraps_to_same_layout() {
        let cache = LayoutCache::new();
        let direct = cache.layout::<Address>();
        let through_option = cache.layout_for_field::<Option<Address>>();
        assert!(Arc::ptr_eq(&direct, &through_option));
    }

    #[test]
    #[should_panic(expected = "layouts can only be resolved for record types")]
    fn test_layout_for_leaf_panics() {
        LayoutCache::new().layout_for_field::<String>();
    }

    #[test]
    fn test_concurrent_first_use_publishes_one_layout() {
        let cache = LayoutCache::new();
        let barrier = Barrier::new(8);

        let layouts: Vec<Arc<Layout>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        cache.layout::<Customer>()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        for layout in &layouts[1..] {
            assert!(Arc::ptr_eq(&layouts[0], layout));
        }
        assert_eq!(cache.len(), 1);
    }

    #[test]
    #[should_panic(expected = "duplicate column path 'dup' in record Clashing")]
    fn test_duplicate_paths_are_rejected() {
        Layout::resolve(&RecordShape::of::<Clashing>());
    }

    #[test]
    #[should_panic(expected = "nested Option")]
    fn test_nested_option_is_rejected() {
        Layout::resolve(&RecordShape::of::<DoublyOptional>());
    }

    #[test]
    fn test_global_cache_is_shared() {
        let a = layout_of::<Geo>();
        let b = global_layouts().layout::<Geo>();
        assert!(Arc::ptr_eq(&a, &b));
    }
}

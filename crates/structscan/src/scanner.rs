//! Scanning rows into records.
//!
//! A [`StructScanner`] is bound to one record type and one column prefix.
//! On its first row it maps every result column to a leaf of the record's
//! [`Layout`]; on every row it reads the raw values into freshly allocated
//! [`Receiver`]s and writes each one into the destination along the leaf's
//! index path.
//!
//! ## NULL handling
//!
//! - a NULL column resets a plain leaf to its zero value and clears an
//!   `Option` leaf
//! - an unset optional sub-record stays unset while the values headed into
//!   it are NULL, and is created (zero-valued) as soon as one is not
//!
//! Outer joins therefore leave whole related records absent instead of
//! producing empty ones.

use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::config::Config;
use crate::error::Error;
use crate::field::{FieldDescriptor, LeafType};
use crate::layout::{global_layouts, Layout};
use crate::record::{Record, Target};
use crate::rows::Rows;
use crate::value::Value;

// ── Receivers ────────────────────────────────────────────────────────

/// Scratch slot for one column of one row.
///
/// Holds nothing for SQL NULL, otherwise a value already decoded into the
/// target leaf's type. Receivers for columns the scanner ignores accept any
/// value and drop it.
pub struct Receiver<'a> {
    column: &'a str,
    leaf: Option<&'a LeafType>,
    value: Option<Box<dyn Any + Send>>,
}

impl<'a> Receiver<'a> {
    fn new(column: &'a str, leaf: Option<&'a LeafType>) -> Self {
        Receiver {
            column,
            leaf,
            value: None,
        }
    }

    pub fn column(&self) -> &str {
        self.column
    }

    /// Whether values read into this receiver are discarded.
    pub fn is_ignored(&self) -> bool {
        self.leaf.is_none()
    }

    pub fn is_null(&self) -> bool {
        self.value.is_none()
    }

    /// Decode `value` into this slot.
    pub fn set(&mut self, value: &Value) -> Result<(), Error> {
        self.value = None;
        let Some(leaf) = self.leaf else {
            return Ok(());
        };
        if value.is_null() {
            return Ok(());
        }
        let decoded = leaf.decode(value).map_err(|message| Error::Decode {
            column: self.column.to_string(),
            expected: leaf.value_type(),
            message,
        })?;
        self.value = Some(decoded);
        Ok(())
    }

    fn into_value(self) -> Option<Box<dyn Any + Send>> {
        self.value
    }
}

// ── Column resolution ────────────────────────────────────────────────

/// A result column and the layout leaf it writes to, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedColumn {
    name: String,
    field: Option<usize>,
}

impl ResolvedColumn {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Index into [`Layout::fields`], or `None` for an ignored column.
    pub fn field(&self) -> Option<usize> {
        self.field
    }
}

// ── StructScanner ────────────────────────────────────────────────────

/// Scans rows into records of type `R`, expecting column names of the form
/// `prefix.path`.
///
/// A scanner resolves its columns once, against the first result set it
/// sees, and must not be reused with a result set of a different shape. It
/// keeps no reference to any destination after [`StructScanner::scan`]
/// returns.
pub struct StructScanner<R: Record> {
    prefix: String,
    layout: Arc<Layout>,
    config: Option<Config>,
    columns: Option<Vec<ResolvedColumn>>,
    _record: PhantomData<fn(&mut R)>,
}

impl<R: Record> StructScanner<R> {
    /// Scanner that follows the process-wide unmapped-column setting.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self::build(prefix.into(), None)
    }

    /// Scanner with an explicit configuration.
    pub fn with_config(prefix: impl Into<String>, config: Config) -> Self {
        Self::build(prefix.into(), Some(config))
    }

    pub(crate) fn build(prefix: String, config: Option<Config>) -> Self {
        StructScanner {
            prefix,
            layout: global_layouts().layout::<R>(),
            config,
            columns: None,
            _record: PhantomData,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn layout(&self) -> &Arc<Layout> {
        &self.layout
    }

    /// Columns resolved so far, `None` before the first scan.
    pub fn resolved_columns(&self) -> Option<&[ResolvedColumn]> {
        self.columns.as_deref()
    }

    fn column_without_prefix<'c>(&self, column: &'c str) -> &'c str {
        column
            .strip_prefix(self.prefix.as_str())
            .and_then(|rest| rest.strip_prefix('.'))
            .unwrap_or(column)
    }

    /// Map `columns` to layout leaves. Does nothing once columns are resolved.
    ///
    /// # Panics
    ///
    /// Panics on a column with no mapped field unless unmapped columns are
    /// ignored by this scanner's configuration.
    pub fn resolve_columns(&mut self, columns: &[String]) {
        if self.columns.is_none() {
            self.columns = Some(self.resolve(columns));
        }
    }

    fn resolve(&self, columns: &[String]) -> Vec<ResolvedColumn> {
        let config = self.config.unwrap_or_else(Config::global);

        let resolved: Vec<ResolvedColumn> = columns
            .iter()
            .map(|column| {
                let field = self.layout.position(self.column_without_prefix(column));
                if field.is_none() {
                    if !config.ignore_unmapped_columns {
                        panic!(
                            "no destination field for '{}' in record {}",
                            column,
                            self.layout.record_name()
                        );
                    }
                    log::debug!(
                        "ignoring column '{}': no mapped field in {}",
                        column,
                        self.layout.record_name()
                    );
                }
                ResolvedColumn {
                    name: column.clone(),
                    field,
                }
            })
            .collect();

        log::debug!(
            "resolved {} columns for {} (prefix '{}')",
            resolved.len(),
            self.layout.record_name(),
            self.prefix
        );
        resolved
    }

    /// Scan the current row of `rows` into `dest`.
    ///
    /// Values are written only after the whole row has been read and
    /// decoded, so a read failure leaves `dest` untouched.
    pub fn scan<Q: Rows + ?Sized>(&mut self, rows: &mut Q, dest: &mut R) -> Result<(), Error> {
        let columns = match self.columns.take() {
            Some(columns) => columns,
            None => self.resolve(&rows.columns()?),
        };
        let columns = &*self.columns.insert(columns);
        let layout = &self.layout;

        let mut receivers: Vec<Receiver<'_>> = columns
            .iter()
            .map(|c| Receiver::new(&c.name, c.field.map(|i| layout.fields()[i].leaf())))
            .collect();

        rows.scan(&mut receivers)?;

        for (column, receiver) in columns.iter().zip(receivers) {
            if let Some(index) = column.field {
                assign(dest, &layout.fields()[index], receiver.into_value());
            }
        }
        Ok(())
    }
}

// ── Nested assignment ────────────────────────────────────────────────

/// Write `value` into the leaf `descriptor` names inside `root`.
fn assign<R: Record>(root: &mut R, descriptor: &FieldDescriptor, value: Option<Box<dyn Any + Send>>) {
    assign_path(Target::Record(root), descriptor.index_path(), value, descriptor);
}

fn assign_path(
    target: Target<'_>,
    path: &[usize],
    value: Option<Box<dyn Any + Send>>,
    descriptor: &FieldDescriptor,
) {
    match target {
        Target::Optional(slot) => {
            if value.is_none() {
                if !slot.is_set() {
                    return;
                }
                if path.is_empty() {
                    slot.clear();
                    return;
                }
            }
            assign_path(slot.instantiate(), path, value, descriptor);
        }
        Target::Record(record) => {
            let Some((&position, rest)) = path.split_first() else {
                panic!("path '{}' ends at a record, not a leaf", descriptor.path());
            };
            match record.field(position) {
                Some(field) => assign_path(field, rest, value, descriptor),
                None => panic!(
                    "record has no mapped field at position {} on the way to '{}'",
                    position,
                    descriptor.path()
                ),
            }
        }
        Target::Leaf(leaf) => {
            if !path.is_empty() {
                panic!("path '{}' continues past a leaf field", descriptor.path());
            }
            if leaf.assign(value).is_err() {
                panic!(
                    "field '{}' of type {} cannot hold a value decoded as {}",
                    descriptor.path(),
                    leaf.type_name(),
                    descriptor.leaf().type_name()
                );
            }
        }
    }
}

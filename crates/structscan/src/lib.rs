//! Map SQL result rows onto Rust record types.
//!
//! Records are declared with [`record!`]; each mapped field names the column
//! (or, for nested records, the path segment) it is read from. Nested
//! records flatten into dotted column paths, so a single query can fill a
//! record embedding an address embedding a coordinate from columns such as
//! `u.address.geo.lat`.
//!
//! ```
//! use structscan::{record, select, MemoryDb, MemoryRows, Value};
//!
//! record! {
//!     #[derive(Debug, Default)]
//!     pub struct Team {
//!         pub name: String => "name",
//!     }
//! }
//!
//! record! {
//!     #[derive(Debug, Default)]
//!     pub struct Player {
//!         pub id: i64 => "id",
//!         pub team: Option<Team> => "team",
//!     }
//! }
//!
//! let mut db = MemoryDb::new();
//! db.expect_query(
//!     "SELECT ...",
//!     MemoryRows::new(["p.id", "p.team.name"])
//!         .row(vec![Value::Int(1), Value::Null])
//!         .row(vec![Value::Int(2), "Reds".into()]),
//! );
//!
//! let mut players: Vec<Player> = Vec::new();
//! select(&mut db, &mut players, "p", "SELECT ...", &[]).unwrap();
//!
//! assert!(players[0].team.is_none());
//! assert_eq!(players[1].team.as_ref().unwrap().name, "Reds");
//! ```
//!
//! ## Modules
//!
//! - [`record`]: the `Record`, `Field` and `Scan` traits and the `record!` macro
//! - [`layout`]: flattened record layouts and the process-wide layout cache
//! - [`scanner`]: `StructScanner`, column resolution and nested assignment
//! - [`select`]: query-and-scan into a record or a `Vec` of records
//! - [`rows`]: the traits a database driver implements
//! - [`memory`]: an in-memory driver for tests

pub mod config;
pub mod error;
pub mod field;
pub mod layout;
pub mod memory;
pub mod record;
pub mod rows;
pub mod scanner;
pub mod select;
pub mod value;

pub use config::{ignore_nonexistent_fields, Config};
pub use error::Error;
pub use field::{FieldDescriptor, LeafType};
pub use layout::{global_layouts, layout_of, Layout, LayoutCache};
pub use memory::{MemoryDb, MemoryRows};
pub use record::{Field, FieldDecl, FieldShape, Leaf, Optional, Record, RecordShape, Scan, Target};
pub use rows::{Queryer, Rows};
pub use scanner::{Receiver, ResolvedColumn, StructScanner};
pub use select::{select, select_with_config, Destination};
pub use value::{Value, ValueType};

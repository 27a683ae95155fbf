//! One-call query-and-scan.
//!
//! [`select`] runs a query and scans its rows into a [`Destination`]:
//!
//! - a record (any `record!` type) receives exactly one row; a result with
//!   no rows is [`Error::NoRows`]
//! - a `Vec` of records receives every row, replacing its contents; a result
//!   with no rows leaves it empty

use crate::config::Config;
use crate::error::Error;
use crate::record::Record;
use crate::rows::{Queryer, Rows};
use crate::scanner::StructScanner;
use crate::value::Value;

/// Something rows can be scanned into by [`select`].
pub trait Destination {
    fn fill<Q: Rows>(
        &mut self,
        rows: &mut Q,
        prefix: &str,
        config: Option<Config>,
    ) -> Result<(), Error>;
}

/// Scan the first row of `rows` into `dest`. Used by `record!` types.
#[doc(hidden)]
pub fn fill_one<R: Record, Q: Rows>(
    dest: &mut R,
    rows: &mut Q,
    prefix: &str,
    config: Option<Config>,
) -> Result<(), Error> {
    if !rows.next()? {
        return Err(Error::NoRows);
    }
    StructScanner::<R>::build(prefix.to_string(), config).scan(rows, dest)
}

impl<R: Record + Default> Destination for Vec<R> {
    fn fill<Q: Rows>(
        &mut self,
        rows: &mut Q,
        prefix: &str,
        config: Option<Config>,
    ) -> Result<(), Error> {
        let mut scanner = StructScanner::<R>::build(prefix.to_string(), config);
        let mut result = Vec::new();

        while rows.next()? {
            let mut elem = R::default();
            scanner.scan(rows, &mut elem)?;
            result.push(elem);
        }

        *self = result;
        Ok(())
    }
}

/// Run `sql` with `args` and scan the result into `dest`, mapping columns
/// named `prefix.path` onto record fields.
///
/// Unmapped columns follow the process-wide setting; see
/// [`ignore_nonexistent_fields`](crate::ignore_nonexistent_fields).
pub fn select<Q, D>(
    queryer: &mut Q,
    dest: &mut D,
    prefix: &str,
    sql: &str,
    args: &[Value],
) -> Result<(), Error>
where
    Q: Queryer + ?Sized,
    D: Destination + ?Sized,
{
    run(queryer, dest, prefix, sql, args, None)
}

/// Like [`select`], with an explicit configuration.
pub fn select_with_config<Q, D>(
    queryer: &mut Q,
    dest: &mut D,
    prefix: &str,
    sql: &str,
    args: &[Value],
    config: Config,
) -> Result<(), Error>
where
    Q: Queryer + ?Sized,
    D: Destination + ?Sized,
{
    run(queryer, dest, prefix, sql, args, Some(config))
}

fn run<Q, D>(
    queryer: &mut Q,
    dest: &mut D,
    prefix: &str,
    sql: &str,
    args: &[Value],
    config: Option<Config>,
) -> Result<(), Error>
where
    Q: Queryer + ?Sized,
    D: Destination + ?Sized,
{
    let mut rows = queryer.query(sql, args)?;
    dest.fill(&mut rows, prefix, config)
}

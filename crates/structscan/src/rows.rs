//! The boundary to whatever actually runs queries.
//!
//! Scanning only needs three things from a driver: the column names of a
//! result set, a way to advance to the next row, and a way to read the
//! current row's raw values into [`Receiver`]s in column order.

use crate::error::Error;
use crate::scanner::Receiver;
use crate::value::Value;

/// A forward-only cursor over a query result.
pub trait Rows {
    /// Column names of the result set, in order.
    fn columns(&self) -> Result<Vec<String>, Error>;

    /// Advance to the next row. Returns `false` once the rows are exhausted.
    fn next(&mut self) -> Result<bool, Error>;

    /// Read the current row into `receivers`, one per column.
    ///
    /// Implementations hand each raw value to [`Receiver::set`] and return
    /// [`Error::ColumnCount`] if the receiver count does not match the row.
    fn scan(&mut self, receivers: &mut [Receiver<'_>]) -> Result<(), Error>;
}

/// Something that can run a query and return a row cursor.
pub trait Queryer {
    type Rows: Rows;

    fn query(&mut self, sql: &str, args: &[Value]) -> Result<Self::Rows, Error>;
}

impl<Q: Queryer + ?Sized> Queryer for &mut Q {
    type Rows = Q::Rows;

    fn query(&mut self, sql: &str, args: &[Value]) -> Result<Self::Rows, Error> {
        (**self).query(sql, args)
    }
}

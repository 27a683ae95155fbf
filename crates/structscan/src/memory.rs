//! In-memory row cursor and query executor.
//!
//! [`MemoryDb`] answers queries from a queue of expectations, each naming
//! the exact SQL (and optionally the arguments) it expects and the
//! [`MemoryRows`] or error to hand back. It is meant for tests of code that
//! scans rows, where standing up a database would be overkill.

use std::collections::VecDeque;

use crate::error::Error;
use crate::rows::{Queryer, Rows};
use crate::scanner::Receiver;
use crate::value::Value;

/// A fixed result set held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryRows {
    columns: Vec<String>,
    pending: VecDeque<Vec<Value>>,
    current: Option<Vec<Value>>,
}

impl MemoryRows {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        MemoryRows {
            columns: columns.into_iter().map(Into::into).collect(),
            pending: VecDeque::new(),
            current: None,
        }
    }

    /// Append a row (builder style).
    pub fn row(mut self, values: Vec<Value>) -> Self {
        self.push_row(values);
        self
    }

    pub fn push_row(&mut self, values: Vec<Value>) {
        self.pending.push_back(values);
    }

    /// Rows not yet reached by [`Rows::next`].
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

impl Rows for MemoryRows {
    fn columns(&self) -> Result<Vec<String>, Error> {
        Ok(self.columns.clone())
    }

    fn next(&mut self) -> Result<bool, Error> {
        self.current = self.pending.pop_front();
        Ok(self.current.is_some())
    }

    fn scan(&mut self, receivers: &mut [Receiver<'_>]) -> Result<(), Error> {
        let Some(row) = &self.current else {
            return Err(Error::Query("scan called without a current row".to_string()));
        };
        if row.len() != receivers.len() {
            return Err(Error::ColumnCount {
                expected: receivers.len(),
                found: row.len(),
            });
        }
        for (receiver, value) in receivers.iter_mut().zip(row) {
            receiver.set(value)?;
        }
        Ok(())
    }
}

struct Expectation {
    sql: String,
    args: Option<Vec<Value>>,
    result: Result<MemoryRows, Error>,
}

/// A [`Queryer`] that replays queued results in order.
#[derive(Default)]
pub struct MemoryDb {
    expectations: VecDeque<Expectation>,
    executed: Vec<(String, Vec<Value>)>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expect `sql` with any arguments and answer it with `rows`.
    pub fn expect_query(&mut self, sql: impl Into<String>, rows: MemoryRows) -> &mut Self {
        self.push(sql.into(), None, Ok(rows))
    }

    /// Expect `sql` with exactly `args` and answer it with `rows`.
    pub fn expect_query_with_args(
        &mut self,
        sql: impl Into<String>,
        args: Vec<Value>,
        rows: MemoryRows,
    ) -> &mut Self {
        self.push(sql.into(), Some(args), Ok(rows))
    }

    /// Expect `sql` and fail it with `error`.
    pub fn expect_error(&mut self, sql: impl Into<String>, error: Error) -> &mut Self {
        self.push(sql.into(), None, Err(error))
    }

    fn push(
        &mut self,
        sql: String,
        args: Option<Vec<Value>>,
        result: Result<MemoryRows, Error>,
    ) -> &mut Self {
        self.expectations.push_back(Expectation { sql, args, result });
        self
    }

    /// Every query run so far, with its arguments.
    pub fn executed(&self) -> &[(String, Vec<Value>)] {
        &self.executed
    }

    pub fn all_expectations_met(&self) -> bool {
        self.expectations.is_empty()
    }
}

impl Queryer for MemoryDb {
    type Rows = MemoryRows;

    fn query(&mut self, sql: &str, args: &[Value]) -> Result<MemoryRows, Error> {
        self.executed.push((sql.to_string(), args.to_vec()));

        let Some(expectation) = self.expectations.pop_front() else {
            return Err(Error::Query(format!("unexpected query: {sql}")));
        };
        if expectation.sql != sql {
            return Err(Error::Query(format!(
                "expected query {:?}, got {:?}",
                expectation.sql, sql
            )));
        }
        if let Some(expected) = &expectation.args {
            if expected.as_slice() != args {
                return Err(Error::Query(format!(
                    "arguments {:?} do not match expected {:?}",
                    args, expected
                )));
            }
        }
        expectation.result
    }
}

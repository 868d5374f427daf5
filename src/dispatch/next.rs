//! The continuation handed to every handler.

use std::fmt;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::dispatch::engine::dispatch_from;
use crate::http::{Input, Output};
use crate::routing::RouteTable;

/// Resumes dispatch at the route after the one currently running.
///
/// Consumed by `run`, so each handler continues the chain at most once.
pub struct Next {
    table: Arc<RouteTable>,
    cursor: usize,
    chain_cors: Arc<AtomicBool>,
}

impl Next {
    pub(crate) fn new(table: Arc<RouteTable>, cursor: usize, chain_cors: Arc<AtomicBool>) -> Self {
        Self {
            table,
            cursor,
            chain_cors,
        }
    }

    /// Index of the first route the continuation will consider.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Dispatch the rest of the table. No match gives an empty `Output`,
    /// which the serializer renders as 404.
    pub async fn run(self, input: Input) -> anyhow::Result<Output> {
        Ok(self.dispatch(input).await?.unwrap_or_default())
    }

    /// Like `run`, but keeps the no-match case distinct.
    pub async fn dispatch(self, input: Input) -> anyhow::Result<Option<Output>> {
        let dispatched = dispatch_from(self.table, self.cursor, input, self.chain_cors).await?;
        Ok(dispatched.map(|d| d.output))
    }
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("cursor", &self.cursor)
            .field("remaining", &self.table.len().saturating_sub(self.cursor))
            .finish()
    }
}

//! Blocking adapter over [`TableClient`].
//!
//! Each method drives the corresponding async operation to completion on a
//! private current-thread runtime. The methods must not be called from
//! within an async runtime; use the async client there.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::runtime::{Builder, Runtime};

use crate::error::ClientError;
use crate::query::QuerySpec;
use crate::record::{Page, Record};
use crate::table::TableClient;

/// Synchronous table client with the same semantics as [`TableClient`].
///
/// Listing methods collect every page before returning.
pub struct BlockingTableClient<T> {
    table: TableClient<T>,
    runtime: Arc<Runtime>,
}

impl<T> Clone for BlockingTableClient<T> {
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
            runtime: Arc::clone(&self.runtime),
        }
    }
}

impl<T> fmt::Debug for BlockingTableClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockingTableClient")
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

impl<T> BlockingTableClient<T>
where
    T: DeserializeOwned + Send + 'static,
{
    /// Wraps `table` with a dedicated runtime.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Runtime`] if the runtime cannot be started.
    pub fn new(table: TableClient<T>) -> Result<Self, ClientError> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|source| ClientError::Runtime { source })?;
        Ok(Self {
            table,
            runtime: Arc::new(runtime),
        })
    }

    /// Returns the wrapped async client.
    #[must_use]
    pub fn async_client(&self) -> &TableClient<T> {
        &self.table
    }

    /// Returns every record in the table.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by any page.
    pub fn list_all(&self) -> Result<Vec<Record<T>>, ClientError> {
        self.list_all_with(QuerySpec::default())
    }

    /// Returns every record matching `query`.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by any page.
    pub fn list_all_with(&self, query: QuerySpec) -> Result<Vec<Record<T>>, ClientError> {
        self.runtime.block_on(self.table.collect_all(query))
    }

    /// Returns the first page of the table.
    ///
    /// # Errors
    ///
    /// See [`TableClient::list_page`].
    pub fn list_page(&self) -> Result<Page<T>, ClientError> {
        self.runtime.block_on(self.table.list_page())
    }

    /// Returns one page matching `query`.
    ///
    /// # Errors
    ///
    /// See [`TableClient::list_page_with`].
    pub fn list_page_with(&self, query: QuerySpec) -> Result<Page<T>, ClientError> {
        self.runtime.block_on(self.table.list_page_with(query))
    }

    /// Fetches one record by id.
    ///
    /// # Errors
    ///
    /// See [`TableClient::find`].
    pub fn find(&self, id: &str) -> Result<Record<T>, ClientError> {
        self.runtime.block_on(self.table.find(id))
    }

    /// Deletes one record, returning whether the server reported it deleted.
    ///
    /// # Errors
    ///
    /// See [`TableClient::delete`].
    pub fn delete(&self, id: &str) -> Result<bool, ClientError> {
        self.runtime.block_on(self.table.delete(id))
    }
}

impl<T> BlockingTableClient<T>
where
    T: Serialize + DeserializeOwned + Send + 'static,
{
    /// Creates a record from `fields`.
    ///
    /// # Errors
    ///
    /// See [`TableClient::create`].
    pub fn create(&self, fields: &T) -> Result<Record<T>, ClientError> {
        self.runtime.block_on(self.table.create(fields))
    }

    /// Updates the fields of record `id`.
    ///
    /// # Errors
    ///
    /// See [`TableClient::update`].
    pub fn update(&self, id: &str, fields: &T) -> Result<Record<T>, ClientError> {
        self.runtime.block_on(self.table.update(id, fields))
    }
}

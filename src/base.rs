//! Client entry point and per-base table registry.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use reqwest::header::HeaderValue;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::blocking::BlockingTableClient;
use crate::config::{ConfigError, Configuration};
use crate::error::ClientError;
use crate::http::{ReqwestTransport, RequestExecutor, Transport};
use crate::table::TableClient;

/// Entry point holding the configuration and the shared request executor.
///
/// Every async table client created from one `Airtable` shares the same
/// HTTP connection pool and retry policy. Blocking clients from an
/// `Airtable` built with [`new`](Self::new) get a pool of their own, since
/// connections opened on their private runtime only progress inside it.
/// Blocking clients from an injected transport or executor share it.
#[derive(Debug, Clone)]
pub struct Airtable {
    config: Configuration,
    executor: Arc<RequestExecutor>,
    authorization: HeaderValue,
    owns_transport: bool,
}

impl Airtable {
    /// Creates a client sending requests over HTTP with `reqwest`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the HTTP client cannot be built from the
    /// configuration (e.g. an invalid proxy).
    pub fn new(config: Configuration) -> Result<Self, ConfigError> {
        let transport = ReqwestTransport::from_config(&config)?;
        let mut airtable = Self::with_transport(config, Arc::new(transport))?;
        airtable.owns_transport = true;
        Ok(airtable)
    }

    /// Creates a client sending requests through `transport`, retrying
    /// rate-limited responses per the configuration's retry settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for invalid retry settings.
    pub fn with_transport(
        config: Configuration,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, ConfigError> {
        let policy = config.retry().to_policy()?;
        let executor = RequestExecutor::with_retry_policy(transport, policy);
        Self::with_executor(config, Arc::new(executor))
    }

    /// Creates a client around an existing executor.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidApiKey`] if the key cannot be sent as a header.
    pub fn with_executor(
        config: Configuration,
        executor: Arc<RequestExecutor>,
    ) -> Result<Self, ConfigError> {
        let authorization = config.authorization_header()?;
        debug!(endpoint = %config.endpoint_url(), "client configured");
        Ok(Self {
            config,
            executor,
            authorization,
            owns_transport: false,
        })
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &Configuration {
        &self.config
    }

    /// Returns a handle on `base_id` that caches its table clients.
    #[must_use]
    pub fn base(&self, base_id: impl Into<String>) -> Base {
        Base {
            inner: Arc::new(BaseInner {
                id: base_id.into(),
                airtable: self.clone(),
                tables: DashMap::new(),
            }),
        }
    }

    /// Creates a client for `table` in `base_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidUrl`] if the endpoint cannot carry path segments.
    pub fn table<T>(&self, base_id: &str, table: &str) -> Result<TableClient<T>, ClientError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let url = table_url(self.config.endpoint_url(), base_id, table)?;
        debug!(url = %url, "created table client");
        Ok(TableClient::new(
            url,
            self.authorization.clone(),
            Arc::clone(&self.executor),
        ))
    }

    /// Creates a blocking client for `table` in `base_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the table URL is invalid, the HTTP client
    /// cannot be built or the blocking runtime cannot start.
    pub fn blocking_table<T>(
        &self,
        base_id: &str,
        table: &str,
    ) -> Result<BlockingTableClient<T>, ClientError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let url = table_url(self.config.endpoint_url(), base_id, table)?;
        let executor = if self.owns_transport {
            let transport =
                ReqwestTransport::from_config(&self.config).map_err(ClientError::config)?;
            Arc::new(RequestExecutor::with_retry_policy(
                Arc::new(transport),
                self.executor.retry_policy().clone(),
            ))
        } else {
            Arc::clone(&self.executor)
        };
        debug!(url = %url, dedicated_pool = self.owns_transport, "created blocking table client");
        BlockingTableClient::new(TableClient::new(url, self.authorization.clone(), executor))
    }
}

fn table_url(endpoint: &Url, base_id: &str, table: &str) -> Result<Url, ClientError> {
    let mut url = endpoint.clone();
    url.path_segments_mut()
        .map_err(|()| ClientError::invalid_url(endpoint.as_str()))?
        .pop_if_empty()
        .push(base_id)
        .push(table);
    Ok(url)
}

type TableKey = (String, TypeId);

/// A base and its memo of table clients.
///
/// Clients are cached per table name and record type, so repeated lookups
/// return clones of the same client. Clones of a `Base` share the memo.
#[derive(Clone)]
pub struct Base {
    inner: Arc<BaseInner>,
}

struct BaseInner {
    id: String,
    airtable: Airtable,
    tables: DashMap<TableKey, Box<dyn Any + Send + Sync>>,
}

impl fmt::Debug for Base {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Base")
            .field("id", &self.inner.id)
            .field("cached_tables", &self.inner.tables.len())
            .finish()
    }
}

impl Base {
    /// Returns the base id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Returns the client for `name` mapped to `T`, creating it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidUrl`] if the table URL cannot be built.
    pub fn table<T>(&self, name: &str) -> Result<TableClient<T>, ClientError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let key = (name.to_string(), TypeId::of::<T>());

        // The read guard must be released before `entry` locks the shard.
        {
            if let Some(cached) = self.inner.tables.get(&key) {
                let any: &(dyn Any + Send + Sync) = &**cached.value();
                if let Some(client) = any.downcast_ref::<TableClient<T>>() {
                    return Ok(client.clone());
                }
            }
        }

        let created = self.inner.airtable.table::<T>(&self.inner.id, name)?;
        let entry = self
            .inner
            .tables
            .entry(key)
            .or_insert_with(|| Box::new(created.clone()) as Box<dyn Any + Send + Sync>);
        let any: &(dyn Any + Send + Sync) = &**entry.value();
        Ok(any
            .downcast_ref::<TableClient<T>>()
            .cloned()
            .unwrap_or(created))
    }

    /// Returns the number of cached table clients.
    #[must_use]
    pub fn cached_tables(&self) -> usize {
        self.inner.tables.len()
    }
}

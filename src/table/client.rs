//! Async client for a single table.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use futures_util::stream::{self, BoxStream, StreamExt, TryStreamExt};
use reqwest::Method;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};
use url::Url;

use super::pagination::{PageStream, fetch_pages};
use crate::error::ClientError;
use crate::http::{HttpRequest, HttpResponse, RequestExecutor};
use crate::query::{QuerySpec, build_query_request};
use crate::record::{Deleted, FieldsBody, Page, Record};

const APPLICATION_JSON: &str = "application/json";

/// Stream of records flattened from a page stream.
pub type RecordStream<T> = BoxStream<'static, Result<Record<T>, ClientError>>;

/// Async client for one table, mapping rows to `Record<T>`.
///
/// The client holds only fixed configuration (table URL, credential, shared
/// executor). Clones are cheap and every call has its own request, response
/// and retry lifecycle, so any number of calls may run concurrently.
///
/// # Example
///
/// ```no_run
/// use airtable_client::{Airtable, Configuration, QuerySpec};
/// use futures_util::TryStreamExt;
/// use serde::Deserialize;
///
/// #[derive(Debug, Deserialize)]
/// struct Task {
///     #[serde(rename = "Name")]
///     name: String,
/// }
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let airtable = Airtable::new(Configuration::from_env()?)?;
/// let tasks = airtable.table::<Task>("appBase", "Tasks")?;
///
/// let query = QuerySpec::builder().view("Open").page_size(50).build();
/// let mut records = tasks.list_all_with(query);
/// while let Some(record) = records.try_next().await? {
///     println!("{}: {}", record.id(), record.fields.name);
/// }
/// # Ok(())
/// # }
/// ```
pub struct TableClient<T> {
    inner: Arc<TableInner>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for TableClient<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for TableClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableClient")
            .field("table_url", &self.inner.table_url.as_str())
            .finish_non_exhaustive()
    }
}

struct TableInner {
    table_url: Url,
    authorization: HeaderValue,
    executor: Arc<RequestExecutor>,
}

impl TableInner {
    fn record_url(&self, id: &str) -> Result<Url, ClientError> {
        let mut url = self.table_url.clone();
        url.path_segments_mut()
            .map_err(|()| ClientError::invalid_url(self.table_url.as_str()))?
            .push(id);
        Ok(url)
    }

    fn base_request(&self, method: Method, url: Url) -> HttpRequest {
        let mut request = HttpRequest::new(method, url);
        self.apply_headers(&mut request);
        request
    }

    fn apply_headers(&self, request: &mut HttpRequest) {
        request
            .headers
            .insert(ACCEPT, HeaderValue::from_static(APPLICATION_JSON));
        request
            .headers
            .insert(AUTHORIZATION, self.authorization.clone());
    }

    fn write_request<T: Serialize>(
        &self,
        method: Method,
        url: Url,
        fields: &T,
    ) -> Result<HttpRequest, ClientError> {
        let body = serde_json::to_vec(&FieldsBody { fields })
            .map_err(|e| ClientError::mapping("request body", e))?;
        let mut request = self.base_request(method, url);
        request
            .headers
            .insert(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
        request.body = Some(body);
        Ok(request)
    }

    async fn fetch_page<T: DeserializeOwned>(
        &self,
        query: &QuerySpec,
    ) -> Result<Page<T>, ClientError> {
        let mut request = build_query_request(query, &self.table_url);
        self.apply_headers(&mut request);
        let response = self
            .executor
            .execute(request)
            .await
            .inspect_err(|e| warn!(error = %e, offset = ?query.offset(), "failed to execute query"))?;
        decode(&response, "list response")
    }
}

fn decode<X: DeserializeOwned>(response: &HttpResponse, context: &str) -> Result<X, ClientError> {
    serde_json::from_str(&response.body).map_err(|e| ClientError::mapping(context, e))
}

impl<T> TableClient<T>
where
    T: DeserializeOwned + Send + 'static,
{
    pub(crate) fn new(table_url: Url, authorization: HeaderValue, executor: Arc<RequestExecutor>) -> Self {
        Self {
            inner: Arc::new(TableInner {
                table_url,
                authorization,
                executor,
            }),
            _marker: PhantomData,
        }
    }

    #[cfg(test)]
    pub(crate) fn executor(&self) -> &Arc<RequestExecutor> {
        &self.inner.executor
    }

    /// Returns the table endpoint URL.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.inner.table_url
    }

    /// Streams every page matching `query`, following continuation cursors.
    ///
    /// Nothing is requested until the stream is polled. Each poll of a new
    /// page issues one request; a failure ends the stream after the pages
    /// already yielded.
    #[must_use]
    pub fn list_pages(&self, query: QuerySpec) -> PageStream<T> {
        let inner = Arc::clone(&self.inner);
        fetch_pages(query, move |query: QuerySpec| {
            let inner = Arc::clone(&inner);
            async move { inner.fetch_page::<T>(&query).await }
        })
    }

    /// Streams every record in the table.
    #[must_use]
    pub fn list_all(&self) -> RecordStream<T> {
        self.list_all_with(QuerySpec::default())
    }

    /// Streams every record matching `query`, page by page, in server order.
    #[must_use]
    pub fn list_all_with(&self, query: QuerySpec) -> RecordStream<T> {
        self.list_pages(query)
            .map_ok(|page| stream::iter(page.records.into_iter().map(Ok::<_, ClientError>)))
            .try_flatten()
            .boxed()
    }

    /// Collects every record matching `query`.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by any page.
    pub async fn collect_all(&self, query: QuerySpec) -> Result<Vec<Record<T>>, ClientError> {
        self.list_all_with(query).try_collect().await
    }

    /// Fetches the first page of the table.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the request fails or the page cannot be decoded.
    pub async fn list_page(&self) -> Result<Page<T>, ClientError> {
        self.list_page_with(QuerySpec::default()).await
    }

    /// Fetches a single page matching `query` without following its cursor.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the request fails or the page cannot be decoded.
    #[instrument(level = "debug", skip_all, fields(table = %self.inner.table_url))]
    pub async fn list_page_with(&self, query: QuerySpec) -> Result<Page<T>, ClientError> {
        self.inner.fetch_page(&query).await
    }

    /// Fetches one record by id.
    ///
    /// A missing record is reported like any other non-200 response, as a
    /// [`ClientError::Server`] carrying the status.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the request fails or the record cannot be decoded.
    #[instrument(level = "debug", skip(self), fields(table = %self.inner.table_url))]
    pub async fn find(&self, id: &str) -> Result<Record<T>, ClientError> {
        let url = self.inner.record_url(id)?;
        let request = self.inner.base_request(Method::GET, url);
        self.send_for_record(request)
            .await
            .inspect_err(|e| warn!(id, error = %e, "failed to find record"))
    }

    /// Creates a record and returns it with its server-assigned id and timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when `fields` cannot be serialized, the request
    /// fails or the created record cannot be decoded.
    #[instrument(level = "debug", skip_all, fields(table = %self.inner.table_url))]
    pub async fn create(&self, fields: &T) -> Result<Record<T>, ClientError>
    where
        T: Serialize,
    {
        let request = self
            .inner
            .write_request(Method::POST, self.inner.table_url.clone(), fields)?;
        let record = self
            .send_for_record(request)
            .await
            .inspect_err(|e| warn!(error = %e, "failed to create record"))?;
        debug!(id = record.id(), "created record");
        Ok(record)
    }

    /// Updates a record with `PATCH`.
    ///
    /// The server merges the payload: fields absent from the serialized
    /// `fields` keep their current values. The payload is sent as given.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when `fields` cannot be serialized, the request
    /// fails or the updated record cannot be decoded.
    #[instrument(level = "debug", skip_all, fields(table = %self.inner.table_url, id = %id))]
    pub async fn update(&self, id: &str, fields: &T) -> Result<Record<T>, ClientError>
    where
        T: Serialize,
    {
        let url = self.inner.record_url(id)?;
        let request = self.inner.write_request(Method::PATCH, url, fields)?;
        self.send_for_record(request)
            .await
            .inspect_err(|e| warn!(id, error = %e, "failed to update record"))
    }

    /// Deletes a record and returns the server's deleted flag.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the request fails or the response cannot be decoded.
    #[instrument(level = "debug", skip(self), fields(table = %self.inner.table_url))]
    pub async fn delete(&self, id: &str) -> Result<bool, ClientError> {
        let url = self.inner.record_url(id)?;
        let request = self.inner.base_request(Method::DELETE, url);
        let deleted: Deleted = self
            .send_and_decode(request, "delete response")
            .await
            .inspect_err(|e| warn!(id, error = %e, "failed to delete record"))?;
        Ok(deleted.deleted)
    }

    async fn send_for_record(&self, request: HttpRequest) -> Result<Record<T>, ClientError> {
        self.send_and_decode(request, "record response").await
    }

    async fn send_and_decode<X: DeserializeOwned>(
        &self,
        request: HttpRequest,
        context: &str,
    ) -> Result<X, ClientError> {
        let response = self.inner.executor.execute(request).await?;
        decode(&response, context)
    }
}

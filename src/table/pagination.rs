//! Cursor-following page stream.
//!
//! Pages are fetched strictly in order: the request for page N+1 needs the
//! cursor returned with page N. The stream is driven by an explicit cursor
//! state instead of recursion, so long tables do not grow the call stack.
//! Nothing is fetched until the stream is polled, and dropping the stream
//! cancels the in-flight request and schedules no further pages.

use std::future::Future;

use futures_util::stream::{self, BoxStream, StreamExt};
use tracing::debug;

use crate::error::ClientError;
use crate::query::QuerySpec;
use crate::record::Page;

/// Lazy stream of pages, ending after the first page without a cursor or
/// after the first error.
pub type PageStream<T> = BoxStream<'static, Result<Page<T>, ClientError>>;

enum Cursor {
    Next(QuerySpec),
    Done,
}

/// Streams every page of `query`, calling `fetch_page` once per page.
///
/// The first call receives `query` unchanged; each following call receives
/// `query` with the cursor from the previous page. An error is yielded as
/// the final item; pages already yielded are unaffected.
pub fn fetch_pages<T, F, Fut>(query: QuerySpec, fetch_page: F) -> PageStream<T>
where
    T: Send + 'static,
    F: Fn(QuerySpec) -> Fut + Clone + Send + 'static,
    Fut: Future<Output = Result<Page<T>, ClientError>> + Send + 'static,
{
    stream::unfold(Cursor::Next(query), move |cursor| {
        let fetch_page = fetch_page.clone();
        async move {
            let Cursor::Next(query) = cursor else {
                return None;
            };

            match fetch_page(query.clone()).await {
                Ok(page) => {
                    let next = match &page.offset {
                        Some(offset) => {
                            debug!(
                                offset = %offset,
                                records = page.records.len(),
                                "continuing with next page"
                            );
                            Cursor::Next(query.with_offset(offset.clone()))
                        }
                        None => Cursor::Done,
                    };
                    Some((Ok(page), next))
                }
                Err(error) => Some((Err(error), Cursor::Done)),
            }
        }
    })
    .boxed()
}

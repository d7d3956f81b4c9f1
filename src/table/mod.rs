//! Per-table record operations.
//!
//! [`TableClient`] lists, finds, creates, updates and deletes records of one
//! table. Listing is exposed as lazy page and record streams built on
//! [`fetch_pages`].

mod client;
mod pagination;

pub use client::{RecordStream, TableClient};
pub use pagination::{PageStream, fetch_pages};

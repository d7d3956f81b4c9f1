//! Row and page payloads exchanged with the API.

use serde::{Deserialize, Serialize};

/// A table row: server-assigned id and creation time plus typed fields.
///
/// Records built client-side for creation have no id or timestamp; both are
/// populated on every record decoded from a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record<T> {
    /// Row id, absent until assigned by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Row data.
    pub fields: T,
    /// Creation timestamp, absent until assigned by the server.
    #[serde(
        rename = "createdTime",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub created_time: Option<String>,
}

impl<T> Record<T> {
    /// Wraps `fields` in a record with no id or timestamp.
    pub fn new(fields: T) -> Self {
        Self {
            id: None,
            fields,
            created_time: None,
        }
    }

    /// Returns the id, or an empty string when unassigned.
    #[must_use]
    pub fn id(&self) -> &str {
        self.id.as_deref().unwrap_or_default()
    }
}

/// One page of a list response.
///
/// A missing `offset` marks the final page.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Page<T> {
    /// Records in server order.
    pub records: Vec<Record<T>>,
    /// Continuation cursor for the next page.
    #[serde(default)]
    pub offset: Option<String>,
}

impl<T> Page<T> {
    /// Returns whether more pages follow this one.
    #[must_use]
    pub fn has_next(&self) -> bool {
        self.offset.is_some()
    }
}

/// Body sent for create and update: `{"fields": ...}`.
#[derive(Serialize)]
pub(crate) struct FieldsBody<'a, T> {
    pub(crate) fields: &'a T,
}

/// Response body of a delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deleted {
    /// Whether the row was deleted.
    pub deleted: bool,
    /// Id of the deleted row.
    #[serde(default)]
    pub id: String,
}

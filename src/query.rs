//! List query parameters and their translation to URL query parameters.
//!
//! Parameters are emitted only for fields that are set, always in this order:
//! `fields[]` (one per field), `maxRecords`, `view`, `filterByFormula`,
//! `pageSize` (capped at 100), `sort[i][field]`/`sort[i][direction]`, and
//! finally the continuation `offset`.

use std::fmt;
use std::str::FromStr;

use reqwest::Method;
use tracing::{debug, warn};
use url::Url;

use crate::constants::MAX_PAGE_SIZE;
use crate::http::HttpRequest;

/// Sort direction for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    /// Ascending (the server default).
    #[default]
    Asc,
    /// Descending.
    Desc,
}

impl SortDirection {
    /// Returns the wire representation (`asc`/`desc`).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(format!("unknown sort direction '{other}' (expected asc or desc)")),
        }
    }
}

/// A single sort key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    /// Field name to sort by.
    pub field: String,
    /// Direction.
    pub direction: SortDirection,
}

impl Sort {
    /// Creates a sort key.
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    /// Ascending sort on `field`.
    pub fn asc(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Asc)
    }

    /// Descending sort on `field`.
    pub fn desc(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Desc)
    }
}

/// Immutable parameters for a list operation.
///
/// The continuation cursor cannot be set through the builder; it is issued
/// by the server and fed back internally while paginating.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuerySpec {
    fields: Vec<String>,
    page_size: Option<u32>,
    max_records: Option<u32>,
    view: Option<String>,
    sorts: Vec<Sort>,
    filter_by_formula: Option<String>,
    offset: Option<String>,
}

impl QuerySpec {
    /// Returns a builder for a query.
    #[must_use]
    pub fn builder() -> QuerySpecBuilder {
        QuerySpecBuilder::default()
    }

    /// Selected fields; empty means all fields.
    #[must_use]
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Requested page size, as given (before capping).
    #[must_use]
    pub fn page_size(&self) -> Option<u32> {
        self.page_size
    }

    /// Maximum total records to return across all pages.
    #[must_use]
    pub fn max_records(&self) -> Option<u32> {
        self.max_records
    }

    /// View name or id.
    #[must_use]
    pub fn view(&self) -> Option<&str> {
        self.view.as_deref()
    }

    /// Sort keys in priority order.
    #[must_use]
    pub fn sorts(&self) -> &[Sort] {
        &self.sorts
    }

    /// Filter formula, passed through unmodified.
    #[must_use]
    pub fn filter_by_formula(&self) -> Option<&str> {
        self.filter_by_formula.as_deref()
    }

    /// Server-issued continuation cursor.
    #[must_use]
    pub fn offset(&self) -> Option<&str> {
        self.offset.as_deref()
    }

    /// Copy of this query continuing at `offset`.
    pub(crate) fn with_offset(&self, offset: String) -> Self {
        Self {
            offset: Some(offset),
            ..self.clone()
        }
    }
}

/// Builder for [`QuerySpec`].
#[derive(Debug, Clone, Default)]
pub struct QuerySpecBuilder {
    spec: QuerySpec,
}

impl QuerySpecBuilder {
    /// Adds a field to retrieve.
    #[must_use]
    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.spec.fields.push(field.into());
        self
    }

    /// Adds several fields to retrieve, preserving order.
    #[must_use]
    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.spec.fields.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Sets records per page. Values above 100 are capped when the request is built.
    #[must_use]
    pub fn page_size(mut self, page_size: u32) -> Self {
        self.spec.page_size = Some(page_size);
        self
    }

    /// Limits the total number of records returned.
    #[must_use]
    pub fn max_records(mut self, max_records: u32) -> Self {
        self.spec.max_records = Some(max_records);
        self
    }

    /// Restricts results to a view.
    #[must_use]
    pub fn view(mut self, view: impl Into<String>) -> Self {
        self.spec.view = Some(view.into());
        self
    }

    /// Appends a sort key.
    #[must_use]
    pub fn sort(mut self, sort: Sort) -> Self {
        self.spec.sorts.push(sort);
        self
    }

    /// Sets the filter formula.
    #[must_use]
    pub fn filter_by_formula(mut self, formula: impl Into<String>) -> Self {
        self.spec.filter_by_formula = Some(formula.into());
        self
    }

    /// Builds the query.
    #[must_use]
    pub fn build(self) -> QuerySpec {
        self.spec
    }
}

/// Returns the query parameters for `spec`, in emission order.
#[must_use]
pub fn query_pairs(spec: &QuerySpec) -> Vec<(String, String)> {
    let mut pairs = Vec::new();

    for field in &spec.fields {
        pairs.push(("fields[]".to_string(), field.clone()));
    }
    if let Some(max_records) = spec.max_records {
        pairs.push(("maxRecords".to_string(), max_records.to_string()));
    }
    if let Some(view) = &spec.view {
        pairs.push(("view".to_string(), view.clone()));
    }
    if let Some(formula) = &spec.filter_by_formula {
        pairs.push(("filterByFormula".to_string(), formula.clone()));
    }
    if let Some(page_size) = spec.page_size {
        pairs.push(("pageSize".to_string(), clamp_page_size(page_size).to_string()));
    }
    for (i, sort) in spec.sorts.iter().enumerate() {
        pairs.push((format!("sort[{i}][field]"), sort.field.clone()));
        pairs.push((format!("sort[{i}][direction]"), sort.direction.to_string()));
    }
    if let Some(offset) = &spec.offset {
        pairs.push(("offset".to_string(), offset.clone()));
    }

    pairs
}

/// Builds the GET request listing `table_url` with the parameters of `spec`.
#[must_use]
pub fn build_query_request(spec: &QuerySpec, table_url: &Url) -> HttpRequest {
    let mut url = table_url.clone();
    let pairs = query_pairs(spec);
    if !pairs.is_empty() {
        url.query_pairs_mut().extend_pairs(pairs);
    }
    debug!(url = %url, "built query request");
    HttpRequest::new(Method::GET, url)
}

fn clamp_page_size(page_size: u32) -> u32 {
    if page_size > MAX_PAGE_SIZE {
        warn!(
            requested = page_size,
            max = MAX_PAGE_SIZE,
            "page size above maximum, using maximum"
        );
        MAX_PAGE_SIZE
    } else {
        page_size
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn table_url() -> Url {
        Url::parse("https://api.example.com/v0/appBase/Table").unwrap()
    }

    fn pairs_of(request: &HttpRequest) -> Vec<(String, String)> {
        request
            .url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    #[test]
    fn test_empty_query_has_no_parameters() {
        let request = build_query_request(&QuerySpec::default(), &table_url());
        assert_eq!(request.method, Method::GET);
        assert_eq!(request.url.query(), None);
        assert_eq!(request.url, table_url());
    }

    #[test]
    fn test_fields_repeat_in_order() {
        let spec = QuerySpec::builder().fields(["b", "a", "c"]).build();
        let request = build_query_request(&spec, &table_url());
        let fields: Vec<_> = pairs_of(&request)
            .into_iter()
            .filter(|(k, _)| k == "fields[]")
            .map(|(_, v)| v)
            .collect();
        assert_eq!(fields, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_page_size_above_max_is_capped() {
        let spec = QuerySpec::builder().page_size(250).build();
        assert_eq!(
            query_pairs(&spec),
            vec![("pageSize".to_string(), "100".to_string())]
        );
    }

    #[test]
    fn test_page_size_within_limit_is_unchanged() {
        let spec = QuerySpec::builder().page_size(100).build();
        assert_eq!(query_pairs(&spec)[0].1, "100");

        let spec = QuerySpec::builder().page_size(7).build();
        assert_eq!(query_pairs(&spec)[0].1, "7");
    }

    #[test]
    fn test_full_query_parameter_order() {
        let spec = QuerySpec::builder()
            .sort(Sort::asc("Name"))
            .page_size(10)
            .filter_by_formula("{Done} = 1")
            .view("Grid view")
            .max_records(50)
            .field("Name")
            .field("Notes")
            .sort(Sort::desc("Created"))
            .build()
            .with_offset("itrCursor/rec1".to_string());

        let expected: Vec<(String, String)> = [
            ("fields[]", "Name"),
            ("fields[]", "Notes"),
            ("maxRecords", "50"),
            ("view", "Grid view"),
            ("filterByFormula", "{Done} = 1"),
            ("pageSize", "10"),
            ("sort[0][field]", "Name"),
            ("sort[0][direction]", "asc"),
            ("sort[1][field]", "Created"),
            ("sort[1][direction]", "desc"),
            ("offset", "itrCursor/rec1"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        assert_eq!(query_pairs(&spec), expected);
        assert_eq!(pairs_of(&build_query_request(&spec, &table_url())), expected);
    }

    #[test]
    fn test_with_offset_keeps_other_parameters() {
        let spec = QuerySpec::builder().view("v").page_size(5).build();
        let next = spec.with_offset("abc".to_string());

        assert_eq!(spec.offset(), None);
        assert_eq!(next.offset(), Some("abc"));
        assert_eq!(next.view(), Some("v"));
        assert_eq!(next.page_size(), Some(5));
    }

    #[test]
    fn test_sort_direction_parse() {
        assert_eq!("DESC".parse::<SortDirection>().unwrap(), SortDirection::Desc);
        assert_eq!("asc".parse::<SortDirection>().unwrap(), SortDirection::Asc);
        assert!("sideways".parse::<SortDirection>().is_err());
    }
}

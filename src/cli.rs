//! CLI argument definitions using clap derive macros.

use clap::{Args as ClapArgs, Parser, Subcommand};
use serde_json::Value;

use airtable_client::constants::DEFAULT_MAX_RETRIES;
use airtable_client::{QuerySpec, Sort, SortDirection};

/// Query and edit the records of an Airtable table.
///
/// The API key is read from --api-key or AIRTABLE_API_KEY. Records are
/// printed to stdout as JSON; logs go to stderr.
#[derive(Parser, Debug)]
#[command(name = "airtable")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// API key (defaults to AIRTABLE_API_KEY)
    #[arg(long)]
    pub api_key: Option<String>,

    /// API endpoint including the version segment (defaults to AIRTABLE_ENDPOINT_URL, then https://api.airtable.com/v0)
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Request timeout in seconds
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout_secs: Option<u64>,

    /// Retries for rate-limited requests (0-10)
    #[arg(long, default_value_t = DEFAULT_MAX_RETRIES as u8, value_parser = clap::value_parser!(u8).range(0..=10))]
    pub retries: u8,

    /// Base id, e.g. appXXXXXXXXXXXXXX
    #[arg(long)]
    pub base: String,

    /// Table name or id
    #[arg(long)]
    pub table: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Table operations.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List records, one JSON object per line
    List(ListArgs),

    /// Print one record
    Find {
        /// Record id
        id: String,
    },

    /// Create a record from a JSON object of fields
    Create {
        /// Fields, e.g. '{"Name":"x"}'
        #[arg(value_parser = parse_fields)]
        fields: Value,
    },

    /// Update the given fields of a record
    Update {
        /// Record id
        id: String,
        /// Fields to change, e.g. '{"Done":true}'
        #[arg(value_parser = parse_fields)]
        fields: Value,
    },

    /// Delete a record
    Delete {
        /// Record id
        id: String,
    },
}

/// Options for `list`.
#[derive(ClapArgs, Debug)]
pub struct ListArgs {
    /// Field to include (repeatable; default all fields)
    #[arg(long = "field")]
    pub fields: Vec<String>,

    /// View name or id
    #[arg(long)]
    pub view: Option<String>,

    /// Formula records must satisfy
    #[arg(long)]
    pub filter: Option<String>,

    /// Maximum records across all pages
    #[arg(long)]
    pub max_records: Option<u32>,

    /// Records per page (values above 100 are capped)
    #[arg(long)]
    pub page_size: Option<u32>,

    /// Sort key as FIELD or FIELD:asc|desc (repeatable)
    #[arg(long = "sort", value_parser = parse_sort)]
    pub sorts: Vec<Sort>,

    /// Fetch only the first page
    #[arg(long)]
    pub single_page: bool,
}

impl ListArgs {
    /// Builds the query described by these options.
    pub fn to_query(&self) -> QuerySpec {
        let mut builder = QuerySpec::builder().fields(self.fields.iter().cloned());
        if let Some(view) = &self.view {
            builder = builder.view(view);
        }
        if let Some(filter) = &self.filter {
            builder = builder.filter_by_formula(filter);
        }
        if let Some(max_records) = self.max_records {
            builder = builder.max_records(max_records);
        }
        if let Some(page_size) = self.page_size {
            builder = builder.page_size(page_size);
        }
        for sort in &self.sorts {
            builder = builder.sort(sort.clone());
        }
        builder.build()
    }
}

fn parse_sort(value: &str) -> Result<Sort, String> {
    let sort = match value.rsplit_once(':') {
        Some((field, direction)) => match direction.parse::<SortDirection>() {
            Ok(direction) => Sort::new(field, direction),
            Err(_) => Sort::asc(value),
        },
        None => Sort::asc(value),
    };
    if sort.field.is_empty() {
        return Err("sort field must not be empty".to_string());
    }
    Ok(sort)
}

fn parse_fields(value: &str) -> Result<Value, String> {
    let fields: Value = serde_json::from_str(value).map_err(|e| format!("invalid JSON: {e}"))?;
    if !fields.is_object() {
        return Err("expected a JSON object of fields".to_string());
    }
    Ok(fields)
}

//! CLI entry point for the airtable tool.

use std::io::{self, Write};
use std::time::Duration;

use airtable_client::{Airtable, Configuration, RetrySettings, TableClient};
use anyhow::{Context, Result};
use clap::Parser;
use futures_util::TryStreamExt;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, info};

mod cli;

use cli::{Args, Command, ListArgs};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    // stdout carries the JSON output
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    debug!(
        base = %args.base,
        table = %args.table,
        command = ?args.command,
        "CLI arguments parsed"
    );

    let config = build_config(&args)?;
    let airtable = Airtable::new(config).context("failed to create client")?;
    let table: TableClient<Value> = airtable.table(&args.base, &args.table)?;

    match args.command {
        Command::List(list) => run_list(&table, &list).await?,
        Command::Find { id } => print_json(&table.find(&id).await?)?,
        Command::Create { fields } => {
            let record = table.create(&fields).await?;
            info!(id = record.id(), "Created record");
            print_json(&record)?;
        }
        Command::Update { id, fields } => print_json(&table.update(&id, &fields).await?)?,
        Command::Delete { id } => {
            let deleted = table.delete(&id).await?;
            print_json(&json!({ "id": id, "deleted": deleted }))?;
        }
    }

    Ok(())
}

fn build_config(args: &Args) -> Result<Configuration> {
    let mut builder = Configuration::builder_from_env(args.api_key.clone(), args.endpoint.clone())?
        .retry(RetrySettings {
            retries: u32::from(args.retries),
            ..RetrySettings::default()
        });
    if let Some(secs) = args.timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }

    Ok(builder.build()?)
}

async fn run_list(table: &TableClient<Value>, list: &ListArgs) -> Result<()> {
    let query = list.to_query();

    if list.single_page {
        let page = table.list_page_with(query).await?;
        for record in &page.records {
            print_json(record)?;
        }
        if let Some(offset) = &page.offset {
            info!(offset = %offset, "More records available");
        }
        return Ok(());
    }

    let mut records = table.list_all_with(query);
    let mut count = 0usize;
    while let Some(record) = records.try_next().await? {
        print_json(&record)?;
        count += 1;
    }
    info!(records = count, "Listed records");
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let line = serde_json::to_string(value)?;
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{line}")?;
    Ok(())
}

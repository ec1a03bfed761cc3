//! Dynadispatch CLI - dispatch a single event against in-memory storage
//!
//! Usage:
//!   dynadispatch --table users=id event.json    Dispatch an event file
//!   dynadispatch --table users=id                Read the event from stdin
//!   dynadispatch --seed seed.json --table users=id event.json

use std::collections::HashMap;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::Parser;
use serde_json::Value;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use dynadispatch::{DispatchConfig, Dispatcher, Event, InMemoryStorage};

/// Dynadispatch - dispatch storage operation events
#[derive(Parser, Debug)]
#[command(name = "dynadispatch")]
#[command(about = "Dispatch a storage operation event and print the response")]
struct Args {
    /// Event file to dispatch; reads stdin when absent or `-`
    event: Option<PathBuf>,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Declare a table as NAME=KEY[,KEY...]
    #[arg(long = "table", value_name = "NAME=KEYS", value_parser = parse_table)]
    tables: Vec<TableSpec>,

    /// JSON file of `{table: [items]}` created before the event runs
    #[arg(long)]
    seed: Option<PathBuf>,

    /// Pretty-print the response
    #[arg(long)]
    pretty: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct TableSpec {
    name: String,
    keys: Vec<String>,
}

fn parse_table(s: &str) -> Result<TableSpec, String> {
    let (name, keys) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=KEY[,KEY...], got {s:?}"))?;
    let keys: Vec<String> = keys
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(String::from)
        .collect();
    if name.is_empty() || keys.is_empty() {
        return Err(format!("table {s:?} needs a name and at least one key"));
    }
    Ok(TableSpec {
        name: name.to_string(),
        keys,
    })
}

fn read_json(path: &Path) -> anyhow::Result<Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid JSON in {}", path.display()))
}

fn read_event(path: Option<&Path>) -> anyhow::Result<Value> {
    match path {
        Some(path) if path != Path::new("-") => read_json(path),
        _ => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("failed to read stdin")?;
            serde_json::from_str(&text).context("invalid JSON on stdin")
        }
    }
}

async fn seed(dispatcher: &Dispatcher<InMemoryStorage>, path: &Path) -> anyhow::Result<()> {
    let tables: HashMap<String, Vec<Value>> = serde_json::from_value(read_json(path)?)
        .with_context(|| format!("seed file {} must map tables to item lists", path.display()))?;

    for (table, items) in tables {
        for item in items {
            let event = Event::new("create")
                .with_table(table.as_str())
                .with_field("Item", item);
            let response = dispatcher.handle(serde_json::to_value(&event)?).await;
            if !response.is_success() {
                bail!("failed to seed table {table}: {}", response.body);
            }
        }
        tracing::info!(table = %table, "seeded table");
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Log to stderr so stdout carries only the response
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => DispatchConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => DispatchConfig::default(),
    };

    let storage = args
        .tables
        .iter()
        .fold(InMemoryStorage::new(), |storage, table| {
            storage.with_table(table.name.as_str(), table.keys.iter().map(String::as_str))
        });
    let dispatcher = Dispatcher::with_config(Arc::new(storage), config);

    if let Some(path) = &args.seed {
        seed(&dispatcher, path).await?;
    }

    let event = read_event(args.event.as_deref())?;
    let response = dispatcher.handle(event).await;

    let output = if args.pretty {
        serde_json::to_string_pretty(&response)?
    } else {
        serde_json::to_string(&response)?
    };
    println!("{output}");

    std::process::exit(if response.is_success() { 0 } else { 1 });
}

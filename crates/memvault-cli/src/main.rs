//! Memvault - quota-enforced memory store CLI
//!
//! The `memvault` command operates on a file-backed store in a data
//! directory (default `.memvault`, or `MEMVAULT_DATA_DIR`).
//!
//! ## Commands
//!
//! - `save`: Store a new memory
//! - `delete`: Remove a memory by id
//! - `list` / `show`: Read stored memories
//! - `stats`: Usage against the current plan
//! - `warning`: Capacity warning, if any
//! - `plan`: Show or change the plan

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, Level};

use memvault_core::{
    fs_store_builder, FsKvStore, LoggingSync, MemoryFields, Plan, QuotaError, QuotaStore,
    StoreConfig, SyncDispatcher,
};

#[derive(Parser)]
#[command(name = "memvault")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Local memory store with free-tier quota enforcement", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// How command results are printed
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,

    /// Data directory (overrides MEMVAULT_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Free-tier record ceiling (overrides MEMVAULT_FREE_LIMIT)
    #[arg(long, global = true)]
    free_limit: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a new memory
    Save {
        /// Main text of the memory, stored under the `text` field
        text: Option<String>,

        /// Extra field as key=value; values that parse as JSON are kept typed
        #[arg(short, long = "field", value_parser = parse_field)]
        fields: Vec<(String, Value)>,

        /// Whole record as a JSON object, merged under --field values
        #[arg(long)]
        record: Option<String>,
    },

    /// Delete a memory by id
    Delete {
        id: String,
    },

    /// List all memories in insertion order
    List,

    /// Show one memory
    Show {
        id: String,
    },

    /// Show usage against the current plan
    Stats,

    /// Show the capacity warning, if any
    Warning,

    /// Show the current plan, or switch to a new one
    Plan {
        #[arg(value_enum)]
        plan: Option<PlanArg>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum PlanArg {
    Free,
    Premium,
}

impl From<PlanArg> for Plan {
    fn from(arg: PlanArg) -> Self {
        match arg {
            PlanArg::Free => Plan::Free,
            PlanArg::Premium => Plan::Premium,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };
    memvault_core::init_tracing(cli.json, level);

    let config = resolve_config(&cli)?;
    let _span = memvault_core::obs::StoreSpan::enter(&config.data_dir.display().to_string());
    let sync = SyncDispatcher::new(Arc::new(LoggingSync));
    let mut store = fs_store_builder(&config)
        .with_context(|| format!("Failed to open data directory {:?}", config.data_dir))?
        .remote_sync(sync.clone())
        .build();

    let out = cli.output;
    let result = match cli.command {
        Commands::Save {
            text,
            fields,
            record,
        } => cmd_save(&mut store, out, text, fields, record.as_deref()),
        Commands::Delete { id } => cmd_delete(&mut store, out, &id),
        Commands::List => cmd_list(&store, out),
        Commands::Show { id } => cmd_show(&store, out, &id),
        Commands::Stats => cmd_stats(&store, out),
        Commands::Warning => cmd_warning(&store, out),
        Commands::Plan { plan } => cmd_plan(&mut store, out, plan.map(Plan::from)),
    };

    // Remote pushes must finish before the runtime is dropped.
    sync.flush().await;
    result
}

fn resolve_config(cli: &Cli) -> Result<StoreConfig> {
    let mut config = StoreConfig::from_env().context("Invalid memvault environment")?;
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(limit) = cli.free_limit {
        config.limits.free_limit = limit;
    }
    config.validate()?;
    debug!(?config, "resolved configuration");
    Ok(config)
}

/// Parse `key=value`, keeping the value as JSON when it parses as JSON.
fn parse_field(raw: &str) -> std::result::Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got {raw:?}"))?;
    if key.is_empty() {
        return Err(format!("empty field name in {raw:?}"));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

fn build_fields(
    text: Option<String>,
    fields: Vec<(String, Value)>,
    record: Option<&str>,
) -> Result<MemoryFields> {
    let mut out = match record {
        Some(raw) => match serde_json::from_str(raw).context("--record is not valid JSON")? {
            Value::Object(map) => map,
            _ => bail!("--record must be a JSON object"),
        },
        None => MemoryFields::new(),
    };
    if let Some(text) = text {
        out.insert("text".to_string(), Value::String(text));
    }
    out.extend(fields);
    if out.is_empty() {
        bail!("nothing to save: pass TEXT, --field or --record");
    }
    Ok(out)
}

fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Store a new memory
fn cmd_save(
    store: &mut QuotaStore<FsKvStore>,
    out: OutputFormat,
    text: Option<String>,
    fields: Vec<(String, Value)>,
    record: Option<&str>,
) -> Result<()> {
    let fields = build_fields(text, fields, record)?;
    let saved = match store.save(fields) {
        Ok(saved) => saved,
        Err(err) => match &err {
            QuotaError::FreeLimitExceeded {
                current_count,
                limit,
            } => bail!("{}: {} ({current_count}/{limit})", err.kind(), err.message()),
            _ => bail!("{}: {}", err.kind(), err.message()),
        },
    };

    match out {
        OutputFormat::Json => print_json(&saved)?,
        OutputFormat::Text => {
            println!("Saved memory {}", saved.memory.id);
            println!("Count: {}", saved.current_count);
        }
    }

    let warning = store.check_storage_warning();
    if let (OutputFormat::Text, Some(message)) = (out, warning.message()) {
        eprintln!("{message}");
    }
    Ok(())
}

/// Delete a memory by id
fn cmd_delete(store: &mut QuotaStore<FsKvStore>, out: OutputFormat, id: &str) -> Result<()> {
    let deleted = store
        .delete(id)
        .map_err(|err| anyhow::anyhow!("{}: {}", err.kind(), err.message()))?;

    match out {
        OutputFormat::Json => print_json(&serde_json::json!({ "id": id, "deleted": deleted }))?,
        OutputFormat::Text if deleted => println!("Deleted memory {id}"),
        OutputFormat::Text => println!("No memory with id {id}"),
    }
    Ok(())
}

/// List all memories
fn cmd_list(store: &QuotaStore<FsKvStore>, out: OutputFormat) -> Result<()> {
    if out == OutputFormat::Json {
        return print_json(&store.list());
    }

    if store.is_empty() {
        println!("No memories stored");
        return Ok(());
    }
    for memory in store.list() {
        let summary = memory
            .field("text")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| Value::Object(memory.fields.clone()).to_string());
        println!(
            "{}  {}  {}",
            memory.id,
            memory.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
            summary
        );
    }
    Ok(())
}

/// Show one memory
fn cmd_show(store: &QuotaStore<FsKvStore>, out: OutputFormat, id: &str) -> Result<()> {
    let Some(memory) = store.get(id) else {
        bail!("No memory with id {id}");
    };
    match out {
        OutputFormat::Json => print_json(memory),
        OutputFormat::Text => {
            println!("id        {}", memory.id);
            println!("createdAt {}", memory.created_at.to_rfc3339());
            for (key, value) in &memory.fields {
                println!("{key:<9} {value}");
            }
            Ok(())
        }
    }
}

/// Show usage against the current plan
fn cmd_stats(store: &QuotaStore<FsKvStore>, out: OutputFormat) -> Result<()> {
    let stats = store.usage_stats();
    match out {
        OutputFormat::Json => print_json(&stats),
        OutputFormat::Text => {
            println!("Plan:        {}", stats.plan);
            println!("Count:       {}", stats.current_count);
            println!("Limit:       {}", stats.limit);
            println!("Used:        {}%", stats.percentage);
            println!("Can add:     {}", if stats.can_add_more { "yes" } else { "no" });
            Ok(())
        }
    }
}

/// Show the capacity warning
fn cmd_warning(store: &QuotaStore<FsKvStore>, out: OutputFormat) -> Result<()> {
    let warning = store.check_storage_warning();
    match (out, warning.level(), warning.message()) {
        (OutputFormat::Json, _, _) => print_json(&warning)?,
        (OutputFormat::Text, Some(level), Some(message)) => println!("{level}: {message}"),
        (OutputFormat::Text, _, _) => println!("No warning"),
    }
    Ok(())
}

/// Show or change the plan
fn cmd_plan(
    store: &mut QuotaStore<FsKvStore>,
    out: OutputFormat,
    plan: Option<Plan>,
) -> Result<()> {
    let Some(plan) = plan else {
        match out {
            OutputFormat::Json => print_json(&serde_json::json!({ "plan": store.plan() }))?,
            OutputFormat::Text => println!("{}", store.plan()),
        }
        return Ok(());
    };

    let change = store
        .set_plan(plan)
        .map_err(|err| anyhow::anyhow!("{}: {}", err.kind(), err.message()))?;
    match out {
        OutputFormat::Json => print_json(&change)?,
        OutputFormat::Text => {
            println!("Plan set to {}", change.plan);
            println!(
                "Usage: {} of {} ({}%)",
                change.usage.current_count, change.usage.limit, change.usage.percentage
            );
        }
    }
    Ok(())
}

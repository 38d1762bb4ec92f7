use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use bytes::Bytes;
use chrono::Utc;
use clap::{ArgAction, Parser, Subcommand};
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

use partnerdesk_agent::{relay_for, ChatSession};
use partnerdesk_core::{
    aggregate, daily_volume, default_window, prepare, recent_interactions, synthetic_events,
    AppConfig, DatasetKind, PricingConfig, DEFAULT_RECENT_LIMIT,
};
use partnerdesk_storage::{
    delete_objects, describe_object, list_objects, load_sdk_config, publish, BackupOutcome,
    NoticeLevel, ObjectStore, S3Store,
};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const DEFAULT_SYNTHETIC_EVENTS: usize = 100;

#[derive(Parser, Debug)]
#[command(name = "partnerdesk", version = VERSION, about = "Partner data desk CLI")]
struct Cli {
    /// Secrets file; falls back to PARTNERDESK_SECRETS, then secrets.toml.
    #[arg(long, global = true)]
    secrets: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Transform an export and publish it to its bucket key.
    Upload {
        #[arg(value_parser = parse_kind)]
        kind: DatasetKind,
        input: PathBuf,
    },
    /// Transform an export locally without touching the bucket.
    Transform {
        #[arg(value_parser = parse_kind)]
        kind: DatasetKind,
        input: PathBuf,
        #[arg(short = 'o', long = "out")]
        out: Option<PathBuf>,
    },
    /// List every key in the bucket.
    List,
    /// Delete keys from the bucket.
    Delete {
        #[arg(required = true)]
        keys: Vec<String>,
        #[arg(long, action = ArgAction::SetTrue)]
        yes: bool,
    },
    /// Show when the contacts and rolodex files were last updated.
    Status,
    /// Send one prompt to the agent.
    Chat {
        #[arg(required = true, trailing_var_arg = true)]
        prompt: Vec<String>,
    },
    /// Summarise agent usage over the last seven days.
    Metrics {
        #[arg(long, action = ArgAction::SetTrue)]
        json: bool,
        #[arg(long, default_value_t = DEFAULT_SYNTHETIC_EVENTS)]
        events: usize,
    },
}

fn parse_kind(value: &str) -> Result<DatasetKind, String> {
    DatasetKind::from_str(value).ok_or_else(|| {
        let names: Vec<&str> = DatasetKind::ALL.iter().map(|k| k.as_str()).collect();
        format!("unknown dataset {value}; expected one of {}", names.join(", "))
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Transform { kind, input, out } => {
            let bytes = read_input(&input)?;
            let prepared = prepare(kind, &bytes)?;
            match out {
                Some(path) => {
                    fs::write(&path, &prepared.csv)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    println!(
                        "{} rows, columns: {} -> {}",
                        prepared.rows,
                        prepared.columns.join(", "),
                        path.display()
                    );
                }
                None => print!("{}", String::from_utf8_lossy(&prepared.csv)),
            }
        }
        Commands::Metrics { json, events } => {
            let config = load_config(cli.secrets.as_deref()).ok();
            let pricing = config
                .map(|c| c.pricing.normalized())
                .unwrap_or_else(|| PricingConfig::default().normalized());
            let now = Utc::now();
            let log = synthetic_events(events, now, &mut rand::thread_rng());
            let window = default_window();
            let summary = aggregate(&log, now, window, &pricing);
            if json {
                let payload = json!({
                    "window_days": window.num_days(),
                    "pricing": pricing,
                    "summary": summary,
                    "daily_volume": daily_volume(&log),
                    "recent": recent_interactions(&log, DEFAULT_RECENT_LIMIT),
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                println!("Total queries:        {}", summary.total_queries);
                println!("Avg latency:          {:.2} s", summary.avg_latency_seconds);
                println!("Positive feedback:    {:.1} %", summary.positive_feedback_rate);
                println!("Total tokens:         {}", summary.total_tokens);
                println!("Total cost:           ${:.4}", summary.total_cost);
                println!("Avg cost per query:   ${:.5}", summary.avg_cost_per_query);
                for day in daily_volume(&log) {
                    println!("  {}  {}", day.label, day.count);
                }
            }
        }
        Commands::Upload { kind, input } => {
            let config = load_config(cli.secrets.as_deref())?;
            let store = connect_store(&config).await;
            let bytes = read_input(&input)?;
            let prepared = prepare(kind, &bytes)
                .with_context(|| format!("an error occurred with the {} file", kind.label()))?;
            let destination = kind.destination_key(&config.keys);
            let report = publish(store.as_ref(), Bytes::from(prepared.csv), destination).await?;
            for notice in &report.notices {
                let tag = match notice.level {
                    NoticeLevel::Info => "info",
                    NoticeLevel::Warning => "warning",
                    NoticeLevel::Success => "ok",
                };
                println!("[{tag}] {}", notice.message);
            }
            if let BackupOutcome::Created { key } = &report.backup {
                info!(backup = %key, "previous version kept");
            }
        }
        Commands::List => {
            let config = load_config(cli.secrets.as_deref())?;
            let store = connect_store(&config).await;
            let keys = list_objects(store.as_ref()).await?;
            if keys.is_empty() {
                println!("bucket {} is empty", store.bucket());
            }
            for key in keys {
                println!("{key}");
            }
        }
        Commands::Delete { keys, yes } => {
            if !yes {
                bail!(
                    "deleting files is permanent and cannot be undone; re-run with --yes to delete {} file(s)",
                    keys.len()
                );
            }
            let config = load_config(cli.secrets.as_deref())?;
            let store = connect_store(&config).await;
            let deleted = delete_objects(store.as_ref(), &keys).await?;
            println!("Successfully deleted {deleted} files.");
        }
        Commands::Status => {
            let config = load_config(cli.secrets.as_deref())?;
            let store = connect_store(&config).await;
            for kind in DatasetKind::ALL {
                let key = kind.destination_key(&config.keys);
                let status = describe_object(store.as_ref(), key).await;
                println!("{:<18} {:<28} {}", kind.label(), key, status);
            }
        }
        Commands::Chat { prompt } => {
            let config = load_config(cli.secrets.as_deref())?;
            let sdk = load_sdk_config(&config.aws).await;
            let relay = relay_for(&config.agent, Some(&sdk));
            let mut session = ChatSession::new();
            let reply = relay.send(&mut session, &prompt.join(" ")).await;
            println!("{}", reply.content);
        }
    }
    Ok(())
}

fn load_config(secrets: Option<&Path>) -> Result<AppConfig> {
    let config = match secrets {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    };
    config.context("failed to load configuration")
}

async fn connect_store(config: &AppConfig) -> Arc<dyn ObjectStore> {
    let sdk = load_sdk_config(&config.aws).await;
    Arc::new(S3Store::new(&sdk, &config.aws, config.bucket.clone()))
}

fn read_input(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("failed to read {}", path.display()))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn dataset_names_parse() {
        assert_eq!(parse_kind("rolodex"), Ok(DatasetKind::Rolodex));
        assert_eq!(parse_kind("Contacts"), Ok(DatasetKind::Contacts));
        assert!(parse_kind("invoices").unwrap_err().contains("contacts, rolodex"));
    }

    #[test]
    fn delete_parses_keys_and_confirmation() {
        let cli = Cli::try_parse_from(["partnerdesk", "delete", "a.csv", "b.csv", "--yes"]).unwrap();
        match cli.command {
            Commands::Delete { keys, yes } => {
                assert_eq!(keys, vec!["a.csv", "b.csv"]);
                assert!(yes);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn chat_joins_words_into_one_prompt() {
        let cli = Cli::try_parse_from(["partnerdesk", "chat", "who", "owns", "Acme?"]).unwrap();
        match cli.command {
            Commands::Chat { prompt } => assert_eq!(prompt.join(" "), "who owns Acme?"),
            other => panic!("unexpected command {other:?}"),
        }
    }
}

//! CodeMem entry point.
//!
//! One-shot commands print JSON to stdout; `serve` speaks JSON-RPC over
//! stdio and `watch` keeps a directory indexed until interrupted. Logs go to
//! stderr in every mode.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use codemem_memory::{
    Decision, DecisionStatus, LinkRelation, ObjectId, ObjectLink, ObjectType, Provenance,
};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use codemem_server::api::{
    CreateObjectRequest, ListRequest, ObjectPayload, ObjectRef, ParseRequest, QueryRequestDto,
    StatsRequest, DEFAULT_QUERY_LIMIT,
};
use codemem_server::rpc::{LineTransport, RpcServer};
use codemem_server::{CodeMemoryService, FileWatcher, ServiceConfig};

#[derive(Parser)]
#[command(name = "codemem")]
#[command(about = "Code memory: symbol extraction, decision records and ranked search")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    config: ServiceConfig,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract symbols from a file without storing them
    Parse {
        file: PathBuf,
        #[arg(long, default_value = "")]
        language: String,
    },
    /// Index every supported file under a directory
    Index {
        dir: PathBuf,
        /// Glob relative to the directory; repeatable
        #[arg(long)]
        exclude: Vec<String>,
    },
    /// Ranked search over the current scope
    Query {
        text: String,
        #[arg(long, default_value_t = DEFAULT_QUERY_LIMIT)]
        limit: usize,
        #[arg(long, default_value_t = 0)]
        offset: usize,
        /// Restrict to symbol or decision; repeatable
        #[arg(long = "type")]
        types: Vec<ObjectType>,
    },
    /// Manage decision records
    #[command(subcommand)]
    Decision(DecisionCommand),
    /// Fetch one object by id
    Get { id: String },
    /// Delete one object by id
    Delete { id: String },
    /// List objects in the current scope
    List {
        #[arg(long = "type")]
        object_type: Option<ObjectType>,
    },
    /// Object counts
    Stats {
        /// Count the whole store instead of the current scope
        #[arg(long)]
        all: bool,
    },
    /// Supported languages
    Languages,
    /// Index a directory, then re-index on change until interrupted
    Watch {
        dir: PathBuf,
        #[arg(long)]
        exclude: Vec<String>,
    },
    /// Serve JSON-RPC over stdio
    Serve,
}

#[derive(Subcommand)]
enum DecisionCommand {
    /// Record a new decision
    Add {
        #[arg(long)]
        title: String,
        #[arg(long)]
        problem: String,
        #[arg(long)]
        rationale: String,
        #[arg(long)]
        outcome: String,
        #[arg(long, default_value = "accepted")]
        status: DecisionStatus,
        /// Provenance summary
        #[arg(long, default_value = "Recorded from the command line")]
        summary: String,
        /// Id of an object this decision justifies; repeatable
        #[arg(long)]
        justifies: Vec<ObjectId>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.config.log_filter().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run(cli).await {
        tracing::error!("{:#}", e);
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let Cli { config, command } = cli;
    let scope = config.scope()?;
    let tenant_id = scope.tenant_id.clone();
    let project_id = scope.project_id.clone();
    let agent = config.agent.clone();
    let service = Arc::new(CodeMemoryService::open(config).context("Failed to open memory store")?);

    match command {
        Command::Parse { file, language } => {
            let content = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let response = service.parse(&ParseRequest {
                file_path: file.to_string_lossy().to_string(),
                content,
                language,
            })?;
            print_json(&response)
        }
        Command::Index { dir, exclude } => {
            let result = service
                .indexer()
                .index_directory(&scope, &dir, &exclude)
                .await
                .with_context(|| format!("Failed to index {}", dir.display()))?;
            tracing::info!(
                "Indexed {} files ({} unchanged, {} failed)",
                result.succeeded.len(),
                result.skipped.len(),
                result.failed.len()
            );
            print_json(&result)
        }
        Command::Query {
            text,
            limit,
            offset,
            types,
        } => {
            let response = service
                .query(QueryRequestDto {
                    text,
                    limit,
                    offset,
                    tenant_id,
                    project_id,
                    types,
                })
                .await?;
            print_json(&response)
        }
        Command::Decision(DecisionCommand::Add {
            title,
            problem,
            rationale,
            outcome,
            status,
            summary,
            justifies,
        }) => {
            let created = service
                .create(CreateObjectRequest {
                    tenant_id,
                    project_id,
                    provenance: Provenance::new(agent, summary),
                    links: justifies
                        .into_iter()
                        .map(|target| ObjectLink::new(LinkRelation::Justifies, target))
                        .collect(),
                    body: ObjectPayload::Decision(
                        Decision::new(title, problem, rationale, outcome).with_status(status),
                    ),
                })
                .await?;
            print_json(&created)
        }
        Command::Get { id } => {
            let view = service.get(&ObjectRef {
                id,
                tenant_id,
                project_id,
            })?;
            print_json(&view)
        }
        Command::Delete { id } => {
            service
                .delete(&ObjectRef {
                    id: id.clone(),
                    tenant_id,
                    project_id,
                })
                .await?;
            print_json(&serde_json::json!({ "deleted": id }))
        }
        Command::List { object_type } => {
            let objects = service.list(&ListRequest {
                tenant_id,
                project_id,
                object_type,
            })?;
            print_json(&objects)
        }
        Command::Stats { all } => {
            let request = if all {
                StatsRequest::default()
            } else {
                StatsRequest {
                    tenant_id: Some(tenant_id),
                    project_id: Some(project_id),
                }
            };
            print_json(&service.stats(&request)?)
        }
        Command::Languages => {
            let registry = service.indexer().extractor().registry();
            print_json(&serde_json::json!({
                "languages": registry.supported_languages(),
                "extensions": registry.supported_extensions(),
            }))
        }
        Command::Watch { dir, exclude } => {
            let result = service
                .indexer()
                .index_directory(&scope, &dir, &exclude)
                .await
                .with_context(|| format!("Failed to index {}", dir.display()))?;
            tracing::info!(
                "Initial index: {} files, {} failed",
                result.succeeded.len(),
                result.failed.len()
            );

            let mut watcher = FileWatcher::new(service.indexer().clone(), scope, &exclude)?;
            watcher
                .watch(&dir)
                .with_context(|| format!("Failed to watch {}", dir.display()))?;

            tokio::signal::ctrl_c().await?;
            tracing::info!("Stopping watcher");
            Ok(())
        }
        Command::Serve => {
            tracing::info!("Starting CodeMem JSON-RPC server");
            RpcServer::new(service)
                .run(LineTransport::stdio())
                .await
                .context("JSON-RPC server error")
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

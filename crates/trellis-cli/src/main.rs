use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::{Parser, Subcommand};
use serde_json::{Value, json};
use tracing::info;
use tracing_subscriber::EnvFilter;

use trellis_core::domain::spec::{EdgeSpec, TaskSpec, WorkflowSpec};
use trellis_core::domain::status::{DispatchStatus, NodeStatus};
use trellis_core::impls::InMemoryDispatchStore;
use trellis_core::{
    DispatchId, DispatchManager, DispatchManagerBuilder, ElectronUpdates, NodeId, NodeResult,
    TrellisConfig,
};

/// Trellis - dispatch lifecycle demo with an in-process toy engine
#[derive(Parser)]
#[command(name = "trellis")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to a JSON config file (default: TRELLIS_* environment variables)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a workflow to completion, then re-dispatch it
    Run {
        /// Path to the workflow definition (default: built-in sample)
        #[arg(long)]
        workflow: Option<PathBuf>,

        /// Override a node payload on re-dispatch: NAME=JSON
        #[arg(long = "set", value_name = "NAME=JSON")]
        overrides: Vec<String>,

        /// Recompute every node on re-dispatch
        #[arg(long)]
        no_reuse: bool,
    },
}

/// Built-in demo workflow. A node whose payload carries a `sublattice`
/// definition runs it as a sub-dispatch.
fn sample_workflow() -> Result<String> {
    let summarize = WorkflowSpec {
        name: "summarize".to_string(),
        tasks: vec![TaskSpec::new(0, "clean"), TaskSpec::new(1, "aggregate")],
        edges: vec![EdgeSpec::new(0, 1)],
    };
    let report = WorkflowSpec {
        name: "report".to_string(),
        tasks: vec![
            TaskSpec::new(0, "fetch").with_payload(json!({"source": "sales.csv"})),
            TaskSpec::new(1, "summarize")
                .with_payload(json!({"sublattice": serde_json::to_value(&summarize)?})),
            TaskSpec::new(2, "render").with_payload(json!({"format": "html"})),
        ],
        edges: vec![
            EdgeSpec::new(0, 1).with_param("rows"),
            EdgeSpec::new(1, 2).with_param("summary"),
        ],
    };
    Ok(serde_json::to_string(&report)?)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => TrellisConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => TrellisConfig::from_env().context("invalid TRELLIS_* environment")?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match cli.command {
        Some(Commands::Run {
            workflow,
            overrides,
            no_reuse,
        }) => run(config, workflow, overrides, !no_reuse).await,
        None => {
            println!("trellis - use --help to see available commands");
            Ok(())
        }
    }
}

async fn run(
    config: TrellisConfig,
    workflow: Option<PathBuf>,
    overrides: Vec<String>,
    reuse: bool,
) -> Result<()> {
    let definition = match workflow {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read workflow file: {}", path.display()))?,
        None => sample_workflow()?,
    };
    let overrides = parse_overrides(&overrides)?;

    let manager = DispatchManagerBuilder::new()
        .store(Arc::new(InMemoryDispatchStore::new()))
        .config(config)
        .build()?;

    let first = manager.make_dispatch(&definition, None).await?;
    println!("dispatch {first}");
    drive(&manager, first).await?;

    let second = manager
        .make_derived_dispatch(first, None, &overrides, reuse)
        .await?;
    let summary = manager.summary(second).await?;
    println!(
        "re-dispatch {second} (reuse={reuse}): {} node(s) to recompute, {} pending",
        summary.dirty.len(),
        summary.pending
    );
    drive(&manager, second).await?;

    Ok(())
}

/// Execute every unfinished node in dependency order, then complete the
/// dispatch.
async fn drive(manager: &DispatchManager, dispatch_id: DispatchId) -> Result<Value> {
    let handle = manager.get_dispatch(dispatch_id)?;
    let (order, tasks) = {
        let mut record = handle.lock().await;
        record.mark_running(Utc::now());
        let graph = record.graph();
        let order = graph
            .topological_order()
            .context("workflow graph has a cycle")?;
        let tasks: Vec<(NodeId, String, Value, NodeStatus)> = graph
            .nodes()
            .map(|n| (n.id, n.name.clone(), n.payload.clone(), n.status))
            .collect();
        (order, tasks)
    };
    let channel = manager.status_channel(dispatch_id)?;

    let mut last_output = Value::Null;
    for node_id in order {
        let Some((_, name, payload, status)) = tasks.iter().find(|t| t.0 == node_id) else {
            continue;
        };
        if *status == NodeStatus::Completed {
            println!("  [{dispatch_id}] {name}: reused");
            continue;
        }

        manager
            .update_node_result(
                dispatch_id,
                NodeResult::new(node_id)
                    .with_status(NodeStatus::Running)
                    .with_start_time(Utc::now()),
            )
            .await?;

        if let Some(sublattice) = payload.get("sublattice") {
            let child = manager
                .make_sub_dispatch(&sublattice.to_string(), dispatch_id, node_id)
                .await?;
            info!(parent = %dispatch_id, child = %child, "spawned sub-dispatch");
            // Completing the child reports its result back onto this node.
            last_output = Box::pin(drive(manager, child)).await?;
        } else {
            last_output = json!({ "node": name, "payload": payload });
            manager
                .update_node_result(
                    dispatch_id,
                    NodeResult::new(node_id)
                        .with_status(NodeStatus::Completed)
                        .with_end_time(Utc::now())
                        .with_output(last_output.clone())
                        .with_stdout(format!("ran {name}")),
                )
                .await?;
        }

        for event in channel.drain() {
            println!("  [{dispatch_id}] {name}: node {} -> {}", event.node_id, event.status);
        }
    }

    handle.lock().await.mark_finished(
        DispatchStatus::Completed,
        Some(last_output.clone()),
        None,
        Utc::now(),
    );
    manager.upsert_workflow_data(dispatch_id).await?;
    manager.complete_dispatch(dispatch_id).await?;
    println!("  [{dispatch_id}] completed");
    Ok(last_output)
}

fn parse_overrides(raw: &[String]) -> Result<ElectronUpdates> {
    let mut overrides = ElectronUpdates::new();
    for entry in raw {
        let Some((name, value)) = entry.split_once('=') else {
            bail!("override must look like NAME=JSON: {entry}");
        };
        let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
        overrides.insert(name.to_string(), value);
    }
    Ok(overrides)
}

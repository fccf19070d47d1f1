//! buildprobe - run probe builds and inspect their records
//!
//! ## Commands
//!
//! - `run`: run one build of a project and persist its probe record
//! - `summary`: show the latest probe record of a project
//! - `show`: show the probe record of one build
//! - `history`: list a project's builds, newest first

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use buildprobe_ci::{
    default_level, init_tracing, AgentConfig, HealthRule, PipelineRequest, PipelineResult, ProbeBuilder, ProbeConfig,
    ProbePipeline, ProbeRecorder, ProjectProbeAction,
};
use buildprobe_state::{BuildId, BuildRecord, BuildStore, Outcome, SurrealBuildStore};

#[derive(Parser)]
#[command(name = "buildprobe")]
#[command(author = "Praqma")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Probe the JVM of build nodes and grade builds by the result", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Config file (default: ./buildprobe.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one build of a project
    Run {
        /// Project name
        #[arg(short, long)]
        project: String,

        /// Probe on the assigned agent instead of the controller
        #[arg(long)]
        run_on_agents: bool,

        /// Agent the build is assigned to ([user@]host[:port])
        #[arg(long)]
        agent: Option<String>,

        /// Number of probe build steps (default: from config)
        #[arg(long)]
        steps: Option<usize>,
    },

    /// Show the latest probe record of a project
    Summary {
        /// Project name
        #[arg(short, long)]
        project: String,
    },

    /// Show the probe record of one build
    Show {
        /// Project name
        #[arg(short, long)]
        project: String,

        /// Build number
        #[arg(short, long)]
        build: u64,
    },

    /// List a project's builds, newest first
    History {
        /// Project name
        #[arg(short, long)]
        project: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.json, default_level(cli.verbose));

    let config = ProbeConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    let store: Arc<dyn BuildStore> = Arc::new(
        SurrealBuildStore::from_env(&config.db_path)
            .await
            .context("Failed to connect to build database")?,
    );

    match cli.command {
        Commands::Run {
            project,
            run_on_agents,
            agent,
            steps,
        } => {
            let config = apply_run_flags(config, run_on_agents, agent, steps);
            cmd_run(store, &config, &project).await
        }
        Commands::Summary { project } => {
            let rule = config.health.into_rule();
            cmd_summary(store.as_ref(), rule.as_ref(), &project).await
        }
        Commands::Show { project, build } => {
            let rule = config.health.into_rule();
            cmd_show(store.as_ref(), rule.as_ref(), &BuildId::new(project, build)).await
        }
        Commands::History { project } => cmd_history(store.as_ref(), &project).await,
    }
}

/// Command-line flags override the loaded configuration.
fn apply_run_flags(
    mut config: ProbeConfig,
    run_on_agents: bool,
    agent: Option<String>,
    steps: Option<usize>,
) -> ProbeConfig {
    if run_on_agents {
        config.run_on_agents = true;
    }
    if let Some(address) = agent {
        config.agent = Some(AgentConfig {
            address,
            name: None,
            identity_file: config.agent.and_then(|a| a.identity_file),
        });
    }
    if let Some(steps) = steps {
        config.steps = steps;
    }
    config
}

/// Assemble the build: `steps` probe builders followed by one recorder.
fn build_request(config: &ProbeConfig, project: &str) -> Result<PipelineRequest> {
    let probe = config.probe.to_probe().context("Invalid probe command")?;
    let mut request = PipelineRequest::new(project);

    if let Some(node) = config.node().context("Invalid agent")? {
        request = request.on_node(node);
    }
    for _ in 0..config.steps {
        request = request.builder(ProbeBuilder::new(config.run_on_agents).with_probe(probe.clone()));
    }
    Ok(request.recorder(ProbeRecorder::with_rule(config.health.into_rule())))
}

async fn cmd_run(store: Arc<dyn BuildStore>, config: &ProbeConfig, project: &str) -> Result<()> {
    let request = build_request(config, project)?;
    info!(project, steps = config.steps, run_on_agents = config.run_on_agents, "Running build");

    let result = ProbePipeline::run(store, request)
        .await
        .context("Build failed to run")?;

    print_result(&result);

    if result.outcome == Outcome::Failure {
        anyhow::bail!("Build {} failed", result.build_id);
    }
    Ok(())
}

fn print_result(result: &PipelineResult) {
    println!("Build: {}", result.build_id);
    println!();
    for line in &result.log {
        println!("  {}", line);
    }
    println!();
    println!("Outcome: {}", result.outcome);
    println!("Entries: {}", result.entry_count());
    println!("Duration: {}ms", result.duration_ms);
}

async fn cmd_summary(store: &dyn BuildStore, rule: &dyn HealthRule, project: &str) -> Result<()> {
    let action = ProjectProbeAction::new(project);
    let latest = action
        .last_build_record(store)
        .await
        .with_context(|| format!("Failed to read history of {}", project))?;

    match latest {
        Some((id, record)) => {
            println!("{} for {} (from build {})", action.display_name(), project, id);
            for line in record_lines(&record, rule) {
                println!("{}", line);
            }
        }
        None => println!("No probe record found for {}", project),
    }
    Ok(())
}

async fn cmd_show(store: &dyn BuildStore, rule: &dyn HealthRule, id: &BuildId) -> Result<()> {
    let info = store
        .get_build(id)
        .await
        .with_context(|| format!("Failed to load build {}", id))?;
    let record = store.get_record(id).await?;

    println!("Build: {}", info.id);
    println!("Status: {:?}", info.status);
    println!("Outcome: {}", info.outcome);
    if let Some(node) = &info.node {
        println!("Node: {}", node);
    }

    match record {
        Some(record) => {
            println!();
            for line in record_lines(&record, rule) {
                println!("{}", line);
            }
        }
        None => println!("No probe record"),
    }
    Ok(())
}

async fn cmd_history(store: &dyn BuildStore, project: &str) -> Result<()> {
    let builds = store.list_builds(project).await?;
    if builds.is_empty() {
        println!("No builds for {}", project);
        return Ok(());
    }

    for build in builds {
        let entries = store.get_record(&build.id).await?.map_or(0, |r| r.len());
        println!(
            "{:>6}  {:<10} {:<9} {:>2} entries  {}",
            build.id.number,
            build.outcome.as_str(),
            if build.is_completed() { "completed" } else { "running" },
            entries,
            build.created_at.format("%Y-%m-%d %H:%M:%S")
        );
    }
    Ok(())
}

/// One line per entry, followed by the verdict of the configured rule.
fn record_lines(record: &BuildRecord, rule: &dyn HealthRule) -> Vec<String> {
    let mut lines: Vec<String> = record
        .entries()
        .iter()
        .map(|entry| format!("  {}", entry))
        .collect();
    let verdict = if rule.is_healthy(record) { "yes" } else { "no" };
    lines.push(format!("Healthy: {} ({})", verdict, rule.describe()));
    lines
}

use agentflow_rs::config::Settings;
use agentflow_rs::flow::catalog;
use agentflow_rs::flow::graph::DependencyGraph;
use agentflow_rs::flow::state::StatusCounts;
use agentflow_rs::flow::{Engine, RunStatus, StatusEntry, UnitLoader};
use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use std::collections::HashSet;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run every agent in a unit file against one prompt
    Run {
        /// Path to the unit file
        #[arg(short, long, env = "AGENTFLOW_UNITS")]
        units: PathBuf,

        /// The shared prompt
        #[arg(short, long, required_unless_present = "prompt_file", conflicts_with = "prompt_file")]
        prompt: Option<String>,

        /// Read the shared prompt from a file
        #[arg(long)]
        prompt_file: Option<PathBuf>,

        /// Print the final status map as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check a unit file without running it
    Validate {
        /// Path to the unit file
        #[arg(short, long, env = "AGENTFLOW_UNITS")]
        units: PathBuf,
    },
    /// List known providers and models
    Models,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();

    match args.command {
        Commands::Run {
            units,
            prompt,
            prompt_file,
            json,
        } => {
            let prompt = match (prompt, prompt_file) {
                (Some(p), _) => p,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("reading prompt from {}", path.display()))?,
                (None, None) => anyhow::bail!("either --prompt or --prompt-file is required"),
            };
            run(units, prompt, json).await?;
        }
        Commands::Validate { units } => validate(units)?,
        Commands::Models => {
            for provider in catalog::providers() {
                println!("{}", provider);
                for (i, model) in catalog::models_for(provider).iter().enumerate() {
                    let marker = if i == 0 { " (default)" } else { "" };
                    println!("  {}{}", model, marker);
                }
            }
        }
    }

    Ok(())
}

async fn run(units_path: PathBuf, prompt: String, json: bool) -> anyhow::Result<()> {
    let units = UnitLoader::new()
        .load_units(&units_path)
        .with_context(|| format!("loading {}", units_path.display()))?;
    let settings = Settings::from_env()?;
    let engine = Engine::from_settings(&settings)?;

    let mut handle = engine.start_run(units, prompt)?;
    log::info!("Started run {}", handle.run_id());

    let mut reported: HashSet<String> = HashSet::new();
    loop {
        let progress = handle.progress_percent();
        for entry in handle.snapshot() {
            if entry.is_terminal() && reported.insert(entry.unit_id.clone()) && !json {
                println!("[{:>3.0}%] {} -> {}", progress, entry.label(), entry.status);
            }
        }
        if !handle.changed().await {
            break;
        }
    }

    let results = handle.wait().await?;
    if !json {
        for entry in results.iter().filter(|e| !reported.contains(&e.unit_id)) {
            println!("[100%] {} -> {}", entry.label(), entry.status);
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        print_results(&results);
    }
    Ok(())
}

fn print_results(results: &[StatusEntry]) {
    let counts = StatusCounts::from_entries(results);
    println!();
    println!(
        "=== Results: {} succeeded, {} failed, {} skipped ===",
        counts.success, counts.error, counts.skipped
    );

    for entry in results {
        let elapsed = entry
            .elapsed_s
            .map(|s| format!("{:.2}s", s))
            .unwrap_or_else(|| "-".to_string());
        println!();
        println!(
            "--- {} [{}/{}] {} ({}) ---",
            entry.label(),
            entry.provider,
            entry.model,
            entry.status,
            elapsed
        );
        match entry.status {
            RunStatus::Success => println!("{}", entry.output.as_deref().unwrap_or_default()),
            RunStatus::Error => println!("Error: {}", entry.error.as_deref().unwrap_or_default()),
            RunStatus::Skipped => println!(
                "Skipped: dependency '{}' failed",
                entry.blocked_by.as_deref().unwrap_or("?")
            ),
            RunStatus::Scheduled | RunStatus::Running => {}
        }
    }
}

fn validate(units_path: PathBuf) -> anyhow::Result<()> {
    let units = UnitLoader::new()
        .load_units(&units_path)
        .with_context(|| format!("loading {}", units_path.display()))?;
    let graph = DependencyGraph::build(&units)?;

    println!("{} agent(s) in {}", graph.len(), units_path.display());
    for (i, unit) in units.iter().enumerate() {
        let deps = graph.dependencies_of(&unit.id);
        let deps = if deps.is_empty() {
            "none".to_string()
        } else {
            deps.join(", ")
        };
        println!(
            "  Agent {}: {} [{}] {}/{} depends on: {}",
            i + 1,
            unit.name,
            unit.id,
            unit.provider,
            unit.model,
            deps
        );
        if catalog::models_for(&unit.provider).is_empty() {
            println!("    warning: provider '{}' is not built in", unit.provider);
        }
        for missing in graph.missing_dependencies_of(&unit.id) {
            println!("    warning: unknown dependency '{}'", missing);
        }
    }
    println!("Entry agents: {}", graph.roots().join(", "));
    Ok(())
}

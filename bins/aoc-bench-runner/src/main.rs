mod dataset;
mod engine;
mod evaluator;
mod executor;
mod harness;
mod runners;

use anyhow::{Context, Result};
use aoc_bench_common::discovery::{discover_solutions, discover_task_ids, SolutionFilter};
use aoc_bench_common::tasks::load_tasks;
use aoc_bench_common::{paths, AuthorFilter, Config, Language};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::engine::ProcessEngine;
use crate::evaluator::{BaselinePolicy, ComparisonMode};
use crate::harness::{Harness, HarnessOptions};

#[derive(Parser, Debug)]
#[command(name = "aoc-bench-runner")]
#[command(about = "Run every discovered solution, compare outputs and write the benchmark dataset", long_about = None)]
struct Args {
    /// Only this task (e.g. 1 or 01)
    #[arg(long)]
    task: Option<String>,

    /// Only human or only AI-authored solutions
    #[arg(long, value_name = "human|ai")]
    only: Option<AuthorFilter>,

    /// Only one language
    #[arg(long, value_name = "python|js|rust")]
    lang: Option<Language>,

    /// Per-solution timeout in milliseconds
    #[arg(long, env = "AOC_BENCH_TIMEOUT_MS")]
    timeout_ms: Option<u64>,

    /// Dataset path, relative to the repository root unless absolute
    #[arg(long, default_value = paths::DEFAULT_DATASET_PATH)]
    output: PathBuf,

    /// Repository root (defaults to the current directory)
    #[arg(long)]
    root: Option<PathBuf>,

    /// How each task's reference run is chosen
    #[arg(long, value_enum, default_value_t = BaselinePolicy::Human)]
    baseline: BaselinePolicy,

    /// How outputs are compared against the baseline
    #[arg(long, value_enum, default_value_t = ComparisonMode::Exact)]
    compare: ComparisonMode,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // stdout is left to the solutions' world; diagnostics go to stderr
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let args = Args::parse();
    let config = Config::from_env();
    init_tracing(config.json_logs);

    let root = match &args.root {
        Some(root) => root.clone(),
        None => std::env::current_dir().context("Failed to read current directory")?,
    };
    let repo_root = root
        .canonicalize()
        .with_context(|| format!("Repository root not found: {}", root.display()))?;

    let mut task_ids = discover_task_ids(&repo_root);
    if let Some(raw) = &args.task {
        let wanted = paths::normalize_task_id(raw)?;
        task_ids.retain(|id| *id == wanted);
        if task_ids.is_empty() {
            warn!(task = %wanted, "No input file for requested task");
        }
    }

    let tasks = load_tasks(&repo_root, &task_ids).context("Failed to read task inputs")?;
    let filter = SolutionFilter {
        author: args.only,
        language: args.lang,
    };
    let solutions = filter.apply(discover_solutions(&repo_root, &task_ids));

    let mut options = HarnessOptions::from_config(&config);
    if let Some(timeout_ms) = args.timeout_ms {
        options.timeout_ms = timeout_ms;
    }
    options.baseline = args.baseline;
    options.compare = args.compare;
    info!(
        root = %repo_root.display(),
        tasks = tasks.len(),
        solutions = solutions.len(),
        timeout_ms = options.timeout_ms,
        "Benchmark starting"
    );

    let engine = ProcessEngine::new();
    let harness = Harness::new(&engine, &config, &repo_root, options);
    let runs = harness.run_all(&solutions).await;

    let dataset = dataset::assemble(&repo_root, tasks, &solutions, runs);
    let out_path = paths::resolve_in_repo(&repo_root, &args.output);
    dataset::write_dataset(&out_path, &dataset)?;

    eprintln!(
        "Wrote dataset: {} ({} runs)",
        paths::relative_to(&repo_root, &out_path),
        dataset.runs.len()
    );
    Ok(())
}

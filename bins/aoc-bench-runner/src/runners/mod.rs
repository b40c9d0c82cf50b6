/// Language Runners - Per-Language Execution Strategies
///
/// **Core Responsibility:**
/// Turn a discovered solution directory into one or more engine invocations
/// and report an [`Outcome`].
///
/// Turning that outcome into a dataset `RunResult` is the executor's job.

mod node;
mod python;
mod rust;

use anyhow::Result;
use aoc_bench_common::{Config, Language, Solution};
use std::path::{Path, PathBuf};

use crate::engine::{CommandSpec, ExecOutput, ExecutionEngine};

/// What a runner managed to do with a solution
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The solution program ran (successfully or not)
    Executed {
        exec: ExecOutput,
        build_time_ms: Option<f64>,
    },
    /// A build or compile step failed; the program never ran
    BuildFailed { step: &'static str, exec: ExecOutput },
    /// The build succeeded but produced nothing runnable
    MissingArtifact {
        message: String,
        build_time_ms: Option<f64>,
    },
    /// No file the runner knows how to start
    NoEntry(String),
}

/// Everything a runner needs for one solution
pub struct RunnerContext<'a, E: ExecutionEngine> {
    pub engine: &'a E,
    pub config: &'a Config,
    pub solution: &'a Solution,
    /// Absolute path of the task input, passed as the only argument
    pub input_path: &'a Path,
    pub timeout_ms: u64,
}

impl<'a, E: ExecutionEngine> RunnerContext<'a, E> {
    pub fn root(&self) -> &Path {
        &self.solution.root_dir
    }

    pub fn input_arg(&self) -> String {
        self.input_path.display().to_string()
    }

    /// `<program> [leading...] <input>` run from the solution root with the solution timeout
    pub fn solution_command(&self, program: impl Into<PathBuf>, leading: &[String]) -> CommandSpec {
        CommandSpec::new(program, self.root(), self.timeout_ms)
            .args(leading.iter().cloned())
            .arg(self.input_arg())
    }
}

pub async fn run<E: ExecutionEngine>(ctx: &RunnerContext<'_, E>) -> Result<Outcome> {
    match ctx.solution.language {
        Language::Python => python::run(ctx).await,
        Language::Js => node::run(ctx).await,
        Language::Rust => rust::run(ctx).await,
    }
}

fn path_arg(path: &Path) -> String {
    path.display().to_string()
}

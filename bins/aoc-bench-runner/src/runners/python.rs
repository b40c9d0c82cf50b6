use anyhow::Result;
use aoc_bench_common::discovery::detect_entry_hint;
use aoc_bench_common::Language;

use super::{path_arg, Outcome, RunnerContext};
use crate::engine::ExecutionEngine;

/// Interpret the entry file directly, from the solution's own directory
pub async fn run<E: ExecutionEngine>(ctx: &RunnerContext<'_, E>) -> Result<Outcome> {
    let Some(entry) = detect_entry_hint(ctx.root(), Language::Python) else {
        return Ok(Outcome::NoEntry(format!(
            "No Python file found in {}",
            ctx.solution.rel_dir
        )));
    };

    // Imports must not leave __pycache__ behind in the solution tree
    let spec = ctx
        .solution_command(&ctx.config.python_bin, &[path_arg(&ctx.root().join(entry))])
        .env("PYTHONDONTWRITEBYTECODE", "1");
    let exec = ctx.engine.execute(&spec).await?;

    Ok(Outcome::Executed {
        exec,
        build_time_ms: None,
    })
}

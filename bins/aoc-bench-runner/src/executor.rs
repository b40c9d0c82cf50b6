/// Solution Executor
///
/// Runs one solution through its language runner and turns the runner's
/// [`Outcome`] into the `RunResult` recorded in the dataset.
///
/// ## Failure containment
/// Nothing in here returns an error. A runner `Err` (spawn failure, scratch
/// file I/O, ...) becomes a failed run carrying the error chain as its
/// `error`, so one broken solution never stops the harness.
///
/// ## Recorded fields
/// - stdout/stderr: CRLF unified, trailing whitespace dropped, truncated
///   to the configured budget with a marker
/// - `executionTimeMs`: program wall time, rounded to 0.01 ms; zero when
///   the program never ran
/// - `buildTimeMs`: cargo/rustc wall time, when a build step ran
/// - `error`: timeout message, else stderr, else stdout, else the exit code

use aoc_bench_common::{Config, RunResult, Solution};
use std::path::Path;
use tracing::warn;

use crate::engine::{ExecOutput, ExecutionEngine};
use crate::evaluator::normalize_output;
use crate::runners::{self, Outcome, RunnerContext};

/// Cut `text` to at most `budget` characters, appending a marker that says how much was dropped
pub fn truncate(text: &str, budget: usize) -> String {
    let total = text.chars().count();
    if total <= budget {
        return text.to_string();
    }
    let kept: String = text.chars().take(budget).collect();
    format!("{}\n… (truncated, {} chars omitted)", kept, total - budget)
}

fn round_ms(ms: f64) -> f64 {
    if ms.is_finite() && ms > 0.0 {
        (ms * 100.0).round() / 100.0
    } else {
        0.0
    }
}

/// First non-empty of stderr, stdout, or a bare exit code message
fn failure_detail(stdout: &str, stderr: &str, exit_code: i32) -> String {
    if !stderr.is_empty() {
        stderr.to_string()
    } else if !stdout.is_empty() {
        stdout.to_string()
    } else {
        format!("Exit code {}", exit_code)
    }
}

fn record_streams(run: &mut RunResult, exec: &ExecOutput, budget: usize) -> (String, String) {
    let stdout = normalize_output(&exec.stdout);
    let stderr = normalize_output(&exec.stderr);
    run.stdout = truncate(&stdout, budget);
    run.stderr = truncate(&stderr, budget);
    run.exit_code = exec.exit_code;
    run.timed_out = exec.timed_out;
    (stdout, stderr)
}

pub fn finalize(solution: &Solution, outcome: Outcome, timeout_ms: u64, budget: usize) -> RunResult {
    let mut run = RunResult::pending(solution);

    match outcome {
        Outcome::Executed { exec, build_time_ms } => {
            let (stdout, stderr) = record_streams(&mut run, &exec, budget);
            run.success = exec.succeeded();
            run.execution_time_ms = round_ms(exec.elapsed_ms);
            run.build_time_ms = build_time_ms.map(round_ms);
            run.error = if exec.timed_out {
                Some(format!("Timed out after {}ms", timeout_ms))
            } else if exec.exit_code == 0 {
                None
            } else {
                Some(truncate(&failure_detail(&stdout, &stderr, exec.exit_code), budget))
            };
        }
        Outcome::BuildFailed { step, exec } => {
            let (stdout, stderr) = record_streams(&mut run, &exec, budget);
            run.build_time_ms = Some(round_ms(exec.elapsed_ms));
            run.error = Some(if exec.timed_out {
                format!("{} timed out after {:.0}ms", step, exec.elapsed_ms)
            } else {
                truncate(
                    &format!("{} failed: {}", step, failure_detail(&stdout, &stderr, exec.exit_code)),
                    budget,
                )
            });
        }
        Outcome::MissingArtifact { message, build_time_ms } => {
            run.build_time_ms = build_time_ms.map(round_ms);
            run.error = Some(message);
        }
        Outcome::NoEntry(message) => {
            run.error = Some(message);
        }
    }

    run
}

/// Run one solution against `input_path`. Always yields a run record.
pub async fn run_solution<E: ExecutionEngine>(
    engine: &E,
    config: &Config,
    solution: &Solution,
    input_path: &Path,
    timeout_ms: u64,
) -> RunResult {
    let ctx = RunnerContext {
        engine,
        config,
        solution,
        input_path,
        timeout_ms,
    };

    match runners::run(&ctx).await {
        Ok(outcome) => finalize(solution, outcome, timeout_ms, config.output_budget_chars),
        Err(e) => {
            warn!(solution = %solution.id, error = %format!("{:#}", e), "Run aborted");
            let mut run = RunResult::pending(solution);
            run.error = Some(format!("{:#}", e));
            run
        }
    }
}

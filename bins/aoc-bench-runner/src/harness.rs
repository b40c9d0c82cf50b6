/// Benchmark Harness - Sequential Run Pipeline
///
/// **Core Responsibility:**
/// Walk tasks in order, run each task's solutions one after another, then
/// compare that task's successful runs against its baseline.
///
/// **Execution Model:**
/// - Strictly sequential: one engine call outstanding at a time, so timings
///   are not distorted by contention
/// - Runs accumulate in one owned `Vec` threaded through the walk; each
///   task's baseline pass works on that task's slice of it
/// - Per-solution failures are already contained by the executor

use aoc_bench_common::{paths, Config, RunResult, Solution};
use std::path::Path;
use tracing::{info, warn};

use crate::engine::ExecutionEngine;
use crate::evaluator::{apply_baseline, BaselinePolicy, ComparisonMode};
use crate::executor::run_solution;

#[derive(Debug, Clone, Copy)]
pub struct HarnessOptions {
    pub timeout_ms: u64,
    pub baseline: BaselinePolicy,
    pub compare: ComparisonMode,
}

impl HarnessOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            timeout_ms: config.default_timeout_ms,
            baseline: BaselinePolicy::default(),
            compare: ComparisonMode::default(),
        }
    }
}

pub struct Harness<'a, E: ExecutionEngine> {
    engine: &'a E,
    config: &'a Config,
    repo_root: &'a Path,
    options: HarnessOptions,
}

impl<'a, E: ExecutionEngine> Harness<'a, E> {
    pub fn new(engine: &'a E, config: &'a Config, repo_root: &'a Path, options: HarnessOptions) -> Self {
        Self {
            engine,
            config,
            repo_root,
            options,
        }
    }

    /// Run every solution once. `solutions` must be in discovery order
    /// (grouped by task); the returned runs keep that order.
    pub async fn run_all(&self, solutions: &[Solution]) -> Vec<RunResult> {
        let mut runs = Vec::with_capacity(solutions.len());

        for group in solutions.chunk_by(|a, b| a.task_id == b.task_id) {
            let start = runs.len();
            let task_id = &group[0].task_id;
            let input = paths::input_path(self.repo_root, task_id);

            for solution in group {
                runs.push(self.run_one(solution, &input).await);
            }

            match apply_baseline(&mut runs[start..], self.options.baseline, self.options.compare) {
                Some(baseline) => {
                    let task_runs = &runs[start..];
                    let matching = task_runs
                        .iter()
                        .filter(|r| r.matches_baseline == Some(true))
                        .count();
                    info!(
                        task = %task_id,
                        baseline = %baseline,
                        matching,
                        total = task_runs.len(),
                        "Baseline comparison done"
                    );
                }
                None if self.options.baseline != BaselinePolicy::None => {
                    warn!(task = %task_id, "No successful run; baseline skipped")
                }
                None => {}
            }
        }

        runs
    }

    async fn run_one(&self, solution: &Solution, input: &Path) -> RunResult {
        info!("[{}] {}/{} {}", solution.task_id, solution.source, solution.language, solution.rel_dir);

        let run = run_solution(self.engine, self.config, solution, input, self.options.timeout_ms).await;

        if run.success {
            info!(
                solution = %solution.id,
                time_ms = run.execution_time_ms,
                "✓ ok"
            );
        } else {
            warn!(
                solution = %solution.id,
                exit_code = run.exit_code,
                timed_out = run.timed_out,
                error = run.error.as_deref().unwrap_or(""),
                "✗ failed"
            );
        }
        run
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::{exit, ok, ScriptedEngine};
    use aoc_bench_common::discovery::discover_solutions;
    use std::fs;
    use tempfile::TempDir;

    fn repo_with(dirs: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("inputs")).unwrap();
        for rel in dirs {
            let root = dir.path().join(rel);
            fs::create_dir_all(&root).unwrap();
            fs::write(root.join("main.py"), "").unwrap();
        }
        dir
    }

    fn options(baseline: BaselinePolicy) -> HarnessOptions {
        HarnessOptions {
            timeout_ms: 1_000,
            baseline,
            compare: ComparisonMode::Exact,
        }
    }

    #[tokio::test]
    async fn test_runs_in_discovery_order_with_per_task_baseline() {
        let repo = repo_with(&[
            "human-solutions/01/python",
            "ai-solutions/01/model-a/python",
            "ai-solutions/02/model-a/python",
            "ai-solutions/02/model-b/python",
        ]);
        let ids = vec!["01".to_string(), "02".to_string()];
        let sols = discover_solutions(repo.path(), &ids);

        let engine = ScriptedEngine::new(|spec| {
            let cwd = spec.cwd.to_string_lossy().replace('\\', "/");
            if cwd.contains("02/model-b") {
                Ok(ok("1\n2\n"))
            } else if cwd.contains("02/model-a") {
                Ok(exit(1, "boom"))
            } else {
                Ok(ok("3\n7\n"))
            }
        });
        let config = Config::default();
        let harness = Harness::new(&engine, &config, repo.path(), options(BaselinePolicy::Human));

        let runs = harness.run_all(&sols).await;
        assert_eq!(runs.len(), 4);
        let order: Vec<&str> = runs.iter().map(|r| r.solution_id.as_str()).collect();
        let expected: Vec<&str> = sols.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(order, expected);

        // Task 01: human baseline, model agrees
        assert_eq!(runs[0].baseline_solution_id.as_deref(), Some(sols[0].id.as_str()));
        assert_eq!(runs[1].matches_baseline, Some(true));

        // Task 02: no human, the failing model is skipped, model-b is the baseline
        assert_eq!(runs[2].matches_baseline, None);
        assert_eq!(runs[3].baseline_solution_id.as_deref(), Some(sols[3].id.as_str()));
        assert_eq!(runs[3].matches_baseline, Some(true));

        let calls = engine.calls();
        assert_eq!(calls.len(), 4);
        assert!(calls[0].args[1].ends_with("01.txt"));
        assert!(calls[3].args[1].ends_with("02.txt"));
    }

    #[tokio::test]
    async fn test_baseline_disabled() {
        let repo = repo_with(&["human-solutions/01/python"]);
        let sols = discover_solutions(repo.path(), &["01".to_string()]);
        let engine = ScriptedEngine::printing("3\n7\n");
        let config = Config::default();
        let harness = Harness::new(&engine, &config, repo.path(), options(BaselinePolicy::None));

        let runs = harness.run_all(&sols).await;
        assert!(runs[0].success);
        assert_eq!(runs[0].matches_baseline, None);
    }

    #[tokio::test]
    async fn test_empty_solution_list() {
        let repo = repo_with(&[]);
        let engine = ScriptedEngine::printing("");
        let config = Config::default();
        let harness = Harness::new(&engine, &config, repo.path(), HarnessOptions::from_config(&config));

        assert!(harness.run_all(&[]).await.is_empty());
        assert!(engine.calls().is_empty());
    }
}

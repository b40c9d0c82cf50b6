/// Dataset Writer - Assembly and Output
///
/// **Core Responsibility:**
/// Produce one dataset per invocation: metadata, tasks, solutions with fresh
/// code metrics, runs, and a per-source / per-language summary.
///
/// The output file is overwritten unconditionally.

use anyhow::{Context, Result};
use aoc_bench_common::code_stats::compute_code_stats;
use aoc_bench_common::types::{DatasetMeta, DatasetSummary, GroupStats, PlatformInfo, RunnerInfo};
use aoc_bench_common::{CodeStats, Dataset, RunResult, Solution, SolutionRecord, Task};
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

pub const RUNNER_NAME: &str = "aoc-bench-runner";

/// Best-effort revision from `.git` metadata files, without invoking git
pub fn read_git_sha(repo_root: &Path) -> Option<String> {
    let git_dir = repo_root.join(".git");
    let head = fs::read_to_string(git_dir.join("HEAD")).ok()?;
    let head = head.trim();

    let Some(reference) = head.strip_prefix("ref:").map(str::trim) else {
        return (!head.is_empty()).then(|| head.to_string());
    };

    if let Ok(sha) = fs::read_to_string(git_dir.join(reference)) {
        let sha = sha.trim();
        if !sha.is_empty() {
            return Some(sha.to_string());
        }
    }

    // Loose ref missing after `git gc`: look it up in packed-refs
    let packed = fs::read_to_string(git_dir.join("packed-refs")).ok()?;
    packed
        .lines()
        .filter(|line| !line.starts_with('#') && !line.starts_with('^'))
        .filter_map(|line| line.split_once(' '))
        .find(|(_, name)| name.trim() == reference)
        .map(|(sha, _)| sha.to_string())
}

pub fn platform_info() -> PlatformInfo {
    PlatformInfo {
        os: std::env::consts::OS.to_string(),
        arch: std::env::consts::ARCH.to_string(),
        cpu_count: std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1),
    }
}

#[derive(Default)]
struct GroupAcc {
    stats: GroupStats,
    times: Vec<f64>,
}

impl GroupAcc {
    fn add(&mut self, run: &RunResult) {
        self.stats.total += 1;
        if run.success {
            self.stats.successful += 1;
            self.times.push(run.execution_time_ms);
        } else {
            self.stats.failed += 1;
        }
        if run.matches_baseline == Some(true) {
            self.stats.matching += 1;
        }
    }

    fn finish(mut self) -> GroupStats {
        if !self.times.is_empty() {
            let avg = self.times.iter().sum::<f64>() / self.times.len() as f64;
            self.stats.avg_time_ms = Some((avg * 100.0).round() / 100.0);
        }
        self.stats
    }
}

/// Totals per source and per language; average time covers successful runs only
pub fn summarize(runs: &[RunResult]) -> DatasetSummary {
    let mut by_source: BTreeMap<String, GroupAcc> = BTreeMap::new();
    let mut by_language: BTreeMap<String, GroupAcc> = BTreeMap::new();

    for run in runs {
        by_source.entry(run.source.label().to_string()).or_default().add(run);
        by_language.entry(run.language.to_string()).or_default().add(run);
    }

    let successful = runs.iter().filter(|r| r.success).count() as u64;
    DatasetSummary {
        total: runs.len() as u64,
        successful,
        failed: runs.len() as u64 - successful,
        by_source: by_source.into_iter().map(|(k, v)| (k, v.finish())).collect(),
        by_language: by_language.into_iter().map(|(k, v)| (k, v.finish())).collect(),
    }
}

/// Build the dataset; code metrics are computed here, fresh, and copied onto each run
pub fn assemble(
    repo_root: &Path,
    tasks: Vec<Task>,
    solutions: &[Solution],
    mut runs: Vec<RunResult>,
) -> Dataset {
    let stats: HashMap<&str, CodeStats> = solutions
        .iter()
        .map(|s| (s.id.as_str(), compute_code_stats(&s.root_dir, s.language)))
        .collect();

    let records = solutions
        .iter()
        .map(|s| SolutionRecord::new(s, stats.get(s.id.as_str()).cloned()))
        .collect();

    for run in &mut runs {
        run.code_stats = stats.get(run.solution_id.as_str()).cloned();
    }

    let summary = summarize(&runs);
    Dataset {
        meta: DatasetMeta {
            generated_at: Utc::now(),
            git_sha: read_git_sha(repo_root),
            runner: RunnerInfo {
                name: RUNNER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            platform: platform_info(),
        },
        tasks,
        solutions: records,
        runs,
        summary,
    }
}

/// Pretty JSON plus trailing newline; parent directories are created
pub fn write_dataset(path: &Path, dataset: &Dataset) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let mut json = serde_json::to_string_pretty(dataset).context("Failed to serialize dataset")?;
    json.push('\n');
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Baseline Evaluator - Output Equivalence Across Solutions
///
/// **Core Responsibility:**
/// Pick one reference run per task and mark every other successful run as
/// output-equivalent to it or not.
///
/// **Critical Properties:**
/// - Knows nothing about processes or language runtimes
/// - Only reads `success` and `stdout`; only writes the two baseline fields
/// - Failed runs are never compared and never become the baseline
///
/// **Selection Rules:**
/// - `human`: first successful human run, else first successful run
/// - `first-success`: first successful run in discovery order
/// - `none`: no baseline, no comparison
///
/// Discovery order is deterministic (human first, then models and languages
/// sorted lexically), so "first" is well defined.

use aoc_bench_common::RunResult;
use clap::ValueEnum;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

lazy_static! {
    static ref NUMBER_TOKEN: Regex = Regex::new(r"-?\d+(?:\.\d+)?").expect("valid regex");
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum BaselinePolicy {
    #[default]
    Human,
    FirstSuccess,
    None,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ComparisonMode {
    /// Normalized text must be identical
    #[default]
    Exact,
    /// Last number of every line that has one must agree, in order
    Numeric,
}

/// Unify line endings and drop trailing whitespace
pub fn normalize_output(text: &str) -> String {
    text.replace("\r\n", "\n").trim_end().to_string()
}

fn numeric_answers(normalized: &str) -> Vec<&str> {
    normalized
        .lines()
        .filter_map(|line| NUMBER_TOKEN.find_iter(line).last().map(|m| m.as_str()))
        .collect()
}

pub fn outputs_match(candidate: &str, baseline: &str, mode: ComparisonMode) -> bool {
    let candidate = normalize_output(candidate);
    let baseline = normalize_output(baseline);
    match mode {
        ComparisonMode::Exact => candidate == baseline,
        ComparisonMode::Numeric => {
            let left = numeric_answers(&candidate);
            let right = numeric_answers(&baseline);
            if left.is_empty() && right.is_empty() {
                candidate == baseline
            } else {
                left == right
            }
        }
    }
}

/// Index of the baseline run within one task's runs
pub fn select_baseline(runs: &[RunResult], policy: BaselinePolicy) -> Option<usize> {
    let first_success = || runs.iter().position(|r| r.success);
    match policy {
        BaselinePolicy::None => None,
        BaselinePolicy::FirstSuccess => first_success(),
        BaselinePolicy::Human => runs
            .iter()
            .position(|r| r.success && r.source.is_human())
            .or_else(first_success),
    }
}

/// Fill `matches_baseline` / `baseline_solution_id` on the successful runs
/// of one task. Returns the chosen baseline's solution id.
pub fn apply_baseline(
    runs: &mut [RunResult],
    policy: BaselinePolicy,
    mode: ComparisonMode,
) -> Option<String> {
    let idx = select_baseline(runs, policy)?;
    let baseline_id = runs[idx].solution_id.clone();
    let baseline_stdout = runs[idx].stdout.clone();

    for run in runs.iter_mut().filter(|r| r.success) {
        let matches = outputs_match(&run.stdout, &baseline_stdout, mode);
        debug!(
            solution = %run.solution_id,
            baseline = %baseline_id,
            matches,
            "Compared output"
        );
        run.matches_baseline = Some(matches);
        run.baseline_solution_id = Some(baseline_id.clone());
    }

    Some(baseline_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aoc_bench_common::{Authorship, Language};

    #[test]
    fn test_policy_and_mode_parse_from_flags() {
        assert_eq!(BaselinePolicy::from_str("first-success", false), Ok(BaselinePolicy::FirstSuccess));
        assert_eq!(BaselinePolicy::from_str("none", false), Ok(BaselinePolicy::None));
        assert_eq!(ComparisonMode::from_str("numeric", false), Ok(ComparisonMode::Numeric));
        assert!(ComparisonMode::from_str("fuzzy", false).is_err());
    }

    fn run(id: &str, source: Authorship, success: bool, stdout: &str) -> RunResult {
        RunResult {
            solution_id: id.to_string(),
            task_id: "01".to_string(),
            source,
            language: Language::Python,
            root_dir: format!("x/{}", id),
            success,
            exit_code: if success { 0 } else { 1 },
            timed_out: false,
            execution_time_ms: 1.0,
            build_time_ms: None,
            stdout: stdout.to_string(),
            stderr: String::new(),
            error: None,
            matches_baseline: None,
            baseline_solution_id: None,
            code_stats: None,
        }
    }

    fn model(name: &str) -> Authorship {
        Authorship::Model(name.to_string())
    }

    #[test]
    fn test_normalize_output() {
        assert_eq!(normalize_output("3\r\n7\r\n"), "3\n7");
        assert_eq!(normalize_output("3\n7  \n\n"), "3\n7");
        assert_eq!(normalize_output("  3\n7"), "  3\n7");
    }

    #[test]
    fn test_exact_comparison() {
        assert!(outputs_match("3\n7\n", "3\r\n7", ComparisonMode::Exact));
        assert!(!outputs_match("3\n8\n", "3\n7\n", ComparisonMode::Exact));
        assert!(!outputs_match("Part 1: 3\nPart 2: 7", "3\n7", ComparisonMode::Exact));
    }

    #[test]
    fn test_numeric_comparison_tolerates_labels() {
        assert!(outputs_match("Part 1: 3\nPart 2: 7", "3\n7", ComparisonMode::Numeric));
        assert!(!outputs_match("Part 1: 3\nPart 2: 8", "3\n7", ComparisonMode::Numeric));
        assert!(outputs_match("-4\n1.5", "a: -4\nb: 1.5\n", ComparisonMode::Numeric));
        assert!(!outputs_match("no numbers", "other text", ComparisonMode::Numeric));
        assert!(outputs_match("same", "same\n", ComparisonMode::Numeric));
    }

    #[test]
    fn test_human_policy_prefers_human() {
        let runs = vec![
            run("a", model("m1"), true, "3\n7"),
            run("h", Authorship::Human, true, "3\n7"),
        ];
        assert_eq!(select_baseline(&runs, BaselinePolicy::Human), Some(1));
        assert_eq!(select_baseline(&runs, BaselinePolicy::FirstSuccess), Some(0));
        assert_eq!(select_baseline(&runs, BaselinePolicy::None), None);
    }

    #[test]
    fn test_human_policy_falls_back_to_any_success() {
        let runs = vec![
            run("h", Authorship::Human, false, ""),
            run("a", model("m1"), false, ""),
            run("b", model("m2"), true, "3\n7"),
        ];
        assert_eq!(select_baseline(&runs, BaselinePolicy::Human), Some(2));
    }

    #[test]
    fn test_no_success_means_no_baseline() {
        let mut runs = vec![
            run("h", Authorship::Human, false, "3\n7"),
            run("a", model("m1"), false, "3\n7"),
        ];
        assert_eq!(apply_baseline(&mut runs, BaselinePolicy::Human, ComparisonMode::Exact), None);
        assert!(runs.iter().all(|r| r.matches_baseline.is_none()));
        assert!(runs.iter().all(|r| r.baseline_solution_id.is_none()));
    }

    #[test]
    fn test_apply_baseline_marks_successful_runs_only() {
        let mut runs = vec![
            run("h", Authorship::Human, true, "3\n7\n"),
            run("a", model("m1"), true, "3\n8\n"),
            run("b", model("m2"), false, "3\n7\n"),
            run("c", model("m3"), true, "3\r\n7"),
        ];
        let baseline = apply_baseline(&mut runs, BaselinePolicy::Human, ComparisonMode::Exact);
        assert_eq!(baseline.as_deref(), Some("h"));

        assert_eq!(runs[0].matches_baseline, Some(true));
        assert_eq!(runs[1].matches_baseline, Some(false));
        assert_eq!(runs[2].matches_baseline, None);
        assert_eq!(runs[2].baseline_solution_id, None);
        assert_eq!(runs[3].matches_baseline, Some(true));
        assert_eq!(runs[3].baseline_solution_id.as_deref(), Some("h"));
    }

    #[test]
    fn test_none_policy_leaves_runs_untouched() {
        let mut runs = vec![run("h", Authorship::Human, true, "3\n7")];
        assert_eq!(apply_baseline(&mut runs, BaselinePolicy::None, ComparisonMode::Exact), None);
        assert_eq!(runs[0].matches_baseline, None);
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::BenchError;

/// Implementation language of a solution
/// Closed set - directories with any other name are ignored by discovery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    Js,
    Rust,
}

impl Language {
    /// Returns all language variants
    pub fn all_variants() -> &'static [Language] {
        &[Language::Python, Language::Js, Language::Rust]
    }

    /// Map a solution directory name onto a language.
    /// `ts` directories share the JS runtime category.
    pub fn from_dir_name(name: &str) -> Option<Language> {
        match name {
            "python" => Some(Language::Python),
            "js" | "ts" => Some(Language::Js),
            "rust" => Some(Language::Rust),
            _ => None,
        }
    }

    /// File extensions counted as source code for this language
    pub fn source_extensions(&self) -> &'static [&'static str] {
        match self {
            Language::Python => &["py"],
            Language::Js => &["js", "mjs", "cjs", "ts", "tsx"],
            Language::Rust => &["rs"],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::Js => "js",
            Language::Rust => "rust",
        }
    }
}

impl FromStr for Language {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "python" | "py" => Ok(Language::Python),
            "js" | "javascript" | "ts" | "typescript" => Ok(Language::Js),
            "rust" | "rs" => Ok(Language::Rust),
            _ => Err(BenchError::UnknownLanguage(s.to_string())),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who wrote a solution.
/// Serialized as the bare string the dashboard expects: `"human"` or the model name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Authorship {
    Human,
    Model(String),
}

impl Authorship {
    pub fn is_human(&self) -> bool {
        matches!(self, Authorship::Human)
    }

    /// Label used in dataset records and progress output
    pub fn label(&self) -> &str {
        match self {
            Authorship::Human => "human",
            Authorship::Model(name) => name,
        }
    }

    /// Key hashed into solution ids; keeps a model literally named "human" distinct
    pub fn id_key(&self) -> String {
        match self {
            Authorship::Human => "human".to_string(),
            Authorship::Model(name) => format!("ai:{}", name),
        }
    }
}

impl fmt::Display for Authorship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for Authorship {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for Authorship {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(if raw == "human" {
            Authorship::Human
        } else {
            Authorship::Model(raw)
        })
    }
}

/// Restricts a harness invocation to one side of the authorship split
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorFilter {
    Human,
    Ai,
}

impl AuthorFilter {
    pub fn matches(&self, source: &Authorship) -> bool {
        match self {
            AuthorFilter::Human => source.is_human(),
            AuthorFilter::Ai => !source.is_human(),
        }
    }
}

impl FromStr for AuthorFilter {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" => Ok(AuthorFilter::Human),
            "ai" | "model" => Ok(AuthorFilter::Ai),
            _ => Err(BenchError::UnknownAuthorFilter(s.to_string())),
        }
    }
}

/// One puzzle instance, keyed by its two-digit id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub task_id: String,
    pub input_path: String,
    pub input_bytes: u64,
    pub input_sha256: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_sha256: Option<String>,
}

/// Cheap source-tree statistics for one solution
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeStats {
    pub file_count: u64,
    pub total_loc: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependency_count: Option<u64>,
}

/// A discovered solution (immutable)
///
/// `root_dir` is absolute and used for execution; `rel_dir` is the
/// repository-relative form written to the dataset and hashed into `id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    pub id: String,
    pub task_id: String,
    pub source: Authorship,
    pub language: Language,
    pub root_dir: PathBuf,
    pub rel_dir: String,
    pub entry_hint: Option<String>,
}

/// Serialized form of a solution inside the dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolutionRecord {
    pub id: String,
    pub task_id: String,
    pub source: Authorship,
    pub language: Language,
    pub root_dir: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_stats: Option<CodeStats>,
}

impl SolutionRecord {
    pub fn new(solution: &Solution, code_stats: Option<CodeStats>) -> Self {
        Self {
            id: solution.id.clone(),
            task_id: solution.task_id.clone(),
            source: solution.source.clone(),
            language: solution.language,
            root_dir: solution.rel_dir.clone(),
            entry_hint: solution.entry_hint.clone(),
            code_stats,
        }
    }
}

/// Outcome of executing one solution against its task input
///
/// Written once by the executor; the comparator later fills
/// `matches_baseline` / `baseline_solution_id` for successful runs only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub solution_id: String,
    pub task_id: String,
    pub source: Authorship,
    pub language: Language,
    pub root_dir: String,
    pub success: bool,
    pub exit_code: i32,
    pub timed_out: bool,
    pub execution_time_ms: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_time_ms: Option<f64>,
    pub stdout: String,
    pub stderr: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matches_baseline: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline_solution_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_stats: Option<CodeStats>,
}

impl RunResult {
    /// A failed run skeleton for `solution`; runners overwrite what they learn
    pub fn pending(solution: &Solution) -> Self {
        Self {
            solution_id: solution.id.clone(),
            task_id: solution.task_id.clone(),
            source: solution.source.clone(),
            language: solution.language,
            root_dir: solution.rel_dir.clone(),
            success: false,
            exit_code: 1,
            timed_out: false,
            execution_time_ms: 0.0,
            build_time_ms: None,
            stdout: String::new(),
            stderr: String::new(),
            error: None,
            matches_baseline: None,
            baseline_solution_id: None,
            code_stats: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformInfo {
    pub os: String,
    pub arch: String,
    pub cpu_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetMeta {
    pub generated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_sha: Option<String>,
    pub runner: RunnerInfo,
    pub platform: PlatformInfo,
}

/// Aggregate counters for one group of runs (one source or one language)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupStats {
    pub total: u64,
    pub successful: u64,
    pub failed: u64,
    pub matching: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_time_ms: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetSummary {
    pub total: u64,
    pub successful: u64,
    pub failed: u64,
    pub by_source: BTreeMap<String, GroupStats>,
    pub by_language: BTreeMap<String, GroupStats>,
}

/// Aggregate root written once per harness invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub meta: DatasetMeta,
    pub tasks: Vec<Task>,
    pub solutions: Vec<SolutionRecord>,
    pub runs: Vec<RunResult>,
    #[serde(default)]
    pub summary: DatasetSummary,
}

impl Dataset {
    /// Load a dataset previously written by the runner
    pub fn read_from(path: &Path) -> crate::error::Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| BenchError::io(path, e))?;
        serde_json::from_str(&raw).map_err(|source| BenchError::Json {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_solution(source: Authorship) -> Solution {
        Solution {
            id: "abc123".to_string(),
            task_id: "01".to_string(),
            source,
            language: Language::Python,
            root_dir: PathBuf::from("/repo/human-solutions/01/python"),
            rel_dir: "human-solutions/01/python".to_string(),
            entry_hint: Some("main.py".to_string()),
        }
    }

    #[test]
    fn test_language_serialization() {
        let json = serde_json::to_string(&Language::Js).unwrap();
        assert_eq!(json, "\"js\"");

        let deserialized: Language = serde_json::from_str("\"rust\"").unwrap();
        assert_eq!(deserialized, Language::Rust);
    }

    #[test]
    fn test_language_from_dir_name() {
        assert_eq!(Language::from_dir_name("python"), Some(Language::Python));
        assert_eq!(Language::from_dir_name("ts"), Some(Language::Js));
        assert_eq!(Language::from_dir_name("rust"), Some(Language::Rust));
        assert_eq!(Language::from_dir_name("go"), None);
        assert_eq!(Language::from_dir_name("Python"), None);
    }

    #[test]
    fn test_language_from_str() {
        assert_eq!("Python".parse::<Language>().unwrap(), Language::Python);
        assert_eq!("JS".parse::<Language>().unwrap(), Language::Js);
        assert!("cobol".parse::<Language>().is_err());
    }

    #[test]
    fn test_language_all_variants() {
        let variants = Language::all_variants();
        assert_eq!(variants.len(), 3);
        assert!(variants.contains(&Language::Js));
    }

    #[test]
    fn test_authorship_serializes_as_plain_string() {
        assert_eq!(serde_json::to_string(&Authorship::Human).unwrap(), "\"human\"");
        let model = Authorship::Model("model-a".to_string());
        assert_eq!(serde_json::to_string(&model).unwrap(), "\"model-a\"");

        let back: Authorship = serde_json::from_str("\"model-a\"").unwrap();
        assert_eq!(back, model);
        let human: Authorship = serde_json::from_str("\"human\"").unwrap();
        assert!(human.is_human());
    }

    #[test]
    fn test_author_filter() {
        let human = Authorship::Human;
        let model = Authorship::Model("m".to_string());
        assert!(AuthorFilter::Human.matches(&human));
        assert!(!AuthorFilter::Human.matches(&model));
        assert!(AuthorFilter::Ai.matches(&model));
        assert_eq!("AI".parse::<AuthorFilter>().unwrap(), AuthorFilter::Ai);
        assert!("robots".parse::<AuthorFilter>().is_err());
    }

    #[test]
    fn test_run_result_omits_unset_baseline_fields() {
        let run = RunResult::pending(&sample_solution(Authorship::Human));
        let value = serde_json::to_value(&run).unwrap();

        assert_eq!(value["solutionId"], "abc123");
        assert_eq!(value["timedOut"], false);
        assert_eq!(value["executionTimeMs"], 0.0);
        assert!(value.get("matchesBaseline").is_none());
        assert!(value.get("baselineSolutionId").is_none());
        assert!(value.get("buildTimeMs").is_none());
    }

    #[test]
    fn test_solution_record_uses_relative_root() {
        let solution = sample_solution(Authorship::Model("model-b".to_string()));
        let record = SolutionRecord::new(&solution, Some(CodeStats::default()));
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["rootDir"], "human-solutions/01/python");
        assert_eq!(value["source"], "model-b");
        assert_eq!(value["entryHint"], "main.py");
        assert!(value["codeStats"].get("dependencyCount").is_none());
    }

    #[test]
    fn test_read_dataset_reports_bad_json_with_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("latest.json");

        assert!(matches!(Dataset::read_from(&path), Err(BenchError::Io { .. })));

        fs::write(&path, "{\"meta\": 1}").unwrap();
        let err = Dataset::read_from(&path).unwrap_err();
        assert!(matches!(err, BenchError::Json { .. }));
        assert!(err.to_string().contains("latest.json"));
    }
}

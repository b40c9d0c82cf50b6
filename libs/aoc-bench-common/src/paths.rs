use std::path::{Path, PathBuf};

use crate::error::{BenchError, Result};

/// Repository layout conventions - defines only naming, not I/O
/// Keeps the runner, the CLI scaffolder and the dashboard agreeing on where things live

pub const HUMAN_SOLUTIONS_DIR: &str = "human-solutions";
pub const AI_SOLUTIONS_DIR: &str = "ai-solutions";
pub const INPUTS_DIR: &str = "inputs";
pub const PROMPTS_DIR: &str = "prompts";
pub const DEFAULT_DATASET_PATH: &str = "site/public/data/latest.json";

/// Build-artifact and dependency-cache directories never walked for metrics
pub const IGNORED_DIRS: &[&str] = &["node_modules", "target", ".git", "__pycache__"];

/// Normalize a user supplied task id ("1", "01") to its two-digit form
pub fn normalize_task_id(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.len() > 2 || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Err(BenchError::InvalidTaskId(raw.to_string()));
    }
    let padded = format!("{:0>2}", trimmed);
    if padded == "00" {
        return Err(BenchError::InvalidTaskId(raw.to_string()));
    }
    Ok(padded)
}

/// Extract the task id from an input file name of the form `NN.txt`
pub fn task_id_from_input_name(file_name: &str) -> Option<String> {
    let stem = file_name.strip_suffix(".txt")?;
    if stem.len() == 2 && stem.chars().all(|c| c.is_ascii_digit()) {
        Some(stem.to_string())
    } else {
        None
    }
}

pub fn input_path(repo_root: &Path, task_id: &str) -> PathBuf {
    repo_root.join(INPUTS_DIR).join(format!("{}.txt", task_id))
}

pub fn prompt_path(repo_root: &Path, task_id: &str) -> PathBuf {
    repo_root.join(PROMPTS_DIR).join(format!("{}.md", task_id))
}

pub fn human_task_dir(repo_root: &Path, task_id: &str) -> PathBuf {
    repo_root.join(HUMAN_SOLUTIONS_DIR).join(task_id)
}

pub fn ai_task_dir(repo_root: &Path, task_id: &str) -> PathBuf {
    repo_root.join(AI_SOLUTIONS_DIR).join(task_id)
}

/// Repository-relative path with forward slashes, for ids and dataset records.
/// Paths outside the repository are returned as-is.
pub fn relative_to(repo_root: &Path, path: &Path) -> String {
    let Ok(rel) = path.strip_prefix(repo_root) else {
        return path.to_string_lossy().into_owned();
    };
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Resolve a possibly relative output path against the repository root
pub fn resolve_in_repo(repo_root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        repo_root.join(path)
    }
}

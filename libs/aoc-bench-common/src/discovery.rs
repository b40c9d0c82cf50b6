/// Solution Discovery
///
/// Walks the two author-keyed hierarchies:
///
/// ```text
/// human-solutions/<task>/<lang>/
/// ai-solutions/<task>/<model>/<lang>/
/// ```
///
/// Listings are sorted so discovery order (and with it the baseline
/// tie-break) is the same on every filesystem: human first, then models
/// and languages in lexical order.

use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

use crate::paths;
use crate::types::{AuthorFilter, Authorship, Language, Solution};

/// Narrows a discovered solution list; `None` fields mean "all"
#[derive(Debug, Clone, Copy, Default)]
pub struct SolutionFilter {
    pub author: Option<AuthorFilter>,
    pub language: Option<Language>,
}

impl SolutionFilter {
    pub fn accepts(&self, solution: &Solution) -> bool {
        self.author.map_or(true, |a| a.matches(&solution.source))
            && self.language.map_or(true, |l| l == solution.language)
    }

    pub fn apply(&self, solutions: Vec<Solution>) -> Vec<Solution> {
        solutions.into_iter().filter(|s| self.accepts(s)).collect()
    }
}

/// Sorted names of the sub-directories of `dir`; missing or unreadable dirs yield nothing
fn list_dirs(dir: &Path) -> Vec<String> {
    list_entries(dir, true)
}

fn list_files(dir: &Path) -> Vec<String> {
    list_entries(dir, false)
}

fn list_entries(dir: &Path, want_dirs: bool) -> Vec<String> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.file_type()
                .map(|t| if want_dirs { t.is_dir() } else { t.is_file() })
                .unwrap_or(false)
        })
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Task ids that have an `inputs/NN.txt` file, sorted
pub fn discover_task_ids(repo_root: &Path) -> Vec<String> {
    let mut ids: Vec<String> = list_files(&repo_root.join(paths::INPUTS_DIR))
        .iter()
        .filter_map(|name| paths::task_id_from_input_name(name))
        .collect();
    ids.sort();
    ids.dedup();
    ids
}

/// Deterministic id: first 16 hex chars of sha256("task|author|language|rel_root")
pub fn stable_solution_id(task_id: &str, source: &Authorship, language: Language, rel_dir: &str) -> String {
    let raw = format!("{}|{}|{}|{}", task_id, source.id_key(), language, rel_dir);
    let digest = Sha256::digest(raw.as_bytes());
    hex::encode(digest)[..16].to_string()
}

/// Guess the file a runner will execute, by the fixed per-language search order
pub fn detect_entry_hint(solution_root: &Path, language: Language) -> Option<String> {
    let preferred: &[&str] = match language {
        Language::Python => &["main.py", "solution.py"],
        Language::Js => &[
            "index.js",
            "main.js",
            "solution.js",
            "index.ts",
            "main.ts",
            "solution.ts",
        ],
        Language::Rust => &["Cargo.toml"],
    };

    if let Some(found) = preferred.iter().find(|f| solution_root.join(f).is_file()) {
        return Some(found.to_string());
    }

    let fallback_exts: &[&str] = match language {
        Language::Python => &["py"],
        Language::Js => &["cjs", "mjs", "js", "ts", "tsx"],
        Language::Rust => &["rs"],
    };
    list_files(solution_root).into_iter().find(|name| {
        Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map_or(false, |e| fallback_exts.contains(&e))
    })
}

fn build_solution(repo_root: &Path, task_id: &str, source: Authorship, language: Language, dir: &Path) -> Solution {
    let rel_dir = paths::relative_to(repo_root, dir);
    Solution {
        id: stable_solution_id(task_id, &source, language, &rel_dir),
        task_id: task_id.to_string(),
        source,
        language,
        root_dir: dir.to_path_buf(),
        rel_dir,
        entry_hint: detect_entry_hint(dir, language),
    }
}

fn language_dirs(
    repo_root: &Path,
    task_id: &str,
    source: &Authorship,
    parent: &Path,
    out: &mut Vec<Solution>,
) {
    for lang_dir in list_dirs(parent) {
        let Some(language) = Language::from_dir_name(&lang_dir) else {
            continue;
        };
        out.push(build_solution(
            repo_root,
            task_id,
            source.clone(),
            language,
            &parent.join(&lang_dir),
        ));
    }
}

/// Enumerate every solution for the given tasks. Read-only; absent
/// directories simply contribute nothing.
pub fn discover_solutions(repo_root: &Path, task_ids: &[String]) -> Vec<Solution> {
    let mut solutions = Vec::new();

    for task_id in task_ids {
        let human_dir = paths::human_task_dir(repo_root, task_id);
        language_dirs(repo_root, task_id, &Authorship::Human, &human_dir, &mut solutions);

        let ai_dir = paths::ai_task_dir(repo_root, task_id);
        for model in list_dirs(&ai_dir) {
            let source = Authorship::Model(model.clone());
            language_dirs(repo_root, task_id, &source, &ai_dir.join(&model), &mut solutions);
        }
    }

    solutions
}

use serde_json::Value;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use walkdir::{DirEntry, WalkDir};

use crate::paths::IGNORED_DIRS;
use crate::types::{CodeStats, Language};

fn is_ignored_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .map_or(false, |name| IGNORED_DIRS.contains(&name))
}

fn has_source_extension(path: &Path, language: Language) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map_or(false, |ext| language.source_extensions().contains(&ext))
}

/// Walk a solution tree and count source files and their lines.
///
/// Every line counts, blank and comment lines included. A trailing newline
/// ends the last line rather than starting an empty one. Files that cannot
/// be read are left out of both totals.
pub fn compute_code_stats(solution_root: &Path, language: Language) -> CodeStats {
    let mut stats = CodeStats::default();

    let walker = WalkDir::new(solution_root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| !is_ignored_dir(e))
        .filter_map(Result::ok);

    for entry in walker {
        if !entry.file_type().is_file() || !has_source_extension(entry.path(), language) {
            continue;
        }
        let Ok(bytes) = fs::read(entry.path()) else {
            continue;
        };
        stats.total_loc += String::from_utf8_lossy(&bytes).lines().count() as u64;
        stats.file_count += 1;
    }

    if language == Language::Js {
        stats.dependency_count = npm_dependency_count(solution_root);
    }

    stats
}

/// Size of the union of `dependencies` and `devDependencies` in package.json.
/// `None` when the manifest is missing or is not valid JSON.
pub fn npm_dependency_count(solution_root: &Path) -> Option<u64> {
    let raw = fs::read_to_string(solution_root.join("package.json")).ok()?;
    let manifest: Value = serde_json::from_str(&raw).ok()?;

    let mut names = BTreeSet::new();
    for section in ["dependencies", "devDependencies"] {
        if let Some(deps) = manifest.get(section).and_then(Value::as_object) {
            names.extend(deps.keys().cloned());
        }
    }
    Some(names.len() as u64)
}

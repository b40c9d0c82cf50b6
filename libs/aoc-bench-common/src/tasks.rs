use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

use crate::error::{BenchError, Result};
use crate::paths;
use crate::types::Task;

/// Size and content hash of a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDigest {
    pub bytes: u64,
    pub sha256: String,
}

pub fn digest_file(path: &Path) -> Result<FileDigest> {
    let buf = fs::read(path).map_err(|e| BenchError::io(path, e))?;
    Ok(FileDigest {
        bytes: buf.len() as u64,
        sha256: hex::encode(Sha256::digest(&buf)),
    })
}

/// Build task metadata for each id. The input file must exist; the
/// prompt document is optional.
pub fn load_task(repo_root: &Path, task_id: &str) -> Result<Task> {
    let input = paths::input_path(repo_root, task_id);
    let input_digest = digest_file(&input)?;

    let prompt = paths::prompt_path(repo_root, task_id);
    let prompt_digest = if prompt.is_file() {
        Some(digest_file(&prompt)?)
    } else {
        None
    };

    Ok(Task {
        task_id: task_id.to_string(),
        input_path: paths::relative_to(repo_root, &input),
        input_bytes: input_digest.bytes,
        input_sha256: input_digest.sha256,
        prompt_path: prompt_digest
            .as_ref()
            .map(|_| paths::relative_to(repo_root, &prompt)),
        prompt_bytes: prompt_digest.as_ref().map(|d| d.bytes),
        prompt_sha256: prompt_digest.map(|d| d.sha256),
    })
}

pub fn load_tasks(repo_root: &Path, task_ids: &[String]) -> Result<Vec<Task>> {
    task_ids.iter().map(|id| load_task(repo_root, id)).collect()
}

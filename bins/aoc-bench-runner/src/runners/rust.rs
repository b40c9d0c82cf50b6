use anyhow::{Context, Result};
use aoc_bench_common::discovery::detect_entry_hint;
use aoc_bench_common::Language;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{path_arg, Outcome, RunnerContext};
use crate::engine::{CommandSpec, ExecutionEngine};

/// `[package] name` from a Cargo manifest, if it parses
fn manifest_package_name(manifest: &Path) -> Option<String> {
    let raw = fs::read_to_string(manifest).ok()?;
    let table: toml::Table = raw.parse().ok()?;
    table
        .get("package")?
        .get("name")?
        .as_str()
        .map(str::to_string)
}

/// Names tried under `target/release`, in order, without duplicates
pub fn binary_candidates(crate_dir: &Path) -> Vec<String> {
    let dir_name = crate_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let package = manifest_package_name(&crate_dir.join("Cargo.toml")).unwrap_or_else(|| dir_name.clone());

    let mut names: Vec<String> = Vec::new();
    for name in [package, dir_name, "main".to_string(), "solution".to_string()] {
        if !name.is_empty() && !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

pub fn find_release_binary(crate_dir: &Path) -> Option<PathBuf> {
    let release = crate_dir.join("target").join("release");
    binary_candidates(crate_dir)
        .into_iter()
        .map(|name| release.join(format!("{}{}", name, std::env::consts::EXE_SUFFIX)))
        .find(|path| path.is_file())
}

/// Compiled strategy: cargo project when a manifest exists, single-file rustc otherwise
pub async fn run<E: ExecutionEngine>(ctx: &RunnerContext<'_, E>) -> Result<Outcome> {
    if ctx.root().join("Cargo.toml").is_file() {
        run_cargo_project(ctx).await
    } else {
        run_single_file(ctx).await
    }
}

async fn run_cargo_project<E: ExecutionEngine>(ctx: &RunnerContext<'_, E>) -> Result<Outcome> {
    let build = CommandSpec::new(
        &ctx.config.cargo_bin,
        ctx.root(),
        ctx.config.build_timeout_ms(ctx.timeout_ms),
    )
    .args(["build", "--release"])
    .env("CARGO_TERM_COLOR", "never");

    debug!(solution = %ctx.solution.id, "cargo build --release");
    let built = ctx.engine.execute(&build).await?;
    if !built.succeeded() {
        return Ok(Outcome::BuildFailed {
            step: "cargo build",
            exec: built,
        });
    }

    let Some(binary) = find_release_binary(ctx.root()) else {
        return Ok(Outcome::MissingArtifact {
            message: format!(
                "Rust binary not found after cargo build (checked: {})",
                binary_candidates(ctx.root()).join(", ")
            ),
            build_time_ms: Some(built.elapsed_ms),
        });
    };

    let exec = ctx.engine.execute(&ctx.solution_command(binary, &[])).await?;
    Ok(Outcome::Executed {
        exec,
        build_time_ms: Some(built.elapsed_ms),
    })
}

async fn run_single_file<E: ExecutionEngine>(ctx: &RunnerContext<'_, E>) -> Result<Outcome> {
    let Some(entry_name) = detect_entry_hint(ctx.root(), Language::Rust) else {
        return Ok(Outcome::NoEntry(format!(
            "No Rust source file found in {}",
            ctx.solution.rel_dir
        )));
    };
    let entry = ctx.root().join(&entry_name);
    let stem = entry
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "solution".to_string());

    // The binary lives in a scratch dir that is removed on drop, so the
    // solution directory never sees it, even on failure paths.
    let scratch = tempfile::Builder::new()
        .prefix(".tmp-bench-")
        .tempdir()
        .context("Failed to create scratch directory for rustc output")?;
    let binary = scratch
        .path()
        .join(format!("{}{}", stem, std::env::consts::EXE_SUFFIX));

    let compile = CommandSpec::new(
        &ctx.config.rustc_bin,
        ctx.root(),
        ctx.config.compile_timeout_ms(ctx.timeout_ms),
    )
    .args(["-O".to_string(), "-o".to_string(), path_arg(&binary), path_arg(&entry)]);

    debug!(solution = %ctx.solution.id, entry = %entry_name, "rustc -O");
    let compiled = ctx.engine.execute(&compile).await?;
    if !compiled.succeeded() {
        return Ok(Outcome::BuildFailed {
            step: "rustc",
            exec: compiled,
        });
    }

    let exec = ctx.engine.execute(&ctx.solution_command(&binary, &[])).await?;
    Ok(Outcome::Executed {
        exec,
        build_time_ms: Some(compiled.elapsed_ms),
    })
}

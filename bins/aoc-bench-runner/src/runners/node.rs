use anyhow::{Context, Result};
use aoc_bench_common::discovery::detect_entry_hint;
use aoc_bench_common::Language;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::{debug, warn};

use super::{path_arg, Outcome, RunnerContext};
use crate::engine::{CommandSpec, ExecutionEngine};

lazy_static! {
    static ref COMMONJS_MARKERS: [Regex; 3] = [
        Regex::new(r"\brequire\s*\(").expect("valid regex"),
        Regex::new(r"\bmodule\.exports\b").expect("valid regex"),
        Regex::new(r"\bexports\.[A-Za-z_$][\w$]*").expect("valid regex"),
    ];
}

/// How a `.js` entry must be started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleFlavor {
    /// Let node decide from the file extension and nearest package.json
    AsIs,
    /// Run a temporary `.cjs` copy so node loads it as CommonJS
    CommonJs,
}

/// `"type"` declared by the solution's own package.json, if any
fn declared_module_type(root: &Path) -> Option<String> {
    let raw = fs::read_to_string(root.join("package.json")).ok()?;
    let manifest: Value = serde_json::from_str(&raw).ok()?;
    manifest.get("type")?.as_str().map(str::to_string)
}

pub fn looks_like_commonjs(source: &str) -> bool {
    COMMONJS_MARKERS.iter().any(|re| re.is_match(source))
}

/// Decide the flavor of a `.js` entry.
///
/// A solution that declares `"type"` in its own package.json is run as-is:
/// node honours the nearest manifest. Only undeclared solutions fall back
/// to sniffing the source, and only when that is enabled.
pub fn resolve_flavor(root: &Path, source: &str, sniff: bool) -> ModuleFlavor {
    if declared_module_type(root).is_some() {
        return ModuleFlavor::AsIs;
    }
    if sniff && looks_like_commonjs(source) {
        ModuleFlavor::CommonJs
    } else {
        ModuleFlavor::AsIs
    }
}

/// Install declared dependencies once; failures are logged and the run continues
async fn ensure_dependencies<E: ExecutionEngine>(ctx: &RunnerContext<'_, E>) {
    let root = ctx.root();
    if !root.join("package.json").is_file() || root.join("node_modules").exists() {
        return;
    }

    let subcommand = if root.join("package-lock.json").is_file() {
        "ci"
    } else {
        "install"
    };
    let spec = CommandSpec::new(
        &ctx.config.npm_bin,
        root,
        ctx.config.install_timeout_ms(ctx.timeout_ms),
    )
    .arg(subcommand);

    debug!(solution = %ctx.solution.id, "npm {}", subcommand);
    match ctx.engine.execute(&spec).await {
        Ok(out) if out.succeeded() => {}
        Ok(out) => warn!(
            solution = %ctx.solution.id,
            exit_code = out.exit_code,
            timed_out = out.timed_out,
            "Dependency install failed"
        ),
        Err(e) => warn!(solution = %ctx.solution.id, error = %e, "Dependency install could not start"),
    }
}

/// Node/Bun strategy: install dependencies, pick an entry, respect the module flavor
pub async fn run<E: ExecutionEngine>(ctx: &RunnerContext<'_, E>) -> Result<Outcome> {
    ensure_dependencies(ctx).await;

    let Some(entry_name) = detect_entry_hint(ctx.root(), Language::Js) else {
        return Ok(Outcome::NoEntry(format!(
            "No JavaScript/TypeScript file found in {}",
            ctx.solution.rel_dir
        )));
    };
    let entry = ctx.root().join(&entry_name);
    let ext = entry
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();

    if ext == "ts" || ext == "tsx" {
        let spec = ctx.solution_command(&ctx.config.bun_bin, &[path_arg(&entry)]);
        let exec = ctx.engine.execute(&spec).await?;
        return Ok(Outcome::Executed {
            exec,
            build_time_ms: None,
        });
    }

    let source = if ext == "js" {
        fs::read_to_string(&entry).unwrap_or_default()
    } else {
        String::new()
    };

    let exec = match resolve_flavor(ctx.root(), &source, ctx.config.sniff_commonjs) {
        ModuleFlavor::CommonJs if !source.is_empty() => {
            // The copy sits next to the original so relative requires resolve;
            // it is removed when `copy` drops, whatever happens below.
            let mut copy = tempfile::Builder::new()
                .prefix(&format!(".tmp-bench-{}-", ctx.solution.id))
                .suffix(".cjs")
                .tempfile_in(ctx.root())
                .context("Failed to create temporary CommonJS copy")?;
            copy.write_all(source.as_bytes())
                .and_then(|_| copy.flush())
                .context("Failed to write temporary CommonJS copy")?;

            debug!(solution = %ctx.solution.id, entry = %entry_name, "Running as CommonJS copy");
            let spec = ctx.solution_command(&ctx.config.node_bin, &[path_arg(copy.path())]);
            ctx.engine.execute(&spec).await?
        }
        _ => {
            let spec = ctx.solution_command(&ctx.config.node_bin, &[path_arg(&entry)]);
            ctx.engine.execute(&spec).await?
        }
    };

    Ok(Outcome::Executed {
        exec,
        build_time_ms: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::{ok, ScriptedEngine};
    use aoc_bench_common::{Authorship, Config, Solution};
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn solution_at(root: &Path) -> Solution {
        Solution {
            id: "feedface00000000".to_string(),
            task_id: "01".to_string(),
            source: Authorship::Model("model-a".to_string()),
            language: Language::Js,
            root_dir: root.to_path_buf(),
            rel_dir: "ai-solutions/01/model-a/js".to_string(),
            entry_hint: None,
        }
    }

    #[test]
    fn test_commonjs_heuristic() {
        assert!(looks_like_commonjs("const fs = require('fs');"));
        assert!(looks_like_commonjs("module.exports = { solve };"));
        assert!(looks_like_commonjs("exports.part1 = part1;"));
        assert!(!looks_like_commonjs("import fs from 'node:fs';\nconsole.log(1);"));
        assert!(!looks_like_commonjs("const requirement = 3;"));
    }

    #[test]
    fn test_declared_type_wins_over_sniffing() {
        let dir = TempDir::new().unwrap();
        let cjs_source = "const fs = require('fs');";
        assert_eq!(resolve_flavor(dir.path(), cjs_source, true), ModuleFlavor::CommonJs);
        assert_eq!(resolve_flavor(dir.path(), cjs_source, false), ModuleFlavor::AsIs);

        fs::write(dir.path().join("package.json"), r#"{"type": "commonjs"}"#).unwrap();
        assert_eq!(resolve_flavor(dir.path(), cjs_source, true), ModuleFlavor::AsIs);
    }

    #[tokio::test]
    async fn test_commonjs_copy_is_used_and_removed() {
        let dir = TempDir::new().unwrap();
        let source = "const fs = require('fs');\nconsole.log(3);\n";
        fs::write(dir.path().join("index.js"), source).unwrap();

        let engine = ScriptedEngine::new(move |spec| {
            let copy = PathBuf::from(&spec.args[0]);
            assert_eq!(copy.extension().unwrap(), "cjs");
            assert_eq!(fs::read_to_string(&copy).unwrap(), source);
            Ok(ok("3\n"))
        });
        let config = Config::default();
        let solution = solution_at(dir.path());
        let input = PathBuf::from("/abs/in.txt");
        let ctx = RunnerContext {
            engine: &engine,
            config: &config,
            solution: &solution,
            input_path: &input,
            timeout_ms: 2_000,
        };

        let outcome = run(&ctx).await.unwrap();
        assert!(matches!(outcome, Outcome::Executed { .. }));

        let calls = engine.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].program, PathBuf::from("node"));
        assert_eq!(calls[0].args[1], "/abs/in.txt");
        assert!(!PathBuf::from(&calls[0].args[0]).exists());

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(".tmp-bench-"))
            .collect();
        assert!(leftovers.is_empty());
        assert_eq!(fs::read_to_string(dir.path().join("index.js")).unwrap(), source);
    }

    #[tokio::test]
    async fn test_copy_removed_when_engine_fails() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("main.js"), "module.exports = 1;\n").unwrap();

        let engine = ScriptedEngine::new(|_| Err(anyhow::anyhow!("node missing")));
        let config = Config::default();
        let solution = solution_at(dir.path());
        let input = PathBuf::from("/abs/in.txt");
        let ctx = RunnerContext {
            engine: &engine,
            config: &config,
            solution: &solution,
            input_path: &input,
            timeout_ms: 2_000,
        };

        assert!(run(&ctx).await.is_err());
        let copy = PathBuf::from(&engine.calls()[0].args[0]);
        assert!(!copy.exists());
    }

    #[tokio::test]
    async fn test_installs_dependencies_then_runs_typescript_with_bun() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("package.json"), r#"{"type": "module"}"#).unwrap();
        fs::write(dir.path().join("package-lock.json"), "{}").unwrap();
        fs::write(dir.path().join("index.ts"), "console.log(1)").unwrap();

        let engine = ScriptedEngine::printing("1\n");
        let config = Config::default();
        let solution = solution_at(dir.path());
        let input = PathBuf::from("/abs/in.txt");
        let ctx = RunnerContext {
            engine: &engine,
            config: &config,
            solution: &solution,
            input_path: &input,
            timeout_ms: 500_000,
        };

        run(&ctx).await.unwrap();
        let calls = engine.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].program, PathBuf::from("npm"));
        assert_eq!(calls[0].args, vec!["ci".to_string()]);
        assert_eq!(calls[0].timeout_ms(), 120_000);
        assert_eq!(calls[1].program, PathBuf::from("bun"));
        assert_eq!(calls[1].timeout_ms(), 500_000);
    }

    #[tokio::test]
    async fn test_existing_node_modules_skips_install() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("package.json"), "{}").unwrap();
        fs::create_dir_all(dir.path().join("node_modules")).unwrap();
        fs::write(dir.path().join("index.mjs"), "console.log(1)").unwrap();

        let engine = ScriptedEngine::printing("1\n");
        let config = Config::default();
        let solution = solution_at(dir.path());
        let input = PathBuf::from("/abs/in.txt");
        let ctx = RunnerContext {
            engine: &engine,
            config: &config,
            solution: &solution,
            input_path: &input,
            timeout_ms: 1_000,
        };

        run(&ctx).await.unwrap();
        let calls = engine.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].program, PathBuf::from("node"));
        assert_eq!(calls[0].args[0], path_arg(&dir.path().join("index.mjs")));
    }
}

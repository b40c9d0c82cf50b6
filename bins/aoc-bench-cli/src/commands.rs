// CLI commands for managing the benchmark repository
use anyhow::{bail, Context, Result};
use aoc_bench_common::code_stats::compute_code_stats;
use aoc_bench_common::discovery::{discover_solutions, discover_task_ids};
use aoc_bench_common::types::GroupStats;
use aoc_bench_common::{paths, Dataset, Language};
use handlebars::Handlebars;
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

const PYTHON_MAIN: &str = include_str!("../../../config/templates/python-main.py.hbs");
const JS_INDEX: &str = include_str!("../../../config/templates/js-index.js.hbs");
const RUST_MAIN: &str = include_str!("../../../config/templates/rust-main.rs.hbs");
const RUST_CARGO: &str = include_str!("../../../config/templates/rust-cargo.toml.hbs");
const NOTES: &str = include_str!("../../../config/templates/notes.md.hbs");
const SUMMARY: &str = include_str!("../../../config/templates/summary.txt.hbs");

fn templates() -> Result<Handlebars<'static>> {
    let mut handlebars = Handlebars::new();
    handlebars.set_strict_mode(true);
    // Templates produce source code, not HTML
    handlebars.register_escape_fn(handlebars::no_escape);

    for (name, source) in [
        ("python_main", PYTHON_MAIN),
        ("js_index", JS_INDEX),
        ("rust_main", RUST_MAIN),
        ("rust_cargo", RUST_CARGO),
        ("notes", NOTES),
        ("summary", SUMMARY),
    ] {
        handlebars
            .register_template_string(name, source)
            .with_context(|| format!("Invalid built-in template: {}", name))?;
    }
    Ok(handlebars)
}

/// What `add-day` did, relative to the repository root
#[derive(Debug, Default)]
pub struct ScaffoldReport {
    pub created: Vec<String>,
    pub existing: Vec<String>,
}

struct Scaffolder<'a> {
    root: &'a Path,
    handlebars: Handlebars<'static>,
    report: ScaffoldReport,
}

impl<'a> Scaffolder<'a> {
    fn ensure_dir(&mut self, dir: &Path) -> Result<()> {
        let rel = paths::relative_to(self.root, dir);
        if dir.is_dir() {
            self.report.existing.push(rel);
            return Ok(());
        }
        fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
        println!("  ✓ Created: {}", rel);
        self.report.created.push(rel);
        Ok(())
    }

    /// Render `template` to `path` unless the file already exists
    fn write_new(&mut self, path: &Path, template: &str, data: &serde_json::Value) -> Result<()> {
        let rel = paths::relative_to(self.root, path);
        if path.exists() {
            println!("  - Exists: {}", rel);
            self.report.existing.push(rel);
            return Ok(());
        }
        let content = self
            .handlebars
            .render(template, data)
            .with_context(|| format!("Failed to render {} template", template))?;
        fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
        println!("  ✓ Created: {}", rel);
        self.report.created.push(rel);
        Ok(())
    }

    /// One language directory per supported language, each with its starter files
    fn language_dirs(&mut self, base: &Path, data: &serde_json::Value) -> Result<()> {
        for language in Language::all_variants() {
            let dir = base.join(language.as_str());
            self.ensure_dir(&dir)?;
            match language {
                Language::Python => self.write_new(&dir.join("main.py"), "python_main", data)?,
                Language::Js => self.write_new(&dir.join("index.js"), "js_index", data)?,
                Language::Rust => {
                    self.ensure_dir(&dir.join("src"))?;
                    self.write_new(&dir.join("src").join("main.rs"), "rust_main", data)?;
                    self.write_new(&dir.join("Cargo.toml"), "rust_cargo", data)?;
                }
            }
        }
        Ok(())
    }
}

fn validate_model_name(model: &str) -> Result<()> {
    if model.is_empty()
        || model == "."
        || model == ".."
        || model.contains(['/', '\\'])
        || model.eq_ignore_ascii_case("human")
    {
        bail!("Invalid model name: '{}'", model);
    }
    Ok(())
}

/// Scaffold directories and starter files for one day. Never overwrites.
pub async fn add_day(root: &Path, day: u32, models: &[String]) -> Result<ScaffoldReport> {
    if !(1..=25).contains(&day) {
        bail!("Day number must be between 1 and 25 (got {})", day);
    }
    for model in models {
        validate_model_name(model)?;
    }
    let day_id = format!("{:02}", day);

    println!("🎄 Setting up day {} ({})", day, day_id);
    println!("{}", "=".repeat(50));

    let mut scaffolder = Scaffolder {
        root,
        handlebars: templates()?,
        report: ScaffoldReport::default(),
    };

    println!("\n📁 {}/{}/", paths::HUMAN_SOLUTIONS_DIR, day_id);
    let human_dir = paths::human_task_dir(root, &day_id);
    scaffolder.language_dirs(&human_dir, &json!({ "day": day, "day_id": day_id }))?;

    if !models.is_empty() {
        println!("\n📁 {}/{}/", paths::AI_SOLUTIONS_DIR, day_id);
    }
    for model in models {
        println!("\n  Model: {}", model);
        let model_dir = paths::ai_task_dir(root, &day_id).join(model);
        let data = json!({ "day": day, "day_id": day_id, "model": model });
        scaffolder.language_dirs(&model_dir, &data)?;
        scaffolder.write_new(&model_dir.join("notes.md"), "notes", &data)?;
    }

    println!("\n📄 Input file");
    let input = paths::input_path(root, &day_id);
    if let Some(parent) = input.parent() {
        scaffolder.ensure_dir(parent)?;
    }
    let input_rel = paths::relative_to(root, &input);
    if input.exists() {
        println!("  - Exists: {}", input_rel);
        scaffolder.report.existing.push(input_rel.clone());
    } else {
        fs::write(&input, "").with_context(|| format!("Failed to write {}", input.display()))?;
        println!("  ✓ Created: {}", input_rel);
        scaffolder.report.created.push(input_rel.clone());
    }

    println!("\n✅ Day setup complete!");
    println!("\n📋 Next steps:");
    println!("  1. Add the puzzle input to: {}", input_rel);
    println!("  2. Start coding in: {}/{}/", paths::HUMAN_SOLUTIONS_DIR, day_id);
    println!("  3. Run the benchmark: aoc-bench-runner --task {}", day_id);

    Ok(scaffolder.report)
}

/// One row of `list` output
#[derive(Debug, Clone, PartialEq)]
pub struct ListedSolution {
    pub id: String,
    pub task_id: String,
    pub source: String,
    pub language: Language,
    pub entry: String,
    pub loc: u64,
}

/// Discover solutions without running them
pub async fn list_solutions(root: &Path, task: Option<&str>) -> Result<Vec<ListedSolution>> {
    let task_ids = match task {
        Some(raw) => vec![paths::normalize_task_id(raw)?],
        None => {
            // Solutions may exist before their input file does
            let mut ids = discover_task_ids(root);
            ids.extend(task_dirs(root));
            ids.sort();
            ids.dedup();
            ids
        }
    };

    let rows: Vec<ListedSolution> = discover_solutions(root, &task_ids)
        .into_iter()
        .map(|s| ListedSolution {
            loc: compute_code_stats(&s.root_dir, s.language).total_loc,
            id: s.id,
            task_id: s.task_id,
            source: s.source.label().to_string(),
            language: s.language,
            entry: s.entry_hint.unwrap_or_else(|| "-".to_string()),
        })
        .collect();

    if rows.is_empty() {
        println!("No solutions found.");
        println!("\n💡 Scaffold a day with: aoc-bench-cli add-day <day>");
        return Ok(rows);
    }

    println!("📋 Solutions:\n");
    println!(
        "{:<18} {:<6} {:<20} {:<8} {:<14} {:>6}",
        "Id", "Task", "Source", "Lang", "Entry", "LOC"
    );
    println!("{}", "─".repeat(77));
    for row in &rows {
        println!(
            "{:<18} {:<6} {:<20} {:<8} {:<14} {:>6}",
            row.id, row.task_id, row.source, row.language, row.entry, row.loc
        );
    }
    println!("\n✅ Total: {} solution(s)", rows.len());

    Ok(rows)
}

/// Two-digit directory names under either solution hierarchy
fn task_dirs(root: &Path) -> Vec<String> {
    [paths::HUMAN_SOLUTIONS_DIR, paths::AI_SOLUTIONS_DIR]
        .iter()
        .filter_map(|dir| fs::read_dir(root.join(dir)).ok())
        .flatten()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .filter_map(|e| paths::normalize_task_id(&e.file_name().to_string_lossy()).ok())
        .collect()
}

#[derive(Debug, Serialize)]
struct GroupRow {
    name: String,
    total: u64,
    successful: u64,
    failed: u64,
    matching: u64,
    avg_time: String,
}

fn group_rows(groups: &BTreeMap<String, GroupStats>) -> Vec<GroupRow> {
    groups
        .iter()
        .map(|(name, g)| GroupRow {
            name: name.clone(),
            total: g.total,
            successful: g.successful,
            failed: g.failed,
            matching: g.matching,
            avg_time: g
                .avg_time_ms
                .map(|ms| format!("{:.2}ms", ms))
                .unwrap_or_else(|| "-".to_string()),
        })
        .collect()
}

pub fn render_summary(dataset: &Dataset) -> Result<String> {
    let meta = &dataset.meta;
    let summary = &dataset.summary;
    let data = json!({
        "generated_at": meta.generated_at.to_rfc3339(),
        "runner": format!("{} {}", meta.runner.name, meta.runner.version),
        "git_sha": meta.git_sha.as_deref().unwrap_or("unknown"),
        "platform": format!("{}/{} ({} cpus)", meta.platform.os, meta.platform.arch, meta.platform.cpu_count),
        "tasks": dataset.tasks.len(),
        "solutions": dataset.solutions.len(),
        "total": summary.total,
        "successful": summary.successful,
        "failed": summary.failed,
        "by_source": group_rows(&summary.by_source),
        "by_language": group_rows(&summary.by_language),
    });

    templates()?
        .render("summary", &data)
        .context("Failed to render summary template")
}

pub fn load_dataset(path: &Path) -> Result<Dataset> {
    Dataset::read_from(path).context("Failed to load dataset")
}

/// Print a summary of a written dataset
pub async fn show_summary(root: &Path, dataset_path: Option<PathBuf>) -> Result<()> {
    let path = paths::resolve_in_repo(
        root,
        &dataset_path.unwrap_or_else(|| PathBuf::from(paths::DEFAULT_DATASET_PATH)),
    );
    let dataset = load_dataset(&path)?;
    print!("{}", render_summary(&dataset)?);
    Ok(())
}

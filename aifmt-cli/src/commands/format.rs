//! `aifmt format`: run the batch engine over the given files.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use aifmt_core::config::{self, Config, ConfigOrigin};
use aifmt_core::types::DEFAULT_MODEL;
use aifmt_core::{ReportFlush, RunSettings};
use aifmt_engine::logging::init_tracing;
use aifmt_engine::{validate, FileStatus, Orchestrator, RunSummary};
use aifmt_prompt::{CompletionClient, RemoteTransformer, TemplateEngine};

/// Arguments for `aifmt format`.
#[derive(Args, Debug)]
pub struct FormatArgs {
    /// Files or shell-style patterns (`src/*.go`) to rewrite.
    pub files: Vec<String>,

    /// Programming language of the files.
    #[arg(short, long)]
    pub language: Option<String>,

    /// Model to ask. Defaults to the config `model`, then to the built-in default.
    #[arg(short, long)]
    pub model: Option<String>,

    /// Send every resolved file along as read-only context.
    #[arg(short = 'w', long)]
    pub with_context: bool,

    /// Ask for comments in the configured comments language.
    #[arg(short, long)]
    pub comments: bool,

    /// Write proposed changes to report_<date>_<time>.json in the current directory.
    #[arg(short, long)]
    pub report: bool,

    /// Make one attempt per step instead of retrying.
    #[arg(short, long)]
    pub skip: bool,

    /// Process at most N files at a time.
    #[arg(long, value_name = "N")]
    pub jobs: Option<usize>,

    /// Rewrite the report after every file instead of once at the end.
    #[arg(long)]
    pub report_each: bool,

    /// Log at debug level unless RUST_LOG is set.
    #[arg(long)]
    pub verbose: bool,

    /// Emit logs as JSON lines on stderr.
    #[arg(long)]
    pub log_json: bool,
}

impl FormatArgs {
    pub fn run(self) -> Result<()> {
        init_tracing(self.verbose, self.log_json);

        let home = dirs::home_dir().context("could not determine home directory")?;
        let (config, origin) =
            config::load_or_init_at(&home).context("failed to load configuration")?;
        if let ConfigOrigin::Created { path } = &origin {
            println!("created default configuration at {}", path.display());
        }

        let settings = self.settings(&config);
        validate(&settings, &self.files)?;

        let transformer = build_transformer(&home, &config)?;
        let orchestrator = Orchestrator::new(settings, transformer);

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("failed to start tokio runtime")?;
        let summary = runtime.block_on(orchestrator.run(&self.files))?;

        if summary.is_empty() {
            bail!("no files matched: {}", self.files.join(" "));
        }

        print_changes(&orchestrator.settings().language, &summary);
        print_table(&summary);
        Ok(())
    }

    fn settings(&self, config: &Config) -> RunSettings {
        let model = self
            .model
            .clone()
            .or_else(|| config.model.clone())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let report_flush = if self.report_each {
            ReportFlush::EachFile
        } else {
            ReportFlush::AtEnd
        };

        RunSettings {
            language: self.language.clone().unwrap_or_default(),
            model,
            token: config.api_key.clone(),
            comments: self.comments,
            comments_language: config.comments_language.clone(),
            with_context: self.with_context,
            report: self.report,
            skip_retries: self.skip,
            max_retries: config.max_retry,
            max_concurrency: self.jobs,
            report_flush,
            ..RunSettings::default()
        }
    }
}

fn build_transformer(home: &Path, config: &Config) -> Result<Arc<RemoteTransformer>> {
    let templates = config::templates_dir_at(home);
    let engine = TemplateEngine::new(Some(templates.as_path()))
        .with_context(|| format!("failed to load prompt templates from {}", templates.display()))?;
    let client = match config.endpoint.as_deref() {
        Some(endpoint) => CompletionClient::new(endpoint),
        None => CompletionClient::openrouter(),
    };
    Ok(Arc::new(RemoteTransformer::new(
        Arc::new(client),
        Arc::new(engine),
    )))
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn print_changes(language: &str, summary: &RunSummary) {
    for outcome in &summary.outcomes {
        if outcome.changes.is_empty() || outcome.is_failed() {
            continue;
        }
        println!("{}", outcome.path.display().to_string().bold());
        for change in &outcome.changes {
            println!(
                "```{language}\n{}\n```\n{}\n",
                change.code_fragment, change.description
            );
        }
    }
}

#[derive(Tabled)]
struct OutcomeRow {
    #[tabled(rename = "file")]
    file: String,
    #[tabled(rename = "outcome")]
    outcome: String,
    #[tabled(rename = "changes")]
    changes: usize,
    #[tabled(rename = "detail")]
    detail: String,
}

fn print_table(summary: &RunSummary) {
    let rows: Vec<OutcomeRow> = summary
        .outcomes
        .iter()
        .map(|outcome| {
            let (label, detail) = match &outcome.status {
                FileStatus::Succeeded => ("updated", String::new()),
                FileStatus::Skipped => ("unchanged", String::new()),
                FileStatus::Failed(err) => ("failed", err.to_string()),
            };
            OutcomeRow {
                file: outcome.path.display().to_string(),
                outcome: label.to_string(),
                changes: outcome.changes.len(),
                detail,
            }
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");

    println!(
        "{} updated | {} unchanged | {} failed",
        summary.succeeded().to_string().green(),
        summary.skipped().to_string().bright_black(),
        summary.failed().to_string().red(),
    );

    if let Some(report) = &summary.report {
        match &report.error {
            None => println!(
                "report: {} ({} changes)",
                report.path.display(),
                report.records
            ),
            Some(err) => println!(
                "{} report {} was not written: {err}",
                "warning:".yellow(),
                report.path.display()
            ),
        }
    }
}

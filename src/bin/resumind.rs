//! CLI binary for resumind.
//!
//! A thin shim over the library crate: subcommands map flags onto
//! `PipelineConfig` or open the local stores directly, then print results.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use resumind::store::{LocalBlobStore, LocalRecordStore};
use resumind::{
    list_records, load_record, load_review, AnalysisOutcome, DocumentFile, Evaluation,
    IngestionRecord, PdfiumRasterizer, PipelineConfig, PipelineProgressCallback, PipelineStatus,
    ProgressCallback, Rasterizer, RecordId, ResumePipeline, StatusKind, Submission, TipKind,
};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner whose message follows the pipeline's status lines. Warnings and
/// failures are printed above the spinner so they stay in the scrollback.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        bar.set_style(style);
        bar.set_prefix("resumind");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl PipelineProgressCallback for CliProgressCallback {
    fn on_status(&self, status: &PipelineStatus) {
        match status.kind {
            StatusKind::Progress => {
                self.bar.println(format!("  {} {}", dim("·"), status.message));
                self.bar.set_message(status.message.clone());
            }
            StatusKind::Warning => {
                self.bar
                    .println(format!("  {} {}", yellow("⚠"), yellow(&status.message)));
            }
            StatusKind::Failed => {
                self.bar.finish_and_clear();
                eprintln!("{} {}", red("✘"), red(&status.message));
            }
            StatusKind::Completed => {
                self.bar.finish_and_clear();
                eprintln!("{} {}", green("✔"), bold(&status.message));
            }
        }
    }

    fn on_record_created(&self, id: &RecordId) {
        self.bar
            .println(format!("  {} record {}", dim("·"), dim(&id.key())));
    }
}

/// Same status lines without a spinner, for `--no-progress`.
struct PlainProgressCallback;

impl PipelineProgressCallback for PlainProgressCallback {
    fn on_status(&self, status: &PipelineStatus) {
        eprintln!("{status}");
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Analyse a résumé against a job posting
  resumind analyze cv.pdf --company Acme --job-title "Backend Engineer" \
      --job-description-file posting.txt

  # Render page 1 only (no API key needed)
  resumind preview cv.pdf -o cv.png

  # Look at earlier runs
  resumind list
  resumind show 4f0c6c2e-...
  resumind export 4f0c6c2e-... --out-dir ./review

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  RESUMIND_PROVIDER       Override provider (openai, anthropic, gemini, ollama)
  RESUMIND_MODEL          Override model ID
  RESUMIND_STORE_DIR      Where blobs and records are kept (default ./resumind-data)
  PDFIUM_LIB_PATH         Path to an existing libpdfium, skips auto-download
  RESUMIND_PDFIUM_CACHE   Override the pdfium cache directory

SETUP:
  PDFium (~30 MB) is downloaded on first use and cached. To use an existing
  copy: PDFIUM_LIB_PATH=/path/to/libpdfium resumind ...
"#;

/// Analyse résumés with Vision LLMs and keep the results.
#[derive(Parser, Debug)]
#[command(
    name = "resumind",
    version,
    about = "Résumé analysis with Vision LLMs: ATS score, tips, strengths and weaknesses",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Directory holding stored files and records.
    #[arg(long, global = true, env = "RESUMIND_STORE_DIR", default_value = "./resumind-data")]
    store_dir: PathBuf,

    /// Output JSON instead of human-readable text.
    #[arg(long, global = true, env = "RESUMIND_JSON")]
    json: bool,

    /// Disable the spinner.
    #[arg(long, global = true, env = "RESUMIND_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "RESUMIND_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and results.
    #[arg(short, long, global = true, env = "RESUMIND_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload, render, and review a résumé.
    Analyze(AnalyzeArgs),
    /// Render page 1 to a PNG without storing or reviewing anything.
    Preview(PreviewArgs),
    /// Print one stored record.
    Show {
        /// Record id (with or without the `resume:` prefix).
        id: String,
    },
    /// List every stored record.
    List,
    /// Write a record's document, preview image, and JSON to a directory.
    Export {
        id: String,
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// Résumé PDF.
    input: PathBuf,

    #[arg(long, default_value = "")]
    company: String,

    #[arg(long, default_value = "")]
    job_title: String,

    #[arg(long, default_value = "", conflicts_with = "job_description_file")]
    job_description: String,

    /// Read the job description from a file.
    #[arg(long)]
    job_description_file: Option<PathBuf>,

    /// LLM model ID (e.g. gpt-4.1-mini, gpt-4.1, claude-sonnet-4-20250514).
    #[arg(long, env = "RESUMIND_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "RESUMIND_PROVIDER")]
    provider: Option<String>,

    /// Path to a libpdfium shared library.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "RESUMIND_TEMPERATURE", default_value_t = 0.2)]
    temperature: f32,

    /// Max LLM output tokens.
    #[arg(long, env = "RESUMIND_MAX_TOKENS", default_value_t = 4096)]
    max_tokens: usize,

    /// Retries on LLM failure.
    #[arg(long, env = "RESUMIND_MAX_RETRIES", default_value_t = 2)]
    max_retries: u32,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "RESUMIND_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct PreviewArgs {
    input: PathBuf,

    /// Output PNG. Default: the input name with `.png`.
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner already narrates the run; keep library logs to errors
    // unless asked otherwise.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Analyze(ref args) => analyze(&cli, args, show_progress).await,
        Command::Preview(ref args) => preview(&cli, args).await,
        Command::Show { ref id } => show(&cli, id).await,
        Command::List => list(&cli).await,
        Command::Export {
            ref id,
            ref out_dir,
        } => export(&cli, id, out_dir).await,
    }
}

// ── Subcommands ──────────────────────────────────────────────────────────

async fn analyze(cli: &Cli, args: &AnalyzeArgs, show_progress: bool) -> Result<()> {
    let document = DocumentFile::from_path(&args.input)
        .await
        .with_context(|| format!("Failed to read {}", args.input.display()))?;

    let job_description = match args.job_description_file {
        Some(ref path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read job description from {:?}", path))?,
        None => args.job_description.clone(),
    };

    if !cli.quiet && args.pdfium_lib.is_none() && !pdfium_loader::is_available_offline() {
        eprintln!(
            "{}",
            dim("PDF engine not cached yet; it will be downloaded (~30 MB) on first use.")
        );
    }

    let progress: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as ProgressCallback)
    } else if !cli.quiet && !cli.json {
        Some(Arc::new(PlainProgressCallback))
    } else {
        None
    };

    let config = build_config(cli, args, progress).await?;
    let pipeline = ResumePipeline::from_config(&config).context("Failed to set up pipeline")?;

    let submission = Submission::new(
        args.company.clone(),
        args.job_title.clone(),
        job_description,
        document,
    );
    let outcome = pipeline.run(submission).await.context("Analysis failed")?;

    if cli.json {
        print_json(&outcome.record)?;
    } else {
        print_outcome(&outcome);
    }
    Ok(())
}

async fn preview(cli: &Cli, args: &PreviewArgs) -> Result<()> {
    let document = DocumentFile::from_path(&args.input)
        .await
        .with_context(|| format!("Failed to read {}", args.input.display()))?;

    let rasterizer = match args.pdfium_lib {
        Some(ref lib) => PdfiumRasterizer::with_library(lib.clone()),
        None => PdfiumRasterizer::new(),
    };
    let raster = rasterizer
        .rasterize(&document)
        .await
        .context("Failed to convert PDF to image")?;

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(&raster.file.name));
    tokio::fs::write(&output, &raster.file.bytes)
        .await
        .with_context(|| format!("Failed to write {}", output.display()))?;

    if !cli.quiet {
        eprintln!(
            "{} {}x{} px  ({:.0}x{:.0} pt page)  →  {}",
            green("✔"),
            raster.width,
            raster.height,
            raster.page_width_pts,
            raster.page_height_pts,
            bold(&output.display().to_string())
        );
    }
    Ok(())
}

async fn show(cli: &Cli, id: &str) -> Result<()> {
    let records = LocalRecordStore::new(&cli.store_dir);
    let id = parse_id(id);
    let record = load_record(&records, &id)
        .await
        .context("Failed to read record store")?;
    let Some(record) = record else {
        bail!("No record with id '{}'", id);
    };

    if cli.json {
        print_json(&record)
    } else {
        print_record(&record);
        Ok(())
    }
}

async fn list(cli: &Cli) -> Result<()> {
    let records = LocalRecordStore::new(&cli.store_dir);
    let all = list_records(&records)
        .await
        .context("Failed to read record store")?;

    if cli.json {
        return print_json(&all);
    }
    if all.is_empty() {
        eprintln!("{}", dim("No records yet."));
        return Ok(());
    }
    for record in &all {
        let score = match record.evaluation {
            Some(ref e) => format!("{:>3}", e.ats.score),
            None => dim("  -"),
        };
        println!(
            "{}  {}  {} @ {}",
            record.id,
            score,
            or_dash(&record.job_title),
            or_dash(&record.company_name)
        );
    }
    Ok(())
}

async fn export(cli: &Cli, id: &str, out_dir: &Path) -> Result<()> {
    let blobs = LocalBlobStore::new(&cli.store_dir);
    let records = LocalRecordStore::new(&cli.store_dir);
    let id = parse_id(id);
    let bundle = load_review(&blobs, &records, &id)
        .await
        .with_context(|| format!("Failed to load record '{}'", id))?;

    tokio::fs::create_dir_all(out_dir)
        .await
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;

    let files = [
        (blob_name(&bundle.record.document_path, "resume.pdf"), bundle.document.as_slice()),
        (blob_name(&bundle.record.image_path, "resume.png"), bundle.image.as_slice()),
    ];
    let record_json =
        serde_json::to_vec_pretty(&bundle.record).context("Failed to serialise record")?;

    for (name, bytes) in files
        .iter()
        .map(|(n, b)| (n.as_str(), *b))
        .chain(std::iter::once(("record.json", record_json.as_slice())))
    {
        let path = out_dir.join(name);
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        if !cli.quiet {
            eprintln!("  {} {}", green("✓"), path.display());
        }
    }
    Ok(())
}

// ── Helpers ──────────────────────────────────────────────────────────────

/// Map CLI args to `PipelineConfig`.
async fn build_config(
    cli: &Cli,
    args: &AnalyzeArgs,
    progress: Option<ProgressCallback>,
) -> Result<PipelineConfig> {
    let mut builder = PipelineConfig::builder()
        .store_dir(&cli.store_dir)
        .temperature(args.temperature)
        .max_tokens(args.max_tokens)
        .max_retries(args.max_retries);

    if let Some(ref path) = args.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }
    if let Some(ref model) = args.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = args.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref lib) = args.pdfium_lib {
        builder = builder.pdfium_library(lib);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn parse_id(raw: &str) -> RecordId {
    RecordId::from_key(raw).unwrap_or_else(|| RecordId::from(raw))
}

fn blob_name(path: &str, fallback: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| fallback.to_string())
}

fn or_dash(s: &str) -> &str {
    if s.trim().is_empty() {
        "-"
    } else {
        s
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialise output")?;
    println!("{json}");
    Ok(())
}

fn print_outcome(outcome: &AnalysisOutcome) {
    print_record(&outcome.record);
    if let Some(ref why) = outcome.analysis_failure {
        eprintln!("{} {}", yellow("analysis failed:"), dim(why));
    }
}

fn print_record(record: &IngestionRecord) {
    println!("{}      {}", bold("Record"), record.id);
    println!("{}     {}", bold("Company"), or_dash(&record.company_name));
    println!("{}   {}", bold("Job title"), or_dash(&record.job_title));
    println!("{}    {}", bold("Document"), record.document_path);
    println!("{}       {}", bold("Image"), record.image_path);
    match record.evaluation {
        Some(ref evaluation) => print_evaluation(evaluation),
        None => println!("\n{}", dim("No result available.")),
    }
}

fn print_evaluation(evaluation: &Evaluation) {
    println!();
    if let Some(score) = evaluation.overall_score {
        println!("{}     {}/100", bold("Overall"), score);
    }
    println!("{}   {}/100", bold("ATS score"), evaluation.ats.score);
    if let Some(ref summary) = evaluation.summary {
        println!("\n{summary}");
    }
    if !evaluation.ats.tips.is_empty() {
        println!("\n{}", bold("ATS tips"));
        for tip in &evaluation.ats.tips {
            let mark = match tip.kind {
                TipKind::Good => green("✓"),
                TipKind::Warn => yellow("!"),
            };
            println!("  {mark} {}", tip.text);
        }
    }
    for (title, items) in [
        ("Strengths", &evaluation.strengths),
        ("Weaknesses", &evaluation.weaknesses),
    ] {
        if !items.is_empty() {
            println!("\n{}", bold(title));
            for item in items {
                println!("  - {item}");
            }
        }
    }
    if let Some(ref details) = evaluation.details {
        println!("\n{details}");
    }
}

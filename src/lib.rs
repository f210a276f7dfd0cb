//! # resumind
//!
//! Résumé ingestion and analysis: store a PDF, rasterise its first page,
//! persist a record, and ask a Vision Language Model for an ATS-style review.
//!
//! ## Why rasterise?
//!
//! Résumés are layout-heavy: two columns, sidebars, icons, skill bars. Text
//! extraction scrambles reading order, and the reviewer needs to judge the
//! layout itself ("avoid tables", "header is hard to parse"). A 4× render of
//! page 1 gives the model what a recruiter sees, and doubles as the preview
//! image shown next to the review.
//!
//! ## Pipeline Overview
//!
//! ```text
//! Submission { company, job title, job description, PDF }
//!  │
//!  ├─ 1. Upload     original PDF → blob store
//!  ├─ 2. Convert    page 1 → PNG via pdfium (CPU-bound, spawn_blocking)
//!  ├─ 3. Upload     PNG → blob store
//!  ├─ 4. Prepare    fresh id, record with empty evaluation
//!  ├─ 5. Persist    resume:<id> → record store
//!  ├─ 6. Analyze    VLM(image, instructions) → Evaluation   (non-fatal)
//!  ├─ 7. Persist    resume:<id> → record store, again
//!  └─ 8. Done       id handed back for the result view
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use resumind::{DocumentFile, PipelineConfig, ResumePipeline, Submission};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY
//!     let config = PipelineConfig::default();
//!     let pipeline = ResumePipeline::from_config(&config)?;
//!
//!     let document = DocumentFile::from_path(Path::new("cv.pdf")).await?;
//!     let outcome = pipeline
//!         .run(Submission::new("Acme", "Backend Engineer", "Rust, Postgres", document))
//!         .await?;
//!
//!     println!("record {}", outcome.key);
//!     if let Some(evaluation) = outcome.evaluation() {
//!         println!("ATS score: {}", evaluation.ats.score);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `resumind` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! resumind = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analyze;
pub mod config;
pub mod error;
pub mod library;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod record;
pub mod store;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analyze::{resolve_provider, AnalysisOutcome, ResumePipeline, Submission};
pub use config::{PipelineConfig, PipelineConfigBuilder};
pub use error::{AnalysisError, ConvertError, PipelineError, StoreError};
pub use library::{list_records, load_record, load_review, ReviewBundle};
pub use pipeline::engine::engine_init_count;
pub use pipeline::llm::{AnalysisClient, VisionAnalysisClient};
pub use pipeline::render::{PdfiumRasterizer, RasterImage, Rasterizer, RENDER_SCALE};
pub use pipeline::reply::{AnalysisReply, ReplyContent, ReplyPart};
pub use progress::{
    NoopProgressCallback, PipelineProgressCallback, PipelineStatus, ProgressCallback, Stage,
    StatusKind,
};
pub use record::{
    AtsReport, AtsTip, DocumentFile, Evaluation, IngestionRecord, RecordId, TipKind,
    RECORD_PATTERN, RECORD_PREFIX,
};
pub use store::{BlobStore, KvEntry, RecordStore, UploadedBlob};
pub use stream::{analyze_stream, PipelineEvent, StatusStream};

//! The ingestion-and-analysis pipeline.
//!
//! ```text
//! Submission
//!  │
//!  ├─ 1. UploadingDocument   blob store ← original PDF
//!  ├─ 2. ConvertingToImage   rasterizer: page 1 at 4× → PNG
//!  ├─ 3. UploadingImage      blob store ← PNG
//!  ├─ 4. PreparingRecord     fresh id, evaluation empty
//!  ├─ 5. PersistingInitial   record store: resume:<id>   (record now observable)
//!  ├─ 6. Analyzing           reviewer(image, instructions) → Evaluation
//!  ├─ 7. PersistingFinal     record store: resume:<id>   (same key, same id)
//!  └─ 8. Done
//! ```
//!
//! Stages 1–5 and 7 are fatal on failure: the run stops with a terminal
//! status and a [`PipelineError`]. Stage 6 is not. A failed or unusable
//! review leaves the evaluation empty, emits a warning status, and the run
//! carries on to stage 7. Nothing is rolled back; a document uploaded before
//! a conversion failure stays in the blob store.

use crate::config::PipelineConfig;
use crate::error::{AnalysisError, PipelineError, StoreError};
use crate::pipeline::llm::{AnalysisClient, VisionAnalysisClient};
use crate::pipeline::render::{PdfiumRasterizer, Rasterizer};
use crate::pipeline::reply::evaluation_from_reply;
use crate::progress::{
    NoopProgressCallback, PipelineProgressCallback, PipelineStatus, ProgressCallback, Stage,
};
use crate::prompts::prepare_instructions;
use crate::record::{DocumentFile, Evaluation, IngestionRecord, RecordId};
use crate::store::{BlobStore, LocalBlobStore, LocalRecordStore, RecordStore};
use edgequake_llm::{LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Caller input for one run.
#[derive(Debug, Clone)]
pub struct Submission {
    pub company_name: String,
    pub job_title: String,
    pub job_description: String,
    pub document: DocumentFile,
}

impl Submission {
    pub fn new(
        company_name: impl Into<String>,
        job_title: impl Into<String>,
        job_description: impl Into<String>,
        document: DocumentFile,
    ) -> Self {
        Self {
            company_name: company_name.into(),
            job_title: job_title.into(),
            job_description: job_description.into(),
            document,
        }
    }
}

/// Result of a run that reached `Done`.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOutcome {
    pub id: RecordId,
    /// Store key, `resume:<id>`.
    pub key: String,
    /// The record as last persisted.
    pub record: IngestionRecord,
    /// Why the evaluation is empty, when analysis failed.
    pub analysis_failure: Option<String>,
}

impl AnalysisOutcome {
    pub fn evaluation(&self) -> Option<&Evaluation> {
        self.record.evaluation.as_ref()
    }
}

/// Sequences the collaborators for each submission.
///
/// Cheap to share: wrap it in an `Arc` and call [`ResumePipeline::run`] from
/// as many tasks as needed. Each run allocates its own id, so runs never
/// touch each other's records.
pub struct ResumePipeline {
    blobs: Arc<dyn BlobStore>,
    records: Arc<dyn RecordStore>,
    rasterizer: Arc<dyn Rasterizer>,
    analyst: Arc<dyn AnalysisClient>,
    progress: ProgressCallback,
}

impl ResumePipeline {
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        records: Arc<dyn RecordStore>,
        rasterizer: Arc<dyn Rasterizer>,
        analyst: Arc<dyn AnalysisClient>,
    ) -> Self {
        Self {
            blobs,
            records,
            rasterizer,
            analyst,
            progress: Arc::new(NoopProgressCallback),
        }
    }

    /// Callback used by [`ResumePipeline::run`].
    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = progress;
        self
    }

    /// Default wiring: local stores under `store_dir`, the PDFium rasterizer,
    /// and a vision reviewer from the resolved LLM provider.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, PipelineError> {
        let provider = resolve_provider(config)?;
        info!(
            "Reviewer: provider {}, model {}",
            config.provider_name.as_deref().unwrap_or("auto"),
            config.model_or_default()
        );

        let blobs: Arc<dyn BlobStore> = Arc::new(LocalBlobStore::new(&config.store_dir));
        let records: Arc<dyn RecordStore> = Arc::new(LocalRecordStore::new(&config.store_dir));
        let rasterizer: Arc<dyn Rasterizer> = Arc::new(match config.pdfium_library {
            Some(ref path) => PdfiumRasterizer::with_library(path.clone()),
            None => PdfiumRasterizer::new(),
        });
        let analyst: Arc<dyn AnalysisClient> = Arc::new(VisionAnalysisClient::from_config(
            provider,
            Arc::clone(&blobs),
            config,
        ));

        let pipeline = Self::new(blobs, records, rasterizer, analyst);
        Ok(match config.progress_callback {
            Some(ref cb) => pipeline.with_progress(Arc::clone(cb)),
            None => pipeline,
        })
    }

    pub fn blobs(&self) -> &Arc<dyn BlobStore> {
        &self.blobs
    }

    pub fn records(&self) -> &Arc<dyn RecordStore> {
        &self.records
    }

    pub fn rasterizer(&self) -> &Arc<dyn Rasterizer> {
        &self.rasterizer
    }

    /// Run one submission, reporting to the pipeline's own callback.
    pub async fn run(&self, submission: Submission) -> Result<AnalysisOutcome, PipelineError> {
        let progress = Arc::clone(&self.progress);
        self.run_with(submission, progress.as_ref()).await
    }

    /// Run one submission, reporting to `progress`.
    pub async fn run_with(
        &self,
        submission: Submission,
        progress: &dyn PipelineProgressCallback,
    ) -> Result<AnalysisOutcome, PipelineError> {
        let start = Instant::now();
        let Submission {
            company_name,
            job_title,
            job_description,
            document,
        } = submission;

        // ── 1. Upload the original ───────────────────────────────────────
        announce(progress, Stage::UploadingDocument);
        let uploaded_document = self
            .blobs
            .upload(&document)
            .await
            .map_err(|e| halt(progress, PipelineError::DocumentUpload(e)))?;
        debug!(
            "Document '{}' stored at {} ({} bytes)",
            document.name, uploaded_document.path, uploaded_document.size
        );

        // ── 2. Rasterise page 1 ──────────────────────────────────────────
        announce(progress, Stage::ConvertingToImage);
        let raster = self
            .rasterizer
            .rasterize(&document)
            .await
            .map_err(|e| halt(progress, PipelineError::Conversion(e)))?;
        debug!("Preview written to {}", raster.image_ref().display());

        // ── 3. Upload the image ──────────────────────────────────────────
        announce(progress, Stage::UploadingImage);
        let uploaded_image = self
            .blobs
            .upload(&raster.file)
            .await
            .map_err(|e| halt(progress, PipelineError::ImageUpload(e)))?;
        drop(raster);

        // ── 4. Assemble the record ───────────────────────────────────────
        announce(progress, Stage::PreparingRecord);
        let id = RecordId::generate();
        let key = id.key();
        let mut record = IngestionRecord {
            id: id.clone(),
            document_path: uploaded_document.path,
            image_path: uploaded_image.path,
            company_name,
            job_title,
            job_description,
            evaluation: None,
        };

        // ── 5. First write ───────────────────────────────────────────────
        announce(progress, Stage::PersistingInitial);
        self.persist(&key, &record)
            .await
            .map_err(|source| {
                halt(
                    progress,
                    PipelineError::PersistInitial {
                        key: key.clone(),
                        source,
                    },
                )
            })?;
        info!("Record {} created", key);
        progress.on_record_created(&id);

        // ── 6. Review (non-fatal) ────────────────────────────────────────
        announce(progress, Stage::Analyzing);
        let analysis_failure = match self.review(&record).await {
            Ok(evaluation) => {
                info!("Record {}: ATS score {}", key, evaluation.ats.score);
                record.evaluation = Some(evaluation);
                None
            }
            Err(e) => {
                warn!("Record {}: analysis failed: {}", key, e);
                emit(progress, PipelineStatus::warning(Stage::Analyzing));
                Some(e.to_string())
            }
        };

        // ── 7. Second write, same key ────────────────────────────────────
        announce(progress, Stage::PersistingFinal);
        self.persist(&key, &record)
            .await
            .map_err(|source| {
                halt(
                    progress,
                    PipelineError::PersistFinal {
                        key: key.clone(),
                        source,
                    },
                )
            })?;

        // ── 8. Done ──────────────────────────────────────────────────────
        emit(progress, PipelineStatus::completed());
        info!("Record {} finished in {:?}", key, start.elapsed());

        let outcome = AnalysisOutcome {
            id,
            key,
            record,
            analysis_failure,
        };
        progress.on_complete(&outcome);
        Ok(outcome)
    }

    async fn persist(
        &self,
        key: &str,
        record: &IngestionRecord,
    ) -> Result<(), StoreError> {
        let json = record
            .to_json()
            .map_err(|e| StoreError::Backend(format!("encode record: {e}")))?;
        self.records.set(key, &json).await
    }

    async fn review(&self, record: &IngestionRecord) -> Result<Evaluation, AnalysisError> {
        let instructions = prepare_instructions(&record.job_title, &record.job_description);
        let reply = self
            .analyst
            .feedback(&record.image_path, &instructions)
            .await?
            .ok_or(AnalysisError::NoReply)?;
        evaluation_from_reply(&reply)
    }
}

fn emit(progress: &dyn PipelineProgressCallback, status: PipelineStatus) {
    debug!("Status [{}]: {}", status.stage, status.message);
    progress.on_status(&status);
}

fn announce(progress: &dyn PipelineProgressCallback, stage: Stage) {
    info!("Stage: {}", stage);
    emit(progress, PipelineStatus::started(stage));
}

/// Emit the terminal status for a fatal error and hand the error back.
fn halt(progress: &dyn PipelineProgressCallback, err: PipelineError) -> PipelineError {
    error!("{}", err);
    if let Some(stage) = err.stage() {
        emit(progress, PipelineStatus::failed(stage));
    }
    err
}

// ── Provider resolution ──────────────────────────────────────────────────

fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, PipelineError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        PipelineError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the reviewer's LLM provider, most specific first:
///
/// 1. `config.provider`, used as-is.
/// 2. `config.provider_name` with `config.model`.
/// 3. `RESUMIND_PROVIDER` + `RESUMIND_MODEL`, when both are set.
/// 4. OpenAI when `OPENAI_API_KEY` is set.
/// 5. Whatever [`ProviderFactory::from_env`] detects.
pub fn resolve_provider(config: &PipelineConfig) -> Result<Arc<dyn LLMProvider>, PipelineError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        return create_vision_provider(name, config.model_or_default());
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("RESUMIND_PROVIDER"),
        std::env::var("RESUMIND_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_vision_provider(&prov, &model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            return create_vision_provider("openai", config.model_or_default());
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| PipelineError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

//! Error types for the resumind library.
//!
//! Failures split along the pipeline's own fault lines:
//!
//! * [`PipelineError`]: **Fatal** to a run: upload, conversion, or
//!   persistence failed and the pipeline stopped. Returned as `Err` from
//!   [`crate::analyze::ResumePipeline::run`].
//!
//! * [`AnalysisError`]: **Non-fatal**: the remote reviewer failed or replied
//!   with something unusable. The run still persists its record with an empty
//!   evaluation; the error is only reported through the status stream and
//!   [`crate::analyze::AnalysisOutcome::analysis_failure`].
//!
//! * [`ConvertError`] and [`StoreError`] are the stage-local causes wrapped by
//!   `PipelineError`.

use crate::progress::Stage;
use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors returned by the pipeline entry points.
#[derive(Debug, Error)]
pub enum PipelineError {
    // ── Stage failures ────────────────────────────────────────────────────
    #[error("Failed to upload file: {0}")]
    DocumentUpload(#[source] StoreError),

    #[error("Failed to convert PDF to image: {0}")]
    Conversion(#[source] ConvertError),

    #[error("Failed to upload image: {0}")]
    ImageUpload(#[source] StoreError),

    /// The first write of the record failed; nothing is observable in the store.
    #[error("Failed to save record '{key}': {source}")]
    PersistInitial {
        key: String,
        #[source]
        source: StoreError,
    },

    /// The final write failed; the initial record (empty evaluation) remains.
    #[error("Failed to save analysis for '{key}': {source}")]
    PersistFinal {
        key: String,
        #[source]
        source: StoreError,
    },

    // ── Setup errors ──────────────────────────────────────────────────────
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    /// The stage that failed, for stage-level failures.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            PipelineError::DocumentUpload(_) => Some(Stage::UploadingDocument),
            PipelineError::Conversion(_) => Some(Stage::ConvertingToImage),
            PipelineError::ImageUpload(_) => Some(Stage::UploadingImage),
            PipelineError::PersistInitial { .. } => Some(Stage::PersistingInitial),
            PipelineError::PersistFinal { .. } => Some(Stage::PersistingFinal),
            _ => None,
        }
    }
}

/// Why page 1 could not be turned into a PNG.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConvertError {
    #[error(
        "PDF engine unavailable: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy."
    )]
    EngineUnavailable(String),

    #[error("Document is not a readable PDF: {0}")]
    NotADocument(String),

    #[error("Document has no pages")]
    EmptyDocument,

    #[error("Failed to render page 1: {0}")]
    RenderFailed(String),

    #[error("Failed to encode PNG: {0}")]
    EncodeFailed(String),

    #[error("Failed to write preview image: {0}")]
    PreviewUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failures reported by blob and record store adapters.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Not found: '{0}'")]
    NotFound(String),

    #[error("Refusing path outside the store: '{0}'")]
    InvalidPath(String),

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt store data: {0}")]
    Corrupt(String),

    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Non-fatal analysis failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("Reviewer returned no reply")]
    NoReply,

    #[error("Reviewer call failed after {retries} retries: {detail}")]
    CallFailed { retries: u32, detail: String },

    #[error("Could not read image '{path}': {detail}")]
    ImageUnavailable { path: String, detail: String },

    #[error("Reply has no recognisable text content")]
    UnrecognizedReply,

    #[error("Reply is not a valid evaluation: {0}")]
    MalformedEvaluation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_failures_know_their_stage() {
        let e = PipelineError::DocumentUpload(StoreError::Backend("quota".into()));
        assert_eq!(e.stage(), Some(Stage::UploadingDocument));
        let e = PipelineError::Conversion(ConvertError::EmptyDocument);
        assert_eq!(e.stage(), Some(Stage::ConvertingToImage));
        assert_eq!(PipelineError::InvalidConfig("x".into()).stage(), None);
    }

    #[test]
    fn persist_display_names_key() {
        let e = PipelineError::PersistInitial {
            key: "resume:abc".into(),
            source: StoreError::Backend("down".into()),
        };
        let msg = e.to_string();
        assert!(msg.contains("resume:abc"), "got: {msg}");
        assert!(msg.contains("down"), "got: {msg}");
    }

    #[test]
    fn conversion_display_keeps_cause() {
        let e = PipelineError::Conversion(ConvertError::NotADocument("bad xref".into()));
        assert!(e.to_string().contains("bad xref"));
    }

    #[test]
    fn call_failed_display() {
        let e = AnalysisError::CallFailed {
            retries: 2,
            detail: "503".into(),
        };
        assert!(e.to_string().contains("2 retries"));
        assert!(e.to_string().contains("503"));
    }
}

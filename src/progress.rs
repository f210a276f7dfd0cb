//! Pipeline stages, status messages, and the progress-callback trait.
//!
//! Every stage transition produces a [`PipelineStatus`] whose `message` is a
//! short human-readable line for a progress indicator. Hosts receive them by
//! implementing [`PipelineProgressCallback`] or by consuming
//! [`crate::stream::analyze_stream`].
//!
//! # Example
//!
//! ```rust
//! use resumind::{PipelineProgressCallback, PipelineStatus};
//! use std::sync::Mutex;
//!
//! #[derive(Default)]
//! struct Collect(Mutex<Vec<String>>);
//!
//! impl PipelineProgressCallback for Collect {
//!     fn on_status(&self, status: &PipelineStatus) {
//!         self.0.lock().unwrap().push(status.to_string());
//!     }
//! }
//! ```

use crate::analyze::AnalysisOutcome;
use crate::record::RecordId;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// One step of the linear pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    UploadingDocument,
    ConvertingToImage,
    UploadingImage,
    PreparingRecord,
    PersistingInitial,
    Analyzing,
    PersistingFinal,
    Done,
}

impl Stage {
    /// Progress line announced when the stage starts.
    pub fn start_message(self) -> &'static str {
        match self {
            Stage::UploadingDocument => "Uploading the file...",
            Stage::ConvertingToImage => "Converting to image...",
            Stage::UploadingImage => "Uploading the image...",
            Stage::PreparingRecord => "Preparing data...",
            Stage::PersistingInitial => "Saving record...",
            Stage::Analyzing => "Analyzing...",
            Stage::PersistingFinal => "Saving analysis...",
            Stage::Done => "Analysis complete",
        }
    }

    /// Terminal line when the stage fails.
    pub fn failure_message(self) -> &'static str {
        match self {
            Stage::UploadingDocument => "Error: Failed to upload file",
            Stage::ConvertingToImage => "Error: Failed to convert PDF to image",
            Stage::UploadingImage => "Error: Failed to upload image",
            Stage::PersistingInitial | Stage::PersistingFinal => "Error: Failed to save record",
            Stage::Analyzing => "Failed to analyze resume",
            Stage::PreparingRecord | Stage::Done => "Error: Internal failure",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::UploadingDocument => "uploading document",
            Stage::ConvertingToImage => "converting to image",
            Stage::UploadingImage => "uploading image",
            Stage::PreparingRecord => "preparing record",
            Stage::PersistingInitial => "persisting initial record",
            Stage::Analyzing => "analyzing",
            Stage::PersistingFinal => "persisting final record",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    /// A stage started.
    Progress,
    /// Something failed but the run continues.
    Warning,
    /// The run stopped.
    Failed,
    /// The run finished.
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineStatus {
    pub stage: Stage,
    pub kind: StatusKind,
    pub message: String,
}

impl PipelineStatus {
    pub fn started(stage: Stage) -> Self {
        Self {
            stage,
            kind: StatusKind::Progress,
            message: stage.start_message().to_string(),
        }
    }

    pub fn warning(stage: Stage) -> Self {
        Self {
            stage,
            kind: StatusKind::Warning,
            message: stage.failure_message().to_string(),
        }
    }

    pub fn failed(stage: Stage) -> Self {
        Self {
            stage,
            kind: StatusKind::Failed,
            message: stage.failure_message().to_string(),
        }
    }

    pub fn completed() -> Self {
        Self {
            stage: Stage::Done,
            kind: StatusKind::Completed,
            message: Stage::Done.start_message().to_string(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, StatusKind::Failed | StatusKind::Completed)
    }
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Receives pipeline events. All methods default to no-ops.
///
/// Calls arrive in stage order from the task driving the run; the trait is
/// `Send + Sync` so one callback can be shared by runs on different tasks.
pub trait PipelineProgressCallback: Send + Sync {
    /// Every status line, in order.
    fn on_status(&self, status: &PipelineStatus) {
        let _ = status;
    }

    /// The initial record has been written and is now observable.
    fn on_record_created(&self, id: &RecordId) {
        let _ = id;
    }

    /// The run reached `Done`.
    fn on_complete(&self, outcome: &AnalysisOutcome) {
        let _ = outcome;
    }
}

/// Default callback.
pub struct NoopProgressCallback;

impl PipelineProgressCallback for NoopProgressCallback {}

/// Type stored in [`crate::config::PipelineConfig`].
pub type ProgressCallback = Arc<dyn PipelineProgressCallback>;

//! Streaming API: status lines as they happen, then the outcome.
//!
//! [`crate::analyze::ResumePipeline::run`] reports through a callback and
//! returns at the end. [`analyze_stream`] turns the same run into a `Stream`
//! a UI can poll: every [`PipelineStatus`] in stage order, followed by
//! exactly one [`PipelineEvent::Finished`].
//!
//! The run is spawned on the current tokio runtime and keeps going if the
//! stream is dropped early; only the events are lost.

use crate::analyze::{AnalysisOutcome, ResumePipeline, Submission};
use crate::error::PipelineError;
use crate::progress::{PipelineProgressCallback, PipelineStatus};
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::Stream;
use tracing::debug;

#[derive(Debug)]
pub enum PipelineEvent {
    Status(PipelineStatus),
    Finished(Result<AnalysisOutcome, PipelineError>),
}

impl PipelineEvent {
    pub fn status(&self) -> Option<&PipelineStatus> {
        match self {
            PipelineEvent::Status(s) => Some(s),
            PipelineEvent::Finished(_) => None,
        }
    }
}

/// A boxed stream of pipeline events.
pub type StatusStream = Pin<Box<dyn Stream<Item = PipelineEvent> + Send>>;

struct ChannelProgress {
    tx: UnboundedSender<PipelineEvent>,
}

impl PipelineProgressCallback for ChannelProgress {
    fn on_status(&self, status: &PipelineStatus) {
        // Receiver gone means nobody is watching; the run continues.
        let _ = self.tx.send(PipelineEvent::Status(status.clone()));
    }
}

/// Start a run and stream its events.
///
/// Must be called from within a tokio runtime. The pipeline's own progress
/// callback is not invoked for this run; the stream replaces it.
pub fn analyze_stream(pipeline: Arc<ResumePipeline>, submission: Submission) -> StatusStream {
    let (tx, rx) = unbounded_channel();
    let progress = ChannelProgress { tx: tx.clone() };

    tokio::spawn(async move {
        let result = pipeline.run_with(submission, &progress).await;
        debug!("Streamed run finished (ok = {})", result.is_ok());
        let _ = tx.send(PipelineEvent::Finished(result));
    });

    Box::pin(UnboundedReceiverStream::new(rx))
}

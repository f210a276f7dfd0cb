//! Reviewer interaction: send the page image plus instructions to a VLM.
//!
//! [`AnalysisClient`] is the seam the orchestrator calls. The production
//! implementation, [`VisionAnalysisClient`], reads the stored PNG back from
//! the blob store, attaches it to a chat request, and wraps the model's
//! answer as a text reply. Prompt wording lives in [`crate::prompts`].
//!
//! ## Retry Strategy
//!
//! HTTP 429 / 503 from LLM APIs are usually transient. The client retries the
//! call with exponential backoff (`retry_backoff_ms * 2^(retry - 1)`) before
//! giving up. This is internal to the client; the pipeline itself never
//! retries a stage.

use crate::config::PipelineConfig;
use crate::error::AnalysisError;
use crate::pipeline::encode::image_attachment;
use crate::pipeline::reply::AnalysisReply;
use crate::prompts::SYSTEM_PROMPT;
use crate::store::BlobStore;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

/// Remote reviewer contract.
///
/// `Ok(None)` means the reviewer produced nothing; `Err` means the call
/// itself failed. The orchestrator treats both as a non-fatal analysis
/// failure.
#[async_trait]
pub trait AnalysisClient: Send + Sync {
    async fn feedback(
        &self,
        image_path: &str,
        instructions: &str,
    ) -> Result<Option<AnalysisReply>, AnalysisError>;
}

/// [`AnalysisClient`] over an `edgequake-llm` vision provider.
pub struct VisionAnalysisClient {
    provider: Arc<dyn LLMProvider>,
    blobs: Arc<dyn BlobStore>,
    system_prompt: String,
    temperature: f32,
    max_tokens: usize,
    max_retries: u32,
    retry_backoff_ms: u64,
}

impl VisionAnalysisClient {
    pub fn new(provider: Arc<dyn LLMProvider>, blobs: Arc<dyn BlobStore>) -> Self {
        Self::from_config(provider, blobs, &PipelineConfig::default())
    }

    pub fn from_config(
        provider: Arc<dyn LLMProvider>,
        blobs: Arc<dyn BlobStore>,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            provider,
            blobs,
            system_prompt: config
                .system_prompt
                .clone()
                .unwrap_or_else(|| SYSTEM_PROMPT.to_string()),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_retries: config.max_retries,
            retry_backoff_ms: config.retry_backoff_ms,
        }
    }

    fn options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        }
    }
}

#[async_trait]
impl AnalysisClient for VisionAnalysisClient {
    async fn feedback(
        &self,
        image_path: &str,
        instructions: &str,
    ) -> Result<Option<AnalysisReply>, AnalysisError> {
        let png = self
            .blobs
            .read(image_path)
            .await
            .map_err(|e| AnalysisError::ImageUnavailable {
                path: image_path.to_string(),
                detail: e.to_string(),
            })?;

        let messages = vec![
            ChatMessage::system(self.system_prompt.as_str()),
            ChatMessage::user_with_images(instructions, vec![image_attachment(&png)]),
        ];
        let options = self.options();
        let start = Instant::now();
        let mut last_err: Option<String> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = backoff_ms(self.retry_backoff_ms, attempt);
                warn!(
                    "Analysis: retry {}/{} after {}ms",
                    attempt, self.max_retries, backoff
                );
                sleep(Duration::from_millis(backoff)).await;
            }

            match self.provider.chat(&messages, Some(&options)).await {
                Ok(response) => {
                    debug!(
                        "Analysis: {} input tokens, {} output tokens, {:?}",
                        response.prompt_tokens,
                        response.completion_tokens,
                        start.elapsed()
                    );
                    if response.content.trim().is_empty() {
                        return Ok(None);
                    }
                    return Ok(Some(AnalysisReply::text(response.content)));
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    warn!("Analysis: attempt {} failed: {}", attempt + 1, err_msg);
                    last_err = Some(err_msg);
                }
            }
        }

        Err(AnalysisError::CallFailed {
            retries: self.max_retries,
            detail: last_err.unwrap_or_else(|| "Unknown error".to_string()),
        })
    }
}

/// Delay before retry number `attempt` (1-based); saturates instead of overflowing.
fn backoff_ms(base: u64, attempt: u32) -> u64 {
    base.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)))
}

//! Configuration for the résumé pipeline.
//!
//! Everything a caller can tune lives in [`PipelineConfig`], built through
//! [`PipelineConfigBuilder`]. The config only describes *how* to assemble the
//! default collaborators; hosts that bring their own stores or reviewer wire
//! them directly with [`crate::analyze::ResumePipeline::new`].

use crate::error::PipelineError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Model used when nothing more specific is configured.
pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";

/// Configuration for a [`crate::analyze::ResumePipeline`].
///
/// # Example
/// ```rust
/// use resumind::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .store_dir("/tmp/resumind")
///     .model("gpt-4.1")
///     .max_retries(1)
///     .build()
///     .unwrap();
/// assert_eq!(config.model.as_deref(), Some("gpt-4.1"));
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// Root directory of the local blob and record stores. Default: `./resumind-data`.
    pub store_dir: PathBuf,

    /// Explicit pdfium shared library. If None, `pdfium-loader` searches
    /// `PDFIUM_LIB_PATH`, its cache, then downloads.
    pub pdfium_library: Option<PathBuf>,

    /// LLM model identifier, e.g. "gpt-4.1-mini", "claude-sonnet-4-20250514".
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.2.
    ///
    /// Scores should be stable across re-runs of the same résumé; a little
    /// temperature keeps the wording of tips from being repetitive.
    pub temperature: f32,

    /// Maximum tokens the reviewer may generate. Default: 4096.
    pub max_tokens: usize,

    /// Retry attempts on a failed reviewer call. Default: 2.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Custom system prompt. If None, uses [`crate::prompts::SYSTEM_PROMPT`].
    pub system_prompt: Option<String>,

    /// Receives status updates from every run of a pipeline built from this config.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            store_dir: PathBuf::from("./resumind-data"),
            pdfium_library: None,
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.2,
            max_tokens: 4096,
            max_retries: 2,
            retry_backoff_ms: 500,
            system_prompt: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("store_dir", &self.store_dir)
            .field("pdfium_library", &self.pdfium_library)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("system_prompt", &self.system_prompt.as_ref().map(|p| p.len()))
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn PipelineProgressCallback>"),
            )
            .finish()
    }
}

impl PipelineConfig {
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }

    /// The model to request, falling back to [`DEFAULT_MODEL`].
    pub fn model_or_default(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn store_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.store_dir = dir.into();
        self
    }

    pub fn pdfium_library(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library = Some(path.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, PipelineError> {
        let c = &self.config;
        if c.store_dir.as_os_str().is_empty() {
            return Err(PipelineError::InvalidConfig(
                "store_dir must not be empty".into(),
            ));
        }
        if c.max_tokens == 0 {
            return Err(PipelineError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if c.max_retries > 10 {
            return Err(PipelineError::InvalidConfig(format!(
                "max_retries must be 0–10, got {}",
                c.max_retries
            )));
        }
        if let Some(ref prompt) = c.system_prompt {
            if prompt.trim().is_empty() {
                return Err(PipelineError::InvalidConfig(
                    "system_prompt must not be blank".into(),
                ));
            }
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoopProgressCallback;

    #[test]
    fn defaults() {
        let c = PipelineConfig::default();
        assert_eq!(c.store_dir, PathBuf::from("./resumind-data"));
        assert_eq!(c.model_or_default(), DEFAULT_MODEL);
        assert_eq!(c.max_retries, 2);
        assert_eq!(c.retry_backoff_ms, 500);
        assert!(c.provider.is_none());
    }

    #[test]
    fn builder_sets_fields() {
        let c = PipelineConfig::builder()
            .store_dir("/data")
            .pdfium_library("/opt/libpdfium.so")
            .provider_name("anthropic")
            .model("claude-sonnet-4-20250514")
            .temperature(5.0)
            .progress_callback(Arc::new(NoopProgressCallback))
            .build()
            .unwrap();
        assert_eq!(c.store_dir, PathBuf::from("/data"));
        assert_eq!(c.provider_name.as_deref(), Some("anthropic"));
        assert_eq!(c.model_or_default(), "claude-sonnet-4-20250514");
        assert_eq!(c.temperature, 2.0, "temperature is clamped");
        assert!(c.progress_callback.is_some());
    }

    #[test]
    fn build_rejects_bad_values() {
        assert!(PipelineConfig::builder().store_dir("").build().is_err());
        assert!(PipelineConfig::builder().max_tokens(0).build().is_err());
        assert!(PipelineConfig::builder().max_retries(11).build().is_err());
        assert!(PipelineConfig::builder().system_prompt("  ").build().is_err());
    }

    #[test]
    fn debug_hides_provider_and_callback() {
        let c = PipelineConfig::builder()
            .progress_callback(Arc::new(NoopProgressCallback))
            .build()
            .unwrap();
        let dbg = format!("{c:?}");
        assert!(dbg.contains("<dyn PipelineProgressCallback>"));
        assert!(dbg.contains("store_dir"));
    }
}

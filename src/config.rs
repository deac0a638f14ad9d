//! Configuration types for screenplay generation and assembly.
//!
//! Every run is controlled through [`ScreenplayConfig`], built via its
//! [`ScreenplayConfigBuilder`]. Service endpoints, API keys, provider and
//! model names all arrive through this value; the library itself carries no
//! built-in service address or model choice.

use crate::error::StoryScriptError;
use crate::image_service::ImageGenerator;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Title used when the generated text carries no `Title:` line.
pub const DEFAULT_TITLE: &str = "Untitled Screenplay";

/// Configuration for a screenplay run.
///
/// Built via [`ScreenplayConfig::builder()`] or using
/// [`ScreenplayConfig::default()`].
///
/// # Example
/// ```rust
/// use storyscript::ScreenplayConfig;
///
/// let config = ScreenplayConfig::builder()
///     .max_images(3)
///     .image_endpoint("http://localhost:8188/generate")
///     .seed(7)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_images, 3);
/// ```
#[derive(Clone)]
pub struct ScreenplayConfig {
    // ── Imaging ──────────────────────────────────────────────────────────
    /// Upper bound on illustrated scenes per document. Default: 5.
    ///
    /// 0 disables imaging.
    pub max_images: usize,

    /// Image requests in flight at once. Default: 5. Never exceeds `max_images`.
    pub image_concurrency: usize,

    /// Per-image timeout in seconds. Default: 60.
    ///
    /// A request that runs past this is abandoned and the scene is assembled
    /// without an image.
    pub image_timeout_secs: u64,

    /// Size hint forwarded to the image service, e.g. "1024x1024".
    pub image_size: Option<String>,

    /// HTTP endpoint of the image service. Without it (and without
    /// `image_generator`) no images are requested.
    pub image_endpoint: Option<String>,

    /// Bearer token sent to the image service.
    pub image_api_key: Option<String>,

    /// Pre-constructed image generator. Takes precedence over `image_endpoint`.
    pub image_generator: Option<Arc<dyn ImageGenerator>>,

    // ── Text model ───────────────────────────────────────────────────────
    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// LLM provider name (e.g. "openai", "anthropic", "gemini", "ollama").
    /// Requires `model`. If neither this nor `provider` is set, the provider
    /// is auto-detected from API-key environment variables.
    pub provider_name: Option<String>,

    /// Model identifier passed to the named provider.
    pub model: Option<String>,

    /// Sampling temperature. Default: 0.8.
    pub temperature: f32,

    /// Maximum tokens per generation. Default: 4096.
    pub max_tokens: usize,

    /// Retries on a failed text-model call. Default: 2.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Custom system prompt for story writing. If None, uses built-in default.
    pub story_prompt: Option<String>,

    /// Custom system prompt for screenplay writing. If None, uses built-in default.
    pub script_prompt: Option<String>,

    // ── Assembly ─────────────────────────────────────────────────────────
    /// Title used when no `Title:`/`Story:`/`Name:` line is found.
    pub default_title: String,

    /// Seed for scene selection. `None` seeds from the OS.
    pub seed: Option<u64>,

    /// Optional progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ScreenplayConfig {
    fn default() -> Self {
        Self {
            max_images: 5,
            image_concurrency: 5,
            image_timeout_secs: 60,
            image_size: None,
            image_endpoint: None,
            image_api_key: None,
            image_generator: None,
            provider: None,
            provider_name: None,
            model: None,
            temperature: 0.8,
            max_tokens: 4096,
            max_retries: 2,
            retry_backoff_ms: 500,
            story_prompt: None,
            script_prompt: None,
            default_title: DEFAULT_TITLE.to_string(),
            seed: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ScreenplayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScreenplayConfig")
            .field("max_images", &self.max_images)
            .field("image_concurrency", &self.image_concurrency)
            .field("image_timeout_secs", &self.image_timeout_secs)
            .field("image_size", &self.image_size)
            .field("image_endpoint", &self.image_endpoint)
            .field("image_api_key", &self.image_api_key.as_ref().map(|_| "<redacted>"))
            .field(
                "image_generator",
                &self.image_generator.as_ref().map(|_| "<dyn ImageGenerator>"),
            )
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("provider_name", &self.provider_name)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("default_title", &self.default_title)
            .field("seed", &self.seed)
            .finish()
    }
}

impl ScreenplayConfig {
    /// Create a new builder for `ScreenplayConfig`.
    pub fn builder() -> ScreenplayConfigBuilder {
        ScreenplayConfigBuilder {
            config: Self::default(),
        }
    }

    /// Concurrency actually used for image requests.
    pub fn effective_image_concurrency(&self) -> usize {
        self.image_concurrency.min(self.max_images).max(1)
    }
}

/// Builder for [`ScreenplayConfig`].
pub struct ScreenplayConfigBuilder {
    config: ScreenplayConfig,
}

impl fmt::Debug for ScreenplayConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScreenplayConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl ScreenplayConfigBuilder {
    pub fn max_images(mut self, n: usize) -> Self {
        self.config.max_images = n;
        self
    }

    pub fn image_concurrency(mut self, n: usize) -> Self {
        self.config.image_concurrency = n.max(1);
        self
    }

    pub fn image_timeout_secs(mut self, secs: u64) -> Self {
        self.config.image_timeout_secs = secs;
        self
    }

    pub fn image_size(mut self, size: impl Into<String>) -> Self {
        self.config.image_size = Some(size.into());
        self
    }

    pub fn image_endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.image_endpoint = Some(url.into());
        self
    }

    pub fn image_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.image_api_key = Some(key.into());
        self
    }

    pub fn image_generator(mut self, generator: Arc<dyn ImageGenerator>) -> Self {
        self.config.image_generator = Some(generator);
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
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

    pub fn story_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.story_prompt = Some(prompt.into());
        self
    }

    pub fn script_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.script_prompt = Some(prompt.into());
        self
    }

    pub fn default_title(mut self, title: impl Into<String>) -> Self {
        self.config.default_title = title.into();
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ScreenplayConfig, StoryScriptError> {
        let c = &self.config;
        if c.image_timeout_secs == 0 {
            return Err(StoryScriptError::InvalidConfig(
                "Image timeout must be ≥ 1 second".into(),
            ));
        }
        if c.max_tokens == 0 {
            return Err(StoryScriptError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if c.provider_name.is_some() && c.model.is_none() {
            return Err(StoryScriptError::InvalidConfig(
                "A provider name needs a model; set one with .model(..)".into(),
            ));
        }
        if let Some(ref endpoint) = c.image_endpoint {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(StoryScriptError::InvalidConfig(format!(
                    "Image endpoint must be an http(s) URL, got '{endpoint}'"
                )));
            }
        }
        if c.default_title.trim().is_empty() {
            return Err(StoryScriptError::InvalidConfig(
                "Default title must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Presentation produced by [`crate::convert::render_output`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Self-contained HTML document for export. (default)
    #[default]
    Html,
    /// `{"script": [{header, text, image_url, image_prompt}, …]}`
    Json,
    /// Whole run: document, raw script and statistics.
    Report,
    /// Unstyled screenplay text.
    Text,
}

impl OutputFormat {
    /// File extension conventionally used for this format.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Html => "html",
            OutputFormat::Json | OutputFormat::Report => "json",
            OutputFormat::Text => "txt",
        }
    }

    /// `path` as given, or with [`Self::extension`] appended when it has none.
    pub fn output_path(self, path: &Path) -> PathBuf {
        match path.extension() {
            Some(_) => path.to_path_buf(),
            None => path.with_extension(self.extension()),
        }
    }
}

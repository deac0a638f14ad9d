//! Error types for the storyscript library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`StoryScriptError`] is **fatal**: the run cannot produce a document at
//!   all (the text model returned nothing, no provider is configured, the
//!   output file cannot be written). Returned as `Err(StoryScriptError)` from
//!   the top-level `convert*` functions.
//!
//! * [`ImageFetchError`] is **soft**: a single scene's illustration failed
//!   (transport error, bad status, empty payload, timeout). It never leaves
//!   the pipeline: the scene is assembled without an image and the failure is
//!   logged and counted in [`crate::output::ScreenplayStats`].
//!
//! Segmentation finding no headings is not an error at all; the whole input
//! becomes one unclassified scene.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the storyscript library.
#[derive(Debug, Error)]
pub enum StoryScriptError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The storyline or story idea was empty or whitespace-only.
    #[error("Input '{field}' is empty; nothing to generate from")]
    EmptyInput { field: &'static str },

    // ── Text-model errors ─────────────────────────────────────────────────
    /// The text-generation collaborator returned no text.
    #[error("The text model returned no {stage} text.\nTry again, or switch model with --model.")]
    UpstreamGenerationEmpty { stage: &'static str },

    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The LLM API kept failing after all retries.
    #[error("LLM API error after {retries} retries: {message}")]
    LlmApiError { retries: u32, message: String },

    // ── Image service errors ──────────────────────────────────────────────
    /// The HTTP client for the image service could not be constructed.
    #[error("Failed to initialise image service client for '{endpoint}': {reason}")]
    ImageServiceInit { endpoint: String, reason: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output document.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A soft failure while illustrating a single scene.
///
/// Produced by [`crate::image_service::ImageGenerator`] implementations and
/// absorbed by [`crate::pipeline::imaging`]; the scene simply has no image.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum ImageFetchError {
    /// Connection refused, DNS failure, broken body stream, etc.
    #[error("Scene {scene}: image request failed: {detail}")]
    Transport { scene: usize, detail: String },

    /// The service answered with a non-success HTTP status.
    #[error("Scene {scene}: image service returned HTTP {status}")]
    HttpStatus { scene: usize, status: u16 },

    /// The service answered successfully but with no image reference.
    #[error("Scene {scene}: image service returned an empty image reference")]
    EmptyPayload { scene: usize },

    /// The image reference was present but unusable (bad data URI, not an image).
    #[error("Scene {scene}: invalid image payload: {detail}")]
    InvalidPayload { scene: usize, detail: String },

    /// The request exceeded the per-fetch timeout.
    #[error("Scene {scene}: image request timed out after {secs}s")]
    Timeout { scene: usize, secs: u64 },
}

impl ImageFetchError {
    /// Position of the scene the failure belongs to.
    pub fn scene(&self) -> usize {
        match self {
            ImageFetchError::Transport { scene, .. }
            | ImageFetchError::HttpStatus { scene, .. }
            | ImageFetchError::EmptyPayload { scene }
            | ImageFetchError::InvalidPayload { scene, .. }
            | ImageFetchError::Timeout { scene, .. } => *scene,
        }
    }
}

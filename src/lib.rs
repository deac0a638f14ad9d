//! # storyscript
//!
//! Generate screenplays with a text model and turn them into structured,
//! illustrated screenplay documents.
//!
//! Model output is loose prose with screenplay conventions sprinkled in:
//! `INT.`/`EXT.` headings, uppercase character cues, the odd Markdown
//! emphasis. This crate normalises that text, classifies every line, splits
//! it into scenes, illustrates a random handful of them through an image
//! service, and assembles the result into one document that can be rendered
//! as HTML, JSON or plain text.
//!
//! ## Pipeline Overview
//!
//! ```text
//! storyline
//!  │
//!  ├─ 1. Generate  story / screenplay via any edgequake-llm provider
//!  ├─ 2. Normalise strip markup, fold line endings, collapse blank runs
//!  ├─ 3. Annotate  classify lines (heading, scene number, cue, dialogue, action)
//!  ├─ 4. Segment   split at each heading; preamble kept as its own scene
//!  ├─ 5. Select    sample ≤ max_images interior/exterior scenes
//!  ├─ 6. Imaging   concurrent image requests, soft failures
//!  └─ 7. Assemble  title detection + ScreenplayDocument + stats
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use storyscript::{convert, render_html, ScreenplayConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY
//!     let config = ScreenplayConfig::builder()
//!         .image_endpoint("http://localhost:8188/generate")
//!         .build()?;
//!     let output = convert("A lighthouse keeper finds a message in a bottle.", &config).await?;
//!     println!("{}", render_html(&output.document));
//!     eprintln!("{} scenes, {} illustrated",
//!         output.stats.total_scenes,
//!         output.stats.illustrated_scenes);
//!     Ok(())
//! }
//! ```
//!
//! Already have a script? [`convert_script`] skips the text model entirely.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `storyscript` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! storyscript = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod image_service;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{OutputFormat, ScreenplayConfig, ScreenplayConfigBuilder, DEFAULT_TITLE};
pub use convert::{
    convert, convert_from_idea, convert_script, convert_script_with_rng, convert_sync,
    convert_to_file, generate_script, generate_story, render_output, write_output,
};
pub use error::{ImageFetchError, StoryScriptError};
pub use image_service::{HttpImageGenerator, ImageGenerator, ImageRequest};
pub use output::{
    LineKind, Scene, SceneImage, SceneKind, ScreenplayDocument, ScreenplayOutput, ScreenplayStats,
    ScriptEntry, ScriptLine, ScriptResponse, StoryRequest,
};
pub use pipeline::annotate::{annotate, strip_styling};
pub use pipeline::llm::GeneratedText;
pub use pipeline::normalize::normalize;
pub use pipeline::render::{render_html, render_plain_text};
pub use progress::{NoopProgressCallback, ProgressCallback, ScreenplayProgressCallback};

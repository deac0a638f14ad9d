//! Entry points: generate a screenplay and turn it into a document.
//!
//! ```text
//! idea ──generate_story──▶ storyline ──generate_script──▶ script ──convert_script──▶ ScreenplayOutput
//! ```
//!
//! [`convert_from_idea`] runs the whole chain, [`convert`] starts from a
//! storyline, and [`convert_script`] parses a script the caller already has
//! without touching a text model.

use crate::config::{OutputFormat, ScreenplayConfig};
use crate::error::StoryScriptError;
use crate::image_service::{HttpImageGenerator, ImageGenerator};
use crate::output::{ScreenplayOutput, ScreenplayStats, ScriptResponse};
use crate::pipeline::llm::{self, GeneratedText};
use crate::pipeline::{annotate, assemble, imaging, normalize, render, segment, select};
use crate::prompts::{self, DEFAULT_SCRIPT_PROMPT, DEFAULT_STORY_PROMPT};
use edgequake_llm::{LLMProvider, ProviderFactory};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Write a short story from a one-line idea.
pub async fn generate_story(
    idea: impl AsRef<str>,
    config: &ScreenplayConfig,
) -> Result<GeneratedText, StoryScriptError> {
    let idea = idea.as_ref();
    if idea.trim().is_empty() {
        return Err(StoryScriptError::EmptyInput { field: "idea" });
    }
    let provider = resolve_provider(config)?;
    let system = config.story_prompt.as_deref().unwrap_or(DEFAULT_STORY_PROMPT);
    run_generation(&provider, "story", system, &prompts::story_prompt(idea), config).await
}

/// Turn a storyline into raw screenplay text.
pub async fn generate_script(
    storyline: impl AsRef<str>,
    config: &ScreenplayConfig,
) -> Result<GeneratedText, StoryScriptError> {
    let storyline = storyline.as_ref();
    if storyline.trim().is_empty() {
        return Err(StoryScriptError::EmptyInput { field: "storyline" });
    }
    let provider = resolve_provider(config)?;
    let system = config.script_prompt.as_deref().unwrap_or(DEFAULT_SCRIPT_PROMPT);
    run_generation(&provider, "script", system, &prompts::script_prompt(storyline), config).await
}

/// Generate a screenplay from a storyline and assemble it into a document.
///
/// This is the primary entry point for the library.
///
/// # Errors
/// Fatal only when the storyline is blank, no provider can be resolved, or
/// the text model fails or returns nothing. Image failures never fail the
/// run; they show up in `stats.failed_images`.
pub async fn convert(
    storyline: impl AsRef<str>,
    config: &ScreenplayConfig,
) -> Result<ScreenplayOutput, StoryScriptError> {
    let total_start = Instant::now();
    info!("Generating screenplay from storyline");

    let script = generate_script(storyline, config).await?;
    finish(script.content.clone(), &[script], config, total_start).await
}

/// Write a story from an idea, then a screenplay from the story.
pub async fn convert_from_idea(
    idea: impl AsRef<str>,
    config: &ScreenplayConfig,
) -> Result<ScreenplayOutput, StoryScriptError> {
    let total_start = Instant::now();
    info!("Generating story and screenplay from idea");

    let story = generate_story(idea, config).await?;
    let script = generate_script(&story.content, config).await?;
    finish(script.content.clone(), &[story, script], config, total_start).await
}

/// Assemble a document from screenplay text the caller already has.
///
/// Does not require an LLM provider. Selection is seeded from
/// `config.seed` when set.
pub async fn convert_script(
    raw: impl AsRef<str>,
    config: &ScreenplayConfig,
) -> Result<ScreenplayOutput, StoryScriptError> {
    let mut rng = scene_rng(config);
    convert_script_with_rng(raw, config, &mut rng).await
}

/// Like [`convert_script`], drawing the image selection from `rng`.
pub async fn convert_script_with_rng<R: Rng + ?Sized>(
    raw: impl AsRef<str>,
    config: &ScreenplayConfig,
    rng: &mut R,
) -> Result<ScreenplayOutput, StoryScriptError> {
    let total_start = Instant::now();
    let raw = raw.as_ref();
    if raw.trim().is_empty() {
        return Err(StoryScriptError::EmptyInput { field: "script" });
    }
    build_output(raw.to_string(), &[], config, rng, total_start).await
}

/// Render a finished run in the requested format.
pub fn render_output(output: &ScreenplayOutput, format: OutputFormat) -> Result<String, StoryScriptError> {
    let rendered = match format {
        OutputFormat::Html => render::render_html(&output.document),
        OutputFormat::Text => render::render_plain_text(&output.document),
        OutputFormat::Json => serde_json::to_string_pretty(&ScriptResponse::from(&output.document))
            .map_err(|e| StoryScriptError::Internal(format!("JSON serialisation failed: {e}")))?,
        OutputFormat::Report => serde_json::to_string_pretty(output)
            .map_err(|e| StoryScriptError::Internal(format!("JSON serialisation failed: {e}")))?,
    };
    Ok(rendered)
}

/// Write `contents` to `path` atomically (temp file + rename).
pub async fn write_output(path: impl AsRef<Path>, contents: &str) -> Result<(), StoryScriptError> {
    let path = path.as_ref();
    let write_err = |e| StoryScriptError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }
    }

    let tmp_ext = match path.extension() {
        Some(ext) => format!("{}.tmp", ext.to_string_lossy()),
        None => "tmp".to_string(),
    };
    let tmp_path = path.with_extension(tmp_ext);
    tokio::fs::write(&tmp_path, contents).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;

    debug!("Wrote {} bytes to {}", contents.len(), path.display());
    Ok(())
}

/// Generate a screenplay from a storyline and write it to a file.
pub async fn convert_to_file(
    storyline: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    format: OutputFormat,
    config: &ScreenplayConfig,
) -> Result<ScreenplayStats, StoryScriptError> {
    let output = convert(storyline, config).await?;
    let rendered = render_output(&output, format)?;
    write_output(output_path, &rendered).await?;
    Ok(output.stats)
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    storyline: impl AsRef<str>,
    config: &ScreenplayConfig,
) -> Result<ScreenplayOutput, StoryScriptError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| StoryScriptError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(storyline, config))
}

// ── Internal helpers ─────────────────────────────────────────────────────

async fn run_generation(
    provider: &Arc<dyn LLMProvider>,
    stage: &'static str,
    system: &str,
    user: &str,
    config: &ScreenplayConfig,
) -> Result<GeneratedText, StoryScriptError> {
    if let Some(ref cb) = config.progress_callback {
        cb.on_generation_start(stage);
    }
    let text = llm::generate_text(provider, stage, system, user, config).await?;
    info!(
        "Generated {} ({} chars, {}ms)",
        stage,
        text.content.len(),
        text.duration_ms
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_generation_complete(stage, text.content.chars().count());
    }
    Ok(text)
}

async fn finish(
    raw: String,
    generations: &[GeneratedText],
    config: &ScreenplayConfig,
    total_start: Instant,
) -> Result<ScreenplayOutput, StoryScriptError> {
    let mut rng = scene_rng(config);
    build_output(raw, generations, config, &mut rng, total_start).await
}

fn scene_rng(config: &ScreenplayConfig) -> StdRng {
    match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

/// Run every stage after text generation.
async fn build_output<R: Rng + ?Sized>(
    raw: String,
    generations: &[GeneratedText],
    config: &ScreenplayConfig,
    rng: &mut R,
    total_start: Instant,
) -> Result<ScreenplayOutput, StoryScriptError> {
    // ── Step 1: Normalise, classify, segment ─────────────────────────────
    let normalized = normalize::normalize(&raw);
    let lines = annotate::classify_lines(&normalized);
    let scenes = segment::segment(&lines);
    let eligible = select::eligible_positions(&scenes).len();
    info!("Parsed {} scenes ({} eligible for images)", scenes.len(), eligible);

    // ── Step 2: Choose scenes to illustrate ──────────────────────────────
    let generator = resolve_image_generator(config)?;
    let selected = match generator {
        Some(_) => select::select_scenes(&scenes, config.max_images, rng),
        None => Vec::new(),
    };

    // ── Step 3: Fetch images ─────────────────────────────────────────────
    let imaging_start = Instant::now();
    let outcome = match generator {
        Some(ref generator) => imaging::fetch_images(generator, &scenes, &selected, config).await,
        None => imaging::ImagingOutcome {
            images: vec![None; scenes.len()],
            failures: Vec::new(),
        },
    };
    let imaging_duration_ms = imaging_start.elapsed().as_millis() as u64;

    // ── Step 4: Assemble ─────────────────────────────────────────────────
    let title = assemble::detect_title(&raw, &config.default_title);
    let failed_images = outcome.failures.len();
    let document = assemble::assemble(title, scenes, outcome.images);

    let stats = ScreenplayStats {
        total_scenes: document.scenes().len(),
        eligible_scenes: eligible,
        selected_scenes: selected.len(),
        illustrated_scenes: document.illustrated_count(),
        failed_images,
        total_input_tokens: generations.iter().map(|g| g.input_tokens).sum(),
        total_output_tokens: generations.iter().map(|g| g.output_tokens).sum(),
        generation_duration_ms: generations.iter().map(|g| g.duration_ms).sum(),
        imaging_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Screenplay '{}' assembled: {} scenes, {}/{} illustrated, {}ms total",
        document.title(),
        stats.total_scenes,
        stats.illustrated_scenes,
        stats.selected_scenes,
        stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_assembly_complete(stats.total_scenes, stats.illustrated_scenes);
    }

    Ok(ScreenplayOutput {
        document,
        script: raw,
        stats,
    })
}

/// Instantiate a named provider with the given model.
fn create_text_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, StoryScriptError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        StoryScriptError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Named provider + model** (`config.provider_name`, `config.model`).
///    The factory reads the matching API key from the environment.
/// 3. **Auto-detection** (`ProviderFactory::from_env`), which picks the
///    first provider whose API key variable is set.
pub fn resolve_provider(config: &ScreenplayConfig) -> Result<Arc<dyn LLMProvider>, StoryScriptError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config
            .model
            .as_deref()
            .ok_or_else(|| StoryScriptError::ProviderNotConfigured {
                provider: name.clone(),
                hint: "No model given. Pass --model or set STORYSCRIPT_MODEL.".to_string(),
            })?;
        return create_text_provider(name, model);
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| StoryScriptError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, GEMINI_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

/// Resolve the image generator, if imaging is enabled at all.
///
/// A pre-built generator wins over an endpoint. With neither, or with
/// `max_images == 0`, the document is assembled without images.
pub fn resolve_image_generator(
    config: &ScreenplayConfig,
) -> Result<Option<Arc<dyn ImageGenerator>>, StoryScriptError> {
    if config.max_images == 0 {
        debug!("Imaging disabled (max_images = 0)");
        return Ok(None);
    }

    if let Some(ref generator) = config.image_generator {
        return Ok(Some(Arc::clone(generator)));
    }

    if let Some(ref endpoint) = config.image_endpoint {
        let generator = HttpImageGenerator::new(
            endpoint.clone(),
            config.image_api_key.clone(),
            config.image_timeout_secs,
        )?;
        return Ok(Some(Arc::new(generator)));
    }

    info!("No image service configured; scenes will not be illustrated");
    Ok(None)
}

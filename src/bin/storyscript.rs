//! CLI binary for storyscript.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ScreenplayConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use storyscript::{
    convert, convert_from_idea, convert_script, render_output, write_output, OutputFormat,
    ProgressCallback, ScreenplayConfig, ScreenplayOutput, ScreenplayProgressCallback,
};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const SPINNER_TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress: a spinner while the text model writes, then a bar
/// counting image requests as they finish (in any order).
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(SPINNER_TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>2}/{len} images  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(SPINNER_TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_position(0);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Illustrating");
        self.bar.reset_eta();
    }

    fn elapsed_secs(&self, scene: usize) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut m| m.remove(&scene))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ScreenplayProgressCallback for CliProgressCallback {
    fn on_generation_start(&self, stage: &str) {
        self.bar.set_prefix("Writing");
        self.bar.set_message(format!("{stage}…"));
    }

    fn on_generation_complete(&self, stage: &str, chars: usize) {
        self.bar.println(format!(
            "  {} {:<7} {}",
            green("✓"),
            stage,
            dim(&format!("{chars:>6} chars"))
        ));
    }

    fn on_imaging_start(&self, selected: usize) {
        self.activate_bar(selected);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Requesting {selected} scene images…"))
        ));
    }

    fn on_image_start(&self, scene: usize) {
        if let Ok(mut m) = self.start_times.lock() {
            m.insert(scene, Instant::now());
        }
        self.bar.set_message(format!("scene {scene}"));
    }

    fn on_image_complete(&self, scene: usize) {
        let secs = self.elapsed_secs(scene);
        self.bar.println(format!(
            "  {} Scene {:>3}  {}",
            green("✓"),
            scene,
            dim(&format!("{secs:.1}s"))
        ));
        self.bar.inc(1);
    }

    fn on_image_error(&self, scene: usize, error: &str) {
        let secs = self.elapsed_secs(scene);
        self.errors.fetch_add(1, Ordering::SeqCst);

        let msg: String = if error.chars().count() > 80 {
            error.chars().take(79).chain(std::iter::once('…')).collect()
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} Scene {:>3}  {}  {}",
            red("✗"),
            scene,
            red(&msg),
            dim(&format!("{secs:.1}s"))
        ));
        self.bar.inc(1);
    }

    fn on_assembly_complete(&self, scenes: usize, illustrated: usize) {
        self.bar.finish_and_clear();
        let failed = self.errors.load(Ordering::SeqCst);
        eprintln!(
            "{} {} scenes assembled, {} illustrated{}",
            if failed == 0 { green("✔") } else { cyan("⚠") },
            bold(&scenes.to_string()),
            illustrated,
            if failed == 0 {
                String::new()
            } else {
                format!("  ({} image requests failed)", red(&failed.to_string()))
            }
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Screenplay from a storyline, HTML to stdout
  storyscript "A retired thief is pulled into one last job in Lisbon."

  # Write to a file, with images from a local service
  storyscript --story-file story.txt --image-endpoint http://localhost:8188/generate -o play.html

  # Start from a one-line idea (story is written first)
  storyscript --idea "robots learning to garden" --format text

  # Parse an existing script without calling a text model
  storyscript --script-file draft.txt --format json --seed 42

  # Choose provider and model
  storyscript --provider anthropic --model claude-sonnet-4-20250514 "..."

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY               OpenAI API key
  ANTHROPIC_API_KEY            Anthropic API key
  GEMINI_API_KEY               Google Gemini API key
  STORYSCRIPT_PROVIDER         Text model provider (openai, anthropic, gemini, ollama)
  STORYSCRIPT_MODEL            Text model ID (required with a provider)
  STORYSCRIPT_IMAGE_ENDPOINT   Image service URL
  STORYSCRIPT_IMAGE_API_KEY    Bearer token for the image service
"#;

/// Generate illustrated screenplays from storylines using LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "storyscript",
    version,
    about = "Generate illustrated screenplays from storylines using LLMs",
    long_about = "Turn a storyline (or a one-line idea) into a screenplay with a text model, \
split it into scenes, illustrate a handful of them through an image service, and export the \
result as HTML, JSON or plain text.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Storyline text.
    #[arg(conflicts_with_all = ["story_file", "idea", "script_file"])]
    storyline: Option<String>,

    /// Read the storyline from a file.
    #[arg(long, conflicts_with_all = ["idea", "script_file"])]
    story_file: Option<PathBuf>,

    /// Generate a story from this idea first, then the screenplay.
    #[arg(long, conflicts_with = "script_file")]
    idea: Option<String>,

    /// Parse an existing screenplay file; no text model is called.
    #[arg(long)]
    script_file: Option<PathBuf>,

    /// Write output to this file instead of stdout. A path without an
    /// extension gets the one matching --format.
    #[arg(short, long, env = "STORYSCRIPT_OUTPUT")]
    output: Option<PathBuf>,

    /// Output format.
    #[arg(long, env = "STORYSCRIPT_FORMAT", value_enum, default_value = "html")]
    format: FormatArg,

    /// Text model ID (e.g. gpt-4.1-mini, claude-sonnet-4-20250514).
    #[arg(long, env = "STORYSCRIPT_MODEL")]
    model: Option<String>,

    /// Text model provider: openai, anthropic, gemini, ollama, azure.
    #[arg(
        long,
        env = "STORYSCRIPT_PROVIDER",
        long_help = "Text model provider. Auto-detected from API key env vars if not set.\n\
          Requires --model when given."
    )]
    provider: Option<String>,

    /// Sampling temperature (0.0–2.0).
    #[arg(long, env = "STORYSCRIPT_TEMPERATURE", default_value_t = 0.8)]
    temperature: f32,

    /// Max output tokens per generation.
    #[arg(long, env = "STORYSCRIPT_MAX_TOKENS", default_value_t = 4096)]
    max_tokens: usize,

    /// Retries per text-model call.
    #[arg(long, env = "STORYSCRIPT_MAX_RETRIES", default_value_t = 2)]
    max_retries: u32,

    /// Image service endpoint (POST {"prompt", "size"} → {"image_url"}).
    #[arg(long, env = "STORYSCRIPT_IMAGE_ENDPOINT")]
    image_endpoint: Option<String>,

    /// Bearer token for the image service.
    #[arg(long, env = "STORYSCRIPT_IMAGE_API_KEY", hide_env_values = true)]
    image_api_key: Option<String>,

    /// Image size hint, e.g. 1024x1024.
    #[arg(long, env = "STORYSCRIPT_IMAGE_SIZE")]
    image_size: Option<String>,

    /// Maximum number of scenes to illustrate.
    #[arg(long, env = "STORYSCRIPT_MAX_IMAGES", default_value_t = 5)]
    max_images: usize,

    /// Concurrent image requests.
    #[arg(long, env = "STORYSCRIPT_IMAGE_CONCURRENCY", default_value_t = 5)]
    image_concurrency: usize,

    /// Per-image timeout in seconds.
    #[arg(long, env = "STORYSCRIPT_IMAGE_TIMEOUT", default_value_t = 60)]
    image_timeout: u64,

    /// Do not request any images.
    #[arg(long)]
    no_images: bool,

    /// Seed for scene selection (reproducible output).
    #[arg(long, env = "STORYSCRIPT_SEED")]
    seed: Option<u64>,

    /// Title used when the script has no Title: line.
    #[arg(long)]
    title: Option<String>,

    /// Disable progress bar.
    #[arg(long, env = "STORYSCRIPT_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "STORYSCRIPT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "STORYSCRIPT_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Html,
    Json,
    Report,
    Text,
}

impl From<FormatArg> for OutputFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Html => OutputFormat::Html,
            FormatArg::Json => OutputFormat::Json,
            FormatArg::Report => OutputFormat::Report,
            FormatArg::Text => OutputFormat::Text,
        }
    }
}

/// Where the screenplay text comes from.
enum Source {
    Storyline(String),
    Idea(String),
    Script(String),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level library logs.
    let show_progress = !cli.quiet && !cli.no_progress;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let source = read_source(&cli).await?;

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ScreenplayProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Run ──────────────────────────────────────────────────────────────
    let output: ScreenplayOutput = match source {
        Source::Storyline(s) => convert(&s, &config).await,
        Source::Idea(i) => convert_from_idea(&i, &config).await,
        Source::Script(s) => convert_script(&s, &config).await,
    }
    .context("Screenplay generation failed")?;

    let format: OutputFormat = cli.format.into();
    let rendered = render_output(&output, format).context("Failed to render output")?;
    let output_path = cli.output.as_deref().map(|p| format.output_path(p));

    if let Some(ref path) = output_path {
        write_output(path, &rendered)
            .await
            .context("Failed to write output")?;
    } else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(rendered.as_bytes())
            .context("Failed to write to stdout")?;
        if !rendered.ends_with('\n') {
            handle.write_all(b"\n").ok();
        }
    }

    if !cli.quiet {
        let stats = &output.stats;
        eprintln!(
            "   \"{}\"  {} scenes  {}/{} illustrated  {}ms{}",
            output.document.title(),
            stats.total_scenes,
            stats.illustrated_scenes,
            stats.selected_scenes,
            stats.total_duration_ms,
            match output_path {
                Some(ref p) => format!("  →  {}", bold(&p.display().to_string())),
                None => String::new(),
            }
        );
        if stats.total_input_tokens + stats.total_output_tokens > 0 {
            eprintln!(
                "   {} tokens in  /  {} tokens out",
                dim(&stats.total_input_tokens.to_string()),
                dim(&stats.total_output_tokens.to_string()),
            );
        }
    }

    Ok(())
}

async fn read_source(cli: &Cli) -> Result<Source> {
    if let Some(ref path) = cli.script_file {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read script from {:?}", path))?;
        return Ok(Source::Script(text));
    }
    if let Some(ref idea) = cli.idea {
        return Ok(Source::Idea(idea.clone()));
    }
    if let Some(ref path) = cli.story_file {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read storyline from {:?}", path))?;
        return Ok(Source::Storyline(text));
    }
    match cli.storyline {
        Some(ref s) => Ok(Source::Storyline(s.clone())),
        None => anyhow::bail!("Provide a storyline, --story-file, --idea or --script-file"),
    }
}

/// Map CLI args to `ScreenplayConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ScreenplayConfig> {
    let mut builder = ScreenplayConfig::builder()
        .max_images(if cli.no_images { 0 } else { cli.max_images })
        .image_concurrency(cli.image_concurrency)
        .image_timeout_secs(cli.image_timeout)
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .max_retries(cli.max_retries);

    if let Some(ref url) = cli.image_endpoint {
        builder = builder.image_endpoint(url);
    }
    if let Some(ref key) = cli.image_api_key {
        builder = builder.image_api_key(key);
    }
    if let Some(ref size) = cli.image_size {
        builder = builder.image_size(size);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(seed) = cli.seed {
        builder = builder.seed(seed);
    }
    if let Some(ref title) = cli.title {
        builder = builder.default_title(title);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

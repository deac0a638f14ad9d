//! Offline integration tests: the full pipeline from screenplay text to
//! rendered document, with stub image generators and seeded selection.
//!
//! Run with:
//!   cargo test --test pipeline

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use storyscript::{
    annotate, convert_script, convert_script_with_rng, normalize, render_html, render_output,
    strip_styling, ImageFetchError, ImageGenerator, ImageRequest, OutputFormat, SceneKind,
    ScreenplayConfig, ScreenplayProgressCallback, ScriptResponse, DEFAULT_TITLE,
};

// ── Stub generators ──────────────────────────────────────────────────────────

/// Returns a small PNG data URI and records every prompt it was asked for.
#[derive(Default)]
struct PngGenerator {
    prompts: Mutex<Vec<String>>,
}

fn png_data_uri() -> String {
    let img = image::RgbaImage::from_pixel(2, 2, image::Rgba([200, 40, 40, 255]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .expect("encode png");
    format!("data:image/png;base64,{}", STANDARD.encode(&buf))
}

#[async_trait]
impl ImageGenerator for PngGenerator {
    async fn generate(&self, _scene: usize, request: &ImageRequest) -> Result<String, ImageFetchError> {
        self.prompts.lock().unwrap().push(request.prompt.clone());
        Ok(png_data_uri())
    }
}

/// Fails every request.
#[derive(Default)]
struct DownGenerator {
    calls: AtomicUsize,
}

#[async_trait]
impl ImageGenerator for DownGenerator {
    async fn generate(&self, scene: usize, _request: &ImageRequest) -> Result<String, ImageFetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ImageFetchError::Transport {
            scene,
            detail: "connection refused".into(),
        })
    }
}

/// Returns an empty reference, as a service with nothing to offer does.
struct EmptyGenerator;

#[async_trait]
impl ImageGenerator for EmptyGenerator {
    async fn generate(&self, _scene: usize, _request: &ImageRequest) -> Result<String, ImageFetchError> {
        Ok(String::new())
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("storyscript=debug"))
        .with_test_writer()
        .try_init();
}

fn config_with(generator: Arc<dyn ImageGenerator>) -> ScreenplayConfig {
    ScreenplayConfig::builder()
        .image_generator(generator)
        .build()
        .unwrap()
}

// ── Fixtures ─────────────────────────────────────────────────────────────────

/// Seven interior/exterior scenes and two transitions.
const NINE_SCENES: &str = "\
**Title:** the salt road

INT. FARMHOUSE KITCHEN - DAWN
Bread on the table.

EXT. ORCHARD - DAY
Wind through the trees.

CUT TO:

INT. BARN - DAY

ELLIE

Where's the mule?

EXT. SALT FLATS - NOON
White to the horizon.

INT. CARAVAN - NIGHT
Lanterns.

CUT TO:

EXT. CLIFF PATH - DUSK
Gulls.

INT. INN - NIGHT
The end of the road.
";

// ── Scenarios ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn prose_without_headings_is_one_unclassified_scene() {
    let generator = Arc::new(PngGenerator::default());
    let config = config_with(generator.clone());

    let out = convert_script(
        "Once upon a time a fox lived by the river.\n\nIt was happy.",
        &config,
    )
    .await
    .unwrap();

    assert_eq!(out.document.scenes().len(), 1);
    assert_eq!(out.document.scenes()[0].kind, SceneKind::Unclassified);
    assert_eq!(out.document.scenes()[0].heading_text(), "");
    assert_eq!(out.stats.illustrated_scenes, 0);
    assert!(generator.prompts.lock().unwrap().is_empty());
    assert_eq!(out.document.title(), DEFAULT_TITLE);
}

#[tokio::test]
async fn nine_scenes_select_five_and_never_transitions() {
    init_tracing();
    let generator = Arc::new(PngGenerator::default());
    let config = config_with(generator.clone());

    for seed in 0..25 {
        let mut rng = StdRng::seed_from_u64(seed);
        let out = convert_script_with_rng(NINE_SCENES, &config, &mut rng)
            .await
            .unwrap();

        let scenes = out.document.scenes();
        let transitions = scenes.iter().filter(|s| s.kind == SceneKind::Transition).count();
        assert_eq!(transitions, 2);
        assert_eq!(out.stats.eligible_scenes, 7);
        assert_eq!(out.stats.selected_scenes, 5);
        assert_eq!(out.stats.illustrated_scenes, 5);
        assert!(scenes
            .iter()
            .filter(|s| s.image.is_some())
            .all(|s| s.kind.is_eligible()));
    }

    let prompts = generator.prompts.lock().unwrap();
    assert!(prompts.iter().all(|p| !p.contains("CUT TO:")));
    assert!(prompts.iter().all(|p| !p.contains("<span")));
}

#[tokio::test]
async fn failing_image_service_still_assembles() {
    init_tracing();
    let generator = Arc::new(DownGenerator::default());
    let config = config_with(generator.clone());

    let out = convert_script(NINE_SCENES, &config).await.unwrap();

    assert_eq!(generator.calls.load(Ordering::SeqCst), 5);
    assert_eq!(out.stats.illustrated_scenes, 0);
    assert_eq!(out.stats.failed_images, 5);
    assert_eq!(out.document.scenes().len(), 10);
    assert_eq!(out.document.title(), "The Salt Road");
    assert!(!render_html(&out.document).contains("<img"));
}

#[tokio::test]
async fn empty_image_reference_means_no_image() {
    let config = config_with(Arc::new(EmptyGenerator));
    let out = convert_script(NINE_SCENES, &config).await.unwrap();
    assert_eq!(out.stats.illustrated_scenes, 0);
    assert_eq!(out.stats.failed_images, 5);
}

#[tokio::test]
async fn character_cue_between_blank_lines() {
    let out = convert_script(NINE_SCENES, &ScreenplayConfig::default())
        .await
        .unwrap();
    let barn = out
        .document
        .scenes()
        .iter()
        .find(|s| s.heading_text() == "INT. BARN - DAY")
        .unwrap();
    assert!(barn.body.contains("<span class=\"character\">ELLIE</span>"));
    assert!(barn
        .body
        .contains("<span class=\"dialogue\">Where's the mule?</span>"));
}

// ── Properties ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn scenes_reconstruct_annotated_text() {
    let out = convert_script(NINE_SCENES, &ScreenplayConfig::default())
        .await
        .unwrap();
    let expected = annotate(&normalize(NINE_SCENES));
    assert_eq!(out.document.annotated_text(), expected);
}

#[test]
fn styling_round_trip() {
    let samples = [
        NINE_SCENES,
        "",
        "plain",
        "a\nJOHN\nhello\r\n\r\n\r\n\r\nSCENE 3\n1. EXT. ROAD - DAY *dust*",
        "<<b>>",
        "<<b>/span> x",
        "INT. A - DAY\n<<b>/span> and <<i>span class=\"character\"> hi",
    ];
    for raw in samples {
        let normalized = normalize(raw);
        assert_eq!(strip_styling(&annotate(&normalized)), normalized);
        assert_eq!(normalize(&normalized), normalized);
    }
}

#[tokio::test]
async fn same_seed_same_document() {
    let config = ScreenplayConfig::builder()
        .image_generator(Arc::new(PngGenerator::default()))
        .seed(1234)
        .build()
        .unwrap();

    let a = convert_script(NINE_SCENES, &config).await.unwrap();
    let b = convert_script(NINE_SCENES, &config).await.unwrap();
    assert_eq!(a.document, b.document);
    assert_eq!(
        render_output(&a, OutputFormat::Html).unwrap(),
        render_output(&b, OutputFormat::Html).unwrap()
    );
}

#[tokio::test]
async fn zero_max_images_skips_imaging() {
    let generator = Arc::new(DownGenerator::default());
    let config = ScreenplayConfig::builder()
        .image_generator(generator.clone())
        .max_images(0)
        .build()
        .unwrap();

    let out = convert_script(NINE_SCENES, &config).await.unwrap();
    assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    assert_eq!(out.stats.selected_scenes, 0);
}

#[tokio::test]
async fn json_response_matches_scenes() {
    let config = ScreenplayConfig::builder()
        .image_generator(Arc::new(PngGenerator::default()))
        .seed(7)
        .build()
        .unwrap();
    let out = convert_script(NINE_SCENES, &config).await.unwrap();

    let json = render_output(&out, OutputFormat::Json).unwrap();
    let response: ScriptResponse = serde_json::from_str(&json).unwrap();

    assert_eq!(response.script.len(), out.document.scenes().len());
    let with_images = response
        .script
        .iter()
        .filter(|e| e.image_url.starts_with("data:image/png;base64,"))
        .count();
    assert_eq!(with_images, 5);
    for entry in &response.script {
        assert_eq!(entry.image_url.is_empty(), entry.image_prompt.is_empty());
    }
}

#[derive(Default)]
struct Events {
    imaging_started: AtomicUsize,
    completed: AtomicUsize,
    assembled: AtomicUsize,
}

impl ScreenplayProgressCallback for Events {
    fn on_imaging_start(&self, selected: usize) {
        self.imaging_started.store(selected, Ordering::SeqCst);
    }
    fn on_image_complete(&self, _scene: usize) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }
    fn on_assembly_complete(&self, scenes: usize, _illustrated: usize) {
        self.assembled.store(scenes, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn progress_events_fire() {
    let events = Arc::new(Events::default());
    let config = ScreenplayConfig::builder()
        .image_generator(Arc::new(PngGenerator::default()))
        .max_images(3)
        .progress_callback(events.clone())
        .build()
        .unwrap();

    convert_script(NINE_SCENES, &config).await.unwrap();
    assert_eq!(events.imaging_started.load(Ordering::SeqCst), 3);
    assert_eq!(events.completed.load(Ordering::SeqCst), 3);
    assert_eq!(events.assembled.load(Ordering::SeqCst), 10);
}

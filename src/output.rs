//! Output types: the assembled screenplay, its scenes, and run statistics.
//!
//! A [`ScreenplayDocument`] is built once per pipeline run and never mutated
//! afterwards. Its fields are private; renderers and callers read it through
//! accessors, so every presentation form is a projection of the same value.

use serde::{Deserialize, Serialize};

/// Opening tag of a styling marker for the given class.
pub(crate) fn style_open(class: &str) -> String {
    format!("<span class=\"{class}\">")
}

/// Closing tag shared by every styling marker.
pub(crate) const STYLE_CLOSE: &str = "</span>";

// ── Scene classification ─────────────────────────────────────────────────

/// What kind of scene a heading introduces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SceneKind {
    /// `INT.` heading.
    Interior,
    /// `EXT.` heading.
    Exterior,
    /// `CUT TO:` / `FADE OUT:` heading.
    Transition,
    /// No recognised keyword: title block or preamble before the first heading.
    Unclassified,
}

impl SceneKind {
    /// Only interior and exterior scenes may receive a generated image.
    pub fn is_eligible(self) -> bool {
        matches!(self, SceneKind::Interior | SceneKind::Exterior)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SceneKind::Interior => "interior",
            SceneKind::Exterior => "exterior",
            SceneKind::Transition => "transition",
            SceneKind::Unclassified => "unclassified",
        }
    }
}

/// Structural role of one line of screenplay text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "scene", rename_all = "snake_case")]
pub enum LineKind {
    /// Scene heading carrying the kind derived from its keyword.
    Heading(SceneKind),
    /// `SCENE 12` style numbering line.
    SceneNumber,
    /// Standalone uppercase speaker name.
    CharacterCue,
    /// First non-blank line after a character cue.
    Dialogue,
    /// Everything else with content.
    Action,
    /// Empty line.
    Blank,
}

impl LineKind {
    /// CSS class used for the styling marker, if this kind is styled at all.
    pub fn style_class(self) -> Option<&'static str> {
        match self {
            LineKind::Heading(_) => Some("scene-heading"),
            LineKind::SceneNumber => Some("scene-number"),
            LineKind::CharacterCue => Some("character"),
            LineKind::Dialogue => Some("dialogue"),
            LineKind::Action | LineKind::Blank => None,
        }
    }
}

/// One classified line of screenplay text.
///
/// `text` is always the unstyled line exactly as it appeared after
/// normalisation. `style_from` is the byte offset where the styled span
/// starts: 0 for whole-line styling, the keyword position for headings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptLine {
    pub kind: LineKind,
    pub text: String,
    pub style_from: usize,
}

impl ScriptLine {
    pub fn new(kind: LineKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            style_from: 0,
        }
    }

    /// The line with its styling marker applied.
    pub fn styled(&self) -> String {
        match self.kind.style_class() {
            Some(class) => {
                let (prefix, span) = self.text.split_at(self.style_from);
                format!("{prefix}{}{span}{STYLE_CLOSE}", style_open(class))
            }
            None => self.text.clone(),
        }
    }
}

// ── Scenes & document ────────────────────────────────────────────────────

/// An image attached to a scene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneImage {
    /// Data URI or remote URL returned by the image service.
    pub url: String,
    /// Prompt the image was generated from.
    pub prompt: String,
}

/// One structural unit of the screenplay, bounded by a heading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scene {
    /// Position in the document; the identity used by image selection.
    pub index: usize,
    pub kind: SceneKind,
    /// Heading line, `None` for an unclassified preamble scene.
    pub heading: Option<ScriptLine>,
    /// Classified body lines.
    pub lines: Vec<ScriptLine>,
    /// Styled body text, including the line break that separates this scene
    /// from the next one.
    pub body: String,
    pub image: Option<SceneImage>,
}

impl Scene {
    /// Heading with styling applied; empty for a preamble scene.
    pub fn heading_markup(&self) -> String {
        self.heading
            .as_ref()
            .map(ScriptLine::styled)
            .unwrap_or_default()
    }

    /// Trimmed heading without styling.
    pub fn heading_text(&self) -> &str {
        self.heading.as_ref().map(|h| h.text.trim()).unwrap_or("")
    }

    /// Body lines without styling, joined with line breaks.
    pub fn plain_body(&self) -> String {
        self.lines
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn is_eligible(&self) -> bool {
        self.kind.is_eligible()
    }
}

/// The assembled screenplay: a title and its scenes in source order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenplayDocument {
    title: String,
    scenes: Vec<Scene>,
}

impl ScreenplayDocument {
    pub(crate) fn new(title: String, scenes: Vec<Scene>) -> Self {
        Self { title, scenes }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn scenes(&self) -> &[Scene] {
        &self.scenes
    }

    /// Number of scenes that carry an image.
    pub fn illustrated_count(&self) -> usize {
        self.scenes.iter().filter(|s| s.image.is_some()).count()
    }

    /// Reconstruct the annotated text by concatenating every heading and body.
    pub fn annotated_text(&self) -> String {
        self.scenes
            .iter()
            .map(|s| s.heading_markup() + &s.body)
            .collect()
    }
}

// ── Run results ──────────────────────────────────────────────────────────

/// Statistics for one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenplayStats {
    pub total_scenes: usize,
    pub eligible_scenes: usize,
    pub selected_scenes: usize,
    pub illustrated_scenes: usize,
    pub failed_images: usize,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub generation_duration_ms: u64,
    pub imaging_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Everything a run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenplayOutput {
    pub document: ScreenplayDocument,
    /// Raw text as returned by the text model (or supplied by the caller).
    pub script: String,
    pub stats: ScreenplayStats,
}

// ── Request/response schema ──────────────────────────────────────────────

/// Request body of a screenplay-generation endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryRequest {
    pub storyline: String,
}

/// One scene in the response schema; image fields are empty strings when the
/// scene has no image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptEntry {
    pub header: String,
    pub text: String,
    pub image_url: String,
    pub image_prompt: String,
}

/// Response body: one entry per scene, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptResponse {
    pub script: Vec<ScriptEntry>,
}

impl From<&ScreenplayDocument> for ScriptResponse {
    fn from(doc: &ScreenplayDocument) -> Self {
        let script = doc
            .scenes()
            .iter()
            .map(|scene| {
                let (image_url, image_prompt) = scene
                    .image
                    .as_ref()
                    .map(|img| (img.url.clone(), img.prompt.clone()))
                    .unwrap_or_default();
                ScriptEntry {
                    header: scene.heading_markup(),
                    text: scene.body.clone(),
                    image_url,
                    image_prompt,
                }
            })
            .collect();
        Self { script }
    }
}

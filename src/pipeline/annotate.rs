//! Annotation: classify every line of normalised text and style it.
//!
//! Classification happens once, per line, into a [`LineKind`]. Styling is a
//! projection of that classification ([`ScriptLine::styled`]), so a line is
//! never marked twice and the markers can always be stripped back off.
//!
//! ## Precedence
//!
//! 1. Heading: the line contains `INT.`, `EXT.`, `CUT TO:` or `FADE OUT:`.
//!    Only keyword-to-end-of-line is styled.
//! 2. Scene number: a line after the first that starts with `SCENE <digits>`
//!    (any case).
//! 3. Character cue: an inner line made only of uppercase letters and spaces,
//!    at least 3 characters once trimmed.
//! 4. Dialogue: the first non-blank line after a character cue.
//!
//! Anything uppercase standing on its own line is taken for a cue, shouted
//! dialogue and acronyms included. That heuristic is kept as is.

use crate::output::{LineKind, SceneKind, ScriptLine};
use once_cell::sync::Lazy;
use regex::Regex;

static RE_HEADING_KEYWORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(INT\.|EXT\.|CUT TO:|FADE OUT:)").unwrap());

static RE_SCENE_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^scene[ \t]+\d+").unwrap());

static RE_STYLE_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<span class="(?:scene-heading|scene-number|character|dialogue)">|</span>"#)
        .unwrap()
});

/// Find the first scene-boundary keyword in a line.
///
/// Returns the byte offset of the keyword and the scene kind it implies.
pub fn heading_keyword(line: &str) -> Option<(usize, SceneKind)> {
    let m = RE_HEADING_KEYWORD.find(line)?;
    let kind = match m.as_str() {
        "INT." => SceneKind::Interior,
        "EXT." => SceneKind::Exterior,
        _ => SceneKind::Transition,
    };
    Some((m.start(), kind))
}

fn is_character_cue(line: &str) -> bool {
    line.trim().len() >= 3 && line.chars().all(|c| c.is_ascii_uppercase() || c == ' ')
}

/// Classify each line of normalised text.
///
/// Lines are split on `\n` exactly, so joining the `text` of the result with
/// `\n` gives back the input. Empty input yields no lines.
pub fn classify_lines(normalized: &str) -> Vec<ScriptLine> {
    if normalized.is_empty() {
        return Vec::new();
    }

    let raw: Vec<&str> = normalized.split('\n').collect();
    let last = raw.len() - 1;
    let mut lines = Vec::with_capacity(raw.len());
    let mut awaiting_dialogue = false;

    for (i, text) in raw.iter().enumerate() {
        let (kind, style_from) = if let Some((pos, scene)) = heading_keyword(text) {
            (LineKind::Heading(scene), pos)
        } else if i > 0 && RE_SCENE_NUMBER.is_match(text) {
            (LineKind::SceneNumber, 0)
        } else if i > 0 && i < last && is_character_cue(text) {
            (LineKind::CharacterCue, 0)
        } else if text.trim().is_empty() {
            (LineKind::Blank, 0)
        } else if awaiting_dialogue {
            (LineKind::Dialogue, 0)
        } else {
            (LineKind::Action, 0)
        };

        awaiting_dialogue = match kind {
            LineKind::CharacterCue => true,
            LineKind::Blank => awaiting_dialogue,
            _ => false,
        };

        lines.push(ScriptLine {
            kind,
            text: (*text).to_string(),
            style_from,
        });
    }

    lines
}

/// Render classified lines as annotated text (styled lines joined by `\n`).
pub fn render_annotated(lines: &[ScriptLine]) -> String {
    lines
        .iter()
        .map(ScriptLine::styled)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Classify and style normalised text in one step.
pub fn annotate(normalized: &str) -> String {
    render_annotated(&classify_lines(normalized))
}

/// Remove every styling marker the annotator inserts.
pub fn strip_styling(annotated: &str) -> String {
    RE_STYLE_MARKER.replace_all(annotated, "").to_string()
}

//! Assembly: attach fetched images to their scenes and settle the title.

use crate::output::{Scene, SceneImage, ScreenplayDocument};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// `Title:`, `Story:` or `Name:` at the start of a line, in any case, with
/// optional Markdown decoration around the label.
static RE_TITLE_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^[ \t#>*_-]*(?:title|story|name)[ \t*_]*:[ \t*_]*(.+?)[ \t*_]*$").unwrap()
});

static RE_DECORATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^<>\n]*>|[*_]+").unwrap());

/// Find the screenplay title in raw model output.
///
/// The first labelled line with a non-empty value wins; its value is
/// title-cased. Falls back to `default` when no such line exists.
pub fn detect_title(raw: &str, default: &str) -> String {
    RE_TITLE_LINE
        .captures_iter(raw)
        .filter_map(|caps| caps.get(1))
        .map(|m| RE_DECORATION.replace_all(m.as_str(), "").trim().to_string())
        .find(|value| !value.is_empty())
        .map(|value| title_case(&value))
        .unwrap_or_else(|| default.to_string())
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Build the final document from ordered scenes and position-indexed images.
///
/// `images[i]` belongs to the scene at position `i`. Missing or surplus slots
/// are ignored.
pub fn assemble(title: String, scenes: Vec<Scene>, images: Vec<Option<SceneImage>>) -> ScreenplayDocument {
    let mut slots = images.into_iter();
    let scenes: Vec<Scene> = scenes
        .into_iter()
        .map(|mut scene| {
            scene.image = slots.next().flatten();
            scene
        })
        .collect();

    debug!(
        "Assembled '{}': {} scenes, {} illustrated",
        title,
        scenes.len(),
        scenes.iter().filter(|s| s.image.is_some()).count()
    );
    ScreenplayDocument::new(title, scenes)
}

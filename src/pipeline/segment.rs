//! Segmentation: split classified lines into scenes at every heading.
//!
//! A scene runs from its heading line up to (not including) the next heading
//! line. Whatever precedes the first heading, usually the title block, is
//! kept as a leading [`SceneKind::Unclassified`] scene with no heading.
//!
//! Coverage is exact: concatenating `heading_markup() + body` over all scenes
//! reproduces the annotated text byte for byte. The line break in front of a
//! heading belongs to the body of the scene before it.

use crate::output::{LineKind, Scene, SceneKind, ScriptLine};
use tracing::debug;

/// Split annotated lines into ordered scenes.
///
/// With no heading anywhere (including empty input) the result is a single
/// unclassified scene spanning everything.
pub fn segment(lines: &[ScriptLine]) -> Vec<Scene> {
    let heading_starts: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, l)| matches!(l.kind, LineKind::Heading(_)))
        .map(|(i, _)| i)
        .collect();

    let mut starts = Vec::with_capacity(heading_starts.len() + 1);
    if heading_starts.first() != Some(&0) {
        starts.push(0);
    }
    starts.extend(heading_starts);

    let scenes: Vec<Scene> = starts
        .iter()
        .enumerate()
        .map(|(index, &start)| {
            let end = starts.get(index + 1).copied().unwrap_or(lines.len());
            build_scene(index, lines, start, end)
        })
        .collect();

    debug!(
        "Segmented {} lines into {} scenes",
        lines.len(),
        scenes.len()
    );
    scenes
}

fn build_scene(index: usize, lines: &[ScriptLine], start: usize, end: usize) -> Scene {
    let (kind, heading, body_start) = match lines.get(start) {
        Some(line) if start < end => match line.kind {
            LineKind::Heading(kind) => (kind, Some(line.clone()), start + 1),
            _ => (SceneKind::Unclassified, None, start),
        },
        _ => (SceneKind::Unclassified, None, start),
    };

    let body_lines = &lines[body_start..end];
    let mut body = String::new();
    for (i, line) in body_lines.iter().enumerate() {
        if heading.is_some() || i > 0 {
            body.push('\n');
        }
        body.push_str(&line.styled());
    }
    if end < lines.len() {
        body.push('\n');
    }

    Scene {
        index,
        kind,
        heading,
        lines: body_lines.to_vec(),
        body,
        image: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::annotate::{classify_lines, render_annotated};

    fn scenes_of(text: &str) -> (Vec<ScriptLine>, Vec<Scene>) {
        let lines = classify_lines(text);
        let scenes = segment(&lines);
        (lines, scenes)
    }

    fn concat(scenes: &[Scene]) -> String {
        scenes
            .iter()
            .map(|s| s.heading_markup() + &s.body)
            .collect()
    }

    #[test]
    fn preamble_becomes_unclassified_scene() {
        let (_, scenes) = scenes_of("Title: Dawn\n\nINT. BARN - DAY\nHay.");
        assert_eq!(scenes.len(), 2);
        assert_eq!(scenes[0].kind, SceneKind::Unclassified);
        assert_eq!(scenes[0].heading_text(), "");
        assert_eq!(scenes[0].body, "Title: Dawn\n\n");
        assert_eq!(scenes[1].kind, SceneKind::Interior);
        assert_eq!(scenes[1].heading_text(), "INT. BARN - DAY");
        assert_eq!(scenes[1].body, "\nHay.");
    }

    #[test]
    fn starts_with_heading_has_no_preamble() {
        let (_, scenes) = scenes_of("EXT. FIELD - DAY\nWind.\nCUT TO:\nFADE OUT:");
        let kinds: Vec<SceneKind> = scenes.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                SceneKind::Exterior,
                SceneKind::Transition,
                SceneKind::Transition
            ]
        );
        assert_eq!(scenes[1].body, "\n");
        assert_eq!(scenes[2].body, "");
    }

    #[test]
    fn no_headings_single_unclassified_scene() {
        let (_, scenes) = scenes_of("Once upon a time.\n\nThe end.");
        assert_eq!(scenes.len(), 1);
        assert_eq!(scenes[0].kind, SceneKind::Unclassified);
        assert!(scenes[0].heading.is_none());
        assert_eq!(scenes[0].body, "Once upon a time.\n\nThe end.");
    }

    #[test]
    fn empty_input_single_empty_scene() {
        let (_, scenes) = scenes_of("");
        assert_eq!(scenes.len(), 1);
        assert_eq!(scenes[0].kind, SceneKind::Unclassified);
        assert_eq!(scenes[0].body, "");
        assert!(scenes[0].lines.is_empty());
    }

    #[test]
    fn duplicate_headings_stay_distinct() {
        let (_, scenes) = scenes_of("INT. ROOM - DAY\na\nINT. ROOM - DAY\nb");
        assert_eq!(scenes.len(), 2);
        assert_eq!(scenes[0].index, 0);
        assert_eq!(scenes[1].index, 1);
        assert_eq!(scenes[0].plain_body(), "a");
        assert_eq!(scenes[1].plain_body(), "b");
    }

    #[test]
    fn body_keeps_cue_and_dialogue_lines() {
        let (_, scenes) = scenes_of("INT. CAR - NIGHT\n\nJOHN\nDrive.\n");
        let kinds: Vec<LineKind> = scenes[0].lines.iter().map(|l| l.kind).collect();
        assert_eq!(
            kinds,
            vec![LineKind::Blank, LineKind::CharacterCue, LineKind::Dialogue, LineKind::Blank]
        );
    }

    #[test]
    fn coverage_reconstructs_annotated_text() {
        let inputs = [
            "",
            "just prose",
            "INT. A - DAY",
            "INT. A - DAY\n",
            "Preamble\nINT. A - DAY\nx\n\nEXT. B - NIGHT\n\nBOB\n\nHi.\nCUT TO:\n\nFADE OUT:",
            "Title: T\n\nSCENE 1\n1. INT. A - DAY\nx\nSCENE 2\n2. EXT. B - DAY\ny\n\n",
            "INT. X\nINT. X\nINT. X",
        ];
        for input in inputs {
            let (lines, scenes) = scenes_of(input);
            assert_eq!(
                concat(&scenes),
                render_annotated(&lines),
                "coverage broken for {input:?}"
            );
        }
    }
}

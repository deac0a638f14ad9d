//! Presentation: project an assembled document into HTML or plain text.
//!
//! Both renderers are pure functions of [`ScreenplayDocument`]; rendering the
//! same document twice gives the same bytes.

use crate::output::{LineKind, Scene, ScreenplayDocument, ScriptLine};

const STYLESHEET: &str = r#"body { font-family: "Courier Prime", "Courier New", monospace; max-width: 42em; margin: 2em auto; line-height: 1.4; color: #111; }
h1 { text-align: center; text-transform: uppercase; margin-bottom: 2em; }
section.scene { margin-bottom: 2em; }
h2.scene-heading { font-size: 1em; font-weight: bold; text-transform: uppercase; }
section.transition h2.scene-heading { text-align: right; }
figure { margin: 1em 0; }
figure img { max-width: 100%; }
p { margin: 0 0 0.4em 0; }
p.scene-number { font-weight: bold; }
p.character { margin: 1em 0 0 18em; text-transform: uppercase; }
p.dialogue { margin: 0 8em 0.6em 10em; }
p.blank { height: 0.6em; }"#;

/// Escape the five HTML-significant characters.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render a self-contained HTML document.
///
/// Each scene becomes a `<section>` classed by its kind, holding the heading,
/// the inlined image when there is one, and one paragraph per body line.
pub fn render_html(doc: &ScreenplayDocument) -> String {
    let title = escape_html(doc.title());
    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str(&format!("<title>{title}</title>\n"));
    html.push_str(&format!("<style>\n{STYLESHEET}\n</style>\n"));
    html.push_str("</head>\n<body>\n");
    html.push_str(&format!("<h1>{title}</h1>\n"));

    for scene in doc.scenes() {
        render_scene_html(&mut html, scene);
    }

    html.push_str("</body>\n</html>\n");
    html
}

fn render_scene_html(html: &mut String, scene: &Scene) {
    html.push_str(&format!(
        "<section class=\"scene {}\" id=\"scene-{}\">\n",
        scene.kind.as_str(),
        scene.index
    ));

    if let Some(ref heading) = scene.heading {
        html.push_str(&format!(
            "<h2 class=\"scene-heading\">{}</h2>\n",
            escape_html(heading.text.trim())
        ));
    }

    if let Some(ref image) = scene.image {
        html.push_str(&format!(
            "<figure><img src=\"{}\" alt=\"{}\"></figure>\n",
            escape_html(&image.url),
            escape_html(&image.prompt)
        ));
    }

    for line in &scene.lines {
        html.push_str(&line_html(line));
    }

    html.push_str("</section>\n");
}

fn line_html(line: &ScriptLine) -> String {
    if line.kind == LineKind::Blank {
        return String::new();
    }
    let class = line.kind.style_class().unwrap_or("action");
    format!("<p class=\"{class}\">{}</p>\n", escape_html(line.text.trim()))
}

/// Render unstyled screenplay text.
///
/// Scenes are separated by a blank line; the result ends with one newline.
pub fn render_plain_text(doc: &ScreenplayDocument) -> String {
    let blocks: Vec<String> = doc
        .scenes()
        .iter()
        .map(|scene| {
            let mut block = String::new();
            if let Some(ref heading) = scene.heading {
                block.push_str(heading.text.trim_end());
                block.push('\n');
            }
            block.push_str(&scene.plain_body());
            block.trim_matches('\n').to_string()
        })
        .filter(|b| !b.is_empty())
        .collect();

    let mut text = blocks.join("\n\n");
    text.push('\n');
    text
}

//! Normalisation: deterministic cleanup of model-generated screenplay text.
//!
//! Text models decorate screenplays with Markdown emphasis (`**INT. HOUSE**`),
//! stray HTML (`<br>`, `<b>`), Windows line endings, and runs of blank lines.
//! None of that carries structure the later stages rely on, so it is removed
//! here before any line is classified.
//!
//! ## Rule Order
//!
//! Tags are stripped until none remain, and before emphasis tokens, so that
//! neither a nested tag nor a removed `*` or `_` can leave a new tag behind.
//! Trailing whitespace is trimmed before blank
//! lines are collapsed so whitespace-only lines count as blank. With that
//! order a second pass finds nothing to do: [`normalize`] is idempotent.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply every normalisation rule to raw generated text.
///
/// Rules (applied in order):
/// 1. Normalise line endings (CRLF / CR → LF)
/// 2. Remove embedded markup tags (`<b>`, `</span>`, `<br/>`, …)
/// 3. Remove inline bold/italic tokens (`*`, `**`, `***`, `__`)
/// 4. Trim trailing whitespace per line
/// 5. Collapse 3+ consecutive line breaks down to 2
/// 6. Trim leading/trailing whitespace of the whole text
pub fn normalize(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = strip_markup_tags(&s);
    let s = strip_emphasis(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    s.trim().to_string()
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Remove embedded markup tags ──────────────────────────────────────

static RE_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^<>\n]*>").unwrap());

/// Repeats until no tag remains, since removing `<b>` from `<<b>>` leaves `<>`.
fn strip_markup_tags(input: &str) -> String {
    let mut s = input.to_string();
    while RE_TAG.is_match(&s) {
        s = RE_TAG.replace_all(&s, "").into_owned();
    }
    s
}

// ── Rule 3: Remove bold/italic tokens ────────────────────────────────────────
//
// Asterisks never carry meaning in screenplay text. Underscores only count as
// emphasis in runs of two or more, so `snake_case` survives.

static RE_UNDERSCORE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"_{2,}").unwrap());

fn strip_emphasis(input: &str) -> String {
    let s = input.replace('*', "");
    RE_UNDERSCORE_RUN.replace_all(&s, "").to_string()
}

// ── Rule 4: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .split('\n')
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 5: Collapse excessive blank lines ───────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").to_string()
}

// ── Tests ────────────────────────────────────────────────────────────────────

//! Prompts for the two text-model calls: idea → story and story → screenplay.
//!
//! The screenplay prompt asks for exactly the conventions the annotator
//! recognises (`INT.`/`EXT.` headings, uppercase character cues on their own
//! line, a `Title:` line). The parser still copes when a model drifts from
//! them; it just finds fewer structures.
//!
//! Callers can override either system prompt through
//! [`crate::config::ScreenplayConfig::story_prompt`] and
//! [`crate::config::ScreenplayConfig::script_prompt`].

/// System prompt for writing a short story from an idea.
pub const DEFAULT_STORY_PROMPT: &str = r#"You are a fiction writer. Write a creative short story based on the idea you are given.

Rules:
- Begin with a single line of the form "Title: <story title>"
- Write in plain prose, 400 to 900 words
- Give the main characters names and let them speak
- Keep locations concrete and visual; each one should be easy to picture
- Output ONLY the story, with no commentary before or after it"#;

/// System prompt for turning a story into a screenplay.
pub const DEFAULT_SCRIPT_PROMPT: &str = r#"You are a screenwriter. Convert the story you are given into a screenplay.

Follow these formatting rules precisely:

1. TITLE
   - The first line is "Title: <screenplay title>"

2. SCENE HEADINGS
   - Start every scene with a heading on its own line
   - Use "INT." for interior and "EXT." for exterior locations
   - Format: INT. LOCATION - TIME OF DAY

3. CHARACTERS AND DIALOGUE
   - Put the speaking character's name on its own line, in UPPERCASE
   - Put the dialogue on the next line, in normal sentence case
   - Leave a blank line before each character name

4. TRANSITIONS
   - Use "CUT TO:" between scenes where the story jumps
   - End the screenplay with "FADE OUT:"

5. OUTPUT FORMAT
   - Plain text only; do NOT use Markdown, bold, italics or code fences
   - Do NOT add commentary or explanations"#;

/// User message for story generation.
pub fn story_prompt(idea: &str) -> String {
    format!("Idea:\n\n{}", idea.trim())
}

/// User message for screenplay generation.
pub fn script_prompt(story: &str) -> String {
    format!("Story:\n\n{}", story.trim())
}

//! Pipeline stages for turning screenplay text into a structured document.
//!
//! Each submodule implements exactly one transformation step. All stages but
//! [`llm`] and [`imaging`] are synchronous pure functions.
//!
//! ## Data Flow
//!
//! ```text
//! llm ──▶ normalize ──▶ annotate ──▶ segment ──▶ select ──▶ imaging ──▶ assemble ──▶ render
//! (text)   (cleanup)    (classify)   (scenes)    (rng)     (concurrent)  (title)     (HTML/text)
//! ```
//!
//! 1. [`llm`]: idea → story → screenplay through the text model, with retry
//! 2. [`normalize`]: strip markup, fold line endings, collapse blank runs
//! 3. [`annotate`]: classify each line as heading, cue, dialogue, … and style it
//! 4. [`segment`]: split classified lines into scenes at each heading
//! 5. [`select`]: sample at most `max_images` interior/exterior scenes
//! 6. [`imaging`]: fetch images concurrently into position-indexed slots
//! 7. [`assemble`]: attach images, detect the title
//! 8. [`render`]: HTML and plain-text projections of the document

pub mod annotate;
pub mod assemble;
pub mod imaging;
pub mod llm;
pub mod normalize;
pub mod render;
pub mod segment;
pub mod select;

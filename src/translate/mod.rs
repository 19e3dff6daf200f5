use anyhow::Result;
use async_trait::async_trait;

pub mod gemini;

pub use gemini::GeminiClient;

/// Fixed instruction prompt for the translation model. The rules keep the
/// output usable as lyrics: paragraph-by-paragraph translation under each
/// original paragraph, no chatter around it.
pub const TRANSLATION_PROMPT: &str = "\
Translate the following song lyrics into Japanese.
Rules:
- If a paragraph is already in Japanese, output it unchanged.
- Keep the paragraph structure: after each original paragraph, write its Japanese translation.
- Ignore any leading summary or background text that appears before the lyrics themselves.
- Output only the lyrics and their translations, with no commentary, notes, or preamble.

Lyrics:
";

/// Machine translation of lyrics text. One call per song; failures are
/// plain errors the orchestrator reports, never something to cache.
#[async_trait]
pub trait TranslationSource: Send + Sync {
    async fn translate(&self, lyrics: &str) -> Result<String>;
}

/// Full prompt sent to the model for one song.
pub fn build_prompt(lyrics: &str) -> String {
    format!("{TRANSLATION_PROMPT}{lyrics}")
}

//! Instructions sent to generation services.

use vesper_core::{ContentKind, Source};

/// System instruction for the refinement providers.
pub const REFINE_INSTRUCTION: &str = "You are an editor for a devotional publication. \
Rewrite the draft you receive into a finished article. Respond with a single JSON object \
and nothing else, using exactly these keys: \
\"title\" (string), \"slug\" (lowercase words joined by hyphens), \
\"body\" (markdown string), \"summary\" (one or two sentences, or null), \
\"seo_title\" (at most 60 characters), \"seo_description\" (at most 160 characters).";

/// System instruction for web story scripts.
pub const STORY_INSTRUCTION: &str = "You write short visual web stories. \
Turn the material you receive into a story of 3 to 10 pages. Respond with a single JSON \
object and nothing else, using exactly these keys: \
\"title\" (string), \"slug\" (lowercase words joined by hyphens), \
\"summary\" (one sentence, or null), \
\"pages\" (array of objects with \"text\", at most 200 characters, \
and \"image_prompt\", a description of the page illustration).";

/// Default prefix applied to every image prompt.
pub const DEFAULT_IMAGE_STYLE: &str = "Soft, painterly illustration with natural light and a \
calm, reverent mood. Do not include any text, letters, logos or watermarks. \
No depictions of violence. Subject: ";

/// System instruction for the draft generator.
pub fn draft_instruction(kind: ContentKind) -> &'static str {
    match kind {
        ContentKind::Devotional => {
            "You are a devotional writer. Write a warm, reflective devotional of about \
             600 words on the Bible verse you receive. Explain its context, draw out one \
             central truth and close with a short prayer. Write in markdown."
        }
        ContentKind::Thematic => {
            "You are a Christian writer. Write an article of about 800 words on the theme \
             you receive, grounded in Scripture, with headings and concrete application. \
             Write in markdown."
        }
        ContentKind::Summary => {
            "You summarize articles for busy readers. Write a faithful summary of about \
             400 words of the article you receive, keeping its main argument and key facts. \
             Do not add opinions. Write in markdown."
        }
    }
}

/// User message for the draft generator.
pub fn draft_prompt(source: &Source, context: &str, language: &str) -> String {
    let subject = match source {
        Source::Verse(_) => "Bible verse",
        Source::Theme { .. } => "Theme",
        Source::Article(_) => "Article",
    };
    format!(
        "Language: {}\n\n{}:\n{}",
        language_name(language),
        subject,
        context
    )
}

/// User message for the refinement providers.
pub fn refine_prompt(draft: &str, language: &str) -> String {
    format!(
        "Write the article in {}.\n\nDraft:\n{}",
        language_name(language),
        draft
    )
}

/// User message for the story script providers.
pub fn story_prompt(draft: &str, language: &str) -> String {
    format!(
        "Write the story in {}. Each image prompt must describe a scene, not text.\n\nMaterial:\n{}",
        language_name(language),
        draft
    )
}

/// System instruction for translating one article into `language`.
pub fn translate_instruction(language: &str) -> String {
    format!(
        "You are a professional translator. Translate the JSON object you receive into {}. \
         Translate only the values of \"title\", \"summary\" and \"content\". \
         Keep markdown and HTML structure intact: do not translate tags, attributes, \
         link targets, code or image references. Respond with a single JSON object with \
         the same keys and nothing else.",
        language_name(language)
    )
}

/// English name for common language codes, the code itself otherwise.
pub fn language_name(code: &str) -> &str {
    match code {
        "en" => "English",
        "es" => "Spanish",
        "pt" => "Portuguese",
        "fr" => "French",
        "de" => "German",
        "it" => "Italian",
        other => other,
    }
}

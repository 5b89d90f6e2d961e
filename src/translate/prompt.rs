//! Prompt templates: pure functions mapping (file content, target language)
//! to the instruction string sent verbatim to the translation gateway.
//! Each template states the structural invariants the model must preserve;
//! the subtitle templates differ only in the content-safety contract.

use crate::lang::Language;

/// Template for flat `key=value` string files. Only right-hand values are
/// translated; keys, spacing and newlines must survive verbatim.
pub fn string_file(content: &str, target: Language) -> String {
    format!(
        "You are a professional translation engine.\n\
         Auto-detect the source language. Translate the RIGHT-HAND VALUES only in this `key=value` file into {target}.\n\
         Rules:\n\
         - Preserve key names (left side) exactly.\n\
         - Preserve format, spacing and newlines.\n\
         - Only translate the values.\n\
         Example:\n\
         hello_world=Hello World\n\
         -> hello_world=Translated Here\n\
         Now translate:\n{content}"
    )
}

/// Template for subtitle files in normal mode. Line numbers, timecodes and
/// inline formatting tags are untouchable.
pub fn subtitle(content: &str, target: Language) -> String {
    format!(
        "You are a subtitle translation engine.\n\
         Translate ONLY the spoken/dialogue text into {target}.\n\
         DO NOT change:\n\
         - Line numbers\n\
         - Timecodes\n\
         - Formatting / tags like <i>, <b>, {{\\i1}}, etc.\n\
         Preserve line breaks and spacing exactly.\n\
         Translate faithfully.\n\
         Now translate:\n{content}"
    )
}

/// Template for subtitle files in adult-safe mode: same structural contract
/// as `subtitle`, plus the policy constraint that existing explicit dialogue
/// is translated faithfully but never amplified or newly introduced.
pub fn subtitle_adult_safe(content: &str, target: Language) -> String {
    format!(
        "You are a subtitle translation assistant.\n\
         The subtitle may contain adult or explicit content. This is allowed AS LONG AS YOU DO NOT ADD, EXPAND, OR INTENSIFY SEXUAL CONTENT.\n\
         Translate ONLY the existing dialogue into {target}.\n\
         DO NOT:\n\
         - Add new sexual details\n\
         - Change tone to be more sexual\n\
         Preserve structure, line numbers, timecodes and tags.\n\
         Now translate:\n{content}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "1\n00:00:01,000 --> 00:00:02,000\nHello there\n";

    #[test]
    fn templates_end_with_the_content() {
        for rendered in [
            string_file("greeting=Hello\n", Language::Japanese),
            subtitle(SAMPLE, Language::Japanese),
            subtitle_adult_safe(SAMPLE, Language::Japanese),
        ] {
            assert!(rendered.contains("Now translate:\n"));
            let (_, tail) = rendered.split_once("Now translate:\n").unwrap();
            assert!(tail == "greeting=Hello\n" || tail == SAMPLE);
        }
    }

    #[test]
    fn templates_name_the_target_language() {
        assert!(string_file("k=v", Language::Burmese).contains("Burmese"));
        assert!(subtitle(SAMPLE, Language::Korean).contains("Korean"));
        assert!(subtitle_adult_safe(SAMPLE, Language::Thai).contains("Thai"));
    }

    #[test]
    fn adult_safe_adds_policy_not_structure_changes() {
        let normal = subtitle(SAMPLE, Language::English);
        let safe = subtitle_adult_safe(SAMPLE, Language::English);
        assert_ne!(normal, safe);
        assert!(safe.contains("DO NOT ADD, EXPAND, OR INTENSIFY"));
        assert!(safe.contains("timecodes"));
    }
}

//! Structural inspection of translatable files: subtitle timecode lines,
//! string-file key names, and source-language detection. Inspection is
//! advisory: the service logs markers lost in translation, it never fails
//! a job over them.

use std::collections::HashSet;

use regex::Regex;

/// Compiled patterns for the structural markers each format carries.
pub struct StructureInspector {
    /// SRT uses `,` before the millisecond part, VTT uses `.`.
    timecode: Regex,
    /// Left-hand side of a `key=value` line.
    key: Regex,
}

impl StructureInspector {
    pub fn new() -> Self {
        Self {
            timecode: Regex::new(
                r"(?m)^\s*\d{2}:\d{2}:\d{2}[,.]\d{3}\s*-->\s*\d{2}:\d{2}:\d{2}[,.]\d{3}.*$",
            )
            .expect("timecode pattern is valid"),
            key: Regex::new(r"(?m)^([^=\r\n]+)=").expect("key pattern is valid"),
        }
    }

    /// Timecode lines exactly as they appear in `text`.
    pub fn timecode_lines<'t>(&self, text: &'t str) -> Vec<&'t str> {
        self.timecode.find_iter(text).map(|m| m.as_str()).collect()
    }

    /// Key names (left of `=`) exactly as they appear in `text`.
    pub fn key_names<'t>(&self, text: &'t str) -> Vec<&'t str> {
        self.key
            .captures_iter(text)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str())
            .collect()
    }

    /// Timecode lines present in `input` but absent from `output`.
    pub fn lost_timecodes(&self, input: &str, output: &str) -> Vec<String> {
        let kept: HashSet<&str> = self.timecode_lines(output).into_iter().collect();
        self.timecode_lines(input)
            .into_iter()
            .filter(|line| !kept.contains(line))
            .map(str::to_string)
            .collect()
    }

    /// Key names present in `input` but absent from `output`.
    pub fn lost_keys(&self, input: &str, output: &str) -> Vec<String> {
        let kept: HashSet<&str> = self.key_names(output).into_iter().collect();
        self.key_names(input)
            .into_iter()
            .filter(|name| !kept.contains(name))
            .map(str::to_string)
            .collect()
    }
}

impl Default for StructureInspector {
    fn default() -> Self {
        Self::new()
    }
}

/// Detect the dominant language of `text` using whatlang.
/// Maps onto the menu language codes where possible, "other" otherwise;
/// None when detection is unreliable. Logging only; the prompt still asks
/// the model to auto-detect.
pub fn detect_language(text: &str) -> Option<&'static str> {
    let info = whatlang::detect(text)?;
    if !info.is_reliable() {
        return None;
    }
    Some(match info.lang() {
        whatlang::Lang::Mya => "my",
        whatlang::Lang::Eng => "en",
        whatlang::Lang::Jpn => "ja",
        whatlang::Lang::Tha => "th",
        whatlang::Lang::Kor => "ko",
        whatlang::Lang::Cmn => "zh",
        _ => "other",
    })
}

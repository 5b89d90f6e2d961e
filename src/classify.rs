//! File-type classification by extension.
//! Governs both what is extracted for batch translation and what
//! single-file uploads are accepted.

/// Handling category for an uploaded or extracted file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileCategory {
    /// Timed-caption file: translatable dialogue interleaved with markup.
    Subtitle,
    /// Flat `key=value` text file: only values are translatable.
    StringFile,
    /// Compressed container processed as a batch.
    Archive,
    /// Everything else.
    Unsupported,
}

impl FileCategory {
    /// True for categories whose content goes through the gateway.
    pub fn is_translatable(self) -> bool {
        matches!(self, FileCategory::Subtitle | FileCategory::StringFile)
    }
}

const SUBTITLE_EXTS: [&str; 3] = ["srt", "vtt", "ass"];
const STRING_EXTS: [&str; 1] = ["str"];
const ARCHIVE_EXTS: [&str; 1] = ["zip"];

/// Classify a file name by its extension, case-insensitively.
/// Total: every input maps to exactly one category, default Unsupported.
pub fn classify(file_name: &str) -> FileCategory {
    let ext = match std::path::Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
    {
        Some(ext) => ext.to_ascii_lowercase(),
        None => return FileCategory::Unsupported,
    };

    if SUBTITLE_EXTS.contains(&ext.as_str()) {
        FileCategory::Subtitle
    } else if STRING_EXTS.contains(&ext.as_str()) {
        FileCategory::StringFile
    } else if ARCHIVE_EXTS.contains(&ext.as_str()) {
        FileCategory::Archive
    } else {
        FileCategory::Unsupported
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subtitle_extensions() {
        assert_eq!(classify("movie.srt"), FileCategory::Subtitle);
        assert_eq!(classify("movie.VTT"), FileCategory::Subtitle);
        assert_eq!(classify("ep01.ass"), FileCategory::Subtitle);
    }

    #[test]
    fn string_and_archive_extensions() {
        assert_eq!(classify("ui.str"), FileCategory::StringFile);
        assert_eq!(classify("pack.zip"), FileCategory::Archive);
        assert_eq!(classify("PACK.ZIP"), FileCategory::Archive);
    }

    #[test]
    fn unknown_or_missing_extension_is_unsupported() {
        assert_eq!(classify("image.png"), FileCategory::Unsupported);
        assert_eq!(classify("noext"), FileCategory::Unsupported);
        assert_eq!(classify(""), FileCategory::Unsupported);
        assert_eq!(classify("trailing."), FileCategory::Unsupported);
    }

    #[test]
    fn nested_paths_use_final_extension() {
        assert_eq!(classify("subs/season1/ep.srt"), FileCategory::Subtitle);
        assert_eq!(classify("archive.tar.zip"), FileCategory::Archive);
    }
}

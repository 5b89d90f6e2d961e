//! Fixed target-language enumeration with chat callback codes.

use serde::Serialize;

/// Languages offered in the chat language menu.
/// Codes are the short forms carried in button callback payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Language {
    Burmese,
    English,
    Japanese,
    Thai,
    Korean,
    Chinese,
}

impl Language {
    /// Menu order. Extend here to offer more targets.
    pub const ALL: [Language; 6] = [
        Language::Burmese,
        Language::English,
        Language::Japanese,
        Language::Thai,
        Language::Korean,
        Language::Chinese,
    ];

    /// Short code used in callback payloads.
    pub fn code(self) -> &'static str {
        match self {
            Language::Burmese => "my",
            Language::English => "en",
            Language::Japanese => "ja",
            Language::Thai => "th",
            Language::Korean => "ko",
            Language::Chinese => "zh",
        }
    }

    /// Human-readable name, used for menu labels and prompts.
    pub fn name(self) -> &'static str {
        match self {
            Language::Burmese => "Burmese",
            Language::English => "English",
            Language::Japanese => "Japanese",
            Language::Thai => "Thai",
            Language::Korean => "Korean",
            Language::Chinese => "Chinese",
        }
    }

    /// Resolve a callback code. Unknown codes yield None.
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|l| l.code() == code)
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

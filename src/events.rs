//! Inbound chat events and button callback payloads.
//! Payloads travel on the wire as `lang_<code>` / `mode_<normal|adult>_<code>`
//! strings; they are decoded exactly once here, at the boundary, and
//! malformed input fails closed with a generic invalid-selection error.

use crate::delivery::MenuButton;
use crate::job::TranslateMode;
use crate::lang::Language;
use crate::session::UserId;

/// A discrete event forwarded from the chat platform.
#[derive(Debug, Clone)]
pub enum InboundEvent {
    /// A document upload carrying a file name and its content.
    Document {
        user_id: UserId,
        file_name: String,
        content: Vec<u8>,
    },
    /// A button tap carrying an opaque callback payload.
    Callback { user_id: UserId, data: String },
}

/// Structured intent decoded from a button callback payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackPayload {
    /// Target language chosen from the language menu.
    Language(Language),
    /// Mode chosen from the mode menu, tagged with the earlier language pick.
    Mode(TranslateMode, Language),
}

/// Malformed or unknown callback payload. Deliberately carries no detail:
/// the user-visible reaction is the same generic message either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidSelection;

impl std::fmt::Display for InvalidSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("invalid selection")
    }
}

impl CallbackPayload {
    /// Decode a wire payload. Fails closed: unknown prefixes, unknown
    /// languages or modes, and mode payloads with fewer than three parts
    /// all map to `InvalidSelection`.
    pub fn decode(data: &str) -> Result<Self, InvalidSelection> {
        if let Some(code) = data.strip_prefix("lang_") {
            return Language::from_code(code)
                .map(CallbackPayload::Language)
                .ok_or(InvalidSelection);
        }
        if let Some(rest) = data.strip_prefix("mode_") {
            let (mode, code) = rest.split_once('_').ok_or(InvalidSelection)?;
            let mode = TranslateMode::from_wire(mode).ok_or(InvalidSelection)?;
            let lang = Language::from_code(code).ok_or(InvalidSelection)?;
            return Ok(CallbackPayload::Mode(mode, lang));
        }
        Err(InvalidSelection)
    }

    /// Wire encoding, the inverse of `decode`.
    pub fn encode(&self) -> String {
        match self {
            CallbackPayload::Language(lang) => format!("lang_{}", lang.code()),
            CallbackPayload::Mode(mode, lang) => {
                format!("mode_{}_{}", mode.wire(), lang.code())
            }
        }
    }
}

/// One button per entry in the fixed language enumeration.
pub fn language_menu() -> Vec<MenuButton> {
    Language::ALL
        .iter()
        .map(|lang| MenuButton {
            label: lang.name().to_string(),
            data: CallbackPayload::Language(*lang).encode(),
        })
        .collect()
}

/// Two mode buttons, each carrying the already-chosen language.
pub fn mode_menu(lang: Language) -> Vec<MenuButton> {
    [TranslateMode::Normal, TranslateMode::AdultSafe]
        .iter()
        .map(|mode| MenuButton {
            label: mode.label().to_string(),
            data: CallbackPayload::Mode(*mode, lang).encode(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_language_payload() {
        assert_eq!(
            CallbackPayload::decode("lang_ja"),
            Ok(CallbackPayload::Language(Language::Japanese))
        );
    }

    #[test]
    fn decode_mode_payloads() {
        assert_eq!(
            CallbackPayload::decode("mode_normal_en"),
            Ok(CallbackPayload::Mode(TranslateMode::Normal, Language::English))
        );
        assert_eq!(
            CallbackPayload::decode("mode_adult_ko"),
            Ok(CallbackPayload::Mode(TranslateMode::AdultSafe, Language::Korean))
        );
    }

    #[test]
    fn malformed_payloads_fail_closed() {
        for data in [
            "",
            "lang_",
            "lang_xx",
            "mode_normal",
            "mode__en",
            "mode_spicy_en",
            "mode_adult_xx",
            "unknown_en",
        ] {
            assert_eq!(CallbackPayload::decode(data), Err(InvalidSelection), "{data}");
        }
    }

    #[test]
    fn encode_decode_round_trip() {
        for lang in Language::ALL {
            let p = CallbackPayload::Language(lang);
            assert_eq!(CallbackPayload::decode(&p.encode()), Ok(p));
            for mode in [TranslateMode::Normal, TranslateMode::AdultSafe] {
                let p = CallbackPayload::Mode(mode, lang);
                assert_eq!(CallbackPayload::decode(&p.encode()), Ok(p));
            }
        }
    }

    #[test]
    fn menus_carry_decodable_payloads() {
        for button in language_menu() {
            assert!(CallbackPayload::decode(&button.data).is_ok());
        }
        let buttons = mode_menu(Language::Thai);
        assert_eq!(buttons.len(), 2);
        for button in buttons {
            assert!(matches!(
                CallbackPayload::decode(&button.data),
                Ok(CallbackPayload::Mode(_, Language::Thai))
            ));
        }
    }
}

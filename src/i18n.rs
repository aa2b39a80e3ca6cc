//! User-facing messages and text direction.

use serde::{Deserialize, Serialize};

/// Locales rendered right-to-left.
const RTL_LOCALES: &[&str] = &["ar", "ku", "ckb", "fa", "ur", "he", "arc", "az", "dv", "ff", "ha"];

/// Message identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKey {
    SelectOption,
    Search,
    Loading,
    LoadingMore,
    Searching,
    NoResults,
    NoResultsFor,
    NoOptions,
    Clear,
    Remove,
    Selected,
    ScrollMore,
    TypeToSearch,
    MinChars,
}

impl MessageKey {
    pub const ALL: [MessageKey; 14] = [
        MessageKey::SelectOption,
        MessageKey::Search,
        MessageKey::Loading,
        MessageKey::LoadingMore,
        MessageKey::Searching,
        MessageKey::NoResults,
        MessageKey::NoResultsFor,
        MessageKey::NoOptions,
        MessageKey::Clear,
        MessageKey::Remove,
        MessageKey::Selected,
        MessageKey::ScrollMore,
        MessageKey::TypeToSearch,
        MessageKey::MinChars,
    ];

    fn english(self) -> &'static str {
        match self {
            MessageKey::SelectOption => "Select an option",
            MessageKey::Search => "Search...",
            MessageKey::Loading => "Loading...",
            MessageKey::LoadingMore => "Loading more...",
            MessageKey::Searching => "Searching...",
            MessageKey::NoResults => "No results found",
            MessageKey::NoResultsFor => "No results found for",
            MessageKey::NoOptions => "No options available",
            MessageKey::Clear => "Clear",
            MessageKey::Remove => "Remove",
            MessageKey::Selected => "Selected",
            MessageKey::ScrollMore => "Scroll for more...",
            MessageKey::TypeToSearch => "Type to search...",
            MessageKey::MinChars => "Type at least :min characters to search",
        }
    }
}

/// Look up a message for a locale.
///
/// Only English ships with the crate; other locales fall back to it.
pub fn message(_locale: &str, key: MessageKey) -> &'static str {
    key.english()
}

/// The minimum-length hint with `:min` substituted.
pub fn min_chars(locale: &str, min: usize) -> String {
    message(locale, MessageKey::MinChars).replace(":min", &min.to_string())
}

/// Writing direction of a locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextDirection {
    #[default]
    Ltr,
    Rtl,
}

impl TextDirection {
    /// Direction for a locale such as `ar`, `fa_IR` or `en-US`.
    pub fn for_locale(locale: &str) -> Self {
        let primary = locale
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        if RTL_LOCALES.contains(&primary.as_str()) {
            TextDirection::Rtl
        } else {
            TextDirection::Ltr
        }
    }

    pub fn is_rtl(self) -> bool {
        self == TextDirection::Rtl
    }

    /// Value for the HTML `dir` attribute.
    pub fn as_str(self) -> &'static str {
        match self {
            TextDirection::Ltr => "ltr",
            TextDirection::Rtl => "rtl",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_non_empty() {
        for key in MessageKey::ALL {
            assert!(!message("en", key).is_empty(), "{:?}", key);
        }
    }

    #[test]
    fn test_unknown_locale_falls_back() {
        assert_eq!(message("xx", MessageKey::NoResults), "No results found");
    }

    #[test]
    fn test_min_chars_substitution() {
        assert_eq!(min_chars("en", 3), "Type at least 3 characters to search");
    }

    #[test]
    fn test_rtl_locales() {
        assert!(TextDirection::for_locale("ar").is_rtl());
        assert!(TextDirection::for_locale("ckb").is_rtl());
        assert!(TextDirection::for_locale("fa_IR").is_rtl());
        assert_eq!(TextDirection::for_locale("en-US"), TextDirection::Ltr);
        assert_eq!(TextDirection::for_locale(""), TextDirection::Ltr);
        assert_eq!(TextDirection::Rtl.as_str(), "rtl");
    }

    #[test]
    fn test_message_key_serde() {
        let key: MessageKey = serde_json::from_str("\"no_results_for\"").unwrap();
        assert_eq!(key, MessageKey::NoResultsFor);
    }
}

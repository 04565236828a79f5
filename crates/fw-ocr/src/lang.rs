//! Language to script-family mapping.
//!
//! Subtitle tracks carry ISO 639 language codes (sometimes English names);
//! recognition models are trained per writing system. The mapping accepts
//! 639-1, 639-2 (both B and T where they differ), 639-3 and common English
//! names, all case-insensitively.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Writing systems with a trained recognition model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptFamily {
    Latin,
    Cjk,
    Korean,
    Cyrillic,
    Arabic,
    Devanagari,
    Thai,
    Tamil,
    Telugu,
}

impl ScriptFamily {
    /// Every supported family, in a stable order.
    pub const ALL: [ScriptFamily; 9] = [
        Self::Latin,
        Self::Cjk,
        Self::Korean,
        Self::Cyrillic,
        Self::Arabic,
        Self::Devanagari,
        Self::Thai,
        Self::Tamil,
        Self::Telugu,
    ];

    /// The families most subtitle tracks need; downloaded eagerly at
    /// startup.
    pub const COMMON: [ScriptFamily; 2] = [Self::Latin, Self::Cjk];

    /// Directory name under the model root.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Self::Latin => "latin",
            Self::Cjk => "cjk",
            Self::Korean => "korean",
            Self::Cyrillic => "cyrillic",
            Self::Arabic => "arabic",
            Self::Devanagari => "devanagari",
            Self::Thai => "thai",
            Self::Tamil => "tamil",
            Self::Telugu => "telugu",
        }
    }

    /// Map a language code or English name to its script family.
    ///
    /// Returns `None` for unsupported or unrecognized languages.
    pub fn from_language(language: &str) -> Option<Self> {
        let lang = language.trim().to_ascii_lowercase();
        let family = match lang.as_str() {
            // Latin-script European and South-East Asian languages.
            "en" | "eng" | "english" | "fr" | "fre" | "fra" | "french" | "de" | "ger"
            | "deu" | "german" | "es" | "spa" | "spanish" | "it" | "ita" | "italian"
            | "pt" | "por" | "portuguese" | "nl" | "dut" | "nld" | "dutch" | "sv"
            | "swe" | "swedish" | "da" | "dan" | "danish" | "no" | "nor" | "nob"
            | "norwegian" | "fi" | "fin" | "finnish" | "pl" | "pol" | "polish" | "cs"
            | "cze" | "ces" | "czech" | "sk" | "slo" | "slk" | "slovak" | "hu" | "hun"
            | "hungarian" | "ro" | "rum" | "ron" | "romanian" | "hr" | "hrv"
            | "croatian" | "sl" | "slv" | "slovenian" | "et" | "est" | "estonian"
            | "lv" | "lav" | "latvian" | "lt" | "lit" | "lithuanian" | "tr" | "tur"
            | "turkish" | "vi" | "vie" | "vietnamese" | "id" | "ind" | "indonesian"
            | "ms" | "may" | "msa" | "malay" | "ca" | "cat" | "catalan" | "eu"
            | "baq" | "eus" | "basque" | "gl" | "glg" | "galician" | "is" | "ice"
            | "isl" | "icelandic" | "sq" | "alb" | "sqi" | "albanian" => Self::Latin,

            // Chinese and Japanese share the CJK recognition model.
            "zh" | "chi" | "zho" | "cmn" | "yue" | "chinese" | "ja" | "jpn"
            | "japanese" => Self::Cjk,

            "ko" | "kor" | "korean" => Self::Korean,

            "ru" | "rus" | "russian" | "uk" | "ukr" | "ukrainian" | "be" | "bel"
            | "belarusian" | "bg" | "bul" | "bulgarian" | "sr" | "srp" | "serbian"
            | "mk" | "mac" | "mkd" | "macedonian" | "mn" | "mon" | "mongolian"
            | "kk" | "kaz" | "kazakh" => Self::Cyrillic,

            "ar" | "ara" | "arabic" | "fa" | "per" | "fas" | "persian" | "farsi"
            | "ur" | "urd" | "urdu" | "ps" | "pus" | "pashto" | "ku" | "kur"
            | "kurdish" => Self::Arabic,

            "hi" | "hin" | "hindi" | "mr" | "mar" | "marathi" | "ne" | "nep"
            | "nepali" | "sa" | "san" | "sanskrit" => Self::Devanagari,

            "th" | "tha" | "thai" => Self::Thai,
            "ta" | "tam" | "tamil" => Self::Tamil,
            "te" | "tel" | "telugu" => Self::Telugu,

            _ => return None,
        };
        Some(family)
    }
}

impl fmt::Display for ScriptFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.dir_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iso_639_variants_map() {
        assert_eq!(ScriptFamily::from_language("en"), Some(ScriptFamily::Latin));
        assert_eq!(ScriptFamily::from_language("eng"), Some(ScriptFamily::Latin));
        assert_eq!(ScriptFamily::from_language("deu"), Some(ScriptFamily::Latin));
        assert_eq!(ScriptFamily::from_language("ger"), Some(ScriptFamily::Latin));
        assert_eq!(ScriptFamily::from_language("zho"), Some(ScriptFamily::Cjk));
        assert_eq!(ScriptFamily::from_language("jpn"), Some(ScriptFamily::Cjk));
        assert_eq!(ScriptFamily::from_language("kor"), Some(ScriptFamily::Korean));
        assert_eq!(
            ScriptFamily::from_language("ukr"),
            Some(ScriptFamily::Cyrillic)
        );
    }

    #[test]
    fn english_names_and_case() {
        assert_eq!(
            ScriptFamily::from_language("Japanese"),
            Some(ScriptFamily::Cjk)
        );
        assert_eq!(
            ScriptFamily::from_language("RUSSIAN"),
            Some(ScriptFamily::Cyrillic)
        );
        assert_eq!(
            ScriptFamily::from_language(" thai "),
            Some(ScriptFamily::Thai)
        );
    }

    #[test]
    fn unsupported_is_none() {
        assert_eq!(ScriptFamily::from_language("tlh"), None);
        assert_eq!(ScriptFamily::from_language(""), None);
    }

    #[test]
    fn dir_names_are_distinct() {
        let mut names: Vec<&str> = ScriptFamily::ALL.iter().map(|f| f.dir_name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), ScriptFamily::ALL.len());
    }
}

use icu_locid::Locale;
use std::str::FromStr;

use crate::error::CatalogError;

/// Plural-form selection rule for a target language.
///
/// The variants follow the numerus form order Qt Linguist writes into
/// `.ts` files, which is not the CLDR category order.
/// （目標語言的複數形式選擇規則，順序依照 Qt Linguist 而非 CLDR。）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumerusRule {
    /// One form for every count (Japanese, Chinese, Korean, ...).
    Single,
    /// `n == 1` and everything else (English, German, ...).
    OneOther,
    /// `n <= 1` and everything else (French, Brazilian Portuguese, ...).
    ZeroOneOther,
    /// Russian-style: 1, 21, 31 / 2-4, 22-24 / everything else.
    Slavic,
    /// 1 / 2-4, 22-24 except 12-14 / everything else.
    Polish,
    /// 1 / 2-4 / everything else.
    Czech,
}

const SINGLE: &[&str] = &[
    "ja", "zh", "ko", "vi", "th", "id", "ms", "lo", "km", "my", "ka", "bo", "dz",
];
const ZERO_ONE_OTHER: &[&str] = &["fr", "fil", "tl", "ln", "ti", "wa", "ak", "am", "oc"];
const SLAVIC: &[&str] = &["ru", "uk", "be", "sr", "hr", "bs", "sh"];
const POLISH: &[&str] = &["pl"];
const CZECH: &[&str] = &["cs", "sk"];

impl NumerusRule {
    /// Resolves the rule for a Qt (`de_DE`) or BCP-47 (`de-DE`) tag.
    /// Languages without an entry use [`NumerusRule::OneOther`].
    /// （依 Qt 或 BCP-47 語言標籤解析規則；未收錄的語言採用 one/other。）
    pub fn for_language(tag: &str) -> Result<Self, CatalogError> {
        let normalized = tag.replace('_', "-");
        let locale =
            Locale::from_str(&normalized).map_err(|error| CatalogError::InvalidLanguage {
                tag: tag.to_string(),
                error,
            })?;
        let language = locale.id.language.as_str();
        let region = locale.id.region.as_ref().map(|region| region.as_str());

        let rule = if language == "pt" && region == Some("BR") {
            Self::ZeroOneOther
        } else if SINGLE.contains(&language) {
            Self::Single
        } else if ZERO_ONE_OTHER.contains(&language) {
            Self::ZeroOneOther
        } else if SLAVIC.contains(&language) {
            Self::Slavic
        } else if POLISH.contains(&language) {
            Self::Polish
        } else if CZECH.contains(&language) {
            Self::Czech
        } else {
            Self::OneOther
        };
        Ok(rule)
    }

    /// Number of numerus forms a complete translation carries.
    /// （完整翻譯應具備的複數形式數量。）
    pub fn form_count(self) -> usize {
        match self {
            Self::Single => 1,
            Self::OneOther | Self::ZeroOneOther => 2,
            Self::Slavic | Self::Polish | Self::Czech => 3,
        }
    }

    /// Index of the numerus form used for `count`.
    /// （回傳 `count` 對應的複數形式索引。）
    pub fn form_index(self, count: u64) -> usize {
        let last_two = count % 100;
        let last = count % 10;
        match self {
            Self::Single => 0,
            Self::OneOther => usize::from(count != 1),
            Self::ZeroOneOther => usize::from(count > 1),
            Self::Slavic => {
                if last == 1 && last_two != 11 {
                    0
                } else if (2..=4).contains(&last) && !(12..=14).contains(&last_two) {
                    1
                } else {
                    2
                }
            }
            Self::Polish => {
                if count == 1 {
                    0
                } else if (2..=4).contains(&last) && !(12..=14).contains(&last_two) {
                    1
                } else {
                    2
                }
            }
            Self::Czech => match count {
                1 => 0,
                2..=4 => 1,
                _ => 2,
            },
        }
    }
}

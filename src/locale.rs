use std::str::FromStr;

/// Wowhead locale. English targets the base `creature_template` table;
/// every other locale targets `locales_creature` with `_locN`-suffixed
/// text columns, matching the TrinityCore locale column layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locale {
    English,
    French,
    German,
    Spanish,
    Russian,
}

impl Locale {
    /// Subdomain the pages are fetched from.
    pub fn subdomain(self) -> &'static str {
        match self {
            Locale::English => "www",
            Locale::French => "fr",
            Locale::German => "de",
            Locale::Spanish => "es",
            Locale::Russian => "ru",
        }
    }

    /// Column suffix for locale tables; `None` for the base table.
    pub fn column_suffix(self) -> Option<&'static str> {
        match self {
            Locale::English => None,
            Locale::French => Some("loc2"),
            Locale::German => Some("loc3"),
            Locale::Spanish => Some("loc6"),
            Locale::Russian => Some("loc8"),
        }
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, String> {
        match s.to_ascii_lowercase().as_str() {
            "en" | "english" => Ok(Locale::English),
            "fr" | "french" => Ok(Locale::French),
            "de" | "german" => Ok(Locale::German),
            "es" | "spanish" => Ok(Locale::Spanish),
            "ru" | "russian" => Ok(Locale::Russian),
            other => Err(format!("unknown locale: {other:?} (en/fr/de/es/ru)")),
        }
    }
}

use chrono::{DateTime, Utc};

/// Maximum number of characters of a failure message kept on a favorite entry.
pub const FAILURE_MESSAGE_MAX_CHARS: usize = 30;

/// Point-in-time weather reading for one city, built from a single provider response.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherSnapshot {
    /// Canonical city name as reported by the provider.
    pub name: String,
    pub temperature_c: f64,
    pub humidity_pct: Option<u8>,
    pub wind_speed_mps: f64,
    /// Short condition group, e.g. "Rain" or "Clouds".
    pub condition_main: String,
    pub condition_description: String,
    pub icon_id: String,
    pub observed_at: Option<DateTime<Utc>>,
}

impl WeatherSnapshot {
    pub fn condition_kind(&self) -> ConditionKind {
        ConditionKind::classify(&self.condition_main)
    }
}

/// Weather attached to a favorite once its fetch has settled.
#[derive(Debug, Clone, PartialEq)]
pub enum FavoriteWeather {
    Loaded(WeatherSnapshot),
    Failed { message: String },
}

impl FavoriteWeather {
    /// Build a failure record, keeping at most [`FAILURE_MESSAGE_MAX_CHARS`] characters.
    pub fn failed(message: impl AsRef<str>) -> Self {
        FavoriteWeather::Failed { message: truncate_chars(message.as_ref(), FAILURE_MESSAGE_MAX_CHARS) }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, FavoriteWeather::Failed { .. })
    }

    pub fn snapshot(&self) -> Option<&WeatherSnapshot> {
        match self {
            FavoriteWeather::Loaded(snapshot) => Some(snapshot),
            FavoriteWeather::Failed { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FavoriteEntry {
    pub name: String,
    pub weather: Option<FavoriteWeather>,
}

impl FavoriteEntry {
    pub fn pending(name: impl Into<String>) -> Self {
        Self { name: name.into(), weather: None }
    }
}

/// Coarse grouping of provider condition names, used for presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConditionKind {
    Clear,
    Clouds,
    Rain,
    Drizzle,
    Snow,
    Thunderstorm,
    Mist,
    Other,
}

impl ConditionKind {
    /// Classify a condition group name ("Clear", "Clouds", ...) case-insensitively.
    pub fn classify(condition: &str) -> Self {
        let lower = condition.trim().to_lowercase();

        match lower.as_str() {
            "clear" => ConditionKind::Clear,
            "clouds" => ConditionKind::Clouds,
            "rain" => ConditionKind::Rain,
            "drizzle" => ConditionKind::Drizzle,
            "snow" => ConditionKind::Snow,
            "thunderstorm" => ConditionKind::Thunderstorm,
            "mist" | "haze" | "fog" => ConditionKind::Mist,
            _ if lower.contains("thunder") || lower.contains("storm") => ConditionKind::Thunderstorm,
            _ if lower.contains("rain") => ConditionKind::Rain,
            _ if lower.contains("cloud") => ConditionKind::Clouds,
            _ => ConditionKind::Other,
        }
    }
}

pub(crate) fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

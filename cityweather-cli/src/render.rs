//! Plain-text rendering of session state. Read-only over the core types.

use std::fmt::Write;

use chrono::Local;
use cityweather_core::{
    ConditionKind, FavoriteWeather, FavoritesState, LoadStatus, SearchState, WeatherSnapshot,
};

fn glyph(kind: ConditionKind) -> &'static str {
    match kind {
        ConditionKind::Clear => "☀",
        ConditionKind::Clouds => "☁",
        ConditionKind::Rain | ConditionKind::Drizzle => "☂",
        ConditionKind::Snow => "❄",
        ConditionKind::Thunderstorm => "⚡",
        ConditionKind::Mist => "≋",
        ConditionKind::Other => "·",
    }
}

fn snapshot_line(snapshot: &WeatherSnapshot) -> String {
    let mut line = format!(
        "{} {}  {:.1}°C  {}",
        glyph(snapshot.condition_kind()),
        snapshot.name,
        snapshot.temperature_c,
        snapshot.condition_description,
    );

    if let Some(humidity) = snapshot.humidity_pct {
        let _ = write!(line, "  humidity {humidity}%");
    }
    let _ = write!(line, "  wind {:.1} m/s", snapshot.wind_speed_mps);

    line
}

pub fn search(state: &SearchState) -> String {
    let mut out = String::new();

    if let Some(message) = &state.error_message {
        let _ = writeln!(out, "Could not load weather for '{}': {message}", state.query);
    } else if let Some(snapshot) = &state.current {
        let _ = writeln!(out, "{}", snapshot_line(snapshot));
        if let Some(observed) = snapshot.observed_at {
            let _ = writeln!(
                out,
                "  observed {}",
                observed.with_timezone(&Local).format("%Y-%m-%d %H:%M")
            );
        }
    }

    out
}

pub fn favorites(state: &FavoritesState) -> String {
    let mut out = String::new();

    if state.entries().is_empty() {
        if state.status() != LoadStatus::Idle {
            out.push_str("No favorites yet. Add one with `cityweather add <city>`.\n");
        }
        return out;
    }

    out.push_str("Favorites:\n");
    for entry in state.entries() {
        let line = match &entry.weather {
            Some(FavoriteWeather::Loaded(snapshot)) => snapshot_line(snapshot),
            Some(FavoriteWeather::Failed { message }) => {
                format!("! {}  Error: {message}...", entry.name)
            }
            None => format!("… {}  loading", entry.name),
        };
        let _ = writeln!(out, "  {line}");
    }

    if state.status() == LoadStatus::PartiallyFailed {
        out.push_str("Some favorites could not be refreshed.\n");
    }

    out
}

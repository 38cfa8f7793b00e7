//! Application session: search, save/remove favorites and refresh.
//!
//! All displayed state lives in [`AppState`]; presentation code only reads it.

use std::{fmt, sync::Arc};

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    WeatherProvider, WeatherSnapshot,
    favorites::{FavoritesState, FavoritesWorkflow},
    storage::{FavoritesStore, KeyValueStore},
};

/// Transient user-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice(String);

impl Notice {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchState {
    pub query: String,
    pub current: Option<WeatherSnapshot>,
    pub error_message: Option<String>,
    pub loading: bool,
}

impl SearchState {
    fn start(query: &str) -> Self {
        Self {
            query: query.to_string(),
            current: None,
            error_message: None,
            loading: true,
        }
    }

    fn succeeded(self, snapshot: WeatherSnapshot) -> Self {
        Self {
            current: Some(snapshot),
            error_message: None,
            loading: false,
            ..self
        }
    }

    fn failed(self, message: String) -> Self {
        Self {
            current: None,
            error_message: Some(message),
            loading: false,
            ..self
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppState {
    pub search: SearchState,
    pub favorites: FavoritesState,
}

pub struct WeatherApp<S> {
    provider: Arc<dyn WeatherProvider>,
    favorites: FavoritesWorkflow<S>,
    state: AppState,
}

impl<S: KeyValueStore> WeatherApp<S> {
    pub fn new(provider: Arc<dyn WeatherProvider>, store: FavoritesStore<S>) -> Self {
        let favorites = FavoritesWorkflow::new(store, Arc::clone(&provider));
        Self { provider, favorites, state: AppState::default() }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn store(&self) -> &FavoritesStore<S> {
        self.favorites.store()
    }

    /// Initial load of the favorites list.
    pub async fn activate(&mut self) {
        self.reload_favorites().await;
    }

    /// Look up current weather for `term`.
    ///
    /// A blank term yields a notice and leaves the displayed weather untouched.
    pub async fn search(&mut self, term: &str) -> Option<Notice> {
        let city = term.trim();
        if city.is_empty() {
            return Some(Notice::new("Please enter a city name."));
        }

        let search = SearchState::start(city);
        self.state.search = match self.provider.current_weather(city).await {
            Ok(snapshot) => {
                info!(city = %city, resolved = %snapshot.name, "Weather fetched");
                search.succeeded(snapshot)
            }
            Err(err) => {
                warn!(city = %city, error = %err, "Weather search failed");
                search.failed(err.to_string())
            }
        };

        None
    }

    /// Save the currently displayed city to favorites and reload them if it was new.
    pub async fn save_favorite(&mut self) -> Result<Notice> {
        let Some(name) = self.state.search.current.as_ref().map(|w| w.name.clone()) else {
            return Ok(Notice::new("No current weather data available to save."));
        };

        if self.favorites.store().add(&name)? {
            self.reload_favorites().await;
            Ok(Notice::new(format!("{name} added to favorites!")))
        } else {
            Ok(Notice::new(format!("{name} is already in favorites.")))
        }
    }

    pub async fn remove_favorite(&mut self, name: &str) -> Result<Notice> {
        self.favorites.store().remove(name)?;
        self.reload_favorites().await;
        Ok(Notice::new(format!("{name} removed from favorites.")))
    }

    pub async fn reload_favorites(&mut self) {
        self.reload_favorites_with(&CancellationToken::new()).await;
    }

    /// Reload favorites; in-flight fetches settle as cancelled once `cancel` fires.
    pub async fn reload_favorites_with(&mut self, cancel: &CancellationToken) {
        let current = std::mem::take(&mut self.state.favorites);
        self.state.favorites = self.favorites.reload(current, cancel).await;
    }

    /// Re-run the search for `term` when it is non-blank, then reload favorites.
    pub async fn refresh(&mut self, term: Option<&str>) {
        if let Some(term) = term.filter(|t| !t.trim().is_empty()) {
            self.search(term).await;
        }
        self.reload_favorites().await;
    }
}

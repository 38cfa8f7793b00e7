//! Favorites refresh: load stored names, fetch weather for all of them
//! concurrently, and attach each result to its own entry.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{Instrument, error, info, instrument, warn};

use crate::{
    FavoriteEntry, FavoriteWeather, WeatherError, WeatherProvider, WeatherSnapshot,
    storage::{FavoritesStore, KeyValueStore},
};

pub type FetchOutcome = Result<WeatherSnapshot, WeatherError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadStatus {
    #[default]
    Idle,
    Loading,
    Loaded,
    /// Settled, with at least one entry carrying a failure.
    PartiallyFailed,
}

/// Snapshot of the favorites list. Transitions consume the old value and return a new one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FavoritesState {
    status: LoadStatus,
    entries: Vec<FavoriteEntry>,
    generation: u64,
}

impl FavoritesState {
    pub fn status(&self) -> LoadStatus {
        self.status
    }

    pub fn entries(&self) -> &[FavoriteEntry] {
        &self.entries
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_loading(&self) -> bool {
        self.status == LoadStatus::Loading
    }

    /// Start a reload for `names`. An empty list settles immediately.
    pub fn begin(self, names: Vec<String>) -> Self {
        let status = if names.is_empty() { LoadStatus::Loaded } else { LoadStatus::Loading };

        Self {
            status,
            entries: names.into_iter().map(FavoriteEntry::pending).collect(),
            generation: self.generation + 1,
        }
    }

    /// Attach fetch outcomes, in name order, to the reload identified by `generation`.
    ///
    /// Outcomes for an older generation are dropped and the state is returned unchanged.
    pub fn settle(self, generation: u64, outcomes: Vec<FetchOutcome>) -> Self {
        if generation != self.generation {
            warn!(
                stale = generation,
                current = self.generation,
                "Ignoring results from a superseded favorites reload"
            );
            return self;
        }

        let mut outcomes = outcomes.into_iter();
        let entries: Vec<FavoriteEntry> = self
            .entries
            .into_iter()
            .map(|entry| {
                let weather = match outcomes.next() {
                    Some(Ok(snapshot)) => FavoriteWeather::Loaded(snapshot),
                    Some(Err(err)) => {
                        warn!(city = %entry.name, error = %err, "Could not load weather for favorite");
                        FavoriteWeather::failed(err.to_string())
                    }
                    None => FavoriteWeather::failed("Failed to load"),
                };
                FavoriteEntry { name: entry.name, weather: Some(weather) }
            })
            .collect();

        let any_failed = entries
            .iter()
            .any(|e| e.weather.as_ref().is_some_and(FavoriteWeather::is_failed));

        Self {
            status: if any_failed { LoadStatus::PartiallyFailed } else { LoadStatus::Loaded },
            entries,
            generation: self.generation,
        }
    }
}

/// Fetch weather for every name concurrently and return the outcomes in name order.
///
/// Never short-circuits: each fetch settles on its own. Once `cancel` fires,
/// fetches still in flight settle as [`WeatherError::Cancelled`].
#[instrument(skip(provider, names, cancel), fields(city_count = names.len()))]
pub async fn fan_out(
    provider: Arc<dyn WeatherProvider>,
    names: &[String],
    cancel: &CancellationToken,
) -> Vec<FetchOutcome> {
    let mut handles = Vec::with_capacity(names.len());

    for name in names {
        let provider = Arc::clone(&provider);
        let cancel = cancel.clone();
        let name = name.clone();

        let handle = tokio::spawn(
            async move {
                if cancel.is_cancelled() {
                    return Err(WeatherError::Cancelled);
                }

                tokio::select! {
                    result = provider.current_weather(&name) => result,
                    _ = cancel.cancelled() => Err(WeatherError::Cancelled),
                }
            }
            .in_current_span(),
        );

        handles.push(handle);
    }

    // Handles are awaited in spawn order, so outcome i belongs to names[i]
    // whatever order the fetches actually finish in.
    let mut outcomes = Vec::with_capacity(handles.len());
    for (handle, name) in handles.into_iter().zip(names) {
        match handle.await {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => {
                error!(city = %name, error = %e, "Weather task join error");
                outcomes.push(Err(WeatherError::Task(e.to_string())));
            }
        }
    }

    let failed = outcomes.iter().filter(|o| o.is_err()).count();
    info!(total = outcomes.len(), successful = outcomes.len() - failed, failed, "Favorites fetch completed");

    outcomes
}

/// Drives a favorites reload against a store and a weather provider.
#[derive(Debug)]
pub struct FavoritesWorkflow<S> {
    store: FavoritesStore<S>,
    provider: Arc<dyn WeatherProvider>,
}

impl<S: KeyValueStore> FavoritesWorkflow<S> {
    pub fn new(store: FavoritesStore<S>, provider: Arc<dyn WeatherProvider>) -> Self {
        Self { store, provider }
    }

    pub fn store(&self) -> &FavoritesStore<S> {
        &self.store
    }

    /// Rebuild the favorites list from storage and fetch weather for every entry.
    pub async fn reload(&self, state: FavoritesState, cancel: &CancellationToken) -> FavoritesState {
        let names = self.store.list_favorites();
        let state = state.begin(names.clone());

        if names.is_empty() {
            info!("No favorites stored; skipping weather fetch");
            return state;
        }

        let generation = state.generation();
        let outcomes = fan_out(Arc::clone(&self.provider), &names, cancel).await;
        state.settle(generation, outcomes)
    }
}

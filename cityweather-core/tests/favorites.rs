use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use cityweather_core::{
    FavoriteWeather, FavoritesStore, FavoritesWorkflow, FileStore, KeyValueStore, LoadStatus,
    MemoryStore, WeatherApp, WeatherError, WeatherProvider, WeatherSnapshot,
    favorites::{FavoritesState, fan_out},
    storage::FAVORITES_KEY,
};
use tokio_util::sync::CancellationToken;

/// Scripted provider: per-city delay and failure, counting calls.
#[derive(Debug, Default)]
struct FakeProvider {
    delays_ms: HashMap<String, u64>,
    failing: Vec<String>,
    hang: Vec<String>,
    panicking: Vec<String>,
    calls: AtomicUsize,
}

impl FakeProvider {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WeatherProvider for FakeProvider {
    async fn current_weather(&self, city: &str) -> Result<WeatherSnapshot, WeatherError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.panicking.iter().any(|c| c == city) {
            panic!("provider blew up for {city}");
        }
        if self.hang.iter().any(|c| c == city) {
            std::future::pending::<()>().await;
        }
        if let Some(ms) = self.delays_ms.get(city) {
            tokio::time::sleep(Duration::from_millis(*ms)).await;
        }
        if self.failing.iter().any(|c| c == city) {
            return Err(WeatherError::not_found(Some("city not found".into())));
        }

        Ok(WeatherSnapshot {
            name: capitalize(city),
            temperature_c: 18.0,
            humidity_pct: Some(40),
            wind_speed_mps: 2.5,
            condition_main: "Clouds".into(),
            condition_description: "scattered clouds".into(),
            icon_id: "03d".into(),
            observed_at: None,
        })
    }
}

fn capitalize(city: &str) -> String {
    let mut chars = city.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn store_with(names: &[&str]) -> FavoritesStore<MemoryStore> {
    let store = FavoritesStore::new(MemoryStore::new());
    for name in names {
        store.add(name).expect("add");
    }
    store
}

fn loaded_name(weather: &Option<FavoriteWeather>) -> Option<&str> {
    weather.as_ref().and_then(FavoriteWeather::snapshot).map(|s| s.name.as_str())
}

#[tokio::test]
async fn results_follow_name_order_and_failures_stay_isolated() {
    let provider = Arc::new(FakeProvider {
        // A finishes last, C first.
        delays_ms: HashMap::from([("A".to_string(), 60), ("B".to_string(), 30), ("C".to_string(), 0)]),
        failing: vec!["B".to_string()],
        ..FakeProvider::default()
    });

    let workflow = FavoritesWorkflow::new(store_with(&["A", "B", "C"]), provider.clone());
    let state = workflow.reload(FavoritesState::default(), &CancellationToken::new()).await;

    assert_eq!(state.status(), LoadStatus::PartiallyFailed);
    let entries = state.entries();
    let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["A", "B", "C"]);

    assert_eq!(loaded_name(&entries[0].weather), Some("A"));
    match &entries[1].weather {
        Some(FavoriteWeather::Failed { message }) => {
            assert!(message.starts_with("City not found"));
            assert!(message.chars().count() <= 30);
        }
        other => panic!("expected failure for B, got {other:?}"),
    }
    assert_eq!(loaded_name(&entries[2].weather), Some("C"));
    assert_eq!(provider.calls(), 3);
}

#[tokio::test]
async fn panicking_fetch_fails_only_its_own_city() {
    let provider = Arc::new(FakeProvider { panicking: vec!["B".to_string()], ..FakeProvider::default() });

    let workflow = FavoritesWorkflow::new(store_with(&["A", "B", "C"]), provider);
    let state = workflow.reload(FavoritesState::default(), &CancellationToken::new()).await;

    assert_eq!(state.status(), LoadStatus::PartiallyFailed);
    let entries = state.entries();
    assert_eq!(loaded_name(&entries[0].weather), Some("A"));
    match &entries[1].weather {
        Some(FavoriteWeather::Failed { message }) => {
            assert!(message.starts_with("Weather task failed"), "unexpected message: {message}");
        }
        other => panic!("expected failure for B, got {other:?}"),
    }
    assert_eq!(loaded_name(&entries[2].weather), Some("C"));
}

#[tokio::test]
async fn empty_favorites_issue_no_requests() {
    let provider = Arc::new(FakeProvider::default());
    let workflow = FavoritesWorkflow::new(store_with(&[]), provider.clone());

    let state = workflow.reload(FavoritesState::default(), &CancellationToken::new()).await;

    assert_eq!(state.status(), LoadStatus::Loaded);
    assert!(state.entries().is_empty());
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn cancelled_fetches_settle_as_cancelled() {
    let provider = Arc::new(FakeProvider { hang: vec!["slow".to_string()], ..FakeProvider::default() });
    let names = vec!["fast".to_string(), "slow".to_string()];
    let cancel = CancellationToken::new();

    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceller.cancel();
    });

    let outcomes = fan_out(provider, &names, &cancel).await;

    assert!(outcomes[0].is_ok());
    assert!(matches!(outcomes[1], Err(WeatherError::Cancelled)));
}

#[tokio::test]
async fn blank_search_makes_no_request_and_keeps_weather() {
    let provider = Arc::new(FakeProvider::default());
    let mut app = WeatherApp::new(provider.clone(), store_with(&[]));

    assert!(app.search("paris").await.is_none());
    let before = app.state().search.clone();

    let notice = app.search("   ").await.expect("blank search should produce a notice");

    assert_eq!(notice.as_str(), "Please enter a city name.");
    assert_eq!(app.state().search, before);
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn failed_search_clears_weather_and_sets_message() {
    let provider = Arc::new(FakeProvider { failing: vec!["atlantis".to_string()], ..FakeProvider::default() });
    let mut app = WeatherApp::new(provider, store_with(&[]));

    app.search("paris").await;
    assert!(app.state().search.current.is_some());

    app.search(" atlantis ").await;
    let search = &app.state().search;
    assert!(search.current.is_none());
    assert_eq!(search.query, "atlantis");
    assert_eq!(search.error_message.as_deref(), Some("City not found: city not found (404)"));
    assert!(!search.loading);
}

#[tokio::test]
async fn save_favorite_uses_resolved_name_and_reloads() {
    let provider = Arc::new(FakeProvider::default());
    let mut app = WeatherApp::new(provider, store_with(&[]));

    let notice = app.save_favorite().await.expect("save");
    assert_eq!(notice.as_str(), "No current weather data available to save.");

    app.search("paris").await;
    let notice = app.save_favorite().await.expect("save");
    assert_eq!(notice.as_str(), "Paris added to favorites!");

    let favorites = &app.state().favorites;
    assert_eq!(favorites.status(), LoadStatus::Loaded);
    assert_eq!(favorites.entries().len(), 1);
    assert_eq!(loaded_name(&favorites.entries()[0].weather), Some("Paris"));

    let notice = app.save_favorite().await.expect("save");
    assert_eq!(notice.as_str(), "Paris is already in favorites.");
    assert_eq!(app.store().list_favorites(), vec!["Paris"]);
}

#[tokio::test]
async fn remove_favorite_keeps_list_and_storage_in_sync() {
    let provider = Arc::new(FakeProvider::default());
    let mut app = WeatherApp::new(provider, store_with(&["Rome", "Oslo"]));
    app.activate().await;
    assert_eq!(app.state().favorites.entries().len(), 2);

    let notice = app.remove_favorite("rome").await.expect("remove");
    assert_eq!(notice.as_str(), "rome removed from favorites.");

    let names: Vec<&str> =
        app.state().favorites.entries().iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["Oslo"]);
    assert_eq!(app.store().list_favorites(), vec!["Oslo"]);
}

#[tokio::test]
async fn refresh_searches_only_for_non_blank_terms() {
    let provider = Arc::new(FakeProvider::default());
    let mut app = WeatherApp::new(provider.clone(), store_with(&["Lima"]));

    app.refresh(Some("  ")).await;
    assert_eq!(provider.calls(), 1);
    assert!(app.state().search.current.is_none());

    app.refresh(Some("cairo")).await;
    assert_eq!(provider.calls(), 3);
    assert!(app.state().search.current.is_some());
}

#[test]
fn file_store_persists_favorites_between_instances() {
    let dir = tempfile::tempdir().expect("tempdir");

    let first = FavoritesStore::new(FileStore::new(dir.path().join("data")));
    assert!(first.list_favorites().is_empty());
    assert!(first.add("Paris").expect("add"));
    assert!(!first.add("paris").expect("add"));

    let second = FavoritesStore::new(FileStore::new(dir.path().join("data")));
    assert_eq!(second.list_favorites(), vec!["Paris"]);

    let raw = second.inner().get(FAVORITES_KEY).expect("get").expect("stored");
    assert_eq!(raw, r#"["Paris"]"#);
}

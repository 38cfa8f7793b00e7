//! Core library for the `cityweather` CLI.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The OpenWeather client behind a provider trait
//! - Persistence of favorite city names
//! - The favorites refresh workflow and the application session state
//!
//! It is used by `cityweather-cli`, but can also be embedded by other front-ends.

pub mod config;
pub mod error;
pub mod favorites;
pub mod model;
pub mod provider;
pub mod session;
pub mod storage;

pub use config::Config;
pub use error::WeatherError;
pub use favorites::{FavoritesState, FavoritesWorkflow, LoadStatus};
pub use model::{ConditionKind, FavoriteEntry, FavoriteWeather, WeatherSnapshot};
pub use provider::{WeatherProvider, provider_from_config};
pub use session::{AppState, Notice, SearchState, WeatherApp};
pub use storage::{FavoritesStore, FileStore, KeyValueStore, MemoryStore};

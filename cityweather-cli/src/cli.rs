use anyhow::Context;
use clap::{Parser, Subcommand};
use cityweather_core::{
    Config, FavoritesStore, FileStore, Notice, WeatherApp, config::DEFAULT_ENDPOINT,
    provider_from_config,
};
use inquire::{Password, PasswordDisplayMode, Text};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "cityweather", version, about = "Current weather for cities and your favorites")]
pub struct Cli {
    /// Increase log verbosity (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Interactively set the OpenWeather API key.
    Configure,

    /// Show current weather for a city.
    Search {
        city: String,

        /// Also save the city to favorites.
        #[arg(long)]
        save: bool,
    },

    /// Look up a city and save it to favorites.
    Add { city: String },

    /// Remove a city from favorites.
    Remove { city: String },

    /// Show current weather for every favorite.
    Favorites,

    /// Re-run a search (if given) and reload favorites.
    Refresh { city: Option<String> },
}

type App = WeatherApp<FileStore>;

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure()?,
            Command::Search { city, save } => {
                let mut app = build_app()?;
                if search(&mut app, &city).await && save {
                    print_notice(&app.save_favorite().await?);
                    print!("{}", render::favorites(&app.state().favorites));
                }
            }
            Command::Add { city } => {
                let mut app = build_app()?;
                search(&mut app, &city).await;
                print_notice(&app.save_favorite().await?);
                print!("{}", render::favorites(&app.state().favorites));
            }
            Command::Remove { city } => {
                let mut app = build_app()?;
                print_notice(&app.remove_favorite(&city).await?);
                print!("{}", render::favorites(&app.state().favorites));
            }
            Command::Favorites => {
                let mut app = build_app()?;
                let cancel = cancel_on_ctrl_c();
                app.reload_favorites_with(&cancel).await;
                print!("{}", render::favorites(&app.state().favorites));
            }
            Command::Refresh { city } => {
                let mut app = build_app()?;
                app.refresh(city.as_deref()).await;
                if city.as_deref().is_some_and(|c| !c.trim().is_empty()) {
                    print!("{}", render::search(&app.state().search));
                }
                print!("{}", render::favorites(&app.state().favorites));
            }
        }

        Ok(())
    }
}

fn build_app() -> anyhow::Result<App> {
    let config = Config::load()?.with_env_overrides();
    let provider = provider_from_config(&config)?;
    let store = FavoritesStore::new(FileStore::new(config.data_dir()?));
    Ok(WeatherApp::new(provider, store))
}

/// Runs a search and prints the outcome. Returns whether weather is now displayed.
async fn search(app: &mut App, city: &str) -> bool {
    if let Some(notice) = app.search(city).await {
        print_notice(&notice);
        return false;
    }

    print!("{}", render::search(&app.state().search));
    app.state().search.current.is_some()
}

fn configure() -> anyhow::Result<()> {
    let path = Config::config_file_path()?;
    let mut config = Config::load_from(&path)?;

    let api_key = Password::new("OpenWeather API key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;

    if api_key.trim().is_empty() {
        anyhow::bail!("API key must not be empty");
    }
    config.set_api_key(api_key.trim().to_string());

    let endpoint = Text::new("Weather endpoint:")
        .with_default(config.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT))
        .prompt()
        .context("Failed to read endpoint")?;

    config.endpoint = if endpoint.trim() == DEFAULT_ENDPOINT || endpoint.trim().is_empty() {
        None
    } else {
        Some(endpoint.trim().to_string())
    };

    config.save_to(&path)?;
    println!("Configuration saved to {}", path.display());

    Ok(())
}

fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted; cancelling outstanding weather requests");
            trigger.cancel();
        }
    });

    token
}

fn print_notice(notice: &Notice) {
    println!("» {notice}");
}

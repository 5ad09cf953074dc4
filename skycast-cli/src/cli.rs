use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::{Parser, Subcommand};
use inquire::{
    CustomUserError, InquireError, Password, Text,
    autocompletion::{Autocomplete, Replacement},
};
use skycast_core::{
    Config, Controller, FileStore, MemoryStore, Phase, PreferenceStore, SearchHistory,
    provider::provider_from_config,
    store::SEARCH_HISTORY_KEY,
};
use tracing::debug;

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "skycast", version, about = "Current weather and 5-day forecast by city")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Directory holding saved preferences (last city, recent searches).
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Do not read or write saved preferences.
    #[arg(long, global = true, conflicts_with = "data_dir")]
    pub ephemeral: bool,

    /// Debug logging to stderr (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Set the OpenWeather API key and default city.
    Configure,

    /// Show weather for a city, or for the last searched city.
    Show {
        /// City name; defaults to the last searched (or configured) city.
        city: Option<String>,
    },

    /// List recent searches.
    History,

    /// Search repeatedly from a prompt (the default).
    Interactive,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Some(Command::Configure) => configure(),
            Some(Command::History) => {
                let store = self.open_store()?;
                print_history(store.as_ref());
                Ok(())
            }
            Some(Command::Show { ref city }) => {
                let mut controller = self.controller()?;
                eprintln!("{}", render::LOADING_LINE);
                match city {
                    Some(city) => controller.search(city.as_str()).await,
                    None => controller.start().await,
                };
                finish_show(&controller)
            }
            Some(Command::Interactive) | None => {
                let controller = self.controller()?;
                interactive(controller).await
            }
        }
    }

    fn open_store(&self) -> anyhow::Result<Arc<dyn PreferenceStore>> {
        if self.ephemeral {
            return Ok(Arc::new(MemoryStore::new()));
        }
        let store = match &self.data_dir {
            Some(dir) => FileStore::in_dir(dir),
            None => FileStore::open_default()?,
        };
        debug!(path = %store.path().display(), "Using preference store");
        Ok(Arc::new(store))
    }

    fn controller(&self) -> anyhow::Result<Controller> {
        let config = Config::load()?;
        let provider = provider_from_config(&config)?;
        let store = self.open_store()?;

        Ok(Controller::new(Arc::from(provider), store, config.default_city.as_str()))
    }
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let api_key = Password::new("OpenWeather API key:")
        .without_confirmation()
        .with_help_message("Leave empty to keep the current key")
        .prompt()
        .context("Failed to read API key")?;
    if !api_key.trim().is_empty() {
        config.set_api_key(api_key);
    }

    let city = Text::new("Default city:")
        .with_default(&config.default_city)
        .prompt()
        .context("Failed to read default city")?;
    if !city.trim().is_empty() {
        config.default_city = city.trim().to_string();
    }

    config.save()?;
    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}

fn print_history(store: &dyn PreferenceStore) {
    let history = store
        .get(SEARCH_HISTORY_KEY)
        .map(|raw| SearchHistory::deserialize(&raw))
        .unwrap_or_default();

    if history.is_empty() {
        println!("No recent searches.");
        return;
    }
    for city in &history {
        println!("{city}");
    }
}

fn finish_show(controller: &Controller) -> anyhow::Result<()> {
    let state = controller.state();
    if state.phase == Phase::Failed {
        anyhow::bail!(state.error.clone().unwrap_or_else(|| "Search failed".to_string()));
    }
    println!("{}", render::screen(state));
    Ok(())
}

/// Offers recent searches as completions for the city prompt.
#[derive(Debug, Clone)]
struct HistoryCompleter {
    cities: Vec<String>,
}

impl Autocomplete for HistoryCompleter {
    fn get_suggestions(&mut self, input: &str) -> Result<Vec<String>, CustomUserError> {
        let needle = input.trim().to_lowercase();
        Ok(self
            .cities
            .iter()
            .filter(|c| c.to_lowercase().starts_with(&needle))
            .cloned()
            .collect())
    }

    fn get_completion(
        &mut self,
        _input: &str,
        highlighted_suggestion: Option<String>,
    ) -> Result<Replacement, CustomUserError> {
        Ok(highlighted_suggestion)
    }
}

async fn interactive(mut controller: Controller) -> anyhow::Result<()> {
    eprintln!("{}", render::LOADING_LINE);
    controller.start().await;

    loop {
        println!("\n{}\n", render::screen(controller.state()));

        let completer = HistoryCompleter {
            cities: controller.state().history.entries().to_vec(),
        };
        let answer = Text::new("City:")
            .with_placeholder(controller.state().current_city.as_str())
            .with_help_message("Enter to search, Tab for recent cities, Esc to quit")
            .with_autocomplete(completer)
            .prompt();

        let city = match answer {
            Ok(city) => city,
            Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => break,
            Err(err) => return Err(err).context("Failed to read city"),
        };

        if city.trim().is_empty() {
            continue;
        }
        eprintln!("{}", render::LOADING_LINE);
        controller.search(city).await;
    }

    Ok(())
}

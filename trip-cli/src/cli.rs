use std::path::PathBuf;

use anyhow::{Context, bail};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};
use inquire::{Password, Text};
use tracing::debug;
use trip_core::{
    CityOutcome, Config, ExportFormat, ProviderId, Providers, TripAgent, TripPlanner,
    export, model::Location, provider::narrator_from_config,
};

use crate::render;

const DEFAULT_AGENT_CITY: &str = "Paris";
const VALIDATION_CITY: &str = "Paris";

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "trip", version, about = "Multi-city trip planner")]
pub struct Cli {
    /// Log provider decisions and fallbacks to stderr.
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ExportArg {
    Json,
    Csv,
}

impl From<ExportArg> for ExportFormat {
    fn from(arg: ExportArg) -> Self {
        match arg {
            ExportArg::Json => ExportFormat::Json,
            ExportArg::Csv => ExportFormat::Csv,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Plan one or more cities: `City`, `City:YYYY-MM-DD` or `City:YYYY-MM-DD:YYYY-MM-DD`.
    Plan {
        cities: Vec<String>,

        /// Use deterministic fixture data instead of calling providers.
        #[arg(long)]
        mock: bool,

        /// Export the results after printing them.
        #[arg(long, value_enum)]
        export: Option<ExportArg>,

        /// Export path; defaults to `planner_output.<format>`.
        #[arg(long, requires = "export")]
        out: Option<PathBuf>,
    },

    /// Check the configured API keys. Always exits successfully.
    Validate {
        #[arg(long)]
        mock: bool,
    },

    /// Plan cities with the fixed tool plan and a narrated summary.
    Agent {
        cities: Vec<String>,

        #[arg(long)]
        mock: bool,
    },

    /// Configure credentials for a specific provider.
    Configure {
        /// Provider short name: "google", "openweather" or "openai".
        provider: String,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Plan { cities, mock, export, out } => {
                plan(cities, mock, export.map(ExportFormat::from), out).await
            }
            Command::Validate { mock } => {
                validate(mock).await;
                Ok(())
            }
            Command::Agent { cities, mock } => agent(cities, mock).await,
            Command::Configure { provider } => configure(&provider),
        }
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Split an interactive answer on commas and semicolons.
fn split_cities(input: &str) -> Vec<String> {
    input
        .split([',', ';'])
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(String::from)
        .collect()
}

async fn plan(
    mut cities: Vec<String>,
    mock: bool,
    format: Option<ExportFormat>,
    out: Option<PathBuf>,
) -> anyhow::Result<()> {
    if cities.is_empty() {
        let answer = Text::new("Enter cities (separated by comma or semicolon):")
            .with_help_message("e.g. Paris, Tokyo:2026-03-10, New York")
            .prompt()?;
        cities = split_cities(&answer);
    }
    if cities.is_empty() {
        bail!("No cities given.");
    }

    let config = Config::from_environment()?;
    let providers = if mock { Providers::mock() } else { Providers::live(&config)? };
    let planner = TripPlanner::new(providers, &config.settings, today());

    println!("\nPlanning trip...");
    let report = planner.plan(&cities).await;

    for outcome in &report.outcomes {
        match outcome {
            CityOutcome::Planned(result) => {
                println!("{}", render::city_block(result, planner.radius_km()));
            }
            CityOutcome::Failed(failure) => println!("{}\n", render::failure_line(failure)),
        }
    }
    println!("{}", render::masks_line(report.masks_needed));

    if let Some(format) = format {
        let path = out.unwrap_or_else(|| PathBuf::from(format.default_file_name()));
        let results = report.into_results();
        export::export(&results, format, &path)
            .with_context(|| format!("Failed to export results to {}", path.display()))?;
        println!("Exported results to {}", path.display());
    }

    Ok(())
}

async fn validate(mock: bool) {
    if mock {
        println!("Running in mock mode - key validation skipped.");
        return;
    }

    let config = match Config::from_environment() {
        Ok(config) => config,
        Err(err) => {
            println!("Could not load configuration: {err:#}");
            return;
        }
    };

    let providers = match Providers::live(&config) {
        Ok(providers) => providers,
        Err(err) => {
            println!("API key validation failed: {err}");
            println!("{}", err.user_message());
            return;
        }
    };

    let location = match providers.geocoder.geocode(VALIDATION_CITY).await {
        Ok(location) => {
            println!("API key appears valid. Example geocode:\n {}", location.address);
            location
        }
        Err(err) => {
            println!("API key validation failed: {err}");
            println!(
                "Check that {} is set, that the Geocoding and Places APIs are enabled in your \
                 Google Cloud project, that billing is enabled and that the key is not restricted \
                 incorrectly.",
                ProviderId::Google.env_var()
            );
            Location { lat: 48.8566, lng: 2.3522, address: VALIDATION_CITY.to_string() }
        }
    };

    match &providers.secondary_air {
        Some(secondary) => match secondary.air_quality(&location).await {
            Some(reading) => println!(
                "Secondary provider OK: air quality {} ({})",
                reading.aqi.map_or("N/A".to_string(), |a| a.to_string()),
                reading.category
            ),
            None => println!(
                "Secondary provider check failed. Verify {}.",
                ProviderId::OpenWeather.env_var()
            ),
        },
        None => println!(
            "Secondary provider not configured (set {} to enable it).",
            ProviderId::OpenWeather.env_var()
        ),
    }
}

async fn agent(mut cities: Vec<String>, mock: bool) -> anyhow::Result<()> {
    if cities.is_empty() {
        println!("No cities provided. Using default: {DEFAULT_AGENT_CITY}");
        cities.push(DEFAULT_AGENT_CITY.to_string());
    }

    let config = Config::from_environment()?;
    let providers = if mock { Providers::mock() } else { Providers::live(&config)? };
    let narrator = narrator_from_config(&config, mock)?;
    let agent = TripAgent::new(providers, narrator, &config.settings, today());

    let banner = "=".repeat(60);
    println!("\n{banner}\nTRIP PLANNER AGENT\n{banner}");

    for city in &cities {
        println!("\n{banner}\nPlanning trip to: {city}\n{banner}\n");
        match agent.run(city).await {
            Ok(report) => {
                debug!(tools = report.transcript.len(), "agent run finished");
                println!("{}\n", report.narrative);
            }
            Err(err) => println!("Error processing '{city}': {err}\n"),
        }
    }

    println!("{banner}\nPlanning complete!\n{banner}");
    Ok(())
}

fn configure(provider: &str) -> anyhow::Result<()> {
    let provider_id = ProviderId::try_from(provider)?;
    let mut config = Config::load()?;

    let api_key = Password::new(&format!("API key for {provider_id}:"))
        .without_confirmation()
        .prompt()?;
    let api_key = api_key.trim().to_string();
    if api_key.is_empty() {
        bail!("API key must not be empty.");
    }

    config.upsert_provider_api_key(provider_id, api_key);
    let path = config.save()?;
    println!("Saved {provider_id} credentials to {}", path.display());
    Ok(())
}

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode, Select, Text, validator::Validation};
use weatherpanel_core::{
    Config, Coordinates, CountryCode, FixedGeolocator, GeolocationOutcome, SamplingPolicy, Units,
    WeatherPanel, provider_from_config,
};

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weatherpanel", version, about = "Current weather and 5-day forecast")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the OpenWeatherMap API key and display preferences.
    Configure,

    /// Show weather for a place name.
    Show {
        /// City or place name, e.g. "London".
        location: String,

        /// Two-letter country code; defaults to the configured country.
        #[arg(long, short)]
        country: Option<CountryCode>,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Show weather for the current position.
    Here {
        /// Latitude; falls back to the `[home]` position in the config file.
        #[arg(long, requires = "lon", allow_negative_numbers = true)]
        lat: Option<f64>,

        /// Longitude.
        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lon: Option<f64>,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Show {
                location,
                country,
                json,
            } => {
                let config = load_config()?;
                let provider = provider_from_config(&config)?;

                let mut panel = WeatherPanel::new(config.default_country.clone());
                panel.set_location_text(location);
                if let Some(country) = country {
                    panel.select_country(country);
                }

                panel.submit(provider.as_ref()).await?;
                if panel.current().is_none() {
                    tracing::debug!(
                        text = panel.location_text(),
                        "showing placeholder instead of current conditions"
                    );
                }
                render::print(&panel, &config, json)
            }
            Command::Here { lat, lon, json } => {
                let config = load_config()?;
                let provider = provider_from_config(&config)?;

                let position = resolve_position(lat, lon, config.home)?;
                let geolocator = FixedGeolocator::new(position);

                let mut panel = WeatherPanel::new(config.default_country.clone());
                panel.init_geolocation(&geolocator).await;

                match panel.use_geolocation(&geolocator, provider.as_ref()).await {
                    GeolocationOutcome::Fetched => render::print(&panel, &config, json),
                    GeolocationOutcome::Disabled | GeolocationOutcome::Denied => bail!(
                        "No position available.\n\
                         Hint: pass --lat/--lon or add a [home] table to {}.",
                        Config::config_file_path()?.display()
                    ),
                }
            }
        }
    }
}

fn load_config() -> anyhow::Result<Config> {
    let config = Config::load()?;
    tracing::debug!(
        configured = config.is_configured(),
        units = %config.units,
        sampling = %config.sampling,
        "loaded configuration"
    );
    Ok(config)
}

/// Coordinates from `--lat/--lon`, else the configured home position.
fn resolve_position(
    lat: Option<f64>,
    lon: Option<f64>,
    home: Option<Coordinates>,
) -> anyhow::Result<Option<Coordinates>> {
    let position = match (lat, lon) {
        (Some(latitude), Some(longitude)) => Some(Coordinates::new(latitude, longitude)?),
        _ => home
            .map(Coordinates::validated)
            .transpose()
            .context("Invalid [home] position in config file")?,
    };
    Ok(position)
}

fn configure() -> anyhow::Result<()> {
    let mut config = load_config()?;
    let has_key = config.is_configured();

    let mut key_prompt = Password::new("OpenWeatherMap API key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation();
    if has_key {
        key_prompt = key_prompt.with_help_message("Leave blank to keep the current key");
    }
    let api_key = key_prompt.prompt().context("Failed to read API key")?;

    if api_key.trim().is_empty() && !has_key {
        bail!("An API key is required. Get one at https://openweathermap.org/api");
    }

    let country = Text::new("Default country code:")
        .with_default(config.default_country.as_str())
        .with_validator(|input: &str| {
            Ok(match input.parse::<CountryCode>() {
                Ok(_) => Validation::Valid,
                Err(err) => Validation::Invalid(err.to_string().into()),
            })
        })
        .prompt()
        .context("Failed to read default country")?;

    let units = Select::new("Units:", Units::all().to_vec())
        .with_starting_cursor(position_of(Units::all(), &config.units))
        .prompt()
        .context("Failed to read units")?;

    let sampling = Select::new("Forecast sampling:", SamplingPolicy::all().to_vec())
        .with_starting_cursor(position_of(SamplingPolicy::all(), &config.sampling))
        .prompt()
        .context("Failed to read sampling policy")?;

    if !api_key.trim().is_empty() {
        config.set_api_key(api_key.trim().to_string());
    }
    config.default_country = country.parse()?;
    config.units = units;
    config.sampling = sampling;

    config.save()?;
    println!(
        "Saved configuration to {}",
        Config::config_file_path()?.display()
    );

    Ok(())
}

fn position_of<T: PartialEq>(all: &[T], value: &T) -> usize {
    all.iter().position(|v| v == value).unwrap_or(0)
}

//! Core library for the `weatherpanel` CLI.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The OpenWeatherMap client and its response mapping
//! - Forecast sampling and description normalization
//! - The display state (`WeatherPanel`) that front-ends render
//!
//! It is used by `weatherpanel-cli`, but can also be reused by other front-ends.

pub mod config;
pub mod error;
pub mod geolocation;
pub mod model;
pub mod panel;
pub mod provider;
pub mod sampler;
pub mod text;

pub use config::Config;
pub use error::{LocationError, NOT_FOUND_PLACEHOLDER, PanelError, WeatherError};
pub use geolocation::{FixedGeolocator, Geolocator, PermissionState};
pub use model::{
    Coordinates, CountryCode, CurrentConditions, DailyForecast, LocationQuery, Units,
};
pub use panel::{GeolocationOutcome, RequestTicket, WeatherPanel};
pub use provider::{WeatherProvider, provider_from_config};
pub use sampler::SamplingPolicy;
pub use text::title_case;

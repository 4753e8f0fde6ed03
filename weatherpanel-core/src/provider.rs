use crate::{
    Config, CurrentConditions, DailyForecast, LocationQuery, WeatherError,
    provider::openweather::OpenWeatherProvider,
};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod openweather;

/// Source of current conditions and daily forecasts.
///
/// The two lookups are independent: callers may issue them concurrently and
/// either may fail on its own.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn fetch_current(&self, query: &LocationQuery) -> Result<CurrentConditions, WeatherError>;

    async fn fetch_forecast(
        &self,
        query: &LocationQuery,
    ) -> Result<Vec<DailyForecast>, WeatherError>;
}

/// Construct the OpenWeatherMap provider from config.
pub fn provider_from_config(config: &Config) -> anyhow::Result<Box<dyn WeatherProvider>> {
    let api_key = config.api_key().ok_or_else(|| {
        anyhow::anyhow!(
            "No OpenWeatherMap API key configured.\n\
                 Hint: run `weatherpanel configure` and enter your API key."
        )
    })?;

    let provider = OpenWeatherProvider::new(api_key.to_owned())
        .with_base_url(&config.api_base_url)
        .with_units(config.units)
        .with_sampling(config.sampling);

    Ok(Box::new(provider))
}

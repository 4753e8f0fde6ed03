//! Display state behind the weather panel.
//!
//! A front-end owns one [`WeatherPanel`], feeds it user input and renders
//! whatever it holds. Each search issues the current-conditions and forecast
//! lookups together; the two results land in disjoint fields and are applied
//! independently, so one can fail while the other succeeds.

use crate::{
    error::{PanelError, WeatherError},
    geolocation::{Geolocator, PermissionState},
    model::{CountryCode, CurrentConditions, DailyForecast, LocationQuery},
    provider::WeatherProvider,
};

/// Tags one pair of lookups. Results carrying a ticket older than the last one
/// applied to the same field are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RequestTicket {
    seq: u64,
    by_coordinates: bool,
}

impl RequestTicket {
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeolocationOutcome {
    /// Geolocation was already switched off; nothing was requested.
    Disabled,
    /// The capability refused to hand out a position. Geolocation is now off.
    Denied,
    /// Both lookups ran for the reported position.
    Fetched,
}

#[derive(Debug, Clone)]
pub struct WeatherPanel {
    location_text: String,
    country: CountryCode,
    default_country: CountryCode,
    current: Option<CurrentConditions>,
    forecast: Vec<DailyForecast>,
    geolocation_enabled: bool,

    last_issued: u64,
    current_applied: u64,
    forecast_applied: u64,
}

impl Default for WeatherPanel {
    fn default() -> Self {
        Self::new(CountryCode::default())
    }
}

impl WeatherPanel {
    pub fn new(default_country: CountryCode) -> Self {
        Self {
            location_text: String::new(),
            country: default_country.clone(),
            default_country,
            current: None,
            forecast: Vec::new(),
            geolocation_enabled: true,
            last_issued: 0,
            current_applied: 0,
            forecast_applied: 0,
        }
    }

    pub fn location_text(&self) -> &str {
        &self.location_text
    }

    pub fn country(&self) -> &CountryCode {
        &self.country
    }

    pub fn current(&self) -> Option<&CurrentConditions> {
        self.current.as_ref()
    }

    pub fn forecast(&self) -> &[DailyForecast] {
        &self.forecast
    }

    pub fn geolocation_enabled(&self) -> bool {
        self.geolocation_enabled
    }

    pub fn set_location_text(&mut self, text: impl Into<String>) {
        self.location_text = text.into();
    }

    pub fn select_country(&mut self, country: CountryCode) {
        self.country = country;
    }

    pub fn disable_geolocation(&mut self) {
        self.geolocation_enabled = false;
    }

    /// Query for the typed location and selected country.
    pub fn name_query(&self) -> Result<LocationQuery, PanelError> {
        let name = self.location_text.trim();
        if name.is_empty() {
            return Err(PanelError::EmptyLocation);
        }

        Ok(LocationQuery::by_name(name, self.country.clone()))
    }

    pub fn issue(&mut self, query: &LocationQuery) -> RequestTicket {
        self.last_issued += 1;
        RequestTicket {
            seq: self.last_issued,
            by_coordinates: matches!(query, LocationQuery::ByCoordinates(_)),
        }
    }

    /// Store a current-conditions result. Returns `false` if it was stale.
    pub fn apply_current(
        &mut self,
        ticket: RequestTicket,
        result: Result<CurrentConditions, WeatherError>,
    ) -> bool {
        if ticket.seq < self.current_applied {
            tracing::warn!(
                ticket = ticket.seq,
                applied = self.current_applied,
                "discarding stale current conditions"
            );
            return false;
        }
        self.current_applied = ticket.seq;

        match result {
            Ok(current) => {
                if ticket.by_coordinates {
                    self.adopt_resolved_location(&current);
                }
                self.current = Some(current);
            }
            Err(err) => {
                tracing::warn!(error = %err, "current conditions lookup failed");
                self.current = None;
                self.location_text = err.user_message().to_string();
            }
        }
        true
    }

    /// Store a forecast result. Returns `false` if it was stale.
    pub fn apply_forecast(
        &mut self,
        ticket: RequestTicket,
        result: Result<Vec<DailyForecast>, WeatherError>,
    ) -> bool {
        if ticket.seq < self.forecast_applied {
            tracing::warn!(
                ticket = ticket.seq,
                applied = self.forecast_applied,
                "discarding stale forecast"
            );
            return false;
        }
        self.forecast_applied = ticket.seq;

        match result {
            Ok(days) => self.forecast = days,
            Err(err) => {
                tracing::warn!(error = %err, "forecast lookup failed");
                self.forecast.clear();
                self.location_text = err.user_message().to_string();
            }
        }
        true
    }

    // Coordinate lookups show the provider's place name and country in the form.
    fn adopt_resolved_location(&mut self, current: &CurrentConditions) {
        match current.country.parse::<CountryCode>() {
            Ok(country) => self.country = country,
            Err(err) => tracing::debug!(error = %err, "keeping selected country"),
        }
        if let Some(name) = &current.resolved_name {
            self.location_text = name.clone();
        }
    }

    /// Look up the typed location in the selected country.
    pub async fn submit(&mut self, provider: &dyn WeatherProvider) -> Result<(), PanelError> {
        let query = self.name_query()?;
        self.fetch(provider, query).await;
        Ok(())
    }

    /// Switch geolocation off if the host has already refused it.
    pub async fn init_geolocation(&mut self, geolocator: &dyn Geolocator) -> PermissionState {
        let state = geolocator.query_permission().await;
        if state == PermissionState::Denied {
            tracing::info!("geolocation permission denied, disabling");
            self.disable_geolocation();
        }
        state
    }

    /// Look up the weather at the host's current position.
    pub async fn use_geolocation(
        &mut self,
        geolocator: &dyn Geolocator,
        provider: &dyn WeatherProvider,
    ) -> GeolocationOutcome {
        if !self.geolocation_enabled {
            return GeolocationOutcome::Disabled;
        }

        let position = match geolocator.get_current_position().await {
            Ok(position) => position,
            Err(err) => {
                tracing::info!(error = %err, "no position available, disabling geolocation");
                self.disable_geolocation();
                return GeolocationOutcome::Denied;
            }
        };

        self.fetch(provider, LocationQuery::ByCoordinates(position)).await;
        GeolocationOutcome::Fetched
    }

    async fn fetch(&mut self, provider: &dyn WeatherProvider, query: LocationQuery) {
        let ticket = self.issue(&query);
        tracing::debug!(ticket = ticket.seq(), %query, "issuing lookups");

        let (current, forecast) = tokio::join!(
            provider.fetch_current(&query),
            provider.fetch_forecast(&query)
        );

        self.apply_current(ticket, current);
        self.apply_forecast(ticket, forecast);
    }

    /// Back to an empty form in the default country. Lookups still in flight
    /// are dropped when they land.
    pub fn reset(&mut self) {
        self.location_text.clear();
        self.forecast.clear();
        self.current = None;
        self.country = self.default_country.clone();

        self.last_issued += 1;
        self.current_applied = self.last_issued;
        self.forecast_applied = self.last_issued;
    }
}

use std::{fmt, str::FromStr};

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

/// Fallback used by the panel when no other country has been chosen.
pub const DEFAULT_COUNTRY: &str = "US";

/// ISO 3166-1 alpha-2 country code, always stored upper-case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CountryCode(String);

impl CountryCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CountryCode {
    fn default() -> Self {
        Self(DEFAULT_COUNTRY.to_string())
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid country code '{0}': expected two letters such as \"US\" or \"GB\"")]
pub struct InvalidCountryCode(pub String);

impl FromStr for CountryCode {
    type Err = InvalidCountryCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.len() == 2 && trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            Ok(Self(trimmed.to_ascii_uppercase()))
        } else {
            Err(InvalidCountryCode(s.to_string()))
        }
    }
}

impl TryFrom<String> for CountryCode {
    type Error = InvalidCountryCode;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CountryCode> for String {
    fn from(code: CountryCode) -> Self {
        code.0
    }
}

/// Unit system requested from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Imperial,
    Metric,
    Standard,
}

impl Units {
    pub fn as_str(&self) -> &'static str {
        match self {
            Units::Imperial => "imperial",
            Units::Metric => "metric",
            Units::Standard => "standard",
        }
    }

    pub fn temperature_symbol(&self) -> &'static str {
        match self {
            Units::Imperial => "°F",
            Units::Metric => "°C",
            Units::Standard => "K",
        }
    }

    pub const fn all() -> &'static [Units] {
        &[Units::Imperial, Units::Metric, Units::Standard]
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid coordinates ({latitude}, {longitude}): latitude must be within ±90 and longitude within ±180")]
pub struct InvalidCoordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Checked constructor; rejects NaN, infinities and out-of-range values.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, InvalidCoordinates> {
        let valid = latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude);

        if valid {
            Ok(Self {
                latitude,
                longitude,
            })
        } else {
            Err(InvalidCoordinates {
                latitude,
                longitude,
            })
        }
    }

    pub fn validated(self) -> Result<Self, InvalidCoordinates> {
        Self::new(self.latitude, self.longitude)
    }
}

/// The two ways of naming a place.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationQuery {
    ByName { name: String, country: CountryCode },
    ByCoordinates(Coordinates),
}

impl LocationQuery {
    pub fn by_name(name: impl Into<String>, country: CountryCode) -> Self {
        Self::ByName {
            name: name.into(),
            country,
        }
    }

    pub fn by_coordinates(latitude: f64, longitude: f64) -> Self {
        Self::ByCoordinates(Coordinates {
            latitude,
            longitude,
        })
    }

    /// Location part of the provider query string, without the leading `&`.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        match self {
            LocationQuery::ByName { name, country } => vec![("q", format!("{name},{country}"))],
            LocationQuery::ByCoordinates(c) => vec![
                ("lat", c.latitude.to_string()),
                ("lon", c.longitude.to_string()),
            ],
        }
    }
}

impl fmt::Display for LocationQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocationQuery::ByName { name, country } => write!(f, "{name}, {country}"),
            LocationQuery::ByCoordinates(c) => write!(f, "{:.4}, {:.4}", c.latitude, c.longitude),
        }
    }
}

/// Conditions right now at the requested place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub temperature: f64,
    pub humidity: u8,
    /// Title-cased condition summary, e.g. "Light Rain".
    pub visibility: String,
    pub country: String,
    /// Place name reported by the provider. Only set for coordinate lookups.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_name: Option<String>,
}

/// One sampled day of the 5-day forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyForecast {
    /// Slot time in the forecast city's UTC offset.
    pub date: DateTime<FixedOffset>,
    pub icon: String,
    pub temperature: f64,
    pub low_temperature: f64,
    pub description: String,
}

impl DailyForecast {
    pub fn day(&self) -> NaiveDate {
        self.date.date_naive()
    }

    pub fn icon_url(&self, base: &str) -> String {
        format!("{base}{}.png", self.icon)
    }
}

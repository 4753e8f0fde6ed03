use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::instrument;

use crate::{
    config::DEFAULT_API_BASE_URL,
    error::WeatherError,
    model::{CurrentConditions, DailyForecast, LocationQuery, Units},
    sampler::SamplingPolicy,
    text::title_case,
};

use super::WeatherProvider;

/// OpenWeatherMap `weather` and `forecast` endpoints.
#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    units: Units,
    sampling: SamplingPolicy,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_API_BASE_URL.to_string(),
            units: Units::default(),
            sampling: SamplingPolicy::default(),
            http: Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_units(mut self, units: Units) -> Self {
        self.units = units;
        self
    }

    pub fn with_sampling(mut self, sampling: SamplingPolicy) -> Self {
        self.sampling = sampling;
        self
    }

    async fn get_json<T>(&self, endpoint: &str, query: &LocationQuery) -> Result<T, WeatherError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let url = format!("{}/{endpoint}", self.base_url);

        let mut params = vec![
            ("appid", self.api_key.clone()),
            ("units", self.units.as_str().to_string()),
        ];
        params.extend(query.query_pairs());

        tracing::debug!(%url, %query, "requesting OpenWeatherMap");

        let res = self.http.get(&url).query(&params).send().await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(WeatherError::Status {
                status,
                body: truncate_body(&body),
            });
        }

        Ok(serde_json::from_str(&body)?)
    }

    #[instrument(skip(self, query), fields(query = %query), level = "info")]
    async fn current_conditions(
        &self,
        query: &LocationQuery,
    ) -> Result<CurrentConditions, WeatherError> {
        let parsed: OwCurrentResponse = self.get_json("weather", query).await?;
        map_current(parsed, query)
    }

    #[instrument(skip(self, query), fields(query = %query), level = "info")]
    async fn daily_forecast(
        &self,
        query: &LocationQuery,
    ) -> Result<Vec<DailyForecast>, WeatherError> {
        let parsed: OwForecastResponse = self.get_json("forecast", query).await?;
        let days = map_forecast(&parsed, self.sampling)?;

        tracing::debug!(
            slots = parsed.list.len(),
            days = days.len(),
            sampling = %self.sampling,
            "sampled forecast"
        );
        Ok(days)
    }
}

#[derive(Debug, Deserialize)]
struct OwCurrentMain {
    temp: f64,
    humidity: u8,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    description: String,
}

#[derive(Debug, Deserialize)]
struct OwSys {
    country: String,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    #[serde(default)]
    name: Option<String>,
    sys: OwSys,
    main: OwCurrentMain,
    weather: Vec<OwWeather>,
}

#[derive(Debug, Deserialize)]
struct OwForecastMain {
    temp: f64,
    temp_min: f64,
}

#[derive(Debug, Deserialize)]
struct OwForecastWeather {
    description: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct OwForecastEntry {
    dt: i64,
    main: OwForecastMain,
    weather: Vec<OwForecastWeather>,
}

#[derive(Debug, Deserialize)]
struct OwCity {
    /// Shift from UTC in seconds.
    #[serde(default)]
    timezone: i64,
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    list: Vec<OwForecastEntry>,
    #[serde(default)]
    city: Option<OwCity>,
}

fn first_weather<T>(weather: &[T]) -> Result<&T, WeatherError> {
    weather
        .first()
        .ok_or_else(|| WeatherError::Malformed("missing weather[0]".to_string()))
}

fn map_current(
    parsed: OwCurrentResponse,
    query: &LocationQuery,
) -> Result<CurrentConditions, WeatherError> {
    let weather = first_weather(&parsed.weather)?;

    let resolved_name = match query {
        LocationQuery::ByCoordinates(_) => parsed.name,
        LocationQuery::ByName { .. } => None,
    };

    Ok(CurrentConditions {
        temperature: parsed.main.temp,
        humidity: parsed.main.humidity,
        visibility: title_case(&weather.description),
        country: parsed.sys.country,
        resolved_name,
    })
}

fn city_offset(parsed: &OwForecastResponse) -> Result<FixedOffset, WeatherError> {
    let seconds = parsed.city.as_ref().map_or(0, |c| c.timezone);

    i32::try_from(seconds)
        .ok()
        .and_then(FixedOffset::east_opt)
        .ok_or_else(|| WeatherError::Malformed(format!("city.timezone {seconds} out of range")))
}

fn slot_time(dt: i64, offset: &FixedOffset) -> Result<DateTime<FixedOffset>, WeatherError> {
    DateTime::<Utc>::from_timestamp(dt, 0)
        .map(|utc| utc.with_timezone(offset))
        .ok_or_else(|| WeatherError::Malformed(format!("timestamp {dt} out of range")))
}

// Every slot is checked, sampled or not, so a response is either wholly
// usable or rejected.
fn map_forecast(
    parsed: &OwForecastResponse,
    sampling: SamplingPolicy,
) -> Result<Vec<DailyForecast>, WeatherError> {
    let offset = city_offset(parsed)?;

    let slots = parsed
        .list
        .iter()
        .map(|entry| map_forecast_entry(entry, &offset))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(sampling
        .apply(&slots, DailyForecast::day)
        .into_iter()
        .cloned()
        .collect())
}

fn map_forecast_entry(
    entry: &OwForecastEntry,
    offset: &FixedOffset,
) -> Result<DailyForecast, WeatherError> {
    let weather = first_weather(&entry.weather)?;

    Ok(DailyForecast {
        date: slot_time(entry.dt, offset)?,
        icon: weather.icon.clone(),
        temperature: entry.main.temp,
        low_temperature: entry.main.temp_min,
        description: title_case(&weather.description),
    })
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn fetch_current(&self, query: &LocationQuery) -> Result<CurrentConditions, WeatherError> {
        self.current_conditions(query).await
    }

    async fn fetch_forecast(
        &self,
        query: &LocationQuery,
    ) -> Result<Vec<DailyForecast>, WeatherError> {
        self.daily_forecast(query).await
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let cut = (0..=MAX).rev().find(|i| body.is_char_boundary(*i)).unwrap_or(0);
        format!("{}...", &body[..cut])
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const START: i64 = 1_700_006_400; // 2023-11-15 00:00 UTC

    fn current_body() -> serde_json::Value {
        json!({
            "name": "Mountain View",
            "sys": { "country": "US" },
            "main": { "humidity": 80, "temp": 70.5, "feels_like": 69.8 },
            "weather": [{ "description": "light rain", "icon": "10d" }]
        })
    }

    fn forecast_body(slots: usize) -> serde_json::Value {
        let list: Vec<serde_json::Value> = (0..slots)
            .map(|i| {
                json!({
                    "dt": START + i as i64 * 3 * 3600,
                    "main": { "temp": 60.0 + i as f64, "temp_min": 50.0 + i as f64 },
                    "weather": [{ "description": format!("scattered clouds {i}"), "icon": "03d" }]
                })
            })
            .collect();

        json!({ "cnt": slots, "list": list, "city": { "name": "London", "timezone": 0 } })
    }

    fn provider(server: &MockServer) -> OpenWeatherProvider {
        OpenWeatherProvider::new("test-key".to_string()).with_base_url(&server.uri())
    }

    #[tokio::test]
    async fn current_by_name_maps_fields() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/weather"))
            .and(query_param("q", "London,GB"))
            .and(query_param("appid", "test-key"))
            .and(query_param("units", "imperial"))
            .respond_with(ResponseTemplate::new(200).set_body_json(current_body()))
            .mount(&server)
            .await;

        let query = LocationQuery::by_name("London", "GB".parse().expect("valid code"));
        let current = provider(&server).fetch_current(&query).await.expect("lookup succeeds");

        assert_eq!(
            current,
            CurrentConditions {
                temperature: 70.5,
                humidity: 80,
                visibility: "Light Rain".to_string(),
                country: "US".to_string(),
                resolved_name: None,
            }
        );
    }

    #[tokio::test]
    async fn current_by_coordinates_keeps_resolved_name() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/weather"))
            .and(query_param("lat", "37.386"))
            .and(query_param("lon", "-122.0838"))
            .respond_with(ResponseTemplate::new(200).set_body_json(current_body()))
            .mount(&server)
            .await;

        let query = LocationQuery::by_coordinates(37.386, -122.0838);
        let current = provider(&server).fetch_current(&query).await.expect("lookup succeeds");

        assert_eq!(current.resolved_name.as_deref(), Some("Mountain View"));
    }

    #[tokio::test]
    async fn units_follow_configuration() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/weather"))
            .and(query_param("units", "metric"))
            .respond_with(ResponseTemplate::new(200).set_body_json(current_body()))
            .mount(&server)
            .await;

        let query = LocationQuery::by_name("Paris", "FR".parse().expect("valid code"));
        let result = provider(&server)
            .with_units(Units::Metric)
            .fetch_current(&query)
            .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn forecast_of_forty_slots_yields_five_days() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body(40)))
            .mount(&server)
            .await;

        let query = LocationQuery::by_name("London", "GB".parse().expect("valid code"));
        let days = provider(&server).fetch_forecast(&query).await.expect("lookup succeeds");

        assert_eq!(days.len(), 5);
        for (n, day) in days.iter().enumerate() {
            let slot = n * 8;
            assert_eq!(day.date.timestamp(), START + slot as i64 * 3 * 3600);
            assert_eq!(day.temperature, 60.0 + slot as f64);
            assert_eq!(day.low_temperature, 50.0 + slot as f64);
            assert_eq!(day.description, format!("Scattered Clouds {slot}"));
            assert_eq!(day.icon, "03d");
        }
        for pair in days.windows(2) {
            assert!(pair[0].day() < pair[1].day());
        }
    }

    #[tokio::test]
    async fn forecast_with_few_slots_is_not_an_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body(3)))
            .mount(&server)
            .await;

        let query = LocationQuery::by_coordinates(51.5, -0.12);
        let days = provider(&server).fetch_forecast(&query).await.expect("lookup succeeds");

        assert_eq!(days.len(), 1);
    }

    #[tokio::test]
    async fn calendar_day_sampling_uses_city_timezone() {
        let server = MockServer::start().await;

        let mut body = forecast_body(40);
        // UTC-5: the first two slots still belong to 14 November locally.
        body["city"]["timezone"] = json!(-5 * 3600);

        Mock::given(method("GET"))
            .and(path("/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let query = LocationQuery::by_name("Boston", "US".parse().expect("valid code"));
        let days = provider(&server)
            .with_sampling(SamplingPolicy::CalendarDay)
            .fetch_forecast(&query)
            .await
            .expect("lookup succeeds");

        assert_eq!(days.len(), 5);
        let starts: Vec<i64> = days.iter().map(|d| d.date.timestamp()).collect();
        // Local midnight is 05:00 UTC, so days after the first start at slot 2 + 8k.
        assert_eq!(starts[0], START);
        assert_eq!(starts[1], START + 2 * 3 * 3600);
        assert_eq!(starts[2], START + 10 * 3 * 3600);

        let local_days: Vec<NaiveDate> = days.iter().map(DailyForecast::day).collect();
        assert_eq!(local_days[0], NaiveDate::from_ymd_opt(2023, 11, 14).expect("valid date"));
        for pair in local_days.windows(2) {
            assert!(pair[0] < pair[1], "days not strictly ascending: {local_days:?}");
        }

        let labels: Vec<String> = days
            .iter()
            .map(|d| d.date.format("%a %d %b").to_string())
            .collect();
        assert_eq!(labels[0], "Tue 14 Nov");
        assert_eq!(labels[1], "Wed 15 Nov");
        assert_eq!(days[0].date.offset().local_minus_utc(), -5 * 3600);
    }

    #[tokio::test]
    async fn not_found_status_is_an_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_json(json!({ "cod": "404", "message": "city not found" })),
            )
            .mount(&server)
            .await;

        let query = LocationQuery::by_name("Atlantis", "GR".parse().expect("valid code"));
        let err = provider(&server).fetch_current(&query).await.unwrap_err();

        match err {
            WeatherError::Status { status, body } => {
                assert_eq!(status, reqwest::StatusCode::NOT_FOUND);
                assert!(body.contains("city not found"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_field_is_malformed() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "main": { "humidity": 80, "temp": 70.5 },
                "weather": [{ "description": "light rain" }]
            })))
            .mount(&server)
            .await;

        let query = LocationQuery::by_name("London", "GB".parse().expect("valid code"));
        let err = provider(&server).fetch_current(&query).await.unwrap_err();

        assert!(matches!(err, WeatherError::Malformed(_)));
        assert_eq!(err.user_message(), "No Location Found");
    }

    #[tokio::test]
    async fn empty_weather_array_is_malformed() {
        let server = MockServer::start().await;

        let mut body = forecast_body(9);
        body["list"][8]["weather"] = json!([]);

        Mock::given(method("GET"))
            .and(path("/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let query = LocationQuery::by_name("London", "GB".parse().expect("valid code"));
        let err = provider(&server).fetch_forecast(&query).await.unwrap_err();

        assert!(matches!(err, WeatherError::Malformed(msg) if msg.contains("weather[0]")));
    }

    async fn assert_forecast_rejected(body: serde_json::Value) {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let query = LocationQuery::by_name("London", "GB".parse().expect("valid code"));
        let err = provider(&server).fetch_forecast(&query).await.unwrap_err();
        assert!(matches!(err, WeatherError::Malformed(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn unsampled_slots_are_validated_too() {
        // Slot 3 is never picked by the stride, yet each defect rejects the response.
        let mut missing_icon = forecast_body(16);
        missing_icon["list"][3]["weather"][0]
            .as_object_mut()
            .expect("weather object")
            .remove("icon");
        assert_forecast_rejected(missing_icon).await;

        let mut missing_low = forecast_body(16);
        missing_low["list"][3]["main"]
            .as_object_mut()
            .expect("main object")
            .remove("temp_min");
        assert_forecast_rejected(missing_low).await;

        let mut empty_weather = forecast_body(16);
        empty_weather["list"][3]["weather"] = json!([]);
        assert_forecast_rejected(empty_weather).await;
    }

    #[tokio::test]
    async fn unreachable_server_is_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let uri = format!("http://{}", listener.local_addr().expect("addr"));
        drop(listener);

        let query = LocationQuery::by_name("London", "GB".parse().expect("valid code"));
        let err = OpenWeatherProvider::new("k".to_string())
            .with_base_url(&uri)
            .fetch_current(&query)
            .await
            .unwrap_err();

        assert!(matches!(err, WeatherError::Transport(_)));
    }

    #[test]
    fn truncate_body_respects_char_boundaries() {
        let body = "é".repeat(150);
        let cut = truncate_body(&body);
        assert!(cut.ends_with("..."));
        assert!(cut.len() <= 203);
    }
}

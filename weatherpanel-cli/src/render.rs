use std::fmt::Write;

use serde_json::json;
use weatherpanel_core::{Config, Units, WeatherPanel};

pub fn print(panel: &WeatherPanel, config: &Config, as_json: bool) -> anyhow::Result<()> {
    if as_json {
        println!("{}", to_json(panel, config)?);
    } else {
        print!("{}", to_text(panel, config.units));
    }
    Ok(())
}

fn to_json(panel: &WeatherPanel, config: &Config) -> anyhow::Result<String> {
    let forecast = panel
        .forecast()
        .iter()
        .map(|day| {
            let mut value = serde_json::to_value(day)?;
            value["icon_url"] = json!(day.icon_url(&config.icon_base_url));
            Ok(value)
        })
        .collect::<Result<Vec<_>, serde_json::Error>>()?;

    let out = json!({
        "location": panel.location_text(),
        "country": panel.country(),
        "units": config.units,
        "current": panel.current(),
        "forecast": forecast,
    });

    Ok(serde_json::to_string_pretty(&out)?)
}

fn to_text(panel: &WeatherPanel, units: Units) -> String {
    let symbol = units.temperature_symbol();
    let mut out = String::new();

    let _ = writeln!(out, "{} ({})", panel.location_text(), panel.country());

    if let Some(current) = panel.current() {
        let _ = writeln!(
            out,
            "  Now: {:.1}{symbol}  {}  humidity {}%",
            current.temperature, current.visibility, current.humidity
        );
    }

    if !panel.forecast().is_empty() {
        let _ = writeln!(out);
    }
    for day in panel.forecast() {
        let _ = writeln!(
            out,
            "  {}  {:>6.1}{symbol} / {:>6.1}{symbol}  {}",
            day.date.format("%a %d %b"),
            day.temperature,
            day.low_temperature,
            day.description
        );
    }

    out
}

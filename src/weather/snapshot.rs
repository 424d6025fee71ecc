use chrono::{DateTime, Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Normalized weather observation, shape-validated by the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherReading {
    /// Place name reported by the provider.
    pub place: String,
    /// Temperature in Celsius, unrounded.
    pub temperature_celsius: f64,
    /// Primary condition label (e.g. "Clouds").
    pub condition: String,
    /// Observation timestamp embedded in the provider response.
    pub observed_at: DateTime<Utc>,
}

/// Presentation snapshot derived from one reading.
///
/// Immutable once constructed; the wire field names are part of the broker
/// contract and must not change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    #[serde(rename = "DayDateTime")]
    pub day_date_time: String,
    #[serde(rename = "TemperatureWeather")]
    pub temperature_weather: String,
}

impl WeatherSnapshot {
    /// Build a snapshot rendered in the observer's local calendar.
    pub fn from_reading(reading: &WeatherReading) -> Self {
        Self::from_reading_in(reading, &Local)
    }

    /// Build a snapshot rendered in an explicit timezone.
    ///
    /// Output is fully determined by the reading and the timezone; the wall
    /// clock at formatting time plays no part.
    pub fn from_reading_in<Tz: TimeZone>(reading: &WeatherReading, tz: &Tz) -> Self
    where
        Tz::Offset: std::fmt::Display,
    {
        let rounded = reading.temperature_celsius.round() as i64;
        let local = reading.observed_at.with_timezone(tz);
        Self {
            day_date_time: local.format("%A, %b %d, %Y").to_string(),
            temperature_weather: format!(
                "{} ,{}°C {}",
                reading.place, rounded, reading.condition
            ),
        }
    }
}

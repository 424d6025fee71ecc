use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration container.
///
/// Every section has full defaults so a missing config file yields a
/// working configuration (public test broker, standard topics).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default)]
    pub topics: TopicConfig,
    #[serde(default)]
    pub weather: WeatherConfig,
    #[serde(default)]
    pub location: LocationConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
}

/// Broker session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Broker hostname.
    #[serde(default = "default_broker_host")]
    pub host: String,
    /// Broker TCP port.
    #[serde(default = "default_broker_port")]
    pub port: u16,
    /// MQTT keep-alive interval in seconds (default: 60).
    #[serde(default = "default_keep_alive")]
    pub keep_alive_seconds: u64,
    /// Prefix for the generated client identity.
    #[serde(default = "default_client_id_prefix")]
    pub client_id_prefix: String,
    /// Delay before re-polling the transport after a connection error.
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_seconds: u64,
}

/// Topic names for the two outbound streams.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicConfig {
    #[serde(default = "default_weather_topic")]
    pub weather: String,
    #[serde(default = "default_notification_topic")]
    pub notification: String,
}

/// Weather sampling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// Whether the weather sampler runs at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// OpenWeatherMap API key. Falls back to the OPEN_WEATHER_MAP_API_KEY
    /// environment variable when unset.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Current-weather endpoint.
    #[serde(default = "default_weather_base_url")]
    pub base_url: String,
    /// Sampling interval in milliseconds (default: 30000).
    #[serde(default = "default_weather_interval_ms")]
    pub interval_ms: u64,
}

/// Location fix acquisition settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    /// Fixed latitude, used when no platform provider delivers fixes.
    #[serde(default)]
    pub latitude: Option<f64>,
    /// Fixed longitude, used when no platform provider delivers fixes.
    #[serde(default)]
    pub longitude: Option<f64>,
    /// Bounded wait for a fix in seconds (default: 20).
    #[serde(default = "default_fix_timeout")]
    pub fix_timeout_seconds: u64,
    /// Maximum acceptable fix age in seconds (default: 1).
    #[serde(default = "default_max_fix_age")]
    pub max_fix_age_seconds: u64,
    /// Request a high-accuracy fix.
    #[serde(default = "default_true")]
    pub high_accuracy: bool,
}

/// Ingest socket settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Unix socket path. Defaults to `<runtime dir>/skybridge.sock`.
    #[serde(default)]
    pub socket_path: Option<PathBuf>,
}

fn default_broker_host() -> String {
    "broker.emqx.io".to_string()
}

fn default_broker_port() -> u16 {
    1883
}

fn default_keep_alive() -> u64 {
    60
}

fn default_client_id_prefix() -> String {
    "mobile".to_string()
}

fn default_reconnect_delay() -> u64 {
    2
}

fn default_weather_topic() -> String {
    "flutter/weather_data".to_string()
}

fn default_notification_topic() -> String {
    "flutter/notification".to_string()
}

fn default_true() -> bool {
    true
}

fn default_weather_base_url() -> String {
    "https://api.openweathermap.org/data/2.5/weather".to_string()
}

fn default_weather_interval_ms() -> u64 {
    30_000
}

fn default_fix_timeout() -> u64 {
    20
}

fn default_max_fix_age() -> u64 {
    1
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: default_broker_host(),
            port: default_broker_port(),
            keep_alive_seconds: default_keep_alive(),
            client_id_prefix: default_client_id_prefix(),
            reconnect_delay_seconds: default_reconnect_delay(),
        }
    }
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            weather: default_weather_topic(),
            notification: default_notification_topic(),
        }
    }
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: None,
            base_url: default_weather_base_url(),
            interval_ms: default_weather_interval_ms(),
        }
    }
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            latitude: None,
            longitude: None,
            fix_timeout_seconds: default_fix_timeout(),
            max_fix_age_seconds: default_max_fix_age(),
            high_accuracy: true,
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            socket_path: None,
        }
    }
}

impl WeatherConfig {
    /// Resolve the API key from config or the environment.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var("OPEN_WEATHER_MAP_API_KEY").ok())
            .filter(|k| !k.is_empty())
    }
}

impl IngestConfig {
    /// Resolve the socket path, falling back to the runtime directory.
    pub fn resolve_socket_path(&self) -> PathBuf {
        self.socket_path.clone().unwrap_or_else(|| {
            dirs::runtime_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("skybridge.sock")
        })
    }
}

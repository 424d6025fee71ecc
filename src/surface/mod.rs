//! Read-only projection of bridge state for presentation.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;

use crate::broker::ConnectionMonitor;
use crate::notify::ForwardingFlag;
use crate::weather::WeatherSnapshot;

/// Point-in-time view of {connectivity, last weather snapshot, forwarding
/// flag}. Pure projection; nothing here feeds back into the pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub connection: &'static str,
    pub forwarding_enabled: bool,
    pub last_weather: Option<WeatherSnapshot>,
}

#[derive(Clone)]
pub struct StateSurface {
    monitor: ConnectionMonitor,
    flag: ForwardingFlag,
    last_weather: Arc<RwLock<Option<WeatherSnapshot>>>,
}

impl StateSurface {
    pub fn new(monitor: ConnectionMonitor, flag: ForwardingFlag) -> Self {
        Self {
            monitor,
            flag,
            last_weather: Arc::new(RwLock::new(None)),
        }
    }

    /// Record the freshest weather snapshot. Called by the pipeline only.
    pub(crate) fn record_weather(&self, snapshot: WeatherSnapshot) {
        *self.last_weather.write() = Some(snapshot);
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            connection: self.monitor.state().label(),
            forwarding_enabled: self.flag.get(),
            last_weather: self.last_weather.read().clone(),
        }
    }

    /// Status text in the shape the original screen presented.
    pub fn render_text(&self) -> String {
        let status = self.snapshot();
        let mut lines = vec![format!("MQTT Status: {}", status.connection)];
        lines.push("Weather Snapshot".to_string());
        if let Some(weather) = &status.last_weather {
            lines.push(weather.day_date_time.clone());
            lines.push(weather.temperature_weather.clone());
        } else {
            lines.push("(no sample yet)".to_string());
        }
        lines.push(format!(
            "Forward Notifications: {}",
            if status.forwarding_enabled { "on" } else { "off" }
        ));
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::ConnectionState;
    use crate::test_support::TestRig;

    #[tokio::test]
    async fn snapshot_reflects_all_three_inputs() {
        let rig = TestRig::connected();
        rig.flag.set(true);
        rig.surface.record_weather(WeatherSnapshot {
            day_date_time: "Thursday, Aug 07, 2025".to_string(),
            temperature_weather: "Paris ,22°C Clouds".to_string(),
        });

        let status = rig.surface.snapshot();
        assert_eq!(status.connection, "Connected");
        assert!(status.forwarding_enabled);
        assert_eq!(
            status.last_weather.unwrap().day_date_time,
            "Thursday, Aug 07, 2025"
        );
    }

    #[tokio::test]
    async fn render_text_shows_placeholder_before_first_sample() {
        let rig = TestRig::disconnected();
        let text = rig.surface.render_text();
        assert!(text.contains("MQTT Status: Disconnected"));
        assert!(text.contains("(no sample yet)"));
        assert!(text.contains("Forward Notifications: off"));
    }

    #[tokio::test]
    async fn connection_label_tracks_state_changes() {
        let rig = TestRig::disconnected();
        rig.manager.force_state(ConnectionState::Connecting);
        assert_eq!(rig.surface.snapshot().connection, "Connecting");
        rig.manager.force_state(ConnectionState::Connected);
        assert_eq!(rig.surface.snapshot().connection, "Connected");
    }
}

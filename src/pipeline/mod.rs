//! Event-to-broker forwarding pipeline.
//!
//! The single coordination point between the two producers and the broker
//! session. A submitted message is published exactly once or dropped,
//! never buffered, never retried. No ordering is promised across the two
//! variants; within a variant, submission order is publish order.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::broker::{ConnectionManager, ConnectionState};
use crate::config::TopicConfig;
use crate::notify::NotificationMessage;
use crate::surface::StateSurface;
use crate::weather::WeatherSnapshot;

/// One message from either producer, consumed exactly once.
#[derive(Debug, Clone, PartialEq)]
pub enum ForwardableMessage {
    Weather(WeatherSnapshot),
    Notification(NotificationMessage),
}

impl ForwardableMessage {
    fn variant_label(&self) -> &'static str {
        match self {
            ForwardableMessage::Weather(_) => "weather",
            ForwardableMessage::Notification(_) => "notification",
        }
    }
}

/// Maps messages to their fixed topic, encodes them, and publishes through
/// the connection manager only when the session is Connected.
pub struct ForwardingPipeline {
    manager: Arc<ConnectionManager>,
    topics: TopicConfig,
    surface: StateSurface,
    published: AtomicU64,
    dropped: AtomicU64,
}

impl ForwardingPipeline {
    pub fn new(manager: Arc<ConnectionManager>, topics: TopicConfig, surface: StateSurface) -> Self {
        Self {
            manager,
            topics,
            surface,
            published: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    /// Publish or drop one message.
    ///
    /// The weather variant refreshes the status surface's last-snapshot
    /// projection whether or not the publish goes out, matching the
    /// user-visible behavior: the display tracks the freshest sample even
    /// while the broker is unreachable.
    pub async fn submit(&self, message: ForwardableMessage) {
        if let ForwardableMessage::Weather(snapshot) = &message {
            self.surface.record_weather(snapshot.clone());
        }

        let state = self.manager.state();
        if state != ConnectionState::Connected {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(
                variant = message.variant_label(),
                state = state.label(),
                "Message dropped: not connected"
            );
            return;
        }

        let (topic, payload) = match self.encode(&message) {
            Ok(encoded) => encoded,
            Err(err) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    variant = message.variant_label(),
                    error = %err,
                    "Message dropped: encoding failed"
                );
                return;
            }
        };

        self.manager.publish(topic, payload).await;
        self.published.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            variant = message.variant_label(),
            topic,
            "Message forwarded"
        );
    }

    fn encode<'a>(
        &'a self,
        message: &ForwardableMessage,
    ) -> Result<(&'a str, Vec<u8>), serde_json::Error> {
        match message {
            ForwardableMessage::Weather(snapshot) => {
                let payload = serde_json::to_vec(snapshot)?;
                Ok((self.topics.weather.as_str(), payload))
            }
            ForwardableMessage::Notification(message) => Ok((
                self.topics.notification.as_str(),
                message.to_payload().into_bytes(),
            )),
        }
    }

    /// Messages that passed the connected check and went to the session.
    pub fn published_count(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    /// Messages dropped at this layer (disconnected or unencodable).
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::QosLevel;
    use crate::test_support::TestRig;

    fn weather_message() -> ForwardableMessage {
        ForwardableMessage::Weather(WeatherSnapshot {
            day_date_time: "Thursday, Aug 07, 2025".to_string(),
            temperature_weather: "Paris ,22°C Clouds".to_string(),
        })
    }

    fn notification_message() -> ForwardableMessage {
        ForwardableMessage::Notification(NotificationMessage {
            source_app: "signal".to_string(),
            title: "Alice".to_string(),
            body: "hello".to_string(),
        })
    }

    #[tokio::test]
    async fn weather_goes_to_weather_topic_at_qos2() {
        let rig = TestRig::connected();
        rig.pipeline.submit(weather_message()).await;

        let records = rig.publisher.published.lock();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].topic, "flutter/weather_data");
        assert_eq!(records[0].qos, QosLevel::ExactlyOnce);
        assert!(!records[0].retain);

        let payload: serde_json::Value = serde_json::from_slice(&records[0].payload).unwrap();
        assert_eq!(payload["DayDateTime"], "Thursday, Aug 07, 2025");
        assert_eq!(payload["TemperatureWeather"], "Paris ,22°C Clouds");
    }

    #[tokio::test]
    async fn notification_goes_to_notification_topic_as_plain_text() {
        let rig = TestRig::connected();
        rig.pipeline.submit(notification_message()).await;

        let records = rig.publisher.published.lock();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].topic, "flutter/notification");
        assert_eq!(
            String::from_utf8(records[0].payload.clone()).unwrap(),
            "signal: Alice - hello"
        );
    }

    #[tokio::test]
    async fn submit_while_disconnected_drops_without_queueing() {
        let rig = TestRig::disconnected();
        rig.pipeline.submit(weather_message()).await;
        rig.pipeline.submit(notification_message()).await;

        assert_eq!(rig.publisher.publish_count(), 0);
        assert_eq!(rig.pipeline.dropped_count(), 2);
        assert_eq!(rig.pipeline.published_count(), 0);

        // Reconnecting later must not replay the dropped messages.
        rig.manager.force_state(ConnectionState::Connected);
        assert_eq!(rig.publisher.publish_count(), 0);
    }

    #[tokio::test]
    async fn submit_while_connecting_drops() {
        let rig = TestRig::disconnected();
        rig.manager.force_state(ConnectionState::Connecting);
        rig.pipeline.submit(weather_message()).await;

        assert_eq!(rig.publisher.publish_count(), 0);
        assert_eq!(rig.pipeline.dropped_count(), 1);
    }

    #[tokio::test]
    async fn disconnect_between_submissions_drops_only_the_later_message() {
        let rig = TestRig::connected();
        rig.pipeline.submit(weather_message()).await;
        assert_eq!(rig.publisher.publish_count(), 1);

        rig.manager.force_state(ConnectionState::Disconnected);
        rig.pipeline.submit(notification_message()).await;

        assert_eq!(rig.publisher.publish_count(), 1);
        assert_eq!(rig.pipeline.published_count(), 1);
        assert_eq!(rig.pipeline.dropped_count(), 1);
    }

    #[tokio::test]
    async fn weather_submit_refreshes_surface_even_when_disconnected() {
        let rig = TestRig::disconnected();
        rig.pipeline.submit(weather_message()).await;

        let status = rig.surface.snapshot();
        assert_eq!(
            status.last_weather.unwrap().temperature_weather,
            "Paris ,22°C Clouds"
        );
        assert_eq!(rig.publisher.publish_count(), 0);
    }

    #[tokio::test]
    async fn per_variant_submission_order_is_publish_order() {
        let rig = TestRig::connected();
        for i in 0..5 {
            rig.pipeline
                .submit(ForwardableMessage::Notification(NotificationMessage {
                    source_app: "app".to_string(),
                    title: format!("n{i}"),
                    body: "x".to_string(),
                }))
                .await;
        }

        let records = rig.publisher.published.lock();
        let titles: Vec<String> = records
            .iter()
            .map(|r| String::from_utf8(r.payload.clone()).unwrap())
            .collect();
        assert_eq!(
            titles,
            vec![
                "app: n0 - x",
                "app: n1 - x",
                "app: n2 - x",
                "app: n3 - x",
                "app: n4 - x"
            ]
        );
    }
}

use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{AsyncClient, MqttOptions};
use thiserror::Error;
use uuid::Uuid;

use crate::config::BrokerConfig;

/// Errors reported by the broker transport.
///
/// These never escape the broker module's public surface as failures; the
/// manager recovers locally (logs, drops the publish, re-polls the session).
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("MQTT client error: {0}")]
    Client(#[from] rumqttc::ClientError),

    #[error("Broker session closed")]
    SessionClosed,
}

/// Delivery guarantee requested for a publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QosLevel {
    AtMostOnce,
    AtLeastOnce,
    ExactlyOnce,
}

impl From<QosLevel> for rumqttc::QoS {
    fn from(qos: QosLevel) -> Self {
        match qos {
            QosLevel::AtMostOnce => rumqttc::QoS::AtMostOnce,
            QosLevel::AtLeastOnce => rumqttc::QoS::AtLeastOnce,
            QosLevel::ExactlyOnce => rumqttc::QoS::ExactlyOnce,
        }
    }
}

/// Outbound half of a broker session.
///
/// `ConnectionManager` owns one implementation per session; the seam exists
/// so alternate transports can be slotted in without touching the session
/// lifecycle logic.
#[async_trait]
pub trait BrokerPublisher: Send + Sync {
    async fn publish(
        &self,
        topic: &str,
        qos: QosLevel,
        retain: bool,
        payload: Vec<u8>,
    ) -> Result<(), TransportError>;

    async fn disconnect(&self) -> Result<(), TransportError>;
}

/// rumqttc-backed publisher.
pub struct MqttPublisher {
    client: AsyncClient,
}

impl MqttPublisher {
    pub fn new(client: AsyncClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BrokerPublisher for MqttPublisher {
    async fn publish(
        &self,
        topic: &str,
        qos: QosLevel,
        retain: bool,
        payload: Vec<u8>,
    ) -> Result<(), TransportError> {
        self.client
            .publish(topic, qos.into(), retain, payload)
            .await?;
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        self.client.disconnect().await?;
        Ok(())
    }
}

/// Build the transport options for one session.
///
/// Clean session, configured keep-alive, and a fresh pseudo-random client
/// identity per session so a reconnecting bridge never collides with its
/// previous incarnation on the broker.
pub(crate) fn session_options(config: &BrokerConfig) -> (String, MqttOptions) {
    let token = Uuid::new_v4().simple().to_string();
    let client_id = format!("{}_{}", config.client_id_prefix, &token[..12]);

    let mut options = MqttOptions::new(client_id.clone(), config.host.clone(), config.port);
    options.set_keep_alive(Duration::from_secs(config.keep_alive_seconds));
    options.set_clean_session(true);

    (client_id, options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_options_use_config_and_prefix() {
        let config = BrokerConfig::default();
        let (client_id, options) = session_options(&config);

        assert!(client_id.starts_with("mobile_"));
        assert_eq!(options.broker_address(), ("broker.emqx.io".to_string(), 1883));
        assert_eq!(options.keep_alive(), Duration::from_secs(60));
    }

    #[test]
    fn client_ids_are_unique_per_session() {
        let config = BrokerConfig::default();
        let (a, _) = session_options(&config);
        let (b, _) = session_options(&config);
        assert_ne!(a, b);
    }
}

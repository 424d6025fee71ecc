use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rumqttc::{AsyncClient, Event, EventLoop, Packet};
use tokio::task::JoinHandle;

use crate::broker::state::{ConnectionMonitor, ConnectionState, ConnectionTracker};
use crate::broker::transport::{session_options, BrokerPublisher, MqttPublisher, QosLevel};
use crate::config::BrokerConfig;
use crate::lifecycle::{CancelHandle, CancelPair};

/// Capacity of the rumqttc request queue between client and event loop.
const CLIENT_QUEUE_CAPACITY: usize = 16;

/// Owner of the single broker session.
///
/// At most one session exists at a time: `connect` while a session is open
/// is a no-op, and `teardown` fully releases the old session before a new
/// one can be opened. State transitions are reported only by the session
/// driver task; everything else observes through [`ConnectionMonitor`].
pub struct ConnectionManager {
    tracker: ConnectionTracker,
    session: Mutex<Option<Session>>,
    dropped: AtomicU64,
}

struct Session {
    publisher: Arc<dyn BrokerPublisher>,
    cancel: CancelPair,
    driver: Option<JoinHandle<()>>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self {
            tracker: ConnectionTracker::new(),
            session: Mutex::new(None),
            dropped: AtomicU64::new(0),
        }
    }

    /// Open the broker session and start its driver task.
    ///
    /// Idempotent: if a session is already open or connecting, the call is
    /// ignored. Reconnection is the transport's job: the driver keeps
    /// polling the event loop and only reflects what it reports.
    pub fn connect(&self, config: &BrokerConfig) {
        let mut session = self.session.lock();
        if session.is_some() {
            tracing::debug!("connect ignored: broker session already active");
            return;
        }

        let (client_id, options) = session_options(config);
        let (client, event_loop) = AsyncClient::new(options, CLIENT_QUEUE_CAPACITY);
        let cancel = CancelPair::new();

        let driver = tokio::spawn(drive_session(
            event_loop,
            self.tracker.clone(),
            cancel.handle(),
            Duration::from_secs(config.reconnect_delay_seconds),
        ));

        *session = Some(Session {
            publisher: Arc::new(MqttPublisher::new(client)),
            cancel,
            driver: Some(driver),
        });

        tracing::info!(
            client_id = %client_id,
            host = %config.host,
            port = config.port,
            "Broker session opened"
        );
    }

    /// Observer handle for the connection state machine.
    pub fn monitor(&self) -> ConnectionMonitor {
        self.tracker.monitor()
    }

    /// Current state, read synchronously.
    pub fn state(&self) -> ConnectionState {
        self.tracker.state()
    }

    /// Publish one payload at QoS 2, retain off.
    ///
    /// Only valid while Connected; in any other state the payload is
    /// dropped and counted, never queued. Transport-level failures are
    /// logged and swallowed; the caller has no recovery beyond what the
    /// session driver already does.
    pub async fn publish(&self, topic: &str, payload: Vec<u8>) {
        let state = self.tracker.state();
        if state != ConnectionState::Connected {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(
                topic,
                state = state.label(),
                "Publish dropped: not connected"
            );
            return;
        }

        let publisher = {
            let session = self.session.lock();
            session.as_ref().map(|s| Arc::clone(&s.publisher))
        };
        let Some(publisher) = publisher else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(topic, "Publish dropped: no active session");
            return;
        };

        if let Err(err) = publisher
            .publish(topic, QosLevel::ExactlyOnce, false, payload)
            .await
        {
            tracing::warn!(topic, error = %err, "Publish failed");
        }
    }

    /// Number of publishes rejected at this layer because no session was
    /// connected.
    pub fn dropped_publishes(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Close the active session and release its resources.
    ///
    /// Safe to call from any state and idempotent. After return, the driver
    /// task has exited, so no further state transitions fire.
    pub async fn teardown(&self) {
        let taken = self.session.lock().take();
        let Some(mut session) = taken else {
            self.tracker.set(ConnectionState::Disconnected);
            return;
        };

        session.cancel.cancel();
        if let Err(err) = session.publisher.disconnect().await {
            tracing::debug!(error = %err, "Disconnect request failed during teardown");
        }
        if let Some(driver) = session.driver.take() {
            let _ = driver.await;
        }

        self.tracker.set(ConnectionState::Disconnected);
        tracing::info!("Broker session closed");
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Session driver: polls the transport event loop until cancelled,
/// mirroring reported events into the state machine.
///
/// rumqttc reconnects by being polled again after an error; the delay here
/// only paces that retry, it is not a backoff policy of our own.
async fn drive_session(
    mut event_loop: EventLoop,
    tracker: ConnectionTracker,
    cancel: CancelHandle,
    reconnect_delay: Duration,
) {
    tracker.set(ConnectionState::Connecting);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            event = event_loop.poll() => match event {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    tracker.set(ConnectionState::Connected);
                }
                Ok(Event::Incoming(Packet::Disconnect)) => {
                    tracker.set(ConnectionState::Disconnected);
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(error = %err, "Broker transport error");
                    tracker.set(ConnectionState::Disconnected);
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(reconnect_delay) => {}
                    }
                    tracker.set(ConnectionState::Connecting);
                }
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::testing::FakePublisher;
    use super::*;

    #[tokio::test]
    async fn publish_is_rejected_unless_connected() {
        let publisher = Arc::new(FakePublisher::default());
        let manager = ConnectionManager::with_fake(publisher.clone());

        manager.publish("t", b"disconnected".to_vec()).await;
        manager.force_state(ConnectionState::Connecting);
        manager.publish("t", b"connecting".to_vec()).await;

        assert_eq!(publisher.publish_count(), 0);
        assert_eq!(manager.dropped_publishes(), 2);
    }

    #[tokio::test]
    async fn publish_while_connected_reaches_transport_at_qos2() {
        let publisher = Arc::new(FakePublisher::default());
        let manager = ConnectionManager::with_fake(publisher.clone());
        manager.force_state(ConnectionState::Connected);

        manager.publish("flutter/weather_data", b"payload".to_vec()).await;

        let records = publisher.published.lock();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].topic, "flutter/weather_data");
        assert_eq!(records[0].qos, QosLevel::ExactlyOnce);
        assert!(!records[0].retain);
        assert_eq!(records[0].payload, b"payload");
        assert_eq!(manager.dropped_publishes(), 0);
    }

    #[tokio::test]
    async fn publish_transport_failure_is_swallowed() {
        let publisher = Arc::new(FakePublisher::default());
        publisher
            .fail_publishes
            .store(true, std::sync::atomic::Ordering::SeqCst);
        let manager = ConnectionManager::with_fake(publisher.clone());
        manager.force_state(ConnectionState::Connected);

        // Must not panic or surface the failure.
        manager.publish("t", b"x".to_vec()).await;
        assert_eq!(publisher.publish_count(), 0);
    }

    #[tokio::test]
    async fn teardown_twice_releases_once() {
        let publisher = Arc::new(FakePublisher::default());
        let manager = ConnectionManager::with_fake(publisher.clone());
        manager.force_state(ConnectionState::Connected);

        manager.teardown().await;
        manager.teardown().await;

        assert_eq!(
            publisher
                .disconnects
                .load(std::sync::atomic::Ordering::SeqCst),
            1
        );
        assert_eq!(manager.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn publish_after_teardown_is_dropped() {
        let publisher = Arc::new(FakePublisher::default());
        let manager = ConnectionManager::with_fake(publisher.clone());
        manager.force_state(ConnectionState::Connected);
        manager.teardown().await;

        manager.publish("t", b"late".to_vec()).await;
        assert_eq!(publisher.publish_count(), 0);
        assert_eq!(manager.dropped_publishes(), 1);
    }

    #[tokio::test]
    async fn connect_is_idempotent_and_teardown_reaches_terminal_state() {
        let manager = ConnectionManager::new();
        let config = BrokerConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            reconnect_delay_seconds: 1,
            ..BrokerConfig::default()
        };

        manager.connect(&config);
        manager.connect(&config);
        assert!(manager.session.lock().is_some());

        manager.teardown().await;
        assert_eq!(manager.state(), ConnectionState::Disconnected);
        assert!(manager.session.lock().is_none());
    }

    #[tokio::test]
    async fn connect_after_teardown_opens_fresh_session() {
        let manager = ConnectionManager::new();
        let config = BrokerConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            reconnect_delay_seconds: 1,
            ..BrokerConfig::default()
        };

        manager.connect(&config);
        manager.teardown().await;
        manager.connect(&config);
        assert!(manager.session.lock().is_some());
        manager.teardown().await;
    }
}

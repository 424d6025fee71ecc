//! Broker session ownership and connectivity state.
//!
//! One [`ConnectionManager`] owns one live-or-pending MQTT session.
//! Connectivity is an explicit state machine observed through
//! [`ConnectionMonitor`]; the transport client owns retry and backoff,
//! the manager only reflects what it reports.

mod manager;
mod state;
mod transport;

#[cfg(test)]
pub(crate) use manager::testing;

pub use manager::ConnectionManager;
pub use state::{ConnectionMonitor, ConnectionState};
pub use transport::{BrokerPublisher, MqttPublisher, QosLevel, TransportError};

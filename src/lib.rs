//! skybridge: bridges device notification events and periodic weather
//! samples onto a publish/subscribe broker over one persistent MQTT
//! session.
//!
//! The crate is organized around a forwarding pipeline fed by two
//! independent producers:
//!
//! ```text
//! WeatherSampler ──┐
//!                  ├─> ForwardingPipeline ─> ConnectionManager ─> broker
//! IngestListener ──┘         │
//!  (notifications)           └─> StateSurface (read-only projection)
//! ```
//!
//! Messages are published exactly once or dropped, never queued for
//! replay. The broker transport owns reconnection; the connection manager
//! only reflects the state it reports.

pub mod broker;
pub mod config;
pub mod ingest;
pub mod lifecycle;
pub mod location;
pub mod notify;
pub mod pipeline;
pub mod surface;
pub mod weather;

#[cfg(test)]
pub(crate) mod test_support;

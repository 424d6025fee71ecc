//! Local ingest socket: the headless delivery channel for notification
//! events, plus runtime control frames (forwarding toggle, location
//! update, status query).

mod frame;
mod listener;

pub use frame::{classify, FrameError, IngestFrame};
pub use listener::{IngestHandle, IngestListener};

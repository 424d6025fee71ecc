use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::notify::event::{parse_event, ParseError};
use crate::pipeline::{ForwardableMessage, ForwardingPipeline};

/// User-controlled gate over notification forwarding. Process-lifetime
/// only; weather forwarding is never gated by this flag.
#[derive(Clone)]
pub struct ForwardingFlag {
    enabled: Arc<AtomicBool>,
}

impl ForwardingFlag {
    pub fn new(initial: bool) -> Self {
        Self {
            enabled: Arc::new(AtomicBool::new(initial)),
        }
    }

    pub fn set(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn get(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }
}

/// What happened to one relayed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Parsed and submitted to the pipeline.
    Forwarded,
    /// Parsed, then discarded because forwarding is disabled.
    Gated,
}

/// Stateless per-event transform of raw notification events.
///
/// May be invoked from any execution context without the rest of the app
/// running; its only dependencies are the pipeline handle and the gate
/// flag. Parsing happens before the gate, so malformed input is diagnosed
/// even while forwarding is off.
pub struct NotificationRelay {
    pipeline: Arc<ForwardingPipeline>,
    flag: ForwardingFlag,
}

impl NotificationRelay {
    pub fn new(pipeline: Arc<ForwardingPipeline>, flag: ForwardingFlag) -> Self {
        Self { pipeline, flag }
    }

    /// Handle one raw event. Never panics on malformed input; the error is
    /// logged here and returned for observability only.
    pub async fn handle_event(&self, raw: &str) -> Result<RelayOutcome, ParseError> {
        let message = match parse_event(raw) {
            Ok(message) => message,
            Err(err) => {
                tracing::warn!(error = %err, "Notification event dropped");
                return Err(err);
            }
        };

        if !self.flag.get() {
            tracing::debug!(
                source_app = %message.source_app,
                "Notification gated: forwarding disabled"
            );
            return Ok(RelayOutcome::Gated);
        }

        self.pipeline
            .submit(ForwardableMessage::Notification(message))
            .await;
        Ok(RelayOutcome::Forwarded)
    }
}

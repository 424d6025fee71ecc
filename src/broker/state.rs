use tokio::sync::watch;

/// Connectivity of the single broker session.
///
/// Transitions are driven only by the session driver inside
/// `ConnectionManager`; every other component holds a [`ConnectionMonitor`]
/// and reads, never writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionState {
    /// Human-readable label, as shown on the status surface.
    pub fn label(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "Disconnected",
            ConnectionState::Connecting => "Connecting",
            ConnectionState::Connected => "Connected",
        }
    }
}

/// Writer side of the connection state machine.
///
/// Cloneable so the session driver task can report transitions; all clones
/// share one underlying channel.
#[derive(Clone)]
pub(crate) struct ConnectionTracker {
    tx: watch::Sender<ConnectionState>,
}

impl ConnectionTracker {
    pub(crate) fn new() -> Self {
        let (tx, _rx) = watch::channel(ConnectionState::Disconnected);
        Self { tx }
    }

    /// Record a transition. Same-state updates are dropped so observers
    /// only wake on real changes.
    pub(crate) fn set(&self, next: ConnectionState) {
        let previous = *self.tx.borrow();
        if previous == next {
            return;
        }
        self.tx.send_replace(next);
        tracing::info!(
            from = previous.label(),
            to = next.label(),
            "Broker connection state changed"
        );
    }

    pub(crate) fn state(&self) -> ConnectionState {
        *self.tx.borrow()
    }

    pub(crate) fn monitor(&self) -> ConnectionMonitor {
        ConnectionMonitor {
            rx: self.tx.subscribe(),
        }
    }
}

/// Read-only observer of the connection state machine.
///
/// Supports both the synchronous pre-publish query and asynchronous
/// observation of transitions. Dropping a monitor deregisters it.
#[derive(Clone)]
pub struct ConnectionMonitor {
    rx: watch::Receiver<ConnectionState>,
}

impl ConnectionMonitor {
    /// Current state, read synchronously.
    pub fn state(&self) -> ConnectionState {
        *self.rx.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Wait for the next transition and return the new state.
    ///
    /// Returns `None` if the owning manager has gone away.
    pub async fn changed(&mut self) -> Option<ConnectionState> {
        match self.rx.changed().await {
            Ok(()) => Some(*self.rx.borrow()),
            Err(_) => None,
        }
    }
}

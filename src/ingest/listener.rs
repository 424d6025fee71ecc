use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::{UnixListener, UnixStream};
use tokio::task::JoinHandle;

use crate::ingest::frame::{classify, IngestFrame};
use crate::lifecycle::{CancelHandle, CancelPair};
use crate::location::LastFix;
use crate::notify::{ForwardingFlag, NotificationRelay};
use crate::surface::StateSurface;

/// Headless delivery endpoint: a Unix socket accepting newline-delimited
/// JSON frames.
///
/// This is the only entry point that runs without the rest of the app's
/// context, so it holds nothing but the handles it needs: the relay, the
/// gate flag, the fix store, and the read-only surface.
pub struct IngestListener {
    relay: Arc<NotificationRelay>,
    flag: ForwardingFlag,
    fix: LastFix,
    surface: StateSurface,
}

/// Owner handle for a bound listener. Dropping it leaks the task; call
/// [`shutdown`](IngestHandle::shutdown) on the owning lifecycle's exit.
pub struct IngestHandle {
    cancel: CancelPair,
    task: JoinHandle<()>,
    socket_path: PathBuf,
}

impl IngestHandle {
    /// Stop accepting and serving. Idempotent via take-once ownership;
    /// safe to call regardless of connection activity.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        self.task.abort();
        let _ = self.task.await;
        let _ = std::fs::remove_file(&self.socket_path);
        tracing::info!("Ingest listener stopped");
    }
}

impl IngestListener {
    pub fn new(
        relay: Arc<NotificationRelay>,
        flag: ForwardingFlag,
        fix: LastFix,
        surface: StateSurface,
    ) -> Self {
        Self {
            relay,
            flag,
            fix,
            surface,
        }
    }

    /// Bind the socket and start serving.
    pub fn bind(self, socket_path: &Path) -> std::io::Result<IngestHandle> {
        // A stale socket from a crashed run would make bind fail.
        let _ = std::fs::remove_file(socket_path);

        let listener = UnixListener::bind(socket_path)?;
        let cancel = CancelPair::new();
        let task = tokio::spawn(accept_loop(listener, Arc::new(self), cancel.handle()));

        tracing::info!(path = %socket_path.display(), "Ingest listener bound");
        Ok(IngestHandle {
            cancel,
            task,
            socket_path: socket_path.to_path_buf(),
        })
    }

    async fn handle_line(&self, line: &str, writer: &mut OwnedWriteHalf) {
        match classify(line) {
            Ok(IngestFrame::Notification(raw)) => {
                // Relay logs parse failures itself; nothing to add here.
                let _ = self.relay.handle_event(&raw).await;
            }
            Ok(IngestFrame::Forwarding(enabled)) => {
                self.flag.set(enabled);
                tracing::info!(enabled, "Notification forwarding toggled");
            }
            Ok(IngestFrame::Location(coordinate)) => {
                self.fix.set(coordinate);
                tracing::info!(
                    latitude = coordinate.latitude,
                    longitude = coordinate.longitude,
                    "Location fix updated"
                );
            }
            Ok(IngestFrame::Status) => {
                let status = self.surface.snapshot();
                match serde_json::to_string(&status) {
                    Ok(mut reply) => {
                        reply.push('\n');
                        if let Err(err) = writer.write_all(reply.as_bytes()).await {
                            tracing::debug!(error = %err, "Status reply failed");
                        }
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "Status encoding failed");
                    }
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "Ingest frame skipped");
            }
        }
    }
}

async fn accept_loop(listener: UnixListener, ctx: Arc<IngestListener>, cancel: CancelHandle) {
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, _addr)) => {
                    tokio::spawn(serve_connection(stream, Arc::clone(&ctx), cancel.clone()));
                }
                Err(err) => {
                    tracing::warn!(error = %err, "Ingest accept failed");
                    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                }
            }
        }
    }
}

async fn serve_connection(stream: UnixStream, ctx: Arc<IngestListener>, cancel: CancelHandle) {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    ctx.handle_line(line, &mut writer).await;
                }
                Ok(None) => break,
                Err(err) => {
                    tracing::debug!(error = %err, "Ingest connection read failed");
                    break;
                }
            }
        }
    }
}

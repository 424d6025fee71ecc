use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::lifecycle::{CancelHandle, CancelPair};
use crate::location::LastFix;
use crate::pipeline::{ForwardableMessage, ForwardingPipeline};
use crate::weather::provider::WeatherProvider;
use crate::weather::snapshot::WeatherSnapshot;

/// Timer-driven weather sampling.
///
/// Owns at most one timer: starting while active cancels the previous
/// timer first, so restarts never double the tick rate. Each tick performs
/// one lookup against the latest known coordinate; a failed tick is logged
/// and skipped with no retry before the next scheduled tick.
pub struct WeatherSampler {
    provider: Arc<dyn WeatherProvider>,
    fix: LastFix,
    pipeline: Arc<ForwardingPipeline>,
    active: Mutex<Option<ActiveTimer>>,
}

struct ActiveTimer {
    cancel: CancelPair,
    task: JoinHandle<()>,
}

impl WeatherSampler {
    pub fn new(
        provider: Arc<dyn WeatherProvider>,
        fix: LastFix,
        pipeline: Arc<ForwardingPipeline>,
    ) -> Self {
        Self {
            provider,
            fix,
            pipeline,
            active: Mutex::new(None),
        }
    }

    /// Sample immediately, then every `interval` until [`stop`](Self::stop).
    pub fn start(&self, interval: Duration) {
        let mut active = self.active.lock();
        if let Some(previous) = active.take() {
            previous.release();
            tracing::debug!("Previous weather timer cancelled before restart");
        }

        let cancel = CancelPair::new();
        let task = tokio::spawn(run_timer(
            Arc::clone(&self.provider),
            self.fix.clone(),
            Arc::clone(&self.pipeline),
            interval,
            cancel.handle(),
        ));
        *active = Some(ActiveTimer { cancel, task });
        tracing::info!(interval_ms = interval.as_millis() as u64, "Weather sampling started");
    }

    /// Cancel the timer. After return it will not fire again.
    /// Safe to call when idle and idempotent.
    pub fn stop(&self) {
        if let Some(previous) = self.active.lock().take() {
            previous.release();
            tracing::info!("Weather sampling stopped");
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.lock().is_some()
    }
}

impl ActiveTimer {
    fn release(self) {
        self.cancel.cancel();
        // The signal alone settles the next select; abort also kills a
        // tick already past the select, satisfying "no fire after return".
        self.task.abort();
    }
}

async fn run_timer(
    provider: Arc<dyn WeatherProvider>,
    fix: LastFix,
    pipeline: Arc<ForwardingPipeline>,
    interval: Duration,
    cancel: CancelHandle,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                sample_once(provider.as_ref(), &fix, &pipeline).await;
            }
        }
    }
}

async fn sample_once(provider: &dyn WeatherProvider, fix: &LastFix, pipeline: &ForwardingPipeline) {
    let Some(coordinate) = fix.get() else {
        tracing::debug!("Weather tick skipped: no location fix yet");
        return;
    };

    match provider.observe(coordinate).await {
        Ok(reading) => {
            let snapshot = WeatherSnapshot::from_reading(&reading);
            pipeline.submit(ForwardableMessage::Weather(snapshot)).await;
        }
        Err(err) => {
            tracing::warn!(error = %err, "Weather sample failed; tick skipped");
        }
    }
}

use std::sync::{Arc, mpsc};
use std::thread;
use std::time::{Duration, Instant};

use tokio::runtime::Handle;
use tracing::{info, warn};

use crate::store::StorefrontStore;

use super::{NotificationDispatcher, NotificationStore};

/// Post-commit hook: wakes the notification worker.
///
/// Cloned into every service that commits stock changes. Signals are
/// coalesced (bounded queue of one); a disabled signal does nothing, and the
/// worker's interval tick still picks up pending records.
#[derive(Debug, Clone, Default)]
pub struct OutboxSignal {
    tx: Option<mpsc::SyncSender<()>>,
}

/// Receiving side of an [`OutboxSignal`], consumed by the worker.
#[derive(Debug)]
pub struct OutboxTrigger {
    rx: mpsc::Receiver<()>,
}

impl OutboxSignal {
    pub fn channel() -> (OutboxSignal, OutboxTrigger) {
        let (tx, rx) = mpsc::sync_channel::<()>(1);
        (OutboxSignal { tx: Some(tx) }, OutboxTrigger { rx })
    }

    /// A signal with no worker behind it.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Call after a successful commit.
    pub fn notify(&self) {
        if let Some(tx) = &self.tx {
            // Coalesce: channel capacity=1; ignore if already full.
            let _ = tx.try_send(());
        }
    }
}

/// Config for the notification worker.
#[derive(Debug, Clone)]
pub struct NotificationWorker {
    pub interval: Duration,
    pub max_retries: u32,
    pub base_backoff: Duration,
}

impl Default for NotificationWorker {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_retries: 5,
            base_backoff: Duration::from_millis(250),
        }
    }
}

/// Handle for the running worker thread.
#[derive(Debug)]
pub struct NotificationWorkerHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
}

impl NotificationWorkerHandle {
    /// Stop the worker and wait for its thread. Blocks; from async code call
    /// it inside `spawn_blocking`.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }
}

impl NotificationWorker {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval.max(Duration::from_millis(1));
        self
    }

    /// Spawn the worker on its own thread.
    ///
    /// - Schedule: dispatches every `interval`, and once on startup
    /// - Event-trigger: dispatches as soon as the paired [`OutboxSignal`] fires
    /// - Failures: logged + retried with bounded exponential backoff; never propagate
    ///
    /// `runtime` drives the async store calls.
    pub fn spawn<S, N>(
        &self,
        name: &'static str,
        runtime: Handle,
        dispatcher: Arc<NotificationDispatcher<S, N>>,
        trigger: OutboxTrigger,
    ) -> std::io::Result<NotificationWorkerHandle>
    where
        S: StorefrontStore + ?Sized,
        N: NotificationStore + ?Sized,
    {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let cfg = self.clone();
        let join = thread::Builder::new().name(name.to_string()).spawn(move || {
            worker_loop(name, cfg, runtime, shutdown_rx, trigger.rx, dispatcher)
        })?;

        Ok(NotificationWorkerHandle {
            shutdown: shutdown_tx,
            join: Some(join),
        })
    }
}

fn worker_loop<S, N>(
    name: &'static str,
    cfg: NotificationWorker,
    runtime: Handle,
    shutdown_rx: mpsc::Receiver<()>,
    trigger_rx: mpsc::Receiver<()>,
    dispatcher: Arc<NotificationDispatcher<S, N>>,
) where
    S: StorefrontStore + ?Sized,
    N: NotificationStore + ?Sized,
{
    info!(worker = name, "notification worker started");

    let mut next_tick = Instant::now() + cfg.interval;
    let mut pending = true; // drain leftovers on startup
    let mut failures: u32 = 0;
    let mut backoff_until: Option<Instant> = None;

    loop {
        // Shutdown has priority.
        if shutdown_rx.try_recv().is_ok() {
            break;
        }

        let now = Instant::now();
        if now >= next_tick {
            pending = true;
            while next_tick <= now {
                next_tick += cfg.interval;
            }
        }

        while trigger_rx.try_recv().is_ok() {
            pending = true;
        }

        if let Some(until) = backoff_until {
            if Instant::now() < until {
                thread::sleep(Duration::from_millis(20));
                continue;
            }
            backoff_until = None;
        }

        if !pending {
            let sleep_for = next_tick
                .saturating_duration_since(Instant::now())
                .min(Duration::from_millis(20));
            thread::sleep(sleep_for);
            continue;
        }

        pending = false;

        match runtime.block_on(dispatcher.dispatch_pending()) {
            Ok(report) => {
                failures = 0;
                // Keep draining until a pass finds nothing.
                if report.records > 0 {
                    pending = true;
                }
            }
            Err(e) => {
                warn!(
                    worker = name,
                    error = %e,
                    attempt = failures + 1,
                    "notification dispatch failed"
                );
                failures += 1;
                if failures <= cfg.max_retries {
                    pending = true;
                    backoff_until = Some(Instant::now() + backoff(cfg.base_backoff, failures));
                } else {
                    failures = 0;
                }
            }
        }
    }

    info!(worker = name, "notification worker stopped");
}

fn backoff(base: Duration, attempt: u32) -> Duration {
    // Exponential backoff: base * 2^(attempt-1), capped.
    let pow = 1u32 << attempt.saturating_sub(1).min(10);
    let ms = base.as_millis().saturating_mul(pow as u128);
    Duration::from_millis(ms.min(10_000) as u64)
}

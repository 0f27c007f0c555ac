//! Asynchronous fan-out of access events to analytics sinks.

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::domain::access_event::AccessEvent;
use crate::domain::dispatcher::{AccessNotifier, EventDispatcher};
use crate::telemetry;

/// Bounded, lossy queue of access events drained by a small worker pool.
///
/// Lookups hand events over with [`AccessNotifier::notify`], which never
/// waits: a full queue drops the event. Each event is sent to every
/// dispatcher; a failing dispatcher is logged and skipped.
pub struct AnalyticsService {
    tx: mpsc::Sender<AccessEvent>,
}

impl AnalyticsService {
    /// Starts `workers` tasks sharing one queue of `capacity` events.
    ///
    /// Workers exit once the service and every clone of its sender are dropped.
    pub fn start(
        dispatchers: Vec<Arc<dyn EventDispatcher>>,
        workers: usize,
        capacity: usize,
    ) -> (Self, Vec<JoinHandle<()>>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let rx = Arc::new(Mutex::new(rx));
        let dispatchers: Arc<[Arc<dyn EventDispatcher>]> = dispatchers.into();

        let handles = (0..workers.max(1))
            .map(|id| tokio::spawn(run_worker(id, rx.clone(), dispatchers.clone())))
            .collect();

        tracing::info!(
            workers = workers.max(1),
            capacity,
            sinks = dispatchers.len(),
            "analytics workers started"
        );

        (Self { tx }, handles)
    }
}

impl AccessNotifier for AnalyticsService {
    fn notify(&self, event: AccessEvent) {
        if let Err(e) = self.tx.try_send(event) {
            let event = match e {
                mpsc::error::TrySendError::Full(event) => event,
                mpsc::error::TrySendError::Closed(event) => event,
            };
            warn!(code = %event.code, "analytics queue unavailable, dropping access event");
            telemetry::access_event_dropped();
        }
    }
}

async fn run_worker(
    id: usize,
    rx: Arc<Mutex<mpsc::Receiver<AccessEvent>>>,
    dispatchers: Arc<[Arc<dyn EventDispatcher>]>,
) {
    loop {
        // The lock is released before dispatching so other workers can pick
        // up the next event.
        let Some(event) = rx.lock().await.recv().await else {
            break;
        };

        for dispatcher in dispatchers.iter() {
            if let Err(e) = dispatcher.send(&event).await {
                warn!(
                    sink = dispatcher.name(),
                    code = %event.code,
                    error = %e,
                    "failed to dispatch access event"
                );
            }
        }
    }

    debug!(worker = id, "analytics worker stopped");
}

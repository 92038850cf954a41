//! Dispatcher (§4.E) + Worker Pool (§4.D): the engine's concurrency core.
//!
//! Translated from the original's "one coordinator goroutine + N worker
//! goroutines + an idle-worker channel" topology (§9 design note) into tokio
//! tasks joined by `mpsc` channels. One dispatcher task claims due items from
//! the `Store` and routes them to whichever worker task last reported idle;
//! each worker task owns exactly one In-flight Set slot for its lifetime.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use super::driver::DriverRegistry;
use super::inflight::InFlightSet;
use super::item::{Item, State};
use super::scheduler::SchedulerFn;
use super::store::Store;

fn now_unix() -> i64 {
    Utc::now().timestamp()
}

/// Tunables the engine is constructed with. `max_tries=0` and
/// `max_threads=0` are normalized by the caller (see `EngineConfig::normalize`)
/// per the §8 boundary behaviors — `0` tries means unbounded, `0` threads
/// means one.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub max_threads: u32,
    pub max_tries: u32,
    pub poll_interval: Duration,
}

impl EngineConfig {
    pub fn normalize(mut self) -> Self {
        if self.max_threads == 0 {
            self.max_threads = 1;
        }
        if self.max_tries == 0 {
            self.max_tries = u32::MAX;
        }
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_threads: 4,
            max_tries: 10,
            poll_interval: Duration::from_secs(1),
        }
    }
}

/// A running Dispatcher + Worker Pool. Dropping this without calling
/// `shutdown` abandons the background tasks — always prefer `shutdown`.
pub struct Engine {
    cancel: CancellationToken,
    dispatcher: JoinHandle<Vec<mpsc::Sender<Item>>>,
    workers: Vec<JoinHandle<()>>,
}

impl Engine {
    /// Register all drivers and build the registry/In-flight Set/Store
    /// before calling this — the registry is immutable once the dispatcher
    /// snapshots `driver_names()` here.
    pub fn start(
        store: Arc<dyn Store>,
        registry: Arc<DriverRegistry>,
        inflight: Arc<InFlightSet>,
        scheduler: SchedulerFn,
        config: EngineConfig,
    ) -> Self {
        let config = config.normalize();
        let max_threads = config.max_threads as usize;
        let cancel = CancellationToken::new();

        let (idle_tx, idle_rx) = mpsc::channel::<usize>(max_threads);
        let mut worker_txs = Vec::with_capacity(max_threads);
        let mut workers = Vec::with_capacity(max_threads);

        for slot in 0..max_threads {
            let (work_tx, work_rx) = mpsc::channel::<Item>(1);
            worker_txs.push(work_tx);

            let handle = tokio::spawn(worker_loop(
                slot,
                work_rx,
                idle_tx.clone(),
                store.clone(),
                registry.clone(),
                inflight.clone(),
                scheduler.clone(),
                config.max_tries,
            ));
            workers.push(handle);

            // Seed the idle queue: every worker starts ready for work.
            let _ = idle_tx.try_send(slot);
        }

        // The dispatcher keeps its own clone so it can requeue a slot that
        // never received work (the "nothing to send" path) — only workers
        // requeue themselves after actually finishing an item. Once this
        // clone and every worker's clone are dropped, `idle_rx` closes.
        let dispatcher_idle_tx = idle_tx.clone();
        drop(idle_tx);

        let dispatcher = tokio::spawn(dispatcher_loop(
            idle_rx,
            dispatcher_idle_tx,
            worker_txs,
            store,
            registry,
            inflight,
            config.max_tries,
            config.poll_interval,
            cancel.clone(),
        ));

        Self {
            cancel,
            dispatcher,
            workers,
        }
    }

    /// Stop accepting new claims, close every worker's inbound channel, and
    /// wait up to `deadline` for in-flight attempts to drain. If the deadline
    /// elapses first this returns anyway: no `update` is lost, because a
    /// worker only pre-increments its in-memory copy of `tried` before
    /// calling the driver — the Store is untouched until `update` actually
    /// runs, so an abandoned attempt is simply re-claimable on next start.
    pub async fn shutdown(self, deadline: Duration) {
        self.cancel.cancel();

        let join_all = async {
            // Dropping the dispatcher's owned `worker_txs` (once it returns)
            // closes every worker's inbound channel, waking any worker
            // blocked on `recv()`.
            let _ = self.dispatcher.await;
            for worker in self.workers {
                let _ = worker.await;
            }
        };

        if tokio::time::timeout(deadline, join_all).await.is_err() {
            warn!("engine shutdown deadline elapsed with workers still draining");
        }
    }
}

async fn dispatcher_loop(
    mut idle_rx: mpsc::Receiver<usize>,
    self_idle_tx: mpsc::Sender<usize>,
    worker_txs: Vec<mpsc::Sender<Item>>,
    store: Arc<dyn Store>,
    registry: Arc<DriverRegistry>,
    inflight: Arc<InFlightSet>,
    max_tries: u32,
    poll_interval: Duration,
    cancel: CancellationToken,
) -> Vec<mpsc::Sender<Item>> {
    let enabled_drivers = registry.driver_names();
    // The claim lock: wraps the `pending` query and the "publish my new id
    // into my slot" write so two concurrent claims can never both see a row
    // as unclaimed (§5 "Claim lock ordering").
    let claim_lock = AsyncMutex::new(());

    loop {
        let slot = tokio::select! {
            _ = cancel.cancelled() => break,
            maybe = idle_rx.recv() => match maybe {
                Some(slot) => slot,
                None => break,
            },
        };

        let claimed = {
            let _guard = claim_lock.lock().await;
            let now = now_unix();
            let busy = inflight.list();
            match store.pending(now, max_tries, &enabled_drivers, &busy).await {
                Ok(Some(item)) => {
                    if registry.contains(&item.driver) {
                        inflight.set(slot, item.id.clone());
                        Some(item)
                    } else {
                        // Shouldn't happen: `pending` filtered on
                        // `enabled_drivers`. Treat as nothing-to-send.
                        warn!(driver = %item.driver, id = %item.id, "claimed item references unregistered driver");
                        None
                    }
                }
                Ok(None) => None,
                Err(err) => {
                    error!(error = %err, "store.pending failed");
                    None
                }
            }
        };

        match claimed {
            Some(item) => {
                debug!(item_id = %item.id, driver = %item.driver, "dispatching claimed item");
                if worker_txs[slot].send(item).await.is_err() {
                    error!(slot, "worker channel closed while dispatching");
                }
            }
            None => {
                trace!("nothing to send, idling");
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(poll_interval) => {}
                }
                // This slot never received work, so it never reports itself
                // idle again — put it back ourselves.
                if self_idle_tx.send(slot).await.is_err() {
                    break;
                }
            }
        }
    }

    info!("dispatcher loop exiting");
    worker_txs
}

async fn worker_loop(
    slot: usize,
    mut work_rx: mpsc::Receiver<Item>,
    idle_tx: mpsc::Sender<usize>,
    store: Arc<dyn Store>,
    registry: Arc<DriverRegistry>,
    inflight: Arc<InFlightSet>,
    scheduler: SchedulerFn,
    max_tries: u32,
) {
    while let Some(item) = work_rx.recv().await {
        run_attempt(&item, &store, &registry, &scheduler, max_tries).await;
        inflight.clear(slot);
        if idle_tx.send(slot).await.is_err() {
            break;
        }
    }
}

/// One delivery attempt, matching the original's `thread.run`: compute the
/// next schedule, pre-increment `tried`, decide the terminal state *before*
/// calling the driver, then let a successful send always win.
async fn run_attempt(
    item: &Item,
    store: &Arc<dyn Store>,
    registry: &DriverRegistry,
    scheduler: &SchedulerFn,
    max_tries: u32,
) {
    let now = now_unix();
    let (next_at, stop) = scheduler(&item.driver, &item.id, now, item.tried);

    let mut tried = item.tried + 1;
    if stop {
        tried = max_tries;
    }
    let mut state = if tried >= max_tries {
        State::Failed
    } else {
        State::Pending
    };

    let driver = match registry.get(&item.driver) {
        Some(d) => d,
        None => {
            error!(item_id = %item.id, driver = %item.driver, "claimed item has no registered driver");
            return;
        }
    };

    let response = match driver.send(&item.endpoint, &item.content).await {
        Ok(resp) => {
            state = State::Success;
            info!(item_id = %item.id, tried, "delivery succeeded");
            Some(resp)
        }
        Err(err) => {
            warn!(item_id = %item.id, tried, error = %err.message, "delivery failed");
            Some(
                err.response
                    .unwrap_or_else(|| err.message.clone().into_bytes()),
            )
        }
    };

    if let Err(err) = store.update(&item.id, tried, next_at, state, response).await {
        // `update` is only ever fallible for transient I/O — a missing row
        // is a silent no-op by contract (§4.A), so a real error here is a
        // genuine store problem, not a lost race with `delete`.
        error!(item_id = %item.id, error = %err, "store.update failed after delivery attempt");
    }
}

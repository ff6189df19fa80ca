//! A tracking session: one feed, one coalescing buffer, one fleet map.
//!
//! The session object owns the connection, the flush timer and the buffers;
//! tearing it down releases all of them on every path.  Buffer and map share
//! one lock and a single pump task is the only writer, so readers always see
//! whole flushes, never a partial batch.
//!

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, trace};

use transit_sources::{ConnectionState, FeedHandle, FeedMessage, LiveFeed};

use crate::{Fleet, Pending, VehicleStatus, FLUSH_INTERVAL};

#[derive(Debug)]
struct Shared {
    pending: Pending,
    fleet: Fleet,
}

/// A running tracking session.
///
#[derive(Debug)]
pub struct Session {
    shared: Arc<Mutex<Shared>>,
    state: watch::Receiver<ConnectionState>,
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl Session {
    /// Wire the whole pipeline and start pumping.  `names` pre-registers the
    /// vehicles known from configuration.
    ///
    #[tracing::instrument(skip(feed, names))]
    pub fn start(feed: &LiveFeed, names: &BTreeMap<String, String>) -> Self {
        Self::with_interval(feed, names, FLUSH_INTERVAL)
    }

    /// Same, with an explicit flush cadence.  The freshness window follows
    /// it: twice the interval, tolerating one missed cycle.
    ///
    pub fn with_interval(
        feed: &LiveFeed,
        names: &BTreeMap<String, String>,
        every: Duration,
    ) -> Self {
        trace!("session::start");

        let mut fleet = Fleet::with_window(2 * every.as_millis() as i64);
        fleet.seed(names);

        let shared = Arc::new(Mutex::new(Shared {
            pending: Pending::new(),
            fleet,
        }));

        let handle = feed.start();
        let state = handle.state_watch();
        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(pump(handle, Arc::clone(&shared), every, stop_rx));

        Session {
            shared,
            state,
            stop: stop_tx,
            task,
        }
    }

    /// Owned fleet snapshot with derived online status, for display.
    ///
    pub fn snapshot(&self) -> Vec<VehicleStatus> {
        self.shared.lock().unwrap().fleet.snapshot(Utc::now())
    }

    /// Current feed connection state.
    ///
    pub fn connection(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Tear everything down: feed, flush timer, buffers.
    ///
    #[tracing::instrument(skip(self))]
    pub async fn stop(self) {
        trace!("session::stop");
        let _ = self.stop.send(true);
        let _ = self.task.await;
    }
}

/// The single writer: feed messages and the flush tick, serialized in one
/// select loop.
///
async fn pump(
    mut feed: FeedHandle,
    shared: Arc<Mutex<Shared>>,
    every: Duration,
    mut stop: watch::Receiver<bool>,
) {
    let mut tick = interval(every);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // `interval` fires immediately; the first flush belongs one period out.
    tick.tick().await;

    loop {
        tokio::select! {
            _ = stop.changed() => break,
            _ = tick.tick() => flush(&shared),
            msg = feed.recv() => match msg {
                Some(FeedMessage::Update { entity_id, position }) => {
                    shared.lock().unwrap().pending.push(entity_id, position);
                }
                Some(FeedMessage::Gone { entity_id }) => {
                    // Removal bypasses coalescing, and any buffered update
                    // dies with the vehicle.
                    let mut s = shared.lock().unwrap();
                    s.pending.discard(&entity_id);
                    s.fleet.remove(&entity_id);
                }
                Some(FeedMessage::Fatal(e)) => {
                    // Terminal; keep serving snapshots, vehicles will age
                    // into offline on their own.
                    error!("live feed is gone: {}", e);
                }
                None => break,
            },
        }
    }

    // Final flush so nothing buffered is lost on shutdown.
    flush(&shared);
    feed.stop().await;
    trace!("pump done");
}

fn flush(shared: &Mutex<Shared>) {
    let mut s = shared.lock().unwrap();
    if s.pending.is_empty() {
        // No-op flush, the map is not touched.
        return;
    }
    let batch = s.pending.flush();
    debug!("applying {} coalesced updates", batch.len());
    s.fleet.apply_batch(batch, Utc::now());
}

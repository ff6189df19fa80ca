//! Live position feed client.
//!
//! Keeps one long-lived TCP connection to the feed, reads newline-delimited
//! JSON events and forwards them as typed messages over a channel; the
//! consumer never sees the transport.  Transport failures are recovered with
//! capped backoff; once the attempt ceiling is hit the feed gives up for good
//! and the caller has to `start()` a fresh one.
//!
//! State machine:
//!
//! ```text
//! Disconnected → Connecting → Connected
//!                    ↑            │ transport error / close
//!                    └── Reconnecting (backoff, at most MAX_ATTEMPTS)
//! ```
//!

use std::cmp;
use std::time::Duration;

use strum::Display;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, trace, warn};

use transit_common::{Position, BB};
use transit_formats::{FeedEvent, Subscribe};

use crate::{Auth, FeedError, FeedSite};

/// Depth of the outbound message queue.
const FEED_QUEUE: usize = 256;

/// Connection state, readable at any time through [`FeedHandle::state`].
///
#[derive(Clone, Copy, Debug, Default, Display, Eq, PartialEq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

/// Reconnection policy.  A parameter so tests can run it at ms scale.
///
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    /// First backoff delay
    pub initial: Duration,
    /// Backoff ceiling, delays double up to this
    pub ceiling: Duration,
    /// Consecutive failures before giving up for good
    pub max_attempts: usize,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            initial: Duration::from_millis(1_000),
            ceiling: Duration::from_millis(5_000),
            max_attempts: 5,
        }
    }
}

impl RetryPolicy {
    fn next_delay(&self, current: Duration) -> Duration {
        cmp::min(current * 2, self.ceiling)
    }
}

/// What consumers receive.
///
#[derive(Debug)]
pub enum FeedMessage {
    /// Fresh position for one vehicle.
    Update {
        entity_id: String,
        position: Position,
    },
    /// The vehicle signed off, remove it everywhere.
    Gone { entity_id: String },
    /// The feed is dead and will not come back on its own.
    Fatal(FeedError),
}

/// Client-side description of the feed, built from config.
///
#[derive(Clone, Debug)]
pub struct LiveFeed {
    /// host:port taken from config
    addr: String,
    /// Opaque per-session bearer token
    token: String,
    /// Only forward events inside this area
    bbox: Option<BB>,
    /// Reconnection policy
    policy: RetryPolicy,
}

impl LiveFeed {
    /// Load endpoint & credentials from in-memory loaded config
    ///
    #[tracing::instrument]
    pub fn new(site: &FeedSite) -> Self {
        trace!("livefeed::new");

        let token = match &site.auth {
            Some(Auth::Token { token }) => token.clone(),
            _ => String::new(),
        };
        LiveFeed {
            addr: site.base_url.clone(),
            token,
            bbox: None,
            policy: RetryPolicy::default(),
        }
    }

    /// Restrict the feed to a geographic area.
    ///
    pub fn with_bbox(mut self, bbox: BB) -> Self {
        self.bbox = Some(bbox);
        self
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Spawn the feed task.  Messages arrive on the returned handle; the
    /// handle is also the only way to stop the task.
    ///
    #[tracing::instrument(skip(self))]
    pub fn start(&self) -> FeedHandle {
        let (tx, rx) = mpsc::channel(FEED_QUEUE);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let (stop_tx, stop_rx) = watch::channel(false);

        let feed = self.clone();
        let task = tokio::spawn(async move {
            feed.run(tx, state_tx, stop_rx).await;
        });

        FeedHandle {
            events: rx,
            state: state_rx,
            stop: stop_tx,
            task,
        }
    }

    /// Connection loop: connect, pump, reconnect with backoff, give up after
    /// the attempt ceiling.
    ///
    async fn run(
        self,
        out: mpsc::Sender<FeedMessage>,
        state: watch::Sender<ConnectionState>,
        mut stop: watch::Receiver<bool>,
    ) {
        let mut attempts = 0usize;
        let mut delay = self.policy.initial;

        loop {
            if *stop.borrow() {
                let _ = state.send(ConnectionState::Disconnected);
                return;
            }
            let _ = state.send(ConnectionState::Connecting);

            match self
                .session(&out, &state, &mut stop, &mut attempts, &mut delay)
                .await
            {
                // Explicit stop, terminal.
                //
                Ok(()) => {
                    trace!("feed stopped");
                    let _ = state.send(ConnectionState::Disconnected);
                    return;
                }
                Err(e) => {
                    attempts += 1;
                    if attempts >= self.policy.max_attempts {
                        error!("giving up after {} attempts: {}", attempts, e);
                        let _ = state.send(ConnectionState::Disconnected);
                        let _ = out
                            .send(FeedMessage::Fatal(FeedError::AttemptsExhausted(attempts)))
                            .await;
                        return;
                    }

                    warn!(
                        "feed error ({}), retrying in {}ms",
                        e,
                        delay.as_millis()
                    );
                    let _ = state.send(ConnectionState::Reconnecting);

                    // Backoff, cancelable.
                    //
                    tokio::select! {
                        _ = sleep(delay) => {}
                        _ = stop.changed() => {
                            let _ = state.send(ConnectionState::Disconnected);
                            return;
                        }
                    }
                    delay = self.policy.next_delay(delay);
                }
            }
        }
    }

    /// One connection: subscribe, then read events until stop or failure.
    /// `Ok(())` means an explicit stop; any error goes back to `run` for the
    /// reconnection decision.
    ///
    async fn session(
        &self,
        out: &mpsc::Sender<FeedMessage>,
        state: &watch::Sender<ConnectionState>,
        stop: &mut watch::Receiver<bool>,
        attempts: &mut usize,
        delay: &mut Duration,
    ) -> Result<(), FeedError> {
        trace!("tcp::connect {}", self.addr);
        let sock = TcpStream::connect(&self.addr)
            .await
            .map_err(|e| FeedError::Connect(self.addr.clone(), e))?;
        let (rd, mut wr) = sock.into_split();

        // Subscribe with our token (and optional bounding box) before
        // anything else.
        //
        let hello = Subscribe {
            token: self.token.clone(),
            bbox: self.bbox.map(|b| b.to_array()),
        };
        let mut line = serde_json::to_string(&hello).unwrap_or_default();
        line.push('\n');
        wr.write_all(line.as_bytes())
            .await
            .map_err(FeedError::Handshake)?;

        // Handshake done, the failure streak is over.
        //
        *attempts = 0;
        *delay = self.policy.initial;
        let _ = state.send(ConnectionState::Connected);
        info!("connected to {}", self.addr);

        let mut lines = BufReader::new(rd).lines();
        loop {
            tokio::select! {
                _ = stop.changed() => {
                    trace!("stop requested");
                    return Ok(());
                }
                line = lines.next_line() => match line {
                    Ok(Some(line)) => self.dispatch(&line, out).await,
                    Ok(None) => return Err(FeedError::Closed),
                    Err(e) => return Err(FeedError::Transport(e)),
                },
            }
        }
    }

    /// Forward one wire line.  Anything malformed or out of range is dropped
    /// and logged, it never reaches the fleet map.
    ///
    async fn dispatch(&self, line: &str, out: &mpsc::Sender<FeedMessage>) {
        let event: FeedEvent = match serde_json::from_str(line) {
            Ok(event) => event,
            Err(e) => {
                warn!("dropping bad event {}: {}", line, e);
                return;
            }
        };

        match event {
            FeedEvent::Location {
                entity_id,
                latitude,
                longitude,
            } => {
                let position = Position::new(latitude, longitude);
                if !position.is_valid() {
                    warn!("dropping out-of-range position for {}: {}", entity_id, position);
                    return;
                }
                if let Some(bbox) = &self.bbox {
                    if !bbox.contains(&position) {
                        debug!("{} outside watched area", entity_id);
                        return;
                    }
                }
                let _ = out.send(FeedMessage::Update { entity_id, position }).await;
            }
            FeedEvent::EntityDisconnected { entity_id } => {
                let _ = out.send(FeedMessage::Gone { entity_id }).await;
            }
        }
    }
}

/// Handle on a running feed.
///
#[derive(Debug)]
pub struct FeedHandle {
    events: mpsc::Receiver<FeedMessage>,
    state: watch::Receiver<ConnectionState>,
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl FeedHandle {
    /// Receive the next message; `None` once the feed task is gone.
    ///
    pub async fn recv(&mut self) -> Option<FeedMessage> {
        self.events.recv().await
    }

    /// Current connection state.
    ///
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// A watch on the connection state, for anyone who wants to observe
    /// transitions.
    ///
    pub fn state_watch(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Wait until the connection state changes, returning the new state.
    ///
    pub async fn state_changed(&mut self) -> Option<ConnectionState> {
        self.state.changed().await.ok()?;
        Some(*self.state.borrow())
    }

    /// Stop the feed: further event delivery halts, the transport is closed
    /// and any pending backoff timer dies with the task.
    ///
    #[tracing::instrument(skip(self))]
    pub async fn stop(mut self) {
        let _ = self.stop.send(true);

        // The task notices the flag at its next suspension point; do not
        // wait forever on a peer that never talks.
        //
        if tokio::time::timeout(Duration::from_secs(1), &mut self.task)
            .await
            .is_err()
        {
            self.task.abort();
        }
        self.events.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_schedule() {
        let policy = RetryPolicy::default();
        let mut delay = policy.initial;
        let mut schedule = vec![delay];
        for _ in 0..4 {
            delay = policy.next_delay(delay);
            schedule.push(delay);
        }
        let ms: Vec<u128> = schedule.iter().map(|d| d.as_millis()).collect();
        assert_eq!(vec![1_000, 2_000, 4_000, 5_000, 5_000], ms);
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(5, policy.max_attempts);
        assert_eq!(1_000, policy.initial.as_millis());
        assert_eq!(5_000, policy.ceiling.as_millis());
    }
}

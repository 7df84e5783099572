//! Background eviction of idle conversations.
//!
//! Every `period` the reaper looks for channels that have been quiet for
//! longer than `timeout`, resets their history and, when prompt archival is
//! on, deletes their archived prompts.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use relay_core::types::ChannelId;

use crate::session::SessionStore;
use crate::sink::PersistenceSink;

pub struct InactivityReaper {
    sessions: Arc<SessionStore>,
    sink: Option<Arc<PersistenceSink>>,
    timeout: Duration,
    period: Duration,
}

impl InactivityReaper {
    pub fn new(sessions: Arc<SessionStore>, timeout: Duration, period: Duration) -> Self {
        Self {
            sessions,
            sink: None,
            timeout,
            period,
        }
    }

    /// Purge archived prompts of evicted channels through `sink`.
    pub fn with_sink(mut self, sink: Arc<PersistenceSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Run one pass and return the channels that were evicted.
    ///
    /// Channels with a cycle in flight are left alone; they are picked up by
    /// a later pass if they are still idle then. A second pass with no new
    /// activity evicts nothing because the activity entries are gone.
    pub async fn sweep(&self) -> Vec<ChannelId> {
        let now = Instant::now();
        let mut evicted = Vec::new();

        for channel_id in self.sessions.idle_channels(self.timeout, now) {
            let Some(guard) = self.sessions.try_begin_cycle(&channel_id) else {
                debug!(channel = %channel_id, "cycle in flight, eviction deferred");
                continue;
            };

            // The channel may have been touched between the scan and the claim.
            let still_idle = self
                .sessions
                .last_activity(&channel_id)
                .is_some_and(|t| now.saturating_duration_since(t) > self.timeout);
            if !still_idle {
                continue;
            }

            if !self.sessions.evict(&channel_id, &guard) {
                debug!(channel = %channel_id, "no session for idle channel, skipping");
                continue;
            }
            drop(guard);

            info!(
                channel = %channel_id,
                idle_secs = self.timeout.as_secs(),
                "cleared inactive conversation history"
            );

            if let Some(ref sink) = self.sink {
                sink.purge_channel(&channel_id).await;
            }
            evicted.push(channel_id);
        }

        evicted
    }

    /// Sweep every `period` until `cancel` fires.
    pub async fn run(self, cancel: CancellationToken) {
        info!(
            timeout_secs = self.timeout.as_secs(),
            period_secs = self.period.as_secs(),
            "inactivity reaper started"
        );

        let mut ticker = interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let evicted = self.sweep().await;
                    if !evicted.is_empty() {
                        debug!(count = evicted.len(), "sweep evicted idle sessions");
                    }
                }
                () = cancel.cancelled() => {
                    info!("inactivity reaper shutting down");
                    break;
                }
            }
        }
    }
}

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::Instant;
use tracing::{debug, instrument};

use relay_core::types::ChannelId;

use crate::types::{Session, Turn};

/// Exclusive claim on a channel for one mention cycle.
///
/// Held from the first history read until the exchange is recorded. The
/// reaper refuses to evict a channel while a guard is alive.
pub type CycleGuard = OwnedMutexGuard<()>;

/// In-memory, per-channel conversation history.
///
/// Nothing here survives a restart. History and activity times live in two
/// maps so that eviction can drop the activity entry while keeping an empty
/// session around for the next mention.
pub struct SessionStore {
    /// Exchanges (user + bot turn pairs) kept per channel.
    history_limit: usize,
    sessions: DashMap<ChannelId, Vec<Turn>>,
    activity: DashMap<ChannelId, Instant>,
    cycles: DashMap<ChannelId, Arc<Mutex<()>>>,
}

impl SessionStore {
    pub fn new(history_limit: usize) -> Self {
        Self {
            history_limit,
            sessions: DashMap::new(),
            activity: DashMap::new(),
            cycles: DashMap::new(),
        }
    }

    pub fn history_limit(&self) -> usize {
        self.history_limit
    }

    /// Return the channel's session, creating an empty one on first use.
    #[instrument(skip(self), fields(channel = %channel_id))]
    pub fn get_or_create(&self, channel_id: &ChannelId) -> Session {
        let history = self
            .sessions
            .entry(channel_id.clone())
            .or_insert_with(|| {
                debug!("initializing conversation history");
                Vec::new()
            })
            .clone();

        Session {
            channel_id: channel_id.clone(),
            history,
            last_activity: self.last_activity(channel_id),
        }
    }

    /// Current history for a channel, empty if the channel is unknown.
    pub fn history(&self, channel_id: &ChannelId) -> Vec<Turn> {
        self.sessions
            .get(channel_id)
            .map(|h| h.clone())
            .unwrap_or_default()
    }

    /// Append one exchange and drop the oldest exchanges beyond the limit.
    ///
    /// Only call this once the reply has actually been delivered.
    #[instrument(skip(self, user, bot), fields(channel = %channel_id))]
    pub fn record_exchange(&self, channel_id: &ChannelId, user: Turn, bot: Turn) {
        let max_turns = self.history_limit * 2;
        let mut history = self.sessions.entry(channel_id.clone()).or_default();
        history.push(user);
        history.push(bot);

        let mut dropped = 0;
        while history.len() > max_turns {
            let n = history.len().min(2);
            history.drain(..n);
            dropped += 1;
        }
        if dropped > 0 {
            debug!(dropped, "trimmed conversation history");
        }
    }

    /// Mark the channel as active now.
    pub fn touch(&self, channel_id: &ChannelId) {
        self.activity.insert(channel_id.clone(), Instant::now());
    }

    pub fn last_activity(&self, channel_id: &ChannelId) -> Option<Instant> {
        self.activity.get(channel_id).map(|t| *t)
    }

    pub fn has_session(&self, channel_id: &ChannelId) -> bool {
        self.sessions.contains_key(channel_id)
    }

    /// Channels that currently have an activity entry.
    pub fn tracked_channels(&self) -> Vec<ChannelId> {
        self.activity.iter().map(|e| e.key().clone()).collect()
    }

    /// Channels whose last activity is older than `timeout` at `now`.
    pub fn idle_channels(&self, timeout: Duration, now: Instant) -> Vec<ChannelId> {
        self.activity
            .iter()
            .filter(|e| now.saturating_duration_since(*e.value()) > timeout)
            .map(|e| e.key().clone())
            .collect()
    }

    /// Wait for exclusive use of a channel. Cycles on the same channel run
    /// one after another; different channels never block each other.
    pub async fn begin_cycle(&self, channel_id: &ChannelId) -> CycleGuard {
        let lock = Arc::clone(&self.cycles.entry(channel_id.clone()).or_default());
        lock.lock_owned().await
    }

    /// Claim a channel only if no cycle is in flight.
    pub fn try_begin_cycle(&self, channel_id: &ChannelId) -> Option<CycleGuard> {
        let lock = Arc::clone(&self.cycles.entry(channel_id.clone()).or_default());
        lock.try_lock_owned().ok()
    }

    /// Reset a channel's history and forget its activity time.
    ///
    /// The caller must hold the channel's [`CycleGuard`]. Returns `false`
    /// when the channel has no session.
    #[instrument(skip(self, _guard), fields(channel = %channel_id))]
    pub fn evict(&self, channel_id: &ChannelId, _guard: &CycleGuard) -> bool {
        let Some(mut history) = self.sessions.get_mut(channel_id) else {
            return false;
        };
        history.clear();
        drop(history);

        self.activity.remove(channel_id);
        // Drop the cycle lock too unless someone else is already queued on it
        // (one reference in the map, one inside the caller's guard).
        self.cycles
            .remove_if(channel_id, |_, lock| Arc::strong_count(lock) <= 2);
        debug!("session evicted");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exchange(n: usize) -> (Turn, Turn) {
        (
            Turn::new("alice", format!("question {n}")),
            Turn::new("bot", format!("answer {n}")),
        )
    }

    #[test]
    fn get_or_create_starts_empty() {
        let store = SessionStore::new(10);
        let ch = ChannelId::from("c1");
        let session = store.get_or_create(&ch);
        assert!(session.history.is_empty());
        assert!(session.last_activity.is_none());
        assert!(store.has_session(&ch));
    }

    #[test]
    fn history_grows_until_the_limit() {
        let store = SessionStore::new(10);
        let ch = ChannelId::from("c1");
        for n in 1..=7 {
            let (u, b) = exchange(n);
            store.record_exchange(&ch, u, b);
            assert_eq!(store.history(&ch).len(), 2 * n);
        }
    }

    #[test]
    fn eleventh_exchange_evicts_the_first() {
        let store = SessionStore::new(10);
        let ch = ChannelId::from("c1");
        for n in 1..=11 {
            let (u, b) = exchange(n);
            store.record_exchange(&ch, u, b);
        }
        let history = store.history(&ch);
        assert_eq!(history.len(), 20);
        assert_eq!(history[0].content, "question 2");
        assert_eq!(history[1].content, "answer 2");
        assert_eq!(history[19].content, "answer 11");
    }

    #[test]
    fn retained_exchanges_are_the_most_recent() {
        let limit = 3;
        let store = SessionStore::new(limit);
        let ch = ChannelId::from("c1");
        for n in 1..=25 {
            let (u, b) = exchange(n);
            store.record_exchange(&ch, u, b);
            let history = store.history(&ch);
            let kept = n.min(limit);
            assert_eq!(history.len(), 2 * kept);
            for (i, pair) in history.chunks(2).enumerate() {
                let expected = n - kept + 1 + i;
                assert_eq!(pair[0].content, format!("question {expected}"));
                assert_eq!(pair[1].content, format!("answer {expected}"));
            }
        }
    }

    #[test]
    fn zero_limit_keeps_nothing() {
        let store = SessionStore::new(0);
        let ch = ChannelId::from("c1");
        let (u, b) = exchange(1);
        store.record_exchange(&ch, u, b);
        assert!(store.history(&ch).is_empty());
    }

    #[test]
    fn channels_are_isolated() {
        let store = SessionStore::new(10);
        let a = ChannelId::from("a");
        let b = ChannelId::from("b");
        let (u, bot) = exchange(1);
        store.record_exchange(&a, u, bot);
        assert_eq!(store.history(&a).len(), 2);
        assert!(store.history(&b).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn idle_channels_respects_timeout() {
        let store = SessionStore::new(10);
        let stale = ChannelId::from("stale");
        let fresh = ChannelId::from("fresh");
        store.touch(&stale);
        tokio::time::advance(Duration::from_secs(400)).await;
        store.touch(&fresh);

        let idle = store.idle_channels(Duration::from_secs(300), Instant::now());
        assert_eq!(idle, vec![stale]);
    }

    #[tokio::test]
    async fn evict_resets_history_and_activity() {
        let store = SessionStore::new(10);
        let ch = ChannelId::from("c1");
        store.get_or_create(&ch);
        store.touch(&ch);
        let (u, b) = exchange(1);
        store.record_exchange(&ch, u, b);

        let guard = store.try_begin_cycle(&ch).expect("free");
        assert!(store.evict(&ch, &guard));
        assert!(store.history(&ch).is_empty());
        assert!(store.last_activity(&ch).is_none());
        assert!(store.tracked_channels().is_empty());
    }

    #[tokio::test]
    async fn evict_without_session_is_skipped() {
        let store = SessionStore::new(10);
        let ch = ChannelId::from("ghost");
        let guard = store.try_begin_cycle(&ch).expect("free");
        assert!(!store.evict(&ch, &guard));
    }

    #[tokio::test]
    async fn in_flight_cycle_blocks_try_begin() {
        let store = SessionStore::new(10);
        let ch = ChannelId::from("c1");
        let guard = store.begin_cycle(&ch).await;
        assert!(store.try_begin_cycle(&ch).is_none());
        drop(guard);
        assert!(store.try_begin_cycle(&ch).is_some());
    }
}

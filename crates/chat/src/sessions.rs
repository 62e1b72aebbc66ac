use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use movequote_core::flows::{DialogState, SessionState};

use crate::events::ChatKey;

/// Live dialog sessions. Each entry is locked while a step runs, so updates from
/// the same user are applied one at a time.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<ChatKey, SessionState>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn contains(&self, key: ChatKey) -> bool {
        self.sessions.contains_key(&key)
    }

    pub fn state_of(&self, key: ChatKey) -> Option<DialogState> {
        self.sessions.get(&key).map(|session| session.state)
    }

    /// Runs `step` against the session for `key`, creating a fresh one first if needed.
    pub fn with_session<T>(
        &self,
        key: ChatKey,
        is_admin: bool,
        now: DateTime<Utc>,
        step: impl FnOnce(&mut SessionState) -> T,
    ) -> T {
        let mut entry = self.sessions.entry(key).or_insert_with(|| SessionState::new(is_admin, now));
        entry.is_admin = is_admin;
        step(entry.value_mut())
    }

    pub fn remove(&self, key: ChatKey) -> bool {
        self.sessions.remove(&key).is_some()
    }

    /// Drops sessions idle for at least `timeout`. Returns how many were dropped.
    pub fn sweep_expired(&self, now: DateTime<Utc>, timeout: Duration) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, session| !session.is_expired(now, timeout));
        before.saturating_sub(self.sessions.len())
    }
}

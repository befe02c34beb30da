use std::time::{Duration, Instant};

use dashmap::DashMap;
use secrecy::SecretString;

use crate::client::RemoteProfile;

/// Per-attempt state held between a passed authentication and its
/// post-authentication step, keyed by canonical username.
///
/// Entries are consumed exactly once. Two concurrent attempts for the same
/// username race last-writer-wins; the consumer that finds the slot empty
/// observes a lost state, which post-authentication treats as a skipped
/// identity update. Entries that are never consumed expire after the TTL.
pub(crate) struct AttemptCache {
    slots: DashMap<String, PendingAttempt>,
    ttl: Duration,
}

struct PendingAttempt {
    token: SecretString,
    profile: RemoteProfile,
    created: Instant,
}

impl AttemptCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            slots: DashMap::new(),
            ttl,
        }
    }

    /// Hold the attempt's token and profile until post-authentication.
    pub fn store(&self, username: String, token: SecretString, profile: RemoteProfile) {
        self.slots.retain(|_, slot| slot.created.elapsed() < self.ttl);
        self.slots.insert(username, PendingAttempt {
            token,
            profile,
            created: Instant::now(),
        });
    }

    /// Consume the pending attempt, if one is still held.
    pub fn take(&self, username: &str) -> Option<(SecretString, RemoteProfile)> {
        let (_, slot) = self.slots.remove(username)?;

        if slot.created.elapsed() >= self.ttl {
            return None;
        }

        Some((slot.token, slot.profile))
    }
}

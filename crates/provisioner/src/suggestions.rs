//! Suggestion sets and their validity windows.
//!
//! A suggestion set moves through
//! `Unrequested -> Pending -> Valid -> (Selected | Expired)`. The server keeps
//! every suggested username reserved for the configured timeout; once that
//! elapses the set must be discarded and new suggestions requested.
//!
//! Time is read from the tokio clock so paused-time tests can step through a
//! window without sleeping.

use std::time::Duration;

use provisioner_common::types::Username;
use tokio::time::Instant;

/// Where a session's current suggestion set is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SuggestionState {
    /// No suggest call made yet, or the last one failed or was consumed
    Unrequested,
    /// A suggest call is in flight
    Pending,
    /// Suggestions are reserved and none has been selected
    Valid,
    /// One suggestion was selected; the rest were released
    Selected,
    /// The validity window elapsed before a selection was used
    Expired,
}

/// Ordered username candidates from one suggest call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionSet {
    generation: u64,
    usernames: Vec<Username>,
    issued_at: Instant,
    expires_at: Instant,
}

impl SuggestionSet {
    pub(crate) fn new(generation: u64, usernames: Vec<Username>, window: Duration) -> Self {
        let issued_at = Instant::now();
        Self {
            generation,
            usernames,
            issued_at,
            expires_at: deadline(issued_at, window),
        }
    }

    /// Candidates, best first
    pub fn usernames(&self) -> &[Username] {
        &self.usernames
    }

    /// The first candidate; what bulk flows pick.
    pub fn first(&self) -> Option<&Username> {
        self.usernames.first()
    }

    /// Whether `username` is one of the candidates
    pub fn contains(&self, username: &Username) -> bool {
        self.usernames.contains(username)
    }

    /// Number of candidates
    pub fn len(&self) -> usize {
        self.usernames.len()
    }

    /// No candidates at all
    pub fn is_empty(&self) -> bool {
        self.usernames.is_empty()
    }

    /// Session-local sequence number of the suggest call that produced this set
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// When the suggest response arrived
    pub fn issued_at(&self) -> Instant {
        self.issued_at
    }

    /// When the server stops holding these usernames
    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    /// Time left in the validity window, zero once expired
    pub fn remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }

    /// The validity window has elapsed
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    /// Resolves when the validity window elapses.
    ///
    /// Interactive front ends can race this against user input to offer new
    /// suggestions once the old ones lapse.
    pub async fn expired(&self) {
        tokio::time::sleep_until(self.expires_at).await
    }
}

/// Far enough out to mean "never" for a reservation.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

// Instant + Duration panics on overflow
fn deadline(from: Instant, window: Duration) -> Instant {
    from.checked_add(window)
        .or_else(|| from.checked_add(FAR_FUTURE))
        .unwrap_or(from)
}

impl<'a> IntoIterator for &'a SuggestionSet {
    type Item = &'a Username;
    type IntoIter = std::slice::Iter<'a, Username>;

    fn into_iter(self) -> Self::IntoIter {
        self.usernames.iter()
    }
}

/// A username kept by a successful `select`.
///
/// Only produced by selecting from a [`SuggestionSet`]; it remembers the
/// window of that set, since the reservation lapses with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedUsername {
    username: Username,
    generation: u64,
    expires_at: Instant,
}

impl SelectedUsername {
    pub(crate) fn new(username: Username, set: &SuggestionSet) -> Self {
        Self {
            username,
            generation: set.generation,
            expires_at: set.expires_at,
        }
    }

    /// The selected username
    pub fn username(&self) -> &Username {
        &self.username
    }

    /// Generation of the suggestion set it was drawn from
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// When the reservation lapses
    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    /// The reservation has lapsed
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    /// Take the username out
    pub fn into_username(self) -> Username {
        self.username
    }
}

/// Per-session bookkeeping of the most recent suggestion set.
#[derive(Debug)]
pub(crate) struct SuggestionTracker {
    generation: u64,
    state: SuggestionState,
    current: Option<SuggestionSet>,
}

impl Default for SuggestionTracker {
    fn default() -> Self {
        Self {
            generation: 0,
            state: SuggestionState::Unrequested,
            current: None,
        }
    }
}

impl SuggestionTracker {
    /// State with lazy expiry applied.
    pub(crate) fn state(&self) -> SuggestionState {
        match (&self.state, &self.current) {
            (SuggestionState::Valid, Some(set)) if set.is_expired() => SuggestionState::Expired,
            (state, _) => *state,
        }
    }

    pub(crate) fn current(&self) -> Option<&SuggestionSet> {
        self.current.as_ref()
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    /// Start a new suggest call. Returns its generation and the prior set if
    /// it still holds reservations that should be released.
    pub(crate) fn begin(&mut self) -> (u64, Option<SuggestionSet>) {
        let release = match self.state() {
            SuggestionState::Valid => self.current.take(),
            _ => None,
        };
        self.current = None;
        self.generation += 1;
        self.state = SuggestionState::Pending;
        (self.generation, release)
    }

    /// Record the outcome of the suggest call started as `generation`.
    ///
    /// Outcomes of superseded calls are ignored; returns `false` for those,
    /// in which case the caller still owns any reservations in `set`.
    pub(crate) fn finish(&mut self, generation: u64, set: Option<SuggestionSet>) -> bool {
        if generation != self.generation {
            return false;
        }
        self.state = match set {
            Some(_) => SuggestionState::Valid,
            None => SuggestionState::Unrequested,
        };
        self.current = set;
        true
    }

    pub(crate) fn mark_selected(&mut self, generation: u64) {
        if generation == self.generation {
            self.state = SuggestionState::Selected;
        }
    }

    pub(crate) fn mark_expired(&mut self, generation: u64) {
        if generation == self.generation {
            self.state = SuggestionState::Expired;
        }
    }

    /// The selected username was used; nothing is reserved anymore.
    pub(crate) fn consume(&mut self, generation: u64) {
        if generation == self.generation {
            self.state = SuggestionState::Unrequested;
            self.current = None;
        }
    }

    /// Forget the current set if it is `Valid`, handing it back for release.
    pub(crate) fn take_valid(&mut self) -> Option<SuggestionSet> {
        if self.state() != SuggestionState::Valid {
            return None;
        }
        self.state = SuggestionState::Unrequested;
        self.current.take()
    }
}

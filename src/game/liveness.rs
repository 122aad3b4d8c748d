//! Stale-client detection
//!
//! A transport-level disconnect is not a reliable liveness proxy: a tab
//! can stay connected while the player is long gone. Activity is measured
//! by incoming movement events only; each human walks the state machine
//! `active -> frozen -> evicted` under a periodic sweep.

use std::time::Duration;

use super::roster::{Participant, ParticipantId, Roster};

/// How often the room sweeps for idle humans
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(10);

/// Default inactivity window before a human is flagged frozen
pub const DEFAULT_PLAYER_TIMEOUT_MS: u64 = 30_000;

/// Inactivity past `EVICTION_FACTOR * timeout` removes the player
pub const EVICTION_FACTOR: u64 = 3;

/// Transition produced by one sweep pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LivenessChange {
    Frozen(ParticipantId),
    Evicted(ParticipantId),
}

/// Walk every human's liveness state. Freezes are applied in place;
/// evictions are only reported, since removal and bot backfill belong to
/// the room.
pub fn sweep(roster: &mut Roster, now_ms: u64, timeout_ms: u64) -> Vec<LivenessChange> {
    let mut changes = Vec::new();
    for participant in roster.iter_mut() {
        let Some(last_activity) = participant.last_activity else {
            continue; // bots are driven client-side, never frozen
        };
        let idle_ms = now_ms.saturating_sub(last_activity);
        if idle_ms > timeout_ms * EVICTION_FACTOR {
            changes.push(LivenessChange::Evicted(participant.id.clone()));
        } else if idle_ms > timeout_ms && !participant.is_frozen {
            participant.is_frozen = true;
            changes.push(LivenessChange::Frozen(participant.id.clone()));
        }
    }
    changes
}

/// Record a movement event. Returns true when the participant had been
/// frozen and just thawed (the caller broadcasts the unfreeze).
pub fn record_activity(participant: &mut Participant, now_ms: u64) -> bool {
    if participant.last_activity.is_some() {
        participant.last_activity = Some(now_ms);
    }
    let was_frozen = participant.is_frozen;
    participant.is_frozen = false;
    was_frozen
}

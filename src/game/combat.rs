//! Hit and respawn resolution
//!
//! The server trusts client-reported raycast hits (anti-cheat is an
//! explicit non-goal), but all scoring and respawn bookkeeping is
//! centralized here so connected clients never desync.

use std::time::Duration;

use rand::Rng;
use tracing::debug;

use crate::ws::protocol::{TeamScores, Vec3};

use super::roster::{random_zone_position, ParticipantId, Roster, MAX_HEALTH};

/// Delay between a kill and the victim's respawn
pub const RESPAWN_DELAY: Duration = Duration::from_millis(3000);

/// Outcome of resolving a reported hit
#[derive(Debug, Clone)]
pub enum HitOutcome {
    /// Shooter or target no longer in the roster (or target already dead);
    /// nothing was mutated
    Stale,
    /// Target survived with the given health
    Damaged {
        target_health: i32,
        target_is_bot: bool,
    },
    Killed(KillReport),
}

/// Everything the relay needs to announce a kill
#[derive(Debug, Clone)]
pub struct KillReport {
    pub killer_id: ParticipantId,
    pub killer_name: String,
    pub killer_kills: u32,
    pub victim_id: ParticipantId,
    pub victim_name: String,
    pub victim_is_bot: bool,
}

/// Apply a client-reported hit. Health is decremented without a lower
/// clamp, so it may go transiently negative on the killing blow. On a
/// kill the shooter's team score, kill counter and per-target-type
/// sub-counter are incremented and the victim is flagged dead; the caller
/// is responsible for scheduling the respawn.
pub fn resolve_hit(
    roster: &mut Roster,
    scores: &mut TeamScores,
    shooter_id: &str,
    target_id: &str,
    damage: i32,
) -> HitOutcome {
    let Some(shooter) = roster.get(shooter_id) else {
        debug!(shooter_id = %shooter_id, "hit from unknown shooter, ignoring");
        return HitOutcome::Stale;
    };
    let shooter_team = shooter.team;

    let Some(target) = roster.get_mut(target_id) else {
        debug!(target_id = %target_id, "hit on unknown target, ignoring");
        return HitOutcome::Stale;
    };
    if target.is_dead {
        // a second hit landing inside the respawn window must not score twice
        debug!(target_id = %target_id, "hit on dead target, ignoring");
        return HitOutcome::Stale;
    }

    target.health -= damage;
    if target.health > 0 {
        return HitOutcome::Damaged {
            target_health: target.health,
            target_is_bot: target.is_bot,
        };
    }

    target.is_dead = true;
    target.deaths += 1;
    let victim_name = target.name.clone();
    let victim_is_bot = target.is_bot;

    scores.award(shooter_team);
    // the shooter was present above and resolution is single-threaded, but
    // re-fetch rather than hold two mutable borrows
    let killer_kills = match roster.get_mut(shooter_id) {
        Some(shooter) => {
            shooter.kills += 1;
            if victim_is_bot {
                shooter.bot_kills += 1;
            } else {
                shooter.player_kills += 1;
            }
            shooter.kills
        }
        None => 0,
    };
    let killer_name = roster
        .get(shooter_id)
        .map(|s| s.name.clone())
        .unwrap_or_default();

    HitOutcome::Killed(KillReport {
        killer_id: shooter_id.to_string(),
        killer_name,
        killer_kills,
        victim_id: target_id.to_string(),
        victim_name,
        victim_is_bot,
    })
}

/// Bring a dead participant back: full health, dead flag cleared, fresh
/// random position inside their team zone. Returns `None` when the id has
/// left the roster since the respawn was scheduled.
pub fn apply_respawn(
    roster: &mut Roster,
    id: &str,
    rng: &mut impl Rng,
) -> Option<(Vec3, bool)> {
    let participant = roster.get_mut(id)?;
    participant.health = MAX_HEALTH;
    participant.is_dead = false;
    participant.position = random_zone_position(participant.team, rng);
    Some((participant.position, participant.is_bot))
}

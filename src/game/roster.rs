//! Roster store and bot substitution
//!
//! The roster is the authoritative set of participants for the room. Bots
//! and humans share one record type distinguished by `is_bot`; every team
//! slot is always occupied, so a joining human displaces a bot and a
//! leaving human is backfilled by one.

use std::collections::HashMap;

use rand::Rng;

use crate::util::time::unix_millis;
use crate::ws::protocol::{ParticipantInfo, Team, Vec3};

pub type ParticipantId = String;

/// Health ceiling; heals clamp here, respawns reset to it
pub const MAX_HEALTH: i32 = 100;

/// Number of character skin variants the client can render
pub const SKIN_VARIANTS: u8 = 5;

/// Half-width of the spawn strip on the x axis
const SPAWN_X_EXTENT: f32 = 20.0;
/// Distance of each team's zone from the arena centre on the z axis
const ZONE_NEAR_EDGE: f32 = 40.0;
/// Depth of each team's zone beyond its near edge
const ZONE_DEPTH: f32 = 20.0;

/// Fixed spawn point used when no bot is available to displace
pub fn team_spawn_point(team: Team) -> Vec3 {
    match team {
        Team::Red => Vec3::new(0.0, 1.0, ZONE_NEAR_EDGE),
        Team::Blue => Vec3::new(0.0, 1.0, -ZONE_NEAR_EDGE),
    }
}

/// Uniform random position inside a team's spawn zone
pub fn random_zone_position(team: Team, rng: &mut impl Rng) -> Vec3 {
    let x = rng.gen_range(-SPAWN_X_EXTENT..SPAWN_X_EXTENT);
    let depth = rng.gen_range(0.0..ZONE_DEPTH);
    let z = match team {
        Team::Red => ZONE_NEAR_EDGE + depth,
        Team::Blue => -ZONE_NEAR_EDGE - depth,
    };
    Vec3::new(x, 1.0, z)
}

/// A roster entry, bot or human
#[derive(Debug, Clone)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    pub team: Team,
    pub position: Vec3,
    pub rotation: f32,
    pub health: i32,
    pub kills: u32,
    pub player_kills: u32,
    pub bot_kills: u32,
    pub deaths: u32,
    pub skin_type: u8,
    pub is_bot: bool,
    pub is_dead: bool,
    pub is_frozen: bool,
    /// Unix ms at join time; humans only
    pub joined_at: Option<u64>,
    /// Unix ms of the last movement event; humans only
    pub last_activity: Option<u64>,
}

impl Participant {
    fn new(id: ParticipantId, name: String, team: Team, position: Vec3, is_bot: bool, rng: &mut impl Rng) -> Self {
        let now = unix_millis();
        Self {
            id,
            name,
            team,
            position,
            rotation: 0.0,
            health: MAX_HEALTH,
            kills: 0,
            player_kills: 0,
            bot_kills: 0,
            deaths: 0,
            skin_type: rng.gen_range(0..SKIN_VARIANTS),
            is_bot,
            is_dead: false,
            is_frozen: false,
            joined_at: (!is_bot).then_some(now),
            last_activity: (!is_bot).then_some(now),
        }
    }

    /// Heal by `amount`, clamped to [`MAX_HEALTH`]. Returns the new health.
    pub fn heal(&mut self, amount: i32) -> i32 {
        self.health = (self.health + amount).min(MAX_HEALTH);
        self.health
    }

    pub fn info(&self) -> ParticipantInfo {
        ParticipantInfo {
            id: self.id.clone(),
            name: self.name.clone(),
            team: self.team,
            position: self.position,
            rotation: self.rotation,
            health: self.health,
            kills: self.kills,
            player_kills: self.player_kills,
            bot_kills: self.bot_kills,
            deaths: self.deaths,
            skin_type: self.skin_type,
            is_bot: self.is_bot,
            is_dead: self.is_dead,
            is_frozen: self.is_frozen,
        }
    }
}

/// Authoritative participant map for one room
pub struct Roster {
    participants: HashMap<ParticipantId, Participant>,
    bots_per_team: usize,
    red_bot_seq: u32,
    blue_bot_seq: u32,
}

impl Roster {
    /// Create a roster pre-populated with `bots_per_team` bots on each team
    pub fn new(bots_per_team: usize, rng: &mut impl Rng) -> Self {
        let mut roster = Self {
            participants: HashMap::new(),
            bots_per_team,
            red_bot_seq: 0,
            blue_bot_seq: 0,
        };
        for team in [Team::Red, Team::Blue] {
            for _ in 0..bots_per_team {
                roster.spawn_bot(team, None, rng);
            }
        }
        roster
    }

    fn next_bot_seq(&mut self, team: Team) -> u32 {
        let seq = match team {
            Team::Red => &mut self.red_bot_seq,
            Team::Blue => &mut self.blue_bot_seq,
        };
        let current = *seq;
        *seq += 1;
        current
    }

    /// Create a bot on `team`, at `position` if given or at a random spot
    /// in the team zone. Returns the new bot's id.
    pub fn spawn_bot(&mut self, team: Team, position: Option<Vec3>, rng: &mut impl Rng) -> ParticipantId {
        let seq = self.next_bot_seq(team);
        let team_slug = match team {
            Team::Red => "red",
            Team::Blue => "blue",
        };
        let id = format!("bot-{team_slug}-{seq}");
        let name = format!("{} Bot {}", team.label(), seq + 1);
        let position = position.unwrap_or_else(|| random_zone_position(team, rng));
        let bot = Participant::new(id.clone(), name, team, position, true, rng);
        self.participants.insert(id.clone(), bot);
        id
    }

    /// Remove and return the first bot on `team` in iteration order
    pub fn take_bot(&mut self, team: Team) -> Option<Participant> {
        let bot_id = self
            .participants
            .values()
            .find(|p| p.is_bot && p.team == team)
            .map(|p| p.id.clone())?;
        self.participants.remove(&bot_id)
    }

    /// Add a human to `team`, displacing a bot if one exists. The human
    /// spawns at the displaced bot's position, or at the fixed team spawn
    /// point when the team has no bot left. Returns the displaced bot.
    pub fn join_human(
        &mut self,
        id: &str,
        name: &str,
        team: Team,
        rng: &mut impl Rng,
    ) -> Option<Participant> {
        let replaced = self.take_bot(team);
        let position = replaced
            .as_ref()
            .map(|bot| bot.position)
            .unwrap_or_else(|| team_spawn_point(team));
        let human = Participant::new(id.to_string(), name.to_string(), team, position, false, rng);
        self.participants.insert(id.to_string(), human);
        replaced
    }

    /// Remove a human and backfill their slot with a fresh bot at the
    /// vacated position. Returns the removed human and the new bot's id.
    /// No-op (None) for bots and unknown ids.
    pub fn replace_with_bot(
        &mut self,
        id: &str,
        rng: &mut impl Rng,
    ) -> Option<(Participant, ParticipantId)> {
        if self.participants.get(id).map_or(true, |p| p.is_bot) {
            return None;
        }
        let human = self.participants.remove(id)?;
        let bot_id = self.spawn_bot(human.team, Some(human.position), rng);
        Some((human, bot_id))
    }

    pub fn get(&self, id: &str) -> Option<&Participant> {
        self.participants.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Participant> {
        self.participants.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.participants.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn bots_per_team(&self) -> usize {
        self.bots_per_team
    }

    pub fn iter(&self) -> impl Iterator<Item = &Participant> {
        self.participants.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Participant> {
        self.participants.values_mut()
    }

    pub fn humans(&self) -> impl Iterator<Item = &Participant> {
        self.participants.values().filter(|p| !p.is_bot)
    }

    pub fn human_count(&self) -> usize {
        self.humans().count()
    }

    pub fn team_population(&self, team: Team) -> usize {
        self.participants.values().filter(|p| p.team == team).count()
    }

    /// Full roster projection for the init sync
    pub fn snapshot(&self) -> Vec<ParticipantInfo> {
        self.participants.values().map(Participant::info).collect()
    }
}

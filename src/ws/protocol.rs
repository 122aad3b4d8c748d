//! WebSocket protocol message definitions
//! These are the wire types for client-server communication. Message and
//! field names are camelCase on the wire for compatibility with the
//! browser client.

use serde::{Deserialize, Serialize};

/// World position (y is up)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// The two teams of the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Team {
    Red,
    Blue,
}

impl Team {
    /// Display label used in bot names
    pub fn label(self) -> &'static str {
        match self {
            Team::Red => "Red",
            Team::Blue => "Blue",
        }
    }
}

/// Session-wide bot difficulty tier. The server only stores and relays
/// this; bot behaviour is simulated client-side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Default for Difficulty {
    fn default() -> Self {
        Self::Medium
    }
}

/// Aggregate kill scores per team
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamScores {
    pub red: u32,
    pub blue: u32,
}

impl TeamScores {
    /// Credit a kill to the given team
    pub fn award(&mut self, team: Team) {
        match team {
            Team::Red => self.red += 1,
            Team::Blue => self.blue += 1,
        }
    }
}

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientMsg {
    /// Join the room on a team, replacing a bot
    Join {
        name: String,
        team: Team,
        /// Difficulty hint; only honoured for the first human to join
        #[serde(default)]
        difficulty: Option<Difficulty>,
    },

    /// Movement update (also the liveness signal)
    PlayerMove { position: Vec3, rotation: f32 },

    /// Weapon fired; purely relayed for remote tracer/audio effects
    Shoot {
        position: Vec3,
        direction: Vec3,
        weapon_type: String,
        color: u32,
    },

    /// Client-reported raycast hit on another participant
    PlayerHit { target_id: String, damage: i32 },

    /// Build a wall
    WallPlaced { position: Vec3, rotation: f32 },

    /// Tear down the wall at this position
    WallDestroyed { position: Vec3 },

    /// Collect a health pickup
    PickupHealth { pickup_id: String },

    /// Request the current leaderboard
    RequestLeaderboard,

    /// Team-wide chat
    ChatMessage { message: String },
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerMsg {
    /// Initial sync, sent to the joiner only
    Init {
        player_id: String,
        players: Vec<ParticipantInfo>,
        game_state: GameStateInfo,
        health_pickups: Vec<PickupInfo>,
    },

    /// A human joined (broadcast to everyone else)
    PlayerJoined(ParticipantInfo),

    /// The bot that the joining human displaced
    BotReplaced { bot_id: String, player_id: String },

    /// Participant moved (broadcast to everyone but the mover)
    PlayerMoved {
        id: String,
        position: Vec3,
        rotation: f32,
    },

    /// Shot fired, for remote effects
    PlayerShot {
        player_id: String,
        position: Vec3,
        direction: Vec3,
        weapon_type: String,
        color: u32,
    },

    /// Private: you were hit
    TakeDamage { damage: i32, from: String },

    /// Broadcast health change for remote health bars
    PlayerHealthUpdate { id: String, health: i32 },

    /// A participant was killed
    PlayerKilled {
        killer_id: String,
        killer_name: String,
        killer_kills: u32,
        victim_id: String,
        victim_name: String,
        team_scores: TeamScores,
    },

    /// Private: you died
    PlayerDied { killer_name: String },

    /// Private: you respawned
    Respawn { position: Vec3, health: i32 },

    /// A participant respawned (broadcast)
    PlayerRespawned { id: String, position: Vec3 },

    /// Wall built
    WallCreated { position: Vec3, rotation: f32 },

    /// Wall removed
    WallRemoved { position: Vec3 },

    /// Private: your health changed (pickup collection)
    HealthUpdate { health: i32 },

    /// A pickup was consumed
    HealthPickedUp {
        pickup_id: String,
        player_id: String,
        amount: i32,
    },

    /// A new pickup appeared
    HealthSpawned(PickupInfo),

    /// Liveness monitor flagged a participant as idle
    PlayerFrozen { id: String },

    /// Previously frozen participant moved again
    PlayerUnfrozen { id: String },

    /// A human left the room
    PlayerLeft { id: String },

    /// Replacement bot backfilling a vacated slot
    BotAdded(ParticipantInfo),

    /// Leaderboard reply (humans only)
    Leaderboard {
        players: Vec<LeaderboardEntry>,
        team_scores: TeamScores,
    },

    /// Chat relay
    ChatMessage {
        player_id: String,
        name: String,
        team: Team,
        message: String,
    },
}

/// Wire projection of a roster participant
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantInfo {
    pub id: String,
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
}

/// Room-wide state included in the init sync
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStateInfo {
    pub team_scores: TeamScores,
    pub walls: Vec<WallInfo>,
    pub difficulty: Difficulty,
    pub game_started: bool,
    pub bots_per_team: usize,
}

/// Wire projection of a placed wall
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WallInfo {
    pub id: String,
    pub position: Vec3,
    pub rotation: f32,
    pub health: i32,
}

/// Wire projection of a health pickup
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickupInfo {
    pub id: String,
    pub position: Vec3,
    pub amount: i32,
    pub active: bool,
}

/// One leaderboard row
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub name: String,
    pub team: Team,
    pub kills: u32,
    pub player_kills: u32,
    pub bot_kills: u32,
    pub deaths: u32,
    /// Seconds since the player joined
    pub play_time: u64,
}

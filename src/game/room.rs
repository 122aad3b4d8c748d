//! The authoritative room task
//!
//! One tokio task owns every piece of mutable world state: roster, team
//! scores, walls, pickup pool, difficulty. All inbound traffic (socket
//! events, expired timers) funnels through a single mpsc queue and every
//! handler runs to completion before the next, so mutual exclusion is
//! structural and no handler ever blocks.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::util::time::unix_millis;
use crate::ws::protocol::{
    ClientMsg, Difficulty, GameStateInfo, LeaderboardEntry, ServerMsg, Team, TeamScores, Vec3,
    WallInfo,
};

use super::combat::{self, HitOutcome};
use super::liveness::{self, LivenessChange};
use super::pickups::{self, PickupPool};
use super::roster::{ParticipantId, Roster, MAX_HEALTH};

/// Wall hit points at placement
const WALL_HEALTH: i32 = 200;

/// Events processed by the room task, in arrival order
#[derive(Debug)]
pub enum RoomEvent {
    /// A socket connected; its outbound channel is registered before any
    /// message from it can arrive
    Connected {
        player_id: ParticipantId,
        tx: mpsc::UnboundedSender<ServerMsg>,
    },
    /// Parsed client message
    Message {
        player_id: ParticipantId,
        msg: ClientMsg,
        received_at: u64,
    },
    /// Socket closed
    Disconnected { player_id: ParticipantId },
    /// A scheduled respawn came due
    RespawnDue { player_id: ParticipantId },
    /// A consumed pickup's replacement came due
    RestockDue { pickup_id: String },
}

/// Pending deferred work, keyed so entity removal can cancel it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum TimerKey {
    Respawn(ParticipantId),
    Restock(String),
}

/// Gauges mirrored out of the room task for the health endpoint
#[derive(Debug, Default)]
pub struct RoomCounters {
    pub humans: AtomicUsize,
    pub bots: AtomicUsize,
    pub walls: AtomicUsize,
    pub pickups: AtomicUsize,
}

/// Handle for talking to a running room
#[derive(Clone)]
pub struct RoomHandle {
    pub event_tx: mpsc::Sender<RoomEvent>,
    pub counters: Arc<RoomCounters>,
}

/// A placed wall
#[derive(Debug, Clone)]
struct Wall {
    id: String,
    position: Vec3,
    rotation: f32,
    health: i32,
}

impl Wall {
    fn info(&self) -> WallInfo {
        WallInfo {
            id: self.id.clone(),
            position: self.position,
            rotation: self.rotation,
            health: self.health,
        }
    }
}

/// The single authoritative game room
pub struct GameRoom {
    config: Arc<Config>,
    roster: Roster,
    scores: TeamScores,
    walls: Vec<Wall>,
    pickups: PickupPool,
    difficulty: Difficulty,
    difficulty_pinned: bool,
    /// Outbound channel per connected socket
    clients: HashMap<ParticipantId, mpsc::UnboundedSender<ServerMsg>>,
    timers: HashMap<TimerKey, JoinHandle<()>>,
    rng: ChaCha8Rng,
    event_tx: mpsc::Sender<RoomEvent>,
    event_rx: mpsc::Receiver<RoomEvent>,
    counters: Arc<RoomCounters>,
}

impl GameRoom {
    pub fn new(config: Arc<Config>, seed: u64) -> (Self, RoomHandle) {
        let (event_tx, event_rx) = mpsc::channel(256);
        let counters = Arc::new(RoomCounters::default());

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let roster = Roster::new(config.bots_per_team, &mut rng);
        let pickups = PickupPool::new(config.max_health_pickups);

        let handle = RoomHandle {
            event_tx: event_tx.clone(),
            counters: counters.clone(),
        };

        let room = Self {
            config,
            roster,
            scores: TeamScores::default(),
            walls: Vec::new(),
            pickups,
            difficulty: Difficulty::default(),
            difficulty_pinned: false,
            clients: HashMap::new(),
            timers: HashMap::new(),
            rng,
            event_tx,
            event_rx,
            counters,
        };
        room.refresh_counters();

        (room, handle)
    }

    /// Run the room until every event sender is gone
    pub async fn run(mut self) {
        info!(
            bots_per_team = self.config.bots_per_team,
            pickup_capacity = self.config.max_health_pickups,
            "room started"
        );

        let mut liveness_sweep = interval(liveness::SWEEP_INTERVAL);
        let mut pickup_sweep = interval(pickups::CAPACITY_SWEEP_INTERVAL);

        loop {
            tokio::select! {
                maybe_event = self.event_rx.recv() => match maybe_event {
                    Some(event) => self.handle_event(event),
                    None => {
                        info!("event channel closed, room shutting down");
                        break;
                    }
                },
                _ = liveness_sweep.tick() => self.sweep_liveness(),
                _ = pickup_sweep.tick() => self.sweep_pickups(),
            }
        }
    }

    fn handle_event(&mut self, event: RoomEvent) {
        match event {
            RoomEvent::Connected { player_id, tx } => {
                self.clients.insert(player_id, tx);
            }
            RoomEvent::Message {
                player_id,
                msg,
                received_at,
            } => self.handle_message(player_id, msg, received_at),
            RoomEvent::Disconnected { player_id } => self.handle_disconnect(&player_id),
            RoomEvent::RespawnDue { player_id } => self.handle_respawn(&player_id),
            RoomEvent::RestockDue { pickup_id } => self.handle_restock(&pickup_id),
        }
        self.refresh_counters();
    }

    fn handle_message(&mut self, player_id: ParticipantId, msg: ClientMsg, received_at: u64) {
        match msg {
            ClientMsg::Join {
                name,
                team,
                difficulty,
            } => self.handle_join(player_id, name, team, difficulty),
            ClientMsg::PlayerMove { position, rotation } => {
                self.handle_move(&player_id, position, rotation, received_at)
            }
            ClientMsg::Shoot {
                position,
                direction,
                weapon_type,
                color,
            } => self.handle_shoot(&player_id, position, direction, weapon_type, color),
            ClientMsg::PlayerHit { target_id, damage } => {
                self.handle_hit(&player_id, &target_id, damage)
            }
            ClientMsg::WallPlaced { position, rotation } => {
                self.handle_wall_placed(position, rotation)
            }
            ClientMsg::WallDestroyed { position } => self.handle_wall_destroyed(position),
            ClientMsg::PickupHealth { pickup_id } => self.handle_pickup(&player_id, &pickup_id),
            ClientMsg::RequestLeaderboard => self.send_leaderboard(&player_id),
            ClientMsg::ChatMessage { message } => self.handle_chat(&player_id, message),
        }
    }

    // ------------------------------------------------------------------
    // Event relay
    // ------------------------------------------------------------------

    fn send_to(&self, id: &str, msg: ServerMsg) {
        if let Some(tx) = self.clients.get(id) {
            let _ = tx.send(msg);
        }
    }

    fn broadcast(&self, msg: ServerMsg) {
        for tx in self.clients.values() {
            let _ = tx.send(msg.clone());
        }
    }

    fn broadcast_except(&self, skip: &str, msg: ServerMsg) {
        for (id, tx) in &self.clients {
            if id != skip {
                let _ = tx.send(msg.clone());
            }
        }
    }

    // ------------------------------------------------------------------
    // Join / leave
    // ------------------------------------------------------------------

    fn handle_join(
        &mut self,
        player_id: ParticipantId,
        name: String,
        team: Team,
        difficulty: Option<Difficulty>,
    ) {
        if self.roster.contains(&player_id) {
            warn!(player_id = %player_id, "duplicate join, ignoring");
            return;
        }

        // the first human to join pins the session difficulty
        if !self.difficulty_pinned {
            if let Some(hint) = difficulty {
                self.difficulty = hint;
            }
            self.difficulty_pinned = true;
        }

        let replaced = self.roster.join_human(&player_id, &name, team, &mut self.rng);
        let Some(joined) = self.roster.get(&player_id) else {
            return;
        };
        let joined_info = joined.info();

        self.send_to(
            &player_id,
            ServerMsg::Init {
                player_id: player_id.clone(),
                players: self.roster.snapshot(),
                game_state: self.game_state_info(),
                health_pickups: self.pickups.snapshot(),
            },
        );

        self.broadcast_except(&player_id, ServerMsg::PlayerJoined(joined_info));
        if let Some(bot) = &replaced {
            self.broadcast_except(
                &player_id,
                ServerMsg::BotReplaced {
                    bot_id: bot.id.clone(),
                    player_id: player_id.clone(),
                },
            );
        }

        info!(
            player_id = %player_id,
            name = %name,
            team = ?team,
            replaced_bot = replaced.as_ref().map(|b| b.name.as_str()).unwrap_or("none"),
            "player joined"
        );
    }

    fn handle_disconnect(&mut self, player_id: &str) {
        self.clients.remove(player_id);
        self.remove_human(player_id, "disconnected");
    }

    /// Shared cleanup for explicit disconnects and liveness evictions:
    /// drop the human, cancel their pending respawn, backfill a bot at
    /// the vacated position.
    fn remove_human(&mut self, player_id: &str, reason: &str) {
        if let Some(timer) = self.timers.remove(&TimerKey::Respawn(player_id.to_string())) {
            timer.abort();
        }

        let Some((human, bot_id)) = self.roster.replace_with_bot(player_id, &mut self.rng) else {
            return;
        };

        info!(
            player_id = %player_id,
            name = %human.name,
            reason = reason,
            replacement = %bot_id,
            "player removed, bot backfilled"
        );

        self.broadcast(ServerMsg::PlayerLeft {
            id: player_id.to_string(),
        });
        if let Some(bot) = self.roster.get(&bot_id) {
            self.broadcast(ServerMsg::BotAdded(bot.info()));
        }
    }

    // ------------------------------------------------------------------
    // Movement / shooting / hits
    // ------------------------------------------------------------------

    fn handle_move(&mut self, player_id: &str, position: Vec3, rotation: f32, received_at: u64) {
        let unfroze = match self.roster.get_mut(player_id) {
            Some(participant) => {
                participant.position = position;
                participant.rotation = rotation;
                liveness::record_activity(participant, received_at)
            }
            None => {
                debug!(player_id = %player_id, "movement from unknown participant");
                return;
            }
        };

        if unfroze {
            self.broadcast(ServerMsg::PlayerUnfrozen {
                id: player_id.to_string(),
            });
        }
        self.broadcast_except(
            player_id,
            ServerMsg::PlayerMoved {
                id: player_id.to_string(),
                position,
                rotation,
            },
        );
    }

    fn handle_shoot(
        &mut self,
        player_id: &str,
        position: Vec3,
        direction: Vec3,
        weapon_type: String,
        color: u32,
    ) {
        if !self.roster.contains(player_id) {
            debug!(player_id = %player_id, "shot from unknown participant");
            return;
        }
        self.broadcast(ServerMsg::PlayerShot {
            player_id: player_id.to_string(),
            position,
            direction,
            weapon_type,
            color,
        });
    }

    fn handle_hit(&mut self, shooter_id: &str, target_id: &str, damage: i32) {
        match combat::resolve_hit(
            &mut self.roster,
            &mut self.scores,
            shooter_id,
            target_id,
            damage,
        ) {
            HitOutcome::Stale => {}
            HitOutcome::Damaged {
                target_health,
                target_is_bot,
            } => {
                self.broadcast(ServerMsg::PlayerHealthUpdate {
                    id: target_id.to_string(),
                    health: target_health,
                });
                if !target_is_bot {
                    self.send_to(
                        target_id,
                        ServerMsg::TakeDamage {
                            damage,
                            from: shooter_id.to_string(),
                        },
                    );
                }
            }
            HitOutcome::Killed(report) => {
                info!(
                    killer = %report.killer_name,
                    victim = %report.victim_name,
                    red = self.scores.red,
                    blue = self.scores.blue,
                    "kill"
                );
                if !report.victim_is_bot {
                    self.send_to(
                        target_id,
                        ServerMsg::PlayerDied {
                            killer_name: report.killer_name.clone(),
                        },
                    );
                }
                self.broadcast(ServerMsg::PlayerKilled {
                    killer_id: report.killer_id,
                    killer_name: report.killer_name,
                    killer_kills: report.killer_kills,
                    victim_id: report.victim_id.clone(),
                    victim_name: report.victim_name,
                    team_scores: self.scores,
                });
                self.schedule_respawn(report.victim_id);
            }
        }
    }

    fn schedule_respawn(&mut self, player_id: ParticipantId) {
        let tx = self.event_tx.clone();
        let key = TimerKey::Respawn(player_id.clone());
        let timer = tokio::spawn(async move {
            sleep(combat::RESPAWN_DELAY).await;
            let _ = tx.send(RoomEvent::RespawnDue { player_id }).await;
        });
        if let Some(old) = self.timers.insert(key, timer) {
            old.abort();
        }
    }

    fn handle_respawn(&mut self, player_id: &str) {
        self.timers
            .remove(&TimerKey::Respawn(player_id.to_string()));

        // the world may have changed during the delay
        match combat::apply_respawn(&mut self.roster, player_id, &mut self.rng) {
            Some((position, is_bot)) => {
                if !is_bot {
                    self.send_to(
                        player_id,
                        ServerMsg::Respawn {
                            position,
                            health: MAX_HEALTH,
                        },
                    );
                }
                self.broadcast(ServerMsg::PlayerRespawned {
                    id: player_id.to_string(),
                    position,
                });
            }
            None => debug!(player_id = %player_id, "respawn due for departed participant"),
        }
    }

    // ------------------------------------------------------------------
    // Walls
    // ------------------------------------------------------------------

    fn handle_wall_placed(&mut self, position: Vec3, rotation: f32) {
        self.walls.push(Wall {
            id: Uuid::new_v4().to_string(),
            position,
            rotation,
            health: WALL_HEALTH,
        });
        self.broadcast(ServerMsg::WallCreated { position, rotation });
    }

    fn handle_wall_destroyed(&mut self, position: Vec3) {
        let before = self.walls.len();
        self.walls
            .retain(|w| w.position.x != position.x || w.position.z != position.z);
        if self.walls.len() != before {
            self.broadcast(ServerMsg::WallRemoved { position });
        }
    }

    // ------------------------------------------------------------------
    // Pickups
    // ------------------------------------------------------------------

    fn handle_pickup(&mut self, player_id: &str, pickup_id: &str) {
        if !self.roster.contains(player_id) {
            debug!(player_id = %player_id, "pickup request from unknown participant");
            return;
        }
        let Some(pickup) = self.pickups.collect(pickup_id) else {
            debug!(pickup_id = %pickup_id, "pickup already consumed");
            return;
        };

        let (health, is_bot) = match self.roster.get_mut(player_id) {
            Some(participant) => (participant.heal(pickup.amount), participant.is_bot),
            None => return,
        };

        if !is_bot {
            self.send_to(player_id, ServerMsg::HealthUpdate { health });
        }
        self.broadcast(ServerMsg::HealthPickedUp {
            pickup_id: pickup_id.to_string(),
            player_id: player_id.to_string(),
            amount: pickup.amount,
        });

        self.schedule_restock(pickup.id);
    }

    fn schedule_restock(&mut self, pickup_id: String) {
        let tx = self.event_tx.clone();
        let key = TimerKey::Restock(pickup_id.clone());
        let timer = tokio::spawn(async move {
            sleep(pickups::RESTOCK_DELAY).await;
            let _ = tx.send(RoomEvent::RestockDue { pickup_id }).await;
        });
        if let Some(old) = self.timers.insert(key, timer) {
            old.abort();
        }
    }

    fn handle_restock(&mut self, pickup_id: &str) {
        self.timers
            .remove(&TimerKey::Restock(pickup_id.to_string()));
        // the capacity sweep may have refilled the pool in the meantime
        if let Some(info) = self.pickups.spawn(&mut self.rng) {
            self.broadcast(ServerMsg::HealthSpawned(info));
        }
    }

    // ------------------------------------------------------------------
    // Periodic sweeps
    // ------------------------------------------------------------------

    fn sweep_liveness(&mut self) {
        let now = unix_millis();
        for change in liveness::sweep(&mut self.roster, now, self.config.player_timeout_ms) {
            match change {
                LivenessChange::Frozen(id) => {
                    info!(player_id = %id, "player frozen after inactivity");
                    self.broadcast(ServerMsg::PlayerFrozen { id });
                }
                LivenessChange::Evicted(id) => {
                    info!(player_id = %id, "evicting inactive player");
                    self.remove_human(&id, "inactive");
                }
            }
        }
        self.refresh_counters();
    }

    fn sweep_pickups(&mut self) {
        for info in self.pickups.fill(&mut self.rng) {
            debug!(pickup_id = %info.id, "capacity sweep spawned pickup");
            self.broadcast(ServerMsg::HealthSpawned(info));
        }
        self.refresh_counters();
    }

    // ------------------------------------------------------------------
    // Snapshots / misc
    // ------------------------------------------------------------------

    fn game_state_info(&self) -> GameStateInfo {
        GameStateInfo {
            team_scores: self.scores,
            walls: self.walls.iter().map(Wall::info).collect(),
            difficulty: self.difficulty,
            game_started: true,
            bots_per_team: self.roster.bots_per_team(),
        }
    }

    fn send_leaderboard(&self, player_id: &str) {
        let now = unix_millis();
        let mut players: Vec<LeaderboardEntry> = self
            .roster
            .humans()
            .map(|p| LeaderboardEntry {
                name: p.name.clone(),
                team: p.team,
                kills: p.kills,
                player_kills: p.player_kills,
                bot_kills: p.bot_kills,
                deaths: p.deaths,
                play_time: p
                    .joined_at
                    .map(|joined| now.saturating_sub(joined) / 1000)
                    .unwrap_or(0),
            })
            .collect();
        players.sort_by(|a, b| b.kills.cmp(&a.kills));

        self.send_to(
            player_id,
            ServerMsg::Leaderboard {
                players,
                team_scores: self.scores,
            },
        );
    }

    fn handle_chat(&mut self, player_id: &str, message: String) {
        let Some(sender) = self.roster.get(player_id) else {
            return;
        };
        self.broadcast(ServerMsg::ChatMessage {
            player_id: player_id.to_string(),
            name: sender.name.clone(),
            team: sender.team,
            message,
        });
    }

    fn refresh_counters(&self) {
        let humans = self.roster.human_count();
        self.counters.humans.store(humans, Ordering::Relaxed);
        self.counters
            .bots
            .store(self.roster.len() - humans, Ordering::Relaxed);
        self.counters.walls.store(self.walls.len(), Ordering::Relaxed);
        self.counters
            .pickups
            .store(self.pickups.len(), Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;

    fn test_config() -> Arc<Config> {
        Arc::new(Config {
            server_addr: "127.0.0.1:0".parse::<SocketAddr>().unwrap(),
            log_level: "debug".to_string(),
            client_origin: "*".to_string(),
            static_dir: "public".to_string(),
            bots_per_team: 2,
            player_timeout_ms: 30_000,
            max_health_pickups: 2,
        })
    }

    struct TestClient {
        id: String,
        rx: mpsc::UnboundedReceiver<ServerMsg>,
    }

    impl TestClient {
        fn drain(&mut self) -> Vec<ServerMsg> {
            let mut out = Vec::new();
            while let Ok(msg) = self.rx.try_recv() {
                out.push(msg);
            }
            out
        }
    }

    fn connect(room: &mut GameRoom, id: &str) -> TestClient {
        let (tx, rx) = mpsc::unbounded_channel();
        room.handle_event(RoomEvent::Connected {
            player_id: id.to_string(),
            tx,
        });
        TestClient {
            id: id.to_string(),
            rx,
        }
    }

    fn join(room: &mut GameRoom, client: &TestClient, name: &str, team: Team) {
        room.handle_event(RoomEvent::Message {
            player_id: client.id.clone(),
            msg: ClientMsg::Join {
                name: name.to_string(),
                team,
                difficulty: None,
            },
            received_at: unix_millis(),
        });
    }

    fn new_room() -> GameRoom {
        GameRoom::new(test_config(), 99).0
    }

    #[tokio::test]
    async fn join_gets_init_and_others_hear_about_it() {
        let mut room = new_room();
        let mut observer = connect(&mut room, "obs");
        join(&mut room, &observer, "Obs", Team::Blue);
        observer.drain();

        let mut joiner = connect(&mut room, "p1");
        join(&mut room, &joiner, "Ace", Team::Red);

        let msgs = joiner.drain();
        match &msgs[0] {
            ServerMsg::Init {
                player_id,
                players,
                game_state,
                health_pickups,
            } => {
                assert_eq!(player_id, "p1");
                // constant population: 2 bots per team, two humans swapped in
                assert_eq!(players.len(), 4);
                assert!(game_state.game_started);
                assert_eq!(game_state.bots_per_team, 2);
                assert!(health_pickups.is_empty());
            }
            other => panic!("expected init first, got {other:?}"),
        }
        // the joiner does not hear its own playerJoined
        assert!(!msgs
            .iter()
            .any(|m| matches!(m, ServerMsg::PlayerJoined(_))));

        let observed = observer.drain();
        assert!(observed
            .iter()
            .any(|m| matches!(m, ServerMsg::PlayerJoined(info) if info.id == "p1")));
        assert!(observed
            .iter()
            .any(|m| matches!(m, ServerMsg::BotReplaced { player_id, .. } if player_id == "p1")));
    }

    #[tokio::test]
    async fn first_join_pins_session_difficulty() {
        let mut room = new_room();
        let c1 = connect(&mut room, "p1");
        room.handle_event(RoomEvent::Message {
            player_id: c1.id.clone(),
            msg: ClientMsg::Join {
                name: "Ace".to_string(),
                team: Team::Red,
                difficulty: Some(Difficulty::Hard),
            },
            received_at: unix_millis(),
        });
        assert_eq!(room.difficulty, Difficulty::Hard);

        let c2 = connect(&mut room, "p2");
        room.handle_event(RoomEvent::Message {
            player_id: c2.id.clone(),
            msg: ClientMsg::Join {
                name: "Nix".to_string(),
                team: Team::Blue,
                difficulty: Some(Difficulty::Easy),
            },
            received_at: unix_millis(),
        });
        // late hints are ignored
        assert_eq!(room.difficulty, Difficulty::Hard);
    }

    #[tokio::test]
    async fn lethal_hit_kills_scores_and_respawns() {
        let mut room = new_room();
        let mut shooter = connect(&mut room, "red1");
        let mut victim = connect(&mut room, "blue1");
        join(&mut room, &shooter, "Ace", Team::Red);
        join(&mut room, &victim, "Nix", Team::Blue);
        room.roster.get_mut("blue1").unwrap().health = 10;
        shooter.drain();
        victim.drain();

        room.handle_event(RoomEvent::Message {
            player_id: "red1".to_string(),
            msg: ClientMsg::PlayerHit {
                target_id: "blue1".to_string(),
                damage: 15,
            },
            received_at: unix_millis(),
        });

        let shooter_msgs = shooter.drain();
        assert!(shooter_msgs.iter().any(|m| matches!(
            m,
            ServerMsg::PlayerKilled {
                killer_name,
                victim_name,
                team_scores,
                ..
            } if killer_name == "Ace" && victim_name == "Nix"
                && *team_scores == (TeamScores { red: 1, blue: 0 })
        )));

        let victim_msgs = victim.drain();
        assert!(victim_msgs
            .iter()
            .any(|m| matches!(m, ServerMsg::PlayerDied { killer_name } if killer_name == "Ace")));

        // respawn timer registered and due handling revives in the blue zone
        assert!(room
            .timers
            .contains_key(&TimerKey::Respawn("blue1".to_string())));
        room.handle_event(RoomEvent::RespawnDue {
            player_id: "blue1".to_string(),
        });

        let revived = room.roster.get("blue1").unwrap();
        assert_eq!(revived.health, MAX_HEALTH);
        assert!(!revived.is_dead);
        assert!(revived.position.z <= -40.0);

        let victim_msgs = victim.drain();
        assert!(victim_msgs
            .iter()
            .any(|m| matches!(m, ServerMsg::Respawn { health, .. } if *health == MAX_HEALTH)));
        assert!(victim_msgs
            .iter()
            .any(|m| matches!(m, ServerMsg::PlayerRespawned { id, .. } if id == "blue1")));
    }

    #[tokio::test]
    async fn survivable_hit_updates_health_and_notifies_target() {
        let mut room = new_room();
        let shooter = connect(&mut room, "red1");
        let mut victim = connect(&mut room, "blue1");
        join(&mut room, &shooter, "Ace", Team::Red);
        join(&mut room, &victim, "Nix", Team::Blue);
        victim.drain();

        room.handle_event(RoomEvent::Message {
            player_id: "red1".to_string(),
            msg: ClientMsg::PlayerHit {
                target_id: "blue1".to_string(),
                damage: 30,
            },
            received_at: unix_millis(),
        });

        let msgs = victim.drain();
        assert!(msgs
            .iter()
            .any(|m| matches!(m, ServerMsg::PlayerHealthUpdate { id, health } if id == "blue1" && *health == 70)));
        assert!(msgs
            .iter()
            .any(|m| matches!(m, ServerMsg::TakeDamage { damage: 30, from } if from == "red1")));
        assert_eq!(room.scores, TeamScores::default());
    }

    #[tokio::test]
    async fn hit_on_unknown_target_leaves_state_unchanged() {
        let mut room = new_room();
        let mut shooter = connect(&mut room, "red1");
        join(&mut room, &shooter, "Ace", Team::Red);
        shooter.drain();

        room.handle_event(RoomEvent::Message {
            player_id: "red1".to_string(),
            msg: ClientMsg::PlayerHit {
                target_id: "ghost".to_string(),
                damage: 50,
            },
            received_at: unix_millis(),
        });

        assert_eq!(room.scores, TeamScores::default());
        assert!(shooter.drain().is_empty());
    }

    #[tokio::test]
    async fn disconnect_backfills_a_bot_and_cancels_respawn() {
        let mut room = new_room();
        let shooter = connect(&mut room, "red1");
        let mut observer = connect(&mut room, "blue1");
        join(&mut room, &shooter, "Ace", Team::Red);
        join(&mut room, &observer, "Nix", Team::Blue);

        // kill the red player so a respawn is pending, then disconnect them
        room.roster.get_mut("red1").unwrap().health = 1;
        room.handle_event(RoomEvent::Message {
            player_id: "blue1".to_string(),
            msg: ClientMsg::PlayerHit {
                target_id: "red1".to_string(),
                damage: 10,
            },
            received_at: unix_millis(),
        });
        assert!(room
            .timers
            .contains_key(&TimerKey::Respawn("red1".to_string())));
        observer.drain();

        room.handle_event(RoomEvent::Disconnected {
            player_id: "red1".to_string(),
        });

        assert!(!room
            .timers
            .contains_key(&TimerKey::Respawn("red1".to_string())));
        assert!(!room.roster.contains("red1"));
        assert_eq!(room.roster.team_population(Team::Red), 2);

        let msgs = observer.drain();
        assert!(msgs
            .iter()
            .any(|m| matches!(m, ServerMsg::PlayerLeft { id } if id == "red1")));
        assert!(msgs
            .iter()
            .any(|m| matches!(m, ServerMsg::BotAdded(info) if info.is_bot && info.team == Team::Red)));
    }

    #[tokio::test]
    async fn pickup_collection_heals_once_and_restocks() {
        let mut room = new_room();
        let mut player = connect(&mut room, "p1");
        join(&mut room, &player, "Ace", Team::Red);
        room.sweep_pickups();
        assert_eq!(room.pickups.len(), 2);
        room.roster.get_mut("p1").unwrap().health = 90;
        player.drain();

        let pickup_id = room.pickups.snapshot()[0].id.clone();
        let collect = |room: &mut GameRoom| {
            room.handle_event(RoomEvent::Message {
                player_id: "p1".to_string(),
                msg: ClientMsg::PickupHealth {
                    pickup_id: pickup_id.clone(),
                },
                received_at: unix_millis(),
            });
        };

        collect(&mut room);
        // clamped at the ceiling, not 90 + 25
        assert_eq!(room.roster.get("p1").unwrap().health, MAX_HEALTH);
        assert!(room
            .timers
            .contains_key(&TimerKey::Restock(pickup_id.clone())));

        // simulated double-collect race: second request is a no-op
        collect(&mut room);

        let msgs = player.drain();
        let picked: Vec<_> = msgs
            .iter()
            .filter(|m| matches!(m, ServerMsg::HealthPickedUp { .. }))
            .collect();
        assert_eq!(picked.len(), 1);
        assert!(msgs
            .iter()
            .any(|m| matches!(m, ServerMsg::HealthUpdate { health } if *health == MAX_HEALTH)));

        // the one-shot restock refills the slot
        room.handle_event(RoomEvent::RestockDue {
            pickup_id: pickup_id.clone(),
        });
        assert_eq!(room.pickups.len(), 2);
        assert!(player
            .drain()
            .iter()
            .any(|m| matches!(m, ServerMsg::HealthSpawned(_))));
    }

    #[tokio::test]
    async fn walls_are_placed_and_destroyed_by_position() {
        let mut room = new_room();
        let mut player = connect(&mut room, "p1");
        join(&mut room, &player, "Ace", Team::Red);
        player.drain();

        let spot = Vec3::new(3.0, 1.0, 12.0);
        room.handle_event(RoomEvent::Message {
            player_id: "p1".to_string(),
            msg: ClientMsg::WallPlaced {
                position: spot,
                rotation: 0.5,
            },
            received_at: unix_millis(),
        });
        assert_eq!(room.walls.len(), 1);
        assert_eq!(room.walls[0].health, WALL_HEALTH);

        room.handle_event(RoomEvent::Message {
            player_id: "p1".to_string(),
            msg: ClientMsg::WallDestroyed { position: spot },
            received_at: unix_millis(),
        });
        assert!(room.walls.is_empty());

        // second destroy for the same spot stays silent
        player.drain();
        room.handle_event(RoomEvent::Message {
            player_id: "p1".to_string(),
            msg: ClientMsg::WallDestroyed { position: spot },
            received_at: unix_millis(),
        });
        assert!(!player
            .drain()
            .iter()
            .any(|m| matches!(m, ServerMsg::WallRemoved { .. })));
    }

    #[tokio::test]
    async fn leaderboard_lists_humans_sorted_by_kills() {
        let mut room = new_room();
        let mut c1 = connect(&mut room, "p1");
        let c2 = connect(&mut room, "p2");
        join(&mut room, &c1, "Ace", Team::Red);
        join(&mut room, &c2, "Nix", Team::Blue);
        room.roster.get_mut("p2").unwrap().kills = 3;
        c1.drain();

        room.handle_event(RoomEvent::Message {
            player_id: "p1".to_string(),
            msg: ClientMsg::RequestLeaderboard,
            received_at: unix_millis(),
        });

        let msgs = c1.drain();
        let Some(ServerMsg::Leaderboard { players, .. }) = msgs
            .iter()
            .find(|m| matches!(m, ServerMsg::Leaderboard { .. }))
        else {
            panic!("no leaderboard reply");
        };
        assert_eq!(players.len(), 2);
        assert_eq!(players[0].name, "Nix");
        assert_eq!(players[0].kills, 3);
        assert_eq!(players[1].name, "Ace");
    }

    #[tokio::test]
    async fn frozen_player_is_evicted_after_the_grace_window() {
        let mut room = new_room();
        let mut observer = connect(&mut room, "obs");
        let idle = connect(&mut room, "p1");
        join(&mut room, &observer, "Obs", Team::Blue);
        join(&mut room, &idle, "Ace", Team::Red);
        observer.drain();

        let timeout = room.config.player_timeout_ms;
        let joined = room.roster.get("p1").unwrap().last_activity.unwrap();

        // back-date activity past the freeze horizon
        room.roster.get_mut("p1").unwrap().last_activity = Some(joined - timeout - 1_000);
        room.sweep_liveness();
        assert!(room.roster.get("p1").unwrap().is_frozen);
        assert!(observer
            .drain()
            .iter()
            .any(|m| matches!(m, ServerMsg::PlayerFrozen { id } if id == "p1")));

        // a movement event thaws
        room.handle_event(RoomEvent::Message {
            player_id: "p1".to_string(),
            msg: ClientMsg::PlayerMove {
                position: Vec3::new(1.0, 1.0, 44.0),
                rotation: 0.0,
            },
            received_at: unix_millis(),
        });
        assert!(!room.roster.get("p1").unwrap().is_frozen);
        assert!(observer
            .drain()
            .iter()
            .any(|m| matches!(m, ServerMsg::PlayerUnfrozen { id } if id == "p1")));

        // back-date past the eviction horizon: identical cleanup to a leave
        room.roster.get_mut("p1").unwrap().last_activity =
            Some(unix_millis() - timeout * 3 - 1_000);
        room.sweep_liveness();
        assert!(!room.roster.contains("p1"));
        assert_eq!(room.roster.team_population(Team::Red), 2);
        let msgs = observer.drain();
        assert!(msgs
            .iter()
            .any(|m| matches!(m, ServerMsg::PlayerLeft { id } if id == "p1")));
        assert!(msgs
            .iter()
            .any(|m| matches!(m, ServerMsg::BotAdded(_))));
    }

    #[tokio::test]
    async fn chat_is_relayed_with_sender_identity() {
        let mut room = new_room();
        let c1 = connect(&mut room, "p1");
        let mut c2 = connect(&mut room, "p2");
        join(&mut room, &c1, "Ace", Team::Red);
        join(&mut room, &c2, "Nix", Team::Blue);
        c2.drain();

        room.handle_event(RoomEvent::Message {
            player_id: "p1".to_string(),
            msg: ClientMsg::ChatMessage {
                message: "push mid".to_string(),
            },
            received_at: unix_millis(),
        });

        assert!(c2.drain().iter().any(|m| matches!(
            m,
            ServerMsg::ChatMessage { name, team, message, .. }
                if name == "Ace" && *team == Team::Red && message == "push mid"
        )));
    }
}

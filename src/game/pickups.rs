//! Health pickup pool
//!
//! A bounded pool of consumable heals scattered over the arena floor.
//! Two distinct refill paths exist: a one-shot restock timer per consumed
//! pickup, and a periodic capacity sweep that tops the pool up whenever
//! it is under capacity.

use std::collections::HashMap;
use std::time::Duration;

use rand::Rng;
use uuid::Uuid;

use crate::ws::protocol::{PickupInfo, Vec3};

/// Default pool capacity
pub const DEFAULT_MAX_PICKUPS: usize = 5;

/// Health restored per pickup
pub const PICKUP_HEAL: i32 = 25;

/// Delay before a consumed pickup's replacement spawns
pub const RESTOCK_DELAY: Duration = Duration::from_secs(10);

/// How often the capacity sweep runs
pub const CAPACITY_SWEEP_INTERVAL: Duration = Duration::from_secs(15);

/// Half-width of the square field pickups spawn on
const FIELD_EXTENT: f32 = 40.0;

/// A consumable heal placed in the world
#[derive(Debug, Clone)]
pub struct HealthPickup {
    pub id: String,
    pub position: Vec3,
    pub amount: i32,
    pub active: bool,
}

impl HealthPickup {
    pub fn info(&self) -> PickupInfo {
        PickupInfo {
            id: self.id.clone(),
            position: self.position,
            amount: self.amount,
            active: self.active,
        }
    }
}

/// Bounded pool of active pickups
pub struct PickupPool {
    pickups: HashMap<String, HealthPickup>,
    capacity: usize,
}

impl PickupPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            pickups: HashMap::new(),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.pickups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pickups.is_empty()
    }

    /// Place one pickup at a uniform random in-bounds position. Returns
    /// `None` when the pool is already at capacity.
    pub fn spawn(&mut self, rng: &mut impl Rng) -> Option<PickupInfo> {
        if self.pickups.len() >= self.capacity {
            return None;
        }
        let pickup = HealthPickup {
            id: Uuid::new_v4().to_string(),
            position: Vec3::new(
                rng.gen_range(-FIELD_EXTENT..FIELD_EXTENT),
                1.0,
                rng.gen_range(-FIELD_EXTENT..FIELD_EXTENT),
            ),
            amount: PICKUP_HEAL,
            active: true,
        };
        let info = pickup.info();
        self.pickups.insert(pickup.id.clone(), pickup);
        Some(info)
    }

    /// Capacity sweep: spawn until the pool is full, reporting what
    /// appeared.
    pub fn fill(&mut self, rng: &mut impl Rng) -> Vec<PickupInfo> {
        let mut spawned = Vec::new();
        while let Some(info) = self.spawn(rng) {
            spawned.push(info);
        }
        spawned
    }

    /// Consume a pickup. Returns `None` when it is already gone or
    /// inactive, which guards the double-collection race.
    pub fn collect(&mut self, pickup_id: &str) -> Option<HealthPickup> {
        if !self.pickups.get(pickup_id).map_or(false, |p| p.active) {
            return None;
        }
        self.pickups.remove(pickup_id)
    }

    /// Active pickups for the init sync
    pub fn snapshot(&self) -> Vec<PickupInfo> {
        self.pickups.values().map(HealthPickup::info).collect()
    }
}

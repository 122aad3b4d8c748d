//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::game::{GameRoom, RoomHandle};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub room: RoomHandle,
}

impl AppState {
    /// Build the state and the room it fronts. The caller spawns the
    /// returned room task.
    pub fn new(config: Config) -> (Self, GameRoom) {
        let config = Arc::new(config);
        let (room, handle) = GameRoom::new(config.clone(), rand::random());

        (
            Self {
                config,
                room: handle,
            },
            room,
        )
    }
}

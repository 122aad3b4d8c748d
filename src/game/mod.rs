//! Authoritative game state modules

pub mod combat;
pub mod liveness;
pub mod pickups;
pub mod room;
pub mod roster;

pub use room::{GameRoom, RoomEvent, RoomHandle};

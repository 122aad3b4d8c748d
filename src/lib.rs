//! Hamster Arena Server - Authoritative multiplayer game server
//!
//! A thin authoritative backend for a browser-rendered team arena
//! shooter. The server owns the participant roster (humans and bots),
//! resolves client-reported hits into scores and respawns, watches for
//! stale clients, maintains a bounded health-pickup pool, and relays
//! state deltas to every connected client over WebSockets. Rendering,
//! input and bot behaviour live in the browser client.

pub mod app;
pub mod config;
pub mod game;
pub mod http;
pub mod util;
pub mod ws;

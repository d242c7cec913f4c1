//! Roam Server Library
//!
//! A real-time position-synchronization server over WebSocket. Clients join
//! with a unique username, send movement intents, and receive the full world
//! state on a fixed tick.
//!
//! # Features
//!
//! - `dos_ratelimit` - Per-connection frame size and rate limits (enabled by default)

pub mod config;
pub mod util;
pub mod game;
pub mod net;
pub mod metrics;

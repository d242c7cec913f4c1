//! Session records and their public snapshot form

use std::net::IpAddr;

use crate::util::vec2::Vec2;

/// Unique, case-sensitive session key chosen by the client
pub type Username = String;

/// Sprite identifier drawn from the sprite catalog
pub type SpriteId = String;

/// Transport connection identifier, unique for the lifetime of the process
pub type ConnectionId = u64;

/// Authoritative record of one joined identity
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub username: Username,
    /// Top-left corner in world units; only the movement resolver writes it
    pub position: Vec2,
    /// Opaque display attribute supplied at join
    pub color: String,
    pub sprite: Option<SpriteId>,
    /// Originating address, used for admission accounting only
    pub address: IpAddr,
    /// Connection that owns this session
    pub connection: ConnectionId,
}

impl Session {
    pub fn new(
        username: Username,
        color: String,
        sprite: Option<SpriteId>,
        address: IpAddr,
        connection: ConnectionId,
        position: Vec2,
    ) -> Self {
        Self {
            username,
            position,
            color,
            sprite,
            address,
            connection,
        }
    }

    /// Public fields as they appear in a broadcast
    pub fn to_snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            username: self.username.clone(),
            x: self.position.x,
            y: self.position.y,
            color: self.color.clone(),
            sprite: self.sprite.clone(),
        }
    }
}

/// One session's public fields at the instant a snapshot was taken
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub username: Username,
    pub x: f32,
    pub y: f32,
    pub color: String,
    pub sprite: Option<SpriteId>,
}

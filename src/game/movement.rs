//! Movement resolution: step, clamp, collide
//!
//! A move either lands in full or is reverted in full. There is no sliding and
//! no partial application.

use crate::config::WorldConfig;
use crate::game::constants::movement::DEFAULT_FORCE;
use crate::game::registry::SessionRegistry;
use crate::game::state::Username;
use crate::util::vec2::Vec2;

/// Direction part of a move intent
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Heading {
    Up,
    Down,
    Left,
    Right,
    /// Degrees, 0 = right, 90 = up on screen
    Degrees(f32),
}

impl Heading {
    /// Parse a cardinal token; tokens are lowercase and exact
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "up" => Some(Heading::Up),
            "down" => Some(Heading::Down),
            "left" => Some(Heading::Left),
            "right" => Some(Heading::Right),
            _ => None,
        }
    }

    /// Unit step direction in screen coordinates
    pub fn unit(&self) -> Vec2 {
        match self {
            Heading::Up => Vec2::UP,
            Heading::Down => Vec2::DOWN,
            Heading::Left => Vec2::LEFT,
            Heading::Right => Vec2::RIGHT,
            Heading::Degrees(deg) => Vec2::from_heading_degrees(*deg),
        }
    }
}

/// A single move request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveIntent {
    pub heading: Heading,
    /// Multiplier on the base speed; zero and negative values are taken as-is
    pub force: f32,
}

impl MoveIntent {
    pub fn new(heading: Heading, force: Option<f32>) -> Self {
        Self {
            heading,
            force: force.unwrap_or(DEFAULT_FORCE),
        }
    }

    /// Displacement for this intent at `base_speed`
    pub fn delta(&self, base_speed: f32) -> Vec2 {
        let step = base_speed * self.force;
        match self.heading {
            // Cardinal moves touch exactly one axis
            Heading::Up => Vec2::new(0.0, -step),
            Heading::Down => Vec2::new(0.0, step),
            Heading::Left => Vec2::new(-step, 0.0),
            Heading::Right => Vec2::new(step, 0.0),
            Heading::Degrees(_) => self.heading.unit() * step,
        }
    }
}

/// What happened to a move intent
#[derive(Debug, Clone, PartialEq)]
pub enum MoveOutcome {
    /// Position updated
    Moved { from: Vec2, to: Vec2 },
    /// Target overlapped another session; position unchanged
    Blocked { by: Username },
    /// No live session under that username
    UnknownSession,
    /// Displacement was not a finite number; position unchanged
    Ignored,
}

/// Clamp a position into `[0, width - entity] x [0, height - entity]`
pub fn clamp_to_world(position: Vec2, world: &WorldConfig) -> Vec2 {
    position.clamp(Vec2::ZERO, world.max_position())
}

/// First session other than `username`, in registry order, closer than `entity_size` to `target`
pub fn first_overlap<'a>(
    registry: &'a SessionRegistry,
    username: &str,
    target: Vec2,
    entity_size: f32,
) -> Option<&'a Username> {
    let min_dist_sq = entity_size * entity_size;
    registry
        .iter()
        .filter(|other| other.username != username)
        .find(|other| other.position.distance_sq_to(target) < min_dist_sq)
        .map(|other| &other.username)
}

/// Apply `intent` to `username`'s session
pub fn apply_move(
    registry: &mut SessionRegistry,
    world: &WorldConfig,
    username: &str,
    intent: &MoveIntent,
) -> MoveOutcome {
    let Some(from) = registry.lookup(username).map(|s| s.position) else {
        return MoveOutcome::UnknownSession;
    };

    let delta = intent.delta(world.base_speed);
    if !delta.is_finite() {
        return MoveOutcome::Ignored;
    }

    let to = clamp_to_world(from + delta, world);

    if world.collision_enabled {
        if let Some(other) = first_overlap(registry, username, to, world.entity_size) {
            return MoveOutcome::Blocked { by: other.clone() };
        }
    }

    if let Some(session) = registry.lookup_mut(username) {
        session.position = to;
    }
    MoveOutcome::Moved { from, to }
}

//! The shared world: registry, sprite pool and admission counter behind one lock
//!
//! Every mutation and every snapshot goes through a `&mut World` or `&World`
//! obtained from the single `SharedWorld` mutex, so no reader can observe a
//! session without its sprite, a half-applied move, or an admission count that
//! disagrees with the registry.

use std::net::IpAddr;
use std::sync::Arc;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::config::{ServerConfig, WorldConfig};
use crate::game::constants::spawn::MAX_SPAWN_ATTEMPTS;
use crate::game::movement::{self, clamp_to_world, MoveIntent, MoveOutcome};
use crate::game::registry::{DuplicateUsername, SessionRegistry};
use crate::game::sprites::SpritePool;
use crate::game::state::{ConnectionId, Session, SessionSnapshot};
use crate::net::admission::AdmissionControl;
use crate::util::vec2::Vec2;

/// Handle shared by connection tasks and the broadcast task
pub type SharedWorld = Arc<Mutex<World>>;

/// Why a join was refused
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JoinError {
    #[error(transparent)]
    DuplicateUsername(#[from] DuplicateUsername),
    #[error("Too many sessions from your address (limit {limit}).")]
    AdmissionLimit { limit: usize },
}

pub struct World {
    config: WorldConfig,
    registry: SessionRegistry,
    sprites: SpritePool,
    admission: AdmissionControl,
    rng: StdRng,
}

impl World {
    pub fn new(config: WorldConfig, sprites: SpritePool, admission: AdmissionControl) -> Self {
        Self {
            config,
            registry: SessionRegistry::new(),
            sprites,
            admission,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(
            config.world.clone(),
            SpritePool::new(config.sprites.clone()),
            AdmissionControl::new(config.admission.max_sessions_per_ip),
        )
    }

    pub fn into_shared(self) -> SharedWorld {
        Arc::new(Mutex::new(self))
    }

    /// Reseed spawn placement (tests and benchmarks)
    pub fn with_spawn_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Create a session for `username`.
    ///
    /// Uniqueness, admission and sprite assignment are decided together; a
    /// rejected join leaves no trace in any of the three tables.
    pub fn join(
        &mut self,
        username: &str,
        color: &str,
        address: IpAddr,
        connection: ConnectionId,
    ) -> Result<SessionSnapshot, JoinError> {
        if self.registry.contains(username) {
            return Err(DuplicateUsername.into());
        }
        if !self.admission.try_admit(address) {
            return Err(JoinError::AdmissionLimit {
                limit: self.admission.limit(),
            });
        }

        let sprite = self.sprites.assign(username);
        let position = self.spawn_position();
        let session = Session::new(
            username.to_string(),
            color.to_string(),
            sprite,
            address,
            connection,
            position,
        );

        let session = self.registry.register(session)?;
        info!(
            "Session '{}' joined from {} at ({}, {}) sprite={:?}",
            session.username, session.address, position.x, position.y, session.sprite
        );
        Ok(session.to_snapshot())
    }

    /// Tear down `username`'s session if it is owned by `connection`.
    ///
    /// Releases registry entry, sprite and admission slot together. Calling it
    /// again, or for a session owned by another connection, does nothing.
    pub fn leave(&mut self, username: &str, connection: ConnectionId) -> Option<Session> {
        let owned = self
            .registry
            .lookup(username)
            .is_some_and(|s| s.connection == connection);
        if !owned {
            return None;
        }

        let session = self.registry.unregister(username)?;
        self.sprites.release(username);
        self.admission.release(session.address);
        info!("Session '{}' left", username);
        Some(session)
    }

    pub fn apply_move(&mut self, username: &str, intent: &MoveIntent) -> MoveOutcome {
        let outcome = movement::apply_move(&mut self.registry, &self.config, username, intent);
        if let MoveOutcome::Blocked { by } = &outcome {
            debug!("Move by '{}' blocked by '{}'", username, by);
        }
        outcome
    }

    pub fn lookup(&self, username: &str) -> Option<&Session> {
        self.registry.lookup(username)
    }

    pub fn snapshot(&self) -> Vec<SessionSnapshot> {
        self.registry.snapshot()
    }

    pub fn session_count(&self) -> usize {
        self.registry.len()
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn admission(&self) -> &AdmissionControl {
        &self.admission
    }

    pub fn sprites(&self) -> &SpritePool {
        &self.sprites
    }

    /// Random whole-unit point in the spawn area, clear of other sessions if possible
    fn spawn_position(&mut self) -> Vec2 {
        let min = self.config.spawn_min;
        let max = self.config.spawn_max;
        let entity_sq = self.config.entity_size * self.config.entity_size;

        let mut candidate = clamp_to_world(min, &self.config);
        for _ in 0..MAX_SPAWN_ATTEMPTS {
            let x = sample_whole(&mut self.rng, min.x, max.x);
            let y = sample_whole(&mut self.rng, min.y, max.y);
            candidate = clamp_to_world(Vec2::new(x, y), &self.config);

            let clear = self
                .registry
                .iter()
                .all(|s| s.position.distance_sq_to(candidate) >= entity_sq);
            if clear {
                return candidate;
            }
        }

        debug!("No clear spawn point after {} attempts", MAX_SPAWN_ATTEMPTS);
        candidate
    }
}

/// Whole number in `[lo, hi)`, or `lo` for an empty range
fn sample_whole(rng: &mut StdRng, lo: f32, hi: f32) -> f32 {
    if hi - lo < 1.0 {
        return lo.floor();
    }
    (lo + rng.gen_range(0.0..(hi - lo))).floor()
}

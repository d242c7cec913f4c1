//! Recyclable pool of sprite identifiers
//!
//! Each joined session draws one sprite at random from the available set and
//! gives it back when the session ends. Live sessions hold distinct sprites
//! while any sprite is unheld; only when every sprite is held does the pool
//! recycle the full catalog and start sharing.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::game::state::SpriteId;

pub struct SpritePool {
    catalog: Vec<SpriteId>,
    available: Vec<SpriteId>,
    in_use: HashMap<String, SpriteId>,
    rng: StdRng,
}

impl SpritePool {
    pub fn new(catalog: Vec<SpriteId>) -> Self {
        Self::with_rng(catalog, StdRng::from_entropy())
    }

    /// Deterministic pool for tests and benchmarks
    pub fn with_seed(catalog: Vec<SpriteId>, seed: u64) -> Self {
        Self::with_rng(catalog, StdRng::seed_from_u64(seed))
    }

    fn with_rng(mut catalog: Vec<SpriteId>, rng: StdRng) -> Self {
        catalog.sort();
        catalog.dedup();
        Self {
            available: catalog.clone(),
            catalog,
            in_use: HashMap::new(),
            rng,
        }
    }

    /// False when the catalog is empty and sprites are disabled
    pub fn is_enabled(&self) -> bool {
        !self.catalog.is_empty()
    }

    /// Assign a sprite to `username`, recycling the whole catalog if none are free.
    ///
    /// Returns `None` only when sprites are disabled. Re-assigning a username that
    /// already holds a sprite returns that sprite.
    pub fn assign(&mut self, username: &str) -> Option<SpriteId> {
        if !self.is_enabled() {
            return None;
        }
        if let Some(sprite) = self.in_use.get(username) {
            return Some(sprite.clone());
        }

        // Sprites left over from a recycle may be held again by now
        let in_use = &self.in_use;
        self.available
            .retain(|sprite| !in_use.values().any(|held| held == sprite));
        if self.available.is_empty() {
            self.refill();
        }

        let idx = self.rng.gen_range(0..self.available.len());
        let sprite = self.available.swap_remove(idx);
        self.in_use.insert(username.to_string(), sprite.clone());
        Some(sprite)
    }

    /// Return `username`'s sprite to the available set; no-op if it holds none.
    ///
    /// A sprite shared after a recycle stays out of the available set until
    /// its last holder releases it.
    pub fn release(&mut self, username: &str) {
        let Some(sprite) = self.in_use.remove(username) else {
            return;
        };
        if !self.is_held(&sprite) && !self.available.contains(&sprite) {
            self.available.push(sprite);
        }
    }

    /// Refill the available set with every sprite nobody holds, or the whole
    /// catalog when all of them are held
    fn refill(&mut self) {
        let free: Vec<SpriteId> = self
            .catalog
            .iter()
            .filter(|sprite| !self.is_held(sprite))
            .cloned()
            .collect();

        if free.is_empty() {
            tracing::debug!("Sprite pool exhausted, recycling {} sprites", self.catalog.len());
            self.available = self.catalog.clone();
        } else {
            self.available = free;
        }
    }

    fn is_held(&self, sprite: &str) -> bool {
        self.in_use.values().any(|held| held == sprite)
    }

    pub fn sprite_of(&self, username: &str) -> Option<&SpriteId> {
        self.in_use.get(username)
    }

    pub fn is_available(&self, sprite: &str) -> bool {
        self.available.iter().any(|s| s == sprite)
    }

    pub fn available_count(&self) -> usize {
        self.available.len()
    }

    pub fn in_use_count(&self) -> usize {
        self.in_use.len()
    }

    pub fn catalog_size(&self) -> usize {
        self.catalog.len()
    }
}

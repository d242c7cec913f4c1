/// World geometry defaults
pub mod world {
    /// World width in world units
    pub const WIDTH: f32 = 1920.0;
    /// World height in world units
    pub const HEIGHT: f32 = 1080.0;
    /// Entity size: clamp margin on the far edges and collision radius
    pub const ENTITY_SIZE: f32 = 48.0;
}

/// Movement defaults
pub mod movement {
    /// Distance covered by one move intent at force 1.0
    pub const BASE_SPEED: f32 = 10.0;
    /// Force applied when a move intent carries none
    pub const DEFAULT_FORCE: f32 = 1.0;
}

/// Broadcast timing
pub mod broadcast {
    /// Broadcast period in milliseconds (~33 Hz)
    pub const TICK_INTERVAL_MS: u64 = 30;
    /// Log a stats line every this many seconds
    pub const STATS_INTERVAL_SECS: u64 = 30;
    /// Per-connection outbound frame queue; a full queue skips that client for the tick
    pub const OUTBOUND_QUEUE: usize = 64;
}

/// Spawn placement
pub mod spawn {
    /// Inclusive lower corner of the spawn area
    pub const AREA_MIN: (f32, f32) = (50.0, 50.0);
    /// Exclusive upper corner of the spawn area
    pub const AREA_MAX: (f32, f32) = (450.0, 350.0);
    /// Attempts to find a spawn point clear of other sessions
    pub const MAX_SPAWN_ATTEMPTS: u32 = 30;
}

/// Admission limits
pub mod admission {
    /// Maximum simultaneous sessions per originating IP address
    pub const MAX_SESSIONS_PER_IP: usize = 5;
    /// Maximum simultaneous open connections
    pub const MAX_CONNECTIONS: usize = 1000;
    /// Maximum inbound frame size in bytes
    pub const MAX_MESSAGE_SIZE: usize = 64 * 1024;
    /// Maximum inbound messages per connection per second
    pub const MAX_MESSAGES_PER_SECOND: u32 = 100;
    /// Rate-limit windows in violation before the connection is dropped
    pub const VIOLATIONS_BEFORE_DISCONNECT: u32 = 5;
}

/// Built-in sprite catalog
pub const DEFAULT_SPRITES: [&str; 8] = [
    "knight", "wizard", "rogue", "archer", "cleric", "bard", "druid", "monk",
];

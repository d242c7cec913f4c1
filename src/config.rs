use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;
use std::time::Duration;

use crate::game::constants::{admission, broadcast, movement, spawn, world, DEFAULT_SPRITES};
use crate::util::vec2::Vec2;

/// World geometry and movement rules, fixed for the lifetime of the process
#[derive(Debug, Clone)]
pub struct WorldConfig {
    pub width: f32,
    pub height: f32,
    /// Clamp margin on the far edges and collision radius
    pub entity_size: f32,
    /// Step length at force 1.0
    pub base_speed: f32,
    /// Reject moves that end closer than `entity_size` to another session
    pub collision_enabled: bool,
    /// Spawn area, lower corner inclusive
    pub spawn_min: Vec2,
    /// Spawn area, upper corner exclusive
    pub spawn_max: Vec2,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: world::WIDTH,
            height: world::HEIGHT,
            entity_size: world::ENTITY_SIZE,
            base_speed: movement::BASE_SPEED,
            collision_enabled: true,
            spawn_min: Vec2::new(spawn::AREA_MIN.0, spawn::AREA_MIN.1),
            spawn_max: Vec2::new(spawn::AREA_MAX.0, spawn::AREA_MAX.1),
        }
    }
}

impl WorldConfig {
    /// Largest legal position: `(width - entity_size, height - entity_size)`
    pub fn max_position(&self) -> Vec2 {
        Vec2::new(self.width - self.entity_size, self.height - self.entity_size)
    }
}

/// Admission and message limits
#[derive(Debug, Clone)]
pub struct AdmissionConfig {
    /// Maximum simultaneous sessions from one IP address
    pub max_sessions_per_ip: usize,
    /// Maximum simultaneous open connections
    pub max_connections: usize,
    /// Maximum inbound frame size in bytes
    pub max_message_size: usize,
    /// Maximum inbound messages per connection per second
    pub max_messages_per_second: u32,
    /// Window for message rate limiting
    pub rate_limit_window: Duration,
    /// Rate-limit violations before the connection is dropped
    pub violations_before_disconnect: u32,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            max_sessions_per_ip: admission::MAX_SESSIONS_PER_IP,
            max_connections: admission::MAX_CONNECTIONS,
            max_message_size: admission::MAX_MESSAGE_SIZE,
            max_messages_per_second: admission::MAX_MESSAGES_PER_SECOND,
            rate_limit_window: Duration::from_secs(1),
            violations_before_disconnect: admission::VIOLATIONS_BEFORE_DISCONNECT,
        }
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server to
    pub bind_address: IpAddr,
    /// WebSocket port
    pub port: u16,
    /// Metrics HTTP port, `None` disables the endpoint
    pub metrics_port: Option<u16>,
    /// Broadcast period
    pub tick_interval: Duration,
    /// Outbound frames queued per connection before ticks are skipped for it
    pub outbound_queue: usize,
    pub world: WorldConfig,
    pub admission: AdmissionConfig,
    /// Sprite catalog; empty disables sprite assignment
    pub sprites: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port: 8080,
            metrics_port: Some(9090),
            tick_interval: Duration::from_millis(broadcast::TICK_INTERVAL_MS),
            outbound_queue: broadcast::OUTBOUND_QUEUE,
            world: WorldConfig::default(),
            admission: AdmissionConfig::default(),
            sprites: DEFAULT_SPRITES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Read and parse an environment variable, warning and returning `None` on bad input
fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Invalid {} '{}', using default", name, raw);
            None
        }
    }
}

/// Parse a boolean flag accepting `true/false`, `1/0`, `yes/no`, `on/off`
fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Split a comma-separated sprite list, dropping blanks
pub fn parse_sprite_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl ServerConfig {
    /// Load config from environment or use defaults
    pub fn load_or_default() -> Self {
        let mut config = Self::default();

        if let Some(addr) = env_parse::<IpAddr>("BIND_ADDRESS") {
            config.bind_address = addr;
        }

        if let Some(port) = env_parse::<u16>("PORT") {
            if port > 0 {
                config.port = port;
            } else {
                tracing::warn!("PORT must be > 0, using default");
            }
        }

        if let Some(port) = env_parse::<u16>("METRICS_PORT") {
            config.metrics_port = if port == 0 { None } else { Some(port) };
        }

        if let Some(ms) = env_parse::<u64>("TICK_INTERVAL_MS") {
            if (1..=1000).contains(&ms) {
                config.tick_interval = Duration::from_millis(ms);
            } else {
                tracing::warn!("TICK_INTERVAL_MS must be 1-1000, using default");
            }
        }

        if let Some(width) = env_parse::<f32>("WORLD_WIDTH") {
            config.world.width = width;
        }
        if let Some(height) = env_parse::<f32>("WORLD_HEIGHT") {
            config.world.height = height;
        }
        if let Some(size) = env_parse::<f32>("ENTITY_SIZE") {
            config.world.entity_size = size;
        }
        if let Some(speed) = env_parse::<f32>("BASE_SPEED") {
            config.world.base_speed = speed;
        }

        if let Ok(raw) = std::env::var("COLLISION_ENABLED") {
            match parse_flag(&raw) {
                Some(enabled) => config.world.collision_enabled = enabled,
                None => tracing::warn!("Invalid COLLISION_ENABLED '{}', using default", raw),
            }
        }

        if let Some(cap) = env_parse::<usize>("MAX_SESSIONS_PER_IP") {
            if cap > 0 {
                config.admission.max_sessions_per_ip = cap;
            } else {
                tracing::warn!("MAX_SESSIONS_PER_IP must be > 0, using default");
            }
        }

        if let Some(max) = env_parse::<usize>("MAX_CONNECTIONS") {
            if max > 0 {
                config.admission.max_connections = max;
            } else {
                tracing::warn!("MAX_CONNECTIONS must be > 0, using default");
            }
        }

        if let Ok(raw) = std::env::var("SPRITES") {
            config.sprites = parse_sprite_list(&raw);
        }

        config
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::Invalid("port cannot be 0"));
        }
        if self.tick_interval.is_zero() {
            return Err(ConfigError::Invalid("tick interval must be positive"));
        }
        let w = &self.world;
        if !(w.width.is_finite() && w.height.is_finite() && w.entity_size.is_finite()) {
            return Err(ConfigError::Invalid("world dimensions must be finite"));
        }
        if w.entity_size <= 0.0 {
            return Err(ConfigError::Invalid("entity size must be positive"));
        }
        if w.width < w.entity_size || w.height < w.entity_size {
            return Err(ConfigError::Invalid("world must be at least one entity wide and tall"));
        }
        if !w.base_speed.is_finite() {
            return Err(ConfigError::Invalid("base speed must be finite"));
        }
        if w.spawn_max.x < w.spawn_min.x || w.spawn_max.y < w.spawn_min.y {
            return Err(ConfigError::Invalid("spawn area corners are inverted"));
        }
        if self.admission.max_sessions_per_ip == 0 {
            return Err(ConfigError::Invalid("max_sessions_per_ip must be at least 1"));
        }
        if self.admission.max_connections == 0 {
            return Err(ConfigError::Invalid("max_connections must be at least 1"));
        }
        if self.outbound_queue == 0 {
            return Err(ConfigError::Invalid("outbound queue must hold at least one frame"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.tick_interval, Duration::from_millis(30));
        assert_eq!(config.world.width, 1920.0);
        assert_eq!(config.world.height, 1080.0);
        assert_eq!(config.world.entity_size, 48.0);
        assert_eq!(config.world.base_speed, 10.0);
        assert!(config.world.collision_enabled);
        assert_eq!(config.sprites.len(), DEFAULT_SPRITES.len());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_max_position() {
        let world = WorldConfig::default();
        assert_eq!(world.max_position(), Vec2::new(1872.0, 1032.0));
    }

    #[test]
    fn test_load_or_default() {
        let config = ServerConfig::load_or_default();
        assert!(config.port > 0);
    }

    #[test]
    fn test_parse_sprite_list() {
        assert_eq!(parse_sprite_list("a, b,,c "), vec!["a", "b", "c"]);
        assert!(parse_sprite_list("").is_empty());
        assert!(parse_sprite_list(" , ").is_empty());
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("true"), Some(true));
        assert_eq!(parse_flag("OFF"), Some(false));
        assert_eq!(parse_flag(" 1 "), Some(true));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn test_validate_rejects_tiny_world() {
        let mut config = ServerConfig::default();
        config.world.width = 10.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_cap() {
        let mut config = ServerConfig::default();
        config.admission.max_sessions_per_ip = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_sprite_catalog_is_valid() {
        let config = ServerConfig {
            sprites: Vec::new(),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }
}

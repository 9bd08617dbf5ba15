//! Client Configuration
//!
//! Every tunable of the prediction core lives here with its default value.
//! All structs deserialize with `#[serde(default)]`, so a JSON file only
//! needs to name the values it overrides.

use std::path::Path;
use std::time::Duration;
use serde::{Serialize, Deserialize};

use crate::core::vec2::Vec2;
use crate::game::input::KeyBindings;

/// Configuration loading errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Could not read the file.
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// File is not valid JSON for [`ClientConfig`].
    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),

    /// Values parsed but are out of range.
    #[error("Invalid config value: {0}")]
    Invalid(String),
}

/// Kinematic constants for the local tank.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Arena width (pixels).
    pub arena_width: f64,
    /// Arena height (pixels).
    pub arena_height: f64,
    /// Tank edge length (pixels); half of it is the wall clearance.
    pub tank_size: f64,
    /// Top forward speed (pixels per tick).
    pub max_speed: f64,
    /// Fraction of the remaining speed gap closed each tick.
    pub acceleration: f64,
    /// Extra multiplicative decay applied while coasting.
    pub friction: f64,
    /// Heading change per tick while a rotate control is held (radians).
    pub rotation_speed: f64,
    /// Speeds below this snap to zero.
    pub min_speed_threshold: f64,
    /// Reverse top speed as a fraction of `max_speed`.
    pub reverse_factor: f64,
    /// Target speeds below this count as "no throttle" for friction.
    pub throttle_epsilon: f64,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            arena_width: 800.0,
            arena_height: 600.0,
            tank_size: 30.0,
            max_speed: 3.0,
            acceleration: 0.15,
            friction: 0.9,
            rotation_speed: 0.08,
            min_speed_threshold: 0.1,
            reverse_factor: 0.7,
            throttle_epsilon: 0.1,
        }
    }
}

impl PhysicsConfig {
    /// Wall clearance on each side.
    #[inline]
    pub fn half_extent(&self) -> f64 {
        self.tank_size / 2.0
    }

    /// Lowest legal position on both axes.
    #[inline]
    pub fn min_position(&self) -> Vec2 {
        let h = self.half_extent();
        Vec2::new(h, h)
    }

    /// Highest legal position on both axes.
    #[inline]
    pub fn max_position(&self) -> Vec2 {
        let h = self.half_extent();
        Vec2::new(self.arena_width - h, self.arena_height - h)
    }

    /// Reverse top speed (positive magnitude).
    #[inline]
    pub fn max_reverse_speed(&self) -> f64 {
        self.max_speed * self.reverse_factor
    }

    /// Check ranges that the simulator relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.acceleration > 0.0 && self.acceleration <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "acceleration must be in (0, 1], got {}",
                self.acceleration
            )));
        }
        if !(self.friction >= 0.0 && self.friction <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "friction must be in [0, 1], got {}",
                self.friction
            )));
        }
        if !(self.reverse_factor >= 0.0 && self.reverse_factor <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "reverse_factor must be in [0, 1], got {}",
                self.reverse_factor
            )));
        }
        if self.tank_size >= self.arena_width || self.tank_size >= self.arena_height {
            return Err(ConfigError::Invalid("tank does not fit in the arena".to_string()));
        }
        if self.max_speed <= 0.0 {
            return Err(ConfigError::Invalid("max_speed must be positive".to_string()));
        }
        Ok(())
    }
}

/// How positional divergence is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DivergenceMetric {
    /// Straight-line distance.
    Euclidean,
    /// Either axis alone exceeding the tolerance triggers a correction.
    PerAxis,
}

/// Reconciliation tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Divergence (pixels) above which the server pose wins.
    pub tolerance: f64,
    /// Distance measure compared against `tolerance`.
    pub metric: DivergenceMetric,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            tolerance: 10.0,
            metric: DivergenceMetric::Euclidean,
        }
    }
}

/// Outbound action tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PublisherConfig {
    /// Minimum spacing between movement messages (ms).
    pub move_interval_ms: u64,
    /// Minimum spacing between accepted fires (ms).
    pub shoot_cooldown_ms: u64,
    /// Lifetime of the "out of ammo" notice (ms).
    pub out_of_ammo_notice_ms: u64,
    /// Lifetime of the "reloading" notice (ms).
    pub reload_notice_ms: u64,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            move_interval_ms: 16,
            shoot_cooldown_ms: 500,
            out_of_ammo_notice_ms: 1000,
            reload_notice_ms: 1500,
        }
    }
}

/// Transport connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// WebSocket endpoint speaking STOMP.
    pub url: String,
    /// Virtual host sent in the CONNECT frame.
    pub host: String,
    /// Destination for outbound player actions.
    pub action_destination: String,
    /// World snapshot topic.
    pub gamestate_topic: String,
    /// Broadcast achievement topic.
    pub achievements_topic: String,
    /// Per-user achievement queue.
    pub personal_achievements_queue: String,
    /// Delay before reconnecting after the socket drops (ms).
    pub reconnect_delay_ms: u64,
    /// Longest wait for the socket to open and CONNECTED to arrive (ms).
    pub handshake_timeout_ms: u64,
    /// Capacity of the outbound frame queue.
    pub outgoing_capacity: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:8080/ws-native".to_string(),
            host: "localhost".to_string(),
            action_destination: "/app/game/action".to_string(),
            gamestate_topic: "/topic/gamestate".to_string(),
            achievements_topic: "/topic/achievements".to_string(),
            personal_achievements_queue: "/user/queue/achievements".to_string(),
            reconnect_delay_ms: 5000,
            handshake_timeout_ms: 10_000,
            outgoing_capacity: 64,
        }
    }
}

impl ConnectionConfig {
    /// Reconnect delay as a [`Duration`].
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// Handshake timeout as a [`Duration`].
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }
}

/// Complete client configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Tank kinematics.
    pub physics: PhysicsConfig,
    /// Snapshot merging.
    pub reconcile: ReconcileConfig,
    /// Outbound rate limits.
    pub publisher: PublisherConfig,
    /// Server connection.
    pub connection: ConnectionConfig,
    /// Key code to control map. Replaces the defaults wholesale when given.
    pub bindings: KeyBindings,
    /// Fixed simulation tick period (ms).
    pub tick_period_ms: Option<u64>,
    /// Display refresh period (ms).
    pub frame_period_ms: Option<u64>,
}

impl ClientConfig {
    /// Parse from a JSON document.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        config.physics.validate()?;
        Ok(config)
    }

    /// Load from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Simulation tick period. Defaults to the movement publish interval.
    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_period_ms.unwrap_or(self.publisher.move_interval_ms))
    }

    /// Display frame period (~60 Hz by default).
    pub fn frame_period(&self) -> Duration {
        Duration::from_millis(self.frame_period_ms.unwrap_or(16))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_arena() {
        let config = ClientConfig::default();
        assert_eq!(config.physics.half_extent(), 15.0);
        assert_eq!(config.physics.max_position(), Vec2::new(785.0, 585.0));
        assert!((config.physics.max_reverse_speed() - 2.1).abs() < 1e-12);
        assert_eq!(config.tick_period(), Duration::from_millis(16));
        assert_eq!(config.publisher.shoot_cooldown_ms, 500);
        assert_eq!(config.reconcile.tolerance, 10.0);
        assert!(config.physics.validate().is_ok());
    }

    #[test]
    fn test_partial_json_override() {
        let config = ClientConfig::from_json_str(
            r#"{"physics": {"max_speed": 4.5}, "reconcile": {"metric": "per_axis"}}"#,
        )
        .unwrap();

        assert_eq!(config.physics.max_speed, 4.5);
        assert_eq!(config.physics.acceleration, 0.15);
        assert_eq!(config.reconcile.metric, DivergenceMetric::PerAxis);
        assert_eq!(config.reconcile.tolerance, 10.0);
        assert_eq!(config.connection.action_destination, "/app/game/action");
        assert_eq!(config.bindings.resolve("KeyW"), Some(crate::game::input::Control::ThrottleForward));
    }

    #[test]
    fn test_bindings_override() {
        let config = ClientConfig::from_json_str(
            r#"{"bindings": {"ArrowUp": "throttle_forward", "ArrowLeft": "rotate_left"}}"#,
        )
        .unwrap();
        assert_eq!(config.bindings.resolve("ArrowUp"), Some(crate::game::input::Control::ThrottleForward));
        assert_eq!(config.bindings.resolve("KeyW"), None);
    }

    #[test]
    fn test_rejects_out_of_range_physics() {
        let err = ClientConfig::from_json_str(r#"{"physics": {"acceleration": 1.5}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = ClientConfig::from_json_str("not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}

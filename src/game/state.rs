//! Local Tank State
//!
//! The single predicted entity owned by the client. Only the simulator
//! (`tick`) and the reconciliation engine (`reconcile`) mutate it.

use serde::{Serialize, Deserialize};

use crate::config::PhysicsConfig;
use crate::core::angle::{normalize_angle, Direction};
use crate::core::vec2::Vec2;
use crate::network::protocol::TankRecord;

/// Default health before any snapshot says otherwise.
pub const MAX_HEALTH: i32 = 100;

/// Default ammunition before any snapshot says otherwise.
pub const MAX_AMMUNITION: i32 = 30;

/// Locally predicted tank.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LocalTank {
    /// Centre position (pixels), always inside the arena bounds.
    pub position: Vec2,
    /// Heading in radians, always in `[0, 2π)`.
    pub heading: f64,
    /// Signed scalar speed along the heading (negative = reverse).
    pub speed: f64,
    /// Velocity vector derived from `heading` and `speed`.
    pub velocity: Vec2,
    /// Speed the throttle is steering towards.
    pub target_speed: f64,
    /// Pose has been seeded from an authoritative snapshot.
    pub initialized: bool,
    /// Moving or rotating as of the last tick.
    pub is_moving: bool,

    // Server-confirmed, never predicted
    /// Health (0-100).
    pub health: i32,
    /// Rounds left.
    pub ammunition: i32,
    /// Alive flag.
    pub alive: bool,
    /// Display color assigned by the server.
    pub color: Option<String>,
}

impl LocalTank {
    /// Seed a tank from the first authoritative record for the local player.
    ///
    /// The heading comes from the raw angle when the server sends one,
    /// otherwise from the coarse direction (UP when absent).
    pub fn seeded_from(record: &TankRecord, physics: &PhysicsConfig) -> Self {
        Self {
            position: clamp_to_arena(record.position(), physics),
            heading: record.heading(),
            speed: 0.0,
            velocity: Vec2::ZERO,
            target_speed: 0.0,
            initialized: true,
            is_moving: false,
            health: record.health,
            ammunition: record.ammunition,
            alive: record.is_alive,
            color: record.color.clone(),
        }
    }

    /// Coarse facing for the wire, derived from the heading.
    #[inline]
    pub fn direction(&self) -> Direction {
        Direction::from_angle(self.heading)
    }

    /// Set the heading, renormalizing into `[0, 2π)`.
    #[inline]
    pub fn set_heading(&mut self, heading: f64) {
        self.heading = normalize_angle(heading);
    }

    /// Kill all motion immediately (focus loss, pause).
    pub fn emergency_stop(&mut self) {
        self.speed = 0.0;
        self.target_speed = 0.0;
        self.velocity = Vec2::ZERO;
        self.is_moving = false;
    }

    /// Copy the fields the server owns exclusively.
    pub fn apply_confirmed(&mut self, record: &TankRecord) {
        self.health = record.health;
        self.ammunition = record.ammunition;
        self.alive = record.is_alive;
        if record.color.is_some() {
            self.color = record.color.clone();
        }
    }

    /// Out of rounds.
    #[inline]
    pub fn is_out_of_ammo(&self) -> bool {
        self.ammunition <= 0
    }
}

/// Clamp a position to the legal range for a tank of the configured size.
#[inline]
pub fn clamp_to_arena(position: Vec2, physics: &PhysicsConfig) -> Vec2 {
    position.clamp(physics.min_position(), physics.max_position())
}

/// Pause state machine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PauseState {
    /// Ticks and frames advance.
    #[default]
    Running,
    /// Ticks and frames suspended; snapshots still merge.
    Paused,
}

impl PauseState {
    /// The other state.
    pub fn toggled(self) -> Self {
        match self {
            PauseState::Running => PauseState::Paused,
            PauseState::Paused => PauseState::Running,
        }
    }

    /// Is paused.
    #[inline]
    pub fn is_paused(self) -> bool {
        self == PauseState::Paused
    }
}

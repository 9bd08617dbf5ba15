//! Kinematic Simulation Tick
//!
//! Advances the local tank by one fixed tick from the current intent.
//! Speed is a scalar along the heading, so rotation and throttle are
//! independent: the tank can turn in place or coast while turning.

use crate::config::PhysicsConfig;
use crate::core::vec2::Vec2;
use crate::game::input::{Intent, ThrottleDirection};
use crate::game::state::{clamp_to_arena, LocalTank};

/// Result of a tick.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct TickResult {
    /// A rotate control was applied this tick.
    pub rotated: bool,
    /// Displacement actually applied after wall clamping.
    pub displacement: Vec2,
}

/// Run one simulation tick.
///
/// Order matters and mirrors how the tank "feels":
/// 1. rotation, 2. throttle target, 3. exponential approach plus coasting
/// friction, 4. snap tiny speeds to zero, 5. velocity from heading,
/// 6. integrate and clamp to the walls, 7. derive `is_moving`.
pub fn tick(tank: &mut LocalTank, intent: Intent, physics: &PhysicsConfig) -> TickResult {
    // 1. Rotation (both keys held: both apply, net zero)
    let mut heading = tank.heading;
    if intent.rotation.turns_left() {
        heading -= physics.rotation_speed;
    }
    if intent.rotation.turns_right() {
        heading += physics.rotation_speed;
    }
    tank.set_heading(heading);
    let rotated = intent.rotation.is_rotating();

    // 2. Throttle target
    tank.target_speed = target_speed(intent.throttle, physics);

    // 3. Exponential approach; coast down when there is no throttle
    tank.speed += (tank.target_speed - tank.speed) * physics.acceleration;
    if tank.target_speed.abs() < physics.throttle_epsilon {
        tank.speed *= physics.friction;
    }
    tank.speed = tank.speed.clamp(-physics.max_reverse_speed(), physics.max_speed);

    // 4. Kill the asymptotic crawl
    if tank.speed.abs() < physics.min_speed_threshold {
        tank.speed = 0.0;
    }

    // 5. Velocity vector
    tank.velocity = Vec2::from_angle(tank.heading).scale(tank.speed);

    // 6. Integrate, then hard stop at the walls (speed is kept)
    let before = tank.position;
    tank.position = clamp_to_arena(tank.position + tank.velocity, physics);

    // 7. Movement flag
    tank.is_moving = tank.speed.abs() > physics.min_speed_threshold || rotated;

    #[cfg(feature = "debug-tracing")]
    tracing::trace!(
        position = %tank.position,
        heading = tank.heading,
        speed = tank.speed,
        "tick"
    );

    TickResult {
        rotated,
        displacement: tank.position - before,
    }
}

/// Target speed for a throttle intent.
#[inline]
pub fn target_speed(throttle: ThrottleDirection, physics: &PhysicsConfig) -> f64 {
    match throttle {
        ThrottleDirection::Forward => physics.max_speed,
        ThrottleDirection::Back => -physics.max_reverse_speed(),
        ThrottleDirection::None => 0.0,
    }
}

/// Run several ticks with the same intent.
pub fn run_ticks(tank: &mut LocalTank, intent: Intent, physics: &PhysicsConfig, count: u32) {
    for _ in 0..count {
        tick(tank, intent, physics);
    }
}

// =============================================================================
// TESTS
// =============================================================================

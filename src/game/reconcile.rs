//! Snapshot Reconciliation
//!
//! Merges an authoritative [`WorldSnapshot`] into the predicted local tank.
//!
//! Position and heading are only corrected when the prediction has drifted
//! past the tolerance; small drift is normal network latency and snapping
//! on it would stutter. Health, ammunition and the alive flag are never
//! predicted, so they are always copied.

use tracing::{debug, info};

use crate::config::{DivergenceMetric, PhysicsConfig, ReconcileConfig};
use crate::core::vec2::Vec2;
use crate::game::state::{clamp_to_arena, LocalTank};
use crate::network::protocol::WorldSnapshot;

/// What a snapshot did to the local tank.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReconcileOutcome {
    /// No usable record for the local player.
    NoLocalRecord,
    /// First record seen; the tank was created from it.
    Seeded,
    /// Drift exceeded the tolerance; pose snapped to the server.
    Corrected {
        /// Measured drift before the snap.
        divergence: f64,
    },
    /// Drift within tolerance; prediction kept.
    WithinTolerance {
        /// Measured drift.
        divergence: f64,
    },
}

impl ReconcileOutcome {
    /// The local pose was overwritten by the server.
    pub fn moved_tank(&self) -> bool {
        matches!(self, ReconcileOutcome::Seeded | ReconcileOutcome::Corrected { .. })
    }
}

/// Drift between predicted and authoritative positions under `metric`.
#[inline]
pub fn divergence(predicted: Vec2, authoritative: Vec2, metric: DivergenceMetric) -> f64 {
    match metric {
        DivergenceMetric::Euclidean => predicted.distance(authoritative),
        DivergenceMetric::PerAxis => predicted.max_axis_distance(authoritative),
    }
}

/// Merge one snapshot into the local tank.
///
/// `local` is `None` until the first record for `player_id` arrives.
pub fn reconcile(
    local: &mut Option<LocalTank>,
    snapshot: &WorldSnapshot,
    player_id: &str,
    physics: &PhysicsConfig,
    config: &ReconcileConfig,
) -> ReconcileOutcome {
    let Some(record) = snapshot.tank(player_id) else {
        return ReconcileOutcome::NoLocalRecord;
    };

    if !record.is_valid() {
        debug!(player_id, "Skipping malformed local record");
        return ReconcileOutcome::NoLocalRecord;
    }

    let tank = match local {
        Some(tank) if tank.initialized => tank,
        _ => {
            let seeded = LocalTank::seeded_from(record, physics);
            info!(
                x = seeded.position.x,
                y = seeded.position.y,
                heading = seeded.heading,
                "Local tank seeded"
            );
            *local = Some(seeded);
            return ReconcileOutcome::Seeded;
        }
    };

    let authoritative = record.position();
    let drift = divergence(tank.position, authoritative, config.metric);

    let outcome = if drift > config.tolerance {
        tank.position = clamp_to_arena(authoritative, physics);
        tank.set_heading(record.heading());
        debug!(divergence = drift, x = tank.position.x, y = tank.position.y, "Position corrected");
        ReconcileOutcome::Corrected { divergence: drift }
    } else {
        ReconcileOutcome::WithinTolerance { divergence: drift }
    };

    tank.apply_confirmed(record);
    outcome
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::angle::Direction;
    use crate::network::protocol::TankRecord;
    use proptest::prelude::*;
    use std::f64::consts::PI;

    const ME: &str = "player_me";

    fn record(player_id: &str, x: f64, y: f64) -> TankRecord {
        TankRecord {
            player_id: player_id.to_string(),
            x,
            y,
            direction: Some(Direction::Left),
            angle: None,
            health: 100,
            ammunition: 30,
            is_alive: true,
            color: None,
        }
    }

    fn snapshot(tanks: Vec<TankRecord>) -> WorldSnapshot {
        WorldSnapshot {
            tanks,
            ..Default::default()
        }
    }

    fn seeded_at(x: f64, y: f64) -> Option<LocalTank> {
        let mut local = None;
        let outcome = reconcile(
            &mut local,
            &snapshot(vec![record(ME, x, y)]),
            ME,
            &PhysicsConfig::default(),
            &ReconcileConfig::default(),
        );
        assert_eq!(outcome, ReconcileOutcome::Seeded);
        local
    }

    #[test]
    fn test_no_local_record_is_ignored() {
        let mut local = None;
        let outcome = reconcile(
            &mut local,
            &snapshot(vec![record("someone_else", 100.0, 100.0)]),
            ME,
            &PhysicsConfig::default(),
            &ReconcileConfig::default(),
        );
        assert_eq!(outcome, ReconcileOutcome::NoLocalRecord);
        assert!(local.is_none());
    }

    #[test]
    fn test_first_record_seeds() {
        let local = seeded_at(200.0, 150.0);
        let tank = local.unwrap();
        assert!(tank.initialized);
        assert_eq!(tank.position, Vec2::new(200.0, 150.0));
        assert!((tank.heading - PI).abs() < 1e-12);
        assert_eq!(tank.speed, 0.0);
    }

    #[test]
    fn test_seed_clamps_out_of_bounds() {
        let local = seeded_at(-50.0, 900.0);
        assert_eq!(local.unwrap().position, Vec2::new(15.0, 585.0));
    }

    #[test]
    fn test_within_tolerance_keeps_prediction() {
        let mut local = seeded_at(400.0, 300.0);
        let physics = PhysicsConfig::default();
        let config = ReconcileConfig::default();

        let outcome = reconcile(&mut local, &snapshot(vec![record(ME, 406.0, 308.0)]), ME, &physics, &config);
        assert_eq!(outcome, ReconcileOutcome::WithinTolerance { divergence: 10.0 });
        assert_eq!(local.as_ref().unwrap().position, Vec2::new(400.0, 300.0));
    }

    #[test]
    fn test_beyond_tolerance_snaps() {
        let mut local = seeded_at(400.0, 300.0);
        local.as_mut().unwrap().set_heading(0.3);
        let physics = PhysicsConfig::default();
        let config = ReconcileConfig::default();

        let mut server = record(ME, 420.0, 300.0);
        server.angle = Some(1.0);
        let outcome = reconcile(&mut local, &snapshot(vec![server]), ME, &physics, &config);

        assert!(matches!(outcome, ReconcileOutcome::Corrected { .. }));
        assert!(outcome.moved_tank());
        let tank = local.unwrap();
        assert_eq!(tank.position, Vec2::new(420.0, 300.0));
        assert!((tank.heading - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_per_axis_metric() {
        let physics = PhysicsConfig::default();
        let config = ReconcileConfig {
            tolerance: 10.0,
            metric: DivergenceMetric::PerAxis,
        };
        let mut local = seeded_at(400.0, 300.0);

        // Euclidean 12.7, but neither axis beyond 10
        let outcome = reconcile(&mut local, &snapshot(vec![record(ME, 409.0, 309.0)]), ME, &physics, &config);
        assert_eq!(outcome, ReconcileOutcome::WithinTolerance { divergence: 9.0 });

        let outcome = reconcile(&mut local, &snapshot(vec![record(ME, 411.0, 300.0)]), ME, &physics, &config);
        assert!(matches!(outcome, ReconcileOutcome::Corrected { .. }));
    }

    #[test]
    fn test_malformed_record_skipped() {
        let mut local = seeded_at(400.0, 300.0);
        let mut bad = record(ME, f64::NAN, 300.0);
        bad.health = 1;
        let outcome = reconcile(
            &mut local,
            &snapshot(vec![bad]),
            ME,
            &PhysicsConfig::default(),
            &ReconcileConfig::default(),
        );
        assert_eq!(outcome, ReconcileOutcome::NoLocalRecord);
        assert_eq!(local.unwrap().health, 100);
    }

    #[test]
    fn test_confirmed_fields_always_copied() {
        let mut local = seeded_at(400.0, 300.0);
        let mut server = record(ME, 401.0, 300.0);
        server.health = 40;
        server.ammunition = 0;
        server.is_alive = false;
        server.color = Some("#ff0000".to_string());

        reconcile(
            &mut local,
            &snapshot(vec![server]),
            ME,
            &PhysicsConfig::default(),
            &ReconcileConfig::default(),
        );
        let tank = local.unwrap();
        assert_eq!(tank.position, Vec2::new(400.0, 300.0));
        assert_eq!((tank.health, tank.ammunition, tank.alive), (40, 0, false));
        assert_eq!(tank.color.as_deref(), Some("#ff0000"));
    }

    proptest! {
        #[test]
        fn prop_snap_threshold(
            px in 15.0f64..785.0, py in 15.0f64..585.0,
            sx in 15.0f64..785.0, sy in 15.0f64..585.0,
            health in 0i32..=100, ammunition in 0i32..=30, alive: bool,
        ) {
            let physics = PhysicsConfig::default();
            let config = ReconcileConfig::default();
            let mut local = seeded_at(px, py);

            let mut server = record(ME, sx, sy);
            server.health = health;
            server.ammunition = ammunition;
            server.is_alive = alive;
            reconcile(&mut local, &snapshot(vec![server]), ME, &physics, &config);

            let tank = local.unwrap();
            let predicted = Vec2::new(px, py);
            let authoritative = Vec2::new(sx, sy);
            if predicted.distance(authoritative) <= config.tolerance {
                prop_assert_eq!(tank.position, predicted);
            } else {
                prop_assert_eq!(tank.position, authoritative);
            }
            prop_assert_eq!(tank.health, health);
            prop_assert_eq!(tank.ammunition, ammunition);
            prop_assert_eq!(tank.alive, alive);
        }
    }
}

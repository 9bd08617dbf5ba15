//! Presentation View Model
//!
//! Read-only projections handed to whatever draws the arena. The own tank
//! is drawn from the predicted pose, everyone else from the snapshot.

use serde::Serialize;

use crate::core::angle::Direction;
use crate::core::vec2::Vec2;
use crate::game::state::{LocalTank, MAX_AMMUNITION, MAX_HEALTH};
use crate::network::protocol::{TankRecord, WorldSnapshot};

/// One tank to draw.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TankView {
    /// Owning player.
    pub player_id: String,
    /// Centre position.
    pub position: Vec2,
    /// Radians in `[0, 2π)`.
    pub heading: f64,
    /// Coarse facing derived from `heading`.
    pub direction: Direction,
    /// Server-assigned color.
    pub color: Option<String>,
    /// Health.
    pub health: i32,
    /// Drawn from local prediction.
    pub is_local: bool,
    /// Alive flag.
    pub is_alive: bool,
}

impl TankView {
    /// View of a remote tank straight from its record.
    pub fn remote(record: &TankRecord) -> Self {
        let heading = record.heading();
        Self {
            player_id: record.player_id.clone(),
            position: record.position(),
            heading,
            direction: Direction::from_angle(heading),
            color: record.color.clone(),
            health: record.health,
            is_local: false,
            is_alive: record.is_alive,
        }
    }

    /// View of the own tank: predicted pose, server color as fallback.
    pub fn local(record: &TankRecord, tank: &LocalTank) -> Self {
        Self {
            player_id: record.player_id.clone(),
            position: tank.position,
            heading: tank.heading,
            direction: tank.direction(),
            color: tank.color.clone().or_else(|| record.color.clone()),
            health: tank.health,
            is_local: true,
            is_alive: tank.alive,
        }
    }
}

/// Heads-up display values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HudView {
    /// Own health.
    pub health: i32,
    /// Own rounds left.
    pub ammunition: i32,
    /// Own score.
    pub score: i32,
    /// Tanks in the arena.
    pub active_players: u32,
}

impl Default for HudView {
    fn default() -> Self {
        Self {
            health: MAX_HEALTH,
            ammunition: MAX_AMMUNITION,
            score: 0,
            active_players: 0,
        }
    }
}

/// Build the tank list for a snapshot.
pub fn tank_views(snapshot: &WorldSnapshot, player_id: &str, local: Option<&LocalTank>) -> Vec<TankView> {
    snapshot
        .tanks
        .iter()
        .filter(|record| record.is_valid())
        .map(|record| match local {
            Some(tank) if tank.initialized && record.player_id == player_id => TankView::local(record, tank),
            _ => TankView::remote(record),
        })
        .collect()
}

/// Build the HUD.
pub fn hud(snapshot: Option<&WorldSnapshot>, player_id: &str, local: Option<&LocalTank>) -> HudView {
    let mut view = HudView::default();
    if let Some(tank) = local {
        view.health = tank.health;
        view.ammunition = tank.ammunition;
    }
    if let Some(snapshot) = snapshot {
        view.score = snapshot.score(player_id);
        view.active_players = snapshot.active_players();
    }
    view
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PhysicsConfig;
    use crate::network::protocol::GameInfo;
    use std::f64::consts::FRAC_PI_2;

    fn record(player_id: &str, x: f64, y: f64) -> TankRecord {
        TankRecord {
            player_id: player_id.to_string(),
            x,
            y,
            direction: Some(Direction::Down),
            angle: None,
            health: 70,
            ammunition: 12,
            is_alive: true,
            color: Some("#00ff00".to_string()),
        }
    }

    #[test]
    fn test_own_tank_uses_prediction() {
        let snapshot = WorldSnapshot {
            tanks: vec![record("me", 100.0, 100.0), record("them", 500.0, 400.0)],
            ..Default::default()
        };
        let mut tank = LocalTank::seeded_from(&snapshot.tanks[0], &PhysicsConfig::default());
        tank.position = Vec2::new(108.0, 100.0);

        let views = tank_views(&snapshot, "me", Some(&tank));
        assert_eq!(views.len(), 2);
        assert!(views[0].is_local);
        assert_eq!(views[0].position, Vec2::new(108.0, 100.0));
        assert!(!views[1].is_local);
        assert_eq!(views[1].position, Vec2::new(500.0, 400.0));
        assert!((views[1].heading - FRAC_PI_2).abs() < 1e-12);
        assert_eq!(views[1].direction, Direction::Down);
    }

    #[test]
    fn test_hud_defaults_and_values() {
        assert_eq!(hud(None, "me", None), HudView::default());

        let mut snapshot = WorldSnapshot {
            tanks: vec![record("me", 100.0, 100.0)],
            game_info: Some(GameInfo {
                active_players: 3,
                ..Default::default()
            }),
            ..Default::default()
        };
        snapshot.scores.insert("me".to_string(), 250);
        let tank = LocalTank::seeded_from(&snapshot.tanks[0], &PhysicsConfig::default());

        let view = hud(Some(&snapshot), "me", Some(&tank));
        assert_eq!(
            view,
            HudView {
                health: 70,
                ammunition: 12,
                score: 250,
                active_players: 3,
            }
        );
    }
}

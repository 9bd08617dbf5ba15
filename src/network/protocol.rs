//! Protocol Messages
//!
//! Wire format for client-server communication. Everything is JSON carried
//! in STOMP frame bodies. Field names follow the server's camelCase DTOs.

use std::collections::HashMap;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::core::angle::{deserialize_lenient_direction, Direction};
use crate::core::vec2::Vec2;
use crate::game::state::{MAX_AMMUNITION, MAX_HEALTH};

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// One outbound player action, as published to the action destination.
///
/// ```json
/// {"type":"PLAYER_SHOOT","playerId":"player_…","timestamp":1700000000000,"data":{}}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionMessage {
    /// Kind tag plus kind-specific `data`.
    #[serde(flatten)]
    pub action: PlayerAction,
    /// Publishing player.
    #[serde(rename = "playerId")]
    pub player_id: String,
    /// Client wall-clock time (ms since epoch).
    pub timestamp: i64,
}

/// Closed set of player actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PlayerAction {
    /// Enter the arena.
    #[serde(rename = "PLAYER_JOIN")]
    Join(JoinData),
    /// Predicted pose while moving.
    #[serde(rename = "PLAYER_MOVE")]
    Move(MoveData),
    /// Final pose when motion stops.
    #[serde(rename = "PLAYER_STOP")]
    Stop(MoveData),
    /// Fire the cannon.
    #[serde(rename = "PLAYER_SHOOT")]
    Shoot(NoData),
    /// Refill ammunition.
    #[serde(rename = "PLAYER_RELOAD")]
    Reload(NoData),
    /// Leave the arena.
    #[serde(rename = "PLAYER_LEAVE")]
    Leave(NoData),
}

/// Kind tag of a [`PlayerAction`], for logging and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    /// PLAYER_JOIN
    Join,
    /// PLAYER_MOVE
    Move,
    /// PLAYER_STOP
    Stop,
    /// PLAYER_SHOOT
    Shoot,
    /// PLAYER_RELOAD
    Reload,
    /// PLAYER_LEAVE
    Leave,
}

impl ActionKind {
    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::Join => "PLAYER_JOIN",
            ActionKind::Move => "PLAYER_MOVE",
            ActionKind::Stop => "PLAYER_STOP",
            ActionKind::Shoot => "PLAYER_SHOOT",
            ActionKind::Reload => "PLAYER_RELOAD",
            ActionKind::Leave => "PLAYER_LEAVE",
        }
    }
}

impl PlayerAction {
    /// Kind tag.
    pub fn kind(&self) -> ActionKind {
        match self {
            PlayerAction::Join(_) => ActionKind::Join,
            PlayerAction::Move(_) => ActionKind::Move,
            PlayerAction::Stop(_) => ActionKind::Stop,
            PlayerAction::Shoot(_) => ActionKind::Shoot,
            PlayerAction::Reload(_) => ActionKind::Reload,
            PlayerAction::Leave(_) => ActionKind::Leave,
        }
    }
}

/// PLAYER_JOIN payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinData {
    /// Time the join was requested (ms since epoch).
    pub timestamp: i64,
}

/// PLAYER_MOVE / PLAYER_STOP payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveData {
    /// Predicted X.
    pub x: f64,
    /// Predicted Y.
    pub y: f64,
    /// Coarse facing derived from `angle`.
    pub direction: Direction,
    /// Moving flag (always false for PLAYER_STOP).
    #[serde(rename = "isMoving")]
    pub is_moving: bool,
    /// Raw heading for smoother remote rendering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angle: Option<f64>,
}

/// Empty payload; serializes as `{}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoData {}

impl ActionMessage {
    /// Kind tag.
    pub fn kind(&self) -> ActionKind {
        self.action.kind()
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Authoritative world snapshot broadcast on the game-state topic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldSnapshot {
    /// Message tag (`GAME_STATE_UPDATE`).
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Server time of the snapshot (ms since epoch).
    #[serde(default)]
    pub timestamp: i64,
    /// Every tank in the arena. Malformed records are dropped one by one.
    #[serde(default, deserialize_with = "skip_malformed_records")]
    pub tanks: Vec<TankRecord>,
    /// Active projectiles.
    #[serde(default, deserialize_with = "null_as_default")]
    pub bullets: Vec<BulletRecord>,
    /// Score per player id.
    #[serde(default, deserialize_with = "null_as_default")]
    pub scores: HashMap<String, i32>,
    /// Per-player statistics.
    #[serde(default, deserialize_with = "null_as_default")]
    pub player_stats: HashMap<String, PlayerStats>,
    /// Aggregate match info.
    #[serde(default)]
    pub game_info: Option<GameInfo>,
}

impl WorldSnapshot {
    /// Record for a given player, if present.
    pub fn tank(&self, player_id: &str) -> Option<&TankRecord> {
        self.tanks.iter().find(|t| t.player_id == player_id)
    }

    /// Score for a given player (0 when absent).
    pub fn score(&self, player_id: &str) -> i32 {
        self.scores.get(player_id).copied().unwrap_or(0)
    }

    /// Active player count from `gameInfo` (0 when absent).
    pub fn active_players(&self) -> u32 {
        self.game_info.as_ref().map(|g| g.active_players).unwrap_or(0)
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

/// Authoritative per-player tank record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TankRecord {
    /// Owning player.
    #[serde(rename = "playerId")]
    pub player_id: String,
    /// Centre X.
    pub x: f64,
    /// Centre Y.
    pub y: f64,
    /// Coarse facing; unknown names decode as `None`.
    #[serde(default, deserialize_with = "deserialize_lenient_direction")]
    pub direction: Option<Direction>,
    /// Raw heading, when the server tracks one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angle: Option<f64>,
    /// Health (0-100).
    #[serde(default = "default_health")]
    pub health: i32,
    /// Rounds left.
    #[serde(default = "default_ammunition")]
    pub ammunition: i32,
    /// Alive flag.
    #[serde(rename = "isAlive", alias = "alive", default = "default_alive")]
    pub is_alive: bool,
    /// Display color.
    #[serde(default)]
    pub color: Option<String>,
}

impl TankRecord {
    /// Position as a vector.
    #[inline]
    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    /// Heading implied by this record: raw angle if finite, otherwise the
    /// coarse direction, otherwise UP.
    pub fn heading(&self) -> f64 {
        match self.angle {
            Some(angle) if angle.is_finite() => crate::core::angle::normalize_angle(angle),
            _ => self.direction.unwrap_or(Direction::Up).to_angle(),
        }
    }

    /// Usable for reconciliation (finite coordinates).
    pub fn is_valid(&self) -> bool {
        self.position().is_finite()
    }
}

/// Active projectile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulletRecord {
    /// Centre X.
    pub x: f64,
    /// Centre Y.
    pub y: f64,
    /// Shooter.
    #[serde(default)]
    pub owner_id: Option<String>,
    /// Travel direction.
    #[serde(default, deserialize_with = "deserialize_lenient_direction")]
    pub direction: Option<Direction>,
}

/// Aggregate match info.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameInfo {
    /// Tanks currently in the arena.
    #[serde(default)]
    pub active_players: u32,
    /// Match start (ms since epoch).
    #[serde(default)]
    pub game_start_time: Option<i64>,
    /// Elapsed match time (ms).
    #[serde(default)]
    pub game_duration: Option<i64>,
    /// Status label, e.g. `ACTIVE`.
    #[serde(default)]
    pub game_status: Option<String>,
}

/// Per-player statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStats {
    /// Display name.
    #[serde(default)]
    pub player_name: Option<String>,
    /// Kills.
    #[serde(default)]
    pub kills: u32,
    /// Deaths.
    #[serde(default)]
    pub deaths: u32,
    /// Health.
    #[serde(default)]
    pub health: i32,
    /// Rounds left.
    #[serde(default)]
    pub ammunition: i32,
    /// Alive flag.
    #[serde(default, alias = "isAlive")]
    pub alive: bool,
}

/// Achievement unlocked notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    /// Message tag (`ACHIEVEMENT_UNLOCKED`).
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    /// Player who earned it.
    #[serde(default)]
    pub player_id: Option<String>,
    /// Short title.
    pub achievement_name: String,
    /// Longer description.
    #[serde(default)]
    pub description: String,
    /// Points awarded.
    #[serde(default)]
    pub bonus_points: i32,
    /// Server time (ms since epoch).
    #[serde(default)]
    pub timestamp: i64,
}

impl Achievement {
    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

// =============================================================================
// SERIALIZATION HELPERS
// =============================================================================

fn default_health() -> i32 {
    MAX_HEALTH
}

fn default_ammunition() -> i32 {
    MAX_AMMUNITION
}

fn default_alive() -> bool {
    true
}

/// Treat an explicit JSON `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Decode a list element by element, skipping entries that do not parse.
fn skip_malformed_records<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let raw = Option::<Vec<serde_json::Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(raw
        .into_iter()
        .filter_map(|value| match serde_json::from_value(value) {
            Ok(record) => Some(record),
            Err(e) => {
                debug!("Skipping malformed record: {}", e);
                None
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_move_message_wire_shape() {
        let msg = ActionMessage {
            action: PlayerAction::Move(MoveData {
                x: 412.5,
                y: 300.0,
                direction: Direction::Right,
                is_moving: true,
                angle: Some(0.08),
            }),
            player_id: "player_1".to_string(),
            timestamp: 1_700_000_000_000,
        };

        let value: serde_json::Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(value["type"], "PLAYER_MOVE");
        assert_eq!(value["playerId"], "player_1");
        assert_eq!(value["timestamp"], 1_700_000_000_000i64);
        assert_eq!(value["data"]["x"], 412.5);
        assert_eq!(value["data"]["direction"], "RIGHT");
        assert_eq!(value["data"]["isMoving"], true);
        assert_eq!(value["data"]["angle"], 0.08);

        let parsed = ActionMessage::from_json(&msg.to_json().unwrap()).unwrap();
        assert_eq!(parsed, msg);
    }

    #[test]
    fn test_empty_payload_actions() {
        let msg = ActionMessage {
            action: PlayerAction::Shoot(NoData {}),
            player_id: "p".to_string(),
            timestamp: 5,
        };
        let value: serde_json::Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(value["type"], "PLAYER_SHOOT");
        assert_eq!(value["data"], json!({}));
        assert_eq!(msg.kind(), ActionKind::Shoot);
        assert_eq!(msg.kind().as_str(), "PLAYER_SHOOT");
    }

    #[test]
    fn test_stop_omits_missing_angle() {
        let msg = ActionMessage {
            action: PlayerAction::Stop(MoveData {
                x: 1.0,
                y: 2.0,
                direction: Direction::Up,
                is_moving: false,
                angle: None,
            }),
            player_id: "p".to_string(),
            timestamp: 0,
        };
        let json = msg.to_json().unwrap();
        assert!(json.contains("\"PLAYER_STOP\""));
        assert!(!json.contains("angle"));
    }

    #[test]
    fn test_snapshot_from_server_dto() {
        // Shape produced by the server, including fields we ignore
        let raw = json!({
            "type": "GAME_STATE_UPDATE",
            "timestamp": 1700000000123i64,
            "tanks": [{
                "id": "tank_1",
                "playerId": "player_a",
                "x": 100.0,
                "y": 120.5,
                "direction": "LEFT",
                "health": 75,
                "ammunition": 9,
                "speed": 2.0,
                "color": "#00FF00",
                "moving": false,
                "alive": true,
                "lastShotTime": 0
            }],
            "bullets": [{"id": "b1", "x": 10.0, "y": 20.0, "direction": "UP", "ownerId": "player_a"}],
            "scores": {"player_a": 40},
            "playerStats": {"player_a": {"playerName": "A", "kills": 2, "deaths": 1, "health": 75, "ammunition": 9, "alive": true}},
            "gameInfo": {"activePlayers": 1, "gameStartTime": 1, "gameDuration": 2, "gameStatus": "ACTIVE"}
        });

        let snapshot = WorldSnapshot::from_json(&raw.to_string()).unwrap();
        let tank = snapshot.tank("player_a").unwrap();
        assert_eq!(tank.position(), Vec2::new(100.0, 120.5));
        assert_eq!(tank.direction, Some(Direction::Left));
        assert_eq!(tank.health, 75);
        assert_eq!(tank.ammunition, 9);
        assert!(tank.is_alive);
        assert_eq!(snapshot.bullets.len(), 1);
        assert_eq!(snapshot.score("player_a"), 40);
        assert_eq!(snapshot.score("nobody"), 0);
        assert_eq!(snapshot.active_players(), 1);
        assert_eq!(snapshot.player_stats["player_a"].kills, 2);
    }

    #[test]
    fn test_snapshot_tolerates_nulls_and_unknown_direction() {
        let raw = r#"{"tanks":[{"playerId":"p","x":1,"y":2,"direction":"SIDEWAYS","isAlive":false}],
                      "bullets":null,"scores":null}"#;
        let snapshot = WorldSnapshot::from_json(raw).unwrap();
        let tank = &snapshot.tanks[0];
        assert_eq!(tank.direction, None);
        assert!(!tank.is_alive);
        assert_eq!(tank.health, 100);
        assert_eq!(tank.ammunition, 30);
        assert!(snapshot.bullets.is_empty());
        assert!(snapshot.game_info.is_none());
    }

    #[test]
    fn test_snapshot_skips_only_malformed_tanks() {
        let raw = r#"{"tanks":[
                        {"playerId":"other","x":"bad","y":2},
                        {"x":5,"y":6},
                        {"playerId":"me","x":100,"y":200,"direction":"LEFT"}
                      ],"scores":{"me":40}}"#;
        let snapshot = WorldSnapshot::from_json(raw).unwrap();
        assert_eq!(snapshot.tanks.len(), 1);
        let tank = snapshot.tank("me").unwrap();
        assert_eq!(tank.position(), Vec2::new(100.0, 200.0));
        assert_eq!(tank.direction, Some(Direction::Left));
        assert_eq!(snapshot.score("me"), 40);

        let empty = WorldSnapshot::from_json(r#"{"tanks":null}"#).unwrap();
        assert!(empty.tanks.is_empty());
    }

    #[test]
    fn test_tank_record_heading() {
        let mut record = TankRecord {
            player_id: "p".to_string(),
            x: 0.0,
            y: 0.0,
            direction: Some(Direction::Left),
            angle: None,
            health: 100,
            ammunition: 30,
            is_alive: true,
            color: None,
        };
        assert_eq!(record.heading(), std::f64::consts::PI);

        record.angle = Some(-0.5);
        assert!((record.heading() - (std::f64::consts::TAU - 0.5)).abs() < 1e-12);

        record.angle = Some(f64::NAN);
        assert_eq!(record.heading(), std::f64::consts::PI);

        record.x = f64::INFINITY;
        assert!(!record.is_valid());
    }

    #[test]
    fn test_achievement_decode() {
        let raw = r#"{"type":"ACHIEVEMENT_UNLOCKED","playerId":"p","achievementName":"Sharpshooter",
                      "description":"5 kills","bonusPoints":50,"timestamp":3}"#;
        let achievement = Achievement::from_json(raw).unwrap();
        assert_eq!(achievement.achievement_name, "Sharpshooter");
        assert_eq!(achievement.bonus_points, 50);
        assert_eq!(achievement.player_id.as_deref(), Some("p"));
    }
}

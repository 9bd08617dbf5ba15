//! End-to-end client session flows through the public API.

use panzers::game::input::Control;
use panzers::network::protocol::{ActionKind, PlayerAction, TankRecord, WorldSnapshot};
use panzers::network::publisher::FireOutcome;
use panzers::network::transport::{RecordingTransport, TransportEvent};
use panzers::{ClientConfig, ClientSession, Direction};
use proptest::prelude::*;

const ME: &str = "player_1700000000000_abc123xyz";

fn record(x: f64, y: f64, ammunition: i32) -> TankRecord {
    TankRecord {
        player_id: ME.to_string(),
        x,
        y,
        direction: Some(Direction::Right),
        angle: Some(0.0),
        health: 100,
        ammunition,
        is_alive: true,
        color: None,
    }
}

fn session_at(x: f64, y: f64, ammunition: i32) -> ClientSession<RecordingTransport> {
    let mut session = ClientSession::with_player_id(ClientConfig::default(), RecordingTransport::connected(), ME);
    session.on_transport_event(TransportEvent::Connected, 0);
    session.on_transport_event(
        TransportEvent::Snapshot(WorldSnapshot {
            tanks: vec![record(x, y, ammunition)],
            ..Default::default()
        }),
        0,
    );
    session.transport_mut().take();
    session
}

fn count(session: &ClientSession<RecordingTransport>, kind: ActionKind) -> usize {
    session.transport().messages().filter(|m| m.kind() == kind).count()
}

#[test]
fn test_forward_from_centre_converges_along_x() {
    let mut session = session_at(400.0, 300.0, 30);
    session.on_key("KeyW", true, 0);

    let max_speed = session.config().physics.max_speed;
    let mut now = 0;
    let mut last_speed = 0.0;
    let mut last_x = 400.0;
    for _ in 0..60 {
        now += 16;
        session.tick(now);
        let tank = session.local_tank().unwrap();

        assert!(tank.speed > last_speed);
        assert!(tank.speed <= max_speed);
        assert!(tank.position.x > last_x);
        assert_eq!(tank.position.y, 300.0);

        last_speed = tank.speed;
        last_x = tank.position.x;
    }
    assert!((last_speed - max_speed).abs() < 1e-3);

    // Every tick published a move carrying the predicted pose
    assert_eq!(count(&session, ActionKind::Move), 60);
    let last = session.transport().messages().last().unwrap();
    match &last.action {
        PlayerAction::Move(data) => {
            assert_eq!(data.x, last_x);
            assert_eq!(data.direction, Direction::Right);
            assert!(data.is_moving);
        }
        other => panic!("Expected a move, got {:?}", other),
    }
}

#[test]
fn test_release_publishes_exactly_one_stop() {
    let mut session = session_at(400.0, 300.0, 30);
    session.on_key("KeyW", true, 0);
    let mut now = 0;
    for _ in 0..20 {
        now += 16;
        session.tick(now);
    }
    session.on_key("KeyW", false, now);
    for _ in 0..200 {
        now += 16;
        session.tick(now);
    }

    assert!(!session.local_tank().unwrap().is_moving);
    assert_eq!(count(&session, ActionKind::Stop), 1);
    let kinds: Vec<ActionKind> = session.transport().messages().map(|m| m.kind()).collect();
    assert_eq!(kinds.last(), Some(&ActionKind::Stop));
}

#[test]
fn test_blur_stops_tank_within_one_tick() {
    let mut session = session_at(400.0, 300.0, 30);
    for control in [Control::ThrottleForward, Control::RotateLeft] {
        session.on_key_edge(control, true, 0);
    }
    let mut now = 0;
    for _ in 0..30 {
        now += 16;
        session.tick(now);
    }
    assert!(session.local_tank().unwrap().is_moving);

    session.on_blur();
    assert!(session.input().is_empty());

    now += 16;
    session.tick(now);
    let tank = session.local_tank().unwrap();
    assert!(!tank.is_moving);
    assert_eq!(tank.speed, 0.0);
}

#[test]
fn test_focus_regain_discards_stale_keys() {
    let mut session = session_at(400.0, 300.0, 30);
    session.on_key("KeyD", true, 0);
    session.on_focus();
    assert!(session.input().is_empty());
    session.tick(16);
    assert!(!session.local_tank().unwrap().is_moving);
}

#[test]
fn test_zero_ammo_never_shoots() {
    let mut session = session_at(400.0, 300.0, 0);
    assert_eq!(session.fire(1000), Some(FireOutcome::OutOfAmmo));
    assert_eq!(count(&session, ActionKind::Shoot), 0);
    assert_eq!(count(&session, ActionKind::Reload), 1);
}

#[test]
fn test_disconnected_drops_actions() {
    let mut session = session_at(400.0, 300.0, 30);
    session.transport_mut().set_connected(false);

    session.on_key("KeyW", true, 0);
    session.tick(16);
    assert_eq!(session.fire(16), Some(FireOutcome::Dropped));
    assert!(session.transport().published().is_empty());

    // Prediction keeps running while offline
    assert!(session.local_tank().unwrap().position.x > 400.0);
}

proptest! {
    #[test]
    fn prop_cooldown_allows_one_shot(first in 0u64..1_000_000, gap in 0u64..500) {
        let mut session = session_at(400.0, 300.0, 30);
        session.fire(first);
        session.fire(first + gap);
        prop_assert_eq!(count(&session, ActionKind::Shoot), 1);
    }
}

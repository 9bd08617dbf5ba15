//! Panzers Client
//!
//! Headless client for the Panzers arena. Connects over STOMP and drives
//! the local tank from a short scripted input sequence, or with
//! `--offline` runs a deterministic local demo against a recording
//! transport.
//!
//! Usage: `panzers-client [--offline] [config.json]`

use std::time::Duration;

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use panzers::{
    ClientConfig, ClientSession, VERSION, TICK_RATE,
    network::{
        connection::Connection,
        protocol::{TankRecord, WorldSnapshot},
        transport::{RecordingTransport, TransportEvent},
    },
    runtime::{ClientInput, Runner},
    session::generate_player_id,
    Direction,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set tracing subscriber")?;

    info!("Panzers Client v{}", VERSION);
    info!("Tick Rate: {} Hz", TICK_RATE);

    let mut offline = false;
    let mut config_path = None;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--offline" => offline = true,
            path => config_path = Some(path.to_string()),
        }
    }

    let config = match config_path {
        Some(path) => ClientConfig::from_file(&path).with_context(|| format!("Failed to load config {}", path))?,
        None => ClientConfig::default(),
    };

    if offline {
        demo_offline(config);
        return Ok(());
    }

    run_online(config).await
}

/// Connect to the server and replay a short input script until Ctrl-C.
async fn run_online(config: ClientConfig) -> anyhow::Result<()> {
    info!("Connecting to {}", config.connection.url);
    let (transport, events, connection) = Connection::spawn(config.connection.clone());
    let session = ClientSession::new(config, transport);
    info!("Player ID: {}", session.player_id());

    let (input_tx, input_rx) = mpsc::channel(32);
    let runner = tokio::spawn(Runner::new(session, events, input_rx).run());

    tokio::select! {
        _ = scripted_input(input_tx.clone()) => {
            info!("Input script finished, press Ctrl-C to leave");
            tokio::signal::ctrl_c().await.context("Failed to listen for Ctrl-C")?;
        }
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for Ctrl-C")?;
        }
    }

    info!("Shutting down");
    let _ = input_tx.send(ClientInput::Shutdown).await;
    let session = runner.await.context("Runner task failed")?;

    if let Some(tank) = session.local_tank() {
        info!(
            "Final pose: ({:.1}, {:.1}) heading {:.2} rad, ammo {}",
            tank.position.x, tank.position.y, tank.heading, tank.ammunition
        );
    }

    connection.shutdown().await;
    Ok(())
}

/// Drive forward, turn, fire.
async fn scripted_input(tx: mpsc::Sender<ClientInput>) {
    let steps: [(&str, bool, u64); 8] = [
        ("KeyW", true, 1000),
        ("KeyW", false, 1500),
        ("KeyD", true, 0),
        ("KeyD", false, 500),
        ("Space", true, 0),
        ("Space", false, 100),
        ("KeyS", true, 0),
        ("KeyS", false, 800),
    ];

    for (code, pressed, delay_ms) in steps {
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        let input = ClientInput::Key {
            code: code.to_string(),
            pressed,
        };
        if tx.send(input).await.is_err() {
            return;
        }
    }
}

/// Deterministic local demo: seed, drive, coast, fire, get corrected.
fn demo_offline(config: ClientConfig) {
    info!("=== Offline Demo ===");

    let tick_ms = config.tick_period().as_millis() as u64;
    let player_id = generate_player_id(0);
    let mut session = ClientSession::with_player_id(config, RecordingTransport::connected(), player_id.clone());
    let mut now = 0u64;

    session.on_transport_event(TransportEvent::Connected, now);
    let seed = WorldSnapshot {
        tanks: vec![TankRecord {
            player_id: player_id.clone(),
            x: 400.0,
            y: 300.0,
            direction: Some(Direction::Right),
            angle: None,
            health: 100,
            ammunition: 2,
            is_alive: true,
            color: Some("#4caf50".to_string()),
        }],
        ..Default::default()
    };
    session.on_transport_event(TransportEvent::Snapshot(seed.clone()), now);

    // Full throttle for one second
    session.on_key("KeyW", true, now);
    for _ in 0..60 {
        now += tick_ms;
        session.tick(now);
    }
    if let Some(tank) = session.local_tank() {
        info!("After 60 ticks forward: ({:.2}, {:.2}) speed {:.3}", tank.position.x, tank.position.y, tank.speed);
    }

    // Release and coast
    session.on_key("KeyW", false, now);
    for _ in 0..60 {
        now += tick_ms;
        session.tick(now);
    }
    if let Some(tank) = session.local_tank() {
        info!("After coasting: ({:.2}, {:.2}) moving={}", tank.position.x, tank.position.y, tank.is_moving);
    }

    // Fire: second press is inside the cooldown
    for _ in 0..2 {
        if let Some(outcome) = session.fire(now) {
            info!("Fire: {:?}", outcome);
        }
        now += 100;
    }

    // Server disagrees by more than the tolerance
    let mut correction = seed;
    correction.tanks[0].x = 450.0;
    correction.tanks[0].ammunition = 0;
    session.on_transport_event(TransportEvent::Snapshot(correction), now);
    info!("Reconciliation: {:?}", session.last_reconcile());

    // Out of ammo: becomes a reload
    now += 1000;
    info!("Fire with empty magazine: {:?}", session.fire(now));
    for notice in session.notices().notices() {
        info!("Notice: {}", notice.text);
    }

    session.shutdown(now);

    info!("=== Published Actions ===");
    for message in session.transport().messages() {
        info!("t={} {}", message.timestamp, message.kind().as_str());
    }
    info!("HUD: {:?}", session.hud());
}

//! Client Runner
//!
//! The single logical thread of control. One `select!` loop serializes the
//! simulation tick, the display frame, inbound transport events and local
//! input onto the [`ClientSession`]. Nothing else touches the session, so
//! no locking is needed.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::network::transport::{Transport, TransportEvent};
use crate::runtime::scheduler::PeriodicTrigger;
use crate::session::ClientSession;

/// Local input delivered to the runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientInput {
    /// Key edge by key code.
    Key {
        /// Key code, e.g. `KeyW`.
        code: String,
        /// Press (true) or release (false).
        pressed: bool,
    },
    /// Window lost focus.
    Blur,
    /// Window regained focus.
    Focus,
    /// Leave the game and stop the loop.
    Shutdown,
}

/// Millisecond clock anchored to the wall clock at creation and advanced
/// by the tokio clock, so it is monotonic and follows paused test time.
#[derive(Debug, Clone, Copy)]
pub struct SessionClock {
    epoch_ms: u64,
    started: Instant,
}

impl SessionClock {
    /// Clock reading the current wall time.
    pub fn new() -> Self {
        Self::starting_at(chrono::Utc::now().timestamp_millis().max(0) as u64)
    }

    /// Clock reading `epoch_ms` now.
    pub fn starting_at(epoch_ms: u64) -> Self {
        Self {
            epoch_ms,
            started: Instant::now(),
        }
    }

    /// Current time (ms).
    pub fn now_ms(&self) -> u64 {
        let elapsed: Duration = self.started.elapsed();
        self.epoch_ms + elapsed.as_millis() as u64
    }
}

impl Default for SessionClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Drives a session until shutdown.
pub struct Runner<T: Transport> {
    session: ClientSession<T>,
    clock: SessionClock,
    tick_trigger: PeriodicTrigger,
    frame_trigger: PeriodicTrigger,
    events: mpsc::Receiver<TransportEvent>,
    inputs: mpsc::Receiver<ClientInput>,
}

impl<T: Transport> Runner<T> {
    /// Build a runner with trigger periods from the session config.
    pub fn new(
        session: ClientSession<T>,
        events: mpsc::Receiver<TransportEvent>,
        inputs: mpsc::Receiver<ClientInput>,
    ) -> Self {
        let tick_trigger = PeriodicTrigger::new(session.config().tick_period());
        let frame_trigger = PeriodicTrigger::new(session.config().frame_period());
        Self {
            session,
            clock: SessionClock::new(),
            tick_trigger,
            frame_trigger,
            events,
            inputs,
        }
    }

    /// Replace the clock.
    pub fn with_clock(mut self, clock: SessionClock) -> Self {
        self.clock = clock;
        self
    }

    /// Run until [`ClientInput::Shutdown`] or the input channel closes.
    /// Returns the session for inspection.
    pub async fn run(mut self) -> ClientSession<T> {
        info!(player_id = self.session.player_id(), "Runner started");
        let mut events_open = true;
        self.sync_triggers();

        loop {
            tokio::select! {
                _ = self.tick_trigger.tick() => {
                    self.session.tick(self.clock.now_ms());
                }
                _ = self.frame_trigger.tick() => {
                    self.session.on_frame(self.clock.now_ms());
                }
                event = self.events.recv(), if events_open => {
                    match event {
                        Some(event) => self.session.on_transport_event(event, self.clock.now_ms()),
                        None => {
                            debug!("Transport event stream closed");
                            events_open = false;
                        }
                    }
                }
                input = self.inputs.recv() => {
                    let now = self.clock.now_ms();
                    match input {
                        Some(ClientInput::Key { code, pressed }) => {
                            self.session.on_key(&code, pressed, now);
                        }
                        Some(ClientInput::Blur) => self.session.on_blur(),
                        Some(ClientInput::Focus) => self.session.on_focus(),
                        Some(ClientInput::Shutdown) | None => {
                            self.session.shutdown(now);
                            break;
                        }
                    }
                }
            }
            self.sync_triggers();
        }

        self.tick_trigger.stop();
        self.frame_trigger.stop();
        info!("Runner stopped");
        self.session
    }

    /// Triggers follow the pause state.
    fn sync_triggers(&mut self) {
        if self.session.pause_state().is_paused() {
            if self.tick_trigger.stop() | self.frame_trigger.stop() {
                debug!("Triggers stopped");
            }
        } else if self.tick_trigger.start() | self.frame_trigger.start() {
            debug!("Triggers started");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::core::angle::Direction;
    use crate::network::protocol::{ActionKind, TankRecord, WorldSnapshot};
    use crate::network::transport::RecordingTransport;

    fn snapshot() -> WorldSnapshot {
        WorldSnapshot {
            tanks: vec![TankRecord {
                player_id: "player_me".to_string(),
                x: 400.0,
                y: 300.0,
                direction: Some(Direction::Right),
                angle: None,
                health: 100,
                ammunition: 30,
                is_alive: true,
                color: None,
            }],
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_runner_drives_session() {
        let session =
            ClientSession::with_player_id(ClientConfig::default(), RecordingTransport::connected(), "player_me");
        let (event_tx, event_rx) = mpsc::channel(16);
        let (input_tx, input_rx) = mpsc::channel(16);
        let runner = Runner::new(session, event_rx, input_rx).with_clock(SessionClock::starting_at(0));
        let handle = tokio::spawn(runner.run());

        event_tx.send(TransportEvent::Connected).await.unwrap();
        event_tx.send(TransportEvent::Snapshot(snapshot())).await.unwrap();
        input_tx
            .send(ClientInput::Key {
                code: "KeyW".to_string(),
                pressed: true,
            })
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(500)).await;
        input_tx.send(ClientInput::Shutdown).await.unwrap();
        let session = handle.await.unwrap();

        let tank = session.local_tank().unwrap();
        assert!(tank.position.x > 400.0);
        assert_eq!(tank.position.y, 300.0);

        let kinds: Vec<ActionKind> = session.transport().messages().map(|m| m.kind()).collect();
        assert_eq!(kinds.first(), Some(&ActionKind::Join));
        assert!(kinds.contains(&ActionKind::Move));
        assert_eq!(kinds.last(), Some(&ActionKind::Leave));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_stops_simulation() {
        let session =
            ClientSession::with_player_id(ClientConfig::default(), RecordingTransport::connected(), "player_me");
        let (event_tx, event_rx) = mpsc::channel(16);
        let (input_tx, input_rx) = mpsc::channel(16);
        let handle = tokio::spawn(Runner::new(session, event_rx, input_rx).run());

        event_tx.send(TransportEvent::Snapshot(snapshot())).await.unwrap();
        for (code, pressed) in [("Escape", true), ("KeyW", true)] {
            input_tx
                .send(ClientInput::Key {
                    code: code.to_string(),
                    pressed,
                })
                .await
                .unwrap();
        }

        tokio::time::sleep(Duration::from_millis(200)).await;
        input_tx.send(ClientInput::Shutdown).await.unwrap();
        let session = handle.await.unwrap();

        assert!(session.pause_state().is_paused());
        assert_eq!(session.local_tank().unwrap().position.x, 400.0);
        let kinds: Vec<ActionKind> = session.transport().messages().map(|m| m.kind()).collect();
        assert_eq!(kinds, vec![ActionKind::Leave]);
    }
}

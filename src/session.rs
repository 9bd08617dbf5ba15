//! Client Session
//!
//! The single owner of all client-side game state. Every entry point runs
//! to completion on the caller's thread; the runner serializes ticks,
//! frames, key edges and transport events onto it in arrival order.
//!
//! Time is passed in explicitly as milliseconds since the Unix epoch.

use tracing::{debug, info, instrument};

use crate::config::ClientConfig;
use crate::game::input::{Control, HeldKeys, InputEvent, InputState};
use crate::game::notice::{NoticeBoard, NoticeKind};
use crate::game::reconcile::{reconcile, ReconcileOutcome};
use crate::game::state::{LocalTank, PauseState};
use crate::game::tick::tick;
use crate::game::view::{self, HudView, TankView};
use crate::network::protocol::{Achievement, WorldSnapshot};
use crate::network::publisher::{ActionPublisher, FireOutcome, MovementOutcome};
use crate::network::transport::{Transport, TransportEvent};

/// Persistent notice shown while paused.
pub const PAUSE_NOTICE: &str = "Game Paused - Press ESC to resume";

/// Notice posted when a fire is turned into a reload.
pub const OUT_OF_AMMO_NOTICE: &str = "Out of ammo! Reloading...";

/// Notice posted on every reload request.
pub const RELOAD_NOTICE: &str = "Reloading...";

/// Lifetime of a broadcast achievement notice (ms).
pub const ACHIEVEMENT_NOTICE_MS: u64 = 5000;

/// Lifetime of a personal achievement notice (ms).
pub const PERSONAL_ACHIEVEMENT_NOTICE_MS: u64 = 7000;

/// Connection status for presentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// Waiting for the first CONNECTED.
    Connecting,
    /// Broker session up.
    Connected,
    /// Last session ended with this reason; a reconnect is pending.
    Error(String),
}

/// Generate a session player id: `player_<millis>_<9 base36 chars>`.
pub fn generate_player_id(now_ms: i64) -> String {
    const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut bits = uuid::Uuid::new_v4().as_u128();
    let mut suffix = String::with_capacity(9);
    for _ in 0..9 {
        suffix.push(ALPHABET[(bits % 36) as usize] as char);
        bits /= 36;
    }
    format!("player_{}_{}", now_ms, suffix)
}

/// Client-side game session.
pub struct ClientSession<T: Transport> {
    config: ClientConfig,
    transport: T,
    publisher: ActionPublisher,
    input: InputState,
    held_keys: HeldKeys,
    local: Option<LocalTank>,
    snapshot: Option<WorldSnapshot>,
    pause: PauseState,
    notices: NoticeBoard,
    status: ConnectionStatus,
    last_reconcile: Option<ReconcileOutcome>,
}

impl<T: Transport> ClientSession<T> {
    /// New session with a freshly generated player id.
    pub fn new(config: ClientConfig, transport: T) -> Self {
        let player_id = generate_player_id(chrono::Utc::now().timestamp_millis());
        Self::with_player_id(config, transport, player_id)
    }

    /// New session with a known player id.
    pub fn with_player_id(config: ClientConfig, transport: T, player_id: impl Into<String>) -> Self {
        let publisher = ActionPublisher::new(
            player_id,
            config.connection.action_destination.clone(),
            config.publisher.clone(),
        );
        info!(player_id = publisher.player_id(), "Client session created");
        Self {
            config,
            transport,
            publisher,
            input: InputState::new(),
            held_keys: HeldKeys::new(),
            local: None,
            snapshot: None,
            pause: PauseState::Running,
            notices: NoticeBoard::new(),
            status: ConnectionStatus::Connecting,
            last_reconcile: None,
        }
    }

    // ===== INPUT =====

    /// Raw key edge by key code. Unbound keys are ignored.
    ///
    /// A control stays held while any key bound to it is down.
    pub fn on_key(&mut self, code: &str, pressed: bool, now: u64) -> Option<InputEvent> {
        let control = self.config.bindings.resolve(code)?;
        let event = self.held_keys.on_key_edge(&mut self.input, code, control, pressed)?;
        self.dispatch(event, now);
        Some(event)
    }

    /// Key edge for a logical control. Discrete events are handled here.
    pub fn on_key_edge(&mut self, control: Control, pressed: bool, now: u64) -> Option<InputEvent> {
        let event = self.input.on_key_edge(control, pressed)?;
        self.dispatch(event, now);
        Some(event)
    }

    fn dispatch(&mut self, event: InputEvent, now: u64) {
        match event {
            InputEvent::Fire => {
                self.fire(now);
            }
            InputEvent::Reload => {
                self.reload(now);
            }
            InputEvent::TogglePause => {
                self.toggle_pause(now);
            }
        }
    }

    /// Window lost focus: forget keys and stop dead.
    pub fn on_blur(&mut self) {
        self.input.clear();
        self.held_keys.clear();
        if let Some(tank) = self.local.as_mut() {
            tank.emergency_stop();
        }
        debug!("Focus lost, movement stopped");
    }

    /// Window regained focus: key-ups may have been missed.
    pub fn on_focus(&mut self) {
        self.input.clear();
        self.held_keys.clear();
    }

    /// Fire request. Ignored while paused.
    pub fn fire(&mut self, now: u64) -> Option<FireOutcome> {
        if self.pause.is_paused() {
            return None;
        }
        let outcome = self
            .publisher
            .request_fire(&mut self.transport, self.local.as_ref(), now);
        if outcome == FireOutcome::OutOfAmmo {
            let publisher = &self.config.publisher;
            self.notices.post(OUT_OF_AMMO_NOTICE, publisher.out_of_ammo_notice_ms, now);
            self.notices.post(RELOAD_NOTICE, publisher.reload_notice_ms, now);
        }
        Some(outcome)
    }

    /// Reload request. Ignored while paused.
    pub fn reload(&mut self, now: u64) -> bool {
        if self.pause.is_paused() {
            return false;
        }
        let sent = self.publisher.request_reload(&mut self.transport, now);
        self.notices.post(RELOAD_NOTICE, self.config.publisher.reload_notice_ms, now);
        sent
    }

    /// Flip the pause state.
    pub fn toggle_pause(&mut self, now: u64) -> PauseState {
        self.pause = self.pause.toggled();
        if self.pause.is_paused() {
            self.on_blur();
            self.notices.post(PAUSE_NOTICE, 0, now);
            info!("Paused");
        } else {
            self.notices.clear();
            info!("Resumed");
        }
        self.pause
    }

    // ===== PERIODIC =====

    /// One simulation tick: advance the local tank and publish movement.
    ///
    /// Does nothing while paused or before the first snapshot seeds the tank.
    pub fn tick(&mut self, now: u64) -> Option<MovementOutcome> {
        if self.pause.is_paused() {
            return None;
        }
        let tank = self.local.as_mut().filter(|t| t.initialized)?;
        tick(tank, self.input.intent(), &self.config.physics);
        Some(self.publisher.publish_movement(&mut self.transport, tank, now))
    }

    /// One display frame. Returns how many notices expired.
    pub fn on_frame(&mut self, now: u64) -> usize {
        if self.pause.is_paused() {
            return 0;
        }
        self.notices.prune(now)
    }

    // ===== NETWORK =====

    /// Handle one inbound transport event.
    #[instrument(skip_all)]
    pub fn on_transport_event(&mut self, event: TransportEvent, now: u64) {
        match event {
            TransportEvent::Connected => {
                self.status = ConnectionStatus::Connected;
                self.publisher.publish_join(&mut self.transport, now);
                info!(player_id = self.publisher.player_id(), "Joined game");
            }
            TransportEvent::Disconnected { reason } => {
                info!("Disconnected: {}", reason);
                self.status = ConnectionStatus::Error(reason);
            }
            TransportEvent::Snapshot(snapshot) => {
                self.apply_snapshot(snapshot);
            }
            TransportEvent::Achievement { achievement, personal } => {
                self.post_achievement(&achievement, personal, now);
            }
        }
    }

    /// Merge a snapshot and keep it for presentation.
    pub fn apply_snapshot(&mut self, snapshot: WorldSnapshot) -> ReconcileOutcome {
        let outcome = reconcile(
            &mut self.local,
            &snapshot,
            self.publisher.player_id(),
            &self.config.physics,
            &self.config.reconcile,
        );
        self.snapshot = Some(snapshot);
        self.last_reconcile = Some(outcome);
        outcome
    }

    fn post_achievement(&mut self, achievement: &Achievement, personal: bool, now: u64) {
        if personal {
            let text = format!(
                "🎯 YOUR ACHIEVEMENT: {} - {} (+{} points earned!)",
                achievement.achievement_name, achievement.description, achievement.bonus_points
            );
            self.notices.post_kind(text, NoticeKind::PersonalAchievement, PERSONAL_ACHIEVEMENT_NOTICE_MS, now);
        } else {
            let text = format!(
                "🏆 {} - {} (+{} points)",
                achievement.achievement_name, achievement.description, achievement.bonus_points
            );
            self.notices.post_kind(text, NoticeKind::Achievement, ACHIEVEMENT_NOTICE_MS, now);
        }
    }

    /// Orderly exit: tell the server we are leaving.
    pub fn shutdown(&mut self, now: u64) -> bool {
        let sent = self.publisher.publish_leave(&mut self.transport, now);
        info!(sent, "Left game");
        sent
    }

    // ===== ACCESSORS =====

    /// Session player id.
    pub fn player_id(&self) -> &str {
        self.publisher.player_id()
    }

    /// Active configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Predicted tank, once seeded.
    pub fn local_tank(&self) -> Option<&LocalTank> {
        self.local.as_ref()
    }

    /// Held controls.
    pub fn input(&self) -> &InputState {
        &self.input
    }

    /// Latest snapshot.
    pub fn snapshot(&self) -> Option<&WorldSnapshot> {
        self.snapshot.as_ref()
    }

    /// Pause state.
    pub fn pause_state(&self) -> PauseState {
        self.pause
    }

    /// Visible notices.
    pub fn notices(&self) -> &NoticeBoard {
        &self.notices
    }

    /// Connection status.
    pub fn connection_status(&self) -> &ConnectionStatus {
        &self.status
    }

    /// Outcome of the most recent snapshot merge.
    pub fn last_reconcile(&self) -> Option<ReconcileOutcome> {
        self.last_reconcile
    }

    /// Outbound transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Outbound transport, mutably.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Tanks to draw this frame.
    pub fn tank_views(&self) -> Vec<TankView> {
        match &self.snapshot {
            Some(snapshot) => view::tank_views(snapshot, self.player_id(), self.local.as_ref()),
            None => Vec::new(),
        }
    }

    /// HUD values.
    pub fn hud(&self) -> HudView {
        view::hud(self.snapshot.as_ref(), self.player_id(), self.local.as_ref())
    }
}

// =============================================================================
// TESTS
// =============================================================================

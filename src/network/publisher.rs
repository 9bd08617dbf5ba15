//! Action Publisher
//!
//! Turns local intent into outbound [`ActionMessage`]s. Movement is
//! rate-limited to the tick period and only published on meaningful
//! change; fire has its own cooldown. Nothing is ever queued: while the
//! transport is down, actions are dropped and the next tick tries again
//! with fresher state.

use tracing::{debug, trace};

use crate::config::PublisherConfig;
use crate::game::state::LocalTank;
use crate::network::protocol::{
    ActionKind, ActionMessage, JoinData, MoveData, NoData, PlayerAction,
};
use crate::network::transport::Transport;

/// What happened to a movement publish attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementOutcome {
    /// A PLAYER_MOVE or PLAYER_STOP went out.
    Sent(ActionKind),
    /// Too soon after the previous movement message.
    RateLimited,
    /// Not moving and the server already knows it.
    Idle,
    /// Transport unavailable; nothing changed.
    Dropped,
}

/// What happened to a fire request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireOutcome {
    /// PLAYER_SHOOT published.
    Sent,
    /// Inside the cooldown window.
    CoolingDown,
    /// No ammunition; a reload was requested instead.
    OutOfAmmo,
    /// Local tank not seeded yet.
    NotReady,
    /// Passed the gates but the transport dropped it.
    Dropped,
}

/// Rate-limited action publisher for one player.
#[derive(Debug)]
pub struct ActionPublisher {
    player_id: String,
    destination: String,
    config: PublisherConfig,
    /// Time of the last published movement message.
    last_move_at: Option<u64>,
    /// Time of the last published fire.
    last_fire_at: Option<u64>,
    /// The last movement message told the server we are moving.
    announced_moving: bool,
}

impl ActionPublisher {
    /// Create a publisher.
    pub fn new(player_id: impl Into<String>, destination: impl Into<String>, config: PublisherConfig) -> Self {
        Self {
            player_id: player_id.into(),
            destination: destination.into(),
            config,
            last_move_at: None,
            last_fire_at: None,
            announced_moving: false,
        }
    }

    /// Publishing player.
    pub fn player_id(&self) -> &str {
        &self.player_id
    }

    /// The server was last told we are moving.
    pub fn announced_moving(&self) -> bool {
        self.announced_moving
    }

    /// Time of the last accepted fire.
    pub fn last_fire_at(&self) -> Option<u64> {
        self.last_fire_at
    }

    /// Build a message stamped with `now`.
    pub fn message(&self, action: PlayerAction, now: u64) -> ActionMessage {
        ActionMessage {
            action,
            player_id: self.player_id.clone(),
            timestamp: now as i64,
        }
    }

    /// Publish one action. Returns whether it left the client.
    fn send<T: Transport>(&self, transport: &mut T, action: PlayerAction, now: u64) -> bool {
        if !transport.is_connected() {
            trace!(kind = action.kind().as_str(), "Dropping action: not connected");
            return false;
        }

        let message = self.message(action, now);
        match transport.publish(&self.destination, &message) {
            Ok(()) => {
                trace!(kind = message.kind().as_str(), "Published action");
                true
            }
            Err(e) => {
                debug!(kind = message.kind().as_str(), "Dropping action: {}", e);
                false
            }
        }
    }

    /// PLAYER_JOIN.
    pub fn publish_join<T: Transport>(&mut self, transport: &mut T, now: u64) -> bool {
        self.send(transport, PlayerAction::Join(JoinData { timestamp: now as i64 }), now)
    }

    /// PLAYER_LEAVE.
    pub fn publish_leave<T: Transport>(&mut self, transport: &mut T, now: u64) -> bool {
        self.send(transport, PlayerAction::Leave(NoData {}), now)
    }

    /// PLAYER_RELOAD.
    pub fn request_reload<T: Transport>(&mut self, transport: &mut T, now: u64) -> bool {
        self.send(transport, PlayerAction::Reload(NoData {}), now)
    }

    /// Publish the current pose if it changed meaningfully.
    ///
    /// Moving: PLAYER_MOVE every eligible tick. Transition to still:
    /// exactly one PLAYER_STOP. Still and already announced: nothing.
    pub fn publish_movement<T: Transport>(
        &mut self,
        transport: &mut T,
        tank: &LocalTank,
        now: u64,
    ) -> MovementOutcome {
        if !transport.is_connected() {
            return MovementOutcome::Dropped;
        }

        if let Some(last) = self.last_move_at {
            if now.saturating_sub(last) < self.config.move_interval_ms {
                return MovementOutcome::RateLimited;
            }
        }

        let data = MoveData {
            x: tank.position.x,
            y: tank.position.y,
            direction: tank.direction(),
            is_moving: tank.is_moving,
            angle: Some(tank.heading),
        };

        let (action, kind) = if tank.is_moving {
            (PlayerAction::Move(data), ActionKind::Move)
        } else if self.announced_moving {
            (PlayerAction::Stop(data), ActionKind::Stop)
        } else {
            return MovementOutcome::Idle;
        };

        if !self.send(transport, action, now) {
            return MovementOutcome::Dropped;
        }

        self.last_move_at = Some(now);
        self.announced_moving = kind == ActionKind::Move;
        if kind == ActionKind::Stop {
            debug!(x = tank.position.x, y = tank.position.y, "Published stop");
        }
        MovementOutcome::Sent(kind)
    }

    /// Handle a fire request.
    ///
    /// Zero ammunition is redirected into a reload request and never
    /// reaches the network as a fire. Otherwise the cooldown window,
    /// measured from the last published fire, gates the shot.
    pub fn request_fire<T: Transport>(
        &mut self,
        transport: &mut T,
        tank: Option<&LocalTank>,
        now: u64,
    ) -> FireOutcome {
        let Some(tank) = tank else {
            return FireOutcome::NotReady;
        };

        if tank.is_out_of_ammo() {
            self.request_reload(transport, now);
            return FireOutcome::OutOfAmmo;
        }

        if let Some(last) = self.last_fire_at {
            if now.saturating_sub(last) < self.config.shoot_cooldown_ms {
                return FireOutcome::CoolingDown;
            }
        }

        if !self.send(transport, PlayerAction::Shoot(NoData {}), now) {
            return FireOutcome::Dropped;
        }

        self.last_fire_at = Some(now);
        FireOutcome::Sent
    }
}

// =============================================================================
// TESTS
// =============================================================================

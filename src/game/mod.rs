//! Game Logic Module
//!
//! Client-side prediction. Pure and synchronous: time comes in as
//! arguments, nothing here touches the network or the clock.
//!
//! ## Module Structure
//!
//! - `input`: Key edges, held-state, per-tick intent, key bindings
//! - `state`: Local predicted tank, pause state
//! - `tick`: Kinematic simulation step
//! - `reconcile`: Merging authoritative snapshots into the prediction
//! - `notice`: Transient and persistent status notices
//! - `view`: Read-only view model for presentation

pub mod input;
pub mod state;
pub mod tick;
pub mod reconcile;
pub mod notice;
pub mod view;

// Re-export key types
pub use input::{Control, HeldKeys, InputEvent, InputState, Intent, KeyBindings};
pub use state::{LocalTank, PauseState};
pub use tick::TickResult;
pub use reconcile::ReconcileOutcome;
pub use notice::{Notice, NoticeBoard, NoticeKind};
pub use view::{HudView, TankView};

//! # Panzers Client
//!
//! Client-side prediction for the Panzers tank arena: the local tank is
//! simulated every tick from keyboard intent, published to the server at
//! a bounded rate, and corrected from authoritative snapshots only when it
//! drifts past a tolerance.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      PANZERS CLIENT                           │
//! ├──────────────────────────────────────────────────────────────┤
//! │  core/            - Geometry primitives                       │
//! │  ├── vec2.rs      - 2D vector                                 │
//! │  └── angle.rs     - Heading normalization, coarse direction   │
//! │                                                               │
//! │  game/            - Prediction (synchronous, no I/O)          │
//! │  ├── input.rs     - Key edges, held-state, bindings           │
//! │  ├── state.rs     - Local tank, pause state                   │
//! │  ├── tick.rs      - Kinematic simulation step                 │
//! │  ├── reconcile.rs - Snapshot merging                          │
//! │  ├── notice.rs    - Status notices                            │
//! │  └── view.rs      - Presentation view model                   │
//! │                                                               │
//! │  network/         - Wire and transport                        │
//! │  ├── protocol.rs  - JSON message types                        │
//! │  ├── transport.rs - Transport trait, inbound events           │
//! │  ├── publisher.rs - Rate-limited action publishing            │
//! │  ├── stomp.rs     - STOMP frame codec                         │
//! │  └── connection.rs- WebSocket task with reconnect             │
//! │                                                               │
//! │  session.rs       - Owner of all client state                 │
//! │  runtime/         - Tick/frame triggers and the event loop    │
//! │  config.rs        - Tunables with defaults                    │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Data Flow
//!
//! Input → simulator (every tick) → publisher (rate-limited) → network.
//! Network snapshot → reconciliation → local tank → view model (every frame).
//!
//! All state transitions happen on one logical thread; the runner's
//! `select!` loop is the only caller of [`ClientSession`].

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod core;
pub mod game;
pub mod network;
pub mod runtime;
pub mod session;

// Re-export commonly used types
pub use config::ClientConfig;
pub use core::{Direction, Vec2};
pub use game::{Control, InputState, LocalTank, PauseState};
pub use network::{Transport, TransportEvent, WorldSnapshot};
pub use session::{ClientSession, ConnectionStatus};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Simulation tick rate (Hz, nominal: one tick per 16 ms)
pub const TICK_RATE: u32 = 60;

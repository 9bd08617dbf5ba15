//! Network Layer
//!
//! Wire types, the transport seam, the rate-limited action publisher and a
//! STOMP-over-WebSocket transport. Only `connection` is async.

pub mod protocol;
pub mod transport;
pub mod publisher;
pub mod stomp;
pub mod connection;

pub use protocol::{
    ActionKind, ActionMessage, PlayerAction, WorldSnapshot, TankRecord, Achievement,
};
pub use transport::{Transport, TransportError, TransportEvent, RecordingTransport};
pub use publisher::{ActionPublisher, FireOutcome, MovementOutcome};
pub use stomp::{StompCommand, StompError, StompFrame};
pub use connection::{Connection, ConnectionError, ConnectionHandle, StompTransport};

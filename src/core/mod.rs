//! Core geometry primitives.
//!
//! Shared by the simulator, the reconciliation engine and the wire protocol.

pub mod vec2;
pub mod angle;

// Re-export core types
pub use vec2::Vec2;
pub use angle::{normalize_angle, Direction};

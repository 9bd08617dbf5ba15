//! Runtime Layer
//!
//! Async drivers around the synchronous session: periodic triggers and the
//! event loop that serializes everything onto one thread of control.

pub mod scheduler;
pub mod runner;

pub use scheduler::PeriodicTrigger;
pub use runner::{ClientInput, Runner, SessionClock};

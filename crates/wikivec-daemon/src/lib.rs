//! Orchestration: pipeline state, scheduling triggers and the
//! long-running daemon loop.

pub mod clock;
pub mod pipeline;
pub mod schedule;

pub use clock::{Clock, SystemClock};
pub use pipeline::Pipeline;
pub use schedule::Trigger;

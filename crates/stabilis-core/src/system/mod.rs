//! # System Module
//!
//! Run lifecycle plumbing shared by the record store and the ensemble:
//! the phase state machine and cooperative cancellation.

mod cancel;
mod phase;

pub use cancel::CancellationToken;
pub use phase::{Phase, PhaseTracker};

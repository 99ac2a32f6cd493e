//! Game state machine, entities, and view projection.

pub mod constants;
pub mod entities;
pub mod session;
pub mod views;

pub use session::{AskOutcome, ClaimOutcome, ClaimResolution, GameError, GameSession, Winner};

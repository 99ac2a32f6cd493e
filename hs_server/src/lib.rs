//! Half-Suit game server.
//!
//! Wires the transport-agnostic [`half_suit`] engine to the outside world:
//! WebSocket connections come in through [`api`], every inbound frame flows
//! through the [`orchestrator`], and the [`registry`] tracks which
//! connection currently speaks for which player.

pub mod api;
pub mod config;
pub mod logging;
pub mod orchestrator;
pub mod registry;

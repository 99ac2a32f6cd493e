//! # Half-Suit
//!
//! A server-authoritative engine for the Literature-style "Half-Suit" card
//! game: two teams, a 48-card deck split into eight six-card half-suits,
//! alternating asks for specific cards and claims of whole half-suits.
//!
//! The library is transport-agnostic. It provides:
//!
//! - [`game`]: the deck model, the `GameSession` aggregate with all of its
//!   transitions, and the per-player redacted view projection.
//! - [`net`]: the JSON wire message types exchanged with clients.
//! - [`store`]: the abstract key-value store that persists one session per
//!   game code, plus an in-memory backend.
//!
//! Partial information is enforced in exactly one place: a session is never
//! sent to a client directly, only through [`game::views::project`], which
//! reduces every other player's hand to a count.

/// Core game logic: deck, session state machine, and view projection.
pub mod game;
pub use game::{
    GameError, GameSession, Winner,
    constants::{self, DECK_SIZE, MAX_PLAYERS, NUM_HALF_SUITS},
    entities::{self, Card, Deck, HalfSuit, PlayerName, TeamId},
    views::{self, PlayerView},
};

/// Client/server wire message types.
pub mod net;
pub use net::messages;

/// Game state persistence.
pub mod store;
pub use store::{GameStore, MemoryStore, StoreError};

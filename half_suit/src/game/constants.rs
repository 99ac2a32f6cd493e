//! Game-wide constants.

use std::time::Duration;

/// Total cards in play: a standard deck minus the four 8s.
pub const DECK_SIZE: usize = 48;

/// Cards per half-suit.
pub const HALF_SUIT_SIZE: usize = 6;

/// Half-suits in the deck. Claiming all of them ends the game.
pub const NUM_HALF_SUITS: usize = 8;

/// Hard cap on players in one session.
pub const MAX_PLAYERS: usize = 12;

/// Minimum players before teams can be assigned.
pub const MIN_PLAYERS: usize = 4;

/// Length of a generated game code.
pub const GAME_CODE_LENGTH: usize = 6;

/// Alphabet for game codes: uppercase alphanumeric, ~2x10^9 combinations
/// at 6 characters.
pub const GAME_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Longest accepted display name.
pub const MAX_NAME_LENGTH: usize = 24;

/// How long a finished session is kept around before deletion.
pub const SESSION_RETENTION: Duration = Duration::from_secs(300);

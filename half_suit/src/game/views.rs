//! Per-player redacted views of a session.
//!
//! [`project`] is the only way session state reaches a client. Everything
//! else (orchestrator, registry) moves already-projected views around, so
//! no code path can leak another player's cards.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::entities::{Card, ClaimedSuits, PlayerName, Teams};
use super::session::GameSession;

/// What one viewer sees of a hand: their own cards in full, everyone
/// else's as a bare count.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(untagged)]
pub enum HandView {
    Cards(Vec<Card>),
    Count(usize),
}

impl HandView {
    pub fn len(&self) -> usize {
        match self {
            Self::Cards(cards) => cards.len(),
            Self::Count(count) => *count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A structural copy of the session with hands redacted for one viewer.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub code: String,
    pub players: Vec<PlayerName>,
    pub teams: Teams,
    pub hands: BTreeMap<PlayerName, HandView>,
    pub current_turn: usize,
    pub current_player: PlayerName,
    pub claimed_suits: ClaimedSuits,
    pub started: bool,
}

/// Derive the redacted snapshot of `session` for `viewer`.
pub fn project(session: &GameSession, viewer: &PlayerName) -> PlayerView {
    let hands = session
        .players
        .iter()
        .map(|player| {
            let hand = session.hands.get(player).cloned().unwrap_or_default();
            let view = if player == viewer {
                HandView::Cards(hand)
            } else {
                HandView::Count(hand.len())
            };
            (player.clone(), view)
        })
        .collect();
    PlayerView {
        code: session.code.clone(),
        players: session.players.clone(),
        teams: session.teams.clone(),
        hands,
        current_turn: session.current_turn,
        current_player: session.current_player().clone(),
        claimed_suits: session.claimed_suits.clone(),
        started: session.started,
    }
}

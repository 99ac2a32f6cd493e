//! JSON message shapes.
//!
//! Everything after the WebSocket upgrade is UTF-8 JSON with an externally
//! tagged `type` field and camelCase keys.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use crate::game::{
    Winner,
    entities::{Card, HalfSuit, PlayerName, Teams},
    views::PlayerView,
};

/// An inbound player action.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    #[serde(rename_all = "camelCase")]
    CreateGame { player_name: PlayerName },
    #[serde(rename_all = "camelCase")]
    JoinGame {
        game_code: String,
        player_name: PlayerName,
    },
    #[serde(rename_all = "camelCase")]
    AssignTeams { game_code: String, random: bool },
    #[serde(rename_all = "camelCase")]
    StartGame { game_code: String },
    #[serde(rename_all = "camelCase")]
    AskForCard {
        game_code: String,
        target: PlayerName,
        card: Card,
    },
    #[serde(rename_all = "camelCase")]
    MakeClaim {
        game_code: String,
        suit: HalfSuit,
        assignments: HashMap<PlayerName, BTreeSet<Card>>,
    },
    #[serde(rename_all = "camelCase")]
    Rejoin {
        game_code: String,
        player_name: PlayerName,
    },
}

impl ClientMessage {
    /// The game code an action targets, if it targets one.
    pub fn game_code(&self) -> Option<&str> {
        match self {
            Self::CreateGame { .. } => None,
            Self::JoinGame { game_code, .. }
            | Self::AssignTeams { game_code, .. }
            | Self::StartGame { game_code }
            | Self::AskForCard { game_code, .. }
            | Self::MakeClaim { game_code, .. }
            | Self::Rejoin { game_code, .. } => Some(game_code),
        }
    }
}

/// An outbound server event. `game_state` fields always carry a
/// viewer-specific [`PlayerView`], never a raw session.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerEvent {
    #[serde(rename_all = "camelCase")]
    GameCreated {
        game_code: String,
        player_name: PlayerName,
    },
    #[serde(rename_all = "camelCase")]
    PlayerJoined {
        player_name: PlayerName,
        players: Vec<PlayerName>,
    },
    TeamsAssigned { teams: Teams },
    #[serde(rename_all = "camelCase")]
    GameStarted { game_state: PlayerView },
    #[serde(rename_all = "camelCase")]
    TurnUpdate { game_state: PlayerView, log: String },
    #[serde(rename_all = "camelCase")]
    GameEnded {
        winner: Winner,
        team1_score: usize,
        team2_score: usize,
    },
    Error { message: String },
}

const KNOWN_TYPES: [&str; 7] = [
    "createGame",
    "joinGame",
    "assignTeams",
    "startGame",
    "askForCard",
    "makeClaim",
    "rejoin",
];

/// Why an inbound text frame could not be turned into a [`ClientMessage`].
/// The display strings are the exact error payloads sent back to clients.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Unknown message type")]
    UnknownType,

    #[error("Invalid message format")]
    Malformed(#[source] serde_json::Error),
}

/// Parse one inbound frame, distinguishing an unrecognized `type` from a
/// message that is malformed for a recognized type.
pub fn parse_client_message(text: &str) -> Result<ClientMessage, ParseError> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(ParseError::Malformed)?;
    let known = value
        .get("type")
        .and_then(serde_json::Value::as_str)
        .is_some_and(|t| KNOWN_TYPES.contains(&t));
    if !known {
        return Err(ParseError::UnknownType);
    }
    serde_json::from_value(value).map_err(ParseError::Malformed)
}

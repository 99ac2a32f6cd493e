//! Core entities: cards, the 48-card deck, half-suits, players, and teams.

use rand::seq::SliceRandom;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{
    collections::BTreeMap,
    fmt,
    str::FromStr,
};

use super::constants;

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Suit {
    Club,
    Spade,
    Diamond,
    Heart,
}

impl Suit {
    pub const ALL: [Self; 4] = [Self::Club, Self::Spade, Self::Diamond, Self::Heart];
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Club => "♣",
            Self::Spade => "♠",
            Self::Diamond => "♦",
            Self::Heart => "♥",
        };
        write!(f, "{repr}")
    }
}

impl FromStr for Suit {
    type Err = CardParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "♣" => Ok(Self::Club),
            "♠" => Ok(Self::Spade),
            "♦" => Ok(Self::Diamond),
            "♥" => Ok(Self::Heart),
            _ => Err(CardParseError),
        }
    }
}

/// Card values. 2-7 form the low half-suits, 9-A (ace high, 14) the high
/// ones. There are no 8s in the deck.
pub type Value = u8;

/// The six low values of a suit.
pub const LOW_VALUES: [Value; 6] = [2, 3, 4, 5, 6, 7];

/// The six high values of a suit.
pub const HIGH_VALUES: [Value; 6] = [9, 10, 11, 12, 13, 14];

/// Error for unparseable card identifiers.
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
#[error("not a valid card")]
pub struct CardParseError;

/// A card is a tuple of a value (2-7, 9-14 with ace=14) and a suit. Its
/// wire identity is the rank followed by the suit symbol, e.g. `9♠`, `A♥`,
/// `10♦`.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Card(pub Value, pub Suit);

impl Card {
    /// The half-suit this card belongs to. Every deck card belongs to
    /// exactly one.
    pub fn half_suit(&self) -> HalfSuit {
        HalfSuit::of(*self)
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let value = match self.0 {
            14 => "A".to_string(),
            13 => "K".to_string(),
            12 => "Q".to_string(),
            11 => "J".to_string(),
            v => v.to_string(),
        };
        write!(f, "{value}{}", self.1)
    }
}

impl FromStr for Card {
    type Err = CardParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let suit_char = s.chars().last().ok_or(CardParseError)?;
        let split = s.len() - suit_char.len_utf8();
        let suit: Suit = s[split..].parse()?;
        let value = match &s[..split] {
            "A" => 14,
            "K" => 13,
            "Q" => 12,
            "J" => 11,
            rank => rank.parse().map_err(|_| CardParseError)?,
        };
        if !LOW_VALUES.contains(&value) && !HIGH_VALUES.contains(&value) {
            return Err(CardParseError);
        }
        Ok(Self(value, suit))
    }
}

impl Serialize for Card {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Card {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// One of the eight fixed six-card groups partitioning the deck; the unit
/// of claiming.
#[derive(
    Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
#[serde(rename_all = "snake_case")]
pub enum HalfSuit {
    LowClubs,
    HighClubs,
    LowSpades,
    HighSpades,
    LowDiamonds,
    HighDiamonds,
    LowHearts,
    HighHearts,
}

impl HalfSuit {
    pub const ALL: [Self; constants::NUM_HALF_SUITS] = [
        Self::LowClubs,
        Self::HighClubs,
        Self::LowSpades,
        Self::HighSpades,
        Self::LowDiamonds,
        Self::HighDiamonds,
        Self::LowHearts,
        Self::HighHearts,
    ];

    /// The half-suit containing the given card.
    pub fn of(card: Card) -> Self {
        let low = LOW_VALUES.contains(&card.0);
        match (card.1, low) {
            (Suit::Club, true) => Self::LowClubs,
            (Suit::Club, false) => Self::HighClubs,
            (Suit::Spade, true) => Self::LowSpades,
            (Suit::Spade, false) => Self::HighSpades,
            (Suit::Diamond, true) => Self::LowDiamonds,
            (Suit::Diamond, false) => Self::HighDiamonds,
            (Suit::Heart, true) => Self::LowHearts,
            (Suit::Heart, false) => Self::HighHearts,
        }
    }

    fn suit(&self) -> Suit {
        match self {
            Self::LowClubs | Self::HighClubs => Suit::Club,
            Self::LowSpades | Self::HighSpades => Suit::Spade,
            Self::LowDiamonds | Self::HighDiamonds => Suit::Diamond,
            Self::LowHearts | Self::HighHearts => Suit::Heart,
        }
    }

    fn is_low(&self) -> bool {
        matches!(
            self,
            Self::LowClubs | Self::LowSpades | Self::LowDiamonds | Self::LowHearts
        )
    }

    /// The six cards of this half-suit.
    pub fn cards(&self) -> [Card; constants::HALF_SUIT_SIZE] {
        let values = if self.is_low() { LOW_VALUES } else { HIGH_VALUES };
        values.map(|v| Card(v, self.suit()))
    }
}

impl fmt::Display for HalfSuit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let half = if self.is_low() { "Low" } else { "High" };
        write!(f, "{half} {}", self.suit())
    }
}

/// The 48-card deck.
#[derive(Debug)]
pub struct Deck;

impl Deck {
    /// All 48 cards in a fixed order, grouped by half-suit.
    pub fn full() -> Vec<Card> {
        HalfSuit::ALL.iter().flat_map(|hs| hs.cards()).collect()
    }

    /// A uniformly shuffled deck.
    pub fn shuffled() -> Vec<Card> {
        let mut cards = Self::full();
        cards.shuffle(&mut rand::rng());
        cards
    }

    /// Mapping from each half-suit to its six cards.
    pub fn half_suits() -> BTreeMap<HalfSuit, [Card; constants::HALF_SUIT_SIZE]> {
        HalfSuit::ALL.iter().map(|hs| (*hs, hs.cards())).collect()
    }
}

/// A player's display name, unique within a session.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct PlayerName(String);

impl PlayerName {
    pub fn new(s: &str) -> Self {
        let mut name: String = s
            .trim()
            .chars()
            .map(|c| if c.is_whitespace() { '_' } else { c })
            .collect();
        name.truncate(constants::MAX_NAME_LENGTH);
        Self(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl<'de> Deserialize<'de> for PlayerName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self::new(&s))
    }
}

impl From<&str> for PlayerName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for PlayerName {
    fn from(value: String) -> Self {
        Self::new(&value)
    }
}

/// One of the two teams.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum TeamId {
    #[serde(rename = "team1")]
    Team1,
    #[serde(rename = "team2")]
    Team2,
}

impl TeamId {
    pub fn opposing(&self) -> Self {
        match self {
            Self::Team1 => Self::Team2,
            Self::Team2 => Self::Team1,
        }
    }
}

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Team1 => "team1",
            Self::Team2 => "team2",
        };
        write!(f, "{repr}")
    }
}

/// Team membership. Empty until assignment; a partition of all joined
/// players afterwards.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Teams {
    pub team1: Vec<PlayerName>,
    pub team2: Vec<PlayerName>,
}

impl Teams {
    pub fn is_assigned(&self) -> bool {
        !self.team1.is_empty() || !self.team2.is_empty()
    }

    /// The team a player belongs to, if teams have been assigned.
    pub fn team_of(&self, player: &PlayerName) -> Option<TeamId> {
        if self.team1.contains(player) {
            Some(TeamId::Team1)
        } else if self.team2.contains(player) {
            Some(TeamId::Team2)
        } else {
            None
        }
    }
}

/// Half-suits claimed so far, per team. The two sets are always disjoint.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct ClaimedSuits {
    pub team1: std::collections::BTreeSet<HalfSuit>,
    pub team2: std::collections::BTreeSet<HalfSuit>,
}

impl ClaimedSuits {
    pub fn contains(&self, suit: HalfSuit) -> bool {
        self.team1.contains(&suit) || self.team2.contains(&suit)
    }

    pub fn award(&mut self, team: TeamId, suit: HalfSuit) {
        match team {
            TeamId::Team1 => self.team1.insert(suit),
            TeamId::Team2 => self.team2.insert(suit),
        };
    }

    pub fn total(&self) -> usize {
        self.team1.len() + self.team2.len()
    }
}

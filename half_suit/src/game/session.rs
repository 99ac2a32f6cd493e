//! The game session aggregate and its transition logic.
//!
//! A session moves through lobby, teams-assigned, in-progress, and ended
//! phases. Every transition is a method on [`GameSession`] returning a
//! `Result`; callers (the orchestrator) serialize access per game code, so
//! the methods themselves are plain synchronous state mutations.

use chrono::{DateTime, Utc};
use rand::{Rng, seq::SliceRandom};
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeSet, HashMap, HashSet},
    fmt,
};
use thiserror::Error;

use super::constants;
use super::entities::{Card, ClaimedSuits, Deck, HalfSuit, PlayerName, TeamId, Teams};

/// Errors from player actions. Each variant maps to one of the protocol's
/// error classes: validation, not-found, conflict, capacity, or
/// invalid-state.
#[derive(Clone, Debug, Deserialize, Eq, Error, PartialEq, Serialize)]
pub enum GameError {
    /// Malformed or semantically invalid request.
    #[error("{0}")]
    Validation(String),
    /// Unknown game code.
    #[error("game not found")]
    GameNotFound,
    /// Unknown player within a known game.
    #[error("player not found")]
    PlayerNotFound,
    /// Duplicate display name at join time.
    #[error("name already taken")]
    NameTaken,
    /// Player limit reached.
    #[error("game is full")]
    CapacityReached,
    /// Action only legal before the deal.
    #[error("game already started")]
    AlreadyStarted,
    /// Action only legal after the deal.
    #[error("game has not started")]
    NotStarted,
    #[error("need 4+ players to assign teams")]
    NotEnoughPlayers,
    #[error("teams have not been assigned")]
    TeamsNotAssigned,
}

/// Generate a fresh game code. Uniqueness is the caller's job: codes are
/// checked against the store and regenerated on collision.
pub fn generate_code() -> String {
    let mut rng = rand::rng();
    (0..constants::GAME_CODE_LENGTH)
        .map(|_| {
            let idx = rng.random_range(0..constants::GAME_CODE_ALPHABET.len());
            constants::GAME_CODE_ALPHABET[idx] as char
        })
        .collect()
}

/// Result of an ask-for-card action.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AskOutcome {
    pub asker: PlayerName,
    pub target: PlayerName,
    pub card: Card,
    /// Whether the target held the card and it changed hands.
    pub transferred: bool,
}

impl AskOutcome {
    pub fn log_line(&self) -> String {
        let answer = if self.transferred { "YES" } else { "NO" };
        format!(
            "{} asked {} for {}: {answer}",
            self.asker, self.target, self.card
        )
    }
}

/// How a claim resolved.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ClaimResolution {
    /// The assigned cards did not cover the half-suit exactly.
    Incomplete,
    /// A card was assigned to a player who does not hold it.
    Incorrect,
    /// The assignments named players from both teams; the half-suit goes to
    /// the claimer's opponents and no cards move.
    AwardedToOpponents { team: TeamId },
    /// Correct claim: the half-suit goes to the claimer's team and the six
    /// cards leave their holders' hands.
    Success { team: TeamId },
}

/// Result of a make-claim action.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClaimOutcome {
    pub claimer: PlayerName,
    pub suit: HalfSuit,
    pub resolution: ClaimResolution,
}

impl ClaimOutcome {
    pub fn log_line(&self) -> String {
        match self.resolution {
            ClaimResolution::Incomplete => {
                format!("{}'s claim of {} was incomplete", self.claimer, self.suit)
            }
            ClaimResolution::Incorrect => {
                format!("{}'s claim of {} was incorrect", self.claimer, self.suit)
            }
            ClaimResolution::AwardedToOpponents { team } => format!(
                "{}'s claim of {} named both teams; {team} takes it",
                self.claimer, self.suit
            ),
            ClaimResolution::Success { team } => {
                format!("{} claimed {} for {team}", self.claimer, self.suit)
            }
        }
    }
}

/// Final standing of a finished game.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Winner {
    #[serde(rename = "team1")]
    Team1,
    #[serde(rename = "team2")]
    Team2,
    Tie,
}

impl fmt::Display for Winner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Team1 => "team1",
            Self::Team2 => "team2",
            Self::Tie => "Tie",
        };
        write!(f, "{repr}")
    }
}

/// One running game, identified by its code. The root aggregate persisted
/// by the game store.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct GameSession {
    pub code: String,
    /// Join order; also turn order once dealt.
    pub players: Vec<PlayerName>,
    pub teams: Teams,
    pub hands: HashMap<PlayerName, Vec<Card>>,
    pub current_turn: usize,
    pub claimed_suits: ClaimedSuits,
    pub started: bool,
    pub host: PlayerName,
    pub created_at: DateTime<Utc>,
}

impl GameSession {
    /// Create a lobby with the host as its only player.
    pub fn new(code: String, host: PlayerName) -> Result<Self, GameError> {
        if host.is_empty() {
            return Err(GameError::Validation(
                "player name cannot be empty".to_string(),
            ));
        }
        Ok(Self {
            code,
            players: vec![host.clone()],
            teams: Teams::default(),
            hands: HashMap::new(),
            current_turn: 0,
            claimed_suits: ClaimedSuits::default(),
            started: false,
            host,
            created_at: Utc::now(),
        })
    }

    pub fn current_player(&self) -> &PlayerName {
        &self.players[self.current_turn]
    }

    pub fn contains_player(&self, name: &PlayerName) -> bool {
        self.players.contains(name)
    }

    /// All eight half-suits claimed; the game is over.
    pub fn is_over(&self) -> bool {
        self.claimed_suits.total() >= constants::NUM_HALF_SUITS
    }

    /// Add a player to the lobby.
    pub fn join(&mut self, name: PlayerName) -> Result<(), GameError> {
        if name.is_empty() {
            return Err(GameError::Validation(
                "player name cannot be empty".to_string(),
            ));
        }
        if self.players.contains(&name) {
            return Err(GameError::NameTaken);
        }
        if self.players.len() >= constants::MAX_PLAYERS {
            return Err(GameError::CapacityReached);
        }
        if self.started {
            return Err(GameError::AlreadyStarted);
        }
        self.players.push(name);
        Ok(())
    }

    /// Split the players into two teams of equal size (or one apart).
    /// Alternates over join order, or over a fresh shuffle when `random`.
    /// May be repeated any number of times before the deal.
    pub fn assign_teams(&mut self, random: bool) -> Result<(), GameError> {
        if self.started {
            return Err(GameError::AlreadyStarted);
        }
        if self.players.len() < constants::MIN_PLAYERS {
            return Err(GameError::NotEnoughPlayers);
        }
        let mut order = self.players.clone();
        if random {
            order.shuffle(&mut rand::rng());
        }
        let mut teams = Teams::default();
        for (i, player) in order.into_iter().enumerate() {
            if i % 2 == 0 {
                teams.team1.push(player);
            } else {
                teams.team2.push(player);
            }
        }
        self.teams = teams;
        Ok(())
    }

    /// Shuffle and deal, locking the roster and setting the turn to the
    /// host. Returns `false` without touching anything if already started;
    /// starting twice is an explicit no-op, not an error.
    ///
    /// Each player receives `48 / player_count` cards in join order. When
    /// the count does not divide 48 the remainder stays out of play.
    pub fn start(&mut self) -> bool {
        if self.started {
            return false;
        }
        let deck = Deck::shuffled();
        let per_player = constants::DECK_SIZE / self.players.len();
        let mut cards = deck.into_iter();
        for player in &self.players {
            let hand: Vec<Card> = cards.by_ref().take(per_player).collect();
            self.hands.insert(player.clone(), hand);
        }
        self.current_turn = 0;
        self.started = true;
        log::info!(
            "game {}: dealt {per_player} cards to each of {} players",
            self.code,
            self.players.len()
        );
        true
    }

    /// The current player asks `target` for a specific card. On a hit the
    /// card moves to the asker and the turn stays with them; on a miss the
    /// turn passes to the target (not the next player in sequence).
    pub fn ask_for_card(
        &mut self,
        target: &PlayerName,
        card: Card,
    ) -> Result<AskOutcome, GameError> {
        if !self.started {
            return Err(GameError::NotStarted);
        }
        let asker = self.current_player().clone();
        let target_idx = self
            .players
            .iter()
            .position(|p| p == target)
            .ok_or(GameError::PlayerNotFound)?;
        if self.hands.get(&asker).is_some_and(|hand| hand.contains(&card)) {
            return Err(GameError::Validation(format!("you already hold {card}")));
        }

        let taken = self.hands.get_mut(target).and_then(|hand| {
            let pos = hand.iter().position(|c| *c == card)?;
            Some(hand.remove(pos))
        });
        let transferred = match taken {
            Some(card) => {
                self.hands.entry(asker.clone()).or_default().push(card);
                true
            }
            None => {
                self.current_turn = target_idx;
                false
            }
        };
        Ok(AskOutcome {
            asker,
            target: target.clone(),
            card,
            transferred,
        })
    }

    /// The current player declares the exact holder of every card in one
    /// half-suit. Resolution order:
    ///
    /// 1. The assigned cards must cover the half-suit exactly, else the
    ///    claim is incomplete.
    /// 2. Every assigned card must sit in the named player's hand, else the
    ///    claim is incorrect.
    /// 3. Every named player must be on one team. Assignments spanning both
    ///    teams award the half-suit to the claimer's opponents and leave
    ///    all hands untouched.
    /// 4. Otherwise the claimer's team takes the half-suit and the six
    ///    cards leave their holders' hands.
    ///
    /// The turn advances to the next player unless the claim ended the
    /// game.
    pub fn make_claim(
        &mut self,
        suit: HalfSuit,
        assignments: &HashMap<PlayerName, BTreeSet<Card>>,
    ) -> Result<ClaimOutcome, GameError> {
        if !self.started {
            return Err(GameError::NotStarted);
        }
        if self.claimed_suits.contains(suit) {
            return Err(GameError::Validation(format!(
                "{suit} has already been claimed"
            )));
        }
        let claimer = self.current_player().clone();
        let claimer_team = self
            .teams
            .team_of(&claimer)
            .ok_or(GameError::TeamsNotAssigned)?;

        let expected: BTreeSet<Card> = suit.cards().into_iter().collect();
        let assigned_total: usize = assignments.values().map(BTreeSet::len).sum();
        let union: BTreeSet<Card> = assignments.values().flatten().copied().collect();

        let all_held = assignments.iter().all(|(player, cards)| {
            self.hands
                .get(player)
                .is_some_and(|hand| cards.iter().all(|card| hand.contains(card)))
        });

        let resolution = if assigned_total != expected.len() || union != expected {
            ClaimResolution::Incomplete
        } else if !all_held {
            ClaimResolution::Incorrect
        } else {
            let named_teams: HashSet<TeamId> = assignments
                .iter()
                .filter(|(_, cards)| !cards.is_empty())
                .filter_map(|(player, _)| self.teams.team_of(player))
                .collect();
            if named_teams.len() > 1 {
                // Cards stay where they are: the awarded team never held them.
                let team = claimer_team.opposing();
                self.claimed_suits.award(team, suit);
                ClaimResolution::AwardedToOpponents { team }
            } else {
                for (player, cards) in assignments {
                    if let Some(hand) = self.hands.get_mut(player) {
                        hand.retain(|card| !cards.contains(card));
                    }
                }
                self.claimed_suits.award(claimer_team, suit);
                ClaimResolution::Success { team: claimer_team }
            }
        };

        if !self.is_over() {
            self.current_turn = (self.current_turn + 1) % self.players.len();
        }
        Ok(ClaimOutcome {
            claimer,
            suit,
            resolution,
        })
    }

    /// Claimed half-suit counts for (team1, team2).
    pub fn scores(&self) -> (usize, usize) {
        (
            self.claimed_suits.team1.len(),
            self.claimed_suits.team2.len(),
        )
    }

    pub fn winner(&self) -> Winner {
        let (team1, team2) = self.scores();
        match team1.cmp(&team2) {
            std::cmp::Ordering::Greater => Winner::Team1,
            std::cmp::Ordering::Less => Winner::Team2,
            std::cmp::Ordering::Equal => Winner::Tie,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entities::Suit;
    use proptest::prelude::*;

    fn lobby(names: &[&str]) -> GameSession {
        let mut session = GameSession::new("ABC123".to_string(), names[0].into()).unwrap();
        for name in &names[1..] {
            session.join((*name).into()).unwrap();
        }
        session
    }

    /// Four players on alternating teams with deterministic hands: the
    /// fixed deck order gives Alice both club half-suits, Bob spades,
    /// Carol diamonds, Dave hearts.
    fn rigged() -> GameSession {
        let mut session = lobby(&["Alice", "Bob", "Carol", "Dave"]);
        session.assign_teams(false).unwrap();
        let deck = Deck::full();
        for (i, player) in session.players.clone().iter().enumerate() {
            session
                .hands
                .insert(player.clone(), deck[i * 12..(i + 1) * 12].to_vec());
        }
        session.current_turn = 0;
        session.started = true;
        session
    }

    fn dealt_cards(session: &GameSession) -> Vec<Card> {
        let mut cards: Vec<Card> = session.hands.values().flatten().copied().collect();
        cards.sort();
        cards
    }

    // === Lobby Tests ===

    #[test]
    fn test_create_requires_host_name() {
        let result = GameSession::new("ABC123".to_string(), "   ".into());
        assert!(matches!(result, Err(GameError::Validation(_))));
    }

    #[test]
    fn test_create_seeds_host_as_first_player() {
        let session = GameSession::new("ABC123".to_string(), "Alice".into()).unwrap();
        assert_eq!(session.players, vec![PlayerName::from("Alice")]);
        assert_eq!(session.host, PlayerName::from("Alice"));
        assert!(!session.started);
    }

    #[test]
    fn test_join_duplicate_name_is_conflict() {
        let mut session = lobby(&["Alice", "Bob"]);
        let before = session.players.clone();
        assert_eq!(session.join("Bob".into()), Err(GameError::NameTaken));
        assert_eq!(session.players, before);
    }

    #[test]
    fn test_join_capacity_limit() {
        let names: Vec<String> = (0..12).map(|i| format!("p{i}")).collect();
        let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let mut session = lobby(&name_refs);
        assert_eq!(
            session.join("straggler".into()),
            Err(GameError::CapacityReached)
        );
    }

    #[test]
    fn test_join_after_start_rejected() {
        let mut session = lobby(&["Alice", "Bob", "Carol", "Dave"]);
        session.start();
        assert_eq!(session.join("Eve".into()), Err(GameError::AlreadyStarted));
    }

    // === Team Assignment Tests ===

    #[test]
    fn test_assign_teams_needs_four_players() {
        let mut session = lobby(&["Alice", "Bob", "Carol"]);
        assert_eq!(
            session.assign_teams(false),
            Err(GameError::NotEnoughPlayers)
        );
    }

    #[test]
    fn test_assign_teams_alternates_join_order() {
        let mut session = lobby(&["Alice", "Bob", "Carol", "Dave"]);
        session.assign_teams(false).unwrap();
        assert_eq!(
            session.teams.team1,
            vec![PlayerName::from("Alice"), PlayerName::from("Carol")]
        );
        assert_eq!(
            session.teams.team2,
            vec![PlayerName::from("Bob"), PlayerName::from("Dave")]
        );
    }

    #[test]
    fn test_assign_teams_random_partitions_evenly() {
        let mut session = lobby(&["Alice", "Bob", "Carol", "Dave", "Eve"]);
        session.assign_teams(true).unwrap();
        assert_eq!(session.teams.team1.len(), 3);
        assert_eq!(session.teams.team2.len(), 2);
        let mut all: Vec<PlayerName> = session
            .teams
            .team1
            .iter()
            .chain(&session.teams.team2)
            .cloned()
            .collect();
        all.sort();
        let mut players = session.players.clone();
        players.sort();
        assert_eq!(all, players);
    }

    #[test]
    fn test_assign_teams_repeatable_before_start() {
        let mut session = lobby(&["Alice", "Bob", "Carol", "Dave"]);
        session.assign_teams(false).unwrap();
        session.assign_teams(true).unwrap();
        assert_eq!(session.teams.team1.len(), 2);
    }

    #[test]
    fn test_assign_teams_after_start_rejected() {
        let mut session = lobby(&["Alice", "Bob", "Carol", "Dave"]);
        session.start();
        assert_eq!(session.assign_teams(false), Err(GameError::AlreadyStarted));
    }

    // === Dealing Tests ===

    #[test]
    fn test_start_deals_evenly() {
        let mut session = lobby(&["Alice", "Bob", "Carol", "Dave"]);
        assert!(session.start());
        assert!(session.started);
        assert_eq!(session.current_turn, 0);
        for player in &session.players {
            assert_eq!(session.hands[player].len(), 12);
        }
        let mut full = Deck::full();
        full.sort();
        assert_eq!(dealt_cards(&session), full);
    }

    #[test]
    fn test_start_is_idempotent() {
        let mut session = lobby(&["Alice", "Bob", "Carol", "Dave"]);
        assert!(session.start());
        let hands = session.hands.clone();
        assert!(!session.start());
        assert_eq!(session.hands, hands);
    }

    #[test]
    fn test_start_uneven_deal_drops_remainder() {
        let mut session = lobby(&["Alice", "Bob", "Carol", "Dave", "Eve"]);
        session.start();
        for player in &session.players {
            assert_eq!(session.hands[player].len(), 9);
        }
        assert_eq!(dealt_cards(&session).len(), 45);
    }

    // === Ask Tests ===

    #[test]
    fn test_ask_hit_keeps_turn() {
        let mut session = rigged();
        let card = Card(2, Suit::Spade); // held by Bob
        let outcome = session.ask_for_card(&"Bob".into(), card).unwrap();
        assert!(outcome.transferred);
        assert_eq!(outcome.log_line(), "Alice asked Bob for 2♠: YES");
        assert_eq!(session.current_turn, 0);
        assert!(session.hands[&PlayerName::from("Alice")].contains(&card));
        assert!(!session.hands[&PlayerName::from("Bob")].contains(&card));
        assert_eq!(session.hands[&PlayerName::from("Alice")].len(), 13);
        assert_eq!(session.hands[&PlayerName::from("Bob")].len(), 11);
    }

    #[test]
    fn test_ask_miss_passes_turn_to_target() {
        let mut session = rigged();
        // Dave holds only hearts.
        let outcome = session
            .ask_for_card(&"Dave".into(), Card(2, Suit::Spade))
            .unwrap();
        assert!(!outcome.transferred);
        assert!(outcome.log_line().ends_with("NO"));
        assert_eq!(session.current_turn, 3);
        assert_eq!(session.current_player(), &PlayerName::from("Dave"));
    }

    #[test]
    fn test_ask_for_held_card_rejected() {
        let mut session = rigged();
        let result = session.ask_for_card(&"Bob".into(), Card(2, Suit::Club));
        assert!(matches!(result, Err(GameError::Validation(_))));
        assert_eq!(session.current_turn, 0);
    }

    #[test]
    fn test_ask_unknown_target() {
        let mut session = rigged();
        let result = session.ask_for_card(&"Mallory".into(), Card(2, Suit::Spade));
        assert_eq!(result, Err(GameError::PlayerNotFound));
    }

    #[test]
    fn test_ask_before_start_rejected() {
        let mut session = lobby(&["Alice", "Bob", "Carol", "Dave"]);
        let result = session.ask_for_card(&"Bob".into(), Card(2, Suit::Spade));
        assert_eq!(result, Err(GameError::NotStarted));
    }

    // === Claim Tests ===

    fn assignments_of(
        entries: &[(&str, &[Card])],
    ) -> HashMap<PlayerName, BTreeSet<Card>> {
        entries
            .iter()
            .map(|(name, cards)| ((*name).into(), cards.iter().copied().collect()))
            .collect()
    }

    #[test]
    fn test_claim_success_removes_cards_and_scores() {
        let mut session = rigged();
        let cards = HalfSuit::LowClubs.cards();
        let outcome = session
            .make_claim(HalfSuit::LowClubs, &assignments_of(&[("Alice", &cards)]))
            .unwrap();
        assert_eq!(
            outcome.resolution,
            ClaimResolution::Success { team: TeamId::Team1 }
        );
        assert!(session.claimed_suits.team1.contains(&HalfSuit::LowClubs));
        assert_eq!(session.hands[&PlayerName::from("Alice")].len(), 6);
        assert_eq!(session.current_turn, 1);
    }

    #[test]
    fn test_claim_incomplete_advances_turn_without_mutation() {
        let mut session = rigged();
        let cards = &HalfSuit::LowClubs.cards()[..5];
        let outcome = session
            .make_claim(HalfSuit::LowClubs, &assignments_of(&[("Alice", cards)]))
            .unwrap();
        assert_eq!(outcome.resolution, ClaimResolution::Incomplete);
        assert_eq!(session.hands[&PlayerName::from("Alice")].len(), 12);
        assert!(!session.claimed_suits.contains(HalfSuit::LowClubs));
        assert_eq!(session.current_turn, 1);
    }

    #[test]
    fn test_claim_incorrect_when_holder_is_wrong() {
        let mut session = rigged();
        // Low spades actually sit with Bob, not Alice.
        let cards = HalfSuit::LowSpades.cards();
        let outcome = session
            .make_claim(HalfSuit::LowSpades, &assignments_of(&[("Alice", &cards)]))
            .unwrap();
        assert_eq!(outcome.resolution, ClaimResolution::Incorrect);
        assert!(!session.claimed_suits.contains(HalfSuit::LowSpades));
        assert_eq!(session.current_turn, 1);
    }

    #[test]
    fn test_claim_spanning_teams_awards_opponents() {
        let mut session = rigged();
        // Move 2♠ from Bob (team2) to Carol (team1) so a physically correct
        // claim must name players from both teams.
        let card = Card(2, Suit::Spade);
        let bob_hand = session.hands.get_mut(&PlayerName::from("Bob")).unwrap();
        bob_hand.retain(|c| *c != card);
        session
            .hands
            .get_mut(&PlayerName::from("Carol"))
            .unwrap()
            .push(card);

        let rest = &HalfSuit::LowSpades.cards()[1..];
        let assignments = assignments_of(&[("Carol", &[card]), ("Bob", rest)]);
        let before = session.hands.clone();

        let outcome = session.make_claim(HalfSuit::LowSpades, &assignments).unwrap();
        assert_eq!(
            outcome.resolution,
            ClaimResolution::AwardedToOpponents { team: TeamId::Team2 }
        );
        assert!(session.claimed_suits.team2.contains(&HalfSuit::LowSpades));
        assert_eq!(session.hands, before);
        assert_eq!(session.current_turn, 1);
    }

    #[test]
    fn test_claim_requires_teams() {
        let mut session = rigged();
        session.teams = Teams::default();
        let cards = HalfSuit::LowClubs.cards();
        let result =
            session.make_claim(HalfSuit::LowClubs, &assignments_of(&[("Alice", &cards)]));
        assert_eq!(result, Err(GameError::TeamsNotAssigned));
    }

    #[test]
    fn test_claim_of_already_claimed_suit_rejected() {
        let mut session = rigged();
        session.claimed_suits.award(TeamId::Team2, HalfSuit::LowClubs);
        let cards = HalfSuit::LowClubs.cards();
        let result =
            session.make_claim(HalfSuit::LowClubs, &assignments_of(&[("Alice", &cards)]));
        assert!(matches!(result, Err(GameError::Validation(_))));
    }

    #[test]
    fn test_claimed_sets_stay_disjoint() {
        let mut session = rigged();
        let clubs = HalfSuit::LowClubs.cards();
        session
            .make_claim(HalfSuit::LowClubs, &assignments_of(&[("Alice", &clubs)]))
            .unwrap();
        let overlap: Vec<_> = session
            .claimed_suits
            .team1
            .intersection(&session.claimed_suits.team2)
            .collect();
        assert!(overlap.is_empty());
    }

    // === End-of-Game Tests ===

    #[test]
    fn test_final_claim_ends_game_without_turn_advance() {
        let mut session = rigged();
        for suit in &HalfSuit::ALL[1..4] {
            session.claimed_suits.award(TeamId::Team1, *suit);
        }
        for suit in &HalfSuit::ALL[4..8] {
            session.claimed_suits.award(TeamId::Team2, *suit);
        }
        let cards = HalfSuit::LowClubs.cards();
        session
            .make_claim(HalfSuit::LowClubs, &assignments_of(&[("Alice", &cards)]))
            .unwrap();
        assert!(session.is_over());
        assert_eq!(session.current_turn, 0);
        assert_eq!(session.scores(), (4, 4));
        assert_eq!(session.winner(), Winner::Tie);
    }

    #[test]
    fn test_winner_with_higher_score() {
        let mut session = rigged();
        for suit in &HalfSuit::ALL[..5] {
            session.claimed_suits.award(TeamId::Team2, *suit);
        }
        for suit in &HalfSuit::ALL[5..8] {
            session.claimed_suits.award(TeamId::Team1, *suit);
        }
        assert_eq!(session.scores(), (3, 5));
        assert_eq!(session.winner(), Winner::Team2);
    }

    // === Scenario Tests ===

    #[test]
    fn test_full_lobby_to_ask_scenario() {
        let mut session = GameSession::new(generate_code(), "Alice".into()).unwrap();
        for name in ["Bob", "Carol", "Dave"] {
            session.join(name.into()).unwrap();
        }
        session.assign_teams(false).unwrap();
        session.start();
        assert_eq!(session.hands[&PlayerName::from("Alice")].len(), 12);

        // Pick a card neither Alice nor Bob holds: a miss must pass the
        // turn to Bob with a "NO" in the log.
        let alice: PlayerName = "Alice".into();
        let bob: PlayerName = "Bob".into();
        let missing = Deck::full()
            .into_iter()
            .find(|c| !session.hands[&alice].contains(c) && !session.hands[&bob].contains(c))
            .unwrap();
        let outcome = session.ask_for_card(&bob, missing).unwrap();
        assert!(!outcome.transferred);
        assert!(outcome.log_line().contains("NO"));
        assert_eq!(session.current_player(), &bob);
    }

    #[test]
    fn test_hand_conservation_through_asks_and_claims() {
        let mut session = rigged();
        session
            .ask_for_card(&"Bob".into(), Card(2, Suit::Spade))
            .unwrap();
        session
            .ask_for_card(&"Carol".into(), Card(9, Suit::Diamond))
            .unwrap();
        let clubs = HalfSuit::LowClubs.cards();
        session
            .make_claim(HalfSuit::LowClubs, &assignments_of(&[("Alice", &clubs)]))
            .unwrap();

        // Dealt cards plus cards removed by successful claims equal the
        // full deck.
        let mut cards = dealt_cards(&session);
        for suit in session
            .claimed_suits
            .team1
            .iter()
            .chain(&session.claimed_suits.team2)
        {
            cards.extend(suit.cards());
        }
        cards.sort();
        let mut full = Deck::full();
        full.sort();
        assert_eq!(cards, full);
    }

    #[test]
    fn test_generate_code_shape() {
        let code = generate_code();
        assert_eq!(code.len(), constants::GAME_CODE_LENGTH);
        assert!(code.bytes().all(|b| constants::GAME_CODE_ALPHABET.contains(&b)));
    }

    proptest! {
        /// No sequence of asks, valid or rejected, ever creates or
        /// destroys a card.
        #[test]
        fn prop_asks_conserve_cards(steps in prop::collection::vec((0usize..4, 0usize..48), 0..40)) {
            let mut session = rigged();
            let deck = Deck::full();
            for (target_idx, card_idx) in steps {
                let target = session.players[target_idx].clone();
                let _ = session.ask_for_card(&target, deck[card_idx]);
            }
            let mut full = deck.clone();
            full.sort();
            prop_assert_eq!(dealt_cards(&session), full);
        }
    }
}

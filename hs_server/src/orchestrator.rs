//! Session orchestrator: the only component that talks to the store, the
//! state machine, and the connection registry.
//!
//! Each inbound frame is parsed, dispatched under a per-game-code lock
//! (read-modify-write against the store never interleaves for one code),
//! persisted, and fanned out as per-player projected events. Store failures
//! are retried once with backoff, then reported to the sender as a
//! transient error. Broadcasts are fire-and-forget: a dead recipient never
//! rolls back or blocks a transition.

use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::{
    sync::{Mutex, OwnedMutexGuard, mpsc},
    task::JoinHandle,
};
use uuid::Uuid;

use half_suit::{
    GameError, GameSession, GameStore, PlayerName,
    game::session,
    messages::{ClientMessage, ServerEvent, parse_client_message},
    views::{PlayerView, project},
};

use crate::registry::ConnectionRegistry;

/// Backoff before the single store retry.
const RETRY_BACKOFF: Duration = Duration::from_millis(100);

/// An action that could not be applied. `Transient` covers store failures
/// that survived the retry; everything else is a game rule violation.
#[derive(Debug)]
enum ActionError {
    Game(GameError),
    Transient,
}

impl From<GameError> for ActionError {
    fn from(err: GameError) -> Self {
        Self::Game(err)
    }
}

impl ActionError {
    fn message(&self) -> String {
        match self {
            Self::Game(err) => err.to_string(),
            Self::Transient => "temporary storage problem, please try again".to_string(),
        }
    }
}

pub struct Orchestrator {
    store: Arc<dyn GameStore>,
    registry: ConnectionRegistry,
    /// How long a finished session lingers before deletion.
    retention: Duration,
    /// One lock per game code, serializing read-modify-write cycles.
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    /// Pending post-game deletion timers, cancellable per code.
    cleanups: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl Orchestrator {
    pub fn new(store: Arc<dyn GameStore>, retention: Duration) -> Self {
        Self {
            store,
            registry: ConnectionRegistry::new(),
            retention,
            locks: Mutex::new(HashMap::new()),
            cleanups: Mutex::new(HashMap::new()),
        }
    }

    /// Track a freshly upgraded connection.
    pub async fn register_connection(&self, conn_id: Uuid, sender: mpsc::Sender<String>) {
        self.registry.register(conn_id, sender).await;
    }

    /// A connection closed. The player stays in their game, offline.
    pub async fn handle_disconnect(&self, conn_id: Uuid) {
        self.registry.unregister(conn_id).await;
    }

    /// Process one inbound text frame. Parse failures and rejected actions
    /// are reported to the sender only; nothing here can take down the
    /// connection or touch other sessions.
    pub async fn handle_text(self: &Arc<Self>, conn_id: Uuid, text: &str) {
        match parse_client_message(text) {
            Ok(msg) => {
                if let Err(err) = self.dispatch(conn_id, msg).await {
                    self.send_error(conn_id, err.message()).await;
                }
            }
            Err(err) => {
                tracing::debug!(%conn_id, %err, "rejected inbound frame");
                self.send_error(conn_id, err.to_string()).await;
            }
        }
    }

    async fn dispatch(self: &Arc<Self>, conn_id: Uuid, msg: ClientMessage) -> Result<(), ActionError> {
        match msg {
            ClientMessage::CreateGame { player_name } => {
                self.create_game(conn_id, player_name).await
            }
            ClientMessage::JoinGame {
                game_code,
                player_name,
            } => self.join_game(conn_id, game_code, player_name).await,
            ClientMessage::AssignTeams { game_code, random } => {
                self.assign_teams(game_code, random).await
            }
            ClientMessage::StartGame { game_code } => self.start_game(game_code).await,
            ClientMessage::AskForCard {
                game_code,
                target,
                card,
            } => self.ask_for_card(game_code, target, card).await,
            ClientMessage::MakeClaim {
                game_code,
                suit,
                assignments,
            } => self.make_claim(game_code, suit, assignments).await,
            ClientMessage::Rejoin {
                game_code,
                player_name,
            } => self.rejoin(conn_id, game_code, player_name).await,
        }
    }

    async fn create_game(
        &self,
        conn_id: Uuid,
        player_name: PlayerName,
    ) -> Result<(), ActionError> {
        // Collision-check generated codes against the store.
        let mut code = session::generate_code();
        while self.load(&code).await?.is_some() {
            code = session::generate_code();
        }
        let new_session = GameSession::new(code.clone(), player_name.clone())?;
        self.save(new_session).await?;
        self.registry.bind(conn_id, &code, &player_name).await;
        tracing::info!(%code, host = %player_name, "game created");
        self.send_event_to_connection(
            conn_id,
            &ServerEvent::GameCreated {
                game_code: code,
                player_name,
            },
        )
        .await;
        Ok(())
    }

    async fn join_game(
        &self,
        conn_id: Uuid,
        game_code: String,
        player_name: PlayerName,
    ) -> Result<(), ActionError> {
        let Some((_guard, mut game)) = self.lock_and_load(&game_code).await? else {
            return Err(GameError::GameNotFound.into());
        };
        game.join(player_name.clone())?;
        let players = game.players.clone();
        self.save(game).await?;

        self.registry.bind(conn_id, &game_code, &player_name).await;
        tracing::info!(code = %game_code, player = %player_name, "player joined");
        self.broadcast_event(
            &game_code,
            &ServerEvent::PlayerJoined {
                player_name,
                players,
            },
        )
        .await;
        Ok(())
    }

    async fn assign_teams(&self, game_code: String, random: bool) -> Result<(), ActionError> {
        let Some((_guard, mut game)) = self.lock_and_load(&game_code).await? else {
            return Err(GameError::GameNotFound.into());
        };
        game.assign_teams(random)?;
        let teams = game.teams.clone();
        self.save(game).await?;

        self.broadcast_event(&game_code, &ServerEvent::TeamsAssigned { teams })
            .await;
        Ok(())
    }

    async fn start_game(&self, game_code: String) -> Result<(), ActionError> {
        // Starting an absent or already started game is a silent no-op.
        let Some((_guard, mut game)) = self.lock_and_load(&game_code).await? else {
            tracing::debug!(code = %game_code, "startGame for unknown code ignored");
            return Ok(());
        };
        if !game.start() {
            return Ok(());
        }
        let snapshot = game.clone();
        self.save(game).await?;

        self.broadcast_views(&snapshot, |game_state| ServerEvent::GameStarted {
            game_state,
        })
        .await;
        Ok(())
    }

    async fn ask_for_card(
        &self,
        game_code: String,
        target: PlayerName,
        card: half_suit::Card,
    ) -> Result<(), ActionError> {
        let Some((_guard, mut game)) = self.lock_and_load(&game_code).await? else {
            return Err(GameError::GameNotFound.into());
        };
        let outcome = game.ask_for_card(&target, card)?;
        let snapshot = game.clone();
        self.save(game).await?;

        let log = outcome.log_line();
        tracing::info!(code = %game_code, "{log}");
        self.broadcast_views(&snapshot, |game_state| ServerEvent::TurnUpdate {
            game_state,
            log: log.clone(),
        })
        .await;
        Ok(())
    }

    async fn make_claim(
        self: &Arc<Self>,
        game_code: String,
        suit: half_suit::HalfSuit,
        assignments: HashMap<PlayerName, std::collections::BTreeSet<half_suit::Card>>,
    ) -> Result<(), ActionError> {
        let Some((_guard, mut game)) = self.lock_and_load(&game_code).await? else {
            return Err(GameError::GameNotFound.into());
        };
        let outcome = game.make_claim(suit, &assignments)?;
        let snapshot = game.clone();
        self.save(game).await?;

        let log = outcome.log_line();
        tracing::info!(code = %game_code, "{log}");
        if snapshot.is_over() {
            self.end_game(&snapshot).await;
        } else {
            self.broadcast_views(&snapshot, |game_state| ServerEvent::TurnUpdate {
                game_state,
                log: log.clone(),
            })
            .await;
        }
        Ok(())
    }

    /// Announce the final score and schedule deletion of the session after
    /// the retention window.
    async fn end_game(self: &Arc<Self>, game: &GameSession) {
        let (team1_score, team2_score) = game.scores();
        let winner = game.winner();
        tracing::info!(
            code = %game.code,
            %winner,
            team1_score,
            team2_score,
            "game ended"
        );
        self.broadcast_event(
            &game.code,
            &ServerEvent::GameEnded {
                winner,
                team1_score,
                team2_score,
            },
        )
        .await;
        self.schedule_cleanup(&game.code).await;
    }

    async fn rejoin(
        &self,
        conn_id: Uuid,
        game_code: String,
        player_name: PlayerName,
    ) -> Result<(), ActionError> {
        let Some((_guard, game)) = self.lock_and_load(&game_code).await? else {
            return Err(GameError::GameNotFound.into());
        };
        if !game.contains_player(&player_name) {
            return Err(GameError::PlayerNotFound.into());
        }

        // Re-bind the identity to this connection and restore the view.
        self.registry.bind(conn_id, &game_code, &player_name).await;
        tracing::info!(code = %game_code, player = %player_name, "player rejoined");
        let event = if game.started {
            ServerEvent::GameStarted {
                game_state: project(&game, &player_name),
            }
        } else {
            ServerEvent::PlayerJoined {
                player_name,
                players: game.players.clone(),
            }
        };
        self.send_event_to_connection(conn_id, &event).await;
        Ok(())
    }

    /// Arm (or re-arm) the deferred deletion timer for a finished game.
    /// The timer holds no locks while it sleeps.
    pub async fn schedule_cleanup(self: &Arc<Self>, code: &str) {
        let orchestrator = Arc::clone(self);
        let task_code = code.to_string();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(orchestrator.retention).await;
            let lock = orchestrator.code_lock(&task_code).await;
            let guard = lock.lock().await;
            if let Err(err) = orchestrator.store.delete(&task_code).await {
                tracing::warn!(code = %task_code, %err, "failed to delete finished game");
            }
            drop(guard);
            orchestrator.registry.drop_game(&task_code).await;
            orchestrator.locks.lock().await.remove(&task_code);
            orchestrator.cleanups.lock().await.remove(&task_code);
        });
        if let Some(previous) = self.cleanups.lock().await.insert(code.to_string(), handle) {
            previous.abort();
        }
    }

    /// Cancel a pending deletion timer. Returns whether one was armed.
    pub async fn cancel_cleanup(&self, code: &str) -> bool {
        match self.cleanups.lock().await.remove(code) {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    async fn code_lock(&self, code: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(code.to_string()).or_default().clone()
    }

    /// Take the per-code lock and load its session. When the code has no
    /// session the lock entry is discarded again, so spam with unknown
    /// codes cannot grow the lock map.
    async fn lock_and_load(
        &self,
        code: &str,
    ) -> Result<Option<(OwnedMutexGuard<()>, GameSession)>, ActionError> {
        let lock = self.code_lock(code).await;
        let guard = lock.clone().lock_owned().await;
        match self.load(code).await? {
            Some(game) => Ok(Some((guard, game))),
            None => {
                drop(guard);
                self.discard_lock(code, &lock).await;
                Ok(None)
            }
        }
    }

    /// Remove a lock entry nobody else is waiting on. The strong count is
    /// the map's reference plus the caller's; anything above that is a
    /// waiter and keeps the entry alive.
    async fn discard_lock(&self, code: &str, lock: &Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().await;
        if let Some(existing) = locks.get(code)
            && Arc::ptr_eq(existing, lock)
            && Arc::strong_count(existing) <= 2
        {
            locks.remove(code);
        }
    }

    async fn load(&self, code: &str) -> Result<Option<GameSession>, ActionError> {
        match self.store.get(code).await {
            Ok(game) => Ok(game),
            Err(err) => {
                tracing::warn!(code, %err, "store get failed, retrying");
                tokio::time::sleep(RETRY_BACKOFF).await;
                self.store.get(code).await.map_err(|err| {
                    tracing::error!(code, %err, "store get failed after retry");
                    ActionError::Transient
                })
            }
        }
    }

    async fn save(&self, game: GameSession) -> Result<(), ActionError> {
        match self.store.put(game.clone()).await {
            Ok(()) => Ok(()),
            Err(err) => {
                tracing::warn!(code = %game.code, %err, "store put failed, retrying");
                tokio::time::sleep(RETRY_BACKOFF).await;
                let code = game.code.clone();
                self.store.put(game).await.map_err(|err| {
                    tracing::error!(%code, %err, "store put failed after retry");
                    ActionError::Transient
                })
            }
        }
    }

    async fn send_error(&self, conn_id: Uuid, message: String) {
        self.send_event_to_connection(conn_id, &ServerEvent::Error { message })
            .await;
    }

    async fn send_event_to_connection(&self, conn_id: Uuid, event: &ServerEvent) {
        match serde_json::to_string(event) {
            Ok(json) => self.registry.send_to_connection(conn_id, json).await,
            Err(err) => tracing::error!(%err, "failed to serialize event"),
        }
    }

    async fn broadcast_event(&self, code: &str, event: &ServerEvent) {
        match serde_json::to_string(event) {
            Ok(json) => self.registry.broadcast(code, json).await,
            Err(err) => tracing::error!(%err, "failed to serialize event"),
        }
    }

    /// Broadcast an event built from each recipient's own projection.
    async fn broadcast_views<F>(&self, game: &GameSession, event_for: F)
    where
        F: Fn(PlayerView) -> ServerEvent,
    {
        self.registry
            .broadcast_with(&game.code, |player| {
                let event = event_for(project(game, player));
                match serde_json::to_string(&event) {
                    Ok(json) => Some(json),
                    Err(err) => {
                        tracing::error!(%err, "failed to serialize view");
                        None
                    }
                }
            })
            .await;
    }
}

//! Connection registry: the one component aware of live transports.
//!
//! Maps connection ids to outbound message channels and `(game code,
//! player)` identities to connections. Rebinding the same identity replaces
//! the previous connection, which is what makes rejoin work without
//! duplicate delivery. Delivery is fire-and-forget: a send to a closed or
//! missing channel is logged and dropped, never an error.

use std::collections::HashMap;
use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use half_suit::PlayerName;

#[derive(Default)]
struct Inner {
    /// Outbound channel per live connection.
    senders: HashMap<Uuid, mpsc::Sender<String>>,
    /// (game code, player) -> connection currently speaking for them.
    bindings: HashMap<(String, PlayerName), Uuid>,
    /// Reverse of `bindings`, for cleanup on close.
    identities: HashMap<Uuid, (String, PlayerName)>,
}

pub struct ConnectionRegistry {
    inner: RwLock<Inner>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Track a freshly upgraded connection. It has no identity until a
    /// create/join/rejoin binds one.
    pub async fn register(&self, conn_id: Uuid, sender: mpsc::Sender<String>) {
        let mut inner = self.inner.write().await;
        inner.senders.insert(conn_id, sender);
        tracing::debug!(%conn_id, "connection registered");
    }

    /// Bind a connection to a player identity within a game. A later bind
    /// for the same identity replaces the earlier connection, and a
    /// connection speaks for at most one identity at a time.
    pub async fn bind(&self, conn_id: Uuid, game_code: &str, player: &PlayerName) {
        let key = (game_code.to_string(), player.clone());
        let mut inner = self.inner.write().await;
        if let Some(previous) = inner.bindings.insert(key.clone(), conn_id)
            && previous != conn_id
        {
            inner.identities.remove(&previous);
        }
        // Retire the connection's old binding so the socket is never
        // reachable under two identities at once.
        if let Some(old_key) = inner.identities.insert(conn_id, key.clone())
            && old_key != key
            && inner.bindings.get(&old_key) == Some(&conn_id)
        {
            inner.bindings.remove(&old_key);
        }
        tracing::debug!(%conn_id, game_code, player = %player, "connection bound");
    }

    /// Remove a closed connection. The player stays in the game state and
    /// keeps their turn and hand; they are simply offline until a rejoin.
    pub async fn unregister(&self, conn_id: Uuid) {
        let mut inner = self.inner.write().await;
        inner.senders.remove(&conn_id);
        if let Some(key) = inner.identities.remove(&conn_id) {
            if inner.bindings.get(&key) == Some(&conn_id) {
                inner.bindings.remove(&key);
                tracing::debug!(%conn_id, game_code = %key.0, player = %key.1, "player offline");
            }
        }
    }

    /// Deliver to one connection by id. Used for replies to a sender that
    /// may not have a bound identity yet.
    pub async fn send_to_connection(&self, conn_id: Uuid, payload: String) {
        let sender = self.inner.read().await.senders.get(&conn_id).cloned();
        if let Some(sender) = sender
            && sender.send(payload).await.is_err()
        {
            tracing::debug!(%conn_id, "dropped message for closed connection");
        }
    }

    /// Deliver to whoever currently speaks for a player; silently dropped
    /// when the player is offline.
    pub async fn send_to(&self, game_code: &str, player: &PlayerName, payload: String) {
        let conn_id = {
            let inner = self.inner.read().await;
            inner
                .bindings
                .get(&(game_code.to_string(), player.clone()))
                .copied()
        };
        match conn_id {
            Some(conn_id) => self.send_to_connection(conn_id, payload).await,
            None => tracing::debug!(game_code, player = %player, "player offline, message dropped"),
        }
    }

    /// Deliver a per-player payload to every connected player of a game.
    /// The payload function returns `None` to skip a player.
    pub async fn broadcast_with<F>(&self, game_code: &str, payload_for: F)
    where
        F: Fn(&PlayerName) -> Option<String>,
    {
        let recipients: Vec<(PlayerName, mpsc::Sender<String>)> = {
            let inner = self.inner.read().await;
            inner
                .bindings
                .iter()
                .filter(|((code, _), _)| code == game_code)
                .filter_map(|((_, player), conn_id)| {
                    inner
                        .senders
                        .get(conn_id)
                        .map(|sender| (player.clone(), sender.clone()))
                })
                .collect()
        };
        for (player, sender) in recipients {
            if let Some(payload) = payload_for(&player)
                && sender.send(payload).await.is_err()
            {
                tracing::debug!(game_code, player = %player, "dropped broadcast for closed connection");
            }
        }
    }

    /// Deliver one identical payload to every connected player of a game.
    pub async fn broadcast(&self, game_code: &str, payload: String) {
        self.broadcast_with(game_code, |_| Some(payload.clone())).await;
    }

    /// Forget all bindings for a deleted game. The connections themselves
    /// stay registered: a socket outlives its game and may bind into a new
    /// one; its sender entry is only removed by `unregister` when the
    /// socket closes.
    pub async fn drop_game(&self, game_code: &str) {
        let mut inner = self.inner.write().await;
        let stale: Vec<(String, PlayerName)> = inner
            .bindings
            .keys()
            .filter(|(code, _)| code == game_code)
            .cloned()
            .collect();
        for key in stale {
            if let Some(conn_id) = inner.bindings.remove(&key) {
                inner.identities.remove(&conn_id);
            }
        }
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    async fn connected(registry: &ConnectionRegistry) -> (Uuid, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(8);
        let conn_id = Uuid::new_v4();
        registry.register(conn_id, tx).await;
        (conn_id, rx)
    }

    #[tokio::test]
    async fn test_send_to_bound_player() {
        let registry = ConnectionRegistry::new();
        let (conn, mut rx) = connected(&registry).await;
        registry.bind(conn, "ABC123", &"Alice".into()).await;

        registry.send_to("ABC123", &"Alice".into(), "hello".into()).await;
        assert_eq!(rx.recv().await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_send_to_offline_player_is_silent() {
        let registry = ConnectionRegistry::new();
        registry.send_to("ABC123", &"Ghost".into(), "hello".into()).await;
    }

    #[tokio::test]
    async fn test_rebinding_a_connection_retires_its_old_identity() {
        let registry = ConnectionRegistry::new();
        let (conn, mut rx) = connected(&registry).await;
        registry.bind(conn, "ABC123", &"Alice".into()).await;
        registry.bind(conn, "ABC123", &"Bob".into()).await;

        // One socket, one identity: a per-player broadcast delivers the
        // Bob payload only, never a second one for the stale Alice key.
        registry
            .broadcast_with("ABC123", |player| Some(format!("view for {player}")))
            .await;
        assert_eq!(rx.recv().await.unwrap(), "view for Bob");
        assert!(rx.try_recv().is_err());

        registry.unregister(conn).await;
        registry.send_to("ABC123", &"Alice".into(), "hello".into()).await;
        registry.send_to("ABC123", &"Bob".into(), "hello".into()).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_rebind_replaces_previous_connection() {
        let registry = ConnectionRegistry::new();
        let (old_conn, mut old_rx) = connected(&registry).await;
        let (new_conn, mut new_rx) = connected(&registry).await;
        registry.bind(old_conn, "ABC123", &"Alice".into()).await;
        registry.bind(new_conn, "ABC123", &"Alice".into()).await;

        registry.send_to("ABC123", &"Alice".into(), "hello".into()).await;
        assert_eq!(new_rx.recv().await.unwrap(), "hello");
        assert!(old_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unregister_marks_offline_without_affecting_others() {
        let registry = ConnectionRegistry::new();
        let (alice, mut alice_rx) = connected(&registry).await;
        let (bob, mut bob_rx) = connected(&registry).await;
        registry.bind(alice, "ABC123", &"Alice".into()).await;
        registry.bind(bob, "ABC123", &"Bob".into()).await;

        registry.unregister(alice).await;
        registry.broadcast("ABC123", "update".into()).await;

        assert_eq!(bob_rx.recv().await.unwrap(), "update");
        assert!(alice_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_broadcast_with_per_player_payloads() {
        let registry = ConnectionRegistry::new();
        let (alice, mut alice_rx) = connected(&registry).await;
        let (bob, mut bob_rx) = connected(&registry).await;
        registry.bind(alice, "ABC123", &"Alice".into()).await;
        registry.bind(bob, "ABC123", &"Bob".into()).await;

        registry
            .broadcast_with("ABC123", |player| Some(format!("for {player}")))
            .await;

        assert_eq!(alice_rx.recv().await.unwrap(), "for Alice");
        assert_eq!(bob_rx.recv().await.unwrap(), "for Bob");
    }

    #[tokio::test]
    async fn test_broadcast_scoped_to_game() {
        let registry = ConnectionRegistry::new();
        let (alice, mut alice_rx) = connected(&registry).await;
        let (eve, mut eve_rx) = connected(&registry).await;
        registry.bind(alice, "ABC123", &"Alice".into()).await;
        registry.bind(eve, "ZZZ999", &"Eve".into()).await;

        registry.broadcast("ABC123", "update".into()).await;

        assert_eq!(alice_rx.recv().await.unwrap(), "update");
        assert!(eve_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_drop_game_clears_bindings() {
        let registry = ConnectionRegistry::new();
        let (alice, mut alice_rx) = connected(&registry).await;
        registry.bind(alice, "ABC123", &"Alice".into()).await;

        registry.drop_game("ABC123").await;
        registry.send_to("ABC123", &"Alice".into(), "hello".into()).await;
        assert!(alice_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_connection_outlives_its_dropped_game() {
        let registry = ConnectionRegistry::new();
        let (conn, mut rx) = connected(&registry).await;
        registry.bind(conn, "ABC123", &"Alice".into()).await;
        registry.drop_game("ABC123").await;

        // The sender entry survives drop_game, so the same socket can
        // bind into a fresh game.
        registry.bind(conn, "XYZ999", &"Alice".into()).await;
        registry.send_to("XYZ999", &"Alice".into(), "hello".into()).await;
        assert_eq!(rx.recv().await.unwrap(), "hello");
    }
}

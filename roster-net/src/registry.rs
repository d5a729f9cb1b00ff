//! Live connection registry
//!
//! serverId → connection handle for cross-task consumers. Each handle owns
//! an outbound frame channel into its session's writer; the maps are only
//! mutated by the session that owns the connection.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::{mpsc, RwLock};

use crate::message::ServerFrame;

/// Handle to one live game-server connection
#[derive(Clone)]
pub struct ConnectionHandle {
    pub server_id: String,
    pub sender: mpsc::Sender<ServerFrame>,
    pub connected_at: DateTime<Utc>,
}

/// Snapshot-consistent map of live connections
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<String, ConnectionHandle>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, server_id: &str, sender: mpsc::Sender<ServerFrame>) {
        let handle = ConnectionHandle {
            server_id: server_id.to_string(),
            sender,
            connected_at: Utc::now(),
        };
        self.connections
            .write()
            .await
            .insert(server_id.to_string(), handle);
    }

    pub async fn remove(&self, server_id: &str) {
        self.connections.write().await.remove(server_id);
    }

    pub async fn get(&self, server_id: &str) -> Option<ConnectionHandle> {
        self.connections.read().await.get(server_id).cloned()
    }

    pub async fn server_ids(&self) -> Vec<String> {
        self.connections.read().await.keys().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.connections.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.connections.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_and_remove() {
        let registry = ConnectionRegistry::new();
        let (tx, _rx) = mpsc::channel(4);

        registry.register("serverA", tx).await;
        assert_eq!(registry.len().await, 1);
        assert!(registry.get("serverA").await.is_some());
        assert_eq!(registry.server_ids().await, vec!["serverA".to_string()]);

        registry.remove("serverA").await;
        assert!(registry.is_empty().await);
        assert!(registry.get("serverA").await.is_none());
    }

    #[tokio::test]
    async fn test_reregister_replaces_handle() {
        let registry = ConnectionRegistry::new();
        let (tx1, _rx1) = mpsc::channel(4);
        let (tx2, rx2) = mpsc::channel(4);
        drop(rx2);

        registry.register("serverA", tx1).await;
        registry.register("serverA", tx2).await;
        assert_eq!(registry.len().await, 1);

        // The stored handle is the most recent one (its receiver is gone)
        let handle = registry.get("serverA").await.unwrap();
        assert!(handle.sender.is_closed());
    }
}

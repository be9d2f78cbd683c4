//! Streaming fabric for progress messages and inventory snapshots.
//!
//! Two consumer tasks run alongside the recipe driver: one prints progress
//! messages, one persists inventory snapshots. Inventory sends are
//! acknowledged only after the snapshot has been flushed to disk, so a step
//! never starts before the previous step's snapshot is durable. Shutdown is
//! a barrier: the driver drops its senders, the consumers drain and exit,
//! and the caller awaits both join handles.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::error;

use crate::inventory::write_inventory;

/// Sending half of the inventory stream.
///
/// Each [`send`](InventorySink::send) resolves only once the consumer has
/// written the snapshot to the inventory file, which is what makes a crash
/// at any point leave the file describing exactly what exists remotely.
#[derive(Clone)]
pub struct InventorySink<I> {
    tx: mpsc::Sender<(I, oneshot::Sender<()>)>,
}

impl<I: Serialize + Send + 'static> InventorySink<I> {
    /// Send a snapshot and wait for it to reach disk.
    pub async fn send(&self, inventory: I) -> Result<()> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.tx
            .send((inventory, ack_tx))
            .await
            .map_err(|_| anyhow!("inventory writer has stopped"))?;
        ack_rx
            .await
            .context("inventory writer stopped before flushing snapshot")?;
        Ok(())
    }
}

/// Spawn the inventory consumer task.
///
/// The task serialises each snapshot as indented JSON and atomically
/// replaces `path`, then acknowledges the sender. A failed write is
/// reported but does not stop the stream, matching the message-stream
/// behavior of surfacing problems without aborting the recipe.
pub fn spawn_inventory_writer<I>(path: PathBuf) -> (InventorySink<I>, JoinHandle<()>)
where
    I: Serialize + Send + 'static,
{
    let (tx, mut rx) = mpsc::channel::<(I, oneshot::Sender<()>)>(1);
    let handle = tokio::spawn(async move {
        while let Some((inventory, ack)) = rx.recv().await {
            if let Err(e) = write_inventory(&path, &inventory).await {
                error!(path = %path.display(), error = %e, "failed to write inventory file");
            }
            let _ = ack.send(());
        }
    });
    (InventorySink { tx }, handle)
}

/// Spawn the message consumer task, printing each progress line to stdout.
pub fn spawn_message_printer() -> (mpsc::Sender<String>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<String>(1);
    let handle = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            println!("{message}");
        }
    });
    (tx, handle)
}

/// Load an inventory file for a resume or a delete.
pub async fn load_inventory_file<I>(path: &Path) -> Result<I>
where
    I: serde::de::DeserializeOwned,
{
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read inventory file {}", path.display()))?;
    serde_json::from_slice(&bytes)
        .with_context(|| format!("failed to unmarshal inventory file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Snapshot {
        region: String,
        ids: Vec<String>,
    }

    #[tokio::test]
    async fn snapshot_is_on_disk_when_send_returns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inventory.json");
        let (sink, handle) = spawn_inventory_writer::<Snapshot>(path.clone());

        let snapshot = Snapshot {
            region: "us-east-2".to_string(),
            ids: vec!["vpc-123".to_string()],
        };
        sink.send(snapshot.clone()).await.unwrap();

        // send has returned, so the file must already reflect the snapshot
        let on_disk: Snapshot = load_inventory_file(&path).await.unwrap();
        assert_eq!(on_disk, snapshot);

        drop(sink);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn latest_snapshot_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inventory.json");
        let (sink, handle) = spawn_inventory_writer::<Snapshot>(path.clone());

        for n in 0..5 {
            sink.send(Snapshot {
                region: "us-east-2".to_string(),
                ids: vec![format!("vpc-{n}")],
            })
            .await
            .unwrap();
        }
        drop(sink);
        handle.await.unwrap();

        let on_disk: Snapshot = load_inventory_file(&path).await.unwrap();
        assert_eq!(on_disk.ids, vec!["vpc-4".to_string()]);
    }

    #[tokio::test]
    async fn writer_exits_after_senders_drop() {
        let dir = tempfile::tempdir().unwrap();
        let (sink, handle) = spawn_inventory_writer::<Snapshot>(dir.path().join("inv.json"));
        drop(sink);
        handle.await.unwrap();
    }
}

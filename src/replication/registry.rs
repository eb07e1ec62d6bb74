//! Leader-side replica registry.
//!
//! Owns the writer half of every promoted replica connection, fans out write
//! commands in one total order, and tracks per-replica acknowledged offsets
//! for `WAIT`. Propagation, the offset update and `GETACK` broadcasts all
//! happen under the registry lock, so `master_offset` always equals the byte
//! length of the propagated stream every replica has been offered.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::resp::RespValue;

#[derive(Debug)]
struct Replica {
    address: String,
    writer: Arc<Mutex<OwnedWriteHalf>>,
    /// Highest offset this replica has acknowledged; never decreases.
    ack_offset: u64,
}

#[derive(Debug, Default)]
struct RegistryState {
    replicas: Vec<Replica>,
    master_offset: u64,
}

impl RegistryState {
    fn count_synced(&self, target_offset: u64) -> usize {
        self.replicas
            .iter()
            .filter(|replica| replica.ack_offset >= target_offset)
            .count()
    }

    /// Writes `bytes` to every replica, dropping the ones whose connection
    /// fails. Failures never surface to the client that caused the write.
    async fn broadcast(&mut self, bytes: &[u8]) {
        let mut failed: Vec<String> = Vec::new();

        for replica in &self.replicas {
            let mut writer = replica.writer.lock().await;
            let result = async {
                writer.write_all(bytes).await?;
                writer.flush().await
            }
            .await;

            if let Err(error) = result {
                warn!(replica = %replica.address, %error, "dropping replica after failed write");
                failed.push(replica.address.clone());
            }
        }

        self.replicas
            .retain(|replica| !failed.contains(&replica.address));
    }
}

#[derive(Debug, Default)]
pub struct ReplicaRegistry {
    state: Mutex<RegistryState>,
    ack_received: Notify,
}

impl ReplicaRegistry {
    pub fn new() -> Self {
        ReplicaRegistry {
            state: Mutex::new(RegistryState::default()),
            ack_received: Notify::new(),
        }
    }

    /// Registers a promoted connection. The registry keeps a handle to the
    /// writer half; the connection task keeps reading ACK frames.
    pub async fn register(&self, address: String, writer: Arc<Mutex<OwnedWriteHalf>>) {
        let mut state = self.state.lock().await;

        state.replicas.retain(|replica| replica.address != address);
        state.replicas.push(Replica {
            address: address.clone(),
            writer,
            ack_offset: 0,
        });

        info!(replica = %address, total = state.replicas.len(), "replica registered");
    }

    /// Removes a replica on connection close. Safe to call for addresses that
    /// were never registered.
    pub async fn remove(&self, address: &str) {
        let mut state = self.state.lock().await;
        let before = state.replicas.len();

        state.replicas.retain(|replica| replica.address != address);

        if state.replicas.len() != before {
            info!(replica = %address, total = state.replicas.len(), "replica unregistered");
        }
    }

    pub async fn replica_count(&self) -> usize {
        self.state.lock().await.replicas.len()
    }

    pub async fn master_offset(&self) -> u64 {
        self.state.lock().await.master_offset
    }

    /// Propagates one write command to every replica and advances
    /// `master_offset` by the frame's encoded length. Holding the lock across
    /// encode, fan-out and the offset update gives the propagated stream a
    /// single total order across all client connections.
    pub async fn propagate(&self, command: &RespValue) {
        let encoded = command.encode();

        let mut state = self.state.lock().await;
        state.broadcast(&encoded).await;
        state.master_offset += encoded.len() as u64;

        debug!(
            bytes = encoded.len(),
            master_offset = state.master_offset,
            replicas = state.replicas.len(),
            "propagated write command"
        );
    }

    /// Records an acknowledged offset from a replica and wakes `WAIT` callers.
    pub async fn process_ack(&self, address: &str, offset: u64) {
        {
            let mut state = self.state.lock().await;

            if let Some(replica) = state
                .replicas
                .iter_mut()
                .find(|replica| replica.address == address)
            {
                replica.ack_offset = replica.ack_offset.max(offset);
                debug!(replica = %address, offset, "replica acknowledged offset");
            }
        }

        self.ack_received.notify_waiters();
    }

    /// Implements `WAIT`: returns how many replicas have acknowledged at
    /// least the master offset observed at call entry.
    ///
    /// The target offset is fixed when the call starts; propagation that
    /// happens while waiting does not move it. `GETACK` is broadcast exactly
    /// once per call. `timeout` of `None` waits until enough replicas
    /// acknowledge.
    pub async fn wait_for_acks(&self, num_replicas: usize, timeout: Option<Duration>) -> usize {
        let deadline = timeout.map(|duration| Instant::now() + duration);

        let target_offset = {
            let mut state = self.state.lock().await;
            let target_offset = state.master_offset;

            if target_offset == 0 || num_replicas == 0 {
                return state.replicas.len();
            }

            let synced = state.count_synced(target_offset);
            if synced >= num_replicas {
                return synced;
            }

            let getack = RespValue::command(&["REPLCONF", "GETACK", "*"]).encode();
            state.broadcast(&getack).await;

            target_offset
        };

        loop {
            // Arm the wakeup before re-checking so an ACK arriving in between
            // is not lost. `enable` registers the future without waiting.
            let ack_received = self.ack_received.notified();
            tokio::pin!(ack_received);
            ack_received.as_mut().enable();

            {
                let state = self.state.lock().await;
                let synced = state.count_synced(target_offset);
                if synced >= num_replicas {
                    return synced;
                }
            }

            match deadline {
                Some(deadline) => {
                    if tokio::time::timeout_at(deadline, ack_received).await.is_err() {
                        return self.state.lock().await.count_synced(target_offset);
                    }
                }
                None => ack_received.await,
            }
        }
    }
}

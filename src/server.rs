//! Shared server state and the accept loop.

use std::sync::Arc;

use rand::distr::{Alphanumeric, SampleString};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::connection::handle_client_connection;
use crate::replication::ReplicaRegistry;
use crate::store::{StreamStore, StringStore};

/// Everything a connection task needs, shared behind one `Arc`.
///
/// The stores carry their own locks; the registry serialises propagation
/// internally. Nothing here requires holding two locks at once.
pub struct ServerContext {
    pub config: ServerConfig,
    /// 40-character replication id, fixed for the process lifetime.
    pub replication_id: String,
    pub strings: Mutex<StringStore>,
    pub streams: StreamStore,
    pub registry: ReplicaRegistry,
}

impl ServerContext {
    pub fn new(config: ServerConfig) -> Arc<Self> {
        Arc::new(ServerContext {
            config,
            replication_id: Alphanumeric.sample_string(&mut rand::rng(), 40),
            strings: Mutex::new(StringStore::new()),
            streams: StreamStore::new(),
            registry: ReplicaRegistry::new(),
        })
    }
}

/// Binds the listener and accepts connections until the process exits. Each
/// connection runs in its own task.
pub async fn run(context: Arc<ServerContext>) -> std::io::Result<()> {
    let listener = TcpListener::bind(("127.0.0.1", context.config.port)).await?;

    info!(
        port = context.config.port,
        role = context.config.role.as_str(),
        "listening for connections"
    );

    loop {
        match listener.accept().await {
            Ok((stream, address)) => {
                let context = Arc::clone(&context);

                tokio::spawn(async move {
                    handle_client_connection(stream, address.to_string(), context).await;
                });
            }
            Err(error) => {
                error!(%error, "failed to accept connection");
            }
        }
    }
}

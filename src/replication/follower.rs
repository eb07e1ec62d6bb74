//! Follower-side replication client.
//!
//! Runs as a dedicated task when the server starts with `--replicaof`:
//! performs the handshake, swallows the leader's snapshot, then ingests
//! propagated commands forever, tracking the cumulative byte offset of every
//! fully-processed frame so it can answer `REPLCONF GETACK`.

use std::sync::Arc;

use bytes::BytesMut;
use regex::Regex;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use crate::commands::{Command, DispatchMode, dispatch};
use crate::input::{FrameError, read_frame, read_rdb_frame};
use crate::resp::RespValue;
use crate::server::ServerContext;

#[derive(Error, Debug)]
pub enum ReplicationError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error("unexpected response from leader: {0}")]
    UnexpectedResponse(String),
    #[error("invalid replication id in FULLRESYNC response")]
    InvalidReplicationId,
}

/// Connects to the leader and replicates until the connection drops.
pub async fn run(
    context: Arc<ServerContext>,
    host: &str,
    port: u16,
) -> Result<(), ReplicationError> {
    let mut stream = TcpStream::connect((host, port)).await?;
    let mut buffer = BytesMut::with_capacity(4096);

    let leader_address = format!("{}:{}", host, port);
    info!(leader = %leader_address, "connected to leader");

    handshake(&mut stream, &mut buffer, context.config.port).await?;

    let snapshot = read_rdb_frame(&mut stream, &mut buffer).await?;
    debug!(bytes = snapshot.len(), "received leader snapshot");

    ingest_propagated_commands(context, stream, buffer).await
}

/// PING → REPLCONF listening-port → REPLCONF capa psync2 → PSYNC ? -1.
async fn handshake(
    stream: &mut TcpStream,
    buffer: &mut BytesMut,
    own_port: u16,
) -> Result<(), ReplicationError> {
    let response = exchange(stream, buffer, &["PING"]).await?;
    expect_simple(&response, "PONG")?;

    let response = exchange(
        stream,
        buffer,
        &["REPLCONF", "listening-port", &own_port.to_string()],
    )
    .await?;
    expect_simple(&response, "OK")?;

    let response = exchange(stream, buffer, &["REPLCONF", "capa", "psync2"]).await?;
    expect_simple(&response, "OK")?;

    let response = exchange(stream, buffer, &["PSYNC", "?", "-1"]).await?;
    validate_fullresync(&response)?;

    info!("replication handshake completed");

    Ok(())
}

async fn exchange(
    stream: &mut TcpStream,
    buffer: &mut BytesMut,
    command_parts: &[&str],
) -> Result<RespValue, ReplicationError> {
    stream
        .write_all(&RespValue::command(command_parts).encode())
        .await?;
    stream.flush().await?;

    let (response, _) = read_frame(stream, buffer).await?;

    Ok(response)
}

fn expect_simple(response: &RespValue, expected: &str) -> Result<(), ReplicationError> {
    match response {
        RespValue::SimpleString(content) if content == expected => Ok(()),
        other => Err(unexpected_response(other)),
    }
}

fn validate_fullresync(response: &RespValue) -> Result<(), ReplicationError> {
    let RespValue::SimpleString(content) = response else {
        return Err(unexpected_response(response));
    };

    let parts = content.split_whitespace().collect::<Vec<&str>>();

    if parts.len() != 3 || parts[0] != "FULLRESYNC" {
        return Err(unexpected_response(response));
    }

    let repl_id_regex = Regex::new(r"^[a-zA-Z0-9]{40}$").unwrap();
    if !repl_id_regex.is_match(parts[1]) {
        return Err(ReplicationError::InvalidReplicationId);
    }

    parts[2]
        .parse::<i64>()
        .map_err(|_| unexpected_response(response))?;

    Ok(())
}

fn unexpected_response(response: &RespValue) -> ReplicationError {
    ReplicationError::UnexpectedResponse(String::from_utf8_lossy(&response.encode()).into_owned())
}

/// Applies propagated commands to the local stores without replying, except
/// for `REPLCONF GETACK` which is answered with the offset of all frames
/// fully processed *before* the GETACK frame itself.
async fn ingest_propagated_commands(
    context: Arc<ServerContext>,
    mut stream: TcpStream,
    mut buffer: BytesMut,
) -> Result<(), ReplicationError> {
    let mut processed_offset: u64 = 0;

    loop {
        let (frame, frame_len) = read_frame(&mut stream, &mut buffer).await?;

        let command = match Command::from_resp(frame) {
            Ok(command) => command,
            Err(error) => {
                warn!(%error, "ignoring unparseable propagated frame");
                processed_offset += frame_len as u64;
                continue;
            }
        };

        if is_getack(&command) {
            let ack = RespValue::command(&["REPLCONF", "ACK", &processed_offset.to_string()]);
            stream.write_all(&ack.encode()).await?;
            stream.flush().await?;

            debug!(offset = processed_offset, "answered GETACK");
        } else if let Err(error) = dispatch(&context, &command, DispatchMode::Replicated).await {
            warn!(command = %command.name, %error, "propagated command failed");
        }

        processed_offset += frame_len as u64;
    }
}

fn is_getack(command: &Command) -> bool {
    command.name == "REPLCONF"
        && command
            .arguments
            .first()
            .is_some_and(|argument| argument.eq_ignore_ascii_case(b"GETACK"))
}

//! Per-client connection handling.
//!
//! Each accepted socket runs this loop in its own task: frame one command,
//! run it through the transaction state machine, dispatch, write the reply,
//! and propagate writes. A connection is either a `Client` or, after a
//! successful `PSYNC`, a `Replica`; the transition happens exactly once and
//! narrows the accepted vocabulary to `REPLCONF ACK`.

use std::sync::Arc;

use bytes::BytesMut;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::commands::{Command, CommandError, DispatchMode, dispatch, is_write_command};
use crate::config::Role;
use crate::input::{FrameError, read_frame};
use crate::rdb::EMPTY_RDB;
use crate::resp::RespValue;
use crate::server::ServerContext;

/// Connection role. `Client` carries the transaction buffer: `Some` while a
/// `MULTI` block is open, holding the queued commands.
enum ConnectionState {
    Client { transaction: Option<Vec<Command>> },
    Replica,
}

pub async fn handle_client_connection(
    stream: TcpStream,
    address: String,
    context: Arc<ServerContext>,
) {
    let (mut reader, writer) = stream.into_split();
    let writer = Arc::new(Mutex::new(writer));
    let mut buffer = BytesMut::with_capacity(4096);
    let mut state = ConnectionState::Client { transaction: None };

    loop {
        let frame = match read_frame(&mut reader, &mut buffer).await {
            Ok((frame, _)) => frame,
            Err(FrameError::ConnectionClosed) => {
                debug!(client = %address, "connection closed");
                break;
            }
            Err(error) => {
                warn!(client = %address, %error, "closing connection after protocol error");
                break;
            }
        };

        let mut promoted = false;

        match &mut state {
            ConnectionState::Replica => {
                handle_replica_frame(frame, &address, &context).await;
            }
            ConnectionState::Client { transaction } => {
                let command = match Command::from_resp(frame) {
                    Ok(command) => command,
                    Err(error) => {
                        // A well-framed value that is not a command array is
                        // rejected like any other bad request; only framing
                        // corruption above is connection-fatal.
                        if write_to_stream(&writer, &error.encode()).await.is_err() {
                            break;
                        }
                        continue;
                    }
                };

                match handle_client_command(&command, transaction, &address, &writer, &context)
                    .await
                {
                    Ok(was_promoted) => promoted = was_promoted,
                    Err(error) => {
                        warn!(client = %address, %error, "failed to write response");
                        break;
                    }
                }
            }
        }

        if promoted {
            state = ConnectionState::Replica;
        }
    }

    // Removal must happen on every exit path; for never-promoted clients this
    // is a no-op.
    context.registry.remove(&address).await;
}

/// Handles one command in client state. Returns `Ok(true)` when the
/// connection was promoted to a replica.
async fn handle_client_command(
    command: &Command,
    transaction: &mut Option<Vec<Command>>,
    address: &str,
    writer: &Arc<Mutex<OwnedWriteHalf>>,
    context: &Arc<ServerContext>,
) -> std::io::Result<bool> {
    match command.name.as_str() {
        "MULTI" => {
            let reply = if transaction.is_some() {
                CommandError::NestedMulti.encode()
            } else {
                *transaction = Some(Vec::new());
                RespValue::SimpleString("OK".to_string()).encode()
            };

            write_to_stream(writer, &reply).await?;
        }
        "EXEC" => {
            let reply = match transaction.take() {
                None => CommandError::ExecWithoutMulti.encode(),
                Some(queued) => execute_transaction(context, queued).await,
            };

            write_to_stream(writer, &reply).await?;
        }
        "DISCARD" => {
            let reply = match transaction.take() {
                None => CommandError::DiscardWithoutMulti.encode(),
                Some(_) => RespValue::SimpleString("OK".to_string()).encode(),
            };

            write_to_stream(writer, &reply).await?;
        }
        _ if transaction.is_some() => {
            if let Some(queued) = transaction {
                queued.push(command.clone());
            }

            write_to_stream(
                writer,
                &RespValue::SimpleString("QUEUED".to_string()).encode(),
            )
            .await?;
        }
        "PSYNC" => match dispatch(context, command, DispatchMode::Interactive).await {
            Ok(reply) => {
                write_to_stream(writer, &reply).await?;
                send_snapshot(writer).await?;

                context
                    .registry
                    .register(address.to_string(), Arc::clone(writer))
                    .await;
                info!(replica = %address, "connection promoted to replica");

                return Ok(true);
            }
            Err(error) => write_to_stream(writer, &error.encode()).await?,
        },
        _ => {
            if write_forbidden(context, command) {
                write_to_stream(writer, &CommandError::ReadOnlyReplica.encode()).await?;
                return Ok(false);
            }

            match dispatch(context, command, DispatchMode::Interactive).await {
                Ok(reply) => {
                    write_to_stream(writer, &reply).await?;

                    if is_write_command(&command.name) {
                        context.registry.propagate(&command.to_resp()).await;
                    }
                }
                Err(error) => write_to_stream(writer, &error.encode()).await?,
            }
        }
    }

    Ok(false)
}

/// Runs the queued commands in arrival order, collecting every response
/// (including errors) into one array reply. Writes that succeed propagate in
/// the same order.
async fn execute_transaction(context: &ServerContext, queued: Vec<Command>) -> Vec<u8> {
    let mut reply = format!("*{}\r\n", queued.len()).into_bytes();

    for command in &queued {
        let response = if write_forbidden(context, command) {
            CommandError::ReadOnlyReplica.encode()
        } else {
            match dispatch(context, command, DispatchMode::Exec).await {
                Ok(response) => {
                    if is_write_command(&command.name) {
                        context.registry.propagate(&command.to_resp()).await;
                    }
                    response
                }
                Err(error) => error.encode(),
            }
        };

        reply.extend_from_slice(&response);
    }

    reply
}

/// After promotion the only meaningful inbound traffic is `REPLCONF ACK <n>`,
/// which updates the registry and gets no reply. Everything else is dropped.
async fn handle_replica_frame(frame: RespValue, address: &str, context: &Arc<ServerContext>) {
    let Ok(command) = Command::from_resp(frame) else {
        return;
    };

    let is_ack = command.name == "REPLCONF"
        && command
            .arguments
            .first()
            .is_some_and(|argument| argument.eq_ignore_ascii_case(b"ack"));

    if !is_ack {
        debug!(replica = %address, command = %command.name, "ignoring non-ACK frame from replica");
        return;
    }

    if let Some(offset) = command
        .arguments
        .get(1)
        .and_then(|offset| str::from_utf8(offset).ok())
        .and_then(|offset| offset.parse::<u64>().ok())
    {
        context.registry.process_ack(address, offset).await;
    }
}

/// The snapshot frame after `FULLRESYNC`: `$<len>\r\n<bytes>`, no trailing
/// CRLF.
async fn send_snapshot(writer: &Arc<Mutex<OwnedWriteHalf>>) -> std::io::Result<()> {
    let mut writer_guard = writer.lock().await;

    writer_guard
        .write_all(format!("${}\r\n", EMPTY_RDB.len()).as_bytes())
        .await?;
    writer_guard.write_all(&EMPTY_RDB).await?;
    writer_guard.flush().await
}

fn write_forbidden(context: &ServerContext, command: &Command) -> bool {
    matches!(context.config.role, Role::Follower { .. }) && is_write_command(&command.name)
}

async fn write_to_stream(
    writer: &Arc<Mutex<OwnedWriteHalf>>,
    bytes: &[u8],
) -> std::io::Result<()> {
    let mut writer_guard = writer.lock().await;
    writer_guard.write_all(bytes).await?;
    writer_guard.flush().await
}

use std::time::Duration;

use tokio::time::Instant;

use crate::resp::RespValue;
use crate::server::ServerContext;
use crate::store::StreamId;

use super::command_error::CommandError;
use super::dispatcher::{DispatchMode, text};
use super::stream_utils::entries_to_resp;

/// Parsed arguments for `XREAD [BLOCK ms] STREAMS key... id...`.
pub(super) struct XreadArguments {
    /// `Some(0)` blocks indefinitely, `Some(ms)` until the deadline, `None`
    /// never blocks.
    block_ms: Option<u64>,
    keys: Vec<String>,
    ids: Vec<String>,
}

impl XreadArguments {
    fn parse(arguments: &[Vec<u8>]) -> Result<Self, CommandError> {
        let mut cursor = 0;
        let mut block_ms = None;

        if arguments
            .get(cursor)
            .is_some_and(|argument| argument.eq_ignore_ascii_case(b"block"))
        {
            let value = arguments
                .get(cursor + 1)
                .ok_or(CommandError::WrongArity("xread"))?;
            block_ms = Some(
                text(value)?
                    .parse::<u64>()
                    .map_err(|_| CommandError::InvalidTimeout)?,
            );
            cursor += 2;
        }

        if !arguments
            .get(cursor)
            .is_some_and(|argument| argument.eq_ignore_ascii_case(b"streams"))
        {
            return Err(CommandError::Syntax);
        }
        cursor += 1;

        let rest = &arguments[cursor..];
        if rest.is_empty() || rest.len() % 2 != 0 {
            return Err(CommandError::WrongArity("xread"));
        }

        let (keys, ids) = rest.split_at(rest.len() / 2);
        let keys = keys
            .iter()
            .map(|key| text(key).map(str::to_string))
            .collect::<Result<Vec<_>, _>>()?;
        let ids = ids
            .iter()
            .map(|id| text(id).map(str::to_string))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(XreadArguments { block_ms, keys, ids })
    }
}

#[derive(Clone, Copy)]
enum Blocking {
    No,
    Indefinitely,
    Until(Instant),
}

pub(super) async fn xread(
    context: &ServerContext,
    arguments: &[Vec<u8>],
    mode: DispatchMode,
) -> Result<Vec<u8>, CommandError> {
    let xread_arguments = XreadArguments::parse(arguments)?;

    // `$` horizons freeze at call time: only entries appended after this
    // point count as new, no matter how long the caller then blocks.
    let mut horizons = Vec::with_capacity(xread_arguments.keys.len());
    for (key, id) in xread_arguments.keys.iter().zip(&xread_arguments.ids) {
        let horizon = if id == "$" {
            context.streams.last_id(key).await.unwrap_or(StreamId::ZERO)
        } else {
            StreamId::parse(id)?
        };
        horizons.push(horizon);
    }

    // Only an interactive caller may suspend; inside EXEC and on the
    // replication path the read degrades to its non-blocking form.
    let blocking = match (mode, xread_arguments.block_ms) {
        (DispatchMode::Interactive, Some(0)) => Blocking::Indefinitely,
        (DispatchMode::Interactive, Some(milliseconds)) => {
            Blocking::Until(Instant::now() + Duration::from_millis(milliseconds))
        }
        _ => Blocking::No,
    };

    loop {
        // Arm the wakeup before collecting so an append between the check and
        // the wait still wakes us. `enable` registers the future without
        // waiting on it.
        let appended = context.streams.append_notified();
        tokio::pin!(appended);
        appended.as_mut().enable();

        let mut results = Vec::new();
        for (key, horizon) in xread_arguments.keys.iter().zip(&horizons) {
            let entries = context.streams.entries_after(key, *horizon).await;
            if !entries.is_empty() {
                results.push(RespValue::Array(vec![
                    RespValue::BulkString(key.clone().into_bytes()),
                    entries_to_resp(&entries),
                ]));
            }
        }

        if !results.is_empty() {
            return Ok(RespValue::Array(results).encode());
        }

        match blocking {
            Blocking::No => return Ok(RespValue::NullBulkString.encode()),
            Blocking::Indefinitely => appended.await,
            Blocking::Until(deadline) => {
                if tokio::time::timeout_at(deadline, appended).await.is_err() {
                    return Ok(RespValue::NullBulkString.encode());
                }
            }
        }
    }
}

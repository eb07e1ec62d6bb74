use crate::resp::RespValue;
use crate::server::ServerContext;

use super::command_error::CommandError;
use super::dispatcher::text;

/// Increments the integer at `key`, initialising an absent key to 1. The
/// read-parse-write runs under one lock hold, so concurrent INCRs never lose
/// an update.
pub(super) async fn incr(
    context: &ServerContext,
    arguments: &[Vec<u8>],
) -> Result<Vec<u8>, CommandError> {
    let [key] = arguments else {
        return Err(CommandError::WrongArity("incr"));
    };
    let key = text(key)?;

    if context.streams.contains_key(key).await {
        return Err(CommandError::WrongType);
    }

    let mut strings = context.strings.lock().await;
    let incremented = strings.incr(key)?;

    Ok(RespValue::Integer(incremented).encode())
}

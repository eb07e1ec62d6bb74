use crate::resp::RespValue;
use crate::server::ServerContext;

use super::command_error::CommandError;

/// Lists all live string keys. Only the `*` pattern is supported.
pub(super) async fn keys(
    context: &ServerContext,
    arguments: &[Vec<u8>],
) -> Result<Vec<u8>, CommandError> {
    let [pattern] = arguments else {
        return Err(CommandError::WrongArity("keys"));
    };

    if pattern.as_slice() != b"*" {
        return Err(CommandError::UnsupportedPattern);
    }

    let mut strings = context.strings.lock().await;
    let response = strings
        .keys()
        .into_iter()
        .map(|key| RespValue::BulkString(key.into_bytes()))
        .collect();

    Ok(RespValue::Array(response).encode())
}

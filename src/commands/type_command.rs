use crate::resp::RespValue;
use crate::server::ServerContext;

use super::command_error::CommandError;
use super::dispatcher::text;

/// Reports the type of a key: streams take precedence, then strings, then
/// `none`.
pub(super) async fn type_command(
    context: &ServerContext,
    arguments: &[Vec<u8>],
) -> Result<Vec<u8>, CommandError> {
    let [key] = arguments else {
        return Err(CommandError::WrongArity("type"));
    };
    let key = text(key)?;

    let type_name = if context.streams.contains_key(key).await {
        "stream"
    } else if context.strings.lock().await.exists(key) {
        "string"
    } else {
        "none"
    };

    Ok(RespValue::SimpleString(type_name.to_string()).encode())
}

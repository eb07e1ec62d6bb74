use crate::resp::RespValue;
use crate::server::ServerContext;

use super::command_error::CommandError;
use super::dispatcher::text;

pub(super) async fn get(
    context: &ServerContext,
    arguments: &[Vec<u8>],
) -> Result<Vec<u8>, CommandError> {
    let [key] = arguments else {
        return Err(CommandError::WrongArity("get"));
    };
    let key = text(key)?;

    let mut strings = context.strings.lock().await;

    match strings.get(key) {
        Some(value) => Ok(RespValue::BulkString(value).encode()),
        None => Ok(RespValue::NullBulkString.encode()),
    }
}

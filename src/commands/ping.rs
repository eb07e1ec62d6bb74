use crate::resp::RespValue;

use super::command_error::CommandError;

pub(super) fn ping(arguments: &[Vec<u8>]) -> Result<Vec<u8>, CommandError> {
    match arguments {
        [] => Ok(RespValue::SimpleString("PONG".to_string()).encode()),
        [message] => Ok(RespValue::BulkString(message.clone()).encode()),
        _ => Err(CommandError::WrongArity("ping")),
    }
}

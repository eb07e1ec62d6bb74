use crate::resp::RespValue;

use super::command_error::CommandError;

pub(super) fn echo(arguments: &[Vec<u8>]) -> Result<Vec<u8>, CommandError> {
    match arguments {
        [message] => Ok(RespValue::BulkString(message.clone()).encode()),
        _ => Err(CommandError::WrongArity("echo")),
    }
}

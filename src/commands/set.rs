use jiff::{SignedDuration, Timestamp};

use crate::resp::RespValue;
use crate::server::ServerContext;

use super::command_error::CommandError;
use super::dispatcher::text;

/// Parsed arguments for `SET key value [PX milliseconds]`. The value is kept
/// as raw bytes; only the key and the expiry are interpreted as text.
pub(super) struct SetArguments {
    key: String,
    value: Vec<u8>,
    deadline: Option<Timestamp>,
}

impl SetArguments {
    fn parse(arguments: &[Vec<u8>]) -> Result<Self, CommandError> {
        match arguments {
            [key, value] => Ok(SetArguments {
                key: text(key)?.to_string(),
                value: value.clone(),
                deadline: None,
            }),
            [key, value, option, milliseconds] => {
                if !option.eq_ignore_ascii_case(b"px") {
                    return Err(CommandError::Syntax);
                }

                let milliseconds = text(milliseconds)?
                    .parse::<i64>()
                    .map_err(|_| CommandError::NotAnInteger)?;

                let deadline = Timestamp::now()
                    .checked_add(SignedDuration::from_millis(milliseconds))
                    .map_err(|_| CommandError::NotAnInteger)?;

                Ok(SetArguments {
                    key: text(key)?.to_string(),
                    value: value.clone(),
                    deadline: Some(deadline),
                })
            }
            _ => Err(CommandError::WrongArity("set")),
        }
    }
}

pub(super) async fn set(
    context: &ServerContext,
    arguments: &[Vec<u8>],
) -> Result<Vec<u8>, CommandError> {
    let set_arguments = SetArguments::parse(arguments)?;

    // SET replaces whatever held the key; dropping a stream here keeps every
    // key in exactly one store.
    context.streams.remove(&set_arguments.key).await;

    let mut strings = context.strings.lock().await;
    match set_arguments.deadline {
        Some(deadline) => {
            strings.set_with_deadline(set_arguments.key, set_arguments.value, deadline)
        }
        None => strings.set(set_arguments.key, set_arguments.value),
    }

    Ok(RespValue::SimpleString("OK".to_string()).encode())
}

//! Command parsing and per-command dispatch.

use crate::resp::RespValue;
use crate::server::ServerContext;

use super::command_error::CommandError;
use super::{
    config_get, echo, get, incr, info, keys, ping, psync, replconf, set, type_command, wait, xadd,
    xrange, xread,
};

/// Commands that mutate the keyspace and therefore propagate to replicas.
const WRITE_COMMANDS: [&str; 3] = ["SET", "INCR", "XADD"];

pub fn is_write_command(name: &str) -> bool {
    WRITE_COMMANDS.contains(&name)
}

/// Where a command came from, which decides how it behaves.
///
/// `Exec` runs queued transaction commands: blocking reads degrade to their
/// non-blocking form so `EXEC` can never suspend. `Replicated` runs commands
/// propagated by a leader: same degradation, and the caller discards the
/// response.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DispatchMode {
    Interactive,
    Exec,
    Replicated,
}

/// A parsed client command: uppercased name plus its raw arguments.
///
/// Arguments stay as the bytes that arrived on the wire. Values passed
/// through untouched (SET payloads, stream field values) keep arbitrary
/// binary content; each command interprets as text only the arguments it has
/// to, via [`text`].
#[derive(Debug, PartialEq, Clone)]
pub struct Command {
    pub name: String,
    pub arguments: Vec<Vec<u8>>,
}

impl Command {
    /// Parses the canonical wire form, an array of bulk strings with the
    /// command name first. The name is the one element that must be text.
    pub fn from_resp(input: RespValue) -> Result<Command, CommandError> {
        let RespValue::Array(elements) = input else {
            return Err(CommandError::InvalidFrame);
        };

        let mut parts = Vec::with_capacity(elements.len());
        for element in elements {
            match element {
                RespValue::BulkString(content) => parts.push(content),
                _ => return Err(CommandError::InvalidFrame),
            }
        }

        let mut parts = parts.into_iter();
        let name = parts.next().ok_or(CommandError::InvalidFrame)?;
        let name = str::from_utf8(&name)
            .map_err(|_| CommandError::InvalidFrame)?
            .to_uppercase();

        Ok(Command {
            name,
            arguments: parts.collect(),
        })
    }

    /// The RESP form used when propagating this command to replicas.
    pub fn to_resp(&self) -> RespValue {
        let mut elements = vec![RespValue::BulkString(self.name.as_bytes().to_vec())];
        elements.extend(
            self.arguments
                .iter()
                .map(|argument| RespValue::BulkString(argument.clone())),
        );
        RespValue::Array(elements)
    }
}

/// Interprets an argument as UTF-8 text. Keys, ids, numbers and option words
/// go through here; payload arguments never do.
pub(super) fn text(argument: &[u8]) -> Result<&str, CommandError> {
    str::from_utf8(argument).map_err(|_| CommandError::InvalidTextArgument)
}

/// Runs one command against the stores and returns its encoded response.
///
/// Transaction control (`MULTI`/`EXEC`/`DISCARD`) and the `PSYNC`/`REPLCONF
/// ACK` connection-state transitions live in the connection handler, not
/// here; by the time a command reaches this table it is a plain request.
pub async fn dispatch(
    context: &ServerContext,
    command: &Command,
    mode: DispatchMode,
) -> Result<Vec<u8>, CommandError> {
    match command.name.as_str() {
        "PING" => ping::ping(&command.arguments),
        "ECHO" => echo::echo(&command.arguments),
        "SET" => set::set(context, &command.arguments).await,
        "GET" => get::get(context, &command.arguments).await,
        "INCR" => incr::incr(context, &command.arguments).await,
        "TYPE" => type_command::type_command(context, &command.arguments).await,
        "KEYS" => keys::keys(context, &command.arguments).await,
        "CONFIG" => config_get::config(context, &command.arguments),
        "INFO" => info::info(context, &command.arguments).await,
        "XADD" => xadd::xadd(context, &command.arguments).await,
        "XRANGE" => xrange::xrange(context, &command.arguments).await,
        "XREAD" => xread::xread(context, &command.arguments, mode).await,
        "WAIT" => wait::wait(context, &command.arguments).await,
        "REPLCONF" => replconf::replconf(&command.arguments),
        "PSYNC" => psync::psync(context, &command.arguments),
        name => Err(CommandError::UnknownCommand(name.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::{Command, is_write_command, text};
    use crate::commands::CommandError;
    use crate::resp::RespValue;

    #[test]
    fn test_from_resp_uppercases_name_and_keeps_arguments() {
        let input = RespValue::command(&["set", "Foo", "Bar"]);
        let command = Command::from_resp(input).unwrap();

        assert_eq!(command.name, "SET");
        assert_eq!(
            command.arguments,
            vec![b"Foo".to_vec(), b"Bar".to_vec()]
        );
    }

    #[test]
    fn test_from_resp_keeps_binary_arguments() {
        let input = RespValue::Array(vec![
            RespValue::BulkString(b"SET".to_vec()),
            RespValue::BulkString(b"key".to_vec()),
            RespValue::BulkString(vec![0x00, 0xFF, 0x80]),
        ]);

        let command = Command::from_resp(input).unwrap();
        assert_eq!(command.arguments[1], vec![0x00, 0xFF, 0x80]);
    }

    #[test]
    fn test_from_resp_rejects_invalid_frames() {
        let test_cases = vec![
            RespValue::SimpleString("PING".to_string()),
            RespValue::Integer(1),
            RespValue::Array(vec![]),
            RespValue::Array(vec![RespValue::Integer(1)]),
            RespValue::Array(vec![
                RespValue::BulkString(b"SET".to_vec()),
                RespValue::Integer(1),
            ]),
            // The command name itself must be text.
            RespValue::Array(vec![RespValue::BulkString(vec![0xFF, 0xFE])]),
        ];

        for input in test_cases {
            assert_eq!(
                Command::from_resp(input.clone()),
                Err(CommandError::InvalidFrame),
                "parsing {:?}",
                input
            );
        }
    }

    #[test]
    fn test_to_resp_round_trip() {
        let command = Command {
            name: "XADD".to_string(),
            arguments: vec![b"s".to_vec(), b"*".to_vec(), b"k".to_vec(), b"v".to_vec()],
        };

        assert_eq!(
            command.to_resp().encode(),
            b"*5\r\n$4\r\nXADD\r\n$1\r\ns\r\n$1\r\n*\r\n$1\r\nk\r\n$1\r\nv\r\n"
        );
    }

    #[test]
    fn test_text_rejects_invalid_utf8() {
        assert_eq!(text(b"plain"), Ok("plain"));
        assert_eq!(text(&[0xFF]), Err(CommandError::InvalidTextArgument));
    }

    #[test]
    fn test_write_command_classification() {
        for name in ["SET", "INCR", "XADD"] {
            assert!(is_write_command(name), "{} should be a write", name);
        }

        for name in ["GET", "XRANGE", "XREAD", "WAIT", "PING", "REPLCONF"] {
            assert!(!is_write_command(name), "{} should not be a write", name);
        }
    }
}

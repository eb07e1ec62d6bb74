use thiserror::Error;

use crate::resp::RespValue;
use crate::store::stream_store::StreamError;
use crate::store::string_store::StringStoreError;

#[derive(Error, Debug, PartialEq)]
pub enum CommandError {
    #[error("Protocol error: expected array of bulk strings")]
    InvalidFrame,
    #[error("invalid argument encoding")]
    InvalidTextArgument,
    #[error("wrong number of arguments for '{0}' command")]
    WrongArity(&'static str),
    #[error("unknown command '{0}'")]
    UnknownCommand(String),
    #[error("value is not an integer or out of range")]
    NotAnInteger,
    #[error("timeout is not an integer or out of range")]
    InvalidTimeout,
    #[error("syntax error")]
    Syntax,
    #[error("pattern not supported")]
    UnsupportedPattern,
    #[error("unknown CONFIG subcommand '{0}'")]
    UnknownConfigSubcommand(String),
    #[error("unknown INFO section '{0}'")]
    UnknownInfoSection(String),
    #[error("MULTI calls can not be nested")]
    NestedMulti,
    #[error("EXEC without MULTI")]
    ExecWithoutMulti,
    #[error("DISCARD without MULTI")]
    DiscardWithoutMulti,
    #[error("Unrecognized REPLCONF option '{0}'")]
    UnknownReplconfOption(String),
    #[error("invalid PSYNC arguments")]
    InvalidPsync,
    #[error("{0}")]
    Stream(#[from] StreamError),
    #[error("WRONGTYPE Operation against a key holding the wrong kind of value")]
    WrongType,
    #[error("READONLY You can't write against a read only replica.")]
    ReadOnlyReplica,
}

impl CommandError {
    /// Renders the error as its RESP wire form. Most errors carry the generic
    /// `ERR` prefix; `WRONGTYPE` and `READONLY` are their own error classes.
    pub fn to_resp(&self) -> RespValue {
        match self {
            CommandError::WrongType | CommandError::ReadOnlyReplica => {
                RespValue::Error(self.to_string())
            }
            _ => RespValue::Error(format!("ERR {}", self)),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        self.to_resp().encode()
    }
}

impl From<StringStoreError> for CommandError {
    fn from(error: StringStoreError) -> Self {
        match error {
            StringStoreError::NotAnInteger => CommandError::NotAnInteger,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::CommandError;
    use crate::store::stream_store::StreamError;

    #[test]
    fn test_wire_encoding() {
        let test_cases = vec![
            (
                CommandError::WrongArity("set"),
                "-ERR wrong number of arguments for 'set' command\r\n",
            ),
            (
                CommandError::UnknownCommand("FOO".to_string()),
                "-ERR unknown command 'FOO'\r\n",
            ),
            (
                CommandError::NotAnInteger,
                "-ERR value is not an integer or out of range\r\n",
            ),
            (
                CommandError::Stream(StreamError::IdNotGreater),
                "-ERR The ID specified in XADD is equal or smaller than the target stream top item\r\n",
            ),
            (
                CommandError::WrongType,
                "-WRONGTYPE Operation against a key holding the wrong kind of value\r\n",
            ),
            (
                CommandError::ReadOnlyReplica,
                "-READONLY You can't write against a read only replica.\r\n",
            ),
            (CommandError::NestedMulti, "-ERR MULTI calls can not be nested\r\n"),
            (CommandError::ExecWithoutMulti, "-ERR EXEC without MULTI\r\n"),
        ];

        for (error, expected) in test_cases {
            assert_eq!(error.encode(), expected.as_bytes(), "encoding {:?}", error);
        }
    }
}

use crate::resp::RespValue;

use super::command_error::CommandError;

/// Handshake-time `REPLCONF` options are acknowledged with `+OK`. The `ACK`
/// and `GETACK` subcommands never reach this table: the connection handler
/// consumes ACK frames from promoted replicas and the follower task answers
/// GETACK on its leader connection.
pub(super) fn replconf(arguments: &[Vec<u8>]) -> Result<Vec<u8>, CommandError> {
    let [option, _values @ ..] = arguments else {
        return Err(CommandError::WrongArity("replconf"));
    };

    match option.to_ascii_lowercase().as_slice() {
        b"listening-port" | b"capa" => Ok(RespValue::SimpleString("OK".to_string()).encode()),
        other => Err(CommandError::UnknownReplconfOption(
            String::from_utf8_lossy(other).into_owned(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::replconf;

    fn args(parts: &[&str]) -> Vec<Vec<u8>> {
        parts.iter().map(|s| s.as_bytes().to_vec()).collect()
    }

    #[test]
    fn test_replconf() {
        assert_eq!(
            replconf(&args(&["listening-port", "6380"])).unwrap(),
            b"+OK\r\n"
        );
        assert_eq!(replconf(&args(&["capa", "psync2"])).unwrap(), b"+OK\r\n");
        assert!(replconf(&args(&["bogus"])).is_err());
        assert!(replconf(&[]).is_err());
    }
}

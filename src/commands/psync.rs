use crate::resp::RespValue;
use crate::server::ServerContext;

use super::command_error::CommandError;
use super::dispatcher::text;

/// Parsed arguments for `PSYNC <replication id> <offset>`.
pub(super) struct PsyncArguments {
    replication_id: String,
}

impl PsyncArguments {
    fn parse(arguments: &[Vec<u8>]) -> Result<Self, CommandError> {
        let [replication_id, offset] = arguments else {
            return Err(CommandError::WrongArity("psync"));
        };

        text(offset)?
            .parse::<i64>()
            .map_err(|_| CommandError::InvalidPsync)?;

        Ok(PsyncArguments {
            replication_id: text(replication_id)?.to_string(),
        })
    }
}

/// The leader always performs a full resynchronisation, replying
/// `FULLRESYNC <replication id> 0`. The connection handler follows up with
/// the snapshot frame and promotes the connection to a replica.
pub(super) fn psync(
    context: &ServerContext,
    arguments: &[Vec<u8>],
) -> Result<Vec<u8>, CommandError> {
    let psync_arguments = PsyncArguments::parse(arguments)?;

    if psync_arguments.replication_id != "?"
        && psync_arguments.replication_id != context.replication_id
    {
        return Err(CommandError::InvalidPsync);
    }

    Ok(RespValue::SimpleString(format!("FULLRESYNC {} 0", context.replication_id)).encode())
}

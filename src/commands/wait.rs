use std::time::Duration;

use crate::resp::RespValue;
use crate::server::ServerContext;

use super::command_error::CommandError;
use super::dispatcher::text;

/// Parsed arguments for `WAIT numreplicas timeout`.
pub(super) struct WaitArguments {
    num_replicas: usize,
    /// `None` waits without a deadline (timeout argument 0).
    timeout: Option<Duration>,
}

impl WaitArguments {
    fn parse(arguments: &[Vec<u8>]) -> Result<Self, CommandError> {
        let [num_replicas, timeout] = arguments else {
            return Err(CommandError::WrongArity("wait"));
        };

        let num_replicas = text(num_replicas)?
            .parse::<usize>()
            .map_err(|_| CommandError::NotAnInteger)?;
        let timeout_ms = text(timeout)?
            .parse::<u64>()
            .map_err(|_| CommandError::InvalidTimeout)?;

        let timeout = match timeout_ms {
            0 => None,
            _ => Some(Duration::from_millis(timeout_ms)),
        };

        Ok(WaitArguments {
            num_replicas,
            timeout,
        })
    }
}

pub(super) async fn wait(
    context: &ServerContext,
    arguments: &[Vec<u8>],
) -> Result<Vec<u8>, CommandError> {
    let wait_arguments = WaitArguments::parse(arguments)?;

    let synced = context
        .registry
        .wait_for_acks(wait_arguments.num_replicas, wait_arguments.timeout)
        .await;

    Ok(RespValue::Integer(synced as i64).encode())
}

use crate::server::ServerContext;
use crate::store::StreamId;

use super::command_error::CommandError;
use super::dispatcher::text;
use super::stream_utils::entries_to_resp;

/// `XRANGE key start end` with `-`/`+` open bounds; incomplete ids default
/// the sequence to 0 on the start bound and to the maximum on the end bound.
pub(super) async fn xrange(
    context: &ServerContext,
    arguments: &[Vec<u8>],
) -> Result<Vec<u8>, CommandError> {
    let [key, start, end] = arguments else {
        return Err(CommandError::WrongArity("xrange"));
    };

    let key = text(key)?;
    let start = StreamId::parse_range_bound(text(start)?, true)?;
    let end = StreamId::parse_range_bound(text(end)?, false)?;

    let entries = context.streams.range(key, start, end).await;

    Ok(entries_to_resp(&entries).encode())
}

//! Rendering of stream entries into RESP trees, shared by XRANGE and XREAD.

use crate::resp::RespValue;
use crate::store::StreamEntry;

/// Renders entries as an array of `[id, [field, value, ...]]` pairs, field
/// order preserved exactly as the client supplied it.
pub(super) fn entries_to_resp(entries: &[StreamEntry]) -> RespValue {
    RespValue::Array(entries.iter().map(entry_to_resp).collect())
}

fn entry_to_resp(entry: &StreamEntry) -> RespValue {
    RespValue::Array(vec![
        RespValue::BulkString(entry.id.to_string().into_bytes()),
        RespValue::Array(
            entry
                .fields
                .iter()
                .map(|field| RespValue::BulkString(field.clone()))
                .collect(),
        ),
    ])
}

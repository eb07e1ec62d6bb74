use crate::resp::RespValue;
use crate::server::ServerContext;

use super::command_error::CommandError;
use super::dispatcher::text;

/// Parsed arguments for `XADD key id field value [field value ...]`. Field
/// names and values stay raw bytes; the key and id are text.
pub(super) struct XaddArguments {
    key: String,
    id_spec: String,
    fields: Vec<Vec<u8>>,
}

impl XaddArguments {
    fn parse(arguments: &[Vec<u8>]) -> Result<Self, CommandError> {
        let [key, id_spec, fields @ ..] = arguments else {
            return Err(CommandError::WrongArity("xadd"));
        };

        // At least one pair, and pairing is positional.
        if fields.is_empty() || fields.len() % 2 != 0 {
            return Err(CommandError::WrongArity("xadd"));
        }

        Ok(XaddArguments {
            key: text(key)?.to_string(),
            id_spec: text(id_spec)?.to_string(),
            fields: fields.to_vec(),
        })
    }
}

pub(super) async fn xadd(
    context: &ServerContext,
    arguments: &[Vec<u8>],
) -> Result<Vec<u8>, CommandError> {
    let xadd_arguments = XaddArguments::parse(arguments)?;

    if context.strings.lock().await.exists(&xadd_arguments.key) {
        return Err(CommandError::WrongType);
    }

    let id = context
        .streams
        .add(
            &xadd_arguments.key,
            &xadd_arguments.id_spec,
            xadd_arguments.fields,
        )
        .await?;

    Ok(RespValue::BulkString(id.to_string().into_bytes()).encode())
}

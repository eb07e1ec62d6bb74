use crate::resp::RespValue;
use crate::server::ServerContext;

use super::command_error::CommandError;

/// `CONFIG GET <name>...` — answers `dir` and `dbfilename` as `[name, value]`
/// pairs; unknown parameters contribute nothing, so a lone unknown name
/// yields an empty array.
pub(super) fn config(
    context: &ServerContext,
    arguments: &[Vec<u8>],
) -> Result<Vec<u8>, CommandError> {
    let [subcommand, parameters @ ..] = arguments else {
        return Err(CommandError::WrongArity("config"));
    };

    if !subcommand.eq_ignore_ascii_case(b"get") {
        return Err(CommandError::UnknownConfigSubcommand(
            String::from_utf8_lossy(subcommand).into_owned(),
        ));
    }

    if parameters.is_empty() {
        return Err(CommandError::WrongArity("config|get"));
    }

    let mut response = Vec::new();
    for parameter in parameters {
        match parameter.to_ascii_lowercase().as_slice() {
            b"dir" => {
                response.push(RespValue::BulkString(b"dir".to_vec()));
                response.push(RespValue::BulkString(
                    context.config.rdb_directory.clone().into_bytes(),
                ));
            }
            b"dbfilename" => {
                response.push(RespValue::BulkString(b"dbfilename".to_vec()));
                response.push(RespValue::BulkString(
                    context.config.rdb_filename.clone().into_bytes(),
                ));
            }
            _ => {}
        }
    }

    Ok(RespValue::Array(response).encode())
}

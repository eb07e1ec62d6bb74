use crate::config::Role;
use crate::resp::RespValue;
use crate::server::ServerContext;

use super::command_error::CommandError;

/// `INFO [replication]` — only the replication section exists; with no
/// argument the same section is returned.
pub(super) async fn info(
    context: &ServerContext,
    arguments: &[Vec<u8>],
) -> Result<Vec<u8>, CommandError> {
    match arguments {
        [] => {}
        [section] if section.eq_ignore_ascii_case(b"replication") => {}
        [section] => {
            return Err(CommandError::UnknownInfoSection(
                String::from_utf8_lossy(section).into_owned(),
            ));
        }
        _ => return Err(CommandError::WrongArity("info")),
    }

    let mut body = String::from("# Replication\r\n");
    body.push_str(&format!("role:{}\r\n", context.config.role.as_str()));

    match &context.config.role {
        Role::Leader => {
            body.push_str(&format!(
                "connected_slaves:{}\r\n",
                context.registry.replica_count().await
            ));
        }
        Role::Follower { host, port } => {
            body.push_str(&format!("master_host:{}\r\n", host));
            body.push_str(&format!("master_port:{}\r\n", port));
        }
    }

    body.push_str(&format!("master_replid:{}\r\n", context.replication_id));
    body.push_str(&format!(
        "master_repl_offset:{}\r\n",
        context.registry.master_offset().await
    ));

    Ok(RespValue::BulkString(body.into_bytes()).encode())
}

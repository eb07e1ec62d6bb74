//! Startup load of the on-disk RDB file into the string store.

use std::path::Path;

use thiserror::Error;
use tracing::info;

use crate::store::StringStore;

use super::file::{RdbError, RdbFile};

#[derive(Error, Debug)]
pub enum RdbLoadError {
    #[error("I/O error reading RDB file: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Parse(#[from] RdbError),
}

/// Loads `path` into `strings`, returning how many keys were loaded.
///
/// A missing file is not an error: the server starts with an empty keyspace.
/// An unreadable file or an invalid header is a startup failure; damage past
/// the header was already degraded to a partial load by the parser.
pub async fn load_rdb_file(path: &Path, strings: &mut StringStore) -> Result<usize, RdbLoadError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            info!(path = %path.display(), "no RDB file found, starting with an empty keyspace");
            return Ok(0);
        }
        Err(error) => return Err(error.into()),
    };

    let file = RdbFile::parse(&bytes)?;
    let loaded = file.entries.len();

    for entry in file.entries {
        strings.load_entry(entry.key, entry.value.into_bytes(), entry.expires_at);
    }

    info!(path = %path.display(), keys = loaded, "loaded RDB file");

    Ok(loaded)
}

//! Server configuration parsed from command-line arguments.
//!
//! Recognised flags: `--port <n>`, `--replicaof "<host> <port>"` (also
//! accepted as two separate tokens), `--dir <path>` and `--dbfilename <name>`.
//! Unknown flags are logged and skipped so the server still starts when
//! invoked with options it does not implement.

use regex::Regex;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug, PartialEq, Clone)]
pub enum CliError {
    #[error("missing value for command line flag")]
    MissingFlagValue,
    #[error("invalid port flag value")]
    InvalidPortFlagValue,
    #[error("invalid leader address")]
    InvalidLeaderAddress,
    #[error("invalid leader port")]
    InvalidLeaderPort,
}

/// Replication role of this server instance.
#[derive(Debug, PartialEq, Clone)]
pub enum Role {
    Leader,
    Follower { host: String, port: u16 },
}

impl Role {
    /// Role name as reported by `INFO replication` (Redis wire terminology).
    pub fn as_str(&self) -> &str {
        match self {
            Role::Leader => "master",
            Role::Follower { .. } => "slave",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// The TCP port the server listens on.
    pub port: u16,
    pub role: Role,
    /// Directory reported via `CONFIG GET dir`; the RDB file is loaded from here.
    pub rdb_directory: String,
    /// Filename reported via `CONFIG GET dbfilename`.
    pub rdb_filename: String,
}

impl ServerConfig {
    /// Parses configuration from command-line arguments (the first element is
    /// the binary name and is skipped).
    pub fn from_args<I: IntoIterator<Item = String>>(args: I) -> Result<Self, CliError> {
        let mut iter = args.into_iter().skip(1);

        let mut port: Option<u16> = None;
        let mut role = Role::Leader;
        let mut rdb_directory: Option<String> = None;
        let mut rdb_filename: Option<String> = None;

        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--port" => {
                    let value = iter.next().ok_or(CliError::MissingFlagValue)?;
                    port = Some(validate_port(&value, CliError::InvalidPortFlagValue)?);
                }
                "--replicaof" => {
                    let value = iter.next().ok_or(CliError::MissingFlagValue)?;

                    // Both `--replicaof "host port"` and `--replicaof host port`
                    // appear in the wild; a value without whitespace means the
                    // port arrived as a separate token.
                    let (host, leader_port) = if value.contains(char::is_whitespace) {
                        validate_leader_address(&value)?
                    } else {
                        let port_token = iter.next().ok_or(CliError::MissingFlagValue)?;
                        validate_leader_address(&format!("{} {}", value, port_token))?
                    };

                    role = Role::Follower {
                        host,
                        port: leader_port,
                    };
                }
                "--dir" => {
                    rdb_directory = Some(iter.next().ok_or(CliError::MissingFlagValue)?);
                }
                "--dbfilename" => {
                    rdb_filename = Some(iter.next().ok_or(CliError::MissingFlagValue)?);
                }
                unknown => {
                    warn!(flag = unknown, "ignoring unrecognised command line flag");
                }
            }
        }

        Ok(ServerConfig {
            port: port.unwrap_or(6379),
            role,
            rdb_directory: rdb_directory.unwrap_or_else(|| ".".to_string()),
            rdb_filename: rdb_filename.unwrap_or_else(|| "dump.rdb".to_string()),
        })
    }

    /// Filesystem path of the RDB file loaded at startup.
    pub fn rdb_path(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.rdb_directory).join(&self.rdb_filename)
    }
}

fn validate_port(port: &str, error: CliError) -> Result<u16, CliError> {
    let port_number = port.parse::<u16>().map_err(|_| error.clone())?;

    if port_number == 0 {
        return Err(error);
    }

    Ok(port_number)
}

/// Validates a leader address of the form `"host port"`.
///
/// The host may be an IPv4 address (each octet checked) or a hostname.
fn validate_leader_address(leader_address: &str) -> Result<(String, u16), CliError> {
    let ipv4_regex = Regex::new(r"^(\d{1,3})\.(\d{1,3})\.(\d{1,3})\.(\d{1,3})$").unwrap();
    let hostname_regex = Regex::new(r"^[a-zA-Z0-9\-\.]+$").unwrap();

    let split_address = leader_address.split_whitespace().collect::<Vec<&str>>();

    if split_address.len() != 2 {
        return Err(CliError::InvalidLeaderAddress);
    }

    let address = split_address[0];

    let valid_address = if let Some(caps) = ipv4_regex.captures(address) {
        caps.iter().skip(1).all(|octet| {
            octet
                .map(|m| m.as_str().parse::<u16>().map(|v| v <= 255).unwrap_or(false))
                .unwrap_or(false)
        })
    } else {
        hostname_regex.is_match(address)
    };

    if !valid_address {
        return Err(CliError::InvalidLeaderAddress);
    }

    let port_number = validate_port(split_address[1], CliError::InvalidLeaderPort)?;

    Ok((address.to_string(), port_number))
}

pub mod command_error;
pub mod dispatcher;

mod config_get;
mod echo;
mod get;
mod incr;
mod info;
mod keys;
mod ping;
mod psync;
mod replconf;
mod set;
mod stream_utils;
mod type_command;
mod wait;
mod xadd;
mod xrange;
mod xread;

pub use command_error::CommandError;
pub use dispatcher::{Command, DispatchMode, dispatch, is_write_command};

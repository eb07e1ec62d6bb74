//! An in-memory key-value server speaking the Redis serialization protocol.
//!
//! Supported functionality:
//!
//! - String keys with millisecond expiry (GET, SET, INCR, KEYS, TYPE)
//! - Append-only streams (XADD, XRANGE, XREAD with blocking reads)
//! - Client transactions (MULTI, EXEC, DISCARD)
//! - Leader/follower replication with acknowledgement-based WAIT
//! - RDB snapshot loading at startup
//!
//! Clients connect over TCP and exchange RESP-encoded command arrays and
//! responses. Concurrency comes from Tokio: one task per connection plus a
//! dedicated replication task on followers.

pub mod commands;
pub mod config;
pub mod connection;
pub mod input;
pub mod rdb;
pub mod replication;
pub mod resp;
pub mod server;
pub mod store;

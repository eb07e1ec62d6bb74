//! Append-only stream keyspace.
//!
//! Each stream is an ordered log of entries with strictly increasing
//! `(ms_time, sequence)` ids. A single `Notify` wakes every blocked `XREAD`
//! caller on any append; waiters re-collect and may go back to sleep if the
//! append was to a stream they are not watching.

use std::collections::HashMap;
use std::fmt;

use jiff::Timestamp;
use thiserror::Error;
use tokio::sync::futures::Notified;
use tokio::sync::{Mutex, Notify};

#[derive(Error, Debug, PartialEq)]
pub enum StreamError {
    #[error("The ID specified in XADD must be greater than 0-0")]
    IdZero,
    #[error("The ID specified in XADD is equal or smaller than the target stream top item")]
    IdNotGreater,
    #[error("Invalid stream ID specified as stream command argument")]
    MalformedId,
}

/// Stream entry identifier. Ordering is lexicographic on the
/// `(ms_time, sequence)` pair, which the derived `Ord` provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct StreamId {
    pub ms_time: u64,
    pub sequence: u64,
}

impl StreamId {
    pub const ZERO: StreamId = StreamId {
        ms_time: 0,
        sequence: 0,
    };

    pub const MAX: StreamId = StreamId {
        ms_time: u64::MAX,
        sequence: u64::MAX,
    };

    pub fn new(ms_time: u64, sequence: u64) -> Self {
        StreamId { ms_time, sequence }
    }

    /// Parses an explicit id: `<ms>-<seq>`, or a bare `<ms>` which defaults
    /// the sequence to 0.
    pub fn parse(input: &str) -> Result<StreamId, StreamError> {
        match input.split_once('-') {
            Some((ms_part, seq_part)) => {
                let ms_time = ms_part.parse::<u64>().map_err(|_| StreamError::MalformedId)?;
                let sequence = seq_part.parse::<u64>().map_err(|_| StreamError::MalformedId)?;
                Ok(StreamId { ms_time, sequence })
            }
            None => {
                let ms_time = input.parse::<u64>().map_err(|_| StreamError::MalformedId)?;
                Ok(StreamId {
                    ms_time,
                    sequence: 0,
                })
            }
        }
    }

    /// Parses an `XRANGE` bound. `-` and `+` are the open sentinels; a bare
    /// millisecond time defaults the sequence to 0 for a start bound and to
    /// the maximum for an end bound.
    pub fn parse_range_bound(input: &str, is_start: bool) -> Result<StreamId, StreamError> {
        match input {
            "-" => Ok(StreamId::ZERO),
            "+" => Ok(StreamId::MAX),
            _ => {
                if input.contains('-') {
                    StreamId::parse(input)
                } else {
                    let ms_time = input.parse::<u64>().map_err(|_| StreamError::MalformedId)?;
                    let sequence = if is_start { 0 } else { u64::MAX };
                    Ok(StreamId { ms_time, sequence })
                }
            }
        }
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.ms_time, self.sequence)
    }
}

/// One stream entry: an id plus a flat, even-length field/value sequence.
/// Pairing is positional, preserving the order the client supplied; names and
/// values are raw bytes, never validated as text.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamEntry {
    pub id: StreamId,
    pub fields: Vec<Vec<u8>>,
}

/// How the caller specified the id of a new entry.
#[derive(Debug, PartialEq)]
enum IdSpec {
    /// `*`: take the current millisecond time, sequence after the stream top.
    Auto,
    /// `<ms>-*`: explicit time, generated sequence.
    AutoSequence(u64),
    Explicit(StreamId),
}

impl IdSpec {
    fn parse(input: &str) -> Result<IdSpec, StreamError> {
        if input == "*" {
            return Ok(IdSpec::Auto);
        }

        if let Some(ms_part) = input.strip_suffix("-*") {
            let ms_time = ms_part.parse::<u64>().map_err(|_| StreamError::MalformedId)?;
            return Ok(IdSpec::AutoSequence(ms_time));
        }

        Ok(IdSpec::Explicit(StreamId::parse(input)?))
    }
}

#[derive(Debug, Default)]
pub struct StreamStore {
    streams: Mutex<HashMap<String, Vec<StreamEntry>>>,
    appended: Notify,
}

impl StreamStore {
    pub fn new() -> Self {
        StreamStore {
            streams: Mutex::new(HashMap::new()),
            appended: Notify::new(),
        }
    }

    /// Appends an entry, resolving the id spec against the stream's current
    /// top entry, and wakes every blocked reader.
    pub async fn add(
        &self,
        key: &str,
        id_spec: &str,
        fields: Vec<Vec<u8>>,
    ) -> Result<StreamId, StreamError> {
        let spec = IdSpec::parse(id_spec)?;

        {
            let mut streams = self.streams.lock().await;
            let entries = streams.entry(key.to_string()).or_default();
            let last_id = entries.last().map(|entry| entry.id);

            let id = resolve_id(spec, last_id)?;

            entries.push(StreamEntry { id, fields });

            // Wake waiters only after the entry is visible; dropping the lock
            // first is not required because notified futures re-acquire it.
            self.appended.notify_waiters();

            Ok(id)
        }
    }

    /// All entries with `start <= id <= end`, in stream order.
    pub async fn range(&self, key: &str, start: StreamId, end: StreamId) -> Vec<StreamEntry> {
        let streams = self.streams.lock().await;

        streams
            .get(key)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|entry| entry.id >= start && entry.id <= end)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// All entries strictly newer than `horizon`, in stream order.
    pub async fn entries_after(&self, key: &str, horizon: StreamId) -> Vec<StreamEntry> {
        let streams = self.streams.lock().await;

        streams
            .get(key)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|entry| entry.id > horizon)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Id of the newest entry, if the stream exists and is non-empty.
    pub async fn last_id(&self, key: &str) -> Option<StreamId> {
        let streams = self.streams.lock().await;
        streams.get(key).and_then(|entries| entries.last()).map(|entry| entry.id)
    }

    pub async fn contains_key(&self, key: &str) -> bool {
        let streams = self.streams.lock().await;
        streams.contains_key(key)
    }

    /// Removes a whole stream. Only used when a write of another type
    /// overwrites the key, preserving the one-store-per-key invariant.
    pub async fn remove(&self, key: &str) -> bool {
        let mut streams = self.streams.lock().await;
        streams.remove(key).is_some()
    }

    /// A future resolving on the next append to any stream. Callers must
    /// enable the future before re-checking state so no append slips between
    /// the check and the wait.
    pub fn append_notified(&self) -> Notified<'_> {
        self.appended.notified()
    }
}

fn resolve_id(spec: IdSpec, last_id: Option<StreamId>) -> Result<StreamId, StreamError> {
    match spec {
        IdSpec::Auto => {
            let now_ms = Timestamp::now().as_millisecond().max(0) as u64;

            match last_id {
                Some(last) if last.ms_time == now_ms => Ok(StreamId::new(now_ms, last.sequence + 1)),
                _ => Ok(StreamId::new(now_ms, 0)),
            }
        }
        IdSpec::AutoSequence(ms_time) => {
            let sequence = match last_id {
                Some(last) if last.ms_time == ms_time => last.sequence + 1,
                // Time zero starts at sequence 1 because 0-0 is never a valid id.
                _ if ms_time == 0 => 1,
                _ => 0,
            };

            Ok(StreamId::new(ms_time, sequence))
        }
        IdSpec::Explicit(id) => {
            if id == StreamId::ZERO {
                return Err(StreamError::IdZero);
            }

            if let Some(last) = last_id {
                if id <= last {
                    return Err(StreamError::IdNotGreater);
                }
            }

            Ok(id)
        }
    }
}

pub mod stream_store;
pub mod string_store;

pub use stream_store::{StreamEntry, StreamId, StreamStore};
pub use string_store::{StringStore, StringStoreError};

/*!
The storage adapter interface (declarations only — see the crate-level
docs). A concrete adapter persists encoded bundles and active-bundle slots
under an opaque `u64` storage id; RAM, file and flash backends each
implement this trait outside this crate.
*/

use crate::error::Error;
use alloc::vec::Vec;

/// Persists and retrieves encoded bundles (or administrative-record
/// payloads) by opaque storage id. Every method runs to completion on the
/// caller's execution context; `create` is the only one that may block, for
/// up to `timeout` milliseconds (`-1` for infinite, `0` for immediate).
pub trait StorageAdapter {
    /// Writes `bytes` as a new record, returning the storage id assigned to
    /// it. `is_record` distinguishes an administrative-record payload (e.g.
    /// an outgoing ACS) from an ordinary bundle, for backends that track
    /// them separately.
    fn create(&mut self, is_record: bool, bytes: &[u8], timeout: i64) -> Result<u64, Error>;

    /// Marks a previously created storage id as ready for delivery, making
    /// it visible to [`StorageAdapter::dequeue`].
    fn enqueue(&mut self, sid: u64) -> Result<(), Error>;

    /// Takes the next enqueued storage id, if any, removing it from the
    /// ready queue.
    fn dequeue(&mut self) -> Result<Option<u64>, Error>;

    /// Reads back the bytes stored under `sid` without affecting its queue
    /// state.
    fn retrieve(&self, sid: u64) -> Result<Vec<u8>, Error>;

    /// Releases a storage id back to the adapter once its bundle has been
    /// fully processed (delivered, forwarded, or acknowledged), without
    /// necessarily freeing the underlying storage immediately.
    fn release(&mut self, sid: u64) -> Result<(), Error>;

    /// Frees the underlying storage for `sid` permanently.
    fn relinquish(&mut self, sid: u64) -> Result<(), Error>;

    /// The number of records currently held by the adapter.
    fn getcount(&self) -> usize;
}

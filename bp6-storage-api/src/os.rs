/*!
The OS abstraction surface (declarations only — see the crate-level docs):
locking, timed waits, the system clock, randomness, and a process-wide log
flag mask. A concrete implementation maps these onto a host's native
primitives (a pthread mutex/condvar pair, a CMSIS-RTOS semaphore, ...).

Handles are opaque `u32`s resolved through the implementer's own
fixed-size table, mirroring how [`crate::storage::StorageAdapter`] indexes
records by an opaque storage id rather than exposing a pointer.
*/

use crate::error::Error;

/// The result of a timed wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitResult {
    /// The handle was signalled before the timeout elapsed.
    Signalled,
    /// The timeout elapsed without a signal.
    TimedOut,
}

/// A timeout in milliseconds for [`OsAbstraction::waiton`]: `Infinite` blocks
/// forever, `Immediate` polls without blocking, `Millis(n)` waits up to `n`
/// milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeout {
    Infinite,
    Immediate,
    Millis(u32),
}

impl Timeout {
    /// Maps the core's wire convention (`-1` infinite, `0` immediate,
    /// positive milliseconds) onto a [`Timeout`].
    pub fn from_millis(timeout: i64) -> Self {
        match timeout {
            t if t < 0 => Timeout::Infinite,
            0 => Timeout::Immediate,
            t => Timeout::Millis(t as u32),
        }
    }
}

/// Suspension, timing, randomness and diagnostics primitives the core
/// borrows from the host. Only [`OsAbstraction::waiton`] and a storage
/// adapter's `create` may block; nothing else in the core suspends.
pub trait OsAbstraction {
    /// Allocates a new recursive lock, returning its handle.
    fn createlock(&mut self) -> Result<u32, Error>;

    /// Releases a lock handle permanently. The lock must be unlocked.
    fn destroylock(&mut self, handle: u32) -> Result<(), Error>;

    fn lock(&self, handle: u32) -> Result<(), Error>;

    fn unlock(&self, handle: u32) -> Result<(), Error>;

    /// Wakes one waiter blocked in [`OsAbstraction::waiton`] on `handle`.
    fn signal(&self, handle: u32) -> Result<(), Error>;

    /// Blocks the caller on `handle` until signalled or `timeout` elapses.
    fn waiton(&self, handle: u32, timeout: Timeout) -> Result<WaitResult, Error>;

    /// Seconds since the epoch used throughout this crate (2000-01-01
    /// 00:00:00 UTC), or `None` if the clock cannot be trusted — the core
    /// degrades to the unreliable-clock sentinel in that case.
    fn now(&self) -> Option<u64>;

    /// A source of randomness for jittering retransmission timers and the
    /// like. Not used for anything security-sensitive: this crate performs
    /// integrity checking only, never encryption.
    fn random_u64(&self) -> u64;
}

bitflags::bitflags! {
    /// The process-wide log flag mask gating which diagnostic categories a
    /// host actually wants surfaced, independent of the `tracing` level
    /// filter the embedding application installs.
    #[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LogFlags: u32 {
        const CODEC      = 1 << 0;
        const CUSTODY    = 1 << 1;
        const STORAGE    = 1 << 2;
        const DISPATCH   = 1 << 3;
    }
}

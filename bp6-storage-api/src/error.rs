use thiserror::Error as ThisError;

/// Errors a concrete storage or OS adapter returns to the core. The core
/// itself never constructs these; it only propagates them.
#[derive(ThisError, Debug)]
pub enum Error {
    #[error("storage adapter rejected the operation")]
    StoreFailure,

    #[error("no storage slot exists for id {0}")]
    UnknownStorageId(u64),

    #[error("lock handle {0} is not registered")]
    UnknownLock(u32),

    #[error("lock-of-locks table is full")]
    LockTableFull,
}

#![cfg_attr(not(feature = "std"), no_std)]

//! Storage adapter and OS abstraction traits consumed by `bp6-core`.
//!
//! This crate declares interfaces only: no RAM/file/flash storage backend,
//! no lock or condvar implementation, ships here. An embedding application
//! implements [`storage::StorageAdapter`] and [`os::OsAbstraction`] against
//! its own platform and passes them to `bp6-core`'s `send`/`receive` entry
//! points.

extern crate alloc;

pub mod error;
pub mod os;
pub mod storage;

pub use error::Error;
pub use os::{LogFlags, OsAbstraction, Timeout, WaitResult};
pub use storage::StorageAdapter;

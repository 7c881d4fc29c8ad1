#![cfg_attr(not(feature = "std"), no_std)]

//! Core of a Bundle Protocol version 6 (BPv6, RFC 5050) engine: the wire
//! codec, integrity subsystem, lifecycle dispatcher and custody tracking
//! engine. Storage backends, an OS abstraction, transport and a BPv7 CBOR
//! codec are deliberately not part of this crate; see `bp6-storage-api` for
//! the interfaces an embedding application implements.
//!
//! This crate is synchronous and allocation-only: every public operation
//! runs to completion on its caller's execution context, and the only
//! dynamic allocation is `alloc::vec::Vec` used for extension-block
//! pass-through bytes and the custody engine's arena-backed structures.

extern crate alloc;

pub mod bib;
pub mod block;
pub mod bundle;
pub mod crc;
pub mod custody;
pub mod cteb;
pub mod eid;
pub mod error;
pub mod flags;
pub mod payload_block;
pub mod primary_block;
pub mod sdnv;
pub mod time;

pub use bundle::{build, create, Attributes, Bundle, BundleData, BundleId, Route};
pub use custody::CustodyEngine;
pub use eid::Eid;
pub use error::{Disposition, Error, ErrorFlags, Flagged};

/*!
This module defines the composite error-reporting model used throughout the
crate: a `thiserror`-based [`Error`] enum for hard failures, an [`ErrorFlags`]
bitmask that accumulates soft anomalies alongside both success and failure,
and [`Disposition`], the set of successor-action codes a caller receives when
a bundle has been parsed but not yet fully handled.

Two reporting channels coexist deliberately, mirroring the flag-word plus
return-code pattern of the engine this crate implements: a flag word can be
set on a value that still decoded successfully (an unknown extension block
that had `FORWARDNOPROC` applied, say), while a hard `Error` always carries
the flags that led up to it.
*/

use alloc::boxed::Box;
use thiserror::Error as ThisError;

bitflags::bitflags! {
    /// Anomaly flags accumulated alongside any operation in this crate.
    ///
    /// These correspond one-to-one with the error flag bitmask in RFC 5050
    /// engines: a parse, cipher, clock, or storage anomaly sets a bit here
    /// without necessarily aborting the operation that observed it.
    #[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ErrorFlags: u32 {
        /// An extension block violated its declared processing semantics.
        const NONCOMPLIANT            = 1 << 0;
        /// A bundle or block was dropped as a result of processing.
        const DROPPED                 = 1 << 1;
        /// A bundle exceeded the maximum encodable or configured length.
        const BUNDLE_TOO_LARGE        = 1 << 2;
        /// An administrative record had an unrecognised record type.
        const UNKNOWNREC              = 1 << 3;
        /// A BIB cipher suite id was not recognised.
        const INVALID_CIPHER_SUITEID  = 1 << 4;
        /// A BIB security-result-type did not match the integrity signature constant.
        const INVALID_BIB_RESULT_TYPE = 1 << 5;
        /// A BIB security-target-type did not match the payload block type.
        const INVALID_BIB_TARGET_TYPE = 1 << 6;
        /// A block or bundle failed to parse.
        const FAILED_TO_PARSE         = 1 << 7;
        /// The caller supplied invalid arguments.
        const API_ERROR               = 1 << 8;
        /// An SDNV value did not fit in its declared or encodable width.
        const SDNV_OVERFLOW           = 1 << 9;
        /// An SDNV terminated before its final (high-bit-clear) byte.
        const SDNV_INCOMPLETE         = 1 << 10;
        /// The system clock is not considered reliable.
        const UNRELIABLE_TIME         = 1 << 11;
        /// A storage adapter operation failed.
        const STORE_FAILURE           = 1 << 12;
        /// A BIB integrity check did not match the received payload.
        const FAILED_INTEGRITY_CHECK  = 1 << 13;
        /// A bundle arrived on a channel other than the one its destination service names.
        const ROUTE_NEEDED            = 1 << 14;
        /// A buffer ended before a value could be fully parsed.
        const INCOMPLETE              = 1 << 15;
        /// A diagnostic-only condition, logged but not actionable.
        const DIAGNOSTIC              = 1 << 16;
    }
}

/// A successor-action code returned to the caller once a bundle has been
/// parsed. These are not errors: each one tells the caller what to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// The payload is addressed to the local node and should be delivered locally.
    PendingAcceptance,
    /// The bundle must be forwarded; its header has been rebuilt for re-send.
    PendingForward,
    /// The payload is an administrative record containing an ACS; decode it with the DACS codec.
    PendingAcknowledgment,
    /// The bundle is destined for a local node but the wrong channel/service received it.
    RouteNeeded,
    /// The bundle's lifetime has elapsed.
    PendingExpiration,
}

/// A value computed successfully, together with any anomaly flags raised
/// while computing it. Used where the operation did not fail outright but
/// still has something worth surfacing to the caller (e.g. a forwarded
/// bundle whose header contained a non-fatal unrecognised block).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flagged<T> {
    pub value: T,
    pub flags: ErrorFlags,
}

impl<T> Flagged<T> {
    pub fn new(value: T, flags: ErrorFlags) -> Self {
        Self { value, flags }
    }

    pub fn ok(value: T) -> Self {
        Self {
            value,
            flags: ErrorFlags::empty(),
        }
    }
}

/// The primary error type for this crate.
#[derive(ThisError, Debug)]
pub enum Error {
    /// An SDNV ran off the end of its buffer before a terminating byte.
    #[error("SDNV truncated before terminating byte")]
    SdnvIncomplete,

    /// The primary block's protocol version was not 6.
    #[error("unsupported bundle protocol version {0}")]
    InvalidVersion(u64),

    /// A primary block declared a non-zero dictionary length; dictionary
    /// compressed EIDs are not supported.
    #[error("non-zero dictionary length {0} is not supported")]
    DictionaryNotSupported(u64),

    /// A bundle's encoded header exceeded the fixed header buffer.
    #[error("bundle too large: encoded header is {0} bytes, maximum is {1}")]
    BundleTooLarge(usize, usize),

    /// A BIB's security-target-type did not name the payload block.
    #[error("BIB security-target-type {0} does not match the payload block type")]
    InvalidBibTargetType(u64),

    /// A BIB's security-result-type did not equal the integrity-signature constant.
    #[error("BIB security-result-type {0} is not the integrity signature")]
    InvalidBibResultType(u64),

    /// A cipher suite id was not recognised.
    #[error("unrecognised cipher suite id {0}")]
    InvalidCipherSuite(u64),

    /// The number of unrecognised extension blocks exceeded the exclude-region bound.
    #[error("too many exclude regions (maximum {0})")]
    TooManyExcludeRegions(usize),

    /// An administrative record's payload was shorter than the minimum two bytes.
    #[error("administrative record payload too short ({0} bytes)")]
    AdminRecordTooShort(usize),

    /// An administrative record named a record type this engine recognises
    /// but explicitly rejects (status report or non-aggregate custody
    /// signal; §1 "custody signals beyond ACS are explicitly rejected").
    #[error("administrative record type {0:#04x} is not supported")]
    NonCompliantRecordType(u8),

    /// An administrative record named a record type this engine does not recognise at all.
    #[error("unknown administrative record type {0:#04x}")]
    UnknownRecordType(u8),

    /// A storage adapter call returned failure.
    #[error("storage adapter failure")]
    StoreFailure,

    /// The received payload failed its BIB integrity check.
    #[error("bundle integrity check failed")]
    FailedIntegrityCheck,

    /// An unrecognised extension block's flags required deleting the whole
    /// bundle rather than merely excluding the block.
    #[error("block type {0} could not be processed and required bundle deletion")]
    BlockUnprocessable(u8),

    /// A generic field-level parse failure, carrying the field name and the source error.
    #[error("failed to parse {field}: {source}")]
    InvalidField {
        field: &'static str,
        source: Box<dyn core::error::Error + Send + Sync>,
    },

    /// An error from the endpoint identifier parser.
    #[error(transparent)]
    InvalidEid(#[from] crate::eid::Error),

    /// An error from the CRC engine.
    #[error(transparent)]
    InvalidCrc(#[from] crate::crc::Error),
}

/// Trait for error types that can represent a named-field parse failure.
pub trait HasInvalidField: Sized {
    fn invalid_field(field: &'static str, source: Box<dyn core::error::Error + Send + Sync>) -> Self;
}

impl HasInvalidField for Error {
    fn invalid_field(field: &'static str, source: Box<dyn core::error::Error + Send + Sync>) -> Self {
        Error::InvalidField { field, source }
    }
}

/// Extension trait for attaching a field name to a `Result`'s error, used
/// pervasively while walking a block's SDNV fields in declared order.
pub trait CaptureFieldErr<T> {
    fn map_field_err<E: HasInvalidField>(self, field: &'static str) -> Result<T, E>;
}

impl<T, Err> CaptureFieldErr<T> for Result<T, Err>
where
    Err: Into<Box<dyn core::error::Error + Send + Sync>>,
{
    fn map_field_err<E: HasInvalidField>(self, field: &'static str) -> Result<T, E> {
        self.map_err(|e| E::invalid_field(field, e.into()))
    }
}

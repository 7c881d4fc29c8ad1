/*!
This module provides the two CRC cipher suites a Bundle Integrity Block can
name: CRC-16/X-25 and CRC-32/Castagnoli. Both are table-driven; the tables
are built once, at compile time, via `const` construction of the `crc` crate's
digest tables rather than on every call.
*/

use alloc::vec::Vec;
use thiserror::Error;

const X25: ::crc::Crc<u16> = ::crc::Crc::<u16>::new(&::crc::CRC_16_IBM_SDLC);
const CASTAGNOLI: ::crc::Crc<u32> = ::crc::Crc::<u32>::new(&::crc::CRC_32_ISCSI);

/// Errors raised by the CRC engine.
#[derive(Error, Debug)]
pub enum Error {
    /// The cipher-suite-id named in a BIB is not one this engine supports.
    #[error("unrecognised cipher suite id {0}")]
    InvalidSuite(u64),

    /// The security-result-data length did not match the suite's result width.
    #[error("expected a {0}-byte CRC result, got {1} bytes")]
    InvalidLength(usize, usize),

    /// The computed CRC did not match the value carried in the BIB.
    #[error("integrity check failed")]
    Mismatch,
}

/// The cipher suites a BIB may name, per §4.3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherSuite {
    Crc16X25,
    Crc32Castagnoli,
}

impl CipherSuite {
    /// The canonical BPv6 cipher-suite-id wire value.
    pub fn id(self) -> u64 {
        match self {
            CipherSuite::Crc16X25 => 1,
            CipherSuite::Crc32Castagnoli => 2,
        }
    }

    /// The byte width of this suite's security-result-data.
    pub fn result_width(self) -> usize {
        match self {
            CipherSuite::Crc16X25 => 2,
            CipherSuite::Crc32Castagnoli => 4,
        }
    }

    pub fn from_id(id: u64) -> Result<Self, Error> {
        match id {
            1 => Ok(CipherSuite::Crc16X25),
            2 => Ok(CipherSuite::Crc32Castagnoli),
            v => Err(Error::InvalidSuite(v)),
        }
    }
}

/// A computed CRC result, tagged by the suite that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrcValue {
    Crc16(u16),
    Crc32(u32),
}

impl CrcValue {
    pub fn to_be_bytes_vec(self) -> alloc::vec::Vec<u8> {
        match self {
            CrcValue::Crc16(v) => v.to_be_bytes().to_vec(),
            CrcValue::Crc32(v) => v.to_be_bytes().to_vec(),
        }
    }
}

/// Computes the CRC of `payload` under the given cipher suite.
///
/// This is called once per fragment, over the fragment's payload bytes, with
/// the result written into the BIB's security-result field at the offset
/// reserved for it during layout (see [`crate::bib`]).
pub fn update(suite: CipherSuite, payload: &[u8]) -> CrcValue {
    match suite {
        CipherSuite::Crc16X25 => CrcValue::Crc16(X25.checksum(payload)),
        CipherSuite::Crc32Castagnoli => CrcValue::Crc32(CASTAGNOLI.checksum(payload)),
    }
}

/// Recomputes the CRC of `payload` and compares it against the bytes
/// received in the BIB's security-result-data.
pub fn verify(suite: CipherSuite, payload: &[u8], expected: &[u8]) -> Result<(), Error> {
    if expected.len() != suite.result_width() {
        return Err(Error::InvalidLength(suite.result_width(), expected.len()));
    }
    let computed = update(suite, payload);
    let matches = match computed {
        CrcValue::Crc16(v) => v.to_be_bytes() == expected,
        CrcValue::Crc32(v) => v.to_be_bytes() == expected,
    };
    if matches { Ok(()) } else { Err(Error::Mismatch) }
}

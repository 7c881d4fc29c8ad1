/*!
This module encodes and parses the Bundle Integrity Block (BIB): a single
security-target entry naming the payload block, a cipher suite id, and a
security-result field carrying the CRC computed over the payload.

The security-result-data bytes are written with a frozen width (2 or 4,
fixed by the cipher suite) so that [`update`] can be called again after a
fragment's payload is known, patching the CRC in place without moving the
payload block that follows it.
*/

use crate::block::{self, BIB_BLOCK_TYPE, PAYLOAD_BLOCK_TYPE};
use crate::crc::{self, CipherSuite};
use crate::error::{CaptureFieldErr, Error, ErrorFlags};
use crate::flags::BlockFlags;
use crate::sdnv;
use core::ops::Range;

/// The security-result-type value meaning "integrity signature" (a CRC, in
/// this engine — no asymmetric signatures are implemented).
pub const INTEGRITY_SIGNATURE_RESULT_TYPE: u64 = 1;

/// The decoded contents of a BIB.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bib {
    pub flags: BlockFlags,
    pub cipher_suite: CipherSuite,
    pub cipher_suite_flags: u64,
}

/// The frozen location of the BIB's security-result-data, used by
/// [`update`] to patch the CRC once the target payload is known.
#[derive(Debug, Clone, Copy)]
pub struct Layout {
    pub result_data: Range<usize>,
    pub end: usize,
}

/// Emits a BIB at `*index`, reserving (but not yet filling in) the
/// security-result-data bytes.
pub fn emit(bib: &Bib, buf: &mut [u8], index: &mut usize, eflags: &mut ErrorFlags) -> Result<Layout, Error> {
    let result_width = bib.cipher_suite.result_width();
    // security_target_count(1) + security_target_type(1) + cipher_suite_id(1)
    // + cipher_suite_flags(1) + compound_length(1) + result_type(1) + result_length(1) + result_data
    let data_len = 7 + result_width as u64;

    block::write_header(
        buf,
        index,
        block::Header {
            block_type: BIB_BLOCK_TYPE,
            flags: bib.flags,
        },
        data_len,
        eflags,
    )?;

    let mut target_count = sdnv::Field::new(1, *index);
    sdnv::write(buf, &mut target_count, eflags)?;
    *index = target_count.index;

    let mut target_type = sdnv::Field::new(PAYLOAD_BLOCK_TYPE as u64, *index);
    sdnv::write(buf, &mut target_type, eflags)?;
    *index = target_type.index;

    let mut suite_id = sdnv::Field::new(bib.cipher_suite.id(), *index);
    sdnv::write(buf, &mut suite_id, eflags)?;
    *index = suite_id.index;

    let mut suite_flags = sdnv::Field::new(bib.cipher_suite_flags, *index);
    sdnv::write(buf, &mut suite_flags, eflags)?;
    *index = suite_flags.index;

    let compound_len = 2 + result_width as u64; // result_type + result_length + result_data
    let mut compound_length = sdnv::Field::new(compound_len, *index);
    sdnv::write(buf, &mut compound_length, eflags)?;
    *index = compound_length.index;

    let mut result_type = sdnv::Field::new(INTEGRITY_SIGNATURE_RESULT_TYPE, *index);
    sdnv::write(buf, &mut result_type, eflags)?;
    *index = result_type.index;

    let mut result_length = sdnv::Field::new(result_width as u64, *index);
    sdnv::write(buf, &mut result_length, eflags)?;
    *index = result_length.index;

    let start = *index;
    let end = start + result_width;
    if end > buf.len() {
        return Err(Error::BundleTooLarge(end, buf.len()));
    }
    buf[start..end].fill(0);
    *index = end;

    Ok(Layout {
        result_data: start..end,
        end: *index,
    })
}

/// Computes the CRC over `payload` and writes it into the BIB's reserved
/// security-result-data span. Called once per fragment, after the
/// fragment's payload bytes are known.
pub fn update(buf: &mut [u8], layout: &Layout, suite: CipherSuite, payload: &[u8]) {
    let bytes = crc::update(suite, payload).to_be_bytes_vec();
    buf[layout.result_data.clone()].copy_from_slice(&bytes);
}

/// Verifies the BIB's security-result-data against a freshly computed CRC
/// over `payload`.
pub fn verify(buf: &[u8], layout: &Layout, suite: CipherSuite, payload: &[u8]) -> Result<(), Error> {
    crc::verify(suite, payload, &buf[layout.result_data.clone()]).map_err(Into::into)
}

/// Parses a BIB starting at `*index`. Fails if the security-target-type is
/// not the payload block, the security-result-type is not the integrity
/// signature constant, or the cipher suite id is unrecognised.
pub fn parse(buf: &[u8], index: &mut usize, eflags: &mut ErrorFlags) -> Result<(Bib, Layout), Error> {
    let (header, _data_len) = block::read_header(buf, index, eflags)?;

    let mut target_count = sdnv::Field::new(0, *index);
    sdnv::read(buf, &mut target_count, eflags).map_field_err("security target count")?;
    *index = target_count.index;

    let mut target_type = sdnv::Field::new(0, *index);
    sdnv::read(buf, &mut target_type, eflags).map_field_err("security target type")?;
    *index = target_type.index;
    if target_type.value != PAYLOAD_BLOCK_TYPE as u64 {
        eflags.insert(ErrorFlags::INVALID_BIB_TARGET_TYPE);
        return Err(Error::InvalidBibTargetType(target_type.value));
    }

    let mut suite_id = sdnv::Field::new(0, *index);
    sdnv::read(buf, &mut suite_id, eflags).map_field_err("cipher suite id")?;
    *index = suite_id.index;
    let cipher_suite = CipherSuite::from_id(suite_id.value).map_err(|_| {
        eflags.insert(ErrorFlags::INVALID_CIPHER_SUITEID);
        Error::InvalidCipherSuite(suite_id.value)
    })?;

    let mut suite_flags = sdnv::Field::new(0, *index);
    sdnv::read(buf, &mut suite_flags, eflags).map_field_err("cipher suite flags")?;
    *index = suite_flags.index;

    let mut compound_length = sdnv::Field::new(0, *index);
    sdnv::read(buf, &mut compound_length, eflags).map_field_err("compound length")?;
    *index = compound_length.index;

    let mut result_type = sdnv::Field::new(0, *index);
    sdnv::read(buf, &mut result_type, eflags).map_field_err("security result type")?;
    *index = result_type.index;
    if result_type.value != INTEGRITY_SIGNATURE_RESULT_TYPE {
        eflags.insert(ErrorFlags::INVALID_BIB_RESULT_TYPE);
        return Err(Error::InvalidBibResultType(result_type.value));
    }

    let mut result_length = sdnv::Field::new(0, *index);
    sdnv::read(buf, &mut result_length, eflags).map_field_err("security result length")?;
    *index = result_length.index;

    let start = *index;
    let end = start + result_length.value as usize;
    if end > buf.len() {
        return Err(Error::SdnvIncomplete);
    }
    *index = end;

    Ok((
        Bib {
            flags: header.flags,
            cipher_suite,
            cipher_suite_flags: suite_flags.value,
        },
        Layout {
            result_data: start..end,
            end,
        },
    ))
}

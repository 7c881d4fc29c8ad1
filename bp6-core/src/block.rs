/*!
This module defines the shared extension-block header format (block type
code, processing flags, block data length) used by CTEB, BIB, and any
unrecognised block walked during receive, and the fixed-capacity exclude
region list used to drop unrecognised blocks from a forwarded bundle's
rebuilt header (§4.4 step 4).
*/

use crate::error::{Error, ErrorFlags};
use crate::flags::BlockFlags;
use crate::sdnv;
use core::ops::Range;

/// The payload block's canonical block type code.
pub const PAYLOAD_BLOCK_TYPE: u8 = 1;
/// The Custody Transfer Extension Block's canonical block type code.
pub const CTEB_BLOCK_TYPE: u8 = 0x0A;
/// The Bundle Integrity Block's canonical block type code.
pub const BIB_BLOCK_TYPE: u8 = 0x0D;

/// Administrative record type codes, carried as the first payload byte of
/// a bundle whose primary block sets `is_admin_rec` (§4.4 step 6). Encoded
/// in the RFC 5050 administrative-record convention of one type code per
/// nibble-aligned value; the aggregate custody signal is a widely deployed
/// extension beyond the two record types RFC 5050 itself defines.
pub const STAT_REC_TYPE: u8 = 0x10;
pub const CS_REC_TYPE: u8 = 0x20;
pub const ACS_REC_TYPE: u8 = 0x40;

/// The common prefix of every extension block: a one-byte type code
/// followed by an SDNV-encoded processing-flags field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub block_type: u8,
    pub flags: BlockFlags,
}

/// Parses an extension block's header (type code, flags, block data
/// length) starting at `*index`. Advances `*index` to the start of the
/// block-type-specific data and returns the declared data length.
///
/// Fails with [`Error::DictionaryNotSupported`]-shaped rejection is not
/// applicable here; instead, an EIDREF flag (requiring a compressed EID
/// dictionary this engine does not carry) is reported as
/// [`ErrorFlags::NONCOMPLIANT`] by the caller, since whether that is fatal
/// depends on the block's other flags (DELETENOPROC vs DROPNOPROC).
pub fn read_header(
    data: &[u8],
    index: &mut usize,
    eflags: &mut ErrorFlags,
) -> Result<(Header, u64), Error> {
    let Some(&block_type) = data.get(*index) else {
        eflags.insert(ErrorFlags::SDNV_INCOMPLETE);
        return Err(Error::SdnvIncomplete);
    };
    *index += 1;

    let mut flags_field = sdnv::Field::new(0, *index);
    sdnv::read(data, &mut flags_field, eflags)?;
    *index = flags_field.index;
    let flags = BlockFlags::from(flags_field.value);

    let mut len_field = sdnv::Field::new(0, *index);
    sdnv::read(data, &mut len_field, eflags)?;
    *index = len_field.index;

    Ok((Header { block_type, flags }, len_field.value))
}

/// Emits an extension block's header at `*index`, returning the index at
/// which the block-type-specific data should be written.
pub fn write_header(
    block: &mut [u8],
    index: &mut usize,
    header: Header,
    data_len: u64,
    eflags: &mut ErrorFlags,
) -> Result<(), Error> {
    if *index >= block.len() {
        eflags.insert(ErrorFlags::SDNV_INCOMPLETE);
        return Err(Error::SdnvIncomplete);
    }
    block[*index] = header.block_type;
    *index += 1;

    let mut flags_field = sdnv::Field::new(u64::from(header.flags), *index);
    sdnv::write(block, &mut flags_field, eflags)?;
    *index = flags_field.index;

    let mut len_field = sdnv::Field::new(data_len, *index);
    sdnv::write(block, &mut len_field, eflags)?;
    *index = len_field.index;

    Ok(())
}

/// A region of the source buffer that must not be copied into a rebuilt,
/// forwarded bundle — an unrecognised block whose flags demanded
/// DROPNOPROC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExcludeRegion {
    pub range: Range<usize>,
}

/// The maximum number of exclude regions tracked per receive (§4.4 step 4).
pub const MAX_EXCLUDE_REGIONS: usize = 16;

/// A fixed-capacity list of exclude regions. Exceeding the bound is a
/// non-compliant-bundle condition, not a panic.
#[derive(Debug, Default, Clone)]
pub struct ExcludeRegions {
    regions: [Option<ExcludeRegion>; MAX_EXCLUDE_REGIONS],
    len: usize,
}

impl ExcludeRegions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, region: ExcludeRegion) -> Result<(), Error> {
        if self.len >= MAX_EXCLUDE_REGIONS {
            return Err(Error::TooManyExcludeRegions(MAX_EXCLUDE_REGIONS));
        }
        self.regions[self.len] = Some(region);
        self.len += 1;
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExcludeRegion> {
        self.regions[..self.len].iter().filter_map(|r| r.as_ref())
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns `true` if `offset` falls within any tracked exclude region.
    pub fn excludes(&self, offset: usize) -> bool {
        self.iter().any(|r| r.range.contains(&offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trip() {
        let header = Header {
            block_type: CTEB_BLOCK_TYPE,
            flags: BlockFlags {
                lastblock: true,
                ..Default::default()
            },
        };
        let mut buf = [0u8; 16];
        let mut idx = 0;
        let mut eflags = ErrorFlags::empty();
        write_header(&mut buf, &mut idx, header, 5, &mut eflags).unwrap();

        let mut read_idx = 0;
        let (parsed, len) = read_header(&buf, &mut read_idx, &mut eflags).unwrap();
        assert_eq!(parsed, header);
        assert_eq!(len, 5);
        assert_eq!(read_idx, idx);
    }

    #[test]
    fn exclude_region_bound_enforced() {
        let mut regions = ExcludeRegions::new();
        for i in 0..MAX_EXCLUDE_REGIONS {
            regions.push(ExcludeRegion { range: i..i + 1 }).unwrap();
        }
        assert!(matches!(
            regions.push(ExcludeRegion { range: 99..100 }),
            Err(Error::TooManyExcludeRegions(MAX_EXCLUDE_REGIONS))
        ));
    }
}

/*!
This module encodes and parses the payload block: the terminal extension
block of every bundle, carrying the application payload. Its declared
block-length always equals the payload size — there is no separate
paysize field on the wire, just the shared header's data-length SDNV.

The parsed payload is a borrowed view into the source buffer: the caller
must keep that buffer alive until the bytes have been consumed or copied
elsewhere, exactly as a zero-copy block-level parse requires.
*/

use crate::block::{self, PAYLOAD_BLOCK_TYPE};
use crate::error::{Error, ErrorFlags};
use crate::flags::BlockFlags;
use core::ops::Range;

/// Emits a payload block at `*index`, copying `payload` into place.
/// Returns the byte range the payload occupies in `buf`.
pub fn emit(
    payload: &[u8],
    flags: BlockFlags,
    buf: &mut [u8],
    index: &mut usize,
    eflags: &mut ErrorFlags,
) -> Result<Range<usize>, Error> {
    block::write_header(
        buf,
        index,
        block::Header {
            block_type: PAYLOAD_BLOCK_TYPE,
            flags,
        },
        payload.len() as u64,
        eflags,
    )?;

    let start = *index;
    let end = start + payload.len();
    if end > buf.len() {
        return Err(Error::BundleTooLarge(end, buf.len()));
    }
    buf[start..end].copy_from_slice(payload);
    *index = end;
    Ok(start..end)
}

/// Parses a payload block starting at `*index`. Returns the block's flags
/// and a borrowed view of the payload bytes; `*index` is advanced past the
/// payload.
pub fn parse<'a>(
    buf: &'a [u8],
    index: &mut usize,
    eflags: &mut ErrorFlags,
) -> Result<(BlockFlags, &'a [u8]), Error> {
    let (header, data_len) = block::read_header(buf, index, eflags)?;
    let start = *index;
    let end = start + data_len as usize;
    if end > buf.len() {
        eflags.insert(ErrorFlags::SDNV_INCOMPLETE);
        return Err(Error::SdnvIncomplete);
    }
    *index = end;
    Ok((header.flags, &buf[start..end]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emit_then_parse_round_trips() {
        let mut buf = [0u8; 32];
        let mut eflags = ErrorFlags::empty();
        let mut idx = 0;
        let range = emit(b"HELLO", BlockFlags::default(), &mut buf, &mut idx, &mut eflags).unwrap();
        assert_eq!(&buf[range], b"HELLO");

        let mut pidx = 0;
        let (flags, payload) = parse(&buf, &mut pidx, &mut eflags).unwrap();
        assert_eq!(payload, b"HELLO");
        assert_eq!(flags, BlockFlags::default());
    }
}

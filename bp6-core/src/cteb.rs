/*!
This module encodes and parses the Custody Transfer Extension Block (CTEB):
block flags, block length, a custody ID, and the custodian endpoint
identifier carried both as node/service numbers and as its textual
`ipn:<node>.<service>` form.

The custody ID field is written with a frozen width so that `send`'s
per-fragment custody-ID assignment (§4.4 step 4) can patch it in place
without disturbing anything laid out after it.
*/

use crate::block::{self, CTEB_BLOCK_TYPE};
use crate::eid::Eid;
use crate::error::{CaptureFieldErr, Error, ErrorFlags};
use crate::flags::BlockFlags;
use crate::sdnv;
use alloc::string::ToString;

/// Width reserved for the custody ID, wide enough for any realistic
/// outstanding-custody window.
const CID_WIDTH: usize = 5;

/// The decoded contents of a CTEB.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cteb {
    pub flags: BlockFlags,
    pub custody_id: u64,
    pub custodian: Eid,
}

/// The frozen field of an emitted CTEB that is later patched in place: the
/// custody ID assigned at send time.
#[derive(Debug, Clone, Copy)]
pub struct Layout {
    pub custody_id: sdnv::Field,
    pub end: usize,
}

/// Emits a CTEB at `*index`.
pub fn emit(
    cteb: &Cteb,
    buf: &mut [u8],
    index: &mut usize,
    eflags: &mut ErrorFlags,
) -> Result<Layout, Error> {
    let custodian_text = cteb.custodian.to_string();
    let data_len = CID_WIDTH as u64 + sdnv::min_width(cteb.custodian.node) as u64
        + sdnv::min_width(cteb.custodian.service) as u64
        + 1
        + custodian_text.len() as u64;

    block::write_header(
        buf,
        index,
        block::Header {
            block_type: CTEB_BLOCK_TYPE,
            flags: cteb.flags,
        },
        data_len,
        eflags,
    )?;

    let mut custody_id = sdnv::Field::frozen(cteb.custody_id, *index, CID_WIDTH);
    sdnv::write(buf, &mut custody_id, eflags)?;
    *index = custody_id.index;

    let mut node = sdnv::Field::new(cteb.custodian.node, *index);
    sdnv::write(buf, &mut node, eflags)?;
    *index = node.index;

    let mut service = sdnv::Field::new(cteb.custodian.service, *index);
    sdnv::write(buf, &mut service, eflags)?;
    *index = service.index;

    let text_bytes = custodian_text.as_bytes();
    let start = *index;
    let end = start + text_bytes.len() + 1;
    if end > buf.len() {
        return Err(Error::BundleTooLarge(end, buf.len()));
    }
    buf[start..start + text_bytes.len()].copy_from_slice(text_bytes);
    buf[start + text_bytes.len()] = 0;
    *index = end;

    Ok(Layout {
        custody_id,
        end: *index,
    })
}

/// Parses a CTEB starting at `*index`.
pub fn parse(buf: &[u8], index: &mut usize, eflags: &mut ErrorFlags) -> Result<Cteb, Error> {
    let (header, data_len) = block::read_header(buf, index, eflags)?;
    let data_end = *index + data_len as usize;

    let mut custody_id = sdnv::Field::new(0, *index);
    sdnv::read(buf, &mut custody_id, eflags).map_field_err("custody ID")?;
    *index = custody_id.index;

    let mut node = sdnv::Field::new(0, *index);
    sdnv::read(buf, &mut node, eflags).map_field_err("custodian node number")?;
    *index = node.index;

    let mut service = sdnv::Field::new(0, *index);
    sdnv::read(buf, &mut service, eflags).map_field_err("custodian service number")?;
    *index = service.index;

    // The textual custodian EID occupies the remainder of the declared
    // block data, up to (and not including) its NUL terminator.
    *index = data_end;

    Ok(Cteb {
        flags: header.flags,
        custody_id: custody_id.value,
        custodian: Eid::new(node.value, service.value),
    })
}

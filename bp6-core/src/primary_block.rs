/*!
This module encodes and parses the BPv6 primary block: version, processing
control flags, block length, the four CBHE addressing pairs (destination,
source, report-to, custodian), creation timestamp, lifetime, dictionary
length, and (for fragments) fragment offset and total payload length.

Several fields are re-written in place after the header has already been
laid out: the creation timestamp is stamped at send time, and for fragmented
sends the fragment offset and total payload length change per fragment.
[`Layout`] records the frozen [`sdnv::Field`]s for each of these so a caller
can patch them without touching anything else.
*/

use crate::eid::Eid;
use crate::error::{CaptureFieldErr, Error, ErrorFlags};
use crate::flags::PrimaryFlags;
use crate::sdnv;

/// The only supported bundle protocol version.
pub const VERSION: u8 = 6;

/// Width reserved for the primary block's own SDNV-encoded length field,
/// frozen up front since the true length is only known after every other
/// field has been emitted.
const BLOCK_LENGTH_WIDTH: usize = 5;
/// Width reserved for the creation-time field, wide enough to hold either
/// sentinel (`u64::MAX` needs 10 SDNV bytes).
const CREATION_TIME_WIDTH: usize = 10;
/// Width reserved for the creation sequence number.
const CREATION_SEQ_WIDTH: usize = 5;
/// Width reserved for fragment offset / total payload length.
const FRAGMENT_FIELD_WIDTH: usize = 5;

/// The decoded contents of a primary block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrimaryBlock {
    pub flags: PrimaryFlags,
    pub dst: Eid,
    pub src: Eid,
    pub rpt: Eid,
    pub cst: Eid,
    pub creation_sec: u64,
    pub creation_seq: u64,
    pub lifetime: u64,
    pub fragment_offset: u64,
    pub total_payload_length: u64,
}

/// The frozen SDNV fields of an emitted primary block that later need
/// in-place re-encoding: the block's own length, the creation timestamp,
/// and (when fragmenting) the fragment offset and total payload length.
#[derive(Debug, Clone, Copy)]
pub struct Layout {
    pub block_length: sdnv::Field,
    pub creation_sec: sdnv::Field,
    pub creation_seq: sdnv::Field,
    pub fragment_offset: Option<sdnv::Field>,
    pub total_payload_length: Option<sdnv::Field>,
    pub end: usize,
}

fn emit_eid(buf: &mut [u8], index: &mut usize, eid: Eid, eflags: &mut ErrorFlags) -> Result<(), Error> {
    let mut node = sdnv::Field::new(eid.node, *index);
    sdnv::write(buf, &mut node, eflags)?;
    *index = node.index;
    let mut service = sdnv::Field::new(eid.service, *index);
    sdnv::write(buf, &mut service, eflags)?;
    *index = service.index;
    Ok(())
}

fn parse_eid(buf: &[u8], index: &mut usize, eflags: &mut ErrorFlags) -> Result<Eid, Error> {
    let mut node = sdnv::Field::new(0, *index);
    sdnv::read(buf, &mut node, eflags)?;
    *index = node.index;
    let mut service = sdnv::Field::new(0, *index);
    sdnv::read(buf, &mut service, eflags)?;
    *index = service.index;
    Ok(Eid::new(node.value, service.value))
}

/// Emits a primary block at `*index`, returning the [`Layout`] of its
/// mutable fields. `index-update mode` is always used here: this function
/// is only called to lay a block out fresh, never to re-encode one whose
/// offsets are already authoritative (that is what [`Layout`]'s fields are
/// for, via [`sdnv::write`] called directly by the caller).
pub fn emit(
    pb: &PrimaryBlock,
    buf: &mut [u8],
    index: &mut usize,
    eflags: &mut ErrorFlags,
) -> Result<Layout, Error> {
    let start = *index;
    if start >= buf.len() {
        return Err(Error::BundleTooLarge(start, buf.len()));
    }
    buf[start] = VERSION;
    *index += 1;

    let mut flags_field = sdnv::Field::new(u64::from(pb.flags), *index);
    sdnv::write(buf, &mut flags_field, eflags)?;
    *index = flags_field.index;

    // Reserve the block-length field; patched once the true length is known.
    let mut block_length = sdnv::Field::frozen(0, *index, BLOCK_LENGTH_WIDTH);
    sdnv::write(buf, &mut block_length, eflags)?;
    *index = block_length.index;
    let body_start = *index;

    emit_eid(buf, index, pb.dst, eflags)?;
    emit_eid(buf, index, pb.src, eflags)?;
    emit_eid(buf, index, pb.rpt, eflags)?;
    emit_eid(buf, index, pb.cst, eflags)?;

    let mut creation_sec = sdnv::Field::frozen(pb.creation_sec, *index, CREATION_TIME_WIDTH);
    sdnv::write(buf, &mut creation_sec, eflags)?;
    *index = creation_sec.index;

    let mut creation_seq = sdnv::Field::frozen(pb.creation_seq, *index, CREATION_SEQ_WIDTH);
    sdnv::write(buf, &mut creation_seq, eflags)?;
    *index = creation_seq.index;

    let mut lifetime = sdnv::Field::new(pb.lifetime, *index);
    sdnv::write(buf, &mut lifetime, eflags)?;
    *index = lifetime.index;

    // Dictionary length is always zero: no compressed EID dictionaries.
    let mut dictlen = sdnv::Field::new(0, *index);
    sdnv::write(buf, &mut dictlen, eflags)?;
    *index = dictlen.index;

    let (fragment_offset, total_payload_length) = if pb.flags.is_frag {
        let mut offset = sdnv::Field::frozen(pb.fragment_offset, *index, FRAGMENT_FIELD_WIDTH);
        sdnv::write(buf, &mut offset, eflags)?;
        *index = offset.index;

        let mut total = sdnv::Field::frozen(pb.total_payload_length, *index, FRAGMENT_FIELD_WIDTH);
        sdnv::write(buf, &mut total, eflags)?;
        *index = total.index;
        (Some(offset), Some(total))
    } else {
        (None, None)
    };

    // Patch the block-length field now that the body's length is known.
    block_length.value = (*index - body_start) as u64;
    sdnv::write(buf, &mut block_length, eflags)?;

    Ok(Layout {
        block_length,
        creation_sec,
        creation_seq,
        fragment_offset,
        total_payload_length,
        end: *index,
    })
}

/// Parses a primary block starting at `*index`, in index-update mode: field
/// offsets are discovered as the buffer is walked, matching receive
/// processing of an unfamiliar bundle.
pub fn parse(buf: &[u8], index: &mut usize, eflags: &mut ErrorFlags) -> Result<PrimaryBlock, Error> {
    let version = *buf.get(*index).ok_or(Error::SdnvIncomplete)?;
    *index += 1;
    if version != VERSION {
        return Err(Error::InvalidVersion(version as u64));
    }

    let mut flags_field = sdnv::Field::new(0, *index);
    sdnv::read(buf, &mut flags_field, eflags).map_field_err("processing control flags")?;
    *index = flags_field.index;
    let flags = PrimaryFlags::from(flags_field.value);

    let mut block_length = sdnv::Field::new(0, *index);
    sdnv::read(buf, &mut block_length, eflags).map_field_err("block length")?;
    *index = block_length.index;

    let dst = parse_eid(buf, index, eflags).map_field_err("destination EID")?;
    let src = parse_eid(buf, index, eflags).map_field_err("source EID")?;
    let rpt = parse_eid(buf, index, eflags).map_field_err("report-to EID")?;
    let cst = parse_eid(buf, index, eflags).map_field_err("custodian EID")?;

    let mut creation_sec = sdnv::Field::new(0, *index);
    sdnv::read(buf, &mut creation_sec, eflags).map_field_err("creation time")?;
    *index = creation_sec.index;

    let mut creation_seq = sdnv::Field::new(0, *index);
    sdnv::read(buf, &mut creation_seq, eflags).map_field_err("creation sequence")?;
    *index = creation_seq.index;

    let mut lifetime = sdnv::Field::new(0, *index);
    sdnv::read(buf, &mut lifetime, eflags).map_field_err("lifetime")?;
    *index = lifetime.index;

    let mut dictlen = sdnv::Field::new(0, *index);
    sdnv::read(buf, &mut dictlen, eflags).map_field_err("dictionary length")?;
    *index = dictlen.index;
    if dictlen.value != 0 {
        return Err(Error::DictionaryNotSupported(dictlen.value));
    }

    let (fragment_offset, total_payload_length) = if flags.is_frag {
        let mut offset = sdnv::Field::new(0, *index);
        sdnv::read(buf, &mut offset, eflags).map_field_err("fragment offset")?;
        *index = offset.index;

        let mut total = sdnv::Field::new(0, *index);
        sdnv::read(buf, &mut total, eflags).map_field_err("total payload length")?;
        *index = total.index;
        (offset.value, total.value)
    } else {
        (0, 0)
    };

    Ok(PrimaryBlock {
        flags,
        dst,
        src,
        rpt,
        cst,
        creation_sec: creation_sec.value,
        creation_seq: creation_seq.value,
        lifetime: lifetime.value,
        fragment_offset,
        total_payload_length,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PrimaryBlock {
        PrimaryBlock {
            flags: PrimaryFlags {
                cst_rqst: true,
                ..Default::default()
            },
            dst: Eid::new(20, 2),
            src: Eid::new(10, 1),
            rpt: Eid::new(10, 1),
            cst: Eid::new(10, 1),
            creation_sec: 100,
            creation_seq: 0,
            lifetime: 3600,
            fragment_offset: 0,
            total_payload_length: 0,
        }
    }

    #[test]
    fn emit_then_parse_round_trips() {
        let mut buf = [0u8; 128];
        let mut eflags = ErrorFlags::empty();
        let mut idx = 0;
        let layout = emit(&sample(), &mut buf, &mut idx, &mut eflags).unwrap();
        assert_eq!(layout.end, idx);

        let mut pidx = 0;
        let parsed = parse(&buf, &mut pidx, &mut eflags).unwrap();
        assert_eq!(parsed, sample());
        assert_eq!(pidx, idx);
        assert!(eflags.is_empty());
    }

    #[test]
    fn rejects_wrong_version() {
        let buf = [5u8, 0, 0];
        let mut eflags = ErrorFlags::empty();
        let mut idx = 0;
        assert!(matches!(
            parse(&buf, &mut idx, &mut eflags),
            Err(Error::InvalidVersion(5))
        ));
    }

    #[test]
    fn creation_timestamp_can_be_patched_in_place() {
        let mut buf = [0u8; 128];
        let mut eflags = ErrorFlags::empty();
        let mut idx = 0;
        let mut layout = emit(&sample(), &mut buf, &mut idx, &mut eflags).unwrap();

        layout.creation_sec.value = 999;
        sdnv::write(&mut buf, &mut layout.creation_sec, &mut eflags).unwrap();

        let mut pidx = 0;
        let parsed = parse(&buf, &mut pidx, &mut eflags).unwrap();
        assert_eq!(parsed.creation_sec, 999);
        assert_eq!(pidx, idx, "patch must not shift downstream offsets");
    }

    #[test]
    fn fragment_fields_round_trip() {
        let mut pb = sample();
        pb.flags.is_frag = true;
        pb.fragment_offset = 3;
        pb.total_payload_length = 7;

        let mut buf = [0u8; 128];
        let mut eflags = ErrorFlags::empty();
        let mut idx = 0;
        emit(&pb, &mut buf, &mut idx, &mut eflags).unwrap();

        let mut pidx = 0;
        let parsed = parse(&buf, &mut pidx, &mut eflags).unwrap();
        assert_eq!(parsed.fragment_offset, 3);
        assert_eq!(parsed.total_payload_length, 7);
    }
}

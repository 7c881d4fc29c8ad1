/*!
This module defines the two processing-control-flags bitmasks carried in
BPv6 wire format: the primary block's bundle processing flags (packing the
booleans and class-of-service listed in §3) and the extension-block
processing flags shared by CTEB, BIB, and any unrecognised block (§6).

Both are hand-unpacked bit-by-bit rather than derived via the `bitflags`
crate, because each is an SDNV-encoded field whose individual bits have
independent wire meaning and whose *unrecognised* bits must be preserved
and re-emitted unchanged — a shape `bitflags` does not model directly.
`ErrorFlags` (error.rs), which is never wire-encoded, uses `bitflags`
instead.
*/

/// Class of service, packed into two bits of the primary block's processing
/// control flags.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ClassOfService {
    #[default]
    Normal,
    Expedited,
    Extended,
}

impl From<u64> for ClassOfService {
    fn from(bits: u64) -> Self {
        match bits & 0b11 {
            1 => ClassOfService::Expedited,
            2 => ClassOfService::Extended,
            _ => ClassOfService::Normal,
        }
    }
}

impl From<ClassOfService> for u64 {
    fn from(cos: ClassOfService) -> Self {
        match cos {
            ClassOfService::Normal => 0,
            ClassOfService::Expedited => 1,
            ClassOfService::Extended => 2,
        }
    }
}

/// The primary block's processing control flags (pcf), §3 "Booleans decoded
/// from pcf".
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PrimaryFlags {
    pub is_frag: bool,
    pub is_admin_rec: bool,
    pub allow_frag: bool,
    pub cst_rqst: bool,
    pub ack_app: bool,
    pub cos: ClassOfService,
    /// Bits this implementation does not assign meaning to, preserved for
    /// faithful re-emission.
    pub unrecognised: u64,
}

const BIT_IS_FRAG: u64 = 1 << 0;
const BIT_IS_ADMIN_REC: u64 = 1 << 1;
const BIT_MUST_NOT_FRAGMENT: u64 = 1 << 2;
const BIT_CST_RQST: u64 = 1 << 3;
const BIT_ACK_APP: u64 = 1 << 5;
const COS_SHIFT: u64 = 7;
const COS_MASK: u64 = 0b11 << COS_SHIFT;

impl From<u64> for PrimaryFlags {
    fn from(value: u64) -> Self {
        let cos = ClassOfService::from((value & COS_MASK) >> COS_SHIFT);
        let known = BIT_IS_FRAG
            | BIT_IS_ADMIN_REC
            | BIT_MUST_NOT_FRAGMENT
            | BIT_CST_RQST
            | BIT_ACK_APP
            | COS_MASK;
        Self {
            is_frag: value & BIT_IS_FRAG != 0,
            is_admin_rec: value & BIT_IS_ADMIN_REC != 0,
            allow_frag: value & BIT_MUST_NOT_FRAGMENT == 0,
            cst_rqst: value & BIT_CST_RQST != 0,
            ack_app: value & BIT_ACK_APP != 0,
            cos,
            unrecognised: value & !known,
        }
    }
}

impl From<PrimaryFlags> for u64 {
    fn from(f: PrimaryFlags) -> Self {
        let mut value = f.unrecognised;
        if f.is_frag {
            value |= BIT_IS_FRAG;
        }
        if f.is_admin_rec {
            value |= BIT_IS_ADMIN_REC;
        }
        if !f.allow_frag {
            value |= BIT_MUST_NOT_FRAGMENT;
        }
        if f.cst_rqst {
            value |= BIT_CST_RQST;
        }
        if f.ack_app {
            value |= BIT_ACK_APP;
        }
        value |= u64::from(f.cos) << COS_SHIFT;
        value
    }
}

/// Extension-block processing control flags, §6.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BlockFlags {
    /// REPALL — block must be replicated in every fragment.
    pub repall: bool,
    /// NOTIFYNOPROC — log/report if block cannot be processed; not fatal.
    pub notifynoproc: bool,
    /// DELETENOPROC — delete the whole bundle if block cannot be processed.
    pub deletenoproc: bool,
    /// LASTBLOCK — this is the last block in the bundle.
    pub lastblock: bool,
    /// DROPNOPROC — discard just this block (exclude it from forwarding) if unprocessable.
    pub dropnoproc: bool,
    /// FORWARDNOPROC — this block was forwarded without being understood.
    pub forwardnoproc: bool,
    /// EIDREF — block contains an EID-reference field (dictionary compressed; unused here).
    pub eidref: bool,
    pub unrecognised: u64,
}

const BF_REPALL: u64 = 1 << 0;
const BF_NOTIFYNOPROC: u64 = 1 << 1;
const BF_DELETENOPROC: u64 = 1 << 2;
const BF_LASTBLOCK: u64 = 1 << 3;
const BF_DROPNOPROC: u64 = 1 << 4;
const BF_FORWARDNOPROC: u64 = 1 << 5;
const BF_EIDREF: u64 = 1 << 6;

impl From<u64> for BlockFlags {
    fn from(value: u64) -> Self {
        let known = BF_REPALL
            | BF_NOTIFYNOPROC
            | BF_DELETENOPROC
            | BF_LASTBLOCK
            | BF_DROPNOPROC
            | BF_FORWARDNOPROC
            | BF_EIDREF;
        Self {
            repall: value & BF_REPALL != 0,
            notifynoproc: value & BF_NOTIFYNOPROC != 0,
            deletenoproc: value & BF_DELETENOPROC != 0,
            lastblock: value & BF_LASTBLOCK != 0,
            dropnoproc: value & BF_DROPNOPROC != 0,
            forwardnoproc: value & BF_FORWARDNOPROC != 0,
            eidref: value & BF_EIDREF != 0,
            unrecognised: value & !known,
        }
    }
}

impl From<BlockFlags> for u64 {
    fn from(f: BlockFlags) -> Self {
        let mut value = f.unrecognised;
        if f.repall {
            value |= BF_REPALL;
        }
        if f.notifynoproc {
            value |= BF_NOTIFYNOPROC;
        }
        if f.deletenoproc {
            value |= BF_DELETENOPROC;
        }
        if f.lastblock {
            value |= BF_LASTBLOCK;
        }
        if f.dropnoproc {
            value |= BF_DROPNOPROC;
        }
        if f.forwardnoproc {
            value |= BF_FORWARDNOPROC;
        }
        if f.eidref {
            value |= BF_EIDREF;
        }
        value
    }
}

impl BlockFlags {
    /// True if this flag combination names at least one "unknown block"
    /// handling instruction recognised by receive processing (§4.4 step 4).
    pub fn has_unknown_block_instruction(&self) -> bool {
        self.dropnoproc || self.deletenoproc || self.notifynoproc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_flags_round_trip() {
        let f = PrimaryFlags {
            is_frag: true,
            is_admin_rec: false,
            allow_frag: true,
            cst_rqst: true,
            ack_app: false,
            cos: ClassOfService::Expedited,
            unrecognised: 0,
        };
        let bits: u64 = f.into();
        let back = PrimaryFlags::from(bits);
        assert_eq!(back, f);
    }

    #[test]
    fn unrecognised_bits_are_preserved() {
        let bits = 1 << 20;
        let f = PrimaryFlags::from(bits);
        assert_eq!(f.unrecognised, bits);
        let back: u64 = f.into();
        assert_eq!(back, bits);
    }

    #[test]
    fn block_flags_round_trip() {
        let f = BlockFlags {
            dropnoproc: true,
            lastblock: true,
            ..Default::default()
        };
        let bits: u64 = f.into();
        assert_eq!(BlockFlags::from(bits), f);
    }
}

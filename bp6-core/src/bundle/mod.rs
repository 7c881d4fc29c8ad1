/*!
This module defines the `Bundle` structure and the lifecycle operations that
orchestrate the block codecs: `create`/`build` lay a bundle's header out,
`send` serializes and (optionally) fragments an outgoing payload, and
`receive` parses an incoming bundle and dispatches it (§4.4).
*/

use crate::bib::{self, Bib};
use crate::block::BlockFlags;
use crate::crc::CipherSuite;
use crate::cteb::{self, Cteb};
use crate::eid::Eid;
use crate::error::{Error, ErrorFlags};
use crate::flags::{ClassOfService, PrimaryFlags};
use crate::primary_block::{self, PrimaryBlock};
use crate::sdnv;

mod receive;
mod send;

pub use receive::{receive, CustodyInfo, ReceiveOutcome};
pub use send::{send, CreateSink};

/// The fixed size of a BPv6 header buffer (§3 "Bundle data").
pub const HEADER_BUFFER_SIZE: usize = 128;

/// The three endpoints a channel is configured with (§3 "Route").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub local: Eid,
    pub destination: Eid,
    pub report_to: Eid,
}

/// Per-channel policy attributes (§3 "Attributes").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attributes {
    pub lifetime: u64,
    pub request_custody: bool,
    pub integrity_check: bool,
    pub allow_fragmentation: bool,
    pub admin_record: bool,
    pub ignore_expiration: bool,
    pub class_of_service: ClassOfService,
    pub cipher_suite: CipherSuite,
    pub max_length: u64,
}

impl Default for Attributes {
    fn default() -> Self {
        Self {
            lifetime: 3600,
            request_custody: false,
            integrity_check: false,
            allow_fragmentation: false,
            admin_record: false,
            ignore_expiration: false,
            class_of_service: ClassOfService::Normal,
            cipher_suite: CipherSuite::Crc32Castagnoli,
            max_length: HEADER_BUFFER_SIZE as u64 + 4096,
        }
    }
}

/// The serialized header and bookkeeping data for a bundle (§3 "Bundle
/// data"). The payload is not part of this buffer: it is appended fresh for
/// each fragment at send time, since different fragments carry different
/// payload bytes.
#[derive(Debug, Clone)]
pub struct BundleData {
    pub header: [u8; HEADER_BUFFER_SIZE],
    pub header_size: usize,
    pub exprtime: u64,
    /// Byte offset of the CTEB in `header`, or `0` if custody was not requested.
    pub cteb_offset: usize,
    /// Byte offset of the BIB in `header`, or `0` if integrity was not requested.
    pub bib_offset: usize,
    /// Byte offset at which the payload block begins once appended.
    pub pay_offset: usize,
}

impl Default for BundleData {
    fn default() -> Self {
        Self {
            header: [0u8; HEADER_BUFFER_SIZE],
            header_size: 0,
            exprtime: 0,
            cteb_offset: 0,
            bib_offset: 0,
            pay_offset: 0,
        }
    }
}

/// A BPv6 bundle: its route and attributes, the serialized header and its
/// block state, and the `prebuilt` flag distinguishing an originated bundle
/// (synthesized fresh) from a forwarded one (re-using a parsed primary
/// block).
#[derive(Debug, Clone)]
pub struct Bundle {
    pub route: Route,
    pub attributes: Attributes,
    pub data: BundleData,
    /// `true` for a bundle originated locally; `false` when forwarding a
    /// bundle whose primary block was supplied by the caller (§3, §4.4 "build").
    pub prebuilt: bool,
    pub primary: PrimaryBlock,
    primary_layout: primary_block::Layout,
    pub cteb: Option<Cteb>,
    cteb_layout: Option<cteb::Layout>,
    pub bib: Option<Bib>,
    bib_layout: Option<bib::Layout>,
}

fn synthesize_primary(route: &Route, attributes: &Attributes) -> PrimaryBlock {
    PrimaryBlock {
        flags: PrimaryFlags {
            is_frag: attributes.allow_fragmentation,
            is_admin_rec: attributes.admin_record,
            allow_frag: attributes.allow_fragmentation,
            cst_rqst: attributes.request_custody,
            ack_app: false,
            cos: attributes.class_of_service,
            unrecognised: 0,
        },
        dst: route.destination,
        src: route.local,
        rpt: route.report_to,
        cst: route.local,
        creation_sec: 0,
        creation_seq: 0,
        lifetime: attributes.lifetime,
        fragment_offset: 0,
        total_payload_length: 0,
    }
}

/// Creates a fresh, unbuilt `Bundle` for `route` under `attributes`. Call
/// [`build`] before using it with [`send`] or [`receive`].
pub fn create(route: Route, attributes: Attributes) -> Bundle {
    let primary = synthesize_primary(&route, &attributes);
    Bundle {
        route,
        attributes,
        data: BundleData::default(),
        prebuilt: true,
        primary,
        primary_layout: primary_block::Layout {
            block_length: sdnv::Field::default(),
            creation_sec: sdnv::Field::default(),
            creation_seq: sdnv::Field::default(),
            fragment_offset: None,
            total_payload_length: None,
            end: 0,
        },
        cteb: None,
        cteb_layout: None,
        bib: None,
        bib_layout: None,
    }
}

/// Lays a bundle's header out into its fixed buffer (§4.4 "build").
///
/// `forwarded` carries the already-parsed primary block and the
/// concatenated bytes of any non-excluded extension block regions, for the
/// forwarding path; `None` synthesizes a fresh primary block for an
/// originated bundle. Either way a CTEB is added when custody is requested
/// and a BIB is added when integrity checking is requested, using this
/// bundle's own attributes — a forwarding node's own custody/integrity
/// policy, not the original sender's.
pub fn build(mut bundle: Bundle, forwarded: Option<(PrimaryBlock, &[u8])>) -> Result<Bundle, Error> {
    let mut eflags = ErrorFlags::empty();
    let mut header = [0u8; HEADER_BUFFER_SIZE];
    let mut index = 0usize;

    let (primary, prebuilt) = match forwarded {
        Some((pb, _)) => (pb, false),
        None => (synthesize_primary(&bundle.route, &bundle.attributes), true),
    };

    let primary_layout = primary_block::emit(&primary, &mut header, &mut index, &mut eflags)?;

    let (cteb, cteb_layout, cteb_offset) = if bundle.attributes.request_custody {
        let offset = index;
        let c = Cteb {
            flags: BlockFlags::default(),
            custody_id: 0,
            custodian: bundle.route.local,
        };
        let layout = cteb::emit(&c, &mut header, &mut index, &mut eflags)?;
        (Some(c), Some(layout), offset)
    } else {
        (None, None, 0)
    };

    let (bib, bib_layout, bib_offset) = if bundle.attributes.integrity_check {
        let offset = index;
        let b = Bib {
            flags: BlockFlags::default(),
            cipher_suite: bundle.attributes.cipher_suite,
            cipher_suite_flags: 0,
        };
        let layout = bib::emit(&b, &mut header, &mut index, &mut eflags)?;
        (Some(b), Some(layout), offset)
    } else {
        (None, None, 0)
    };

    if let Some((_, extra)) = forwarded {
        let start = index;
        let end = start + extra.len();
        if end > header.len() {
            return Err(Error::BundleTooLarge(end, header.len()));
        }
        header[start..end].copy_from_slice(extra);
        index = end;
    }

    bundle.prebuilt = prebuilt;
    bundle.primary = primary;
    bundle.primary_layout = primary_layout;
    bundle.cteb = cteb;
    bundle.cteb_layout = cteb_layout;
    bundle.bib = bib;
    bundle.bib_layout = bib_layout;
    bundle.data = BundleData {
        header,
        header_size: index,
        exprtime: 0,
        cteb_offset,
        bib_offset,
        pay_offset: index,
    };

    debug_assert!(bundle.data.cteb_offset != 0 || !bundle.attributes.request_custody);
    debug_assert!(bundle.data.bib_offset != 0 || !bundle.attributes.integrity_check);

    Ok(bundle)
}

/// The tuple that identifies a bundle independent of any particular
/// fragment of it: its source and creation timestamp. Two fragments of the
/// same original bundle share a `BundleId` but differ in fragment offset.
///
/// This is not used anywhere in the codec or dispatch path above — it is a
/// minimal recognition key for a caller that needs to deduplicate bundles
/// it has already seen (e.g. across redundant paths), the way custody
/// tracking recognizes bundles it already holds custody of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BundleId {
    pub source: Eid,
    pub creation_sec: u64,
    pub creation_seq: u64,
}

impl Bundle {
    pub fn id(&self) -> BundleId {
        BundleId {
            source: self.primary.src,
            creation_sec: self.primary.creation_sec,
            creation_seq: self.primary.creation_seq,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(custody: bool, integrity: bool) -> Attributes {
        Attributes {
            request_custody: custody,
            integrity_check: integrity,
            ..Default::default()
        }
    }

    #[test]
    fn build_lays_out_header_within_bounds() {
        let route = Route {
            local: Eid::new(10, 1),
            destination: Eid::new(20, 2),
            report_to: Eid::new(10, 1),
        };
        let bundle = create(route, attrs(true, true));
        let built = build(bundle, None).unwrap();
        assert!(built.data.header_size <= HEADER_BUFFER_SIZE);
        assert_ne!(built.data.cteb_offset, 0);
        assert_ne!(built.data.bib_offset, 0);
        assert!(built.prebuilt);
    }

    #[test]
    fn build_without_custody_or_integrity_has_no_offsets() {
        let route = Route {
            local: Eid::new(10, 1),
            destination: Eid::new(20, 2),
            report_to: Eid::new(10, 1),
        };
        let bundle = create(route, attrs(false, false));
        let built = build(bundle, None).unwrap();
        assert_eq!(built.data.cteb_offset, 0);
        assert_eq!(built.data.bib_offset, 0);
    }

    #[test]
    fn id_reflects_source_and_creation_timestamp() {
        let route = Route {
            local: Eid::new(10, 1),
            destination: Eid::new(20, 2),
            report_to: Eid::new(10, 1),
        };
        let mut bundle = build(create(route, attrs(false, false)), None).unwrap();
        bundle.primary.creation_sec = 100;
        bundle.primary.creation_seq = 3;
        let id = bundle.id();
        assert_eq!(id.source, Eid::new(10, 1));
        assert_eq!(id.creation_sec, 100);
        assert_eq!(id.creation_seq, 3);
    }
}

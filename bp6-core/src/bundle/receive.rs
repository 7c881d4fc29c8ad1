/*!
Implements the incoming half of the bundle lifecycle (§4.4 "receive"):
parsing the primary block, checking expiration, walking extension blocks
(applying DROPNOPROC/DELETENOPROC/NOTIFYNOPROC processing to anything this
engine does not recognise, bounded by [`block::MAX_EXCLUDE_REGIONS`]),
verifying payload integrity against a BIB when present, and dispatching the
result via [`Disposition`].
*/

use super::Route;
use crate::bib::{self, Bib};
use crate::block::{
    self, ExcludeRegion, ExcludeRegions, ACS_REC_TYPE, BIB_BLOCK_TYPE, CS_REC_TYPE, CTEB_BLOCK_TYPE,
    PAYLOAD_BLOCK_TYPE, STAT_REC_TYPE,
};
use crate::cteb;
use crate::eid::Eid;
use crate::error::{Disposition, Error, ErrorFlags, Flagged};
use crate::primary_block::{self, PrimaryBlock};
use crate::time;
use alloc::vec::Vec;
use tracing::{debug, trace, warn};

/// The custody transfer details carried by a received bundle's CTEB, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CustodyInfo {
    pub custody_id: u64,
    pub custodian: Eid,
}

/// Everything a caller needs from a parsed, dispatched bundle, beyond the
/// [`Disposition`] that says what to do with it.
#[derive(Debug, Clone)]
pub struct ReceiveOutcome<'a> {
    pub primary: PrimaryBlock,
    pub payload: &'a [u8],
    pub custody: Option<CustodyInfo>,
    /// Concatenated bytes of extension blocks this engine did not recognise
    /// but was not instructed to drop. Present only when the disposition is
    /// [`Disposition::PendingForward`]; pass it to [`super::build`]'s
    /// `forwarded` argument to carry those blocks through re-encoding.
    pub extra_regions: Vec<u8>,
}

/// Parses `buf` as a received bundle addressed (at the IP/CLA layer) to
/// `route`'s local endpoint, and dispatches it.
///
/// `sysnow` and `time_reliable` feed the expiration check; `ignore_expiration`
/// mirrors the channel attribute of the same name. Returns the dispatch
/// result together with any anomaly flags raised while parsing.
pub fn receive<'a>(
    route: &Route,
    buf: &'a [u8],
    sysnow: u64,
    time_reliable: bool,
    ignore_expiration: bool,
) -> Result<Flagged<(Disposition, ReceiveOutcome<'a>)>, Error> {
    let mut eflags = ErrorFlags::empty();
    let mut index = 0usize;

    let primary = primary_block::parse(buf, &mut index, &mut eflags)?;

    let exprtime = time::compute_expiration(primary.creation_sec, primary.lifetime, &mut eflags);
    if time::is_expired(exprtime, sysnow, time_reliable, ignore_expiration) {
        eflags.insert(ErrorFlags::DROPPED);
        debug!(exprtime, sysnow, "bundle expired on receipt, dropping");
        return Ok(Flagged::new(
            (
                Disposition::PendingExpiration,
                ReceiveOutcome {
                    primary,
                    payload: &buf[buf.len()..],
                    custody: None,
                    extra_regions: Vec::new(),
                },
            ),
            eflags,
        ));
    }

    let mut custody: Option<CustodyInfo> = None;
    let mut bib_entry: Option<(Bib, bib::Layout)> = None;
    let mut exclude_regions = ExcludeRegions::new();
    let mut extra_regions: Vec<u8> = Vec::new();

    let (_payload_flags, payload) = loop {
        let Some(&block_type) = buf.get(index) else {
            eflags.insert(ErrorFlags::SDNV_INCOMPLETE);
            return Err(Error::SdnvIncomplete);
        };

        match block_type {
            CTEB_BLOCK_TYPE => {
                let c = cteb::parse(buf, &mut index, &mut eflags)?;
                custody = Some(CustodyInfo {
                    custody_id: c.custody_id,
                    custodian: c.custodian,
                });
            }
            BIB_BLOCK_TYPE => {
                let (b, layout) = bib::parse(buf, &mut index, &mut eflags)?;
                bib_entry = Some((b, layout));
            }
            PAYLOAD_BLOCK_TYPE => {
                break crate::payload_block::parse(buf, &mut index, &mut eflags)?;
            }
            _ => {
                let start = index;
                let (header, data_len) = block::read_header(buf, &mut index, &mut eflags)?;
                let end = index + data_len as usize;
                if end > buf.len() {
                    eflags.insert(ErrorFlags::SDNV_INCOMPLETE);
                    return Err(Error::SdnvIncomplete);
                }
                index = end;
                eflags.insert(ErrorFlags::NONCOMPLIANT);
                trace!(block_type, data_len, "unrecognised extension block");

                if header.flags.deletenoproc {
                    eflags.insert(ErrorFlags::DROPPED);
                    warn!(block_type, "unrecognised block requests bundle deletion, dropping");
                    return Err(Error::BlockUnprocessable(block_type));
                }
                if header.flags.notifynoproc {
                    eflags.insert(ErrorFlags::DIAGNOSTIC);
                    warn!(block_type, "unrecognised block requests a status report: logging non-compliant block");
                }
                if header.flags.dropnoproc {
                    exclude_regions.push(ExcludeRegion { range: start..end })?;
                } else {
                    extra_regions.extend_from_slice(&buf[start..end]);
                }
            }
        }
    };

    if let Some((bib, layout)) = &bib_entry {
        if bib::verify(buf, layout, bib.cipher_suite, payload).is_err() {
            eflags.insert(ErrorFlags::FAILED_INTEGRITY_CHECK);
            warn!(cipher_suite = ?bib.cipher_suite, "payload failed BIB integrity check");
            return Err(Error::FailedIntegrityCheck);
        }
    }

    if primary.flags.is_admin_rec && payload.len() < 2 {
        eflags.insert(ErrorFlags::FAILED_TO_PARSE);
        warn!(len = payload.len(), "administrative record payload too short to carry a record type");
        return Err(Error::AdminRecordTooShort(payload.len()));
    }

    let disposition = if primary.dst.node != route.local.node {
        Disposition::PendingForward
    } else if primary.dst.service != 0 && primary.dst.service != route.local.service {
        eflags.insert(ErrorFlags::ROUTE_NEEDED);
        Disposition::RouteNeeded
    } else if primary.flags.is_admin_rec {
        match payload[0] {
            ACS_REC_TYPE => Disposition::PendingAcknowledgment,
            CS_REC_TYPE | STAT_REC_TYPE => {
                eflags.insert(ErrorFlags::NONCOMPLIANT);
                warn!(record_type = payload[0], "this engine does not originate or consume this administrative record type");
                return Err(Error::NonCompliantRecordType(payload[0]));
            }
            other => {
                eflags.insert(ErrorFlags::UNKNOWNREC);
                warn!(record_type = other, "unrecognised administrative record type");
                return Err(Error::UnknownRecordType(other));
            }
        }
    } else {
        Disposition::PendingAcceptance
    };

    Ok(Flagged::new(
        (
            disposition,
            ReceiveOutcome {
                primary,
                payload,
                custody,
                extra_regions,
            },
        ),
        eflags,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bib::Bib;
    use crate::block::BlockFlags;
    use crate::crc::CipherSuite;
    use crate::cteb::Cteb;
    use crate::flags::PrimaryFlags;

    fn route() -> Route {
        Route {
            local: Eid::new(10, 1),
            destination: Eid::new(20, 2),
            report_to: Eid::new(10, 1),
        }
    }

    fn sample_primary(dst: Eid) -> PrimaryBlock {
        PrimaryBlock {
            flags: PrimaryFlags {
                cst_rqst: true,
                ..Default::default()
            },
            dst,
            src: Eid::new(20, 2),
            rpt: Eid::new(20, 2),
            cst: Eid::new(20, 2),
            creation_sec: 100,
            creation_seq: 0,
            lifetime: 3600,
            fragment_offset: 0,
            total_payload_length: 0,
        }
    }

    fn encode_bundle(dst: Eid, payload: &[u8]) -> [u8; 128] {
        let mut buf = [0u8; 128];
        let mut eflags = ErrorFlags::empty();
        let mut index = 0;
        primary_block::emit(&sample_primary(dst), &mut buf, &mut index, &mut eflags).unwrap();
        let cteb = Cteb {
            flags: BlockFlags::default(),
            custody_id: 9,
            custodian: Eid::new(20, 2),
        };
        cteb::emit(&cteb, &mut buf, &mut index, &mut eflags).unwrap();
        let bib = Bib {
            flags: BlockFlags::default(),
            cipher_suite: CipherSuite::Crc32Castagnoli,
            cipher_suite_flags: 0,
        };
        let layout = bib::emit(&bib, &mut buf, &mut index, &mut eflags).unwrap();
        bib::update(&mut buf, &layout, bib.cipher_suite, payload);
        crate::payload_block::emit(
            payload,
            BlockFlags {
                lastblock: true,
                ..Default::default()
            },
            &mut buf,
            &mut index,
            &mut eflags,
        )
        .unwrap();
        buf
    }

    #[test]
    fn local_payload_dispatches_as_pending_acceptance() {
        let buf = encode_bundle(route().local, b"HELLO");
        let result = receive(&route(), &buf, 100, true, false).unwrap();
        assert_eq!(result.value.0, Disposition::PendingAcceptance);
        assert_eq!(result.value.1.payload, b"HELLO");
        assert_eq!(result.value.1.custody.unwrap().custody_id, 9);
    }

    #[test]
    fn wrong_service_dispatches_as_route_needed() {
        let buf = encode_bundle(Eid::new(10, 99), b"HELLO");
        let result = receive(&route(), &buf, 100, true, false).unwrap();
        assert_eq!(result.value.0, Disposition::RouteNeeded);
    }

    #[test]
    fn zero_destination_service_is_local_delivery_not_route_needed() {
        let buf = encode_bundle(Eid::new(10, 0), b"HELLO");
        let result = receive(&route(), &buf, 100, true, false).unwrap();
        assert_eq!(result.value.0, Disposition::PendingAcceptance);
    }

    #[test]
    fn foreign_node_dispatches_as_pending_forward() {
        let buf = encode_bundle(Eid::new(30, 1), b"HELLO");
        let result = receive(&route(), &buf, 100, true, false).unwrap();
        assert_eq!(result.value.0, Disposition::PendingForward);
    }

    #[test]
    fn expired_bundle_dispatches_as_pending_expiration() {
        let buf = encode_bundle(route().local, b"HELLO");
        let result = receive(&route(), &buf, 100_000, true, false).unwrap();
        assert_eq!(result.value.0, Disposition::PendingExpiration);
    }

    #[test]
    fn short_admin_record_payload_is_rejected() {
        let mut buf = [0u8; 128];
        let mut eflags = ErrorFlags::empty();
        let mut index = 0;
        let primary = PrimaryBlock {
            flags: PrimaryFlags {
                is_admin_rec: true,
                ..Default::default()
            },
            ..sample_primary(route().local)
        };
        primary_block::emit(&primary, &mut buf, &mut index, &mut eflags).unwrap();
        crate::payload_block::emit(b"A", BlockFlags { lastblock: true, ..Default::default() }, &mut buf, &mut index, &mut eflags).unwrap();
        assert!(matches!(
            receive(&route(), &buf, 100, true, false),
            Err(Error::AdminRecordTooShort(1))
        ));
    }

    fn encode_admin_bundle(record_type: u8) -> [u8; 128] {
        let mut buf = [0u8; 128];
        let mut eflags = ErrorFlags::empty();
        let mut index = 0;
        let primary = PrimaryBlock {
            flags: PrimaryFlags {
                is_admin_rec: true,
                ..Default::default()
            },
            ..sample_primary(route().local)
        };
        primary_block::emit(&primary, &mut buf, &mut index, &mut eflags).unwrap();
        crate::payload_block::emit(
            &[record_type, 0],
            BlockFlags { lastblock: true, ..Default::default() },
            &mut buf,
            &mut index,
            &mut eflags,
        )
        .unwrap();
        buf
    }

    #[test]
    fn acs_admin_record_dispatches_as_pending_acknowledgment() {
        let buf = encode_admin_bundle(block::ACS_REC_TYPE);
        let result = receive(&route(), &buf, 100, true, false).unwrap();
        assert_eq!(result.value.0, Disposition::PendingAcknowledgment);
    }

    #[test]
    fn custody_signal_admin_record_is_noncompliant() {
        let buf = encode_admin_bundle(block::CS_REC_TYPE);
        assert!(matches!(
            receive(&route(), &buf, 100, true, false),
            Err(Error::NonCompliantRecordType(t)) if t == block::CS_REC_TYPE
        ));
    }

    #[test]
    fn status_report_admin_record_is_noncompliant() {
        let buf = encode_admin_bundle(block::STAT_REC_TYPE);
        assert!(matches!(
            receive(&route(), &buf, 100, true, false),
            Err(Error::NonCompliantRecordType(t)) if t == block::STAT_REC_TYPE
        ));
    }

    #[test]
    fn unknown_admin_record_type_is_rejected() {
        let buf = encode_admin_bundle(0x7f);
        assert!(matches!(
            receive(&route(), &buf, 100, true, false),
            Err(Error::UnknownRecordType(0x7f))
        ));
    }

    #[test]
    fn tampered_payload_fails_integrity_check() {
        let mut buf = encode_bundle(route().local, b"HELLO");
        let needle = buf
            .windows(5)
            .position(|w| w == b"HELLO")
            .expect("payload bytes present in encoded bundle");
        buf[needle] ^= 0xff;
        assert!(matches!(
            receive(&route(), &buf, 100, true, false),
            Err(Error::FailedIntegrityCheck)
        ));
    }
}

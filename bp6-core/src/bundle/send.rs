/*!
Implements the outgoing half of the bundle lifecycle (§4.4 "send"): stamping
the creation timestamp on first send, computing the expiration time,
splitting the payload into fragments when it does not fit the channel's
maximum bundle length, and invoking a storage adapter's create operation
once per fragment.
*/

use super::Bundle;
use crate::bib;
use crate::error::{Error, ErrorFlags, Flagged};
use crate::flags::BlockFlags;
use crate::payload_block;
use crate::sdnv;
use crate::time;
use alloc::vec;
use alloc::vec::Vec;
use tracing::{debug, warn};

/// Accepts an encoded bundle or fragment for persistence/transmission. A
/// thin seam: `bp6-storage-api`'s full storage adapter trait is implemented
/// in terms of this by the embedding application.
pub trait CreateSink {
    fn create(&mut self, is_admin_rec: bool, bytes: &[u8], timeout: i64) -> Result<(), ()>;
}

/// Extra bytes reserved per fragment beyond the header for the payload
/// block's own type/flags/length fields.
const PAYLOAD_BLOCK_OVERHEAD: usize = 11;

/// Serializes `payload` as one or more fragments of `bundle` and hands each
/// to `sink`. `sysnow` is the current DTN time if the local clock is
/// reliable; `None` stamps the bundle with [`time::UNKNOWN_CREATION_TIME`]
/// and downgrades its lifetime to [`time::BEST_EFFORT_LIFETIME`] (§4.4 step
/// 2). Returns the number of fragments sent, together with any anomaly
/// flags raised along the way.
///
/// `custody_id`, when `Some`, patches the bundle's CTEB in place with the ID
/// a custody engine has just assigned it (§3 "Bundle data": `send` mutates
/// timestamp, seq, CID, and CRC). Ignored if the bundle was built without
/// custody requested.
pub fn send<S: CreateSink>(
    bundle: &mut Bundle,
    payload: &[u8],
    sink: &mut S,
    timeout: i64,
    sysnow: Option<u64>,
    custody_id: Option<u64>,
) -> Result<Flagged<usize>, Error> {
    let mut eflags = ErrorFlags::empty();

    if let (Some(cid), Some(layout)) = (custody_id, bundle.cteb_layout.as_mut()) {
        layout.custody_id.value = cid;
        sdnv::write(&mut bundle.data.header, &mut layout.custody_id, &mut eflags)?;
        if let Some(cteb) = bundle.cteb.as_mut() {
            cteb.custody_id = cid;
        }
    }

    if bundle.prebuilt {
        match sysnow {
            Some(now) => {
                bundle.primary.creation_sec = now;
                bundle.primary_layout.creation_sec.value = now;
                sdnv::write(&mut bundle.data.header, &mut bundle.primary_layout.creation_sec, &mut eflags)?;
            }
            None => {
                bundle.primary.creation_sec = time::UNKNOWN_CREATION_TIME;
                bundle.primary.lifetime = time::BEST_EFFORT_LIFETIME;
                bundle.attributes.lifetime = time::BEST_EFFORT_LIFETIME;
                bundle.primary_layout.creation_sec.value = time::UNKNOWN_CREATION_TIME;
                sdnv::write(&mut bundle.data.header, &mut bundle.primary_layout.creation_sec, &mut eflags)?;
                eflags.insert(ErrorFlags::UNRELIABLE_TIME);
                debug!("local clock unreliable, stamping unknown creation time and best-effort lifetime");
            }
        }
    }

    bundle.data.exprtime = time::compute_expiration(bundle.primary.creation_sec, bundle.attributes.lifetime, &mut eflags);

    let headersize = bundle.data.header_size;
    let max_paysize = (bundle.attributes.max_length as usize).saturating_sub(headersize + PAYLOAD_BLOCK_OVERHEAD);

    if max_paysize == 0 {
        eflags.insert(ErrorFlags::BUNDLE_TOO_LARGE);
        return Err(Error::BundleTooLarge(headersize, bundle.attributes.max_length as usize));
    }
    if payload.len() > max_paysize && !bundle.attributes.allow_fragmentation {
        eflags.insert(ErrorFlags::BUNDLE_TOO_LARGE);
        return Err(Error::BundleTooLarge(headersize + payload.len(), bundle.attributes.max_length as usize));
    }

    let chunk_size = if bundle.primary.flags.is_frag {
        max_paysize
    } else {
        payload.len().max(1)
    };

    let mut offset = 0usize;
    let mut fragments_sent = 0usize;
    loop {
        let end = (offset + chunk_size).min(payload.len());
        let fragment = &payload[offset..end];

        if let Some(field) = bundle.primary_layout.fragment_offset.as_mut() {
            field.value = offset as u64;
            sdnv::write(&mut bundle.data.header, field, &mut eflags)?;
        }
        if let Some(field) = bundle.primary_layout.total_payload_length.as_mut() {
            field.value = payload.len() as u64;
            sdnv::write(&mut bundle.data.header, field, &mut eflags)?;
        }

        if let (Some(bib_entry), Some(layout)) = (bundle.bib.as_ref(), bundle.bib_layout.as_ref()) {
            bib::update(&mut bundle.data.header, layout, bib_entry.cipher_suite, fragment);
        }

        let mut full = vec![0u8; headersize + fragment.len() + PAYLOAD_BLOCK_OVERHEAD];
        full[..headersize].copy_from_slice(&bundle.data.header[..headersize]);

        let mut index = headersize;
        let payload_flags = BlockFlags {
            lastblock: true,
            ..Default::default()
        };
        payload_block::emit(fragment, payload_flags, &mut full, &mut index, &mut eflags)?;
        let bundlesize = index;

        sink.create(bundle.attributes.admin_record, &full[..bundlesize], timeout)
            .map_err(|_| {
                eflags.insert(ErrorFlags::STORE_FAILURE);
                warn!(bundlesize, "storage adapter rejected fragment");
                Error::StoreFailure
            })?;

        fragments_sent += 1;
        offset = end;
        if offset >= payload.len() {
            break;
        }
    }

    if bundle.prebuilt {
        bundle.primary.creation_seq += 1;
        bundle.primary_layout.creation_seq.value = bundle.primary.creation_seq;
        sdnv::write(&mut bundle.data.header, &mut bundle.primary_layout.creation_seq, &mut eflags)?;
    }

    Ok(Flagged::new(fragments_sent, eflags))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::{build, create, Attributes, Route};
    use crate::eid::Eid;

    struct Sink {
        calls: Vec<Vec<u8>>,
    }

    impl CreateSink for Sink {
        fn create(&mut self, _is_admin_rec: bool, bytes: &[u8], _timeout: i64) -> Result<(), ()> {
            self.calls.push(bytes.to_vec());
            Ok(())
        }
    }

    fn route() -> Route {
        Route {
            local: Eid::new(10, 1),
            destination: Eid::new(20, 2),
            report_to: Eid::new(10, 1),
        }
    }

    #[test]
    fn whole_payload_sent_as_one_fragment_without_fragmentation() {
        let bundle = create(route(), Attributes::default());
        let mut bundle = build(bundle, None).unwrap();
        let mut sink = Sink { calls: Vec::new() };
        let result = send(&mut bundle, b"hello world", &mut sink, 0, Some(100), None).unwrap();
        assert_eq!(result.value, 1);
        assert_eq!(sink.calls.len(), 1);
    }

    #[test]
    fn oversized_payload_without_fragmentation_fails() {
        let attrs = Attributes {
            max_length: (super::super::HEADER_BUFFER_SIZE + 16) as u64,
            ..Default::default()
        };
        let bundle = create(route(), attrs);
        let mut bundle = build(bundle, None).unwrap();
        let mut sink = Sink { calls: Vec::new() };
        let payload = vec![0u8; 4096];
        assert!(send(&mut bundle, &payload, &mut sink, 0, Some(100), None).is_err());
    }

    #[test]
    fn oversized_payload_with_fragmentation_splits() {
        let attrs = Attributes {
            allow_fragmentation: true,
            max_length: 200,
            ..Default::default()
        };
        let bundle = create(route(), attrs);
        let mut bundle = build(bundle, None).unwrap();
        let mut sink = Sink { calls: Vec::new() };
        let payload = vec![7u8; 500];
        let result = send(&mut bundle, &payload, &mut sink, 0, Some(100), None).unwrap();
        assert!(result.value > 1);
        assert_eq!(sink.calls.len(), result.value);
    }

    #[test]
    fn unreliable_clock_downgrades_to_best_effort() {
        let bundle = create(route(), Attributes::default());
        let mut bundle = build(bundle, None).unwrap();
        let mut sink = Sink { calls: Vec::new() };
        let result = send(&mut bundle, b"hi", &mut sink, 0, None, None).unwrap();
        assert!(result.flags.contains(ErrorFlags::UNRELIABLE_TIME));
        assert_eq!(bundle.primary.creation_sec, time::UNKNOWN_CREATION_TIME);
        assert_eq!(bundle.attributes.lifetime, time::BEST_EFFORT_LIFETIME);
    }

    #[test]
    fn custody_id_patches_the_cteb_in_place() {
        let attrs = Attributes {
            request_custody: true,
            ..Default::default()
        };
        let bundle = create(route(), attrs);
        let mut bundle = build(bundle, None).unwrap();
        assert_eq!(bundle.cteb.as_ref().unwrap().custody_id, 0);

        let mut sink = Sink { calls: Vec::new() };
        send(&mut bundle, b"hi", &mut sink, 0, Some(100), Some(42)).unwrap();

        assert_eq!(bundle.cteb.as_ref().unwrap().custody_id, 42);

        let sent = &sink.calls[0];
        let mut eflags = ErrorFlags::empty();
        let mut index = 0;
        crate::primary_block::parse(sent, &mut index, &mut eflags).unwrap();
        let sent_cteb = crate::cteb::parse(sent, &mut index, &mut eflags).unwrap();
        assert_eq!(sent_cteb.custody_id, 42);
    }
}

/*!
The custody tracking engine (§5): an active bundle table for outstanding
custody transfers this node has requested, and an accumulator for custody
IDs this node has itself acknowledged, to be emitted as outgoing Aggregate
Custody Signals.
*/

pub mod active_buffer;
pub mod dacs;
pub mod hash_table;
pub mod range_tree;

use active_buffer::{ActiveBuffer, ActiveEntry, AddOutcome};
use hash_table::RobinHoodMap;
use range_tree::RangeTree;
use tracing::debug;

/// Wires the active bundle table, its storage-id index, and the pending
/// acknowledgment tree together into the single engine a node's dispatcher
/// drives.
pub struct CustodyEngine {
    active: ActiveBuffer,
    by_storage_id: RobinHoodMap,
    pending_acks: RangeTree,
}

impl CustodyEngine {
    /// `active_capacity` bounds the number of custody-requested bundles this
    /// node can have outstanding at once; the storage-id index is sized to
    /// keep its load factor at or below 0.75 at that capacity.
    pub fn new(active_capacity: usize) -> Self {
        let index_capacity = (active_capacity * 4 / 3).max(1);
        Self {
            active: ActiveBuffer::new(active_capacity),
            by_storage_id: RobinHoodMap::with_capacity(index_capacity),
            pending_acks: RangeTree::new(),
        }
    }

    pub fn available(&self) -> usize {
        self.active.available()
    }

    /// Registers a just-sent, custody-requested bundle for retransmission
    /// tracking under the channel's next custody ID, returning that ID, or
    /// `None` if `overwrite` is false and that ID's slot already holds it
    /// (§4.5 "Duplicate CID add").
    pub fn track(&mut self, storage_id: u64, retransmit_time: u64, overwrite: bool) -> Option<u64> {
        let cid = self.active.newest_cid();
        match self.active.add(cid, storage_id, retransmit_time, overwrite) {
            AddOutcome::Duplicate => {
                debug!(cid, storage_id, "duplicate custody id add rejected");
                None
            }
            AddOutcome::Added => {
                let _ = self.by_storage_id.insert(storage_id, cid);
                Some(cid)
            }
        }
    }

    pub fn custody_id_for_storage_id(&self, storage_id: u64) -> Option<u64> {
        self.by_storage_id.get(storage_id)
    }

    pub fn entry(&self, custody_id: u64) -> Option<&ActiveEntry> {
        self.active.get(custody_id)
    }

    /// Advances the channel's oldest-outstanding-custody-ID scan, returning
    /// the next occupied slot in ascending CID order, or `None` ("timeout")
    /// if every outstanding slot up to `newest_cid` has already been
    /// released (§4.5 "Active circular buffer" `next()`).
    pub fn next(&mut self) -> Option<u64> {
        self.active.next()
    }

    pub fn next_expired(&self, now: u64) -> Option<&ActiveEntry> {
        self.active.next_expired(now)
    }

    /// Releases the active-bundle slot for `custody_id` and its storage-id
    /// index entry — called once per custody ID acknowledged by an incoming
    /// ACS (see [`dacs::read`]).
    pub fn release(&mut self, custody_id: u64) {
        if let Some(entry) = self.active.remove(custody_id) {
            self.by_storage_id.remove(entry.storage_id);
        }
    }

    /// Records that this node has accepted custody of an incoming bundle,
    /// folding its custody ID into the set awaiting the next outgoing ACS.
    pub fn accept_custody(&mut self, custody_id: u64) {
        self.pending_acks.insert_cid(custody_id);
    }

    /// Emits as many pending acknowledgments as fit `buf`, draining each
    /// emitted range from the pending set. Returns the number of bytes
    /// written.
    pub fn emit_acs(&mut self, buf: &mut [u8], max_fills: usize) -> Result<usize, crate::error::Error> {
        dacs::write(&mut self.pending_acks, buf, max_fills)
    }

    pub fn pending_ack_count(&self) -> usize {
        self.pending_acks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn track_and_release_round_trip() {
        let mut engine = CustodyEngine::new(8);
        let cid = engine.track(555, 100, false).unwrap();
        assert_eq!(engine.custody_id_for_storage_id(555), Some(cid));
        engine.release(cid);
        assert_eq!(engine.custody_id_for_storage_id(555), None);
        assert_eq!(engine.entry(cid), None);
    }

    #[test]
    fn accept_custody_accumulates_for_acs() {
        let mut engine = CustodyEngine::new(4);
        for cid in [1, 2, 3, 9] {
            engine.accept_custody(cid);
        }
        assert_eq!(engine.pending_ack_count(), 2);

        let mut buf = [0u8; 64];
        let written = engine.emit_acs(&mut buf, 16).unwrap();
        assert!(written > 0);
        assert_eq!(engine.pending_ack_count(), 0);
    }
}

/*!
The active bundle table (§3 "Active circular buffer", §4.5 "Active circular
buffer"): a fixed-size circular buffer of outstanding custody-transfer
slots, indexed by `custody_id mod size`. `newest_cid` names the next custody
ID this channel will hand out; `oldest_cid` tracks the low-water mark
`next()` has scanned up to. A slot is occupied iff it holds an entry at
all — Rust's `Option` stands in for the sentinel vacant storage-id the
original representation uses.
*/

use alloc::vec::Vec;

/// One outstanding custody-transfer bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveEntry {
    pub storage_id: u64,
    pub retransmit_time: u64,
    pub custody_id: u64,
}

/// The outcome of [`ActiveBuffer::add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    /// The slot already held this exact custody ID and `overwrite` was false.
    Duplicate,
}

pub struct ActiveBuffer {
    slots: Vec<Option<ActiveEntry>>,
    size: usize,
    num_entries: usize,
    newest_cid: u64,
    oldest_cid: u64,
}

impl ActiveBuffer {
    pub fn new(size: usize) -> Self {
        assert!(size > 0, "active buffer must have at least one slot");
        Self {
            slots: (0..size).map(|_| None).collect(),
            size,
            num_entries: 0,
            newest_cid: 0,
            oldest_cid: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.size
    }

    pub fn count(&self) -> usize {
        self.num_entries
    }

    pub fn available(&self) -> usize {
        self.size - self.num_entries
    }

    /// The next custody ID this channel will assign on its next non-overwriting `add`.
    pub fn newest_cid(&self) -> u64 {
        self.newest_cid
    }

    pub fn oldest_cid(&self) -> u64 {
        self.oldest_cid
    }

    /// `true` iff the slot `cid` would land in currently holds no entry.
    pub fn slot_available(&self, cid: u64) -> bool {
        self.slots[(cid as usize) % self.size].is_none()
    }

    /// Stores an entry for `cid`, claiming its slot (`cid mod size`).
    ///
    /// If the slot is already occupied by this exact `cid` and `overwrite`
    /// is `false`, returns [`AddOutcome::Duplicate`] without changing any
    /// state. Otherwise the slot is written (replacing whatever was there,
    /// including a different still-outstanding custody ID whose slot this
    /// one has wrapped onto) and, if `overwrite` is `false`, `newest_cid` is
    /// advanced to `cid + 1`.
    ///
    /// `num_entries` only increases on an empty-to-occupied transition —
    /// see the module-level note on the fixed `num_entries` accounting
    /// (spec Open Question (b), recorded in `DESIGN.md`): incrementing it
    /// unconditionally on every `add` would let it exceed `size` and break
    /// the invariant `num_entries == |{occupied slots}|`.
    pub fn add(&mut self, cid: u64, storage_id: u64, retransmit_time: u64, overwrite: bool) -> AddOutcome {
        let slot = (cid as usize) % self.size;
        let was_occupied = self.slots[slot].is_some();
        if was_occupied && !overwrite {
            if let Some(existing) = &self.slots[slot] {
                if existing.custody_id == cid {
                    return AddOutcome::Duplicate;
                }
            }
        }
        self.slots[slot] = Some(ActiveEntry {
            storage_id,
            retransmit_time,
            custody_id: cid,
        });
        if !was_occupied {
            self.num_entries += 1;
        }
        if !overwrite {
            self.newest_cid = cid + 1;
        }
        AddOutcome::Added
    }

    /// Looks up the entry for `custody_id`, if its slot still holds that
    /// exact ID (it may already have been overwritten by a later wrap).
    pub fn get(&self, custody_id: u64) -> Option<&ActiveEntry> {
        let slot = (custody_id as usize) % self.size;
        match &self.slots[slot] {
            Some(e) if e.custody_id == custody_id => Some(e),
            _ => None,
        }
    }

    /// Releases the slot for `custody_id`, returning its entry.
    pub fn remove(&mut self, custody_id: u64) -> Option<ActiveEntry> {
        let slot = (custody_id as usize) % self.size;
        match &self.slots[slot] {
            Some(e) if e.custody_id == custody_id => {
                let entry = self.slots[slot].take();
                self.num_entries -= 1;
                entry
            }
            _ => None,
        }
    }

    /// Advances `oldest_cid` past vacant (or stale, already-overwritten)
    /// slots until it meets `newest_cid`, returning the first custody ID
    /// whose slot is still occupied by that exact ID, or `None` ("timeout")
    /// if it catches up to `newest_cid` without finding one.
    ///
    /// `oldest_cid` is left pointing at the returned ID, not past it — the
    /// caller removes or overwrites that slot before the next `next()` call
    /// advances further.
    pub fn next(&mut self) -> Option<u64> {
        while self.oldest_cid < self.newest_cid {
            let slot = (self.oldest_cid as usize) % self.size;
            match &self.slots[slot] {
                Some(e) if e.custody_id == self.oldest_cid => return Some(self.oldest_cid),
                _ => self.oldest_cid += 1,
            }
        }
        None
    }

    /// The occupied entry with the earliest retransmit time at or before
    /// `now`, if any — a retransmission-timer scan. Not part of §4.5's
    /// `next()`, which scans by custody-id order instead; kept alongside it
    /// since a node walking its active buffer for retransmission candidates
    /// needs to select by due time, not oldest-cid order.
    pub fn next_expired(&self, now: u64) -> Option<&ActiveEntry> {
        self.slots
            .iter()
            .flatten()
            .filter(|e| e.retransmit_time <= now)
            .min_by_key(|e| e.retransmit_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_assigns_sequential_custody_ids() {
        let mut buf = ActiveBuffer::new(4);
        assert_eq!(buf.newest_cid(), 0);
        assert_eq!(buf.add(0, 100, 10, false), AddOutcome::Added);
        assert_eq!(buf.newest_cid(), 1);
        assert_eq!(buf.add(1, 101, 10, false), AddOutcome::Added);
        assert_eq!(buf.newest_cid(), 2);
        assert_eq!(buf.count(), 2);
        assert_eq!(buf.available(), 2);
    }

    #[test]
    fn duplicate_cid_add_without_overwrite_is_rejected() {
        let mut buf = ActiveBuffer::new(8);
        assert_eq!(buf.add(7, 1, 0, false), AddOutcome::Added);
        assert_eq!(buf.add(7, 1, 0, false), AddOutcome::Duplicate);
        assert_eq!(buf.count(), 1);
    }

    #[test]
    fn wrap_with_overwrite_replaces_and_does_not_double_count() {
        let mut buf = ActiveBuffer::new(2);
        buf.add(0, 1, 0, false);
        buf.add(1, 2, 0, false);
        let outcome = buf.add(2, 3, 0, true);
        assert_eq!(outcome, AddOutcome::Added);
        assert_eq!(buf.count(), 2);
        assert_eq!(buf.get(2).unwrap().storage_id, 3);
        assert_eq!(buf.get(0), None, "overwritten custody ID 0 no longer resolves at the stale slot");
    }

    #[test]
    fn remove_frees_the_slot() {
        let mut buf = ActiveBuffer::new(4);
        buf.add(5, 50, 0, false);
        assert!(buf.remove(5).is_some());
        assert_eq!(buf.count(), 0);
        assert_eq!(buf.get(5), None);
    }

    #[test]
    fn next_scans_past_vacant_and_stale_slots_in_cid_order() {
        let mut buf = ActiveBuffer::new(8);
        buf.add(0, 10, 0, false);
        buf.add(1, 11, 0, false);
        buf.add(2, 12, 0, false);
        buf.remove(0);
        buf.remove(1);
        assert_eq!(buf.next(), Some(2));
        buf.remove(2);
        assert_eq!(buf.next(), None, "oldest_cid has caught up to newest_cid: timeout");
    }

    #[test]
    fn next_returns_timeout_on_empty_buffer() {
        let mut buf = ActiveBuffer::new(4);
        assert_eq!(buf.next(), None);
    }

    #[test]
    fn next_expired_picks_earliest_due_entry() {
        let mut buf = ActiveBuffer::new(4);
        buf.add(0, 1, 50, false);
        buf.add(1, 2, 10, false);
        buf.add(2, 3, 30, false);
        let next = buf.next_expired(100).unwrap();
        assert_eq!(next.storage_id, 2);
    }

    #[test]
    fn next_expired_ignores_entries_not_yet_due() {
        let mut buf = ActiveBuffer::new(4);
        buf.add(0, 1, 1000, false);
        assert!(buf.next_expired(10).is_none());
    }
}

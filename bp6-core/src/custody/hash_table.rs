/*!
A robin-hood open-addressing hash table mapping storage IDs to a `u64`
value (the custody ID currently tracking that stored bundle). Used as the
active bundle table's secondary index (§5): the table itself is addressed
by custody ID modulo its size, but looking a bundle up by storage ID — the
identity a storage adapter deals in — needs this auxiliary index.

Robin-hood hashing bounds worst-case probe length by letting an insertion
steal a slot from an entry that has probed less far than the one being
placed, rather than always probing past occupied slots; this keeps lookups
fast even as the table approaches its load factor. Callers are expected to
size the table so occupancy stays at or below 0.75 — this table does not
grow itself.
*/

use alloc::vec::Vec;

fn mix(key: u64) -> u64 {
    let mut h = key;
    h ^= h >> 33;
    h = h.wrapping_mul(0xff51_afd7_ed55_8ccd);
    h ^= h >> 33;
    h = h.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    h ^= h >> 33;
    h
}

#[derive(Clone)]
struct Slot {
    key: u64,
    value: u64,
    probe_distance: u32,
}

pub struct RobinHoodMap {
    slots: Vec<Option<Slot>>,
    len: usize,
    mask: u64,
}

impl RobinHoodMap {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.next_power_of_two().max(1);
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            len: 0,
            mask: (capacity - 1) as u64,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn load_factor(&self) -> f32 {
        self.len as f32 / self.slots.len() as f32
    }

    fn home(&self, key: u64) -> usize {
        (mix(key) & self.mask) as usize
    }

    fn step(&self, idx: usize) -> usize {
        (idx + 1) & self.mask as usize
    }

    /// Inserts `value` under `key`. Returns `Ok(previous)` (`None` if the key
    /// was new), or `Err(value)` if the table is already full.
    pub fn insert(&mut self, key: u64, value: u64) -> Result<Option<u64>, u64> {
        if self.len >= self.slots.len() {
            return Err(value);
        }

        let mut idx = self.home(key);
        let mut incoming = Slot {
            key,
            value,
            probe_distance: 0,
        };

        loop {
            match &mut self.slots[idx] {
                None => {
                    self.slots[idx] = Some(incoming);
                    self.len += 1;
                    return Ok(None);
                }
                Some(slot) if slot.key == incoming.key => {
                    let old = core::mem::replace(&mut slot.value, incoming.value);
                    return Ok(Some(old));
                }
                Some(slot) => {
                    if slot.probe_distance < incoming.probe_distance {
                        core::mem::swap(slot, &mut incoming);
                    }
                }
            }
            incoming.probe_distance += 1;
            idx = self.step(idx);
        }
    }

    pub fn get(&self, key: u64) -> Option<u64> {
        let mut idx = self.home(key);
        let mut distance = 0u32;
        loop {
            match &self.slots[idx] {
                None => return None,
                Some(slot) if slot.key == key => return Some(slot.value),
                Some(slot) => {
                    if slot.probe_distance < distance {
                        return None;
                    }
                }
            }
            distance += 1;
            idx = self.step(idx);
        }
    }

    /// Removes `key`, back-shifting the entries that follow it to keep every
    /// remaining entry's probe distance minimal.
    pub fn remove(&mut self, key: u64) -> Option<u64> {
        let mut idx = self.home(key);
        let mut distance = 0u32;
        loop {
            match &self.slots[idx] {
                None => return None,
                Some(slot) if slot.key == key => break,
                Some(slot) => {
                    if slot.probe_distance < distance {
                        return None;
                    }
                }
            }
            distance += 1;
            idx = self.step(idx);
        }

        let removed = self.slots[idx].take().map(|s| s.value);
        self.len -= 1;

        let mut hole = idx;
        loop {
            let next = self.step(hole);
            match self.slots[next].take() {
                None => break,
                Some(mut slot) => {
                    if slot.probe_distance == 0 {
                        self.slots[next] = Some(slot);
                        break;
                    }
                    slot.probe_distance -= 1;
                    self.slots[hole] = Some(slot);
                    hole = next;
                }
            }
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_get_round_trip() {
        let mut map = RobinHoodMap::with_capacity(16);
        map.insert(42, 100).unwrap();
        map.insert(7, 200).unwrap();
        assert_eq!(map.get(42), Some(100));
        assert_eq!(map.get(7), Some(200));
        assert_eq!(map.get(99), None);
    }

    #[test]
    fn insert_overwrites_existing_key() {
        let mut map = RobinHoodMap::with_capacity(16);
        map.insert(1, 10).unwrap();
        let previous = map.insert(1, 20).unwrap();
        assert_eq!(previous, Some(10));
        assert_eq!(map.get(1), Some(20));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn remove_makes_key_unreachable_and_preserves_others() {
        let mut map = RobinHoodMap::with_capacity(16);
        for i in 0..10u64 {
            map.insert(i, i * 10).unwrap();
        }
        assert_eq!(map.remove(5), Some(50));
        assert_eq!(map.get(5), None);
        for i in (0..10u64).filter(|&i| i != 5) {
            assert_eq!(map.get(i), Some(i * 10));
        }
        assert_eq!(map.len(), 9);
    }

    #[test]
    fn full_table_rejects_further_inserts() {
        let mut map = RobinHoodMap::with_capacity(4);
        for i in 0..4u64 {
            map.insert(i, i).unwrap();
        }
        assert!(map.insert(100, 0).is_err());
    }

    #[test]
    fn survives_heavy_collisions_under_load() {
        let mut map = RobinHoodMap::with_capacity(64);
        for i in 0..48u64 {
            map.insert(i, i * 2).unwrap();
        }
        for i in 0..48u64 {
            assert_eq!(map.get(i), Some(i * 2));
        }
        assert!(map.load_factor() <= 0.75);
    }
}

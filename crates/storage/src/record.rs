//! Record arena
//!
//! Records live in a slot vector owned by the table. Index entries refer to
//! them through a [`RecordId`] handle, never a reference, so deleting a record
//! cannot leave a dangling pointer behind: a stale handle simply fails to
//! resolve.
//!
//! # Invariants
//!
//! - Slots are reused after removal, generations are not: a handle taken
//!   before a removal never resolves to the slot's next occupant.
//! - `index_refs` lists exactly the entries the record currently owns, one per
//!   index at most.

use doctable_core::{Key, Timestamp};
use smallvec::SmallVec;

use crate::index::IndexId;

/// Handle to a record slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId {
    slot: u32,
    generation: u32,
}

impl RecordId {
    /// Slot position in the arena
    pub fn slot(&self) -> usize {
        self.slot as usize
    }
}

/// One stored row
#[derive(Debug, Clone)]
pub struct Record {
    /// Primary key
    pub key: Key,
    /// Raw value bytes
    pub value: Vec<u8>,
    /// Instant after which reads treat the record as absent
    pub expires_at: Option<Timestamp>,
    /// Entries this record owns, by index, with the projected key
    pub(crate) index_refs: SmallVec<[(IndexId, Key); 4]>,
}

impl Record {
    /// A record with no index entries yet
    pub fn new(key: Key, value: Vec<u8>, expires_at: Option<Timestamp>) -> Self {
        Record {
            key,
            value,
            expires_at,
            index_refs: SmallVec::new(),
        }
    }

    /// True when `now` is past the record's expiry
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expires_at.map_or(false, |at| at.has_passed(now))
    }

    /// Projected key held in `index`, if any
    pub fn index_key(&self, index: IndexId) -> Option<&Key> {
        self.index_refs
            .iter()
            .find(|(id, _)| *id == index)
            .map(|(_, key)| key)
    }

    /// Number of index entries this record owns
    pub fn index_count(&self) -> usize {
        self.index_refs.len()
    }

    pub(crate) fn take_index_ref(&mut self, index: IndexId) -> Option<Key> {
        let pos = self.index_refs.iter().position(|(id, _)| *id == index)?;
        Some(self.index_refs.swap_remove(pos).1)
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    record: Option<Record>,
}

/// Slot storage for records
#[derive(Debug, Default)]
pub struct RecordArena {
    slots: Vec<Slot>,
    free_slots: Vec<u32>,
    len: usize,
}

impl RecordArena {
    /// Empty arena
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a record, reusing a free slot when one exists
    pub fn insert(&mut self, record: Record) -> RecordId {
        self.len += 1;
        if let Some(slot) = self.free_slots.pop() {
            let entry = &mut self.slots[slot as usize];
            entry.record = Some(record);
            return RecordId {
                slot,
                generation: entry.generation,
            };
        }
        let slot = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            record: Some(record),
        });
        RecordId {
            slot,
            generation: 0,
        }
    }

    /// Resolve a handle
    pub fn get(&self, id: RecordId) -> Option<&Record> {
        self.slots
            .get(id.slot())
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.record.as_ref())
    }

    /// Resolve a handle mutably
    pub fn get_mut(&mut self, id: RecordId) -> Option<&mut Record> {
        self.slots
            .get_mut(id.slot())
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.record.as_mut())
    }

    /// Remove a record and free its slot
    pub fn remove(&mut self, id: RecordId) -> Option<Record> {
        let slot = self
            .slots
            .get_mut(id.slot())
            .filter(|s| s.generation == id.generation)?;
        let record = slot.record.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_slots.push(id.slot);
        self.len -= 1;
        Some(record)
    }

    /// Live record count
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when no records are stored
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Drop every record
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free_slots.clear();
        self.len = 0;
    }
}

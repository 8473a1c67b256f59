use std::collections::TryReserveError;
use std::fmt;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum EntityStatus {
    #[default]
    Active,
    PendingDelete,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum ArrayStatus {
    #[default]
    Normal,
    NeedsClean,
}

/// Bookkeeping every stored record carries.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Slot {
    pub index: usize,
    pub status: EntityStatus,
}

pub trait Record {
    fn slot(&self) -> &Slot;
    fn slot_mut(&mut self) -> &mut Slot;

    fn is_live(&self) -> bool {
        self.slot().status == EntityStatus::Active
    }
}

#[derive(Debug, Clone)]
pub enum ArrayError {
    Full { kind: &'static str, capacity: usize },
    Allocation { kind: &'static str, source: TryReserveError },
}

impl ArrayError {
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ArrayError::Full { .. })
    }
}

impl fmt::Display for ArrayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArrayError::Full { kind, capacity } => {
                write!(f, "{} array is full ({} records)", kind, capacity)
            }
            ArrayError::Allocation { kind, source } => {
                write!(f, "could not allocate {} array: {}", kind, source)
            }
        }
    }
}

impl std::error::Error for ArrayError {}

/// Fixed-capacity dense storage for one entity kind. Live records always
/// occupy `[0, len)` and each record's slot index equals its position.
pub struct EntityArray<T: Record> {
    kind: &'static str,
    records: Vec<T>,
    capacity: usize,
    status: ArrayStatus,
}

impl<T: Record> EntityArray<T> {
    pub fn create(kind: &'static str, capacity: usize) -> Result<Self, ArrayError> {
        let mut records = Vec::new();
        records
            .try_reserve_exact(capacity)
            .map_err(|source| ArrayError::Allocation { kind, source })?;
        Ok(Self {
            kind,
            records,
            capacity,
            status: ArrayStatus::Normal,
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.records.len() >= self.capacity
    }

    /// Appends `record` at the old `len` position and returns that index.
    pub fn add(&mut self, mut record: T) -> Result<usize, ArrayError> {
        if self.is_full() {
            return Err(ArrayError::Full {
                kind: self.kind,
                capacity: self.capacity,
            });
        }
        let index = self.records.len();
        *record.slot_mut() = Slot {
            index,
            status: EntityStatus::Active,
        };
        self.records.push(record);
        Ok(index)
    }

    /// O(1) removal: the last record moves into `index`. Any index held
    /// for the old last record is stale afterwards.
    pub fn delete_at(&mut self, index: usize) -> Option<T> {
        if index >= self.records.len() {
            return None;
        }
        let removed = self.records.swap_remove(index);
        if let Some(moved) = self.records.get_mut(index) {
            moved.slot_mut().index = index;
        }
        Some(removed)
    }

    /// Flags a record for removal by the next [`EntityArray::clean`].
    pub fn mark_delete(&mut self, index: usize) {
        if let Some(record) = self.records.get_mut(index) {
            record.slot_mut().status = EntityStatus::PendingDelete;
            self.status = ArrayStatus::NeedsClean;
        }
    }

    /// Sweeps every pending record. Returns how many were removed.
    pub fn clean(&mut self) -> usize {
        if self.status == ArrayStatus::Normal {
            return 0;
        }
        let mut removed = 0;
        let mut i = 0;
        while i < self.records.len() {
            if self.records[i].slot().status == EntityStatus::PendingDelete {
                // Re-examine i: the swapped-in record has not been looked at.
                self.delete_at(i);
                removed += 1;
            } else {
                i += 1;
            }
        }
        self.status = ArrayStatus::Normal;
        debug_assert!(self.indices_consistent());
        removed
    }

    pub fn reset(&mut self) {
        self.records.clear();
        self.status = ArrayStatus::Normal;
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.records.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.records.get_mut(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.records.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.records.iter_mut()
    }

    pub fn live(&self) -> impl Iterator<Item = &T> {
        self.records.iter().filter(|r| r.is_live())
    }

    pub fn indices_consistent(&self) -> bool {
        self.records
            .iter()
            .enumerate()
            .all(|(i, r)| r.slot().index == i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default, Debug)]
    struct Dummy {
        slot: Slot,
        value: u32,
    }

    impl Record for Dummy {
        fn slot(&self) -> &Slot {
            &self.slot
        }
        fn slot_mut(&mut self) -> &mut Slot {
            &mut self.slot
        }
    }

    fn dummy(value: u32) -> Dummy {
        Dummy {
            value,
            ..Default::default()
        }
    }

    #[test]
    fn full_array_rejects_add_and_clean_compacts() {
        let mut arr = EntityArray::create("dummy", 3).unwrap();
        for v in 0..3 {
            arr.add(dummy(v)).unwrap();
        }
        let err = arr.add(dummy(3)).unwrap_err();
        assert!(matches!(err, ArrayError::Full { capacity: 3, .. }));
        assert!(err.is_recoverable());

        arr.mark_delete(1);
        assert_eq!(arr.status, ArrayStatus::NeedsClean);
        assert_eq!(arr.len(), 3);
        assert_eq!(arr.clean(), 1);

        assert_eq!(arr.len(), 2);
        assert_eq!(arr.get(1).unwrap().value, 2);
        assert_eq!(arr.get(1).unwrap().slot.index, 1);
        assert!(arr.indices_consistent());
    }

    #[test]
    fn clean_rechecks_swapped_in_record() {
        let mut arr = EntityArray::create("dummy", 8).unwrap();
        for v in 0..5 {
            arr.add(dummy(v)).unwrap();
        }
        // The last record is pending too and gets swapped into slot 1.
        arr.mark_delete(1);
        arr.mark_delete(4);
        arr.mark_delete(0);
        assert_eq!(arr.clean(), 3);
        let mut left: Vec<u32> = arr.iter().map(|d| d.value).collect();
        left.sort_unstable();
        assert_eq!(left, vec![2, 3]);
        assert!(arr.indices_consistent());
    }

    #[test]
    fn second_clean_is_noop() {
        let mut arr = EntityArray::create("dummy", 4).unwrap();
        arr.add(dummy(0)).unwrap();
        arr.add(dummy(1)).unwrap();
        arr.mark_delete(0);
        assert_eq!(arr.clean(), 1);
        assert_eq!(arr.status, ArrayStatus::Normal);
        assert_eq!(arr.clean(), 0);
        assert_eq!(arr.len(), 1);
    }

    #[test]
    fn delete_at_moves_last_record_into_hole() {
        let mut arr = EntityArray::create("dummy", 4).unwrap();
        for v in 0..3 {
            arr.add(dummy(v)).unwrap();
        }
        assert_eq!(arr.delete_at(0).map(|d| d.value), Some(0));
        assert_eq!(arr.get(0).unwrap().value, 2);
        assert_eq!(arr.get(0).unwrap().slot.index, 0);
        assert_eq!(arr.delete_at(1).map(|d| d.value), Some(1));
        assert_eq!(arr.len(), 1);
        assert!(arr.delete_at(5).is_none());
    }

    #[test]
    fn add_returns_the_old_len() {
        let mut arr = EntityArray::create("dummy", 4).unwrap();
        assert_eq!(arr.add(dummy(10)).unwrap(), 0);
        assert_eq!(arr.add(dummy(20)).unwrap(), 1);
        arr.delete_at(0);
        assert_eq!(arr.add(dummy(30)).unwrap(), 1);
        assert!(arr.indices_consistent());
    }

    #[test]
    fn reset_drops_everything() {
        let mut arr = EntityArray::create("dummy", 4).unwrap();
        arr.add(dummy(1)).unwrap();
        arr.mark_delete(0);
        arr.reset();
        assert!(arr.is_empty());
        assert_eq!(arr.status, ArrayStatus::Normal);
        assert!(arr.add(dummy(2)).is_ok());
    }

    #[test]
    fn live_skips_pending_records() {
        let mut arr = EntityArray::create("dummy", 4).unwrap();
        arr.add(dummy(1)).unwrap();
        arr.add(dummy(2)).unwrap();
        arr.mark_delete(0);
        let live: Vec<u32> = arr.live().map(|d| d.value).collect();
        assert_eq!(live, vec![2]);
    }

    #[test]
    fn random_sequences_keep_indices_consistent() {
        use rand::rngs::SmallRng;
        use rand::{Rng, SeedableRng};

        let mut rng = SmallRng::seed_from_u64(7);
        let mut arr = EntityArray::create("dummy", 32).unwrap();
        let mut expected_live = 0usize;
        for step in 0..500u32 {
            match rng.gen_range(0..3) {
                0 => {
                    if arr.add(dummy(step)).is_ok() {
                        expected_live += 1;
                    }
                }
                1 if !arr.is_empty() => {
                    let i = rng.gen_range(0..arr.len());
                    if arr.get(i).unwrap().is_live() {
                        expected_live -= 1;
                    }
                    arr.mark_delete(i);
                }
                _ => {
                    arr.clean();
                    assert_eq!(arr.len(), expected_live);
                    assert!(arr.indices_consistent());
                }
            }
        }
    }
}

use crate::txo::{ParticipantId, TxoId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolEntry {
    pub id: TxoId,
    pub value: u64,
    pub depth: u32,
}

/// Result of scanning the pool from the smallest entry upwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub count: usize,
    pub sum: u64,
    pub max_depth: u32,
    pub covered: bool,
}

/// Unspent txos of one participant, kept ascending by value.
#[derive(Debug, Clone)]
pub struct LiquidityPool {
    participant: ParticipantId,
    entries: Vec<PoolEntry>,
    deposited: u64,
    withdrawn: u64,
}

impl LiquidityPool {
    pub fn new(participant: ParticipantId) -> Self {
        Self {
            participant,
            entries: Vec::with_capacity(100),
            deposited: 0,
            withdrawn: 0,
        }
    }

    pub fn participant(&self) -> ParticipantId {
        self.participant
    }

    pub fn entries(&self) -> &[PoolEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&PoolEntry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn balance(&self) -> u64 {
        self.entries.iter().map(|entry| entry.value).sum()
    }

    pub fn deposited(&self) -> u64 {
        self.deposited
    }

    pub fn withdrawn(&self) -> u64 {
        self.withdrawn
    }

    /// Greedy smallest-first selection. Stops at the first prefix whose sum
    /// covers `amount`; `covered` is false when the whole pool is not enough.
    pub fn plan_selection(&self, amount: u64) -> Selection {
        let mut selection = Selection {
            count: 0,
            sum: 0,
            max_depth: 0,
            covered: false,
        };
        for entry in self.entries.iter() {
            selection.count += 1;
            selection.sum = selection.sum.saturating_add(entry.value);
            selection.max_depth = selection.max_depth.max(entry.depth);
            if selection.sum >= amount {
                selection.covered = true;
                break;
            }
        }
        selection
    }

    /// Adds freshly minted money. Only used when the whole pool cannot cover
    /// a transfer, so the new entry is larger than any existing one.
    pub fn deposit_largest(&mut self, entry: PoolEntry) {
        debug_assert!(self
            .entries
            .last()
            .map(|last| last.value <= entry.value)
            .unwrap_or(true));
        self.deposited += entry.value;
        self.entries.push(entry);
    }

    /// Inserts after any entries of equal value and returns the position.
    pub fn insert_sorted(&mut self, entry: PoolEntry) -> usize {
        let index = self
            .entries
            .partition_point(|existing| existing.value <= entry.value);
        self.deposited += entry.value;
        self.entries.insert(index, entry);
        index
    }

    pub fn take_prefix(&mut self, count: usize) -> Vec<PoolEntry> {
        let taken: Vec<PoolEntry> = self.entries.drain(..count.min(self.entries.len())).collect();
        self.withdrawn += taken.iter().map(|entry| entry.value).sum::<u64>();
        taken
    }

    /// Swaps the entry at `index` for another one of identical value.
    pub fn replace(&mut self, index: usize, entry: PoolEntry) -> Option<PoolEntry> {
        let slot = self.entries.get_mut(index)?;
        if slot.value != entry.value {
            return None;
        }
        Some(std::mem::replace(slot, entry))
    }
}

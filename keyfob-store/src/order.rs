//! Display order of the stored tokens.
//!
//! Ids are appended at the end of the physical list, but shown newest first. All translation
//! between the two happens in [`Order::physical`].

use serde::{Deserialize, Serialize};

/// Bounded list of token ids, persisted under the reserved key `0`.
///
/// The id list always has the length of the capacity, unused slots are zero.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    ids: Vec<u32>,
    used: u8,
}

impl Order {
    #[must_use]
    pub fn new(capacity: u8) -> Self {
        Self {
            ids: vec![0; usize::from(capacity)],
            used: 0,
        }
    }

    /// Adjust the slot count after loading. Never drops used entries.
    pub(crate) fn fit(&mut self, capacity: u8) {
        self.used = self
            .used
            .min(u8::try_from(self.ids.len()).unwrap_or(u8::MAX));
        self.ids.resize(usize::from(capacity).max(self.len()), 0);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        usize::from(self.used)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.used == 0
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.len() >= self.ids.len()
    }

    /// Map a logical position (0 = most recently added) to the index in the stored list.
    #[must_use]
    pub fn physical(&self, position: usize) -> Option<usize> {
        (position < self.len()).then(|| self.len() - 1 - position)
    }

    /// Id at the logical `position`.
    #[must_use]
    pub fn get(&self, position: usize) -> Option<u32> {
        self.physical(position).map(|index| self.ids[index])
    }

    #[must_use]
    pub fn contains(&self, id: u32) -> bool {
        self.used().contains(&id)
    }

    /// Logical position of `id`. Physical indices are their own inverse under
    /// [`Self::physical`].
    #[must_use]
    pub fn position(&self, id: u32) -> Option<usize> {
        let index = self.used().iter().position(|&i| i == id)?;
        self.physical(index)
    }

    /// Put `id` at logical position 0. Returns `false` if there is no free slot left.
    pub fn push(&mut self, id: u32) -> bool {
        if self.is_full() {
            return false;
        }

        let len = self.len();
        self.ids[len] = id;
        self.used += 1;
        true
    }

    /// Take `id` out of the list, keeping the relative order of all others. Returns `false` if it
    /// wasn't present.
    pub fn remove(&mut self, id: u32) -> bool {
        let Some(index) = self.used().iter().position(|&i| i == id) else {
            return false;
        };

        let len = self.len();
        self.ids[index..len].rotate_left(1);
        self.ids[len - 1] = 0;
        self.used -= 1;
        true
    }

    /// Move the entry at logical position `from` to `to`, shifting everything in between by one.
    /// Returns `false` if either position is out of range.
    pub fn move_entry(&mut self, from: usize, to: usize) -> bool {
        let (Some(from), Some(to)) = (self.physical(from), self.physical(to)) else {
            return false;
        };

        if from < to {
            self.ids[from..=to].rotate_left(1);
        } else {
            self.ids[to..=from].rotate_right(1);
        }
        true
    }

    /// All ids in logical order.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.used().iter().rev().copied()
    }

    fn used(&self) -> &[u32] {
        &self.ids[..self.len()]
    }
}

/// Handle to a value stored in a [`Slab`].
///
/// A key carries the generation of the slot it was issued for, so a key
/// kept after [`Slab::remove`] never aliases a value inserted later into
/// the same slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct Key {
    index: usize,
    generation: u64,
}

enum Slot<T> {
    Occupied { generation: u64, value: T },
    Vacant { generation: u64 },
}

/// A generational slab allocator.
///
/// Values are stored in a contiguous vector and addressed by [`Key`].
/// Freed slots are reused, and every reuse bumps the slot generation so
/// stale keys simply miss.
pub(crate) struct Slab<T> {
    /// Storage for items.
    slots: Vec<Slot<T>>,
    /// Stack of free indices that can be reused.
    free: Vec<usize>,
    /// Number of occupied slots.
    len: usize,
}

impl<T> Slab<T> {
    /// Creates a new `Slab` with room for `size` values before growing.
    pub(crate) fn new(size: usize) -> Self {
        Self {
            slots: Vec::with_capacity(size),
            free: Vec::new(),
            len: 0,
        }
    }

    /// Inserts a value and returns its key.
    pub(crate) fn insert(&mut self, value: T) -> Key {
        self.len += 1;

        if let Some(index) = self.free.pop() {
            let generation = match self.slots[index] {
                Slot::Vacant { generation } => generation + 1,
                Slot::Occupied { .. } => unreachable!("free list points at an occupied slot"),
            };

            self.slots[index] = Slot::Occupied { generation, value };
            return Key { index, generation };
        }

        let index = self.slots.len();
        self.slots.push(Slot::Occupied {
            generation: 0,
            value,
        });

        Key {
            index,
            generation: 0,
        }
    }

    /// Removes and returns the value stored under `key`.
    ///
    /// Returns `None` if the key is stale or was never issued by this slab.
    pub(crate) fn remove(&mut self, key: Key) -> Option<T> {
        let slot = self.slots.get_mut(key.index)?;

        match slot {
            Slot::Occupied { generation, .. } if *generation == key.generation => {}
            _ => return None,
        }

        let old = std::mem::replace(
            slot,
            Slot::Vacant {
                generation: key.generation,
            },
        );

        self.free.push(key.index);
        self.len -= 1;

        match old {
            Slot::Occupied { value, .. } => Some(value),
            Slot::Vacant { .. } => None,
        }
    }

    /// Returns a shared reference to the value under `key`.
    pub(crate) fn get(&self, key: Key) -> Option<&T> {
        match self.slots.get(key.index)? {
            Slot::Occupied { generation, value } if *generation == key.generation => Some(value),
            _ => None,
        }
    }

    /// Returns a mutable reference to the value under `key`.
    pub(crate) fn get_mut(&mut self, key: Key) -> Option<&mut T> {
        match self.slots.get_mut(key.index)? {
            Slot::Occupied { generation, value } if *generation == key.generation => Some(value),
            _ => None,
        }
    }

    /// Number of values currently stored.
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Removes every value, returning them in slot order.
    pub(crate) fn drain(&mut self) -> Vec<T> {
        let mut values = Vec::with_capacity(self.len);

        for (index, slot) in self.slots.iter_mut().enumerate() {
            if let Slot::Occupied { generation, .. } = slot {
                let generation = *generation;
                let old = std::mem::replace(slot, Slot::Vacant { generation });

                if let Slot::Occupied { value, .. } = old {
                    values.push(value);
                }

                self.free.push(index);
            }
        }

        self.len = 0;
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_remove_returns_value() {
        let mut slab = Slab::new(2);
        let key = slab.insert("watcher");

        assert_eq!(slab.len(), 1);
        assert_eq!(slab.get(key), Some(&"watcher"));
        assert_eq!(slab.remove(key), Some("watcher"));
        assert_eq!(slab.len(), 0);
    }

    #[test]
    fn stale_key_misses_after_slot_reuse() {
        let mut slab = Slab::new(1);
        let first = slab.insert(1);
        slab.remove(first);

        let second = slab.insert(2);

        assert_eq!(slab.get(first), None);
        assert_eq!(slab.remove(first), None);
        assert_eq!(slab.get(second), Some(&2));
    }

    #[test]
    fn double_remove_is_a_noop() {
        let mut slab = Slab::new(1);
        let key = slab.insert(7);

        assert_eq!(slab.remove(key), Some(7));
        assert_eq!(slab.remove(key), None);
        assert_eq!(slab.len(), 0);
    }

    #[test]
    fn drain_empties_the_slab() {
        let mut slab = Slab::new(4);
        let a = slab.insert('a');
        slab.insert('b');
        slab.remove(a);
        slab.insert('c');

        let mut drained = slab.drain();
        drained.sort();

        assert_eq!(drained, vec!['b', 'c']);
        assert_eq!(slab.len(), 0);
    }
}

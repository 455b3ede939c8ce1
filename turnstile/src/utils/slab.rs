/// A simple slab allocator.
///
/// A `Slab` stores values of type `T` in a contiguous array and
/// returns small indices that can be reused after removal.
///
/// Internally, it keeps track of:
/// - occupied slots,
/// - free indices,
/// - and the number of live values.
///
/// Indices are not generational: once a value is removed its index may be
/// handed out again by a later [`insert`](Self::insert). Callers that keep
/// an index around after removal must carry their own liveness flag.
pub(crate) struct Slab<T> {
    /// Storage for items; `None` marks a free slot.
    items: Vec<Option<T>>,
    /// Stack of free indices that can be reused.
    free: Vec<usize>,
    /// Number of occupied slots.
    len: usize,
}

impl<T> Slab<T> {
    /// Creates a new `Slab` with a fixed initial capacity.
    ///
    /// All slots are initially free.
    ///
    /// # Arguments
    ///
    /// * `size` - Initial number of slots to allocate.
    pub(crate) fn new(size: usize) -> Self {
        let items = (0..size).map(|_| None).collect();
        // Reversed so that the lowest index is handed out first.
        let free = (0..size).rev().collect();

        Self {
            items,
            free,
            len: 0,
        }
    }

    /// Inserts a value into the slab and returns its index.
    ///
    /// If a free slot is available, it is reused.
    /// Otherwise, the slab grows exponentially.
    pub(crate) fn insert(&mut self, item: T) -> usize {
        let index = if let Some(i) = self.free.pop() {
            i
        } else {
            let len = self.items.len();
            let new_len = if len == 0 { 1 } else { 2 * len };

            self.items.extend((len..new_len).map(|_| None));
            self.free.extend(((len + 1)..new_len).rev());

            len
        };

        self.items[index] = Some(item);
        self.len += 1;

        index
    }

    /// Returns the index the next [`insert`](Self::insert) will use.
    pub(crate) fn vacant_key(&self) -> usize {
        self.free.last().copied().unwrap_or(self.items.len())
    }

    /// Removes and returns the value stored at `index`.
    ///
    /// Returns `None` if the slot is out of bounds or already free, in
    /// which case the slab is left untouched.
    pub(crate) fn remove(&mut self, index: usize) -> Option<T> {
        let item = self.items.get_mut(index)?.take()?;

        self.free.push(index);
        self.len -= 1;

        Some(item)
    }

    /// Returns a mutable reference to the value at `index`, if occupied.
    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.items.get_mut(index)?.as_mut()
    }

    /// Returns the number of occupied slots.
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if no slot is occupied.
    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Removes every value, returning them in index order.
    ///
    /// Allocated capacity is kept and every slot becomes free again.
    pub(crate) fn drain(&mut self) -> Vec<T> {
        let drained: Vec<T> = self.items.iter_mut().filter_map(Option::take).collect();

        self.free.clear();
        self.free.extend((0..self.items.len()).rev());
        self.len = 0;

        drained
    }
}

#[cfg(test)]
mod tests {
    use super::Slab;

    #[test]
    fn insert_reuses_freed_slots() {
        let mut slab = Slab::new(2);

        let a = slab.insert("a");
        let b = slab.insert("b");
        assert_eq!((a, b), (0, 1));

        assert_eq!(slab.remove(a), Some("a"));
        assert_eq!(slab.vacant_key(), a);
        assert_eq!(slab.insert("c"), a);
        assert_eq!(slab.len(), 2);
    }

    #[test]
    fn grows_past_initial_capacity() {
        let mut slab = Slab::new(0);

        let indices: Vec<usize> = (0..5).map(|i| slab.insert(i)).collect();
        let next = slab.vacant_key();

        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
        assert_eq!(slab.get_mut(3).copied(), Some(3));
        assert_eq!(slab.insert(5), next);
    }

    #[test]
    fn stale_index_is_ignored() {
        let mut slab = Slab::new(1);
        let idx = slab.insert(10);

        assert_eq!(slab.remove(idx), Some(10));
        assert_eq!(slab.remove(idx), None);
        assert!(slab.get_mut(idx).is_none());
        assert!(slab.remove(42).is_none());
        assert!(slab.is_empty());
    }

    #[test]
    fn drain_empties_and_keeps_capacity() {
        let mut slab = Slab::new(4);
        slab.insert('x');
        let y = slab.insert('y');
        slab.insert('z');
        slab.remove(y);

        assert_eq!(slab.drain(), vec!['x', 'z']);
        assert!(slab.is_empty());
        assert_eq!(slab.insert('w'), 0);
    }
}

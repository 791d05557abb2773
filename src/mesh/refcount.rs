//! Reference-counted id allocation.
//!
//! Each slot holds a count: [`FREE`] for an unused slot, `>= 1` for a live
//! element. Freed slots are reused before the vector grows, so ids of live
//! elements never move.

/// Marker stored in free slots.
pub const FREE: i32 = -1;

/// Refcount storage with free-slot reuse.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RefCountVector {
    counts: Vec<i32>,
    free: Vec<i32>,
    used: usize,
}

impl RefCountVector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from raw counts; any count `<= 0` is a free slot.
    pub fn from_raw(counts: impl IntoIterator<Item = i32>) -> Self {
        let mut free = Vec::new();
        let mut used = 0;
        let counts: Vec<i32> = counts
            .into_iter()
            .enumerate()
            .map(|(i, c)| {
                if c <= 0 {
                    free.push(i as i32);
                    FREE
                } else {
                    used += 1;
                    c
                }
            })
            .collect();
        // Lowest free id is reused first.
        free.reverse();
        Self { counts, free, used }
    }

    /// Allocate an id with count 1.
    pub fn allocate(&mut self) -> i32 {
        self.used += 1;
        if let Some(id) = self.free.pop() {
            self.counts[id as usize] = 1;
            id
        } else {
            self.counts.push(1);
            (self.counts.len() - 1) as i32
        }
    }

    #[inline]
    pub fn is_valid(&self, id: i32) -> bool {
        id >= 0 && (id as usize) < self.counts.len() && self.counts[id as usize] > 0
    }

    #[inline]
    pub fn ref_count(&self, id: i32) -> i32 {
        if self.is_valid(id) { self.counts[id as usize] } else { 0 }
    }

    pub fn increment(&mut self, id: i32) {
        debug_assert!(self.is_valid(id));
        self.counts[id as usize] += 1;
    }

    /// Decrement a live slot, freeing it when the count reaches zero.
    pub fn decrement(&mut self, id: i32) {
        debug_assert!(self.is_valid(id));
        let c = &mut self.counts[id as usize];
        *c -= 1;
        if *c == 0 {
            *c = FREE;
            self.free.push(id);
            self.used -= 1;
        }
    }

    /// Number of live slots.
    #[inline]
    pub fn count(&self) -> usize {
        self.used
    }

    /// One past the largest id ever allocated.
    #[inline]
    pub fn max_index(&self) -> usize {
        self.counts.len()
    }

    /// True when no free slots exist below `max_index`.
    #[inline]
    pub fn is_dense(&self) -> bool {
        self.used == self.counts.len()
    }

    /// Raw counts, free slots included.
    pub fn raw(&self) -> &[i32] {
        &self.counts
    }

    /// Iterate over live ids in ascending order.
    pub fn indices(&self) -> impl Iterator<Item = i32> + '_ {
        self.counts
            .iter()
            .enumerate()
            .filter(|(_, &c)| c > 0)
            .map(|(i, _)| i as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_and_reuse() {
        let mut rc = RefCountVector::new();
        assert_eq!(rc.allocate(), 0);
        assert_eq!(rc.allocate(), 1);
        assert_eq!(rc.allocate(), 2);
        rc.decrement(1);
        assert!(!rc.is_valid(1));
        assert!(!rc.is_dense());
        assert_eq!(rc.count(), 2);
        assert_eq!(rc.allocate(), 1);
        assert!(rc.is_dense());
    }

    #[test]
    fn test_from_raw() {
        let rc = RefCountVector::from_raw(vec![1, FREE, 3, 0, 1]);
        assert_eq!(rc.count(), 3);
        assert_eq!(rc.max_index(), 5);
        assert_eq!(rc.indices().collect::<Vec<_>>(), vec![0, 2, 4]);
        assert_eq!(rc.raw(), &[1, FREE, 3, FREE, 1]);

        let mut rc = rc;
        assert_eq!(rc.allocate(), 1);
        assert_eq!(rc.allocate(), 3);
        assert_eq!(rc.allocate(), 5);
    }

    #[test]
    fn test_increment_decrement() {
        let mut rc = RefCountVector::new();
        let id = rc.allocate();
        rc.increment(id);
        assert_eq!(rc.ref_count(id), 2);
        rc.decrement(id);
        assert!(rc.is_valid(id));
        rc.decrement(id);
        assert!(!rc.is_valid(id));
        assert_eq!(rc.ref_count(id), 0);
    }

    #[test]
    fn test_count_past_i16_range() {
        let mut rc = RefCountVector::new();
        let id = rc.allocate();
        for _ in 0..40_000 {
            rc.increment(id);
        }
        assert_eq!(rc.ref_count(id), 40_001);
        assert!(rc.is_valid(id));
    }
}

/// A contiguous half-open slice of the total work owned by one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partition {
    pub owner_id: usize,
    pub start: u64,
    pub len: u64,
}

impl Partition {
    /// Computes the partition owned by `owner_id`.
    ///
    /// The first `total % worker_count` workers get one extra unit, so for a fixed
    /// `(total, worker_count)` the partitions of all owners are contiguous, disjoint,
    /// cover `[0..total)` and differ in length by at most 1. Owners may end up with
    /// an empty partition when `total < worker_count`.
    ///
    /// # Args
    /// * `total` - The amount of work units to split.
    /// * `worker_count` - The amount of workers in the group.
    /// * `owner_id` - The worker to compute the partition for.
    ///
    /// # Panics
    /// If `worker_count` is zero or `owner_id` is out of range.
    pub fn new(total: u64, worker_count: usize, owner_id: usize) -> Self {
        assert!(worker_count > 0, "worker_count must be positive");
        assert!(owner_id < worker_count, "owner_id out of range");

        let workers = worker_count as u64;
        let id = owner_id as u64;
        let base = total / workers;
        let rem = total % workers;

        // `id * base` never exceeds `total`, so this can't overflow.
        let start = id * base + id.min(rem);
        let len = base + u64::from(id < rem);

        Self {
            owner_id,
            start,
            len,
        }
    }

    #[inline]
    pub fn end(&self) -> u64 {
        self.start + self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds(part: Partition) -> (u64, u64) {
        (part.start, part.end())
    }

    fn all(total: u64, worker_count: usize) -> Vec<Partition> {
        (0..worker_count)
            .map(|id| Partition::new(total, worker_count, id))
            .collect()
    }

    #[test]
    fn partitions_cover_the_work_without_gaps() {
        for total in [0, 1, 7, 1_000_000] {
            for worker_count in [1, 2, 3, 7] {
                let parts = all(total, worker_count);

                let mut next = 0;
                for part in &parts {
                    assert_eq!(part.start, next, "gap or overlap at {part:?}");
                    next = part.end();
                }
                assert_eq!(next, total);
                assert_eq!(parts.iter().map(|p| p.len).sum::<u64>(), total);
            }
        }
    }

    #[test]
    fn partition_sizes_differ_by_at_most_one() {
        for total in [0, 1, 5, 7, 10, 999, 1_000_000] {
            for worker_count in [1, 2, 3, 4, 7, 8, 13] {
                let lens: Vec<_> = all(total, worker_count).iter().map(|p| p.len).collect();
                let max = lens.iter().max().unwrap();
                let min = lens.iter().min().unwrap();
                assert!(max - min <= 1, "total={total} workers={worker_count} {lens:?}");
            }
        }
    }

    #[test]
    fn remainder_goes_to_the_lowest_ids() {
        // total 10, workers 3 => sizes 4,3,3
        assert_eq!(bounds(Partition::new(10, 3, 0)), (0, 4));
        assert_eq!(bounds(Partition::new(10, 3, 1)), (4, 7));
        assert_eq!(bounds(Partition::new(10, 3, 2)), (7, 10));
    }

    #[test]
    fn fewer_units_than_workers_leaves_empty_partitions() {
        let parts = all(2, 4);
        assert_eq!(bounds(parts[0]), (0, 1));
        assert_eq!(bounds(parts[1]), (1, 2));
        assert!(parts[2].is_empty());
        assert!(parts[3].is_empty());
        assert_eq!(parts[3].start, 2);
    }

    #[test]
    fn single_worker_owns_everything() {
        assert_eq!(bounds(Partition::new(42, 1, 0)), (0, 42));
    }

    #[test]
    fn huge_totals_do_not_overflow() {
        let last = Partition::new(u64::MAX, 3, 2);
        assert_eq!(last.end(), u64::MAX);
    }
}

use alloc::vec;
use alloc::vec::Vec;

use crate::digest::Bucket;
use crate::digest::Digest;
use crate::probe_table::ProbeTable;
use crate::probe_table::Slot;

/// Clustering statistics for a [`ProbeTable`].
///
/// Available with the `stats` feature.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeStats {
    /// Number of slots in the table.
    pub capacity: usize,
    /// Number of live entries.
    pub live: usize,
    /// Number of tombstoned slots.
    pub tombstones: usize,
    /// Number of empty slots.
    pub empty: usize,
    /// `histogram[d]` is the number of live entries sitting `d` slots past
    /// their home bucket.
    pub histogram: Vec<usize>,
    /// Longest run of consecutive non-empty slots, counting wraparound.
    pub longest_run: usize,
}

impl ProbeStats {
    /// Largest displacement of any live entry, or `None` for an empty table.
    pub fn max_displacement(&self) -> Option<usize> {
        self.histogram.iter().rposition(|&count| count > 0)
    }

    /// Mean displacement of live entries.
    pub fn mean_displacement(&self) -> f64 {
        if self.live == 0 {
            return 0.0;
        }
        let total: usize = self
            .histogram
            .iter()
            .enumerate()
            .map(|(distance, count)| distance * count)
            .sum();
        total as f64 / self.live as f64
    }

    /// Pretty-prints the statistics.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        println!("=== Probe Table Statistics ===");
        println!(
            "Slots: {} live, {} tombstoned, {} empty of {}",
            self.live, self.tombstones, self.empty, self.capacity
        );
        println!(
            "Displacement: max {}, mean {:.2}",
            self.max_displacement().unwrap_or(0),
            self.mean_displacement()
        );
        println!("Longest run: {} slots", self.longest_run);
        for (distance, &count) in self.histogram.iter().enumerate() {
            if count > 0 {
                println!("{distance:>4} | {count}");
            }
        }
    }
}

impl<D, B> ProbeTable<D, B>
where
    D: Digest,
    B: Bucket,
{
    /// Computes displacement and clustering statistics for the current slots.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use probe_table::ProbeTable;
    /// #
    /// let mut table = ProbeTable::with_capacity(8).unwrap();
    /// table.upsert("a", "1");
    /// let stats = table.probe_stats();
    /// assert_eq!(stats.live, 1);
    /// assert_eq!(stats.max_displacement(), Some(0));
    /// ```
    pub fn probe_stats(&self) -> ProbeStats {
        let capacity = self.capacity.get();
        let mut histogram = vec![0usize; capacity];
        let mut tombstones = 0;
        let mut empty = 0;

        for (index, slot) in self.slots.iter().enumerate() {
            match slot {
                Slot::Empty => empty += 1,
                Slot::Tombstone { .. } => tombstones += 1,
                Slot::Live { digest, .. } => {
                    let home = self.bucket.bucket(*digest, self.capacity) % capacity;
                    histogram[(index + capacity - home) % capacity] += 1;
                }
            }
        }

        if let Some(last) = histogram.iter().rposition(|&count| count > 0) {
            histogram.truncate(last + 1);
        } else {
            histogram.clear();
        }

        ProbeStats {
            capacity,
            live: self.size,
            tombstones,
            empty,
            histogram,
            longest_run: self.longest_run(),
        }
    }

    fn longest_run(&self) -> usize {
        let capacity = self.capacity.get();
        let Some(first_empty) = self.slots.iter().position(|s| matches!(s, Slot::Empty)) else {
            return capacity;
        };

        let mut longest = 0;
        let mut run = 0;
        for step in 1..=capacity {
            match self.slots[(first_empty + step) % capacity] {
                Slot::Empty => run = 0,
                Slot::Live { .. } | Slot::Tombstone { .. } => {
                    run += 1;
                    longest = longest.max(run);
                }
            }
        }
        longest
    }
}

#[cfg(test)]
mod tests {
    use crate::digest::ModuloBucket;

    use super::*;

    fn numeric(key: &str) -> u64 {
        key.parse().unwrap()
    }

    #[test]
    fn empty_table_stats() {
        let table = ProbeTable::with_capacity(4).unwrap();
        let stats = table.probe_stats();
        assert_eq!(stats.live, 0);
        assert_eq!(stats.empty, 4);
        assert!(stats.histogram.is_empty());
        assert_eq!(stats.max_displacement(), None);
        assert_eq!(stats.mean_displacement(), 0.0);
        assert_eq!(stats.longest_run, 0);
    }

    #[test]
    fn displacement_counts_wraparound() {
        let mut table =
            ProbeTable::with_capacity_and_hashers(4, numeric, ModuloBucket).unwrap();
        table.upsert("3", "a");
        table.upsert("7", "b");
        table.upsert("11", "c");

        let stats = table.probe_stats();
        assert_eq!(stats.histogram, [1, 1, 1]);
        assert_eq!(stats.max_displacement(), Some(2));
        assert_eq!(stats.mean_displacement(), 1.0);
        assert_eq!(stats.longest_run, 3);
        assert_eq!(stats.empty, 1);
    }

    #[test]
    fn tombstones_extend_runs() {
        let mut table =
            ProbeTable::with_capacity_and_hashers(6, numeric, ModuloBucket).unwrap();
        for key in ["0", "1", "2"] {
            table.upsert(key, "x");
        }
        table.remove("1");

        let stats = table.probe_stats();
        assert_eq!(stats.live, 2);
        assert_eq!(stats.tombstones, 1);
        assert_eq!(stats.empty, 3);
        assert_eq!(stats.longest_run, 3);
        assert_eq!(stats.histogram, [2]);
    }

    #[test]
    fn full_table_is_one_run() {
        let mut table = ProbeTable::with_capacity(2).unwrap();
        table.upsert("a", "1");
        table.upsert("b", "2");
        assert_eq!(table.probe_stats().longest_run, 2);
    }
}

use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;
use core::fmt::Debug;
use core::num::NonZeroUsize;

use tracing::debug;
use tracing::trace;

use crate::digest::Bucket;
use crate::digest::Digest;
use crate::digest::Djb2;
use crate::digest::ModuloBucket;
use crate::error::Error;
use crate::error::Result;

/// Tables at or above this many slots only print their counters.
const DESCRIBE_SLOT_LIMIT: usize = 130;

#[derive(Clone)]
pub(crate) enum Slot {
    Empty,
    Live {
        key: String,
        value: String,
        digest: u64,
    },
    /// Keeps its digest so probe chains running through it stay intact and so
    /// a later upsert of the same digest can reclaim it.
    Tombstone {
        digest: u64,
    },
}

impl Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Empty => f.write_str("Empty"),
            Slot::Live { key, value, digest } => f
                .debug_struct("Live")
                .field("key", key)
                .field("value", value)
                .field("digest", digest)
                .finish(),
            Slot::Tombstone { digest } => f.debug_struct("Tombstone").field("digest", digest).finish(),
        }
    }
}

/// Outcome of walking a probe chain for one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Probe {
    /// A live slot holds the key.
    Found(usize),
    /// The key is absent and may be placed at `index`. `reclaim` is set when
    /// `index` is a tombstone left by the same digest.
    Vacant { index: usize, reclaim: bool },
    /// One full cycle without a place for the key.
    Full,
}

/// Walks the chain for `(key, digest)` starting at its bucket.
///
/// The walk stops at the first empty slot or after `capacity` steps. A
/// tombstone carrying the same digest is remembered but does not stop the
/// walk: the key may still be live further along, and reclaiming the
/// tombstone first would leave two live copies.
fn probe<B: Bucket>(
    slots: &[Slot],
    bucket: &B,
    capacity: NonZeroUsize,
    key: &str,
    digest: u64,
) -> Probe {
    let cap = capacity.get();
    let start = bucket.bucket(digest, capacity);
    debug_assert!(start < cap, "bucket {start} out of range for {cap} slots");
    let start = start % cap;

    let mut grave = None;
    for step in 0..cap {
        let index = (start + step) % cap;
        match &slots[index] {
            Slot::Empty => {
                return match grave {
                    Some(index) => Probe::Vacant {
                        index,
                        reclaim: true,
                    },
                    None => Probe::Vacant {
                        index,
                        reclaim: false,
                    },
                };
            }
            Slot::Live {
                key: live_key,
                digest: live_digest,
                ..
            } if *live_digest == digest && live_key == key => return Probe::Found(index),
            Slot::Tombstone { digest: dead } if *dead == digest && grave.is_none() => {
                grave = Some(index);
            }
            _ => {}
        }
    }

    match grave {
        Some(index) => Probe::Vacant {
            index,
            reclaim: true,
        },
        None => Probe::Full,
    }
}

/// A fixed-capacity string-to-string table using open addressing with linear
/// probing.
///
/// The table never grows on its own. An insert that finds no room fails with
/// [`Error::TableFull`] and the caller decides whether to [`resize`].
///
/// Removal leaves a tombstone behind so that entries further along a probe
/// chain stay reachable. Tombstones count towards [`occupied`] until the next
/// resize, which rebuilds the slot sequence from the live entries only.
///
/// Two keys are the same entry only if both their digests and their strings
/// match, so a weak [`Digest`] costs probe length but never merges entries.
///
/// ## Example
///
/// ```rust
/// # use probe_table::ProbeTable;
/// #
/// let mut table = ProbeTable::with_capacity(8).unwrap();
/// assert!(table.upsert("apple", "red"));
/// assert!(table.upsert("banana", "yellow"));
/// assert_eq!(table.get("apple"), "red");
///
/// assert!(table.remove("apple"));
/// assert_eq!(table.get("apple"), "");
/// assert_eq!(table.len(), 1);
/// assert_eq!(table.occupied(), 2);
///
/// table.resize(16).unwrap();
/// assert_eq!(table.occupied(), 1);
/// assert_eq!(table.get("banana"), "yellow");
/// ```
///
/// [`resize`]: ProbeTable::resize
/// [`occupied`]: ProbeTable::occupied
#[derive(Clone)]
pub struct ProbeTable<D = Djb2, B = ModuloBucket> {
    pub(crate) slots: Vec<Slot>,
    pub(crate) capacity: NonZeroUsize,
    pub(crate) size: usize,
    pub(crate) occupied: usize,
    pub(crate) digest: D,
    pub(crate) bucket: B,
}

impl<D, B> Debug for ProbeTable<D, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        struct Slots<'a>(&'a [Slot]);

        impl Debug for Slots<'_> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let mut list = f.debug_list();
                for slot in self.0 {
                    match slot {
                        Slot::Empty => list.entry(&format_args!("..")),
                        Slot::Tombstone { digest } => list.entry(&format_args!("x{digest:08x}")),
                        Slot::Live { key, value, .. } => {
                            list.entry(&format_args!("{key:?}={value:?}"))
                        }
                    };
                }
                list.finish()
            }
        }

        f.debug_struct("ProbeTable")
            .field("slots", &Slots(&self.slots))
            .field("size", &self.size)
            .field("occupied", &self.occupied)
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl ProbeTable {
    /// Creates a table with `capacity` empty slots, hashing keys with
    /// [`Djb2`] and reducing digests with [`ModuloBucket`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCapacity`] if `capacity` is zero.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use probe_table::Error;
    /// # use probe_table::ProbeTable;
    /// #
    /// let table = ProbeTable::with_capacity(10).unwrap();
    /// assert_eq!(table.capacity(), 10);
    /// assert!(table.is_empty());
    ///
    /// assert_eq!(
    ///     ProbeTable::with_capacity(0).unwrap_err(),
    ///     Error::InvalidCapacity { requested: 0 }
    /// );
    /// ```
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        Self::with_capacity_and_hashers(capacity, Djb2, ModuloBucket)
    }
}

impl<D, B> ProbeTable<D, B>
where
    D: Digest,
    B: Bucket,
{
    /// Creates a table with `capacity` empty slots using the given digest and
    /// bucket functions.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCapacity`] if `capacity` is zero.
    pub fn with_capacity_and_hashers(capacity: usize, digest: D, bucket: B) -> Result<Self> {
        let capacity = NonZeroUsize::new(capacity).ok_or(Error::InvalidCapacity {
            requested: capacity,
        })?;

        Ok(Self {
            slots: vec![Slot::Empty; capacity.get()],
            capacity,
            size: 0,
            occupied: 0,
            digest,
            bucket,
        })
    }

    fn find(&self, key: &str) -> Option<usize> {
        let digest = self.digest.digest(key);
        match probe(&self.slots, &self.bucket, self.capacity, key, digest) {
            Probe::Found(index) => Some(index),
            Probe::Vacant { .. } | Probe::Full => None,
        }
    }

    /// Maps `key` to `value`, replacing the value if `key` is already present.
    ///
    /// A new key takes the first empty slot on its probe chain, unless the
    /// chain holds a tombstone left by the same digest, in which case that
    /// tombstone is brought back to life. Reclaiming a tombstone raises
    /// [`len`] but not [`occupied`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::TableFull`] if a full probe cycle finds no place for
    /// the key. The table is left unchanged.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use probe_table::Error;
    /// # use probe_table::ProbeTable;
    /// #
    /// let mut table = ProbeTable::with_capacity(1).unwrap();
    /// table.try_upsert("a", "1").unwrap();
    /// table.try_upsert("a", "2").unwrap();
    /// assert_eq!(table.get("a"), "2");
    /// assert_eq!(
    ///     table.try_upsert("b", "3"),
    ///     Err(Error::TableFull { capacity: 1 })
    /// );
    /// ```
    ///
    /// [`len`]: ProbeTable::len
    /// [`occupied`]: ProbeTable::occupied
    pub fn try_upsert(&mut self, key: &str, value: &str) -> Result<()> {
        let digest = self.digest.digest(key);

        match probe(&self.slots, &self.bucket, self.capacity, key, digest) {
            Probe::Found(index) => {
                if let Slot::Live { value: current, .. } = &mut self.slots[index] {
                    current.clear();
                    current.push_str(value);
                }
            }
            Probe::Vacant { index, reclaim } => {
                if reclaim {
                    trace!(index, digest, "reclaiming tombstone");
                } else {
                    self.occupied += 1;
                }
                self.slots[index] = Slot::Live {
                    key: key.into(),
                    value: value.into(),
                    digest,
                };
                self.size += 1;
            }
            Probe::Full => {
                debug!(
                    capacity = self.capacity.get(),
                    size = self.size,
                    occupied = self.occupied,
                    "no free slot for key"
                );
                return Err(Error::TableFull {
                    capacity: self.capacity.get(),
                });
            }
        }

        debug_assert!(self.size <= self.occupied && self.occupied <= self.capacity.get());
        Ok(())
    }

    /// Maps `key` to `value`, returning `false` if the table had no room.
    ///
    /// This is [`try_upsert`] with the error folded into a flag.
    ///
    /// [`try_upsert`]: ProbeTable::try_upsert
    pub fn upsert(&mut self, key: &str, value: &str) -> bool {
        self.try_upsert(key, value).is_ok()
    }

    /// Returns the value mapped to `key`, or `None` if there is none.
    pub fn get_opt(&self, key: &str) -> Option<&str> {
        match &self.slots[self.find(key)?] {
            Slot::Live { value, .. } => Some(value.as_str()),
            Slot::Empty | Slot::Tombstone { .. } => None,
        }
    }

    /// Returns the value mapped to `key`, or `""` if there is none.
    ///
    /// Use [`get_opt`] to tell an absent key from one mapped to the empty
    /// string.
    ///
    /// [`get_opt`]: ProbeTable::get_opt
    pub fn get(&self, key: &str) -> &str {
        self.get_opt(key).unwrap_or("")
    }

    /// Returns `true` if `key` is mapped to a value.
    pub fn contains(&self, key: &str) -> bool {
        self.find(key).is_some()
    }

    /// Removes `key`, leaving a tombstone in its slot.
    ///
    /// Returns `false` without touching the table if `key` was not present.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use probe_table::ProbeTable;
    /// #
    /// let mut table = ProbeTable::with_capacity(4).unwrap();
    /// table.upsert("k", "v");
    /// assert!(table.remove("k"));
    /// assert!(!table.remove("k"));
    /// assert_eq!(table.len(), 0);
    /// assert_eq!(table.occupied(), 1);
    /// ```
    pub fn remove(&mut self, key: &str) -> bool {
        let Some(index) = self.find(key) else {
            return false;
        };

        if let Slot::Live { digest, .. } = self.slots[index] {
            self.slots[index] = Slot::Tombstone { digest };
            self.size -= 1;
            return true;
        }

        false
    }

    /// Moves every live entry into a fresh sequence of `new_capacity` slots.
    ///
    /// Tombstones are dropped, so afterwards [`occupied`] equals [`len`]. The
    /// new sequence is built completely before it replaces the old one; on
    /// error the table is unchanged.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidCapacity`] if `new_capacity` is zero.
    /// - [`Error::ResizeOverflow`] if `new_capacity` is smaller than [`len`]
    ///   or an entry could not be placed.
    ///
    /// [`len`]: ProbeTable::len
    /// [`occupied`]: ProbeTable::occupied
    pub fn resize(&mut self, new_capacity: usize) -> Result<()> {
        let capacity = NonZeroUsize::new(new_capacity).ok_or(Error::InvalidCapacity {
            requested: new_capacity,
        })?;
        let overflow = Error::ResizeOverflow {
            live: self.size,
            requested: new_capacity,
        };
        if new_capacity < self.size {
            debug!(live = self.size, requested = new_capacity, "resize target too small");
            return Err(overflow);
        }

        debug!(
            from = self.capacity.get(),
            to = new_capacity,
            live = self.size,
            tombstones = self.tombstones(),
            "resizing table"
        );

        let mut slots = vec![Slot::Empty; new_capacity];
        let mut size = 0;
        for slot in &self.slots {
            let Slot::Live { key, value, digest } = slot else {
                continue;
            };

            match probe(&slots, &self.bucket, capacity, key, *digest) {
                Probe::Vacant { index, .. } => {
                    slots[index] = slot.clone();
                    size += 1;
                }
                Probe::Found(_) => unreachable!("duplicate live entry for {key:?}={value:?}"),
                Probe::Full => return Err(overflow),
            }
        }
        debug_assert_eq!(size, self.size);

        self.slots = slots;
        self.capacity = capacity;
        self.size = size;
        self.occupied = size;

        debug!(capacity = new_capacity, live = size, "resized table");
        Ok(())
    }
}

impl<D, B> ProbeTable<D, B> {
    /// Returns the number of slots.
    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    /// Returns the number of live entries.
    pub fn len(&self) -> usize {
        self.size
    }

    /// Returns `true` if the table holds no live entries.
    ///
    /// The table may still contain tombstones.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Returns the number of slots that are live or tombstoned.
    pub fn occupied(&self) -> usize {
        self.occupied
    }

    /// Returns a `(key, value)` iterator over the live entries in slot order.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            slots: self.slots.iter(),
            remaining: self.size,
        }
    }

    /// Returns the number of tombstones waiting for the next resize.
    pub fn tombstones(&self) -> usize {
        self.occupied - self.size
    }

    /// Returns live entries divided by capacity.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use probe_table::ProbeTable;
    /// #
    /// let mut table = ProbeTable::with_capacity(10).unwrap();
    /// table.upsert("a", "1");
    /// table.upsert("b", "2");
    /// table.upsert("c", "3");
    /// assert_eq!(table.load(), 0.3);
    /// ```
    pub fn load(&self) -> f64 {
        self.size as f64 / self.capacity.get() as f64
    }

    /// Returns live plus tombstoned slots divided by capacity.
    ///
    /// This is the fraction of slots that a probe may have to step over, and
    /// is never below [`load`].
    ///
    /// [`load`]: ProbeTable::load
    pub fn occupancy(&self) -> f64 {
        self.occupied as f64 / self.capacity.get() as f64
    }

    /// Returns the state of the slot at `index`, or `None` if out of range.
    pub fn slot_state(&self, index: usize) -> Option<SlotState<'_>> {
        self.slots.get(index).map(|slot| match slot {
            Slot::Empty => SlotState::Empty,
            Slot::Live { key, value, .. } => SlotState::Live {
                key: key.as_str(),
                value: value.as_str(),
            },
            Slot::Tombstone { .. } => SlotState::Tombstone,
        })
    }

    /// Renders the counters and, for small tables, every slot.
    ///
    /// ```text
    /// Hashtable:
    ///   capacity: 4
    ///   size:     1
    ///   occupied: 2
    ///   load:     0.25
    /// [0]    <empty>
    /// [1]    "a" = "1"
    /// [2]    <deleted>
    /// [3]    <empty>
    /// ```
    pub fn describe(&self) -> String {
        alloc::format!("{self}")
    }

    /// Prints [`describe`] to stdout.
    ///
    /// [`describe`]: ProbeTable::describe
    #[cfg(feature = "std")]
    pub fn print(&self) {
        print!("{self}");
    }
}

impl<D, B> fmt::Display for ProbeTable<D, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Hashtable:")?;
        writeln!(f, "  capacity: {}", self.capacity)?;
        writeln!(f, "  size:     {}", self.size)?;
        writeln!(f, "  occupied: {}", self.occupied)?;
        writeln!(f, "  load:     {}", self.load())?;

        if self.capacity.get() >= DESCRIBE_SLOT_LIMIT {
            return writeln!(f, "    <hashtable too big to print out>");
        }

        for (index, slot) in self.slots.iter().enumerate() {
            match slot {
                Slot::Empty => writeln!(f, "[{index}]    <empty>")?,
                Slot::Tombstone { .. } => writeln!(f, "[{index}]    <deleted>")?,
                Slot::Live { key, value, .. } => writeln!(f, "[{index}]    \"{key}\" = \"{value}\"")?,
            }
        }
        Ok(())
    }
}

/// Read-only view of one slot, returned by [`ProbeTable::slot_state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState<'a> {
    /// Never written since the last resize.
    Empty,
    /// Holds a live entry.
    Live {
        /// The entry's key.
        key: &'a str,
        /// The entry's value.
        value: &'a str,
    },
    /// Held an entry that has since been removed.
    Tombstone,
}

/// An iterator over the live `(key, value)` pairs of a [`ProbeTable`].
///
/// Created by [`ProbeTable::iter`].
#[derive(Debug, Clone)]
pub struct Iter<'a> {
    slots: core::slice::Iter<'a, Slot>,
    remaining: usize,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a str, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        for slot in self.slots.by_ref() {
            if let Slot::Live { key, value, .. } = slot {
                self.remaining -= 1;
                return Some((key.as_str(), value.as_str()));
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Iter<'_> {}

impl<'a, D, B> IntoIterator for &'a ProbeTable<D, B> {
    type Item = (&'a str, &'a str);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

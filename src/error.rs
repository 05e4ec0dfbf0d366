use thiserror::Error;

/// Errors that can occur when building, filling or migrating a [`ProbeTable`].
///
/// A lookup or removal that finds nothing is not an error; those operations
/// report misses through their return values.
///
/// [`ProbeTable`]: crate::ProbeTable
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum Error {
    /// The caller asked for a table with no slots.
    #[error("invalid capacity {requested}: a table needs at least one slot")]
    InvalidCapacity {
        /// The capacity that was requested.
        requested: usize,
    },

    /// A full probe cycle found no empty slot and no slot for the key.
    ///
    /// The table never grows on its own; call [`resize`] and retry.
    ///
    /// [`resize`]: crate::ProbeTable::resize
    #[error("table is full: no free slot among {capacity} slots")]
    TableFull {
        /// The capacity of the table that rejected the insert.
        capacity: usize,
    },

    /// The target capacity of a resize cannot hold every live entry.
    #[error("cannot migrate {live} live entries into {requested} slots")]
    ResizeOverflow {
        /// The number of live entries that had to be migrated.
        live: usize,
        /// The capacity that was requested.
        requested: usize,
    },
}

/// A specialized `Result` type for table operations, returning the crate's
/// [`Error`] type as the error value.
pub(crate) type Result<T> = core::result::Result<T, Error>;

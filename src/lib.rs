#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod digest;

mod error;

/// The fixed-capacity linear-probing table.
///
/// This module provides [`ProbeTable`] along with the views it hands out
/// over its slots.
pub mod probe_table;

cfg_if::cfg_if! {
    if #[cfg(any(test, feature = "stats"))] {
        /// Displacement and clustering statistics.
        pub mod stats;

        pub use stats::ProbeStats;
    }
}

pub use digest::Bucket;
pub use digest::Digest;
pub use error::Error;
pub use probe_table::ProbeTable;
pub use probe_table::SlotState;

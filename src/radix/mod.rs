//! MSB radix ordering over a permutation of row indices.
//!
//! Sorting structure follows rdst (https://github.com/nessex/rdst/): a top level that may
//! fan out over tiles, then per-bucket recursion that falls back to a comparison sort
//! for small buckets.

pub mod comparative_sort;
pub mod dispatcher;
pub mod radix_key;
pub mod sort_utils;
pub mod sorter;

/// Counters collected while ordering one table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SortStats {
    /// Counting passes that scattered rows.
    pub radix_passes: usize,
    /// Counting passes whose digits were already in order, so no scatter was needed.
    pub skipped_scatters: usize,
    /// Digits shared by every row of a bucket.
    pub collapsed_digits: usize,
    /// Buckets finished by [`comparative_sort`](comparative_sort::comparative_sort).
    pub comparison_sorts: usize,
    /// Buckets that hit the recursion bound and were finished by comparison.
    pub depth_fallbacks: usize,
}

impl SortStats {
    pub fn merge(&mut self, other: &SortStats) {
        self.radix_passes += other.radix_passes;
        self.skipped_scatters += other.skipped_scatters;
        self.collapsed_digits += other.collapsed_digits;
        self.comparison_sorts += other.comparison_sorts;
        self.depth_fallbacks += other.depth_fallbacks;
    }
}

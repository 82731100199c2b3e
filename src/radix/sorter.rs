use std::cell::RefCell;

use arbitrary_chunks::ArbitraryChunks;
use thread_local::ThreadLocal;

use crate::{
    buffer::{try_identity, try_zeroed},
    config::OrderConfig,
    encode::TEXT_BUCKETS,
    error::{OrderError, Result},
    radix::{
        comparative_sort::comparative_sort,
        dispatcher::par_sort,
        radix_key::{Cursor, KeySet, PreparedField, BYTE_BUCKETS},
        sort_utils::{get_counts, is_homogenous_bucket, scatter},
        SortStats,
    },
};

/// Buckets at or below this size are finished by comparison instead of another pass.
pub const COMPARATIVE_SORT_THRESHOLD: usize = 64;

/// Nested bucket splits allowed before the remaining rows are finished by comparison.
pub const MAX_RECURSION_DEPTH: usize = 64;

pub(crate) enum Step {
    Continue(Cursor),
    Done,
}

pub(crate) struct Sorter<'a, 'k> {
    pub(crate) keys: &'a KeySet<'k>,
    stats: ThreadLocal<RefCell<SortStats>>,
}

impl<'a, 'k> Sorter<'a, 'k> {
    pub(crate) fn new(keys: &'a KeySet<'k>) -> Self {
        Self {
            keys,
            stats: ThreadLocal::default(),
        }
    }

    #[inline]
    pub(crate) fn record(&self, f: impl FnOnce(&mut SortStats)) {
        f(&mut self.stats.get_or_default().borrow_mut());
    }

    pub(crate) fn into_stats(self) -> SortStats {
        self.stats
            .into_iter()
            .fold(SortStats::default(), |mut total, local| {
                total.merge(&local.into_inner());
                total
            })
    }

    /// Orders `rows` by the key digits from `cursor` on. `scratch` is as long as `rows`.
    pub(crate) fn handle_chunk(
        &self,
        rows: &mut [usize],
        scratch: &mut [usize],
        mut cursor: Cursor,
        depth: usize,
    ) {
        crate::scope!("handle_chunk");
        debug_assert_eq!(rows.len(), scratch.len());
        loop {
            if rows.len() <= 1 {
                return;
            } else if rows.len() <= COMPARATIVE_SORT_THRESHOLD {
                self.record(|s| s.comparison_sorts += 1);
                comparative_sort(self.keys, rows, cursor.field);
                return;
            } else if depth >= MAX_RECURSION_DEPTH {
                self.record(|s| s.depth_fallbacks += 1);
                comparative_sort(self.keys, rows, cursor.field);
                return;
            }

            let step = match self.keys.field(cursor.field) {
                PreparedField::Numeric { .. } => {
                    self.radix_step::<BYTE_BUCKETS>(rows, scratch, cursor, depth)
                }
                PreparedField::Text(_) => {
                    self.radix_step::<TEXT_BUCKETS>(rows, scratch, cursor, depth)
                }
            };

            match step {
                Step::Continue(next) => cursor = next,
                Step::Done => return,
            }
        }
    }

    #[inline]
    fn radix_step<const N: usize>(
        &self,
        rows: &mut [usize],
        scratch: &mut [usize],
        cursor: Cursor,
        depth: usize,
    ) -> Step {
        let digit = |row: usize| self.keys.digit(cursor, row);
        let (counts, already_sorted) = get_counts::<N, _>(rows, &digit);
        self.partition(rows, scratch, &counts, already_sorted, cursor, depth)
    }

    /// Top-level pass of the single-threaded path, with its histogram checked.
    fn top_level_step<const N: usize>(
        &self,
        rows: &mut [usize],
        scratch: &mut [usize],
        cursor: Cursor,
    ) -> Result<Step> {
        let digit = |row: usize| self.keys.digit(cursor, row);
        let (counts, already_sorted) = get_counts::<N, _>(rows, &digit);
        check_histogram_total(&counts, rows.len(), cursor)?;
        Ok(self.partition(rows, scratch, &counts, already_sorted, cursor, 0))
    }

    /// Collapses a shared digit, or scatters `rows` by `counts` and refines the buckets.
    #[inline]
    fn partition<const N: usize>(
        &self,
        rows: &mut [usize],
        scratch: &mut [usize],
        counts: &[usize; N],
        already_sorted: bool,
        cursor: Cursor,
        depth: usize,
    ) -> Step {
        if let Some(shared) = is_homogenous_bucket(counts) {
            self.record(|s| s.collapsed_digits += 1);
            return match self.keys.advance(cursor, shared) {
                Some(next) => Step::Continue(next),
                None => Step::Done,
            };
        }

        if already_sorted {
            self.record(|s| s.skipped_scatters += 1);
        } else {
            self.record(|s| s.radix_passes += 1);
            scatter(rows, scratch, counts, &|row| self.keys.digit(cursor, row));
            rows.copy_from_slice(scratch);
        }

        self.director(rows, scratch, counts, cursor, depth + 1);
        Step::Done
    }

    /// Refines every multi-row bucket of a partitioned range.
    #[inline]
    pub(crate) fn director<const N: usize>(
        &self,
        rows: &mut [usize],
        scratch: &mut [usize],
        counts: &[usize; N],
        cursor: Cursor,
        depth: usize,
    ) {
        crate::scope!("director");
        let buckets = rows
            .arbitrary_chunks_mut(&counts[..])
            .zip(scratch.arbitrary_chunks_mut(&counts[..]));

        for (bucket, bucket_scratch) in buckets {
            if bucket.len() <= 1 {
                continue;
            }
            let digit = self.keys.digit(cursor, bucket[0]);
            if let Some(next) = self.keys.advance(cursor, digit) {
                self.handle_chunk(bucket, bucket_scratch, next, depth);
            }
        }
    }
}

/// Stable ordering of all rows of `keys`.
pub(crate) fn sort(keys: &KeySet, config: &OrderConfig) -> Result<(Vec<usize>, SortStats)> {
    crate::scope_print!("sort");
    let n = keys.rows();
    let mut order = try_identity(n, "permutation")?;
    let sorter = Sorter::new(keys);

    // By definition, this is already sorted
    if n <= 1 {
        return Ok((order, sorter.into_stats()));
    }

    let Some(cursor) = keys.first() else {
        // Every key is constant
        return Ok((order, sorter.into_stats()));
    };

    let mut scratch = try_zeroed(n, "scratch")?;
    let threads = config.effective_threads(n);
    if threads > 1 && n > COMPARATIVE_SORT_THRESHOLD {
        par_sort(
            &sorter,
            &mut order,
            &mut scratch,
            cursor,
            config.scheduler,
            threads,
        )?;
    } else if n <= COMPARATIVE_SORT_THRESHOLD {
        sorter.handle_chunk(&mut order, &mut scratch, cursor, 0);
    } else {
        sequential_sort(&sorter, &mut order, &mut scratch, cursor)?;
    }

    Ok((order, sorter.into_stats()))
}

fn sequential_sort(
    sorter: &Sorter,
    rows: &mut [usize],
    scratch: &mut [usize],
    mut cursor: Cursor,
) -> Result<()> {
    loop {
        let step = match sorter.keys.field(cursor.field) {
            PreparedField::Numeric { .. } => {
                sorter.top_level_step::<BYTE_BUCKETS>(rows, scratch, cursor)?
            }
            PreparedField::Text(_) => {
                sorter.top_level_step::<TEXT_BUCKETS>(rows, scratch, cursor)?
            }
        };

        match step {
            Step::Continue(next) => cursor = next,
            Step::Done => return Ok(()),
        }
    }
}

/// Fails unless the top-level histogram accounts for every row exactly once.
pub(crate) fn check_histogram_total<const N: usize>(
    counts: &[usize; N],
    n: usize,
    cursor: Cursor,
) -> Result<()> {
    let total: usize = counts.iter().sum();
    if total != n {
        return Err(OrderError::invariant(format!(
            "top-level histogram covers {total} of {n} rows at field {} digit {}",
            cursor.field, cursor.step
        )));
    }
    Ok(())
}

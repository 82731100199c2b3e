//! Parallel top level of the sort.
//!
//! The rows are split into one tile per thread. Tiles are counted in parallel, the
//! per-tile histograms give every (bucket, tile) pair a disjoint output region, and
//! the tiles are scattered in parallel into those regions. Each resulting bucket is
//! then refined on its own by [`Sorter::handle_chunk`].
//!
//! Tiles are contiguous ranges of the input in order and each region receives its
//! tile's rows in order, so the scatter is as stable as the sequential one.

use std::mem;

use tracing::trace;

use crate::{
    encode::TEXT_BUCKETS,
    error::Result,
    par::Scheduler,
    radix::{
        radix_key::{Cursor, PreparedField, BYTE_BUCKETS},
        sort_utils::{aggregate_tile_counts, get_tile_counts, is_homogenous_bucket},
        sorter::{check_histogram_total, Sorter, Step},
    },
};

/// One tile's share of the parallel scatter.
struct TileScatter<'a> {
    rows: &'a [usize],
    /// Output region per bucket, in bucket order.
    regions: Vec<&'a mut [usize]>,
}

/// A top-level bucket and its scratch, refined by a single thread.
struct BucketTask<'a> {
    rows: &'a mut [usize],
    scratch: &'a mut [usize],
    cursor: Option<Cursor>,
}

pub(crate) fn par_sort(
    sorter: &Sorter,
    order: &mut Vec<usize>,
    scratch: &mut Vec<usize>,
    mut cursor: Cursor,
    scheduler: Scheduler,
    threads: usize,
) -> Result<()> {
    crate::scope!("par_sort");
    loop {
        let step = match sorter.keys.field(cursor.field) {
            PreparedField::Numeric { .. } => {
                par_step::<BYTE_BUCKETS>(sorter, order, scratch, cursor, scheduler, threads)?
            }
            PreparedField::Text(_) => {
                par_step::<TEXT_BUCKETS>(sorter, order, scratch, cursor, scheduler, threads)?
            }
        };

        match step {
            Step::Continue(next) => cursor = next,
            Step::Done => return Ok(()),
        }
    }
}

fn par_step<const N: usize>(
    sorter: &Sorter,
    order: &mut Vec<usize>,
    scratch: &mut Vec<usize>,
    cursor: Cursor,
    scheduler: Scheduler,
    threads: usize,
) -> Result<Step> {
    let keys = sorter.keys;
    let n = order.len();
    let tile_size = n.div_ceil(threads);
    let digit = |row: usize| keys.digit(cursor, row);

    let (tile_counts, already_sorted) =
        get_tile_counts::<N, _>(scheduler, order.as_slice(), tile_size, threads, &digit);
    let counts = aggregate_tile_counts(&tile_counts);

    check_histogram_total(&counts, n, cursor)?;

    if let Some(shared) = is_homogenous_bucket(&counts) {
        sorter.record(|s| s.collapsed_digits += 1);
        trace!(field = cursor.field, step = cursor.step, "top-level digit shared by all rows");
        return Ok(match keys.advance(cursor, shared) {
            Some(next) => Step::Continue(next),
            None => Step::Done,
        });
    }

    if already_sorted {
        sorter.record(|s| s.skipped_scatters += 1);
    } else {
        sorter.record(|s| s.radix_passes += 1);
        par_scatter(
            order.as_slice(),
            scratch.as_mut_slice(),
            &tile_counts,
            tile_size,
            scheduler,
            threads,
            &digit,
        );
        mem::swap(order, scratch);
    }

    trace!(
        field = cursor.field,
        step = cursor.step,
        buckets = counts.iter().filter(|&&c| c > 0).count(),
        tiles = tile_counts.len(),
        already_sorted,
        "top-level partition"
    );

    let mut tasks = bucket_tasks(
        order.as_mut_slice(),
        scratch.as_mut_slice(),
        &counts,
        |first_row| keys.advance(cursor, keys.digit(cursor, first_row)),
    );
    scheduler.par_map(
        &mut tasks,
        &|_, task| {
            if let Some(next) = task.cursor {
                sorter.handle_chunk(task.rows, task.scratch, next, 1);
            }
        },
        threads,
    );

    Ok(Step::Done)
}

/// Scatters every tile of `order` into `out`, in parallel.
///
/// The region for (bucket `b`, tile `t`) starts after all rows of smaller buckets and
/// after the rows of bucket `b` from tiles before `t`.
fn par_scatter<const N: usize, D>(
    order: &[usize],
    out: &mut [usize],
    tile_counts: &[[usize; N]],
    tile_size: usize,
    scheduler: Scheduler,
    threads: usize,
    digit: &D,
) where
    D: Fn(usize) -> usize + Sync,
{
    crate::scope!("par_scatter");
    let mut tiles: Vec<TileScatter> = order
        .chunks(tile_size.max(1))
        .map(|rows| TileScatter {
            rows,
            regions: Vec::with_capacity(N),
        })
        .collect();
    debug_assert_eq!(tiles.len(), tile_counts.len());

    let mut rest = out;
    for bucket in 0..N {
        for (tile, counts) in tiles.iter_mut().zip(tile_counts) {
            let (region, tail) = mem::take(&mut rest).split_at_mut(counts[bucket]);
            tile.regions.push(region);
            rest = tail;
        }
    }
    debug_assert!(rest.is_empty());

    scheduler.par_map(
        &mut tiles,
        &|_, tile| {
            let mut next = [0usize; N];
            for &row in tile.rows {
                let b = digit(row);
                tile.regions[b][next[b]] = row;
                next[b] += 1;
            }
        },
        threads,
    );
}

/// Splits a partitioned range into one task per multi-row bucket.
fn bucket_tasks<'a, const N: usize>(
    order: &'a mut [usize],
    scratch: &'a mut [usize],
    counts: &[usize; N],
    refine: impl Fn(usize) -> Option<Cursor>,
) -> Vec<BucketTask<'a>> {
    let mut tasks = Vec::new();
    let mut rows_rest = order;
    let mut scratch_rest = scratch;
    for &count in counts {
        let (rows, rows_tail) = mem::take(&mut rows_rest).split_at_mut(count);
        let (scratch, scratch_tail) = mem::take(&mut scratch_rest).split_at_mut(count);
        rows_rest = rows_tail;
        scratch_rest = scratch_tail;

        if rows.len() > 1 {
            let cursor = refine(rows[0]);
            tasks.push(BucketTask {
                rows,
                scratch,
                cursor,
            });
        }
    }

    tasks
}

//! Counting partitioner: histograms, prefix sums and the stable scatter.
//!
//! Digits are read through a `Fn(row) -> usize` so the same code serves byte-wide
//! numeric digits and the wider string digits.

use crate::par::Scheduler;

#[inline]
pub fn get_prefix_sums<const N: usize>(counts: &[usize; N]) -> [usize; N] {
    crate::scope!("get_prefix_sums");
    let mut sums = [0usize; N];

    let mut running_total = 0;
    for (i, c) in counts.iter().enumerate() {
        sums[i] = running_total;
        running_total += c;
    }

    sums
}

/// Counts digits of `rows`, noting whether they already appear in non-decreasing order.
///
/// Also returns the first and last digit so adjacent tiles can be checked for order.
#[inline]
pub fn get_counts_with_ends<const N: usize, D>(
    rows: &[usize],
    digit: &D,
) -> ([usize; N], bool, usize, usize)
where
    D: Fn(usize) -> usize,
{
    crate::scope!("get_counts_with_ends");
    let mut already_sorted = true;
    let mut continue_from = rows.len();
    let mut counts_1 = [0usize; N];
    let mut last = 0usize;

    for (i, &row) in rows.iter().enumerate() {
        let b = digit(row);
        counts_1[b] += 1;

        if b < last {
            continue_from = i + 1;
            already_sorted = false;
            break;
        }

        last = b;
    }

    let first = rows.first().map_or(0, |&row| digit(row));

    if continue_from == rows.len() {
        return (counts_1, already_sorted, first, last);
    }

    let mut counts_2 = [0usize; N];
    let mut counts_3 = [0usize; N];
    let mut counts_4 = [0usize; N];
    let chunks = rows[continue_from..].chunks_exact(4);
    let rem = chunks.remainder();

    chunks.into_iter().for_each(|chunk| {
        let a = digit(chunk[0]);
        let b = digit(chunk[1]);
        let c = digit(chunk[2]);
        let d = digit(chunk[3]);

        counts_1[a] += 1;
        counts_2[b] += 1;
        counts_3[c] += 1;
        counts_4[d] += 1;
    });

    rem.iter().for_each(|&row| {
        counts_1[digit(row)] += 1;
    });

    for i in 0..N {
        counts_1[i] += counts_2[i];
        counts_1[i] += counts_3[i];
        counts_1[i] += counts_4[i];
    }

    let b_last = rows.last().map_or(0, |&row| digit(row));

    (counts_1, already_sorted, first, b_last)
}

#[inline]
pub fn get_counts<const N: usize, D>(rows: &[usize], digit: &D) -> ([usize; N], bool)
where
    D: Fn(usize) -> usize,
{
    if rows.is_empty() {
        return ([0usize; N], true);
    }

    let (counts, sorted, _, _) = get_counts_with_ends(rows, digit);

    (counts, sorted)
}

/// Per-tile histograms of `rows`, one tile per `tile_size` rows, counted in parallel.
#[inline]
pub fn get_tile_counts<const N: usize, D>(
    scheduler: Scheduler,
    rows: &[usize],
    tile_size: usize,
    threads: usize,
    digit: &D,
) -> (Vec<[usize; N]>, bool)
where
    D: Fn(usize) -> usize + Sync,
{
    crate::scope!("get_tile_counts");
    let tile_size = tile_size.max(1);
    let tile_count = rows.len().div_ceil(tile_size);

    let mut tiles: Vec<([usize; N], bool, usize, usize)> =
        vec![([0usize; N], false, 0, 0); tile_count];

    scheduler.par_map(
        &mut tiles,
        &|i, tile| {
            let start = i * tile_size;
            let end = (start + tile_size).min(rows.len());
            *tile = get_counts_with_ends(&rows[start..end], digit)
        },
        threads,
    );

    let mut all_sorted = true;

    if tiles.len() == 1 {
        // If there is only one tile, we already have a flag for if it is sorted
        all_sorted = tiles[0].1;
    } else {
        // Check if any of the tiles, or any of the tile boundaries are unsorted
        for tile in tiles.windows(2) {
            if !tile[0].1 || !tile[1].1 || tile[1].2 < tile[0].3 {
                all_sorted = false;
                break;
            }
        }
    }

    (tiles.into_iter().map(|v| v.0).collect(), all_sorted)
}

#[inline]
pub fn aggregate_tile_counts<const N: usize>(tile_counts: &[[usize; N]]) -> [usize; N] {
    crate::scope!("aggregate_tile_counts");
    let mut out = [0usize; N];
    for tile in tile_counts {
        for i in 0..N {
            out[i] += tile[i];
        }
    }

    out
}

/// The only non-empty bucket, if all rows share one digit.
#[inline]
pub fn is_homogenous_bucket<const N: usize>(counts: &[usize; N]) -> Option<usize> {
    crate::scope!("is_homogenous_bucket");
    let mut seen = None;
    for (digit, c) in counts.iter().enumerate() {
        if *c > 0 {
            if seen.is_some() {
                return None;
            } else {
                seen = Some(digit);
            }
        }
    }

    seen
}

/// Stable counting scatter of `rows` into `out` by digit.
///
/// Rows sharing a digit keep their relative input order.
#[inline]
pub fn scatter<const N: usize, D>(rows: &[usize], out: &mut [usize], counts: &[usize; N], digit: &D)
where
    D: Fn(usize) -> usize,
{
    crate::scope!("scatter");
    debug_assert_eq!(rows.len(), out.len());
    debug_assert_eq!(counts.iter().sum::<usize>(), rows.len());

    let mut offsets = get_prefix_sums(counts);
    for &row in rows {
        let b = digit(row);
        out[offsets[b]] = row;
        offsets[b] += 1;
    }
}

//! `comparative_sort` finishes buckets that are too small (or too deep) for another radix
//! pass. It compares whole field values from the field the bucket was being refined on,
//! so the result is exactly what further radix passes would have produced.
//!
//! ## Characteristics
//!
//!  * in-place
//!  * stable (ties are broken by row index, and rows of a bucket are in row order)
//!  * single-threaded

use crate::radix::radix_key::KeySet;

pub(crate) fn comparative_sort(keys: &KeySet, bucket: &mut [usize], from_field: usize) {
    if bucket.len() < 2 {
        return;
    }

    bucket.sort_unstable_by(|&a, &b| keys.compare_rows(from_field, a, b).then(a.cmp(&b)));
}

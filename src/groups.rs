//! Group extraction: runs of equal keys in an ordered permutation.

use std::ops::Range;

use crate::{
    buffer::{try_with_capacity, try_zeroed},
    column::Table,
    config::OrderConfig,
    encode::encode_key,
    error::{OrderError, Result},
    key_spec::{Direction, KeySpec, MissingPlacement},
    radix::radix_key::KeySet,
};

/// Group boundaries over a permutation.
///
/// Group `i` covers permutation positions `starts[i]..starts[i] + lengths[i]`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Groups {
    starts: Vec<usize>,
    lengths: Vec<usize>,
    all_singleton: bool,
    single_group: bool,
    max_group_len: usize,
}

impl Groups {
    /// Groups from strictly increasing start offsets into a permutation of `n` rows.
    pub fn from_starts(starts: Vec<usize>, n: usize) -> Result<Self> {
        if n > 0 && starts.first() != Some(&0) {
            return Err(OrderError::invariant("first group does not start at 0"));
        }
        if starts.windows(2).any(|w| w[0] >= w[1]) || starts.last().is_some_and(|&s| s >= n) {
            return Err(OrderError::invariant(format!(
                "group starts are not strictly increasing within {n} rows"
            )));
        }

        let lengths = group_lengths(&starts, n);
        let covered: usize = lengths.iter().sum();
        if covered != n {
            return Err(OrderError::invariant(format!(
                "group lengths cover {covered} of {n} rows"
            )));
        }

        Ok(Self {
            all_singleton: starts.len() == n,
            single_group: starts.len() == 1,
            max_group_len: lengths.iter().copied().max().unwrap_or(0),
            starts,
            lengths,
        })
    }

    pub fn starts(&self) -> &[usize] {
        &self.starts
    }

    pub fn lengths(&self) -> &[usize] {
        &self.lengths
    }

    /// Every group has exactly one row. True for an empty table.
    pub fn all_singleton(&self) -> bool {
        self.all_singleton
    }

    /// Exactly one group spans all rows.
    pub fn single_group(&self) -> bool {
        self.single_group
    }

    pub fn max_group_len(&self) -> usize {
        self.max_group_len
    }

    pub fn len(&self) -> usize {
        self.starts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }

    /// Permutation ranges of each group, in order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = Range<usize>> + '_ {
        self.starts
            .iter()
            .zip(&self.lengths)
            .map(|(&start, &len)| start..start + len)
    }

    /// Group index of every original row.
    pub fn row_group_ids(&self, permutation: &[usize]) -> Vec<usize> {
        let mut ids = vec![0; permutation.len()];
        for (group, range) in self.iter().enumerate() {
            for &row in &permutation[range] {
                ids[row] = group;
            }
        }
        ids
    }

    /// Reorders whole groups by the first input row of each, keeping rows within a
    /// group in input order. Returns the new permutation and its groups.
    pub fn by_first_appearance(&self, permutation: &[usize]) -> Result<(Vec<usize>, Groups)> {
        crate::scope!("by_first_appearance");
        // The first position of a group holds its smallest row.
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.sort_unstable_by_key(|&g| permutation[self.starts[g]]);

        let mut reordered = try_with_capacity(permutation.len(), "permutation")?;
        let mut starts = try_with_capacity(self.len(), "group starts")?;
        for g in order {
            starts.push(reordered.len());
            let start = self.starts[g];
            reordered.extend_from_slice(&permutation[start..start + self.lengths[g]]);
        }

        let groups = Groups::from_starts(starts, reordered.len())?;
        Ok((reordered, groups))
    }
}

/// Lengths of the groups starting at `starts` within `n` rows.
pub fn group_lengths(starts: &[usize], n: usize) -> Vec<usize> {
    starts
        .iter()
        .zip(starts.iter().skip(1).chain(std::iter::once(&n)))
        .map(|(&start, &end)| end.saturating_sub(start))
        .collect()
}

/// One chunk of the boundary scan.
struct ScanChunk {
    positions: Range<usize>,
    starts: Vec<usize>,
}

/// Scans `permutation` for positions where the key differs from the previous position.
pub(crate) fn extract_groups(
    keys: &KeySet,
    permutation: &[usize],
    config: &OrderConfig,
) -> Result<Groups> {
    crate::scope_print!("extract_groups");
    let n = permutation.len();
    if n == 0 {
        return Groups::from_starts(Vec::new(), 0);
    }

    let threads = config.effective_threads(n);
    let chunk_size = n.div_ceil(threads);
    let mut chunks: Vec<ScanChunk> = (0..n)
        .step_by(chunk_size)
        .map(|start| ScanChunk {
            positions: start..(start + chunk_size).min(n),
            starts: Vec::new(),
        })
        .collect();

    config.scheduler.par_map(
        &mut chunks,
        &|_, chunk| {
            for p in chunk.positions.clone() {
                if p == 0 || !keys.rows_equal(permutation[p - 1], permutation[p]) {
                    chunk.starts.push(p);
                }
            }
        },
        threads,
    );

    let total = chunks.iter().map(|c| c.starts.len()).sum();
    let mut starts = try_with_capacity(total, "group starts")?;
    for chunk in chunks {
        starts.extend(chunk.starts);
    }

    Groups::from_starts(starts, n)
}

/// Run-length ids over rows in input order: a new id starts whenever any of `columns`
/// differs from the previous row. Ids start at 0.
pub fn rleid(table: &Table, columns: &[usize]) -> Result<Vec<usize>> {
    crate::scope!("rleid");
    let n = KeySpec::ascending(columns.iter().copied()).validate(table)?;
    let keys = columns
        .iter()
        .map(|&c| {
            let column = table
                .column(c)
                .ok_or_else(|| OrderError::invariant(format!("column {c} vanished")))?;
            encode_key(column, Direction::Ascending, MissingPlacement::Last)
        })
        .collect::<Result<Vec<_>>>()?;

    let mut ids = try_zeroed(n, "run ids")?;
    let mut id = 0;
    for row in 1..n {
        if !keys.iter().all(|key| key.rows_equal(row - 1, row)) {
            id += 1;
        }
        ids[row] = id;
    }

    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{column::Column, encode::KeyField, par::Scheduler};

    #[test]
    fn lengths_from_starts() {
        assert_eq!(group_lengths(&[0, 2, 3, 4], 5), vec![2, 1, 1, 1]);
        assert_eq!(group_lengths(&[0], 3), vec![3]);
        assert!(group_lengths(&[], 0).is_empty());
    }

    #[test]
    fn flags_and_stats() {
        let groups = Groups::from_starts(vec![0, 2, 3, 4], 5).unwrap();
        assert!(!groups.all_singleton());
        assert!(!groups.single_group());
        assert_eq!(groups.max_group_len(), 2);
        assert_eq!(groups.iter().collect::<Vec<_>>(), vec![0..2, 2..3, 3..4, 4..5]);

        let single = Groups::from_starts(vec![0], 3).unwrap();
        assert!(single.single_group());
        assert_eq!(single.max_group_len(), 3);

        let empty = Groups::from_starts(vec![], 0).unwrap();
        assert!(empty.all_singleton());
        assert!(!empty.single_group());
        assert!(empty.is_empty());
    }

    #[test]
    fn malformed_starts_are_rejected() {
        assert!(Groups::from_starts(vec![1, 2], 3).is_err());
        assert!(Groups::from_starts(vec![0, 2, 2], 3).is_err());
        assert!(Groups::from_starts(vec![0, 3], 3).is_err());
    }

    #[test]
    fn group_ids_map_rows() {
        let permutation = vec![1, 3, 2, 0, 4];
        let groups = Groups::from_starts(vec![0, 2, 3, 4], 5).unwrap();
        assert_eq!(groups.row_group_ids(&permutation), vec![2, 0, 1, 0, 3]);
    }

    #[test]
    fn first_appearance_reorders_groups() {
        // values [3, 1, 2, 1, NA] sorted: 1 1 2 3 NA
        let permutation = vec![1, 3, 2, 0, 4];
        let groups = Groups::from_starts(vec![0, 2, 3, 4], 5).unwrap();
        let (reordered, regrouped) = groups.by_first_appearance(&permutation).unwrap();
        assert_eq!(reordered, vec![0, 1, 3, 2, 4]);
        assert_eq!(regrouped.starts(), &[0, 1, 3, 4]);
        assert_eq!(regrouped.lengths(), &[1, 2, 1, 1]);
    }

    #[test]
    fn scan_is_independent_of_chunking() {
        let column = Column::Int32((0..1000).map(|i| Some(i / 7)).collect());
        let fields: Vec<KeyField> =
            encode_key(&column, Direction::Ascending, MissingPlacement::Last)
                .unwrap()
                .into_fields();
        let keys = KeySet::new(&fields, 1000);
        let permutation: Vec<usize> = (0..1000).collect();

        let expected = extract_groups(&keys, &permutation, &OrderConfig::sequential()).unwrap();
        assert_eq!(expected.len(), 143);
        for scheduler in [Scheduler::Rayon, Scheduler::Raw, Scheduler::Chili] {
            let config = OrderConfig::sequential()
                .with_scheduler(scheduler)
                .with_threads(6)
                .with_throttle(10);
            assert_eq!(extract_groups(&keys, &permutation, &config).unwrap(), expected);
        }
    }

    #[test]
    fn rleid_counts_runs_in_input_order() {
        let table = Table::new(vec![
            Column::Int32(vec![Some(1), Some(1), Some(2), Some(1), None, None]),
            Column::strings([Some("a"), Some("b"), Some("b"), Some("b"), None, None]),
        ]);
        assert_eq!(rleid(&table, &[0]).unwrap(), vec![0, 0, 1, 2, 3, 3]);
        assert_eq!(rleid(&table, &[0, 1]).unwrap(), vec![0, 1, 2, 3, 4, 4]);
        assert!(rleid(&table, &[]).unwrap_err().is_invalid_specification());
    }
}

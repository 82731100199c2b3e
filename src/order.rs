use std::time::Instant;

use tracing::debug;

use crate::{
    buffer::{try_filled, try_identity},
    column::Table,
    config::OrderConfig,
    encode::{encode_key, KeyField},
    error::{OrderError, Result},
    groups::{extract_groups, Groups},
    key_spec::KeySpec,
    radix::{radix_key::KeySet, sorter, SortStats},
    PrettyDuration,
};

/// Per-call options of [`order_with`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OrderOptions {
    pub config: OrderConfig,
    /// The caller vouches that the table is already ordered by the key spec. The
    /// identity permutation is used without checking; only groups are computed.
    pub assume_sorted: bool,
    /// Emit groups in order of their first row in the input instead of key order.
    /// Rows within a group stay in input order.
    pub first_appearance: bool,
}

impl Default for OrderOptions {
    fn default() -> Self {
        Self {
            config: OrderConfig::current(),
            assume_sorted: false,
            first_appearance: false,
        }
    }
}

impl OrderOptions {
    pub fn with_config(mut self, config: OrderConfig) -> Self {
        self.config = config;
        self
    }

    pub fn assume_sorted(mut self, assume_sorted: bool) -> Self {
        self.assume_sorted = assume_sorted;
        self
    }

    pub fn first_appearance(mut self, first_appearance: bool) -> Self {
        self.first_appearance = first_appearance;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderResult {
    /// Row indices in key order. Rows with equal keys keep their input order.
    pub permutation: Vec<usize>,
    pub groups: Groups,
    /// Whether any key column had a missing value.
    pub any_missing: bool,
    pub stats: SortStats,
}

impl OrderResult {
    pub fn starts(&self) -> &[usize] {
        self.groups.starts()
    }

    pub fn lengths(&self) -> &[usize] {
        self.groups.lengths()
    }

    pub fn all_singleton(&self) -> bool {
        self.groups.all_singleton()
    }

    pub fn single_group(&self) -> bool {
        self.groups.single_group()
    }
}

fn encode_spec<'t>(table: &'t Table, spec: &KeySpec) -> Result<Vec<KeyField<'t>>> {
    crate::scope!("encode_spec");
    let mut fields = Vec::with_capacity(spec.len());
    for key in spec.keys() {
        let column = table.column(key.column).ok_or_else(|| {
            OrderError::invalid(format!("key column {} does not exist", key.column))
        })?;
        fields.extend(encode_key(column, key.direction, key.missing)?.into_fields());
    }
    Ok(fields)
}

#[cfg(debug_assertions)]
fn check_permutation(permutation: &[usize]) -> Result<()> {
    let mut seen = try_filled(permutation.len(), false, "seen rows")?;
    for (position, &row) in permutation.iter().enumerate() {
        match seen.get_mut(row) {
            Some(seen) if !*seen => *seen = true,
            _ => {
                return Err(OrderError::invariant(format!(
                    "row {row} at position {position} is out of range or repeated"
                )))
            }
        }
    }
    Ok(())
}

/// Orders `table` by `spec` with the process-wide configuration.
///
/// ```
/// use forder::{order, Column, KeySpec, Table};
///
/// let table = Table::new(vec![Column::Int32(vec![Some(3), Some(1), Some(2), Some(1), None])]);
/// let result = order(&table, &KeySpec::new().asc(0)).unwrap();
/// assert_eq!(result.permutation, vec![1, 3, 2, 0, 4]);
/// assert_eq!(result.starts(), &[0, 2, 3, 4]);
/// assert_eq!(result.lengths(), &[2, 1, 1, 1]);
/// ```
pub fn order(table: &Table, spec: &KeySpec) -> Result<OrderResult> {
    order_with(table, spec, &OrderOptions::default())
}

pub fn order_with(table: &Table, spec: &KeySpec, options: &OrderOptions) -> Result<OrderResult> {
    crate::scope_print_major!("order");
    let start = Instant::now();
    let n = spec.validate(table)?;
    let fields = encode_spec(table, spec)?;
    let keys = KeySet::new(&fields, n);
    let any_missing = fields.iter().any(KeyField::any_missing);
    let config = options.config;

    debug!(
        rows = n,
        keys = spec.len(),
        fields = keys.num_fields(),
        threads = config.effective_threads(n),
        scheduler = %config.scheduler,
        assume_sorted = options.assume_sorted,
        "ordering"
    );

    let (permutation, stats) = if options.assume_sorted {
        (try_identity(n, "permutation")?, SortStats::default())
    } else {
        sorter::sort(&keys, &config)?
    };

    #[cfg(debug_assertions)]
    check_permutation(&permutation)?;

    let groups = extract_groups(&keys, &permutation, &config)?;
    let (permutation, groups) = if options.first_appearance {
        groups.by_first_appearance(&permutation)?
    } else {
        (permutation, groups)
    };

    debug!(
        rows = n,
        groups = groups.len(),
        max_group_len = groups.max_group_len(),
        radix_passes = stats.radix_passes,
        skipped_scatters = stats.skipped_scatters,
        comparison_sorts = stats.comparison_sorts,
        depth_fallbacks = stats.depth_fallbacks,
        elapsed = %PrettyDuration(start.elapsed()),
        "ordered"
    );

    Ok(OrderResult {
        permutation,
        groups,
        any_missing,
        stats,
    })
}

/// Whether the rows of `table` are already in `spec` order (ties in any order).
pub fn is_sorted(table: &Table, spec: &KeySpec) -> Result<bool> {
    is_sorted_with(table, spec, false)
}

/// Like [`is_sorted`], but trusts `assume_sorted` from the caller's own bookkeeping and
/// answers `true` without reading any key.
pub fn is_sorted_with(table: &Table, spec: &KeySpec, assume_sorted: bool) -> Result<bool> {
    crate::scope!("is_sorted");
    let n = spec.validate(table)?;
    if assume_sorted || n <= 1 {
        return Ok(true);
    }

    let fields = encode_spec(table, spec)?;
    let keys = KeySet::new(&fields, n);
    Ok((1..n).all(|row| keys.compare_rows(0, row - 1, row).is_le()))
}

use crate::{
    column::{Column, Table},
    error::{OrderError, Result},
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

/// Where missing values land in the output, independent of [`Direction`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MissingPlacement {
    First,
    #[default]
    Last,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SortKey {
    /// Index of the column in the table.
    pub column: usize,
    pub direction: Direction,
    pub missing: MissingPlacement,
}

impl SortKey {
    pub fn new(column: usize, direction: Direction, missing: MissingPlacement) -> Self {
        Self {
            column,
            direction,
            missing,
        }
    }
}

/// Ordered list of sort keys, most significant first.
///
/// ```
/// use forder::{KeySpec, MissingPlacement};
///
/// let spec = KeySpec::new()
///     .asc(0)
///     .desc(2)
///     .missing(MissingPlacement::First);
/// assert_eq!(spec.len(), 2);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct KeySpec {
    keys: Vec<SortKey>,
}

impl KeySpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ascending keys over `columns`, missing last.
    pub fn ascending(columns: impl IntoIterator<Item = usize>) -> Self {
        columns
            .into_iter()
            .fold(Self::new(), |spec, column| spec.asc(column))
    }

    pub fn push(mut self, key: SortKey) -> Self {
        self.keys.push(key);
        self
    }

    pub fn asc(self, column: usize) -> Self {
        self.push(SortKey::new(
            column,
            Direction::Ascending,
            MissingPlacement::default(),
        ))
    }

    pub fn desc(self, column: usize) -> Self {
        self.push(SortKey::new(
            column,
            Direction::Descending,
            MissingPlacement::default(),
        ))
    }

    /// Sets the missing placement of the most recently added key.
    pub fn missing(mut self, missing: MissingPlacement) -> Self {
        if let Some(last) = self.keys.last_mut() {
            last.missing = missing;
        }
        self
    }

    pub fn keys(&self) -> &[SortKey] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Checks the spec against `table` and returns the shared row count.
    pub fn validate(&self, table: &Table) -> Result<usize> {
        if self.keys.is_empty() {
            return Err(OrderError::invalid("at least one key column is required"));
        }

        let mut rows = None;
        for key in &self.keys {
            let column = table.column(key.column).ok_or_else(|| {
                OrderError::invalid(format!(
                    "key column {} does not exist (table has {} columns)",
                    key.column,
                    table.num_columns()
                ))
            })?;

            if let Column::List(_) = column {
                return Err(OrderError::UnsupportedKeyKind {
                    kind: column.kind(),
                });
            }

            match rows {
                None => rows = Some(column.len()),
                Some(expected) if expected != column.len() => {
                    return Err(OrderError::LengthMismatch {
                        column: key.column,
                        expected,
                        actual: column.len(),
                    });
                }
                Some(_) => {}
            }
        }

        Ok(rows.unwrap_or(0))
    }
}

impl FromIterator<SortKey> for KeySpec {
    fn from_iter<I: IntoIterator<Item = SortKey>>(iter: I) -> Self {
        Self {
            keys: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Table {
        Table::new(vec![
            Column::Int32(vec![Some(1), Some(2)]),
            Column::List(vec![Column::Int32(vec![]), Column::Int32(vec![])]),
            Column::Float64(vec![1.0]),
        ])
    }

    #[test]
    fn empty_spec_is_rejected() {
        let err = KeySpec::new().validate(&table()).unwrap_err();
        assert!(matches!(err, OrderError::InvalidSpecification { .. }));
    }

    #[test]
    fn unknown_column_is_rejected() {
        let err = KeySpec::new().asc(9).validate(&table()).unwrap_err();
        assert!(err.is_invalid_specification());
    }

    #[test]
    fn list_column_is_unsupported() {
        let err = KeySpec::new().asc(0).asc(1).validate(&table()).unwrap_err();
        assert_eq!(err, OrderError::UnsupportedKeyKind { kind: "list" });
    }

    #[test]
    fn length_mismatch_is_rejected() {
        let err = KeySpec::new().asc(0).desc(2).validate(&table()).unwrap_err();
        assert_eq!(
            err,
            OrderError::LengthMismatch {
                column: 2,
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn builder_sets_missing_on_last_key() {
        let spec = KeySpec::new()
            .asc(0)
            .desc(2)
            .missing(MissingPlacement::First);
        assert_eq!(spec.keys()[0].missing, MissingPlacement::Last);
        assert_eq!(spec.keys()[1].missing, MissingPlacement::First);
        assert_eq!(spec.keys()[1].direction, Direction::Descending);
        let table = Table::new(vec![
            Column::Int32(vec![Some(1)]),
            Column::Int32(vec![Some(1)]),
            Column::Int32(vec![Some(1)]),
        ]);
        assert_eq!(spec.validate(&table), Ok(1));
    }
}

//! The composite key as the radix sorter sees it: an ordered list of fields, each a
//! sequence of digits read most significant first.

use std::cmp::Ordering;

use crate::encode::{KeyField, TextKey};

/// Buckets of one byte-wide numeric digit.
pub const BYTE_BUCKETS: usize = 256;

#[derive(Clone, Copy, Debug)]
pub(crate) enum PreparedField<'k> {
    /// Codes are range-compressed: only the low `bytes` bytes of `code - min` vary.
    Numeric {
        codes: &'k [u64],
        min: u64,
        bytes: u32,
    },
    Text(TextKey<'k>),
}

/// Position of the next digit to partition on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Cursor {
    pub field: usize,
    /// Digits of `field` already consumed.
    pub step: usize,
}

#[inline]
fn bytes_needed(range: u64) -> u32 {
    (u64::BITS - range.leading_zeros()).div_ceil(8)
}

pub(crate) struct KeySet<'k> {
    fields: Vec<PreparedField<'k>>,
    rows: usize,
}

impl<'k> KeySet<'k> {
    pub(crate) fn new(fields: &'k [KeyField<'_>], rows: usize) -> Self {
        crate::scope!("KeySet::new");
        let fields = fields
            .iter()
            .map(|field| match field {
                KeyField::Numeric(key) => {
                    let codes = key.codes();
                    let (min, max) = codes
                        .iter()
                        .fold((u64::MAX, 0), |(min, max), &c| (min.min(c), max.max(c)));
                    let min = min.min(max);
                    PreparedField::Numeric {
                        codes,
                        min,
                        bytes: bytes_needed(max - min),
                    }
                }
                KeyField::Text(key) => PreparedField::Text(*key),
            })
            .collect();

        Self { fields, rows }
    }

    pub(crate) fn rows(&self) -> usize {
        self.rows
    }

    pub(crate) fn num_fields(&self) -> usize {
        self.fields.len()
    }

    #[inline(always)]
    pub(crate) fn field(&self, index: usize) -> &PreparedField<'k> {
        &self.fields[index]
    }

    /// First digit worth partitioning on, skipping constant fields.
    pub(crate) fn first(&self) -> Option<Cursor> {
        self.normalize(Cursor { field: 0, step: 0 })
    }

    fn normalize(&self, mut cursor: Cursor) -> Option<Cursor> {
        while let Some(field) = self.fields.get(cursor.field) {
            match field {
                PreparedField::Numeric { bytes, .. } if cursor.step >= *bytes as usize => {
                    cursor = Cursor {
                        field: cursor.field + 1,
                        step: 0,
                    };
                }
                _ => return Some(cursor),
            }
        }
        None
    }

    /// The cursor that refines a bucket whose rows all had `digit` under `cursor`.
    ///
    /// `None` means the composite key is exhausted and the bucket is a tie group.
    #[inline]
    pub(crate) fn advance(&self, cursor: Cursor, digit: usize) -> Option<Cursor> {
        let next = match &self.fields[cursor.field] {
            PreparedField::Text(key) if key.is_terminal_digit(digit) => Cursor {
                field: cursor.field + 1,
                step: 0,
            },
            _ => Cursor {
                field: cursor.field,
                step: cursor.step + 1,
            },
        };
        self.normalize(next)
    }

    #[inline(always)]
    pub(crate) fn digit(&self, cursor: Cursor, row: usize) -> usize {
        match &self.fields[cursor.field] {
            PreparedField::Numeric { codes, min, bytes } => {
                let shift = 8 * (*bytes as usize - 1 - cursor.step);
                (((codes[row] - min) >> shift) & 0xFF) as usize
            }
            PreparedField::Text(key) => key.digit(row, cursor.step),
        }
    }

    /// Full comparison of two rows over fields `from_field..`.
    #[inline]
    pub(crate) fn compare_rows(&self, from_field: usize, a: usize, b: usize) -> Ordering {
        for field in &self.fields[from_field..] {
            let ord = match field {
                PreparedField::Numeric { codes, .. } => codes[a].cmp(&codes[b]),
                PreparedField::Text(key) => key.compare(a, key, b),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }

    /// Grouping equality over every field.
    #[inline]
    pub(crate) fn rows_equal(&self, a: usize, b: usize) -> bool {
        self.fields.iter().all(|field| match field {
            PreparedField::Numeric { codes, .. } => codes[a] == codes[b],
            PreparedField::Text(key) => key.value(a) == key.value(b),
        })
    }
}

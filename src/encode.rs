//! Key encoding: turns one column into order-preserving unsigned codes.
//!
//! Numeric kinds are "twiddled" into a `u64` whose natural ascending order is the
//! column's order under the requested [`Direction`], with missing values pinned to
//! `0` ([`MissingPlacement::First`]) or `u64::MAX` ([`MissingPlacement::Last`]).
//! Codes are absolute, so two tables encoded with the same direction and placement
//! compare consistently with each other.
//!
//! Strings are not flattened. [`TextKey`] exposes one radix digit per byte position
//! instead, using [`TEXT_BUCKETS`] buckets: a digit for "string ended" below every
//! byte value, and the missing digit outside the byte range.

use std::cmp::Ordering;

use crate::{
    buffer::try_with_capacity,
    column::{Column, Complex64, NA_INT64},
    error::{OrderError, Result},
    key_spec::{Direction, MissingPlacement},
};

const SIGN_BIT: u64 = 1 << 63;

/// Bucket count of one string digit: missing, ended, and 256 byte values.
pub const TEXT_BUCKETS: usize = 258;

/// Largest value digit (a string with a `0xFF` byte at this position).
const TEXT_VALUE_MAX: usize = 256;

/// Ascending code of a signed integer, in `[1, u64::MAX]` for every value but `i64::MIN`.
#[inline(always)]
pub fn int_code(value: i64) -> u64 {
    (value as u64) ^ SIGN_BIT
}

/// Ascending code of a finite or infinite float, `None` for NaN.
///
/// Positive values get their sign bit set, negative values are inverted, so the
/// unsigned order of codes is the numeric order. `-0.0` encodes like `0.0`.
#[inline(always)]
pub fn float_code(value: f64) -> Option<u64> {
    if value.is_nan() {
        return None;
    }
    let value = if value == 0.0 { 0.0 } else { value };
    let bits = value.to_bits();
    Some(if bits & SIGN_BIT == 0 {
        bits | SIGN_BIT
    } else {
        !bits
    })
}

/// Applies direction and missing placement to an ascending code in `[1, u64::MAX]`.
#[inline(always)]
pub fn place_code(code: Option<u64>, direction: Direction, missing: MissingPlacement) -> u64 {
    match code {
        None => missing_code(missing),
        Some(code) => {
            debug_assert_ne!(code, 0);
            let code = match direction {
                Direction::Ascending => code,
                // !code is at most u64::MAX - 1
                Direction::Descending => !code + 1,
            };
            match missing {
                MissingPlacement::First => code,
                MissingPlacement::Last => code - 1,
            }
        }
    }
}

#[inline(always)]
pub const fn missing_code(missing: MissingPlacement) -> u64 {
    match missing {
        MissingPlacement::First => 0,
        MissingPlacement::Last => u64::MAX,
    }
}

/// Encoded codes of one numeric key field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NumericKey {
    codes: Vec<u64>,
    missing_code: u64,
    any_missing: bool,
}

impl NumericKey {
    fn encode<T>(
        values: &[T],
        direction: Direction,
        missing: MissingPlacement,
        code: impl Fn(&T) -> Option<u64>,
    ) -> Result<Self> {
        let mut codes = try_with_capacity(values.len(), "encoded keys")?;
        let mut any_missing = false;
        codes.extend(values.iter().map(|value| {
            let code = code(value);
            any_missing |= code.is_none();
            place_code(code, direction, missing)
        }));

        Ok(Self {
            codes,
            missing_code: missing_code(missing),
            any_missing,
        })
    }

    #[inline(always)]
    pub fn codes(&self) -> &[u64] {
        &self.codes
    }

    #[inline(always)]
    pub fn code(&self, row: usize) -> u64 {
        self.codes[row]
    }

    pub fn any_missing(&self) -> bool {
        self.any_missing
    }

    #[inline(always)]
    pub fn is_missing(&self, row: usize) -> bool {
        self.codes[row] == self.missing_code
    }
}

/// Byte-wise view of a string column.
#[derive(Clone, Copy, Debug)]
pub struct TextKey<'a> {
    values: &'a [Option<String>],
    direction: Direction,
    missing: MissingPlacement,
}

impl<'a> TextKey<'a> {
    pub fn new(
        values: &'a [Option<String>],
        direction: Direction,
        missing: MissingPlacement,
    ) -> Self {
        Self {
            values,
            direction,
            missing,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn any_missing(&self) -> bool {
        self.values.iter().any(Option::is_none)
    }

    #[inline(always)]
    pub fn value(&self, row: usize) -> Option<&'a [u8]> {
        self.values[row].as_deref().map(str::as_bytes)
    }

    #[inline(always)]
    fn place_value_digit(&self, digit: usize) -> usize {
        let digit = match self.direction {
            Direction::Ascending => digit,
            Direction::Descending => TEXT_VALUE_MAX - digit,
        };
        match self.missing {
            MissingPlacement::First => digit + 1,
            MissingPlacement::Last => digit,
        }
    }

    #[inline(always)]
    pub fn missing_digit(&self) -> usize {
        match self.missing {
            MissingPlacement::First => 0,
            MissingPlacement::Last => TEXT_BUCKETS - 1,
        }
    }

    #[inline(always)]
    pub fn ended_digit(&self) -> usize {
        self.place_value_digit(0)
    }

    /// The radix digit of `row` at byte position `depth`, in `0..TEXT_BUCKETS`.
    #[inline(always)]
    pub fn digit(&self, row: usize, depth: usize) -> usize {
        match self.value(row) {
            None => self.missing_digit(),
            Some(bytes) => {
                self.place_value_digit(bytes.get(depth).map_or(0, |&b| b as usize + 1))
            }
        }
    }

    /// Whether rows sharing this digit have no further bytes to discriminate on.
    #[inline(always)]
    pub fn is_terminal_digit(&self, digit: usize) -> bool {
        digit == self.missing_digit() || digit == self.ended_digit()
    }

    /// Compares row `a` of `self` with row `b` of `other`.
    #[inline]
    pub fn compare(&self, a: usize, other: &TextKey<'_>, b: usize) -> Ordering {
        match (self.value(a), other.value(b)) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => match self.missing {
                MissingPlacement::First => Ordering::Less,
                MissingPlacement::Last => Ordering::Greater,
            },
            (Some(_), None) => match self.missing {
                MissingPlacement::First => Ordering::Greater,
                MissingPlacement::Last => Ordering::Less,
            },
            (Some(x), Some(y)) => match self.direction {
                Direction::Ascending => x.cmp(y),
                Direction::Descending => y.cmp(x),
            },
        }
    }
}

/// One radix-sortable field. Complex columns produce two.
#[derive(Clone, Debug)]
pub enum KeyField<'a> {
    Numeric(NumericKey),
    Text(TextKey<'a>),
}

impl KeyField<'_> {
    pub fn len(&self) -> usize {
        match self {
            KeyField::Numeric(key) => key.codes.len(),
            KeyField::Text(key) => key.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn any_missing(&self) -> bool {
        match self {
            KeyField::Numeric(key) => key.any_missing(),
            KeyField::Text(key) => key.any_missing(),
        }
    }

    /// Compares row `a` of this field with row `b` of `other`.
    ///
    /// Both fields must come from the same column kind, direction and placement.
    #[inline]
    pub fn compare(&self, a: usize, other: &KeyField<'_>, b: usize) -> Ordering {
        match (self, other) {
            (KeyField::Numeric(x), KeyField::Numeric(y)) => x.code(a).cmp(&y.code(b)),
            (KeyField::Text(x), KeyField::Text(y)) => x.compare(a, y, b),
            (KeyField::Numeric(_), KeyField::Text(_)) => Ordering::Less,
            (KeyField::Text(_), KeyField::Numeric(_)) => Ordering::Greater,
        }
    }

    /// Grouping equality: missing equals missing, otherwise values must match.
    #[inline(always)]
    pub fn rows_equal(&self, a: usize, b: usize) -> bool {
        match self {
            KeyField::Numeric(key) => key.code(a) == key.code(b),
            KeyField::Text(key) => key.value(a) == key.value(b),
        }
    }
}

/// The encoded form of one key column.
#[derive(Clone, Debug)]
pub struct EncodedKey<'a> {
    fields: Vec<KeyField<'a>>,
    rows: usize,
}

impl<'a> EncodedKey<'a> {
    pub fn fields(&self) -> &[KeyField<'a>] {
        &self.fields
    }

    pub fn into_fields(self) -> Vec<KeyField<'a>> {
        self.fields
    }

    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// The codes of a single numeric field, `None` for strings and complex keys.
    pub fn codes(&self) -> Option<&[u64]> {
        match self.fields.as_slice() {
            [KeyField::Numeric(key)] => Some(key.codes()),
            _ => None,
        }
    }

    pub fn any_missing(&self) -> bool {
        self.fields.iter().any(KeyField::any_missing)
    }

    /// Compares row `a` of `self` with row `b` of `other`, e.g. the two sides of a join.
    pub fn compare(&self, a: usize, other: &EncodedKey<'_>, b: usize) -> Ordering {
        self.fields
            .iter()
            .zip(&other.fields)
            .map(|(x, y)| x.compare(a, y, b))
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    }

    pub fn rows_equal(&self, a: usize, b: usize) -> bool {
        self.fields.iter().all(|field| field.rows_equal(a, b))
    }
}

/// Encodes `column` for ordering under `direction` and `missing`.
///
/// ```
/// use forder::{encode_key, Column, Direction, MissingPlacement};
///
/// let column = Column::Int32(vec![Some(3), None, Some(-1)]);
/// let key = encode_key(&column, Direction::Ascending, MissingPlacement::Last).unwrap();
/// let codes = key.codes().unwrap();
/// assert!(codes[2] < codes[0]);
/// assert_eq!(codes[1], u64::MAX);
/// ```
pub fn encode_key(
    column: &Column,
    direction: Direction,
    missing: MissingPlacement,
) -> Result<EncodedKey<'_>> {
    crate::scope!("encode_key");
    let numeric = |key: Result<NumericKey>| key.map(|key| vec![KeyField::Numeric(key)]);

    let fields = match column {
        Column::Bool(values) => numeric(NumericKey::encode(values, direction, missing, |v| {
            v.map(|b| b as u64 + 1)
        }))?,
        Column::Int8(values) => numeric(NumericKey::encode(values, direction, missing, |v| {
            v.map(|v| int_code(v as i64))
        }))?,
        Column::Int16(values) => numeric(NumericKey::encode(values, direction, missing, |v| {
            v.map(|v| int_code(v as i64))
        }))?,
        Column::Int32(values) => numeric(NumericKey::encode(values, direction, missing, |v| {
            v.map(|v| int_code(v as i64))
        }))?,
        Column::Int64(values) => numeric(NumericKey::encode(values, direction, missing, |&v| {
            (v != NA_INT64).then(|| int_code(v))
        }))?,
        Column::BigInt(values) => numeric(NumericKey::encode(values, direction, missing, |v| {
            let v = v.to_bits() as i64;
            (v != NA_INT64).then(|| int_code(v))
        }))?,
        Column::Float64(values) => numeric(NumericKey::encode(values, direction, missing, |&v| {
            float_code(v)
        }))?,
        Column::Complex(values) => {
            let part = |pick: fn(&Complex64) -> f64| {
                NumericKey::encode(values, direction, missing, move |c: &Complex64| {
                    if c.is_missing() {
                        None
                    } else {
                        float_code(pick(c))
                    }
                })
            };
            vec![
                KeyField::Numeric(part(|c| c.re)?),
                KeyField::Numeric(part(|c| c.im)?),
            ]
        }
        Column::Str(values) => vec![KeyField::Text(TextKey::new(values, direction, missing))],
        Column::List(_) => {
            return Err(OrderError::UnsupportedKeyKind {
                kind: column.kind(),
            })
        }
    };

    Ok(EncodedKey {
        fields,
        rows: column.len(),
    })
}

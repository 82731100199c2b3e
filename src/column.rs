/// Missing-value sentinel for 64-bit integer columns ([`Column::Int64`] and the bit
/// pattern stored in [`Column::BigInt`]).
pub const NA_INT64: i64 = i64::MIN;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Complex64 {
    pub re: f64,
    pub im: f64,
}

impl Complex64 {
    pub const fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }

    #[inline(always)]
    pub fn is_missing(&self) -> bool {
        self.re.is_nan() || self.im.is_nan()
    }
}

/// One column of a [`Table`].
///
/// Each variant is a supported element kind. Missing values are `None` for the
/// `Option` variants, NaN for floating point (either part of a complex value), and
/// [`NA_INT64`] for 64-bit integers.
#[derive(Clone, Debug, PartialEq)]
pub enum Column {
    Bool(Vec<Option<bool>>),
    Int8(Vec<Option<i8>>),
    Int16(Vec<Option<i16>>),
    Int32(Vec<Option<i32>>),
    Int64(Vec<i64>),
    Float64(Vec<f64>),
    /// 64-bit integers carried in the bits of an `f64`.
    BigInt(Vec<f64>),
    Complex(Vec<Complex64>),
    Str(Vec<Option<String>>),
    /// Nested values. Never usable as a sort key.
    List(Vec<Column>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Bool(v) => v.len(),
            Column::Int8(v) => v.len(),
            Column::Int16(v) => v.len(),
            Column::Int32(v) => v.len(),
            Column::Int64(v) => v.len(),
            Column::Float64(v) => v.len(),
            Column::BigInt(v) => v.len(),
            Column::Complex(v) => v.len(),
            Column::Str(v) => v.len(),
            Column::List(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Column::Bool(_) => "bool",
            Column::Int8(_) => "int8",
            Column::Int16(_) => "int16",
            Column::Int32(_) => "int32",
            Column::Int64(_) => "int64",
            Column::Float64(_) => "float64",
            Column::BigInt(_) => "bigint",
            Column::Complex(_) => "complex",
            Column::Str(_) => "string",
            Column::List(_) => "list",
        }
    }

    /// Packs 64-bit integers into the `f64` bit carrier used by [`Column::BigInt`].
    pub fn big_int(values: impl IntoIterator<Item = i64>) -> Self {
        Column::BigInt(values.into_iter().map(|v| f64::from_bits(v as u64)).collect())
    }

    /// Convenience constructor for string columns.
    pub fn strings<S: Into<String>>(values: impl IntoIterator<Item = Option<S>>) -> Self {
        Column::Str(values.into_iter().map(|v| v.map(Into::into)).collect())
    }

    /// Whether row `row` holds a missing value. Nested lists are never missing.
    pub fn is_missing(&self, row: usize) -> bool {
        match self {
            Column::Bool(v) => v[row].is_none(),
            Column::Int8(v) => v[row].is_none(),
            Column::Int16(v) => v[row].is_none(),
            Column::Int32(v) => v[row].is_none(),
            Column::Int64(v) => v[row] == NA_INT64,
            Column::Float64(v) => v[row].is_nan(),
            Column::BigInt(v) => v[row].to_bits() as i64 == NA_INT64,
            Column::Complex(v) => v[row].is_missing(),
            Column::Str(v) => v[row].is_none(),
            Column::List(_) => false,
        }
    }
}

/// A set of columns borrowed read-only by the engine.
///
/// Column lengths are not checked here; `order` rejects key columns whose lengths
/// disagree.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
}

impl Table {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Length of the first column, or 0 for a table without columns.
    pub fn num_rows(&self) -> usize {
        self.columns.first().map_or(0, Column::len)
    }
}

impl From<Vec<Column>> for Table {
    fn from(columns: Vec<Column>) -> Self {
        Table::new(columns)
    }
}

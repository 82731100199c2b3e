use crate::error::{OrderError, Result};

/// Allocates an empty vector able to hold `len` elements without reallocating.
pub(crate) fn try_with_capacity<T>(len: usize, what: &'static str) -> Result<Vec<T>> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(len)
        .map_err(|_| OrderError::AllocationFailure {
            what,
            bytes: len.saturating_mul(std::mem::size_of::<T>()),
        })?;
    Ok(buffer)
}

/// `0..len` as a fallibly allocated vector.
pub(crate) fn try_identity(len: usize, what: &'static str) -> Result<Vec<usize>> {
    let mut buffer = try_with_capacity(len, what)?;
    buffer.extend(0..len);
    Ok(buffer)
}

/// `len` copies of `value`.
pub(crate) fn try_filled<T: Clone>(len: usize, value: T, what: &'static str) -> Result<Vec<T>> {
    let mut buffer = try_with_capacity(len, what)?;
    buffer.resize(len, value);
    Ok(buffer)
}

/// A zeroed vector of `len` row slots.
pub(crate) fn try_zeroed(len: usize, what: &'static str) -> Result<Vec<usize>> {
    try_filled(len, 0, what)
}

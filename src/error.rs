use std::collections::TryReserveError;
use thiserror::Error;

/// Errors returned by distribution and benchmark operations.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// An argument was out of range: a bad bucket layout, a negative, infinite or NaN gauge, a
    /// percentile outside `[0, 100]`, or a query against an empty distribution.
    #[error("invalid argument")]
    InvalidArgument,

    /// Storage for buckets or a snapshot could not be allocated.
    #[error("out of memory")]
    OutOfMemory,
}

impl From<TryReserveError> for Error {
    fn from(_: TryReserveError) -> Self { Error::OutOfMemory }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Allocates an empty vector able to hold `len` elements without reallocating.
pub(crate) fn try_vec<T>(len: usize) -> Result<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len)?;
    Ok(v)
}

/// Copies `src` into freshly reserved storage.
pub(crate) fn try_copy<T: Copy>(src: &[T]) -> Result<Vec<T>> {
    let mut v = try_vec(src.len())?;
    v.extend_from_slice(src);
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::{try_copy, try_vec, Error};

    #[test]
    fn test_try_vec_capacity_overflow() {
        let result = try_vec::<u64>(usize::max_value());
        assert_eq!(result.unwrap_err(), Error::OutOfMemory);
    }

    #[test]
    fn test_try_copy() {
        let v = try_copy(&[1u64, 2, 3]).unwrap();
        assert_eq!(v, vec![1, 2, 3]);
        assert_eq!(v.capacity(), 3);
    }

    #[test]
    fn test_error_display() {
        assert_eq!(Error::InvalidArgument.to_string(), "invalid argument");
        assert_eq!(Error::OutOfMemory.to_string(), "out of memory");
    }
}

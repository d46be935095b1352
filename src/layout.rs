use crate::error::{try_copy, try_vec, Error, Result};
use std::convert::TryFrom;

/// Upper boundaries of a set of buckets.
///
/// A layout always ends with a tail boundary of `+∞`, and every finite boundary before it is
/// strictly positive and strictly greater than its predecessor.  Bucket `i` spans the half-open
/// interval `[boundary(i - 1), boundary(i))`, with the first bucket starting at zero, so the
/// buckets partition `[0, +∞)` with no gaps or overlaps.
///
/// Layouts are immutable once built.
#[derive(Debug, PartialEq)]
pub struct Layout {
    boundaries: Box<[f64]>,
}

impl Layout {
    /// Creates `num_buckets` buckets of equal `size`.
    ///
    /// Produces the boundaries `size, 2·size, …, (num_buckets - 1)·size, +∞`.
    pub fn linear(num_buckets: u64, size: f64) -> Result<Layout> {
        if num_buckets == 0 || !(size > 0.0) {
            return Err(Error::InvalidArgument);
        }

        let finite = finite_len(num_buckets)?;
        let mut boundaries = try_vec(finite + 1)?;
        for i in 0..finite {
            boundaries.push((i + 1) as f64 * size);
        }

        Layout::seal(boundaries)
    }

    /// Creates `num_buckets` buckets growing geometrically by `base`.
    ///
    /// Produces the boundaries `factor·base^0, factor·base^1, …, factor·base^(num_buckets - 2), +∞`,
    /// so the first bucket spans `[0, factor)`.
    pub fn exponential(num_buckets: u64, base: f64, factor: f64) -> Result<Layout> {
        if num_buckets == 0 || !(base > 1.0) || !(factor > 0.0) {
            return Err(Error::InvalidArgument);
        }

        let finite = finite_len(num_buckets)?;
        let mut boundaries = try_vec(finite + 1)?;
        let mut multiplier = 1.0;
        for _ in 0..finite {
            boundaries.push(factor * multiplier);
            multiplier *= base;
        }

        Layout::seal(boundaries)
    }

    /// Creates buckets from explicit upper boundaries.
    ///
    /// `boundaries` must be finite, strictly positive and strictly increasing.  A tail bucket
    /// reaching `+∞` is appended, so `k` boundaries yield `k + 1` buckets, and an empty slice
    /// yields the single bucket `[0, +∞)`.
    pub fn custom(boundaries: &[f64]) -> Result<Layout> {
        let mut owned = try_vec(boundaries.len() + 1)?;
        owned.extend_from_slice(boundaries);
        Layout::seal(owned)
    }

    /// Checks the finite prefix and appends the tail boundary.
    fn seal(mut boundaries: Vec<f64>) -> Result<Layout> {
        let mut previous = 0.0;
        for &boundary in &boundaries {
            if !boundary.is_finite() || !(boundary > previous) {
                return Err(Error::InvalidArgument);
            }
            previous = boundary;
        }

        boundaries.push(std::f64::INFINITY);
        Ok(Layout {
            boundaries: boundaries.into_boxed_slice(),
        })
    }

    /// Number of buckets, including the tail bucket.
    pub fn len(&self) -> usize { self.boundaries.len() }

    /// Upper boundaries of every bucket; the last one is always `+∞`.
    pub fn boundaries(&self) -> &[f64] { &self.boundaries }

    /// Lower boundary of the bucket at `index`.
    pub fn min_boundary(&self, index: usize) -> f64 {
        match index {
            0 => 0.0,
            i => self.boundaries[i - 1],
        }
    }

    /// Upper boundary of the bucket at `index`.
    pub fn max_boundary(&self, index: usize) -> f64 { self.boundaries[index] }

    /// Finds the bucket containing `gauge`.
    ///
    /// Returns the smallest index whose upper boundary is strictly greater than `gauge`.  Callers
    /// validate the gauge first: `+∞` is clamped into the tail bucket and NaN lands in bucket 0.
    pub fn bucket_index(&self, gauge: f64) -> usize {
        let index = self.boundaries.partition_point(|boundary| *boundary <= gauge);
        index.min(self.boundaries.len() - 1)
    }

    pub(crate) fn try_clone(&self) -> Result<Layout> {
        let boundaries = try_copy(&self.boundaries)?;
        Ok(Layout {
            boundaries: boundaries.into_boxed_slice(),
        })
    }
}

/// Converts a requested bucket count into the number of finite boundaries it needs.
fn finite_len(num_buckets: u64) -> Result<usize> {
    let num_buckets = usize::try_from(num_buckets).map_err(|_| Error::OutOfMemory)?;
    Ok(num_buckets - 1)
}

#[cfg(test)]
mod tests {
    use super::Layout;
    use crate::error::Error;
    use proptest::prelude::*;
    use std::f64::INFINITY;

    #[test]
    fn test_linear_boundaries() {
        let layout = Layout::linear(5, 10.0).unwrap();
        assert_eq!(layout.boundaries(), &[10.0, 20.0, 30.0, 40.0, INFINITY]);
        assert_eq!(layout.len(), 5);

        let single = Layout::linear(1, 3.0).unwrap();
        assert_eq!(single.boundaries(), &[INFINITY]);
    }

    #[test]
    fn test_linear_invalid() {
        assert_eq!(Layout::linear(0, 1.0).unwrap_err(), Error::InvalidArgument);
        assert_eq!(Layout::linear(3, 0.0).unwrap_err(), Error::InvalidArgument);
        assert_eq!(Layout::linear(3, -2.0).unwrap_err(), Error::InvalidArgument);
        assert_eq!(Layout::linear(3, std::f64::NAN).unwrap_err(), Error::InvalidArgument);
        assert_eq!(Layout::linear(3, INFINITY).unwrap_err(), Error::InvalidArgument);
    }

    #[test]
    fn test_linear_too_many_buckets() {
        assert_eq!(Layout::linear(u64::max_value(), 1.0).unwrap_err(), Error::OutOfMemory);
    }

    #[test]
    fn test_exponential_boundaries() {
        let layout = Layout::exponential(4, 2.0, 1.0).unwrap();
        assert_eq!(layout.boundaries(), &[1.0, 2.0, 4.0, INFINITY]);

        let layout = Layout::exponential(5, 3.0, 2.0).unwrap();
        assert_eq!(layout.boundaries(), &[2.0, 6.0, 18.0, 54.0, INFINITY]);
        assert_eq!(layout.min_boundary(0), 0.0);
        assert_eq!(layout.max_boundary(0), 2.0);
    }

    #[test]
    fn test_exponential_invalid() {
        assert_eq!(Layout::exponential(0, 2.0, 1.0).unwrap_err(), Error::InvalidArgument);
        assert_eq!(Layout::exponential(3, 1.0, 1.0).unwrap_err(), Error::InvalidArgument);
        assert_eq!(Layout::exponential(3, 0.5, 1.0).unwrap_err(), Error::InvalidArgument);
        assert_eq!(Layout::exponential(3, 2.0, 0.0).unwrap_err(), Error::InvalidArgument);
        assert_eq!(Layout::exponential(3, 2.0, std::f64::NAN).unwrap_err(), Error::InvalidArgument);
    }

    #[test]
    fn test_exponential_overflow() {
        // 2^2000 is not representable, so the later boundaries would collapse into +∞.
        assert_eq!(Layout::exponential(2000, 2.0, 1.0).unwrap_err(), Error::InvalidArgument);
    }

    #[test]
    fn test_custom_boundaries() {
        let layout = Layout::custom(&[2.0, 5.0, 10.0]).unwrap();
        assert_eq!(layout.boundaries(), &[2.0, 5.0, 10.0, INFINITY]);
        assert_eq!(layout.len(), 4);

        let empty = Layout::custom(&[]).unwrap();
        assert_eq!(empty.boundaries(), &[INFINITY]);
    }

    #[test]
    fn test_custom_invalid() {
        assert_eq!(Layout::custom(&[3.0, 3.0]).unwrap_err(), Error::InvalidArgument);
        assert_eq!(Layout::custom(&[3.0, 1.0]).unwrap_err(), Error::InvalidArgument);
        assert_eq!(Layout::custom(&[0.0, 1.0]).unwrap_err(), Error::InvalidArgument);
        assert_eq!(Layout::custom(&[-1.0]).unwrap_err(), Error::InvalidArgument);
        assert_eq!(Layout::custom(&[1.0, INFINITY]).unwrap_err(), Error::InvalidArgument);
        assert_eq!(Layout::custom(&[std::f64::NAN]).unwrap_err(), Error::InvalidArgument);
    }

    #[test]
    fn test_bucket_index_half_open() {
        let layout = Layout::linear(5, 10.0).unwrap();
        assert_eq!(layout.bucket_index(0.0), 0);
        assert_eq!(layout.bucket_index(9.999), 0);
        assert_eq!(layout.bucket_index(10.0), 1);
        assert_eq!(layout.bucket_index(39.0), 3);
        assert_eq!(layout.bucket_index(40.0), 4);
        assert_eq!(layout.bucket_index(1e300), 4);
    }

    proptest! {
        #[test]
        fn test_custom_partitions_domain(mut raw in prop::collection::vec(0.001f64..1e9, 0..64)) {
            raw.sort_by(|a, b| a.partial_cmp(b).unwrap());
            raw.dedup();

            let layout = Layout::custom(&raw).unwrap();
            prop_assert_eq!(layout.len(), raw.len() + 1);
            prop_assert_eq!(layout.min_boundary(0), 0.0);
            prop_assert_eq!(layout.max_boundary(layout.len() - 1), INFINITY);
            for i in 0..layout.len() {
                prop_assert!(layout.max_boundary(i) > layout.min_boundary(i));
                if i + 1 < layout.len() {
                    prop_assert_eq!(layout.max_boundary(i), layout.min_boundary(i + 1));
                }
            }
        }

        #[test]
        fn test_bucket_index_contains_gauge(size in 0.01f64..1000.0, n in 1u64..200, gauge in 0.0f64..1e6) {
            let layout = Layout::linear(n, size).unwrap();
            let index = layout.bucket_index(gauge);
            prop_assert!(layout.min_boundary(index) <= gauge);
            prop_assert!(gauge < layout.max_boundary(index));
        }
    }
}

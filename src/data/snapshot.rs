use super::Bucket;
use crate::error::{Error, Result};
use serde::ser::{Serialize, SerializeStruct, Serializer};

/// A point-in-time view of a distribution.
///
/// Holds its own copy of the boundaries and counters, so it stays valid and unchanged no matter
/// what happens to the distribution it was taken from.  The counters always sum to `count`.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub(crate) boundaries: Vec<f64>,
    pub(crate) counters: Vec<u64>,
    pub(crate) count: u64,
    pub(crate) sum: f64,
    pub(crate) square_sum: f64,
}

impl Snapshot {
    /// Upper boundaries of every bucket, ending with `+∞`.
    pub fn boundaries(&self) -> &[f64] { &self.boundaries }

    /// Number of samples recorded in each bucket.
    pub fn counters(&self) -> &[u64] { &self.counters }

    /// Total number of samples.
    pub fn count(&self) -> u64 { self.count }

    /// Sum of all samples.
    pub fn sum(&self) -> f64 { self.sum }

    /// Sum of the squares of all samples.
    pub fn squares_sum(&self) -> f64 { self.square_sum }

    /// Mean of all samples.
    ///
    /// Returns `Error::InvalidArgument` if the snapshot holds no samples.
    pub fn average(&self) -> Result<f64> {
        if self.count == 0 {
            return Err(Error::InvalidArgument);
        }

        Ok(self.sum / self.count as f64)
    }

    /// Iterates over the buckets along with their lower boundaries.
    pub fn buckets(&self) -> impl Iterator<Item = Bucket> + '_ {
        let lower = std::iter::once(0.0).chain(self.boundaries.iter().cloned());
        lower
            .zip(self.boundaries.iter().zip(self.counters.iter()))
            .map(|(min_boundary, (max_boundary, counter))| Bucket {
                min_boundary,
                max_boundary: *max_boundary,
                counter: *counter,
            })
    }
}

impl Serialize for Snapshot {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("Snapshot", 5)?;
        state.serialize_field("boundaries", &self.boundaries)?;
        state.serialize_field("counters", &self.counters)?;
        state.serialize_field("count", &self.count)?;
        state.serialize_field("sum", &self.sum)?;
        state.serialize_field("squares_sum", &self.square_sum)?;
        state.end()
    }
}

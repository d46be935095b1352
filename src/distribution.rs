use crate::{
    data::{Bucket, Fenwick, Snapshot},
    error::{try_copy, Error, Result},
    layout::Layout,
};
use parking_lot::Mutex;

/// Relative distance from a whole number under which a percentile rank snaps to it.
const RANK_TOLERANCE: f64 = 4.0 * std::f64::EPSILON;

/// Mutable part of a distribution, guarded by its mutex.
#[derive(Debug)]
struct State {
    counters: Fenwick,
    count: u64,
    sum: f64,
    square_sum: f64,
}

impl State {
    fn new(len: usize) -> Result<State> {
        Ok(State {
            counters: Fenwick::with_len(len)?,
            count: 0,
            sum: 0.0,
            square_sum: 0.0,
        })
    }

    fn try_clone(&self) -> Result<State> {
        Ok(State {
            counters: self.counters.try_clone()?,
            count: self.count,
            sum: self.sum,
            square_sum: self.square_sum,
        })
    }
}

/// A thread-safe histogram of non-negative gauges.
///
/// Buckets are fixed at construction by one of the three layouts: linear, exponential or custom.
/// Every update records a single gauge into the bucket containing it, and adds it to the running
/// count and sum.  Queries summarize the recorded samples as percentiles, a mean, or a standard
/// deviation.
///
/// All mutable state sits behind one mutex, so an observer sees each update either entirely or not
/// at all.  Bucket boundaries never change and are read without locking.  To share a distribution
/// between threads, wrap it in an `Arc`.
#[derive(Debug)]
pub struct Distribution {
    layout: Layout,
    state: Mutex<State>,
}

impl Distribution {
    fn from_layout(layout: Layout) -> Result<Distribution> {
        let state = State::new(layout.len())?;
        Ok(Distribution {
            layout,
            state: Mutex::new(state),
        })
    }

    /// Creates a distribution with `num_buckets` buckets of equal `size`.
    ///
    /// Bucket `i` spans `[i·size, (i + 1)·size)`, except for the last bucket which reaches `+∞`.
    ///
    /// Returns `Error::InvalidArgument` if `num_buckets` is zero or `size` is not positive.
    pub fn new_linear(num_buckets: u64, size: f64) -> Result<Distribution> {
        Distribution::from_layout(Layout::linear(num_buckets, size)?)
    }

    /// Creates a distribution with `num_buckets` exponentially growing buckets.
    ///
    /// The upper boundaries are `factor·base^0, factor·base^1, …, factor·base^(num_buckets - 2)`,
    /// followed by `+∞`.
    ///
    /// Returns `Error::InvalidArgument` if `num_buckets` is zero, `base` is not greater than one, or
    /// `factor` is not positive.
    pub fn new_exponential(num_buckets: u64, base: f64, factor: f64) -> Result<Distribution> {
        Distribution::from_layout(Layout::exponential(num_buckets, base, factor)?)
    }

    /// Creates a distribution from explicit upper boundaries.
    ///
    /// The boundaries must be finite, strictly positive and strictly increasing.  A tail bucket
    /// reaching `+∞` is always appended.
    pub fn new_custom(boundaries: &[f64]) -> Result<Distribution> {
        Distribution::from_layout(Layout::custom(boundaries)?)
    }

    /// Records a single gauge.
    ///
    /// Returns `Error::InvalidArgument` if `gauge` is negative, infinite or NaN.
    pub fn update(&self, gauge: f64) -> Result<()> {
        if !(gauge >= 0.0) || gauge.is_infinite() {
            return Err(Error::InvalidArgument);
        }

        let index = self.layout.bucket_index(gauge);

        let mut state = self.state.lock();
        state.counters.increment(index);
        state.count += 1;
        state.sum += gauge;
        state.square_sum += gauge * gauge;
        Ok(())
    }

    /// Gets the value at the given percentile.
    ///
    /// This is the upper boundary of the first bucket at which the cumulative count reaches
    /// `ceil(percent / 100 · count)`, with products within a few ulps of a whole number taken as
    /// that number.  A percentile of zero picks the first non-empty bucket.  When
    /// the samples reach the tail bucket, the result may be `+∞`.
    ///
    /// Returns `Error::InvalidArgument` if `percent` is outside `[0, 100]` or the distribution is
    /// empty.
    pub fn percentile(&self, percent: f64) -> Result<f64> {
        if !(percent >= 0.0 && percent <= 100.0) {
            return Err(Error::InvalidArgument);
        }

        let state = self.state.lock();
        if state.count == 0 {
            return Err(Error::InvalidArgument);
        }

        let index = state.counters.search(rank(percent, state.count));
        Ok(self.layout.max_boundary(index))
    }

    /// Gets the mean of all recorded gauges.
    ///
    /// Returns `Error::InvalidArgument` if the distribution is empty.
    pub fn average(&self) -> Result<f64> {
        let state = self.state.lock();
        if state.count == 0 {
            return Err(Error::InvalidArgument);
        }

        Ok(state.sum / state.count as f64)
    }

    /// Gets the sum of squared deviations from the mean.
    ///
    /// Returns `Error::InvalidArgument` if the distribution is empty.
    pub fn squared_deviation_sum(&self) -> Result<f64> {
        let state = self.state.lock();
        if state.count == 0 {
            return Err(Error::InvalidArgument);
        }

        let deviation = state.square_sum - (state.sum * state.sum) / state.count as f64;
        Ok(deviation.max(0.0))
    }

    /// Gets the sample standard deviation of all recorded gauges.
    ///
    /// A single sample has a standard deviation of zero.
    ///
    /// Returns `Error::InvalidArgument` if the distribution is empty.
    pub fn stddev(&self) -> Result<f64> {
        let state = self.state.lock();
        match state.count {
            0 => Err(Error::InvalidArgument),
            1 => Ok(0.0),
            count => {
                let n = count as f64;
                let variance = (n * state.square_sum - state.sum * state.sum) / (n * (n - 1.0));
                Ok(variance.max(0.0).sqrt())
            },
        }
    }

    /// Creates an independent copy of this distribution.
    ///
    /// The copy has the same boundaries and a consistent point-in-time copy of the counters, count
    /// and sums.  Later updates to either distribution are not visible in the other.
    pub fn clone(&self) -> Result<Distribution> {
        let layout = self.layout.try_clone()?;
        let state = self.state.lock().try_clone()?;
        Ok(Distribution {
            layout,
            state: Mutex::new(state),
        })
    }

    /// Takes a consistent point-in-time snapshot of this distribution.
    pub fn snapshot(&self) -> Result<Snapshot> {
        let boundaries = try_copy(self.layout.boundaries())?;
        let state = self.state.lock();
        Ok(Snapshot {
            boundaries,
            counters: state.counters.counts()?,
            count: state.count,
            sum: state.sum,
            square_sum: state.square_sum,
        })
    }

    /// Subtracts an earlier snapshot of the same series from this distribution.
    ///
    /// After a successful call, this distribution holds only the samples recorded since `other`
    /// was taken.  Both distributions must share the same boundaries, and no counter in `other` may
    /// exceed the matching counter here; otherwise `Error::InvalidArgument` is returned and this
    /// distribution is left unchanged.
    ///
    /// `other` is copied before this distribution is locked, so the two locks are never held at
    /// the same time.
    pub fn sub(&self, other: &Distribution) -> Result<()> {
        if self.layout != other.layout {
            return Err(Error::InvalidArgument);
        }

        let earlier = other.state.lock().try_clone()?;
        let subtrahend = earlier.counters.counts()?;

        let mut state = self.state.lock();
        let mut counts = state.counters.counts()?;
        if state.count < earlier.count || counts.iter().zip(subtrahend.iter()).any(|(a, b)| a < b) {
            return Err(Error::InvalidArgument);
        }

        for (count, previous) in counts.iter_mut().zip(subtrahend.iter()) {
            *count -= *previous;
        }

        state.counters = Fenwick::from_counts(&counts)?;
        state.count -= earlier.count;
        state.sum = (state.sum - earlier.sum).max(0.0);
        state.square_sum = (state.square_sum - earlier.square_sum).max(0.0);
        Ok(())
    }

    /// Clears every counter, the count and the sums.  Boundaries are kept.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.counters.clear();
        state.count = 0;
        state.sum = 0.0;
        state.square_sum = 0.0;
    }

    /// Number of buckets, including the tail bucket.
    pub fn num_buckets(&self) -> u64 { self.layout.len() as u64 }

    /// Upper boundaries of every bucket, ending with `+∞`.
    pub fn boundaries(&self) -> Vec<f64> { self.layout.boundaries().to_vec() }

    /// Number of samples recorded in each bucket.
    pub fn counters(&self) -> Vec<u64> { self.state.lock().counters.to_counts() }

    /// Every bucket with its boundaries and counter.
    pub fn buckets(&self) -> Vec<Bucket> {
        let counters = self.counters();
        counters
            .into_iter()
            .enumerate()
            .map(|(index, counter)| Bucket {
                min_boundary: self.layout.min_boundary(index),
                max_boundary: self.layout.max_boundary(index),
                counter,
            })
            .collect()
    }

    /// Sum of all recorded gauges.
    pub fn sum(&self) -> f64 { self.state.lock().sum }

    /// Sum of the squares of all recorded gauges.
    pub fn squares_sum(&self) -> f64 { self.state.lock().square_sum }

    /// Number of recorded gauges.
    pub fn count(&self) -> u64 { self.state.lock().count }

    /// Consumes the distribution, releasing its storage.
    pub fn destroy(self) {}
}

/// Computes the cumulative rank a percentile refers to, in `[1, count]`.
///
/// A product within a few ulps of a whole number is taken as that number, so a decimal percentile
/// such as `16.1` of `1000` samples gives rank `161` rather than `162`.
fn rank(percent: f64, count: u64) -> u64 {
    let target = percent * count as f64 / 100.0;
    let nearest = target.round();
    let target = if (target - nearest).abs() <= RANK_TOLERANCE * nearest.max(1.0) {
        nearest
    } else {
        target.ceil()
    };
    (target as u64).max(1).min(count)
}

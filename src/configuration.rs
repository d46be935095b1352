use crate::{
    benchmark::Benchmark,
    error::{Error, Result},
};
use std::{
    fmt::{self, Display},
    str::FromStr,
};

/// Bucket counts exercised by default.
pub const DEFAULT_BUCKET_COUNTS: [usize; 8] = [5, 10, 30, 50, 100, 300, 500, 1000];

/// Bucket layout a benchmarked distribution is built with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LayoutKind {
    /// Buckets of 25 units each.
    Linear,
    /// Buckets growing by a factor of 3, starting at 2.
    Exponential,
    /// A ladder of boundaries every 100 units.
    Custom,
}

impl LayoutKind {
    /// Every layout, in reporting order.
    pub const ALL: [LayoutKind; 3] = [LayoutKind::Linear, LayoutKind::Exponential, LayoutKind::Custom];

    /// Short lowercase name of the layout.
    pub fn name(self) -> &'static str {
        match self {
            LayoutKind::Linear => "linear",
            LayoutKind::Exponential => "exponential",
            LayoutKind::Custom => "custom",
        }
    }
}

impl Display for LayoutKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { f.write_str(self.name()) }
}

impl FromStr for LayoutKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<LayoutKind> {
        LayoutKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.name() == s)
            .ok_or(Error::InvalidArgument)
    }
}

/// A configuration builder for `Benchmark`.
#[derive(Clone, Debug)]
pub struct Configuration {
    pub(crate) bucket_counts: Vec<usize>,
    pub(crate) layouts: Vec<LayoutKind>,
    pub(crate) iterations: usize,
    pub(crate) seed: u64,
    pub(crate) threads: usize,
    pub(crate) record_latencies: bool,
}

impl Default for Configuration {
    fn default() -> Configuration {
        Configuration {
            bucket_counts: DEFAULT_BUCKET_COUNTS.to_vec(),
            layouts: vec![LayoutKind::Custom],
            iterations: 1_000_000,
            seed: 5,
            threads: 1,
            record_latencies: false,
        }
    }
}

impl Configuration {
    /// Creates a new `Configuration` with default values.
    pub fn new() -> Configuration { Default::default() }

    /// Sets the bucket counts to benchmark.
    ///
    /// Defaults to `[5, 10, 30, 50, 100, 300, 500, 1000]`.
    ///
    /// Every count gets its own distribution, built from a custom boundary ladder of
    /// `100, 200, …, 100·(N - 1)`, so that gauges drawn from `[0, 100·N)` spread evenly across all
    /// `N` buckets.
    pub fn bucket_counts(mut self, bucket_counts: &[usize]) -> Self {
        self.bucket_counts = bucket_counts.to_vec();
        self
    }

    /// Sets the bucket layouts to benchmark.
    ///
    /// Defaults to `[LayoutKind::Custom]`.
    ///
    /// Every layout gets its own update, percentile and mixed workloads.  With more than one
    /// layout, an interleaved workload also runs, sending each operation to a randomly chosen
    /// layout's distribution.  The contended workload, if enabled, uses the first layout.
    pub fn layouts(mut self, layouts: &[LayoutKind]) -> Self {
        self.layouts = layouts.to_vec();
        self
    }

    /// Sets the number of operations per workload.
    ///
    /// Defaults to `1_000_000`.
    pub fn iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    /// Sets the seed of the workload generator.
    ///
    /// Defaults to `5`.
    ///
    /// All gauges and percentiles are derived from this seed, so two runs with the same
    /// configuration issue exactly the same sequence of operations.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the number of threads for the contended update workload.
    ///
    /// Defaults to `1`, which skips the contended workload entirely.
    ///
    /// With more than one thread, every thread performs its share of `iterations` updates against
    /// the same distribution, measuring how much the shared lock costs under contention.
    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Sets whether each operation is timed individually.
    ///
    /// Defaults to `false`.
    ///
    /// Per-operation timing adds two clock reads to every operation, so averages measured with
    /// it enabled run slightly higher.  In exchange, each workload reports its latency
    /// percentiles.
    pub fn record_latencies(mut self, record_latencies: bool) -> Self {
        self.record_latencies = record_latencies;
        self
    }

    /// Checks that the configuration describes a runnable benchmark.
    ///
    /// Returns `Error::InvalidArgument` if there are no bucket counts, any bucket count is zero,
    /// there are no layouts, a layout is listed twice, or `iterations` or `threads` is zero.
    pub fn validate(&self) -> Result<()> {
        let duplicate_layout = self
            .layouts
            .iter()
            .enumerate()
            .any(|(i, kind)| self.layouts[..i].contains(kind));

        if self.bucket_counts.is_empty()
            || self.bucket_counts.iter().any(|n| *n == 0)
            || self.layouts.is_empty()
            || duplicate_layout
            || self.iterations == 0
            || self.threads == 0
        {
            return Err(Error::InvalidArgument);
        }

        Ok(())
    }

    /// Create a `Benchmark` based on this configuration.
    pub fn build(self) -> Result<Benchmark> {
        self.validate()?;
        Ok(Benchmark::from_config(self))
    }
}

#[cfg(test)]
mod tests {
    use super::{Configuration, LayoutKind, DEFAULT_BUCKET_COUNTS};
    use crate::error::Error;

    #[test]
    fn test_defaults() {
        let config = Configuration::new();
        assert_eq!(config.bucket_counts, DEFAULT_BUCKET_COUNTS.to_vec());
        assert_eq!(config.layouts, vec![LayoutKind::Custom]);
        assert_eq!(config.iterations, 1_000_000);
        assert_eq!(config.seed, 5);
        assert_eq!(config.threads, 1);
        assert!(!config.record_latencies);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = Configuration::new()
            .bucket_counts(&[3, 7])
            .layouts(&LayoutKind::ALL)
            .iterations(10)
            .seed(42)
            .threads(4)
            .record_latencies(true);
        assert_eq!(config.bucket_counts, vec![3, 7]);
        assert_eq!(
            config.layouts,
            vec![LayoutKind::Linear, LayoutKind::Exponential, LayoutKind::Custom]
        );
        assert_eq!(config.iterations, 10);
        assert_eq!(config.seed, 42);
        assert_eq!(config.threads, 4);
        assert!(config.record_latencies);
    }

    #[test]
    fn test_validate() {
        let invalid = vec![
            Configuration::new().bucket_counts(&[]),
            Configuration::new().bucket_counts(&[5, 0]),
            Configuration::new().layouts(&[]),
            Configuration::new().layouts(&[LayoutKind::Linear, LayoutKind::Custom, LayoutKind::Linear]),
            Configuration::new().iterations(0),
            Configuration::new().threads(0),
        ];

        for config in invalid {
            assert_eq!(config.validate().unwrap_err(), Error::InvalidArgument);
            assert_eq!(config.build().err(), Some(Error::InvalidArgument));
        }
    }

    #[test]
    fn test_layout_kind_names() {
        for kind in LayoutKind::ALL.iter() {
            assert_eq!(kind.to_string().parse::<LayoutKind>(), Ok(*kind));
        }
        assert_eq!("exponential".parse::<LayoutKind>(), Ok(LayoutKind::Exponential));
        assert_eq!("Linear".parse::<LayoutKind>(), Err(Error::InvalidArgument));
        assert_eq!("".parse::<LayoutKind>(), Err(Error::InvalidArgument));
    }
}

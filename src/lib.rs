//! A concurrent, bucketed distribution of non-negative gauges.
//!
//! A [`Distribution`] sorts every recorded gauge into one of a fixed set of buckets, built from a
//! linear, exponential or custom layout, and answers percentile, mean and standard deviation
//! queries from the bucket counters.  All mutable state sits behind a single lock, so a
//! distribution can be shared freely between threads.
//!
//! The [`Benchmark`] harness measures update and percentile cost across bucket counts and
//! layouts.
mod benchmark;
mod configuration;
mod data;
mod distribution;
mod error;
mod layout;

pub use self::{
    benchmark::{Benchmark, LatencySummary, Measurement, Report, Workloads},
    configuration::{Configuration, LayoutKind, DEFAULT_BUCKET_COUNTS},
    data::{default_percentiles, Bucket, Percentile, Snapshot},
    distribution::Distribution,
    error::{Error, Result},
    layout::Layout,
};

use crate::{
    configuration::{Configuration, LayoutKind},
    data::{default_percentiles, Percentile},
    distribution::Distribution,
    error::{Error, Result},
};
use crossbeam_channel::unbounded;
use hdrhistogram::Histogram as HdrHistogram;
use log::{debug, info};
use quanta::Clock;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use std::{
    fmt::{self, Display},
    hint::black_box,
    sync::Arc,
    thread,
    time::Duration,
};

/// Every nth operation of the mixed workload is a percentile query; the rest are updates.
const MIXED_QUERY_INTERVAL: usize = 10;

const LINEAR_BUCKET_SIZE: f64 = 25.0;
const EXPONENTIAL_BASE: f64 = 3.0;
const EXPONENTIAL_FACTOR: f64 = 2.0;

/// Latency percentiles of a single workload.
#[derive(Debug, Clone)]
pub struct LatencySummary {
    count: u64,
    measurements: Vec<(Percentile, u64)>,
}

impl LatencySummary {
    fn from_histogram(histogram: &HdrHistogram<u64>, percentiles: &[Percentile]) -> Self {
        let measurements = percentiles
            .iter()
            .map(|p| (p.clone(), histogram.value_at_quantile(p.as_quantile())))
            .collect();

        LatencySummary {
            count: histogram.len(),
            measurements,
        }
    }

    /// Number of timed operations.
    pub fn count(&self) -> u64 { self.count }

    /// Latency in nanoseconds at each reported percentile.
    pub fn measurements(&self) -> &[(Percentile, u64)] { &self.measurements }

    /// Gets the latency at the percentile with the given label, e.g. `p99`.
    pub fn get(&self, label: &str) -> Option<u64> {
        self.measurements
            .iter()
            .find(|(p, _)| p.label() == label)
            .map(|(_, value)| *value)
    }
}

impl Display for LatencySummary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut first = true;
        for (percentile, value) in &self.measurements {
            if !first {
                write!(f, " ")?;
            }
            write!(f, "{}: {}", percentile, value)?;
            first = false;
        }
        Ok(())
    }
}

/// Outcome of a single workload.
#[derive(Debug, Clone)]
pub struct Measurement {
    operations: u64,
    elapsed: Duration,
    latencies: Option<LatencySummary>,
}

impl Measurement {
    /// Number of operations performed.
    pub fn operations(&self) -> u64 { self.operations }

    /// Wall time spent on all operations.
    pub fn elapsed(&self) -> Duration { self.elapsed }

    /// Average nanoseconds per operation.
    pub fn nanos_per_op(&self) -> f64 {
        if self.operations == 0 {
            return 0.0;
        }

        self.elapsed.as_nanos() as f64 / self.operations as f64
    }

    /// Wall time in milliseconds.
    pub fn millis(&self) -> f64 { self.elapsed.as_nanos() as f64 / 1_000_000.0 }

    /// Per-operation latency percentiles, if they were recorded.
    pub fn latencies(&self) -> Option<&LatencySummary> { self.latencies.as_ref() }
}

/// Update, percentile and mixed workloads run against the same distributions.
#[derive(Debug, Clone)]
pub struct Workloads {
    update: Measurement,
    percentile: Measurement,
    mixed: Measurement,
}

impl Workloads {
    /// Update-only workload.
    pub fn update(&self) -> &Measurement { &self.update }

    /// Percentile-only workload.
    pub fn percentile(&self) -> &Measurement { &self.percentile }

    /// Mixed workload: one percentile query for every nine updates.
    pub fn mixed(&self) -> &Measurement { &self.mixed }

    fn write_lines(&self, f: &mut fmt::Formatter, subject: &str) -> fmt::Result {
        writeln!(
            f,
            "Using {} one update takes {:.2} ns in average",
            subject,
            self.update.nanos_per_op()
        )?;
        writeln!(
            f,
            "Using {} one percentile calculation takes {:.2} ns in average",
            subject,
            self.percentile.nanos_per_op()
        )?;
        write!(f, "Using {} mixed function work in {:.3} ms", subject, self.mixed.millis())
    }
}

/// Results of every workload for one bucket count.
#[derive(Debug, Clone)]
pub struct Report {
    num_buckets: usize,
    layouts: Vec<(LayoutKind, Workloads)>,
    interleaved: Option<Workloads>,
    contended: Option<(usize, Measurement)>,
}

impl Report {
    pub fn num_buckets(&self) -> usize { self.num_buckets }

    /// Workloads of every benchmarked layout, in configured order.
    pub fn layouts(&self) -> &[(LayoutKind, Workloads)] { &self.layouts }

    /// Workloads of the given layout, if it was benchmarked.
    pub fn workloads(&self, kind: LayoutKind) -> Option<&Workloads> {
        self.layouts.iter().find(|(k, _)| *k == kind).map(|(_, w)| w)
    }

    /// Workloads spread across every layout's distribution, if more than one layout ran.
    pub fn interleaved(&self) -> Option<&Workloads> { self.interleaved.as_ref() }

    /// Contended update workload and the number of threads it ran on, if enabled.
    pub fn contended(&self) -> Option<(usize, &Measurement)> { self.contended.as_ref().map(|(t, m)| (*t, m)) }
}

impl Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut first = true;
        for (kind, workloads) in &self.layouts {
            if !first {
                writeln!(f)?;
            }
            let subject = match kind {
                LayoutKind::Custom => format!("{} buckets", self.num_buckets),
                kind => format!("{} buckets ({})", self.num_buckets, kind),
            };
            workloads.write_lines(f, &subject)?;
            first = false;
        }
        if let Some(interleaved) = &self.interleaved {
            writeln!(f)?;
            let subject = format!("{} buckets (all {} layouts)", self.num_buckets, self.layouts.len());
            interleaved.write_lines(f, &subject)?;
        }
        if let Some((threads, contended)) = &self.contended {
            write!(
                f,
                "\nUsing {} buckets one contended update takes {:.2} ns in average with {} threads",
                self.num_buckets,
                contended.nanos_per_op(),
                threads
            )?;
        }
        Ok(())
    }
}

/// Drives update, percentile and mixed workloads against distributions of varying size.
pub struct Benchmark {
    config: Configuration,
    clock: Clock,
    rng: Xoshiro256PlusPlus,
    percentiles: Vec<Percentile>,
}

impl Benchmark {
    pub(crate) fn from_config(config: Configuration) -> Benchmark {
        let rng = Xoshiro256PlusPlus::seed_from_u64(config.seed);

        Benchmark {
            config,
            clock: Clock::new(),
            rng,
            percentiles: default_percentiles(),
        }
    }

    /// Gets a builder to configure a `Benchmark` instance with.
    pub fn builder() -> Configuration { Configuration::default() }

    /// Replaces the clock used for timing.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Runs every workload for every configured bucket count.
    pub fn run(&mut self) -> Result<Vec<Report>> {
        info!(
            "bucket counts: {:?}, layouts: {:?}, iterations: {}, seed: {}, threads: {}",
            self.config.bucket_counts,
            self.config.layouts,
            self.config.iterations,
            self.config.seed,
            self.config.threads
        );

        let bucket_counts = self.config.bucket_counts.clone();
        bucket_counts.into_iter().map(|n| self.run_buckets(n)).collect()
    }

    /// Runs every workload against distributions of `num_buckets` buckets.
    pub fn run_buckets(&mut self, num_buckets: usize) -> Result<Report> {
        if num_buckets == 0 {
            return Err(Error::InvalidArgument);
        }

        let kinds = self.config.layouts.clone();
        let gauges = self.gauges(num_buckets);
        let percents = self.percents();

        let mut distributions = Vec::with_capacity(kinds.len());
        let mut layouts = Vec::with_capacity(kinds.len());
        for kind in &kinds {
            let distribution = build(*kind, num_buckets)?;
            debug!("{} buckets: {} workloads", num_buckets, kind);
            layouts.push((*kind, self.workloads(&gauges, &percents, |_| &distribution)?));
            distributions.push(distribution);
        }

        let interleaved = if distributions.len() > 1 {
            debug!("{} buckets: interleaved workloads across {} layouts", num_buckets, distributions.len());
            let indexes = self.indexes(distributions.len());
            Some(self.workloads(&gauges, &percents, |i| &distributions[indexes[i]])?)
        } else {
            None
        };

        let contended = match kinds.first() {
            Some(kind) if self.config.threads > 1 => {
                debug!("{} buckets: contended workload on {} threads", num_buckets, self.config.threads);
                Some((self.config.threads, self.contended(build(*kind, num_buckets)?, gauges)?))
            },
            _ => None,
        };

        Ok(Report {
            num_buckets,
            layouts,
            interleaved,
            contended,
        })
    }

    /// Runs the update, percentile and mixed workloads, sending operation `i` to `target(i)`.
    ///
    /// The update workload runs first.  A target must hold samples by the time it is queried.
    fn workloads<'a, T>(&self, gauges: &[f64], percents: &[f64], target: T) -> Result<Workloads>
    where
        T: Fn(usize) -> &'a Distribution,
    {
        let update = self.measure(|i| target(i).update(gauges[i]))?;
        let percentile = self.measure(|i| {
            target(i).percentile(percents[i]).map(|v| {
                black_box(v);
            })
        })?;
        let mixed = self.measure(|i| {
            if i % MIXED_QUERY_INTERVAL == 0 {
                target(i).percentile(percents[i]).map(|v| {
                    black_box(v);
                })
            } else {
                target(i).update(gauges[i])
            }
        })?;

        Ok(Workloads {
            update,
            percentile,
            mixed,
        })
    }

    fn gauges(&mut self, num_buckets: usize) -> Vec<f64> {
        let limit = 100.0 * num_buckets as f64;
        let rng = &mut self.rng;
        (0..self.config.iterations).map(|_| rng.gen_range(0.0..limit)).collect()
    }

    fn percents(&mut self) -> Vec<f64> {
        let rng = &mut self.rng;
        (0..self.config.iterations).map(|_| rng.gen_range(0.0..=100.0)).collect()
    }

    fn indexes(&mut self, count: usize) -> Vec<usize> {
        let rng = &mut self.rng;
        (0..self.config.iterations).map(|_| rng.gen_range(0..count)).collect()
    }

    /// Times `iterations` calls of `op`, each given its operation index.
    fn measure<F>(&self, mut op: F) -> Result<Measurement>
    where
        F: FnMut(usize) -> Result<()>,
    {
        let iterations = self.config.iterations;
        let mut histogram = if self.config.record_latencies {
            Some(HdrHistogram::<u64>::new_with_bounds(1, u64::max_value(), 3).map_err(|_| Error::InvalidArgument)?)
        } else {
            None
        };

        let start = self.clock.now();
        match histogram.as_mut() {
            Some(histogram) => {
                for i in 0..iterations {
                    let t0 = self.clock.raw();
                    op(i)?;
                    let t1 = self.clock.raw();
                    histogram.saturating_record(self.clock.delta(t0, t1).as_nanos() as u64);
                }
            },
            None => {
                for i in 0..iterations {
                    op(i)?;
                }
            },
        }
        let elapsed = self.clock.now().duration_since(start);

        Ok(Measurement {
            operations: iterations as u64,
            elapsed,
            latencies: histogram.map(|h| LatencySummary::from_histogram(&h, &self.percentiles)),
        })
    }

    /// Splits the update workload across threads sharing one distribution.
    fn contended(&self, distribution: Distribution, gauges: Vec<f64>) -> Result<Measurement> {
        let threads = self.config.threads;
        let per_thread = self.config.iterations / threads;
        let distribution = Arc::new(distribution);
        let gauges = Arc::new(gauges);
        let (done_tx, done_rx) = unbounded();

        let start = self.clock.now();
        for t in 0..threads {
            let distribution = Arc::clone(&distribution);
            let gauges = Arc::clone(&gauges);
            let done_tx = done_tx.clone();
            thread::spawn(move || {
                let result = gauges[t * per_thread..(t + 1) * per_thread]
                    .iter()
                    .try_for_each(|gauge| distribution.update(*gauge));
                let _ = done_tx.send(result);
            });
        }
        drop(done_tx);

        for result in done_rx.iter() {
            result?;
        }
        let elapsed = self.clock.now().duration_since(start);

        Ok(Measurement {
            operations: (per_thread * threads) as u64,
            elapsed,
            latencies: None,
        })
    }
}

/// Upper boundaries `100, 200, …, 100·(num_buckets - 1)`, giving `num_buckets` buckets.
fn ladder(num_buckets: usize) -> Vec<f64> { (1..num_buckets).map(|i| 100.0 * i as f64).collect() }

/// Growth rate of the exponential layout.
///
/// Stays at `EXPONENTIAL_BASE` unless the top boundary would overflow, in which case it shrinks
/// just enough to keep every boundary finite.
fn exponential_base(num_buckets: usize) -> f64 {
    let steps = num_buckets.saturating_sub(2);
    if steps == 0 {
        return EXPONENTIAL_BASE;
    }

    let limit = (std::f64::MAX / 4.0 / EXPONENTIAL_FACTOR).powf(1.0 / steps as f64);
    EXPONENTIAL_BASE.min(limit)
}

/// Creates an empty distribution of `num_buckets` buckets with the given layout.
fn build(kind: LayoutKind, num_buckets: usize) -> Result<Distribution> {
    match kind {
        LayoutKind::Linear => Distribution::new_linear(num_buckets as u64, LINEAR_BUCKET_SIZE),
        LayoutKind::Exponential => Distribution::new_exponential(
            num_buckets as u64,
            exponential_base(num_buckets),
            EXPONENTIAL_FACTOR,
        ),
        LayoutKind::Custom => Distribution::new_custom(&ladder(num_buckets)),
    }
}

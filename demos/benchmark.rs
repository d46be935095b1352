#[macro_use]
extern crate log;
extern crate bucketdist;
extern crate env_logger;
extern crate getopts;

use bucketdist::{Benchmark, LayoutKind, Measurement, Workloads, DEFAULT_BUCKET_COUNTS};
use getopts::Options;
use std::env;

fn print_usage(program: &str, opts: &Options) {
    let brief = format!("Usage: {} [options]", program);
    print!("{}", opts.usage(&brief));
}

pub fn opts() -> Options {
    let mut opts = Options::new();

    opts.optopt("b", "buckets", "comma-separated bucket counts to benchmark", "LIST");
    opts.optopt(
        "L",
        "layouts",
        "comma-separated layouts to benchmark: linear, exponential, custom, or all",
        "LIST",
    );
    opts.optopt("i", "iterations", "number of operations per workload", "INTEGER");
    opts.optopt("s", "seed", "seed for the workload generator", "INTEGER");
    opts.optopt("t", "threads", "number of threads for the contended update workload", "INTEGER");
    opts.optflag("l", "latencies", "time every operation and report latency percentiles");
    opts.optflag("h", "help", "print this help menu");

    opts
}

fn parse_buckets(raw: &str) -> Result<Vec<usize>, String> {
    raw.split(',')
        .map(|s| s.trim().parse::<usize>().map_err(|e| format!("invalid bucket count '{}': {}", s, e)))
        .collect()
}

fn parse_layouts(raw: &str) -> Result<Vec<LayoutKind>, String> {
    if raw.trim() == "all" {
        return Ok(LayoutKind::ALL.to_vec());
    }

    raw.split(',')
        .map(|s| s.trim().parse::<LayoutKind>().map_err(|_| format!("unknown layout '{}'", s)))
        .collect()
}

fn log_latencies(num_buckets: usize, workload: &str, measurement: &Measurement) {
    if let Some(latencies) = measurement.latencies() {
        info!("{} buckets, {} latency (ns): {}", num_buckets, workload, latencies);
    }
}

fn log_workloads(num_buckets: usize, layout: &str, workloads: &Workloads) {
    log_latencies(num_buckets, &format!("{} update", layout), workloads.update());
    log_latencies(num_buckets, &format!("{} percentile", layout), workloads.percentile());
    log_latencies(num_buckets, &format!("{} mixed", layout), workloads.mixed());
}

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let program = &args[0];
    let opts = opts();

    let matches = match opts.parse(&args[1..]) {
        Ok(m) => m,
        Err(f) => {
            error!("Failed to parse command line args: {}", f);
            return;
        },
    };

    if matches.opt_present("help") {
        print_usage(program, &opts);
        return;
    }

    info!("distribution benchmark");

    let buckets = match matches.opt_str("buckets") {
        Some(raw) => match parse_buckets(&raw) {
            Ok(buckets) => buckets,
            Err(e) => {
                error!("{}", e);
                return;
            },
        },
        None => DEFAULT_BUCKET_COUNTS.to_vec(),
    };
    let layouts = match matches.opt_str("layouts") {
        Some(raw) => match parse_layouts(&raw) {
            Ok(layouts) => layouts,
            Err(e) => {
                error!("{}", e);
                return;
            },
        },
        None => vec![LayoutKind::Custom],
    };
    let iterations = match matches.opt_get_default("iterations", 1_000_000usize) {
        Ok(i) => i,
        Err(e) => {
            error!("invalid iterations: {}", e);
            return;
        },
    };
    let seed = match matches.opt_get_default("seed", 5u64) {
        Ok(s) => s,
        Err(e) => {
            error!("invalid seed: {}", e);
            return;
        },
    };
    let threads = match matches.opt_get_default("threads", 1usize) {
        Ok(t) => t,
        Err(e) => {
            error!("invalid threads: {}", e);
            return;
        },
    };

    let config = Benchmark::builder()
        .bucket_counts(&buckets)
        .layouts(&layouts)
        .iterations(iterations)
        .seed(seed)
        .threads(threads)
        .record_latencies(matches.opt_present("latencies"));

    let mut benchmark = match config.build() {
        Ok(b) => b,
        Err(e) => {
            error!("invalid benchmark configuration: {}", e);
            return;
        },
    };

    let reports = match benchmark.run() {
        Ok(r) => r,
        Err(e) => {
            error!("benchmark failed: {}", e);
            return;
        },
    };

    for report in reports {
        println!("{}", report);

        for (kind, workloads) in report.layouts() {
            log_workloads(report.num_buckets(), kind.name(), workloads);
        }
        if let Some(interleaved) = report.interleaved() {
            log_workloads(report.num_buckets(), "interleaved", interleaved);
        }
        if let Some((_, contended)) = report.contended() {
            log_latencies(report.num_buckets(), "contended update", contended);
        }
    }
}

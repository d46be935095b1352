use std::{
    fmt::{self, Display},
    hash::{Hash, Hasher},
};

pub(crate) mod fenwick;
pub mod snapshot;

pub(crate) use self::fenwick::Fenwick;
pub use self::snapshot::Snapshot;

/// A single bucket of a distribution.
///
/// Covers the half-open interval `[min_boundary, max_boundary)`.  The first bucket starts at
/// `0.0` and the last bucket ends at `+∞`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bucket {
    pub min_boundary: f64,
    pub max_boundary: f64,
    pub counter: u64,
}

impl Bucket {
    /// Whether `gauge` falls inside this bucket.
    pub fn contains(&self, gauge: f64) -> bool { gauge >= self.min_boundary && gauge < self.max_boundary }
}

/// A labeled percentile.
///
/// This represents a floating-point value from 0 to 100, with a string label to be used for
/// displaying the given percentile.
#[derive(Clone, Debug)]
pub struct Percentile {
    label: String,
    value: f64,
}

impl Percentile {
    /// Gets the label of this percentile.
    pub fn label(&self) -> &str { self.label.as_str() }

    /// Gets the raw percentile value.
    pub fn value(&self) -> f64 { self.value }

    /// Gets the value as a quantile, in the `[0.0, 1.0]` range.
    pub fn as_quantile(&self) -> f64 { self.value / 100.0 }
}

/// Percentiles reported by default: min, median, tail, and max.
pub fn default_percentiles() -> Vec<Percentile> {
    [0.0, 50.0, 90.0, 99.0, 99.9, 100.0]
        .iter()
        .map(|p| Percentile::from(*p))
        .collect()
}

impl From<f64> for Percentile {
    fn from(p: f64) -> Self {
        // Force our value between +0.0 and +100.0.
        let clamped = p.max(0.0);
        let clamped = clamped.min(100.0);

        let raw_label = format!("{}", clamped);
        let label = match raw_label.as_str() {
            "0" => "min".to_string(),
            "100" => "max".to_string(),
            _ => {
                let raw = format!("p{}", clamped);
                raw.replace(".", "")
            },
        };

        Percentile { label, value: clamped }
    }
}

impl Display for Percentile {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { write!(f, "{}", self.label) }
}

impl PartialEq for Percentile {
    fn eq(&self, other: &Self) -> bool { self.label == other.label }
}

impl Eq for Percentile {}

impl Hash for Percentile {
    fn hash<H: Hasher>(&self, state: &mut H) { self.label.hash(state); }
}

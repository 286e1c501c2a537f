//! Per-bucket deltas from cumulative latency histograms

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Bucket upper bounds exported by the traffic capture agent, lowest first
pub const DEFAULT_BUCKETS: &[&str] = &[
    "0", "0.005", "0.01", "0.025", "0.05", "0.1", "0.25", "0.5", "1", "2.5", "5", "10", "+Inf",
];

/// Ordered histogram bucket bounds, compared as label strings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BucketSequence(Vec<String>);

impl Default for BucketSequence {
    fn default() -> Self {
        Self::new(DEFAULT_BUCKETS.iter().copied())
    }
}

impl BucketSequence {
    pub fn new<I, S>(bounds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            bounds
                .into_iter()
                .map(|b| b.as_ref().trim().to_string())
                .filter(|b| !b.is_empty())
                .collect(),
        )
    }

    /// Parse a comma-separated list such as `"0.1,0.25,+Inf"`
    pub fn from_list(list: &str) -> Self {
        Self::new(list.split(','))
    }

    pub fn bounds(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Delta between each pair of adjacent bounds, keyed `"<lo> - <hi>s"`
    ///
    /// `counts` maps a bucket bound to the cumulative count summed over all
    /// status codes. The first bound of the sequence is the histogram floor
    /// and counts as zero when it was not observed. Pairs where either bound
    /// is unknown are skipped, and only strictly positive deltas are kept.
    pub fn differences(&self, counts: &BTreeMap<String, u64>) -> Vec<(String, u64)> {
        let lookup = |index: usize| -> Option<u64> {
            let bound = &self.0[index];
            match counts.get(bound) {
                Some(count) => Some(*count),
                None if index == 0 => Some(0),
                None => None,
            }
        };

        let mut deltas = Vec::new();
        for index in 1..self.0.len() {
            let (Some(lo), Some(hi)) = (lookup(index - 1), lookup(index)) else {
                continue;
            };

            let (lo_bound, hi_bound) = (&self.0[index - 1], &self.0[index]);
            if hi > lo {
                deltas.push((format!("{} - {}s", lo_bound, hi_bound), hi - lo));
            } else if hi < lo {
                debug!(
                    lo = %lo_bound,
                    hi = %hi_bound,
                    lo_count = lo,
                    hi_count = hi,
                    "Dropping non-monotonic histogram bucket"
                );
            }
        }

        deltas
    }
}

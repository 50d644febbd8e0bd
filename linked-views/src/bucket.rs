//! Discrete recruitment-rate buckets.
//!
//! The rate domain [0, 1] is split into four ordered, non-overlapping ranges.
//! A bucket is an alternate selection source: the host's radio buttons or
//! slider produce a `Bucket`, and `BucketScheme::members_of` turns it into the
//! simulation ids the views understand.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use tsify_next::Tsify;

use crate::dataset::Simulation;
use crate::error::LinkError;
use crate::types::SimulationId;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Tsify,
)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub enum Bucket {
    Low,
    Medium,
    High,
    Perfect,
}

impl Bucket {
    pub const ALL: [Bucket; 4] = [Bucket::Low, Bucket::Medium, Bucket::High, Bucket::Perfect];

    pub fn name(self) -> &'static str {
        match self {
            Bucket::Low => "Low",
            Bucket::Medium => "Medium",
            Bucket::High => "High",
            Bucket::Perfect => "Perfect",
        }
    }

    /// Case-insensitive parse of a bucket name coming from the host shell.
    pub fn from_name(name: &str) -> Result<Bucket, LinkError> {
        let trimmed = name.trim();
        Bucket::ALL
            .into_iter()
            .find(|b| b.name().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| LinkError::UnknownBucket(name.to_string()))
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Half-open range `[lo, hi)`; the top bucket is closed at 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct RateRange {
    pub lo: f64,
    pub hi: f64,
    pub hi_inclusive: bool,
}

impl RateRange {
    pub fn contains(&self, rate: f64) -> bool {
        rate >= self.lo && (rate < self.hi || (self.hi_inclusive && rate <= self.hi))
    }
}

/// Bucket boundaries. `thresholds[i]` is the lower bound of bucket `i + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BucketScheme {
    pub thresholds: [f64; 3],
}

impl Default for BucketScheme {
    fn default() -> Self {
        Self {
            thresholds: [0.33, 0.66, 0.9],
        }
    }
}

impl BucketScheme {
    pub fn new(thresholds: [f64; 3]) -> Result<Self, LinkError> {
        let scheme = Self { thresholds };
        scheme.validate()?;
        Ok(scheme)
    }

    pub fn validate(&self) -> Result<(), LinkError> {
        let [a, b, c] = self.thresholds;
        let ok = self.thresholds.iter().all(|t| t.is_finite())
            && 0.0 < a
            && a < b
            && b < c
            && c < 1.0;
        if ok {
            Ok(())
        } else {
            Err(LinkError::InvalidThresholds(self.thresholds))
        }
    }

    /// Pure and total. Rates below 0 (and NaN) land in `Low`, above 1 in `Perfect`;
    /// validated datasets never produce either.
    pub fn compute_bucket(&self, rate: f64) -> Bucket {
        let [a, b, c] = self.thresholds;
        if rate.is_nan() || rate < a {
            Bucket::Low
        } else if rate < b {
            Bucket::Medium
        } else if rate < c {
            Bucket::High
        } else {
            Bucket::Perfect
        }
    }

    pub fn range(&self, bucket: Bucket) -> RateRange {
        let [a, b, c] = self.thresholds;
        let (lo, hi) = match bucket {
            Bucket::Low => (0.0, a),
            Bucket::Medium => (a, b),
            Bucket::High => (b, c),
            Bucket::Perfect => (c, 1.0),
        };
        RateRange {
            lo,
            hi,
            hi_inclusive: bucket == Bucket::Perfect,
        }
    }

    /// Ids of the simulations whose rate falls in `bucket`.
    pub fn members_of<'a>(
        &self,
        bucket: Bucket,
        simulations: impl IntoIterator<Item = &'a Simulation>,
    ) -> BTreeSet<SimulationId> {
        simulations
            .into_iter()
            .filter(|s| self.compute_bucket(s.recruitment_rate) == bucket)
            .map(|s| s.id)
            .collect()
    }

    /// Member count per bucket, in bucket order. Drives the radio-button labels.
    pub fn counts<'a>(
        &self,
        simulations: impl IntoIterator<Item = &'a Simulation>,
    ) -> [(Bucket, usize); 4] {
        let mut counts = Bucket::ALL.map(|b| (b, 0usize));
        for sim in simulations {
            let idx = self.compute_bucket(sim.recruitment_rate) as usize;
            counts[idx].1 += 1;
        }
        counts
    }
}

/// `BucketScheme::default().compute_bucket(rate)`.
pub fn compute_bucket(rate: f64) -> Bucket {
    BucketScheme::default().compute_bucket(rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_boundaries() {
        assert_eq!(compute_bucket(0.0), Bucket::Low);
        assert_eq!(compute_bucket(0.3299), Bucket::Low);
        assert_eq!(compute_bucket(0.33), Bucket::Medium);
        assert_eq!(compute_bucket(0.66), Bucket::High);
        assert_eq!(compute_bucket(0.8999), Bucket::High);
        assert_eq!(compute_bucket(0.9), Bucket::Perfect);
        assert_eq!(compute_bucket(1.0), Bucket::Perfect);
    }

    #[test]
    fn out_of_domain_rates_clamp() {
        assert_eq!(compute_bucket(-0.1), Bucket::Low);
        assert_eq!(compute_bucket(f64::NAN), Bucket::Low);
        assert_eq!(compute_bucket(1.5), Bucket::Perfect);
    }

    #[test]
    fn range_agrees_with_compute_bucket() {
        let scheme = BucketScheme::default();
        for i in 0..=1000 {
            let r = i as f64 / 1000.0;
            let owners: Vec<_> = Bucket::ALL
                .into_iter()
                .filter(|b| scheme.range(*b).contains(r))
                .collect();
            assert_eq!(owners, vec![scheme.compute_bucket(r)], "rate {r}");
        }
    }

    #[test]
    fn from_name_is_case_insensitive() {
        assert_eq!(Bucket::from_name("perfect").unwrap(), Bucket::Perfect);
        assert_eq!(Bucket::from_name(" MEDIUM ").unwrap(), Bucket::Medium);
        assert!(matches!(
            Bucket::from_name("Excellent"),
            Err(LinkError::UnknownBucket(name)) if name == "Excellent"
        ));
    }

    #[test]
    fn rejects_bad_thresholds() {
        assert!(BucketScheme::new([0.2, 0.5, 0.8]).is_ok());
        assert!(BucketScheme::new([0.5, 0.5, 0.8]).is_err());
        assert!(BucketScheme::new([0.0, 0.5, 0.8]).is_err());
        assert!(BucketScheme::new([0.2, 0.5, 1.0]).is_err());
        assert!(BucketScheme::new([0.2, f64::NAN, 0.8]).is_err());
    }

    #[test]
    fn counts_follow_bucket_order() {
        let sims: Vec<_> = [0.1, 0.2, 0.5, 0.95]
            .into_iter()
            .enumerate()
            .map(|(i, r)| Simulation::new(SimulationId::new(i as u32), r))
            .collect();
        let counts = BucketScheme::default().counts(&sims);
        assert_eq!(
            counts,
            [
                (Bucket::Low, 2),
                (Bucket::Medium, 1),
                (Bucket::High, 0),
                (Bucket::Perfect, 1)
            ]
        );
    }
}

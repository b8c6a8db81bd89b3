use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::Job;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchBucket {
    High,
    Medium,
    Low,
}

impl fmt::Display for MatchBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MatchBucket::High => "high",
            MatchBucket::Medium => "medium",
            MatchBucket::Low => "low",
        })
    }
}

/// Named threshold policies seen across deployments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdPolicy {
    /// high >= 80, medium [50, 80), low < 50
    #[default]
    Standard,
    /// high >= 75, medium [50, 75), low < 50
    Lenient,
}

impl ThresholdPolicy {
    pub fn thresholds(self) -> MatchThresholds {
        match self {
            ThresholdPolicy::Standard => MatchThresholds::STANDARD,
            ThresholdPolicy::Lenient => MatchThresholds::LENIENT,
        }
    }
}

/// Bucket floors for match scores. Filtering, bucket counts and widget
/// colouring all read the same value; nothing else hardcodes a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchThresholds {
    pub high_floor: u8,
    pub medium_floor: u8,
}

impl MatchThresholds {
    pub const STANDARD: MatchThresholds = MatchThresholds {
        high_floor: 80,
        medium_floor: 50,
    };

    pub const LENIENT: MatchThresholds = MatchThresholds {
        high_floor: 75,
        medium_floor: 50,
    };

    pub fn bucket(&self, score: u8) -> MatchBucket {
        if score >= self.high_floor {
            MatchBucket::High
        } else if score >= self.medium_floor {
            MatchBucket::Medium
        } else {
            MatchBucket::Low
        }
    }

    pub fn bucket_of(&self, job: &Job) -> MatchBucket {
        self.bucket(job.match_score)
    }
}

impl Default for MatchThresholds {
    fn default() -> Self {
        Self::STANDARD
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_boundaries() {
        let t = MatchThresholds::STANDARD;
        assert_eq!(t.bucket(100), MatchBucket::High);
        assert_eq!(t.bucket(80), MatchBucket::High);
        assert_eq!(t.bucket(79), MatchBucket::Medium);
        assert_eq!(t.bucket(50), MatchBucket::Medium);
        assert_eq!(t.bucket(49), MatchBucket::Low);
        assert_eq!(t.bucket(0), MatchBucket::Low);
    }

    #[test]
    fn test_lenient_boundaries() {
        let t = ThresholdPolicy::Lenient.thresholds();
        assert_eq!(t.bucket(75), MatchBucket::High);
        assert_eq!(t.bucket(74), MatchBucket::Medium);
        assert_eq!(t.bucket(50), MatchBucket::Medium);
        assert_eq!(t.bucket(49), MatchBucket::Low);
    }

    #[test]
    fn test_default_policy_is_standard() {
        assert_eq!(ThresholdPolicy::default().thresholds(), MatchThresholds::default());
    }
}

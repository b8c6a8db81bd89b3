use serde::{Deserialize, Serialize};

use crate::models::Job;
use crate::scoring::{MatchBucket, MatchThresholds};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MatchFilter {
    #[default]
    All,
    High,
    Medium,
    Low,
}

impl MatchFilter {
    pub fn bucket(&self) -> Option<MatchBucket> {
        match self {
            MatchFilter::All => None,
            MatchFilter::High => Some(MatchBucket::High),
            MatchFilter::Medium => Some(MatchBucket::Medium),
            MatchFilter::Low => Some(MatchBucket::Low),
        }
    }

    pub fn next(&self) -> MatchFilter {
        match self {
            MatchFilter::All => MatchFilter::High,
            MatchFilter::High => MatchFilter::Medium,
            MatchFilter::Medium => MatchFilter::Low,
            MatchFilter::Low => MatchFilter::All,
        }
    }
}

impl From<MatchBucket> for MatchFilter {
    fn from(bucket: MatchBucket) -> Self {
        match bucket {
            MatchBucket::High => MatchFilter::High,
            MatchBucket::Medium => MatchFilter::Medium,
            MatchBucket::Low => MatchFilter::Low,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    Newest,
    Oldest,
    MatchHigh,
    MatchLow,
}

impl SortKey {
    pub fn label(&self) -> &'static str {
        match self {
            SortKey::Newest => "newest first",
            SortKey::Oldest => "oldest first",
            SortKey::MatchHigh => "highest match",
            SortKey::MatchLow => "lowest match",
        }
    }

    pub fn next(&self) -> SortKey {
        match self {
            SortKey::Newest => SortKey::Oldest,
            SortKey::Oldest => SortKey::MatchHigh,
            SortKey::MatchHigh => SortKey::MatchLow,
            SortKey::MatchLow => SortKey::Newest,
        }
    }
}

/// Client-side view parameters applied on top of the fetched collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobQuery {
    pub title: String,
    pub match_filter: MatchFilter,
    pub sort: SortKey,
}

fn job_matches(job: &Job, needle: &str, filter: MatchFilter, thresholds: &MatchThresholds) -> bool {
    let title_ok = needle.is_empty() || job.title.to_lowercase().contains(needle);
    let bucket_ok = match filter.bucket() {
        None => true,
        Some(bucket) => thresholds.bucket_of(job) == bucket,
    };
    title_ok && bucket_ok
}

/// Returns the jobs passing the title and bucket filters, ordered by the
/// sort key. `sort_by` is stable, so ties keep collection order.
pub fn apply<'a>(jobs: &'a [Job], query: &JobQuery, thresholds: &MatchThresholds) -> Vec<&'a Job> {
    let needle = query.title.to_lowercase();
    let mut visible: Vec<&Job> = jobs
        .iter()
        .filter(|job| job_matches(job, &needle, query.match_filter, thresholds))
        .collect();

    match query.sort {
        SortKey::Newest => visible.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        SortKey::Oldest => visible.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
        SortKey::MatchHigh => visible.sort_by(|a, b| b.match_score.cmp(&a.match_score)),
        SortKey::MatchLow => visible.sort_by(|a, b| a.match_score.cmp(&b.match_score)),
    }

    visible
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_job;

    fn sample() -> Vec<Job> {
        vec![
            test_job(1, "Senior Data Engineer", "Acme", 90, "2024-01-03T09:00:00Z"),
            test_job(2, "Backend Developer", "Globex", 60, "2024-01-01T09:00:00Z"),
            test_job(3, "Data Analyst", "Initech", 40, "2024-01-05T09:00:00Z"),
            test_job(4, "Platform Engineer", "Acme", 80, "2024-01-02T09:00:00Z"),
        ]
    }

    fn ids(jobs: &[&Job]) -> Vec<String> {
        jobs.iter().map(|j| j.id_string()).collect()
    }

    #[test]
    fn test_empty_title_returns_everything_sorted() {
        let jobs = sample();
        let out = apply(&jobs, &JobQuery::default(), &MatchThresholds::STANDARD);
        assert_eq!(ids(&out), vec!["3", "1", "4", "2"]);
    }

    #[test]
    fn test_title_filter_is_case_insensitive() {
        let jobs = sample();
        let query = JobQuery {
            title: "DATA".to_string(),
            ..Default::default()
        };
        let out = apply(&jobs, &query, &MatchThresholds::STANDARD);
        assert_eq!(ids(&out), vec!["3", "1"]);
    }

    #[test]
    fn test_bucket_filter_uses_thresholds() {
        let jobs = sample();
        let query = JobQuery {
            match_filter: MatchFilter::High,
            sort: SortKey::MatchLow,
            ..Default::default()
        };
        let out = apply(&jobs, &query, &MatchThresholds::STANDARD);
        assert_eq!(ids(&out), vec!["4", "1"]);

        let query = JobQuery {
            match_filter: MatchFilter::Medium,
            ..Default::default()
        };
        let out = apply(&jobs, &query, &MatchThresholds::STANDARD);
        assert_eq!(ids(&out), vec!["2"]);
    }

    #[test]
    fn test_newest_reversed_equals_oldest() {
        let jobs = sample();
        let newest = JobQuery {
            sort: SortKey::Newest,
            ..Default::default()
        };
        let oldest = JobQuery {
            sort: SortKey::Oldest,
            ..Default::default()
        };
        let mut a = ids(&apply(&jobs, &newest, &MatchThresholds::STANDARD));
        a.reverse();
        let b = ids(&apply(&jobs, &oldest, &MatchThresholds::STANDARD));
        assert_eq!(a, b);
    }

    #[test]
    fn test_score_ties_keep_collection_order() {
        let jobs = vec![
            test_job(1, "a", "x", 70, "2024-01-01T00:00:00Z"),
            test_job(2, "b", "x", 70, "2024-01-02T00:00:00Z"),
            test_job(3, "c", "x", 95, "2024-01-03T00:00:00Z"),
            test_job(4, "d", "x", 70, "2024-01-04T00:00:00Z"),
        ];
        let query = JobQuery {
            sort: SortKey::MatchHigh,
            ..Default::default()
        };
        let out = apply(&jobs, &query, &MatchThresholds::STANDARD);
        assert_eq!(ids(&out), vec!["3", "1", "2", "4"]);
    }

    #[test]
    fn test_apply_is_idempotent() {
        let jobs = sample();
        let query = JobQuery {
            title: "engineer".to_string(),
            match_filter: MatchFilter::All,
            sort: SortKey::MatchHigh,
        };
        let first = ids(&apply(&jobs, &query, &MatchThresholds::LENIENT));
        let second = ids(&apply(&jobs, &query, &MatchThresholds::LENIENT));
        assert_eq!(first, second);
        assert_eq!(first, vec!["1", "4"]);
    }

    #[test]
    fn test_cycle_helpers() {
        assert_eq!(MatchFilter::Low.next(), MatchFilter::All);
        assert_eq!(SortKey::MatchLow.next(), SortKey::Newest);
        assert_eq!(MatchFilter::from(MatchBucket::Medium), MatchFilter::Medium);
    }
}

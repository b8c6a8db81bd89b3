//! Aggregations over the full (unfiltered) job collection. Every function
//! here returns a zero-state for an empty collection instead of failing.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::models::{CompanyStat, Job, JobStatus};
use crate::scoring::{MatchBucket, MatchThresholds};

pub const TOP_MATCHES_LIMIT: usize = 10;

fn percent(count: usize, total: usize) -> u32 {
    if total == 0 {
        0
    } else {
        (count as f64 / total as f64 * 100.0).round() as u32
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBuckets {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub total: usize,
    pub average_score: u8,
}

impl ScoreBuckets {
    pub fn count(&self, bucket: MatchBucket) -> usize {
        match bucket {
            MatchBucket::High => self.high,
            MatchBucket::Medium => self.medium,
            MatchBucket::Low => self.low,
        }
    }

    pub fn percent(&self, bucket: MatchBucket) -> u32 {
        percent(self.count(bucket), self.total)
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

pub fn score_buckets(jobs: &[Job], thresholds: &MatchThresholds) -> ScoreBuckets {
    let mut buckets = ScoreBuckets {
        total: jobs.len(),
        average_score: average_score(jobs),
        ..Default::default()
    };
    for job in jobs {
        match thresholds.bucket_of(job) {
            MatchBucket::High => buckets.high += 1,
            MatchBucket::Medium => buckets.medium += 1,
            MatchBucket::Low => buckets.low += 1,
        }
    }
    buckets
}

/// Rounded mean match score, 0 for no jobs.
pub fn average_score(jobs: &[Job]) -> u8 {
    if jobs.is_empty() {
        return 0;
    }
    let sum: u64 = jobs.iter().map(|j| j.match_score as u64).sum();
    (sum as f64 / jobs.len() as f64).round() as u8
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunnelStage {
    pub status: JobStatus,
    pub count: usize,
    pub percent: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Funnel {
    pub stages: Vec<FunnelStage>,
    pub total: usize,
}

impl Funnel {
    fn from_status_counts(counts: impl Fn(JobStatus) -> usize) -> Self {
        let per_status: Vec<(JobStatus, usize)> =
            JobStatus::ALL.iter().map(|s| (*s, counts(*s))).collect();
        let total = per_status.iter().map(|(_, c)| c).sum();
        let stages = per_status
            .into_iter()
            .map(|(status, count)| FunnelStage {
                status,
                count,
                percent: percent(count, total),
            })
            .collect();
        Self { stages, total }
    }

    /// Server funnel payload keyed by status name. Unknown keys are ignored.
    pub fn from_server(counts: &HashMap<String, u32>) -> Self {
        let lowered: HashMap<String, u32> = counts
            .iter()
            .map(|(k, v)| (k.to_lowercase(), *v))
            .collect();
        Self::from_status_counts(|status| lowered.get(status.as_str()).copied().unwrap_or(0) as usize)
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

pub fn funnel(jobs: &[Job]) -> Funnel {
    let mut counts: HashMap<JobStatus, usize> = HashMap::new();
    for job in jobs {
        *counts.entry(job.status).or_default() += 1;
    }
    Funnel::from_status_counts(|status| counts.get(&status).copied().unwrap_or(0))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedJob {
    pub title: String,
    pub company: String,
    pub match_score: u8,
}

/// Company ranking from the server, or the local best matches when the
/// server ranking could not be fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", content = "entries", rename_all = "snake_case")]
pub enum Ranking {
    Companies(Vec<CompanyStat>),
    TopMatches(Vec<RankedJob>),
}

impl Ranking {
    pub fn is_empty(&self) -> bool {
        match self {
            Ranking::Companies(c) => c.is_empty(),
            Ranking::TopMatches(j) => j.is_empty(),
        }
    }
}

pub fn top_companies(server: Option<Vec<CompanyStat>>, jobs: &[Job]) -> Ranking {
    match server {
        Some(companies) => Ranking::Companies(companies),
        None => Ranking::TopMatches(top_matches(jobs, TOP_MATCHES_LIMIT)),
    }
}

pub fn top_matches(jobs: &[Job], limit: usize) -> Vec<RankedJob> {
    let mut ranked: Vec<&Job> = jobs.iter().collect();
    ranked.sort_by(|a, b| b.match_score.cmp(&a.match_score));
    ranked
        .into_iter()
        .take(limit)
        .map(|job| RankedJob {
            title: job.title.clone(),
            company: job.company.clone(),
            match_score: job.match_score,
        })
        .collect()
}

/// Approximate week-of-year: `ceil((day_of_year0 + jan1_weekday + 1) / 7)`
/// with the weekday counted from Sunday = 0. Weeks are not tied to a year,
/// so week 1 of two different years falls into the same slot.
pub fn week_number(at: &DateTime<Utc>) -> u32 {
    let date = at.date_naive();
    let jan1_weekday = NaiveDate::from_ymd_opt(date.year(), 1, 1)
        .map(|d| d.weekday().num_days_from_sunday())
        .unwrap_or(0);
    (date.ordinal0() + jan1_weekday + 1).div_ceil(7)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyTrend {
    pub weeks: BTreeMap<u32, usize>,
    pub total: usize,
    pub average_per_week: usize,
    pub peak: usize,
}

impl WeeklyTrend {
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

pub fn weekly_trend(jobs: &[Job]) -> WeeklyTrend {
    let mut weeks: BTreeMap<u32, usize> = BTreeMap::new();
    for job in jobs {
        *weeks.entry(week_number(&job.created_at)).or_default() += 1;
    }
    if weeks.is_empty() {
        return WeeklyTrend::default();
    }
    let total = jobs.len();
    let average_per_week = (total as f64 / weeks.len() as f64).round() as usize;
    let peak = weeks.values().copied().max().unwrap_or(0);
    WeeklyTrend {
        weeks,
        total,
        average_per_week,
        peak,
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[default]
    Wishlist,
    Applied,
    Interview,
    Offer,
    Rejected,
}

impl JobStatus {
    /// Pipeline order, used for funnel display.
    pub const ALL: [JobStatus; 5] = [
        JobStatus::Wishlist,
        JobStatus::Applied,
        JobStatus::Interview,
        JobStatus::Offer,
        JobStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Wishlist => "wishlist",
            JobStatus::Applied => "applied",
            JobStatus::Interview => "interview",
            JobStatus::Offer => "offer",
            JobStatus::Rejected => "rejected",
        }
    }

    pub fn next(&self) -> JobStatus {
        let idx = Self::ALL.iter().position(|s| s == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        Self::ALL
            .iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Unknown status '{}'. Expected one of: wishlist, applied, interview, offer, rejected",
                    s
                )
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchLevel {
    Strong,
    Good,
    Partial,
    Missing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    #[default]
    Normal,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillMatch {
    pub skill: String,
    pub match_level: MatchLevel,
    #[serde(default, deserialize_with = "null_as_default")]
    pub importance: Importance,
    #[serde(default, deserialize_with = "null_as_default")]
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: serde_json::Value,
    pub title: String,
    pub company: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: JobStatus,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default, deserialize_with = "deserialize_score")]
    pub match_score: u8,
    #[serde(default)]
    pub skill_breakdown: Option<Vec<SkillMatch>>,
    #[serde(default)]
    pub strengths: Option<String>,
    #[serde(default)]
    pub gaps: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Job {
    /// Backend ids are integers or uuids depending on the deployment.
    pub fn id_string(&self) -> String {
        match &self.id {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Rows created outside the form can carry `null` where a value is expected.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Accepts integers, floats and null. Null means the matcher produced no
/// usable score and is treated as 0.
fn deserialize_score<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<f64> = Option::deserialize(deserializer)?;
    Ok(raw.map(|v| v.round().clamp(0.0, 100.0) as u8).unwrap_or(0))
}

/// Body of `POST /jobs`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewJobRequest {
    pub title: String,
    pub company: String,
    pub description: String,
    pub status: JobStatus,
    pub notes: Option<String>,
    pub resume_text: String,
}

#[derive(Debug, Deserialize)]
pub struct JobsResponse {
    #[serde(default)]
    pub jobs: Vec<Job>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum CreateJobResponse {
    Wrapped { job: Job },
    Bare(Job),
}

impl CreateJobResponse {
    pub fn into_job(self) -> Job {
        match self {
            CreateJobResponse::Wrapped { job, .. } => job,
            CreateJobResponse::Bare(job) => job,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyStat {
    pub company: String,
    pub application_count: u32,
    #[serde(default)]
    pub avg_match_score: f64,
}

#[derive(Debug, Deserialize)]
pub struct TopCompaniesResponse {
    #[serde(default)]
    pub top_companies: Vec<CompanyStat>,
}

#[derive(Debug, Deserialize)]
pub struct FunnelResponse {
    #[serde(default)]
    pub funnel: std::collections::HashMap<String, u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillGap {
    pub skill: String,
    pub frequency: u32,
}

#[derive(Debug, Deserialize)]
pub struct SkillsGapResponse {
    #[serde(default)]
    pub common_gaps: Vec<SkillGap>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyTrend {
    pub month: String,
    pub applications: u32,
    #[serde(default)]
    pub avg_match_score: f64,
}

#[derive(Debug, Deserialize)]
pub struct MonthlyTrendsResponse {
    #[serde(default)]
    pub monthly_trends: Vec<MonthlyTrend>,
}

#[derive(Debug, Deserialize)]
pub struct UploadResumeResponse {
    pub success: bool,
    #[serde(default)]
    pub resume_text: Option<String>,
    #[serde(default)]
    pub char_count: Option<usize>,
    #[serde(default)]
    pub detail: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default)]
    pub service: Option<String>,
}

#[cfg(test)]
pub(crate) fn test_job(id: i64, title: &str, company: &str, score: u8, created: &str) -> Job {
    Job {
        id: serde_json::json!(id),
        title: title.to_string(),
        company: company.to_string(),
        description: String::new(),
        status: JobStatus::Wishlist,
        notes: None,
        match_score: score,
        skill_breakdown: None,
        strengths: None,
        gaps: None,
        created_at: created.parse().expect("valid timestamp"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_deserializes_backend_row() {
        let raw = r#"{
            "id": 7,
            "title": "Data Engineer",
            "company": "Acme",
            "description": "Python, dbt",
            "status": "applied",
            "notes": null,
            "match_score": 72,
            "strengths": "python, sql",
            "gaps": "airflow",
            "created_at": "2024-03-01T10:15:00+00:00"
        }"#;
        let job: Job = serde_json::from_str(raw).unwrap();
        assert_eq!(job.status, JobStatus::Applied);
        assert_eq!(job.match_score, 72);
        assert_eq!(job.id_string(), "7");
        assert!(job.skill_breakdown.is_none());
    }

    #[test]
    fn test_null_and_float_scores() {
        let null_score = r#"{"id":"a","title":"t","company":"c","match_score":null,"created_at":"2024-01-01T00:00:00Z"}"#;
        let job: Job = serde_json::from_str(null_score).unwrap();
        assert_eq!(job.match_score, 0);
        assert_eq!(job.id_string(), "a");
        assert_eq!(job.status, JobStatus::Wishlist);

        let float_score = r#"{"id":1,"title":"t","company":"c","match_score":79.6,"created_at":"2024-01-01T00:00:00Z"}"#;
        let job: Job = serde_json::from_str(float_score).unwrap();
        assert_eq!(job.match_score, 80);

        let over = r#"{"id":1,"title":"t","company":"c","match_score":140,"created_at":"2024-01-01T00:00:00Z"}"#;
        let job: Job = serde_json::from_str(over).unwrap();
        assert_eq!(job.match_score, 100);
    }

    #[test]
    fn test_null_fields_do_not_reject_the_list() {
        let raw = r#"{"jobs":[
            {"id":1,"title":"Analyst","company":"Initech","description":null,"status":null,"match_score":null,"created_at":"2024-01-01T00:00:00Z"},
            {"id":2,"title":"Engineer","company":"Acme","description":"Rust","status":"offer","match_score":88,"created_at":"2024-01-02T00:00:00Z"}
        ]}"#;
        let resp: JobsResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(resp.jobs.len(), 2);
        assert_eq!(resp.jobs[0].description, "");
        assert_eq!(resp.jobs[0].status, JobStatus::Wishlist);
        assert_eq!(resp.jobs[1].status, JobStatus::Offer);

        let skill: SkillMatch =
            serde_json::from_str(r#"{"skill":"SQL","match_level":"partial","importance":null,"reason":null}"#).unwrap();
        assert_eq!(skill.importance, Importance::Normal);
        assert_eq!(skill.reason, "");
    }

    #[test]
    fn test_skill_breakdown() {
        let raw = r#"{"id":1,"title":"t","company":"c","match_score":50,
            "skill_breakdown":[{"skill":"Rust","match_level":"strong","importance":"high","reason":"5 years"},
                               {"skill":"Go","match_level":"missing"}],
            "created_at":"2024-01-01T00:00:00Z"}"#;
        let job: Job = serde_json::from_str(raw).unwrap();
        let skills = job.skill_breakdown.unwrap();
        assert_eq!(skills.len(), 2);
        assert_eq!(skills[0].importance, Importance::High);
        assert_eq!(skills[1].match_level, MatchLevel::Missing);
        assert_eq!(skills[1].importance, Importance::Normal);
    }

    #[test]
    fn test_create_response_wrapped_or_bare() {
        let wrapped = r#"{"message":"Job added successfully","job":{"id":3,"title":"t","company":"c","match_score":90,"created_at":"2024-01-01T00:00:00Z"}}"#;
        let resp: CreateJobResponse = serde_json::from_str(wrapped).unwrap();
        assert_eq!(resp.into_job().match_score, 90);

        let bare = r#"{"id":4,"title":"t","company":"c","match_score":10,"created_at":"2024-01-01T00:00:00Z"}"#;
        let resp: CreateJobResponse = serde_json::from_str(bare).unwrap();
        assert_eq!(resp.into_job().id_string(), "4");
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("Interview".parse::<JobStatus>().unwrap(), JobStatus::Interview);
        assert!("closed".parse::<JobStatus>().is_err());
        assert_eq!(JobStatus::Rejected.next(), JobStatus::Wishlist);
    }
}

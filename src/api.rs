use anyhow::{anyhow, bail, Context, Result};
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::models::{
    CompanyStat, CreateJobResponse, FunnelResponse, HealthResponse, Job, JobStatus, JobsResponse,
    MonthlyTrend, MonthlyTrendsResponse, NewJobRequest, SkillGap, SkillsGapResponse,
    TopCompaniesResponse, UploadResumeResponse,
};

const JOBS_ENDPOINT: &str = "/jobs";
const TOP_COMPANIES_ENDPOINT: &str = "/analytics/top-companies";
const FUNNEL_ENDPOINT: &str = "/analytics/application-funnel";
const SKILLS_GAP_ENDPOINT: &str = "/analytics/skills-gap-analysis";
const MONTHLY_TRENDS_ENDPOINT: &str = "/analytics/monthly-trends";
const UPLOAD_RESUME_ENDPOINT: &str = "/upload-resume";
const HEALTH_ENDPOINT: &str = "/health";

/// Server-side list filters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListParams {
    pub status: Option<JobStatus>,
    pub company: Option<String>,
}

impl ListParams {
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(status) = self.status {
            pairs.push(("status", status.as_str().to_string()));
        }
        if let Some(company) = self.company.as_deref().map(str::trim) {
            if !company.is_empty() {
                pairs.push(("company", company.to_string()));
            }
        }
        pairs
    }
}

/// The four analytics endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DashboardSlot {
    TopCompanies,
    Funnel,
    SkillsGap,
    MonthlyTrends,
}

impl DashboardSlot {
    pub const ALL: [DashboardSlot; 4] = [
        DashboardSlot::TopCompanies,
        DashboardSlot::Funnel,
        DashboardSlot::SkillsGap,
        DashboardSlot::MonthlyTrends,
    ];
}

/// One settled analytics request. Errors are kept as display strings so the
/// app state stays serializable.
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardPart {
    TopCompanies(Result<Vec<CompanyStat>, String>),
    Funnel(Result<HashMap<String, u32>, String>),
    SkillsGap(Result<Vec<SkillGap>, String>),
    MonthlyTrends(Result<Vec<MonthlyTrend>, String>),
}

impl DashboardPart {
    pub fn slot(&self) -> DashboardSlot {
        match self {
            DashboardPart::TopCompanies(_) => DashboardSlot::TopCompanies,
            DashboardPart::Funnel(_) => DashboardSlot::Funnel,
            DashboardPart::SkillsGap(_) => DashboardSlot::SkillsGap,
            DashboardPart::MonthlyTrends(_) => DashboardSlot::MonthlyTrends,
        }
    }
}

fn describe(err: anyhow::Error) -> String {
    format!("{:#}", err)
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();
        Err(anyhow!("HTTP error {}: {}", status, error_text))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&'static str, String)],
    ) -> Result<T> {
        let url = self.url(endpoint);
        debug!(%url, ?query, "GET");
        let mut request = self.client.get(&url);
        if !query.is_empty() {
            request = request.query(query);
        }
        let response = request
            .send()
            .await
            .with_context(|| format!("Request to {} failed", url))?;
        Self::check(response)
            .await?
            .json()
            .await
            .with_context(|| format!("Failed to parse response from {}", endpoint))
    }

    pub async fn list_jobs(&self, params: &ListParams) -> Result<Vec<Job>> {
        let response: JobsResponse = self.get_json(JOBS_ENDPOINT, &params.query_pairs()).await?;
        info!(count = response.jobs.len(), "jobs loaded");
        Ok(response.jobs)
    }

    pub async fn create_job(&self, request: &NewJobRequest) -> Result<Job> {
        let url = self.url(JOBS_ENDPOINT);
        info!(title = %request.title, company = %request.company, "submitting job");
        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .with_context(|| format!("Request to {} failed", url))?;
        let created: CreateJobResponse = Self::check(response)
            .await?
            .json()
            .await
            .context("Failed to parse created job")?;
        let job = created.into_job();
        info!(id = %job.id_string(), score = job.match_score, "job created");
        Ok(job)
    }

    pub async fn top_companies(&self) -> Result<Vec<CompanyStat>> {
        let response: TopCompaniesResponse = self.get_json(TOP_COMPANIES_ENDPOINT, &[]).await?;
        Ok(response.top_companies)
    }

    pub async fn application_funnel(&self) -> Result<HashMap<String, u32>> {
        let response: FunnelResponse = self.get_json(FUNNEL_ENDPOINT, &[]).await?;
        Ok(response.funnel)
    }

    pub async fn skills_gap(&self) -> Result<Vec<SkillGap>> {
        let response: SkillsGapResponse = self.get_json(SKILLS_GAP_ENDPOINT, &[]).await?;
        Ok(response.common_gaps)
    }

    pub async fn monthly_trends(&self) -> Result<Vec<MonthlyTrend>> {
        let response: MonthlyTrendsResponse = self.get_json(MONTHLY_TRENDS_ENDPOINT, &[]).await?;
        Ok(response.monthly_trends)
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        self.get_json(HEALTH_ENDPOINT, &[]).await
    }

    /// Issues the four analytics requests concurrently. Each result is sent
    /// as soon as it settles; the channel closes once all four have.
    pub fn spawn_dashboard(&self) -> mpsc::UnboundedReceiver<DashboardPart> {
        let (tx, rx) = mpsc::unbounded_channel();

        for slot in DashboardSlot::ALL {
            let client = self.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                let part = match slot {
                    DashboardSlot::TopCompanies => {
                        DashboardPart::TopCompanies(client.top_companies().await.map_err(describe))
                    }
                    DashboardSlot::Funnel => {
                        DashboardPart::Funnel(client.application_funnel().await.map_err(describe))
                    }
                    DashboardSlot::SkillsGap => {
                        DashboardPart::SkillsGap(client.skills_gap().await.map_err(describe))
                    }
                    DashboardSlot::MonthlyTrends => {
                        DashboardPart::MonthlyTrends(client.monthly_trends().await.map_err(describe))
                    }
                };
                // receiver dropped means nobody is waiting any more
                let _ = tx.send(part);
            });
        }

        rx
    }

    /// Uploads a PDF/DOCX resume and returns the extracted text.
    pub async fn upload_resume(
        &self,
        file_path: &Path,
        file_name: &str,
        content_type: &str,
    ) -> Result<String> {
        let url = self.url(UPLOAD_RESUME_ENDPOINT);
        let file_content = tokio::fs::read(file_path)
            .await
            .with_context(|| format!("Failed to read file: {}", file_path.display()))?;

        let form = Form::new().part(
            "file",
            Part::bytes(file_content)
                .file_name(file_name.to_string())
                .mime_str(content_type)
                .context("Failed to create multipart")?,
        );

        info!(%url, file_name, "uploading resume");
        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .with_context(|| format!("Request to {} failed", url))?;

        // The upload endpoint reports its own failures as `success: false`
        // with a `detail`, on error statuses as well.
        let status = response.status();
        let body = response.text().await.context("Failed to read upload response")?;
        let parsed: UploadResumeResponse = serde_json::from_str(&body)
            .with_context(|| format!("Unexpected upload response ({}): {}", status, body))?;

        if !parsed.success {
            bail!(
                "Resume upload failed: {}",
                parsed.detail.unwrap_or_else(|| status.to_string())
            );
        }
        let text = parsed
            .resume_text
            .ok_or_else(|| anyhow!("Upload succeeded but returned no resume text"))?;
        debug!(chars = parsed.char_count.unwrap_or(text.len()), "resume extracted");
        Ok(text)
    }
}

#[cfg(test)]
pub(crate) mod test_server {
    //! Local axum app answering every route through one handler, for client tests.

    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode, header},
        response::{IntoResponse, Response},
    };
    use std::sync::{Arc, Mutex};
    use tokio::net::TcpListener;

    pub type Handler = fn(&str, &str) -> (u16, String);

    /// Starts a server answering with `handler(method, path_and_query)`.
    /// Returns the base URL and the log of requested method + path lines.
    pub async fn serve(handler: Handler) -> (String, Arc<Mutex<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        let seen = log.clone();

        let app = Router::new().fallback(move |req: Request<Body>| {
            let seen = seen.clone();
            async move {
                let method = req.method().as_str().to_string();
                let path = req
                    .uri()
                    .path_and_query()
                    .map(|p| p.as_str().to_string())
                    .unwrap_or_default();
                seen.lock().unwrap().push(format!("{} {}", method, path));

                let (status, body) = handler(&method, &path);
                let status = StatusCode::from_u16(status).unwrap();
                let response: Response = (status, [(header::CONTENT_TYPE, "application/json")], body).into_response();
                response
            }
        });
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        (format!("http://{}", addr), log)
    }
}

#[cfg(test)]
mod tests {
    use super::test_server::serve;
    use super::*;

    const JOB: &str = r#"{"id":1,"title":"Data Engineer","company":"Acme","description":"d","status":"applied","match_score":82,"created_at":"2024-02-01T00:00:00Z"}"#;

    fn client(base: &str) -> ApiClient {
        ApiClient::new(base, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_query_pairs() {
        assert!(ListParams::default().query_pairs().is_empty());
        let params = ListParams {
            status: Some(JobStatus::Interview),
            company: Some("  ".to_string()),
        };
        assert_eq!(params.query_pairs(), vec![("status", "interview".to_string())]);
    }

    #[tokio::test]
    async fn test_list_jobs_sends_filters() {
        let (base, log) = serve(|_, _| (200, format!(r#"{{"jobs":[{}]}}"#, JOB))).await;
        let params = ListParams {
            status: Some(JobStatus::Applied),
            company: Some("Acme Corp".to_string()),
        };
        let jobs = client(&base).list_jobs(&params).await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].match_score, 82);
        let requests = log.lock().unwrap().clone();
        assert_eq!(requests, vec!["GET /jobs?status=applied&company=Acme+Corp"]);
    }

    #[tokio::test]
    async fn test_http_error_surfaces_status() {
        let (base, _) = serve(|_, _| (500, r#"{"detail":"db down"}"#.to_string())).await;
        let err = client(&base).list_jobs(&ListParams::default()).await.unwrap_err();
        let msg = format!("{:#}", err);
        assert!(msg.contains("500"), "{}", msg);
        assert!(msg.contains("db down"), "{}", msg);
    }

    #[tokio::test]
    async fn test_create_job_unwraps_envelope() {
        let (base, log) = serve(|method, _| {
            assert_eq!(method, "POST");
            (200, format!(r#"{{"message":"Job added successfully","job":{}}}"#, JOB))
        })
        .await;
        let request = NewJobRequest {
            title: "Data Engineer".to_string(),
            company: "Acme".to_string(),
            description: "d".to_string(),
            status: JobStatus::Applied,
            notes: None,
            resume_text: "cv".to_string(),
        };
        let job = client(&base).create_job(&request).await.unwrap();
        assert_eq!(job.company, "Acme");
        assert_eq!(log.lock().unwrap()[0], "POST /jobs");
    }

    #[tokio::test]
    async fn test_dashboard_parts_settle_independently() {
        let (base, _) = serve(|_, path| match path {
            "/analytics/top-companies" => (
                200,
                r#"{"top_companies":[{"company":"Acme","application_count":3,"avg_match_score":71.5}]}"#.to_string(),
            ),
            "/analytics/application-funnel" => (200, r#"{"funnel":{"applied":2}}"#.to_string()),
            "/analytics/skills-gap-analysis" => (500, "boom".to_string()),
            _ => (200, r#"{"monthly_trends":[]}"#.to_string()),
        })
        .await;

        let mut rx = client(&base).spawn_dashboard();
        let mut parts = Vec::new();
        while let Some(part) = rx.recv().await {
            parts.push(part);
        }
        assert_eq!(parts.len(), 4);

        let mut slots: Vec<DashboardSlot> = parts.iter().map(DashboardPart::slot).collect();
        slots.sort_by_key(|s| DashboardSlot::ALL.iter().position(|x| x == s));
        assert_eq!(slots, DashboardSlot::ALL.to_vec());

        for part in parts {
            match part {
                DashboardPart::TopCompanies(r) => assert_eq!(r.unwrap()[0].application_count, 3),
                DashboardPart::Funnel(r) => assert_eq!(r.unwrap()["applied"], 2),
                DashboardPart::SkillsGap(r) => assert!(r.unwrap_err().contains("500")),
                DashboardPart::MonthlyTrends(r) => assert!(r.unwrap().is_empty()),
            }
        }
    }

    #[tokio::test]
    async fn test_upload_resume_reports_detail() {
        let (base, _) = serve(|_, _| {
            (400, r#"{"success":false,"detail":"PDF extraction failed"}"#.to_string())
        })
        .await;
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("cv.pdf");
        std::fs::write(&file, b"%PDF-1.4").unwrap();

        let err = client(&base)
            .upload_resume(&file, "cv.pdf", crate::resume::PDF_CONTENT_TYPE)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("PDF extraction failed"));
    }

    #[tokio::test]
    async fn test_upload_resume_success() {
        let (base, log) = serve(|_, _| {
            (200, r#"{"success":true,"resume_text":"Rust engineer","char_count":13}"#.to_string())
        })
        .await;
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("cv.docx");
        std::fs::write(&file, b"PK").unwrap();

        let text = client(&base)
            .upload_resume(&file, "cv.docx", crate::resume::DOCX_CONTENT_TYPE)
            .await
            .unwrap();
        assert_eq!(text, "Rust engineer");
        assert_eq!(log.lock().unwrap()[0], "POST /upload-resume");
    }
}

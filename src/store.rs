//! Application state and the update cycle. `update` is pure: it mutates the
//! state and hands back at most one effect for the runtime (`Store`) to
//! perform, whose outcome comes back as another action.

use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::analytics::{self, Funnel};
use crate::api::{ApiClient, DashboardPart, DashboardSlot, ListParams};
use crate::filter::{self, JobQuery, MatchFilter, SortKey};
use crate::models::{CompanyStat, Job, JobStatus, MonthlyTrend, NewJobRequest, SkillGap};
use crate::scoring::MatchThresholds;
use crate::submission::JobForm;
use crate::widgets::Widget;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "level", content = "message", rename_all = "lowercase")]
pub enum Notice {
    Success(String),
    Error(String),
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DashboardState {
    pub top_companies: Option<Vec<CompanyStat>>,
    pub funnel: Option<HashMap<String, u32>>,
    pub skills_gap: Option<Vec<SkillGap>>,
    pub monthly_trends: Option<Vec<MonthlyTrend>>,
    pub pending: usize,
    pub errors: Vec<String>,
}

impl DashboardState {
    /// Clears once every analytics request has settled, success or not.
    pub fn loading(&self) -> bool {
        self.pending > 0
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AppState {
    pub jobs: Vec<Job>,
    pub list: ListParams,
    pub query: JobQuery,
    pub thresholds: MatchThresholds,
    pub loading: bool,
    /// Persistent banner for the last failed list fetch.
    pub error: Option<String>,
    /// Transient message about the last submission or upload.
    pub notice: Option<Notice>,
    pub list_generation: u64,
    pub form: JobForm,
    pub form_open: bool,
    pub submitting: bool,
    pub dashboard: DashboardState,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SetStatusFilter(Option<JobStatus>),
    /// Replaces both server-side filters with a single fetch.
    SetServerFilters(ListParams),
    SetTitleFilter(String),
    SetMatchFilter(MatchFilter),
    SetSort(SortKey),
    Reload,
    JobsLoaded {
        generation: u64,
        result: Result<Vec<Job>, String>,
    },
    OpenForm,
    EditForm(JobForm),
    SubmitForm {
        resume_text: String,
    },
    SubmitFinished(Result<Job, String>),
    LoadDashboard,
    DashboardLoaded(DashboardPart),
    DismissNotice,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    FetchJobs { generation: u64, params: ListParams },
    CreateJob(NewJobRequest),
    FetchDashboard,
}

impl AppState {
    pub fn new(thresholds: MatchThresholds) -> Self {
        Self {
            jobs: Vec::new(),
            list: ListParams::default(),
            query: JobQuery::default(),
            thresholds,
            loading: false,
            error: None,
            notice: None,
            list_generation: 0,
            form: JobForm::default(),
            form_open: false,
            submitting: false,
            dashboard: DashboardState::default(),
        }
    }

    pub fn visible_jobs(&self) -> Vec<&Job> {
        filter::apply(&self.jobs, &self.query, &self.thresholds)
    }

    fn fetch_jobs(&mut self) -> Effect {
        self.list_generation += 1;
        self.loading = true;
        self.error = None;
        Effect::FetchJobs {
            generation: self.list_generation,
            params: self.list.clone(),
        }
    }

    /// Locally derived dashboard widgets, always available.
    pub fn local_widgets(&self) -> Vec<Widget> {
        vec![
            Widget::Bucket {
                buckets: analytics::score_buckets(&self.jobs, &self.thresholds),
                thresholds: self.thresholds,
            },
            Widget::Funnel(analytics::funnel(&self.jobs)),
            Widget::Trend(analytics::weekly_trend(&self.jobs)),
        ]
    }

    /// Widget for one analytics endpoint. Falls back to local data where a
    /// local equivalent exists.
    pub fn widget_for(&self, slot: DashboardSlot) -> Widget {
        let d = &self.dashboard;
        match slot {
            DashboardSlot::TopCompanies => {
                Widget::Ranking(analytics::top_companies(d.top_companies.clone(), &self.jobs))
            }
            DashboardSlot::Funnel => Widget::Funnel(match &d.funnel {
                Some(counts) => Funnel::from_server(counts),
                None => analytics::funnel(&self.jobs),
            }),
            DashboardSlot::SkillsGap => Widget::SkillsGap(d.skills_gap.clone().unwrap_or_default()),
            DashboardSlot::MonthlyTrends => {
                Widget::MonthlyTrend(d.monthly_trends.clone().unwrap_or_default())
            }
        }
    }

    pub fn widgets(&self) -> Vec<Widget> {
        vec![
            Widget::Bucket {
                buckets: analytics::score_buckets(&self.jobs, &self.thresholds),
                thresholds: self.thresholds,
            },
            self.widget_for(DashboardSlot::Funnel),
            self.widget_for(DashboardSlot::TopCompanies),
            Widget::Trend(analytics::weekly_trend(&self.jobs)),
            self.widget_for(DashboardSlot::SkillsGap),
            self.widget_for(DashboardSlot::MonthlyTrends),
        ]
    }
}

fn record_part<T>(slot: &mut Option<T>, errors: &mut Vec<String>, name: &str, result: Result<T, String>) {
    match result {
        Ok(value) => *slot = Some(value),
        Err(e) => {
            *slot = None;
            warn!(endpoint = name, error = %e, "analytics request failed");
            errors.push(format!("{}: {}", name, e));
        }
    }
}

pub fn update(state: &mut AppState, action: Action) -> Option<Effect> {
    match action {
        Action::SetStatusFilter(status) => {
            state.list.status = status;
            Some(state.fetch_jobs())
        }
        Action::SetServerFilters(params) => {
            let company = params.company.map(|c| c.trim().to_string());
            state.list = ListParams {
                status: params.status,
                company: company.filter(|c| !c.is_empty()),
            };
            Some(state.fetch_jobs())
        }
        Action::SetTitleFilter(title) => {
            state.query.title = title;
            None
        }
        Action::SetMatchFilter(filter) => {
            state.query.match_filter = filter;
            None
        }
        Action::SetSort(sort) => {
            state.query.sort = sort;
            None
        }
        Action::Reload => Some(state.fetch_jobs()),
        Action::JobsLoaded { generation, result } => {
            if generation != state.list_generation {
                debug!(generation, latest = state.list_generation, "discarding stale job list");
                return None;
            }
            state.loading = false;
            match result {
                Ok(jobs) => {
                    state.jobs = jobs;
                    state.error = None;
                }
                Err(e) => {
                    state.error = Some(format!("Failed to load jobs: {}", e));
                }
            }
            None
        }
        Action::OpenForm => {
            state.form_open = true;
            None
        }
        Action::EditForm(form) => {
            state.form = form;
            None
        }
        Action::SubmitForm { resume_text } => {
            if state.submitting {
                return None;
            }
            match state.form.validate(&resume_text) {
                Ok(request) => {
                    if request.resume_text.trim().is_empty() {
                        warn!("submitting without resume text; the match score will be meaningless");
                    }
                    state.submitting = true;
                    state.notice = None;
                    Some(Effect::CreateJob(request))
                }
                Err(e) => {
                    state.notice = Some(Notice::Error(e.to_string()));
                    None
                }
            }
        }
        Action::SubmitFinished(result) => {
            state.submitting = false;
            match result {
                Ok(job) => {
                    state.notice = Some(Notice::Success(format!(
                        "Added '{}' at {} with {}% match",
                        job.title, job.company, job.match_score
                    )));
                    state.form = JobForm::default();
                    state.form_open = false;
                    Some(state.fetch_jobs())
                }
                Err(e) => {
                    state.notice = Some(Notice::Error(format!("Error adding job: {}", e)));
                    None
                }
            }
        }
        Action::LoadDashboard => {
            // results from a previous load must not outlive a failed reload
            state.dashboard = DashboardState {
                pending: DashboardSlot::ALL.len(),
                ..Default::default()
            };
            Some(Effect::FetchDashboard)
        }
        Action::DashboardLoaded(part) => {
            let d = &mut state.dashboard;
            d.pending = d.pending.saturating_sub(1);
            match part {
                DashboardPart::TopCompanies(r) => {
                    record_part(&mut d.top_companies, &mut d.errors, "top companies", r)
                }
                DashboardPart::Funnel(r) => record_part(&mut d.funnel, &mut d.errors, "funnel", r),
                DashboardPart::SkillsGap(r) => {
                    record_part(&mut d.skills_gap, &mut d.errors, "skills gap", r)
                }
                DashboardPart::MonthlyTrends(r) => {
                    record_part(&mut d.monthly_trends, &mut d.errors, "monthly trends", r)
                }
            }
            None
        }
        Action::DismissNotice => {
            state.notice = None;
            None
        }
    }
}

/// Runs effects against the API and feeds their outcomes back through
/// `update`.
pub struct Store {
    pub state: AppState,
    api: ApiClient,
}

impl Store {
    pub fn new(api: ApiClient, thresholds: MatchThresholds) -> Self {
        Self {
            state: AppState::new(thresholds),
            api,
        }
    }

    pub async fn dispatch(&mut self, action: Action) {
        self.dispatch_with(action, |_, _| {}).await
    }

    /// Like `dispatch`, calling `on_part` after each analytics result is
    /// applied so callers can render it right away.
    pub async fn dispatch_with(
        &mut self,
        action: Action,
        mut on_part: impl FnMut(&AppState, DashboardSlot),
    ) {
        let mut next = Some(action);
        while let Some(action) = next.take() {
            let Some(effect) = update(&mut self.state, action) else {
                break;
            };
            next = self.perform(effect, &mut on_part).await;
        }
    }

    async fn perform(
        &mut self,
        effect: Effect,
        on_part: &mut impl FnMut(&AppState, DashboardSlot),
    ) -> Option<Action> {
        match effect {
            Effect::FetchJobs { generation, params } => {
                let result = self.api.list_jobs(&params).await.map_err(|e| format!("{:#}", e));
                Some(Action::JobsLoaded { generation, result })
            }
            Effect::CreateJob(request) => {
                let result = self.api.create_job(&request).await.map_err(|e| format!("{:#}", e));
                Some(Action::SubmitFinished(result))
            }
            Effect::FetchDashboard => {
                let mut rx = self.api.spawn_dashboard();
                while let Some(part) = rx.recv().await {
                    let slot = part.slot();
                    update(&mut self.state, Action::DashboardLoaded(part));
                    on_part(&self.state, slot);
                }
                None
            }
        }
    }
}

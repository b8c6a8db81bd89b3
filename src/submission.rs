use serde::{Deserialize, Serialize};

use crate::models::{JobStatus, NewJobRequest};

/// Entered job fields, kept intact across failed submissions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobForm {
    pub title: String,
    pub company: String,
    pub description: String,
    pub status: Option<JobStatus>,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    MissingField(&'static str),
}

impl std::fmt::Display for FormError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormError::MissingField(field) => write!(f, "{} is required", field),
        }
    }
}

impl std::error::Error for FormError {}

impl JobForm {
    /// Builds the `POST /jobs` body. Fails before any request when a required
    /// field is blank.
    pub fn validate(&self, resume_text: &str) -> Result<NewJobRequest, FormError> {
        let required = [
            ("title", &self.title),
            ("company", &self.company),
            ("description", &self.description),
        ];
        if let Some((field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(FormError::MissingField(*field));
        }

        let notes = self.notes.trim();
        Ok(NewJobRequest {
            title: self.title.trim().to_string(),
            company: self.company.trim().to_string(),
            description: self.description.trim().to_string(),
            status: self.status.unwrap_or_default(),
            notes: (!notes.is_empty()).then(|| notes.to_string()),
            resume_text: resume_text.to_string(),
        })
    }
}

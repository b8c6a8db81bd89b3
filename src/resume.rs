use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use tracing::debug;

const RESUME_KEY: &str = "resume_text";

/// Durable home of the single resume text, a key/value table in the local
/// sqlite file.
pub struct ResumeStore {
    conn: Connection,
    path: PathBuf,
}

impl ResumeStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create data directory {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        let store = Self {
            conn,
            path: path.to_path_buf(),
        };
        store.init()?;
        Ok(store)
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            "#,
        )?;
        Ok(())
    }

    pub fn get(&self) -> Result<Option<String>> {
        let result = self.conn.query_row(
            "SELECT value FROM settings WHERE key = ?1",
            [RESUME_KEY],
            |row| row.get(0),
        );
        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Stored text, or empty when nothing has been saved yet.
    pub fn text(&self) -> Result<String> {
        Ok(self.get()?.unwrap_or_default())
    }

    pub fn set(&self, text: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO settings (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = datetime('now')",
                params![RESUME_KEY, text],
            )
            .context("Failed to save resume")?;
        debug!(chars = text.chars().count(), "resume saved");
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        self.conn
            .execute("DELETE FROM settings WHERE key = ?1", [RESUME_KEY])?;
        debug!("resume cleared");
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResumeFile {
    /// Sent to the upload endpoint for text extraction.
    Upload {
        path: PathBuf,
        file_name: String,
        content_type: &'static str,
    },
    /// Read locally, no request needed.
    PlainText(PathBuf),
}

pub const PDF_CONTENT_TYPE: &str = "application/pdf";
pub const DOCX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Classifies a resume file by extension. Unsupported types fail here,
/// before anything is sent.
pub fn classify(path: &Path) -> Result<ResumeFile> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    let content_type = match extension.as_str() {
        "pdf" => PDF_CONTENT_TYPE,
        "docx" => DOCX_CONTENT_TYPE,
        "txt" | "md" => return Ok(ResumeFile::PlainText(path.to_path_buf())),
        _ => bail!(
            "Unsupported file type: '{}'. Use PDF, DOCX, TXT or MD.",
            file_name
        ),
    };

    Ok(ResumeFile::Upload {
        path: path.to_path_buf(),
        file_name,
        content_type,
    })
}

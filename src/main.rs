mod analytics;
mod api;
mod config;
mod filter;
mod models;
mod resume;
mod scoring;
mod store;
mod submission;
mod tui;
mod widgets;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use api::{ApiClient, ListParams};
use config::{Config, DEFAULT_API_URL, DEFAULT_TIMEOUT_SECS};
use filter::{MatchFilter, SortKey};
use models::{Job, JobStatus};
use resume::{ResumeFile, ResumeStore};
use scoring::ThresholdPolicy;
use store::{Action, Notice, Store};
use submission::JobForm;
use widgets::truncate;

#[derive(Parser)]
#[command(name = "jobtrack")]
#[command(about = "Track job applications and their AI match scores")]
struct Cli {
    /// Base URL of the job tracker API
    #[arg(long, env = "JOBTRACK_API_URL", default_value = DEFAULT_API_URL, global = true)]
    api_url: String,

    /// Match score bucket thresholds (standard: 80/50, lenient: 75/50)
    #[arg(long, env = "JOBTRACK_THRESHOLDS", value_enum, default_value_t = ThresholdPolicy::Standard, global = true)]
    thresholds: ThresholdPolicy,

    /// Directory for local data (resume store)
    #[arg(long, env = "JOBTRACK_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// HTTP request timeout in seconds
    #[arg(long, env = "JOBTRACK_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS, global = true)]
    timeout: u64,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List jobs
    List {
        /// Filter by status on the server
        #[arg(short, long, value_enum)]
        status: Option<JobStatus>,

        /// Filter by company on the server (substring)
        #[arg(short, long)]
        company: Option<String>,

        /// Filter by title substring (case-insensitive)
        #[arg(short, long, default_value = "")]
        title: String,

        /// Filter by match bucket
        #[arg(short, long = "match", value_enum, default_value_t = MatchFilter::All)]
        match_filter: MatchFilter,

        /// Sort order
        #[arg(long, value_enum, default_value_t = SortKey::Newest)]
        sort: SortKey,
    },

    /// Show job details
    Show {
        /// Job ID
        id: String,
    },

    /// Add a job posting and score it against the stored resume
    Add {
        #[arg(long)]
        title: String,

        #[arg(long)]
        company: String,

        /// Job description text
        #[arg(long, conflicts_with = "description_file")]
        description: Option<String>,

        /// Read the job description from a file
        #[arg(long)]
        description_file: Option<PathBuf>,

        #[arg(short, long, value_enum)]
        status: Option<JobStatus>,

        #[arg(short, long)]
        notes: Option<String>,
    },

    /// Show analytics dashboards
    Stats {
        /// Only compute local aggregates, skip the analytics endpoints
        #[arg(long)]
        local_only: bool,
    },

    /// Manage the stored resume
    Resume {
        #[command(subcommand)]
        command: ResumeCommands,
    },

    /// Check that the API is reachable
    Health,

    /// Browse jobs interactively
    Browse {
        #[arg(short, long, value_enum)]
        status: Option<JobStatus>,

        #[arg(short, long)]
        company: Option<String>,
    },
}

#[derive(Subcommand)]
enum ResumeCommands {
    /// Print the stored resume
    Show,

    /// Replace the stored resume with the given text
    Set {
        text: String,
    },

    /// Import a resume file (PDF/DOCX via the API, TXT/MD locally)
    Import {
        file: PathBuf,
    },

    /// Remove the stored resume
    Clear,
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "jobtrack=warn",
        1 => "jobtrack=info",
        _ => "jobtrack=debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::new(&cli.api_url, cli.thresholds, cli.data_dir, cli.timeout)?;
    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    let api = ApiClient::new(&config.api_url, config.timeout)?;
    let mut store = Store::new(api.clone(), config.thresholds);

    match cli.command {
        Commands::List {
            status,
            company,
            title,
            match_filter,
            sort,
        } => {
            runtime.block_on(async {
                store.dispatch(Action::SetTitleFilter(title)).await;
                store.dispatch(Action::SetMatchFilter(match_filter)).await;
                store.dispatch(Action::SetSort(sort)).await;
                store.dispatch(Action::SetServerFilters(ListParams { status, company })).await;
            });
            if let Some(error) = &store.state.error {
                bail!("{}", error);
            }
            print_jobs(&store.state.visible_jobs());
        }

        Commands::Show { id } => {
            runtime.block_on(store.dispatch(Action::Reload));
            if let Some(error) = &store.state.error {
                bail!("{}", error);
            }
            match store.state.jobs.iter().find(|j| j.id_string() == id) {
                Some(job) => print_job(job),
                None => println!("Job #{} not found.", id),
            }
        }

        Commands::Add {
            title,
            company,
            description,
            description_file,
            status,
            notes,
        } => {
            let description = match (description, description_file) {
                (Some(text), _) => text,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read description file: {}", path.display()))?,
                (None, None) => String::new(),
            };
            let resume_store = ResumeStore::open(&config.database_path())?;
            let resume_text = resume_store.text()?;

            let form = JobForm {
                title,
                company,
                description,
                status,
                notes: notes.unwrap_or_default(),
            };
            println!("Analyzing job against your resume...");
            runtime.block_on(async {
                store.dispatch(Action::OpenForm).await;
                store.dispatch(Action::EditForm(form)).await;
                store.dispatch(Action::SubmitForm { resume_text }).await;
            });
            match &store.state.notice {
                Some(Notice::Success(msg)) => println!("{}", msg),
                Some(Notice::Error(msg)) => bail!("{}", msg),
                None => {}
            }
        }

        Commands::Stats { local_only } => {
            runtime.block_on(store.dispatch(Action::Reload));
            if let Some(error) = &store.state.error {
                // analytics endpoints may still answer
                eprintln!("{}", error);
            }

            if local_only {
                for widget in store.state.local_widgets() {
                    print_widget(&widget);
                }
            } else {
                print_widget(&store.state.widgets()[0]);
                print_widget(&widgets::Widget::Trend(analytics::weekly_trend(&store.state.jobs)));
                runtime.block_on(store.dispatch_with(Action::LoadDashboard, |state, slot| {
                    print_widget(&state.widget_for(slot));
                }));
                for error in &store.state.dashboard.errors {
                    eprintln!("  unavailable: {}", error);
                }
            }
        }

        Commands::Resume { command } => {
            let resume_store = ResumeStore::open(&config.database_path())?;
            match command {
                ResumeCommands::Show => match resume_store.get()? {
                    Some(text) => {
                        println!("{}", text);
                        println!("\n({} characters)", text.chars().count());
                    }
                    None => println!("No resume stored. Add one with 'jobtrack resume set' or 'jobtrack resume import'."),
                },

                ResumeCommands::Set { text } => {
                    resume_store.set(&text)?;
                    println!(
                        "Resume saved ({} characters) to {}.",
                        text.chars().count(),
                        resume_store.path().display()
                    );
                }

                ResumeCommands::Import { file } => {
                    let text = match resume::classify(&file)? {
                        ResumeFile::PlainText(path) => std::fs::read_to_string(&path)
                            .with_context(|| format!("Failed to read resume file: {}", path.display()))?,
                        ResumeFile::Upload {
                            path,
                            file_name,
                            content_type,
                        } => runtime
                            .block_on(api.upload_resume(&path, &file_name, content_type))
                            .map_err(|e| {
                                anyhow!("{:#}\nYou can still paste your resume with 'jobtrack resume set'.", e)
                            })?,
                    };
                    if text.trim().is_empty() {
                        bail!("No text could be extracted from {}", file.display());
                    }
                    resume_store.set(&text)?;
                    println!(
                        "Resume imported from {} ({} characters).",
                        file.display(),
                        text.chars().count()
                    );
                }

                ResumeCommands::Clear => {
                    resume_store.clear()?;
                    println!("Resume cleared.");
                }
            }
        }

        Commands::Health => {
            let health = runtime.block_on(api.health())?;
            println!(
                "{}: {}",
                health.service.unwrap_or_else(|| config.api_url.clone()),
                health.status
            );
        }

        Commands::Browse { status, company } => {
            tui::run_browse(&runtime, &mut store, ListParams { status, company })?;
        }
    }

    Ok(())
}

fn print_widget(widget: &widgets::Widget) {
    for line in widgets::render(widget) {
        println!("{}", line);
    }
    println!();
}

fn print_jobs(jobs: &[&Job]) {
    if jobs.is_empty() {
        println!("No jobs found.");
        return;
    }
    println!(
        "{:<8} {:<10} {:<30} {:<20} {:>6} {:<10}",
        "ID", "STATUS", "TITLE", "COMPANY", "MATCH", "ADDED"
    );
    println!("{}", "-".repeat(89));
    for job in jobs {
        println!(
            "{:<8} {:<10} {:<30} {:<20} {:>5}% {:<10}",
            truncate(&job.id_string(), 8),
            job.status.as_str(),
            truncate(&job.title, 28),
            truncate(&job.company, 18),
            job.match_score,
            job.created_at.format("%Y-%m-%d")
        );
    }
}

fn print_job(job: &Job) {
    println!("Job #{}", job.id_string());
    println!("Title: {}", job.title);
    println!("Company: {}", job.company);
    println!("Status: {}", job.status);
    println!("Match: {}%", job.match_score);
    if let Some(notes) = &job.notes {
        println!("Notes: {}", notes);
    }
    println!("Created: {}", job.created_at.format("%Y-%m-%d %H:%M:%S"));

    if let Some(skills) = &job.skill_breakdown {
        println!("\n--- Skills ---");
        for skill in skills {
            println!(
                "  {:<20} {:<8} {:<6} {}",
                truncate(&skill.skill, 20),
                format!("{:?}", skill.match_level).to_lowercase(),
                format!("{:?}", skill.importance).to_lowercase(),
                skill.reason
            );
        }
    }
    if let Some(strengths) = &job.strengths {
        println!("\n--- Strengths ---\n{}", textwrap::fill(strengths, 78));
    }
    if let Some(gaps) = &job.gaps {
        println!("\n--- Gaps ---\n{}", textwrap::fill(gaps, 78));
    }
    if !job.description.is_empty() {
        println!("\n--- Description ---\n{}", job.description);
    }
}

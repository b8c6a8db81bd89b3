use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use std::io::stdout;
use tokio::runtime::Runtime;

use crate::api::ListParams;
use crate::models::{Job, JobStatus, MatchLevel};
use crate::scoring::{MatchBucket, MatchThresholds};
use crate::store::{Action, AppState, Notice, Store};
use crate::widgets;

#[derive(Default)]
struct View {
    selected: usize,
    scroll_offset: u16,
    show_dashboard: bool,
    dashboard_loaded: bool,
    /// Title search being typed, when in search mode.
    search: Option<String>,
}

impl View {
    fn next(&mut self, len: usize) {
        if len > 0 && self.selected < len - 1 {
            self.selected += 1;
            self.scroll_offset = 0;
        }
    }

    fn prev(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
            self.scroll_offset = 0;
        }
    }

    fn scroll_down(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_add(3);
    }

    fn scroll_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(3);
    }

    fn clamp(&mut self, len: usize) {
        if self.selected >= len {
            self.selected = len.saturating_sub(1);
        }
    }
}

/// All -> wishlist -> ... -> rejected -> All
fn next_status_filter(current: Option<JobStatus>) -> Option<JobStatus> {
    match current {
        None => Some(JobStatus::Wishlist),
        Some(JobStatus::Rejected) => None,
        Some(status) => Some(status.next()),
    }
}

pub fn run_browse(rt: &Runtime, store: &mut Store, filters: ListParams) -> Result<()> {
    rt.block_on(store.dispatch(Action::SetServerFilters(filters)));

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_loop(&mut terminal, rt, store);

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    rt: &Runtime,
    store: &mut Store,
) -> Result<()> {
    let mut view = View::default();
    let mut list_state = ListState::default();

    loop {
        let len = store.state.visible_jobs().len();
        view.clamp(len);
        list_state.select((len > 0).then_some(view.selected));
        terminal.draw(|frame| draw(frame, &store.state, &view, &mut list_state))?;

        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        if let Some(search) = view.search.as_mut() {
            match key.code {
                KeyCode::Enter | KeyCode::Esc => view.search = None,
                KeyCode::Backspace => {
                    search.pop();
                    let title = search.clone();
                    rt.block_on(store.dispatch(Action::SetTitleFilter(title)));
                }
                KeyCode::Char(c) => {
                    search.push(c);
                    let title = search.clone();
                    rt.block_on(store.dispatch(Action::SetTitleFilter(title)));
                }
                _ => {}
            }
            continue;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => break,
            KeyCode::Down | KeyCode::Char('j') => view.next(len),
            KeyCode::Up | KeyCode::Char('k') => view.prev(),
            KeyCode::Char('J') | KeyCode::PageDown => view.scroll_down(),
            KeyCode::Char('K') | KeyCode::PageUp => view.scroll_up(),
            KeyCode::Char('/') => view.search = Some(store.state.query.title.clone()),
            KeyCode::Char('m') => {
                let next = store.state.query.match_filter.next();
                rt.block_on(store.dispatch(Action::SetMatchFilter(next)));
            }
            KeyCode::Char('s') => {
                let next = store.state.query.sort.next();
                rt.block_on(store.dispatch(Action::SetSort(next)));
            }
            KeyCode::Char('t') => {
                let next = next_status_filter(store.state.list.status);
                rt.block_on(store.dispatch(Action::SetStatusFilter(next)));
            }
            KeyCode::Char('r') => {
                rt.block_on(store.dispatch(Action::Reload));
                if view.show_dashboard {
                    rt.block_on(store.dispatch(Action::LoadDashboard));
                }
            }
            KeyCode::Char('d') => {
                view.show_dashboard = !view.show_dashboard;
                view.scroll_offset = 0;
                if view.show_dashboard && !view.dashboard_loaded {
                    rt.block_on(store.dispatch(Action::LoadDashboard));
                    view.dashboard_loaded = true;
                }
            }
            KeyCode::Char('x') => rt.block_on(store.dispatch(Action::DismissNotice)),
            _ => {}
        }
    }
    Ok(())
}

fn bucket_color(thresholds: &MatchThresholds, score: u8) -> Color {
    match thresholds.bucket(score) {
        MatchBucket::High => Color::Green,
        MatchBucket::Medium => Color::Yellow,
        MatchBucket::Low => Color::Red,
    }
}

fn draw(frame: &mut Frame, state: &AppState, view: &View, list_state: &mut ListState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(frame.area());

    frame.render_widget(status_line(state, view), rows[0]);

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(rows[1]);

    // Left panel: job list
    let visible = state.visible_jobs();
    let items: Vec<ListItem> = visible
        .iter()
        .map(|job| {
            let score = Span::styled(
                format!("{:>3}% ", job.match_score),
                Style::default().fg(bucket_color(&state.thresholds, job.match_score)),
            );
            let text = format!(
                "{:<9} {} | {}",
                job.status.as_str(),
                widgets::truncate(&job.title, 30),
                widgets::truncate(&job.company, 18)
            );
            ListItem::new(Line::from(vec![score, Span::raw(text)]))
        })
        .collect();

    let title = if state.loading {
        " Jobs (loading...) ".to_string()
    } else {
        format!(" Jobs ({}/{}) ", visible.len(), state.jobs.len())
    };
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, chunks[0], list_state);

    // Right panel: job detail or dashboard
    let (panel_title, text) = if view.show_dashboard {
        (" Dashboard ", build_dashboard(state))
    } else {
        (" Detail ", build_detail(visible.get(view.selected).copied(), &state.thresholds))
    };
    let panel = Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL).title(panel_title))
        .wrap(Wrap { trim: false })
        .scroll((view.scroll_offset, 0));
    frame.render_widget(panel, chunks[1]);

    // Footer help
    let help = if view.search.is_some() {
        " type to filter titles  Enter/Esc:done"
    } else {
        " j/k:navigate  J/K:scroll  /:title  m:match  s:sort  t:status  d:dashboard  r:reload  x:dismiss  q:quit"
    };
    frame.render_widget(
        Paragraph::new(help).style(Style::default().fg(Color::DarkGray)),
        rows[2],
    );
}

fn status_line<'a>(state: &'a AppState, view: &'a View) -> Paragraph<'a> {
    if let Some(error) = &state.error {
        return Paragraph::new(format!(" {}", error)).style(Style::default().fg(Color::White).bg(Color::Red));
    }
    if let Some(notice) = &state.notice {
        let (msg, color) = match notice {
            Notice::Success(m) => (m, Color::Green),
            Notice::Error(m) => (m, Color::Red),
        };
        return Paragraph::new(format!(" {}", msg)).style(Style::default().fg(color));
    }
    let title = view.search.as_deref().unwrap_or(&state.query.title);
    Paragraph::new(format!(
        " status: {}  company: {}  title: \"{}\"  match: {:?}  sort: {}",
        state.list.status.map(|s| s.as_str()).unwrap_or("all"),
        state.list.company.as_deref().unwrap_or("any"),
        title,
        state.query.match_filter,
        state.query.sort.label()
    ))
    .style(Style::default().fg(Color::Cyan))
}

fn build_dashboard(state: &AppState) -> Text<'static> {
    let mut lines: Vec<Line> = Vec::new();
    if state.dashboard.loading() {
        lines.push(Line::from(Span::styled(
            "Loading analytics...",
            Style::default().fg(Color::DarkGray),
        )));
    }
    for widget in state.widgets() {
        let mut rendered = widgets::render(&widget).into_iter();
        if let Some(title) = rendered.next() {
            lines.push(Line::from(Span::styled(
                title,
                Style::default().add_modifier(Modifier::BOLD),
            )));
        }
        lines.extend(rendered.map(Line::from));
        lines.push(Line::from(""));
    }
    for error in &state.dashboard.errors {
        lines.push(Line::from(Span::styled(
            error.clone(),
            Style::default().fg(Color::Red),
        )));
    }
    Text::from(lines)
}

fn build_detail<'a>(job: Option<&'a Job>, thresholds: &MatchThresholds) -> Text<'a> {
    let Some(job) = job else {
        return Text::raw("No job selected");
    };

    let mut lines: Vec<Line> = Vec::new();

    // Header
    lines.push(Line::from(Span::styled(
        job.title.as_str(),
        Style::default().add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(format!("at {}", job.company)));
    lines.push(Line::from(format!("Status: {}", job.status)));
    lines.push(Line::from(Span::styled(
        format!("Match: {}% ({})", job.match_score, thresholds.bucket(job.match_score)),
        Style::default().fg(bucket_color(thresholds, job.match_score)),
    )));
    lines.push(Line::from(format!(
        "Added: {}",
        job.created_at.format("%Y-%m-%d %H:%M")
    )));
    if let Some(notes) = &job.notes {
        lines.push(Line::from(format!("Notes: {}", notes)));
    }
    lines.push(Line::from(""));

    if let Some(skills) = &job.skill_breakdown {
        lines.push(Line::from(Span::styled(
            "SKILLS",
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for skill in skills {
            let (marker, color) = match skill.match_level {
                MatchLevel::Strong => ("++", Color::Green),
                MatchLevel::Good => ("+ ", Color::Cyan),
                MatchLevel::Partial => ("~ ", Color::Yellow),
                MatchLevel::Missing => ("- ", Color::Red),
            };
            let importance = match skill.importance {
                crate::models::Importance::High => " !",
                crate::models::Importance::Normal => "",
            };
            lines.push(Line::from(vec![
                Span::styled(format!("  {} ", marker), Style::default().fg(color)),
                Span::raw(format!("{}{}", skill.skill, importance)),
            ]));
            if !skill.reason.is_empty() {
                for line in textwrap::fill(&skill.reason, 66).lines() {
                    lines.push(Line::from(Span::styled(
                        format!("      {}", line),
                        Style::default().fg(Color::DarkGray),
                    )));
                }
            }
        }
        lines.push(Line::from(""));
    }

    for (label, body) in [("STRENGTHS", &job.strengths), ("GAPS", &job.gaps)] {
        if let Some(body) = body {
            lines.push(Line::from(Span::styled(
                label,
                Style::default().add_modifier(Modifier::BOLD),
            )));
            for line in textwrap::fill(body, 70).lines() {
                lines.push(Line::from(format!("  {}", line)));
            }
            lines.push(Line::from(""));
        }
    }

    if !job.description.is_empty() {
        lines.push(Line::from(Span::styled(
            "Description",
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for line in job.description.lines() {
            lines.push(Line::from(line.to_string()));
        }
    }

    Text::from(lines)
}

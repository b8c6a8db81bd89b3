use serde::{Deserialize, Serialize};

use crate::analytics::{Funnel, Ranking, ScoreBuckets, WeeklyTrend};
use crate::models::{MonthlyTrend, SkillGap};
use crate::scoring::{MatchBucket, MatchThresholds};

const BAR_WIDTH: usize = 30;

/// One dashboard panel. Serialized as `{"kind": ..., "data": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Widget {
    Bucket {
        buckets: ScoreBuckets,
        thresholds: MatchThresholds,
    },
    Funnel(Funnel),
    Ranking(Ranking),
    Trend(WeeklyTrend),
    SkillsGap(Vec<SkillGap>),
    MonthlyTrend(Vec<MonthlyTrend>),
}

impl Widget {
    pub fn title(&self) -> &'static str {
        match self {
            Widget::Bucket { .. } => "Match Distribution",
            Widget::Funnel(_) => "Application Funnel",
            Widget::Ranking(Ranking::Companies(_)) => "Top Companies",
            Widget::Ranking(Ranking::TopMatches(_)) => "Top Matches",
            Widget::Trend(_) => "Weekly Activity",
            Widget::SkillsGap(_) => "Skills Gap",
            Widget::MonthlyTrend(_) => "Monthly Trends",
        }
    }
}

fn bar(count: usize, max: usize) -> String {
    if max == 0 {
        return String::new();
    }
    let filled = (count * BAR_WIDTH).div_ceil(max).min(BAR_WIDTH);
    "#".repeat(filled)
}

fn no_data() -> Vec<String> {
    vec!["  (no data yet)".to_string()]
}

/// Renders any widget as plain text lines, title first.
pub fn render(widget: &Widget) -> Vec<String> {
    let mut lines = vec![widget.title().to_string()];
    let body = match widget {
        Widget::Bucket { buckets, thresholds } => render_buckets(buckets, thresholds),
        Widget::Funnel(funnel) => render_funnel(funnel),
        Widget::Ranking(ranking) => render_ranking(ranking),
        Widget::Trend(trend) => render_trend(trend),
        Widget::SkillsGap(gaps) => render_skills_gap(gaps),
        Widget::MonthlyTrend(months) => render_monthly(months),
    };
    lines.extend(body);
    lines
}

fn render_buckets(buckets: &ScoreBuckets, thresholds: &MatchThresholds) -> Vec<String> {
    if buckets.is_empty() {
        return no_data();
    }
    let ranges = [
        (MatchBucket::High, format!(">= {}", thresholds.high_floor)),
        (
            MatchBucket::Medium,
            format!("{}-{}", thresholds.medium_floor, thresholds.high_floor.saturating_sub(1)),
        ),
        (MatchBucket::Low, format!("< {}", thresholds.medium_floor)),
    ];
    let mut lines: Vec<String> = ranges
        .iter()
        .map(|(bucket, range)| {
            format!(
                "  {:<7} {:<7} {:>4} {:>4}% {}",
                bucket.to_string(),
                range,
                buckets.count(*bucket),
                buckets.percent(*bucket),
                bar(buckets.count(*bucket), buckets.total)
            )
        })
        .collect();
    lines.push(format!(
        "  total {}  average match {}%",
        buckets.total, buckets.average_score
    ));
    lines
}

fn render_funnel(funnel: &Funnel) -> Vec<String> {
    if funnel.is_empty() {
        return no_data();
    }
    let max = funnel.stages.iter().map(|s| s.count).max().unwrap_or(0);
    funnel
        .stages
        .iter()
        .map(|stage| {
            format!(
                "  {:<10} {:>4} {:>4}% {}",
                stage.status.as_str(),
                stage.count,
                stage.percent,
                bar(stage.count, max)
            )
        })
        .collect()
}

fn render_ranking(ranking: &Ranking) -> Vec<String> {
    if ranking.is_empty() {
        return no_data();
    }
    match ranking {
        Ranking::Companies(companies) => companies
            .iter()
            .enumerate()
            .map(|(i, c)| {
                format!(
                    "  {:>2}. {:<24} {:>3} apps  avg {:.0}%",
                    i + 1,
                    truncate(&c.company, 24),
                    c.application_count,
                    c.avg_match_score
                )
            })
            .collect(),
        Ranking::TopMatches(jobs) => jobs
            .iter()
            .enumerate()
            .map(|(i, j)| {
                format!(
                    "  {:>2}. {:<28} {:<18} {:>3}%",
                    i + 1,
                    truncate(&j.title, 28),
                    truncate(&j.company, 18),
                    j.match_score
                )
            })
            .collect(),
    }
}

fn render_trend(trend: &WeeklyTrend) -> Vec<String> {
    if trend.is_empty() {
        return no_data();
    }
    let mut lines: Vec<String> = trend
        .weeks
        .iter()
        .map(|(week, count)| format!("  week {:>2} {:>4} {}", week, count, bar(*count, trend.peak)))
        .collect();
    lines.push(format!(
        "  avg/week {}  peak {}",
        trend.average_per_week, trend.peak
    ));
    lines
}

fn render_skills_gap(gaps: &[SkillGap]) -> Vec<String> {
    if gaps.is_empty() {
        return no_data();
    }
    let max = gaps.iter().map(|g| g.frequency as usize).max().unwrap_or(0);
    gaps.iter()
        .map(|g| {
            format!(
                "  {:<20} {:>4} {}",
                truncate(&g.skill, 20),
                g.frequency,
                bar(g.frequency as usize, max)
            )
        })
        .collect()
}

fn render_monthly(months: &[MonthlyTrend]) -> Vec<String> {
    if months.is_empty() {
        return no_data();
    }
    let max = months.iter().map(|m| m.applications as usize).max().unwrap_or(0);
    months
        .iter()
        .map(|m| {
            format!(
                "  {:<8} {:>4} avg {:>3.0}% {}",
                m.month,
                m.applications,
                m.avg_match_score,
                bar(m.applications as usize, max)
            )
        })
        .collect()
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::{funnel, score_buckets, weekly_trend};
    use crate::models::test_job;

    #[test]
    fn test_widget_tagging() {
        let widget = Widget::SkillsGap(vec![SkillGap {
            skill: "Airflow".to_string(),
            frequency: 4,
        }]);
        let value = serde_json::to_value(&widget).unwrap();
        assert_eq!(value["kind"], "skills_gap");
        assert_eq!(value["data"][0]["skill"], "Airflow");

        let back: Widget = serde_json::from_value(value).unwrap();
        assert_eq!(back, widget);
    }

    #[test]
    fn test_empty_widgets_render_no_data() {
        let widgets = vec![
            Widget::Bucket {
                buckets: score_buckets(&[], &MatchThresholds::STANDARD),
                thresholds: MatchThresholds::STANDARD,
            },
            Widget::Funnel(funnel(&[])),
            Widget::Ranking(Ranking::TopMatches(Vec::new())),
            Widget::Trend(weekly_trend(&[])),
            Widget::SkillsGap(Vec::new()),
            Widget::MonthlyTrend(Vec::new()),
        ];
        for widget in &widgets {
            let lines = render(widget);
            assert_eq!(lines.len(), 2, "{}", widget.title());
            assert!(lines[1].contains("no data"));
        }
    }

    #[test]
    fn test_bucket_widget_shows_threshold_ranges() {
        let jobs = vec![
            test_job(1, "a", "x", 90, "2024-01-01T00:00:00Z"),
            test_job(2, "b", "x", 60, "2024-01-01T00:00:00Z"),
        ];
        let widget = Widget::Bucket {
            buckets: score_buckets(&jobs, &MatchThresholds::LENIENT),
            thresholds: MatchThresholds::LENIENT,
        };
        let text = render(&widget).join("\n");
        assert!(text.contains(">= 75"));
        assert!(text.contains("50-74"));
        assert!(text.contains("average match 75%"));
    }

    #[test]
    fn test_bar_scaling() {
        assert_eq!(bar(0, 0), "");
        assert_eq!(bar(5, 5).len(), BAR_WIDTH);
        assert_eq!(bar(1, 30).len(), 1);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a very long company name", 10), "a very ...");
    }
}

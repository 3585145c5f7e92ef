//! Team leaderboard and poor-quality alerts derived from scored jobs.
//!
//! Every report reads one window of jobs through [`JobStore::list_created_since`]. The
//! window reaches twice the requested period back so the older half can serve as the
//! comparison baseline for trends.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::application::repos::{JobStore, RepoError};
use crate::domain::entities::JobRecord;
use crate::domain::types::{JobStatus, SpecFormat};

pub const DEFAULT_POOR_QUALITY_THRESHOLD: u8 = 60;
/// Average movement in points that marks a team as improving or declining.
const TEAM_TREND_POINTS: f64 = 5.0;
const OVERALL_TREND_POINTS: f64 = 2.0;
const MAX_ALERT_ISSUES: usize = 3;
/// High-severity alerts above this count suggest a training programme.
const TRAINING_ALERT_COUNT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimePeriod {
    Week,
    #[default]
    Month,
    Quarter,
}

impl TimePeriod {
    pub fn days(self) -> u32 {
        match self {
            TimePeriod::Week => 7,
            TimePeriod::Month => 30,
            TimePeriod::Quarter => 90,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Improving,
    Declining,
    Stable,
    InsufficientData,
}

impl Trend {
    fn between(current: f64, previous: f64, points: f64) -> Self {
        if current - previous > points {
            Trend::Improving
        } else if previous - current > points {
            Trend::Declining
        } else {
            Trend::Stable
        }
    }
}

/// Alert grades, most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Critical,
    High,
    Medium,
    Low,
}

impl AlertSeverity {
    pub const ALL: [AlertSeverity; 4] = [
        AlertSeverity::Critical,
        AlertSeverity::High,
        AlertSeverity::Medium,
        AlertSeverity::Low,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AlertSeverity::Critical => "critical",
            AlertSeverity::High => "high",
            AlertSeverity::Medium => "medium",
            AlertSeverity::Low => "low",
        }
    }

    /// Scores strictly below the threshold raise an alert of this grade.
    pub fn threshold(self) -> u8 {
        match self {
            AlertSeverity::Critical => 30,
            AlertSeverity::High => 45,
            AlertSeverity::Medium => 60,
            AlertSeverity::Low => 75,
        }
    }

    pub fn for_score(score: u8) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|severity| score < severity.threshold())
    }

    fn recommended_actions(self) -> &'static [&'static str] {
        match self {
            AlertSeverity::Critical => &[
                "Immediate documentation review required",
                "Assign a dedicated technical writer",
                "Schedule a documentation sprint",
            ],
            AlertSeverity::High => &[
                "Schedule documentation improvements within a week",
                "Review and update the API specification",
                "Add comprehensive code examples",
            ],
            AlertSeverity::Medium => &[
                "Plan documentation improvements for the next sprint",
                "Expand the existing documentation sections",
            ],
            AlertSeverity::Low => &[
                "Consider documentation enhancements",
                "Review compliance with documentation standards",
            ],
        }
    }
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardFilters {
    pub time_period: TimePeriod,
    pub team_id: Option<String>,
    pub spec_format: Option<SpecFormat>,
    pub poor_quality_threshold: u8,
}

impl Default for LeaderboardFilters {
    fn default() -> Self {
        Self {
            time_period: TimePeriod::default(),
            team_id: None,
            spec_format: None,
            poor_quality_threshold: DEFAULT_POOR_QUALITY_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamRanking {
    pub rank: u32,
    pub team_id: String,
    pub team_name: String,
    pub average_score: f64,
    pub total_docs: u64,
    pub trend: Trend,
    #[serde(with = "time::serde::rfc3339")]
    pub last_updated: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoorQualityService {
    pub team_id: String,
    pub service_name: String,
    pub score: u8,
    #[serde(with = "time::serde::rfc3339")]
    pub last_updated: OffsetDateTime,
    pub improvement_needed: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Leaderboard {
    pub rankings: Vec<TeamRanking>,
    pub poor_quality_services: Vec<PoorQualityService>,
    pub filters_applied: LeaderboardFilters,
    #[serde(with = "time::serde::rfc3339")]
    pub generated_at: OffsetDateTime,
}

/// One team's place on the full leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamStanding {
    pub team_id: String,
    pub team_name: String,
    pub time_period: TimePeriod,
    pub ranking: TeamRanking,
    pub teams_ranked: usize,
    pub poor_quality_services: Vec<PoorQualityService>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityAlert {
    pub alert_id: String,
    pub team_id: String,
    pub service_name: String,
    pub current_score: u8,
    pub previous_score: Option<u8>,
    pub severity: AlertSeverity,
    pub issues_identified: Vec<String>,
    pub recommended_actions: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub scored_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitoringReport {
    pub period_days: u32,
    pub services_monitored: usize,
    pub poor_quality_count: usize,
    pub overall_trend: Trend,
    pub alerts: Vec<QualityAlert>,
    pub recommendations: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub generated_at: OffsetDateTime,
}

pub struct QualityReporter {
    store: Arc<dyn JobStore>,
}

impl QualityReporter {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self { store }
    }

    pub async fn leaderboard(&self, filters: LeaderboardFilters) -> Result<Leaderboard, RepoError> {
        let now = OffsetDateTime::now_utc();
        let period = days(filters.time_period.days());
        let jobs = self
            .load(filters.team_id.as_deref(), period, now)
            .await?;
        Ok(build_leaderboard(&jobs, filters, now))
    }

    /// `None` when the team has no scored documentation in the period.
    pub async fn team_standing(
        &self,
        team_id: &str,
        time_period: TimePeriod,
    ) -> Result<Option<TeamStanding>, RepoError> {
        let now = OffsetDateTime::now_utc();
        let jobs = self.load(None, days(time_period.days()), now).await?;
        let board = build_leaderboard(
            &jobs,
            LeaderboardFilters {
                time_period,
                ..LeaderboardFilters::default()
            },
            now,
        );
        Ok(standing(board, team_id))
    }

    pub async fn alerts(
        &self,
        period_days: u32,
        team_id: Option<&str>,
        severity: Option<AlertSeverity>,
    ) -> Result<Vec<QualityAlert>, RepoError> {
        let now = OffsetDateTime::now_utc();
        let jobs = self.load(team_id, days(period_days), now).await?;
        let mut alerts = build_alerts(&jobs, now - days(period_days));
        if let Some(severity) = severity {
            alerts.retain(|alert| alert.severity == severity);
        }
        Ok(alerts)
    }

    pub async fn monitoring(&self, period_days: u32) -> Result<MonitoringReport, RepoError> {
        let now = OffsetDateTime::now_utc();
        let jobs = self.load(None, days(period_days), now).await?;
        Ok(build_monitoring(&jobs, period_days, now))
    }

    async fn load(
        &self,
        team_id: Option<&str>,
        period: Duration,
        now: OffsetDateTime,
    ) -> Result<Vec<JobRecord>, RepoError> {
        self.store
            .list_created_since(team_id, now - period * 2)
            .await
    }
}

fn days(count: u32) -> Duration {
    Duration::days(i64::from(count.max(1)))
}

/// Overall score of one completed job.
struct Scored<'a> {
    team_id: &'a str,
    service_name: &'a str,
    score: u8,
    created_at: OffsetDateTime,
    scored_at: OffsetDateTime,
}

fn scored(jobs: &[JobRecord], spec_format: Option<SpecFormat>) -> Vec<Scored<'_>> {
    jobs.iter()
        .filter(|job| job.status == JobStatus::Completed)
        .filter(|job| spec_format.is_none_or(|format| job.spec_format == format))
        .filter_map(|job| {
            let quality = job.quality.as_ref()?;
            Some(Scored {
                team_id: &job.team_id,
                service_name: &job.service_name,
                score: quality.overall_score,
                created_at: job.created_at,
                scored_at: job.completed_at.unwrap_or(job.updated_at),
            })
        })
        .collect()
}

struct Tally {
    total: u64,
    count: u64,
    last: OffsetDateTime,
}

impl Tally {
    fn average(&self) -> f64 {
        self.total as f64 / self.count as f64
    }
}

fn tally_by_team<'a, 'b>(docs: impl Iterator<Item = &'b Scored<'a>>) -> BTreeMap<&'a str, Tally>
where
    'a: 'b,
{
    let mut teams: BTreeMap<&str, Tally> = BTreeMap::new();
    for doc in docs {
        let tally = teams.entry(doc.team_id).or_insert(Tally {
            total: 0,
            count: 0,
            last: doc.scored_at,
        });
        tally.total += u64::from(doc.score);
        tally.count += 1;
        tally.last = tally.last.max(doc.scored_at);
    }
    teams
}

fn mean_score<'a, 'b>(docs: impl Iterator<Item = &'b Scored<'a>>) -> Option<f64>
where
    'a: 'b,
{
    let (total, count) = docs.fold((0u64, 0u64), |(total, count), doc| {
        (total + u64::from(doc.score), count + 1)
    });
    (count > 0).then(|| total as f64 / count as f64)
}

/// Latest score of a service inside the period, plus the score before it.
struct ServiceScore<'a> {
    team_id: &'a str,
    service_name: &'a str,
    latest: u8,
    previous: Option<u8>,
    scored_at: OffsetDateTime,
}

fn latest_per_service<'a>(docs: &[Scored<'a>], cutoff: OffsetDateTime) -> Vec<ServiceScore<'a>> {
    let mut services: BTreeMap<(&str, &str), Vec<&Scored<'a>>> = BTreeMap::new();
    for doc in docs {
        services
            .entry((doc.team_id, doc.service_name))
            .or_default()
            .push(doc);
    }

    services
        .into_values()
        .filter_map(|mut history| {
            history.sort_by(|a, b| b.scored_at.cmp(&a.scored_at));
            let latest = history.first()?;
            if latest.created_at < cutoff {
                return None;
            }
            Some(ServiceScore {
                team_id: latest.team_id,
                service_name: latest.service_name,
                latest: latest.score,
                previous: history.get(1).map(|doc| doc.score),
                scored_at: latest.scored_at,
            })
        })
        .collect()
}

fn build_leaderboard(
    jobs: &[JobRecord],
    filters: LeaderboardFilters,
    now: OffsetDateTime,
) -> Leaderboard {
    let cutoff = now - days(filters.time_period.days());
    let docs: Vec<Scored<'_>> = scored(jobs, filters.spec_format)
        .into_iter()
        .filter(|doc| {
            filters
                .team_id
                .as_deref()
                .is_none_or(|team| doc.team_id == team)
        })
        .collect();

    let current = tally_by_team(docs.iter().filter(|doc| doc.created_at >= cutoff));
    let previous = tally_by_team(docs.iter().filter(|doc| doc.created_at < cutoff));

    let mut rankings: Vec<TeamRanking> = current
        .iter()
        .map(|(team_id, tally)| TeamRanking {
            rank: 0,
            team_id: team_id.to_string(),
            team_name: team_name(team_id),
            average_score: round1(tally.average()),
            total_docs: tally.count,
            trend: previous.get(team_id).map_or(Trend::Stable, |before| {
                Trend::between(tally.average(), before.average(), TEAM_TREND_POINTS)
            }),
            last_updated: tally.last,
        })
        .collect();
    rankings.sort_by(|a, b| {
        b.average_score
            .total_cmp(&a.average_score)
            .then_with(|| a.team_id.cmp(&b.team_id))
    });
    for (index, ranking) in rankings.iter_mut().enumerate() {
        ranking.rank = index as u32 + 1;
    }

    let mut poor_quality_services: Vec<PoorQualityService> = latest_per_service(&docs, cutoff)
        .into_iter()
        .filter(|service| service.latest < filters.poor_quality_threshold)
        .map(|service| PoorQualityService {
            team_id: service.team_id.to_string(),
            service_name: service.service_name.to_string(),
            score: service.latest,
            last_updated: service.scored_at,
            improvement_needed: improvement_suggestions(service.latest),
        })
        .collect();
    poor_quality_services.sort_by_key(|service| service.score);

    Leaderboard {
        rankings,
        poor_quality_services,
        filters_applied: filters,
        generated_at: now,
    }
}

fn standing(board: Leaderboard, team_id: &str) -> Option<TeamStanding> {
    let teams_ranked = board.rankings.len();
    let ranking = board
        .rankings
        .into_iter()
        .find(|ranking| ranking.team_id == team_id)?;
    Some(TeamStanding {
        team_id: ranking.team_id.clone(),
        team_name: ranking.team_name.clone(),
        time_period: board.filters_applied.time_period,
        ranking,
        teams_ranked,
        poor_quality_services: board
            .poor_quality_services
            .into_iter()
            .filter(|service| service.team_id == team_id)
            .collect(),
    })
}

fn build_alerts(jobs: &[JobRecord], cutoff: OffsetDateTime) -> Vec<QualityAlert> {
    let docs = scored(jobs, None);
    let mut alerts: Vec<QualityAlert> = latest_per_service(&docs, cutoff)
        .into_iter()
        .filter_map(|service| {
            let severity = AlertSeverity::for_score(service.latest)?;
            Some(QualityAlert {
                alert_id: format!(
                    "{}-{}-{}",
                    service.team_id, service.service_name, severity
                ),
                team_id: service.team_id.to_string(),
                service_name: service.service_name.to_string(),
                current_score: service.latest,
                previous_score: service.previous,
                severity,
                issues_identified: alert_issues(service.latest, service.previous),
                recommended_actions: severity
                    .recommended_actions()
                    .iter()
                    .map(|action| action.to_string())
                    .collect(),
                scored_at: service.scored_at,
            })
        })
        .collect();
    alerts.sort_by(|a, b| {
        a.severity
            .cmp(&b.severity)
            .then(a.current_score.cmp(&b.current_score))
            .then_with(|| a.alert_id.cmp(&b.alert_id))
    });
    alerts
}

fn build_monitoring(jobs: &[JobRecord], period_days: u32, now: OffsetDateTime) -> MonitoringReport {
    let cutoff = now - days(period_days);
    let docs = scored(jobs, None);
    let alerts = build_alerts(jobs, cutoff);

    let current = mean_score(docs.iter().filter(|doc| doc.created_at >= cutoff));
    let previous = mean_score(docs.iter().filter(|doc| doc.created_at < cutoff));
    let overall_trend = match (current, previous) {
        (Some(current), Some(previous)) => {
            Trend::between(current, previous, OVERALL_TREND_POINTS)
        }
        _ => Trend::InsufficientData,
    };

    MonitoringReport {
        period_days: period_days.max(1),
        services_monitored: latest_per_service(&docs, cutoff).len(),
        poor_quality_count: alerts
            .iter()
            .filter(|alert| alert.severity <= AlertSeverity::High)
            .count(),
        overall_trend,
        recommendations: recommendations(&alerts, overall_trend),
        alerts,
        generated_at: now,
    }
}

fn recommendations(alerts: &[QualityAlert], trend: Trend) -> Vec<String> {
    let count = |severity| alerts.iter().filter(|alert| alert.severity == severity).count();
    let critical = count(AlertSeverity::Critical);
    let high = count(AlertSeverity::High);

    let mut advice = Vec::new();
    if critical > 0 {
        advice.push(format!(
            "Immediate action required: {critical} services have critical quality issues"
        ));
    }
    if high > TRAINING_ALERT_COUNT {
        advice.push("Consider a documentation quality training programme".to_string());
    }
    match trend {
        Trend::Declining => advice.push(
            "Quality is declining across teams; review documentation processes".to_string(),
        ),
        Trend::Improving => {
            advice.push("Quality is improving; keep the current practices".to_string());
        }
        Trend::Stable | Trend::InsufficientData => {}
    }
    advice
}

fn improvement_suggestions(score: u8) -> Vec<String> {
    let suggestions: &[&str] = match score {
        0..30 => &[
            "Add comprehensive endpoint descriptions",
            "Document every parameter in detail",
            "Provide response schema examples",
            "Document error handling",
        ],
        30..50 => &[
            "Improve the code examples",
            "Add more detailed parameter descriptions",
            "Document authentication",
        ],
        50..70 => &[
            "Add code examples in more languages",
            "Improve error response documentation",
        ],
        _ => &[],
    };
    suggestions.iter().map(|s| s.to_string()).collect()
}

fn alert_issues(score: u8, previous: Option<u8>) -> Vec<String> {
    let by_score: &[&str] = match score {
        0..30 => &[
            "Critical documentation gaps",
            "Essential API information is missing",
            "Poor structure and organisation",
        ],
        30..50 => &[
            "Incomplete endpoint documentation",
            "Missing or weak code examples",
            "Unclear parameter descriptions",
        ],
        50..70 => &[
            "Limited code example coverage",
            "Inconsistent documentation style",
        ],
        _ => &[],
    };
    let mut issues: Vec<String> = by_score
        .iter()
        .take(MAX_ALERT_ISSUES)
        .map(|issue| issue.to_string())
        .collect();

    if let Some(previous) = previous {
        let change = i16::from(score) - i16::from(previous);
        if change < -15 {
            issues.push("Significant quality decline".to_string());
        } else if change < -5 {
            issues.push("Quality regression since the previous run".to_string());
        }
    }
    issues
}

/// `payments-core` reads as `Payments Core Team`.
fn team_name(team_id: &str) -> String {
    let words: Vec<String> = team_id
        .split(['-', '_', ' '])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect();
    format!("{} Team", words.join(" "))
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{JobProgress, QualityMetrics};
    use crate::domain::types::OutputFormat;
    use crate::infra::memory::MemoryJobStore;

    fn scored_job(team: &str, service: &str, score: u8, age: Duration) -> JobRecord {
        let created_at = OffsetDateTime::now_utc() - age;
        let completed_at = created_at + Duration::minutes(2);
        JobRecord {
            id: uuid::Uuid::new_v4(),
            team_id: team.into(),
            service_name: service.into(),
            spec_format: SpecFormat::OpenApi,
            specification: serde_json::json!({}),
            specification_hash: String::new(),
            source_url: None,
            output_formats: vec![OutputFormat::Markdown],
            status: JobStatus::Completed,
            progress: JobProgress::queued(created_at),
            cancel_requested: false,
            results: BTreeMap::new(),
            quality: Some(QualityMetrics::new(score, score, score, Vec::new())),
            failure: None,
            created_at,
            started_at: Some(created_at),
            completed_at: Some(completed_at),
            updated_at: completed_at,
        }
    }

    #[test]
    fn teams_are_ranked_by_average_score() {
        let now = OffsetDateTime::now_utc();
        let jobs = vec![
            scored_job("payments-core", "ledger", 90, Duration::days(1)),
            scored_job("payments-core", "billing", 70, Duration::days(2)),
            scored_job("identity", "login", 95, Duration::days(3)),
            scored_job("search", "index", 40, Duration::days(4)),
        ];

        let board = build_leaderboard(&jobs, LeaderboardFilters::default(), now);
        let order: Vec<(&str, u32, f64)> = board
            .rankings
            .iter()
            .map(|r| (r.team_id.as_str(), r.rank, r.average_score))
            .collect();
        assert_eq!(
            order,
            vec![("identity", 1, 95.0), ("payments-core", 2, 80.0), ("search", 3, 40.0)]
        );
        assert_eq!(board.rankings[1].team_name, "Payments Core Team");
        assert_eq!(board.rankings[1].total_docs, 2);

        assert_eq!(board.poor_quality_services.len(), 1);
        let poor = &board.poor_quality_services[0];
        assert_eq!((poor.team_id.as_str(), poor.score), ("search", 40));
        assert_eq!(poor.improvement_needed.len(), 3);
    }

    #[test]
    fn unscored_and_unfinished_jobs_do_not_count() {
        let now = OffsetDateTime::now_utc();
        let mut failed = scored_job("search", "index", 10, Duration::days(1));
        failed.status = JobStatus::Failed;
        let mut unscored = scored_job("search", "query", 10, Duration::days(1));
        unscored.quality = None;

        let board = build_leaderboard(&[failed, unscored], LeaderboardFilters::default(), now);
        assert!(board.rankings.is_empty());
        assert!(board.poor_quality_services.is_empty());
    }

    #[test]
    fn trend_compares_with_the_preceding_period() {
        let now = OffsetDateTime::now_utc();
        let jobs = vec![
            scored_job("identity", "login", 90, Duration::days(2)),
            scored_job("identity", "login", 70, Duration::days(10)),
            scored_job("search", "index", 50, Duration::days(2)),
            scored_job("search", "index", 80, Duration::days(9)),
            scored_job("docs", "site", 60, Duration::days(1)),
        ];
        let filters = LeaderboardFilters {
            time_period: TimePeriod::Week,
            ..LeaderboardFilters::default()
        };

        let board = build_leaderboard(&jobs, filters, now);
        let trend = |team: &str| {
            board
                .rankings
                .iter()
                .find(|r| r.team_id == team)
                .map(|r| r.trend)
        };
        assert_eq!(trend("identity"), Some(Trend::Improving));
        assert_eq!(trend("search"), Some(Trend::Declining));
        assert_eq!(trend("docs"), Some(Trend::Stable));
        // Older runs only feed the trend.
        assert_eq!(board.rankings.iter().map(|r| r.total_docs).sum::<u64>(), 3);
    }

    #[test]
    fn spec_format_filter_narrows_the_board() {
        let now = OffsetDateTime::now_utc();
        let mut graph = scored_job("identity", "graph", 50, Duration::days(1));
        graph.spec_format = SpecFormat::Graphql;
        let jobs = vec![graph, scored_job("search", "index", 80, Duration::days(1))];

        let board = build_leaderboard(
            &jobs,
            LeaderboardFilters {
                spec_format: Some(SpecFormat::Graphql),
                ..LeaderboardFilters::default()
            },
            now,
        );
        assert_eq!(board.rankings.len(), 1);
        assert_eq!(board.rankings[0].team_id, "identity");
    }

    #[test]
    fn alerts_take_the_worst_matching_severity_once_per_service() {
        let now = OffsetDateTime::now_utc();
        let jobs = vec![
            scored_job("search", "index", 25, Duration::hours(2)),
            scored_job("search", "index", 62, Duration::days(3)),
            scored_job("identity", "login", 50, Duration::hours(5)),
            scored_job("docs", "site", 88, Duration::hours(1)),
        ];

        let alerts = build_alerts(&jobs, now - Duration::days(7));
        let summary: Vec<(&str, AlertSeverity)> = alerts
            .iter()
            .map(|a| (a.service_name.as_str(), a.severity))
            .collect();
        assert_eq!(
            summary,
            vec![("index", AlertSeverity::Critical), ("login", AlertSeverity::Medium)]
        );

        let index = &alerts[0];
        assert_eq!(index.alert_id, "search-index-critical");
        assert_eq!(index.previous_score, Some(62));
        assert!(
            index
                .issues_identified
                .iter()
                .any(|issue| issue == "Significant quality decline")
        );
        assert_eq!(index.recommended_actions.len(), 3);
    }

    #[test]
    fn services_last_scored_before_the_period_raise_no_alert() {
        let now = OffsetDateTime::now_utc();
        let jobs = vec![scored_job("search", "index", 20, Duration::days(3))];
        assert!(build_alerts(&jobs, now - Duration::days(1)).is_empty());
    }

    #[test]
    fn severity_grades_follow_thresholds() {
        assert_eq!(AlertSeverity::for_score(29), Some(AlertSeverity::Critical));
        assert_eq!(AlertSeverity::for_score(30), Some(AlertSeverity::High));
        assert_eq!(AlertSeverity::for_score(59), Some(AlertSeverity::Medium));
        assert_eq!(AlertSeverity::for_score(74), Some(AlertSeverity::Low));
        assert_eq!(AlertSeverity::for_score(75), None);
    }

    #[test]
    fn monitoring_reports_trend_and_advice() {
        let now = OffsetDateTime::now_utc();
        let jobs = vec![
            scored_job("search", "index", 20, Duration::hours(3)),
            scored_job("identity", "login", 40, Duration::hours(6)),
            scored_job("identity", "login", 90, Duration::days(1) + Duration::hours(6)),
        ];

        let report = build_monitoring(&jobs, 1, now);
        assert_eq!(report.services_monitored, 2);
        assert_eq!(report.poor_quality_count, 2);
        assert_eq!(report.overall_trend, Trend::Declining);
        assert!(report.recommendations[0].starts_with("Immediate action required: 1"));

        let quiet = build_monitoring(&[], 1, now);
        assert_eq!(quiet.overall_trend, Trend::InsufficientData);
        assert!(quiet.recommendations.is_empty());
    }

    #[tokio::test]
    async fn team_standing_keeps_the_global_rank() {
        let store = Arc::new(MemoryJobStore::new());
        for job in [
            scored_job("identity", "login", 95, Duration::days(1)),
            scored_job("search", "index", 40, Duration::days(1)),
        ] {
            store.insert_job(&job).await.expect("insert");
        }
        let reporter = QualityReporter::new(store);

        let standing = reporter
            .team_standing("search", TimePeriod::Month)
            .await
            .expect("standing")
            .expect("ranked team");
        assert_eq!(standing.ranking.rank, 2);
        assert_eq!(standing.teams_ranked, 2);
        assert_eq!(standing.poor_quality_services.len(), 1);

        assert!(
            reporter
                .team_standing("unknown", TimePeriod::Month)
                .await
                .expect("standing")
                .is_none()
        );
    }
}

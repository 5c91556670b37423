use crate::models::{Game, ScheduledGame, Sport, TeamRecord};
use crate::utils::teams::normalize_team_name;
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

pub const ESPN_API_BASE_URL: &str = "https://site.api.espn.com/apis";

#[derive(Debug, Deserialize)]
struct ScoreboardResponse {
    #[serde(default)]
    events: Vec<EspnEvent>,
}

#[derive(Debug, Deserialize)]
struct EspnEvent {
    id: String,
    date: String,
    #[serde(default)]
    competitions: Vec<EspnCompetition>,
}

#[derive(Debug, Deserialize)]
struct EspnCompetition {
    #[serde(default)]
    competitors: Vec<EspnCompetitor>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EspnCompetitor {
    home_away: String,
    team: EspnTeam,
    #[serde(default)]
    records: Vec<EspnRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EspnTeam {
    display_name: String,
}

#[derive(Debug, Deserialize)]
struct EspnRecord {
    #[serde(rename = "type", default)]
    record_type: Option<String>,
    summary: String,
}

/// Standings are nested in conference/division groups of arbitrary depth
#[derive(Debug, Deserialize)]
struct StandingsGroup {
    #[serde(default)]
    children: Vec<StandingsGroup>,
    #[serde(default)]
    standings: Option<StandingsTable>,
}

#[derive(Debug, Deserialize)]
struct StandingsTable {
    #[serde(default)]
    entries: Vec<StandingsEntry>,
}

#[derive(Debug, Deserialize)]
struct StandingsEntry {
    team: EspnTeam,
    #[serde(default)]
    stats: Vec<StandingsStat>,
}

#[derive(Debug, Deserialize)]
struct StandingsStat {
    name: String,
    #[serde(default)]
    value: Option<f64>,
}

pub struct EspnClient {
    base_url: String,
    client: reqwest::Client,
}

impl EspnClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        Self::with_base_url(ESPN_API_BASE_URL.to_string(), timeout)
    }

    pub fn with_base_url(base_url: String, timeout: Duration) -> Result<Self> {
        Ok(Self {
            base_url,
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .context("Failed to build HTTP client")?,
        })
    }

    /// Upcoming games with the W-L records ESPN shows on the scoreboard
    pub async fn fetch_scoreboard(&self, sport: Sport) -> Result<Vec<ScheduledGame>> {
        let url = format!("{}/site/v2/sports/{}/scoreboard", self.base_url, sport.espn_path());

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to fetch ESPN scoreboard")?;

        if !response.status().is_success() {
            anyhow::bail!("ESPN scoreboard returned error: {}", response.status());
        }

        let scoreboard: ScoreboardResponse = response
            .json()
            .await
            .context("Failed to parse ESPN scoreboard")?;

        Ok(convert_scoreboard(scoreboard, sport))
    }

    /// Season records with points for/against, keyed by normalized team name
    pub async fn fetch_standings(&self, sport: Sport) -> Result<HashMap<String, TeamRecord>> {
        let url = format!("{}/v2/sports/{}/standings", self.base_url, sport.espn_path());

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to fetch ESPN standings")?;

        if !response.status().is_success() {
            anyhow::bail!("ESPN standings returned error: {}", response.status());
        }

        let standings: StandingsGroup = response
            .json()
            .await
            .context("Failed to parse ESPN standings")?;

        Ok(convert_standings(&standings))
    }

    /// Scoreboard joined with standings. Standings are optional: if they fail
    /// the scoreboard's W-L summaries are used alone.
    pub async fn fetch_schedule(&self, sport: Sport) -> Result<Vec<ScheduledGame>> {
        let mut schedule = self.fetch_scoreboard(sport).await?;

        match self.fetch_standings(sport).await {
            Ok(standings) => merge_standings(&mut schedule, &standings),
            Err(e) => tracing::warn!("Using scoreboard records only for {}: {:#}", sport, e),
        }

        tracing::info!("Fetched {} scheduled {} games from ESPN", schedule.len(), sport);
        Ok(schedule)
    }
}

/// ESPN dates sometimes omit seconds ("2026-10-25T17:00Z")
fn parse_espn_date(date: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(date)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(date, "%Y-%m-%dT%H:%MZ")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

/// Parse "W-L" or "W-L-T"
fn parse_record_summary(team: &str, summary: &str) -> Option<TeamRecord> {
    let parts: Vec<u32> = summary
        .split('-')
        .map(|p| p.trim().parse().ok())
        .collect::<Option<Vec<_>>>()?;

    let (wins, losses, ties) = match parts.as_slice() {
        [w, l] => (*w, *l, 0),
        [w, l, t] => (*w, *l, *t),
        _ => return None,
    };

    Some(TeamRecord {
        team: team.to_string(),
        wins,
        losses,
        ties,
        ..Default::default()
    })
}

fn competitor_record(competitor: &EspnCompetitor) -> Option<TeamRecord> {
    // Prefer the overall record when several are listed
    let record = competitor
        .records
        .iter()
        .find(|r| r.record_type.as_deref() == Some("total"))
        .or_else(|| competitor.records.first())?;
    parse_record_summary(&competitor.team.display_name, &record.summary)
}

fn convert_scoreboard(scoreboard: ScoreboardResponse, sport: Sport) -> Vec<ScheduledGame> {
    scoreboard
        .events
        .into_iter()
        .filter_map(|event| {
            let Some(commence_time) = parse_espn_date(&event.date) else {
                tracing::debug!("Skipping ESPN event {} with date {}", event.id, event.date);
                return None;
            };
            let competition = event.competitions.first()?;
            let home = competition.competitors.iter().find(|c| c.home_away == "home")?;
            let away = competition.competitors.iter().find(|c| c.home_away == "away")?;

            Some(ScheduledGame {
                game: Game {
                    id: event.id.clone(),
                    home_team: home.team.display_name.clone(),
                    away_team: away.team.display_name.clone(),
                    commence_time,
                    sport_title: sport.to_string(),
                },
                home_record: competitor_record(home),
                away_record: competitor_record(away),
            })
        })
        .collect()
}

fn collect_entries<'a>(group: &'a StandingsGroup, entries: &mut Vec<&'a StandingsEntry>) {
    if let Some(table) = &group.standings {
        entries.extend(table.entries.iter());
    }
    for child in &group.children {
        collect_entries(child, entries);
    }
}

fn convert_standings(standings: &StandingsGroup) -> HashMap<String, TeamRecord> {
    let mut entries = Vec::new();
    collect_entries(standings, &mut entries);

    entries
        .into_iter()
        .map(|entry| {
            let stat = |name: &str| {
                entry
                    .stats
                    .iter()
                    .find(|s| s.name == name)
                    .and_then(|s| s.value)
                    .unwrap_or(0.0)
            };

            let record = TeamRecord {
                team: entry.team.display_name.clone(),
                wins: stat("wins") as u32,
                losses: stat("losses") as u32,
                ties: stat("ties") as u32,
                points_for: stat("pointsFor"),
                points_against: stat("pointsAgainst"),
            };
            (normalize_team_name(&record.team), record)
        })
        .collect()
}

fn merge_standings(schedule: &mut [ScheduledGame], standings: &HashMap<String, TeamRecord>) {
    for scheduled in schedule.iter_mut() {
        if let Some(record) = standings.get(&normalize_team_name(&scheduled.game.home_team)) {
            scheduled.home_record = Some(record.clone());
        }
        if let Some(record) = standings.get(&normalize_team_name(&scheduled.game.away_team)) {
            scheduled.away_record = Some(record.clone());
        }
    }
}

use super::{ApiError, AppState, SessionId};
use crate::models::{Bet, BetResult, Sport};
use crate::utils::bet_tracker::{BetSummary, NewBet};
use crate::utils::features::predict_home_win_probability;
use crate::utils::value_bets::ValueBet;
use crate::DataSource;
use askama::Template;
use axum::{
    extract::{Form, Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

// Custom filters for formatting
mod filters {
    use chrono::{DateTime, Utc};

    pub fn format_odds(odds: &i32) -> ::askama::Result<String> {
        Ok(format!("{:+}", odds))
    }

    pub fn format_percent(value: &f64) -> ::askama::Result<String> {
        Ok(format!("{:.1}%", value * 100.0))
    }

    pub fn format_signed_percent(value: &f64) -> ::askama::Result<String> {
        Ok(format!("{:+.1}%", value * 100.0))
    }

    pub fn format_spread(value: &f64) -> ::askama::Result<String> {
        Ok(format!("{:+.1}", value))
    }

    pub fn format_money(value: &f64) -> ::askama::Result<String> {
        Ok(format!("{:.2}", value))
    }

    pub fn kickoff(time: &DateTime<Utc>) -> ::askama::Result<String> {
        Ok(time.format("%a %b %-d, %H:%M UTC").to_string())
    }
}

/// Sport switcher entry
pub struct SportTab {
    pub key: &'static str,
    pub label: String,
    pub active: bool,
}

fn sport_tabs(current: Option<Sport>) -> Vec<SportTab> {
    Sport::ALL
        .iter()
        .map(|sport| SportTab {
            key: sport.as_str(),
            label: sport.to_string(),
            active: Some(*sport) == current,
        })
        .collect()
}

fn source_label(source: DataSource) -> &'static str {
    match source {
        DataSource::Live => "live data",
        DataSource::Cache => "cached data",
        DataSource::Sample => "sample data",
    }
}

/// Model view of one scheduled game
pub struct PredictionRow {
    pub home_team: String,
    pub away_team: String,
    pub commence_time: DateTime<Utc>,
    pub home_win_pct: f64,
    pub away_win_pct: f64,
    pub rating_delta: f64,
    pub home_win_prob: f64,
}

/// Tracked bet with display-ready fields
pub struct BetRow {
    pub id: String,
    pub sport: String,
    pub matchup: String,
    pub pick: String,
    pub odds: i32,
    pub stake: f64,
    pub result: String,
    pub profit: String,
    pub pending: bool,
}

impl From<&Bet> for BetRow {
    fn from(bet: &Bet) -> Self {
        Self {
            id: bet.id.to_string(),
            sport: bet.sport.to_string(),
            matchup: format!("{} @ {}", bet.away_team, bet.home_team),
            pick: bet.pick.clone(),
            odds: bet.odds,
            stake: bet.stake,
            result: bet.result.to_string(),
            profit: bet
                .profit
                .map(|p| format!("{:+.2}", p))
                .unwrap_or_else(|| "-".to_string()),
            pending: bet.result == BetResult::Pending,
        }
    }
}

#[derive(Template)]
#[template(path = "hub.html")]
struct HubTemplate {
    active_page: String,
    sport_label: String,
    source: String,
    value_bet_count: usize,
    show_top_bets: bool,
    top_bets: Vec<ValueBet>,
    tracked_bets: usize,
    pending_bets: usize,
    assistants_online: bool,
    webhooks_enabled: bool,
}

#[derive(Template)]
#[template(path = "betting.html")]
struct BettingTemplate {
    active_page: String,
    sport_label: String,
    tabs: Vec<SportTab>,
    source: String,
    is_sample: bool,
    fetched_at: DateTime<Utc>,
    game_count: usize,
    value_bets: Vec<ValueBet>,
    predictions: Vec<PredictionRow>,
}

#[derive(Template)]
#[template(path = "tracker.html")]
struct TrackerTemplate {
    active_page: String,
    error: String,
    sports: Vec<SportTab>,
    bets: Vec<BetRow>,
    summary: BetSummary,
}

struct HtmlTemplate<T>(T);

impl<T> IntoResponse for HtmlTemplate<T>
where
    T: Template,
{
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(html) => Html(html).into_response(),
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to render template: {}", err),
            )
                .into_response(),
        }
    }
}

pub async fn hub(State(state): State<AppState>, session: SessionId) -> Result<Response, ApiError> {
    let sport = state.config.default_sport;
    let data = state.dashboard(sport).await?;
    let (tracked_bets, pending_bets) = state
        .sessions
        .with_session(session.id, |s| {
            let summary = s.tracker.summary();
            (summary.total_bets, summary.pending)
        })
        .await;

    // Top 3 by edge
    let top_bets: Vec<_> = data.value_bets.iter().take(3).cloned().collect();
    let show_top_bets = !top_bets.is_empty();

    let template = HubTemplate {
        active_page: "home".to_string(),
        sport_label: sport.to_string(),
        source: source_label(data.source).to_string(),
        value_bet_count: data.value_bets.len(),
        show_top_bets,
        top_bets,
        tracked_bets,
        pending_bets,
        assistants_online: state.llm.is_some(),
        webhooks_enabled: state.config.webhook_secret.is_some(),
    };

    Ok(session.respond(HtmlTemplate(template)))
}

#[derive(Debug, Deserialize)]
pub struct BettingQuery {
    pub sport: Option<String>,
}

pub async fn betting(
    State(state): State<AppState>,
    Query(query): Query<BettingQuery>,
) -> Result<Response, ApiError> {
    let sport = state.sport_or_default(query.sport.as_deref())?;
    let data = state.dashboard(sport).await?;

    let predictions = data
        .feature_rows
        .iter()
        .map(|row| PredictionRow {
            home_team: row.home_team.clone(),
            away_team: row.away_team.clone(),
            commence_time: row.commence_time,
            home_win_pct: row.home_win_pct,
            away_win_pct: row.away_win_pct,
            rating_delta: row.rating_delta,
            home_win_prob: predict_home_win_probability(row),
        })
        .collect();

    let template = BettingTemplate {
        active_page: "betting".to_string(),
        sport_label: sport.to_string(),
        tabs: sport_tabs(Some(sport)),
        source: source_label(data.source).to_string(),
        is_sample: data.source == DataSource::Sample,
        fetched_at: data.fetched_at,
        game_count: data.games_with_odds.len(),
        value_bets: data.value_bets,
        predictions,
    };

    Ok(HtmlTemplate(template).into_response())
}

async fn render_tracker(state: &AppState, session: SessionId, error: Option<String>) -> Response {
    let (bets, summary) = state
        .sessions
        .with_session(session.id, |s| {
            // Newest first
            let bets: Vec<BetRow> = s.tracker.bets().iter().rev().map(BetRow::from).collect();
            (bets, s.tracker.summary())
        })
        .await;

    let status = if error.is_some() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::OK
    };

    let template = TrackerTemplate {
        active_page: "tracker".to_string(),
        error: error.unwrap_or_default(),
        sports: sport_tabs(Some(state.config.default_sport)),
        bets,
        summary,
    };

    session.respond((status, HtmlTemplate(template)))
}

pub async fn tracker(State(state): State<AppState>, session: SessionId) -> Response {
    render_tracker(&state, session, None).await
}

pub async fn add_bet(
    State(state): State<AppState>,
    session: SessionId,
    Form(new_bet): Form<NewBet>,
) -> Response {
    let added = state
        .sessions
        .with_session(session.id, |s| s.tracker.add_bet(new_bet))
        .await;

    match added {
        Ok(_) => session.respond(Redirect::to("/tracker")),
        Err(e) => render_tracker(&state, session, Some(e.to_string())).await,
    }
}

#[derive(Debug, Deserialize)]
pub struct SettleForm {
    pub result: BetResult,
}

pub async fn settle_bet(
    State(state): State<AppState>,
    session: SessionId,
    Path(id): Path<Uuid>,
    Form(form): Form<SettleForm>,
) -> Response {
    let settled = state
        .sessions
        .with_session(session.id, |s| s.tracker.settle(id, form.result))
        .await;

    match settled {
        Ok(_) => session.respond(Redirect::to("/tracker")),
        Err(e) => render_tracker(&state, session, Some(e.to_string())).await,
    }
}

pub async fn delete_bet(
    State(state): State<AppState>,
    session: SessionId,
    Path(id): Path<Uuid>,
) -> Response {
    let deleted = state
        .sessions
        .with_session(session.id, |s| s.tracker.delete(id))
        .await;

    match deleted {
        Ok(_) => session.respond(Redirect::to("/tracker")),
        Err(e) => render_tracker(&state, session, Some(e.to_string())).await,
    }
}

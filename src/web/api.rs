use super::{ApiError, AppState, SessionId};
use crate::api::llm_api::ChatMessage;
use crate::assistants::classifier::{classify as classify_image, Classification};
use crate::assistants::summarizer::{
    fetch_article_text, summarize as summarize_text, Summary, DEFAULT_SUMMARY_SENTENCES,
};
use crate::assistants::{AssistantReply, Persona};
use crate::models::{Bet, BetResult, Sport, Subscription};
use crate::subscriptions::webhook::{DEFAULT_TOLERANCE_SECS, SIGNATURE_HEADER};
use crate::subscriptions::{verify_signature, WebhookError, WebhookEvent};
use crate::utils::bet_tracker::{BetSummary, NewBet};
use crate::utils::data::write_bets_csv;
use crate::utils::odds::{
    american_odds_to_probability, american_to_decimal, calculate_expected_value, edge,
    is_valid_american_odds, is_value_bet, kelly_fraction, probability_to_american_odds,
};
use crate::utils::parlay::{price_parlay, ParlayLeg, ParlayQuote};
use crate::utils::sentiment::SentimentScore;
use crate::utils::value_bets::ValueBet;
use crate::DataSource;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::Response,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Longest summary we will produce
const MAX_SUMMARY_SENTENCES: usize = 10;

#[derive(Debug, Deserialize)]
pub struct OddsQuery {
    pub odds: i32,
    pub model_prob: Option<f64>,
    pub margin: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct OddsReport {
    pub odds: i32,
    pub implied_prob: f64,
    pub decimal_odds: f64,
    pub model_prob: Option<f64>,
    /// Fair American price for the model probability
    pub fair_odds: Option<i32>,
    pub edge: Option<f64>,
    pub expected_value: Option<f64>,
    pub is_value_bet: Option<bool>,
    pub kelly_fraction: Option<f64>,
}

fn check_probability(prob: f64) -> Result<f64, ApiError> {
    if prob.is_finite() && (0.0..=1.0).contains(&prob) {
        Ok(prob)
    } else {
        Err(ApiError::BadRequest(format!(
            "Probability must be between 0 and 1, got {}",
            prob
        )))
    }
}

fn check_odds(odds: i32) -> Result<i32, ApiError> {
    if is_valid_american_odds(odds) {
        return Ok(odds);
    }
    Err(ApiError::BadRequest(format!(
        "American odds must be between 100 and 100000 in magnitude, got {}",
        odds
    )))
}

pub async fn odds(
    State(state): State<AppState>,
    Query(query): Query<OddsQuery>,
) -> Result<Json<OddsReport>, ApiError> {
    check_odds(query.odds)?;
    let model_prob = query.model_prob.map(check_probability).transpose()?;
    let margin = query.margin.unwrap_or(state.config.value_margin);
    let decimal_odds = american_to_decimal(query.odds);

    Ok(Json(OddsReport {
        odds: query.odds,
        implied_prob: american_odds_to_probability(query.odds),
        decimal_odds,
        model_prob,
        fair_odds: model_prob
            .filter(|p| *p > 0.0 && *p < 1.0)
            .map(probability_to_american_odds),
        edge: model_prob.map(|p| edge(p, query.odds)),
        expected_value: model_prob.map(|p| calculate_expected_value(p, query.odds)),
        is_value_bet: model_prob.map(|p| is_value_bet(p, query.odds, margin)),
        kelly_fraction: model_prob.map(|p| kelly_fraction(p, decimal_odds)),
    }))
}

#[derive(Debug, Deserialize)]
pub struct KellyRequest {
    pub probability: f64,
    /// American odds; ignored when `decimal_odds` is given
    pub odds: Option<i32>,
    pub decimal_odds: Option<f64>,
    pub bankroll: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct KellyReport {
    pub probability: f64,
    pub decimal_odds: f64,
    pub fraction: f64,
    pub stake: Option<f64>,
}

pub async fn kelly(Json(request): Json<KellyRequest>) -> Result<Json<KellyReport>, ApiError> {
    let decimal_odds = match (request.decimal_odds, request.odds) {
        (Some(decimal), _) => decimal,
        (None, Some(odds)) => {
            check_odds(odds)?;
            american_to_decimal(odds)
        }
        (None, None) => {
            return Err(ApiError::BadRequest(
                "Provide decimal_odds or American odds".to_string(),
            ))
        }
    };
    let fraction = kelly_fraction(request.probability, decimal_odds);

    Ok(Json(KellyReport {
        probability: request.probability,
        decimal_odds,
        fraction,
        stake: request
            .bankroll
            .filter(|b| b.is_finite() && *b > 0.0)
            .map(|b| b * fraction),
    }))
}

#[derive(Debug, Deserialize)]
pub struct SentimentRequest {
    pub text: String,
}

pub async fn sentiment(
    State(state): State<AppState>,
    Json(request): Json<SentimentRequest>,
) -> Result<Json<SentimentScore>, ApiError> {
    Ok(Json(state.sentiment.analyze(&request.text)?))
}

#[derive(Debug, Deserialize)]
pub struct SportQuery {
    pub sport: Option<String>,
    pub top: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ValueBetsResponse {
    pub sport: Sport,
    pub source: DataSource,
    pub fetched_at: DateTime<Utc>,
    pub value_bets: Vec<ValueBet>,
}

pub async fn value_bets(
    State(state): State<AppState>,
    Query(query): Query<SportQuery>,
) -> Result<Json<ValueBetsResponse>, ApiError> {
    let sport = state.sport_or_default(query.sport.as_deref())?;
    let data = state.dashboard(sport).await?;

    let mut value_bets = data.value_bets;
    if let Some(top) = query.top {
        value_bets.truncate(top);
    }

    Ok(Json(ValueBetsResponse {
        sport,
        source: data.source,
        fetched_at: data.fetched_at,
        value_bets,
    }))
}

pub async fn refresh(
    State(state): State<AppState>,
    Query(query): Query<SportQuery>,
) -> Result<Json<ValueBetsResponse>, ApiError> {
    let sport = state.sport_or_default(query.sport.as_deref())?;
    tracing::info!("Refreshing {} dashboard", sport);
    let data = state.refresh(sport).await?;

    Ok(Json(ValueBetsResponse {
        sport,
        source: data.source,
        fetched_at: data.fetched_at,
        value_bets: data.value_bets,
    }))
}

#[derive(Debug, Serialize)]
pub struct BetList {
    pub bets: Vec<Bet>,
    pub summary: BetSummary,
}

pub async fn list_bets(State(state): State<AppState>, session: SessionId) -> Response {
    let list = state
        .sessions
        .with_session(session.id, |s| BetList {
            bets: s.tracker.bets().to_vec(),
            summary: s.tracker.summary(),
        })
        .await;
    session.respond(Json(list))
}

pub async fn create_bet(
    State(state): State<AppState>,
    session: SessionId,
    Json(new_bet): Json<NewBet>,
) -> Response {
    let added = state
        .sessions
        .with_session(session.id, |s| s.tracker.add_bet(new_bet))
        .await
        .map(|bet| (StatusCode::CREATED, Json(bet)))
        .map_err(ApiError::from);
    session.respond(added)
}

#[derive(Debug, Deserialize)]
pub struct SettleRequest {
    pub result: BetResult,
}

pub async fn settle_bet(
    State(state): State<AppState>,
    session: SessionId,
    Path(id): Path<Uuid>,
    Json(request): Json<SettleRequest>,
) -> Response {
    let settled = state
        .sessions
        .with_session(session.id, |s| s.tracker.settle(id, request.result))
        .await
        .map(Json)
        .map_err(ApiError::from);
    session.respond(settled)
}

pub async fn delete_bet(
    State(state): State<AppState>,
    session: SessionId,
    Path(id): Path<Uuid>,
) -> Response {
    let deleted = state
        .sessions
        .with_session(session.id, |s| s.tracker.delete(id))
        .await
        .map(Json)
        .map_err(ApiError::from);
    session.respond(deleted)
}

pub async fn bets_summary(State(state): State<AppState>, session: SessionId) -> Response {
    let summary = state
        .sessions
        .with_session(session.id, |s| s.tracker.summary())
        .await;
    session.respond(Json(summary))
}

pub async fn export_bets(State(state): State<AppState>, session: SessionId) -> Response {
    let bets = state
        .sessions
        .with_session(session.id, |s| s.tracker.bets().to_vec())
        .await;

    let mut csv = Vec::new();
    let exported = write_bets_csv(&bets, &mut csv)
        .map(|_| {
            (
                [
                    (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
                    (header::CONTENT_DISPOSITION, "attachment; filename=\"bets.csv\""),
                ],
                csv,
            )
        })
        .map_err(ApiError::from);

    session.respond(exported)
}

#[derive(Debug, Deserialize)]
pub struct ParlayRequest {
    pub legs: Vec<ParlayLeg>,
    pub stake: f64,
}

pub async fn parlay(Json(request): Json<ParlayRequest>) -> Result<Json<ParlayQuote>, ApiError> {
    Ok(Json(price_parlay(&request.legs, request.stake)?))
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    /// Start the conversation over before sending `message`
    #[serde(default)]
    pub reset: bool,
}

#[derive(Debug, Serialize)]
pub struct ChatHistory {
    pub persona: Persona,
    pub messages: Vec<ChatMessage>,
}

pub async fn chat(
    State(state): State<AppState>,
    session: SessionId,
    Path(persona): Path<String>,
    Json(request): Json<ChatRequest>,
) -> Result<Response, ApiError> {
    let persona: Persona = persona.parse()?;

    // Work on a copy so the session lock is not held across the model call
    let mut conversation = state.sessions.chat(session.id, persona).await;
    if request.reset {
        conversation.clear();
    }
    let reply: Result<AssistantReply, _> = conversation
        .reply(state.llm.as_deref(), &request.message)
        .await;
    if reply.is_ok() {
        state.sessions.save_chat(session.id, conversation).await;
    }

    Ok(session.respond(reply.map(Json).map_err(ApiError::from)))
}

pub async fn chat_history(
    State(state): State<AppState>,
    session: SessionId,
    Path(persona): Path<String>,
) -> Result<Response, ApiError> {
    let persona: Persona = persona.parse()?;
    let conversation = state.sessions.chat(session.id, persona).await;

    Ok(session.respond(Json(ChatHistory {
        persona,
        messages: conversation.history().to_vec(),
    })))
}

#[derive(Debug, Deserialize)]
pub struct SummarizeRequest {
    pub url: Option<String>,
    pub text: Option<String>,
    pub sentences: Option<usize>,
}

pub async fn summarize(
    State(state): State<AppState>,
    Json(request): Json<SummarizeRequest>,
) -> Result<Json<Summary>, ApiError> {
    let sentences = request
        .sentences
        .unwrap_or(DEFAULT_SUMMARY_SENTENCES)
        .clamp(1, MAX_SUMMARY_SENTENCES);

    let text = match (request.text.filter(|t| !t.trim().is_empty()), request.url) {
        (Some(text), _) => text,
        (None, Some(url)) if !state.config.offline => fetch_article_text(&state.http, &url)
            .await
            .map_err(|e| {
                tracing::warn!("Failed to fetch article {}: {:#}", url, e);
                ApiError::Upstream(format!("{:#}", e))
            })?,
        (None, Some(_)) => {
            return Err(ApiError::Unavailable(
                "Article fetching is disabled in offline mode".to_string(),
            ))
        }
        (None, None) => {
            return Err(ApiError::BadRequest(
                "Provide either text or url".to_string(),
            ))
        }
    };

    Ok(Json(summarize_text(state.llm.as_deref(), &text, sentences).await))
}

pub async fn classify(body: Bytes) -> Result<Json<Classification>, ApiError> {
    Ok(Json(classify_image(&body)?))
}

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
    pub event_type: String,
    /// Customer whose record changed, if any
    pub customer_id: Option<String>,
}

pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<WebhookAck>, ApiError> {
    let secret = state
        .config
        .webhook_secret
        .as_deref()
        .ok_or_else(|| ApiError::Unavailable("Webhook secret is not configured".to_string()))?;

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or(WebhookError::MissingSignature)?;

    verify_signature(
        &body,
        signature,
        secret,
        Utc::now().timestamp(),
        DEFAULT_TOLERANCE_SECS,
    )?;

    let event = WebhookEvent::parse(&body)?;
    let updated = state
        .subscriptions
        .apply_event(&event)
        .await
        .map_err(|e| match e.downcast::<WebhookError>() {
            Ok(webhook_error) => ApiError::Webhook(webhook_error),
            Err(e) => ApiError::Internal(e),
        })?;

    Ok(Json(WebhookAck {
        received: true,
        event_type: event.event_type,
        customer_id: updated.map(|s| s.customer_id),
    }))
}

pub async fn subscription(
    State(state): State<AppState>,
    Path(customer_id): Path<String>,
) -> Result<Json<Subscription>, ApiError> {
    state
        .subscriptions
        .get(&customer_id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No subscription for {}", customer_id)))
}

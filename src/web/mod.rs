//! axum routes for the dashboard pages and the JSON API

pub mod api;
pub mod pages;

use crate::api::llm_api::LlmClient;
use crate::assistants::classifier::ClassifyError;
use crate::assistants::AssistantError;
use crate::config::Config;
use crate::models::Sport;
use crate::session::{SessionStore, SESSION_TTL_HOURS};
use crate::subscriptions::{SubscriptionStore, WebhookError};
use crate::utils::bet_tracker::BetError;
use crate::utils::parlay::ParlayError;
use crate::utils::sentiment::{SentimentAnalyzer, SentimentError};
use crate::{fetch_dashboard_data, DashboardData};
use anyhow::Context;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "gameday_sid";

/// Dashboards already computed, one per sport
type SharedDashboards = Arc<RwLock<HashMap<Sport, DashboardData>>>;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub dashboards: SharedDashboards,
    pub sessions: SessionStore,
    pub subscriptions: Arc<SubscriptionStore>,
    pub llm: Option<Arc<LlmClient>>,
    pub http: reqwest::Client,
    pub sentiment: Arc<SentimentAnalyzer>,
}

impl AppState {
    /// Open the subscription ledger and build the outbound clients
    pub async fn from_config(config: Config) -> anyhow::Result<Self> {
        let subscriptions = SubscriptionStore::open(&config.subscriptions_file).await?;

        let llm = match &config.llm_api_key {
            Some(key) if !config.offline => Some(Arc::new(LlmClient::new(
                key.clone(),
                config.llm_base_url.clone(),
                config.llm_model.clone(),
                config.http_timeout,
            )?)),
            _ => None,
        };

        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .user_agent("Mozilla/5.0 (compatible; gameday-lab)")
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            config: Arc::new(config),
            dashboards: Arc::new(RwLock::new(HashMap::new())),
            sessions: SessionStore::new(),
            subscriptions: Arc::new(subscriptions),
            llm,
            http,
            sentiment: Arc::new(SentimentAnalyzer::new()),
        })
    }

    /// Dashboard for `sport`, loading it on first use
    pub async fn dashboard(&self, sport: Sport) -> Result<DashboardData, ApiError> {
        if let Some(data) = self.dashboards.read().await.get(&sport) {
            return Ok(data.clone());
        }
        self.refresh(sport).await
    }

    pub async fn refresh(&self, sport: Sport) -> Result<DashboardData, ApiError> {
        let data = fetch_dashboard_data(&self.config, sport).await?;
        self.dashboards.write().await.insert(sport, data.clone());
        Ok(data)
    }

    /// Sport named by a `?sport=` parameter, or the configured default
    pub fn sport_or_default(&self, sport: Option<&str>) -> Result<Sport, ApiError> {
        match sport.filter(|s| !s.trim().is_empty()) {
            Some(s) => s.parse().map_err(|e: anyhow::Error| ApiError::BadRequest(e.to_string())),
            None => Ok(self.config.default_sport),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(pages::hub))
        .route("/betting", get(pages::betting))
        .route("/tracker", get(pages::tracker))
        .route("/tracker/bets", post(pages::add_bet))
        .route("/tracker/bets/:id/settle", post(pages::settle_bet))
        .route("/tracker/bets/:id/delete", post(pages::delete_bet))
        .route("/api/odds", get(api::odds))
        .route("/api/kelly", post(api::kelly))
        .route("/api/sentiment", post(api::sentiment))
        .route("/api/value-bets", get(api::value_bets))
        .route("/api/refresh", post(api::refresh))
        .route("/api/bets", get(api::list_bets).post(api::create_bet))
        .route("/api/bets/summary", get(api::bets_summary))
        .route("/api/bets/export", get(api::export_bets))
        .route("/api/bets/:id", axum::routing::delete(api::delete_bet))
        .route("/api/bets/:id/settle", post(api::settle_bet))
        .route("/api/parlay", post(api::parlay))
        .route("/api/chat/:persona", get(api::chat_history).post(api::chat))
        .route("/api/summarize", post(api::summarize))
        .route("/api/classify", post(api::classify))
        .route("/api/subscriptions/:customer_id", get(api::subscription))
        .route("/webhooks/payments", post(api::payment_webhook))
        .with_state(state)
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Bet(#[from] BetError),

    #[error(transparent)]
    Parlay(#[from] ParlayError),

    #[error(transparent)]
    Sentiment(#[from] SentimentError),

    #[error(transparent)]
    Assistant(#[from] AssistantError),

    #[error(transparent)]
    Classify(#[from] ClassifyError),

    #[error(transparent)]
    Webhook(#[from] WebhookError),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unavailable(String),

    #[error("Upstream request failed: {0}")]
    Upstream(String),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Bet(BetError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Bet(BetError::AlreadySettled(_)) => StatusCode::CONFLICT,
            ApiError::Assistant(AssistantError::UnknownPersona(_)) => StatusCode::NOT_FOUND,
            ApiError::Classify(ClassifyError::UnsupportedFormat) => {
                StatusCode::UNSUPPORTED_MEDIA_TYPE
            }
            ApiError::Bet(_)
            | ApiError::Parlay(_)
            | ApiError::Sentiment(_)
            | ApiError::Assistant(_)
            | ApiError::Classify(_)
            | ApiError::Webhook(_)
            | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Internal(e) => tracing::error!("Request failed: {:#}", e),
            ApiError::Webhook(e) => tracing::warn!("Rejected webhook: {}", e),
            _ => {}
        }

        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (self.status(), body).into_response()
    }
}

/// Visitor session resolved from the `gameday_sid` cookie
#[derive(Debug, Clone, Copy)]
pub struct SessionId {
    pub id: Uuid,
    is_new: bool,
}

impl SessionId {
    /// Attach the session cookie when this request started the session.
    /// Error responses carry it too.
    pub fn respond(&self, response: impl IntoResponse) -> Response {
        let mut response = response.into_response();
        if self.is_new {
            let cookie = format!(
                "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
                SESSION_COOKIE,
                self.id,
                SESSION_TTL_HOURS * 3600
            );
            if let Ok(value) = HeaderValue::from_str(&cookie) {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
        }
        response
    }
}

#[async_trait]
impl FromRequestParts<AppState> for SessionId {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // Unknown ids get a fresh one; the session itself is created on first use
        let id = match state.sessions.touch(session_cookie(&parts.headers)).await {
            Some(id) => SessionId { id, is_new: false },
            None => SessionId {
                id: Uuid::new_v4(),
                is_new: true,
            },
        };
        Ok(id)
    }
}

fn session_cookie(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value.trim()).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscriptions::webhook::sign_payload;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const SECRET: &str = "whsec_test";

    async fn test_state(webhook_secret: Option<&str>) -> (AppState, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            subscriptions_file: dir.path().join("subscriptions.json"),
            cache_dir: dir.path().join("cache"),
            webhook_secret: webhook_secret.map(str::to_string),
            offline: true,
            ..Config::default()
        };
        (AppState::from_config(config).await.unwrap(), dir)
    }

    async fn test_app(webhook_secret: Option<&str>) -> (Router, tempfile::TempDir) {
        let (state, dir) = test_state(webhook_secret).await;
        (router(state), dir)
    }

    async fn send(app: &Router, request: Request<Body>) -> Response {
        app.clone().oneshot(request).await.unwrap()
    }

    fn post_json(uri: &str, body: Value, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get_with(uri: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    /// `name=value` part of the Set-Cookie header
    fn session_cookie_from(response: &Response) -> String {
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }

    #[test]
    fn test_session_cookie_parsing() {
        let id = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("theme=dark; {}={}", SESSION_COOKIE, id)).unwrap(),
        );
        assert_eq!(session_cookie(&headers), Some(id));

        let mut garbage = HeaderMap::new();
        garbage.insert(header::COOKIE, HeaderValue::from_static("gameday_sid=nope"));
        assert_eq!(session_cookie(&garbage), None);
    }

    #[tokio::test]
    async fn test_odds_endpoint() {
        let (app, _dir) = test_app(None).await;

        let response = send(&app, get_with("/api/odds?odds=-110&model_prob=0.6", None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert!((body["implied_prob"].as_f64().unwrap() - 0.5238).abs() < 1e-3);
        assert_eq!(body["is_value_bet"], json!(true));
        assert!(body["kelly_fraction"].as_f64().unwrap() > 0.0);

        let response = send(&app, get_with("/api/odds?odds=0", None)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send(&app, get_with("/api/odds?odds=-2147483648", None)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send(&app, get_with("/api/odds?odds=150&model_prob=1.5", None)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_kelly_endpoint() {
        let (app, _dir) = test_app(None).await;

        let request = post_json(
            "/api/kelly",
            json!({"probability": 0.55, "decimal_odds": 2.0, "bankroll": 1000.0}),
            None,
        );
        let body = body_json(send(&app, request).await).await;
        assert!((body["fraction"].as_f64().unwrap() - 0.1).abs() < 1e-9);
        assert!((body["stake"].as_f64().unwrap() - 100.0).abs() < 1e-6);

        let request = post_json("/api/kelly", json!({"probability": 0.55}), None);
        assert_eq!(send(&app, request).await.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_sentiment_endpoint() {
        let (app, _dir) = test_app(None).await;

        let request = post_json("/api/sentiment", json!({"text": "I really love this team"}), None);
        let response = send(&app, request).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["label"], json!("positive"));

        let request = post_json("/api/sentiment", json!({"text": "   "}), None);
        assert_eq!(send(&app, request).await.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_value_bets_use_sample_data_offline() {
        let (app, _dir) = test_app(None).await;

        let response = send(&app, get_with("/api/value-bets?sport=nfl", None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["source"], json!("sample"));
        assert_eq!(body["sport"], json!("nfl"));

        let edges: Vec<f64> = body["value_bets"]
            .as_array()
            .unwrap()
            .iter()
            .map(|b| b["edge"].as_f64().unwrap())
            .collect();
        assert!(edges.windows(2).all(|w| w[0] >= w[1]));

        let response = send(&app, get_with("/api/value-bets?sport=curling", None)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_bet_tracker_flow() {
        let (app, _dir) = test_app(None).await;

        let new_bet = json!({
            "sport": "nfl",
            "home_team": "Detroit Lions",
            "away_team": "Chicago Bears",
            "pick": "Lions ML",
            "odds": -150,
            "stake": 30.0
        });
        let response = send(&app, post_json("/api/bets", new_bet, None)).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let cookie = session_cookie_from(&response);
        let bet = body_json(response).await;
        assert_eq!(bet["result"], json!("pending"));
        let id = bet["id"].as_str().unwrap().to_string();

        let settle_uri = format!("/api/bets/{}/settle", id);
        let response = send(&app, post_json(&settle_uri, json!({"result": "win"}), Some(&cookie))).await;
        assert_eq!(response.status(), StatusCode::OK);
        // Known session, no new cookie
        assert!(response.headers().get(header::SET_COOKIE).is_none());
        assert!((body_json(response).await["profit"].as_f64().unwrap() - 20.0).abs() < 1e-9);

        let response = send(&app, post_json(&settle_uri, json!({"result": "loss"}), Some(&cookie))).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let summary = body_json(send(&app, get_with("/api/bets/summary", Some(&cookie))).await).await;
        assert_eq!(summary["wins"], json!(1));
        assert!((summary["total_profit"].as_f64().unwrap() - 20.0).abs() < 1e-9);

        // A different visitor sees an empty tracker
        let other = body_json(send(&app, get_with("/api/bets", None)).await).await;
        assert_eq!(other["bets"].as_array().unwrap().len(), 0);

        let export = send(&app, get_with("/api/bets/export", Some(&cookie))).await;
        assert_eq!(
            export.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/csv; charset=utf-8"
        );
        let csv = body_text(export).await;
        assert!(csv.contains("Lions ML"));

        let delete = Request::builder()
            .method("DELETE")
            .uri(format!("/api/bets/{}", id))
            .header(header::COOKIE, &cookie)
            .body(Body::empty())
            .unwrap();
        assert_eq!(send(&app, delete).await.status(), StatusCode::OK);

        let delete_again = Request::builder()
            .method("DELETE")
            .uri(format!("/api/bets/{}", id))
            .header(header::COOKIE, &cookie)
            .body(Body::empty())
            .unwrap();
        assert_eq!(send(&app, delete_again).await.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_invalid_bet_is_rejected() {
        let (app, _dir) = test_app(None).await;
        let new_bet = json!({
            "sport": "nba",
            "home_team": "Boston Celtics",
            "away_team": "New York Knicks",
            "pick": "Celtics ML",
            "odds": 0,
            "stake": 10.0
        });
        let response = send(&app, post_json("/api/bets", new_bet, None)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(response).await["error"].as_str().unwrap().contains("American odds"));
    }

    #[tokio::test]
    async fn test_failed_requests_do_not_strand_sessions() {
        let (state, _dir) = test_state(None).await;
        let app = router(state.clone());

        // A body the extractor rejects never touches the session store
        let request = Request::builder()
            .method("POST")
            .uri("/api/bets")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = send(&app, request).await;
        assert!(response.status().is_client_error());
        assert!(response.headers().get(header::SET_COOKIE).is_none());
        assert_eq!(state.sessions.len().await, 0);

        // A rejected bet still hands out the cookie for the session it opened
        let invalid = json!({
            "sport": "nfl",
            "home_team": "Detroit Lions",
            "away_team": "Green Bay Packers",
            "pick": "Lions ML",
            "odds": -150,
            "stake": 0.0
        });
        let response = send(&app, post_json("/api/bets", invalid, None)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let cookie = session_cookie_from(&response);
        assert_eq!(state.sessions.len().await, 1);

        let response = send(&app, get_with("/api/bets", Some(&cookie))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
        assert_eq!(state.sessions.len().await, 1);
    }

    #[tokio::test]
    async fn test_extreme_odds_bet_is_rejected() {
        let (app, _dir) = test_app(None).await;
        let new_bet = json!({
            "sport": "nba",
            "home_team": "Boston Celtics",
            "away_team": "New York Knicks",
            "pick": "Celtics ML",
            "odds": i32::MIN,
            "stake": 10.0
        });
        let response = send(&app, post_json("/api/bets", new_bet, None)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let request = post_json("/api/kelly", json!({"probability": 0.55, "odds": i32::MIN}), None);
        assert_eq!(send(&app, request).await.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_parlay_endpoint() {
        let (app, _dir) = test_app(None).await;

        let request = post_json(
            "/api/parlay",
            json!({
                "stake": 10.0,
                "legs": [
                    {"game_id": "g1", "selection": "Lions", "odds": 100},
                    {"game_id": "g2", "selection": "Chiefs", "odds": 100}
                ]
            }),
            None,
        );
        let body = body_json(send(&app, request).await).await;
        assert!((body["decimal_odds"].as_f64().unwrap() - 4.0).abs() < 1e-9);
        assert!((body["payout"].as_f64().unwrap() - 40.0).abs() < 1e-9);

        let request = post_json(
            "/api/parlay",
            json!({"stake": 10.0, "legs": [{"game_id": "g1", "selection": "Lions", "odds": 100}]}),
            None,
        );
        assert_eq!(send(&app, request).await.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_chat_offline_and_history() {
        let (app, _dir) = test_app(None).await;

        let request = post_json("/api/chat/fitness", json!({"message": "What should I eat after lifting?"}), None);
        let response = send(&app, request).await;
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = session_cookie_from(&response);
        let reply = body_json(response).await;
        assert_eq!(reply["offline"], json!(true));
        assert_eq!(reply["persona"], json!("fitness"));

        let history = body_json(send(&app, get_with("/api/chat/fitness", Some(&cookie))).await).await;
        assert_eq!(history["messages"].as_array().unwrap().len(), 2);

        let request = post_json("/api/chat/astrology", json!({"message": "hi"}), None);
        assert_eq!(send(&app, request).await.status(), StatusCode::NOT_FOUND);

        let request = post_json("/api/chat/qa", json!({"message": ""}), None);
        assert_eq!(send(&app, request).await.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_summarize_text_offline() {
        let (app, _dir) = test_app(None).await;

        let text = "The Lions won the game on Sunday. The Lions offense scored four touchdowns. \
                    Fans in Detroit celebrated the Lions win late into the night.";
        let request = post_json("/api/summarize", json!({"text": text, "sentences": 1}), None);
        let body = body_json(send(&app, request).await).await;
        assert_eq!(body["offline"], json!(true));
        assert!(!body["summary"].as_str().unwrap().is_empty());

        let request = post_json("/api/summarize", json!({}), None);
        assert_eq!(send(&app, request).await.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_classify_endpoint() {
        let (app, _dir) = test_app(None).await;

        let mut png = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        png.extend_from_slice(&[0u8; 64]);
        let request = Request::builder()
            .method("POST")
            .uri("/api/classify")
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .body(Body::from(png))
            .unwrap();
        let body = body_json(send(&app, request).await).await;
        assert_eq!(body["format"], json!("png"));
        assert_eq!(body["predictions"].as_array().unwrap().len(), 3);

        let request = Request::builder()
            .method("POST")
            .uri("/api/classify")
            .body(Body::from("not an image"))
            .unwrap();
        assert_eq!(
            send(&app, request).await.status(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
    }

    fn webhook_request(payload: &str, signature: Option<String>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/webhooks/payments")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(signature) = signature {
            builder = builder.header("Stripe-Signature", signature);
        }
        builder.body(Body::from(payload.to_string())).unwrap()
    }

    #[tokio::test]
    async fn test_payment_webhook_updates_subscription() {
        let (app, _dir) = test_app(Some(SECRET)).await;
        let payload = json!({
            "id": "evt_1",
            "type": "customer.subscription.created",
            "data": {"object": {"id": "sub_1", "customer": "cus_42", "status": "trialing"}}
        })
        .to_string();
        let now = chrono::Utc::now().timestamp();

        let response = send(&app, webhook_request(&payload, None)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let forged = sign_payload(&payload, "wrong_secret", now).unwrap();
        let response = send(&app, webhook_request(&payload, Some(forged))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let stale = sign_payload(&payload, SECRET, now - 3600).unwrap();
        let response = send(&app, webhook_request(&payload, Some(stale))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send(&app, get_with("/api/subscriptions/cus_42", None)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let signature = sign_payload(&payload, SECRET, now).unwrap();
        let response = send(&app, webhook_request(&payload, Some(signature))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["customer_id"], json!("cus_42"));

        let response = send(&app, get_with("/api/subscriptions/cus_42", None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], json!("trialing"));
    }

    #[tokio::test]
    async fn test_webhook_without_secret_is_unavailable() {
        let (app, _dir) = test_app(None).await;
        let payload = r#"{"id":"evt_1","type":"invoice.paid","data":{"object":{}}}"#;
        let signature = sign_payload(payload, SECRET, chrono::Utc::now().timestamp()).unwrap();
        let response = send(&app, webhook_request(payload, Some(signature))).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_pages_render() {
        let (app, _dir) = test_app(None).await;

        let response = send(&app, get_with("/", None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("Gameday Lab"));

        let response = send(&app, get_with("/betting?sport=nba", None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("Boston Celtics"));
        assert!(html.contains("sample data"));

        let response = send(&app, get_with("/tracker", None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("No bets tracked yet"));
    }

    #[tokio::test]
    async fn test_tracker_form_adds_bet() {
        let (app, _dir) = test_app(None).await;

        let form = "sport=nfl&home_team=Green+Bay+Packers&away_team=Minnesota+Vikings&pick=Packers+ML&odds=-120&stake=12";
        let request = Request::builder()
            .method("POST")
            .uri("/tracker/bets")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form))
            .unwrap();
        let response = send(&app, request).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let cookie = session_cookie_from(&response);

        let html = body_text(send(&app, get_with("/tracker", Some(&cookie))).await).await;
        assert!(html.contains("Packers ML"));

        let bad = "sport=nfl&home_team=A&away_team=B&pick=A+ML&odds=-120&stake=-5";
        let request = Request::builder()
            .method("POST")
            .uri("/tracker/bets")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(header::COOKIE, &cookie)
            .body(Body::from(bad))
            .unwrap();
        let response = send(&app, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_text(response).await.contains("Stake must be a positive amount"));
    }
}

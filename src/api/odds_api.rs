use crate::models::{BettingOdds, Game, MoneylineOdds, Sport};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::time::Duration;

pub const ODDS_API_BASE_URL: &str = "https://api.the-odds-api.com/v4";

/// Response from The Odds API for a single game
#[derive(Debug, Deserialize)]
struct OddsApiGame {
    id: String,
    sport_title: String,
    commence_time: DateTime<Utc>,
    home_team: String,
    away_team: String,
    #[serde(default)]
    bookmakers: Vec<OddsApiBookmaker>,
}

/// Bookmaker data from The Odds API
#[derive(Debug, Deserialize)]
struct OddsApiBookmaker {
    title: String,
    last_update: DateTime<Utc>,
    markets: Vec<OddsApiMarket>,
}

/// Market data (e.g., moneyline, spread) from The Odds API
#[derive(Debug, Deserialize)]
struct OddsApiMarket {
    key: String,
    outcomes: Vec<OddsApiOutcome>,
}

/// Outcome data for a specific team
#[derive(Debug, Deserialize)]
struct OddsApiOutcome {
    name: String,
    price: f64,
}

/// Remaining/used request quota reported in response headers
#[derive(Debug, Clone, Default)]
pub struct OddsApiUsage {
    pub remaining: Option<String>,
    pub used: Option<String>,
}

pub struct OddsApiClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl OddsApiClient {
    pub fn new(api_key: String, timeout: Duration) -> Result<Self> {
        Self::with_base_url(api_key, ODDS_API_BASE_URL.to_string(), timeout)
    }

    pub fn with_base_url(api_key: String, base_url: String, timeout: Duration) -> Result<Self> {
        Ok(Self {
            api_key,
            base_url,
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .context("Failed to build HTTP client")?,
        })
    }

    /// Fetch upcoming games with moneyline odds.
    /// Only returns games that are in the future and within the next 7 days
    pub async fn fetch_games(&self, sport: Sport) -> Result<Vec<(Game, Vec<BettingOdds>)>> {
        let url = format!("{}/sports/{}/odds", self.base_url, sport.odds_api_key());

        let response = self
            .client
            .get(&url)
            .query(&[
                ("apiKey", self.api_key.as_str()),
                ("regions", "us"),
                ("markets", "h2h"), // h2h = head-to-head (moneyline)
                ("oddsFormat", "american"),
            ])
            .send()
            .await
            .context("Failed to fetch odds from The Odds API")?;

        if !response.status().is_success() {
            anyhow::bail!("Odds API returned error: {}", response.status());
        }

        let api_games: Vec<OddsApiGame> = response
            .json()
            .await
            .context("Failed to parse Odds API response")?;

        let games = convert_games(api_games, Utc::now());
        tracing::info!("Fetched odds for {} {} games", games.len(), sport);
        Ok(games)
    }

    /// Check how many API requests you have remaining
    pub async fn check_usage(&self) -> Result<OddsApiUsage> {
        let url = format!("{}/sports", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[("apiKey", self.api_key.as_str())])
            .send()
            .await
            .context("Failed to reach The Odds API")?;

        let header = |name: &str| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };

        Ok(OddsApiUsage {
            remaining: header("x-requests-remaining"),
            used: header("x-requests-used"),
        })
    }
}

/// Keep games starting within the next week and flatten their h2h markets
fn convert_games(api_games: Vec<OddsApiGame>, now: DateTime<Utc>) -> Vec<(Game, Vec<BettingOdds>)> {
    let one_week_from_now = now + chrono::Duration::days(7);

    api_games
        .into_iter()
        .filter(|api_game| {
            api_game.commence_time > now && api_game.commence_time <= one_week_from_now
        })
        .map(|api_game| {
            let game = Game {
                id: api_game.id.clone(),
                home_team: api_game.home_team,
                away_team: api_game.away_team,
                commence_time: api_game.commence_time,
                sport_title: api_game.sport_title,
            };

            let odds: Vec<BettingOdds> = api_game
                .bookmakers
                .into_iter()
                .filter_map(|bookmaker| {
                    // Find the moneyline market
                    let moneyline_market = bookmaker.markets.iter().find(|m| m.key == "h2h")?;

                    let moneyline: Vec<MoneylineOdds> = moneyline_market
                        .outcomes
                        .iter()
                        .map(|outcome| MoneylineOdds {
                            team: outcome.name.clone(),
                            price: outcome.price.round() as i32,
                        })
                        .collect();

                    Some(BettingOdds {
                        game_id: api_game.id.clone(),
                        bookmaker: bookmaker.title,
                        last_update: bookmaker.last_update,
                        moneyline,
                    })
                })
                .collect();

            (game, odds)
        })
        .collect()
}

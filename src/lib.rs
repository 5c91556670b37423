pub mod api;
pub mod assistants;
pub mod config;
pub mod models;
pub mod session;
pub mod subscriptions;
pub mod utils;
pub mod web;

pub use api::*;
pub use models::*;
pub use utils::*;

use anyhow::Result;
use api::espn_api::EspnClient;
use api::odds_api::OddsApiClient;
use chrono::{DateTime, Utc};
use config::Config;
use serde::{Deserialize, Serialize};
use utils::data::{load_from_cache, save_to_cache};
use utils::features::build_feature_rows;
use utils::sample::sample_slate;
use utils::value_bets::{find_value_bets, ValueBet};

/// Where the dashboard's numbers came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Live,
    Cache,
    Sample,
}

/// All the data we want to display on the betting dashboard
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardData {
    pub sport: Sport,
    pub source: DataSource,
    pub fetched_at: DateTime<Utc>,
    pub games_with_odds: Vec<(Game, Vec<BettingOdds>)>,
    pub feature_rows: Vec<FeatureRow>,
    pub value_bets: Vec<ValueBet>,
}

/// Load one input from cache, the live API, or the bundled sample, in that order
async fn load_input<T, F, Fut>(
    config: &Config,
    cache_name: &str,
    what: &str,
    live: Option<F>,
    sample: impl FnOnce() -> T,
) -> (T, DataSource)
where
    T: Serialize + serde::de::DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let cache_file = config.cache_file(cache_name);

    if config.use_cache && cache_file.exists() {
        match load_from_cache(&cache_file) {
            Ok(data) => return (data, DataSource::Cache),
            Err(e) => tracing::warn!("Ignoring unreadable {} cache: {:#}", what, e),
        }
    }

    let Some(live) = live else {
        tracing::warn!("No live source for {}, using sample data", what);
        return (sample(), DataSource::Sample);
    };

    match live().await {
        Ok(data) => {
            if let Err(e) = save_to_cache(&data, &cache_file) {
                tracing::warn!("Failed to cache {}: {:#}", what, e);
            }
            (data, DataSource::Live)
        }
        Err(e) => {
            tracing::warn!("Failed to fetch {}, using sample data: {:#}", what, e);
            (sample(), DataSource::Sample)
        }
    }
}

/// Fetch odds and schedules, then compute feature rows and value bets.
///
/// Outbound failures never fail the call: each input falls back to the
/// bundled sample slate and the result is tagged with its source.
pub async fn fetch_dashboard_data(config: &Config, sport: Sport) -> Result<DashboardData> {
    let sample = sample_slate(sport)?;
    let sample_odds = sample.games_with_odds;
    let sample_schedule = sample.schedule;

    let odds_client = match &config.odds_api_key {
        Some(key) if !config.offline => Some(OddsApiClient::new(key.clone(), config.http_timeout)?),
        _ => None,
    };
    let espn_client = EspnClient::new(config.http_timeout)?;

    let (games_with_odds, odds_source) = load_input(
        config,
        &format!("{}_odds.json", sport.as_str()),
        "odds",
        odds_client
            .as_ref()
            .map(|client| move || client.fetch_games(sport)),
        || sample_odds,
    )
    .await;

    let (schedule, schedule_source) = load_input(
        config,
        &format!("{}_schedule.json", sport.as_str()),
        "schedule",
        (!config.offline).then_some(|| espn_client.fetch_schedule(sport)),
        || sample_schedule,
    )
    .await;

    let source = match (odds_source, schedule_source) {
        (DataSource::Sample, _) | (_, DataSource::Sample) => DataSource::Sample,
        (DataSource::Cache, _) | (_, DataSource::Cache) => DataSource::Cache,
        _ => DataSource::Live,
    };

    let feature_rows = build_feature_rows(sport, &schedule);
    let value_bets = find_value_bets(&games_with_odds, &feature_rows, config.value_margin, None);

    tracing::info!(
        "{} dashboard ready ({:?}): {} games, {} feature rows, {} value bets",
        sport,
        source,
        games_with_odds.len(),
        feature_rows.len(),
        value_bets.len()
    );

    Ok(DashboardData {
        sport,
        source,
        fetched_at: Utc::now(),
        games_with_odds,
        feature_rows,
        value_bets,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cached_inputs_are_used() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            cache_dir: dir.path().to_path_buf(),
            use_cache: true,
            ..Config::default()
        };

        // Seed both caches from the sample slate so no network is touched
        let slate = sample_slate(Sport::Nfl).unwrap();
        save_to_cache(&slate.games_with_odds, config.cache_file("nfl_odds.json")).unwrap();
        save_to_cache(&slate.schedule, config.cache_file("nfl_schedule.json")).unwrap();

        let data = fetch_dashboard_data(&config, Sport::Nfl).await.unwrap();
        assert_eq!(data.source, DataSource::Cache);
        assert_eq!(data.games_with_odds.len(), slate.games_with_odds.len());
        assert_eq!(data.feature_rows.len(), slate.schedule.len());
        assert!(data.value_bets.iter().all(|b| b.edge > config.value_margin));
    }
}

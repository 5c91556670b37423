use crate::models::{BettingOdds, Game, ScheduledGame, Sport};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;

/// Bundled offline dataset shown when the live APIs are unreachable
const SAMPLE_GAMES_JSON: &str = include_str!("../../data/sample_games.json");

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SampleSlate {
    pub games_with_odds: Vec<(Game, Vec<BettingOdds>)>,
    pub schedule: Vec<ScheduledGame>,
}

/// Sample games, odds and records for a sport. Sports without bundled data
/// get an empty slate.
pub fn sample_slate(sport: Sport) -> Result<SampleSlate> {
    let mut slates: HashMap<Sport, SampleSlate> =
        serde_json::from_str(SAMPLE_GAMES_JSON).context("Failed to parse bundled sample data")?;
    Ok(slates.remove(&sport).unwrap_or_default())
}

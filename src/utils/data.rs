use crate::models::Bet;
use crate::utils::value_bets::ValueBet;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

/// Save any serializable data to a JSON cache file, creating the directory if needed
pub fn save_to_cache<T: Serialize + ?Sized>(data: &T, cache_file: impl AsRef<Path>) -> Result<()> {
    let cache_file = cache_file.as_ref();
    if let Some(parent) = cache_file.parent() {
        std::fs::create_dir_all(parent).context("Failed to create cache directory")?;
    }
    let json = serde_json::to_string_pretty(data).context("Failed to serialize cache data")?;
    std::fs::write(cache_file, json).context("Failed to write cache file")?;
    tracing::debug!("Saved cache file {}", cache_file.display());
    Ok(())
}

/// Load data from a JSON cache file
pub fn load_from_cache<T: DeserializeOwned>(cache_file: impl AsRef<Path>) -> Result<T> {
    let json = std::fs::read_to_string(cache_file.as_ref()).context("Failed to read cache file")?;
    let data = serde_json::from_str(&json).context("Failed to deserialize cache data")?;
    Ok(data)
}

/// Write tracked bets as CSV
pub fn write_bets_csv<W: Write>(bets: &[Bet], writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    csv_writer.write_record([
        "Id", "Sport", "Home Team", "Away Team", "Pick", "Odds", "Stake", "Result", "Profit",
        "Placed At",
    ])?;

    for bet in bets {
        csv_writer.write_record([
            bet.id.to_string(),
            bet.sport.to_string(),
            bet.home_team.clone(),
            bet.away_team.clone(),
            bet.pick.clone(),
            format!("{:+}", bet.odds),
            format!("{:.2}", bet.stake),
            bet.result.to_string(),
            bet.profit.map(|p| format!("{:.2}", p)).unwrap_or_default(),
            bet.placed_at.to_rfc3339(),
        ])?;
    }

    csv_writer.flush().context("Failed to flush CSV output")?;
    Ok(())
}

/// Save value bets to CSV
pub fn save_value_bets_to_csv(bets: &[ValueBet], filename: impl AsRef<Path>) -> Result<()> {
    let mut csv_writer = csv::Writer::from_path(filename).context("Failed to create CSV file")?;

    csv_writer.write_record([
        "Home Team",
        "Away Team",
        "Bet Team",
        "Odds",
        "Bookmaker",
        "Expected Value (%)",
        "Edge (%)",
        "Model Probability (%)",
        "Implied Probability (%)",
        "Kelly Stake (%)",
    ])?;

    for bet in bets {
        csv_writer.write_record([
            bet.home_team.clone(),
            bet.away_team.clone(),
            bet.team.clone(),
            bet.odds.to_string(),
            bet.bookmaker.clone(),
            format!("{:.2}", bet.expected_value * 100.0),
            format!("{:.2}", bet.edge * 100.0),
            format!("{:.1}", bet.model_prob * 100.0),
            format!("{:.1}", bet.implied_prob * 100.0),
            format!("{:.1}", bet.kelly_stake * 100.0),
        ])?;
    }

    csv_writer.flush()?;
    Ok(())
}

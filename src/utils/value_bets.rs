use crate::models::{BettingOdds, FeatureRow, Game};
use crate::utils::features::predict_home_win_probability;
use crate::utils::odds::{
    american_odds_to_probability, american_to_decimal, calculate_expected_value, kelly_fraction,
};
use crate::utils::teams::{matchup_key, normalize_team_name};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Fraction of full Kelly we suggest staking
pub const KELLY_MULTIPLIER: f64 = 0.25;

/// A moneyline price whose model probability beats the implied probability
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValueBet {
    pub game_id: String,
    pub home_team: String,
    pub away_team: String,
    pub commence_time: DateTime<Utc>,
    pub team: String,
    pub bookmaker: String,
    pub odds: i32,
    pub model_prob: f64,
    pub implied_prob: f64,
    pub expected_value: f64,
    pub edge: f64,
    /// Suggested stake as a fraction of bankroll (quarter Kelly)
    pub kelly_stake: f64,
}

impl ValueBet {
    /// Format the bet recommendation as a readable string
    pub fn format(&self) -> String {
        format!(
            "{} @ {} | Bet: {} ({:+}) on {} | EV: {:+.2}% | Edge: {:+.2}% | Model: {:.1}% | Implied: {:.1}% | Stake: {:.1}%",
            self.away_team,
            self.home_team,
            self.team,
            self.odds,
            self.bookmaker,
            self.expected_value * 100.0,
            self.edge * 100.0,
            self.model_prob * 100.0,
            self.implied_prob * 100.0,
            self.kelly_stake * 100.0
        )
    }
}

/// Find every moneyline price whose edge exceeds `margin`, sorted by edge
/// (descending) and optionally truncated to `top_n`
pub fn find_value_bets(
    games_with_odds: &[(Game, Vec<BettingOdds>)],
    feature_rows: &[FeatureRow],
    margin: f64,
    top_n: Option<usize>,
) -> Vec<ValueBet> {
    // Home win probability keyed by matchup
    let home_probs: HashMap<String, f64> = feature_rows
        .iter()
        .map(|row| {
            (
                matchup_key(&row.home_team, &row.away_team),
                predict_home_win_probability(row),
            )
        })
        .collect();

    let mut value_bets = Vec::new();

    for (game, odds_list) in games_with_odds {
        let home_key = normalize_team_name(&game.home_team);
        let away_key = normalize_team_name(&game.away_team);

        // Providers occasionally list neutral-site games the other way round
        let home_prob = match home_probs.get(&matchup_key(&game.home_team, &game.away_team)) {
            Some(p) => *p,
            None => match home_probs.get(&matchup_key(&game.away_team, &game.home_team)) {
                Some(p) => 1.0 - p,
                None => {
                    tracing::debug!(
                        "No prediction found for: {} vs {}",
                        game.home_team,
                        game.away_team
                    );
                    continue;
                }
            },
        };

        for bookmaker_odds in odds_list {
            for moneyline in &bookmaker_odds.moneyline {
                if moneyline.price == 0 {
                    continue;
                }

                let team_key = normalize_team_name(&moneyline.team);
                let model_prob = if team_key == home_key {
                    home_prob
                } else if team_key == away_key {
                    1.0 - home_prob
                } else {
                    // Draw or unknown outcome
                    continue;
                };

                let implied_prob = american_odds_to_probability(moneyline.price);
                let edge = model_prob - implied_prob;
                if edge <= margin {
                    continue;
                }

                value_bets.push(ValueBet {
                    game_id: game.id.clone(),
                    home_team: game.home_team.clone(),
                    away_team: game.away_team.clone(),
                    commence_time: game.commence_time,
                    team: moneyline.team.clone(),
                    bookmaker: bookmaker_odds.bookmaker.clone(),
                    odds: moneyline.price,
                    model_prob,
                    implied_prob,
                    expected_value: calculate_expected_value(model_prob, moneyline.price),
                    edge,
                    kelly_stake: KELLY_MULTIPLIER
                        * kelly_fraction(model_prob, american_to_decimal(moneyline.price)),
                });
            }
        }
    }

    // Sort by edge (descending)
    value_bets.sort_by(|a, b| {
        b.edge
            .partial_cmp(&a.edge)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    match top_n {
        Some(n) => value_bets.into_iter().take(n).collect(),
        None => value_bets,
    }
}

use crate::utils::odds::{
    american_to_decimal, is_valid_american_odds, probability_to_american_odds,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

const MIN_LEGS: usize = 2;
const MAX_LEGS: usize = 12;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ParlayError {
    #[error("A parlay needs at least 2 legs, got {0}")]
    TooFewLegs(usize),

    #[error("A parlay allows at most 12 legs, got {0}")]
    TooManyLegs(usize),

    #[error("Game {0} appears in more than one leg")]
    DuplicateGame(String),

    #[error("Leg '{0}' has odds outside the American range (100 to 100000 in magnitude)")]
    InvalidOdds(String),

    #[error("Leg '{0}' has a model probability outside (0, 1)")]
    InvalidProbability(String),

    #[error("Stake must be a positive amount, got {0}")]
    InvalidStake(f64),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParlayLeg {
    pub game_id: String,
    pub selection: String,
    pub odds: i32,
    /// Our own win probability for the leg, when one is known
    #[serde(default)]
    pub model_prob: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParlayQuote {
    pub legs: usize,
    pub stake: f64,
    pub decimal_odds: f64,
    pub american_odds: i32,
    pub implied_prob: f64,
    pub payout: f64,
    pub profit: f64,
    /// Product of leg model probabilities, only when every leg has one
    pub model_prob: Option<f64>,
    pub expected_value: Option<f64>,
}

/// Price a parlay from its legs. Legs are treated as independent.
pub fn price_parlay(legs: &[ParlayLeg], stake: f64) -> Result<ParlayQuote, ParlayError> {
    if legs.len() < MIN_LEGS {
        return Err(ParlayError::TooFewLegs(legs.len()));
    }
    if legs.len() > MAX_LEGS {
        return Err(ParlayError::TooManyLegs(legs.len()));
    }
    if !stake.is_finite() || stake <= 0.0 {
        return Err(ParlayError::InvalidStake(stake));
    }

    let mut seen = HashSet::new();
    for leg in legs {
        if !seen.insert(leg.game_id.as_str()) {
            return Err(ParlayError::DuplicateGame(leg.game_id.clone()));
        }
        if !is_valid_american_odds(leg.odds) {
            return Err(ParlayError::InvalidOdds(leg.selection.clone()));
        }
        if let Some(p) = leg.model_prob {
            if !(p > 0.0 && p < 1.0) {
                return Err(ParlayError::InvalidProbability(leg.selection.clone()));
            }
        }
    }

    let decimal_odds: f64 = legs.iter().map(|leg| american_to_decimal(leg.odds)).product();
    let implied_prob = 1.0 / decimal_odds;
    let payout = stake * decimal_odds;

    let model_prob = legs
        .iter()
        .map(|leg| leg.model_prob)
        .collect::<Option<Vec<f64>>>()
        .map(|probs| probs.iter().product::<f64>());
    let expected_value = model_prob.map(|p| p * decimal_odds - 1.0);

    Ok(ParlayQuote {
        legs: legs.len(),
        stake,
        decimal_odds,
        american_odds: probability_to_american_odds(implied_prob),
        implied_prob,
        payout,
        profit: payout - stake,
        model_prob,
        expected_value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leg(game_id: &str, odds: i32, model_prob: Option<f64>) -> ParlayLeg {
        ParlayLeg {
            game_id: game_id.to_string(),
            selection: format!("{} pick", game_id),
            odds,
            model_prob,
        }
    }

    #[test]
    fn test_two_leg_pricing() {
        // +100 and +100 -> 2.0 * 2.0 = 4.0 (+300)
        let quote = price_parlay(&[leg("a", 100, None), leg("b", 100, None)], 10.0).unwrap();
        assert!((quote.decimal_odds - 4.0).abs() < 1e-9);
        assert!((quote.payout - 40.0).abs() < 1e-9);
        assert!((quote.profit - 30.0).abs() < 1e-9);
        assert!((quote.implied_prob - 0.25).abs() < 1e-9);
        assert_eq!(quote.american_odds, 300);
        assert_eq!(quote.model_prob, None);
        assert_eq!(quote.expected_value, None);
    }

    #[test]
    fn test_model_probability() {
        let legs = [leg("a", -110, Some(0.6)), leg("b", 150, Some(0.5))];
        let quote = price_parlay(&legs, 5.0).unwrap();
        let model_prob = quote.model_prob.unwrap();
        assert!((model_prob - 0.3).abs() < 1e-9);
        assert!(quote.expected_value.unwrap() > 0.0);

        // One missing leg probability drops the combined estimate
        let legs = [leg("a", -110, Some(0.6)), leg("b", 150, None)];
        assert_eq!(price_parlay(&legs, 5.0).unwrap().model_prob, None);
    }

    #[test]
    fn test_rejections() {
        assert_eq!(
            price_parlay(&[leg("a", 100, None)], 10.0).unwrap_err(),
            ParlayError::TooFewLegs(1)
        );
        assert_eq!(
            price_parlay(&[leg("a", 100, None), leg("a", -120, None)], 10.0).unwrap_err(),
            ParlayError::DuplicateGame("a".to_string())
        );
        assert_eq!(
            price_parlay(&[leg("a", 100, None), leg("b", 0, None)], 10.0).unwrap_err(),
            ParlayError::InvalidOdds("b pick".to_string())
        );
        assert_eq!(
            price_parlay(&[leg("a", 100, None), leg("b", 100, Some(1.0))], 10.0).unwrap_err(),
            ParlayError::InvalidProbability("b pick".to_string())
        );
        assert_eq!(
            price_parlay(&[leg("a", 100, None), leg("b", 100, None)], -1.0).unwrap_err(),
            ParlayError::InvalidStake(-1.0)
        );

        assert_eq!(
            price_parlay(&[leg("a", 100, None), leg("b", i32::MIN, None)], 10.0).unwrap_err(),
            ParlayError::InvalidOdds("b pick".to_string())
        );
        assert_eq!(
            price_parlay(&[leg("a", 100, None), leg("b", 99, None)], 10.0).unwrap_err(),
            ParlayError::InvalidOdds("b pick".to_string())
        );

        let many: Vec<ParlayLeg> = (0..13).map(|i| leg(&i.to_string(), 100, None)).collect();
        assert_eq!(price_parlay(&many, 1.0).unwrap_err(), ParlayError::TooManyLegs(13));
    }

    #[test]
    fn test_twelve_legs_is_the_limit() {
        let legs: Vec<ParlayLeg> = (0..12).map(|i| leg(&i.to_string(), 100, None)).collect();
        let quote = price_parlay(&legs, 1.0).unwrap();
        assert_eq!(quote.legs, 12);
        // 2^12
        assert!((quote.decimal_odds - 4096.0).abs() < 1e-9);
    }
}

use crate::models::BetResult;

/// Smallest and largest magnitude of a quoted American price
pub const MIN_AMERICAN_ODDS: u32 = 100;
pub const MAX_AMERICAN_ODDS: u32 = 100_000;

/// American odds are quoted as +100 or longer, or -100 or shorter
pub fn is_valid_american_odds(odds: i32) -> bool {
    (MIN_AMERICAN_ODDS..=MAX_AMERICAN_ODDS).contains(&odds.unsigned_abs())
}

/// Convert American odds to implied probability
/// Positive odds (+150) mean you win $150 on a $100 bet
/// Negative odds (-150) mean you need to bet $150 to win $100
pub fn american_odds_to_probability(odds: i32) -> f64 {
    if odds > 0 {
        // For positive odds: 100 / (odds + 100)
        100.0 / (odds as f64 + 100.0)
    } else {
        // For negative odds: |odds| / (|odds| + 100)
        let abs_odds = odds.unsigned_abs() as f64;
        abs_odds / (abs_odds + 100.0)
    }
}

/// Convert probability to American odds
pub fn probability_to_american_odds(prob: f64) -> i32 {
    if prob >= 0.5 {
        // Favorite (negative odds)
        -((prob / (1.0 - prob)) * 100.0).round() as i32
    } else {
        // Underdog (positive odds)
        (((1.0 - prob) / prob) * 100.0).round() as i32
    }
}

/// Profit per unit staked if the bet wins
fn win_multiplier(odds: i32) -> f64 {
    if odds > 0 {
        odds as f64 / 100.0
    } else {
        100.0 / odds.unsigned_abs() as f64
    }
}

/// Convert American odds to decimal odds (total return per unit staked)
pub fn american_to_decimal(odds: i32) -> f64 {
    1.0 + win_multiplier(odds)
}

/// Calculate expected value for a bet
/// EV = (probability of winning * amount won per bet) - (probability of losing * amount lost per bet)
/// Returns EV as a fraction of the bet amount
pub fn calculate_expected_value(model_prob: f64, odds: i32) -> f64 {
    let win_amount = win_multiplier(odds);
    let prob_lose = 1.0 - model_prob;

    (model_prob * win_amount) - prob_lose
}

/// Difference between our probability and the one the price implies
pub fn edge(model_prob: f64, odds: i32) -> f64 {
    model_prob - american_odds_to_probability(odds)
}

/// A bet is "value" when the model beats the implied probability by more than `margin`
pub fn is_value_bet(model_prob: f64, odds: i32, margin: f64) -> bool {
    edge(model_prob, odds) > margin
}

/// Full Kelly stake as a fraction of bankroll.
///
/// f* = (b*p - q) / b where b = decimal_odds - 1 and q = 1 - p.
/// Returns 0 for probabilities outside (0, 1), decimal odds <= 1, or a
/// negative edge.
pub fn kelly_fraction(prob: f64, decimal_odds: f64) -> f64 {
    if !(prob > 0.0 && prob < 1.0) || !(decimal_odds > 1.0) {
        return 0.0;
    }

    let b = decimal_odds - 1.0;
    let q = 1.0 - prob;
    let fraction = (b * prob - q) / b;

    fraction.max(0.0)
}

/// Profit or loss of a settled bet. `None` while the bet is pending.
pub fn bet_profit(stake: f64, odds: i32, result: BetResult) -> Option<f64> {
    match result {
        BetResult::Pending => None,
        BetResult::Win => Some(stake * win_multiplier(odds)),
        BetResult::Loss => Some(-stake),
        BetResult::Push => Some(0.0),
    }
}

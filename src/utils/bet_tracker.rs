use crate::models::{Bet, BetResult, Sport};
use crate::utils::odds::{bet_profit, is_valid_american_odds};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum BetError {
    #[error("American odds must be between 100 and 100000 in magnitude, got {0}")]
    InvalidOdds(i32),

    #[error("Stake must be a positive amount, got {0}")]
    InvalidStake(f64),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Bet {0} not found")]
    NotFound(Uuid),

    #[error("Bet {0} is already settled")]
    AlreadySettled(Uuid),

    #[error("A bet can only be settled as win, loss or push")]
    InvalidSettlement,
}

/// Input for a new tracked bet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBet {
    pub sport: Sport,
    pub home_team: String,
    pub away_team: String,
    pub pick: String,
    pub odds: i32,
    pub stake: f64,
}

impl NewBet {
    fn validate(&self) -> Result<(), BetError> {
        if !is_valid_american_odds(self.odds) {
            return Err(BetError::InvalidOdds(self.odds));
        }
        if !self.stake.is_finite() || self.stake <= 0.0 {
            return Err(BetError::InvalidStake(self.stake));
        }
        if self.home_team.trim().is_empty() {
            return Err(BetError::MissingField("home_team"));
        }
        if self.away_team.trim().is_empty() {
            return Err(BetError::MissingField("away_team"));
        }
        if self.pick.trim().is_empty() {
            return Err(BetError::MissingField("pick"));
        }
        Ok(())
    }
}

/// Aggregate performance across tracked bets
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BetSummary {
    pub total_bets: usize,
    pub pending: usize,
    pub wins: usize,
    pub losses: usize,
    pub pushes: usize,
    pub total_staked: f64,
    pub settled_staked: f64,
    pub total_profit: f64,
    /// Wins over decided bets (pushes excluded)
    pub win_rate: f64,
    /// Profit over settled stake
    pub roi: f64,
}

/// In-memory list of a user's bets
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BetTracker {
    bets: Vec<Bet>,
}

impl BetTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_bet(&mut self, new_bet: NewBet) -> Result<Bet, BetError> {
        new_bet.validate()?;

        let bet = Bet {
            id: Uuid::new_v4(),
            sport: new_bet.sport,
            home_team: new_bet.home_team.trim().to_string(),
            away_team: new_bet.away_team.trim().to_string(),
            pick: new_bet.pick.trim().to_string(),
            odds: new_bet.odds,
            stake: new_bet.stake,
            result: BetResult::Pending,
            profit: None,
            placed_at: Utc::now(),
        };

        tracing::debug!("Tracking bet {} on {}", bet.id, bet.pick);
        self.bets.push(bet.clone());
        Ok(bet)
    }

    /// Record the outcome of a pending bet. Settlement happens at most once.
    pub fn settle(&mut self, id: Uuid, result: BetResult) -> Result<Bet, BetError> {
        if result == BetResult::Pending {
            return Err(BetError::InvalidSettlement);
        }

        let bet = self
            .bets
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or(BetError::NotFound(id))?;

        if bet.result != BetResult::Pending {
            return Err(BetError::AlreadySettled(id));
        }

        bet.result = result;
        bet.profit = bet_profit(bet.stake, bet.odds, result);
        Ok(bet.clone())
    }

    pub fn delete(&mut self, id: Uuid) -> Result<Bet, BetError> {
        let index = self
            .bets
            .iter()
            .position(|b| b.id == id)
            .ok_or(BetError::NotFound(id))?;
        Ok(self.bets.remove(index))
    }

    pub fn get(&self, id: Uuid) -> Option<&Bet> {
        self.bets.iter().find(|b| b.id == id)
    }

    pub fn bets(&self) -> &[Bet] {
        &self.bets
    }

    pub fn is_empty(&self) -> bool {
        self.bets.is_empty()
    }

    pub fn summary(&self) -> BetSummary {
        let mut summary = BetSummary {
            total_bets: self.bets.len(),
            ..Default::default()
        };

        for bet in &self.bets {
            summary.total_staked += bet.stake;
            match bet.result {
                BetResult::Pending => {
                    summary.pending += 1;
                    continue;
                }
                BetResult::Win => summary.wins += 1,
                BetResult::Loss => summary.losses += 1,
                BetResult::Push => summary.pushes += 1,
            }
            summary.settled_staked += bet.stake;
            summary.total_profit += bet.profit.unwrap_or(0.0);
        }

        let decided = summary.wins + summary.losses;
        if decided > 0 {
            summary.win_rate = summary.wins as f64 / decided as f64;
        }
        if summary.settled_staked > 0.0 {
            summary.roi = summary.total_profit / summary.settled_staked;
        }

        summary
    }
}

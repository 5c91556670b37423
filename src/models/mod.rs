use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Leagues the dashboard knows how to fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sport {
    Nfl,
    Nba,
    Mlb,
    Nhl,
    Ncaaf,
    Ncaab,
}

impl Sport {
    pub const ALL: [Sport; 6] = [
        Sport::Nfl,
        Sport::Nba,
        Sport::Mlb,
        Sport::Nhl,
        Sport::Ncaaf,
        Sport::Ncaab,
    ];

    /// Sport key used by The Odds API
    pub fn odds_api_key(&self) -> &'static str {
        match self {
            Sport::Nfl => "americanfootball_nfl",
            Sport::Nba => "basketball_nba",
            Sport::Mlb => "baseball_mlb",
            Sport::Nhl => "icehockey_nhl",
            Sport::Ncaaf => "americanfootball_ncaaf",
            Sport::Ncaab => "basketball_ncaab",
        }
    }

    /// `{sport}/{league}` path segment used by ESPN's site API
    pub fn espn_path(&self) -> &'static str {
        match self {
            Sport::Nfl => "football/nfl",
            Sport::Nba => "basketball/nba",
            Sport::Mlb => "baseball/mlb",
            Sport::Nhl => "hockey/nhl",
            Sport::Ncaaf => "football/college-football",
            Sport::Ncaab => "basketball/mens-college-basketball",
        }
    }

    /// Home advantage in points, used by the win probability model
    pub fn home_advantage(&self) -> f64 {
        match self {
            Sport::Nfl => 2.5,
            Sport::Ncaaf => 3.0,
            Sport::Nba => 3.0,
            Sport::Ncaab => 3.5,
            Sport::Mlb => 0.3,
            Sport::Nhl => 0.3,
        }
    }

    /// Typical spread of final margins, scales point differential into log-odds
    pub fn margin_scale(&self) -> f64 {
        match self {
            Sport::Nfl => 13.5,
            Sport::Ncaaf => 16.0,
            Sport::Nba => 12.0,
            Sport::Ncaab => 11.0,
            Sport::Mlb => 4.0,
            Sport::Nhl => 2.5,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Sport::Nfl => "nfl",
            Sport::Nba => "nba",
            Sport::Mlb => "mlb",
            Sport::Nhl => "nhl",
            Sport::Ncaaf => "ncaaf",
            Sport::Ncaab => "ncaab",
        }
    }
}

impl fmt::Display for Sport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().to_uppercase())
    }
}

impl FromStr for Sport {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "nfl" => Ok(Sport::Nfl),
            "nba" => Ok(Sport::Nba),
            "mlb" => Ok(Sport::Mlb),
            "nhl" => Ok(Sport::Nhl),
            "ncaaf" | "cfb" => Ok(Sport::Ncaaf),
            "ncaab" | "cbb" => Ok(Sport::Ncaab),
            other => anyhow::bail!("Unknown sport: {}", other),
        }
    }
}

/// Represents an upcoming game
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    pub id: String,
    pub home_team: String,
    pub away_team: String,
    pub commence_time: DateTime<Utc>,
    pub sport_title: String,
}

/// Moneyline odds for a team
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoneylineOdds {
    pub team: String,
    pub price: i32, // American odds format (e.g., -110, +150)
}

/// Betting odds from a sportsbook
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BettingOdds {
    pub game_id: String,
    pub bookmaker: String,
    pub last_update: DateTime<Utc>,
    pub moneyline: Vec<MoneylineOdds>,
}

/// Season record for a team as reported by the scoreboard
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamRecord {
    pub team: String,
    pub wins: u32,
    pub losses: u32,
    pub ties: u32,
    pub points_for: f64,
    pub points_against: f64,
}

impl TeamRecord {
    pub fn games_played(&self) -> u32 {
        self.wins + self.losses + self.ties
    }

    /// Win percentage with ties counted as half a win. 0.5 before any games.
    pub fn win_pct(&self) -> f64 {
        let played = self.games_played();
        if played == 0 {
            return 0.5;
        }
        (self.wins as f64 + 0.5 * self.ties as f64) / played as f64
    }

    /// Average scoring margin per game
    pub fn point_diff_per_game(&self) -> f64 {
        let played = self.games_played();
        if played == 0 {
            return 0.0;
        }
        (self.points_for - self.points_against) / played as f64
    }
}

/// A scheduled game joined with both teams' records
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledGame {
    pub game: Game,
    pub home_record: Option<TeamRecord>,
    pub away_record: Option<TeamRecord>,
}

/// Flat per-game feature record that feeds the win probability model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureRow {
    pub game_id: String,
    pub sport: Sport,
    pub home_team: String,
    pub away_team: String,
    pub commence_time: DateTime<Utc>,
    pub home_win_pct: f64,
    pub away_win_pct: f64,
    pub win_pct_delta: f64,
    pub home_point_diff: f64,
    pub away_point_diff: f64,
    pub rating_delta: f64,
}

/// Settlement state of a tracked bet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetResult {
    Pending,
    Win,
    Loss,
    Push,
}

impl BetResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            BetResult::Pending => "pending",
            BetResult::Win => "win",
            BetResult::Loss => "loss",
            BetResult::Push => "push",
        }
    }
}

impl fmt::Display for BetResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A wager recorded in the tracker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bet {
    pub id: Uuid,
    pub sport: Sport,
    pub home_team: String,
    pub away_team: String,
    pub pick: String,
    pub odds: i32,
    pub stake: f64,
    pub result: BetResult,
    pub profit: Option<f64>,
    pub placed_at: DateTime<Utc>,
}

/// Lifecycle state reported by the payment processor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Trialing,
    PastDue,
    Canceled,
    Incomplete,
    Unpaid,
}

impl FromStr for SubscriptionStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(SubscriptionStatus::Active),
            "trialing" => Ok(SubscriptionStatus::Trialing),
            "past_due" => Ok(SubscriptionStatus::PastDue),
            "canceled" | "cancelled" => Ok(SubscriptionStatus::Canceled),
            "incomplete" | "incomplete_expired" => Ok(SubscriptionStatus::Incomplete),
            "unpaid" => Ok(SubscriptionStatus::Unpaid),
            other => anyhow::bail!("Unknown subscription status: {}", other),
        }
    }
}

/// Subscription state for one payment customer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub customer_id: String,
    pub email: Option<String>,
    pub status: SubscriptionStatus,
    pub subscription_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub current_period_end: Option<DateTime<Utc>>,
}

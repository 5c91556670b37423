use crate::models::{FeatureRow, ScheduledGame, Sport, TeamRecord};

/// Converts a margin in standard deviations into logistic log-odds
const LOGISTIC_SCALE: f64 = 1.7;
/// Keep predictions away from certainty; records alone never justify it
const MIN_PROB: f64 = 0.02;
const MAX_PROB: f64 = 0.98;

/// Logistic function for probability calculation
fn logistic(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Single-number team strength in points: scoring margin plus how far the
/// win percentage sits above .500, scaled to the sport's typical margin
fn team_rating(record: &TeamRecord, sport: Sport) -> f64 {
    record.point_diff_per_game() + (record.win_pct() - 0.5) * sport.margin_scale()
}

/// Join a schedule with team records into model features.
/// Games missing either team's record are skipped.
pub fn build_feature_rows(sport: Sport, schedule: &[ScheduledGame]) -> Vec<FeatureRow> {
    schedule
        .iter()
        .filter_map(|scheduled| {
            let (Some(home), Some(away)) = (&scheduled.home_record, &scheduled.away_record) else {
                tracing::debug!(
                    "Skipping {} vs {}: missing team record",
                    scheduled.game.home_team,
                    scheduled.game.away_team
                );
                return None;
            };

            let home_win_pct = home.win_pct();
            let away_win_pct = away.win_pct();

            Some(FeatureRow {
                game_id: scheduled.game.id.clone(),
                sport,
                home_team: scheduled.game.home_team.clone(),
                away_team: scheduled.game.away_team.clone(),
                commence_time: scheduled.game.commence_time,
                home_win_pct,
                away_win_pct,
                win_pct_delta: home_win_pct - away_win_pct,
                home_point_diff: home.point_diff_per_game(),
                away_point_diff: away.point_diff_per_game(),
                rating_delta: team_rating(home, sport) - team_rating(away, sport),
            })
        })
        .collect()
}

/// Home win probability from a feature row.
///
/// The expected margin is the rating delta plus home advantage; dividing by the
/// sport's margin spread gives a z-like score that the logistic maps to (0, 1).
pub fn predict_home_win_probability(row: &FeatureRow) -> f64 {
    let expected_margin = row.rating_delta + row.sport.home_advantage();
    let z = expected_margin / row.sport.margin_scale();

    logistic(LOGISTIC_SCALE * z).clamp(MIN_PROB, MAX_PROB)
}

/// Normalize team names so the odds provider and ESPN agree.
/// "St. Louis Blues" -> "st louis blues", "Texas A&M Aggies" -> "texas aandm aggies"
pub fn normalize_team_name(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .replace('&', "and")
        .replace(['.', '\''], "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Lookup key for a home/away matchup
pub fn matchup_key(home_team: &str, away_team: &str) -> String {
    format!(
        "{}|{}",
        normalize_team_name(home_team),
        normalize_team_name(away_team)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_team_name() {
        assert_eq!(normalize_team_name("  Texas A&M  Aggies "), "texas aandm aggies");
        assert_eq!(normalize_team_name("St. Louis Blues"), "st louis blues");
        assert_eq!(normalize_team_name("Hawai'i Rainbow Warriors"), "hawaii rainbow warriors");
    }

    #[test]
    fn test_matchup_key() {
        assert_eq!(
            matchup_key("Kansas City Chiefs", "Buffalo Bills"),
            "kansas city chiefs|buffalo bills"
        );
    }
}

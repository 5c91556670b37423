use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gameday_lab::api::llm_api::LlmClient;
use gameday_lab::api::odds_api::{OddsApiClient, OddsApiUsage};
use gameday_lab::assistants::classifier::classify;
use gameday_lab::assistants::summarizer::{
    fetch_article_text, summarize, DEFAULT_SUMMARY_SENTENCES,
};
use gameday_lab::assistants::{ChatSession, Persona};
use gameday_lab::config::Config;
use gameday_lab::data::save_value_bets_to_csv;
use gameday_lab::fetch_dashboard_data;
use gameday_lab::odds::{
    american_odds_to_probability, american_to_decimal, calculate_expected_value, edge,
    is_valid_american_odds, is_value_bet, kelly_fraction,
};
use gameday_lab::parlay::{price_parlay, ParlayLeg};
use gameday_lab::sentiment::SentimentAnalyzer;
use gameday_lab::Sport;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gameday")]
#[command(about = "Betting math, value bets and small assistant tools", long_about = None)]
struct Cli {
    /// Read odds and schedules from the cache directory when present
    #[arg(long, global = true)]
    use_cache: bool,

    /// Never call external APIs
    #[arg(long, global = true)]
    offline: bool,

    /// Sport to analyze (nfl, nba, mlb, nhl, ncaaf, ncaab)
    #[arg(long, global = true)]
    sport: Option<Sport>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert American odds and compare them with a model probability
    Odds {
        #[arg(allow_negative_numbers = true)]
        odds: i32,
        /// Your win probability, 0-1
        #[arg(long)]
        model_prob: Option<f64>,
    },
    /// Kelly stake for a win probability at American odds
    Kelly {
        probability: f64,
        #[arg(allow_negative_numbers = true)]
        odds: i32,
        /// Bankroll to size the stake against
        #[arg(long)]
        bankroll: Option<f64>,
    },
    /// Score the sentiment of a piece of text
    Sentiment {
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// List value bets for a sport
    ValueBets {
        /// Only show the best N bets
        #[arg(long)]
        top: Option<usize>,
        /// Also write the bets to this CSV file
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Price a parlay from legs written as GAME:SELECTION:ODDS[:PROB]
    Parlay {
        #[arg(required = true)]
        legs: Vec<String>,
        #[arg(long, default_value = "10")]
        stake: f64,
    },
    /// Ask one of the assistants a question
    Ask {
        /// fitness, qa or summarizer
        persona: Persona,
        #[arg(required = true)]
        message: Vec<String>,
    },
    /// Summarize a news article from a URL or a text file
    Summarize {
        #[arg(long, conflicts_with = "file")]
        url: Option<String>,
        #[arg(long)]
        file: Option<PathBuf>,
        #[arg(long, default_value_t = DEFAULT_SUMMARY_SENTENCES)]
        sentences: usize,
    },
    /// Label an image file
    Classify { path: PathBuf },
}

fn parse_leg(leg: &str) -> Result<ParlayLeg> {
    let parts: Vec<&str> = leg.split(':').collect();
    let (game_id, selection, odds, prob) = match parts.as_slice() {
        [game_id, selection, odds] => (*game_id, *selection, *odds, None),
        [game_id, selection, odds, prob] => (*game_id, *selection, *odds, Some(*prob)),
        _ => anyhow::bail!("Leg '{}' should look like GAME:SELECTION:ODDS[:PROB]", leg),
    };

    Ok(ParlayLeg {
        game_id: game_id.to_string(),
        selection: selection.to_string(),
        odds: odds
            .parse()
            .with_context(|| format!("Invalid odds in leg '{}'", leg))?,
        model_prob: prob
            .map(|p| p.parse())
            .transpose()
            .with_context(|| format!("Invalid probability in leg '{}'", leg))?,
    })
}

fn llm_client(config: &Config) -> Result<Option<LlmClient>> {
    match &config.llm_api_key {
        Some(key) if !config.offline => Ok(Some(LlmClient::new(
            key.clone(),
            config.llm_base_url.clone(),
            config.llm_model.clone(),
            config.http_timeout,
        )?)),
        _ => Ok(None),
    }
}

/// Print remaining Odds API quota. A failed check is logged, not fatal.
async fn report_usage(client: &OddsApiClient) -> Option<OddsApiUsage> {
    match client.check_usage().await {
        Ok(usage) => {
            println!(
                "\nOdds API requests remaining: {}, used: {}",
                usage.remaining.as_deref().unwrap_or("unknown"),
                usage.used.as_deref().unwrap_or("unknown")
            );
            Some(usage)
        }
        Err(e) => {
            tracing::warn!("Failed to check Odds API usage: {:?}", e);
            None
        }
    }
}

async fn load_article(config: &Config, url: Option<String>, file: Option<PathBuf>) -> Result<String> {
    match (url, file) {
        (Some(url), _) => {
            anyhow::ensure!(
                !config.offline,
                "Article fetching is disabled in offline mode, pass --file instead"
            );
            let client = reqwest::Client::builder()
                .timeout(config.http_timeout)
                .build()
                .context("Failed to build HTTP client")?;
            fetch_article_text(&client, &url).await
        }
        (None, Some(file)) => std::fs::read_to_string(&file)
            .with_context(|| format!("Failed to read {}", file.display())),
        (None, None) => anyhow::bail!("Pass --url or --file"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::from_env()?;
    config.use_cache |= cli.use_cache;
    config.offline |= cli.offline;
    let sport = cli.sport.unwrap_or(config.default_sport);

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    match cli.command {
        Commands::Odds { odds, model_prob } => {
            anyhow::ensure!(
                is_valid_american_odds(odds),
                "American odds must be between 100 and 100000 in magnitude, got {}",
                odds
            );
            println!("Odds:                 {:+}", odds);
            println!("Decimal odds:         {:.3}", american_to_decimal(odds));
            println!(
                "Implied probability:  {:.1}%",
                american_odds_to_probability(odds) * 100.0
            );

            if let Some(prob) = model_prob {
                anyhow::ensure!(
                    (0.0..=1.0).contains(&prob),
                    "Model probability must be between 0 and 1"
                );
                println!("Model probability:    {:.1}%", prob * 100.0);
                println!("Edge:                 {:+.2}%", edge(prob, odds) * 100.0);
                println!(
                    "Expected value:       {:+.2}%",
                    calculate_expected_value(prob, odds) * 100.0
                );
                println!(
                    "Kelly fraction:       {:.2}%",
                    kelly_fraction(prob, american_to_decimal(odds)) * 100.0
                );
                if is_value_bet(prob, odds, config.value_margin) {
                    println!("\nValue bet at a {:.1}% margin", config.value_margin * 100.0);
                } else {
                    println!("\nNo value at a {:.1}% margin", config.value_margin * 100.0);
                }
            }
        }
        Commands::Kelly {
            probability,
            odds,
            bankroll,
        } => {
            anyhow::ensure!(
                is_valid_american_odds(odds),
                "American odds must be between 100 and 100000 in magnitude, got {}",
                odds
            );
            let fraction = kelly_fraction(probability, american_to_decimal(odds));
            println!("Kelly fraction: {:.2}% of bankroll", fraction * 100.0);
            if let Some(bankroll) = bankroll {
                println!("Full Kelly stake:    {:.2}", bankroll * fraction);
                println!("Quarter Kelly stake: {:.2}", bankroll * fraction / 4.0);
            }
            if fraction == 0.0 {
                println!("No edge, no bet.");
            }
        }
        Commands::Sentiment { text } => {
            let score = SentimentAnalyzer::new().analyze(&text.join(" "))?;
            println!("{}", score.format());
        }
        Commands::ValueBets { top, csv } => {
            println!("{} value bets\n", sport);
            let data = fetch_dashboard_data(&config, sport).await?;
            println!(
                "Loaded {} games and {} feature rows ({:?} data)\n",
                data.games_with_odds.len(),
                data.feature_rows.len(),
                data.source
            );

            let mut bets = data.value_bets;
            if let Some(top) = top {
                bets.truncate(top);
            }

            if bets.is_empty() {
                println!("No value bets found.");
            } else {
                println!("Top {} Value Bets:\n", bets.len());
                for (i, bet) in bets.iter().enumerate() {
                    println!("{}. {}", i + 1, bet.format());
                }
            }

            if let Some(path) = csv {
                save_value_bets_to_csv(&bets, &path)?;
                println!("\nSaved value bets to {}", path.display());
            }

            // Check API usage
            if let (Some(key), false) = (&config.odds_api_key, config.offline) {
                let client = OddsApiClient::new(key.clone(), config.http_timeout)?;
                report_usage(&client).await;
            }
        }
        Commands::Parlay { legs, stake } => {
            let legs = legs
                .iter()
                .map(|leg| parse_leg(leg))
                .collect::<Result<Vec<_>>>()?;
            let quote = price_parlay(&legs, stake)?;

            println!("{}-leg parlay, stake {:.2}", quote.legs, quote.stake);
            println!(
                "Odds:        {:+} ({:.3} decimal)",
                quote.american_odds, quote.decimal_odds
            );
            println!("Implied:     {:.2}%", quote.implied_prob * 100.0);
            println!("Payout:      {:.2} (profit {:.2})", quote.payout, quote.profit);
            if let (Some(prob), Some(ev)) = (quote.model_prob, quote.expected_value) {
                println!("Model:       {:.2}%", prob * 100.0);
                println!("EV:          {:+.2}", ev);
            }
        }
        Commands::Ask { persona, message } => {
            let llm = llm_client(&config)?;
            let mut conversation = ChatSession::new(persona);
            let reply = conversation.reply(llm.as_ref(), &message.join(" ")).await?;
            println!("{}", reply.content);
            if reply.offline {
                println!("\n(offline answer)");
            }
        }
        Commands::Summarize {
            url,
            file,
            sentences,
        } => {
            let text = load_article(&config, url, file).await?;

            let llm = llm_client(&config)?;
            let summary = summarize(llm.as_ref(), &text, sentences).await;
            println!("{}", summary.summary);
            if summary.offline {
                println!("\n(extractive summary)");
            }
        }
        Commands::Classify { path } => {
            let bytes = std::fs::read(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let classification = classify(&bytes)?;
            println!(
                "{:?} image, {} bytes",
                classification.format, classification.size_bytes
            );
            for (i, prediction) in classification.predictions.iter().enumerate() {
                println!(
                    "{}. {} ({:.1}%)",
                    i + 1,
                    prediction.label,
                    prediction.confidence * 100.0
                );
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn offline_config() -> Config {
        Config::from_lookup(|key| (key == "OFFLINE").then(|| "1".to_string())).unwrap()
    }

    #[test]
    fn test_parse_leg() {
        let leg = parse_leg("g1:Lions:-110:0.6").unwrap();
        assert_eq!(leg.game_id, "g1");
        assert_eq!(leg.odds, -110);
        assert_eq!(leg.model_prob, Some(0.6));
        assert_eq!(parse_leg("g2:Chiefs:150").unwrap().model_prob, None);
        assert!(parse_leg("g3:Chiefs").is_err());
        assert!(parse_leg("g3:Chiefs:even").is_err());
    }

    #[tokio::test]
    async fn test_offline_summarize_refuses_url() {
        let config = offline_config();
        assert!(config.offline);
        let err = load_article(&config, Some("http://127.0.0.1:9/story".to_string()), None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("offline"));
    }

    #[tokio::test]
    async fn test_summarize_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("story.txt");
        std::fs::write(&path, "The Lions won again.").unwrap();

        let text = load_article(&offline_config(), None, Some(path)).await.unwrap();
        assert_eq!(text, "The Lions won again.");
        assert!(load_article(&offline_config(), None, None).await.is_err());
    }

    #[tokio::test]
    async fn test_usage_failure_is_not_fatal() {
        let client = OddsApiClient::with_base_url(
            "test-key".to_string(),
            "http://127.0.0.1:9".to_string(),
            Duration::from_secs(2),
        )
        .unwrap();
        assert!(report_usage(&client).await.is_none());
    }
}

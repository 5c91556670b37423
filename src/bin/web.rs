use anyhow::{Context, Result};
use gameday_lab::config::Config;
use gameday_lab::web::{router, AppState};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let bind_addr = config.bind_addr.clone();
    let default_sport = config.default_sport;
    let state = AppState::from_config(config).await?;

    println!("Fetching {} betting data...", default_sport);

    // Warm the default dashboard; other sports load on first visit
    match state.dashboard(default_sport).await {
        Ok(data) => {
            println!("Data loaded successfully ({:?})", data.source);
            println!("  - {} games with odds", data.games_with_odds.len());
            println!("  - {} feature rows", data.feature_rows.len());
            println!("  - {} value bets", data.value_bets.len());
        }
        Err(e) => {
            eprintln!("Error fetching data: {:?}", e);
            eprintln!("Server will start but pages may show errors");
        }
    }

    if state.llm.is_none() {
        println!("LLM_API_KEY not set, assistants will answer offline");
    }
    if state.config.webhook_secret.is_none() {
        println!("WEBHOOK_SECRET not set, payment webhooks are disabled");
    }

    let app = router(state)
        .nest_service("/static", ServeDir::new("static"))
        .layer(TraceLayer::new_for_http());

    println!("\nStarting web server at http://{}", bind_addr);
    println!("Press Ctrl+C to stop\n");

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

use skillgate::db::{self, run_migrations};
use skillgate::{Config, Services, logging};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    logging::init();

    if let Err(e) = run().await {
        error!(error = %e, code = e.code().as_u16(), "❌ startup failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), skillgate::AppError> {
    let config = Config::from_env()?;
    info!(
        k = config.elo.k,
        spread = config.elo.spread,
        reserved_id_threshold = config.reserved_id_threshold,
        "🐙 Starting..."
    );

    let pool = db::connect(&config.database_url, 5).await?;
    run_migrations(&pool, config.reserved_id_threshold).await?;

    let services = Services::new(pool, &config)?;
    let ranked = services.ranking.leaderboard_size().await?;
    info!(ranked, "📊 database ready");

    Ok(())
}

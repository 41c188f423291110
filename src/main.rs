use std::sync::Arc;

use anyhow::Context;
use badgerexchange::{
    config::Config,
    feed::{FeedRanker, HttpRecommender, NoRecommender, Recommend},
    router,
    store::{demo_seed, Store},
    AppState,
};
use tokio::{net::TcpListener, signal};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::load()?;

    let store = Store::connect(&config.database_url, config.max_connections)
        .await
        .context("could not open the database")?
        .with_retry(config.retry);
    store.migrate().await.context("could not apply the schema")?;

    if config.seed_demo {
        store.seed(demo_seed()?).await.context("could not seed demo data")?;
    }

    let oracle: Arc<dyn Recommend> = match &config.recommender_url {
        Some(url) => {
            info!("using recommender at {url}");
            Arc::new(HttpRecommender::new(url))
        }
        None => {
            warn!("RECOMMENDER_URL not set, feeds will be chronological");
            Arc::new(NoRecommender)
        }
    };

    let state = AppState {
        store,
        ranker: FeedRanker::new(oracle, config.recommender_timeout),
    };
    let app = router(state, config.session_minutes);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("could not bind {}", config.bind_addr))?;
    info!("listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            signal::ctrl_c().await.ok();
            info!("shutting down");
        })
        .await?;

    Ok(())
}

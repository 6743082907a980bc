use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use tagwatch_common::Config;
use tagwatch_scout::fetch::BrowserlessFetcher;
use tagwatch_scout::notify::NotifyChannel;
use tagwatch_scout::scout::Scout;
use tagwatch_store::PostgresPostStore;

#[derive(Parser)]
#[command(about = "Tagwatch scout: scrape, reconcile, notify")]
struct Args {
    /// Run the pipeline once and exit instead of looping on the interval.
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("tagwatch_scout=info".parse()?))
        .init();

    let args = Args::parse();
    info!("Tagwatch scout starting...");

    let config = Config::from_env();

    let store = PostgresPostStore::connect(&config.database_url).await?;
    store.migrate().await?;

    let fetcher = Arc::new(BrowserlessFetcher::new(
        &config.browserless_url,
        config.browserless_token.as_deref(),
        Duration::from_secs(config.fetch_timeout_secs),
    ));

    let channel: Option<Arc<dyn NotifyChannel>> =
        match (&config.telegram_bot_token, &config.telegram_chat_id) {
            (Some(token), Some(chat_id)) => Some(Arc::new(
                telegram_client::TelegramClient::new(token, chat_id),
            )),
            _ => None,
        };

    let scout = Scout::new(
        &config.monitor(),
        fetcher,
        Arc::new(store),
        channel,
        Duration::from_millis(config.request_delay_ms),
    );

    if args.once {
        let stats = scout.run().await?;
        info!(%stats, "Run complete");
        return Ok(());
    }

    info!(
        interval_secs = config.check_interval_secs,
        "Entering scheduled loop"
    );
    let mut ticker = tokio::time::interval(Duration::from_secs(config.check_interval_secs));
    loop {
        ticker.tick().await;
        match scout.run().await {
            Ok(stats) => info!(%stats, "Scheduled run complete"),
            Err(e) => error!(error = %e, "Scheduled run failed"),
        }
    }
}

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::bail;
use clap::Parser;
use pf_app::FeedRenderer;
use pf_core::feed::FeedStatus;
use pf_core::poll::PollListItem;
use pollfeed_lib::bootstrap::settings::TOKEN_ENV;
use pollfeed_lib::bootstrap::tracing::init_tracing_subscriber;
use pollfeed_lib::bootstrap::{load_or_default, parse_feed, wire_feed, FeedSettings};
use pollfeed_lib::console::{ConsoleRenderer, ScrollDriver};
use tracing::{info, warn};

const SETTLE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Parser)]
#[command(name = "pollfeed")]
#[command(about = "Scroll a poll feed in the terminal", long_about = None)]
struct Cli {
    /// Config file (default: <config dir>/pollfeed/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Feed to scroll as <kind>:<value>, kind one of polls, voted, shared,
    /// bookmarked, category, search
    #[arg(short, long)]
    feed: Option<String>,

    /// Serve N generated polls from memory instead of the API
    #[arg(long, value_name = "N")]
    demo: Option<usize>,

    /// Stop after scrolling N pages
    #[arg(short, long, default_value_t = 20)]
    pages: usize,

    /// Viewport height in rows
    #[arg(long, default_value_t = 24.0)]
    rows: f64,

    /// Retries after a failed page before giving up
    #[arg(long, default_value_t = 2)]
    retries: usize,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = load_or_default(cli.config.as_deref())?;
    let feed = cli.feed.as_deref().map(parse_feed).transpose()?;
    let settings = FeedSettings::resolve(
        &config,
        std::env::var(TOKEN_ENV).ok(),
        cli.demo,
        feed.as_ref(),
    )?;

    init_tracing_subscriber(&settings.log_level, settings.log_dir.as_deref())?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run(&cli, settings))
}

async fn run(cli: &Cli, settings: FeedSettings) -> anyhow::Result<()> {
    let Some(filter) = settings.filter.clone() else {
        bail!("no feed selected: pass --feed <kind>:<value> or set [feed.filter]");
    };

    let wiring = wire_feed(&settings).await?;
    wiring.orchestrator.set_filter(Some(filter)).await;

    let renderer = FeedRenderer::<PollListItem>::new(Arc::new(ConsoleRenderer::stdout()));
    let mut driver = ScrollDriver::new(
        Arc::clone(&wiring.orchestrator),
        renderer,
        cli.rows,
        SETTLE_TIMEOUT,
    );

    let mut retries_left = cli.retries;
    loop {
        let snapshot = driver.run(cli.pages).await?;
        info!(
            items = snapshot.item_count(),
            page = snapshot.current_page,
            total_pages = snapshot.bounds.total_pages,
            "scroll stopped"
        );

        match &snapshot.status {
            FeedStatus::Error { message } if retries_left > 0 => {
                retries_left -= 1;
                warn!(%message, retries_left, "page failed, retrying");
                wiring.orchestrator.retry().await;
            }
            FeedStatus::Error { message } => bail!("feed failed: {message}"),
            _ => return Ok(()),
        }
    }
}

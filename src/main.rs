use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::{watch, Notify};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use masterchef_dashboard::api::{self, AppState};
use masterchef_dashboard::config::Config;
use masterchef_dashboard::models::DashboardSnapshot;
use masterchef_dashboard::services::dashboard::{drive, FETCH_FAILED_MESSAGE};
use masterchef_dashboard::services::presenter::render_page;
use masterchef_dashboard::services::{PoolAggregator, PoolQuery, SortKey, Tier};
use masterchef_dashboard::sources::chain::RpcChainReader;
use masterchef_dashboard::sources::coingecko::CoinGecko;
use masterchef_dashboard::sources::price::PriceApiClient;

#[derive(Parser)]
#[command(name = "masterchef-dashboard", about = "MasterChef staking pool dashboard")]
struct Cli {
    /// Path to the TOML config file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Aggregate every pool once and print a table page
    Pools(QueryArgs),
    /// Serve the dashboard API and the price endpoint
    Serve,
}

#[derive(Args)]
struct QueryArgs {
    #[arg(long, value_enum, default_value_t = SortKey::Index)]
    sort: SortKey,
    #[arg(long)]
    desc: bool,
    /// Case-insensitive match on symbol or LP address
    #[arg(long)]
    filter: Option<String>,
    #[arg(long, value_enum, default_value_t = Tier::All)]
    tier: Tier,
    #[arg(long)]
    active_only: bool,
    #[arg(long, default_value_t = 1)]
    page: usize,
    #[arg(long, default_value_t = 10)]
    page_size: usize,
}

impl From<QueryArgs> for PoolQuery {
    fn from(args: QueryArgs) -> Self {
        PoolQuery {
            sort: args.sort,
            desc: args.desc,
            filter: args.filter,
            tier: args.tier,
            active_only: args.active_only,
            page: args.page,
            page_size: args.page_size,
        }
    }
}

fn build_aggregator(config: &Config) -> anyhow::Result<PoolAggregator> {
    let chain = RpcChainReader::new(
        &config.chain.rpc_url,
        config.chain.masterchef()?,
        config.chain.request_timeout(),
    )
    .context("failed to build RPC client")?;
    let prices = PriceApiClient::new(&config.price.base_url, config.price.timeout())
        .context("failed to build price client")?;

    Ok(PoolAggregator::new(Arc::new(chain), Arc::new(prices), &config.pipeline))
}

async fn run_pools(config: Config, query: PoolQuery) -> anyhow::Result<()> {
    let aggregator = build_aggregator(&config)?;

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} pools ({percent}%)")?
            .progress_chars("=>-"),
    );

    let result = aggregator
        .run(|session| {
            pb.set_length(session.total());
            pb.set_position(session.completed());
        })
        .await;
    pb.finish_and_clear();

    let session = match result {
        Ok(session) => session,
        Err(e) => {
            tracing::error!("{}", e);
            anyhow::bail!(FETCH_FAILED_MESSAGE);
        }
    };

    if !session.dropped().is_empty() {
        println!("⚠️  {} pools could not be read: {:?}", session.dropped().len(), session.dropped());
    }

    let records = session.into_records();
    println!("{}", render_page(&query.apply(&records)));
    Ok(())
}

async fn run_server(config: Config) -> anyhow::Result<()> {
    let aggregator = Arc::new(build_aggregator(&config)?);
    let feed = CoinGecko::new(&config.price.upstream_url, &config.price.platform)
        .context("failed to build upstream price client")?;

    let (tx, rx) = watch::channel(DashboardSnapshot::default());
    let refresh = Arc::new(Notify::new());

    let state = Arc::new(AppState {
        snapshot: rx,
        refresh: refresh.clone(),
    });
    let app = api::create_router(state, Arc::new(feed));

    // Bind before the first pass so it can reach our own price endpoint.
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    println!("\n✓ Server ready on http://{}\n", addr);

    tokio::spawn(drive(aggregator, tx, refresh));

    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main(worker_threads = 4)]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,masterchef_dashboard=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = Config::load(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("✓ Configuration loaded");

    match cli.command {
        Command::Pools(args) => run_pools(config, args.into()).await,
        Command::Serve => run_server(config).await,
    }
}

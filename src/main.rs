use std::sync::Arc;

use anyhow::Context;
use autotrader::api::{BybitClient, MarketDataProvider, OrderGateway};
use autotrader::config::BotConfig;
use autotrader::execution::PaperGateway;
use autotrader::persistence::{RedisTradeStateStore, TradeStateStore};
use autotrader::scheduler::{SessionRegistry, SessionSpec, StatusEvent};
use clap::{Parser, Subcommand};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "autotrader", about = "Indicator-driven spot trading bot", version)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Log level for this crate (overridden by RUST_LOG)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one trading session per configured symbol until Ctrl+C
    Run,
    /// Print the latest close for a symbol
    Price {
        symbol: String,
        #[arg(short, long, default_value = "15")]
        interval: String,
    },
    /// Print the venue balance
    Balance,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_logging(&cli.log_level);

    let config = BotConfig::load(cli.config.as_deref()).context("invalid configuration")?;

    match cli.command {
        Command::Run => run(config).await,
        Command::Price { symbol, interval } => {
            let client = BybitClient::new(&config.exchange)?;
            let price = client.latest_price(&symbol, &interval).await?;
            println!("{} {:.4}", symbol, price);
            Ok(())
        }
        Command::Balance => {
            let balance = paper_gateway(&config).get_balance().await?;
            println!(
                "available {:.2} / total {:.2}",
                balance.available, balance.total
            );
            Ok(())
        }
    }
}

// ============================================================================
// Initialization Functions
// ============================================================================

fn setup_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("autotrader={}", level)));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn paper_gateway(config: &BotConfig) -> PaperGateway {
    PaperGateway::new(
        config.paper.available_balance,
        config.paper.total_balance,
        config.paper.min_notional,
    )
    .with_history_limit(config.paper.history_limit)
}

async fn connect_checkpoint_store(redis_url: Option<&str>) -> Option<Arc<dyn TradeStateStore>> {
    let redis_url = redis_url?;

    match RedisTradeStateStore::new(redis_url).await {
        Ok(store) => {
            tracing::info!("Trade state checkpoints enabled at {}", redis_url);
            Some(Arc::new(store))
        }
        Err(e) => {
            tracing::warn!(
                "Failed to connect to Redis ({}), continuing without checkpoints",
                e
            );
            None
        }
    }
}

// ============================================================================
// Trading
// ============================================================================

async fn run(config: BotConfig) -> anyhow::Result<()> {
    tracing::info!("🚀 Autotrader starting");

    let feed: Arc<dyn MarketDataProvider> = Arc::new(BybitClient::new(&config.exchange)?);
    let paper = Arc::new(paper_gateway(&config));
    let gateway: Arc<dyn OrderGateway> = paper.clone();

    match gateway.get_balance().await {
        Ok(balance) => tracing::info!(
            "💰 Balance: {:.2} available / {:.2} total",
            balance.available,
            balance.total
        ),
        Err(e) => tracing::warn!("Failed to fetch balance: {}", e),
    }

    let mut registry = SessionRegistry::new(feed, gateway);
    if let Some(store) = connect_checkpoint_store(config.redis_url.as_deref()).await {
        registry = registry.with_store(store);
    }

    tracing::info!("\n📊 Configuration:");
    tracing::info!("  Poll interval: {}s", config.trading.poll_interval_secs);
    tracing::info!("  Candle window: {}", config.trading.candle_window);
    tracing::info!(
        "  Stop loss: {}% / Take profit: {}%",
        config.risk.stop_loss_pct * 100.0,
        config.risk.take_profit_pct * 100.0
    );

    for session in &config.trading.sessions {
        let (_, mut events) = registry
            .start_and_subscribe(SessionSpec::from_config(session, &config))
            .await
            .with_context(|| format!("failed to start session for {}", session.symbol))?;

        tracing::info!(
            "    - {} every {} (base qty {})",
            session.symbol,
            session.interval,
            session.base_qty
        );

        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => log_event(&event),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("Status log skipped {} events", skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
    }

    tracing::info!("\nPress Ctrl+C to stop...\n");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl+C")?;
    tracing::info!("\n⚠️  Received Ctrl+C, waiting for running cycles...");

    registry.stop_all().await;
    tracing::info!("📝 {} paper orders accepted", paper.accepted_count());

    tracing::info!("👋 Autotrader stopped");
    Ok(())
}

fn log_event(event: &StatusEvent) {
    let status = &event.status;

    if let Some(error) = &status.last_error {
        tracing::warn!(
            "📉 {} cycle {}: failed ({})",
            status.symbol,
            status.cycles,
            error
        );
        return;
    }

    tracing::info!(
        "📈 {} cycle {}: {:?} @ {:.4} | RSI {:.1} | vol {:.4} | last {:?} x{}",
        status.symbol,
        status.cycles,
        event.signal,
        status.last_price.unwrap_or_default(),
        status.last_rsi.unwrap_or_default(),
        status.last_volatility.unwrap_or_default(),
        status.last_action,
        status.consecutive_trades
    );

    if let Some(order) = &event.order {
        tracing::info!("  ✓ {} {} order {}", order.symbol, order.side, order.order_id);
    }
}

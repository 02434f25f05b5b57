//! Trading Engine - Main Entry Point

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn, Level};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;
use trading_engine::config::Config;
use trading_engine::engine::{
    AlertSink, EngineSettings, ExitReason, LogAlertSink, NoopAlertSink, TradingEngine,
};
use trading_engine::exchange::{BinanceSpotClient, PaperExchange, TradingApi};
use trading_engine::strategy::{bind_strategies, StrategyRegistry};
use trading_engine::utils::format_amount;

/// Trading Engine CLI
#[derive(Parser)]
#[command(name = "trading-engine")]
#[command(version, about = "Single-exchange trading engine with emergency stop")]
struct Cli {
    /// Path to the TOML config file
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the trading engine (default)
    Run,
    /// Load and validate the config, then exit
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging()?;

    let config = Config::load(&cli.config)?;
    config.validate().context("Invalid configuration")?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::CheckConfig => {
            log_config(&config);
            info!("✅ Configuration is valid");
            Ok(())
        }
        Commands::Run => run(config).await,
    }
}

async fn run(config: Config) -> Result<()> {
    info!("╔════════════════════════════════════════════════════════════╗");
    info!(
        "║              Trading Engine v{}                          ║",
        env!("CARGO_PKG_VERSION")
    );
    info!("╚════════════════════════════════════════════════════════════╝");
    log_config(&config);

    let exchange = build_exchange(&config)?;
    let registry = StrategyRegistry::with_builtins();
    let bindings = bind_strategies(&config, exchange.clone(), &registry)?;
    if bindings.is_empty() {
        warn!("⚠️  No enabled markets configured - only the emergency stop will run");
    }

    let alerter: Arc<dyn AlertSink> = if config.alerts.enabled {
        Arc::new(LogAlertSink)
    } else {
        info!("Critical alerts are disabled");
        Arc::new(NoopAlertSink)
    };

    let engine = Arc::new(TradingEngine::new(
        EngineSettings::from(&config.engine),
        exchange,
        bindings,
        alerter,
    ));

    let signal_engine = engine.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("🛑 Shutdown signal received");
            signal_engine.shutdown();
        }
    });

    let summary = engine.start().await?;
    info!(
        "👋 Trading engine stopped after {} cycles ({} failed)",
        summary.cycles, summary.failed_cycles
    );

    match summary.exit {
        ExitReason::ShutdownRequested => Ok(()),
        ExitReason::Halted(kind) => {
            error!("Manual intervention required before restarting");
            anyhow::bail!("trading engine halted on {} fault", kind)
        }
    }
}

fn build_exchange(config: &Config) -> Result<Arc<dyn TradingApi>> {
    let exchange: Arc<dyn TradingApi> = match config.exchange.adapter.as_str() {
        "paper" => {
            info!("📝 Using paper exchange adapter");
            let balances = config
                .exchange
                .paper_balances
                .iter()
                .map(|(currency, amount)| (currency.to_uppercase(), *amount))
                .collect();
            Arc::new(PaperExchange::new(balances))
        }
        "binance" => {
            warn!("⚠️  LIVE exchange adapter - Real money at risk!");
            Arc::new(
                BinanceSpotClient::new(&config.exchange.binance)
                    .context("Failed to create Binance client")?,
            )
        }
        other => anyhow::bail!("unknown exchange adapter '{}'", other),
    };
    Ok(exchange)
}

/// Initialize stdout and rolling file logging.
fn init_logging() -> Result<()> {
    use tracing_subscriber::fmt::writer::MakeWriterExt;

    std::fs::create_dir_all("logs")?;

    let file_appender = tracing_appender::rolling::hourly("logs", "trading-engine.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    // Keep the writer guard alive for the program duration
    Box::leak(Box::new(guard));

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("trading_engine=debug".parse()?)
                .add_directive(Level::INFO.into()),
        )
        .with_writer(std::io::stdout.and(file_writer))
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .init();

    Ok(())
}

/// Log configuration on startup.
fn log_config(config: &Config) {
    info!("📋 Configuration:");
    info!(
        "   Trade Cycle Interval: {}s",
        config.engine.trade_cycle_interval
    );
    info!(
        "   Emergency Stop: {} {}",
        format_amount(config.engine.emergency_stop_balance),
        config.engine.emergency_stop_currency
    );
    info!("   Exchange Adapter: {}", config.exchange.adapter);
    info!("   Strategies: {}", config.strategies.len());
    for market in &config.markets {
        info!(
            "   Market {} ({}/{}) -> {}{}",
            market.label,
            market.base_currency,
            market.counter_currency,
            market.strategy,
            if market.enabled { "" } else { " [disabled]" }
        );
    }
    info!(
        "   Critical Alerts: {}",
        if config.alerts.enabled { "on" } else { "off" }
    );
}

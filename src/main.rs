use clap::Parser;
use tick_digits::cli::{Cli, Commands};
use tick_digits::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let (config, load_error) = match Config::load(&cli.config) {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };

    // Initialize telemetry
    tick_digits::telemetry::init_telemetry(&config.telemetry)?;
    if let Some(e) = load_error {
        tracing::warn!(path = %cli.config, error = %e, "Could not load config, using defaults");
    }

    match cli.command {
        Commands::Run(args) => {
            tracing::info!(symbol = %args.symbol, "Starting live session");
            args.execute(&config).await?;
        }
        Commands::History(args) => {
            args.execute(&config).await?;
        }
        Commands::Config => {
            println!("Current configuration:");
            println!("  Feed: {}", config.feed.url);
            if !config.feed.symbols.is_empty() {
                println!("  Symbols: {}", config.feed.symbols.join(", "));
            }
            println!(
                "  Reconnect: {} attempts, {}ms base delay",
                config.feed.max_reconnect_attempts, config.feed.reconnect_base_delay_ms
            );
            println!(
                "  Stats: window={}, filter={:?}",
                config.stats.window_size, config.stats.filter
            );
            println!("  Tracker: pip_decimals={}", config.tracker.pip_decimals);
            println!("  Execution: payout_ratio={}", config.execution.payout_ratio);
        }
    }

    Ok(())
}

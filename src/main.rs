use clap::Parser;
use connpool::config::Config;
use connpool::{ConnPoolError, ConnectionPool, PoolStats, Result};
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[cfg(feature = "fast-allocator")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser, Debug)]
#[command(name = "connpool")]
#[command(about = "Exercise a pooled set of outbound TCP connections", long_about = None)]
#[command(version)]
struct Args {
    /// Targets to connect to (host or host:port)
    targets: Vec<String>,

    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Generate example configuration file
    #[arg(long, value_name = "FILE")]
    generate_config: Option<PathBuf>,

    /// Log level (overrides config)
    #[arg(long)]
    log_level: Option<String>,

    /// Checkout/return cycles per target
    #[arg(long, default_value = "2")]
    rounds: u32,

    /// Payload written on every checkout; the echoed reply is read back
    #[arg(long)]
    payload: Option<String>,

    /// Bound each dial (milliseconds)
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Keep-alive override (seconds)
    #[arg(long)]
    keep_alive: Option<u64>,

    /// Wait this long after the last round to watch idle eviction
    #[arg(long, default_value = "0")]
    linger_secs: u64,

    /// Print pool statistics as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Handle config generation
    if let Some(config_path) = &args.generate_config {
        println!("Generating example configuration file: {:?}", config_path);
        Config::create_example(config_path)?;
        println!("Example configuration file created successfully!");
        return Ok(());
    }

    let config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => Config::default(),
    };

    let level = args.log_level.as_deref().unwrap_or(&config.logging.level);
    init_logging(level, &config.logging.format)?;

    info!("connpool v{} starting", env!("CARGO_PKG_VERSION"));

    if args.targets.is_empty() {
        warn!("No targets given, nothing to do");
        return Ok(());
    }

    let pool = ConnectionPool::new(config.pool.clone());
    if let Some(secs) = args.keep_alive {
        pool.set_keep_alive_timeout(Duration::from_secs(secs));
    }

    for round in 1..=args.rounds {
        for target in &args.targets {
            if let Err(e) = run_cycle(&pool, target, &args).await {
                error!("Round {} to {} failed: {}", round, target, e);
            }
        }
        print_stats(&pool.stats(), args.json)?;
    }

    if args.linger_secs > 0 {
        info!("Lingering {}s to let idle connections expire", args.linger_secs);
        tokio::time::sleep(Duration::from_secs(args.linger_secs)).await;
        print_stats(&pool.stats(), args.json)?;
    }

    let closed = pool.close_idle().await;
    info!("Closed {} idle connections, exiting", closed);

    Ok(())
}

async fn run_cycle(pool: &ConnectionPool, target: &str, args: &Args) -> Result<()> {
    let mut conn = match args.timeout_ms {
        Some(ms) => pool.get_with_timeout(target, Duration::from_millis(ms)).await?,
        None => pool.get(target).await?,
    };
    info!("Checked out connection #{} to {}", conn.id(), conn.address());

    if let Some(payload) = &args.payload {
        let exchange = async {
            conn.write_all(payload.as_bytes()).await?;
            let mut reply = vec![0u8; payload.len()];
            conn.read_exact(&mut reply).await?;
            Ok::<_, std::io::Error>(reply)
        };

        let outcome = exchange.await;
        match outcome {
            Ok(reply) => info!("Echo from {}: {}", target, String::from_utf8_lossy(&reply)),
            Err(e) => {
                warn!("Connection #{} broke: {}, removing it", conn.id(), e);
                pool.remove(conn).await;
                return Err(e.into());
            }
        }
    }

    pool.put(conn);
    Ok(())
}

fn print_stats(stats: &PoolStats, json: bool) -> Result<()> {
    if json {
        let rendered = serde_json::to_string(stats)
            .map_err(|e| ConnPoolError::Config(format!("Failed to render stats: {}", e)))?;
        println!("{}", rendered);
    } else {
        println!(
            "destinations={} total={} idle={} busy={} keep_alive={}ms",
            stats.destinations, stats.total, stats.idle, stats.busy, stats.keep_alive_ms
        );
    }
    Ok(())
}

fn init_logging(level: &str, format: &str) -> Result<()> {
    let env_filter = EnvFilter::try_new(level)
        .map_err(|e| ConnPoolError::Config(format!("Invalid log level: {}", e)))?;

    let registry = tracing_subscriber::registry().with(env_filter);
    if format == "json" {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }

    Ok(())
}

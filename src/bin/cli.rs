//! CLI for issuing requests against a replicated key-value service

use clap::{Parser, Subcommand};
use replica_client::{Client, Config, HttpTransport, Key};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "replica-client")]
#[command(about = "Client for a replicated key-value service")]
#[command(version)]
struct Cli {
    /// Client configuration file (TOML)
    #[arg(long, default_value = "client.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read a key
    Get {
        /// Key
        key: i64,
    },

    /// Write a value
    Put {
        /// Key
        key: i64,

        /// Value
        value: String,
    },

    /// Issue asynchronous requests and report throughput
    Bench {
        /// Number of operations
        #[arg(long, default_value = "1000")]
        ops: u64,

        /// Size of the key space
        #[arg(long, default_value = "100")]
        keys: i64,

        /// Fraction of operations that are reads
        #[arg(long, default_value = "0.5")]
        reads: f64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let client = Client::new(&config, Arc::new(HttpTransport::new()))?;

    match cli.command {
        Commands::Get { key } => {
            let value = client.get(Key(key)).await?;
            println!("{}", String::from_utf8_lossy(&value));
        }

        Commands::Put { key, value } => {
            client.put(Key(key), value).await?;
            println!("OK");
        }

        Commands::Bench { ops, keys, reads } => {
            anyhow::ensure!(keys > 0, "--keys must be positive");
            anyhow::ensure!((0.0..=1.0).contains(&reads), "--reads must be within 0..=1");
            let read_percent = (reads * 100.0).round() as u64;

            let start = Instant::now();
            for i in 0..ops {
                let key = Key(i as i64 % keys);
                if i % 100 < read_percent {
                    client.get_async(key);
                } else {
                    client.put_async(key, format!("value-{}", i));
                }
            }
            client.wait().await;
            let elapsed = start.elapsed();

            let snapshot = client.tracker().snapshot();
            println!("Benchmark report:");
            println!("  Operations: {}", ops);
            println!("  Succeeded: {}", snapshot.succeeded);
            println!("  Failed: {}", snapshot.failed);
            println!("  Elapsed: {:?}", elapsed);
            println!(
                "  Throughput: {:.1} ops/s",
                ops as f64 / elapsed.as_secs_f64().max(f64::EPSILON)
            );
        }
    }

    Ok(())
}

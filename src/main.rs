use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tvlink::{
    aggregator::Aggregator,
    config::{defaults::DEFAULT_LEGACY_SOURCES_FILE, dotenv_assignments, Config},
    labeling::decode_labels_from_file,
    playlist::save_m3u_file,
};

#[derive(Parser)]
#[command(name = "tvlink")]
#[command(version)]
#[command(about = "Merge M3U playlists into one deduplicated, liveness-checked playlist")]
#[command(long_about = None)]
struct Cli {
    /// Resolve the source labels of an existing playlist instead of generating one
    #[arg(long, value_name = "PATH")]
    decode_file: Option<PathBuf>,

    /// Dotenv file to load before reading the environment (default: .env if present)
    #[arg(long, value_name = "PATH")]
    env_file: Option<PathBuf>,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_filter = format!("tvlink={}", cli.log_level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // The process environment is settled before any runtime thread exists
    load_env_file(cli.env_file.as_deref())?;
    let config = Config::load(cli.env_file.as_deref())?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let decode_file = cli.decode_file;
    runtime.block_on(async {
        match decode_file {
            Some(path) => decode(&config, &path).await,
            None => generate(&config).await,
        }
    })
}

/// Load `KEY=VALUE` pairs from a dotenv file into the process environment.
///
/// Legacy source entries share the file but are not dotenv syntax; only
/// assignment lines reach dotenvy, one at a time, so a bad line is skipped
/// rather than aborting the run.
fn load_env_file(explicit: Option<&Path>) -> Result<()> {
    let path = explicit.unwrap_or_else(|| Path::new(DEFAULT_LEGACY_SOURCES_FILE));
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(_) if explicit.is_none() => return Ok(()),
        Err(e) => anyhow::bail!("Cannot read {}: {}", path.display(), e),
    };

    for line in dotenv_assignments(&content) {
        // Values may be secrets; only the key is logged
        if dotenvy::from_read(line.as_bytes()).is_err() {
            let key = line.split_once('=').map_or(line, |(key, _)| key.trim());
            warn!("Ignoring unparsable assignment of {} in {}", key, path.display());
        }
    }
    Ok(())
}

async fn generate(config: &Config) -> Result<()> {
    config.validate_for_generate()?;
    info!(
        "Aggregating {} sources (validation: {}, labels: {})",
        config.sources.len(),
        if config.validate_streams { "on" } else { "off" },
        config.label_mode
    );

    let aggregator = Aggregator::from_config(config).await?;
    let playlist = aggregator.aggregate(&config.sources).await;

    save_m3u_file(&config.output_file, &playlist.channels).await?;
    Ok(())
}

async fn decode(config: &Config, path: &Path) -> Result<()> {
    let key = config.source_key()?;
    let decoded = decode_labels_from_file(path, key, &config.sources)
        .await
        .with_context(|| format!("Cannot decode labels from {}", path.display()))?;

    if decoded.is_empty() {
        println!("No encrypted source labels found.");
        return Ok(());
    }

    println!("Decoded source labels:");
    for label in decoded {
        println!("{label}");
    }
    Ok(())
}

#![forbid(unsafe_code)]

//! Command-line entry point: collects videos and comments for every channel
//! listed in the channels file and appends them to per-channel CSV files.
//!
//! Input problems (no keys, bad dates) stop the run before the first request.
//! Everything after that is logged and skipped so the remaining channels still
//! get collected.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use yt_channel_collector::api::HttpYoutubeApi;
use yt_channel_collector::collector::{ChannelSummary, Collector};
use yt_channel_collector::config::{SettingsOverrides, resolve_settings};
use yt_channel_collector::inputs::{ChannelRef, read_api_keys, read_channels, read_date_range};
use yt_channel_collector::keys::KeyPool;

#[derive(Debug, Parser)]
#[command(
    name = "collect_channels",
    about = "Collect YouTube video and comment metadata for a list of channels"
)]
struct CollectorArgs {
    /// One API key per line. The first key also serves channel lookups.
    api_keys_file: PathBuf,
    /// Start date then end date, one per line, as DD/MM/YYYY.
    dates_file: PathBuf,
    /// One channel id (UC...) or channel name per line.
    channels_file: PathBuf,
    /// Directory receiving the CSV files (defaults to OUTPUT_DIR or `data`).
    #[arg(long)]
    output_dir: Option<PathBuf>,
    /// Settings file read before the environment.
    #[arg(long)]
    env_file: Option<PathBuf>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();
    let args = CollectorArgs::parse();
    if let Err(err) = run(args) {
        error!("Collection stopped: {err:#}");
    }
}

fn run(args: CollectorArgs) -> Result<()> {
    let settings = resolve_settings(SettingsOverrides {
        output_dir: args.output_dir,
        env_path: args.env_file,
    })?;
    let keys = KeyPool::new(read_api_keys(&args.api_keys_file)?)?;
    let window = read_date_range(&args.dates_file)?;
    let channels = read_channels(&args.channels_file)?;

    println!("===================================");
    println!("YouTube Channel Collector");
    println!("===================================");
    println!("API keys: {}", keys.len());
    println!("Period: {} to {}", window.start(), window.end());
    println!("Channels: {}", channels.len());
    println!("Output directory: {}", settings.output_dir.display());
    println!();

    let api = HttpYoutubeApi::new(&settings.api_base_url, settings.http_timeout);
    let mut collector = Collector::new(api, keys, settings.pacing);
    let mut summaries = Vec::new();

    for channel in &channels {
        let channel_id = match channel {
            ChannelRef::Id(id) => id.clone(),
            ChannelRef::Name(name) => {
                info!("Resolving id for channel {name}");
                match collector.resolve_channel_id(name) {
                    Ok(id) => id,
                    Err(err) => {
                        warn!("Could not resolve channel {name}: {err}. Skipping");
                        continue;
                    }
                }
            }
        };

        match collector.collect_channel(&channel_id, &window, &settings.output_dir) {
            Ok(summary) => summaries.push(summary),
            Err(err) => error!("Channel {channel_id} could not be written: {err:#}"),
        }
    }

    print_report(&summaries);
    Ok(())
}

fn print_report(summaries: &[ChannelSummary]) {
    println!();
    println!("===================================");
    println!("Collection complete!");
    println!("===================================");
    for summary in summaries {
        println!(
            "{} ({}): {} of {} videos, {} skipped, {} comments",
            summary.display_name,
            summary.channel_id,
            summary.videos_written,
            summary.videos_found,
            summary.videos_skipped,
            summary.comments_written
        );
    }
}

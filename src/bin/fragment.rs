//! Demo CLI: runs one frame or packet through a payloader and prints a
//! summary of the shards it would put on the wire.
//!
//! Not part of the core library; a thin harness for manually comparing wire
//! output against a captured reference session.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use moonlight_payload::{fec, AudioConfig, AudioPayloader, VideoConfig, VideoPayloader};

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Stream {
    Video,
    Audio,
}

/// Fragment a single encoded frame or packet and print the resulting shards.
#[derive(Parser, Debug)]
struct Args {
    /// Which payloader to run the input through.
    #[arg(long, value_enum)]
    stream: Stream,

    /// Path to the raw encoded frame (H.264/H.265 NAL units) or audio packet
    /// (Opus) to fragment.
    #[arg(long)]
    input: PathBuf,

    /// Path to a TOML file containing a `[video]` or `[audio]` config table
    /// matching `VideoConfig`/`AudioConfig`'s fields.
    #[arg(long)]
    config: PathBuf,
}

#[derive(serde::Deserialize)]
struct ConfigFile {
    video: Option<VideoConfig>,
    audio: Option<AudioConfig>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    fec::init();

    let input = fs::read(&args.input).with_context(|| format!("reading input {}", args.input.display()))?;
    let config_text = fs::read_to_string(&args.config).with_context(|| format!("reading config {}", args.config.display()))?;
    let config: ConfigFile = toml::from_str(&config_text).context("parsing config")?;

    let shards = match args.stream {
        Stream::Video => {
            let config = config.video.context("config file has no [video] table")?;
            let mut payloader = VideoPayloader::new(config)?;
            payloader.push_frame(&input)?
        }
        Stream::Audio => {
            let config = config.audio.context("config file has no [audio] table")?;
            let mut payloader = AudioPayloader::new(config)?;
            payloader.push_packet(&input)?
        }
    };

    println!("{} shard(s) emitted:", shards.len());
    for (index, shard) in shards.iter().enumerate() {
        println!("  shard {index}: {} bytes", shard.len());
    }

    Ok(())
}

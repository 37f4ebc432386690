use std::error::Error;
use std::path::PathBuf;

use clap::Parser;

use scfetch::{Client, Config};

mod logger;

const DEBUG_LOG_SPEC: &str = "info, scfetch=debug";

/// Download a SoundCloud track found in the given text
#[derive(Parser, Debug)]
#[command(name = "scfetch", version, about)]
struct Args {
    /// Fetch the original upload instead of the first available transcoding
    #[arg(long)]
    original: bool,
    /// Verbose logging
    #[arg(long)]
    debug: bool,
    /// Config file to use instead of the default location
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Link, or text containing one
    #[arg(required = true)]
    text: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let log_spec = if args.debug {
        DEBUG_LOG_SPEC
    } else {
        config.log_level.as_str()
    };
    let _logger = logger::init(log_spec)?;

    let client = Client::new(&config)?;
    let mut track = client.get(&args.text.join(" ")).await?;
    log::info!(
        "{} by {} ({}s), {} streams",
        track.title,
        track.author,
        track.duration.as_secs(),
        track.streams.len()
    );

    let path = if args.original {
        track.get_original().await?
    } else {
        track.get_next().await?
    };
    println!("{}", path.display());

    Ok(())
}

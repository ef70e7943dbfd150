//! # Picocover CLI
//!
//! Command-line interface for the cover proxy and the offline tools.
//!
//! ## Usage
//!
//! ```bash
//! # Run the cover proxy
//! picocover serve --listen 0.0.0.0:8787 --covers-dir ./gba-covers
//!
//! # Print the game code of a ROM
//! picocover code "Mario Kart DS.nds"
//!
//! # Convert a cover to the launcher's 8-bit BMP
//! picocover transcode cover.jpg cover.bmp --width 128 --height 96
//! ```

use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

use picocover::{
    CoverError, Platform, extract_code,
    proxy::{ANALYTICS_TTL, CACHE_TTL, DEFAULT_ART_BASE_URL, ProxyConfig},
    server::{self, ServerConfig},
    transcode,
};

/// Picocover - Cover art for flashcart launchers
#[derive(Parser, Debug)]
#[command(name = "picocover")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the cover proxy HTTP server
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "0.0.0.0:8787")]
        listen: String,

        /// Art host base URL
        #[arg(long, default_value = DEFAULT_ART_BASE_URL)]
        art_base_url: String,

        /// Region order tried on the art host
        #[arg(long, value_delimiter = ',', default_value = "EN,US,EU,JA")]
        regions: Vec<String>,

        /// Directory holding GBA covers (CODE.png, gba/CODE.jpg, ...)
        #[arg(long)]
        covers_dir: Option<PathBuf>,

        /// Cover cache TTL in seconds
        #[arg(long, default_value_t = CACHE_TTL.as_secs())]
        cache_ttl: u64,

        /// Unique-visitor retention in seconds
        #[arg(long, default_value_t = ANALYTICS_TTL.as_secs())]
        analytics_ttl: u64,

        /// Token required by /stats
        #[arg(long, env = "PICOCOVER_STATS_TOKEN")]
        stats_token: Option<String>,

        /// Art host request timeout in seconds
        #[arg(long, default_value_t = server::DEFAULT_UPSTREAM_TIMEOUT.as_secs())]
        upstream_timeout: u64,

        /// Disable the in-memory cover cache
        #[arg(long)]
        no_cache: bool,

        /// Disable download counting
        #[arg(long)]
        no_analytics: bool,
    },

    /// Print the game code of a ROM file
    Code {
        /// ROM file (.nds or .gba)
        rom: PathBuf,

        /// Platform (inferred from the extension if omitted)
        #[arg(long, value_parser = parse_platform)]
        platform: Option<Platform>,
    },

    /// Convert an image to an 8-bit palette BMP
    Transcode {
        /// Source image (PNG, JPEG, ...)
        input: PathBuf,

        /// Output BMP path
        output: PathBuf,

        /// Target width in pixels
        #[arg(long, default_value_t = transcode::DEFAULT_WIDTH)]
        width: u32,

        /// Target height in pixels
        #[arg(long, default_value_t = transcode::DEFAULT_HEIGHT)]
        height: u32,
    },
}

fn parse_platform(s: &str) -> Result<Platform, String> {
    Platform::from_tag(s).ok_or_else(|| format!("unknown platform '{}' (expected nds or gba)", s))
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), CoverError> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            listen,
            art_base_url,
            regions,
            covers_dir,
            cache_ttl,
            analytics_ttl,
            stats_token,
            upstream_timeout,
            no_cache,
            no_analytics,
        } => {
            let config = ServerConfig {
                listen_addr: listen,
                proxy: ProxyConfig {
                    art_base_url,
                    regions,
                    cache_ttl: Duration::from_secs(cache_ttl),
                    analytics_ttl: Duration::from_secs(analytics_ttl),
                    stats_token: stats_token.filter(|t| !t.is_empty()),
                },
                covers_dir,
                upstream_timeout: Duration::from_secs(upstream_timeout),
                cache: !no_cache,
                analytics: !no_analytics,
            };

            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(server::serve(config))
        }

        Commands::Code { rom, platform } => {
            let platform = platform
                .or_else(|| Platform::from_path(&rom))
                .ok_or_else(|| {
                    CoverError::BadRequest(format!(
                        "Cannot infer platform from {}; pass --platform nds|gba",
                        rom.display()
                    ))
                })?;

            let mut header = Vec::with_capacity(platform.header_len());
            std::fs::File::open(&rom)?
                .take(platform.header_len() as u64)
                .read_to_end(&mut header)?;

            let code = extract_code(&header, platform)?;
            if !code.is_well_formed() {
                tracing::warn!("{} does not look like a valid game code", code);
            }
            println!("{}", code);
            Ok(())
        }

        Commands::Transcode {
            input,
            output,
            width,
            height,
        } => {
            let source = std::fs::read(&input)?;
            let bitmap = transcode::transcode_bitmap(&source, width, height)?;
            std::fs::write(&output, bitmap.to_bmp())?;
            println!(
                "Wrote {} ({}x{}, {} colors)",
                output.display(),
                width,
                height,
                bitmap.palette().len()
            );
            Ok(())
        }
    }
}

//! Media Consent CLI
//!
//! Inspects how the engine treats media URLs under a given configuration.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use media_consent::{
    error::{AppError, Result},
    models::{Config, Provider, ThumbnailSize},
    services::{ProviderRegistry, ThumbnailResolver, ThumbnailSource, privacy, recognize},
};

/// media-consent - consent-gated media activation
#[derive(Parser, Debug)]
#[command(
    name = "media-consent",
    version,
    about = "Consent-gated activation of embedded media"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show which provider manages a media URL
    Recognize { url: String },

    /// Print the URL an activated player would load
    Rewrite {
        url: String,

        /// Use the privacy-enhanced variant
        #[arg(long)]
        privacy_enhanced: bool,
    },

    /// Resolve the placeholder thumbnail for a video URL
    Thumbnail {
        url: String,

        #[arg(long)]
        width: Option<u32>,

        #[arg(long)]
        height: Option<u32>,
    },

    /// Validate the configuration file
    Validate,

    /// List providers and their consent categories
    Providers,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load_or_default(&cli.config);

    match cli.command {
        Command::Recognize { url } => match recognize(&url) {
            Some(source) => println!("{source}"),
            None => println!("not managed"),
        },

        Command::Rewrite {
            url,
            privacy_enhanced,
        } => {
            let source = recognize(&url)
                .ok_or_else(|| AppError::invalid_target(format!("{url} is not managed")))?;
            println!(
                "{}",
                privacy::playback_url(&url, source.provider, privacy_enhanced)
            );
        }

        Command::Thumbnail { url, width, height } => {
            let source = recognize(&url)
                .ok_or_else(|| AppError::invalid_target(format!("{url} is not managed")))?;
            let video_id = source
                .video_id()
                .ok_or_else(|| AppError::invalid_target(format!("{url} is not a video")))?;
            let size = ThumbnailSize::new(
                width.unwrap_or(config.thumbnails.default_width),
                height.unwrap_or(config.thumbnails.default_height),
            );

            let resolver = ThumbnailResolver::new(&config.thumbnails)?;
            let thumbnail = resolver
                .thumbnail_url(source.provider, video_id, size)
                .await?;
            println!("{thumbnail}");
        }

        Command::Validate => {
            log::info!("Validating {}...", cli.config.display());
            Config::load(&cli.config)?;
            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("Config OK");
        }

        Command::Providers => {
            let registry = ProviderRegistry::new(config.consent.clone());
            for provider in Provider::ALL {
                let enabled = registry.is_enabled(provider);
                let category = registry.consent_category(provider).unwrap_or("-");
                let dependent = registry.dependent_category(provider).unwrap_or("-");
                println!("{provider:<12} enabled={enabled:<5} category={category} dependent={dependent}");
            }
        }
    }

    Ok(())
}

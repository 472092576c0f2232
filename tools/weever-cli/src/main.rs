//! StreemWeever CLI — headless compositing preview and diagnostics.
//!
//! Usage:
//!   weever preview [OPTIONS]   Composite overlays onto a capture and save a PNG
//!   weever check               Check fonts, capture backends and config
//!   weever config [--init]     Show (or write) the effective configuration

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

mod commands;

#[derive(Parser)]
#[command(
    name = "weever",
    about = "Live overlay compositing for streams",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Scroll direction for the `--text` banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ScrollArg {
    None,
    Horizontal,
    Vertical,
}

/// Where preview frames come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceArg {
    /// Generated test pattern at --width x --height
    Synthetic,
    /// Desktop capture (requires the gstreamer feature)
    Screen,
    /// GStreamer test source (requires the gstreamer feature)
    GstTest,
}

#[derive(Subcommand)]
enum Commands {
    /// Composite overlays onto a capture and write the output surface
    Preview {
        /// Capture width granted by the synthetic source
        #[arg(long, default_value = "1280")]
        width: u32,

        /// Capture height granted by the synthetic source
        #[arg(long, default_value = "720")]
        height: u32,

        /// Render ticks to run before saving
        #[arg(long, default_value = "30")]
        ticks: u32,

        /// Run in real time for this many milliseconds instead of stepping ticks
        #[arg(long)]
        duration_ms: Option<u64>,

        /// Logo image to place in the top left
        #[arg(long)]
        logo: Option<PathBuf>,

        /// Video clip (animated GIF or image) to play in the top left
        #[arg(long)]
        clip: Option<PathBuf>,

        /// Banner text
        #[arg(long)]
        text: Option<String>,

        /// Banner scroll direction
        #[arg(long, value_enum, default_value = "none")]
        scroll: ScrollArg,

        /// Banner speed in pixels per scroll tick
        #[arg(long, default_value = "5")]
        speed: u32,

        /// Embedded page URL (placement is reported, not drawn)
        #[arg(long)]
        page: Option<String>,

        /// Capture source
        #[arg(long, value_enum, default_value = "synthetic")]
        source: SourceArg,

        /// Output PNG path
        #[arg(short, long, default_value = "preview.png")]
        output: PathBuf,
    },

    /// Check fonts, capture backends and configuration
    Check,

    /// Show the effective configuration
    Config {
        /// Write the configuration file with current values
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = weever_common::config::AppConfig::load();

    // Initialize logging
    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    weever_common::logging::init_logging(&logging);

    match cli.command {
        Commands::Preview {
            width,
            height,
            ticks,
            duration_ms,
            logo,
            clip,
            text,
            scroll,
            speed,
            page,
            source,
            output,
        } => {
            let options = commands::preview::PreviewOptions {
                width,
                height,
                ticks,
                duration_ms,
                logo,
                clip,
                text,
                scroll,
                speed,
                page,
                source,
                output,
            };
            commands::preview::run(&config, options).await
        }
        Commands::Check => commands::check::run(&config),
        Commands::Config { init } => commands::config::run(&config, init),
    }
}

//! imgrz CLI - resize batches of local and remote images concurrently.
//!
//! Every admitted image is resized on its own task; each outcome is reported
//! as it arrives, and the command returns once the whole batch is reported.
//!
//! # Usage
//!
//! ```bash
//! # Resize two local files to 800px wide, keeping the aspect ratio
//! imgrz resize --images a.jpg,b.png -W 800 -o ./out
//!
//! # Resize a directory plus a remote image, skipping anything named "thumb"
//! imgrz resize --dir ./photos --urls https://example.com/cat.jpg \
//!     --exclude-name thumb -W 640 -H 480
//!
//! # View configuration
//! imgrz config show
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// imgrz - concurrent batch image resizer.
#[derive(Parser, Debug)]
#[command(name = "imgrz")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging and report filtered-out images
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Resize images from files, URLs and directories
    Resize(cli::resize::ResizeArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so config warnings go through eprintln.
    let config = match imgrz_core::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `imgrz config path`."
            );
            imgrz_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("imgrz v{}", imgrz_core::VERSION);

    match cli.command {
        Commands::Resize(args) => cli::resize::execute(args, config, cli.verbose).await,
        Commands::Config(args) => cli::config::execute(args).await,
    }
}

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use matrix_link::{Config, Matrix, MatrixConfig};
use std::path::PathBuf;

/// Matrix Link - route video on a raw-TCP HDMI matrix
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Matrix hostname or IP address
    #[arg(short = 'H', long, default_value = "localhost")]
    host: String,

    /// Matrix port
    #[arg(short, long, default_value_t = matrix_link::DEFAULT_PORT)]
    port: u16,

    /// JSON device file; overrides --host/--port
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Device name or host to pick from the config file
    #[arg(short, long)]
    device: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Subcommands
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Route an input to one output
    Route {
        /// Output number, starting at 1
        output: u32,

        /// Input number, starting at 1
        input: u32,
    },

    /// Route an input to every output
    RouteAll {
        /// Input number, starting at 1
        input: u32,
    },

    /// Route an input to one output by source name, e.g. "Input 3"
    Select {
        /// Output number, starting at 1
        output: u32,

        /// Source name
        source: String,
    },

    /// List outputs and their selectable sources
    Sources,
}

fn device_config(cli: &Cli) -> Result<MatrixConfig> {
    let Some(path) = &cli.config else {
        let mut device = MatrixConfig::new(cli.host.clone());
        device.port = cli.port;
        return Ok(device);
    };

    let config = Config::load(path)
        .with_context(|| format!("Failed to load config {}", path.display()))?;

    match &cli.device {
        Some(selector) => config
            .find(selector)
            .cloned()
            .ok_or_else(|| anyhow!("No device {:?} in {}", selector, path.display())),
        None => config
            .devices
            .first()
            .cloned()
            .ok_or_else(|| anyhow!("No devices configured in {}", path.display())),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Configure logging
    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    // Also picks up `log` records from the library
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .try_init()
        .map_err(|e| anyhow!("Failed to set tracing subscriber: {}", e))?;

    let device = device_config(&cli)?;
    let matrix = Matrix::new(device).context("Invalid device configuration")?;
    tracing::debug!("Using {}", matrix.title());

    match &cli.command {
        Some(Commands::Route { output, input }) => {
            matrix
                .route(*output, *input)
                .await
                .context("Failed to route")?;
            tracing::info!("Output {} now shows input {}", output, input);
        }

        Some(Commands::RouteAll { input }) => {
            matrix
                .route_all(*input)
                .await
                .context("Failed to route to all outputs")?;
            tracing::info!("All outputs now show input {}", input);
        }

        Some(Commands::Select { output, source }) => {
            matrix
                .select_source(*output, source)
                .await
                .context("Failed to select source")?;
            tracing::info!("Output {} now shows {}", output, source);
        }

        Some(Commands::Sources) => {
            let info = matrix.device_info();
            println!("{} - {} {}", info.name, info.manufacturer, info.model);
            println!("  {}", info.configuration_url);
            for port in matrix.outputs() {
                println!("  {}: {}", port.name(), port.source_list().join(", "));
            }
        }

        None => {
            tracing::info!("No command specified. Use --help for usage information.");
        }
    }

    matrix.link().teardown_connection().await;
    Ok(())
}

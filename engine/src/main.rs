// Waypoint plan-and-execute agent
// Main entry point for the waypoint binary

use clap::Parser;
use waypoint_engine::cli::{Cli, Command, ConfigAction};
use waypoint_engine::config::Config;
use waypoint_engine::handlers::{
    handle_config_path, handle_config_show, handle_run, handle_tools, OutputFormat,
};
use waypoint_engine::telemetry::{init_telemetry, LogFormat};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Determine output format
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    // Load configuration (or use custom path if provided)
    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => Config::default_config_path()?,
    };
    let config = if cli.config.is_some() {
        Config::load_from_path(&config_path)?
    } else {
        Config::load_or_create()?
    };

    // --log wins over the config file; RUST_LOG wins over both
    let log_level = cli.log.as_deref().unwrap_or(&config.core.log_level);
    init_telemetry(log_level, LogFormat::detect(cli.json));

    let version = env!("CARGO_PKG_VERSION");
    let commit = env!("GIT_COMMIT_HASH");
    let timestamp = env!("BUILD_TIMESTAMP");

    tracing::info!("Waypoint v{} ({} - {})", version, commit, timestamp);

    // Handle commands
    match cli.command {
        Command::Run {
            objective,
            mode,
            context,
        } => {
            tracing::info!("Executing {} run", mode);
            let result = handle_run(objective, mode, context, &config, format).await?;
            if !result.success {
                std::process::exit(1);
            }
            Ok(())
        }

        Command::Tools => handle_tools(&config, format),

        Command::Config { action } => match action {
            ConfigAction::Show => handle_config_show(&config, format),
            ConfigAction::Path => handle_config_path(&config_path, format),
        },
    }
}

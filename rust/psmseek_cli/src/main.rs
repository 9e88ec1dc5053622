mod cli;
mod config;
mod errors;
mod processing;

use clap::Parser;
use tracing::info;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use cli::{
    Cli,
    Command,
};

fn main() -> std::result::Result<(), errors::CliError> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        ) // This uses RUST_LOG environment variable
        .init();

    let args = Cli::parse();

    match args.command {
        Command::Search(args) => {
            let mut config = config::load_config(args.config.as_deref())?;
            config::apply_search_overrides(&mut config, &args);
            config.validate()?;
            info!("Parsed configuration: {:#?}", config);
            processing::run_search(&args, &config)?;
        }
        Command::ComputeQValues(args) => {
            let mut config = config::load_config(args.config.as_deref())?;
            if let Some(pi0) = args.pi0 {
                config.pi0 = pi0;
            }
            config.validate()?;
            processing::run_q_values(&args, &config)?;
        }
        Command::ExtractFeatures(args) => {
            let config = config::load_config(args.config.as_deref())?;
            processing::run_extract_features(&args, &config)?;
        }
        Command::WriteTemplate { output } => {
            config::write_template(output.as_deref())?;
        }
    }

    Ok(())
}

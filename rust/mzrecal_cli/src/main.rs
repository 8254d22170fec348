mod cli;
mod config;
mod errors;
mod processing;

use clap::Parser;
use mzrecal::RecalConfig;
use tracing::info;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use cli::{
    Cli,
    Command,
};
use config::load_config;

#[cfg(target_os = "windows")]
use mimalloc::MiMalloc;

#[cfg(target_os = "windows")]
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

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
        Command::Run(args) => {
            let config = compute_config(&args)?;
            processing::process_compute(&args, &config, true)
        }
        Command::Compute(args) => {
            let config = compute_config(&args)?;
            processing::process_compute(&args, &config, false)
        }
        Command::Apply(args) => processing::process_apply(&args),
        Command::WriteTemplate { output } => processing::write_json(&RecalConfig::default(), &output),
    }
}

fn compute_config(args: &cli::ComputeArgs) -> Result<RecalConfig, errors::CliError> {
    let mut config = load_config(args.config.as_deref())?;
    args.overrides.apply_to(&mut config)?;
    info!("Parsed configuration: {:#?}", config);
    Ok(config)
}

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod exit_codes;

use cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config_path = cli.config.as_deref();
    let exit_code = match cli.command {
        cli::Command::Run(args) => commands::run(config_path, args).await,
        cli::Command::Check(args) => commands::check(config_path, args),
        cli::Command::Fetch(args) => commands::fetch(config_path, args).await,
    };

    std::process::exit(exit_code);
}

/// Logs go to stderr; stdout carries diagnoses and streamed records
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("ecg_replay={level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

mod cli;
mod error;

use crate::cli::{Cli, Command};
use crate::error::{ErrorKind, Result};
use clap::Parser;
use exn::ResultExt;
use gop_config::Config;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("fatal: {e:?}");
            return ExitCode::FAILURE;
        },
    };
    init_tracing(config.verbose);

    match dispatch(cli.command, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            eprintln!("fatal: {e:?}");
            ExitCode::FAILURE
        },
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let loaded = match &cli.config {
        Some(file) => Config::load_from(Some(file)),
        None => Config::load(),
    };
    let mut config = loaded.or_raise(|| ErrorKind::Config)?;
    cli.apply(&mut config);
    Ok(config)
}

/// `RUST_LOG` wins; otherwise `debug` when verbose and `info` when not.
fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .with_writer(std::io::stderr)
        .init();
}

async fn dispatch(command: Command, config: &Config) -> Result<()> {
    match command {
        Command::Pack(args) => cli::pack::run(args, config).await,
        Command::PublishFolder(args) => cli::publish::folder(args, config).await,
        Command::PublishJfrog(args) => cli::publish::jfrog(args, config).await,
        Command::Version => {
            println!("gop {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        },
    }
}

use std::process::ExitCode;

use clap::Parser;

mod cli;
mod commands;
mod config;
mod error;

use cli::{Cli, Commands};
use config::{load_config, merge_config};
use error::{CliResult, to_exit_code};

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity
    let filter = if cli.verbose {
        "hostbridge=debug,hostbridge_cli=debug"
    } else {
        "hostbridge=warn,hostbridge_cli=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = smol::block_on(async_main(cli));
    to_exit_code(result)
}

async fn async_main(cli: Cli) -> CliResult<()> {
    let file_config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Inspect(args) => {
            let config = merge_config(file_config, &args.common)?;
            commands::inspect::execute(args, config)
        }
        Commands::Pending(args) => {
            let config = merge_config(file_config, &args.common)?;
            commands::pending::execute(args, config)
        }
        Commands::Recover(args) => {
            let config = merge_config(file_config, &args.common)?;
            commands::recover::execute(args, config)
        }
        Commands::Loopback(args) => {
            let config = merge_config(file_config, &args.common)?;
            commands::loopback::execute(args, config).await
        }
    }
}

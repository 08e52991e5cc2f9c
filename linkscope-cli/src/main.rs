mod cli;
mod commands;
mod config;
mod error;
mod output;

use crate::{
    cli::{Args, Commands},
    commands::{CommandExecutor, ExtractOptions},
    config::AppConfig,
    error::Result,
};
use clap::Parser;
#[cfg(feature = "colored-output")]
use colored::*;
use link_extractors::ProxyConfig;
use std::process;
use tracing::{Level, error, info};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() {
    let result = run().await;

    if let Err(e) = result {
        error!("Application error: {}", e);
        #[cfg(feature = "colored-output")]
        {
            eprintln!("{} {}", "Error:".red().bold(), e);
        }
        #[cfg(not(feature = "colored-output"))]
        {
            eprintln!("Error: {}", e);
        }
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet);

    // Load configuration
    let config = AppConfig::load(args.config.as_deref())?;

    info!("Starting linkscope with config: {:?}", config);

    let proxy = args.proxy.map(|url| ProxyConfig {
        url,
        username: args.proxy_username,
        password: args.proxy_password,
    });

    // Execute command
    match args.command {
        Commands::Extract {
            url,
            headers,
            provider,
            film,
            season,
            episode,
            output,
            output_file,
            include_expired,
        } => {
            let client_config = config.client_config(args.timeout, proxy);
            let executor = CommandExecutor::new(config, client_config)?;
            executor
                .extract(
                    &url,
                    ExtractOptions {
                        headers: &headers,
                        provider: provider.as_deref(),
                        film: film.as_deref(),
                        season,
                        episode,
                        output,
                        output_file: output_file.as_deref(),
                        include_expired,
                    },
                )
                .await?;
        }

        Commands::Hosts => {
            let format = config.default_output_format;
            let client_config = config.client_config(args.timeout, proxy);
            let executor = CommandExecutor::new(config, client_config)?;
            executor.list_hosts(format)?;
        }

        Commands::Completions { shell } => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Args::command();
            let bin_name = cmd.get_name().to_string();
            generate(shell, &mut cmd, bin_name, &mut std::io::stdout());
        }

        Commands::Config { show, reset } => {
            if reset {
                AppConfig::reset(args.config.as_deref())?;
                println!("✓ Configuration reset to defaults");
            } else if show {
                println!("{}", config.show()?);
            } else {
                println!(
                    "Use --show to display current configuration or --reset to reset to defaults"
                );
            }
        }
    }

    Ok(())
}

fn init_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_level(verbose).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

// SPDX-FileCopyrightText: 2026 Astra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Astra - a Gemini-powered chat assistant.
//!
//! This is the binary entry point for the Astra shell.

use clap::{Parser, Subcommand};

mod shell;

/// Astra - a Gemini-powered chat assistant.
#[derive(Parser, Debug)]
#[command(name = "astra", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Launch the interactive chat shell (the default).
    Shell,
    /// Print the resolved configuration.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match astra_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            astra_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.log.filter);

    let result = match cli.command {
        Some(Commands::Config) => {
            print_config(&config);
            Ok(())
        }
        Some(Commands::Shell) | None => shell::run_shell(config).await,
    };

    if let Err(error) = result {
        eprintln!("astra: {error}");
        std::process::exit(1);
    }
}

fn init_tracing(filter: &str) {
    let filter = tracing_subscriber::EnvFilter::try_new(filter)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Prints the effective configuration with the API key redacted.
fn print_config(config: &astra_config::model::AstraConfig) {
    let mut redacted = config.clone();
    if redacted.api.api_key.is_some() {
        redacted.api.api_key = Some("<redacted>".to_string());
    }
    match toml::to_string_pretty(&redacted) {
        Ok(rendered) => print!("{rendered}"),
        Err(error) => eprintln!("astra: failed to render config: {error}"),
    }
}

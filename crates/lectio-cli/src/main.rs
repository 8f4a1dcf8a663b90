//! Lectio CLI - Command-line interface for study guide extraction.

use clap::Parser;
use lectio_cli::commands;
use lectio_cli::{Cli, Command, Config, Formatter};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

/// Log to stderr; `-v` forces debug, otherwise `RUST_LOG` or `info`.
fn init_tracing(verbose: u8) {
    let filter = if verbose > 0 {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> lectio_cli::Result<()> {
    let config_path = match cli.config {
        Some(path) => path,
        None => Config::path()?,
    };
    // A broken file still lets `config init --force` replace it
    let loaded = Config::load_from(&config_path);
    let settings = loaded
        .as_ref()
        .map(|config| config.settings.clone())
        .unwrap_or_default();

    // Determine output format
    let format = cli.format.map(Into::into).unwrap_or(settings.format);

    // Determine color setting
    let color_enabled = !cli.no_color && settings.color;

    let formatter = Formatter::new(format, color_enabled);

    match cli.command {
        Command::Extract(args) => commands::execute_extract(args, &loaded?, &formatter).await,
        Command::Config(args) => {
            commands::execute_config(args, loaded, &config_path, &formatter).await
        }
    }
}

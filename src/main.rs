use clap::Parser;
use color_eyre::Result;

use crate::app::App;
use crate::cli::Cli;
use crate::config::AppConfig;

mod app;
mod cli;
mod config;
mod errors;
mod logging;
mod time;

#[tokio::main]
async fn main() -> Result<()> {
    errors::init()?;
    logging::init()?;

    let args = Cli::parse();
    let mut config = match AppConfig::new() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            eprintln!("Please check your config file or environment variables.");
            std::process::exit(1);
        }
    };
    if let Some(indent) = args.indent {
        config.indent = indent;
    }
    config.strict_diagnostics |= args.strict_diagnostics;

    let mut app = App::new(config);
    app.run(args.command).await?;
    Ok(())
}

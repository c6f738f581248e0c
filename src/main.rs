mod auth;
mod cli;
mod config;
mod error;
mod gitlab;
mod report;
mod selector;

use clap::Parser;
use cli::Cli;
use log::info;

#[tokio::main]
async fn main() {
    env_logger::init();

    let cli = Cli::parse();
    info!("Starting baseline-guard");

    if let Err(e) = cli.execute().await {
        eprintln!("::error::{e}");
        std::process::exit(1);
    }
}

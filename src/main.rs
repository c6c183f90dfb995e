mod app;
mod cli;
mod config;
mod core;
mod probes;
mod reporters;
mod ui;
mod utils;
mod wizard;

use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = cli::args::Cli::parse();
    if let Err(err) = app::run(cli).await {
        eprintln!("fatal: {:#}", err);
        std::process::exit(1);
    }
}

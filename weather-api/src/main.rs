//! Binary crate for the `weather-api` service.
//!
//! This crate focuses on:
//! - Serving the current weather and forecast endpoints over HTTP
//! - One-off lookups from the command line
//! - Interactive configuration

use clap::Parser;

mod cli;
mod server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cmd = cli::Cli::parse();
    cmd.run().await
}

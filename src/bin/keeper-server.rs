use std::process;

use clap::Parser;
use secretkeeper::cli::{output, ServerCli};
use secretkeeper::errors::Result;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        output::error(&e.to_string());
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = ServerCli::parse();
    let settings = cli.settings()?;
    secretkeeper::telemetry::init(&settings.log_filter)?;

    secretkeeper::server::run(settings).await
}

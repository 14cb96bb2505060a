use std::io;
use std::process;
use std::thread;

use clap::Parser;
use secretkeeper::cli::console::Console;
use secretkeeper::cli::{output, ClientCli};
use secretkeeper::client::{CancelFlag, KeeperClient, Transport};
use secretkeeper::errors::Result;
use tracing::warn;

/// Exit status after a second Ctrl-C.
const INTERRUPTED_EXIT: i32 = 130;

fn main() {
    if let Err(e) = run() {
        output::error(&e.to_string());
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = ClientCli::parse();
    secretkeeper::telemetry::init("warn")?;
    let settings = cli.settings()?;

    let cancel = CancelFlag::new();
    watch_interrupts(cancel.clone());

    let stdin = io::stdin();
    let console = Console::new(stdin.lock(), io::stdout());
    let transport = Transport::from_settings(&settings);

    KeeperClient::new(console, transport, cancel).serve()
}

/// The first Ctrl-C raises `cancel`; the loop stops at its next check
/// point. A second one ends the process.
fn watch_interrupts(cancel: CancelFlag) {
    thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                warn!(%err, "interrupt handling unavailable");
                return;
            }
        };

        runtime.block_on(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                if cancel.is_cancelled() {
                    process::exit(INTERRUPTED_EXIT);
                }
                cancel.cancel();
            }
        });
    });
}

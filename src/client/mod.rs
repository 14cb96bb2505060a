//! Client module: the interactive keeper client.
//!
//! This module provides:
//! - Typed readers that validate secret input (`readers`)
//! - The retrying HTTP transport and status mapping (`transport`)
//! - The explicit session holding the auth cookie (`session`)
//! - Cooperative cancellation (`cancel`)
//! - `KeeperClient`, the command loop composing all of the above
//!   (command bodies live in `commands`)

pub mod cancel;
mod commands;
pub mod readers;
pub mod session;
pub mod transport;

use std::io::{BufRead, Write};
use std::str::FromStr;

use crate::cli::console::Console;
use crate::errors::{KeeperError, Result};

pub use cancel::CancelFlag;
pub use readers::SecretReader;
pub use session::Session;
pub use transport::{check_status, RetryPolicy, Transport};

/// Commands understood by the client loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Register,
    Login,
    Logout,
    Create,
    Get,
    Update,
    Delete,
    Help,
    Exit,
}

impl Command {
    pub const ALL: [Command; 9] = [
        Self::Register,
        Self::Login,
        Self::Logout,
        Self::Create,
        Self::Get,
        Self::Update,
        Self::Delete,
        Self::Help,
        Self::Exit,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Register => "register",
            Self::Login => "login",
            Self::Logout => "logout",
            Self::Create => "create",
            Self::Get => "get",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Help => "help",
            Self::Exit => "exit",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Register => "Create an account and start a session",
            Self::Login => "Start a session",
            Self::Logout => "End the current session",
            Self::Create => "Store a new secret",
            Self::Get => "Fetch a secret",
            Self::Update => "Replace a secret's payload and metadata",
            Self::Delete => "Remove a secret",
            Self::Help => "Show this list",
            Self::Exit => "Quit",
        }
    }
}

impl FromStr for Command {
    type Err = KeeperError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| KeeperError::UnknownCommand(s.to_string()))
    }
}

/// The client orchestrator: one command at a time, read from the
/// console and delivered through the transport.
pub struct KeeperClient<R, W> {
    console: Console<R, W>,
    transport: Transport,
    session: Session,
    cancel: CancelFlag,
}

impl<R: BufRead, W: Write> KeeperClient<R, W> {
    pub fn new(console: Console<R, W>, transport: Transport, cancel: CancelFlag) -> Self {
        Self {
            console,
            transport,
            session: Session::new(),
            cancel,
        }
    }

    pub fn console(&self) -> &Console<R, W> {
        &self.console
    }

    /// Run commands until `exit`, end of input, or interruption.
    ///
    /// Known errors are reported and the loop continues; any other error
    /// is returned.
    pub fn serve(&mut self) -> Result<()> {
        self.console
            .info("Keeper client ready. Type `help` for a list of commands.")?;

        loop {
            if self.cancel.is_cancelled() {
                return Ok(());
            }

            let line = match self.console.prompt("> ") {
                Ok(line) => line,
                Err(KeeperError::EmptyInput) => continue,
                Err(KeeperError::Exit) => return Ok(()),
                Err(e) => return Err(e),
            };

            match self.dispatch(&line) {
                Ok(()) => {}
                Err(KeeperError::Exit | KeeperError::Interrupted) => return Ok(()),
                Err(e) if e.is_known() => self.console.error(&e.to_string())?,
                Err(e) => return Err(e),
            }
        }
    }

    fn dispatch(&mut self, line: &str) -> Result<()> {
        match line.parse::<Command>()? {
            Command::Register => self.register(),
            Command::Login => self.login(),
            Command::Logout => self.logout(),
            Command::Create => self.create(),
            Command::Get => self.get(),
            Command::Update => self.update(),
            Command::Delete => self.delete(),
            Command::Help => self.help(),
            Command::Exit => Err(KeeperError::Exit),
        }
    }
}

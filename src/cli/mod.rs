//! CLI module: Clap argument parsers for both binaries, styled output
//! helpers, and the line-based console.

pub mod console;
pub mod output;

use std::path::PathBuf;

use clap::Parser;

use crate::config::{ClientSettings, ServerSettings, Settings};
use crate::errors::Result;
use crate::transfer::TruncationPolicy;

/// Interactive client for the keeper secret store.
#[derive(Parser, Debug)]
#[command(name = "keeper", about = "Interactive client for the keeper secret store", version)]
pub struct ClientCli {
    /// Server base URL (overrides the config file)
    #[arg(short, long, env = "KEEPER_ADDRESS")]
    pub address: Option<String>,

    /// Path to the config file
    #[arg(short, long, env = "KEEPER_CONFIG", default_value = Settings::FILE_NAME)]
    pub config: PathBuf,

    /// Gzip request bodies
    #[arg(long)]
    pub gzip: bool,
}

impl ClientCli {
    /// Load the config file and apply flag overrides.
    pub fn settings(&self) -> Result<ClientSettings> {
        let mut settings = Settings::load(&self.config)?.client;
        if let Some(address) = &self.address {
            settings.address = address.clone();
        }
        if self.gzip {
            settings.gzip = true;
        }
        Ok(settings)
    }
}

/// HTTP service storing typed secrets per user.
#[derive(Parser, Debug)]
#[command(name = "keeper-server", about = "HTTP service storing typed secrets per user", version)]
pub struct ServerCli {
    /// Listen address, host:port (overrides the config file)
    #[arg(short, long, env = "KEEPER_ADDRESS")]
    pub address: Option<String>,

    /// SQLite database path
    #[arg(short, long, env = "KEEPER_DATABASE")]
    pub database: Option<String>,

    /// Session token lifetime in seconds
    #[arg(long, env = "KEEPER_TOKEN_TTL")]
    pub token_ttl: Option<u64>,

    /// Keep truncated multipart bodies instead of rejecting them
    #[arg(long)]
    pub lenient_uploads: bool,

    /// Largest accepted request body in bytes (0 for no limit)
    #[arg(long, env = "KEEPER_MAX_BODY_BYTES")]
    pub max_body_bytes: Option<usize>,

    /// Path to the config file
    #[arg(short, long, env = "KEEPER_CONFIG", default_value = Settings::FILE_NAME)]
    pub config: PathBuf,
}

impl ServerCli {
    /// Load the config file and apply flag overrides.
    pub fn settings(&self) -> Result<ServerSettings> {
        let mut settings = Settings::load(&self.config)?.server;
        if let Some(address) = &self.address {
            settings.address = address.clone();
        }
        if let Some(database) = &self.database {
            settings.database = database.clone();
        }
        if let Some(ttl) = self.token_ttl {
            settings.token_ttl_secs = ttl;
        }
        if self.lenient_uploads {
            settings.truncation = TruncationPolicy::Lenient;
        }
        if let Some(limit) = self.max_body_bytes {
            settings.max_body_bytes = limit;
        }
        Ok(settings)
    }
}

pub mod cli;
pub mod client;
pub mod config;
pub mod errors;
pub mod secret;
pub mod server;
pub mod telemetry;
pub mod transfer;

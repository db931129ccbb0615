//! Punchcard CLI
//!
//! Commands:
//! - `punchcard register` - Register every account once
//! - `punchcard sign` - Run one sign batch
//! - `punchcard schedule` - Sign now, then on a fixed interval
//! - `punchcard menu` - Interactive menu (default)

pub mod menu;

use clap::{Parser, Subcommand};

pub use menu::run_menu;

/// BNB Chain check-in automation
#[derive(Parser, Debug)]
#[command(name = "punchcard")]
#[command(author, version, about = "BNB Chain check-in and claim automation bot")]
pub struct Cli {
    /// Directory holding default.toml and environment overrides
    #[arg(short, long, default_value = "config", env = "PUNCHCARD_CONFIG_DIR")]
    pub config_dir: String,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Submit the registration transaction for every account
    Register,

    /// Run one sign batch over every account
    Sign,

    /// Run a sign batch immediately, then repeat on the configured interval
    Schedule,

    /// Interactive menu
    Menu,
}

//! Command-line interface definitions.

use clap::{Parser, Subcommand};
use std::net::IpAddr;
use std::path::PathBuf;

/// NT4 dashboard asset server
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Defaults to `serve`
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Serve the dashboard until Ctrl-C
    #[command(visible_alias = "s")]
    Serve(ServeArgs),

    /// Fetch the binary module from a running dashboard and check it
    #[command(visible_alias = "p")]
    Probe {
        /// Dashboard base URL (default: http://localhost:<port>)
        #[arg(short, long)]
        url: Option<String>,
    },

    /// Write the default configuration file
    InitConfig {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

/// Overrides for the configured server settings.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ServeArgs {
    /// Port number to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Network interface to bind (e.g., 127.0.0.1, 0.0.0.0)
    #[arg(short, long)]
    pub interface: Option<IpAddr>,

    /// Deploy directory containing the dashboard folder
    #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
    pub deploy_dir: Option<PathBuf>,
}

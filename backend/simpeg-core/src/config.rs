// src/config.rs
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::path::PathBuf;

// --- Environment ---

/// Settings read from `SIMPEG_*` environment variables (and `.env`).
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default)]
    pub cert_path: Option<String>,
    #[serde(default)]
    pub key_path: Option<String>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            data_dir: default_data_dir(),
            cert_path: None,
            key_path: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        // Load .env file if it exists
        dotenv::dotenv().ok();
        envy::prefixed("SIMPEG_").from_env::<AppConfig>()
    }

    /// Command-line flags win over the environment.
    pub fn with_overrides(mut self, cli: &Cli) -> Self {
        if let Some(dir) = &cli.data_dir {
            self.data_dir = dir.clone();
        }
        if let Some(Command::Serve { host, port }) = &cli.command {
            if let Some(host) = host {
                self.host = host.clone();
            }
            if let Some(port) = port {
                self.port = *port;
            }
        }
        self
    }

    /// Both halves of the TLS key pair, when configured.
    pub fn tls_paths(&self) -> Option<(PathBuf, PathBuf)> {
        match (&self.cert_path, &self.key_path) {
            (Some(cert), Some(key)) if !cert.is_empty() && !key.is_empty() => {
                Some((PathBuf::from(cert), PathBuf::from(key)))
            }
            _ => None,
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// --- Command line ---

#[derive(Debug, Parser)]
#[command(name = "simpeg-core", version, about = "SIMPEG PDAM personnel records service")]
pub struct Cli {
    /// Directory holding the persisted snapshot
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, PartialEq)]
pub enum Command {
    /// Run the HTTP API (default)
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Print the organization chart as an indented outline
    OrgChart {
        /// Print the nested JSON forest instead
        #[arg(long)]
        json: bool,
    },
    /// Monthly attendance summary
    Report {
        #[arg(long)]
        month: String,
        /// Write CSV to this file instead of printing a table
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Replace the stored snapshot with the sample data
    Reset,
}

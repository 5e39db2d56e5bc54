//! Command line definition.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// LeadScout - Google Maps lead scraper with phone provider lookup
#[derive(Parser, Debug)]
#[command(name = "leadscout", version, about)]
pub struct Cli {
    /// Configuration file (default: ~/.config/leadscout/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a scraping session in the foreground; Ctrl-C stops it
    Run {
        /// Town to crawl (repeatable)
        #[arg(long = "town", required = true)]
        towns: Vec<String>,

        /// Industry to search in every town (repeatable)
        #[arg(long = "industry", required = true)]
        industries: Vec<String>,

        /// Session name (default: "<industries> in <towns>")
        #[arg(long)]
        name: Option<String>,
    },

    /// Start the HTTP API
    Serve {
        /// Listen address, overriding `server.bind`
        #[arg(long)]
        bind: Option<String>,
    },

    /// Inspect stored sessions
    Sessions {
        #[command(subcommand)]
        command: SessionsCommand,
    },

    /// Process due provider lookup retries for a session
    Retry {
        /// Session ID
        session_id: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum SessionsCommand {
    /// List all sessions, newest first
    List,
    /// Show one session
    Show {
        /// Session ID
        id: String,
    },
    /// List the businesses a session found
    Businesses {
        /// Session ID
        id: String,
    },
}

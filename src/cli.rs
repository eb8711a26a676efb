//! CLI definitions for Prompto.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Prompto CLI.
#[derive(Parser)]
#[command(name = "prompto")]
#[command(about = "Prompt enhancement controls for third-party chat surfaces")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path (default: ~/.prompto/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Attach controls to chat tabs of a running Chrome
    Attach {
        /// Chrome remote debugging endpoint
        #[arg(long, default_value = "http://127.0.0.1:9222")]
        endpoint: String,

        /// Attach only to this target id
        #[arg(long)]
        target: Option<String>,
    },

    /// Enhance a prompt and print the result
    Enhance {
        /// Prompt text
        text: String,
    },

    /// Optimize a prompt and print the result
    Optimize {
        /// Prompt text
        text: String,
    },

    /// Sign in and store the credential
    Login {
        #[arg(short, long)]
        username: String,

        /// Read from stdin when omitted
        #[arg(short, long, env = "PROMPTO_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Forget the stored credential
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Show local usage statistics
    Stats,

    /// List platform profiles, or show which one a host resolves to
    Profiles {
        /// Host name, e.g. chatgpt.com
        host: Option<String>,
    },
}

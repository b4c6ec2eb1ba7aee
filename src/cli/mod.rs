pub mod client;
pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use client::ApiClient;

pub const DEFAULT_SERVER_URL: &str = "http://localhost:5010";

#[derive(Parser)]
#[command(name = "dirctl")]
#[command(about = "dirctl - Command-line interface for the Member Directory API")]
#[command(version)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        env = "DIRECTORY_API_URL",
        default_value = DEFAULT_SERVER_URL,
        help = "Base URL of the directory API"
    )]
    pub server: String,

    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Check server health status from API /health endpoint")]
    Health,

    #[command(about = "Request the modification link for an email from the server")]
    Link {
        #[arg(help = "Member email")]
        email: String,
    },

    #[command(about = "Derive the modification key locally from MOD_LINK_SECRET")]
    Key {
        #[arg(help = "Member email")]
        email: String,

        #[arg(long, env = "MOD_LINK_SECRET", hide_env_values = true, help = "Secret shared with the server")]
        secret: Option<String>,
    },

    #[command(about = "Member listing, lookup and creation")]
    Members {
        #[command(subcommand)]
        cmd: commands::members::MemberCommands,
    },

    #[command(about = "Group management")]
    Groups {
        #[command(subcommand)]
        cmd: commands::groups::GroupCommands,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let client = ApiClient::new(&cli.server)?;

    match cli.command {
        Commands::Health => commands::links::health(&client, output_format).await,
        Commands::Link { email } => commands::links::link(&client, &email, output_format).await,
        Commands::Key { email, secret } => commands::links::key(&email, secret.as_deref(), output_format),
        Commands::Members { cmd } => commands::members::handle(cmd, &client, output_format).await,
        Commands::Groups { cmd } => commands::groups::handle(cmd, &client, output_format).await,
    }
}

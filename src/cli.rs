use clap::{Parser, Subcommand};

/// `agora` - governance client for content-addressed personal data
/// repositories.
#[derive(Parser, Debug)]
#[command(name = "agora")]
#[command(version = "0.1.0")]
#[command(about = "Submit, edit and endorse governance records.", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Store a session and cache the signing key (prompted, never echoed)
    Login {
        /// Repository identity (did)
        #[arg(long)]
        did: String,

        /// Service base URL (persisted to config when given)
        #[arg(long)]
        service: Option<String>,

        /// On-chain address forwarded with finalize requests
        #[arg(long)]
        ckb_addr: Option<String>,
    },

    /// Drop the session and destroy the cached signing key
    Logout,

    /// Submit a new funding proposal
    Propose {
        #[arg(long)]
        title: String,

        #[arg(long)]
        content: String,

        /// Requested budget, free-form (e.g. "5000 USD")
        #[arg(long)]
        budget: Option<String>,
    },

    /// Reply on a proposal timeline
    Reply {
        /// URI of the record being replied to
        #[arg(long)]
        to: String,

        #[arg(long)]
        content: String,
    },

    /// Endorse a record
    Like {
        /// URI of the record to like
        #[arg(long)]
        to: String,
    },

    /// Set your profile
    Profile {
        #[arg(long)]
        display_name: String,

        #[arg(long)]
        description: Option<String>,
    },

    /// Update an existing record at its original key
    Update {
        /// Record key the record was created under
        #[arg(long)]
        rkey: String,

        /// Full record value as JSON, including "$type"
        #[arg(long)]
        json: String,
    },
}

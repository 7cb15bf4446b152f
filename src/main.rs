#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

use agora_pds::client::RepoWriter;
use agora_pds::records::Record;
use agora_pds::signing::FileKeyStore;
use agora_pds::{Config, PdsClient, Session, WriteResult};
use anyhow::{Context, Result, bail};
use clap::Parser;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

mod cli;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to install tracing subscriber")?;

    let cli = Cli::parse();
    let mut config = Config::load()?;

    match cli.command {
        Commands::Login {
            did,
            service,
            ckb_addr,
        } => {
            if let Some(service) = service {
                config.service = service;
                config.save()?;
            }
            login(&config, did, ckb_addr)
        }
        Commands::Logout => logout(&config),
        Commands::Propose {
            title,
            content,
            budget,
        } => {
            submit(&config, None, Record::proposal(title, content, budget)).await
        }
        Commands::Reply { to, content } => {
            submit(&config, None, Record::reply(to, content)).await
        }
        Commands::Like { to } => {
            let session = require_session(&config)?;
            let viewer = session.did.clone();
            submit(&config, None, Record::like(to, viewer)).await
        }
        Commands::Profile {
            display_name,
            description,
        } => {
            submit(&config, None, Record::profile(display_name, description)).await
        }
        Commands::Update { rkey, json } => {
            let record: Record =
                serde_json::from_str(&json).context("record JSON did not match any $type")?;
            submit(&config, Some(rkey), record).await
        }
    }
}

fn login(config: &Config, did: String, ckb_addr: Option<String>) -> Result<()> {
    let access_token = dialoguer::Password::new()
        .with_prompt("Access token")
        .interact()
        .context("failed to read access token")?;
    let seed = dialoguer::Password::new()
        .with_prompt("Signing key (hex seed)")
        .interact()
        .context("failed to read signing key")?;

    FileKeyStore::new(&config.keystore_dir()).store(&seed)?;
    let session = Session {
        did,
        access_token,
        ckb_addr,
    };
    session.save(&config.session_path())?;
    println!("Logged in as {}", session.did);
    Ok(())
}

fn logout(config: &Config) -> Result<()> {
    FileKeyStore::new(&config.keystore_dir()).clear()?;
    Session::clear(&config.session_path())?;
    println!("Logged out");
    Ok(())
}

fn require_session(config: &Config) -> Result<Session> {
    match Session::load(&config.session_path())? {
        Some(session) => Ok(session),
        None => bail!("not logged in; run `agora login` first"),
    }
}

async fn submit(config: &Config, rkey: Option<String>, record: Record) -> Result<()> {
    let session = require_session(config)?;
    let client = PdsClient::new(&config.service, session)?;
    let keystore = Arc::new(FileKeyStore::new(&config.keystore_dir()));
    let writer = RepoWriter::new(client, keystore);

    let result = match rkey {
        Some(rkey) => writer.update_record(&rkey, &record).await?,
        None => writer.create_record(&record).await?,
    };
    print_result(&result);
    Ok(())
}

fn print_result(result: &WriteResult) {
    println!("uri: {}", result.uri);
    println!("cid: {}", result.cid);
}

use anyhow::Context;
use clap::{Parser, Subcommand};
use inquire::Password;
use metar_core::{
    AirportCode, Command as SessionCommand, Config, SessionOptions, category::category_for, session,
};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "metar", version, about = "METAR/TAF lookup by ICAO airport code")]
pub struct Cli {
    /// Log debug output to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the CheckWX API key.
    Configure,

    /// Show the current report for an airport.
    Show {
        /// 4-letter ICAO code, e.g. EHAM.
        icao: String,

        /// Also show the TAF forecast.
        #[arg(long)]
        taf: bool,
    },

    /// Type airport codes interactively; `:t` toggles METAR/TAF, `:q` quits.
    Watch {
        /// Airport to start with instead of the configured default.
        #[arg(long)]
        airport: Option<String>,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Show { icao, taf } => show(&icao, taf).await,
            Command::Watch { airport } => watch(airport).await,
        }
    }
}

fn configure() -> anyhow::Result<()> {
    let mut cfg = Config::load()?;

    let key = Password::new("CheckWX API key:")
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;

    cfg.set_api_key(key.trim().to_string());
    cfg.save()?;

    println!(
        "Saved configuration to {}",
        Config::config_file_path()?.display()
    );
    Ok(())
}

fn parse_code(icao: &str) -> anyhow::Result<AirportCode> {
    AirportCode::parse(icao).map_err(|err| anyhow::anyhow!("{}: {err}", err.kind()))
}

async fn show(icao: &str, with_taf: bool) -> anyhow::Result<()> {
    let code = parse_code(icao)?;
    let cfg = Config::load()?;
    let (metar, taf) = cfg.build_fetchers()?;

    info!(%code, with_taf, "one-shot lookup");
    let metar_state = metar.fetch(&code).await;
    println!("{}", render::metar(&metar_state));

    if with_taf {
        let category = category_for(code.as_str(), Some(&metar_state));
        let taf_state = taf.fetch(&code).await;
        println!();
        println!("{}", render::taf(&taf_state, category));
    }

    Ok(())
}

async fn watch(airport: Option<String>) -> anyhow::Result<()> {
    let cfg = Config::load()?;
    let (metar, taf) = cfg.build_fetchers()?;

    let options = SessionOptions {
        debounce: cfg.debounce(),
        initial_airport: airport.or(cfg.default_airport.clone()),
    };
    let handle = session::spawn(Arc::new(metar), Arc::new(taf), options);

    let mut snapshots = handle.snapshots();
    let printer = tokio::spawn(async move {
        while snapshots.changed().await.is_ok() {
            let snapshot = snapshots.borrow_and_update().clone();
            println!("{}", render::snapshot(&snapshot));
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let trimmed = line.trim().to_string();
        match trimmed.as_str() {
            ":q" => break,
            ":t" => handle.send(SessionCommand::ToggleView).await?,
            _ => handle.send(SessionCommand::Input(line)).await?,
        }
    }

    handle.shutdown().await;
    let _ = printer.await;
    Ok(())
}

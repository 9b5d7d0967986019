//! Cacho Scorekeeper CLI
//!
//! Every command opens the session cache, applies one action and writes the
//! session back before exiting.
//!
//! # Usage
//!
//! ```bash
//! cacho add-player "Ana" --team 1
//! cacho add-player "Beto" --team 2
//! cacho add-round --winner 1 --payout 10 --tripleta
//! cacho leaderboard
//! cacho finish
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Set to `debug` or `warn` to control logging verbosity
//! - `CACHO_DATA_DIR`: Data directory (default `.cacho`)

use cacho_scorekeeper::config::{DATA_DIR_ENV, DEFAULT_DATA_DIR};
use cacho_scorekeeper::leaderboard::{write_lifetime, write_stats};
use cacho_scorekeeper::{
    finalize_session, Config, DocumentStore, FileCache, FileDocumentStore, Money, Outcome, Result,
    ScoreError, SessionCache, Team,
};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::process;

#[derive(Debug, Parser)]
#[command(name = "cacho")]
#[command(about = "Scorekeeper for team dice games", long_about = None)]
struct Cli {
    /// Directory holding the session cache and the document store
    #[arg(long, global = true, env = DATA_DIR_ENV, default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Add a player to the roster
    AddPlayer {
        name: String,
        #[arg(short, long)]
        team: Team,
    },
    /// Remove a player (by id or name) from the roster
    RemovePlayer {
        player: String,
        #[arg(short, long)]
        yes: bool,
    },
    /// Record a round
    AddRound {
        /// 1, 2 or draw
        #[arg(short, long)]
        winner: Outcome,
        #[arg(short, long)]
        payout: Option<Money>,
        #[arg(long)]
        tripleta: bool,
    },
    /// Record rounds from a CSV file with winner,payout,tripleta columns
    ImportRounds { input: PathBuf },
    /// Remove the most recent round
    UndoRound {
        #[arg(short, long)]
        yes: bool,
    },
    /// Show the roster
    Status,
    /// Show the round history
    Rounds,
    /// Show the session leaderboard
    Leaderboard,
    /// Show lifetime records
    Lifetime,
    /// List players seen in earlier sessions
    KnownPlayers,
    /// List finished sessions
    History,
    /// Archive the session and merge it into lifetime records
    Finish,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::new(cli.data_dir);
    let mut cache = FileCache::open(config.cache_dir())?;
    let mut session = cache.load()?;
    let stdout = io::stdout();

    match cli.command {
        Command::AddPlayer { name, team } => {
            let store = FileDocumentStore::open(config.store_dir())?;
            let known = store.list_known_players()?;
            let player = session.add_player(&name, team, &known)?;
            println!("Added {} to team {}", player.name, player.team);
            cache.save(&session)?;
        }
        Command::RemovePlayer { player, yes } => {
            confirm(yes, "remove a player")?;
            let removed = session.remove_player(&player)?;
            println!("Removed {}", removed.name);
            cache.save(&session)?;
        }
        Command::AddRound {
            winner,
            payout,
            tripleta,
        } => {
            let payout = match (winner, payout) {
                (Outcome::Draw, _) => Money::ZERO,
                (Outcome::Win(_), Some(payout)) => payout,
                (Outcome::Win(_), None) => {
                    return Err(ScoreError::InvalidInput(
                        "a decisive round needs --payout".to_string(),
                    ))
                }
            };
            session.add_round(winner, payout, tripleta)?;
            cache.save(&session)?;
            session.write_rounds(stdout.lock())?;
        }
        Command::ImportRounds { input } => {
            let reader = BufReader::new(File::open(&input)?);
            let added = session.process_rounds_csv(reader)?;
            cache.save(&session)?;
            println!("Imported {} rounds", added);
        }
        Command::UndoRound { yes } => {
            confirm(yes, "delete the last round")?;
            session.remove_last_round()?;
            cache.save(&session)?;
            session.write_roster(stdout.lock())?;
        }
        Command::Status => session.write_roster(stdout.lock())?,
        Command::Rounds => session.write_rounds(stdout.lock())?,
        Command::Leaderboard => write_stats(&session.leaderboard(), stdout.lock())?,
        Command::Lifetime => {
            let store = FileDocumentStore::open(config.store_dir())?;
            write_lifetime(&store.list_lifetime_records()?, stdout.lock())?;
        }
        Command::KnownPlayers => {
            let store = FileDocumentStore::open(config.store_dir())?;
            let mut writer = csv::Writer::from_writer(stdout.lock());
            writer.write_record(["id", "name"])?;
            for known in store.list_known_players()? {
                writer.write_record([known.id, known.name])?;
            }
            writer.flush()?;
        }
        Command::History => {
            let store = FileDocumentStore::open(config.store_dir())?;
            let mut writer = csv::Writer::from_writer(stdout.lock());
            writer.write_record(["id", "created_at", "players", "rounds"])?;
            for doc in store.list_sessions()? {
                writer.write_record([
                    doc.id,
                    doc.created_at.to_string(),
                    doc.players.len().to_string(),
                    doc.rounds.len().to_string(),
                ])?;
            }
            writer.flush()?;
        }
        Command::Finish => {
            let mut store = FileDocumentStore::open(config.store_dir())?;
            let report = finalize_session(&session, &mut store)?;
            // Only clear once the store has confirmed both writes.
            cache.clear()?;
            println!("Finished session {}", report.session_id);
        }
    }

    Ok(())
}

fn confirm(yes: bool, action: &str) -> Result<()> {
    if yes {
        Ok(())
    } else {
        Err(ScoreError::ConfirmationRequired {
            action: action.to_string(),
        })
    }
}

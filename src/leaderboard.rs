//! Session-local leaderboard projection and CSV rendering.

use crate::error::Result;
use crate::lifetime::LifetimeRecord;
use crate::model::{Player, Round, Team};
use crate::money::Money;
use serde::Serialize;
use std::io::Write;

/// Per-player statistics for the session in progress.
///
/// Serializes to one CSV row of `name,wins,tripletas,balance`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerStats {
    #[serde(skip_serializing)]
    pub id: String,
    pub name: String,
    pub wins: u32,
    pub tripletas: u32,
    pub balance: Money,
}

/// Wins and tripleta wins credited to one team over a set of rounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub wins: u32,
    pub tripletas: u32,
}

/// Counts the rounds `team` won, and how many of those were tripletas.
pub fn tally(team: Team, rounds: &[Round]) -> Tally {
    rounds
        .iter()
        .filter(|r| r.won_by(team))
        .fold(Tally::default(), |mut acc, r| {
            acc.wins += 1;
            if r.tripleta {
                acc.tripletas += 1;
            }
            acc
        })
}

/// Projects the roster and round history into display rows, roster order.
pub fn project(players: &[Player], rounds: &[Round]) -> Vec<PlayerStats> {
    players
        .iter()
        .map(|player| {
            let Tally { wins, tripletas } = tally(player.team, rounds);
            PlayerStats {
                id: player.id.clone(),
                name: player.name.clone(),
                wins,
                tripletas,
                balance: player.total,
            }
        })
        .collect()
}

/// Writes session statistics as CSV.
///
/// The header is written explicitly so an empty roster still yields one.
pub fn write_stats<W: Write>(stats: &[PlayerStats], writer: W) -> Result<()> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);

    csv_writer.write_record(["name", "wins", "tripletas", "balance"])?;
    for row in stats {
        csv_writer.serialize(row)?;
    }

    csv_writer.flush()?;
    Ok(())
}

/// Writes lifetime records as CSV, highest balance first.
///
/// Ties fall back to the normalized name for deterministic output.
pub fn write_lifetime<W: Write>(records: &[LifetimeRecord], writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    let mut sorted: Vec<_> = records.iter().collect();
    sorted.sort_by(|a, b| {
        b.lifetime_balance
            .cmp(&a.lifetime_balance)
            .then_with(|| a.normalized_name.cmp(&b.normalized_name))
    });

    csv_writer.write_record(["name", "wins", "tripletas", "balance", "sessions"])?;
    for record in sorted {
        csv_writer.write_record([
            record.name.clone(),
            record.lifetime_wins.to_string(),
            record.lifetime_tripletas.to_string(),
            record.lifetime_balance.to_string(),
            record.sessions.len().to_string(),
        ])?;
    }

    csv_writer.flush()?;
    Ok(())
}

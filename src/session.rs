//! The session in progress: roster, round history and every user action.
//!
//! Each action either succeeds completely or leaves the session untouched,
//! so callers can write the state through to the cache after every `Ok`.

use crate::error::{Result, ScoreError};
use crate::leaderboard::{project, PlayerStats};
use crate::model::{Outcome, Player, Round, RoundRecord, Team};
use crate::money::Money;
use crate::roster::{normalize_name, resolve_player, KnownPlayer};
use crate::settlement::{replay, settle, stake};
use csv::{ReaderBuilder, Trim};
use log::{debug, info, warn};
use std::io::{Read, Write};
use uuid::Uuid;

/// Application state for one sitting at the table.
///
/// The session id is minted up front and survives restarts through the
/// cache, so a retried finalize merges under the same id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    id: String,
    players: Vec<Player>,
    rounds: Vec<Round>,
}

impl Session {
    /// Starts an empty session with a fresh id.
    pub fn new() -> Self {
        Session {
            id: Uuid::new_v4().to_string(),
            players: Vec::new(),
            rounds: Vec::new(),
        }
    }

    /// Rebuilds a session from cached parts.
    pub fn from_parts(id: String, players: Vec<Player>, rounds: Vec<Round>) -> Self {
        Session {
            id,
            players,
            rounds,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn rounds(&self) -> &[Round] {
        &self.rounds
    }

    /// Returns `true` if nothing has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.players.is_empty() && self.rounds.is_empty()
    }

    /// Adds a player to the roster.
    ///
    /// The name is resolved against `known` and the current roster so a
    /// returning player keeps their id. Blank names and players already on
    /// the roster are rejected.
    pub fn add_player(&mut self, name: &str, team: Team, known: &[KnownPlayer]) -> Result<&Player> {
        if name.trim().is_empty() {
            return Err(ScoreError::InvalidInput(
                "player name must not be empty".to_string(),
            ));
        }

        let mut candidates: Vec<KnownPlayer> = self.players.iter().map(KnownPlayer::from).collect();
        candidates.extend(known.iter().cloned());

        let player = resolve_player(name, team, &candidates);
        if self.players.iter().any(|p| p.id == player.id) {
            return Err(ScoreError::DuplicatePlayer { name: player.name });
        }

        debug!(
            "Session {}: added {} ({}) to team {}",
            self.id, player.name, player.id, team
        );
        self.players.push(player);
        Ok(&self.players[self.players.len() - 1])
    }

    /// Removes a player by id or (normalized) name.
    pub fn remove_player(&mut self, id_or_name: &str) -> Result<Player> {
        let wanted = normalize_name(id_or_name);
        let index = self
            .players
            .iter()
            .position(|p| p.id == id_or_name.trim() || normalize_name(&p.name) == wanted)
            .ok_or_else(|| ScoreError::PlayerNotFound(id_or_name.trim().to_string()))?;

        let removed = self.players.remove(index);
        debug!("Session {}: removed {}", self.id, removed.name);
        Ok(removed)
    }

    /// Records a round and settles it against the roster.
    ///
    /// Decisive rounds need a positive payout; draws are stored with no
    /// payout and no tripleta.
    pub fn add_round(&mut self, outcome: Outcome, payout: Money, tripleta: bool) -> Result<&Round> {
        if let Outcome::Win(_) = outcome {
            if !payout.is_positive() {
                return Err(ScoreError::InvalidInput(format!(
                    "payout must be positive for a decisive round, got {}",
                    payout
                )));
            }
        }

        let round = Round::new(outcome, payout, tripleta);
        let stake = stake(&round)?;
        let settled = settle(&self.players, &round)?;

        debug!(
            "Session {}: round {} ({}) stake {}",
            self.id,
            self.rounds.len() + 1,
            round.winner_label(),
            stake
        );
        self.players = settled;
        self.rounds.push(round);
        Ok(&self.rounds[self.rounds.len() - 1])
    }

    /// Removes the most recent round and recomputes balances from scratch.
    pub fn remove_last_round(&mut self) -> Result<Round> {
        let remaining = match self.rounds.split_last() {
            Some((_, rest)) => rest,
            None => return Err(ScoreError::NoRounds),
        };

        let players = replay(&self.players, remaining)?;
        self.players = players;
        let removed = self.rounds.pop().ok_or(ScoreError::NoRounds)?;

        debug!("Session {}: removed round {}", self.id, removed.id);
        Ok(removed)
    }

    /// Session-local standings in roster order.
    pub fn leaderboard(&self) -> Vec<PlayerStats> {
        project(&self.players, &self.rounds)
    }

    /// Adds rounds from a CSV stream with `winner,payout,tripleta` columns.
    ///
    /// Invalid rows are logged at warn level and skipped. Returns the number
    /// of rounds added.
    pub fn process_rounds_csv<R: Read>(&mut self, reader: R) -> Result<usize> {
        let mut csv_reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(reader);

        let mut added = 0;
        for (row_idx, result) in csv_reader.deserialize::<RoundRecord>().enumerate() {
            let row_num = row_idx + 2; // 1-indexed, accounting for header row

            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    warn!("Row {}: CSV parse error: {}", row_num, e);
                    continue;
                }
            };
            let Some(entry) = record.parse() else {
                warn!("Row {}: Failed to parse round record", row_num);
                continue;
            };

            match self.add_round(entry.outcome, entry.payout, entry.tripleta) {
                Ok(_) => added += 1,
                Err(e) => warn!("Row {}: {}", row_num, e),
            }
        }

        info!("Session {}: imported {} rounds", self.id, added);
        Ok(added)
    }

    /// Writes the roster as CSV, team 1 first, roster order within a team.
    pub fn write_roster<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(["id", "name", "team", "total"])?;
        for team in [Team::One, Team::Two] {
            for player in self.players.iter().filter(|p| p.team == team) {
                csv_writer.write_record([
                    player.id.clone(),
                    player.name.clone(),
                    player.team.to_string(),
                    player.total.to_string(),
                ])?;
            }
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Writes the round history as CSV, oldest first.
    pub fn write_rounds<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(["round", "winner", "payout", "tripleta", "stake"])?;
        for (i, round) in self.rounds.iter().enumerate() {
            csv_writer.write_record([
                (i + 1).to_string(),
                round.winner_label().to_string(),
                round.payout.to_string(),
                round.tripleta.to_string(),
                stake(round)?.to_string(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(())
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

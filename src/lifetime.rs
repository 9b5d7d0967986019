//! Cross-session lifetime statistics.
//!
//! Records are keyed by normalized player name. Each record remembers which
//! sessions it already absorbed, so merging a session twice is a no-op.

use crate::error::{Result, ScoreError};
use crate::leaderboard::{tally, Tally};
use crate::model::{Player, Round};
use crate::money::Money;
use crate::roster::{normalize_name, KnownPlayer};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// All lifetime records, keyed by normalized name.
pub type LifetimeBook = BTreeMap<String, LifetimeRecord>;

/// Persisted running totals for one named player.
///
/// # Invariants
///
/// - A session id appears in `sessions` at most once
/// - Totals only change together with the insertion of a new session id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifetimeRecord {
    /// Player id first seen under this name.
    pub id: String,
    pub name: String,
    pub normalized_name: String,
    #[serde(default)]
    pub lifetime_wins: u32,
    #[serde(default)]
    pub lifetime_tripletas: u32,
    #[serde(default)]
    pub lifetime_balance: Money,
    #[serde(default)]
    pub sessions: BTreeSet<String>,
}

impl LifetimeRecord {
    /// Creates an empty record for a player.
    pub fn new(player: &Player) -> Self {
        LifetimeRecord {
            id: player.id.clone(),
            name: player.name.clone(),
            normalized_name: normalize_name(&player.name),
            lifetime_wins: 0,
            lifetime_tripletas: 0,
            lifetime_balance: Money::ZERO,
            sessions: BTreeSet::new(),
        }
    }

    /// Returns `true` if `session_id` has already been merged.
    pub fn has_session(&self, session_id: &str) -> bool {
        self.sessions.contains(session_id)
    }

    /// Folds one session's results into the record.
    ///
    /// Returns `false` (leaving the record untouched) if the session was
    /// already applied.
    fn absorb(&mut self, session_id: &str, player: &Player, session: Tally) -> Result<bool> {
        if self.has_session(session_id) {
            return Ok(false);
        }

        let balance = self.lifetime_balance.checked_add(player.total).ok_or_else(|| {
            ScoreError::AmountOverflow(format!("merging {} into lifetime balance", player.name))
        })?;

        self.name = player.name.clone();
        self.lifetime_wins = self.lifetime_wins.saturating_add(session.wins);
        self.lifetime_tripletas = self.lifetime_tripletas.saturating_add(session.tripletas);
        self.lifetime_balance = balance;
        self.sessions.insert(session_id.to_string());
        Ok(true)
    }
}

/// Merges a finished session into the lifetime records.
///
/// Pure: `existing` is not modified, the merged book is returned. Players
/// whose record already lists `session_id` are skipped without error, which
/// makes applying the same session repeatedly idempotent. A lifetime balance
/// overflow fails the whole merge.
pub fn apply_session(
    session_id: &str,
    players: &[Player],
    rounds: &[Round],
    existing: &LifetimeBook,
) -> Result<LifetimeBook> {
    let mut book = existing.clone();
    let mut applied = 0usize;

    for player in players {
        let key = normalize_name(&player.name);
        let record = book
            .entry(key)
            .or_insert_with(|| LifetimeRecord::new(player));

        if record.absorb(session_id, player, tally(player.team, rounds))? {
            applied += 1;
        } else {
            debug!(
                "{} already counted for session {}, skipping",
                player.name, session_id
            );
        }
    }

    info!(
        "Session {}: merged {} of {} players into lifetime records",
        session_id,
        applied,
        players.len()
    );
    Ok(book)
}

/// Known players derived from the lifetime records, for name resolution.
pub fn known_players(book: &LifetimeBook) -> Vec<KnownPlayer> {
    book.values()
        .map(|r| KnownPlayer {
            id: r.id.clone(),
            name: r.name.clone(),
            normalized_name: r.normalized_name.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Outcome, Team};
    use crate::settlement::settle;
    use std::str::FromStr;

    fn finished_session() -> (Vec<Player>, Vec<Round>) {
        let mut players = vec![
            Player::new("a", "Ana", Team::One),
            Player::new("b", "Beto", Team::Two),
        ];
        let rounds = vec![
            Round::new(Outcome::Win(Team::One), Money::from(10), true),
            Round::new(Outcome::Win(Team::Two), Money::from(5), false),
        ];
        for round in &rounds {
            players = settle(&players, round).unwrap();
        }
        (players, rounds)
    }

    #[test]
    fn test_apply_creates_records() {
        let (players, rounds) = finished_session();
        let book = apply_session("s1", &players, &rounds, &LifetimeBook::new()).unwrap();

        let ana = &book["ana"];
        assert_eq!(ana.id, "a");
        assert_eq!(ana.lifetime_wins, 1);
        assert_eq!(ana.lifetime_tripletas, 1);
        assert_eq!(ana.lifetime_balance, Money::from(15));
        assert!(ana.has_session("s1"));

        let beto = &book["beto"];
        assert_eq!(beto.lifetime_wins, 1);
        assert_eq!(beto.lifetime_tripletas, 0);
        assert_eq!(beto.lifetime_balance, Money::from(-15));
    }

    #[test]
    fn test_apply_twice_is_idempotent() {
        let (players, rounds) = finished_session();
        let once = apply_session("s1", &players, &rounds, &LifetimeBook::new()).unwrap();
        let twice = apply_session("s1", &players, &rounds, &once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_second_session_accumulates() {
        let (players, rounds) = finished_session();
        let once = apply_session("s1", &players, &rounds, &LifetimeBook::new()).unwrap();
        let both = apply_session("s2", &players, &rounds, &once).unwrap();

        let ana = &both["ana"];
        assert_eq!(ana.lifetime_wins, 2);
        assert_eq!(ana.lifetime_balance, Money::from(30));
        assert_eq!(ana.sessions.len(), 2);
    }

    #[test]
    fn test_input_book_is_not_modified() {
        let (players, rounds) = finished_session();
        let empty = LifetimeBook::new();
        apply_session("s1", &players, &rounds, &empty).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_balance_overflow_fails_whole_merge() {
        let (players, rounds) = finished_session();
        let mut book = apply_session("s1", &players, &rounds, &LifetimeBook::new()).unwrap();
        let near_max = Money::from_str("79000000000000000000000000000").unwrap();
        book.get_mut("ana").unwrap().lifetime_balance = near_max;

        assert!(matches!(
            apply_session("s2", &players, &rounds, &book),
            Err(ScoreError::AmountOverflow(_))
        ));
        assert!(!book["ana"].has_session("s2"));
    }

    #[test]
    fn test_missing_counters_default_to_zero() {
        let json = r#"{"id":"x","name":"Old","normalizedName":"old"}"#;
        let record: LifetimeRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.lifetime_wins, 0);
        assert_eq!(record.lifetime_balance, Money::ZERO);
        assert!(record.sessions.is_empty());
    }

    #[test]
    fn test_known_players_from_book() {
        let (players, rounds) = finished_session();
        let book = apply_session("s1", &players, &rounds, &LifetimeBook::new()).unwrap();
        let known = known_players(&book);
        assert_eq!(known.len(), 2);
        assert!(known.iter().any(|k| k.id == "b" && k.normalized_name == "beto"));
    }
}

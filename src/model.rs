//! Players, rounds and the CSV row form of a round.

use crate::error::{Result, ScoreError};
use crate::money::Money;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// One of the two teams at the table.
///
/// Serialized as the bare number `1` or `2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Team {
    One,
    Two,
}

impl TryFrom<u8> for Team {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            1 => Ok(Team::One),
            2 => Ok(Team::Two),
            other => Err(format!("team must be 1 or 2, got {}", other)),
        }
    }
}

impl From<Team> for u8 {
    fn from(team: Team) -> Self {
        match team {
            Team::One => 1,
            Team::Two => 2,
        }
    }
}

impl FromStr for Team {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let value: u8 = s
            .trim()
            .parse()
            .map_err(|_| format!("team must be 1 or 2, got '{}'", s.trim()))?;
        Team::try_from(value)
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", u8::from(*self))
    }
}

/// The result of a round as the operator reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Win(Team),
    Draw,
}

impl FromStr for Outcome {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "draw" => Ok(Outcome::Draw),
            other => other
                .parse::<Team>()
                .map(Outcome::Win)
                .map_err(|_| format!("winner must be 1, 2 or draw, got '{}'", s.trim())),
        }
    }
}

/// A player on the current roster.
///
/// `total` is the running balance of the current, unsaved session only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Stable identifier, reused across sessions for the same normalized name.
    pub id: String,

    /// Canonical display name.
    pub name: String,

    pub team: Team,

    pub total: Money,
}

impl Player {
    /// Creates a player with a zero balance.
    pub fn new(id: impl Into<String>, name: impl Into<String>, team: Team) -> Self {
        Player {
            id: id.into(),
            name: name.into(),
            team,
            total: Money::ZERO,
        }
    }
}

/// A single settled round.
///
/// At most one of `team1_win` / `team2_win` is set; both clear is a draw.
/// Rounds are immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Round {
    pub id: String,
    pub team1_win: bool,
    pub team2_win: bool,
    pub payout: Money,
    pub tripleta: bool,

    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
}

impl Round {
    /// Creates a round with a fresh id and the current time.
    ///
    /// Draws never pay out and never carry a tripleta.
    pub fn new(outcome: Outcome, payout: Money, tripleta: bool) -> Self {
        let (team1_win, team2_win, payout, tripleta) = match outcome {
            Outcome::Win(Team::One) => (true, false, payout, tripleta),
            Outcome::Win(Team::Two) => (false, true, payout, tripleta),
            Outcome::Draw => (false, false, Money::ZERO, false),
        };

        Round {
            id: Uuid::new_v4().to_string(),
            team1_win,
            team2_win,
            payout,
            tripleta,
            timestamp: now_millis(),
        }
    }

    /// Returns the winning team, `None` for a draw.
    ///
    /// Fails with `InvalidRound` when both flags are set.
    pub fn winner(&self) -> Result<Option<Team>> {
        match (self.team1_win, self.team2_win) {
            (true, true) => Err(ScoreError::InvalidRound {
                round_id: self.id.clone(),
            }),
            (true, false) => Ok(Some(Team::One)),
            (false, true) => Ok(Some(Team::Two)),
            (false, false) => Ok(None),
        }
    }

    /// Returns `true` if `team`'s winner flag is set.
    pub fn won_by(&self, team: Team) -> bool {
        match team {
            Team::One => self.team1_win,
            Team::Two => self.team2_win,
        }
    }

    /// Human-readable winner label.
    pub fn winner_label(&self) -> &'static str {
        match (self.team1_win, self.team2_win) {
            (true, false) => "Team 1",
            (false, true) => "Team 2",
            (false, false) => "Draw",
            (true, true) => "Invalid",
        }
    }
}

/// Milliseconds since the Unix epoch, zero if the clock is before it.
pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Raw round row as read from a bulk-entry CSV.
///
/// Columns: `winner` (1, 2 or draw), `payout`, `tripleta`.
#[derive(Debug, Deserialize)]
pub struct RoundRecord {
    pub winner: String,

    /// Required for decisive rounds, ignored for draws.
    pub payout: Option<String>,

    pub tripleta: Option<String>,
}

/// A validated round entry ready to be added to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundEntry {
    pub outcome: Outcome,
    pub payout: Money,
    pub tripleta: bool,
}

impl RoundRecord {
    /// Parses the raw CSV record into a round entry.
    ///
    /// Returns `None` if the record is invalid (unknown winner, missing or
    /// non-positive payout on a decisive round, unreadable tripleta flag).
    pub fn parse(&self) -> Option<RoundEntry> {
        let outcome: Outcome = self.winner.parse().ok()?;

        match outcome {
            Outcome::Draw => Some(RoundEntry {
                outcome,
                payout: Money::ZERO,
                tripleta: false,
            }),
            Outcome::Win(_) => {
                let payout = self.parse_payout()?;
                if !payout.is_positive() {
                    return None;
                }
                Some(RoundEntry {
                    outcome,
                    payout,
                    tripleta: self.parse_tripleta()?,
                })
            }
        }
    }

    fn parse_payout(&self) -> Option<Money> {
        let raw = self.payout.as_ref()?;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Money::from_str(trimmed).ok()
    }

    fn parse_tripleta(&self) -> Option<bool> {
        let raw = match self.tripleta.as_ref() {
            Some(raw) => raw.trim().to_lowercase(),
            None => return Some(false),
        };

        match raw.as_str() {
            "" | "false" | "no" | "0" => Some(false),
            "true" | "yes" | "1" => Some(true),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(winner: &str, payout: Option<&str>, tripleta: Option<&str>) -> RoundRecord {
        RoundRecord {
            winner: winner.to_string(),
            payout: payout.map(str::to_string),
            tripleta: tripleta.map(str::to_string),
        }
    }

    #[test]
    fn test_team_serializes_as_number() {
        assert_eq!(serde_json::to_string(&Team::Two).unwrap(), "2");
        let team: Team = serde_json::from_str("1").unwrap();
        assert_eq!(team, Team::One);
        assert!(serde_json::from_str::<Team>("3").is_err());
    }

    #[test]
    fn test_outcome_parse() {
        assert_eq!("1".parse::<Outcome>().unwrap(), Outcome::Win(Team::One));
        assert_eq!(" 2 ".parse::<Outcome>().unwrap(), Outcome::Win(Team::Two));
        assert_eq!("DRAW".parse::<Outcome>().unwrap(), Outcome::Draw);
        assert!("3".parse::<Outcome>().is_err());
    }

    #[test]
    fn test_draw_round_drops_payout_and_tripleta() {
        let round = Round::new(Outcome::Draw, Money::from(10), true);
        assert!(!round.team1_win && !round.team2_win);
        assert!(round.payout.is_zero());
        assert!(!round.tripleta);
        assert_eq!(round.winner().unwrap(), None);
    }

    #[test]
    fn test_winner_rejects_both_flags() {
        let mut round = Round::new(Outcome::Win(Team::One), Money::from(5), false);
        round.team2_win = true;
        assert!(matches!(
            round.winner(),
            Err(ScoreError::InvalidRound { .. })
        ));
    }

    #[test]
    fn test_round_json_uses_camel_case_flags() {
        let round = Round::new(Outcome::Win(Team::Two), Money::from(3), true);
        let json = serde_json::to_string(&round).unwrap();
        assert!(json.contains("\"team1Win\":false"));
        assert!(json.contains("\"team2Win\":true"));
        assert!(json.contains("\"payout\":\"3.00\""));
    }

    #[test]
    fn test_parse_decisive_record() {
        let entry = record("1", Some(" 10 "), Some("yes")).parse().unwrap();
        assert_eq!(entry.outcome, Outcome::Win(Team::One));
        assert_eq!(entry.payout, Money::from(10));
        assert!(entry.tripleta);
    }

    #[test]
    fn test_parse_draw_record_ignores_payout() {
        let entry = record("draw", Some("10"), Some("true")).parse().unwrap();
        assert_eq!(entry.outcome, Outcome::Draw);
        assert!(entry.payout.is_zero());
        assert!(!entry.tripleta);
    }

    #[test]
    fn test_parse_rejects_invalid_records() {
        assert!(record("1", None, None).parse().is_none());
        assert!(record("2", Some("0"), None).parse().is_none());
        assert!(record("2", Some("-4"), None).parse().is_none());
        assert!(record("team", Some("4"), None).parse().is_none());
        assert!(record("1", Some("4"), Some("maybe")).parse().is_none());
    }
}

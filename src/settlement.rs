//! Round settlement.
//!
//! Every player on the winning team gains the round's stake and every player
//! on the losing team pays it. Draws leave all balances alone.

use crate::error::{Result, ScoreError};
use crate::model::{Player, Round};
use crate::money::Money;
use log::debug;

/// Stake multiplier applied when a round was won with a tripleta.
pub const TRIPLETA_MULTIPLIER: i64 = 2;

/// Effective stake of a round: the payout, doubled on a tripleta.
///
/// Fails with `AmountOverflow` if doubling leaves the representable range.
pub fn stake(round: &Round) -> Result<Money> {
    if !round.tripleta {
        return Ok(round.payout);
    }

    round.payout.checked_times(TRIPLETA_MULTIPLIER).ok_or_else(|| {
        ScoreError::AmountOverflow(format!("doubling payout of round {}", round.id))
    })
}

/// Applies one round to the roster, returning the updated roster.
///
/// The input is left untouched; the output keeps the same players in the
/// same order. Fails with `InvalidRound` if both teams are marked as winner
/// and with `AmountOverflow` if any balance would leave the representable
/// range.
pub fn settle(players: &[Player], round: &Round) -> Result<Vec<Player>> {
    let winner = match round.winner()? {
        Some(team) => team,
        None => {
            debug!("Round {}: draw, balances unchanged", round.id);
            return Ok(players.to_vec());
        }
    };

    let stake = stake(round)?;
    debug!("Round {}: team {} wins, stake {}", round.id, winner, stake);

    players
        .iter()
        .map(|player| -> Result<Player> {
            let total = if player.team == winner {
                player.total.checked_add(stake)
            } else {
                player.total.checked_sub(stake)
            };
            let total = total.ok_or_else(|| {
                ScoreError::AmountOverflow(format!(
                    "settling round {} for {}",
                    round.id, player.name
                ))
            })?;
            Ok(Player {
                total,
                ..player.clone()
            })
        })
        .collect()
}

/// Recomputes every balance from scratch over `rounds`.
pub fn replay(players: &[Player], rounds: &[Round]) -> Result<Vec<Player>> {
    let reset: Vec<Player> = players
        .iter()
        .map(|p| Player {
            total: Money::ZERO,
            ..p.clone()
        })
        .collect();

    rounds
        .iter()
        .try_fold(reset, |roster, round| settle(&roster, round))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Outcome, Team};
    use std::str::FromStr;

    fn roster() -> Vec<Player> {
        vec![
            Player::new("a", "A", Team::One),
            Player::new("b", "B", Team::Two),
        ]
    }

    fn totals(players: &[Player]) -> Vec<Money> {
        players.iter().map(|p| p.total).collect()
    }

    #[test]
    fn test_decisive_round_moves_payout() {
        let round = Round::new(Outcome::Win(Team::One), Money::from(10), false);
        let settled = settle(&roster(), &round).unwrap();
        assert_eq!(totals(&settled), vec![Money::from(10), Money::from(-10)]);
    }

    #[test]
    fn test_draw_leaves_totals_unchanged() {
        let round = Round::new(Outcome::Draw, Money::from(10), false);
        let settled = settle(&roster(), &round).unwrap();
        assert_eq!(totals(&settled), vec![Money::ZERO, Money::ZERO]);
    }

    #[test]
    fn test_tripleta_doubles_stake() {
        let round = Round::new(Outcome::Win(Team::One), Money::from(5), true);
        assert_eq!(stake(&round).unwrap(), Money::from(10));

        let settled = settle(&roster(), &round).unwrap();
        assert_eq!(totals(&settled), vec![Money::from(10), Money::from(-10)]);
    }

    #[test]
    fn test_team_two_win() {
        let round = Round::new(Outcome::Win(Team::Two), Money::from(3), false);
        let settled = settle(&roster(), &round).unwrap();
        assert_eq!(totals(&settled), vec![Money::from(-3), Money::from(3)]);
    }

    #[test]
    fn test_settle_does_not_mutate_input() {
        let players = roster();
        let round = Round::new(Outcome::Win(Team::Two), Money::from(4), false);
        let settled = settle(&players, &round).unwrap();

        assert_eq!(totals(&players), vec![Money::ZERO, Money::ZERO]);
        let ids: Vec<_> = settled.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_settle_rejects_double_winner() {
        let mut round = Round::new(Outcome::Win(Team::One), Money::from(4), false);
        round.team2_win = true;
        assert!(matches!(
            settle(&roster(), &round),
            Err(ScoreError::InvalidRound { .. })
        ));
    }

    #[test]
    fn test_huge_tripleta_payout_is_an_error() {
        let huge = Money::from_str("50000000000000000000000000000").unwrap();
        let round = Round::new(Outcome::Win(Team::One), huge, true);

        assert!(matches!(stake(&round), Err(ScoreError::AmountOverflow(_))));
        assert!(matches!(
            settle(&roster(), &round),
            Err(ScoreError::AmountOverflow(_))
        ));
    }

    #[test]
    fn test_balance_overflow_is_an_error() {
        let big = Money::from_str("50000000000000000000000000000").unwrap();
        let round = Round::new(Outcome::Win(Team::Two), big, false);

        let once = settle(&roster(), &round).unwrap();
        assert_eq!(once[1].total, big);
        assert!(matches!(
            settle(&once, &round),
            Err(ScoreError::AmountOverflow(_))
        ));
    }

    #[test]
    fn test_replay_matches_incremental_settlement() {
        let rounds = vec![
            Round::new(Outcome::Win(Team::One), Money::from(10), false),
            Round::new(Outcome::Win(Team::Two), Money::from(4), true),
            Round::new(Outcome::Draw, Money::ZERO, false),
        ];

        let mut incremental = roster();
        for round in &rounds {
            incremental = settle(&incremental, round).unwrap();
        }

        let mut dirty = roster();
        dirty[0].total = Money::from(99);
        let replayed = replay(&dirty, &rounds).unwrap();

        assert_eq!(replayed, incremental);
        assert_eq!(totals(&replayed), vec![Money::from(2), Money::from(-2)]);
    }
}

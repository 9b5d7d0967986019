//! Player name resolution.
//!
//! Names are matched case- and whitespace-insensitively so a player keeps
//! one identifier (and one lifetime record) however the operator types them.

use crate::model::{Player, Team};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A player seen in an earlier session (or already on the roster).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnownPlayer {
    pub id: String,
    pub name: String,
    pub normalized_name: String,
}

impl KnownPlayer {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let name = name.into();
        KnownPlayer {
            id: id.into(),
            normalized_name: normalize_name(&name),
            name,
        }
    }
}

impl From<&Player> for KnownPlayer {
    fn from(player: &Player) -> Self {
        KnownPlayer::new(player.id.clone(), player.name.clone())
    }
}

/// Trims and lowercases a name for lookups.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Builds a fresh roster entry for `input_name` on `team`.
///
/// A known player with the same normalized name lends its id and canonical
/// display name; otherwise a new id is minted and the trimmed input is kept
/// as typed.
pub fn resolve_player(input_name: &str, team: Team, known: &[KnownPlayer]) -> Player {
    let normalized = normalize_name(input_name);

    match known.iter().find(|k| k.normalized_name == normalized) {
        Some(existing) => Player::new(existing.id.clone(), existing.name.clone(), team),
        None => Player::new(Uuid::new_v4().to_string(), input_name.trim(), team),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("  Bob "), "bob");
        assert_eq!(normalize_name("ANA"), "ana");
    }

    #[test]
    fn test_unknown_player_gets_new_id_and_trimmed_name() {
        let player = resolve_player("  Carla ", Team::One, &[]);
        assert_eq!(player.name, "Carla");
        assert_eq!(player.team, Team::One);
        assert_eq!(player.total, Money::ZERO);
        assert!(Uuid::parse_str(&player.id).is_ok());
    }

    #[test]
    fn test_known_player_reuses_id_and_canonical_name() {
        let first = resolve_player(" Bob ", Team::One, &[]);
        let known = vec![KnownPlayer::from(&first)];

        let again = resolve_player("bob", Team::Two, &known);
        assert_eq!(again.id, first.id);
        assert_eq!(again.name, "Bob");
        assert_eq!(again.team, Team::Two);
    }

    #[test]
    fn test_distinct_names_get_distinct_ids() {
        let a = resolve_player("Ana", Team::One, &[]);
        let b = resolve_player("Beto", Team::One, &[KnownPlayer::from(&a)]);
        assert_ne!(a.id, b.id);
    }
}

//! # Cacho Scorekeeper
//!
//! Keeps score for a team dice game played between two teams: settles each
//! round's payout (doubled on a tripleta), projects the session leaderboard
//! and merges finished sessions into persisted lifetime records.
//!
//! ## Design Principles
//!
//! - **Fixed-point arithmetic**: Money uses 2 decimal places via `rust_decimal`
//! - **Explicit state**: A `Session` value carries the roster and history;
//!   settlement and projection are pure functions over it
//! - **Idempotent merges**: Lifetime records remember the sessions they absorbed
//! - **Nothing lost on failure**: The local cache is cleared only after the
//!   document store confirms a finalize
//!
//! ## Example
//!
//! ```
//! use cacho_scorekeeper::{finalize_session, MemoryStore, Money, Outcome, Session, Team};
//!
//! let mut session = Session::new();
//! session.add_player("Ana", Team::One, &[]).unwrap();
//! session.add_player("Beto", Team::Two, &[]).unwrap();
//! session.add_round(Outcome::Win(Team::One), Money::from(5), true).unwrap();
//!
//! assert_eq!(session.players()[0].total, Money::from(10));
//!
//! let mut store = MemoryStore::new();
//! finalize_session(&session, &mut store).unwrap();
//! ```

pub mod config;
pub mod error;
pub mod finalize;
pub mod leaderboard;
pub mod lifetime;
pub mod model;
pub mod money;
pub mod roster;
pub mod session;
pub mod settlement;
pub mod store;

pub use config::Config;
pub use error::{Result, ScoreError};
pub use finalize::{finalize_session, FinalizeReport};
pub use leaderboard::{project, PlayerStats};
pub use lifetime::{apply_session, LifetimeBook, LifetimeRecord};
pub use model::{Outcome, Player, Round, RoundRecord, Team};
pub use money::Money;
pub use roster::{normalize_name, resolve_player, KnownPlayer};
pub use session::Session;
pub use settlement::{replay, settle, stake};
pub use store::{
    DocumentStore, FileCache, FileDocumentStore, MemoryStore, SessionCache, SessionDocument,
};

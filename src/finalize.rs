//! Finishing a session: archive it, then merge it into lifetime records.

use crate::error::{Result, ScoreError};
use crate::lifetime::{apply_session, LifetimeBook};
use crate::session::Session;
use crate::store::{DocumentStore, SessionDocument};
use log::{debug, info, warn};

/// How many times a lifetime merge is retried after losing a race.
pub const MAX_COMMIT_ATTEMPTS: usize = 3;

/// What a successful finalize did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizeReport {
    pub session_id: String,

    /// `false` if an earlier attempt had already merged the session, in which
    /// case neither the archive nor the lifetime records were touched.
    pub archived: bool,

    /// Revision of the lifetime records after the merge.
    pub revision: u64,
}

/// Archives `session` and merges it into the lifetime records.
///
/// The session itself is never modified: on any error the caller still
/// holds the full roster and history and can retry. Until the merge lands,
/// each attempt rewrites the archived document, so edits made between a
/// failed attempt and the retry reach both the archive and the lifetime
/// records. Once merged, a retry under the same session id is a no-op.
pub fn finalize_session<S: DocumentStore + ?Sized>(
    session: &Session,
    store: &mut S,
) -> Result<FinalizeReport> {
    if session.players().is_empty() {
        return Err(ScoreError::InvalidInput(
            "cannot finish a session with no players".to_string(),
        ));
    }

    let mut snapshot = store.load_records()?;
    if is_merged(&snapshot.value, session.id()) {
        info!("Session {} was already finalized", session.id());
        return Ok(FinalizeReport {
            session_id: session.id().to_string(),
            archived: false,
            revision: snapshot.revision,
        });
    }

    let doc = SessionDocument::from_session(session);
    if !store.archive_session(&doc)? {
        debug!("Replaced archive left by an earlier attempt for {}", session.id());
    }

    for attempt in 1..=MAX_COMMIT_ATTEMPTS {
        if attempt > 1 {
            snapshot = store.load_records()?;
        }
        let merged = apply_session(
            session.id(),
            session.players(),
            session.rounds(),
            &snapshot.value,
        )?;

        match store.commit_records(snapshot.revision, &merged) {
            Ok(revision) => {
                info!(
                    "Finalized session {} ({} players, {} rounds)",
                    session.id(),
                    session.players().len(),
                    session.rounds().len()
                );
                return Ok(FinalizeReport {
                    session_id: session.id().to_string(),
                    archived: true,
                    revision,
                });
            }
            Err(ScoreError::Conflict { expected, found }) => {
                warn!(
                    "Attempt {}: lifetime records moved from revision {} to {}, retrying",
                    attempt, expected, found
                );
            }
            Err(e) => return Err(e),
        }
    }

    Err(ScoreError::Persistence(format!(
        "lifetime records kept changing; gave up after {} attempts",
        MAX_COMMIT_ATTEMPTS
    )))
}

fn is_merged(book: &LifetimeBook, session_id: &str) -> bool {
    book.values().any(|record| record.has_session(session_id))
}

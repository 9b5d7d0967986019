//! Persistence collaborators.
//!
//! Two stores back the scorekeeper:
//!
//! - **Session cache**: the in-progress roster and round history, written
//!   through after every successful action and cleared once a session is
//!   finalized.
//! - **Document store**: one archived document per finished session plus one
//!   lifetime record per normalized player name. Lifetime records are
//!   versioned and replaced as a whole with compare-and-set, so a session
//!   merge lands atomically or not at all.

use crate::error::{Result, ScoreError};
use crate::lifetime::{known_players, LifetimeBook, LifetimeRecord};
use crate::model::{now_millis, Player, Round};
use crate::roster::KnownPlayer;
use crate::session::Session;
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tempfile::NamedTempFile;

/// Cache key holding the roster.
pub const PLAYERS_KEY: &str = "players";

/// Cache key holding the round history.
pub const ROUNDS_KEY: &str = "rounds";

/// Cache key holding the id of the session in progress.
pub const SESSION_KEY: &str = "session";

/// Key-value cache for the session in progress.
pub trait SessionCache {
    /// Loads the cached session, or a fresh one if nothing is cached.
    fn load(&self) -> Result<Session>;

    /// Overwrites the cached session.
    fn save(&mut self, session: &Session) -> Result<()>;

    /// Resets the cache to an empty roster and history.
    fn clear(&mut self) -> Result<()>;
}

/// Session cache backed by one JSON file per key in a directory.
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    /// Opens (creating if needed) the cache directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(FileCache { dir })
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    fn read_entry<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match fs::read(self.entry_path(key)) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write_entry<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        write_atomic(&self.entry_path(key), &bytes)?;
        Ok(())
    }
}

impl SessionCache for FileCache {
    fn load(&self) -> Result<Session> {
        let players: Vec<Player> = self.read_entry(PLAYERS_KEY)?.unwrap_or_default();
        let rounds: Vec<Round> = self.read_entry(ROUNDS_KEY)?.unwrap_or_default();

        match self.read_entry::<String>(SESSION_KEY)? {
            Some(id) => Ok(Session::from_parts(id, players, rounds)),
            None => {
                let fresh = Session::new();
                Ok(Session::from_parts(fresh.id().to_string(), players, rounds))
            }
        }
    }

    fn save(&mut self, session: &Session) -> Result<()> {
        self.write_entry(PLAYERS_KEY, session.players())?;
        self.write_entry(ROUNDS_KEY, session.rounds())?;
        self.write_entry(SESSION_KEY, session.id())?;
        debug!("Cached session {}", session.id());
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.write_entry::<[Player]>(PLAYERS_KEY, &[])?;
        self.write_entry::<[Round]>(ROUNDS_KEY, &[])?;
        match fs::remove_file(self.entry_path(SESSION_KEY)) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        debug!("Cleared session cache in {}", self.dir.display());
        Ok(())
    }
}

/// A finalized session as archived in the document store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDocument {
    pub id: String,

    /// Milliseconds since the Unix epoch.
    pub created_at: u64,
    pub players: Vec<Player>,
    pub rounds: Vec<Round>,
}

impl SessionDocument {
    /// Snapshots a session for archiving.
    pub fn from_session(session: &Session) -> Self {
        SessionDocument {
            id: session.id().to_string(),
            created_at: now_millis(),
            players: session.players().to_vec(),
            rounds: session.rounds().to_vec(),
        }
    }
}

/// A value read together with the revision it was read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned<T> {
    pub revision: u64,
    pub value: T,
}

/// Durable store for finished sessions and lifetime records.
pub trait DocumentStore {
    /// Archives a finished session, replacing any earlier document with the
    /// same id. Returns `true` if the id was not archived before.
    fn archive_session(&mut self, doc: &SessionDocument) -> Result<bool>;

    /// All archived sessions, oldest first.
    fn list_sessions(&self) -> Result<Vec<SessionDocument>>;

    /// Reads every lifetime record with the current revision.
    fn load_records(&self) -> Result<Versioned<LifetimeBook>>;

    /// Replaces all lifetime records if the revision is still
    /// `expected_revision`. Returns the new revision, or `Conflict`.
    fn commit_records(&mut self, expected_revision: u64, book: &LifetimeBook) -> Result<u64>;

    /// Known players for name resolution.
    fn list_known_players(&self) -> Result<Vec<KnownPlayer>> {
        Ok(known_players(&self.load_records()?.value))
    }

    /// Every lifetime record, in key order.
    fn list_lifetime_records(&self) -> Result<Vec<LifetimeRecord>> {
        Ok(self.load_records()?.value.into_values().collect())
    }
}

/// On-disk layout of the lifetime records file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct RecordsFile {
    revision: u64,
    records: LifetimeBook,
}

/// How often a commit polls for the records lock before giving up.
const LOCK_ATTEMPTS: u32 = 20;

const LOCK_RETRY_DELAY: Duration = Duration::from_millis(50);

/// Exclusive hold on the lifetime records, released on drop.
///
/// The lock is a file created with `create_new`, so only one process can
/// hold it at a time.
struct RecordsLock {
    path: PathBuf,
}

impl RecordsLock {
    fn acquire(path: PathBuf) -> Result<Self> {
        for attempt in 1..=LOCK_ATTEMPTS {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(_) => return Ok(RecordsLock { path }),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    debug!("Lifetime records locked (attempt {}), waiting", attempt);
                    thread::sleep(LOCK_RETRY_DELAY);
                }
                Err(e) => return Err(ScoreError::persistence("locking lifetime records", e)),
            }
        }

        Err(ScoreError::Persistence(format!(
            "lifetime records are locked; remove {} if no other cacho process is running",
            path.display()
        )))
    }
}

impl Drop for RecordsLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!("Failed to release {}: {}", self.path.display(), e);
        }
    }
}

/// Document store backed by a directory of JSON files.
///
/// ```text
/// <root>/sessions/<session-id>.json
/// <root>/players.json
/// <root>/players.lock   (only while a commit is in progress)
/// ```
pub struct FileDocumentStore {
    root: PathBuf,
}

impl FileDocumentStore {
    /// Opens (creating if needed) the store directory.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(root.join("sessions"))
            .map_err(|e| ScoreError::persistence("creating store directory", e))?;
        Ok(FileDocumentStore { root })
    }

    fn session_path(&self, id: &str) -> PathBuf {
        self.root.join("sessions").join(format!("{}.json", id))
    }

    fn records_path(&self) -> PathBuf {
        self.root.join("players.json")
    }

    fn lock_path(&self) -> PathBuf {
        self.root.join("players.lock")
    }

    fn read_records_file(&self) -> Result<RecordsFile> {
        match fs::read(self.records_path()) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| ScoreError::persistence("decoding lifetime records", e)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(RecordsFile::default()),
            Err(e) => Err(ScoreError::persistence("reading lifetime records", e)),
        }
    }
}

impl DocumentStore for FileDocumentStore {
    fn archive_session(&mut self, doc: &SessionDocument) -> Result<bool> {
        let path = self.session_path(&doc.id);
        let replaced = path.exists();
        if replaced {
            debug!("Replacing archived session {}", doc.id);
        }

        let bytes = serde_json::to_vec_pretty(doc)
            .map_err(|e| ScoreError::persistence("encoding session", e))?;
        write_atomic(&path, &bytes).map_err(|e| ScoreError::persistence("writing session", e))?;
        Ok(!replaced)
    }

    fn list_sessions(&self) -> Result<Vec<SessionDocument>> {
        let entries = fs::read_dir(self.root.join("sessions"))
            .map_err(|e| ScoreError::persistence("listing sessions", e))?;

        let mut sessions = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| ScoreError::persistence("listing sessions", e))?
                .path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let bytes =
                fs::read(&path).map_err(|e| ScoreError::persistence("reading session", e))?;
            let doc: SessionDocument = serde_json::from_slice(&bytes)
                .map_err(|e| ScoreError::persistence("decoding session", e))?;
            sessions.push(doc);
        }

        sessions.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(sessions)
    }

    fn load_records(&self) -> Result<Versioned<LifetimeBook>> {
        let file = self.read_records_file()?;
        Ok(Versioned {
            revision: file.revision,
            value: file.records,
        })
    }

    fn commit_records(&mut self, expected_revision: u64, book: &LifetimeBook) -> Result<u64> {
        let _lock = RecordsLock::acquire(self.lock_path())?;

        let current = self.read_records_file()?.revision;
        if current != expected_revision {
            return Err(ScoreError::Conflict {
                expected: expected_revision,
                found: current,
            });
        }

        let file = RecordsFile {
            revision: current + 1,
            records: book.clone(),
        };
        let bytes = serde_json::to_vec_pretty(&file)
            .map_err(|e| ScoreError::persistence("encoding lifetime records", e))?;
        write_atomic(&self.records_path(), &bytes)
            .map_err(|e| ScoreError::persistence("writing lifetime records", e))?;

        debug!("Committed lifetime records at revision {}", file.revision);
        Ok(file.revision)
    }
}

/// In-process document store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    sessions: Vec<SessionDocument>,
    records: LifetimeBook,
    revision: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentStore for MemoryStore {
    fn archive_session(&mut self, doc: &SessionDocument) -> Result<bool> {
        match self.sessions.iter_mut().find(|s| s.id == doc.id) {
            Some(existing) => {
                *existing = doc.clone();
                Ok(false)
            }
            None => {
                self.sessions.push(doc.clone());
                Ok(true)
            }
        }
    }

    fn list_sessions(&self) -> Result<Vec<SessionDocument>> {
        Ok(self.sessions.clone())
    }

    fn load_records(&self) -> Result<Versioned<LifetimeBook>> {
        Ok(Versioned {
            revision: self.revision,
            value: self.records.clone(),
        })
    }

    fn commit_records(&mut self, expected_revision: u64, book: &LifetimeBook) -> Result<u64> {
        if self.revision != expected_revision {
            return Err(ScoreError::Conflict {
                expected: expected_revision,
                found: self.revision,
            });
        }
        self.records = book.clone();
        self.revision += 1;
        Ok(self.revision)
    }
}

/// Writes `bytes` to a temp file next to `path`, then renames it into place.
fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

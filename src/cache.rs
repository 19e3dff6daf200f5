use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Deterministic cache key for a song: hex MD5 of `"<artist>|<track>"`.
///
/// Stable across restarts; changing the algorithm or the input format
/// silently orphans every existing cache row, so don't. MD5 is fine here:
/// the key is an identifier, not a security boundary, and collisions over
/// a personal listening history are negligible.
pub fn cache_key(artist: &str, track: &str) -> String {
    format!("{:x}", md5::compute(format!("{artist}|{track}").as_bytes()))
}

/// Persistent translation cache, one SQLite table keyed by [`cache_key`].
///
/// Entries never expire and are never evicted; a stale translation is only
/// replaced through the force-refresh path. The database is opened per
/// operation so every read and write is its own transaction, which is
/// plenty for single-user traffic.
#[derive(Clone)]
pub struct TranslationCache {
    db_path: PathBuf,
}

impl TranslationCache {
    /// Open (or create) the cache database at the given path.
    pub fn open(db_path: &Path) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS translations (
                id TEXT PRIMARY KEY,
                artist TEXT NOT NULL,
                track TEXT NOT NULL,
                translated_lyrics TEXT NOT NULL,
                created_at TEXT NOT NULL
            );",
        )?;

        Ok(Self {
            db_path: db_path.to_path_buf(),
        })
    }

    fn connect(&self) -> Result<Connection> {
        Ok(Connection::open(&self.db_path)?)
    }

    /// Exact-match read for a song. `Ok(None)` on a miss; `Err` only on
    /// storage failure, which callers treat as a miss plus a warning.
    pub fn lookup(&self, artist: &str, track: &str) -> Result<Option<String>> {
        let key = cache_key(artist, track);
        let conn = self.connect()?;

        let result: Option<String> = conn
            .query_row(
                "SELECT translated_lyrics FROM translations WHERE id = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;

        if result.is_some() {
            debug!(artist, track, "translation cache hit");
        }
        Ok(result)
    }

    /// Upsert a translation: insert if absent, overwrite if present.
    /// Last write wins; persisted immediately.
    pub fn store(&self, artist: &str, track: &str, translated_lyrics: &str) -> Result<()> {
        let key = cache_key(artist, track);
        let conn = self.connect()?;

        conn.execute(
            "INSERT OR REPLACE INTO translations
             (id, artist, track, translated_lyrics, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                key,
                artist,
                track,
                translated_lyrics,
                chrono::Utc::now().to_rfc3339()
            ],
        )?;

        Ok(())
    }
}

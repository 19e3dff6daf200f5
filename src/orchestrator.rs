use anyhow::Result;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, warn};

use crate::access_log::{AccessLog, CacheUsed, LogEntry};
use crate::cache::TranslationCache;
use crate::lyrics::LyricsSource;
use crate::spotify::TrackSource;
use crate::translate::TranslationSource;

pub const NO_SONG_PLAYING: &str = "No song playing";
pub const LYRICS_NOT_FOUND: &str = "Lyrics not found";
pub const TRANSLATION_FAILED: &str = "Translation failed";

/// Whether a request consults the cache before the external services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheMode {
    /// Lookup first; fetch and translate only on a miss.
    Normal,
    /// Skip the lookup, always recompute, always overwrite the entry.
    Force,
}

/// JSON body of a `/lyrics` or `/force_lyrics` response. Timing and
/// cache fields are omitted on the short-circuit responses.
#[derive(Debug, Clone, Serialize)]
pub struct LyricsReport {
    pub artist: String,
    pub track: String,
    pub translated_lyrics: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub get_lyrics_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_used: Option<CacheUsed>,
}

impl LyricsReport {
    fn no_song() -> Self {
        Self {
            artist: NO_SONG_PLAYING.to_string(),
            track: NO_SONG_PLAYING.to_string(),
            translated_lyrics: NO_SONG_PLAYING.to_string(),
            get_lyrics_time: None,
            cache_used: None,
        }
    }

    fn error(message: String) -> Self {
        Self {
            artist: "Error".to_string(),
            track: "Error".to_string(),
            translated_lyrics: message,
            get_lyrics_time: None,
            cache_used: None,
        }
    }
}

/// Composes the per-request pipeline: resolve the current track, consult
/// the cache, fetch and translate on a miss, log, and shape the response.
///
/// Every collaborator is injected, so the whole flow is testable with
/// fakes and no process-wide state.
pub struct Orchestrator {
    tracks: Arc<dyn TrackSource>,
    lyrics: Arc<dyn LyricsSource>,
    translator: Arc<dyn TranslationSource>,
    cache: TranslationCache,
    access_log: AccessLog,
}

impl Orchestrator {
    pub fn new(
        tracks: Arc<dyn TrackSource>,
        lyrics: Arc<dyn LyricsSource>,
        translator: Arc<dyn TranslationSource>,
        cache: TranslationCache,
        access_log: AccessLog,
    ) -> Self {
        Self {
            tracks,
            lyrics,
            translator,
            cache,
            access_log,
        }
    }

    /// Handle one lyrics request. Failures from the external services are
    /// absorbed here and reported as an error payload; a single bad
    /// request never takes the server down.
    pub async fn lyrics_report(&self, remote_addr: &str, mode: CacheMode) -> LyricsReport {
        match self.run(remote_addr, mode).await {
            Ok(report) => report,
            Err(e) => {
                error!(error = %e, "lyrics request failed");
                LyricsReport::error(e.to_string())
            }
        }
    }

    async fn run(&self, remote_addr: &str, mode: CacheMode) -> Result<LyricsReport> {
        // Step 1: resolve the current track. No track is terminal and
        // never touches the cache.
        let Some(current) = self.tracks.currently_playing().await? else {
            return Ok(LyricsReport::no_song());
        };

        let started = Instant::now();

        let (translated, cache_used) = match mode {
            CacheMode::Force => (
                self.fetch_and_store(&current.artist, &current.track).await?,
                CacheUsed::Force,
            ),
            CacheMode::Normal => {
                let hit = match self.cache.lookup(&current.artist, &current.track) {
                    Ok(hit) => hit,
                    Err(e) => {
                        // Degrade to no-cache rather than failing the request
                        warn!(error = %e, "cache lookup failed, treating as miss");
                        None
                    }
                };

                match hit {
                    Some(translated) => (Some(translated), CacheUsed::Yes),
                    None => (
                        self.fetch_and_store(&current.artist, &current.track).await?,
                        CacheUsed::No,
                    ),
                }
            }
        };

        let get_lyrics_time = started.elapsed().as_secs_f64();

        let log_entry = LogEntry {
            track: current.track.clone(),
            artist: current.artist.clone(),
            remote_addr: remote_addr.to_string(),
            duration_seconds: get_lyrics_time,
            cache_used,
        };
        if let Err(e) = self.access_log.record(&log_entry) {
            warn!(error = %e, "failed to record access log entry");
        }

        Ok(LyricsReport {
            artist: current.artist,
            track: current.track,
            translated_lyrics: translated.unwrap_or_else(|| LYRICS_NOT_FOUND.to_string()),
            get_lyrics_time: Some(get_lyrics_time),
            cache_used: Some(cache_used),
        })
    }

    /// Cache-miss path: fetch lyrics, translate, persist. `Ok(None)` when
    /// the lyrics service has nothing; in that case nothing is cached.
    /// A failed translation collapses to a sentinel served with the real
    /// song info — never stored, so the next request retries it.
    async fn fetch_and_store(&self, artist: &str, track: &str) -> Result<Option<String>> {
        let Some(lyrics) = self.lyrics.search(track, artist).await? else {
            return Ok(None);
        };

        let translated = match self.translator.translate(&lyrics).await {
            Ok(translated) => translated,
            Err(e) => {
                warn!(error = %e, "translation failed");
                return Ok(Some(TRANSLATION_FAILED.to_string()));
            }
        };

        if let Err(e) = self.cache.store(artist, track, &translated) {
            warn!(error = %e, "cache store failed, serving uncached result");
        }

        Ok(Some(translated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spotify::CurrentTrack;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeTracks(Option<CurrentTrack>);

    #[async_trait]
    impl TrackSource for FakeTracks {
        async fn currently_playing(&self) -> Result<Option<CurrentTrack>> {
            Ok(self.0.clone())
        }
    }

    struct FakeLyrics {
        lyrics: Option<String>,
        calls: AtomicUsize,
    }

    impl FakeLyrics {
        fn found(lyrics: &str) -> Self {
            Self {
                lyrics: Some(lyrics.to_string()),
                calls: AtomicUsize::new(0),
            }
        }

        fn not_found() -> Self {
            Self {
                lyrics: None,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl LyricsSource for FakeLyrics {
        async fn search(&self, _track: &str, _artist: &str) -> Result<Option<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.lyrics.clone())
        }
    }

    struct FakeTranslator {
        calls: AtomicUsize,
    }

    impl FakeTranslator {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl TranslationSource for FakeTranslator {
        async fn translate(&self, lyrics: &str) -> Result<String> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(format!("JP#{n}: {lyrics}"))
        }
    }

    struct FailingTranslator;

    #[async_trait]
    impl TranslationSource for FailingTranslator {
        async fn translate(&self, _lyrics: &str) -> Result<String> {
            Err(anyhow::anyhow!("translation service unavailable"))
        }
    }

    struct FailingLyrics;

    #[async_trait]
    impl LyricsSource for FailingLyrics {
        async fn search(&self, _track: &str, _artist: &str) -> Result<Option<String>> {
            Err(anyhow::anyhow!("lyrics service unavailable"))
        }
    }

    fn temp_cache(name: &str) -> TranslationCache {
        let path = std::env::temp_dir().join(format!(
            "kashi-orch-test-{}-{}.sqlite3",
            name,
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);
        TranslationCache::open(&path).unwrap()
    }

    fn temp_log(name: &str) -> (AccessLog, std::path::PathBuf) {
        let path = std::env::temp_dir().join(format!(
            "kashi-orch-log-{}-{}.csv",
            name,
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);
        (AccessLog::new(&path), path)
    }

    fn playing(artist: &str, track: &str) -> Arc<FakeTracks> {
        Arc::new(FakeTracks(Some(CurrentTrack {
            track: track.to_string(),
            artist: artist.to_string(),
        })))
    }

    #[tokio::test]
    async fn test_no_song_playing_short_circuits() {
        let lyrics = Arc::new(FakeLyrics::found("some lyrics"));
        let translator = Arc::new(FakeTranslator::new());
        let (log, log_path) = temp_log("no-song");
        let orchestrator = Orchestrator::new(
            Arc::new(FakeTracks(None)),
            lyrics.clone(),
            translator.clone(),
            temp_cache("no-song"),
            log,
        );

        let report = orchestrator.lyrics_report("127.0.0.1", CacheMode::Normal).await;

        assert_eq!(report.artist, NO_SONG_PLAYING);
        assert_eq!(report.track, NO_SONG_PLAYING);
        assert_eq!(report.translated_lyrics, NO_SONG_PLAYING);
        assert_eq!(lyrics.calls.load(Ordering::SeqCst), 0);
        assert_eq!(translator.calls.load(Ordering::SeqCst), 0);
        // Terminal response, no log row
        assert!(!log_path.exists());

        // Exact response shape: timing and cache fields omitted
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "artist": "No song playing",
                "track": "No song playing",
                "translated_lyrics": "No song playing"
            })
        );
    }

    #[tokio::test]
    async fn test_lyrics_not_found_caches_nothing() {
        let translator = Arc::new(FakeTranslator::new());
        let cache = temp_cache("not-found");
        let (log, _) = temp_log("not-found");
        let orchestrator = Orchestrator::new(
            playing("Obscure Artist", "Unreleased Demo"),
            Arc::new(FakeLyrics::not_found()),
            translator.clone(),
            cache.clone(),
            log,
        );

        let report = orchestrator.lyrics_report("127.0.0.1", CacheMode::Normal).await;

        assert_eq!(report.artist, "Obscure Artist");
        assert_eq!(report.track, "Unreleased Demo");
        assert_eq!(report.translated_lyrics, LYRICS_NOT_FOUND);
        assert_eq!(translator.calls.load(Ordering::SeqCst), 0);

        // Cache untouched: the pair still misses
        assert!(cache
            .lookup("Obscure Artist", "Unreleased Demo")
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_cache_miss_then_hit() {
        let lyrics = Arc::new(FakeLyrics::found("Is this the real life?"));
        let translator = Arc::new(FakeTranslator::new());
        let cache = temp_cache("miss-then-hit");
        let (log, log_path) = temp_log("miss-then-hit");
        let orchestrator = Orchestrator::new(
            playing("Queen", "Bohemian Rhapsody"),
            lyrics.clone(),
            translator.clone(),
            cache.clone(),
            log,
        );

        // First request: miss, translator invoked, result stored
        let first = orchestrator.lyrics_report("127.0.0.1", CacheMode::Normal).await;
        assert_eq!(first.cache_used, Some(CacheUsed::No));
        assert_eq!(first.translated_lyrics, "JP#1: Is this the real life?");
        assert_eq!(translator.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            cache.lookup("Queen", "Bohemian Rhapsody").unwrap(),
            Some("JP#1: Is this the real life?".to_string())
        );
        assert!(first.get_lyrics_time.is_some());

        // Second request: hit, translator NOT invoked, identical lyrics
        let second = orchestrator.lyrics_report("127.0.0.1", CacheMode::Normal).await;
        assert_eq!(second.cache_used, Some(CacheUsed::Yes));
        assert_eq!(second.translated_lyrics, first.translated_lyrics);
        assert_eq!(translator.calls.load(Ordering::SeqCst), 1);

        // One log row per request plus the header
        let log_contents = std::fs::read_to_string(&log_path).unwrap();
        assert_eq!(log_contents.lines().count(), 3);
        assert!(log_contents.lines().nth(1).unwrap().ends_with(",No"));
        assert!(log_contents.lines().nth(2).unwrap().ends_with(",Yes"));
    }

    #[tokio::test]
    async fn test_force_refresh_overwrites_cached_entry() {
        let lyrics = Arc::new(FakeLyrics::found("lyrics text"));
        let translator = Arc::new(FakeTranslator::new());
        let cache = temp_cache("force");
        let (log, _) = temp_log("force");
        let orchestrator = Orchestrator::new(
            playing("Queen", "Bohemian Rhapsody"),
            lyrics.clone(),
            translator.clone(),
            cache.clone(),
            log,
        );

        let first = orchestrator.lyrics_report("127.0.0.1", CacheMode::Normal).await;
        assert_eq!(first.translated_lyrics, "JP#1: lyrics text");

        // Force path: translator invoked despite the cache entry
        let forced = orchestrator.lyrics_report("127.0.0.1", CacheMode::Force).await;
        assert_eq!(forced.cache_used, Some(CacheUsed::Force));
        assert_eq!(forced.translated_lyrics, "JP#2: lyrics text");
        assert_eq!(translator.calls.load(Ordering::SeqCst), 2);

        // Entry overwritten, not versioned
        assert_eq!(
            cache.lookup("Queen", "Bohemian Rhapsody").unwrap(),
            Some("JP#2: lyrics text".to_string())
        );
    }

    #[tokio::test]
    async fn test_translator_failure_serves_sentinel_with_song_info() {
        let (log, _) = temp_log("translate-fail");
        let cache = temp_cache("translate-fail");
        let orchestrator = Orchestrator::new(
            playing("Queen", "Bohemian Rhapsody"),
            Arc::new(FakeLyrics::found("lyrics")),
            Arc::new(FailingTranslator),
            cache.clone(),
            log,
        );

        let report = orchestrator.lyrics_report("127.0.0.1", CacheMode::Normal).await;

        // Artist and track survive a translation failure
        assert_eq!(report.artist, "Queen");
        assert_eq!(report.track, "Bohemian Rhapsody");
        assert_eq!(report.translated_lyrics, TRANSLATION_FAILED);
        assert_eq!(report.cache_used, Some(CacheUsed::No));

        // The sentinel is never cached; the next request retries
        assert!(cache.lookup("Queen", "Bohemian Rhapsody").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_lyrics_call_failure_becomes_error_payload() {
        let (log, _) = temp_log("error");
        let orchestrator = Orchestrator::new(
            playing("Queen", "Bohemian Rhapsody"),
            Arc::new(FailingLyrics),
            Arc::new(FakeTranslator::new()),
            temp_cache("error"),
            log,
        );

        let report = orchestrator.lyrics_report("127.0.0.1", CacheMode::Normal).await;

        assert_eq!(report.artist, "Error");
        assert_eq!(report.track, "Error");
        assert_eq!(report.translated_lyrics, "lyrics service unavailable");
        assert!(report.cache_used.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_cache_degrades_to_no_cache() {
        let lyrics = Arc::new(FakeLyrics::found("lyrics"));
        let translator = Arc::new(FakeTranslator::new());

        // Point the cache at a database whose table vanished out from
        // under it, so both lookup and store fail
        let path = std::env::temp_dir().join(format!(
            "kashi-orch-test-degraded-{}.sqlite3",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);
        let cache = TranslationCache::open(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        std::fs::write(&path, b"not a sqlite database").unwrap();

        let (log, _) = temp_log("degraded");
        let orchestrator = Orchestrator::new(
            playing("Queen", "Bohemian Rhapsody"),
            lyrics,
            translator.clone(),
            cache,
            log,
        );

        // Request still succeeds, served without cache
        let report = orchestrator.lyrics_report("127.0.0.1", CacheMode::Normal).await;
        assert_eq!(report.cache_used, Some(CacheUsed::No));
        assert_eq!(report.translated_lyrics, "JP#1: lyrics");
    }
}

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;

pub mod api;
pub mod parser;

pub use api::GeniusClient;

/// Lyrics lookup by (track, artist). `Ok(None)` means the service has no
/// lyrics for the song; `Err` means the call itself failed.
#[async_trait]
pub trait LyricsSource: Send + Sync {
    async fn search(&self, track: &str, artist: &str) -> Result<Option<String>>;
}

// Genius search API response shapes (only the fields we read)

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    pub response: SearchBody,
}

#[derive(Debug, Deserialize)]
pub struct SearchBody {
    pub hits: Vec<SearchHit>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchHit {
    pub result: SongResult,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SongResult {
    pub title: String,
    pub url: String,
    pub primary_artist: ArtistRef,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArtistRef {
    pub name: String,
}

impl SongResult {
    /// Loose artist comparison: Genius often decorates names with
    /// featured artists or different casing.
    pub fn matches_artist(&self, artist: &str) -> bool {
        let hit_artist = self.primary_artist.name.to_lowercase();
        let wanted = artist.to_lowercase();
        hit_artist == wanted || hit_artist.contains(&wanted) || wanted.contains(&hit_artist)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song(title: &str, artist: &str) -> SongResult {
        SongResult {
            title: title.to_string(),
            url: format!("https://genius.com/{}", title.replace(' ', "-")),
            primary_artist: ArtistRef {
                name: artist.to_string(),
            },
        }
    }

    #[test]
    fn test_matches_artist_exact() {
        let result = song("Bohemian Rhapsody", "Queen");
        assert!(result.matches_artist("Queen"));
        assert!(result.matches_artist("queen"));
        assert!(!result.matches_artist("David Bowie"));
    }

    #[test]
    fn test_matches_artist_decorated_name() {
        let result = song("Under Pressure", "Queen & David Bowie");
        assert!(result.matches_artist("Queen"));
        assert!(result.matches_artist("David Bowie"));
        assert!(!result.matches_artist("The Beatles"));
    }

    #[test]
    fn test_search_response_parsing() {
        let json = r#"{
            "response": {
                "hits": [
                    {
                        "result": {
                            "title": "Bohemian Rhapsody",
                            "url": "https://genius.com/Queen-bohemian-rhapsody-lyrics",
                            "primary_artist": {"name": "Queen"}
                        }
                    }
                ]
            }
        }"#;

        let parsed: SearchResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.response.hits.len(), 1);
        let result = &parsed.response.hits[0].result;
        assert_eq!(result.title, "Bohemian Rhapsody");
        assert_eq!(result.primary_artist.name, "Queen");
    }

    #[test]
    fn test_search_response_empty_hits() {
        let json = r#"{"response": {"hits": []}}"#;
        let parsed: SearchResponse = serde_json::from_str(json).unwrap();
        assert!(parsed.response.hits.is_empty());
    }
}

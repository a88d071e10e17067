//! TheAudioDB client for artist imagery.
//!
//! Multi-album mode shows the artist's logo above the game when one is
//! available. TheAudioDB requires an API key; without one configured the
//! lookup is disabled and the game simply renders without a logo.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::domain::CatalogError;

/// Request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// TheAudioDB API client
pub struct AudioDbClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

/// Artist lookup response. The `artists` field is null (not an empty
/// array) when the MBID is unknown to TheAudioDB.
#[derive(Debug, Clone, Deserialize, Serialize)]
struct ArtistResponse {
    artists: Option<Vec<ArtistDto>>,
}

/// The subset of TheAudioDB's (very wide) artist record we read.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct ArtistDto {
    str_artist: Option<String>,
    str_artist_logo: Option<String>,
}

impl AudioDbClient {
    /// Create a client. `api_key: None` disables lookups.
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_base_url("https://www.theaudiodb.com/api/v1/json", api_key)
    }

    /// Create a client with a custom base URL (config override, tests).
    pub fn with_base_url(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            http_client,
            base_url: base_url.into(),
            api_key,
        }
    }

    /// Look up an artist's logo URL by MusicBrainz artist id.
    ///
    /// Returns `Ok(None)` when the artist is unknown, has no logo, or no
    /// API key is configured. Transport failures are real errors - the
    /// caller decides whether a missing logo is worth reporting.
    pub async fn artist_logo(&self, artist_mbid: &str) -> Result<Option<String>, CatalogError> {
        let Some(ref api_key) = self.api_key else {
            debug!("No TheAudioDB API key configured, skipping artist logo lookup");
            return Ok(None);
        };

        let url = format!(
            "{}/{}/artist-mb.php?i={}",
            self.base_url,
            api_key,
            urlencoding::encode(artist_mbid)
        );

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| CatalogError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Network(format!(
                "HTTP {}: {}",
                status,
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        let body: ArtistResponse = response
            .json()
            .await
            .map_err(|e| CatalogError::Parse(e.to_string()))?;

        let logo = body
            .artists
            .and_then(|artists| artists.into_iter().next())
            .and_then(|artist| artist.str_artist_logo)
            .filter(|url| !url.is_empty());

        Ok(logo)
    }
}

//! MusicBrainz HTTP client
//!
//! Handles communication with the MusicBrainz web service.
//! See: https://musicbrainz.org/doc/MusicBrainz_API
//!
//! IMPORTANT: MusicBrainz requires a User-Agent header and rate limits to 1 req/sec.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{Instant, sleep};
use tracing::debug;

use super::{adapter, dto};
use crate::catalog::domain::{ArtistHit, CatalogError, Release, ReleaseGroup};

/// User agent string - MusicBrainz requires this
const USER_AGENT: &str = concat!(
    "GuessTheSongs/",
    env!("CARGO_PKG_VERSION"),
    " (https://github.com/guess-the-songs)"
);

/// Request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Rate limit: 1 request per second (MusicBrainz TOS)
const RATE_LIMIT_INTERVAL: Duration = Duration::from_millis(1000);

/// MusicBrainz API client
pub struct MusicBrainzClient {
    http_client: reqwest::Client,
    base_url: String,
    /// Last request time, shared across concurrent callers
    rate_limiter: Mutex<Option<Instant>>,
}

impl MusicBrainzClient {
    /// Create a new client against the public API.
    pub fn new() -> Self {
        Self::with_base_url("https://musicbrainz.org/ws/2")
    }

    /// Create a client with a custom base URL (config override, tests).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            http_client,
            base_url: base_url.into(),
            rate_limiter: Mutex::new(None),
        }
    }

    /// Search release groups by album + artist free text.
    ///
    /// Restricted to official primary albums/EPs, excluding the given
    /// secondary types (live, remix, ...). Results come back best score
    /// first; an empty vec means a genuine "no match", never a failure.
    pub async fn search_release_groups(
        &self,
        album: &str,
        artist: &str,
        excluded_secondary_types: &[String],
    ) -> Result<Vec<ReleaseGroup>, CatalogError> {
        let query = format!(
            "releasegroup:{} AND artist:\"{}\"{}",
            sanitize_term(album),
            sanitize_term(artist),
            type_restriction(excluded_secondary_types),
        );
        let url = format!(
            "{}/release-group?query={}&fmt=json&limit=25",
            self.base_url,
            urlencoding::encode(&query)
        );

        let response: dto::ReleaseGroupSearchResponse = self.send_json(&url).await?;
        Ok(response
            .release_groups
            .into_iter()
            .map(adapter::to_release_group)
            .collect())
    }

    /// All qualifying release groups for one artist (multi-album mode).
    pub async fn release_groups_by_artist(
        &self,
        artist_id: &str,
        excluded_secondary_types: &[String],
    ) -> Result<Vec<ReleaseGroup>, CatalogError> {
        let query = format!(
            "arid:{}{}",
            sanitize_term(artist_id),
            type_restriction(excluded_secondary_types),
        );
        let url = format!(
            "{}/release-group?query={}&fmt=json&limit=100",
            self.base_url,
            urlencoding::encode(&query)
        );

        let response: dto::ReleaseGroupSearchResponse = self.send_json(&url).await?;
        Ok(response
            .release_groups
            .into_iter()
            .map(adapter::to_release_group)
            .collect())
    }

    /// Search artists by name.
    pub async fn search_artists(&self, name: &str) -> Result<Vec<ArtistHit>, CatalogError> {
        let url = format!(
            "{}/artist?query={}&fmt=json&limit=10",
            self.base_url,
            urlencoding::encode(name)
        );

        let response: dto::ArtistSearchResponse = self.send_json(&url).await?;
        Ok(response.artists.into_iter().map(adapter::to_artist_hit).collect())
    }

    /// All official releases (with media, no track bodies) of a release group.
    pub async fn releases_for_release_group(
        &self,
        release_group_id: &str,
    ) -> Result<Vec<Release>, CatalogError> {
        let url = format!(
            "{}/release?release-group={}&fmt=json&inc=media&status=official&limit=100",
            self.base_url,
            urlencoding::encode(release_group_id)
        );

        let response: dto::ReleaseBrowseResponse = self.send_json(&url).await?;
        Ok(response.releases.into_iter().map(adapter::to_release).collect())
    }

    /// One release with its full track list and owning release group.
    ///
    /// Fails with [`CatalogError::NotFound`] when the id does not resolve.
    pub async fn release_with_tracks(&self, release_id: &str) -> Result<Release, CatalogError> {
        let url = format!(
            "{}/release/{}?fmt=json&inc=recordings+release-groups+artist-credits",
            self.base_url,
            urlencoding::encode(release_id)
        );

        let response: dto::Release = self.send_json(&url).await?;
        Ok(adapter::to_release(response))
    }

    /// One release with just its release group and credits (no tracks).
    ///
    /// Used to caption a stored release id with album/artist names.
    pub async fn release_group_for_release(
        &self,
        release_id: &str,
    ) -> Result<Release, CatalogError> {
        let url = format!(
            "{}/release/{}?fmt=json&inc=release-groups+artist-credits",
            self.base_url,
            urlencoding::encode(release_id)
        );

        let response: dto::Release = self.send_json(&url).await?;
        Ok(adapter::to_release(response))
    }

    /// Enforce rate limit (1 request/second)
    ///
    /// MusicBrainz Terms of Service requires rate limiting.
    /// This method sleeps if necessary to maintain 1 req/sec limit.
    async fn enforce_rate_limit(&self) {
        let mut last_request = self.rate_limiter.lock().await;

        if let Some(last_time) = *last_request {
            let elapsed = last_time.elapsed();
            if elapsed < RATE_LIMIT_INTERVAL {
                let sleep_duration = RATE_LIMIT_INTERVAL - elapsed;
                debug!(
                    sleep_ms = sleep_duration.as_millis(),
                    "Rate limiting: sleeping before MusicBrainz request"
                );
                sleep(sleep_duration).await;
            }
        }

        *last_request = Some(Instant::now());
    }

    /// Send a GET request and parse the JSON response.
    async fn send_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
    ) -> Result<T, CatalogError> {
        self.enforce_rate_limit().await;
        debug!(url, "MusicBrainz request");

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| CatalogError::Network(e.to_string()))?;

        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(CatalogError::NotFound);
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(CatalogError::RateLimited);
        }

        if !status.is_success() {
            // Try to parse error response
            if let Ok(error) = response.json::<dto::ApiError>().await {
                return Err(CatalogError::Api(error.error));
            }
            return Err(CatalogError::Network(format!(
                "HTTP {}: {}",
                status,
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| CatalogError::Parse(e.to_string()))
    }
}

impl Default for MusicBrainzClient {
    fn default() -> Self {
        Self::new()
    }
}

/// The `(primarytype:album OR primarytype:ep) AND status:official NOT (...)`
/// tail shared by both release-group queries.
fn type_restriction(excluded_secondary_types: &[String]) -> String {
    let mut restriction =
        " AND (primarytype:album OR primarytype:ep) AND status:official".to_string();

    if !excluded_secondary_types.is_empty() {
        let excluded = excluded_secondary_types
            .iter()
            .map(|t| format!("secondarytype:\"{}\"", sanitize_term(t)))
            .collect::<Vec<_>>()
            .join(" OR ");
        restriction.push_str(&format!(" NOT ({excluded})"));
    }

    restriction
}

/// Strip characters that would break out of a quoted Lucene term.
fn sanitize_term(term: &str) -> String {
    term.replace('"', " ").trim().to_string()
}

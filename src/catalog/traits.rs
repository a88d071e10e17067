//! Trait definitions for external API clients.
//!
//! These traits enable dependency injection and mocking for tests.
//! Production code uses the real client implementations, while tests
//! can substitute mock implementations.

use async_trait::async_trait;

use super::audiodb::AudioDbClient;
use super::domain::{ArtistHit, CatalogError, Release, ReleaseGroup};
use super::musicbrainz::MusicBrainzClient;

/// Trait for the music catalog (MusicBrainz).
///
/// Implement this trait to create mock implementations for testing.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// Search release groups by album + artist free text, restricted to
    /// official albums/EPs minus the excluded secondary types.
    async fn search_release_groups(
        &self,
        album: &str,
        artist: &str,
        excluded_secondary_types: &[String],
    ) -> Result<Vec<ReleaseGroup>, CatalogError>;

    /// All qualifying release groups for one artist.
    async fn release_groups_by_artist(
        &self,
        artist_id: &str,
        excluded_secondary_types: &[String],
    ) -> Result<Vec<ReleaseGroup>, CatalogError>;

    /// Search artists by name.
    async fn search_artists(&self, name: &str) -> Result<Vec<ArtistHit>, CatalogError>;

    /// All official releases (media populated, no track bodies) of a group.
    async fn releases_for_release_group(
        &self,
        release_group_id: &str,
    ) -> Result<Vec<Release>, CatalogError>;

    /// One release with full track list and owning release group.
    async fn release_with_tracks(&self, release_id: &str) -> Result<Release, CatalogError>;

    /// One release with just group + credits, for captioning stored ids.
    async fn release_group_for_release(&self, release_id: &str) -> Result<Release, CatalogError>;
}

/// Trait for artist imagery lookup.
#[async_trait]
pub trait ArtistImageApi: Send + Sync {
    /// The artist's logo URL, if the image service knows one.
    async fn artist_logo(&self, artist_mbid: &str) -> Result<Option<String>, CatalogError>;
}

// Implement traits for real clients

#[async_trait]
impl CatalogApi for MusicBrainzClient {
    async fn search_release_groups(
        &self,
        album: &str,
        artist: &str,
        excluded_secondary_types: &[String],
    ) -> Result<Vec<ReleaseGroup>, CatalogError> {
        self.search_release_groups(album, artist, excluded_secondary_types)
            .await
    }

    async fn release_groups_by_artist(
        &self,
        artist_id: &str,
        excluded_secondary_types: &[String],
    ) -> Result<Vec<ReleaseGroup>, CatalogError> {
        self.release_groups_by_artist(artist_id, excluded_secondary_types)
            .await
    }

    async fn search_artists(&self, name: &str) -> Result<Vec<ArtistHit>, CatalogError> {
        self.search_artists(name).await
    }

    async fn releases_for_release_group(
        &self,
        release_group_id: &str,
    ) -> Result<Vec<Release>, CatalogError> {
        self.releases_for_release_group(release_group_id).await
    }

    async fn release_with_tracks(&self, release_id: &str) -> Result<Release, CatalogError> {
        self.release_with_tracks(release_id).await
    }

    async fn release_group_for_release(&self, release_id: &str) -> Result<Release, CatalogError> {
        self.release_group_for_release(release_id).await
    }
}

#[async_trait]
impl ArtistImageApi for AudioDbClient {
    async fn artist_logo(&self, artist_mbid: &str) -> Result<Option<String>, CatalogError> {
        self.artist_logo(artist_mbid).await
    }
}

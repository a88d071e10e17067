//! Internal domain models for the music catalog.
//!
//! These types are OUR types - they don't change when external APIs change.
//! All external API responses get converted into these types via adapters.

use serde::{Deserialize, Serialize};

use crate::normalize::normalize;

/// The abstract "album" entity spanning all of its editions.
///
/// Used only while resolving what to play; gameplay works on a
/// [`TrackListing`] for one concrete [`Release`].
#[derive(Debug, Clone)]
pub struct ReleaseGroup {
    /// MusicBrainz release-group ID
    pub id: String,
    /// Album title
    pub title: String,
    /// Primary type (Album, EP, ...)
    pub primary_type: Option<String>,
    /// Secondary types (Live, Remix, ...) - used to exclude non-canonical editions
    pub secondary_types: Vec<String>,
    /// First release date (YYYY, YYYY-MM, or YYYY-MM-DD)
    pub first_release_date: Option<String>,
    /// Credited artist names, in credit order
    pub artist_credits: Vec<String>,
}

impl ReleaseGroup {
    /// Primary credited artist, for display.
    pub fn primary_artist(&self) -> Option<&str> {
        self.artist_credits.first().map(String::as_str)
    }
}

/// One specific published edition/track-listing of an album.
#[derive(Debug, Clone)]
pub struct Release {
    /// MusicBrainz release ID
    pub id: String,
    /// Release title
    pub title: String,
    /// Free text distinguishing editions with identical titles
    pub disambiguation: Option<String>,
    /// Discs/volumes in release order
    pub media: Vec<Medium>,
    /// Owning release group, when the lookup included it
    pub release_group: Option<ReleaseGroup>,
}

impl Release {
    /// Combined track count across all media.
    ///
    /// This is the number the resolver deduplicates editions by: two
    /// editions with the same combined count are interchangeable for
    /// gameplay.
    pub fn track_count(&self) -> u32 {
        self.media.iter().map(|m| m.track_count).sum()
    }
}

/// One disc/volume within a release.
#[derive(Debug, Clone)]
pub struct Medium {
    /// Position within the release (1-based)
    pub position: u32,
    /// Number of tracks on this medium
    pub track_count: u32,
    /// Tracks, present only when recordings were included in the lookup
    pub tracks: Vec<Track>,
}

/// A single song entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// 1-based position; per-medium as fetched, renumbered continuously
    /// across media once flattened into a [`TrackListing`]
    pub position: u32,
    /// Display title
    pub title: String,
    /// MusicBrainz recording ID, when known
    pub recording_id: Option<String>,
}

/// The flattened, ready-to-play track sequence for one release.
///
/// Positions are renumbered 1..N across all media in media order.
/// Guaranteed non-empty with non-empty titles (the loader rejects
/// anything else).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackListing {
    /// MusicBrainz release ID this listing was fetched from
    pub release_id: String,
    /// Owning release-group ID, when known
    pub release_group_id: Option<String>,
    /// Album title, for display
    pub album_title: String,
    /// Primary artist-credit name, for display
    pub artist_name: String,
    /// First release date of the owning group (artist mode sorts by it)
    pub first_release_date: Option<String>,
    /// Tracks in play order
    pub tracks: Vec<Track>,
}

/// One artist search hit.
#[derive(Debug, Clone)]
pub struct ArtistHit {
    /// MusicBrainz artist ID
    pub id: String,
    /// Artist name
    pub name: String,
    /// Free text telling same-named artists apart
    pub disambiguation: Option<String>,
}

/// A track prepared for guessing: its display title plus the
/// pre-computed normalized form guesses are compared against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTrack {
    /// 1-based position in the session's flattened list; unique and
    /// stable for the session's duration
    pub position: u32,
    /// Display title
    pub title: String,
    /// Canonical comparison key, see [`crate::normalize::normalize`]
    pub normalized: String,
    /// MusicBrainz recording ID, when known
    pub recording_id: Option<String>,
}

impl SessionTrack {
    /// Build from a raw track, computing the comparison key.
    pub fn new(position: u32, track: &Track) -> Self {
        Self {
            position,
            title: track.title.clone(),
            normalized: normalize(&track.title),
            recording_id: track.recording_id.clone(),
        }
    }
}

/// Errors that can occur talking to the catalog services.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CatalogError {
    #[error("API request failed: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Rate limited - try again later")]
    RateLimited,

    #[error("No such entity in the catalog")]
    NotFound,
}

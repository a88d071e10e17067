//! Tracklist loading: from a resolved release id to a playable,
//! flattened track sequence.
//!
//! Media are flattened in disc order and positions renumbered 1..N so a
//! double album plays as one continuous list. A release that resolves
//! but cannot be played (no tracks, or a track with no title) is a
//! validation failure, not a catalog error - it must never reach a
//! running session.

use tracing::debug;

use crate::catalog::{CatalogApi, Release, SessionTrack, Track, TrackListing};
use crate::error::{Error, Result};
use crate::normalize::normalize;

/// Fetch and flatten the track list for one release.
///
/// # Errors
///
/// - [`Error::NotFound`] when the release id does not resolve
/// - [`Error::Service`] on transport failure (no retry here; the caller
///   decides whether to retry or back out)
/// - [`Error::Validation`] for an empty or untitled track list
pub async fn load_tracklist<C: CatalogApi + ?Sized>(
    catalog: &C,
    release_id: &str,
) -> Result<TrackListing> {
    let release = catalog.release_with_tracks(release_id).await?;
    listing_from_release(release)
}

/// Flatten a fetched release into a [`TrackListing`].
pub fn listing_from_release(release: Release) -> Result<TrackListing> {
    let album_title = release
        .release_group
        .as_ref()
        .map(|rg| rg.title.clone())
        .unwrap_or_else(|| release.title.clone());

    let artist_name = release
        .release_group
        .as_ref()
        .and_then(|rg| rg.primary_artist())
        .unwrap_or("Unknown Artist")
        .to_string();

    let mut media = release.media;
    media.sort_by_key(|m| m.position);

    let mut tracks = Vec::new();
    for medium in &media {
        for track in &medium.tracks {
            if track.title.trim().is_empty() {
                return Err(Error::validation(format!(
                    "release {} has an untitled track at position {}",
                    release.id, track.position
                )));
            }
            tracks.push(Track {
                position: tracks.len() as u32 + 1,
                title: track.title.clone(),
                recording_id: track.recording_id.clone(),
            });
        }
    }

    if tracks.is_empty() {
        return Err(Error::validation(format!(
            "release {} has no tracks",
            release.id
        )));
    }

    debug!(
        release_id = %release.id,
        tracks = tracks.len(),
        "Loaded tracklist"
    );

    Ok(TrackListing {
        release_id: release.id,
        release_group_id: release.release_group.as_ref().map(|rg| rg.id.clone()),
        album_title,
        artist_name,
        first_release_date: release
            .release_group
            .and_then(|rg| rg.first_release_date),
        tracks,
    })
}

/// Combine several listings into one artist-mode track list.
///
/// Tracks are deduplicated by normalized title - a song appearing on
/// multiple selected releases counts once, first occurrence (in listing
/// order) wins - then renumbered 1..N. Callers pass listings in the
/// order they want ties broken (chronological, see
/// [`sort_listings_chronologically`]).
pub fn combined_tracklist(listings: &[TrackListing]) -> Vec<SessionTrack> {
    let mut seen = std::collections::HashSet::new();
    let mut combined = Vec::new();

    for listing in listings {
        for track in &listing.tracks {
            let key = normalize(&track.title);
            if key.is_empty() || !seen.insert(key) {
                continue;
            }
            let position = combined.len() as u32 + 1;
            combined.push(SessionTrack::new(position, track));
        }
    }

    combined
}

/// Order listings by the owning group's first release date, oldest
/// first; undated listings sort last. Date strings are YYYY[-MM[-DD]],
/// so a plain string compare is chronological.
pub fn sort_listings_chronologically(listings: &mut [TrackListing]) {
    listings.sort_by(|a, b| match (&a.first_release_date, &b.first_release_date) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
}

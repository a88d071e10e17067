//! Adapter layer: Convert MusicBrainz DTOs to domain models
//!
//! This is the ONLY place where DTO types are converted to domain types.
//! This isolates API changes - if MusicBrainz changes their response format,
//! only this file and dto.rs need to change.

use super::dto;
use crate::catalog::domain::{ArtistHit, Medium, Release, ReleaseGroup, Track};

/// Convert a release-group DTO to the domain type.
pub fn to_release_group(rg: dto::ReleaseGroup) -> ReleaseGroup {
    let artist_credits = rg
        .artist_credit
        .iter()
        .map(|c| c.name.clone().unwrap_or_else(|| c.artist.name.clone()))
        .collect();

    ReleaseGroup {
        id: rg.id,
        title: rg.title,
        primary_type: rg.primary_type,
        secondary_types: rg.secondary_types,
        first_release_date: none_if_empty(rg.first_release_date),
        artist_credits,
    }
}

/// Convert a release DTO (from browse or lookup) to the domain type.
pub fn to_release(release: dto::Release) -> Release {
    let release_group = release.release_group.map(to_release_group);

    let media = release
        .media
        .into_iter()
        .enumerate()
        .map(|(idx, m)| to_medium(m, idx as u32 + 1))
        .collect();

    Release {
        id: release.id,
        title: release.title,
        disambiguation: none_if_empty(release.disambiguation),
        media,
        release_group,
    }
}

/// Convert an artist search hit.
pub fn to_artist_hit(artist: dto::Artist) -> ArtistHit {
    ArtistHit {
        id: artist.id,
        name: artist.name,
        disambiguation: none_if_empty(artist.disambiguation),
    }
}

fn to_medium(medium: dto::Medium, fallback_position: u32) -> Medium {
    let tracks = medium.tracks.iter().map(to_track).collect::<Vec<_>>();
    // Browse responses carry track-count without track bodies; lookups
    // with inc=recordings carry both. Trust the explicit count, fall
    // back to what we can see.
    let track_count = medium.track_count.unwrap_or(tracks.len() as u32);

    Medium {
        position: medium.position.unwrap_or(fallback_position),
        track_count,
        tracks,
    }
}

fn to_track(track: &dto::Track) -> Track {
    // The track title is how this edition labels the song; fall back to
    // the recording title when absent.
    let title = track
        .title
        .clone()
        .or_else(|| track.recording.as_ref().and_then(|r| r.title.clone()))
        .unwrap_or_default();

    Track {
        position: track.position.unwrap_or(0),
        title,
        recording_id: track.recording.as_ref().map(|r| r.id.clone()),
    }
}

/// MusicBrainz sends "" where it means "no value" for several text
/// fields; collapse that to None at the boundary.
fn none_if_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

//! Release resolution: from free-text artist/album input to one
//! concrete release id.
//!
//! MusicBrainz frequently carries a dozen editions of one album that
//! differ only in packaging. Only editions with distinct combined track
//! counts are meaningfully different for gameplay, so resolution
//! deduplicates by count (stable sort ascending, first occurrence per
//! count wins) before deciding whether the player needs to choose.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::{CatalogApi, Release, ReleaseGroup};
use crate::error::{Error, Result};

/// The release group a resolution landed on, for display.
#[derive(Debug, Clone)]
pub struct GroupSummary {
    pub id: String,
    pub title: String,
    pub artist_name: String,
}

impl GroupSummary {
    fn from_group(group: &ReleaseGroup) -> Self {
        Self {
            id: group.id.clone(),
            title: group.title.clone(),
            artist_name: group.primary_artist().unwrap_or("Unknown Artist").to_string(),
        }
    }
}

/// One playable edition surviving deduplication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseCandidate {
    pub release_id: String,
    pub title: String,
    /// Edition note ("deluxe edition", ...), when MusicBrainz has one
    pub disambiguation: Option<String>,
    /// Combined track count across all media
    pub track_count: u32,
    /// Number of discs/volumes
    pub media_count: usize,
}

/// Outcome of resolving an artist/album query.
#[derive(Debug, Clone)]
pub enum Resolution {
    /// Exactly one distinct-track-count edition: play it.
    Unique {
        group: GroupSummary,
        candidate: ReleaseCandidate,
    },
    /// Several distinct editions, ascending by track count: the caller
    /// presents them and obtains a choice.
    Ambiguous {
        group: GroupSummary,
        candidates: Vec<ReleaseCandidate>,
    },
    /// The query legitimately matched nothing.
    NotFound,
}

/// How to auto-pick among ambiguous candidates when no human is in the
/// loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionStrategy {
    /// Fewest tracks wins: the plain edition, not the deluxe one.
    #[default]
    LowestTrackCount,
    /// Legacy rule: if the fewest-track edition spans multiple discs
    /// and another candidate exists, take the second-lowest instead.
    SecondLowestIfMultiDisc,
}

impl SelectionStrategy {
    /// Pick one candidate from an ascending-by-track-count list.
    /// Returns `None` only for an empty list.
    pub fn pick<'a>(&self, candidates: &'a [ReleaseCandidate]) -> Option<&'a ReleaseCandidate> {
        let first = candidates.first()?;
        match self {
            Self::LowestTrackCount => Some(first),
            Self::SecondLowestIfMultiDisc => {
                if first.media_count > 1 && candidates.len() > 1 {
                    Some(&candidates[1])
                } else {
                    Some(first)
                }
            }
        }
    }
}

/// Resolves free-text queries into playable releases.
pub struct ReleaseResolver<'a> {
    catalog: &'a dyn CatalogApi,
    excluded_secondary_types: Vec<String>,
}

impl<'a> ReleaseResolver<'a> {
    pub fn new(catalog: &'a dyn CatalogApi, excluded_secondary_types: Vec<String>) -> Self {
        Self {
            catalog,
            excluded_secondary_types,
        }
    }

    /// Resolve an artist + album free-text pair.
    ///
    /// Empty queries fail with [`Error::Validation`] before any network
    /// call. A transport failure propagates as [`Error::Service`] - it
    /// is never folded into [`Resolution::NotFound`].
    pub async fn resolve(&self, artist_query: &str, album_query: &str) -> Result<Resolution> {
        if artist_query.trim().is_empty() {
            return Err(Error::validation("artist name is required"));
        }
        if album_query.trim().is_empty() {
            return Err(Error::validation("album or EP name is required"));
        }

        let groups = self
            .catalog
            .search_release_groups(album_query, artist_query, &self.excluded_secondary_types)
            .await?;

        let Some(group) = groups.first() else {
            debug!(artist_query, album_query, "No release group matched");
            return Ok(Resolution::NotFound);
        };

        self.resolve_group(group).await
    }

    /// Resolve a known release group into its distinct editions.
    pub async fn resolve_group(&self, group: &ReleaseGroup) -> Result<Resolution> {
        let releases = self.catalog.releases_for_release_group(&group.id).await?;
        let candidates = distinct_candidates(&releases);

        debug!(
            group_id = %group.id,
            releases = releases.len(),
            distinct = candidates.len(),
            "Resolved release group"
        );

        let summary = GroupSummary::from_group(group);
        let mut candidates = candidates;
        match candidates.len() {
            0 => Ok(Resolution::NotFound),
            1 => Ok(Resolution::Unique {
                group: summary,
                candidate: candidates.swap_remove(0),
            }),
            _ => Ok(Resolution::Ambiguous {
                group: summary,
                candidates,
            }),
        }
    }

    /// The artist's qualifying albums/EPs, oldest first (album cards
    /// lay out chronologically).
    pub async fn release_groups_for_artist(&self, artist_id: &str) -> Result<Vec<ReleaseGroup>> {
        if artist_id.trim().is_empty() {
            return Err(Error::validation("artist id is required"));
        }

        let mut groups = self
            .catalog
            .release_groups_by_artist(artist_id, &self.excluded_secondary_types)
            .await?;

        // The search already excludes these, but its index can lag
        // behind freshly retagged groups; filter again on what the
        // response actually says.
        groups.retain(|g| {
            g.secondary_types
                .iter()
                .all(|t| !self.excluded_secondary_types.iter().any(|x| t.eq_ignore_ascii_case(x)))
        });

        groups.sort_by(|a, b| match (&a.first_release_date, &b.first_release_date) {
            (Some(a), Some(b)) => a.cmp(b),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });

        Ok(groups)
    }
}

/// Deduplicate editions by combined track count.
///
/// Stable sort ascending by count, then keep the first occurrence of
/// each count - the scan order is explicit, not an accident of how the
/// catalog happened to order its response.
fn distinct_candidates(releases: &[Release]) -> Vec<ReleaseCandidate> {
    let mut candidates: Vec<ReleaseCandidate> = releases
        .iter()
        .filter(|release| release.track_count() > 0)
        .map(|release| ReleaseCandidate {
            release_id: release.id.clone(),
            title: release.title.clone(),
            disambiguation: release.disambiguation.clone(),
            track_count: release.track_count(),
            media_count: release.media.len(),
        })
        .collect();

    candidates.sort_by_key(|c| c.track_count);

    let mut seen = std::collections::HashSet::new();
    candidates.retain(|c| seen.insert(c.track_count));
    candidates
}

/// Discards results of superseded in-flight searches.
///
/// Interactive search re-queries as the input changes; a slow response
/// for an old query must not clobber results for the current one. Each
/// (re)query takes a fresh token; a completion is applied only if its
/// token is still the latest issued.
#[derive(Debug, Default)]
pub struct SearchGate {
    latest: AtomicU64,
}

/// Token identifying one issued search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchToken(u64);

impl SearchGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new search, superseding all earlier ones.
    pub fn issue(&self) -> SearchToken {
        SearchToken(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Whether this search is still the latest issued.
    pub fn is_current(&self, token: SearchToken) -> bool {
        self.latest.load(Ordering::SeqCst) == token.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogError;
    use crate::catalog::traits::mocks::{MockCatalog, browse_release, group};

    fn resolver(catalog: &MockCatalog) -> ReleaseResolver<'_> {
        ReleaseResolver::new(catalog, vec!["live".to_string()])
    }

    #[tokio::test]
    async fn test_empty_queries_fail_before_network() {
        // A failing catalog proves validation short-circuits.
        let catalog = MockCatalog::failing(CatalogError::Network("boom".to_string()));
        let r = resolver(&catalog);

        assert!(matches!(r.resolve("", "Album").await, Err(Error::Validation(_))));
        assert!(matches!(r.resolve("Artist", "  ").await, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn test_no_matching_group_is_not_found() {
        let catalog = MockCatalog::empty();
        let r = resolver(&catalog);

        let resolution = r.resolve("Nobody", "Nothing").await.unwrap();
        assert!(matches!(resolution, Resolution::NotFound));
    }

    #[tokio::test]
    async fn test_service_failure_is_not_not_found() {
        let catalog = MockCatalog::failing(CatalogError::Network("timeout".to_string()));
        let r = resolver(&catalog);

        let err = r.resolve("Artist", "Album").await.unwrap_err();
        assert!(matches!(err, Error::Service(_)));
    }

    #[tokio::test]
    async fn test_single_edition_resolves_unique() {
        let g = group("rg-1", "The Album", "The Artist");
        let catalog =
            MockCatalog::with_group(g, vec![browse_release("rel-1", "The Album", 10)]);
        let r = resolver(&catalog);

        match r.resolve("The Artist", "The Album").await.unwrap() {
            Resolution::Unique { group, candidate } => {
                assert_eq!(candidate.release_id, "rel-1");
                assert_eq!(candidate.track_count, 10);
                assert_eq!(group.title, "The Album");
                assert_eq!(group.artist_name, "The Artist");
            }
            other => panic!("expected Unique, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_duplicate_counts_deduplicated() {
        // Editions [12, 12, 14]: the duplicate 12 collapses, leaving an
        // ambiguous choice between 12 and 14, ascending.
        let g = group("rg-1", "The Album", "The Artist");
        let catalog = MockCatalog::with_group(
            g,
            vec![
                browse_release("rel-14", "The Album", 14),
                browse_release("rel-12a", "The Album", 12),
                browse_release("rel-12b", "The Album", 12),
            ],
        );
        let r = resolver(&catalog);

        match r.resolve("The Artist", "The Album").await.unwrap() {
            Resolution::Ambiguous { candidates, .. } => {
                assert_eq!(candidates.len(), 2);
                assert_eq!(candidates[0].track_count, 12);
                // Stable sort: rel-12a came before rel-12b.
                assert_eq!(candidates[0].release_id, "rel-12a");
                assert_eq!(candidates[1].track_count, 14);
            }
            other => panic!("expected Ambiguous, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_group_with_no_playable_releases_is_not_found() {
        let g = group("rg-1", "The Album", "The Artist");
        let catalog = MockCatalog::with_group(g, vec![browse_release("rel-0", "The Album", 0)]);
        let r = resolver(&catalog);

        let resolution = r.resolve("The Artist", "The Album").await.unwrap();
        assert!(matches!(resolution, Resolution::NotFound));
    }

    #[tokio::test]
    async fn test_release_groups_for_artist_filters_excluded_types() {
        let mut live = group("rg-live", "Live at Wembley", "A");
        live.secondary_types = vec!["Live".to_string()];
        let studio = group("rg-studio", "Studio Album", "A");

        let catalog = MockCatalog {
            release_groups: vec![live, studio],
            ..MockCatalog::empty()
        };
        let r = resolver(&catalog);

        let groups = r.release_groups_for_artist("artist-1").await.unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].title, "Studio Album");
    }

    #[tokio::test]
    async fn test_release_groups_for_artist_sorted_chronologically() {
        let mut g1 = group("rg-1", "Second", "A");
        g1.first_release_date = Some("1991".to_string());
        let mut g2 = group("rg-2", "First", "A");
        g2.first_release_date = Some("1984-03-01".to_string());
        let mut g3 = group("rg-3", "Undated", "A");
        g3.first_release_date = None;

        let catalog = MockCatalog {
            release_groups: vec![g1, g2, g3],
            ..MockCatalog::empty()
        };
        let r = resolver(&catalog);

        let groups = r.release_groups_for_artist("artist-1").await.unwrap();
        let titles: Vec<&str> = groups.iter().map(|g| g.title.as_str()).collect();
        assert_eq!(titles, vec!["First", "Second", "Undated"]);
    }

    fn candidate(id: &str, track_count: u32, media_count: usize) -> ReleaseCandidate {
        ReleaseCandidate {
            release_id: id.to_string(),
            title: "T".to_string(),
            disambiguation: None,
            track_count,
            media_count,
        }
    }

    #[test]
    fn test_strategy_lowest_track_count() {
        let candidates = vec![candidate("low", 10, 2), candidate("high", 14, 1)];
        let picked = SelectionStrategy::LowestTrackCount.pick(&candidates).unwrap();
        assert_eq!(picked.release_id, "low");
    }

    #[test]
    fn test_strategy_second_lowest_if_multi_disc() {
        // Lowest spans two discs: legacy rule takes the runner-up.
        let candidates = vec![candidate("low", 10, 2), candidate("high", 14, 1)];
        let picked = SelectionStrategy::SecondLowestIfMultiDisc
            .pick(&candidates)
            .unwrap();
        assert_eq!(picked.release_id, "high");

        // Single-disc lowest: rule does not fire.
        let candidates = vec![candidate("low", 10, 1), candidate("high", 14, 1)];
        let picked = SelectionStrategy::SecondLowestIfMultiDisc
            .pick(&candidates)
            .unwrap();
        assert_eq!(picked.release_id, "low");

        // Only one candidate: nothing to fall back to.
        let candidates = vec![candidate("only", 10, 3)];
        let picked = SelectionStrategy::SecondLowestIfMultiDisc
            .pick(&candidates)
            .unwrap();
        assert_eq!(picked.release_id, "only");
    }

    #[test]
    fn test_strategy_empty_candidates() {
        assert!(SelectionStrategy::LowestTrackCount.pick(&[]).is_none());
    }

    #[test]
    fn test_search_gate_supersedes() {
        let gate = SearchGate::new();

        let first = gate.issue();
        assert!(gate.is_current(first));

        // New input supersedes the in-flight search.
        let second = gate.issue();
        assert!(!gate.is_current(first));
        assert!(gate.is_current(second));

        // A stale completion arriving late is discarded by the check.
        assert!(!gate.is_current(first));
    }
}

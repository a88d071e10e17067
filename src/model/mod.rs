//! Persisted data models.
//!
//! Only scores survive a session; everything the catalog returns is
//! transient. [`Score`] maps to the `scores` table (see
//! `migrations/0001_create_scores.sql`).

use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Which kind of session produced a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    /// Name every track on one album edition
    Album,
    /// Name every track across an artist's selected albums
    Artist,
}

impl GameMode {
    /// The tag stored in the `mode` column.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Album => "album",
            Self::Artist => "artist",
        }
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A saved game outcome.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Score {
    /// Database ID (auto-generated)
    pub id: i64,
    /// Owning user
    pub user_id: String,
    /// "album" or "artist"
    pub mode: String,
    /// Subject MBID: release id (album mode) or artist id (artist mode)
    pub mbid: String,
    /// Owning release-group MBID (album mode only)
    pub rgmbid: Option<String>,
    /// Elapsed time, "MM:SS"
    pub time: String,
    /// "N / M" - correct guesses out of total tracks
    pub score: String,
}

impl Score {
    /// Parsed (correct, total), or `None` for a malformed row.
    pub fn parsed(&self) -> Option<(u32, u32)> {
        parse_score(&self.score)
    }
}

/// Parse a `"N / M"` score string.
///
/// The store keeps scores as display strings, so any ranking has to
/// parse them back; sorting the raw text would put "10 / 12" before
/// "2 / 12".
pub fn parse_score(score: &str) -> Option<(u32, u32)> {
    let (correct, total) = score.split_once('/')?;
    Some((correct.trim().parse().ok()?, total.trim().parse().ok()?))
}

/// Parse a `"MM:SS"` elapsed string into seconds, for tie-breaking.
pub fn parse_elapsed_secs(time: &str) -> Option<u32> {
    let (minutes, seconds) = time.split_once(':')?;
    let minutes: u32 = minutes.trim().parse().ok()?;
    let seconds: u32 = seconds.trim().parse().ok()?;
    Some(minutes * 60 + seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_score() {
        assert_eq!(parse_score("10 / 12"), Some((10, 12)));
        assert_eq!(parse_score("0 / 9"), Some((0, 9)));
        assert_eq!(parse_score("10/12"), Some((10, 12)));
        assert_eq!(parse_score("not a score"), None);
        assert_eq!(parse_score("3 of 10"), None);
    }

    #[test]
    fn test_parse_elapsed() {
        assert_eq!(parse_elapsed_secs("00:09"), Some(9));
        assert_eq!(parse_elapsed_secs("05:00"), Some(300));
        assert_eq!(parse_elapsed_secs("4:31"), Some(271));
        assert_eq!(parse_elapsed_secs("oops"), None);
    }

    #[test]
    fn test_mode_tags() {
        assert_eq!(GameMode::Album.as_str(), "album");
        assert_eq!(GameMode::Artist.to_string(), "artist");
    }
}

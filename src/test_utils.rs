//! Test utilities and fixtures.
//!
//! This module provides common test helpers, mock factories, and
//! database utilities to reduce boilerplate in tests.

use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use sqlx::sqlite::SqlitePool;
use tempfile::TempDir;

use crate::catalog::{Track, TrackListing};
use crate::game::GameSession;

/// A fixed "now" so session tests are deterministic.
pub fn test_epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 10, 20, 0, 0).unwrap()
}

/// Creates a temporary database for testing.
///
/// The database is created in a temporary directory that is automatically
/// cleaned up when the returned `TempDir` is dropped. Migrations are run
/// automatically. Keep the TempDir alive for the duration of your test.
pub async fn temp_db() -> (SqlitePool, TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp directory");
    let db_path = dir.path().join("test.db");
    let db_url = format!("sqlite:{}", db_path.display());

    let pool = crate::db::init_db(&db_url)
        .await
        .expect("Failed to initialize test database");

    (pool, dir)
}

/// A listing with `total` numbered tracks ("Song 1".."Song N").
pub fn numbered_listing(total: usize) -> TrackListing {
    TrackListing {
        release_id: "rel-test".to_string(),
        release_group_id: Some("rg-test".to_string()),
        album_title: "Test Album".to_string(),
        artist_name: "Test Artist".to_string(),
        first_release_date: Some("1999".to_string()),
        tracks: (1..=total)
            .map(|i| Track {
                position: i as u32,
                title: format!("Song {i}"),
                recording_id: None,
            })
            .collect(),
    }
}

/// A session that has begun and is accepting guesses.
pub fn running_session(total: usize) -> GameSession {
    let mut session = GameSession::for_album(&numbered_listing(total), Duration::from_secs(300));
    session.begin(test_epoch());
    session
}

/// An ended session with `correct` of `total` tracks guessed. Completed
/// when everything was guessed, stopped early otherwise.
pub fn finished_session(correct: usize, total: usize) -> GameSession {
    let mut session = running_session(total);
    let now = test_epoch() + chrono::Duration::seconds(41);

    for i in 1..=correct {
        session.submit_guess(&format!("song {i}"), now);
    }
    if !session.is_ended() {
        session.stop(now + chrono::Duration::seconds(60));
    }
    session
}

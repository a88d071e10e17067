//! Database module for score persistence.
//!
//! Uses SQLx with SQLite for lightweight, embedded database storage.
//! Provides async operations for:
//! - Inserting score rows
//! - Fetching scores per release, optionally per user
//! - Listing the releases a user has played
//!
//! Rows are append-only: the core never updates or deletes a score.

use sqlx::migrate::MigrateDatabase;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::model::Score;

/// Default database filename.
pub const DEFAULT_DB_NAME: &str = "guess_the_songs.db";

/// Build a SQLite database URL from an optional path.
///
/// If no path is provided, uses [`DEFAULT_DB_NAME`] in the current directory.
pub fn db_url(path: Option<&std::path::Path>) -> String {
    match path {
        Some(p) => format!("sqlite:{}", p.display()),
        None => format!("sqlite:{}", DEFAULT_DB_NAME),
    }
}

/// Initialize the database connection pool and run migrations.
///
/// Creates the database file if it doesn't exist, establishes a connection
/// pool with up to 5 connections, and runs all pending migrations.
///
/// # Errors
///
/// Returns an error if:
/// - Database creation fails
/// - Connection cannot be established
/// - Migration fails
pub async fn init_db(db_url: &str) -> Result<SqlitePool, sqlx::Error> {
    if !sqlx::Sqlite::database_exists(db_url).await.unwrap_or(false) {
        sqlx::Sqlite::create_database(db_url).await?;
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(db_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

/// A score row about to be inserted.
#[derive(Debug, Clone)]
pub struct NewScore<'a> {
    pub user_id: &'a str,
    pub mode: &'a str,
    pub mbid: &'a str,
    pub rgmbid: Option<&'a str>,
    /// "MM:SS"
    pub time: &'a str,
    /// "N / M"
    pub score: &'a str,
}

/// Insert one score row.
///
/// Deliberately NOT idempotent: every call appends a row. At-most-once
/// per session is the caller's job (the session's `score_saved` flag).
pub async fn insert_score(pool: &SqlitePool, score: &NewScore<'_>) -> sqlx::Result<i64> {
    let result = sqlx::query(
        "INSERT INTO scores (user_id, mode, mbid, rgmbid, time, score) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(score.user_id)
    .bind(score.mode)
    .bind(score.mbid)
    .bind(score.rgmbid)
    .bind(score.time)
    .bind(score.score)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// All scores for one subject MBID, in insertion order.
///
/// Ranking happens in the score module after fetch - the `score` column
/// is display text and must not be trusted for ordering.
pub async fn scores_by_release(pool: &SqlitePool, mbid: &str) -> sqlx::Result<Vec<Score>> {
    sqlx::query_as::<_, Score>(
        "SELECT id, user_id, mode, mbid, rgmbid, time, score FROM scores WHERE mbid = ?",
    )
    .bind(mbid)
    .fetch_all(pool)
    .await
}

/// All scores for one subject MBID by one user.
pub async fn scores_by_release_and_user(
    pool: &SqlitePool,
    mbid: &str,
    user_id: &str,
) -> sqlx::Result<Vec<Score>> {
    sqlx::query_as::<_, Score>(
        "SELECT id, user_id, mode, mbid, rgmbid, time, score FROM scores WHERE mbid = ? AND user_id = ?",
    )
    .bind(mbid)
    .bind(user_id)
    .fetch_all(pool)
    .await
}

/// Distinct subject MBIDs the user has any score for.
pub async fn release_ids_played_by_user(
    pool: &SqlitePool,
    user_id: &str,
) -> sqlx::Result<Vec<String>> {
    let rows: Vec<(String,)> =
        sqlx::query_as("SELECT DISTINCT mbid FROM scores WHERE user_id = ? ORDER BY mbid")
            .bind(user_id)
            .fetch_all(pool)
            .await?;

    Ok(rows.into_iter().map(|(mbid,)| mbid).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::temp_db;

    fn new_score<'a>(user: &'a str, mbid: &'a str, score: &'a str) -> NewScore<'a> {
        NewScore {
            user_id: user,
            mode: "album",
            mbid,
            rgmbid: Some("rg-1"),
            time: "03:41",
            score,
        }
    }

    #[tokio::test]
    async fn test_init_db_creates_database() {
        let (pool, _dir) = temp_db().await;
        let scores = scores_by_release(&pool, "none").await.unwrap();
        assert!(scores.is_empty());
    }

    #[tokio::test]
    async fn test_insert_and_fetch_by_release() {
        let (pool, _dir) = temp_db().await;

        let id = insert_score(&pool, &new_score("alice", "rel-1", "9 / 12"))
            .await
            .unwrap();
        assert!(id > 0);
        insert_score(&pool, &new_score("bob", "rel-1", "12 / 12"))
            .await
            .unwrap();
        insert_score(&pool, &new_score("alice", "rel-2", "3 / 8"))
            .await
            .unwrap();

        let scores = scores_by_release(&pool, "rel-1").await.unwrap();
        assert_eq!(scores.len(), 2);
        assert!(scores.iter().all(|s| s.mbid == "rel-1"));
        assert_eq!(scores[0].rgmbid.as_deref(), Some("rg-1"));
    }

    #[tokio::test]
    async fn test_fetch_by_release_and_user() {
        let (pool, _dir) = temp_db().await;

        insert_score(&pool, &new_score("alice", "rel-1", "9 / 12"))
            .await
            .unwrap();
        insert_score(&pool, &new_score("bob", "rel-1", "12 / 12"))
            .await
            .unwrap();

        let scores = scores_by_release_and_user(&pool, "rel-1", "alice")
            .await
            .unwrap();
        assert_eq!(scores.len(), 1);
        assert_eq!(scores[0].user_id, "alice");
    }

    #[tokio::test]
    async fn test_insert_is_not_idempotent() {
        // Two identical saves are two rows; dedup is the caller's duty.
        let (pool, _dir) = temp_db().await;

        let score = new_score("alice", "rel-1", "9 / 12");
        insert_score(&pool, &score).await.unwrap();
        insert_score(&pool, &score).await.unwrap();

        let scores = scores_by_release(&pool, "rel-1").await.unwrap();
        assert_eq!(scores.len(), 2);
    }

    #[tokio::test]
    async fn test_release_ids_played_by_user() {
        let (pool, _dir) = temp_db().await;

        insert_score(&pool, &new_score("alice", "rel-1", "9 / 12"))
            .await
            .unwrap();
        insert_score(&pool, &new_score("alice", "rel-1", "12 / 12"))
            .await
            .unwrap();
        insert_score(&pool, &new_score("alice", "rel-2", "3 / 8"))
            .await
            .unwrap();
        insert_score(&pool, &new_score("bob", "rel-3", "1 / 10"))
            .await
            .unwrap();

        let played = release_ids_played_by_user(&pool, "alice").await.unwrap();
        assert_eq!(played, vec!["rel-1".to_string(), "rel-2".to_string()]);
    }
}

//! Score recording and ranking.
//!
//! The persistence layer (`crate::db`) stores scores exactly as the
//! player sees them: "N / M" and "MM:SS" strings. This module is the
//! policy on top: who may save (a signed-in user), how often (at most
//! once per completed session, guarded by the session's `score_saved`
//! flag), and how a leaderboard orders rows (numerically, never by the
//! text column).

use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::db::{self, NewScore};
use crate::error::{Error, Result};
use crate::game::GameSession;
use crate::identity::IdentityApi;
use crate::model::{Score, parse_elapsed_secs};

/// Score persistence with auth and at-most-once policy.
pub struct ScoreRecorder<'a> {
    pool: &'a SqlitePool,
    identity: &'a dyn IdentityApi,
}

impl<'a> ScoreRecorder<'a> {
    pub fn new(pool: &'a SqlitePool, identity: &'a dyn IdentityApi) -> Self {
        Self { pool, identity }
    }

    /// Persist one ended session's outcome.
    ///
    /// Returns `Ok(false)` without touching the store when this session
    /// was already saved. The flag lives client-side; the insert itself
    /// is append-only and not idempotent.
    ///
    /// # Errors
    ///
    /// - [`Error::Auth`] when nobody is signed in (the caller keeps the
    ///   session - and its snapshot - intact so no progress is lost)
    /// - [`Error::Validation`] when the session has not ended yet
    pub async fn save_session(&self, session: &mut GameSession) -> Result<bool> {
        let Some(user_id) = self.identity.current_user_id() else {
            return Err(Error::auth("sign in to save your score"));
        };

        if !session.is_ended() {
            return Err(Error::validation("cannot save a score for a running game"));
        }

        if session.score_saved {
            debug!("Score already saved for this session, skipping");
            return Ok(false);
        }

        let time = session.elapsed_string();
        let score = session.score_string();
        db::insert_score(
            self.pool,
            &NewScore {
                user_id: &user_id,
                mode: session.mode.as_str(),
                mbid: &session.subject_mbid,
                rgmbid: session.release_group_id.as_deref(),
                time: &time,
                score: &score,
            },
        )
        .await?;

        session.score_saved = true;
        info!(
            user = %user_id,
            mbid = %session.subject_mbid,
            score = %score,
            "Saved score"
        );
        Ok(true)
    }

    /// Leaderboard for one subject, best first.
    pub async fn top_scores(&self, mbid: &str) -> Result<Vec<Score>> {
        let mut scores = db::scores_by_release(self.pool, mbid).await?;
        rank_scores(&mut scores);
        Ok(scores)
    }

    /// Leaderboard filtered to the signed-in user.
    pub async fn top_scores_for_user(&self, mbid: &str) -> Result<Vec<Score>> {
        let Some(user_id) = self.identity.current_user_id() else {
            return Err(Error::auth("sign in to see your scores"));
        };
        let mut scores = db::scores_by_release_and_user(self.pool, mbid, &user_id).await?;
        rank_scores(&mut scores);
        Ok(scores)
    }

    /// Distinct subjects the signed-in user has played.
    pub async fn releases_played(&self) -> Result<Vec<String>> {
        let Some(user_id) = self.identity.current_user_id() else {
            return Err(Error::auth("sign in to see your games"));
        };
        Ok(db::release_ids_played_by_user(self.pool, &user_id).await?)
    }
}

/// Order scores best-first: correct count descending, then total
/// ascending (a 10/10 beats a 10/12), then elapsed ascending, then
/// insertion id so fully tied runs keep a deterministic order. Rows
/// that fail to parse sink to the bottom.
pub fn rank_scores(scores: &mut [Score]) {
    scores.sort_by_key(|s| {
        match (s.parsed(), parse_elapsed_secs(&s.time)) {
            (Some((correct, total)), elapsed) => (
                std::cmp::Reverse(correct),
                total,
                elapsed.unwrap_or(u32::MAX),
                s.id,
            ),
            // Malformed score string: rank below everything.
            (None, _) => (std::cmp::Reverse(0), u32::MAX, u32::MAX, s.id),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::mocks::{SignedIn, SignedOut};
    use crate::test_utils::{finished_session, temp_db};

    fn score_row(score: &str, time: &str) -> Score {
        Score {
            id: 0,
            user_id: "u".to_string(),
            mode: "album".to_string(),
            mbid: "rel-1".to_string(),
            rgmbid: None,
            time: time.to_string(),
            score: score.to_string(),
        }
    }

    #[test]
    fn test_rank_is_numeric_not_lexicographic() {
        let mut scores = vec![
            score_row("3 / 10", "01:00"),
            score_row("10 / 10", "04:00"),
            score_row("2 / 10", "00:30"),
        ];
        rank_scores(&mut scores);

        let order: Vec<&str> = scores.iter().map(|s| s.score.as_str()).collect();
        assert_eq!(order, vec!["10 / 10", "3 / 10", "2 / 10"]);
    }

    #[test]
    fn test_rank_tie_breaks() {
        let mut scores = vec![
            score_row("10 / 12", "02:00"),
            score_row("10 / 10", "05:00"),
            score_row("10 / 12", "01:30"),
        ];
        rank_scores(&mut scores);

        // Fuller album first, then faster run.
        assert_eq!(scores[0].score, "10 / 10");
        assert_eq!(scores[1].time, "01:30");
        assert_eq!(scores[2].time, "02:00");
    }

    #[test]
    fn test_rank_malformed_rows_sink() {
        let mut scores = vec![score_row("garbage", "01:00"), score_row("1 / 10", "01:00")];
        rank_scores(&mut scores);
        assert_eq!(scores[0].score, "1 / 10");
    }

    #[tokio::test]
    async fn test_save_requires_identity() {
        let (pool, _dir) = temp_db().await;
        let recorder = ScoreRecorder::new(&pool, &SignedOut);
        let mut session = finished_session(3, 10);

        let err = recorder.save_session(&mut session).await.unwrap_err();
        assert!(matches!(err, Error::Auth(_)));
        // Progress preserved: nothing was marked saved.
        assert!(!session.score_saved);
    }

    #[tokio::test]
    async fn test_save_rejects_running_session() {
        let (pool, _dir) = temp_db().await;
        let recorder = ScoreRecorder::new(&pool, &SignedIn("alice"));
        let mut session = crate::test_utils::running_session(10);

        let err = recorder.save_session(&mut session).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_save_at_most_once_per_session() {
        let (pool, _dir) = temp_db().await;
        let recorder = ScoreRecorder::new(&pool, &SignedIn("alice"));
        let mut session = finished_session(10, 10);

        assert!(recorder.save_session(&mut session).await.unwrap());
        assert!(session.score_saved);
        // Second save is a no-op, not a second row.
        assert!(!recorder.save_session(&mut session).await.unwrap());

        let scores = recorder.top_scores(&session.subject_mbid).await.unwrap();
        assert_eq!(scores.len(), 1);
        assert_eq!(scores[0].score, "10 / 10");
        assert_eq!(scores[0].user_id, "alice");
    }

    #[tokio::test]
    async fn test_top_scores_for_user_filters() {
        let (pool, _dir) = temp_db().await;

        let alice = SignedIn("alice");
        let bob = SignedIn("bob");

        let mut s1 = finished_session(9, 10);
        ScoreRecorder::new(&pool, &alice)
            .save_session(&mut s1)
            .await
            .unwrap();
        let mut s2 = finished_session(10, 10);
        ScoreRecorder::new(&pool, &bob)
            .save_session(&mut s2)
            .await
            .unwrap();

        let recorder = ScoreRecorder::new(&pool, &alice);
        let all = recorder.top_scores(&s1.subject_mbid).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].user_id, "bob"); // 10/10 ranks first

        let mine = recorder.top_scores_for_user(&s1.subject_mbid).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].user_id, "alice");
    }

    #[tokio::test]
    async fn test_releases_played() {
        let (pool, _dir) = temp_db().await;
        let recorder = ScoreRecorder::new(&pool, &SignedIn("alice"));

        let mut session = finished_session(5, 10);
        recorder.save_session(&mut session).await.unwrap();

        let played = recorder.releases_played().await.unwrap();
        assert_eq!(played, vec![session.subject_mbid.clone()]);
    }
}

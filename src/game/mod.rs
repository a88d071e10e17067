//! Game core: resolution, tracklist loading, the session state machine,
//! and pending-game snapshots.
//!
//! Data flow: [`resolver`] finds the release to play, [`tracklist`]
//! flattens it into a playable list, [`session`] runs the timed
//! guessing game over it, and [`snapshot`] lets a paused session
//! survive a restart.

pub mod resolver;
pub mod session;
pub mod snapshot;
pub mod tracklist;

pub use resolver::{ReleaseResolver, Resolution, SearchGate, SelectionStrategy};
pub use session::{GameSession, GuessOutcome, SessionState};
pub use tracklist::{combined_tracklist, load_tracklist};

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::TimeZone;

    use super::*;
    use crate::catalog::traits::mocks::{MockCatalog, full_release, group};
    use crate::identity::mocks::SignedIn;
    use crate::score::ScoreRecorder;
    use crate::test_utils::temp_db;

    /// The whole pipeline: resolve an album, load its tracks, guess
    /// them all inside the deadline, save exactly one score row.
    #[tokio::test]
    async fn test_full_game_flow() {
        let titles = [
            "Death on Two Legs", "Lazing on a Sunday Afternoon", "I'm in Love With My Car",
            "You're My Best Friend", "'39", "Sweet Lady", "Seaside Rendezvous",
            "The Prophet's Song", "Love of My Life", "Bohemian Rhapsody",
        ];
        let g = group("rg-1", "A Night at the Opera", "Queen");
        let release = full_release("rel-1", g.clone(), &titles);
        let catalog = MockCatalog::with_group(g, vec![release]);

        let resolver = ReleaseResolver::new(&catalog, vec![]);
        let resolution = resolver.resolve("Queen", "A Night at the Opera").await.unwrap();
        let Resolution::Unique { candidate, .. } = resolution else {
            panic!("expected a unique release");
        };
        assert_eq!(candidate.track_count, 10);

        let listing = load_tracklist(&catalog, &candidate.release_id).await.unwrap();
        let mut session = GameSession::for_album(&listing, Duration::from_secs(300));

        let start = chrono::Utc.with_ymd_and_hms(2026, 1, 10, 20, 0, 0).unwrap();
        session.begin(start);

        // Differently cased/styled guesses, all within the deadline.
        let now = start + chrono::Duration::seconds(120);
        for title in titles {
            let outcome = session.submit_guess(&title.to_uppercase(), now);
            assert!(matches!(outcome, GuessOutcome::Matched(_)), "missed {title}");
        }

        assert_eq!(session.state(), SessionState::Completed);
        assert_eq!(session.score_string(), "10 / 10");
        assert_eq!(session.elapsed_string(), "02:00");

        let (pool, _dir) = temp_db().await;
        let recorder = ScoreRecorder::new(&pool, &SignedIn("freddie"));
        assert!(recorder.save_session(&mut session).await.unwrap());

        let scores = recorder.top_scores("rel-1").await.unwrap();
        assert_eq!(scores.len(), 1);
        assert_eq!(scores[0].score, "10 / 10");
        assert_eq!(scores[0].time, "02:00");
        assert_eq!(scores[0].rgmbid.as_deref(), Some("rg-1"));
    }
}

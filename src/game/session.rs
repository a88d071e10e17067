//! The game session: guess matching and the countdown state machine.
//!
//! A [`GameSession`] owns everything one play-through needs: the
//! flattened track list with pre-normalized titles, the set of correct
//! guesses, the input buffer, and the clock. It is the unit the
//! pending-game snapshot serializes, so every field is serde-ready.
//!
//! All time-dependent operations take `now` as a parameter instead of
//! reading the wall clock, which keeps the state machine deterministic
//! under test. Callers pass `Utc::now()`.
//!
//! State machine:
//!
//! ```text
//! Pending --begin--> Running --all guessed--> Completed
//!                       |------deadline-----> Expired
//!                       |------give up------> Stopped
//! ```
//!
//! Terminal states absorb: no guess, tick, or stop mutates a session
//! that has ended. A new game needs a fresh session.

use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::{SessionTrack, TrackListing};
use crate::model::GameMode;
use crate::normalize::normalize;

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Created, tracklist loaded, clock not started
    Pending,
    /// Clock running, guesses accepted
    Running,
    /// Every track guessed before the deadline
    Completed,
    /// Deadline reached with tracks unguessed
    Expired,
    /// Player gave up
    Stopped,
}

impl SessionState {
    /// True for the three end states. They score identically; the
    /// distinction only drives presentation ("you won" / "time's up" /
    /// "you quit").
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Expired | Self::Stopped)
    }
}

/// Result of submitting one guess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuessOutcome {
    /// The guess named an unguessed track
    Matched(SessionTrack),
    /// No unguessed track has this title
    NoMatch,
    /// Session is not running (not begun, or already ended)
    Rejected,
}

/// One timed play-through.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSession {
    /// Album or artist game
    pub mode: GameMode,
    /// Subject MBID: release id (album) or artist id (artist)
    pub subject_mbid: String,
    /// Owning release-group MBID, album mode only
    pub release_group_id: Option<String>,
    /// What to show as "Selected Album: {title} by {artist}"
    pub title: String,
    /// Primary artist-credit name
    pub artist_name: String,
    /// Flattened track list; positions unique and stable
    tracks: Vec<SessionTrack>,
    /// Normalized titles guessed so far
    guessed: HashSet<String>,
    /// The text field contents, cleared on every correct guess
    pub current_guess: String,
    /// Fixed at session start, never extended
    time_limit: Duration,
    started_at: Option<DateTime<Utc>>,
    deadline: Option<DateTime<Utc>>,
    state: SessionState,
    /// Wall time spent playing, fixed at the terminal transition
    elapsed: Option<Duration>,
    /// At-most-once save guard, client-side only
    pub score_saved: bool,
}

impl GameSession {
    /// Single-album session from a loaded track listing.
    pub fn for_album(listing: &TrackListing, time_limit: Duration) -> Self {
        let tracks = listing
            .tracks
            .iter()
            .map(|t| SessionTrack::new(t.position, t))
            .collect();

        Self::new(
            GameMode::Album,
            listing.release_id.clone(),
            listing.release_group_id.clone(),
            listing.album_title.clone(),
            listing.artist_name.clone(),
            tracks,
            time_limit,
        )
    }

    /// Multi-album session over an already combined, deduplicated track
    /// list (see [`crate::game::tracklist::combined_tracklist`]).
    pub fn for_artist(
        artist_mbid: String,
        artist_name: String,
        tracks: Vec<SessionTrack>,
        time_limit: Duration,
    ) -> Self {
        Self::new(
            GameMode::Artist,
            artist_mbid,
            None,
            artist_name.clone(),
            artist_name,
            tracks,
            time_limit,
        )
    }

    fn new(
        mode: GameMode,
        subject_mbid: String,
        release_group_id: Option<String>,
        title: String,
        artist_name: String,
        tracks: Vec<SessionTrack>,
        time_limit: Duration,
    ) -> Self {
        Self {
            mode,
            subject_mbid,
            release_group_id,
            title,
            artist_name,
            tracks,
            guessed: HashSet::new(),
            current_guess: String::new(),
            time_limit,
            started_at: None,
            deadline: None,
            state: SessionState::Pending,
            elapsed: None,
            score_saved: false,
        }
    }

    /// Start the clock. Called once the tracklist is loaded and shown;
    /// guesses before this are rejected.
    pub fn begin(&mut self, now: DateTime<Utc>) {
        if self.state != SessionState::Pending {
            return;
        }
        self.started_at = Some(now);
        self.deadline = Some(now + chrono::Duration::seconds(self.time_limit.as_secs() as i64));
        self.state = SessionState::Running;
    }

    /// Advance the clock: a running session whose deadline has passed
    /// expires. Called on every timer tick and at the top of every
    /// guess, so the session never lingers in `Running` past its end.
    pub fn tick(&mut self, now: DateTime<Utc>) -> SessionState {
        if self.state == SessionState::Running
            && self.deadline.is_some_and(|deadline| now >= deadline)
        {
            self.state = SessionState::Expired;
            self.elapsed = Some(self.time_limit);
        }
        self.state
    }

    /// Submit one guess.
    ///
    /// The guess is normalized and compared against every unguessed
    /// track; on a hit the track is marked and the input buffer clears.
    /// Completion is checked immediately. A guess in any non-running
    /// state (including one that arrives at or after the deadline) is
    /// rejected without mutating anything.
    pub fn submit_guess(&mut self, raw: &str, now: DateTime<Utc>) -> GuessOutcome {
        if self.tick(now) != SessionState::Running {
            return GuessOutcome::Rejected;
        }

        self.current_guess = raw.to_string();

        let key = normalize(raw);
        if key.is_empty() || self.guessed.contains(&key) {
            return GuessOutcome::NoMatch;
        }

        let Some(track) = self.tracks.iter().find(|t| t.normalized == key) else {
            return GuessOutcome::NoMatch;
        };
        let track = track.clone();

        self.guessed.insert(key);
        self.current_guess.clear();

        if self.correct_count() == self.tracks.len() {
            self.state = SessionState::Completed;
            self.elapsed = Some(self.playing_time(now));
        }

        GuessOutcome::Matched(track)
    }

    /// Give up: ends the session early and freezes the elapsed time at
    /// this moment (elapsed = time limit - remaining).
    pub fn stop(&mut self, now: DateTime<Utc>) {
        if self.tick(now) != SessionState::Running {
            return;
        }
        self.state = SessionState::Stopped;
        self.elapsed = Some(self.playing_time(now));
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_ended(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn tracks(&self) -> &[SessionTrack] {
        &self.tracks
    }

    pub fn total(&self) -> usize {
        self.tracks.len()
    }

    /// Tracks counted as guessed. Two tracks sharing a normalized title
    /// are both covered by one guess, so a session is never unwinnable.
    pub fn correct_count(&self) -> usize {
        self.tracks
            .iter()
            .filter(|t| self.guessed.contains(&t.normalized))
            .count()
    }

    /// Whether one particular track has been guessed.
    pub fn is_guessed(&self, track: &SessionTrack) -> bool {
        self.guessed.contains(&track.normalized)
    }

    /// Time left on the clock.
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        match self.state {
            SessionState::Pending => self.time_limit,
            SessionState::Running => self
                .deadline
                .and_then(|deadline| (deadline - now).to_std().ok())
                .unwrap_or(Duration::ZERO),
            _ => Duration::ZERO,
        }
    }

    /// "N / M", as persisted in the score column.
    pub fn score_string(&self) -> String {
        format!("{} / {}", self.correct_count(), self.total())
    }

    /// "MM:SS" elapsed play time. Zero until the session has ended.
    pub fn elapsed_string(&self) -> String {
        format_mm_ss(self.elapsed.unwrap_or(Duration::ZERO))
    }

    /// Wall time since `begin`, capped at the limit.
    fn playing_time(&self, now: DateTime<Utc>) -> Duration {
        self.started_at
            .and_then(|started| (now - started).to_std().ok())
            .map(|d| d.min(self.time_limit))
            .unwrap_or(Duration::ZERO)
    }
}

/// Render a duration as zero-padded "MM:SS".
pub fn format_mm_ss(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Track;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 10, 20, 0, 0).unwrap()
    }

    fn listing(titles: &[&str]) -> TrackListing {
        TrackListing {
            release_id: "rel-1".to_string(),
            release_group_id: Some("rg-1".to_string()),
            album_title: "Test Album".to_string(),
            artist_name: "Test Artist".to_string(),
            first_release_date: None,
            tracks: titles
                .iter()
                .enumerate()
                .map(|(i, title)| Track {
                    position: i as u32 + 1,
                    title: (*title).to_string(),
                    recording_id: None,
                })
                .collect(),
        }
    }

    fn running_session(titles: &[&str]) -> GameSession {
        let mut session = GameSession::for_album(&listing(titles), Duration::from_secs(300));
        session.begin(t0());
        session
    }

    #[test]
    fn test_guesses_rejected_before_begin() {
        let mut session = GameSession::for_album(&listing(&["One"]), Duration::from_secs(300));
        assert_eq!(session.state(), SessionState::Pending);
        assert_eq!(session.submit_guess("One", t0()), GuessOutcome::Rejected);
        assert_eq!(session.correct_count(), 0);
        assert!(session.current_guess.is_empty());
    }

    #[test]
    fn test_correct_guess_ignores_case_and_accents() {
        let mut session = running_session(&["Café Tacvba", "Other Song"]);

        let outcome = session.submit_guess("cafe tacvba", t0());
        assert!(matches!(outcome, GuessOutcome::Matched(ref t) if t.title == "Café Tacvba"));
        assert_eq!(session.correct_count(), 1);
        // Matching clears the input buffer.
        assert!(session.current_guess.is_empty());
    }

    #[test]
    fn test_duplicate_guess_is_noop() {
        let mut session = running_session(&["Rock & Roll", "Other"]);

        assert!(matches!(
            session.submit_guess("rock and roll", t0()),
            GuessOutcome::Matched(_)
        ));
        assert_eq!(session.correct_count(), 1);

        // Same title again, different spelling: no growth, no match.
        assert_eq!(session.submit_guess("Rock & Roll", t0()), GuessOutcome::NoMatch);
        assert_eq!(session.correct_count(), 1);
    }

    #[test]
    fn test_wrong_guess_keeps_buffer_and_state() {
        let mut session = running_session(&["One", "Two"]);
        assert_eq!(session.submit_guess("Three", t0()), GuessOutcome::NoMatch);
        assert_eq!(session.current_guess, "Three");
        assert_eq!(session.correct_count(), 0);
        assert_eq!(session.state(), SessionState::Running);
    }

    #[test]
    fn test_empty_guess_never_matches() {
        let mut session = running_session(&["One"]);
        assert_eq!(session.submit_guess("", t0()), GuessOutcome::NoMatch);
        assert_eq!(session.submit_guess("   ", t0()), GuessOutcome::NoMatch);
        assert_eq!(session.submit_guess("?!.", t0()), GuessOutcome::NoMatch);
        assert_eq!(session.correct_count(), 0);
    }

    #[test]
    fn test_completes_exactly_when_all_guessed() {
        let mut session = running_session(&["One", "Two", "Three"]);
        let now = t0();

        session.submit_guess("one", now);
        session.submit_guess("two", now);
        assert_eq!(session.state(), SessionState::Running);

        let later = now + chrono::Duration::seconds(42);
        session.submit_guess("three", later);
        assert_eq!(session.state(), SessionState::Completed);
        assert_eq!(session.score_string(), "3 / 3");
        assert_eq!(session.elapsed_string(), "00:42");

        // Terminal state absorbs.
        assert_eq!(session.submit_guess("one", later), GuessOutcome::Rejected);
    }

    #[test]
    fn test_expires_at_deadline_without_a_guess() {
        let mut session = running_session(&["One"]);
        let deadline = t0() + chrono::Duration::seconds(300);

        assert_eq!(session.tick(deadline - chrono::Duration::seconds(1)), SessionState::Running);
        assert_eq!(session.tick(deadline), SessionState::Expired);
        assert_eq!(session.elapsed_string(), "05:00");

        // Guesses after expiry are rejected and mutate nothing.
        let count_before = session.correct_count();
        assert_eq!(
            session.submit_guess("One", deadline + chrono::Duration::seconds(1)),
            GuessOutcome::Rejected
        );
        assert_eq!(session.correct_count(), count_before);
        assert_eq!(session.state(), SessionState::Expired);
    }

    #[test]
    fn test_late_guess_expires_session_first() {
        let mut session = running_session(&["One"]);
        let past_deadline = t0() + chrono::Duration::seconds(301);

        assert_eq!(session.submit_guess("One", past_deadline), GuessOutcome::Rejected);
        assert_eq!(session.state(), SessionState::Expired);
    }

    #[test]
    fn test_stop_freezes_elapsed() {
        let mut session = running_session(&["One", "Two"]);
        session.submit_guess("one", t0());

        let stop_at = t0() + chrono::Duration::seconds(95);
        session.stop(stop_at);

        assert_eq!(session.state(), SessionState::Stopped);
        assert_eq!(session.elapsed_string(), "01:35");
        assert_eq!(session.score_string(), "1 / 2");
        assert_eq!(session.remaining(stop_at), Duration::ZERO);

        // stop on an ended session is a no-op
        session.stop(stop_at + chrono::Duration::seconds(60));
        assert_eq!(session.elapsed_string(), "01:35");
    }

    #[test]
    fn test_duplicate_titles_covered_by_one_guess() {
        // Same song twice on one edition: one guess covers both entries,
        // so the session is still winnable.
        let mut session = running_session(&["Reprise", "Middle", "Reprise"]);
        session.submit_guess("reprise", t0());
        assert_eq!(session.correct_count(), 2);
        session.submit_guess("middle", t0());
        assert_eq!(session.state(), SessionState::Completed);
    }

    #[test]
    fn test_remaining_counts_down() {
        let session = running_session(&["One"]);
        let now = t0() + chrono::Duration::seconds(60);
        assert_eq!(session.remaining(now), Duration::from_secs(240));
    }

    #[test]
    fn test_format_mm_ss() {
        assert_eq!(format_mm_ss(Duration::from_secs(0)), "00:00");
        assert_eq!(format_mm_ss(Duration::from_secs(9)), "00:09");
        assert_eq!(format_mm_ss(Duration::from_secs(300)), "05:00");
        assert_eq!(format_mm_ss(Duration::from_secs(1199)), "19:59");
    }

    #[test]
    fn test_session_serde_round_trip() {
        let mut session = running_session(&["One", "Two"]);
        session.submit_guess("one", t0());

        let json = serde_json::to_string(&session).unwrap();
        let restored: GameSession = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.state(), SessionState::Running);
        assert_eq!(restored.correct_count(), 1);
        assert_eq!(restored.total(), 2);
        assert_eq!(restored.subject_mbid, "rel-1");
    }
}

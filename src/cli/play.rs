//! Interactive terminal gameplay.
//!
//! The play loop multiplexes three event sources on one task: guesses
//! typed on stdin (bridged off a blocking reader thread), a periodic
//! clock tick, and nothing else - the session itself decides expiry and
//! completion synchronously inside every guess and tick, so the game
//! can never linger past its real end.

use std::future::Future;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::pin::Pin;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::warn;

use crate::catalog::{ArtistHit, CatalogApi, CatalogError};
use crate::error::Result;
use crate::game::session::format_mm_ss;
use crate::game::{GameSession, GuessOutcome, SearchGate, SessionState, snapshot};
use crate::model::GameMode;

/// How a play loop finished.
pub enum PlayEnd {
    /// The session reached a terminal state
    Ended(GameSession),
    /// The player paused; the session was snapshotted for `resume`
    Paused,
}

/// Spawn a blocking thread that forwards stdin lines into a channel.
///
/// The channel closes when stdin reaches EOF. The reader thread exits
/// on its own once the receiver is dropped.
fn stdin_lines() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel::<String>(16);
    tokio::task::spawn_blocking(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });
    rx
}

fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}

/// Run one session to its end (or a pause).
///
/// In-band commands: `/giveup` ends the session early, `/pause` saves a
/// resumable snapshot and exits, `/quit` is `/giveup` without ceremony.
pub async fn run_session(
    mut session: GameSession,
    snapshot_dir: Option<PathBuf>,
) -> Result<PlayEnd> {
    print_header(&session);
    session.begin(Utc::now());

    let mut lines = stdin_lines();
    let mut ticker = tokio::time::interval(Duration::from_millis(500));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut last_announced_min = u64::MAX;

    prompt();
    loop {
        tokio::select! {
            maybe_line = lines.recv() => {
                let now = Utc::now();
                match maybe_line.as_deref().map(str::trim) {
                    None | Some("/quit") | Some("/giveup") => {
                        session.stop(now);
                    }
                    Some("/pause") => {
                        if let Some(ref dir) = snapshot_dir {
                            snapshot::save_pending(dir, &session, now)?;
                            println!("Game paused. Run `guess-the-songs resume` within 10 minutes to pick it up.");
                            return Ok(PlayEnd::Paused);
                        }
                        println!("No place to store the snapshot; keep playing.");
                    }
                    Some(guess) => {
                        match session.submit_guess(guess, now) {
                            GuessOutcome::Matched(track) => {
                                println!(
                                    "  ✓ {}. {}   [{} / {}, {} left]",
                                    track.position,
                                    track.title,
                                    session.correct_count(),
                                    session.total(),
                                    format_mm_ss(session.remaining(now)),
                                );
                            }
                            GuessOutcome::NoMatch => {
                                println!(
                                    "  ✗ not it   [{} / {}, {} left]",
                                    session.correct_count(),
                                    session.total(),
                                    format_mm_ss(session.remaining(now)),
                                );
                            }
                            GuessOutcome::Rejected => {}
                        }
                        if !session.is_ended() {
                            prompt();
                        }
                    }
                }
            }
            _ = ticker.tick() => {
                let now = Utc::now();
                session.tick(now);
                // Announce the countdown once a minute, not every tick.
                let remaining_min = session.remaining(now).as_secs() / 60;
                if session.state() == SessionState::Running
                    && remaining_min != last_announced_min
                    && last_announced_min != u64::MAX
                {
                    println!("  ⏱ {} left", format_mm_ss(session.remaining(now)));
                    prompt();
                }
                last_announced_min = remaining_min;
            }
        }

        if session.is_ended() {
            break;
        }
    }

    // A finished game invalidates any earlier pause snapshot.
    if let Some(ref dir) = snapshot_dir {
        snapshot::clear_pending(dir);
    }

    print_results(&session);
    Ok(PlayEnd::Ended(session))
}

fn print_header(session: &GameSession) {
    println!();
    match session.mode {
        GameMode::Album => {
            println!("Selected Album: {} by {}", session.title, session.artist_name);
        }
        GameMode::Artist => {
            println!("Name every song by {}", session.artist_name);
        }
    }
    println!(
        "{} tracks, {} on the clock. Type a song title and press enter.",
        session.total(),
        format_mm_ss(session.remaining(Utc::now())),
    );
    println!("Commands: /giveup, /pause, /quit");
    println!();
}

fn print_results(session: &GameSession) {
    println!();
    match session.state() {
        SessionState::Completed => println!("You named them all!"),
        SessionState::Expired => println!("Time's up!"),
        SessionState::Stopped => println!("You gave up."),
        // Unreachable from run_session; keep the render total anyway.
        SessionState::Pending | SessionState::Running => {}
    }
    println!("Score: {}   Time: {}", session.score_string(), session.elapsed_string());
    println!();

    for track in session.tracks() {
        let mark = if session.is_guessed(track) { "✓" } else { "✗" };
        println!("  {} {:>3}. {}", mark, track.position, track.title);
    }
    println!();
}

/// Interactively pick an artist, re-searching as the player types.
///
/// Every input line supersedes the previous search: a new
/// [`SearchGate`] token is issued, the in-flight request future is
/// dropped, and any completion whose token is no longer current is
/// discarded instead of clobbering newer results.
pub async fn interactive_artist_search(
    catalog: &dyn CatalogApi,
    initial: Option<String>,
) -> Result<Option<ArtistHit>> {
    type SearchFuture<'a> =
        Pin<Box<dyn Future<Output = std::result::Result<Vec<ArtistHit>, CatalogError>> + 'a>>;

    let gate = SearchGate::new();
    let mut lines = stdin_lines();
    let mut hits: Vec<ArtistHit> = Vec::new();
    let mut in_flight: Option<(crate::game::resolver::SearchToken, SearchFuture<'_>)> = None;

    if let Some(query) = initial.filter(|q| !q.trim().is_empty()) {
        let token = gate.issue();
        let query = query.trim().to_string();
        let fut: SearchFuture<'_> = Box::pin(async move { catalog.search_artists(&query).await });
        in_flight = Some((token, fut));
    } else {
        println!("Search for an artist (empty line to cancel):");
        prompt();
    }

    enum Event {
        Line(Option<String>),
        SearchDone(std::result::Result<Vec<ArtistHit>, CatalogError>),
    }

    loop {
        // Scope the borrow of the in-flight future to the select itself
        // so the handlers below are free to replace it.
        let event = {
            let search: futures::future::OptionFuture<_> =
                in_flight.as_mut().map(|(_, fut)| fut.as_mut()).into();

            tokio::select! {
                maybe_line = lines.recv() => Event::Line(maybe_line),
                Some(result) = search => Event::SearchDone(result),
            }
        };

        match event {
            Event::Line(maybe_line) => {
                let Some(line) = maybe_line else { return Ok(None) };
                let line = line.trim().to_string();

                if line.is_empty() {
                    return Ok(None);
                }

                // A number picks from the last shown results.
                if let Ok(n) = line.parse::<usize>()
                    && n >= 1
                    && n <= hits.len()
                {
                    return Ok(Some(hits[n - 1].clone()));
                }

                // Anything else is a fresh query. Replacing the in-flight
                // future drops (cancels) the superseded request.
                let token = gate.issue();
                let fut: SearchFuture<'_> =
                    Box::pin(async move { catalog.search_artists(&line).await });
                in_flight = Some((token, fut));
                println!("  searching…");
            }
            Event::SearchDone(result) => {
                let Some((token, _)) = in_flight.take() else { continue };
                if !gate.is_current(token) {
                    // Superseded while completing; drop the stale result.
                    continue;
                }

                match result {
                    Ok(found) if found.is_empty() => {
                        println!("No artists found. Try another spelling:");
                        hits.clear();
                    }
                    Ok(found) => {
                        hits = found;
                        for (i, hit) in hits.iter().enumerate() {
                            match &hit.disambiguation {
                                Some(note) => println!("  {}. {} — {}", i + 1, hit.name, note),
                                None => println!("  {}. {}", i + 1, hit.name),
                            }
                        }
                        println!("Pick a number, or type a new name to search again:");
                    }
                    Err(e) => {
                        warn!("Artist search failed: {e}");
                        println!("Search failed ({e}). Try again:");
                    }
                }
                prompt();
            }
        }
    }
}

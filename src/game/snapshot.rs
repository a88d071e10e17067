//! Pending-game persistence.
//!
//! A session can be paused and resumed across process restarts within a
//! ten-minute window. The snapshot serializes the whole [`GameSession`]
//! (tracks, guesses, clock, flags) next to a save timestamp; anything
//! older than the window is stale and silently discarded on load.
//!
//! The artist-mode album selection is persisted alongside it so the
//! same set of releases can be replayed without re-picking.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result, ResultExt};
use crate::game::session::GameSession;

/// How long a pending game stays resumable.
pub const PENDING_GAME_WINDOW: Duration = Duration::from_secs(10 * 60);

const PENDING_GAME_FILE: &str = "pending_game.json";
const SELECTED_RELEASES_FILE: &str = "selected_releases.json";

/// On-disk shape of a paused session.
#[derive(Debug, Serialize, Deserialize)]
struct PendingGame {
    saved_at: DateTime<Utc>,
    session: GameSession,
}

/// The artist-mode album selection, kept so `artist --last` can replay
/// the same set of releases without re-picking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSelection {
    /// MusicBrainz artist id the selection belongs to
    pub artist_id: String,
    /// Artist display name
    pub artist_name: String,
    /// The concrete releases that were played
    pub release_ids: Vec<String>,
}

/// On-disk wrapper adding the freshness timestamp.
#[derive(Debug, Serialize, Deserialize)]
struct SelectedReleases {
    saved_at: DateTime<Utc>,
    #[serde(flatten)]
    selection: StoredSelection,
}

/// Persist a session for later resumption.
pub fn save_pending(dir: &Path, session: &GameSession, now: DateTime<Utc>) -> Result<()> {
    let pending = PendingGame {
        saved_at: now,
        session: session.clone(),
    };
    write_json(dir, PENDING_GAME_FILE, &pending)?;
    debug!("Saved pending game");
    Ok(())
}

/// Load the pending session, if one exists and is fresh enough.
///
/// An expired snapshot is deleted and `None` returned; a corrupt one is
/// logged and treated the same (a stale half-game must never block a
/// new one).
pub fn load_pending(dir: &Path, now: DateTime<Utc>) -> Option<GameSession> {
    let pending: PendingGame = read_json(dir, PENDING_GAME_FILE)?;

    if is_expired(pending.saved_at, now) {
        debug!("Pending game expired, discarding");
        clear_pending(dir);
        return None;
    }

    Some(pending.session)
}

/// Delete the pending snapshot, if any.
pub fn clear_pending(dir: &Path) {
    let path = dir.join(PENDING_GAME_FILE);
    if path.exists()
        && let Err(e) = std::fs::remove_file(&path)
    {
        warn!("Failed to remove pending game {:?}: {}", path, e);
    }
}

/// Persist the artist-mode release selection.
pub fn save_selection(dir: &Path, selection: &StoredSelection, now: DateTime<Utc>) -> Result<()> {
    let selected = SelectedReleases {
        saved_at: now,
        selection: selection.clone(),
    };
    write_json(dir, SELECTED_RELEASES_FILE, &selected)
}

/// Load the last artist-mode release selection. Unlike the pending
/// game, a selection has no clock attached, so it does not expire.
pub fn load_selection(dir: &Path) -> Option<StoredSelection> {
    let selected: SelectedReleases = read_json(dir, SELECTED_RELEASES_FILE)?;
    Some(selected.selection)
}

fn is_expired(saved_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    match (now - saved_at).to_std() {
        Ok(age) => age > PENDING_GAME_WINDOW,
        // saved_at in the future means a clock jumped; treat as stale.
        Err(_) => true,
    }
}

fn write_json<T: Serialize>(dir: &Path, file: &str, value: &T) -> Result<()> {
    std::fs::create_dir_all(dir).with_context(format!("creating {}", dir.display()))?;

    let contents = serde_json::to_string_pretty(value)
        .map_err(|e| Error::validation(format!("serializing {file}: {e}")))?;

    // Write atomically (write to temp, then rename)
    let path = dir.join(file);
    let temp_path = path.with_extension("json.tmp");
    std::fs::write(&temp_path, contents).with_context(format!("writing {}", temp_path.display()))?;
    std::fs::rename(&temp_path, &path).with_context(format!("renaming to {}", path.display()))?;
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(dir: &Path, file: &str) -> Option<T> {
    let path: PathBuf = dir.join(file);
    let contents = std::fs::read_to_string(&path).ok()?;
    match serde_json::from_str(&contents) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Discarding unreadable snapshot {:?}: {}", path, e);
            None
        }
    }
}

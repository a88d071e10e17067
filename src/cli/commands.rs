//! CLI command definitions and handlers.
//!
//! Each subcommand is implemented as a function that takes the parsed arguments
//! and returns an `anyhow::Result<()>`.

use std::io::Write;
use std::time::Duration;

use chrono::Utc;
use clap::{Parser, Subcommand};
use tokio::runtime::Runtime;
use tracing::{debug, warn};

use crate::catalog::{AudioDbClient, MusicBrainzClient, ReleaseGroup};
use crate::cli::play::{self, PlayEnd};
use crate::config::{self, Config};
use crate::db;
use crate::error::Error;
use crate::game::resolver::{GroupSummary, ReleaseCandidate};
use crate::game::{
    GameSession, ReleaseResolver, Resolution, load_tracklist, snapshot, tracklist,
};
use crate::identity::{ConfigIdentity, IdentityApi};
use crate::model::Score;
use crate::score::ScoreRecorder;

/// Guess the Songs CLI
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Play one album: name every track before the clock runs out
    Play {
        /// Artist name
        artist: Option<String>,
        /// Album or EP name
        album: Option<String>,
        /// Skip searching and play this release MBID directly
        #[arg(long)]
        release: Option<String>,
        /// Auto-pick among editions instead of asking
        #[arg(long)]
        auto: bool,
        /// Override the time limit, in seconds
        #[arg(long)]
        time_limit: Option<u64>,
    },
    /// Play a whole artist: name every song across their albums
    Artist {
        /// Artist name to search for (interactive search if omitted)
        name: Option<String>,
        /// Replay the album selection from the previous artist game
        #[arg(long)]
        last: bool,
        /// Override the time limit, in seconds
        #[arg(long)]
        time_limit: Option<u64>,
    },
    /// Resume a paused game (within 10 minutes of pausing)
    Resume,
    /// Show the leaderboard for a release
    Scores {
        /// Release MBID (as printed after a game)
        release: String,
        /// Only your own scores
        #[arg(long)]
        mine: bool,
        /// Print the ranked rows as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// List what you have played
    History,
    /// Set the username scores are saved under
    Login {
        /// Username
        username: String,
    },
    /// Clear the saved username
    Logout,
}

/// Run the specified CLI command.
///
/// Returns `Ok(true)` if a command was run, `Ok(false)` if no command
/// was specified (the caller prints usage).
pub fn run_command(cli: &Cli) -> anyhow::Result<bool> {
    let rt = Runtime::new()?;

    match &cli.command {
        Some(Commands::Play {
            artist,
            album,
            release,
            auto,
            time_limit,
        }) => {
            cmd_play(
                &rt,
                artist.as_deref(),
                album.as_deref(),
                release.as_deref(),
                *auto,
                *time_limit,
            )?;
            Ok(true)
        }
        Some(Commands::Artist {
            name,
            last,
            time_limit,
        }) => {
            cmd_artist(&rt, name.clone(), *last, *time_limit)?;
            Ok(true)
        }
        Some(Commands::Resume) => {
            cmd_resume(&rt)?;
            Ok(true)
        }
        Some(Commands::Scores { release, mine, json }) => {
            cmd_scores(&rt, release, *mine, *json)?;
            Ok(true)
        }
        Some(Commands::History) => {
            cmd_history(&rt)?;
            Ok(true)
        }
        Some(Commands::Login { username }) => {
            cmd_login(username)?;
            Ok(true)
        }
        Some(Commands::Logout) => {
            cmd_logout()?;
            Ok(true)
        }
        None => Ok(false),
    }
}

// ============================================================================
// Individual command implementations
// ============================================================================

fn cmd_play(
    rt: &Runtime,
    artist: Option<&str>,
    album: Option<&str>,
    release: Option<&str>,
    auto: bool,
    time_limit: Option<u64>,
) -> anyhow::Result<()> {
    let config = config::load();
    let catalog = MusicBrainzClient::with_base_url(&config.catalog.musicbrainz_url);

    let release_id = match release {
        Some(id) => id.to_string(),
        None => {
            let (Some(artist), Some(album)) = (artist, album) else {
                anyhow::bail!("provide ARTIST and ALBUM, or --release <MBID>");
            };

            let resolver =
                ReleaseResolver::new(&catalog, config.game.excluded_secondary_types.clone());
            match rt.block_on(resolver.resolve(artist, album)) {
                Ok(Resolution::NotFound) => {
                    print_album_not_found(artist, album);
                    return Ok(());
                }
                Ok(Resolution::Unique { group, candidate }) => {
                    debug!(release_group = %group.id, release = %candidate.release_id, "Resolved");
                    println!(
                        "Found: {} by {} ({} tracks)",
                        group.title, group.artist_name, candidate.track_count
                    );
                    candidate.release_id
                }
                Ok(Resolution::Ambiguous { group, candidates }) => {
                    if auto {
                        let Some(candidate) = config.game.selection_strategy.pick(&candidates)
                        else {
                            print_album_not_found(artist, album);
                            return Ok(());
                        };
                        println!(
                            "Found: {} by {} ({} tracks, auto-picked)",
                            group.title, group.artist_name, candidate.track_count
                        );
                        candidate.release_id.clone()
                    } else {
                        match choose_candidate(&group, &candidates) {
                            Some(id) => id,
                            None => return Ok(()),
                        }
                    }
                }
                Err(Error::Validation(msg)) => {
                    println!("{msg}");
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            }
        }
    };

    let listing = match rt.block_on(load_tracklist(&catalog, &release_id)) {
        Ok(listing) => listing,
        Err(Error::NotFound(_)) => {
            println!(
                "That release ({release_id}) wasn't found on MusicBrainz. \
                 Check the id, or start from artist + album instead."
            );
            return Ok(());
        }
        Err(Error::Validation(msg)) => {
            println!("That release can't be played: {msg}");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let limit = Duration::from_secs(time_limit.unwrap_or(config.game.album_time_limit_secs));
    let session = GameSession::for_album(&listing, limit);
    run_to_finish(rt, &config, session)
}

fn cmd_artist(
    rt: &Runtime,
    name: Option<String>,
    last: bool,
    time_limit: Option<u64>,
) -> anyhow::Result<()> {
    let config = config::load();
    let catalog = MusicBrainzClient::with_base_url(&config.catalog.musicbrainz_url);
    let resolver = ReleaseResolver::new(&catalog, config.game.excluded_secondary_types.clone());

    if last {
        return replay_last_selection(rt, &config, &catalog, time_limit);
    }

    let Some(artist) = rt.block_on(play::interactive_artist_search(&catalog, name))? else {
        return Ok(());
    };
    println!("Playing: {}", artist.name);

    let groups = rt.block_on(resolver.release_groups_for_artist(&artist.id))?;
    if groups.is_empty() {
        println!(
            "No albums or EPs found for {} on MusicBrainz. \
             Back to the form: try another artist.",
            artist.name
        );
        return Ok(());
    }

    let selected = choose_groups(&groups);
    if selected.is_empty() {
        return Ok(());
    }

    // Load everything the session needs; the logo rides along but never
    // blocks the game on failure.
    let audiodb = AudioDbClient::with_base_url(
        &config.catalog.audiodb_url,
        config.catalog.audiodb_api_key.clone(),
    );
    let strategy = config.game.selection_strategy;
    let (loaded, logo) = rt.block_on(async {
        let listings = async {
            let loads = selected.iter().map(|group| {
                let resolver = &resolver;
                let catalog = &catalog;
                async move {
                    match resolver.resolve_group(group).await? {
                        Resolution::NotFound => Err(Error::not_found(group.title.clone())),
                        Resolution::Unique { candidate, .. } => {
                            load_tracklist(catalog, &candidate.release_id).await
                        }
                        Resolution::Ambiguous { candidates, .. } => {
                            match strategy.pick(&candidates) {
                                Some(candidate) => {
                                    load_tracklist(catalog, &candidate.release_id).await
                                }
                                None => Err(Error::not_found(group.title.clone())),
                            }
                        }
                    }
                }
            });
            futures::future::join_all(loads).await
        };
        tokio::join!(listings, audiodb.artist_logo(&artist.id))
    });

    match logo {
        Ok(Some(url)) => println!("Artist logo: {url}"),
        Ok(None) => {}
        Err(e) => warn!("Artist logo lookup failed: {e}"),
    }

    let mut listings = Vec::new();
    for (group, result) in selected.iter().zip(loaded) {
        match result {
            Ok(listing) => listings.push(listing),
            Err(e) => {
                warn!("Skipping {}: {e}", group.title);
                println!("  (skipping {}: {e})", group.title);
            }
        }
    }
    if listings.is_empty() {
        println!("None of the selected albums could be loaded. Try again later.");
        return Ok(());
    }

    if let Some(dir) = config::data_dir() {
        let selection = snapshot::StoredSelection {
            artist_id: artist.id.clone(),
            artist_name: artist.name.clone(),
            release_ids: listings.iter().map(|l| l.release_id.clone()).collect(),
        };
        if let Err(e) = snapshot::save_selection(&dir, &selection, Utc::now()) {
            warn!("Could not persist the album selection: {e}");
        }
    }

    tracklist::sort_listings_chronologically(&mut listings);
    let tracks = tracklist::combined_tracklist(&listings);
    if tracks.is_empty() {
        println!("The selected albums have no playable tracks.");
        return Ok(());
    }

    let limit = Duration::from_secs(time_limit.unwrap_or(config.game.artist_time_limit_secs));
    let session = GameSession::for_artist(artist.id.clone(), artist.name.clone(), tracks, limit);
    run_to_finish(rt, &config, session)
}

/// `artist --last`: rebuild the game from the stored release selection
/// without searching or re-picking albums.
fn replay_last_selection(
    rt: &Runtime,
    config: &Config,
    catalog: &MusicBrainzClient,
    time_limit: Option<u64>,
) -> anyhow::Result<()> {
    let selection = config::data_dir().and_then(|dir| snapshot::load_selection(&dir));
    let Some(selection) = selection else {
        println!("No previous artist game to replay. Run `guess-the-songs artist` first.");
        return Ok(());
    };
    println!("Replaying: {}", selection.artist_name);

    let loaded = rt.block_on(async {
        let loads = selection
            .release_ids
            .iter()
            .map(|id| load_tracklist(catalog, id));
        futures::future::join_all(loads).await
    });

    let mut listings = Vec::new();
    for (id, result) in selection.release_ids.iter().zip(loaded) {
        match result {
            Ok(listing) => listings.push(listing),
            Err(e) => {
                warn!("Skipping {id}: {e}");
                println!("  (skipping {id}: {e})");
            }
        }
    }
    if listings.is_empty() {
        println!("None of the remembered albums could be loaded. Try again later.");
        return Ok(());
    }

    tracklist::sort_listings_chronologically(&mut listings);
    let tracks = tracklist::combined_tracklist(&listings);
    if tracks.is_empty() {
        println!("The remembered albums have no playable tracks.");
        return Ok(());
    }

    let limit = Duration::from_secs(time_limit.unwrap_or(config.game.artist_time_limit_secs));
    let session = GameSession::for_artist(
        selection.artist_id.clone(),
        selection.artist_name.clone(),
        tracks,
        limit,
    );
    run_to_finish(rt, config, session)
}

fn cmd_resume(rt: &Runtime) -> anyhow::Result<()> {
    let config = config::load();
    let Some(dir) = config::data_dir() else {
        anyhow::bail!("could not determine the data directory");
    };

    let Some(session) = snapshot::load_pending(&dir, Utc::now()) else {
        println!("No resumable game. Pause snapshots expire after 10 minutes.");
        return Ok(());
    };
    snapshot::clear_pending(&dir);

    if session.is_ended() {
        // Paused after the game ended (e.g. to sign in before saving).
        let mut session = session;
        println!(
            "Resumed a finished game: {} ({}).",
            session.score_string(),
            session.elapsed_string()
        );
        return offer_save(rt, &config, &mut session);
    }

    println!("Resuming where you left off. The clock never stopped.");
    run_to_finish(rt, &config, session)
}

fn cmd_scores(rt: &Runtime, release: &str, mine: bool, json: bool) -> anyhow::Result<()> {
    let config = config::load();
    let pool = open_db(rt, &config)?;
    let identity = ConfigIdentity::new(config.identity.username.clone());
    let recorder = ScoreRecorder::new(&pool, &identity);

    let scores = if mine {
        match rt.block_on(recorder.top_scores_for_user(release)) {
            Err(Error::Auth(msg)) => {
                println!("{msg} (guess-the-songs login <username>)");
                return Ok(());
            }
            other => other?,
        }
    } else {
        rt.block_on(recorder.top_scores(release))?
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&scores)?);
        return Ok(());
    }

    let catalog = MusicBrainzClient::with_base_url(&config.catalog.musicbrainz_url);
    print_caption(rt, &catalog, release);

    if scores.is_empty() {
        println!("No scores saved for this release yet.");
        return Ok(());
    }
    rt.block_on(print_scores(&identity, &scores));
    Ok(())
}

fn cmd_history(rt: &Runtime) -> anyhow::Result<()> {
    let config = config::load();
    let pool = open_db(rt, &config)?;
    let identity = ConfigIdentity::new(config.identity.username.clone());
    let recorder = ScoreRecorder::new(&pool, &identity);

    let played = match rt.block_on(recorder.releases_played()) {
        Err(Error::Auth(msg)) => {
            println!("{msg} (guess-the-songs login <username>)");
            return Ok(());
        }
        other => other?,
    };

    if played.is_empty() {
        println!("You haven't saved any games yet.");
        return Ok(());
    }

    let catalog = MusicBrainzClient::with_base_url(&config.catalog.musicbrainz_url);
    println!("Releases you have played:");
    for mbid in played {
        print_caption(rt, &catalog, &mbid);
    }
    Ok(())
}

fn cmd_login(username: &str) -> anyhow::Result<()> {
    let mut config = config::load();
    config.identity.username = Some(username.to_string());
    config::save(&config)?;
    println!("Scores will be saved as {username}.");
    Ok(())
}

fn cmd_logout() -> anyhow::Result<()> {
    let mut config = config::load();
    config.identity.username = None;
    config::save(&config)?;
    println!("Signed out.");
    Ok(())
}

// ============================================================================
// Shared helpers
// ============================================================================

/// Run the play loop, then the save/leaderboard tail.
fn run_to_finish(rt: &Runtime, config: &Config, session: GameSession) -> anyhow::Result<()> {
    match rt.block_on(play::run_session(session, config::data_dir()))? {
        PlayEnd::Paused => Ok(()),
        PlayEnd::Ended(mut session) => offer_save(rt, config, &mut session),
    }
}

/// The explicit user save action: prompt, persist, show the board.
fn offer_save(rt: &Runtime, config: &Config, session: &mut GameSession) -> anyhow::Result<()> {
    print!("Save your score? [y/N] ");
    let _ = std::io::stdout().flush();
    let answer = read_line().unwrap_or_default();
    if !matches!(answer.trim().to_lowercase().as_str(), "y" | "yes") {
        return Ok(());
    }

    let pool = open_db(rt, config)?;
    let identity = ConfigIdentity::new(config.identity.username.clone());
    let recorder = ScoreRecorder::new(&pool, &identity);

    match rt.block_on(recorder.save_session(session)) {
        Ok(true) => println!("Saved."),
        Ok(false) => println!("This game was already saved."),
        Err(Error::Auth(_)) => {
            // Keep the finished game around so signing in loses nothing.
            if let Some(dir) = config::data_dir()
                && let Err(e) = snapshot::save_pending(&dir, session, Utc::now())
            {
                warn!("Could not snapshot the finished game: {e}");
            }
            println!(
                "You're not signed in. Run `guess-the-songs login <username>` and then \
                 `guess-the-songs resume` within 10 minutes to save this game."
            );
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    }

    let scores = rt.block_on(recorder.top_scores(&session.subject_mbid))?;
    println!("\nLeaderboard for this release:");
    rt.block_on(print_scores(&identity, &scores));
    println!("(guess-the-songs scores {} shows this any time)", session.subject_mbid);
    Ok(())
}

/// Open the score database, creating its directory on first use.
fn open_db(rt: &Runtime, config: &Config) -> anyhow::Result<sqlx::sqlite::SqlitePool> {
    match &config.database.path {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
        }
        None => {
            if let Some(dir) = config::data_dir() {
                std::fs::create_dir_all(&dir)?;
            }
        }
    }
    Ok(rt.block_on(db::init_db(&config.database.url()))?)
}

/// Interactive edition choice when several distinct track counts exist.
fn choose_candidate(group: &GroupSummary, candidates: &[ReleaseCandidate]) -> Option<String> {
    println!(
        "{} by {} has {} editions with different track lists:",
        group.title,
        group.artist_name,
        candidates.len()
    );
    for (i, candidate) in candidates.iter().enumerate() {
        let note = match (&candidate.disambiguation, candidate.media_count) {
            (Some(d), n) if n > 1 => format!(" ({d}, {n} discs)"),
            (Some(d), _) => format!(" ({d})"),
            (None, n) if n > 1 => format!(" ({n} discs)"),
            (None, _) => String::new(),
        };
        println!("  {}. {} tracks{note}", i + 1, candidate.track_count);
    }
    print!("Which one do you want to play? [1-{}] ", candidates.len());
    let _ = std::io::stdout().flush();

    let answer = read_line()?;
    match answer.trim().parse::<usize>() {
        Ok(n) if n >= 1 && n <= candidates.len() => Some(candidates[n - 1].release_id.clone()),
        _ => {
            println!("No edition picked; nothing to play.");
            None
        }
    }
}

/// Album multi-select for artist mode. Empty input selects everything.
fn choose_groups(groups: &[ReleaseGroup]) -> Vec<ReleaseGroup> {
    println!("Albums and EPs:");
    for (i, group) in groups.iter().enumerate() {
        let ep = match group.primary_type.as_deref() {
            Some("EP") => " [EP]",
            _ => "",
        };
        match &group.first_release_date {
            Some(date) => println!("  {}. {}{} ({})", i + 1, group.title, ep, date),
            None => println!("  {}. {}{}", i + 1, group.title, ep),
        }
    }
    print!("Play which? (numbers like 1,3,4 - empty for all) ");
    let _ = std::io::stdout().flush();

    let answer = read_line().unwrap_or_default();
    let answer = answer.trim();
    if answer.is_empty() || answer.eq_ignore_ascii_case("all") {
        return groups.to_vec();
    }

    let mut selected = Vec::new();
    for part in answer.split(',') {
        match part.trim().parse::<usize>() {
            Ok(n) if n >= 1 && n <= groups.len() => {
                let group = groups[n - 1].clone();
                if !selected.iter().any(|g: &ReleaseGroup| g.id == group.id) {
                    selected.push(group);
                }
            }
            _ => {
                println!("Ignoring '{}'", part.trim());
            }
        }
    }
    selected
}

/// "<Album> by <Artist> (<mbid>)" caption for a stored release id, or
/// just the id when the lookup fails (a leaderboard must still render).
///
/// Takes the shared client so repeated captions go through one rate gate.
fn print_caption(rt: &Runtime, catalog: &MusicBrainzClient, mbid: &str) {
    match rt.block_on(catalog.release_group_for_release(mbid)) {
        Ok(release) => {
            let (title, artist) = release
                .release_group
                .as_ref()
                .map(|rg| {
                    (
                        rg.title.clone(),
                        rg.primary_artist().unwrap_or("Unknown Artist").to_string(),
                    )
                })
                .unwrap_or_else(|| (release.title.clone(), "Unknown Artist".to_string()));
            println!("{title} by {artist} ({mbid})");
        }
        Err(e) => {
            warn!("Could not caption {mbid}: {e}");
            println!("{mbid}");
        }
    }
}

async fn print_scores(identity: &dyn IdentityApi, scores: &[Score]) {
    for (rank, score) in scores.iter().enumerate() {
        let name = identity
            .display_name(&score.user_id)
            .await
            .unwrap_or_else(|_| score.user_id.clone());
        let mode_tag = if score.mode == "artist" { "  (artist game)" } else { "" };
        println!(
            "  {:>2}. {:<20} {:>8}   {}{}",
            rank + 1,
            name,
            score.score,
            score.time,
            mode_tag
        );
    }
}

fn read_line() -> Option<String> {
    let mut buffer = String::new();
    match std::io::stdin().read_line(&mut buffer) {
        Ok(0) => None,
        Ok(_) => Some(buffer),
        Err(_) => None,
    }
}

fn print_album_not_found(artist: &str, album: &str) {
    println!(
        "You have made an invalid entry, or \"{album}\" by {artist} wasn't found on \
         MusicBrainz. Check the spelling and try again."
    );
}

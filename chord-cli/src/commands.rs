//! CLI command implementations

use std::path::PathBuf;

use anyhow::anyhow;
use chord_core::catalog::{NewTrack, PrincipalId, SqliteCatalog, TrackCatalog, TrackQuery};
use chord_core::config::ChordConfig;
use chord_core::storage::MediaStore;
use chord_core::{ChordError, Result};
use clap::Subcommand;
use tokio::fs;
use tracing::info;

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    Serve {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,
        /// Port to bind to
        #[arg(short, long)]
        port: Option<u16>,
        /// Directory holding uploaded audio files
        #[arg(long)]
        media_root: Option<PathBuf>,
        /// SQLite database URL
        #[arg(long)]
        database: Option<String>,
    },
    /// Register an audio file that already sits under the media root
    AddTrack {
        /// Path to the audio file
        path: PathBuf,
        /// Track title
        #[arg(long)]
        title: String,
        /// Owning user id
        #[arg(long)]
        owner: Option<PrincipalId>,
        /// Genre label
        #[arg(long)]
        genre: Option<String>,
        /// Duration in seconds
        #[arg(long, default_value = "0")]
        duration: i64,
        /// Hide the track from everyone but its owner
        #[arg(long)]
        private: bool,
    },
    /// List public tracks with their play counts
    List,
}

/// Handle the CLI command
///
/// # Errors
/// Returns the failure of whichever command ran, with context attached.
pub async fn handle_command(command: Commands) -> anyhow::Result<()> {
    let mut config = ChordConfig::from_env();

    match command {
        Commands::Serve {
            host,
            port,
            media_root,
            database,
        } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(media_root) = media_root {
                config.storage.media_root = media_root;
            }
            if let Some(database) = database {
                config.storage.database_url = database;
            }
            serve(config).await
        }
        Commands::AddTrack {
            path,
            title,
            owner,
            genre,
            duration,
            private,
        } => {
            let mut new_track = NewTrack::new(title, String::new());
            new_track.owner_id = owner;
            new_track.genre = genre;
            new_track.duration_secs = duration;
            new_track.is_public = !private;
            add_track(&config, path, new_track).await.map_err(explain)
        }
        Commands::List => list_tracks(&config).await.map_err(explain),
    }
}

async fn open_catalog(config: &ChordConfig) -> Result<SqliteCatalog> {
    Ok(SqliteCatalog::connect(
        &config.storage.database_url,
        config.storage.max_connections,
    )
    .await?)
}

/// Turns a core error into a report led by its user-facing message.
fn explain(error: ChordError) -> anyhow::Error {
    let message = error.user_message();
    if error.is_user_error() {
        anyhow!(message)
    } else {
        anyhow::Error::new(error).context(message)
    }
}

/// Run the streaming server until it fails
///
/// # Errors
/// - Database could not be opened or the address could not be bound
pub async fn serve(config: ChordConfig) -> anyhow::Result<()> {
    println!(
        "Chord serving {} on http://{}",
        config.storage.media_root.display(),
        config.server.bind_address()
    );

    chord_web::run_server(config)
        .await
        .map_err(|e| anyhow!("Server failed: {e}"))
}

/// Register an existing file as a track
///
/// # Errors
/// - `ChordError::Io` - Media root or audio file is not accessible
/// - `ChordError::Configuration` - Path is not a regular file
/// - `ChordError::Storage` - File lies outside the media root
/// - `ChordError::Catalog` - Track row could not be stored
pub async fn add_track(config: &ChordConfig, path: PathBuf, mut new_track: NewTrack) -> Result<()> {
    let media_root = fs::canonicalize(&config.storage.media_root).await?;
    let file = fs::canonicalize(&path).await?;

    if !fs::metadata(&file).await?.is_file() {
        return Err(ChordError::Configuration {
            reason: format!("{} is not a regular file", file.display()),
        });
    }

    let media = MediaStore::new(media_root);
    new_track.file_path = media.relative_path(&file)?;

    let catalog = open_catalog(config).await?;
    let track = catalog.insert_track(new_track).await?;
    catalog.close().await;

    info!("Registered {} as track {}", track.file_path, track.id);
    println!("Added track: {} ({})", track.title, track.id);
    Ok(())
}

/// List public tracks, newest first
///
/// # Errors
/// - `ChordError::Catalog` - Database could not be opened or queried
pub async fn list_tracks(config: &ChordConfig) -> Result<()> {
    let catalog = open_catalog(config).await?;
    let query = TrackQuery {
        limit: u32::MAX,
        ..TrackQuery::default()
    };
    let tracks = catalog.list_public_tracks(&query).await?;
    catalog.close().await;

    println!("Track List");
    println!("{:-<60}", "");

    if tracks.is_empty() {
        println!("No public tracks yet.");
        println!("Use 'chord add-track <path> --title <title>' to add one.");
        return Ok(());
    }

    for track in &tracks {
        println!("{}  {:<32} {:>8} plays", track.id, track.title, track.plays);
    }
    println!("\n{} tracks", tracks.len());

    Ok(())
}

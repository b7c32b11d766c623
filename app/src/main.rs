//! PhotoSweep terminal front-end.

use clap::{Parser, Subcommand};
use gallery::{GalleryController, GalleryError, PreferencesStore, Theme, ThumbnailSize};
use media_library::FsLibrary;
use std::path::PathBuf;
use std::sync::Arc;
use store::SqliteStore;
use tracing_appender::rolling;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

mod config;

type Controller = GalleryController<FsLibrary, SqliteStore>;

#[derive(Parser)]
#[command(
    name = "photosweep",
    author,
    version,
    about = "PhotoSweep photo gallery cleaner"
)]
struct Cli {
    /// Override log level (e.g. info, debug)
    #[arg(long)]
    log_level: Option<String>,
    /// Photo library directory
    #[arg(long)]
    library: Option<PathBuf>,
    /// Directory for preferences and logs
    #[arg(long)]
    data_dir: Option<PathBuf>,
    /// Viewport width used to compute grid columns
    #[arg(long)]
    width: Option<f32>,
    /// Path to config file
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List photos grouped by month, newest first
    List {
        /// Group by calendar day instead of month
        #[arg(long)]
        by_day: bool,
        /// Keep loading pages until the library is exhausted
        #[arg(long)]
        all: bool,
    },
    /// Delete photos by id
    Delete {
        /// Ids as shown by `list`
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Show how many photos have been deleted so far
    Stats,
    /// Reset the deleted photo counter
    ResetStats,
    /// Show current preferences
    Settings,
    /// Set thumbnail size (80, 100 or 120)
    SetThumbnailSize {
        size: ThumbnailSize,
    },
    /// Group by day for this invocation
    SetGroupByDay {
        #[arg(action = clap::ArgAction::Set)]
        value: bool,
    },
    /// Set theme for this invocation
    SetTheme {
        theme: Theme,
    },
}

async fn load_all(ctrl: &mut Controller) -> Result<(), GalleryError> {
    ctrl.reload().await?;
    while ctrl.has_more() {
        if ctrl.load_more().await? == 0 {
            break;
        }
    }
    Ok(())
}

fn print_groups(ctrl: &Controller, width: f32) {
    let columns = ctrl.column_count(width);
    println!(
        "{} photos, {} columns at width {}",
        ctrl.photos().len(),
        columns,
        width
    );
    for group in ctrl.group_photos() {
        println!(
            "== {} ({} photos, {} rows)",
            group.key,
            group.len(),
            gallery::row_count(group.len(), columns)
        );
        for photo in &group.photos {
            println!("  {}  {}", photo.id, photo.uri);
        }
    }
    if ctrl.has_more() {
        println!("More photos available (use --all)");
    }
}

#[cfg_attr(feature = "trace-spans", tracing::instrument)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let overrides = config::AppConfigOverrides {
        log_level: cli.log_level.clone(),
        library_path: cli.library.clone(),
        data_path: cli.data_dir.clone(),
        viewport_width: cli.width,
    };
    let cfg = config::AppConfig::load_from(cli.config.clone()).apply_overrides(&overrides);
    std::fs::create_dir_all(&cfg.data_path)?;
    let file_appender = rolling::daily(&cfg.data_path, "photosweep.log");
    let (file_writer, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(cfg.log_level.clone()))
        .with_writer(std::io::stderr.and(file_writer))
        .init();

    let store = SqliteStore::new(&cfg.preferences_db())?;
    let preferences = Arc::new(PreferencesStore::new(store));
    preferences.load().await;

    let library = FsLibrary::new(cfg.library_path.clone());
    let mut ctrl = GalleryController::new(library, preferences.clone());

    match cli.command {
        Commands::List { by_day, all } => {
            preferences.set_group_by_day(by_day);
            if all {
                load_all(&mut ctrl).await?;
            } else {
                ctrl.reload().await?;
            }
            print_groups(&ctrl, cfg.viewport_width);
        }
        Commands::Delete { ids } => {
            load_all(&mut ctrl).await?;
            for id in &ids {
                if ctrl.is_selected(id) {
                    continue;
                }
                if !ctrl.toggle_selection(id) {
                    println!("Not found: {}", id);
                }
            }
            if ctrl.selected_count() == 0 {
                println!("Nothing to delete");
                return Ok(());
            }
            let deleted = ctrl.delete_photos().await?;
            println!(
                "Deleted {} photos (total deleted: {})",
                deleted,
                preferences.get().deleted_count
            );
        }
        Commands::Stats => {
            println!("Deleted photos: {}", preferences.get().deleted_count);
        }
        Commands::ResetStats => {
            preferences.reset_deleted_count().await;
            println!("Deleted photo counter reset");
        }
        Commands::Settings => {
            let prefs = preferences.get();
            println!("Library: {}", cfg.library_path.display());
            println!("Group by day: {}", prefs.group_by_day);
            println!("Theme: {}", prefs.theme);
            println!("Thumbnail size: {}", prefs.thumbnail_size);
            println!("Grid columns: {}", ctrl.column_count(cfg.viewport_width));
            println!("Deleted photos: {}", prefs.deleted_count);
        }
        Commands::SetThumbnailSize { size } => {
            preferences.set_thumbnail_size(size).await;
            println!("Thumbnail size set to {}", size);
        }
        Commands::SetGroupByDay { value } => {
            preferences.set_group_by_day(value);
            println!("Group by day: {} (this session only)", value);
        }
        Commands::SetTheme { theme } => {
            preferences.set_theme(theme);
            println!("Theme: {} (this session only)", theme);
        }
    }

    Ok(())
}

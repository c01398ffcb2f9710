// Reframe Manager CLI binary

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use clap::{Parser, Subcommand};
use anyhow::{Context, Result};
use log::LevelFilter;

use reframe_manager::constants::{
    DEFAULT_REFRAME_NAME, SETTING_EDITOR_COMMAND, SETTING_EDITOR_DIR, SETTING_WORKING_DIR,
};
use reframe_manager::handoff::find_staged_files;
use reframe_manager::settings::{delete_setting, get_app_db_path, open_app_db, set_directory, set_setting};
use reframe_manager::{
    cascade, reframe, Catalog, EditHandoffCoordinator, ReframeError, Settings, SystemLauncher,
    VideoAsset, VideoQuality,
};

#[derive(Parser)]
#[command(name = "reframer")]
#[command(about = "Reframe Manager - manage reframe files for 360 videos", long_about = None)]
#[command(version)]
struct Cli {
    /// Working directory (overrides the stored setting)
    #[arg(short, long, global = true)]
    dir: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show or change stored settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// List all videos in the working directory
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one video and its reframes
    Show {
        /// Video base name
        video: String,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create an empty reframe with a given name
    Create {
        video: String,
        name: String,
    },

    /// Create an empty reframe with the first free automatic name
    Auto {
        video: String,
        /// Name prefix
        #[arg(long, default_value = DEFAULT_REFRAME_NAME)]
        prefix: String,
    },

    /// Copy a reframe under a new name
    Copy {
        video: String,
        reframe: String,
        new_name: String,
    },

    /// Rename a reframe
    Rename {
        video: String,
        reframe: String,
        new_name: String,
    },

    /// Delete a reframe
    Delete {
        video: String,
        reframe: String,
    },

    /// Rename a video and every file that belongs to it
    RenameVideo {
        video: String,
        new_name: String,
    },

    /// Edit a reframe in the Player app
    Edit {
        video: String,
        /// Reframe to edit (a new one is created when omitted)
        #[arg(short, long)]
        reframe: Option<String>,
        /// Open the low-definition video
        #[arg(long)]
        low: bool,
    },

    /// List files left in the Player app directory
    Staged,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the resolved settings
    Show,
    /// Select the working directory
    SetWorkdir { path: PathBuf },
    /// Select the Player app directory
    SetEditorDir { path: PathBuf },
    /// Program used to open videos (empty to use the system default)
    SetEditorCommand { command: String },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level_is_explicit = init_logging(cli.verbose);

    let db_path = get_app_db_path()?;
    let conn = open_app_db(&db_path)
        .with_context(|| format!("Failed to open settings at {}", db_path.display()))?;
    let mut settings = Settings::load(&conn)?;
    if let Some(dir) = cli.dir {
        settings.working_dir = Some(dir);
    }

    if !level_is_explicit {
        if let Some(level) = stored_level_filter(settings.log_level.as_deref()) {
            log::set_max_level(level);
        }
    }

    match cli.command {
        Commands::Config { action } => cmd_config(&conn, &settings, action),
        Commands::List { json } => cmd_list(&settings, json),
        Commands::Show { video, json } => cmd_show(&settings, &video, json),
        Commands::Create { video, name } => cmd_create(&settings, &video, &name),
        Commands::Auto { video, prefix } => cmd_auto(&settings, &video, &prefix),
        Commands::Copy { video, reframe, new_name } => cmd_copy(&settings, &video, &reframe, &new_name),
        Commands::Rename { video, reframe, new_name } => cmd_rename(&settings, &video, &reframe, &new_name),
        Commands::Delete { video, reframe } => cmd_delete(&settings, &video, &reframe),
        Commands::RenameVideo { video, new_name } => cmd_rename_video(&settings, &video, &new_name),
        Commands::Edit { video, reframe, low } => cmd_edit(&settings, &video, reframe.as_deref(), low),
        Commands::Staged => cmd_staged(&settings),
    }
}

/// Install the logger before anything else runs. Returns true when the level
/// came from `--verbose` or `RUST_LOG` and must not be overridden by settings.
fn init_logging(verbose: bool) -> bool {
    let explicit = verbose || std::env::var_os("RUST_LOG").is_some();
    let default_filter = if verbose { "debug" } else { "trace" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
    if !explicit {
        // Until settings are loaded
        log::set_max_level(LevelFilter::Info);
    }
    explicit
}

fn stored_level_filter(level: Option<&str>) -> Option<LevelFilter> {
    let level = level?.trim();
    match level.parse::<LevelFilter>() {
        Ok(filter) => Some(filter),
        Err(_) => {
            log::warn!("Ignoring unknown stored log level '{}'", level);
            None
        }
    }
}

fn cmd_config(conn: &rusqlite::Connection, settings: &Settings, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            println!("Working directory:  {}", display_opt_path(&settings.working_dir));
            println!("Player directory:   {}", display_opt_path(&settings.editor_dir));
            println!("Editor command:     {}", settings.editor_command.as_deref().unwrap_or("(system default)"));
            println!("Log level:          {}", settings.log_level.as_deref().unwrap_or("-"));
        }
        ConfigAction::SetWorkdir { path } => {
            let dir = set_directory(conn, SETTING_WORKING_DIR, &path)?;
            println!("Working directory set to {}", dir.display());
        }
        ConfigAction::SetEditorDir { path } => {
            let dir = set_directory(conn, SETTING_EDITOR_DIR, &path)?;
            println!("Player directory set to {}", dir.display());
        }
        ConfigAction::SetEditorCommand { command } => {
            let command = command.trim();
            if command.is_empty() {
                delete_setting(conn, SETTING_EDITOR_COMMAND)?;
                println!("Editor command cleared; using the system default");
            } else {
                set_setting(conn, SETTING_EDITOR_COMMAND, command)?;
                println!("Editor command set to '{}'", command);
            }
        }
    }
    Ok(())
}

fn cmd_list(settings: &Settings, json: bool) -> Result<()> {
    let catalog = open_catalog(settings)?;
    let videos = catalog.sorted_videos();

    if json {
        println!("{}", serde_json::to_string_pretty(&videos)?);
        return Ok(());
    }

    println!("{} ({} videos)", catalog.directory().display(), catalog.len());
    println!();

    if videos.is_empty() {
        println!("No videos found.");
        return Ok(());
    }

    println!("{:<30}  {:>4}  {:>4}  {:>8}  {}", "Video", "HD", "LRV", "Reframes", "Notes");
    println!("{}", "-".repeat(70));

    for video in videos {
        let mut notes = Vec::new();
        if !video.backups.is_empty() {
            notes.push(format!("{} backup(s)", video.backups.len()));
        }
        if !video.other.is_empty() {
            notes.push(format!("{} unrecognized file(s)", video.other.len()));
        }

        println!("{:<30}  {:>4}  {:>4}  {:>8}  {}",
            truncate(&video.base_name, 30),
            yes_no(video.high_def.is_some()),
            yes_no(video.low_def.is_some()),
            video.reframes.len(),
            notes.join(", ")
        );
    }

    Ok(())
}

fn cmd_show(settings: &Settings, base_name: &str, json: bool) -> Result<()> {
    let catalog = open_catalog(settings)?;
    let video = catalog.require_video(base_name)?;

    if json {
        println!("{}", serde_json::to_string_pretty(video)?);
        return Ok(());
    }

    print_video(video);
    Ok(())
}

fn cmd_create(settings: &Settings, base_name: &str, name: &str) -> Result<()> {
    let mut catalog = open_catalog(settings)?;
    let record = reframe::create(&mut catalog, base_name, name)?;
    println!("Created {}", record.path().display());
    Ok(())
}

fn cmd_auto(settings: &Settings, base_name: &str, prefix: &str) -> Result<()> {
    let mut catalog = open_catalog(settings)?;
    let record = reframe::create_automatic(&mut catalog, base_name, prefix)?;
    println!("Created {}", record.path().display());
    Ok(())
}

fn cmd_copy(settings: &Settings, base_name: &str, reframe_name: &str, new_name: &str) -> Result<()> {
    let mut catalog = open_catalog(settings)?;
    let record = reframe::copy(&mut catalog, base_name, reframe_name, new_name)?;
    println!("Copied '{}' to {}", reframe_name, record.path().display());
    Ok(())
}

fn cmd_rename(settings: &Settings, base_name: &str, reframe_name: &str, new_name: &str) -> Result<()> {
    let mut catalog = open_catalog(settings)?;
    let record = reframe::rename(&mut catalog, base_name, reframe_name, new_name)?;
    println!("Renamed '{}' to {}", reframe_name, record.path().display());
    Ok(())
}

fn cmd_delete(settings: &Settings, base_name: &str, reframe_name: &str) -> Result<()> {
    let mut catalog = open_catalog(settings)?;
    let record = reframe::delete(&mut catalog, base_name, reframe_name)?;
    println!("Deleted {}", record.path().display());
    Ok(())
}

fn cmd_rename_video(settings: &Settings, base_name: &str, new_name: &str) -> Result<()> {
    let mut catalog = open_catalog(settings)?;

    match cascade::rename_video(&mut catalog, base_name, new_name) {
        Ok(journal) => {
            println!("Renamed '{}' to '{}' ({} files)", base_name, new_name, journal.completed.len());
            Ok(())
        }
        Err(ReframeError::CascadeIncomplete(journal)) => {
            eprintln!("Rename of '{}' to '{}' did not complete.", base_name, new_name);
            for failure in &journal.failures {
                eprintln!("  FAILED   {} -> {}: {}",
                    failure.planned.from.display(), failure.planned.to.display(), failure.error);
            }
            for mv in &journal.rolled_back {
                eprintln!("  restored {}", mv.from.display());
            }
            for mv in &journal.completed {
                eprintln!("  moved    {}", mv.to.display());
            }
            for mv in &journal.pending {
                eprintln!("  skipped  {}", mv.from.display());
            }
            if let Some(ref error) = journal.catalog_error {
                eprintln!("All files moved, but the list could not be refreshed: {}", error);
            }
            if journal.is_split() {
                eprintln!("Files are now split between '{}' and '{}'.", base_name, new_name);
            }
            Err(ReframeError::CascadeIncomplete(journal).into())
        }
        Err(e) => Err(e.into()),
    }
}

fn cmd_edit(settings: &Settings, base_name: &str, reframe_name: Option<&str>, low: bool) -> Result<()> {
    let mut catalog = open_catalog(settings)?;
    let editor_dir = settings.editor_dir()?;
    let quality = if low { VideoQuality::Low } else { VideoQuality::High };

    let launcher = SystemLauncher::new(settings.editor_command.clone().filter(|c| !c.is_empty()));
    let mut coordinator = EditHandoffCoordinator::new(editor_dir, launcher);

    let session = match coordinator.begin(&catalog, base_name, quality, reframe_name) {
        Ok(session) => session,
        Err(e) => {
            // Launch failed and the staging could not be undone on the first try
            if coordinator.session(base_name).is_some() {
                if let Err(undo) = coordinator.abort(base_name) {
                    if let Some(left) = coordinator.session(base_name) {
                        eprintln!("Could not undo staging: {}", undo);
                        eprintln!("  staged file:   {}", left.slot_path.display());
                        eprintln!("  belongs at:    {}", left.working_path.display());
                        if let Some(ref backup) = left.backup_path {
                            eprintln!("  slot backup:   {}", backup.display());
                        }
                    }
                }
            }
            return Err(e.into());
        }
    };
    println!("Opened {} in the Player app.", session.video_path.display());
    println!("Reframe staged at {}", session.slot_path.display());
    println!();

    loop {
        print!("Press Enter once the Player app is closed, or type 'cancel': ");
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            // stdin closed; nothing will confirm
            let session = coordinator.cancel(base_name)?;
            println!();
            println!("Cancelled. The reframe is still at {}", session.slot_path.display());
            return Ok(());
        }

        match line.trim() {
            "" => break,
            "cancel" | "c" => {
                let session = coordinator.cancel(base_name)?;
                println!("Cancelled. The reframe is still at {}", session.slot_path.display());
                if let Some(ref backup) = session.backup_path {
                    println!("The previous slot occupant is at {}", backup.display());
                }
                return Ok(());
            }
            other => println!("Unrecognized answer '{}'", other),
        }
    }

    let record = coordinator.confirm(&mut catalog, base_name)?;
    println!("Saved {}", record.path().display());
    Ok(())
}

fn cmd_staged(settings: &Settings) -> Result<()> {
    let editor_dir = settings.editor_dir()?;
    let staged = find_staged_files(editor_dir)?;

    if staged.is_empty() {
        println!("No staged reframes in {}", editor_dir.display());
        return Ok(());
    }

    println!("{:<40}  {:>12}  {}", "File", "Video size", "Kind");
    println!("{}", "-".repeat(65));
    for file in staged {
        let name = file.path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
        println!("{:<40}  {:>12}  {}", name, format_size(file.size), if file.is_backup { "backup" } else { "slot" });
    }

    Ok(())
}

// --- Helper Functions ---

fn open_catalog(settings: &Settings) -> Result<Catalog> {
    let dir = settings.working_dir()?;
    Ok(Catalog::open(dir)?)
}

fn print_video(video: &VideoAsset) {
    println!("Video: {}", video.base_name);
    println!();

    for (label, file) in [("High def:", &video.high_def), ("Low def:", &video.low_def), ("Preview:", &video.preview)] {
        match file {
            Some(f) => println!("{:<12} {} ({})", label, f.name, format_size(f.size)),
            None => println!("{:<12} -", label),
        }
    }

    println!();
    if video.reframes.is_empty() {
        println!("No reframes.");
    } else {
        println!("Reframes:");
        for (i, reframe) in video.reframes.iter().enumerate() {
            println!("  {:>3}. {:<50}  {}",
                i + 1,
                reframe.reframe_name(),
                reframe.file.modified.format("%Y-%m-%d %H:%M")
            );
        }
    }

    if !video.backups.is_empty() {
        println!();
        println!("Backups:");
        for backup in &video.backups {
            println!("  {}", backup.name);
        }
    }

    if !video.other.is_empty() {
        println!();
        println!("Unrecognized files:");
        for other in &video.other {
            println!("  {}", other.name);
        }
    }
}

fn display_opt_path(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(not set)".to_string())
}

fn yes_no(present: bool) -> &'static str {
    if present { "yes" } else { "-" }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let head: String = s.chars().take(max - 3).collect();
        format!("{}...", head)
    } else {
        s.to_string()
    }
}

fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

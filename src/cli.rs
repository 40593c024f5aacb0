// VidShelf CLI binary

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use vidshelf_lib::db::library_exists;
use vidshelf_lib::constants::ENV_LOG;
use vidshelf_lib::{
    progress_channel, BackendKind, Config, ConfigOverrides, MediaFile, MediaPayload, UploadOutcome,
    UploadRequest, UploadStage, VidShelfError, VideoLibrary, VideoPatch, VideoRecord,
};

#[derive(Parser)]
#[command(name = "vidshelf")]
#[command(about = "VidShelf - A local video library", long_about = None)]
#[command(version)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// Library root (defaults to $VIDSHELF_LIBRARY, then ~/.vidshelf-library)
    #[arg(short, long, global = true)]
    library: Option<PathBuf>,
    /// Storage backend: local or remote
    #[arg(long, global = true)]
    backend: Option<String>,
    /// Object store root for the remote backend
    #[arg(long, global = true)]
    remote_root: Option<PathBuf>,
    /// Cadence of synthetic upload progress, in milliseconds
    #[arg(long, global = true)]
    progress_interval_ms: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new library and save its storage settings
    Init,

    /// Upload a video, with an optional thumbnail
    Upload {
        /// Video file
        path: PathBuf,
        /// Title (defaults to the file name without extension)
        #[arg(short, long)]
        title: Option<String>,
        #[arg(short, long, default_value = "")]
        description: String,
        /// Display order (defaults to 1)
        #[arg(short, long)]
        order: Option<i64>,
        /// Thumbnail image
        #[arg(long)]
        thumbnail: Option<PathBuf>,
    },

    /// List all videos by display order
    List {
        #[arg(long)]
        json: bool,
        /// Only videos with order >= this
        #[arg(long)]
        min_order: Option<i64>,
        /// Only videos with order <= this
        #[arg(long)]
        max_order: Option<i64>,
    },

    /// Show video details
    Show {
        /// Video ID
        id: i64,
        #[arg(long)]
        json: bool,
    },

    /// Edit title, description or order
    Edit {
        /// Video ID
        id: i64,
        #[arg(short, long)]
        title: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(short, long)]
        order: Option<i64>,
    },

    /// Delete a video and its stored media
    Delete {
        /// Video ID
        id: i64,
    },

    /// Write a video to a file, or print its URL if stored remotely
    Play {
        /// Video ID
        id: i64,
        /// Output file
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Write a thumbnail to a file, or print its URL if stored remotely
    Thumbnail {
        /// Video ID
        id: i64,
        /// Output file
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let overrides = ConfigOverrides {
        library: cli.global.library,
        backend: cli.global.backend,
        remote_root: cli.global.remote_root,
        progress_interval_ms: cli.global.progress_interval_ms,
    };
    let config = Config::resolve(&overrides)?;

    match cli.command {
        Commands::Init => cmd_init(&config),
        Commands::Upload { path, title, description, order, thumbnail } => {
            cmd_upload(&config, path, title, description, order, thumbnail)
        }
        Commands::List { json, min_order, max_order } => cmd_list(&config, json, min_order, max_order),
        Commands::Show { id, json } => cmd_show(&config, id, json),
        Commands::Edit { id, title, description, order } => {
            cmd_edit(&config, id, VideoPatch { title, description, order })
        }
        Commands::Delete { id } => cmd_delete(&config, id),
        Commands::Play { id, out } => cmd_play(&config, id, out),
        Commands::Thumbnail { id, out } => cmd_thumbnail(&config, id, out),
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(ENV_LOG).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_init(config: &Config) -> Result<()> {
    if library_exists(&config.library_root) {
        anyhow::bail!("Library already exists at {}", config.library_root.display());
    }

    let store = config.open_store()?;
    config.persist(&store)?;
    // Remote roots are created up front so a bad path fails here
    config.build_backend(&store)?;

    println!("Initialized library at {}", config.library_root.display());
    println!("  Database:  {}", store.db_path().display());
    match &config.backend {
        BackendKind::Local => println!("  Storage:   local (inside the database)"),
        BackendKind::Remote { root } => {
            println!("  Storage:   remote ({})", root.display())
        }
    }

    Ok(())
}

fn cmd_upload(
    config: &Config,
    path: PathBuf,
    title: Option<String>,
    description: String,
    order: Option<i64>,
    thumbnail: Option<PathBuf>,
) -> Result<()> {
    let library = open_library(config)?;

    let video = MediaFile::read_video(&path).map_err(|e| read_error(&path, e))?;
    let thumbnail = match thumbnail {
        Some(thumb_path) => {
            Some(MediaFile::read_thumbnail(&thumb_path).map_err(|e| read_error(&thumb_path, e))?)
        }
        None => None,
    };
    let title = title.unwrap_or_else(|| {
        path.file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| video.file_name.clone())
    });

    println!("Uploading {} ({})", video.file_name, format_size(video.size()));

    let (reporter, events) = progress_channel();
    let printer = std::thread::spawn(move || {
        for event in events {
            let label = match event.stage {
                UploadStage::Video => "video",
                UploadStage::Thumbnail => "thumbnail",
            };
            print!("\r  {:<10} {:>3}%", label, event.percent);
            if event.is_complete() {
                println!();
            }
            let _ = std::io::stdout().flush();
        }
    });

    let request = UploadRequest {
        title,
        description,
        order,
        video,
        thumbnail,
    };
    let outcome = library.upload(request, &reporter);
    drop(reporter);
    let _ = printer.join();

    match outcome? {
        UploadOutcome::Created(record) => {
            println!("Added video #{}: {}", record.id, record.title);
        }
        UploadOutcome::Duplicate { file_name } => {
            println!("Skipped: a video named {} is already in the library", file_name);
        }
    }

    Ok(())
}

fn cmd_list(config: &Config, json: bool, min_order: Option<i64>, max_order: Option<i64>) -> Result<()> {
    let library = open_library(config)?;
    let records = if min_order.is_some() || max_order.is_some() {
        library.list_order_range(min_order.unwrap_or(i64::MIN)..=max_order.unwrap_or(i64::MAX))?
    } else {
        library.list()?
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("No videos found. Use 'vidshelf upload <path>' to add one.");
        return Ok(());
    }

    println!("{:>5}  {:>5}  {:>5}  {:<24}  {}", "ID", "Order", "Thumb", "File", "Title");
    println!("{}", "-".repeat(70));
    for record in &records {
        println!(
            "{:>5}  {:>5}  {:>5}  {:<24}  {}",
            record.id,
            record.order,
            if record.has_thumbnail { "yes" } else { "-" },
            truncate(&record.file_name, 24),
            record.title
        );
    }
    println!();
    println!("{} video(s)", records.len());

    Ok(())
}

fn cmd_show(config: &Config, id: i64, json: bool) -> Result<()> {
    let library = open_library(config)?;
    let record = library
        .get(id)?
        .ok_or_else(|| anyhow::anyhow!("Video {} not found", id))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    print_record(&record);
    println!("Storage:     {}", library.facade().backend_name());
    Ok(())
}

fn cmd_edit(config: &Config, id: i64, patch: VideoPatch) -> Result<()> {
    if patch.is_empty() {
        anyhow::bail!("Nothing to change. Pass --title, --description or --order.");
    }

    let library = open_library(config)?;
    match library.edit(id, &patch)? {
        Some(record) => {
            println!("Updated video #{}", record.id);
            print_record(&record);
        }
        None => anyhow::bail!("Video {} not found", id),
    }
    Ok(())
}

fn cmd_delete(config: &Config, id: i64) -> Result<()> {
    let library = open_library(config)?;
    match library.delete(id)? {
        Some(record) => println!("Deleted video #{} ({})", record.id, record.file_name),
        None => println!("Nothing to delete: video {} is not in the library", id),
    }
    Ok(())
}

fn cmd_play(config: &Config, id: i64, out: Option<PathBuf>) -> Result<()> {
    let library = open_library(config)?;
    let payload = library.play(id)?;
    emit_payload(payload, out.as_deref())
}

fn cmd_thumbnail(config: &Config, id: i64, out: Option<PathBuf>) -> Result<()> {
    let library = open_library(config)?;
    match library.thumbnail(id)? {
        Some(payload) => emit_payload(payload, out.as_deref()),
        None => {
            println!("Video {} has no thumbnail", id);
            Ok(())
        }
    }
}

fn open_library(config: &Config) -> Result<VideoLibrary> {
    if !library_exists(&config.library_root) {
        anyhow::bail!(
            "No library found at {}. Use 'vidshelf init' to create one.",
            config.library_root.display()
        );
    }
    Ok(config.open_library()?)
}

/// I/O failures name the file; validation errors are shown as they are.
fn read_error(path: &Path, err: VidShelfError) -> anyhow::Error {
    match err {
        VidShelfError::Io(e) => anyhow::anyhow!("Cannot read {}: {}", path.display(), e),
        other => other.into(),
    }
}

fn emit_payload(payload: MediaPayload, out: Option<&Path>) -> Result<()> {
    match (payload, out) {
        (MediaPayload::External(url), _) => println!("{}", url),
        (MediaPayload::Inline { mime_type, bytes }, Some(out)) => {
            std::fs::write(out, &bytes)?;
            println!(
                "Wrote {} ({}) to {}",
                format_size(bytes.len() as u64),
                mime_type,
                out.display()
            );
        }
        (MediaPayload::Inline { mime_type, bytes }, None) => {
            anyhow::bail!(
                "Media is stored in the library ({}, {}). Pass --out <file> to write it.",
                mime_type,
                format_size(bytes.len() as u64)
            );
        }
    }
    Ok(())
}

fn print_record(record: &VideoRecord) {
    println!("Video #{}", record.id);
    println!();
    println!("Title:       {}", record.title);
    if !record.description.is_empty() {
        println!("Description: {}", record.description);
    }
    println!("File:        {}", record.file_name);
    println!("Order:       {}", record.order);
    println!("URL:         {}", record.url);
    if let Some(ref thumb) = record.thumbnail_url {
        println!("Thumbnail:   {}", thumb);
    }
    println!("Created:     {}", record.timestamp);
    if let Some(ref updated) = record.last_updated {
        println!("Updated:     {}", updated);
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
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

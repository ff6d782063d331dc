use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

use photo_timeline::{
    Config,
    aggregator::{ImageHandleAggregator, ImageSource},
    cache::{CacheGate, CacheKind, CachePaths, ThrottledFetcher},
    changes::{ChangeFlags, NodeChange, NodeChangeBus},
    controller::CameraUploadsController,
    media::{Handle, MediaItem},
    repository::{MemoryRepository, NodeRecord, NodeRepository, SortOrder},
    startup_checks,
    timeline::{Timeline, TimelineEntry, ZoomLevel},
    transfer::create_transfer,
    viewer::ViewerState,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Global options that apply to all commands
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: PathBuf,

    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the camera uploads timeline of a node listing
    Timeline {
        /// JSON node listing
        listing: PathBuf,

        /// year, month or day (defaults to the configured zoom)
        #[arg(short, long)]
        zoom: Option<ZoomLevel>,

        /// Only show items whose name contains this text
        #[arg(short, long)]
        query: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Print the day, month or year cards of a node listing
    Cards {
        listing: PathBuf,

        #[arg(short, long, default_value = "month")]
        zoom: ZoomLevel,

        #[arg(long)]
        json: bool,
    },

    /// Fill the cache with missing renditions through the throttled queue
    Fetch {
        listing: PathBuf,

        /// Fetch previews as well as thumbnails
        #[arg(long)]
        previews: bool,

        /// Give up after this many seconds without a completed fetch
        #[arg(long, default_value = "10")]
        idle_timeout: u64,
    },

    /// Count the files in the thumbnail and preview caches
    CacheStats,

    /// Follow a viewer list through a file of change batches
    Watch {
        listing: PathBuf,

        /// JSON array of change batches
        changes: PathBuf,

        /// Image the viewer starts on
        #[arg(long)]
        current: Option<Handle>,
    },
}

/// One change as written in a change batch file.
#[derive(Debug, Deserialize)]
struct ChangeRecord {
    node: NodeRecord,
    #[serde(default)]
    flags: ChangeFlags,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Set up logging first
    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Timeline {
            listing,
            zoom,
            query,
            json,
        } => print_timeline(config, &listing, zoom, query, json).await,
        Commands::Cards {
            listing,
            zoom,
            json,
        } => print_cards(config, &listing, zoom, json).await,
        Commands::Fetch {
            listing,
            previews,
            idle_timeout,
        } => fetch_missing(config, &listing, previews, idle_timeout).await,
        Commands::CacheStats => {
            let paths = CachePaths::from_config(&config.cache);
            println!(
                "Thumbnails: {} files in {}",
                paths.cached_count(CacheKind::Thumbnail),
                paths.directory(CacheKind::Thumbnail).display()
            );
            println!(
                "Previews:   {} files in {}",
                paths.cached_count(CacheKind::Preview),
                paths.directory(CacheKind::Preview).display()
            );
            Ok(())
        }
        Commands::Watch {
            listing,
            changes,
            current,
        } => watch_changes(config, &listing, &changes, current).await,
    }
}

fn load_config(config_path: &Path) -> Result<Config, Box<dyn std::error::Error>> {
    let config = if config_path.exists() {
        let config_content = std::fs::read_to_string(config_path)?;
        let config = toml_edit::de::from_str::<Config>(&config_content)?;
        info!("Configuration loaded from: {:?}", config_path);
        config
    } else {
        info!("Config file not found at {:?}, using defaults", config_path);
        Config::default()
    };
    Ok(config)
}

/// Load a listing and work out which folder holds the camera uploads.
async fn open_listing(
    config: &Config,
    listing: &Path,
) -> Result<(Arc<MemoryRepository>, Handle), Box<dyn std::error::Error>> {
    let repository = MemoryRepository::load_from_file(listing).await?;
    let container = config
        .timeline
        .camera_uploads
        .or(repository.camera_uploads())
        .ok_or("No camera uploads folder in the config or the listing")?;
    Ok((Arc::new(repository), container))
}

async fn create_controller(
    config: &Config,
    listing: &Path,
) -> Result<CameraUploadsController, Box<dyn std::error::Error>> {
    if let Err(errors) = startup_checks::perform_startup_checks(config).await {
        for error in &errors {
            warn!("Startup check failed: {}", error);
        }
    }

    let (repository, container) = open_listing(config, listing).await?;
    let transfer = create_transfer(&config.transfer);
    info!("Using transfer provider: {}", transfer.name());

    let gate = CacheGate::new(
        CachePaths::from_config(&config.cache),
        transfer,
        config.cache.release_on_failure,
    );
    Ok(CameraUploadsController::new(
        repository,
        gate,
        container,
        &config.timeline,
        config.cache.throttle(),
    ))
}

async fn print_timeline(
    config: Config,
    listing: &Path,
    zoom: Option<ZoomLevel>,
    query: Option<String>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let controller = create_controller(&config, listing).await?;
    if let Some(zoom) = zoom {
        controller.set_zoom(zoom).await?;
    }
    let timeline = controller.set_query(query).await?;
    controller.shutdown();

    if json {
        println!("{}", serde_json::to_string_pretty(timeline.as_ref())?);
        return Ok(());
    }

    print_entries(&timeline);
    println!(
        "{} items ({} photos), {} thumbnails and {} previews missing",
        timeline.real_count(),
        timeline.photo_count(),
        timeline.missing_thumbnails.len(),
        timeline.missing_previews.len()
    );
    Ok(())
}

fn print_entries(timeline: &Timeline) {
    for entry in &timeline.entries {
        match entry {
            TimelineEntry::Separator(bucket) => println!("== {} ==", bucket.label),
            TimelineEntry::Media(node) => println!(
                "  [{:>4}] {:<32} {} {}",
                node.index,
                node.item.name,
                node.item.base64_handle(),
                if node.image_path.is_some() {
                    "cached"
                } else {
                    "missing"
                }
            ),
        }
    }
}

async fn print_cards(
    config: Config,
    listing: &Path,
    zoom: ZoomLevel,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let controller = create_controller(&config, listing).await?;
    let cards = controller.refresh_cards().await?;
    controller.shutdown();

    if json {
        println!("{}", serde_json::to_string_pretty(cards.cards(zoom))?);
        return Ok(());
    }

    for card in cards.cards(zoom) {
        println!(
            "{:<24} {:>5} items  cover {} ({})",
            card.label.to_string(),
            card.item_count,
            card.item.name,
            if card.preview.is_some() {
                "cached"
            } else {
                "missing"
            }
        );
    }
    Ok(())
}

async fn fetch_missing(
    config: Config,
    listing: &Path,
    previews: bool,
    idle_timeout: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Err(errors) = startup_checks::perform_startup_checks(&config).await {
        for error in &errors {
            warn!("Startup check failed: {}", error);
        }
    }

    let (repository, container) = open_listing(&config, listing).await?;
    let mut items = repository
        .list_children(container, SortOrder::ModificationDesc)
        .await?;
    items.retain(MediaItem::is_valid_for_viewer);

    let paths = CachePaths::from_config(&config.cache);
    let mut kinds = vec![CacheKind::Thumbnail];
    if previews {
        kinds.push(CacheKind::Preview);
    }

    let mut wanted = 0;
    for kind in &kinds {
        wanted += items
            .iter()
            .filter(|item| paths.existing(*kind, item.handle).is_none())
            .count();
    }
    if wanted == 0 {
        println!("Cache is complete, nothing to fetch");
        return Ok(());
    }

    let gate = CacheGate::new(
        paths,
        create_transfer(&config.transfer),
        config.cache.release_on_failure,
    );
    let mut events = gate.subscribe();
    let fetcher = ThrottledFetcher::spawn(gate, config.cache.throttle());
    for kind in kinds {
        fetcher.submit_batch(items.iter().cloned(), kind);
    }

    let idle = Duration::from_secs(idle_timeout);
    let mut fetched = 0;
    while fetched < wanted {
        match tokio::time::timeout(idle, events.recv()).await {
            Ok(Ok(event)) => {
                fetched += 1;
                info!("Cached {} for {}", event.kind, event.handle);
            }
            Ok(Err(e)) => {
                warn!("Cache events interrupted: {}", e);
                break;
            }
            Err(_) => {
                warn!("No fetch completed in {} seconds, giving up", idle_timeout);
                break;
            }
        }
    }
    fetcher.shutdown();

    println!("Fetched {} of {} missing renditions", fetched, wanted);
    Ok(())
}

async fn watch_changes(
    config: Config,
    listing: &Path,
    changes: &Path,
    current: Option<Handle>,
) -> Result<(), Box<dyn std::error::Error>> {
    let (repository, container) = open_listing(&config, listing).await?;
    let content = tokio::fs::read_to_string(changes).await?;
    let batches: Vec<Vec<ChangeRecord>> = serde_json::from_str(&content)?;

    let bus = NodeChangeBus::default();
    let aggregator = ImageHandleAggregator::new(repository.clone(), bus.clone());
    let source = ImageSource::parent(container).with_sort_order(SortOrder::ModificationDesc);
    let mut feed = aggregator.resolve(&source, current).await?;

    let mut viewer = ViewerState::from_feed(&feed, current);
    if let Some(initial) = feed.next().await {
        viewer.apply_snapshot(initial);
    }
    print_viewer("initial", &viewer);

    for (number, batch) in batches.into_iter().enumerate() {
        let mut changes = Vec::with_capacity(batch.len());
        for record in batch {
            let node = MediaItem::from(record.node);
            if record.flags.removed {
                repository.remove(node.handle).await;
            } else {
                repository.insert(node.clone()).await;
            }
            changes.push(NodeChange::new(node, record.flags));
        }

        if bus.publish(changes) == 0 {
            continue;
        }
        match feed.next().await {
            Some(snapshot) => viewer.apply_snapshot(snapshot),
            None => break,
        }
        print_viewer(&format!("batch {}", number + 1), &viewer);
    }

    feed.cancel();
    Ok(())
}

fn print_viewer(label: &str, viewer: &ViewerState) {
    let names: Vec<String> = viewer
        .images()
        .iter()
        .map(|item| {
            let marker = if Some(item.handle) == viewer.current_handle() {
                "*"
            } else {
                ""
            };
            let dirty = if item.is_dirty { " (dirty)" } else { "" };
            format!("{}{}{}", marker, item.name, dirty)
        })
        .collect();
    println!("{:>10}: {} images [{}]", label, viewer.len(), names.join(", "));
}

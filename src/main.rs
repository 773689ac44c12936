use std::path::PathBuf;

use clap::{Parser, Subcommand};
use log::{info, warn};

use kiwix_library::archives::{apply_scan, scan_archives};
use kiwix_library::catalog::load_feed;
use kiwix_library::config::AppConfig;
use kiwix_library::presentation::{header_title, status_message, AccessoryAction, BookRow, DetailExpansion};
use kiwix_library::space::{available_space, FreeSpaceMargin, SpacePolicy};
use kiwix_library::state::sync::{drain_mutations, Mutation};
use kiwix_library::{CatalogSynchronizer, DisplayEdit, Library, LibraryError, OnlineFilter};

#[derive(Parser)]
#[command(name = "kiwix-library")]
#[command(about = "Browse and maintain the offline content library catalog")]
#[command(version)]
struct Cli {
    /// Catalog database file (defaults to the data directory)
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// Print display edits as JSON
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the books available for download, grouped by language
    List {
        /// Book ids to show with their long description
        #[arg(long)]
        expand: Vec<String>,
    },
    /// Replace the catalog with the books of a feed file
    Refresh {
        #[arg(long)]
        feed: Option<PathBuf>,
    },
    /// Detect downloaded archives and update local flags
    Scan {
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Show or change which languages are listed
    Languages {
        #[arg(long)]
        show: Vec<String>,
        #[arg(long)]
        hide: Vec<String>,
    },
    /// Resolve a fast-scroll label to a section
    Locate { title: String },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = AppConfig::load();

    if let Err(e) = run(cli, config).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: AppConfig) -> Result<(), LibraryError> {
    let mut library = match &cli.db {
        Some(path) => Library::open(path)?,
        None => Library::open_default(&config)?,
    };
    info!("{} books in catalog", library.book_count()?);

    let mut sync = CatalogSynchronizer::new(OnlineFilter::new(library.displayed_languages()?));
    sync.refresh(library.query_sorted()?);
    let mut receiver = library.subscribe();

    match cli.command {
        Commands::List { expand } => {
            let mut expansion = DetailExpansion::new();
            for id in &expand {
                expansion.toggle(id);
            }
            print_view(&sync, &expansion, &config);
        }
        Commands::Refresh { feed } => {
            let Some(feed) = feed.or_else(|| config.library.feed_path.clone()) else {
                println!("No feed given. Pass --feed or set library.feed_path in the config.");
                return Ok(());
            };
            println!("{}", status_message(true, sync.view().len()));

            let books = load_feed(feed).await?;
            let summary = library.apply_feed(books)?;
            println!(
                "✅ Refresh complete! {} new, {} updated, {} removed.",
                summary.inserted, summary.updated, summary.removed
            );

            let mutations = drain_mutations(&mut receiver);
            reconcile_or_rebuild(&mut sync, &library, &mutations, cli.json)?;
            println!("{}", status_message(false, sync.view().len()));
        }
        Commands::Scan { dir } => {
            let dir = match dir {
                Some(dir) => dir,
                None => config.archive_dir()?,
            };
            let scan = scan_archives(dir).await?;
            let summary = apply_scan(&library, &scan)?;
            println!(
                "📦 {} archives found: {} newly local, {} missing, {} not in catalog.",
                scan.archive_ids.len(),
                summary.marked_local,
                summary.marked_remote,
                summary.unknown
            );

            let mutations = drain_mutations(&mut receiver);
            reconcile_or_rebuild(&mut sync, &library, &mutations, cli.json)?;
            println!("{}", status_message(false, sync.view().len()));
        }
        Commands::Languages { show, hide } => {
            for name in &show {
                library.set_language_displayed(name, true)?;
            }
            for name in &hide {
                library.set_language_displayed(name, false)?;
            }
            for language in library.languages()? {
                let marker = if language.is_displayed { "*" } else { " " };
                println!("{} {} ({})", marker, language.name, language.book_count);
            }

            // A preference change always means a full rebuild
            sync.rebuild(
                OnlineFilter::new(library.displayed_languages()?),
                library.query_sorted()?,
            );
            println!("{}", status_message(false, sync.view().len()));
        }
        Commands::Locate { title } => match sync.locate(&title) {
            Some(section) => {
                let name = sync.view().sections()[section].name();
                println!("{} -> section {} ({})", title, section, name);
            }
            None => println!("The list is empty."),
        },
    }

    for warning in sync.take_warnings() {
        warn!("{}", warning);
    }
    Ok(())
}

/// Apply store mutations to the view, falling back to a full rebuild when the
/// batch is rejected
fn reconcile_or_rebuild(
    sync: &mut CatalogSynchronizer,
    library: &Library,
    mutations: &[Mutation],
    json: bool,
) -> Result<(), LibraryError> {
    match sync.reconcile(mutations) {
        Ok(edits) => print_edits(&edits, json)?,
        Err(e) => {
            warn!("{}, rebuilding the list", e);
            sync.refresh(library.query_sorted()?);
        }
    }
    Ok(())
}

fn print_edits(edits: &[DisplayEdit], json: bool) -> Result<(), LibraryError> {
    if json {
        println!("{}", serde_json::to_string_pretty(edits)?);
        return Ok(());
    }
    for edit in edits {
        println!("  {}", edit);
    }
    Ok(())
}

fn print_view(sync: &CatalogSynchronizer, expansion: &DetailExpansion, config: &AppConfig) {
    let view = sync.view();
    let policy = FreeSpaceMargin { caution_ratio: config.library.caution_ratio };
    let available = config
        .archive_dir()
        .ok()
        .and_then(|dir| available_space(&dir))
        .unwrap_or_else(|| {
            warn!("Could not determine free space, assuming enough");
            u64::MAX
        });

    for (index, section) in view.sections().iter().enumerate() {
        if let Some(header) = header_title(view, index) {
            println!("\n{}", header);
        }
        for book in section.books() {
            let row = BookRow::new(book, expansion, policy.space_state(book, available));
            let accessory = match AccessoryAction::from(row.space_state) {
                AccessoryAction::Download => "⬇",
                AccessoryAction::ConfirmLowSpace => "⚠",
                AccessoryAction::InsufficientSpace => "✗",
            };
            let pictures = if row.has_pictures { "🖼" } else { " " };
            println!("  {} {} {}", accessory, pictures, row.title);
            for line in row.subtitle.lines() {
                println!("      {}", line);
            }
        }
    }

    let titles = sync.section_index_titles();
    if !titles.is_empty() {
        println!("\nIndex: {}", titles.join(" "));
    }
    println!("\n{}", status_message(false, view.len()));
}

//! src/main.rs
//! `filedeck`: ingest local files and folders into a deck, then list,
//! search, project or export them.

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use clipr::ClipBoard;
use parking_lot::Mutex;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use filedeck_core::{
    FileDeck, Logger,
    config::Config,
    export,
    host::local,
    model::{FileStore, SortOrder},
    notify::TracingNotifier,
    prefs::{Preferences, TomlPreferences},
    search::{MatchField, Segment, SearchMatch, highlight},
};

/// Load files into an in-memory deck and inspect them
#[derive(Parser)]
#[command(name = "filedeck")]
#[command(about = "Ingest files and folders, then list, search, tree or export them")]
struct Cli {
    /// Files or folders to add
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level directive (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Log to stderr only
    #[arg(long)]
    no_log_file: bool,

    /// Include dot files when expanding folders
    #[arg(long)]
    hidden: bool,

    /// Reorder the deck before printing
    #[arg(long, value_enum)]
    sort: Option<SortArg>,

    /// Print every match of this term
    #[arg(long)]
    search: Option<String>,

    /// Print the folder tree
    #[arg(long)]
    tree: bool,

    /// Print a shell script that recreates the files
    #[arg(long)]
    script: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SortArg {
    Name,
    NameDesc,
    Size,
    SizeDesc,
    Type,
}

impl From<SortArg> for SortOrder {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Name => Self::NameAsc,
            SortArg::NameDesc => Self::NameDesc,
            SortArg::Size => Self::SizeAsc,
            SortArg::SizeDesc => Self::SizeDesc,
            SortArg::Type => Self::MediaType,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (mut config, config_err) = match &cli.config {
        Some(path) => (
            Config::load_from(path)
                .await
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None,
        ),
        None => match Config::load().await {
            Ok(config) => (config, None),
            Err(e) => (Config::default(), Some(e)),
        },
    };
    if let Some(level) = &cli.log_level {
        config.log.level.clone_from(level);
    }
    if cli.no_log_file {
        config.log.log_dir = None;
    }

    let _guard = Logger::init_tracing(&config.log).context("Failed to initialize logging")?;
    if let Some(e) = config_err {
        warn!("Failed to load config, using defaults: {e:#}");
    }

    let prefs = match TomlPreferences::open_default() {
        Ok(store) => Preferences::new(Arc::new(store), config.notifications.error_log_capacity),
        Err(e) => {
            warn!("Preferences unavailable, keeping them in memory: {e}");
            Preferences::in_memory()
        }
    };
    let clipboard = Arc::new(Mutex::new(ClipBoard::new(config.clipboard.clone())));
    let mut deck = FileDeck::new(config, Arc::new(TracingNotifier), clipboard, prefs);

    let mut entries = Vec::with_capacity(cli.paths.len());
    for path in &cli.paths {
        match local::entry_for(path, cli.hidden).await {
            Ok(entry) => entries.push(entry),
            Err(e) => eprintln!("skipping {}: {e}", path.display()),
        }
    }

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if signal::ctrl_c().await.is_ok() {
                info!("Received Ctrl+C, cancelling batch");
                cancel.cancel();
            }
        }
    });

    let summary = deck
        .ingest_with_cancel(entries, &cancel)
        .await
        .context("Ingestion failed")?;

    println!("{}", summary.message());
    for report in summary.problems() {
        if let Some(reason) = report.reason() {
            println!("  ! {}: {reason}", report.path);
        }
    }
    for err in &summary.discovery_errors {
        println!("  ! {err}");
    }

    if let Some(order) = cli.sort {
        deck.sort(order.into());
    }

    deck.with_store(print_listing);

    if let Some(term) = &cli.search {
        print_search(&mut deck, term);
    }

    if cli.tree {
        let projection = deck.tree();
        println!();
        print!("{}", projection.render_text());
        for conflict in &projection.conflicts {
            println!("  ! {} left out: clashes at '{}'", conflict.path, conflict.at);
        }
    }

    if cli.script {
        println!();
        let script = deck.with_store(|store| export::shell_script(store.records()));
        print!("{}", script.text);
        for conflict in &script.conflicts {
            eprintln!("  ! {} left out of the script: clashes at '{}'", conflict.path, conflict.at);
        }
    }

    Ok(())
}

fn print_listing(store: &FileStore) {
    let stats = store.stats();
    println!();
    println!(
        "{} files, {}",
        stats.count,
        bytesize::ByteSize::b(stats.total_bytes)
    );
    for (index, record) in store.records().iter().enumerate() {
        println!(
            "{index:>4}  {:<6} {:>10}  {}",
            record.media_type.as_str(),
            record.size_human(),
            record.relative_path
        );
    }
}

fn print_search(deck: &mut FileDeck, term: &str) {
    deck.set_search_term(term);
    let matches: Vec<SearchMatch> = deck.search().matches().to_vec();

    println!();
    println!("search '{term}': {} matches", matches.len());

    deck.with_store(|store| {
        for m in &matches {
            let Some(record) = store.get(m.record_id) else {
                continue;
            };
            let (field, line) = match m.field {
                MatchField::Name => ("name", record.name.as_str()),
                MatchField::Content => {
                    let text = record.text().unwrap_or_default();
                    ("content", line_at(text, m.offset))
                }
            };
            println!("  {} [{field}] {}", record.relative_path, marked(line, term));
        }
    });
}

/// The line of `text` containing byte `offset`.
fn line_at(text: &str, offset: usize) -> &str {
    let offset = offset.min(text.len());
    let start = text[..offset].rfind('\n').map_or(0, |i| i + 1);
    let end = text[offset..].find('\n').map_or(text.len(), |i| offset + i);
    text[start..end].trim_end_matches('\r')
}

fn marked(line: &str, term: &str) -> String {
    highlight(line, term)
        .into_iter()
        .map(|segment| match segment {
            Segment::Plain(s) => s.to_string(),
            Segment::Highlight(s) => format!("[{s}]"),
        })
        .collect()
}

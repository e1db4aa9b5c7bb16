mod keys;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use shelfscan_core::error::ExitCode;
use shelfscan_core::{AppConfig, BookRecord, CatalogStore, SqliteCatalog, discover};
use shelfscan_ingest::{
    BatchPipeline, Cataloguer, CommandFrameSource, ExtractorSet, LiveCapture, MetadataResolver,
    NoMetadata, OpenLibrarySource, ZbarDecoder, normalize, refresh_bare_records,
};

use crate::keys::KeyCancel;

const DEFAULT_LOG_FILTER: &str = "warn,shelfscan=info";

// ─── CLI Definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "shelfscan",
    about = "Catalogue books by ISBN from PDF/EPUB files or a barcode camera",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output in JSON format. Also enabled by setting SHELFSCAN_JSON=1.
    #[arg(long, global = true)]
    json: bool,

    /// Append log lines to this file instead of stderr.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Find ISBNs in book files and catalogue them.
    Scan {
        /// Files or directories (defaults to scan.books_directory).
        paths: Vec<PathBuf>,
        #[arg(long)]
        no_recursive: bool,
    },

    /// Read barcodes from the camera.
    Capture {
        /// Keep capturing until q or Esc is pressed.
        #[arg(long)]
        continuous: bool,
    },

    /// List all catalogued books.
    List,

    /// Show one catalogued book.
    Show { isbn: String },

    /// Retry metadata lookup for books stored without it.
    Refresh,

    /// Config management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration.
    Show,
    /// Print the config file location.
    Path,
    /// Write the default configuration to the config file.
    Init {
        #[arg(long)]
        force: bool,
    },
}

// ─── Main ────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let start = Instant::now();
    let cli = Cli::parse();
    init_logging(cli.log_file.as_ref())?;

    let json_output = cli.json || std::env::var("SHELFSCAN_JSON").as_deref() == Ok("1");
    let config = AppConfig::load()?;

    match cli.command {
        Commands::Scan { paths, no_recursive } => {
            let roots = if paths.is_empty() {
                vec![PathBuf::from(&config.scan.books_directory)]
            } else {
                paths
            };
            let recursive = config.scan.recursive && !no_recursive;
            let files = discover::collect_files(&roots, recursive)?;

            let pipeline = BatchPipeline::new(
                ExtractorSet::from_config(&config.extraction),
                cataloguer(&config)?,
            );
            let outcome = pipeline.run(&files).await;
            let dur = start.elapsed().as_millis();

            if json_output {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": outcome,
                    "meta": { "duration_ms": dur }
                }))?;
            } else {
                for isbn in &outcome.isbns {
                    println!("{isbn}");
                }
                println!("{}", outcome.summary);
            }
        }

        Commands::Capture { continuous } => {
            let capture = LiveCapture::new(
                Box::new(CommandFrameSource::from_config(&config.capture)?),
                Box::new(ZbarDecoder::new(&config.capture.zbar_command)),
                cataloguer(&config)?,
                &config.capture.source_label,
            )
            .with_interval(Duration::from_millis(config.capture.interval_ms));

            if continuous {
                if !json_output {
                    eprintln!("Capturing. Press q or Esc to stop.");
                }
                let last = {
                    let cancel = KeyCancel::new().context("failed to enable raw terminal mode")?;
                    capture.continuous(&cancel).await
                };
                let dur = start.elapsed().as_millis();
                if json_output {
                    print_json(&serde_json::json!({
                        "status": "ok",
                        "data": { "last_isbn": last },
                        "meta": { "duration_ms": dur }
                    }))?;
                } else {
                    match last {
                        Some(isbn) => println!("Last captured: {isbn}"),
                        None => println!("No ISBN captured."),
                    }
                }
            } else {
                let cycle = capture.single_shot().await?;
                let dur = start.elapsed().as_millis();
                if json_output {
                    print_json(&serde_json::json!({
                        "status": "ok",
                        "data": cycle,
                        "meta": { "duration_ms": dur }
                    }))?;
                } else {
                    match (cycle.confirmed_isbn(), cycle.outcome) {
                        (Some(isbn), Some(outcome)) if outcome.is_new() => {
                            println!("Catalogued: {isbn}")
                        }
                        (Some(isbn), _) => println!("Already catalogued: {isbn}"),
                        (None, _) => match cycle.last_isbn {
                            Some(isbn) => println!("Detected {isbn} but could not store it."),
                            None => println!("No ISBN barcode in frame."),
                        },
                    }
                }
            }
        }

        Commands::List => {
            let store = open_store(&config)?;
            let books = store.list_all()?;
            let dur = start.elapsed().as_millis();

            if json_output {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": { "items": books, "total": books.len() },
                    "meta": { "duration_ms": dur }
                }))?;
            } else if books.is_empty() {
                println!("Catalog is empty. Use `shelfscan scan` or `shelfscan capture` to add books.");
            } else {
                for book in &books {
                    println!("{}  {}", book.isbn13, book.display_title());
                }
            }
        }

        Commands::Show { isbn } => {
            let isbn13 = match normalize(&isbn) {
                Ok(isbn13) => isbn13,
                Err(err) => {
                    if json_output {
                        print_json(&serde_json::json!({"status":"error","error":"invalid_isbn","message":err.to_string()}))?;
                    } else {
                        eprintln!("{err}");
                    }
                    std::process::exit(ExitCode::InvalidArgs as i32);
                }
            };
            let store = open_store(&config)?;
            let dur = start.elapsed().as_millis();
            match store.fetch(&isbn13)? {
                Some(book) => {
                    if json_output {
                        print_json(&serde_json::json!({"status":"ok","data":book,"meta":{"duration_ms":dur}}))?;
                    } else {
                        print_record(&book);
                    }
                }
                None => {
                    if json_output {
                        print_json(&serde_json::json!({"status":"error","error":"not_found","message":format!("Book {isbn13} not found"),"meta":{"duration_ms":dur}}))?;
                    } else {
                        eprintln!("Book not found: {isbn13}");
                    }
                    std::process::exit(ExitCode::NotFound as i32);
                }
            }
        }

        Commands::Refresh => {
            let store = open_store(&config)?;
            let resolver = resolver(&config)?;
            let summary = refresh_bare_records(resolver.as_ref(), &store).await?;
            let dur = start.elapsed().as_millis();

            if json_output {
                print_json(&serde_json::json!({"status":"ok","data":summary,"meta":{"duration_ms":dur}}))?;
            } else {
                println!("Checked:    {}", summary.checked);
                println!("Enriched:   {}", summary.enriched);
                println!("Unresolved: {}", summary.unresolved);
                println!("Failed:     {}", summary.failed);
            }
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => {
                if json_output {
                    print_json(&serde_json::json!({"status":"ok","data":config}))?;
                } else {
                    print!("{}", config.to_toml()?);
                }
            }
            ConfigAction::Path => {
                let path = AppConfig::config_path();
                if json_output {
                    print_json(&serde_json::json!({"status":"ok","data":{"path":path,"exists":path.exists()}}))?;
                } else {
                    println!("{}", path.display());
                }
            }
            ConfigAction::Init { force } => {
                let path = AppConfig::config_path();
                if path.exists() && !force {
                    eprintln!("Config already exists at {}. Add --force to overwrite.", path.display());
                    std::process::exit(ExitCode::GeneralError as i32);
                }
                AppConfig::default().save()?;
                if json_output {
                    print_json(&serde_json::json!({"status":"ok","data":{"path":path}}))?;
                } else {
                    println!("Wrote {}", path.display());
                }
            }
        },
    }

    Ok(())
}

// ─── Helpers ────────────────────────────────────────────────────────────────

fn init_logging(log_file: Option<&PathBuf>) -> Result<()> {
    let filter = EnvFilter::try_from_env("SHELFSCAN_LOG")
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match log_file {
        Some(path) => {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None => builder.with_writer(std::io::stderr).init(),
    }
    Ok(())
}

fn print_json(val: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(val)?);
    Ok(())
}

fn print_record(book: &BookRecord) {
    println!("ISBN:       {}", book.isbn13);
    println!("Source:     {}", book.source_path);
    match book.metadata() {
        Some(meta) => {
            println!("Title:      {}", meta.title);
            println!("Publishers: {}", meta.publishers_display());
            println!("Published:  {}", meta.publish_date);
        }
        None => println!("(no metadata; try `shelfscan refresh`)"),
    }
}

fn open_store(config: &AppConfig) -> Result<SqliteCatalog> {
    let db_path = config.database_path();
    SqliteCatalog::open(&db_path)
        .with_context(|| format!("failed to open catalog {}", db_path.display()))
}

fn resolver(config: &AppConfig) -> Result<Arc<dyn MetadataResolver>> {
    if !config.metadata.enabled {
        return Ok(Arc::new(NoMetadata));
    }
    Ok(Arc::new(OpenLibrarySource::from_config(&config.metadata)?))
}

fn cataloguer(config: &AppConfig) -> Result<Cataloguer> {
    Ok(Cataloguer::new(resolver(config)?, Arc::new(open_store(config)?)))
}

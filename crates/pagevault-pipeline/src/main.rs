//! `pagevault-encrypt`: encrypt a PDF or a directory of page images.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use pagevault_core::MasterKey;
use pagevault_pipeline::{
    dry_run, EncryptionPipeline, PipelineOptions, PipelineOutcome, PopplerRasterizer,
    DEFAULT_IMAGE_EXT, DEFAULT_RESOLUTION,
};
use pagevault_store::{FsPageStore, SqliteStore};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Encrypt a document into per-page files and record its wrapped key.
#[derive(Parser, Debug)]
#[command(name = "pagevault-encrypt", version, about)]
struct Args {
    /// Document title
    #[arg(long)]
    title: String,

    /// PDF file or directory of page images
    #[arg(long)]
    input: PathBuf,

    /// Print the page count and exit without writing anything
    #[arg(long)]
    dry_run: bool,

    /// Metadata database path
    #[arg(long, env = "PAGEVAULT_DATABASE", default_value = "pagevault.db")]
    database: PathBuf,

    /// Directory for encrypted pages
    #[arg(long, env = "PAGEVAULT_PAGES_DIR", default_value = "secure_docs")]
    pages_dir: PathBuf,

    /// Image extension when the input is a directory
    #[arg(long, default_value = DEFAULT_IMAGE_EXT)]
    ext: String,

    /// Rasterization resolution (DPI) for PDF input
    #[arg(long, default_value_t = DEFAULT_RESOLUTION)]
    resolution: u32,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let options = PipelineOptions::new(&args.title, &args.input)
        .dry_run(args.dry_run)
        .image_ext(&args.ext)
        .resolution(args.resolution);

    if options.dry_run {
        match dry_run(&options, &PopplerRasterizer::default()).await? {
            Some(count) => println!("[dry-run] pages: {count}"),
            None => println!("[dry-run] page count unavailable (pdfinfo not installed)"),
        }
        return Ok(());
    }

    let master = MasterKey::from_env().context("loading master key")?;
    let store = SqliteStore::open(&args.database)
        .with_context(|| format!("opening database {}", args.database.display()))?;
    let pages = FsPageStore::new(&args.pages_dir);

    let pipeline = EncryptionPipeline::new(Arc::new(store), Arc::new(pages), Arc::new(master));
    match pipeline.run(&options).await? {
        PipelineOutcome::Encrypted(doc) => {
            println!(
                "encrypted \"{}\": document id {}, {} pages",
                doc.title, doc.document_id, doc.page_count
            );
        }
        PipelineOutcome::DryRun { .. } => {}
    }
    Ok(())
}

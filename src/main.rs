//! Command-line front end: run one capture through the pipeline.

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use evrak::config::{self, PipelineSettings};
use evrak::pipeline::matching::{HttpPatientSearch, IdentityResolver, NoRemoteSearch, RemotePatientSearch};
use evrak::pipeline::{DocumentClassifier, DocumentPipeline};
use evrak::pipeline::extraction::TextExtractionAdapter;
use evrak::{PatientDirectory, RawUpload};

#[derive(Parser)]
#[command(name = "evrak", version, about = "SGK document capture pipeline")]
struct Cli {
    /// Image file to process (JPEG, PNG or TIFF capture).
    image: PathBuf,

    /// Patient directory snapshot as a JSON array of patient records.
    #[arg(long)]
    directory: Option<PathBuf>,

    /// Archive database path. Defaults to ~/Evrak/archive.db.
    #[arg(long)]
    db: Option<PathBuf>,

    /// Base URL of the clinic API for remote patient search.
    #[arg(long)]
    remote_url: Option<String>,

    /// Target PDF size budget in kilobytes.
    #[arg(long, default_value_t = 300)]
    target_kb: usize,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("evrak v{}", config::APP_VERSION);

    let directory = match &cli.directory {
        Some(path) => {
            let json = std::fs::read_to_string(path)?;
            PatientDirectory::new(serde_json::from_str(&json)?)
        }
        None => {
            tracing::warn!("No patient directory given — every capture will be quarantined");
            PatientDirectory::default()
        }
    };
    tracing::info!(patients = directory.len(), "Patient directory loaded");

    let db_path = cli.db.clone().unwrap_or_else(config::archive_db_path);
    let conn = evrak::store::open_store(&db_path)?;

    let settings = PipelineSettings {
        target_pdf_bytes: cli.target_kb * 1024,
        ..PipelineSettings::default()
    };

    let remote: Box<dyn RemotePatientSearch> = match &cli.remote_url {
        Some(url) => Box::new(HttpPatientSearch::new(url.clone())),
        None => Box::new(NoRemoteSearch),
    };
    let resolver = IdentityResolver::new(remote, settings.remote_search_timeout);

    let pipeline = DocumentPipeline::new(
        TextExtractionAdapter::default_chain(),
        resolver,
        DocumentClassifier::default(),
        settings,
    )
    .with_progress(Box::new(|step, total, message| {
        println!("[{step}/{total}] {message}");
    }));

    let bytes = std::fs::read(&cli.image)?;
    let filename = cli
        .image
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("capture")
        .to_string();
    let media_type = media_type_for(&cli.image);
    let upload = RawUpload::new(bytes, media_type, filename);

    let record = pipeline.run(upload, &directory, &conn).await?;

    println!();
    println!("archived:   {}", record.filename);
    println!("kind:       {} ({:.0}%)", record.classification.kind.as_str(), record.classification.confidence * 100.0);
    match &record.match_summary.patient_name {
        Some(name) => println!(
            "patient:    {} [{} {:.0}%]",
            name,
            record.match_summary.level.as_str(),
            record.match_summary.confidence * 100.0
        ),
        None => println!("patient:    unmatched — sent to quarantine"),
    }
    println!(
        "size:       {} -> {} bytes{}",
        record.document.original_size,
        record.document.compressed_size,
        if record.document.emergency_compression {
            " (emergency placeholder)"
        } else {
            ""
        }
    );
    Ok(())
}

fn media_type_for(path: &std::path::Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("tif") | Some("tiff") => "image/tiff",
        _ => "image/jpeg",
    }
}

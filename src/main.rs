use std::io::IsTerminal;
use std::path::PathBuf;
use std::process;

use boyadl::{
    Config, Error, HttpFetcher, IndicatifView, LessonDownloader, LogView, ScrapeError,
    SuspendingWriter, catalog,
};
use clap::Parser;
use indicatif::MultiProgress;
use tracing::Level;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};
use url::Url;

/// Download mp3 files for Boya Chinese books
#[derive(Debug, Parser)]
#[command(name = "boyadl", version, about)]
struct Args {
    /// Url from QR code on the back cover
    url: Url,

    /// Output directory
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Number of concurrent downloads
    #[arg(long)]
    parallel: Option<usize>,

    /// Path to the ffmpeg binary (searched in PATH if omitted)
    #[arg(long, env = "BOYADL_FFMPEG")]
    ffmpeg: Option<PathBuf>,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors and hide the progress display
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    // Progress bars own the terminal; otherwise progress goes to the log
    let interactive = !args.quiet && std::io::stderr().is_terminal();
    let bars = interactive.then(MultiProgress::new);
    init_logging(args.verbose, args.quiet, bars.clone());

    if let Err(e) = run(args, bars).await {
        tracing::debug!(error = ?e, "boyadl failed");
        eprintln!("{}", user_message(&e));
        process::exit(1);
    }
}

async fn run(args: Args, bars: Option<MultiProgress>) -> boyadl::Result<()> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(output) = args.output {
        config.download.output_dir = output;
    }
    if let Some(parallel) = args.parallel {
        config.download.parallelism = parallel;
    }
    if let Some(ffmpeg) = args.ffmpeg {
        config.transcode.ffmpeg_path = Some(ffmpeg);
    }

    let http = HttpFetcher::new(&config.http)?;
    let downloader = LessonDownloader::new(config)?;
    let lessons = catalog::fetch_lessons(http.client(), args.url.as_str()).await?;

    let written = match bars {
        Some(multi) => {
            downloader
                .execute(
                    &lessons,
                    IndicatifView::with_multi_progress(multi, lessons.len()),
                )
                .await?
        }
        None => downloader.execute(&lessons, LogView::new()).await?,
    };

    let output_dir = downloader.config().output_dir();
    let output_dir = tokio::fs::canonicalize(output_dir)
        .await
        .unwrap_or_else(|_| output_dir.to_path_buf());
    println!(
        "Downloaded {} {} files to {}",
        written,
        downloader.config().transcode.format,
        output_dir.display()
    );
    Ok(())
}

fn user_message(error: &Error) -> String {
    match error {
        Error::Scrape(ScrapeError::NotFound) => {
            "List of lessons not found, did you pass the appropriate url?".to_string()
        }
        Error::Scrape(ScrapeError::Ambiguous { .. }) => {
            "Ambiguous list of lessons, did you pass the appropriate url?".to_string()
        }
        Error::Config {
            message,
            key: Some(key),
        } => format!("Error: {} (setting '{}')", message, key),
        other => format!("Error: {}", other),
    }
}

/// Log lines go through `bars` when the terminal view is active
fn init_logging(verbose: bool, quiet: bool, bars: Option<MultiProgress>) {
    let default_level = if bars.is_some() { Level::WARN } else { Level::INFO };
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("boyadl=debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_level.as_str()))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(move || SuspendingWriter::new(bars.clone(), std::io::stderr()))
                .with_target(false),
        )
        .init();
}

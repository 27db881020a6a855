//! BRENDA Ingest - builds the SQLite mirror of a BRENDA release

use anyhow::{Context, Result};
use brenda_common::logging::{init_logging, LogConfig, LogFormat, LogLevel};
use brenda_ingest::config::{
    IngestConfig, DEFAULT_JSON_PATH, DEFAULT_TARGET_PATH, DEFAULT_TEXT_PATH,
};
use brenda_ingest::brenda::{IngestionPipeline, DEFAULT_BATCH_SIZE};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "brenda-ingest")]
#[command(author, version, about = "Build the BRENDA SQLite mirror")]
struct Cli {
    /// BRENDA JSON release (plain or .gz)
    #[arg(long, env = "BRENDA_JSON", default_value = DEFAULT_JSON_PATH)]
    source: PathBuf,

    /// BRENDA flat-file release (plain or .gz)
    #[arg(long, env = "BRENDA_TEXT", default_value = DEFAULT_TEXT_PATH)]
    text: PathBuf,

    /// SQLite database to rebuild; replaced if it exists
    #[arg(long, env = "BRENDA_DB", default_value = DEFAULT_TARGET_PATH)]
    target: PathBuf,

    /// Rows per insert transaction
    #[arg(long, env = "BRENDA_BATCH_SIZE", default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Disable the progress spinner
    #[arg(long)]
    no_progress: bool,

    /// Number of categories and field codes listed in the summary
    #[arg(long, default_value_t = 10)]
    top: usize,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Log format: text or json
    #[arg(long)]
    log_format: Option<LogFormat>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Initialize logging based on verbose flag
    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    let mut builder = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("brenda-ingest");
    if let Some(format) = cli.log_format {
        builder = builder.format(format);
    }

    // Environment variables take precedence
    let log_config = builder.build().merge_env()?;
    let _log_guard = init_logging(&log_config)?;

    let config = IngestConfig {
        json_path: cli.source,
        text_path: cli.text,
        target_path: cli.target,
        batch_size: cli.batch_size,
        show_progress: !cli.no_progress,
        ..IngestConfig::default()
    };

    info!(
        source = %config.json_path.display(),
        text = %config.text_path.display(),
        target = %config.target_path.display(),
        "Rebuilding BRENDA mirror"
    );

    let report = IngestionPipeline::new(config)
        .run()
        .await
        .context("BRENDA ingestion failed")?;

    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &report.summary(cli.top))
        .context("Failed to write ingestion summary")?;
    writeln!(stdout)?;

    info!("Ingestion complete");
    Ok(())
}

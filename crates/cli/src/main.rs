use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, ValueEnum};
use env_logger::{Builder, Target, WriteStyle};
use log::{debug, info, LevelFilter};
use media_renamer_core::{
    load_config, load_config_from, walk, AppConfig, RunSummary, SystemMetadataReader, WalkOptions,
};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "media-renamer")]
#[command(about = "Renames photos and videos after their capture time into a `renamed` folder")]
struct Cli {
    /// Root directory to scan recursively
    #[arg(short, long)]
    path: PathBuf,
    /// Log missing tags and fallback decisions
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
    /// Report what would be renamed without touching any file
    #[arg(long, default_value_t = false)]
    dry_run: bool,
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
    /// Config file to use instead of the one in the OS config directory
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };

    let log_dir = match &config.log_dir {
        Some(dir) => dir.clone(),
        None => default_log_dir(),
    };
    let log_path = init_logging(cli.verbose, &log_dir, cli.output == OutputFormat::Json)?;
    debug!("Logging to {}", log_path.display());
    debug!("Effective config: {config:?}");

    cmd_rename(&cli, &config)
}

fn cmd_rename(cli: &Cli, config: &AppConfig) -> Result<()> {
    let options = WalkOptions {
        verbose: cli.verbose,
        dry_run: cli.dry_run,
        ..WalkOptions::from_config(config)
    };
    let reader = SystemMetadataReader::new(config.ffprobe_path.clone());

    let summary = walk(&cli.path, &options, &reader)?;

    match cli.output {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        OutputFormat::Table => print_totals(&summary),
    }
    Ok(())
}

fn print_totals(summary: &RunSummary) {
    if summary.dry_run {
        info!("Dry run: no files were moved.");
    }
    info!(
        "Totals: directories={} processed={} renamed={} unchanged={} failed={}",
        summary.directories.len(),
        summary.processed(),
        summary.renamed(),
        summary.unchanged(),
        summary.failed()
    );
}

/// Next to the executable, like the rest of the run's artifacts.
fn default_log_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Sends every record to `rename_<timestamp>.log` and mirrors it to stdout,
/// or to stderr when stdout carries JSON.
fn init_logging(verbose: bool, log_dir: &Path, mirror_to_stderr: bool) -> Result<PathBuf> {
    fs::create_dir_all(log_dir)
        .with_context(|| format!("could not create log directory: {}", log_dir.display()))?;
    let log_path = log_dir.join(format!("rename_{}.log", Local::now().format("%Y%m%d%H%M%S")));
    let file = File::create(&log_path)
        .with_context(|| format!("could not create log file: {}", log_path.display()))?;

    let mirror: Box<dyn Write + Send> = if mirror_to_stderr {
        Box::new(io::stderr())
    } else {
        Box::new(io::stdout())
    };

    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    Builder::new()
        .filter_level(level)
        .write_style(WriteStyle::Never)
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] {}",
                Local::now().format("%m/%d/%Y %I:%M:%S %p"),
                record.level(),
                record.args()
            )
        })
        .target(Target::Pipe(Box::new(Tee { file, mirror })))
        .try_init()
        .context("could not initialize logging")?;

    Ok(log_path)
}

struct Tee {
    file: File,
    mirror: Box<dyn Write + Send>,
}

impl Write for Tee {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write_all(buf)?;
        self.mirror.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()?;
        self.mirror.flush()
    }
}

use crate::apply::{execute, RenameOutcome, RenameRequest};
use crate::config::{AppConfig, DEFAULT_OUTPUT_DIR};
use crate::media::{ExtensionSet, MediaKind};
use crate::metadata::MetadataReader;
use crate::naming::build_stem;
use crate::resolver::resolve;
use anyhow::{Context, Result};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone)]
pub struct WalkOptions {
    pub extensions: ExtensionSet,
    pub output_dir_name: String,
    pub verbose: bool,
    pub dry_run: bool,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl WalkOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            extensions: ExtensionSet::new(&config.image_extensions, &config.video_extensions),
            output_dir_name: if config.output_dir_name.trim().is_empty() {
                DEFAULT_OUTPUT_DIR.to_string()
            } else {
                config.output_dir_name.clone()
            },
            verbose: false,
            dry_run: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DirectoryReport {
    pub directory: PathBuf,
    pub processed: usize,
    pub renamed: usize,
    pub unchanged: usize,
    pub failed: usize,
    pub outcomes: Vec<RenameOutcome>,
}

impl DirectoryReport {
    fn record(&mut self, outcome: RenameOutcome) {
        self.processed += 1;
        match &outcome {
            RenameOutcome::Unchanged { .. } => self.unchanged += 1,
            RenameOutcome::Renamed { .. } => self.renamed += 1,
            RenameOutcome::Failed { .. } => self.failed += 1,
        }
        self.outcomes.push(outcome);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RunSummary {
    pub root: PathBuf,
    pub dry_run: bool,
    pub directories: Vec<DirectoryReport>,
}

impl RunSummary {
    pub fn processed(&self) -> usize {
        self.directories.iter().map(|d| d.processed).sum()
    }

    pub fn renamed(&self) -> usize {
        self.directories.iter().map(|d| d.renamed).sum()
    }

    pub fn unchanged(&self) -> usize {
        self.directories.iter().map(|d| d.unchanged).sum()
    }

    pub fn failed(&self) -> usize {
        self.directories.iter().map(|d| d.failed).sum()
    }
}

/// Renames every recognized media file under `root`, one directory at a
/// time, top-down. Directories named like the output directory are skipped
/// along with everything below them.
pub fn walk<R>(root: &Path, options: &WalkOptions, reader: &R) -> Result<RunSummary>
where
    R: MetadataReader + ?Sized,
{
    let meta = fs::metadata(root)
        .with_context(|| format!("root path does not exist: {}", root.display()))?;
    if !meta.is_dir() {
        anyhow::bail!("root path is not a directory: {}", root.display());
    }

    let mut summary = RunSummary {
        root: root.to_path_buf(),
        dry_run: options.dry_run,
        directories: Vec::new(),
    };

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            !(entry.file_type().is_dir() && entry.file_name() == options.output_dir_name.as_str())
        });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("Skipping unreadable entry under {}: {err}", root.display());
                continue;
            }
        };
        if !entry.file_type().is_dir() {
            continue;
        }

        info!("Scanning {}..", entry.path().display());
        match scan_dir(entry.path(), options, reader) {
            Ok(report) => summary.directories.push(report),
            Err(err) => error!("Could not scan {}: {err:#}", entry.path().display()),
        }
        info!("");
    }

    Ok(summary)
}

/// Runs the pipeline over the immediate media files of `directory`.
pub fn scan_dir<R>(directory: &Path, options: &WalkOptions, reader: &R) -> Result<DirectoryReport>
where
    R: MetadataReader + ?Sized,
{
    let files = collect_media_files(directory, &options.extensions)?;
    let output_dir = directory.join(&options.output_dir_name);
    let mut reserved = HashSet::<PathBuf>::new();
    let mut report = DirectoryReport {
        directory: directory.to_path_buf(),
        ..DirectoryReport::default()
    };

    let total = files.len();
    for (index, (path, kind)) in files.into_iter().enumerate() {
        let file_name = path
            .file_name()
            .map(|v| v.to_string_lossy().to_string())
            .unwrap_or_default();
        info!("Processing ({}/{}) {}...", index + 1, total, file_name);

        let outcome = process_file(&path, kind, &output_dir, options, reader, &mut reserved);
        report.record(outcome);
    }

    let verb = if options.dry_run { "would be renamed" } else { "are renamed" };
    info!("All done. {} files {}.", report.renamed, verb);
    Ok(report)
}

fn process_file<R>(
    path: &Path,
    kind: MediaKind,
    output_dir: &Path,
    options: &WalkOptions,
    reader: &R,
    reserved: &mut HashSet<PathBuf>,
) -> RenameOutcome
where
    R: MetadataReader + ?Sized,
{
    let info = match resolve(path, kind, reader, options.verbose) {
        Ok(info) => info,
        Err(err) => {
            error!("    Could not determine a timestamp: {err:#}");
            return RenameOutcome::Failed {
                path: path.to_path_buf(),
                reason: format!("{err:#}"),
            };
        }
    };

    let stem = build_stem(&info);
    let extension = path
        .extension()
        .map(|v| format!(".{}", v.to_string_lossy()))
        .unwrap_or_default();

    execute(
        &RenameRequest {
            source: path,
            stem: &stem,
            extension: &extension,
            output_dir,
            dry_run: options.dry_run,
        },
        reserved,
    )
}

fn collect_media_files(directory: &Path, extensions: &ExtensionSet) -> Result<Vec<(PathBuf, MediaKind)>> {
    let entries = fs::read_dir(directory)
        .with_context(|| format!("could not read directory: {}", directory.display()))?
        .map(|entry| entry.map(|entry| entry.path()));
    Ok(select_media(directory, entries, extensions))
}

fn select_media<I>(directory: &Path, entries: I, extensions: &ExtensionSet) -> Vec<(PathBuf, MediaKind)>
where
    I: IntoIterator<Item = io::Result<PathBuf>>,
{
    let mut out = Vec::new();
    for entry in entries {
        let path = match entry {
            Ok(path) => path,
            Err(err) => {
                warn!("Skipping unreadable entry in {}: {err}", directory.display());
                continue;
            }
        };
        if path.is_dir() {
            continue;
        }
        match extensions.classify(&path) {
            MediaKind::Ignored => {}
            kind => out.push((path, kind)),
        }
    }
    out.sort_by(|a, b| a.0.cmp(&b.0));
    out
}

use anyhow::{Context, Result};
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::{self, File, FileTimes};
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RenameOutcome {
    Unchanged { path: PathBuf },
    Renamed { from: PathBuf, to: PathBuf },
    Failed { path: PathBuf, reason: String },
}

#[derive(Debug, Clone)]
pub struct RenameRequest<'a> {
    pub source: &'a Path,
    pub stem: &'a str,
    /// Extension with its leading dot, as spelled in the original name.
    pub extension: &'a str,
    pub output_dir: &'a Path,
    pub dry_run: bool,
}

/// Moves `request.source` to `output_dir/stem+extension`, numbering the stem
/// (`-1`, `-2`, ...) until the destination is free. Failures are logged and
/// reported as [`RenameOutcome::Failed`] so the caller can keep going.
///
/// `reserved` holds destinations handed out earlier in the same directory
/// pass; in dry-run mode it stands in for the files that would have been
/// created.
pub fn execute(request: &RenameRequest<'_>, reserved: &mut HashSet<PathBuf>) -> RenameOutcome {
    match try_execute(request, reserved) {
        Ok(outcome) => outcome,
        Err(err) => {
            error!("    Rename failed for {}: {err:#}", request.source.display());
            RenameOutcome::Failed {
                path: request.source.to_path_buf(),
                reason: format!("{err:#}"),
            }
        }
    }
}

fn try_execute(request: &RenameRequest<'_>, reserved: &mut HashSet<PathBuf>) -> Result<RenameOutcome> {
    let file_name = request
        .source
        .file_name()
        .with_context(|| format!("not a file path: {}", request.source.display()))?;
    let new_name = format!("{}{}", request.stem, request.extension);

    if file_name.to_string_lossy() == new_name {
        info!("    File name is already updated.");
        return Ok(RenameOutcome::Unchanged {
            path: request.source.to_path_buf(),
        });
    }

    if !request.dry_run {
        fs::create_dir_all(request.output_dir).with_context(|| {
            format!(
                "could not create output directory: {}",
                request.output_dir.display()
            )
        })?;
    }

    let target = unique_destination(request.output_dir, request.stem, request.extension, reserved);
    if !request.dry_run {
        move_file(request.source, &target)?;
    }

    let shown = target
        .file_name()
        .map(|v| v.to_string_lossy().to_string())
        .unwrap_or_default();
    info!(
        "    Rename: {:>35}    =>    {}",
        file_name.to_string_lossy(),
        shown
    );

    Ok(RenameOutcome::Renamed {
        from: request.source.to_path_buf(),
        to: target,
    })
}

fn unique_destination(
    output_dir: &Path,
    stem: &str,
    extension: &str,
    reserved: &mut HashSet<PathBuf>,
) -> PathBuf {
    let mut candidate = output_dir.join(format!("{stem}{extension}"));
    let mut n = 0usize;
    while is_taken(&candidate, reserved) {
        n += 1;
        candidate = output_dir.join(format!("{stem}-{n}{extension}"));
    }
    reserved.insert(candidate.clone());
    candidate
}

// symlink_metadata so that dangling links count as taken.
fn is_taken(candidate: &Path, reserved: &HashSet<PathBuf>) -> bool {
    reserved.contains(candidate) || fs::symlink_metadata(candidate).is_ok()
}

fn move_file(source: &Path, target: &Path) -> Result<()> {
    let Err(rename_err) = fs::rename(source, target) else {
        return Ok(());
    };

    // rename(2) cannot cross filesystems; copy instead and keep the file times.
    copy_then_remove(source, target).map_err(|copy_err| {
        anyhow::Error::from(rename_err).context(format!(
            "could not move {} -> {} (copy fallback: {copy_err})",
            source.display(),
            target.display()
        ))
    })
}

fn copy_then_remove(source: &Path, target: &Path) -> io::Result<()> {
    let meta = fs::metadata(source)?;
    if let Err(err) = copy_with_times(source, target, &meta) {
        let _ = fs::remove_file(target);
        return Err(err);
    }
    if let Err(err) = fs::remove_file(source) {
        let _ = fs::remove_file(target);
        return Err(err);
    }
    Ok(())
}

fn copy_with_times(source: &Path, target: &Path, meta: &fs::Metadata) -> io::Result<()> {
    fs::copy(source, target)?;
    let mut times = FileTimes::new().set_modified(meta.modified()?);
    if let Ok(accessed) = meta.accessed() {
        times = times.set_accessed(accessed);
    }
    File::options().write(true).open(target)?.set_times(times)
}

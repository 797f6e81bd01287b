use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TimestampSource {
    ImageExif,
    VideoContainer,
    Filesystem,
}

impl TimestampSource {
    pub fn is_metadata(self) -> bool {
        !matches!(self, TimestampSource::Filesystem)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Device {
    pub make: String,
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CaptureInfo {
    pub timestamp: String,
    pub source: TimestampSource,
    pub device: Option<Device>,
}

/// EXIF values the resolver cares about. Text is kept as stored in the file,
/// including trailing padding, because the vendor collapse table depends on it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageTags {
    pub date_time: Option<String>,
    pub make: Option<String>,
    pub model: Option<String>,
    /// Names of every tag found, for diagnostics.
    pub available: Vec<String>,
}

impl ImageTags {
    pub fn device(&self) -> Option<Device> {
        let make = self.make.as_deref().filter(|v| !v.is_empty())?;
        let model = self.model.as_deref().filter(|v| !v.is_empty())?;
        Some(Device {
            make: make.to_string(),
            model: model.to_string(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StreamTags {
    #[serde(default)]
    pub creation_time: Option<String>,
}

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("could not open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not decode EXIF in {path}: {source}")]
    Exif {
        path: PathBuf,
        #[source]
        source: exif::Error,
    },
    #[error("could not run {program}: {source}")]
    ProbeSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} exited with {status} for {path}: {stderr}")]
    ProbeFailed {
        program: String,
        path: PathBuf,
        status: std::process::ExitStatus,
        stderr: String,
    },
    #[error("could not decode probe output for {path}: {source}")]
    ProbeOutput {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Boundary to the libraries and tools that understand container formats.
pub trait MetadataReader {
    /// Tag mappings of every stream in a video container, in stream order.
    fn probe(&self, path: &Path) -> Result<Vec<StreamTags>, MetadataError>;

    fn read_tags(&self, path: &Path) -> Result<ImageTags, MetadataError>;
}

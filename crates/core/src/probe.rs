use crate::exif_reader::read_image_tags;
use crate::metadata::{ImageTags, MetadataError, MetadataReader, StreamTags};
use serde::Deserialize;
use std::path::Path;
use std::process::Command;

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    #[serde(default)]
    tags: Option<StreamTags>,
}

/// Reads images with `kamadak-exif` and videos with an external `ffprobe`.
#[derive(Debug, Clone)]
pub struct SystemMetadataReader {
    ffprobe_path: String,
}

impl SystemMetadataReader {
    pub fn new(ffprobe_path: impl Into<String>) -> Self {
        Self {
            ffprobe_path: ffprobe_path.into(),
        }
    }
}

impl Default for SystemMetadataReader {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}

impl MetadataReader for SystemMetadataReader {
    fn probe(&self, path: &Path) -> Result<Vec<StreamTags>, MetadataError> {
        let output = Command::new(&self.ffprobe_path)
            .args(["-v", "quiet", "-print_format", "json", "-show_streams"])
            .arg(path)
            .output()
            .map_err(|source| MetadataError::ProbeSpawn {
                program: self.ffprobe_path.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(MetadataError::ProbeFailed {
                program: self.ffprobe_path.clone(),
                path: path.to_path_buf(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        parse_probe_output(&output.stdout).map_err(|source| MetadataError::ProbeOutput {
            path: path.to_path_buf(),
            source,
        })
    }

    fn read_tags(&self, path: &Path) -> Result<ImageTags, MetadataError> {
        read_image_tags(path)
    }
}

fn parse_probe_output(raw: &[u8]) -> Result<Vec<StreamTags>, serde_json::Error> {
    let parsed = serde_json::from_slice::<ProbeOutput>(raw)?;
    Ok(parsed
        .streams
        .into_iter()
        .map(|stream| stream.tags.unwrap_or_default())
        .collect())
}

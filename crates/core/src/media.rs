use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
    Ignored,
}

/// Recognized extensions, stored lower-cased without the leading dot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionSet {
    images: Vec<String>,
    videos: Vec<String>,
}

impl ExtensionSet {
    pub fn new<I, V>(images: I, videos: V) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        V: IntoIterator,
        V::Item: AsRef<str>,
    {
        Self {
            images: images.into_iter().map(|v| normalize_ext(v.as_ref())).collect(),
            videos: videos.into_iter().map(|v| normalize_ext(v.as_ref())).collect(),
        }
    }

    pub fn classify(&self, path: &Path) -> MediaKind {
        let Some(ext) = path.extension().and_then(|v| v.to_str()) else {
            return MediaKind::Ignored;
        };
        let ext = ext.to_lowercase();
        if self.images.contains(&ext) {
            MediaKind::Image
        } else if self.videos.contains(&ext) {
            MediaKind::Video
        } else {
            MediaKind::Ignored
        }
    }
}

fn normalize_ext(value: &str) -> String {
    value.trim().trim_start_matches('.').to_lowercase()
}

mod apply;
mod config;
mod exif_reader;
mod media;
mod metadata;
mod naming;
mod probe;
mod resolver;
mod sanitize;
mod walker;

pub use apply::{execute, RenameOutcome, RenameRequest};
pub use config::{app_paths, load_config, load_config_from, AppConfig, AppPaths, DEFAULT_OUTPUT_DIR};
pub use media::{ExtensionSet, MediaKind};
pub use metadata::{
    CaptureInfo, Device, ImageTags, MetadataError, MetadataReader, StreamTags, TimestampSource,
};
pub use naming::build_stem;
pub use probe::SystemMetadataReader;
pub use resolver::{format_exif_datetime, parse_creation_time, resolve, STEM_TIME_FORMAT};
pub use walker::{scan_dir, walk, DirectoryReport, RunSummary, WalkOptions};

use crate::media::MediaKind;
use crate::metadata::{CaptureInfo, MetadataReader, TimestampSource};
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Local, NaiveDateTime};
use log::warn;
use std::fs::{self, Metadata};
use std::path::Path;

pub const STEM_TIME_FORMAT: &str = "%Y-%m-%d %H.%M.%S";

const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";
const CREATION_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Picks the best capture timestamp for `path`, falling back to filesystem
/// times when the container has nothing usable.
pub fn resolve<R>(path: &Path, kind: MediaKind, reader: &R, verbose: bool) -> Result<CaptureInfo>
where
    R: MetadataReader + ?Sized,
{
    let from_metadata = match kind {
        MediaKind::Video => video_capture(path, reader),
        MediaKind::Image => image_capture(path, reader, verbose),
        MediaKind::Ignored => None,
    };
    if let Some(info) = from_metadata {
        return Ok(info);
    }

    if verbose {
        warn!("    Cannot get creation time from metadata. Using file modification/change time...");
    }
    let earliest = filesystem_timestamp(path)?;
    Ok(CaptureInfo {
        timestamp: earliest.format(STEM_TIME_FORMAT).to_string().trim().to_string(),
        source: TimestampSource::Filesystem,
        device: None,
    })
}

fn video_capture<R>(path: &Path, reader: &R) -> Option<CaptureInfo>
where
    R: MetadataReader + ?Sized,
{
    let streams = match reader.probe(path) {
        Ok(streams) => streams,
        Err(err) => {
            warn!("    Could not probe {}: {err}", path.display());
            return None;
        }
    };

    let raw = streams
        .into_iter()
        .find_map(|stream| stream.creation_time)?;
    let Some(created) = parse_creation_time(&raw) else {
        warn!("    Unrecognized creation_time {raw:?} in {}", path.display());
        return None;
    };

    Some(CaptureInfo {
        timestamp: created.format(STEM_TIME_FORMAT).to_string().trim().to_string(),
        source: TimestampSource::VideoContainer,
        device: None,
    })
}

fn image_capture<R>(path: &Path, reader: &R, verbose: bool) -> Option<CaptureInfo>
where
    R: MetadataReader + ?Sized,
{
    let tags = match reader.read_tags(path) {
        Ok(tags) => tags,
        Err(err) => {
            warn!("    Something went wrong reading EXIF: {err}");
            return None;
        }
    };

    let Some(raw) = tags.date_time.as_deref() else {
        if verbose {
            warn!(
                "    Cannot find datetime in exif. Available attributes: {:?}",
                tags.available
            );
        }
        return None;
    };
    let Some(timestamp) = format_exif_datetime(raw) else {
        warn!("    Unrecognized DateTime {raw:?} in {}", path.display());
        return None;
    };

    Some(CaptureInfo {
        timestamp,
        source: TimestampSource::ImageExif,
        device: tags.device(),
    })
}

/// `2020-07-04T12:00:00.500000Z` style container timestamps. The fraction is
/// read as a decimal fraction of a second; unreadable fractions count as zero.
pub fn parse_creation_time(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    let (whole, fraction) = match raw.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (raw.trim_end_matches('Z'), None),
    };
    let base = NaiveDateTime::parse_from_str(whole, CREATION_TIME_FORMAT).ok()?;
    let micros = fraction.map(parse_micros).unwrap_or(0);
    Some(base + Duration::microseconds(micros))
}

fn parse_micros(fraction: &str) -> i64 {
    let digits = fraction.trim_end_matches('Z');
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return 0;
    }
    let mut padded: String = digits.chars().take(6).collect();
    while padded.len() < 6 {
        padded.push('0');
    }
    padded.parse::<i64>().unwrap_or(0)
}

/// `2023:05:01 10:20:30` becomes `2023-05-01 10.20.30`.
pub fn format_exif_datetime(raw: &str) -> Option<String> {
    let trimmed = raw.trim_end_matches('\0').trim();
    NaiveDateTime::parse_from_str(trimmed, EXIF_DATETIME_FORMAT).ok()?;
    let (day, time) = trimmed.split_once(' ')?;
    let joined = format!("{} {}", day.replace(':', "-"), time.replace(':', "."));
    Some(joined.trim().to_string())
}

fn filesystem_timestamp(path: &Path) -> Result<DateTime<Local>> {
    let meta = fs::metadata(path)
        .with_context(|| format!("could not read file times: {}", path.display()))?;
    let modified = meta.modified().ok().map(DateTime::<Local>::from);
    let changed = changed_time(&meta);

    match (modified, changed) {
        (Some(modified), Some(changed)) => Ok(earlier(modified, changed)),
        (Some(only), None) | (None, Some(only)) => Ok(only),
        (None, None) => anyhow::bail!("no file times available: {}", path.display()),
    }
}

/// Ties go to the change/creation time.
fn earlier(modified: DateTime<Local>, changed: DateTime<Local>) -> DateTime<Local> {
    if modified < changed {
        modified
    } else {
        changed
    }
}

#[cfg(unix)]
fn changed_time(meta: &Metadata) -> Option<DateTime<Local>> {
    use std::os::unix::fs::MetadataExt;
    DateTime::from_timestamp(meta.ctime(), meta.ctime_nsec() as u32)
        .map(|utc| utc.with_timezone(&Local))
}

#[cfg(not(unix))]
fn changed_time(meta: &Metadata) -> Option<DateTime<Local>> {
    meta.created().ok().map(DateTime::<Local>::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{Device, ImageTags, MetadataError, StreamTags};
    use chrono::{NaiveDate, TimeZone};
    use log::{Log, Metadata as LogMetadata, Record};
    use std::cell::RefCell;
    use std::fs::{File, FileTimes};
    use std::sync::Once;
    use std::time::{Duration as StdDuration, SystemTime};
    use tempfile::tempdir;

    #[derive(Default)]
    struct FakeReader {
        streams: Option<Vec<StreamTags>>,
        tags: Option<ImageTags>,
    }

    impl MetadataReader for FakeReader {
        fn probe(&self, path: &Path) -> Result<Vec<StreamTags>, MetadataError> {
            self.streams.clone().ok_or_else(|| MetadataError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::other("no streams"),
            })
        }

        fn read_tags(&self, path: &Path) -> Result<ImageTags, MetadataError> {
            self.tags.clone().ok_or_else(|| MetadataError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::other("no exif"),
            })
        }
    }

    thread_local! {
        static CAPTURED: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
    }

    /// Keeps each test thread's log lines apart from the others.
    struct ThreadCapture;

    impl Log for ThreadCapture {
        fn enabled(&self, _: &LogMetadata) -> bool {
            true
        }

        fn log(&self, record: &Record) {
            let line = record.args().to_string();
            CAPTURED.with(|lines| lines.borrow_mut().push(line));
        }

        fn flush(&self) {}
    }

    static LOGGER: ThreadCapture = ThreadCapture;
    static INSTALL: Once = Once::new();

    fn capture_logs<T>(run: impl FnOnce() -> T) -> (T, Vec<String>) {
        INSTALL.call_once(|| {
            log::set_logger(&LOGGER).expect("no other logger in tests");
            log::set_max_level(log::LevelFilter::Trace);
        });
        CAPTURED.with(|lines| lines.borrow_mut().clear());
        let value = run();
        let lines = CAPTURED.with(|lines| lines.borrow_mut().drain(..).collect());
        (value, lines)
    }

    fn mentions(lines: &[String], needle: &str) -> bool {
        lines.iter().any(|line| line.contains(needle))
    }

    fn stream(creation_time: Option<&str>) -> StreamTags {
        StreamTags {
            creation_time: creation_time.map(str::to_string),
        }
    }

    fn image_tags(date_time: Option<&str>, make: Option<&str>, model: Option<&str>) -> ImageTags {
        ImageTags {
            date_time: date_time.map(str::to_string),
            make: make.map(str::to_string),
            model: model.map(str::to_string),
            available: vec!["DateTime".to_string()],
        }
    }

    fn file_with_mtime(dir: &Path, name: &str, modified: SystemTime) -> std::path::PathBuf {
        let path = dir.join(name);
        let file = File::create(&path).expect("create file");
        file.set_times(FileTimes::new().set_modified(modified))
            .expect("set mtime");
        path
    }

    #[test]
    fn exif_datetime_is_reformatted() {
        assert_eq!(
            format_exif_datetime("2023:05:01 10:20:30").as_deref(),
            Some("2023-05-01 10.20.30")
        );
        assert_eq!(
            format_exif_datetime("2023:05:01 10:20:30\0").as_deref(),
            Some("2023-05-01 10.20.30")
        );
    }

    #[test]
    fn exif_datetime_rejects_blank_camera_clock() {
        assert_eq!(format_exif_datetime("    :  :     :  :  "), None);
        assert_eq!(format_exif_datetime("2023:05:01"), None);
    }

    #[test]
    fn creation_time_reads_fraction_as_microseconds() {
        let parsed = parse_creation_time("2020-07-04T12:00:00.500000Z").expect("parse");
        let expected = NaiveDate::from_ymd_opt(2020, 7, 4)
            .and_then(|d| d.and_hms_micro_opt(12, 0, 0, 500_000))
            .expect("valid date");
        assert_eq!(parsed, expected);
    }

    #[test]
    fn creation_time_treats_malformed_fraction_as_zero() {
        let parsed = parse_creation_time("2020-07-04T12:00:59.5x0Z").expect("parse");
        assert_eq!(parsed.format(STEM_TIME_FORMAT).to_string(), "2020-07-04 12.00.59");
        let nanos = parse_creation_time("2020-07-04T12:00:59.999999999Z").expect("parse");
        assert_eq!(nanos.format(STEM_TIME_FORMAT).to_string(), "2020-07-04 12.00.59");
    }

    #[test]
    fn creation_time_without_fraction_is_accepted() {
        let parsed = parse_creation_time("2020-07-04T12:00:00Z").expect("parse");
        assert_eq!(parsed.format(STEM_TIME_FORMAT).to_string(), "2020-07-04 12.00.00");
        assert!(parse_creation_time("July 4th").is_none());
    }

    #[test]
    fn video_uses_first_stream_carrying_creation_time() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("clip.mov");
        File::create(&path).expect("create");

        let reader = FakeReader {
            streams: Some(vec![
                stream(None),
                stream(Some("2020-07-04T12:00:00.500000Z")),
                stream(Some("2019-01-01T00:00:00.000000Z")),
            ]),
            tags: None,
        };

        let info = resolve(&path, MediaKind::Video, &reader, false).expect("resolve");
        assert_eq!(info.timestamp, "2020-07-04 12.00.00");
        assert_eq!(info.source, TimestampSource::VideoContainer);
        assert_eq!(info.device, None);
    }

    #[test]
    fn image_with_device_tags_keeps_device() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("photo.jpg");
        File::create(&path).expect("create");

        let reader = FakeReader {
            streams: None,
            tags: Some(image_tags(
                Some("2021:01:02 03:04:05"),
                Some("Canon"),
                Some("Canon EOS"),
            )),
        };

        let info = resolve(&path, MediaKind::Image, &reader, true).expect("resolve");
        assert_eq!(info.timestamp, "2021-01-02 03.04.05");
        assert_eq!(info.source, TimestampSource::ImageExif);
        assert_eq!(
            info.device,
            Some(Device {
                make: "Canon".to_string(),
                model: "Canon EOS".to_string(),
            })
        );
    }

    #[test]
    fn image_without_datetime_falls_back_and_drops_device() {
        let temp = tempdir().expect("tempdir");
        let modified = Local
            .with_ymd_and_hms(2001, 2, 3, 4, 5, 6)
            .single()
            .expect("valid local time");
        let path = file_with_mtime(temp.path(), "photo.jpg", SystemTime::from(modified));

        let reader = FakeReader {
            streams: None,
            tags: Some(image_tags(None, Some("Canon"), Some("Canon EOS"))),
        };

        let info = resolve(&path, MediaKind::Image, &reader, true).expect("resolve");
        assert_eq!(info.source, TimestampSource::Filesystem);
        assert_eq!(info.timestamp, "2001-02-03 04.05.06");
        assert_eq!(info.device, None);
    }

    #[test]
    fn unreadable_metadata_falls_back_to_filesystem() {
        let temp = tempdir().expect("tempdir");
        let modified = SystemTime::now() - StdDuration::from_secs(86_400 * 400);
        let path = file_with_mtime(temp.path(), "clip.mp4", modified);

        let reader = FakeReader::default();
        let info = resolve(&path, MediaKind::Video, &reader, false).expect("resolve");

        let expected = DateTime::<Local>::from(modified)
            .format(STEM_TIME_FORMAT)
            .to_string();
        assert_eq!(info.source, TimestampSource::Filesystem);
        assert_eq!(info.timestamp, expected);
    }

    #[test]
    fn fallback_prefers_change_time_when_it_is_earlier() {
        let temp = tempdir().expect("tempdir");
        let future = SystemTime::now() + StdDuration::from_secs(86_400 * 30);
        let path = file_with_mtime(temp.path(), "photo.png", future);

        let info = resolve(&path, MediaKind::Ignored, &FakeReader::default(), false)
            .expect("resolve");
        let future_stamp = DateTime::<Local>::from(future)
            .format(STEM_TIME_FORMAT)
            .to_string();
        assert_ne!(info.timestamp, future_stamp);
        assert_eq!(info.source, TimestampSource::Filesystem);
    }

    #[test]
    fn earlier_breaks_ties_with_change_time() {
        let a = Local
            .with_ymd_and_hms(2020, 1, 1, 0, 0, 0)
            .single()
            .expect("valid");
        let b = Local
            .with_ymd_and_hms(2021, 1, 1, 0, 0, 0)
            .single()
            .expect("valid");
        assert_eq!(earlier(a, b), a);
        assert_eq!(earlier(b, a), a);
        assert_eq!(earlier(a, a), a);
    }

    #[test]
    fn missing_file_cannot_fall_back() {
        let temp = tempdir().expect("tempdir");
        let err = resolve(
            &temp.path().join("gone.jpg"),
            MediaKind::Image,
            &FakeReader::default(),
            false,
        )
        .expect_err("missing file has no times");
        assert!(err.to_string().contains("could not read file times"));
    }

    #[test]
    fn missing_datetime_diagnostics_only_when_verbose() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("photo.jpg");
        File::create(&path).expect("create");
        let reader = FakeReader {
            streams: None,
            tags: Some(image_tags(None, Some("Canon"), Some("Canon EOS"))),
        };

        let (quiet, quiet_lines) =
            capture_logs(|| resolve(&path, MediaKind::Image, &reader, false));
        assert_eq!(quiet.expect("resolve").source, TimestampSource::Filesystem);
        assert!(!mentions(&quiet_lines, "Cannot find datetime"), "{quiet_lines:?}");
        assert!(!mentions(&quiet_lines, "Cannot get creation time"), "{quiet_lines:?}");

        let (loud, loud_lines) = capture_logs(|| resolve(&path, MediaKind::Image, &reader, true));
        assert_eq!(loud.expect("resolve").source, TimestampSource::Filesystem);
        assert!(mentions(&loud_lines, "Cannot find datetime"), "{loud_lines:?}");
        assert!(mentions(&loud_lines, "Cannot get creation time"), "{loud_lines:?}");
    }

    #[test]
    fn read_errors_are_logged_regardless_of_verbosity() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("clip.mp4");
        File::create(&path).expect("create");

        let (info, lines) =
            capture_logs(|| resolve(&path, MediaKind::Video, &FakeReader::default(), false));
        assert_eq!(info.expect("resolve").source, TimestampSource::Filesystem);
        assert!(mentions(&lines, "Could not probe"), "{lines:?}");
    }
}

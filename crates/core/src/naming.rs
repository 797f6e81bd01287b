use crate::metadata::CaptureInfo;
use crate::sanitize::{collapse_vendor_prefixes, sanitize_stem};

/// Canonical file stem for a capture: the timestamp, plus ` make_model` when
/// both the time and the device came from embedded metadata.
pub fn build_stem(info: &CaptureInfo) -> String {
    let mut stem = info.timestamp.clone();

    if info.source.is_metadata() {
        if let Some(device) = &info.device {
            stem.push(' ');
            stem.push_str(&device.make.replace(' ', "_"));
            stem.push('_');
            stem.push_str(&device.model.replace(' ', "_"));
        }
    }

    collapse_vendor_prefixes(&sanitize_stem(&stem))
}

use crate::metadata::{ImageTags, MetadataError};
use exif::{Exif, In, Reader, Tag, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

pub fn read_image_tags(path: &Path) -> Result<ImageTags, MetadataError> {
    let file = File::open(path).map_err(|source| MetadataError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut buf = BufReader::new(file);
    let exif = Reader::new()
        .read_from_container(&mut buf)
        .map_err(|source| MetadataError::Exif {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(ImageTags {
        date_time: ascii_field(&exif, Tag::DateTime),
        make: ascii_field(&exif, Tag::Make),
        model: ascii_field(&exif, Tag::Model),
        available: exif.fields().map(|field| field.tag.to_string()).collect(),
    })
}

fn ascii_field(exif: &Exif, tag: Tag) -> Option<String> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    match &field.value {
        Value::Ascii(parts) => parts
            .first()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned()),
        _ => None,
    }
}

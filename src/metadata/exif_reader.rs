use std::io::Cursor;
use std::path::Path;

use exif::{Exif, In, Tag, Value};

use super::filters::{self, escape};
use super::{xmp, ExtractError, MetadataExtractor, PhotoMetadata};

/// Reads EXIF fields with `kamadak-exif` and the label/keywords from the
/// embedded XMP packet.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExifExtractor;

impl ExifExtractor {
    pub fn new() -> Self {
        Self
    }
}

fn ascii(exif: &Exif, tag: Tag) -> Option<String> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    match &field.value {
        Value::Ascii(parts) => parts
            .first()
            .and_then(|bytes| escape(&String::from_utf8_lossy(bytes))),
        _ => None,
    }
}

fn rational(exif: &Exif, tag: Tag, index: usize) -> Option<(u32, u32)> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    match &field.value {
        Value::Rational(values) => values.get(index).map(|r| (r.num, r.denom)),
        _ => None,
    }
}

fn lens_range(exif: &Exif) -> Option<(u32, u32)> {
    let (min_num, min_den) = rational(exif, Tag::LensSpecification, 0)?;
    let (max_num, max_den) = rational(exif, Tag::LensSpecification, 1)?;
    if min_den == 0 || max_den == 0 {
        return None;
    }
    Some((min_num / min_den, max_num / max_den))
}

impl MetadataExtractor for ExifExtractor {
    fn extract(&self, path: &Path) -> Result<PhotoMetadata, ExtractError> {
        let bytes = std::fs::read(path)?;
        let exif = exif::Reader::new().read_from_container(&mut Cursor::new(&bytes))?;

        let raw_datetime = ascii(&exif, Tag::DateTimeOriginal)
            .or_else(|| ascii(&exif, Tag::DateTime))
            .ok_or(ExtractError::MissingDateTime)?;
        let datetime = filters::parse_datetime(&raw_datetime)?;

        let mut meta = PhotoMetadata::new(datetime);
        meta.f = rational(&exif, Tag::FNumber, 0).and_then(|(n, d)| filters::fnumber(n, d));
        meta.iso = exif
            .get_field(Tag::PhotographicSensitivity, In::PRIMARY)
            .and_then(|f| f.value.get_uint(0))
            .map(|iso| iso.to_string());
        meta.make = ascii(&exif, Tag::Make);
        meta.camera = ascii(&exif, Tag::Model);
        meta.focal_length =
            rational(&exif, Tag::FocalLength, 0).and_then(|(n, d)| filters::focal_length(n, d));
        meta.lens_model = ascii(&exif, Tag::LensModel);
        meta.lens_spec = filters::lens_spec(lens_range(&exif), meta.focal_length.as_deref());

        if let Some(packet) = xmp::find_packet(&bytes) {
            let fields = xmp::parse(&packet);
            meta.label = fields.label.as_deref().and_then(escape);
            meta.tags = fields
                .keywords
                .iter()
                .filter_map(|k| escape(k))
                .collect();
        }

        Ok(meta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_without_exif_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"not a photo").unwrap();

        assert!(ExifExtractor::new().extract(&path).is_err());
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = ExifExtractor::new().extract(&dir.path().join("gone.jpg"));
        assert!(matches!(result, Err(ExtractError::Io(_))));
    }
}

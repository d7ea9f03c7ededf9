//! Photo file names: `"<ordinal> (0x<id>).jpg"`.
//!
//! The ordinal is the 1-based position in the listing, zero-padded to the
//! number of digits of the listing size. Only the id is recovered when
//! decoding. Editors save through a sibling with trailing digits appended
//! (`"07 (0x2b).jpg123"`); those scratch names decode too.

use std::sync::LazyLock;

use regex::Regex;

use crate::storage::PhotoId;

static PHOTO_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d+ \(0x([0-9a-f]+)\)\.jpg$").expect("Invalid regex pattern")
});

static SCRATCH_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d+ \(0x([0-9a-f]+)\)\.jpg(\d+)$").expect("Invalid regex pattern")
});

/// A decoded write-back sibling name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScratchName {
    pub id: PhotoId,
    pub suffix: String,
}

fn digits(mut n: usize) -> usize {
    let mut count = 1;
    while n >= 10 {
        n /= 10;
        count += 1;
    }
    count
}

pub fn photo_name(id: PhotoId, ordinal: usize, count: usize) -> String {
    let width = digits(count);
    format!("{ordinal:0width$} (0x{id:x}).jpg")
}

/// Names for a listing, in listing order.
pub fn photo_names(ids: &[PhotoId]) -> Vec<String> {
    ids.iter()
        .enumerate()
        .map(|(i, id)| photo_name(*id, i + 1, ids.len()))
        .collect()
}

fn parse_id(hex: &str) -> Option<PhotoId> {
    PhotoId::from_str_radix(hex, 16).ok()
}

pub fn decode_photo_name(name: &str) -> Option<PhotoId> {
    PHOTO_NAME.captures(name).and_then(|c| parse_id(&c[1]))
}

pub fn is_photo_name(name: &str) -> bool {
    decode_photo_name(name).is_some()
}

pub fn decode_scratch_name(name: &str) -> Option<ScratchName> {
    let caps = SCRATCH_NAME.captures(name)?;
    Some(ScratchName {
        id: parse_id(&caps[1])?,
        suffix: caps[2].to_string(),
    })
}

//! Minimal reader for the XMP packet embedded in JPEG files: the `xmp:Label`
//! and the `dc:subject` keyword bag.

use std::sync::LazyLock;

use regex::Regex;

static PACKET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<x:xmpmeta[\s>].*?</x:xmpmeta>").expect("Invalid regex pattern")
});

static LABEL_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"xmp:Label\s*=\s*"([^"]*)""#).expect("Invalid regex pattern")
});

static LABEL_ELEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<xmp:Label>(.*?)</xmp:Label>").expect("Invalid regex pattern")
});

static SUBJECT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<dc:subject>(.*?)</dc:subject>").expect("Invalid regex pattern")
});

static LIST_ITEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<rdf:li[^>]*>(.*?)</rdf:li>").expect("Invalid regex pattern")
});

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct XmpFields {
    pub label: Option<String>,
    pub keywords: Vec<String>,
}

/// Locate the XMP packet in raw file bytes.
pub fn find_packet(bytes: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(bytes);
    PACKET.find(&text).map(|m| m.as_str().to_string())
}

fn unescape(value: &str) -> String {
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

pub fn parse(packet: &str) -> XmpFields {
    let label = LABEL_ATTR
        .captures(packet)
        .or_else(|| LABEL_ELEM.captures(packet))
        .map(|c| unescape(c[1].trim()))
        .filter(|l| !l.is_empty());

    let keywords = SUBJECT
        .captures(packet)
        .map(|bag| {
            LIST_ITEM
                .captures_iter(&bag[1])
                .map(|c| unescape(c[1].trim()))
                .filter(|k| !k.is_empty())
                .collect()
        })
        .unwrap_or_default();

    XmpFields { label, keywords }
}

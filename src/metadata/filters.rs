//! Normalization of raw metadata values.

use chrono::NaiveDateTime;

use super::ExtractError;

const DATE_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

pub fn parse_datetime(raw: &str) -> Result<NaiveDateTime, ExtractError> {
    let raw = raw.trim_matches(|c: char| c == '\0' || c.is_whitespace());
    if raw.is_empty() {
        return Err(ExtractError::MissingDateTime);
    }
    NaiveDateTime::parse_from_str(raw, DATE_FORMAT)
        .map_err(|_| ExtractError::InvalidDateTime(raw.to_string()))
}

/// Aperture rational rounded to one decimal, e.g. 28/10 -> "2.8".
pub fn fnumber(num: u32, denom: u32) -> Option<String> {
    if denom == 0 {
        return None;
    }
    Some(format!("{:.1}", num as f64 / denom as f64))
}

/// Focal length in whole millimetres.
pub fn focal_length(num: u32, denom: u32) -> Option<String> {
    if denom == 0 {
        return None;
    }
    Some(format!("{}", num / denom))
}

/// Lens range "min-max" from the minimum and maximum focal lengths of the
/// lens specification, falling back to the photo's focal length.
pub fn lens_spec(range: Option<(u32, u32)>, focal_length: Option<&str>) -> Option<String> {
    match range {
        Some((min, max)) => Some(format!("{min}-{max}")),
        None => focal_length.map(str::to_string),
    }
}

/// Strip path separators so the value can be used as a directory name.
/// Empty results become `None`.
pub fn escape(value: &str) -> Option<String> {
    let cleaned: String = value
        .trim_matches(|c: char| c == '\0' || c.is_whitespace())
        .chars()
        .filter(|c| *c != '/')
        .collect();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_exif_datetime() {
        let dt = parse_datetime("2012:01:31 23:59:58").unwrap();
        assert_eq!(dt.format("%Y%m%d%H%M%S").to_string(), "20120131235958");
    }

    #[test]
    fn missing_or_bad_datetime_fails() {
        assert!(matches!(parse_datetime(""), Err(ExtractError::MissingDateTime)));
        assert!(matches!(
            parse_datetime("yesterday"),
            Err(ExtractError::InvalidDateTime(_))
        ));
    }

    #[test]
    fn fnumber_rounds_to_one_decimal() {
        assert_eq!(fnumber(28, 10).as_deref(), Some("2.8"));
        assert_eq!(fnumber(8, 1).as_deref(), Some("8.0"));
        assert_eq!(fnumber(1, 0), None);
    }

    #[test]
    fn lens_spec_falls_back_to_focal_length() {
        assert_eq!(lens_spec(Some((24, 70)), Some("35")).as_deref(), Some("24-70"));
        assert_eq!(lens_spec(None, Some("35")).as_deref(), Some("35"));
        assert_eq!(lens_spec(None, None), None);
    }

    #[test]
    fn escape_strips_slashes() {
        assert_eq!(escape("AF-S 24/70").as_deref(), Some("AF-S 2470"));
        assert_eq!(escape("/"), None);
        assert_eq!(escape("  "), None);
    }
}

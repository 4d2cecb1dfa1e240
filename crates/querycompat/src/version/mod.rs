mod select;

use std::fmt::{Display, Formatter};

use serde::Serialize;

pub use select::select_versioned_sql;

const MAX_SEGMENTS: usize = 4;

/// Server version as reported by a cluster, e.g. `24.3.1.2867`.
///
/// Only `(major, minor)` takes part in variant selection; `patch` and `build` are kept for display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct ParsedVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub build: u32,
}

impl ParsedVersion {
    #[must_use]
    pub const fn new(major: u32, minor: u32, patch: u32, build: u32) -> Self {
        Self {
            major,
            minor,
            patch,
            build,
        }
    }

    /// The key variant selection orders on.
    #[must_use]
    pub const fn feature_level(&self) -> (u32, u32) {
        (self.major, self.minor)
    }
}

impl Display for ParsedVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.patch, self.build
        )
    }
}

/// Best-effort parse of a dotted version string.
///
/// Returns `None` for missing, empty or unparsable input. A segment that is not a number (or does
/// not fit in `u32`) counts as 0, except that a leading run of digits is kept (`2-lts` reads as 2).
#[must_use]
pub fn parse_version(input: Option<&str>) -> Option<ParsedVersion> {
    let trimmed = input?.trim();
    let candidate = trimmed
        .strip_prefix(['v', 'V'])
        .unwrap_or(trimmed);
    if candidate.is_empty() {
        return None;
    }

    let mut segments = candidate.split('.');
    let major = leading_number(segments.next()?)?;

    let mut rest = [0_u32; MAX_SEGMENTS - 1];
    for (slot, segment) in rest.iter_mut().zip(segments) {
        *slot = leading_number(segment).unwrap_or(0);
    }

    Some(ParsedVersion::new(major, rest[0], rest[1], rest[2]))
}

/// `None` when the segment has no leading digits; 0 when the digits overflow.
fn leading_number(segment: &str) -> Option<u32> {
    let segment = segment.trim();
    let digits_end = segment
        .find(|ch: char| !ch.is_ascii_digit())
        .unwrap_or(segment.len());
    if digits_end == 0 {
        return None;
    }

    Some(segment[..digits_end].parse::<u32>().unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::{ParsedVersion, leading_number, parse_version};

    #[test]
    fn leading_number_reads_digit_prefix() {
        assert_eq!(leading_number("17"), Some(17));
        assert_eq!(leading_number("2-lts"), Some(2));
        assert_eq!(leading_number("lts"), None);
        assert_eq!(leading_number("99999999999"), Some(0));
    }

    #[test]
    fn display_renders_all_four_components() {
        let version = parse_version(Some("24.3")).expect("version should parse");
        assert_eq!(version.to_string(), "24.3.0.0");
        assert_eq!(version, ParsedVersion::new(24, 3, 0, 0));
    }
}

//! Byte range wire formats.
//!
//! Requests carry `Range: bytes=<start>-<end>`; ranged responses carry
//! `Content-Range: bytes <start>-<end>/<total>`. Both bounds are inclusive.

use std::fmt;
use std::str::FromStr;

use crate::errors::CloudError;

const BYTES_UNIT: &str = "bytes";

/// Parsed `Content-Range` response header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentRange {
    pub start: u64,
    pub end: u64,
    pub total: u64,
}

impl ContentRange {
    /// Number of bytes covered by the range.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Ranges always cover at least one byte.
    pub fn is_empty(&self) -> bool {
        false
    }
}

impl FromStr for ContentRange {
    type Err = CloudError;

    fn from_str(header: &str) -> Result<Self, Self::Err> {
        let invalid = || CloudError::InvalidContentRange(header.to_string());

        let rest = header.trim().strip_prefix(BYTES_UNIT).ok_or_else(invalid)?;
        // "bytesX 0-9/10" must not pass as "bytes 0-9/10".
        if !rest.starts_with(char::is_whitespace) {
            return Err(invalid());
        }

        let (range, total) = rest.trim().split_once('/').ok_or_else(invalid)?;
        let (start, end) = range.split_once('-').ok_or_else(invalid)?;

        let parse = |value: &str| value.trim().parse::<u64>().map_err(|_| invalid());
        let (start, end, total) = (parse(start)?, parse(end)?, parse(total)?);

        if end < start || end >= total {
            return Err(invalid());
        }

        Ok(Self { start, end, total })
    }
}

impl fmt::Display for ContentRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{BYTES_UNIT} {}-{}/{}", self.start, self.end, self.total)
    }
}

/// Value of a `Range` request header for the inclusive window `[start, end]`.
pub fn range_header(start: u64, end: u64) -> String {
    format!("{BYTES_UNIT}={start}-{end}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_header() {
        let range: ContentRange = "bytes 0-9/10".parse().unwrap();
        assert_eq!(range, ContentRange { start: 0, end: 9, total: 10 });
        assert_eq!(range.len(), 10);

        let padded: ContentRange = "  bytes  5242881-10485761/20000000 ".parse().unwrap();
        assert_eq!(padded.start, 5_242_881);
        assert_eq!(padded.len(), 5_242_881);
    }

    #[test]
    fn rejects_missing_unit_suffix() {
        let err = "byte 0-9/10".parse::<ContentRange>().unwrap_err();
        match err {
            CloudError::InvalidContentRange(header) => assert_eq!(header, "byte 0-9/10"),
            other => panic!("expected invalid content range, got {other:?}"),
        }
    }

    #[test]
    fn rejects_malformed_shapes() {
        for header in [
            "",
            "bytes",
            "bytesX 0-9/10",
            "bytes 0-9",
            "bytes 0/10",
            "bytes */10",
            "bytes 0-9/*",
            "bytes 9-0/10",
            "bytes 0-10/10",
            "bytes -1-9/10",
        ] {
            assert!(header.parse::<ContentRange>().is_err(), "{header:?} should be rejected");
        }
    }

    #[test]
    fn formats_request_and_response_headers() {
        assert_eq!(range_header(0, 5_242_880), "bytes=0-5242880");
        let range = ContentRange { start: 3, end: 7, total: 8 };
        assert_eq!(range.to_string(), "bytes 3-7/8");
    }
}

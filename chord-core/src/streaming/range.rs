//! HTTP Range request parsing for audio seeking
//!
//! Implements the single-range subset of RFC 7233 byte ranges. A header
//! listing several comma-separated ranges is deliberately treated as if no
//! range had been sent: the client receives the whole file with 200 instead
//! of a multipart/byteranges response.

use std::fmt;

/// Inclusive byte interval `[start, end]` of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    start: u64,
    end: u64,
}

impl ByteRange {
    /// Creates a range if `start <= end < file_size`.
    pub fn new(start: u64, end: u64, file_size: u64) -> Option<Self> {
        (start <= end && end < file_size).then_some(Self { start, end })
    }

    /// First byte offset, inclusive.
    pub fn start(&self) -> u64 {
        self.start
    }

    /// Last byte offset, inclusive.
    pub fn end(&self) -> u64 {
        self.end
    }

    /// Number of bytes in the range.
    pub fn length(&self) -> u64 {
        self.end - self.start + 1
    }

    /// `Content-Range` header value for a 206 response.
    pub fn content_range(&self, file_size: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, file_size)
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Result of interpreting a `Range` header against a file size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeOutcome {
    /// No usable range: serve the entire file with 200
    Full,
    /// Serve exactly this interval with 206
    Partial(ByteRange),
    /// Range lies outside the file: respond 416 with no body
    Unsatisfiable,
}

impl RangeOutcome {
    /// `Content-Range` header value for a 416 response.
    pub fn unsatisfied_content_range(file_size: u64) -> String {
        format!("bytes */{file_size}")
    }
}

/// Parse an optional `Range` header value against `file_size`.
///
/// - absent, non-`bytes` unit, malformed or multi-range → [`RangeOutcome::Full`]
/// - `bytes=N-` → `N..=size-1`
/// - `bytes=-N` → the last `N` bytes, starting at 0 if `N > size`
/// - `bytes=N-M` → `N..=M`, with `M` past the end replaced by `size-1`
/// - `start >= size` or `start > end` → [`RangeOutcome::Unsatisfiable`]
///
/// # Examples
/// ```
/// use chord_core::streaming::{RangeOutcome, parse_range_header};
///
/// match parse_range_header(Some("bytes=500-"), 1000) {
///     RangeOutcome::Partial(range) => assert_eq!((range.start(), range.end()), (500, 999)),
///     other => panic!("unexpected {other:?}"),
/// }
/// assert_eq!(parse_range_header(Some("bytes=2000-3000"), 1000), RangeOutcome::Unsatisfiable);
/// ```
pub fn parse_range_header(header: Option<&str>, file_size: u64) -> RangeOutcome {
    let Some(header) = header else {
        return RangeOutcome::Full;
    };

    let Some((unit, spec)) = header.trim().split_once('=') else {
        return RangeOutcome::Full;
    };
    if !unit.trim().eq_ignore_ascii_case("bytes") || spec.contains(',') {
        return RangeOutcome::Full;
    }

    let Some((first, last)) = spec.trim().split_once('-') else {
        return RangeOutcome::Full;
    };
    let (first, last) = (first.trim(), last.trim());

    let (start, end) = match (first.is_empty(), last.is_empty()) {
        (true, true) => return RangeOutcome::Full,
        // suffix: last N bytes
        (true, false) => {
            let Some(suffix) = parse_position(last) else {
                return RangeOutcome::Full;
            };
            if suffix == 0 || file_size == 0 {
                return RangeOutcome::Unsatisfiable;
            }
            (file_size.saturating_sub(suffix), file_size - 1)
        }
        (false, true) => {
            let Some(start) = parse_position(first) else {
                return RangeOutcome::Full;
            };
            (start, file_size.saturating_sub(1))
        }
        (false, false) => {
            let (Some(start), Some(end)) = (parse_position(first), parse_position(last)) else {
                return RangeOutcome::Full;
            };
            if start > end {
                return RangeOutcome::Unsatisfiable;
            }
            (start, end.min(file_size.saturating_sub(1)))
        }
    };

    if start >= file_size {
        return RangeOutcome::Unsatisfiable;
    }

    ByteRange::new(start, end, file_size)
        .map(RangeOutcome::Partial)
        .unwrap_or(RangeOutcome::Unsatisfiable)
}

/// Strict decimal byte position: digits only, no sign, no overflow.
fn parse_position(value: &str) -> Option<u64> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn partial(start: u64, end: u64, size: u64) -> RangeOutcome {
        RangeOutcome::Partial(ByteRange::new(start, end, size).unwrap())
    }

    #[test]
    fn test_parse_range_header_valid() {
        assert_eq!(
            parse_range_header(Some("bytes=100-199"), 1000),
            partial(100, 199, 1000)
        );
    }

    #[test]
    fn test_parse_range_header_open_end() {
        let outcome = parse_range_header(Some("bytes=500-"), 1000);
        assert_eq!(outcome, partial(500, 999, 1000));
        if let RangeOutcome::Partial(range) = outcome {
            assert_eq!(range.length(), 500);
            assert_eq!(range.content_range(1000), "bytes 500-999/1000");
        }
    }

    #[test]
    fn test_parse_range_header_suffix() {
        assert_eq!(
            parse_range_header(Some("bytes=-100"), 1000),
            partial(900, 999, 1000)
        );
        assert_eq!(
            parse_range_header(Some("bytes=-5000"), 1000),
            partial(0, 999, 1000)
        );
        assert_eq!(
            parse_range_header(Some("bytes=-0"), 1000),
            RangeOutcome::Unsatisfiable
        );
    }

    #[test]
    fn test_parse_range_header_missing_or_invalid() {
        assert_eq!(parse_range_header(None, 1000), RangeOutcome::Full);
        for header in [
            "invalid",
            "items=0-10",
            "bytes=",
            "bytes=-",
            "bytes=abc-10",
            "bytes=10-xyz",
            "bytes=+5-10",
            "bytes=99999999999999999999999-",
        ] {
            assert_eq!(
                parse_range_header(Some(header), 1000),
                RangeOutcome::Full,
                "{header:?}"
            );
        }
    }

    #[test]
    fn test_multi_range_degrades_to_full() {
        assert_eq!(
            parse_range_header(Some("bytes=0-10, 20-30"), 1000),
            RangeOutcome::Full
        );
    }

    #[test]
    fn test_unit_is_case_insensitive_and_whitespace_tolerant() {
        assert_eq!(
            parse_range_header(Some(" Bytes = 10 - 19 "), 1000),
            partial(10, 19, 1000)
        );
    }

    #[test]
    fn test_unsatisfiable_ranges() {
        assert_eq!(
            parse_range_header(Some("bytes=2000-3000"), 1000),
            RangeOutcome::Unsatisfiable
        );
        assert_eq!(
            parse_range_header(Some("bytes=1000-"), 1000),
            RangeOutcome::Unsatisfiable
        );
        assert_eq!(
            parse_range_header(Some("bytes=500-400"), 1000),
            RangeOutcome::Unsatisfiable
        );
        assert_eq!(
            parse_range_header(Some("bytes=0-"), 0),
            RangeOutcome::Unsatisfiable
        );
        assert_eq!(RangeOutcome::unsatisfied_content_range(1000), "bytes */1000");
    }

    #[test]
    fn test_end_past_file_is_limited_to_last_byte() {
        assert_eq!(
            parse_range_header(Some("bytes=900-5000"), 1000),
            partial(900, 999, 1000)
        );
    }

    #[test]
    fn test_byte_range_invariant() {
        assert!(ByteRange::new(0, 0, 1).is_some());
        assert!(ByteRange::new(5, 4, 10).is_none());
        assert!(ByteRange::new(0, 10, 10).is_none());
    }

    proptest! {
        #[test]
        fn prop_split_ranges_cover_file(size in 2u64..10_000, split in 1u64..10_000) {
            let k = split % (size - 1) + 1;
            let head = parse_range_header(Some(&format!("bytes=0-{}", k - 1)), size);
            let tail = parse_range_header(Some(&format!("bytes={}-{}", k, size - 1)), size);

            match (head, tail) {
                (RangeOutcome::Partial(a), RangeOutcome::Partial(b)) => {
                    prop_assert_eq!(a.start(), 0);
                    prop_assert_eq!(a.end() + 1, b.start());
                    prop_assert_eq!(b.end(), size - 1);
                    prop_assert_eq!(a.length() + b.length(), size);
                }
                other => prop_assert!(false, "unexpected outcome {:?}", other),
            }
        }

        #[test]
        fn prop_partial_ranges_stay_inside_file(
            size in 0u64..5_000,
            start in 0u64..6_000,
            end in 0u64..6_000,
        ) {
            match parse_range_header(Some(&format!("bytes={start}-{end}")), size) {
                RangeOutcome::Partial(range) => {
                    prop_assert!(range.start() <= range.end());
                    prop_assert!(range.end() < size);
                    prop_assert_eq!(range.start(), start);
                }
                RangeOutcome::Unsatisfiable => prop_assert!(start >= size || start > end),
                RangeOutcome::Full => prop_assert!(false, "well-formed header must not degrade"),
            }
        }
    }
}

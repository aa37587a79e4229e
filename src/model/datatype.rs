//! Datatype inference for variable token positions.

use std::collections::BTreeSet;
use std::fmt;
use std::net::IpAddr;

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use regex::Regex;

/// Datatypes a variable node can be narrowed to.
///
/// Variant order is the emission priority for the parser specification:
/// the most specific interpretation comes first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Datatype {
    DateTime,
    IpAddress,
    Integer,
    Float,
    Hex,
    Base64,
}

impl Datatype {
    /// Tag name used in artifacts (tree dump, run summary).
    pub fn tag(&self) -> &'static str {
        match self {
            Datatype::DateTime => "datetime",
            Datatype::IpAddress => "ipaddress",
            Datatype::Integer => "integer",
            Datatype::Float => "float",
            Datatype::Hex => "hex",
            Datatype::Base64 => "base64",
        }
    }
}

impl fmt::Display for Datatype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%d/%b/%Y:%H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d.%m.%Y", "%m/%d/%Y"];

fn has_full_year(date: NaiveDate) -> bool {
    (1000..=9999).contains(&date.year())
}

/// Infers datatype tags from observed token values.
///
/// A tag applies to a position only if every observed value satisfies it, so
/// callers intersect per-value results (see [`DatatypeDetector::detect_common`]).
#[derive(Debug)]
pub struct DatatypeDetector {
    integer: Regex,
    float: Regex,
    hex: Regex,
    base64: Regex,
}

impl Default for DatatypeDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl DatatypeDetector {
    pub fn new() -> Self {
        Self {
            integer: Regex::new(r"^-?\d+$").unwrap(),
            float: Regex::new(r"^-?\d+\.\d+$").unwrap(),
            hex: Regex::new(r"^(?i)[0-9a-f]{4,}$").unwrap(),
            base64: Regex::new(r"^[A-Za-z0-9+/]{8,}={0,2}$").unwrap(),
        }
    }

    /// All tags a single value satisfies.
    pub fn detect(&self, value: &str) -> BTreeSet<Datatype> {
        let mut tags = BTreeSet::new();
        if self.integer.is_match(value) {
            tags.insert(Datatype::Integer);
        }
        if self.float.is_match(value) {
            tags.insert(Datatype::Float);
        }
        // Digit-only strings stay integers; hex needs at least one letter.
        if self.hex.is_match(value) && value.bytes().any(|b| b.is_ascii_alphabetic()) {
            tags.insert(Datatype::Hex);
        }
        if self.base64.is_match(value) && value.len() % 4 == 0 {
            tags.insert(Datatype::Base64);
        }
        if value.parse::<IpAddr>().is_ok() {
            tags.insert(Datatype::IpAddress);
        }
        if self.is_datetime(value) {
            tags.insert(Datatype::DateTime);
        }
        tags
    }

    /// Tags satisfied by every value (set intersection). Empty input or no
    /// common tag yields the empty set, i.e. a generic string position.
    pub fn detect_common<'a, I>(&self, values: I) -> BTreeSet<Datatype>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut common: Option<BTreeSet<Datatype>> = None;
        for value in values {
            let tags = self.detect(value);
            common = Some(match common {
                None => tags,
                Some(seen) => seen.intersection(&tags).copied().collect(),
            });
            if matches!(common, Some(ref c) if c.is_empty()) {
                break;
            }
        }
        common.unwrap_or_default()
    }

    fn is_datetime(&self, value: &str) -> bool {
        // chrono's %Y accepts 1-digit years, which would type version-like
        // tokens such as "12.3.4" as dates; require a 4-digit year.
        DATETIME_FORMATS.iter().any(|fmt| {
            NaiveDateTime::parse_from_str(value, fmt)
                .map_or(false, |dt| has_full_year(dt.date()))
        }) || DATE_FORMATS
            .iter()
            .any(|fmt| NaiveDate::parse_from_str(value, fmt).map_or(false, has_full_year))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("42", Datatype::Integer)]
    #[case("-17", Datatype::Integer)]
    #[case("3.14", Datatype::Float)]
    #[case("-0.5", Datatype::Float)]
    #[case("192.168.0.1", Datatype::IpAddress)]
    #[case("::1", Datatype::IpAddress)]
    #[case("deadbeef", Datatype::Hex)]
    #[case("0aF3", Datatype::Hex)]
    #[case("dGVzdHZhbHVl", Datatype::Base64)]
    #[case("2024-01-02 13:37:00", Datatype::DateTime)]
    #[case("2024-01-02", Datatype::DateTime)]
    #[case("03.04.2024", Datatype::DateTime)]
    fn given_typed_value_when_detecting_then_tag_present(
        #[case] value: &str,
        #[case] expected: Datatype,
    ) {
        let detector = DatatypeDetector::new();
        assert!(
            detector.detect(value).contains(&expected),
            "{} should carry {:?}",
            value,
            expected
        );
    }

    #[rstest]
    #[case("hello")]
    #[case("a1")]
    #[case("12.3.4")]
    #[case("")]
    fn given_plain_string_when_detecting_then_no_tags(#[case] value: &str) {
        let detector = DatatypeDetector::new();
        assert!(detector.detect(value).is_empty(), "{} should be untyped", value);
    }

    #[rstest]
    #[case("12.3.4")]
    #[case("1.2.3")]
    #[case("12.3.99")]
    fn given_version_like_token_when_detecting_then_not_a_datetime(#[case] value: &str) {
        let detector = DatatypeDetector::new();
        assert!(
            !detector.detect(value).contains(&Datatype::DateTime),
            "{} should not be typed as a datetime",
            value
        );
    }

    #[test]
    fn given_digit_only_value_when_detecting_then_not_hex() {
        let detector = DatatypeDetector::new();
        let tags = detector.detect("123456");
        assert!(tags.contains(&Datatype::Integer));
        assert!(!tags.contains(&Datatype::Hex));
    }

    #[test]
    fn given_mixed_values_when_intersecting_then_common_tags_only() {
        let detector = DatatypeDetector::new();

        let all_ints = detector.detect_common(["1", "42", "-7"]);
        assert!(all_ints.contains(&Datatype::Integer));

        let mixed = detector.detect_common(["1", "abc"]);
        assert!(mixed.is_empty());
    }

    #[test]
    fn given_no_values_when_intersecting_then_empty() {
        let detector = DatatypeDetector::new();
        assert!(detector.detect_common(std::iter::empty()).is_empty());
    }
}

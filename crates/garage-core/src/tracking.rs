//! # Tracking Codes
//!
//! The customer-facing service identifier and the generator that mints it.
//!
//! ## Format
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      MC - 2024 - 001235                                 │
//! │                      ──   ────   ──────                                 │
//! │                      │     │       └── 6-digit zero-padded sequence    │
//! │                      │     └────────── 4-digit issuing year            │
//! │                      └──────────────── literal "Mechanic Code" prefix  │
//! │                                                                         │
//! │  Canonical:  MC-2024-001235   (stored, compared, exchanged)            │
//! │  Display:    MC - 2024 - 001235 (printed on receipts / portal)         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Generation
//! ```text
//! existing codes ──► draw random sequence 000001..999999
//!                        │
//!                        ├── not taken? ──► GeneratedCode::Unique
//!                        │
//!                        └── taken: retry (max_attempts, default 1000)
//!                                 │
//!                                 ▼ exhausted
//!                    low six digits of the millisecond timestamp
//!                                 │
//!                                 ▼
//!                    GeneratedCode::Fallback  (NOT guaranteed unique)
//! ```

use chrono::{DateTime, Datelike, Utc};
use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};

// =============================================================================
// Constants
// =============================================================================

/// Literal code prefix.
pub const CODE_PREFIX: &str = "MC";

/// Number of digits in the sequence part.
pub const SEQUENCE_DIGITS: usize = 6;

/// Largest sequence the generator draws.
pub const MAX_SEQUENCE: u32 = 999_999;

/// Default retry bound before falling back to a timestamp code.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 1000;

/// Canonical length of `MC-YYYY-NNNNNN`.
const CODE_LEN: usize = 14;

// =============================================================================
// Format Helpers
// =============================================================================

/// Format-only check against `MC-YYYY-NNNNNN`.
///
/// Independent of which codes have been issued.
///
/// ## Example
/// ```rust
/// use garage_core::tracking::validate;
///
/// assert!(validate("MC-2024-001235"));
/// assert!(!validate("mc-2024-001235"));
/// assert!(!validate("MC-2024-1235"));
/// ```
pub fn validate(code: &str) -> bool {
    let bytes = code.as_bytes();
    bytes.len() == CODE_LEN
        && bytes.starts_with(b"MC-")
        && bytes[3..7].iter().all(|b| b.is_ascii_digit())
        && bytes[7] == b'-'
        && bytes[8..].iter().all(|b| b.is_ascii_digit())
}

/// Inserts visual separators (`MC - 2024 - 001235`).
///
/// Malformed input is returned unchanged, which also makes the function
/// idempotent: an already formatted code is no longer canonical.
pub fn format_for_display(code: &str) -> String {
    match TrackingCode::parse(code) {
        Ok(parsed) => parsed.display_form(),
        Err(_) => code.to_string(),
    }
}

/// Year part of a well-formed code.
pub fn extract_year(code: &str) -> Option<i32> {
    TrackingCode::parse(code).ok().map(|c| c.year())
}

/// Sequence part of a well-formed code.
pub fn extract_sequence(code: &str) -> Option<u32> {
    TrackingCode::parse(code).ok().map(|c| c.sequence())
}

/// True when the code was issued in the same calendar year as `now`.
pub fn is_current_year(code: &str, now: DateTime<Utc>) -> bool {
    extract_year(code) == Some(now.year())
}

fn decimal(digits: &str) -> u32 {
    digits
        .bytes()
        .fold(0u32, |acc, b| acc * 10 + u32::from(b - b'0'))
}

// =============================================================================
// Tracking Code
// =============================================================================

/// A validated `MC-YYYY-NNNNNN` code.
///
/// Immutable once built; the only constructors validate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, TS)]
#[ts(export)]
pub struct TrackingCode(String);

impl TrackingCode {
    /// Parses a canonical code.
    ///
    /// ## Errors
    /// `CoreError::InvalidFormat` for anything but `MC-YYYY-NNNNNN`.
    pub fn parse(code: &str) -> CoreResult<Self> {
        if !validate(code) {
            return Err(CoreError::InvalidFormat {
                value: code.to_string(),
            });
        }
        Ok(TrackingCode(code.to_string()))
    }

    /// Parses either the canonical or the display form.
    ///
    /// Whitespace and hyphens are stripped first, so `MC - 2024 - 001235`,
    /// `MC 2024 001235` and `MC2024001235` all yield `MC-2024-001235`.
    pub fn parse_display(input: &str) -> CoreResult<Self> {
        let compact: String = input
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-')
            .collect();

        if !compact.chars().all(|c| c.is_ascii_alphanumeric())
            || compact.len() != CODE_LEN - 2
            || !compact.starts_with(CODE_PREFIX)
        {
            return Err(CoreError::InvalidFormat {
                value: input.to_string(),
            });
        }

        let rebuilt = format!("{}-{}-{}", &compact[..2], &compact[2..6], &compact[6..]);
        TrackingCode::parse(&rebuilt).map_err(|_| CoreError::InvalidFormat {
            value: input.to_string(),
        })
    }

    /// Builds a code from its parts.
    ///
    /// ## Errors
    /// `InvalidFormat` if the year is not four digits or the sequence does
    /// not fit six digits.
    pub fn from_parts(year: i32, sequence: u32) -> CoreResult<Self> {
        if !(0..=9999).contains(&year) || sequence > MAX_SEQUENCE {
            return Err(CoreError::InvalidFormat {
                value: format!("{}-{}-{}", CODE_PREFIX, year, sequence),
            });
        }
        Ok(Self::compose(year, sequence))
    }

    /// Infallible constructor for values already known to be in range.
    fn compose(year: i32, sequence: u32) -> Self {
        TrackingCode(format!(
            "{}-{:04}-{:06}",
            CODE_PREFIX,
            year.rem_euclid(10_000),
            sequence % (MAX_SEQUENCE + 1)
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Issuing year.
    pub fn year(&self) -> i32 {
        decimal(&self.0[3..7]) as i32
    }

    /// Sequence number (without padding).
    pub fn sequence(&self) -> u32 {
        decimal(&self.0[8..])
    }

    /// Zero-padded sequence as printed.
    pub fn sequence_str(&self) -> &str {
        &self.0[8..]
    }

    /// `MC - 2024 - 001235`
    pub fn display_form(&self) -> String {
        format!("{} - {} - {}", &self.0[..2], &self.0[3..7], &self.0[8..])
    }
}

impl fmt::Display for TrackingCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TrackingCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for TrackingCode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TrackingCode::parse(s)
    }
}

impl From<TrackingCode> for String {
    fn from(code: TrackingCode) -> Self {
        code.0
    }
}

/// Deserialization validates, so a malformed code can never enter a record.
impl<'de> Deserialize<'de> for TrackingCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        TrackingCode::parse(&raw).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Generated Code
// =============================================================================

/// Outcome of a generation run.
///
/// A fallback code is a separate variant so callers cannot mistake it for a
/// checked-unique one.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum GeneratedCode {
    /// Drawn code not present in the supplied set.
    Unique(TrackingCode),
    /// Timestamp-derived code produced after `attempts` collisions.
    Fallback { code: TrackingCode, attempts: u32 },
}

impl GeneratedCode {
    pub fn code(&self) -> &TrackingCode {
        match self {
            GeneratedCode::Unique(code) => code,
            GeneratedCode::Fallback { code, .. } => code,
        }
    }

    pub fn into_code(self) -> TrackingCode {
        match self {
            GeneratedCode::Unique(code) => code,
            GeneratedCode::Fallback { code, .. } => code,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, GeneratedCode::Fallback { .. })
    }

    /// Strict view: a fallback becomes `GenerationExhausted`.
    pub fn into_result(self) -> CoreResult<TrackingCode> {
        match self {
            GeneratedCode::Unique(code) => Ok(code),
            GeneratedCode::Fallback { code, attempts } => Err(CoreError::GenerationExhausted {
                attempts,
                fallback: code.into(),
            }),
        }
    }
}

// =============================================================================
// Code Generator
// =============================================================================

/// Mints tracking codes that avoid a supplied set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeGenerator {
    max_attempts: u32,
}

impl Default for CodeGenerator {
    fn default() -> Self {
        CodeGenerator {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl CodeGenerator {
    pub fn new(max_attempts: u32) -> Self {
        CodeGenerator { max_attempts }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Generates a code for the current year using the thread RNG.
    pub fn generate(&self, existing: &HashSet<String>) -> GeneratedCode {
        self.generate_with(existing, Utc::now(), &mut rand::thread_rng())
    }

    /// Generates a code for `now`'s year with an explicit random source.
    ///
    /// ## Example
    /// ```rust
    /// use chrono::{TimeZone, Utc};
    /// use garage_core::tracking::CodeGenerator;
    /// use std::collections::HashSet;
    ///
    /// let now = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
    /// let generated = CodeGenerator::default()
    ///     .generate_with(&HashSet::new(), now, &mut rand::thread_rng());
    /// assert!(!generated.is_fallback());
    /// assert!(generated.code().as_str().starts_with("MC-2024-"));
    /// ```
    pub fn generate_with<R: Rng + ?Sized>(
        &self,
        existing: &HashSet<String>,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> GeneratedCode {
        let year = now.year();

        for _ in 0..self.max_attempts {
            let candidate = TrackingCode::compose(year, rng.gen_range(1..=MAX_SEQUENCE));
            if !existing.contains(candidate.as_str()) {
                return GeneratedCode::Unique(candidate);
            }
        }

        let low_digits = now.timestamp_millis().rem_euclid(i64::from(MAX_SEQUENCE) + 1) as u32;
        GeneratedCode::Fallback {
            code: TrackingCode::compose(year, low_digits),
            attempts: self.max_attempts,
        }
    }

    /// Generates `count` codes that are distinct from `existing` and from
    /// each other (as far as the unique path goes).
    pub fn generate_batch(&self, count: usize, existing: &HashSet<String>) -> Vec<GeneratedCode> {
        let mut taken = existing.clone();
        let mut rng = rand::thread_rng();
        let now = Utc::now();

        (0..count)
            .map(|_| {
                let generated = self.generate_with(&taken, now, &mut rng);
                taken.insert(generated.code().as_str().to_string());
                generated
            })
            .collect()
    }
}

// =============================================================================
// Code Statistics & Utilities
// =============================================================================

/// Aggregate over a raw list of codes (which may contain malformed ones).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CodeStatistics {
    pub total: usize,
    pub current_year: usize,
    pub by_year: BTreeMap<i32, usize>,
    pub valid_codes: usize,
    pub invalid_codes: usize,
}

impl CodeStatistics {
    pub fn from_codes<I, S>(codes: I, now: DateTime<Utc>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let this_year = now.year();
        let mut stats = CodeStatistics::default();

        for code in codes {
            stats.total += 1;
            match extract_year(code.as_ref()) {
                Some(year) => {
                    stats.valid_codes += 1;
                    *stats.by_year.entry(year).or_insert(0) += 1;
                    if year == this_year {
                        stats.current_year += 1;
                    }
                }
                None => stats.invalid_codes += 1,
            }
        }

        stats
    }
}

/// Partial match ignoring case, hyphens and spaces.
///
/// `"2024 0012"` matches `MC-2024-001235`.
pub fn search_codes<S: AsRef<str>>(codes: &[S], query: &str) -> Vec<String> {
    let normalize = |s: &str| -> String {
        s.chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_uppercase())
            .collect()
    };
    let needle = normalize(query);

    codes
        .iter()
        .map(AsRef::as_ref)
        .filter(|code| normalize(code).contains(&needle))
        .map(str::to_string)
        .collect()
}

/// Chronological sort: year first, then sequence. Malformed codes sort as
/// year 0 / sequence 0.
pub fn sort_codes<S: AsRef<str>>(codes: &[S], ascending: bool) -> Vec<String> {
    let mut sorted: Vec<String> = codes.iter().map(|c| c.as_ref().to_string()).collect();
    sorted.sort_by_key(|code| {
        (
            extract_year(code).unwrap_or(0),
            extract_sequence(code).unwrap_or(0),
        )
    });
    if !ascending {
        sorted.reverse();
    }
    sorted
}

/// Buckets well-formed codes by issuing year; malformed codes are dropped.
pub fn group_by_year<S: AsRef<str>>(codes: &[S]) -> BTreeMap<i32, Vec<String>> {
    let mut groups: BTreeMap<i32, Vec<String>> = BTreeMap::new();
    for code in codes.iter().map(AsRef::as_ref) {
        if let Some(year) = extract_year(code) {
            groups.entry(year).or_default().push(code.to_string());
        }
    }
    groups
}

/// Everything the tracking portal prints next to a code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CodeDisplayInfo {
    pub formatted: String,
    pub year: Option<i32>,
    pub sequence: Option<String>,
    pub is_current_year: bool,
}

impl CodeDisplayInfo {
    pub fn for_code(code: &str, now: DateTime<Utc>) -> Self {
        let parsed = TrackingCode::parse(code).ok();
        CodeDisplayInfo {
            formatted: format_for_display(code),
            year: parsed.as_ref().map(TrackingCode::year),
            sequence: parsed.as_ref().map(|c| c.sequence_str().to_string()),
            is_current_year: is_current_year(code, now),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
